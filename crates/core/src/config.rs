//! Viewer configuration.
//!
//! `ViewerConfig` replaces what would otherwise be compile-time constants:
//! window size and title, the image to show, and the shader sources. It is
//! (de)serialized as JSON; missing keys take their defaults.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::render::{ShaderSource, QUAD_FRAGMENT_SHADER, QUAD_VERTEX_SHADER};

/// Largest accepted window side, in pixels.
pub const MAX_DIMENSION: u32 = 16384;

/// Requested OpenGL context version. Always a core profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlVersion {
    pub major: u8,
    pub minor: u8,
}

impl GlVersion {
    pub const fn new(major: u8, minor: u8) -> Self {
        Self { major, minor }
    }
}

impl Default for GlVersion {
    fn default() -> Self {
        Self::new(4, 6)
    }
}

impl fmt::Display for GlVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl FromStr for GlVersion {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigError::InvalidGlVersion(s.to_string());
        let (major, minor) = s.trim().split_once('.').ok_or_else(invalid)?;
        let major: u8 = major.parse().map_err(|_| invalid())?;
        let minor: u8 = minor.parse().map_err(|_| invalid())?;
        if major == 0 {
            return Err(invalid());
        }
        Ok(Self { major, minor })
    }
}

/// Everything the viewer needs to set itself up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ViewerConfig {
    /// Initial window width in screen pixels.
    pub width: u32,
    /// Initial window height in screen pixels.
    pub height: u32,
    pub title: String,
    /// Image shown on the quad.
    pub image_path: PathBuf,
    /// Vertex shader file; the built-in passthrough shader when `None`.
    pub vertex_shader_path: Option<PathBuf>,
    /// Fragment shader file; the built-in texture sampler when `None`.
    pub fragment_shader_path: Option<PathBuf>,
    pub gl_version: GlVersion,
    /// RGBA color the framebuffer is cleared to each frame.
    pub clear_color: [f32; 4],
    pub vsync: bool,
    /// Keep running with an empty texture when the image fails to load.
    pub allow_missing_texture: bool,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            title: "Window".to_string(),
            image_path: PathBuf::from("res/miku.jpg"),
            vertex_shader_path: None,
            fragment_shader_path: None,
            gl_version: GlVersion::default(),
            clear_color: [0.0, 0.0, 0.0, 1.0],
            vsync: true,
            allow_missing_texture: false,
        }
    }
}

impl ViewerConfig {
    /// Parses and validates a JSON config.
    ///
    /// # Errors
    ///
    /// `ConfigError::Parse` for malformed JSON or unknown keys, otherwise
    /// whatever [`validate`](Self::validate) reports.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses, and validates a JSON config file.
    ///
    /// # Errors
    ///
    /// `ConfigError::Read` if the file cannot be read, otherwise as
    /// [`from_json_str`](Self::from_json_str).
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_json_str(&json)
    }

    /// Checks the invariants setup relies on.
    ///
    /// # Errors
    ///
    /// `ConfigError::InvalidDimensions` if a side is zero or above
    /// [`MAX_DIMENSION`]; `ConfigError::InvalidGlVersion` for major version
    /// 0; `ConfigError::InvalidClearColor` if a component is not a finite
    /// value in [0, 1].
    pub fn validate(&self) -> Result<(), ConfigError> {
        let side_ok = |side: u32| (1..=MAX_DIMENSION).contains(&side);
        if !side_ok(self.width) || !side_ok(self.height) {
            return Err(ConfigError::InvalidDimensions {
                width: self.width,
                height: self.height,
                max: MAX_DIMENSION,
            });
        }
        if self.gl_version.major == 0 {
            return Err(ConfigError::InvalidGlVersion(self.gl_version.to_string()));
        }
        if let Some(bad) = self
            .clear_color
            .iter()
            .find(|c| !(c.is_finite() && (0.0..=1.0).contains(*c)))
        {
            return Err(ConfigError::InvalidClearColor(bad.to_string()));
        }
        Ok(())
    }

    pub fn vertex_source(&self) -> ShaderSource {
        source_or(&self.vertex_shader_path, QUAD_VERTEX_SHADER)
    }

    pub fn fragment_source(&self) -> ShaderSource {
        source_or(&self.fragment_shader_path, QUAD_FRAGMENT_SHADER)
    }
}

fn source_or(path: &Option<PathBuf>, builtin: &str) -> ShaderSource {
    match path {
        Some(path) => ShaderSource::File(path.clone()),
        None => ShaderSource::Inline(builtin.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_describe_an_800_by_600_window() {
        let config = ViewerConfig::default();
        assert_eq!((config.width, config.height), (800, 600));
        assert_eq!(config.title, "Window");
        assert_eq!(config.image_path, PathBuf::from("res/miku.jpg"));
        assert_eq!(config.gl_version, GlVersion::new(4, 6));
        assert_eq!(config.clear_color, [0.0, 0.0, 0.0, 1.0]);
        assert!(!config.allow_missing_texture);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn empty_json_yields_defaults() {
        assert_eq!(ViewerConfig::from_json_str("{}").unwrap(), ViewerConfig::default());
    }

    #[test]
    fn partial_json_overrides_named_fields() {
        let config = ViewerConfig::from_json_str(
            r#"{"width": 1024, "title": "Preview", "gl_version": {"major": 3, "minor": 3}}"#,
        )
        .unwrap();
        assert_eq!(config.width, 1024);
        assert_eq!(config.height, 600);
        assert_eq!(config.title, "Preview");
        assert_eq!(config.gl_version, GlVersion::new(3, 3));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = ViewerConfig::from_json_str(r#"{"widht": 10}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)), "got {err:?}");
        assert!(err.to_string().contains("widht"));
    }

    #[test]
    fn zero_and_oversized_dimensions_are_rejected() {
        let zero = ViewerConfig {
            width: 0,
            ..ViewerConfig::default()
        };
        assert!(matches!(
            zero.validate(),
            Err(ConfigError::InvalidDimensions { width: 0, .. })
        ));

        let huge = ViewerConfig {
            height: MAX_DIMENSION + 1,
            ..ViewerConfig::default()
        };
        assert!(huge.validate().is_err());
    }

    #[test]
    fn json_gl_version_zero_is_rejected_like_the_flag() {
        let err = ViewerConfig::from_json_str(r#"{"gl_version": {"major": 0, "minor": 0}}"#)
            .unwrap_err();
        assert_eq!(err, ConfigError::InvalidGlVersion("0.0".into()));
        assert!("0.0".parse::<GlVersion>().is_err());
    }

    #[test]
    fn out_of_range_clear_color_is_rejected() {
        let config = ViewerConfig {
            clear_color: [0.0, 1.5, 0.0, 1.0],
            ..ViewerConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidClearColor("1.5".into()))
        );

        let nan = ViewerConfig {
            clear_color: [f32::NAN, 0.0, 0.0, 1.0],
            ..ViewerConfig::default()
        };
        assert!(nan.validate().is_err());
    }

    #[test]
    fn missing_shader_paths_use_builtin_sources() {
        let config = ViewerConfig::default();
        assert_eq!(
            config.vertex_source(),
            ShaderSource::Inline(QUAD_VERTEX_SHADER.to_string())
        );
        let config = ViewerConfig {
            fragment_shader_path: Some(PathBuf::from("shaders/custom.frag")),
            ..ViewerConfig::default()
        };
        assert_eq!(
            config.fragment_source(),
            ShaderSource::File(PathBuf::from("shaders/custom.frag"))
        );
    }

    #[test]
    fn load_reports_missing_file() {
        let err = ViewerConfig::load(Path::new("no/such/config.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }), "got {err:?}");
    }

    #[test]
    fn load_reads_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("texquad.json");
        std::fs::write(&path, r#"{"image_path": "res/other.jpg", "vsync": false}"#).unwrap();

        let config = ViewerConfig::load(&path).unwrap();
        assert_eq!(config.image_path, PathBuf::from("res/other.jpg"));
        assert!(!config.vsync);
    }

    #[test]
    fn json_output_parses_back() {
        let config = ViewerConfig {
            title: "Round".into(),
            vertex_shader_path: Some(PathBuf::from("a.vert")),
            ..ViewerConfig::default()
        };
        let json = serde_json::to_string_pretty(&config).unwrap();
        assert_eq!(ViewerConfig::from_json_str(&json).unwrap(), config);
    }

    #[test]
    fn gl_version_parses_major_minor() {
        assert_eq!("4.6".parse::<GlVersion>().unwrap(), GlVersion::new(4, 6));
        assert_eq!(" 3.3 ".parse::<GlVersion>().unwrap(), GlVersion::new(3, 3));
        assert_eq!(GlVersion::new(4, 1).to_string(), "4.1");
    }

    #[test]
    fn gl_version_rejects_malformed_input() {
        for bad in ["4", "four.six", "4.", "0.9", "4.6.1", ""] {
            assert!(bad.parse::<GlVersion>().is_err(), "accepted '{bad}'");
        }
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn gl_version_display_parses_back(major in 1_u8..=9, minor in 0_u8..=9) {
                let version = GlVersion::new(major, minor);
                prop_assert_eq!(version.to_string().parse::<GlVersion>().unwrap(), version);
            }

            #[test]
            fn validation_accepts_exactly_the_supported_sizes(
                width in 0_u32..=MAX_DIMENSION + 2,
                height in 0_u32..=MAX_DIMENSION + 2,
            ) {
                let config = ViewerConfig { width, height, ..ViewerConfig::default() };
                let in_range = |s: u32| s >= 1 && s <= MAX_DIMENSION;
                prop_assert_eq!(config.validate().is_ok(), in_range(width) && in_range(height));
            }
        }
    }
}
