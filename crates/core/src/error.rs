//! Error types for configuration and viewer setup.

use std::path::PathBuf;

use thiserror::Error;

use crate::render::{MeshError, ShaderError, TextureError};

/// Errors produced while loading or validating a [`ViewerConfig`](crate::ViewerConfig).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config {}: {message}", path.display())]
    Read { path: PathBuf, message: String },

    /// The config file was not valid JSON for the config schema.
    #[error("invalid config: {0}")]
    Parse(String),

    /// Width or height was zero or above the supported maximum.
    #[error("invalid window size {width}x{height}: each side must be in 1..={max}")]
    InvalidDimensions { width: u32, height: u32, max: u32 },

    /// A GL version string was not of the form `MAJOR.MINOR`.
    #[error("invalid GL version '{0}': expected MAJOR.MINOR, e.g. 4.6")]
    InvalidGlVersion(String),

    /// A clear color component was outside [0, 1] or not finite.
    #[error("invalid clear color component {0}: must be within 0.0..=1.0")]
    InvalidClearColor(String),
}

/// Errors that abort [`Viewer::new`](crate::Viewer::new).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ViewerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Shader(#[from] ShaderError),

    #[error(transparent)]
    Texture(#[from] TextureError),

    #[error(transparent)]
    Mesh(#[from] MeshError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::ShaderStage;

    #[test]
    fn invalid_dimensions_displays_readable_message() {
        let err = ConfigError::InvalidDimensions {
            width: 0,
            height: 600,
            max: 16384,
        };
        let msg = format!("{err}");
        assert!(msg.contains("0x600"), "missing size in: {msg}");
        assert!(msg.contains("16384"), "missing limit in: {msg}");
    }

    #[test]
    fn read_error_includes_path_and_message() {
        let err = ConfigError::Read {
            path: PathBuf::from("texquad.json"),
            message: "permission denied".into(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("texquad.json"), "missing path in: {msg}");
        assert!(msg.contains("permission denied"), "missing message in: {msg}");
    }

    #[test]
    fn invalid_gl_version_includes_input() {
        let msg = ConfigError::InvalidGlVersion("four".into()).to_string();
        assert!(msg.contains("four"), "missing input in: {msg}");
    }

    #[test]
    fn viewer_error_is_transparent_over_sources() {
        let shader = ShaderError::CompileError {
            stage: ShaderStage::Vertex,
            log: "bad token".into(),
        };
        let err = ViewerError::from(shader.clone());
        assert_eq!(err.to_string(), shader.to_string());

        let texture = TextureError::Create("no memory".into());
        assert_eq!(ViewerError::from(texture.clone()).to_string(), texture.to_string());
    }

    #[test]
    fn errors_are_send_and_sync() {
        fn assert_send_sync<T: Send + Sync + std::error::Error>() {}
        assert_send_sync::<ConfigError>();
        assert_send_sync::<ViewerError>();
    }
}
