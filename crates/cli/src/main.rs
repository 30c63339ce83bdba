#![deny(unsafe_code)]
//! CLI binary for the texquad image viewer.
//!
//! Opens a window, draws the configured image on a fullscreen quad, and runs
//! until the window is closed or Escape is pressed. Settings come from the
//! defaults, then an optional JSON config file, then flags.

mod error;
mod logging;
mod window;

use std::path::PathBuf;
use std::process;

use clap::Parser;
use error::CliError;
use texquad_core::{GlVersion, ViewerConfig};

#[derive(Parser, Debug)]
#[command(name = "texquad", about = "Show an image on a fullscreen OpenGL quad")]
struct Cli {
    /// JSON config file; flags override its values.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Window width in screen pixels.
    #[arg(short = 'W', long)]
    width: Option<u32>,

    /// Window height in screen pixels.
    #[arg(short = 'H', long)]
    height: Option<u32>,

    /// Window title.
    #[arg(long)]
    title: Option<String>,

    /// Image to display (JPEG or PNG).
    #[arg(short, long)]
    image: Option<PathBuf>,

    /// Vertex shader file instead of the built-in one.
    #[arg(long)]
    vertex_shader: Option<PathBuf>,

    /// Fragment shader file instead of the built-in one.
    #[arg(long)]
    fragment_shader: Option<PathBuf>,

    /// Requested OpenGL core profile version, e.g. "3.3".
    #[arg(long)]
    gl_version: Option<GlVersion>,

    /// Present frames as fast as possible.
    #[arg(long)]
    no_vsync: bool,

    /// Keep running with an empty texture if the image fails to load.
    #[arg(long)]
    allow_missing_texture: bool,

    /// Print the effective configuration as JSON and exit.
    #[arg(long)]
    print_config: bool,

    /// Report errors as JSON on stderr.
    #[arg(long)]
    json: bool,

    /// Log filter, e.g. "debug" or "texquad_core=trace". Defaults to RUST_LOG, then info.
    #[arg(long)]
    log_level: Option<String>,
}

impl Cli {
    /// Resolves defaults, the config file, and flags into one validated config.
    fn to_config(&self) -> Result<ViewerConfig, CliError> {
        let mut config = match &self.config {
            Some(path) => ViewerConfig::load(path)?,
            None => ViewerConfig::default(),
        };

        if let Some(width) = self.width {
            config.width = width;
        }
        if let Some(height) = self.height {
            config.height = height;
        }
        if let Some(title) = &self.title {
            config.title = title.clone();
        }
        if let Some(image) = &self.image {
            config.image_path = image.clone();
        }
        if let Some(path) = &self.vertex_shader {
            config.vertex_shader_path = Some(path.clone());
        }
        if let Some(path) = &self.fragment_shader {
            config.fragment_shader_path = Some(path.clone());
        }
        if let Some(version) = self.gl_version {
            config.gl_version = version;
        }
        if self.no_vsync {
            config.vsync = false;
        }
        if self.allow_missing_texture {
            config.allow_missing_texture = true;
        }

        config.validate()?;
        Ok(config)
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config = cli.to_config()?;

    if cli.print_config {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    log::info!(
        "opening {}x{} window for {} (OpenGL {} core)",
        config.width,
        config.height,
        config.image_path.display(),
        config.gl_version
    );
    window::run(config)
}

fn main() {
    let cli = Cli::parse();
    logging::init_logging(cli.log_level.as_deref());
    let json_mode = cli.json;
    if let Err(e) = run(cli) {
        if json_mode {
            let j = serde_json::json!({"error": e.to_string(), "exit_code": e.exit_code()});
            eprintln!("{}", serde_json::to_string_pretty(&j).unwrap_or_default());
        } else {
            eprintln!("error: {e}");
        }
        process::exit(e.exit_code());
    }
}
