//! Structured CLI errors with meaningful exit codes.
//!
//! Exit code scheme:
//! - 0:  success
//! - -1: startup failure (event loop, window/context creation, GL loader)
//! - 2:  clap arg parse error (automatic, before our code runs)
//! - 10: viewer setup error (shader, texture, mesh)
//! - 11: presentation error (buffer swap)
//! - 12: config error (bad file, bad values)
//! - 13: serialization error

use std::fmt;

use texquad_core::{ConfigError, ViewerError};

/// Errors produced by CLI operations, each mapped to an exit code.
#[derive(Debug)]
pub enum CliError {
    /// The windowing library's event loop could not start.
    LibraryInit(String),
    /// The window, GL display, surface, or context could not be created.
    WindowCreation(String),
    /// GL function pointers did not load.
    DeviceLoader(String),
    /// Shader, texture, or mesh setup failed.
    Viewer(ViewerError),
    /// Swapping buffers failed mid-run.
    Present(String),
    /// The configuration file or flags were invalid.
    Config(ConfigError),
    /// A serialization error (JSON output failure).
    Serialization(String),
}

impl CliError {
    /// Returns the process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::LibraryInit(_) | CliError::WindowCreation(_) | CliError::DeviceLoader(_) => {
                -1
            }
            CliError::Viewer(_) => 10,
            CliError::Present(_) => 11,
            CliError::Config(_) => 12,
            CliError::Serialization(_) => 13,
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LibraryInit(msg) => write!(f, "failed to initialize windowing: {msg}"),
            CliError::WindowCreation(msg) => write!(f, "failed to create window: {msg}"),
            CliError::DeviceLoader(msg) => write!(f, "failed to load OpenGL: {msg}"),
            CliError::Viewer(e) => write!(f, "{e}"),
            CliError::Present(msg) => write!(f, "failed to present frame: {msg}"),
            CliError::Config(e) => write!(f, "{e}"),
            CliError::Serialization(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for CliError {}

impl From<ViewerError> for CliError {
    fn from(e: ViewerError) -> Self {
        match e {
            ViewerError::Config(config) => CliError::Config(config),
            other => CliError::Viewer(other),
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Config(e)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        CliError::Serialization(e.to_string())
    }
}
