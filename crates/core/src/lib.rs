#![deny(unsafe_code)]
//! Core of the texquad viewer.
//!
//! Provides the `GraphicsContext` device abstraction (live `glow` backend and
//! a call-recording backend), the owned `ShaderProgram`, image decoding and
//! `Texture` upload, the fullscreen `QuadMesh`, `ViewerConfig`, and the
//! `Viewer` that ties them together behind named event handlers.

pub mod config;
pub mod error;
pub mod render;
pub mod viewer;

pub use config::{GlVersion, ViewerConfig};
pub use error::{ConfigError, ViewerError};
pub use render::{GlowContext, GraphicsContext, RecordingContext, ShaderProgram};
pub use viewer::{Key, Viewer};
