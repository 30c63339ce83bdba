//! OpenGL rendering infrastructure.
//!
//! Every type here issues device calls through a [`GraphicsContext`], either
//! a live [`GlowContext`] or the headless [`RecordingContext`].
//!
//! # Module overview
//!
//! - [`context`] -- the device trait and the `glow` implementation.
//! - [`shader`] -- shader compilation, linking, and the owned program.
//! - [`texture`] -- image decoding, channel formats, and texture upload.
//! - [`quad`] -- fullscreen quad geometry and passthrough shaders.
//! - [`recording`] -- call-recording device for tests and headless runs.

pub mod context;
pub mod quad;
pub mod recording;
pub mod shader;
pub mod texture;

// Re-export key types at the render module level for convenience.
pub use context::{GlowContext, GraphicsContext};
pub use quad::{MeshError, QuadMesh, QUAD_FRAGMENT_SHADER, QUAD_VERTEX_SHADER, QUAD_VERTICES};
pub use recording::RecordingContext;
pub use shader::{
    compile_program, compile_shader, format_shader_error, link_program, ShaderError,
    ShaderProgram, ShaderSource, ShaderStage,
};
pub use texture::{
    decode_image, ChannelFormat, DecodedImage, Texture, TextureConfig, TextureError,
    UnsupportedChannelCount,
};
