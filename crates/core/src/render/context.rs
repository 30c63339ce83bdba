//! Graphics device abstraction.
//!
//! Every device call goes through [`GraphicsContext`] instead of an implicit
//! thread-global GL state. [`GlowContext`] forwards to a live `glow::Context`;
//! [`RecordingContext`](super::recording::RecordingContext) is a headless
//! stand-in that records calls for tests.
//!
//! Enum-like arguments (`usage`, `mode`, `mask`, texture parameters) use the
//! `glow` constants directly.

use std::fmt;
use std::num::NonZeroU32;

use super::shader::ShaderStage;
use super::texture::ChannelFormat;

/// The narrow set of device operations the viewer needs.
///
/// All methods take `&self`: the device is a single-threaded state machine
/// and implementors use interior mutability where they track state.
pub trait GraphicsContext {
    type Shader: Copy + Eq + fmt::Debug;
    type Program: Copy + Eq + fmt::Debug;
    type Texture: Copy + Eq + fmt::Debug;
    type VertexArray: Copy + Eq + fmt::Debug;
    type Buffer: Copy + Eq + fmt::Debug;
    type UniformLocation: fmt::Debug;

    fn create_shader(&self, stage: ShaderStage) -> Result<Self::Shader, String>;
    fn shader_source(&self, shader: Self::Shader, source: &str);
    fn compile_shader(&self, shader: Self::Shader);
    fn shader_compile_status(&self, shader: Self::Shader) -> bool;
    fn shader_info_log(&self, shader: Self::Shader) -> String;
    fn delete_shader(&self, shader: Self::Shader);

    fn create_program(&self) -> Result<Self::Program, String>;
    fn attach_shader(&self, program: Self::Program, shader: Self::Shader);
    fn detach_shader(&self, program: Self::Program, shader: Self::Shader);
    fn link_program(&self, program: Self::Program);
    fn program_link_status(&self, program: Self::Program) -> bool;
    fn program_info_log(&self, program: Self::Program) -> String;
    fn use_program(&self, program: Option<Self::Program>);
    /// The program currently selected for draw calls, if any.
    fn current_program(&self) -> Option<Self::Program>;
    fn delete_program(&self, program: Self::Program);
    fn uniform_location(&self, program: Self::Program, name: &str)
        -> Option<Self::UniformLocation>;
    fn uniform_1_i32(&self, location: &Self::UniformLocation, value: i32);

    fn create_vertex_array(&self) -> Result<Self::VertexArray, String>;
    fn bind_vertex_array(&self, vertex_array: Option<Self::VertexArray>);
    fn delete_vertex_array(&self, vertex_array: Self::VertexArray);
    fn create_buffer(&self) -> Result<Self::Buffer, String>;
    fn bind_array_buffer(&self, buffer: Option<Self::Buffer>);
    fn array_buffer_data_f32(&self, data: &[f32], usage: u32);
    /// Describes a float attribute; `stride` and `offset` are in bytes.
    fn vertex_attrib_pointer_f32(&self, index: u32, size: i32, stride: i32, offset: i32);
    fn enable_vertex_attrib_array(&self, index: u32);
    fn delete_buffer(&self, buffer: Self::Buffer);

    fn create_texture(&self) -> Result<Self::Texture, String>;
    fn active_texture(&self, unit: u32);
    fn bind_texture_2d(&self, texture: Option<Self::Texture>);
    fn tex_parameter_2d(&self, parameter: u32, value: i32);
    fn unpack_alignment(&self, alignment: i32);
    /// Uploads level 0 of the bound 2D texture as 8-bit `format` pixels.
    fn tex_image_2d(&self, format: ChannelFormat, width: i32, height: i32, pixels: &[u8]);
    fn generate_mipmap_2d(&self);
    fn delete_texture(&self, texture: Self::Texture);

    fn viewport(&self, x: i32, y: i32, width: i32, height: i32);
    fn clear_color(&self, r: f32, g: f32, b: f32, a: f32);
    fn clear(&self, mask: u32);
    fn draw_arrays(&self, mode: u32, first: i32, count: i32);
}

/// Wraps a `glow::Context` loaded from the windowing library.
///
/// Created once after the GL context is made current. Construction doubles
/// as the loader check: a context whose function pointers failed to load
/// reports no version string.
pub struct GlowContext {
    gl: glow::Context,
    version: String,
}

impl GlowContext {
    /// Wraps `gl` and reads back the driver's version string.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver reports an empty version, which means
    /// the GL entry points were not loaded.
    #[allow(unsafe_code)]
    pub fn new(gl: glow::Context) -> Result<Self, String> {
        use glow::HasContext;

        // SAFETY: glGetString(GL_VERSION) has no preconditions beyond a
        // current context, which the caller established before loading.
        let version = unsafe { gl.get_parameter_string(glow::VERSION) };
        if version.trim().is_empty() {
            return Err("OpenGL entry points failed to load (empty GL_VERSION)".to_string());
        }

        Ok(Self { gl, version })
    }

    /// Returns a reference to the underlying `glow::Context`.
    pub fn gl(&self) -> &glow::Context {
        &self.gl
    }

    /// The driver's `GL_VERSION` string.
    pub fn version(&self) -> &str {
        &self.version
    }
}

// SAFETY (whole impl): glow marks every raw GL call unsafe. All handles passed
// in were produced by this same context, enum arguments are glow constants,
// and uploads pass slices whose length matches the declared dimensions.
#[allow(unsafe_code)]
impl GraphicsContext for GlowContext {
    type Shader = glow::Shader;
    type Program = glow::Program;
    type Texture = glow::Texture;
    type VertexArray = glow::VertexArray;
    type Buffer = glow::Buffer;
    type UniformLocation = glow::UniformLocation;

    fn create_shader(&self, stage: ShaderStage) -> Result<glow::Shader, String> {
        use glow::HasContext;
        unsafe { self.gl.create_shader(stage.gl_type()) }
    }

    fn shader_source(&self, shader: glow::Shader, source: &str) {
        use glow::HasContext;
        unsafe { self.gl.shader_source(shader, source) }
    }

    fn compile_shader(&self, shader: glow::Shader) {
        use glow::HasContext;
        unsafe { self.gl.compile_shader(shader) }
    }

    fn shader_compile_status(&self, shader: glow::Shader) -> bool {
        use glow::HasContext;
        unsafe { self.gl.get_shader_compile_status(shader) }
    }

    fn shader_info_log(&self, shader: glow::Shader) -> String {
        use glow::HasContext;
        unsafe { self.gl.get_shader_info_log(shader) }
    }

    fn delete_shader(&self, shader: glow::Shader) {
        use glow::HasContext;
        unsafe { self.gl.delete_shader(shader) }
    }

    fn create_program(&self) -> Result<glow::Program, String> {
        use glow::HasContext;
        unsafe { self.gl.create_program() }
    }

    fn attach_shader(&self, program: glow::Program, shader: glow::Shader) {
        use glow::HasContext;
        unsafe { self.gl.attach_shader(program, shader) }
    }

    fn detach_shader(&self, program: glow::Program, shader: glow::Shader) {
        use glow::HasContext;
        unsafe { self.gl.detach_shader(program, shader) }
    }

    fn link_program(&self, program: glow::Program) {
        use glow::HasContext;
        unsafe { self.gl.link_program(program) }
    }

    fn program_link_status(&self, program: glow::Program) -> bool {
        use glow::HasContext;
        unsafe { self.gl.get_program_link_status(program) }
    }

    fn program_info_log(&self, program: glow::Program) -> String {
        use glow::HasContext;
        unsafe { self.gl.get_program_info_log(program) }
    }

    fn use_program(&self, program: Option<glow::Program>) {
        use glow::HasContext;
        unsafe { self.gl.use_program(program) }
    }

    fn current_program(&self) -> Option<glow::Program> {
        use glow::HasContext;
        let id = unsafe { self.gl.get_parameter_i32(glow::CURRENT_PROGRAM) };
        u32::try_from(id)
            .ok()
            .and_then(NonZeroU32::new)
            .map(glow::NativeProgram)
    }

    fn delete_program(&self, program: glow::Program) {
        use glow::HasContext;
        unsafe { self.gl.delete_program(program) }
    }

    fn uniform_location(&self, program: glow::Program, name: &str) -> Option<glow::UniformLocation> {
        use glow::HasContext;
        unsafe { self.gl.get_uniform_location(program, name) }
    }

    fn uniform_1_i32(&self, location: &glow::UniformLocation, value: i32) {
        use glow::HasContext;
        unsafe { self.gl.uniform_1_i32(Some(location), value) }
    }

    fn create_vertex_array(&self) -> Result<glow::VertexArray, String> {
        use glow::HasContext;
        unsafe { self.gl.create_vertex_array() }
    }

    fn bind_vertex_array(&self, vertex_array: Option<glow::VertexArray>) {
        use glow::HasContext;
        unsafe { self.gl.bind_vertex_array(vertex_array) }
    }

    fn delete_vertex_array(&self, vertex_array: glow::VertexArray) {
        use glow::HasContext;
        unsafe { self.gl.delete_vertex_array(vertex_array) }
    }

    fn create_buffer(&self) -> Result<glow::Buffer, String> {
        use glow::HasContext;
        unsafe { self.gl.create_buffer() }
    }

    fn bind_array_buffer(&self, buffer: Option<glow::Buffer>) {
        use glow::HasContext;
        unsafe { self.gl.bind_buffer(glow::ARRAY_BUFFER, buffer) }
    }

    fn array_buffer_data_f32(&self, data: &[f32], usage: u32) {
        use glow::HasContext;
        unsafe {
            self.gl
                .buffer_data_u8_slice(glow::ARRAY_BUFFER, bytemuck::cast_slice(data), usage)
        }
    }

    fn vertex_attrib_pointer_f32(&self, index: u32, size: i32, stride: i32, offset: i32) {
        use glow::HasContext;
        unsafe {
            self.gl
                .vertex_attrib_pointer_f32(index, size, glow::FLOAT, false, stride, offset)
        }
    }

    fn enable_vertex_attrib_array(&self, index: u32) {
        use glow::HasContext;
        unsafe { self.gl.enable_vertex_attrib_array(index) }
    }

    fn delete_buffer(&self, buffer: glow::Buffer) {
        use glow::HasContext;
        unsafe { self.gl.delete_buffer(buffer) }
    }

    fn create_texture(&self) -> Result<glow::Texture, String> {
        use glow::HasContext;
        unsafe { self.gl.create_texture() }
    }

    fn active_texture(&self, unit: u32) {
        use glow::HasContext;
        unsafe { self.gl.active_texture(unit) }
    }

    fn bind_texture_2d(&self, texture: Option<glow::Texture>) {
        use glow::HasContext;
        unsafe { self.gl.bind_texture(glow::TEXTURE_2D, texture) }
    }

    fn tex_parameter_2d(&self, parameter: u32, value: i32) {
        use glow::HasContext;
        unsafe { self.gl.tex_parameter_i32(glow::TEXTURE_2D, parameter, value) }
    }

    fn unpack_alignment(&self, alignment: i32) {
        use glow::HasContext;
        unsafe { self.gl.pixel_store_i32(glow::UNPACK_ALIGNMENT, alignment) }
    }

    fn tex_image_2d(&self, format: ChannelFormat, width: i32, height: i32, pixels: &[u8]) {
        use glow::HasContext;
        unsafe {
            self.gl.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                format.gl_format() as i32,
                width,
                height,
                0,
                format.gl_format(),
                glow::UNSIGNED_BYTE,
                glow::PixelUnpackData::Slice(Some(pixels)),
            );
        }
    }

    fn generate_mipmap_2d(&self) {
        use glow::HasContext;
        unsafe { self.gl.generate_mipmap(glow::TEXTURE_2D) }
    }

    fn delete_texture(&self, texture: glow::Texture) {
        use glow::HasContext;
        unsafe { self.gl.delete_texture(texture) }
    }

    fn viewport(&self, x: i32, y: i32, width: i32, height: i32) {
        use glow::HasContext;
        unsafe { self.gl.viewport(x, y, width, height) }
    }

    fn clear_color(&self, r: f32, g: f32, b: f32, a: f32) {
        use glow::HasContext;
        unsafe { self.gl.clear_color(r, g, b, a) }
    }

    fn clear(&self, mask: u32) {
        use glow::HasContext;
        unsafe { self.gl.clear(mask) }
    }

    fn draw_arrays(&self, mode: u32, first: i32, count: i32) {
        use glow::HasContext;
        unsafe { self.gl.draw_arrays(mode, first, count) }
    }
}
