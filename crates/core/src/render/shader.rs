//! Shader compilation, linking, and the owned [`ShaderProgram`].
//!
//! Compilation and linking go through a [`GraphicsContext`], so the whole
//! lifecycle can be exercised against the recording device. The formatting
//! utilities are pure string processing.

use std::fmt;
use std::path::PathBuf;
use std::rc::Rc;

use thiserror::Error;

use super::context::GraphicsContext;

/// Upper bound, in bytes, on a driver info log carried in a [`ShaderError`].
pub const INFO_LOG_LIMIT: usize = 512;

/// A programmable pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    /// The GL shader type constant for this stage.
    pub fn gl_type(self) -> u32 {
        match self {
            ShaderStage::Vertex => glow::VERTEX_SHADER,
            ShaderStage::Fragment => glow::FRAGMENT_SHADER,
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStage::Vertex => f.write_str("vertex"),
            ShaderStage::Fragment => f.write_str("fragment"),
        }
    }
}

/// Errors that can occur while building a shader program.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShaderError {
    /// A shader source file could not be read. No device call was made.
    #[error("failed to read shader source {}: {message}", path.display())]
    FileRead {
        path: PathBuf,
        message: String,
    },
    /// A shader stage failed to compile.
    #[error("shader compile error ({stage}):\n{log}")]
    CompileError {
        /// The stage that failed.
        stage: ShaderStage,
        /// Line-numbered source followed by the driver's info log.
        log: String,
    },
    /// The program failed to link.
    #[error("shader link error:\n{0}")]
    LinkError(String),
}

/// Where a stage's GLSL comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShaderSource {
    Inline(String),
    File(PathBuf),
}

impl ShaderSource {
    /// Returns the GLSL text, reading it from disk for [`ShaderSource::File`].
    ///
    /// # Errors
    ///
    /// Returns `ShaderError::FileRead` if the file is missing or unreadable.
    pub fn load(&self) -> Result<String, ShaderError> {
        match self {
            ShaderSource::Inline(text) => Ok(text.clone()),
            ShaderSource::File(path) => {
                std::fs::read_to_string(path).map_err(|e| ShaderError::FileRead {
                    path: path.clone(),
                    message: e.to_string(),
                })
            }
        }
    }
}

/// Cuts a driver info log down to at most [`INFO_LOG_LIMIT`] bytes.
///
/// Trailing NULs and whitespace are dropped. The cut never splits a UTF-8
/// character.
pub fn bound_info_log(log: &str) -> &str {
    let log = log.trim_end_matches(|c: char| c == '\0' || c.is_whitespace());
    if log.len() <= INFO_LOG_LIMIT {
        return log;
    }
    let mut end = INFO_LOG_LIMIT;
    while !log.is_char_boundary(end) {
        end -= 1;
    }
    &log[..end]
}

/// Line-numbered `source` followed by the driver `log`.
///
/// Driver messages cite line numbers; numbering the GLSL next to them lets a
/// reader find the offending line. Either input may be empty.
pub fn format_shader_error(source: &str, log: &str) -> String {
    let line_count = source.lines().count();
    let width = line_count.max(1).to_string().len();

    let numbered = source
        .lines()
        .zip(1..)
        .map(|(line, n)| format!("{n:>width$}: {line}"))
        .collect::<Vec<_>>()
        .join("\n");

    match (numbered.is_empty(), log.is_empty()) {
        (true, true) => String::new(),
        (true, false) => log.to_string(),
        (false, true) => numbered,
        (false, false) => format!("{numbered}\n\n{log}"),
    }
}

/// Compiles a single shader stage.
///
/// On failure the stage object is deleted before returning.
///
/// # Errors
///
/// Returns `ShaderError::CompileError` if the object cannot be created or
/// the GLSL source fails to compile.
pub fn compile_shader<C: GraphicsContext>(
    gl: &C,
    stage: ShaderStage,
    source: &str,
) -> Result<C::Shader, ShaderError> {
    let shader = gl
        .create_shader(stage)
        .map_err(|e| ShaderError::CompileError { stage, log: e })?;

    gl.shader_source(shader, source);
    gl.compile_shader(shader);

    if gl.shader_compile_status(shader) {
        Ok(shader)
    } else {
        let info_log = gl.shader_info_log(shader);
        gl.delete_shader(shader);
        Err(ShaderError::CompileError {
            stage,
            log: format_shader_error(source, bound_info_log(&info_log)),
        })
    }
}

/// Links a vertex and fragment shader into a program.
///
/// Attaches both shaders, links, and detaches them afterward (the program
/// retains what it needs). On failure the program object is deleted.
///
/// # Errors
///
/// Returns `ShaderError::LinkError` if linking fails.
pub fn link_program<C: GraphicsContext>(
    gl: &C,
    vertex: C::Shader,
    fragment: C::Shader,
) -> Result<C::Program, ShaderError> {
    let program = gl.create_program().map_err(ShaderError::LinkError)?;

    gl.attach_shader(program, vertex);
    gl.attach_shader(program, fragment);
    gl.link_program(program);
    gl.detach_shader(program, vertex);
    gl.detach_shader(program, fragment);

    if gl.program_link_status(program) {
        Ok(program)
    } else {
        let info_log = gl.program_info_log(program);
        gl.delete_program(program);
        Err(ShaderError::LinkError(bound_info_log(&info_log).to_string()))
    }
}

/// Compiles vertex and fragment sources and links them into a program.
///
/// Both stage objects are deleted before returning, whatever the outcome.
///
/// # Errors
///
/// Returns `ShaderError::CompileError` if either shader fails to compile,
/// or `ShaderError::LinkError` if linking fails.
pub fn compile_program<C: GraphicsContext>(
    gl: &C,
    vertex_src: &str,
    fragment_src: &str,
) -> Result<C::Program, ShaderError> {
    let vert = compile_shader(gl, ShaderStage::Vertex, vertex_src)?;
    let frag = match compile_shader(gl, ShaderStage::Fragment, fragment_src) {
        Ok(f) => f,
        Err(e) => {
            gl.delete_shader(vert);
            return Err(e);
        }
    };

    let result = link_program(gl, vert, frag);

    gl.delete_shader(vert);
    gl.delete_shader(frag);

    result
}

/// A linked vertex + fragment program.
///
/// Only constructible in the linked state, so [`use_program`](Self::use_program)
/// has no precondition to check. The device program is deleted exactly once,
/// when the value is dropped.
pub struct ShaderProgram<C: GraphicsContext> {
    gl: Rc<C>,
    program: C::Program,
}

impl<C: GraphicsContext> ShaderProgram<C> {
    /// Loads both sources and builds the program.
    ///
    /// # Errors
    ///
    /// `ShaderError::FileRead` if either source file cannot be read (before
    /// any device call), otherwise as [`compile_program`].
    pub fn new(
        gl: Rc<C>,
        vertex: &ShaderSource,
        fragment: &ShaderSource,
    ) -> Result<Self, ShaderError> {
        let vertex_src = vertex.load()?;
        let fragment_src = fragment.load()?;
        Self::from_sources(gl, &vertex_src, &fragment_src)
    }

    /// Builds the program from in-memory GLSL.
    ///
    /// # Errors
    ///
    /// As [`compile_program`].
    pub fn from_sources(gl: Rc<C>, vertex_src: &str, fragment_src: &str) -> Result<Self, ShaderError> {
        let program = compile_program(&*gl, vertex_src, fragment_src)?;
        log::debug!("linked shader program {program:?}");
        Ok(Self { gl, program })
    }

    /// The device handle of the linked program.
    pub fn handle(&self) -> C::Program {
        self.program
    }

    /// Selects this program for subsequent draw calls.
    pub fn use_program(&self) {
        self.gl.use_program(Some(self.program));
    }

    /// Looks up a uniform by name. `None` if the linker removed or never saw it.
    pub fn uniform_location(&self, name: &str) -> Option<C::UniformLocation> {
        self.gl.uniform_location(self.program, name)
    }

    /// Makes this program current and sets an integer (or sampler) uniform.
    ///
    /// Returns `false` if the uniform does not exist in the linked program.
    pub fn set_uniform_i32(&self, name: &str, value: i32) -> bool {
        match self.uniform_location(name) {
            Some(location) => {
                self.use_program();
                self.gl.uniform_1_i32(&location, value);
                true
            }
            None => {
                log::warn!("uniform '{name}' not found in program {:?}", self.program);
                false
            }
        }
    }

    /// Releases the program now instead of at scope end.
    pub fn destroy(self) {
        drop(self);
    }
}

impl<C: GraphicsContext> Drop for ShaderProgram<C> {
    fn drop(&mut self) {
        if self.gl.current_program() == Some(self.program) {
            self.gl.use_program(None);
        }
        self.gl.delete_program(self.program);
    }
}
