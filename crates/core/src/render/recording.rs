//! Headless [`GraphicsContext`] that records every call.
//!
//! `RecordingContext` keeps enough device state to answer the questions the
//! viewer's tests ask: which objects are alive, what is bound, what was
//! uploaded, and what was drawn. Failures can be injected per operation.
//! It does not rasterize; [`RecordingContext::sample_texture`] reads texels
//! straight from the recorded upload.

use std::cell::RefCell;
use std::collections::HashMap;

use super::context::GraphicsContext;
use super::shader::ShaderStage;
use super::texture::ChannelFormat;

/// Opaque object name handed out by the recording device. Never zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordedId(u32);

/// A uniform resolved against a linked program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedUniform {
    program: RecordedId,
    name: String,
}

/// One device call, in issue order.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    CreateShader(ShaderStage),
    CompileShader(ShaderStage),
    DeleteShader(RecordedId),
    CreateProgram(RecordedId),
    AttachShader { program: RecordedId, shader: RecordedId },
    DetachShader { program: RecordedId, shader: RecordedId },
    LinkProgram(RecordedId),
    UseProgram(Option<RecordedId>),
    DeleteProgram(RecordedId),
    Uniform1i { name: String, value: i32 },
    CreateVertexArray(RecordedId),
    BindVertexArray(Option<RecordedId>),
    DeleteVertexArray(RecordedId),
    CreateBuffer(RecordedId),
    BindArrayBuffer(Option<RecordedId>),
    BufferData { floats: usize, usage: u32 },
    VertexAttribPointer { index: u32, size: i32, stride: i32, offset: i32 },
    EnableVertexAttribArray(u32),
    DeleteBuffer(RecordedId),
    CreateTexture(RecordedId),
    ActiveTexture(u32),
    BindTexture(Option<RecordedId>),
    TexParameter { parameter: u32, value: i32 },
    UnpackAlignment(i32),
    TexImage2D { format: ChannelFormat, width: i32, height: i32 },
    GenerateMipmap,
    DeleteTexture(RecordedId),
    Viewport { x: i32, y: i32, width: i32, height: i32 },
    ClearColor([f32; 4]),
    Clear(u32),
    DrawArrays { mode: u32, first: i32, count: i32 },
}

/// A vertex attribute as described on a vertex array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttribute {
    pub index: u32,
    pub size: i32,
    pub stride: i32,
    pub offset: i32,
    pub enabled: bool,
}

/// Level 0 of a 2D texture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureImage {
    pub format: ChannelFormat,
    pub width: i32,
    pub height: i32,
    pub pixels: Vec<u8>,
    pub mipmapped: bool,
}

/// State captured when a draw call was issued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawCall {
    pub mode: u32,
    pub first: i32,
    pub count: i32,
    pub program: Option<RecordedId>,
    pub vertex_array: Option<RecordedId>,
    /// Texture bound to unit 0.
    pub texture: Option<RecordedId>,
}

#[derive(Debug)]
struct ShaderState {
    stage: ShaderStage,
    source: String,
    compiled: bool,
}

#[derive(Debug, Default)]
struct ProgramState {
    attached: Vec<RecordedId>,
    linked: bool,
    info_log: String,
    uniforms: HashMap<String, Option<i32>>,
}

#[derive(Debug, Default)]
struct TextureState {
    parameters: HashMap<u32, i32>,
    image: Option<TextureImage>,
}

#[derive(Debug)]
struct State {
    next_id: u32,
    calls: Vec<Call>,

    shaders: HashMap<RecordedId, ShaderState>,
    created_shaders: usize,
    last_sources: HashMap<ShaderStage, String>,
    programs: HashMap<RecordedId, ProgramState>,
    deleted_programs: usize,
    current_program: Option<RecordedId>,

    vertex_arrays: HashMap<RecordedId, Vec<VertexAttribute>>,
    bound_vertex_array: Option<RecordedId>,
    buffers: HashMap<RecordedId, Vec<f32>>,
    bound_array_buffer: Option<RecordedId>,

    textures: HashMap<RecordedId, TextureState>,
    active_unit: u32,
    bound_textures: HashMap<u32, RecordedId>,
    unpack_alignment: i32,

    viewport: (i32, i32, i32, i32),
    clear_color: [f32; 4],
    clears: Vec<u32>,
    draws: Vec<DrawCall>,
    invalid_operations: Vec<String>,

    compile_failures: HashMap<ShaderStage, String>,
    link_failure: Option<String>,
    buffer_failure: Option<String>,
    texture_failure: Option<String>,
}

impl Default for State {
    fn default() -> Self {
        Self {
            next_id: 0,
            calls: Vec::new(),
            shaders: HashMap::new(),
            created_shaders: 0,
            last_sources: HashMap::new(),
            programs: HashMap::new(),
            deleted_programs: 0,
            current_program: None,
            vertex_arrays: HashMap::new(),
            bound_vertex_array: None,
            buffers: HashMap::new(),
            bound_array_buffer: None,
            textures: HashMap::new(),
            active_unit: 0,
            bound_textures: HashMap::new(),
            unpack_alignment: 4,
            viewport: (0, 0, 0, 0),
            clear_color: [0.0; 4],
            clears: Vec::new(),
            draws: Vec::new(),
            invalid_operations: Vec::new(),
            compile_failures: HashMap::new(),
            link_failure: None,
            buffer_failure: None,
            texture_failure: None,
        }
    }
}

impl State {
    fn next_id(&mut self) -> RecordedId {
        self.next_id += 1;
        RecordedId(self.next_id)
    }

    fn invalid(&mut self, what: String) {
        self.invalid_operations.push(what);
    }
}

/// Recording device. See the module docs.
#[derive(Debug, Default)]
pub struct RecordingContext {
    state: RefCell<State>,
}

/// Pulls `name` out of a GLSL line like `uniform sampler2D name;`.
fn uniform_name(line: &str) -> Option<&str> {
    let rest = line.trim().strip_prefix("uniform ")?;
    let declaration = rest.split(';').next()?;
    let name = declaration.split_whitespace().last()?;
    Some(name.split('[').next().unwrap_or(name))
}

impl RecordingContext {
    pub fn new() -> Self {
        Self::default()
    }

    // --- failure injection ---

    /// Makes every later compile of `stage` fail with `log`.
    pub fn fail_compile(&self, stage: ShaderStage, log: &str) {
        self.state
            .borrow_mut()
            .compile_failures
            .insert(stage, log.to_string());
    }

    /// Makes every later link fail with `log`.
    pub fn fail_link(&self, log: &str) {
        self.state.borrow_mut().link_failure = Some(log.to_string());
    }

    pub fn fail_buffer_creation(&self, message: &str) {
        self.state.borrow_mut().buffer_failure = Some(message.to_string());
    }

    pub fn fail_texture_creation(&self, message: &str) {
        self.state.borrow_mut().texture_failure = Some(message.to_string());
    }

    // --- inspection ---

    pub fn calls(&self) -> Vec<Call> {
        self.state.borrow().calls.clone()
    }

    pub fn live_shaders(&self) -> usize {
        self.state.borrow().shaders.len()
    }

    pub fn created_shaders(&self) -> usize {
        self.state.borrow().created_shaders
    }

    /// The most recent source submitted for `stage`.
    pub fn shader_source_of(&self, stage: ShaderStage) -> Option<String> {
        self.state.borrow().last_sources.get(&stage).cloned()
    }

    pub fn live_programs(&self) -> usize {
        self.state.borrow().programs.len()
    }

    pub fn deleted_programs(&self) -> usize {
        self.state.borrow().deleted_programs
    }

    /// Value last assigned to `name` on `program`.
    pub fn uniform_value(&self, program: RecordedId, name: &str) -> Option<i32> {
        self.state
            .borrow()
            .programs
            .get(&program)
            .and_then(|p| p.uniforms.get(name).copied().flatten())
    }

    pub fn live_vertex_arrays(&self) -> usize {
        self.state.borrow().vertex_arrays.len()
    }

    pub fn vertex_attributes(&self, vertex_array: RecordedId) -> Vec<VertexAttribute> {
        let mut attributes = self
            .state
            .borrow()
            .vertex_arrays
            .get(&vertex_array)
            .cloned()
            .unwrap_or_default();
        attributes.sort_by_key(|a| a.index);
        attributes
    }

    pub fn bound_vertex_array(&self) -> Option<RecordedId> {
        self.state.borrow().bound_vertex_array
    }

    pub fn live_buffers(&self) -> usize {
        self.state.borrow().buffers.len()
    }

    /// Contents uploaded to `buffer`.
    pub fn buffer_data(&self, buffer: RecordedId) -> Option<Vec<f32>> {
        self.state.borrow().buffers.get(&buffer).cloned()
    }

    pub fn live_textures(&self) -> usize {
        self.state.borrow().textures.len()
    }

    pub fn texture_parameters(&self, texture: RecordedId) -> HashMap<u32, i32> {
        self.state
            .borrow()
            .textures
            .get(&texture)
            .map(|t| t.parameters.clone())
            .unwrap_or_default()
    }

    pub fn texture_image(&self, texture: RecordedId) -> Option<TextureImage> {
        self.state
            .borrow()
            .textures
            .get(&texture)
            .and_then(|t| t.image.clone())
    }

    pub fn unpack_alignment_value(&self) -> i32 {
        self.state.borrow().unpack_alignment
    }

    /// Nearest-texel RGBA lookup of `texture` at `(u, v)` with REPEAT
    /// wrapping. Row 0 is `v = 0`. Missing channels read as GL does: green
    /// and blue 0, alpha 255.
    pub fn sample_texture(&self, texture: RecordedId, u: f32, v: f32) -> Option<[u8; 4]> {
        let image = self.texture_image(texture)?;
        if image.width <= 0 || image.height <= 0 {
            return None;
        }
        let (w, h) = (i64::from(image.width), i64::from(image.height));
        let x = ((u * w as f32).floor() as i64).rem_euclid(w) as usize;
        let y = ((v * h as f32).floor() as i64).rem_euclid(h) as usize;
        let channels = image.format.channels();
        let start = (y * image.width as usize + x) * channels;
        let texel = image.pixels.get(start..start + channels)?;
        Some(match image.format {
            ChannelFormat::Red => [texel[0], 0, 0, 255],
            ChannelFormat::Rgb => [texel[0], texel[1], texel[2], 255],
            ChannelFormat::Rgba => [texel[0], texel[1], texel[2], texel[3]],
        })
    }

    pub fn viewport_value(&self) -> (i32, i32, i32, i32) {
        self.state.borrow().viewport
    }

    pub fn clear_color_value(&self) -> [f32; 4] {
        self.state.borrow().clear_color
    }

    pub fn clears(&self) -> Vec<u32> {
        self.state.borrow().clears.clone()
    }

    pub fn draws(&self) -> Vec<DrawCall> {
        self.state.borrow().draws.clone()
    }

    /// Calls a real driver would reject (unknown handles, double deletes,
    /// draws without a program, ...).
    pub fn invalid_operations(&self) -> Vec<String> {
        self.state.borrow().invalid_operations.clone()
    }
}

impl GraphicsContext for RecordingContext {
    type Shader = RecordedId;
    type Program = RecordedId;
    type Texture = RecordedId;
    type VertexArray = RecordedId;
    type Buffer = RecordedId;
    type UniformLocation = RecordedUniform;

    fn create_shader(&self, stage: ShaderStage) -> Result<RecordedId, String> {
        let mut s = self.state.borrow_mut();
        s.calls.push(Call::CreateShader(stage));
        let id = s.next_id();
        s.shaders.insert(
            id,
            ShaderState {
                stage,
                source: String::new(),
                compiled: false,
            },
        );
        s.created_shaders += 1;
        Ok(id)
    }

    fn shader_source(&self, shader: RecordedId, source: &str) {
        let mut s = self.state.borrow_mut();
        let Some(state) = s.shaders.get_mut(&shader) else {
            s.invalid(format!("shader_source on unknown shader {shader:?}"));
            return;
        };
        state.source = source.to_string();
        let stage = state.stage;
        s.last_sources.insert(stage, source.to_string());
    }

    fn compile_shader(&self, shader: RecordedId) {
        let mut s = self.state.borrow_mut();
        let Some(stage) = s.shaders.get(&shader).map(|sh| sh.stage) else {
            s.invalid(format!("compile_shader on unknown shader {shader:?}"));
            return;
        };
        s.calls.push(Call::CompileShader(stage));
        let compiled = !s.compile_failures.contains_key(&stage);
        if let Some(state) = s.shaders.get_mut(&shader) {
            state.compiled = compiled;
        }
    }

    fn shader_compile_status(&self, shader: RecordedId) -> bool {
        self.state
            .borrow()
            .shaders
            .get(&shader)
            .is_some_and(|sh| sh.compiled)
    }

    fn shader_info_log(&self, shader: RecordedId) -> String {
        let s = self.state.borrow();
        s.shaders
            .get(&shader)
            .filter(|sh| !sh.compiled)
            .and_then(|sh| s.compile_failures.get(&sh.stage).cloned())
            .unwrap_or_default()
    }

    fn delete_shader(&self, shader: RecordedId) {
        let mut s = self.state.borrow_mut();
        s.calls.push(Call::DeleteShader(shader));
        if s.shaders.remove(&shader).is_none() {
            s.invalid(format!("delete of unknown shader {shader:?}"));
        }
    }

    fn create_program(&self) -> Result<RecordedId, String> {
        let mut s = self.state.borrow_mut();
        let id = s.next_id();
        s.calls.push(Call::CreateProgram(id));
        s.programs.insert(id, ProgramState::default());
        Ok(id)
    }

    fn attach_shader(&self, program: RecordedId, shader: RecordedId) {
        let mut s = self.state.borrow_mut();
        s.calls.push(Call::AttachShader { program, shader });
        if !s.shaders.contains_key(&shader) {
            s.invalid(format!("attach of unknown shader {shader:?}"));
            return;
        }
        match s.programs.get_mut(&program) {
            Some(p) => p.attached.push(shader),
            None => s.invalid(format!("attach to unknown program {program:?}")),
        }
    }

    fn detach_shader(&self, program: RecordedId, shader: RecordedId) {
        let mut s = self.state.borrow_mut();
        s.calls.push(Call::DetachShader { program, shader });
        match s.programs.get_mut(&program) {
            Some(p) => p.attached.retain(|&a| a != shader),
            None => s.invalid(format!("detach from unknown program {program:?}")),
        }
    }

    fn link_program(&self, program: RecordedId) {
        let mut s = self.state.borrow_mut();
        s.calls.push(Call::LinkProgram(program));
        let Some(attached) = s.programs.get(&program).map(|p| p.attached.clone()) else {
            s.invalid(format!("link of unknown program {program:?}"));
            return;
        };

        let stages: Vec<&ShaderState> = attached.iter().filter_map(|id| s.shaders.get(id)).collect();
        let has_stage = |stage: ShaderStage| stages.iter().any(|sh| sh.stage == stage && sh.compiled);
        let failure = if let Some(log) = &s.link_failure {
            Some(log.clone())
        } else if !has_stage(ShaderStage::Vertex) || !has_stage(ShaderStage::Fragment) {
            Some("program needs a compiled vertex and fragment shader".to_string())
        } else {
            None
        };
        let uniforms: HashMap<String, Option<i32>> = stages
            .iter()
            .flat_map(|sh| sh.source.lines())
            .filter_map(uniform_name)
            .map(|name| (name.to_string(), None))
            .collect();

        if let Some(p) = s.programs.get_mut(&program) {
            match failure {
                Some(log) => {
                    p.linked = false;
                    p.info_log = log;
                }
                None => {
                    p.linked = true;
                    p.uniforms = uniforms;
                }
            }
        }
    }

    fn program_link_status(&self, program: RecordedId) -> bool {
        self.state
            .borrow()
            .programs
            .get(&program)
            .is_some_and(|p| p.linked)
    }

    fn program_info_log(&self, program: RecordedId) -> String {
        self.state
            .borrow()
            .programs
            .get(&program)
            .map(|p| p.info_log.clone())
            .unwrap_or_default()
    }

    fn use_program(&self, program: Option<RecordedId>) {
        let mut s = self.state.borrow_mut();
        s.calls.push(Call::UseProgram(program));
        match program {
            None => s.current_program = None,
            Some(id) if s.programs.get(&id).is_some_and(|p| p.linked) => {
                s.current_program = Some(id)
            }
            Some(id) => s.invalid(format!("use of unlinked or unknown program {id:?}")),
        }
    }

    fn current_program(&self) -> Option<RecordedId> {
        self.state.borrow().current_program
    }

    fn delete_program(&self, program: RecordedId) {
        let mut s = self.state.borrow_mut();
        s.calls.push(Call::DeleteProgram(program));
        if s.programs.remove(&program).is_some() {
            s.deleted_programs += 1;
            if s.current_program == Some(program) {
                s.current_program = None;
            }
        } else {
            s.invalid(format!("delete of unknown program {program:?}"));
        }
    }

    fn uniform_location(&self, program: RecordedId, name: &str) -> Option<RecordedUniform> {
        let s = self.state.borrow();
        let p = s.programs.get(&program).filter(|p| p.linked)?;
        p.uniforms.contains_key(name).then(|| RecordedUniform {
            program,
            name: name.to_string(),
        })
    }

    fn uniform_1_i32(&self, location: &RecordedUniform, value: i32) {
        let mut s = self.state.borrow_mut();
        s.calls.push(Call::Uniform1i {
            name: location.name.clone(),
            value,
        });
        if s.current_program != Some(location.program) {
            s.invalid(format!("uniform '{}' set on a program that is not current", location.name));
            return;
        }
        if let Some(p) = s.programs.get_mut(&location.program) {
            p.uniforms.insert(location.name.clone(), Some(value));
        }
    }

    fn create_vertex_array(&self) -> Result<RecordedId, String> {
        let mut s = self.state.borrow_mut();
        let id = s.next_id();
        s.calls.push(Call::CreateVertexArray(id));
        s.vertex_arrays.insert(id, Vec::new());
        Ok(id)
    }

    fn bind_vertex_array(&self, vertex_array: Option<RecordedId>) {
        let mut s = self.state.borrow_mut();
        s.calls.push(Call::BindVertexArray(vertex_array));
        if let Some(id) = vertex_array {
            if !s.vertex_arrays.contains_key(&id) {
                s.invalid(format!("bind of unknown vertex array {id:?}"));
                return;
            }
        }
        s.bound_vertex_array = vertex_array;
    }

    fn delete_vertex_array(&self, vertex_array: RecordedId) {
        let mut s = self.state.borrow_mut();
        s.calls.push(Call::DeleteVertexArray(vertex_array));
        if s.vertex_arrays.remove(&vertex_array).is_none() {
            s.invalid(format!("delete of unknown vertex array {vertex_array:?}"));
        }
        if s.bound_vertex_array == Some(vertex_array) {
            s.bound_vertex_array = None;
        }
    }

    fn create_buffer(&self) -> Result<RecordedId, String> {
        let mut s = self.state.borrow_mut();
        if let Some(message) = s.buffer_failure.clone() {
            return Err(message);
        }
        let id = s.next_id();
        s.calls.push(Call::CreateBuffer(id));
        s.buffers.insert(id, Vec::new());
        Ok(id)
    }

    fn bind_array_buffer(&self, buffer: Option<RecordedId>) {
        let mut s = self.state.borrow_mut();
        s.calls.push(Call::BindArrayBuffer(buffer));
        s.bound_array_buffer = buffer;
    }

    fn array_buffer_data_f32(&self, data: &[f32], usage: u32) {
        let mut s = self.state.borrow_mut();
        s.calls.push(Call::BufferData {
            floats: data.len(),
            usage,
        });
        let Some(bound) = s.bound_array_buffer else {
            s.invalid("buffer data with no array buffer bound".to_string());
            return;
        };
        match s.buffers.get_mut(&bound) {
            Some(buffer) => *buffer = data.to_vec(),
            None => s.invalid(format!("buffer data on unknown buffer {bound:?}")),
        }
    }

    fn vertex_attrib_pointer_f32(&self, index: u32, size: i32, stride: i32, offset: i32) {
        let mut s = self.state.borrow_mut();
        s.calls.push(Call::VertexAttribPointer {
            index,
            size,
            stride,
            offset,
        });
        if s.bound_array_buffer.is_none() {
            s.invalid("attribute pointer with no array buffer bound".to_string());
            return;
        }
        let Some(vao) = s.bound_vertex_array else {
            s.invalid("attribute pointer with no vertex array bound".to_string());
            return;
        };
        if let Some(attributes) = s.vertex_arrays.get_mut(&vao) {
            attributes.retain(|a| a.index != index);
            attributes.push(VertexAttribute {
                index,
                size,
                stride,
                offset,
                enabled: false,
            });
        }
    }

    fn enable_vertex_attrib_array(&self, index: u32) {
        let mut s = self.state.borrow_mut();
        s.calls.push(Call::EnableVertexAttribArray(index));
        let mut enabled = false;
        if let Some(vao) = s.bound_vertex_array {
            let attribute = s
                .vertex_arrays
                .get_mut(&vao)
                .and_then(|attributes| attributes.iter_mut().find(|a| a.index == index));
            if let Some(attribute) = attribute {
                attribute.enabled = true;
                enabled = true;
            }
        }
        if !enabled {
            s.invalid(format!("enable of undescribed attribute {index}"));
        }
    }

    fn delete_buffer(&self, buffer: RecordedId) {
        let mut s = self.state.borrow_mut();
        s.calls.push(Call::DeleteBuffer(buffer));
        if s.buffers.remove(&buffer).is_none() {
            s.invalid(format!("delete of unknown buffer {buffer:?}"));
        }
        if s.bound_array_buffer == Some(buffer) {
            s.bound_array_buffer = None;
        }
    }

    fn create_texture(&self) -> Result<RecordedId, String> {
        let mut s = self.state.borrow_mut();
        if let Some(message) = s.texture_failure.clone() {
            return Err(message);
        }
        let id = s.next_id();
        s.calls.push(Call::CreateTexture(id));
        s.textures.insert(id, TextureState::default());
        Ok(id)
    }

    fn active_texture(&self, unit: u32) {
        let mut s = self.state.borrow_mut();
        s.calls.push(Call::ActiveTexture(unit));
        s.active_unit = unit.saturating_sub(glow::TEXTURE0);
    }

    fn bind_texture_2d(&self, texture: Option<RecordedId>) {
        let mut s = self.state.borrow_mut();
        s.calls.push(Call::BindTexture(texture));
        let unit = s.active_unit;
        match texture {
            Some(id) if !s.textures.contains_key(&id) => {
                s.invalid(format!("bind of unknown texture {id:?}"))
            }
            Some(id) => {
                s.bound_textures.insert(unit, id);
            }
            None => {
                s.bound_textures.remove(&unit);
            }
        }
    }

    fn tex_parameter_2d(&self, parameter: u32, value: i32) {
        let mut s = self.state.borrow_mut();
        s.calls.push(Call::TexParameter { parameter, value });
        let unit = s.active_unit;
        let Some(bound) = s.bound_textures.get(&unit).copied() else {
            s.invalid("texture parameter with no texture bound".to_string());
            return;
        };
        if let Some(texture) = s.textures.get_mut(&bound) {
            texture.parameters.insert(parameter, value);
        }
    }

    fn unpack_alignment(&self, alignment: i32) {
        let mut s = self.state.borrow_mut();
        s.calls.push(Call::UnpackAlignment(alignment));
        s.unpack_alignment = alignment;
    }

    fn tex_image_2d(&self, format: ChannelFormat, width: i32, height: i32, pixels: &[u8]) {
        let mut s = self.state.borrow_mut();
        s.calls.push(Call::TexImage2D {
            format,
            width,
            height,
        });
        let unit = s.active_unit;
        let Some(bound) = s.bound_textures.get(&unit).copied() else {
            s.invalid("texture upload with no texture bound".to_string());
            return;
        };
        let expected = width.max(0) as usize * height.max(0) as usize * format.channels();
        if pixels.len() < expected {
            s.invalid(format!(
                "texture upload of {} bytes, {width}x{height} {format:?} needs {expected}",
                pixels.len()
            ));
            return;
        }
        if let Some(texture) = s.textures.get_mut(&bound) {
            texture.image = Some(TextureImage {
                format,
                width,
                height,
                pixels: pixels[..expected].to_vec(),
                mipmapped: false,
            });
        }
    }

    fn generate_mipmap_2d(&self) {
        let mut s = self.state.borrow_mut();
        s.calls.push(Call::GenerateMipmap);
        let unit = s.active_unit;
        let mut generated = false;
        if let Some(id) = s.bound_textures.get(&unit).copied() {
            if let Some(image) = s.textures.get_mut(&id).and_then(|t| t.image.as_mut()) {
                image.mipmapped = true;
                generated = true;
            }
        }
        if !generated {
            s.invalid("mipmap generation without an uploaded image".to_string());
        }
    }

    fn delete_texture(&self, texture: RecordedId) {
        let mut s = self.state.borrow_mut();
        s.calls.push(Call::DeleteTexture(texture));
        if s.textures.remove(&texture).is_none() {
            s.invalid(format!("delete of unknown texture {texture:?}"));
        }
        s.bound_textures.retain(|_, bound| *bound != texture);
    }

    fn viewport(&self, x: i32, y: i32, width: i32, height: i32) {
        let mut s = self.state.borrow_mut();
        s.calls.push(Call::Viewport {
            x,
            y,
            width,
            height,
        });
        s.viewport = (x, y, width, height);
    }

    fn clear_color(&self, r: f32, g: f32, b: f32, a: f32) {
        let mut s = self.state.borrow_mut();
        s.calls.push(Call::ClearColor([r, g, b, a]));
        s.clear_color = [r, g, b, a];
    }

    fn clear(&self, mask: u32) {
        let mut s = self.state.borrow_mut();
        s.calls.push(Call::Clear(mask));
        s.clears.push(mask);
    }

    fn draw_arrays(&self, mode: u32, first: i32, count: i32) {
        let mut s = self.state.borrow_mut();
        s.calls.push(Call::DrawArrays { mode, first, count });
        if s.current_program.is_none() {
            s.invalid("draw with no program in use".to_string());
        }
        let draw = DrawCall {
            mode,
            first,
            count,
            program: s.current_program,
            vertex_array: s.bound_vertex_array,
            texture: s.bound_textures.get(&0).copied(),
        };
        s.draws.push(draw);
    }
}
