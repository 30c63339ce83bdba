//! Setup and per-frame logic for the textured fullscreen quad.
//!
//! The windowing layer owns the event loop and forwards events to the named
//! handlers here ([`Viewer::on_framebuffer_resized`], [`Viewer::on_key`],
//! [`Viewer::on_close_requested`]). Handlers run synchronously on the thread
//! that owns the GL context.

use std::rc::Rc;

use crate::config::ViewerConfig;
use crate::error::ViewerError;
use crate::render::{
    decode_image, GraphicsContext, QuadMesh, ShaderProgram, Texture, TextureConfig,
};

/// Name of the sampler uniform in the fragment shader.
pub const SAMPLER_UNIFORM: &str = "ourTexture";

/// Texture unit the image is bound to.
pub const TEXTURE_UNIT: u32 = 0;

/// Keys the viewer reacts to. Everything else is `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Escape,
    Other,
}

/// The shader program, quad, and texture, plus loop state.
///
/// Device objects are released when the viewer is dropped, program first.
pub struct Viewer<C: GraphicsContext> {
    gl: Rc<C>,
    program: ShaderProgram<C>,
    quad: QuadMesh<C>,
    texture: Texture<C>,
    texture_loaded: bool,
    clear_color: [f32; 4],
    framebuffer_size: (u32, u32),
    close_requested: bool,
    frames_rendered: u64,
}

impl<C: GraphicsContext> Viewer<C> {
    /// Builds every device resource described by `config`.
    ///
    /// Objects created before a failing step are released on the way out.
    ///
    /// # Errors
    ///
    /// Configuration, shader, and mesh errors are always fatal. A texture
    /// error is fatal unless `config.allow_missing_texture` is set, in which
    /// case it is logged and the texture stays empty.
    pub fn new(gl: Rc<C>, config: &ViewerConfig) -> Result<Self, ViewerError> {
        config.validate()?;

        let program = ShaderProgram::new(
            Rc::clone(&gl),
            &config.vertex_source(),
            &config.fragment_source(),
        )?;
        program.set_uniform_i32(SAMPLER_UNIFORM, TEXTURE_UNIT as i32);

        let quad = QuadMesh::upload(Rc::clone(&gl))?;
        let texture = Texture::create(Rc::clone(&gl), &TextureConfig::default())?;

        let loaded = decode_image(&config.image_path, true).and_then(|image| {
            texture.upload(&image)?;
            Ok(image)
        });
        let texture_loaded = match loaded {
            Ok(image) => {
                log::info!(
                    "loaded {} ({}x{}, {} channels)",
                    config.image_path.display(),
                    image.width(),
                    image.height(),
                    image.channels()
                );
                true
            }
            Err(e) if config.allow_missing_texture => {
                log::error!("{e}; continuing with an empty texture");
                false
            }
            Err(e) => return Err(e.into()),
        };

        let mut viewer = Self {
            gl,
            program,
            quad,
            texture,
            texture_loaded,
            clear_color: config.clear_color,
            framebuffer_size: (config.width, config.height),
            close_requested: false,
            frames_rendered: 0,
        };
        viewer.apply_viewport();
        Ok(viewer)
    }

    /// Framebuffer size handler: the viewport follows the drawable area.
    ///
    /// Zero-sized framebuffers (minimized windows) are ignored.
    pub fn on_framebuffer_resized(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            log::debug!("ignoring resize to {width}x{height}");
            return;
        }
        self.framebuffer_size = (width, height);
        self.apply_viewport();
    }

    /// Key handler: Escape requests close.
    pub fn on_key(&mut self, key: Key, pressed: bool) {
        if pressed && key == Key::Escape {
            log::debug!("escape pressed, closing");
            self.close_requested = true;
        }
    }

    /// Close-request handler.
    pub fn on_close_requested(&mut self) {
        self.close_requested = true;
    }

    /// Checked once per loop iteration.
    pub fn should_close(&self) -> bool {
        self.close_requested
    }

    /// Clears, then draws the textured quad.
    pub fn render_frame(&mut self) {
        let [r, g, b, a] = self.clear_color;
        self.gl.clear_color(r, g, b, a);
        self.gl.clear(glow::COLOR_BUFFER_BIT);

        self.program.use_program();
        self.texture.bind(TEXTURE_UNIT);
        self.quad.draw();

        self.frames_rendered += 1;
    }

    pub fn texture_loaded(&self) -> bool {
        self.texture_loaded
    }

    pub fn framebuffer_size(&self) -> (u32, u32) {
        self.framebuffer_size
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    pub fn program(&self) -> &ShaderProgram<C> {
        &self.program
    }

    pub fn texture(&self) -> &Texture<C> {
        &self.texture
    }

    pub fn quad(&self) -> &QuadMesh<C> {
        &self.quad
    }

    fn apply_viewport(&mut self) {
        let (width, height) = self.framebuffer_size;
        let to_i32 = |side: u32| i32::try_from(side).unwrap_or(i32::MAX);
        self.gl.viewport(0, 0, to_i32(width), to_i32(height));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::recording::{Call, RecordingContext};
    use crate::render::{ShaderError, ShaderStage, TextureError};
    use image::{Rgb, RgbImage};
    use std::path::{Path, PathBuf};

    fn write_rgb_png(dir: &Path, name: &str, color: [u8; 3]) -> PathBuf {
        let path = dir.join(name);
        RgbImage::from_pixel(2, 2, Rgb(color)).save(&path).unwrap();
        path
    }

    fn config_for(image_path: PathBuf) -> ViewerConfig {
        ViewerConfig {
            image_path,
            ..ViewerConfig::default()
        }
    }

    #[test]
    fn setup_binds_sampler_and_sets_viewport() {
        let dir = tempfile::tempdir().unwrap();
        let gl = Rc::new(RecordingContext::new());
        let viewer = Viewer::new(
            gl.clone(),
            &config_for(write_rgb_png(dir.path(), "red.png", [255, 0, 0])),
        )
        .unwrap();

        assert!(viewer.texture_loaded());
        assert_eq!(gl.viewport_value(), (0, 0, 800, 600));
        assert_eq!(gl.uniform_value(viewer.program().handle(), SAMPLER_UNIFORM), Some(0));
        assert!(gl.invalid_operations().is_empty(), "{:?}", gl.invalid_operations());
    }

    #[test]
    fn resize_updates_viewport_and_ignores_zero() {
        let dir = tempfile::tempdir().unwrap();
        let gl = Rc::new(RecordingContext::new());
        let mut viewer = Viewer::new(
            gl.clone(),
            &config_for(write_rgb_png(dir.path(), "a.png", [1, 2, 3])),
        )
        .unwrap();

        viewer.on_framebuffer_resized(1600, 1200);
        assert_eq!(gl.viewport_value(), (0, 0, 1600, 1200));

        viewer.on_framebuffer_resized(0, 1200);
        assert_eq!(gl.viewport_value(), (0, 0, 1600, 1200));
        assert_eq!(viewer.framebuffer_size(), (1600, 1200));
    }

    #[test]
    fn escape_and_close_request_end_the_loop() {
        let dir = tempfile::tempdir().unwrap();
        let gl = Rc::new(RecordingContext::new());
        let mut viewer = Viewer::new(
            gl.clone(),
            &config_for(write_rgb_png(dir.path(), "a.png", [1, 2, 3])),
        )
        .unwrap();

        viewer.on_key(Key::Other, true);
        viewer.on_key(Key::Escape, false);
        assert!(!viewer.should_close());

        viewer.on_key(Key::Escape, true);
        assert!(viewer.should_close());

        let mut other = Viewer::new(
            gl,
            &config_for(write_rgb_png(dir.path(), "b.png", [1, 2, 3])),
        )
        .unwrap();
        other.on_close_requested();
        assert!(other.should_close());
    }

    #[test]
    fn frame_clears_then_draws_with_program_and_texture() {
        let dir = tempfile::tempdir().unwrap();
        let gl = Rc::new(RecordingContext::new());
        let mut viewer = Viewer::new(
            gl.clone(),
            &config_for(write_rgb_png(dir.path(), "a.png", [9, 9, 9])),
        )
        .unwrap();
        let setup_calls = gl.calls().len();

        viewer.render_frame();

        let frame = &gl.calls()[setup_calls..];
        assert_eq!(frame[0], Call::ClearColor([0.0, 0.0, 0.0, 1.0]));
        assert_eq!(frame[1], Call::Clear(glow::COLOR_BUFFER_BIT));
        assert_eq!(
            frame.last(),
            Some(&Call::DrawArrays {
                mode: glow::TRIANGLES,
                first: 0,
                count: 6
            })
        );

        let draw = &gl.draws()[0];
        assert_eq!(draw.program, Some(viewer.program().handle()));
        assert_eq!(draw.texture, Some(viewer.texture().handle()));
        assert_eq!(draw.vertex_array, Some(viewer.quad().vertex_array()));
        assert_eq!(viewer.frames_rendered(), 1);

        viewer.render_frame();
        assert_eq!(gl.clears(), vec![glow::COLOR_BUFFER_BIT; 2]);
        assert_eq!(gl.draws().len(), 2);
    }

    #[test]
    fn missing_image_is_fatal_by_default_and_releases_everything() {
        let gl = Rc::new(RecordingContext::new());
        let err = Viewer::new(gl.clone(), &config_for(PathBuf::from("res/absent.jpg")))
            .err()
            .unwrap();

        assert!(matches!(err, ViewerError::Texture(TextureError::Decode { .. })));
        assert_eq!(gl.live_programs(), 0);
        assert_eq!(gl.live_textures(), 0);
        assert_eq!(gl.live_vertex_arrays(), 0);
        assert_eq!(gl.live_buffers(), 0);
        assert!(gl.invalid_operations().is_empty(), "{:?}", gl.invalid_operations());
    }

    #[test]
    fn texture_creation_failure_releases_program_and_mesh() {
        let gl = Rc::new(RecordingContext::new());
        gl.fail_texture_creation("oom");
        let err = Viewer::new(gl.clone(), &config_for(PathBuf::from("unused.jpg")))
            .err()
            .unwrap();

        assert_eq!(err, ViewerError::Texture(TextureError::Create("oom".into())));
        assert_eq!(gl.live_programs(), 0);
        assert_eq!(gl.live_vertex_arrays(), 0);
        assert_eq!(gl.live_buffers(), 0);
        assert!(gl.invalid_operations().is_empty(), "{:?}", gl.invalid_operations());
    }

    #[test]
    fn missing_image_can_be_acknowledged() {
        let gl = Rc::new(RecordingContext::new());
        let config = ViewerConfig {
            allow_missing_texture: true,
            ..config_for(PathBuf::from("res/absent.jpg"))
        };
        let mut viewer = Viewer::new(gl.clone(), &config).unwrap();

        assert!(!viewer.texture_loaded());
        assert!(gl.texture_image(viewer.texture().handle()).is_none());
        viewer.render_frame();
        assert_eq!(gl.draws().len(), 1);
    }

    #[test]
    fn shader_failure_is_fatal_and_touches_no_texture() {
        let gl = Rc::new(RecordingContext::new());
        gl.fail_compile(ShaderStage::Fragment, "0:7: 'texture' : no matching overload");
        let err = Viewer::new(gl.clone(), &config_for(PathBuf::from("unused.jpg")))
            .err()
            .unwrap();

        assert!(matches!(
            err,
            ViewerError::Shader(ShaderError::CompileError {
                stage: ShaderStage::Fragment,
                ..
            })
        ));
        assert_eq!(gl.live_textures(), 0);
        assert!(!gl.calls().iter().any(|c| matches!(c, Call::CreateTexture(_))));
    }

    #[test]
    fn invalid_config_fails_before_device_calls() {
        let gl = Rc::new(RecordingContext::new());
        let config = ViewerConfig {
            height: 0,
            ..ViewerConfig::default()
        };
        assert!(matches!(
            Viewer::new(gl.clone(), &config),
            Err(ViewerError::Config(_))
        ));
        assert!(gl.calls().is_empty());
    }

    #[test]
    fn custom_clear_color_is_used() {
        let dir = tempfile::tempdir().unwrap();
        let gl = Rc::new(RecordingContext::new());
        let config = ViewerConfig {
            clear_color: [0.2, 0.3, 0.4, 1.0],
            ..config_for(write_rgb_png(dir.path(), "a.png", [0, 0, 0]))
        };
        let mut viewer = Viewer::new(gl.clone(), &config).unwrap();
        viewer.render_frame();
        assert_eq!(gl.clear_color_value(), [0.2, 0.3, 0.4, 1.0]);
    }
}
