//! Window, GL context, and event loop.
//!
//! The viewer is created in `resumed` once a window exists, and torn down in
//! `exiting` while the context is still current.

use std::ffi::CStr;
use std::num::NonZeroU32;
use std::rc::Rc;

use glutin::config::{ConfigTemplate, ConfigTemplateBuilder};
use glutin::context::{
    ContextApi, ContextAttributesBuilder, GlProfile, PossiblyCurrentContext, Version,
};
use glutin::display::{Display, DisplayApiPreference};
use glutin::prelude::*;
use glutin::surface::{Surface, SurfaceAttributesBuilder, SwapInterval, WindowSurface};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle, RawWindowHandle};
use winit::application::ApplicationHandler;
use winit::dpi::{LogicalSize, PhysicalSize};
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

use texquad_core::{GlowContext, Key, Viewer, ViewerConfig};

use crate::error::CliError;

/// Opens the window and runs until it is closed or Escape is pressed.
pub fn run(config: ViewerConfig) -> Result<(), CliError> {
    let event_loop = EventLoop::new().map_err(|e| CliError::LibraryInit(e.to_string()))?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(config);
    event_loop
        .run_app(&mut app)
        .map_err(|e| CliError::LibraryInit(e.to_string()))?;

    match app.error.take() {
        Some(e) => Err(e),
        None => {
            log::info!("rendered {} frames", app.frames_rendered);
            Ok(())
        }
    }
}

/// Everything that lives only while the window does.
///
/// Fields drop in declaration order: the viewer releases its GL objects
/// before the surface and context go away.
struct GlWindow {
    viewer: Viewer<GlowContext>,
    surface: Surface<WindowSurface>,
    context: PossiblyCurrentContext,
    window: Window,
}

impl GlWindow {
    fn resize(&mut self, size: PhysicalSize<u32>) {
        if let (Some(w), Some(h)) = (NonZeroU32::new(size.width), NonZeroU32::new(size.height)) {
            self.surface.resize(&self.context, w, h);
        }
        self.viewer.on_framebuffer_resized(size.width, size.height);
    }

    fn present(&mut self) -> Result<(), CliError> {
        self.viewer.render_frame();
        self.surface
            .swap_buffers(&self.context)
            .map_err(|e| CliError::Present(e.to_string()))
    }
}

struct App {
    config: ViewerConfig,
    state: Option<GlWindow>,
    error: Option<CliError>,
    frames_rendered: u64,
}

impl App {
    fn new(config: ViewerConfig) -> Self {
        Self {
            config,
            state: None,
            error: None,
            frames_rendered: 0,
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: CliError) {
        log::error!("{error}");
        self.error = Some(error);
        event_loop.exit();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }
        match create_gl_window(event_loop, &self.config) {
            Ok(state) => {
                state.window.request_redraw();
                self.state = Some(state);
            }
            Err(e) => self.fail(event_loop, e),
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let Some(state) = self.state.as_mut() else {
            return;
        };

        let mut failure = None;
        match event {
            WindowEvent::CloseRequested => state.viewer.on_close_requested(),
            WindowEvent::Resized(size) => state.resize(size),
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key,
                        state: key_state,
                        ..
                    },
                ..
            } => {
                let key = match physical_key {
                    PhysicalKey::Code(KeyCode::Escape) => Key::Escape,
                    _ => Key::Other,
                };
                state
                    .viewer
                    .on_key(key, key_state == ElementState::Pressed);
            }
            WindowEvent::RedrawRequested => {
                if let Err(e) = state.present() {
                    failure = Some(e);
                }
            }
            _ => {}
        }

        let should_close = state.viewer.should_close();
        if let Some(e) = failure {
            self.fail(event_loop, e);
        } else if should_close {
            event_loop.exit();
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(state) = &self.state {
            state.window.request_redraw();
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(state) = self.state.take() {
            self.frames_rendered = state.viewer.frames_rendered();
        }
    }
}

fn display_preference(window_handle: RawWindowHandle) -> DisplayApiPreference {
    #[cfg(target_os = "windows")]
    {
        DisplayApiPreference::Wgl(Some(window_handle))
    }
    #[cfg(target_os = "macos")]
    {
        let _ = window_handle;
        DisplayApiPreference::Cgl
    }
    #[cfg(all(unix, not(target_os = "macos")))]
    {
        let _ = window_handle;
        DisplayApiPreference::Egl
    }
}

/// Opaque framebuffer: the window is never composited with transparency.
fn config_template(window_handle: RawWindowHandle) -> ConfigTemplate {
    ConfigTemplateBuilder::new()
        .with_alpha_size(0)
        .with_transparency(false)
        .compatible_with_native_window(window_handle)
        .build()
}

#[allow(unsafe_code)]
fn create_gl_window(
    event_loop: &ActiveEventLoop,
    config: &ViewerConfig,
) -> Result<GlWindow, CliError> {
    let window_error = |e: &dyn std::fmt::Display| CliError::WindowCreation(e.to_string());

    let attributes = Window::default_attributes()
        .with_title(config.title.clone())
        .with_inner_size(LogicalSize::new(config.width, config.height));
    let window = event_loop
        .create_window(attributes)
        .map_err(|e| window_error(&e))?;

    let raw_display = window.display_handle().map_err(|e| window_error(&e))?.as_raw();
    let raw_window = window.window_handle().map_err(|e| window_error(&e))?.as_raw();

    // SAFETY: both handles come from `window`, which outlives the display:
    // it is the last field of `GlWindow` to drop.
    let display = unsafe { Display::new(raw_display, display_preference(raw_window)) }
        .map_err(|e| window_error(&e))?;

    let template = config_template(raw_window);
    // SAFETY: the template references the live window handle above.
    let gl_config = unsafe { display.find_configs(template) }
        .map_err(|e| window_error(&e))?
        .next()
        .ok_or_else(|| CliError::WindowCreation("no matching GL config".into()))?;

    let size = window.inner_size();
    let surface_attributes = SurfaceAttributesBuilder::<WindowSurface>::new().build(
        raw_window,
        NonZeroU32::new(size.width).unwrap_or(NonZeroU32::MIN),
        NonZeroU32::new(size.height).unwrap_or(NonZeroU32::MIN),
    );
    // SAFETY: the surface is dropped before `window` (field order in `GlWindow`).
    let surface = unsafe { display.create_window_surface(&gl_config, &surface_attributes) }
        .map_err(|e| window_error(&e))?;

    let version = config.gl_version;
    let context_attributes = ContextAttributesBuilder::new()
        .with_profile(GlProfile::Core)
        .with_context_api(ContextApi::OpenGl(Some(Version::new(
            version.major,
            version.minor,
        ))))
        .build(Some(raw_window));
    // SAFETY: the raw window handle stays valid for the context's lifetime.
    let context = unsafe { display.create_context(&gl_config, &context_attributes) }
        .map_err(|e| CliError::WindowCreation(format!("OpenGL {version} core: {e}")))?
        .make_current(&surface)
        .map_err(|e| window_error(&e))?;

    let interval = if config.vsync {
        SwapInterval::Wait(NonZeroU32::MIN)
    } else {
        SwapInterval::DontWait
    };
    if let Err(e) = surface.set_swap_interval(&context, interval) {
        log::warn!("could not set swap interval: {e}");
    }

    // SAFETY: the context is current on this thread, and the loader returns
    // pointers from the display that created it.
    let gl = unsafe {
        glow::Context::from_loader_function_cstr(|name: &CStr| display.get_proc_address(name))
    };
    let gl = GlowContext::new(gl).map_err(CliError::DeviceLoader)?;
    log::info!("OpenGL {}", gl.version());

    let mut viewer = Viewer::new(Rc::new(gl), config)?;
    viewer.on_framebuffer_resized(size.width, size.height);

    Ok(GlWindow {
        viewer,
        surface,
        context,
        window,
    })
}
