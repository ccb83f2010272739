use anyhow::{anyhow, Context, Result};
use clap::Parser;
use glutin::{
    config::ConfigTemplateBuilder,
    context::{ContextApi, ContextAttributesBuilder, GlProfile, PossiblyCurrentContext, Version},
    display::{GetGlDisplay, GlDisplay},
    prelude::*,
    surface::{Surface, SwapInterval, WindowSurface},
};
use glutin_winit::{DisplayBuilder, GlWindow};
use log::{debug, error, info, warn};
use raw_window_handle::HasRawWindowHandle;
use simple_logger::SimpleLogger;
use std::{
    ffi::{CStr, CString},
    num::NonZeroU32,
    process::ExitCode,
    ptr,
};
use winit::{
    dpi::{LogicalSize, PhysicalSize},
    event::{ElementState, Event, KeyEvent, WindowEvent},
    event_loop::{EventLoop, EventLoopBuilder},
    keyboard::{Key, NamedKey},
    window::{Window, WindowBuilder},
};

use gltriangle::{
    cli::startup_failure_message,
    render::{self, gl_error_name},
    AppConfig, BuildPolicy, Cli, GlBackend, MeshData, ShaderBuilder, ShaderProgram, TriangleMesh,
};

struct App {
    // Dropped in declaration order; the GL objects need the context alive.
    mesh: TriangleMesh,
    program: ShaderProgram,
    clear_color: [f32; 4],
    gl_error_reported: bool,
    gl_surface: Surface<WindowSurface>,
    gl_context: PossiblyCurrentContext,
    window: Window,
}

impl App {
    fn new(config: &AppConfig) -> Result<(Self, EventLoop<()>)> {
        let event_loop = EventLoopBuilder::new().build()?;
        let window_builder = WindowBuilder::new()
            .with_title(&config.window.title)
            .with_inner_size(LogicalSize::new(config.window.width, config.window.height))
            .with_resizable(config.window.resizable);

        let template = ConfigTemplateBuilder::new().with_alpha_size(8);
        let display_builder = DisplayBuilder::new().with_window_builder(Some(window_builder));

        let (window, gl_config) = display_builder
            .build(&event_loop, template, |configs| {
                // glutin only calls the picker with a non-empty set; an empty
                // one is reported as an error from `build` instead.
                configs
                    .reduce(|accum, config| {
                        if config.num_samples() > accum.num_samples() {
                            config
                        } else {
                            accum
                        }
                    })
                    .expect("display offered no GL configs")
            })
            .map_err(|e| anyhow!("Failed to create GL display: {e}"))?;

        let window = window.context("Failed to create window")?;
        let raw_window_handle = window.raw_window_handle();

        let version = Version::new(config.context.gl_major, config.context.gl_minor);
        let context_attributes = ContextAttributesBuilder::new()
            .with_context_api(ContextApi::OpenGl(Some(version)))
            .with_profile(GlProfile::Core)
            .build(Some(raw_window_handle));

        let gl_display = gl_config.display();

        let gl_context = unsafe {
            gl_display
                .create_context(&gl_config, &context_attributes)
                .context("Failed to create OpenGL context")?
        };

        let attrs = window.build_surface_attributes(<_>::default());
        let gl_surface = unsafe {
            gl_display
                .create_window_surface(&gl_config, &attrs)
                .context("Failed to create GL surface")?
        };

        let gl_context = gl_context
            .make_current(&gl_surface)
            .context("Failed to make context current")?;

        if config.context.vsync {
            if let Err(e) =
                gl_surface.set_swap_interval(&gl_context, SwapInterval::Wait(NonZeroU32::MIN))
            {
                warn!("Failed to enable vsync: {e}");
            }
        }

        // Load OpenGL functions
        let backend = GlBackend::load_with(|symbol| match CString::new(symbol) {
            Ok(symbol) => gl_display.get_proc_address(&symbol),
            Err(_) => ptr::null(),
        });
        log_gl_version();

        let size = window.inner_size();
        unsafe {
            gl::Viewport(0, 0, size.width as i32, size.height as i32);
        }

        let render_config = &config.render;
        for (stage, path) in render_config.stage_mismatches() {
            warn!(
                "{} is configured as the {stage} shader but its extension says otherwise",
                path.display()
            );
        }
        let program = ShaderBuilder::new(backend)
            .with_policy(render_config.build_policy)
            .build_program(&render_config.fragment_shader, &render_config.vertex_shader)
            .context("Failed to build shader program")?;
        if !program.is_usable() {
            warn!(
                "drawing with a broken shader program ({} problems logged above)",
                program.diagnostics().len()
            );
        }

        let mesh = TriangleMesh::upload(&MeshData::triangle()).context("Failed to upload mesh")?;

        Ok((
            Self {
                mesh,
                program,
                clear_color: render_config.clear_color,
                gl_error_reported: false,
                gl_surface,
                gl_context,
                window,
            },
            event_loop,
        ))
    }

    fn resize(&mut self, size: PhysicalSize<u32>) {
        let (Some(width), Some(height)) =
            (NonZeroU32::new(size.width), NonZeroU32::new(size.height))
        else {
            debug!("ignoring resize to an empty framebuffer");
            return;
        };

        self.gl_surface.resize(&self.gl_context, width, height);
        unsafe {
            gl::Viewport(0, 0, size.width as i32, size.height as i32);
        }
        info!("framebuffer resized to {}x{}", size.width, size.height);
    }

    fn render(&mut self) -> Result<()> {
        let [r, g, b, a] = self.clear_color;
        unsafe {
            gl::ClearColor(r, g, b, a);
            gl::Clear(gl::COLOR_BUFFER_BIT);
        }

        self.program.set_used();
        self.mesh.draw();

        if let Some(error) = render::take_gl_error() {
            if !self.gl_error_reported {
                warn!("GL error while drawing: {} (0x{error:x})", gl_error_name(error));
                self.gl_error_reported = true;
            }
        }

        self.gl_surface
            .swap_buffers(&self.gl_context)
            .context("Failed to swap buffers")
    }
}

fn log_gl_version() {
    let version = unsafe { gl::GetString(gl::VERSION) };
    if version.is_null() {
        warn!("GL_VERSION unavailable");
        return;
    }
    let version = unsafe { CStr::from_ptr(version as *const _) };
    info!("OpenGL {}", version.to_string_lossy());
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from(path)?,
        None => AppConfig::load_or_create()?,
    };
    cli.apply(&mut config);

    SimpleLogger::new().with_level(config.level_filter()?).init()?;
    info!("Initializing application...");
    if config.render.build_policy == BuildPolicy::LogAndContinue {
        info!("shader failures will be logged, not fatal");
    }

    let (mut app, event_loop) = match App::new(&config) {
        Ok(app) => app,
        Err(e) => {
            error!("{}", startup_failure_message(&e));
            return Ok(ExitCode::FAILURE);
        }
    };

    event_loop.run(move |event, elwt| match event {
        Event::WindowEvent { window_id, event } if window_id == app.window.id() => match event {
            WindowEvent::CloseRequested => elwt.exit(),
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        logical_key: Key::Named(NamedKey::Escape),
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } => {
                info!("escape pressed, closing");
                elwt.exit();
            }
            WindowEvent::Resized(size) => app.resize(size),
            WindowEvent::RedrawRequested => {
                if let Err(e) = app.render() {
                    error!("{e:#}");
                    elwt.exit();
                }
            }
            _ => {}
        },
        Event::AboutToWait => app.window.request_redraw(),
        Event::LoopExiting => info!("shutting down"),
        _ => {}
    })?;

    Ok(ExitCode::SUCCESS)
}
