//! Interactive preview: a winit window showing the canvas at the display size.
//!
//! Console commands, source file changes and finished image decodes all
//! arrive as [`UserEvent`]s on the event loop, so session state is only ever
//! touched from the loop thread.

use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use sizing::Dimensions;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, Event, KeyEvent, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoopBuilder, EventLoopProxy};
use winit::keyboard::{Key, NamedKey};
use winit::window::{Window, WindowBuilder};

use tracing::{error, info, warn};

use crate::gpu::{GpuContext, Presenter};
use crate::loader::{ImageLoader, TextureRequest};
use crate::pipeline::Renderer;
use crate::session::{Command, Outcome, Session};
use crate::watch::SourceWatcher;

#[derive(Debug)]
pub enum UserEvent {
    Command(Command),
    SourceChanged,
    TexturesDecoded,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct WindowOptions {
    pub watch_source: bool,
}

struct WindowState {
    window: Arc<Window>,
    renderer: Renderer,
    presenter: Presenter,
    session: Session,
    loader: ImageLoader,
}

impl WindowState {
    /// Re-reads the source and renders; failures keep the last good frame.
    ///
    /// Returns `false` when the GPU is no longer usable.
    fn rerender(&mut self) -> bool {
        let source = match self.session.source.load() {
            Ok(source) => source,
            Err(err) => {
                error!("{err:#}");
                return true;
            }
        };
        let result = self
            .renderer
            .render(&self.session.resources, &source, &self.session.canvas);
        self.window.request_redraw();
        match result {
            Ok(report) => {
                info!(
                    size = %report.size,
                    textures = report.textures,
                    active_samplers = report.active_samplers,
                    "rendered"
                );
                true
            }
            Err(err) if err.is_recoverable() => {
                error!(kind = %err.kind(), "{err}");
                true
            }
            Err(err) => {
                error!("{err}");
                false
            }
        }
    }

    fn present(&mut self) -> bool {
        match self.presenter.present(self.renderer.context(), self.renderer.canvas_view()) {
            Ok(()) => true,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                let size = self.presenter.size();
                self.presenter.resize(self.renderer.context(), size);
                self.window.request_redraw();
                true
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                error!("surface out of memory; closing window");
                false
            }
            Err(other) => {
                warn!("surface error: {other}; retrying next frame");
                true
            }
        }
    }

    /// Applies a command; returns `false` when the window should close.
    fn handle_command(&mut self, command: Command) -> bool {
        let display_before = self.session.canvas.display;
        let outcome = match self.session.apply(command, &mut self.loader) {
            Ok(outcome) => outcome,
            Err(err) => {
                error!("{err}");
                return true;
            }
        };
        if self.session.canvas.display != display_before {
            self.request_display_size(self.session.canvas.display);
        }
        match outcome {
            Outcome::Rerender => self.rerender(),
            Outcome::Pending => true,
            Outcome::Export(path) => {
                if let Err(err) = self.renderer.export_png(&path) {
                    error!("{err:#}");
                }
                true
            }
            Outcome::Listing(listing) => {
                println!("{listing}");
                true
            }
            Outcome::Quit => false,
        }
    }

    fn register_decoded(&mut self) -> bool {
        let mut added = false;
        for decoded in self.loader.drain() {
            let path = decoded.request.path.clone();
            match self.session.add_decoded(decoded) {
                Ok(_) => added = true,
                Err(err) => error!(path = %path.display(), "failed to add texture: {err:#}"),
            }
        }
        !added || self.rerender()
    }

    fn request_display_size(&mut self, display: Dimensions) {
        let requested = PhysicalSize::new(display.width, display.height);
        if let Some(applied) = self.window.request_inner_size(requested) {
            self.presenter.resize(self.renderer.context(), applied);
        }
    }

    /// The window's inner size is the display size.
    fn resized(&mut self, size: PhysicalSize<u32>) -> bool {
        if size.width == 0 || size.height == 0 {
            return true;
        }
        self.presenter.resize(self.renderer.context(), size);
        let display = Dimensions::new(size.width, size.height);
        if display == self.session.canvas.display {
            self.window.request_redraw();
            return true;
        }
        self.session.canvas.set_display(display);
        self.rerender()
    }
}

fn is_reload_key(event: &KeyEvent) -> bool {
    matches!(&event.logical_key, Key::Character(value) if value.as_str().eq_ignore_ascii_case("r"))
}

/// Opens the preview window and runs until it closes.
///
/// `on_ready` receives a proxy for feeding commands in from other threads.
pub fn run_window<F>(session: Session, options: WindowOptions, on_ready: F) -> Result<()>
where
    F: FnOnce(EventLoopProxy<UserEvent>),
{
    let event_loop = EventLoopBuilder::<UserEvent>::with_user_event()
        .build()
        .map_err(|err| anyhow!("failed to create event loop: {err}"))?;
    let proxy = event_loop.create_proxy();

    let title = match session.source.path() {
        Some(path) => format!("fragpad: {}", path.display()),
        None => "fragpad".to_string(),
    };
    let display = session.canvas.display;
    let window = WindowBuilder::new()
        .with_title(title)
        .with_inner_size(PhysicalSize::new(display.width, display.height))
        .build(&event_loop)
        .map_err(|err| anyhow!("failed to create preview window: {err}"))?;
    let window = Arc::new(window);

    let (context, surface) = GpuContext::for_window(window.clone())?;
    let renderer = Renderer::new(context, session.canvas.output)?;
    let presenter = Presenter::new(
        renderer.context(),
        surface,
        renderer.vertex_module(),
        window.inner_size(),
    )?;

    let wake_proxy = Mutex::new(proxy.clone());
    let loader = ImageLoader::with_wake(move || {
        if let Ok(proxy) = wake_proxy.lock() {
            let _ = proxy.send_event(UserEvent::TexturesDecoded);
        }
    });

    let watcher = match session.source.path() {
        Some(path) if options.watch_source => {
            let watch_proxy = proxy.clone();
            SourceWatcher::new(path, move || {
                watch_proxy.send_event(UserEvent::SourceChanged).is_ok()
            })
        }
        _ => None,
    };

    let mut state = WindowState {
        window,
        renderer,
        presenter,
        session,
        loader,
    };
    if !state.rerender() {
        return Err(anyhow!("initial render failed"));
    }

    on_ready(proxy);

    let run_result = event_loop.run(move |event, elwt| {
        // Moves the watcher into the loop so it lives as long as the window.
        let _watcher = &watcher;
        let keep_running = match event {
            Event::UserEvent(UserEvent::Command(command)) => state.handle_command(command),
            Event::UserEvent(UserEvent::SourceChanged) => {
                info!("shader source changed; re-rendering");
                state.rerender()
            }
            Event::UserEvent(UserEvent::TexturesDecoded) => state.register_decoded(),
            Event::WindowEvent { window_id, event } if window_id == state.window.id() => {
                handle_window_event(&mut state, event)
            }
            Event::AboutToWait => {
                elwt.set_control_flow(ControlFlow::Wait);
                true
            }
            _ => true,
        };
        if !keep_running {
            elwt.exit();
        }
    });

    run_result.map_err(|err| anyhow!("window event loop error: {err}"))
}

fn handle_window_event(state: &mut WindowState, event: WindowEvent) -> bool {
    match event {
        WindowEvent::CloseRequested | WindowEvent::Destroyed => false,
        WindowEvent::KeyboardInput { event, .. }
            if event.state == ElementState::Pressed && !event.repeat =>
        {
            if matches!(event.logical_key, Key::Named(NamedKey::Escape)) {
                false
            } else if is_reload_key(&event) {
                info!("reloading");
                state.rerender()
            } else {
                true
            }
        }
        WindowEvent::DroppedFile(path) => {
            info!(path = %path.display(), "loading dropped image");
            if let Err(err) = state.loader.request(TextureRequest::new(path)) {
                error!("{err:#}");
            }
            true
        }
        WindowEvent::Resized(size) => state.resized(size),
        WindowEvent::RedrawRequested => state.present(),
        _ => true,
    }
}
