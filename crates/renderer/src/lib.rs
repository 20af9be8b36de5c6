//! GPU half of fragpad.
//!
//! ```text
//!   Session (resources, canvas size, source)
//!          │ render request
//!          ▼
//!   Renderer::render ──▶ compose ──▶ naga parse/validate ──▶ link pipeline
//!          │                                                    │
//!          │                   bind textures ◀──────────────────┘
//!          ▼
//!   offscreen canvas ──▶ Presenter (window) / read_pixels (export)
//! ```
//!
//! Every render recompiles from scratch. Compile and link failures are
//! reported as [`RenderError::Compile`] / [`RenderError::Link`] and leave the
//! previous program and the last good frame in place.

mod compile;
mod error;
mod gpu;
mod loader;
mod pipeline;
mod session;
mod watch;
mod window;

pub use error::{ErrorKind, RenderError};
pub use gpu::{plan_units, GpuContext};
pub use loader::{decode_image, DecodedTexture, ImageLoader, TextureRequest};
pub use pipeline::{FrameReport, Renderer};
pub use session::{Command, Outcome, Session, SessionError, ShaderSource, DEFAULT_COLOR};
pub use watch::SourceWatcher;
pub use window::{run_window, UserEvent, WindowOptions};
pub use winit::event_loop::EventLoopProxy;
