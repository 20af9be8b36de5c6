mod canvas;
mod context;
mod present;
mod program;
mod textures;

pub(crate) use canvas::{Canvas, CANVAS_FORMAT};
pub use context::GpuContext;
pub(crate) use present::Presenter;
pub(crate) use program::ProgramManager;
pub use textures::plan_units;
pub(crate) use textures::bind_textures;
