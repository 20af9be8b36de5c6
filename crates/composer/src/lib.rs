//! GPU-free half of fragpad: the resource model and the code generator that
//! turns it into a fragment shader.
//!
//! - `color` resolves hex strings into normalised RGB.
//! - `resource` defines texture and color entries plus their sampling modes.
//! - `registry` keeps both kinds of entries in insertion order, keyed by a
//!   generated [`ResourceId`].
//! - `ident` validates resource names as GLSL identifiers; callers run it
//!   before mutating the registry.
//! - `compose` assembles header, declarations, user code and the `main`
//!   wrapper into one source string.

pub mod color;
pub mod compose;
pub mod ident;
mod registry;
mod resource;

pub use color::{resolve as resolve_color, Rgb};
pub use compose::{compose, ComposedShader, TEMPLATE_SOURCE, USER_ENTRY_POINT};
pub use ident::{ensure_unique, validate_identifier, IdentError};
pub use registry::{Registry, ResourceId, Resources};
pub use resource::{ColorResource, FilterMode, Named, TextureResource, WrapMode};
