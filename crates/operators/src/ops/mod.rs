//! Built-in operators.
//!
//! Each operator module exposes its slot layout (`SLOTS`), constants naming
//! its slot codes, and a `definition()` for the registry.

pub mod delete;
pub mod duplicate;
pub mod smooth;
pub mod split;
pub mod subdivide;
pub mod translate;

use crate::registry::Registry;

pub const OP_DELETE: u32 = 1;
pub const OP_DUPLICATE: u32 = 2;
pub const OP_SPLIT: u32 = 3;
pub const OP_SUBDIVIDE_EDGES: u32 = 4;
pub const OP_TRANSLATE: u32 = 5;
pub const OP_SMOOTH_VERTS: u32 = 6;

pub use delete::DeleteContext;

pub(crate) fn register_builtins(registry: &mut Registry) {
    registry.register(delete::definition());
    registry.register(duplicate::definition());
    registry.register(split::definition());
    registry.register(subdivide::definition());
    registry.register(translate::definition());
    registry.register(smooth::definition());
}
