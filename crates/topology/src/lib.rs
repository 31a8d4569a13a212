//! Mesh topology kernel
//!
//! This crate provides the data layer mesh operators run against:
//! - [`arena`] - bump allocator for per-operator scratch data
//! - [`flags`] - depth-scoped per-element flag bits
//! - [`mesh`] - vertex/edge/loop/face store with disk and radial cycles

pub mod arena;
pub mod flags;
pub mod mesh;

pub use arena::{Arena, ArenaBlock, ArenaSlice};
pub use flags::FlagTable;
pub use kernel_config::KernelConfig;
pub use mesh::*;
