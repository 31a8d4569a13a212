//! Mesh operator framework
//!
//! Operators are mesh-editing algorithms invoked through one uniform,
//! slot-based calling convention:
//!
//! 1. [`registry_init`] once at startup
//! 2. [`Operator::init`] with an opcode
//! 3. fill input slots (`set_*`, [`Operator::flagged_to_slot`])
//! 4. [`Operator::exec`] against a [`topology::Mesh`]
//! 5. read output slots, then [`Operator::finish`]
//!
//! Operators may run other operators from inside `exec`; each level gets
//! its own flag layer and arena.

pub mod error;
pub mod operator;
pub mod ops;
pub mod registry;
pub mod slot;

pub use error::OpError;
pub use operator::{copy_slot, OpState, Operator};
pub use ops::{
    DeleteContext, OP_DELETE, OP_DUPLICATE, OP_SMOOTH_VERTS, OP_SPLIT, OP_SUBDIVIDE_EDGES,
    OP_TRANSLATE,
};
pub use registry::{
    registry, registry_init, registry_teardown, MeshOperator, OpDefinition, Registry,
};
pub use slot::{Buffer, Slot, SlotDef, SlotDir, SlotElem, SlotType, SlotValue};
