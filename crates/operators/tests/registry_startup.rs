//! Startup ordering of the global operator registry.
//!
//! Runs in its own test binary so the process-wide registry is guaranteed
//! to be uninitialized when the test starts.

use operators::{registry, Operator, OP_DELETE};
use topology::Mesh;

#[test]
#[should_panic(expected = "operator registry used before registry_init()")]
fn test_init_before_registry_init_panics() {
    let mesh = Mesh::new();
    let mut op = Operator::new();
    op.init(&mesh, OP_DELETE);
}

#[test]
#[should_panic(expected = "operator registry used before registry_init()")]
fn test_registry_before_registry_init_panics() {
    let _ = registry();
}
