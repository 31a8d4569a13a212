//! Operator definitions and the process-wide registry.
//!
//! The global registry is filled by an explicit [`registry_init`] call at
//! startup and is read-only afterwards. Custom operator sets can be kept in a
//! local [`Registry`] and used through [`crate::Operator::init_with`].

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use topology::Mesh;
use tracing::{debug, info};

use crate::error::OpError;
use crate::operator::Operator;
use crate::slot::SlotDef;

/// An operator algorithm.
///
/// `execute` reads the input slots of `op`, edits `mesh` and writes the
/// output slots. It runs inside a fresh flag layer.
pub trait MeshOperator: Send + Sync {
    fn execute(&self, mesh: &mut Mesh, op: &mut Operator) -> Result<(), OpError>;
}

impl<F> MeshOperator for F
where
    F: Fn(&mut Mesh, &mut Operator) -> Result<(), OpError> + Send + Sync,
{
    fn execute(&self, mesh: &mut Mesh, op: &mut Operator) -> Result<(), OpError> {
        self(mesh, op)
    }
}

/// Immutable registry entry: opcode, slot layout and algorithm
pub struct OpDefinition {
    pub opcode: u32,
    pub name: &'static str,
    pub slots: &'static [SlotDef],
    exec: Box<dyn MeshOperator>,
}

impl OpDefinition {
    pub fn new(
        opcode: u32,
        name: &'static str,
        slots: &'static [SlotDef],
        exec: impl MeshOperator + 'static,
    ) -> Self {
        Self {
            opcode,
            name,
            slots,
            exec: Box::new(exec),
        }
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Slot code of the slot called `name`
    pub fn slot_code(&self, name: &str) -> Option<usize> {
        self.slots.iter().position(|slot| slot.name == name)
    }

    pub(crate) fn execute(&self, mesh: &mut Mesh, op: &mut Operator) -> Result<(), OpError> {
        self.exec.execute(mesh, op)
    }
}

impl fmt::Debug for OpDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpDefinition")
            .field("opcode", &self.opcode)
            .field("name", &self.name)
            .field("slots", &self.slots)
            .finish_non_exhaustive()
    }
}

/// Opcode to definition table
#[derive(Debug, Default)]
pub struct Registry {
    defs: HashMap<u32, Arc<OpDefinition>>,
    by_name: HashMap<&'static str, u32>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in operator
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        crate::ops::register_builtins(&mut registry);
        registry
    }

    /// Add a definition.
    ///
    /// # Panics
    /// When the opcode or the name is already registered.
    pub fn register(&mut self, def: OpDefinition) {
        if self.defs.contains_key(&def.opcode) {
            panic!("operator opcode {} registered twice", def.opcode);
        }
        if self.by_name.contains_key(def.name) {
            panic!("operator name '{}' registered twice", def.name);
        }
        debug!("registry: {} -> {}", def.opcode, def.name);
        self.by_name.insert(def.name, def.opcode);
        self.defs.insert(def.opcode, Arc::new(def));
    }

    pub fn lookup(&self, opcode: u32) -> Result<Arc<OpDefinition>, OpError> {
        self.defs
            .get(&opcode)
            .cloned()
            .ok_or(OpError::UnknownOperator(opcode))
    }

    pub fn opcode_by_name(&self, name: &str) -> Option<u32> {
        self.by_name.get(name).copied()
    }

    pub fn contains(&self, opcode: u32) -> bool {
        self.defs.contains_key(&opcode)
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }
}

static REGISTRY: OnceLock<Arc<Registry>> = OnceLock::new();

/// Build the global registry with the built-in operators.
///
/// Must run before the first [`Operator::init`]. Calling it again returns the
/// existing registry.
pub fn registry_init() -> Arc<Registry> {
    Arc::clone(REGISTRY.get_or_init(|| {
        let registry = Registry::with_builtins();
        info!("operator registry initialized with {} operators", registry.len());
        Arc::new(registry)
    }))
}

/// The global registry.
///
/// # Panics
/// When [`registry_init`] has not run yet.
pub fn registry() -> Arc<Registry> {
    match REGISTRY.get() {
        Some(registry) => Arc::clone(registry),
        None => panic!("operator registry used before registry_init()"),
    }
}

/// The global registry lives for the whole process; this only logs.
pub fn registry_teardown() {
    debug!("registry_teardown: global registry kept for process lifetime");
}
