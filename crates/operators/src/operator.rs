//! Operator instances: slot access and the init -> exec -> finish lifecycle.
//!
//! ```text
//! Uninitialized --init--> Initialized --exec--> Executed --finish--> Finished
//! ```
//!
//! Skipping a state (exec before init, finish twice, ...) is a bug in the
//! caller and panics. Input slots are written while `Initialized`; the
//! algorithm writes output slots during exec; results are read while
//! `Executed`. `finish` pops the flag layer pushed by `exec` and frees the
//! operator arena, which invalidates every arena-owned buffer.

use std::rc::Rc;
use std::sync::Arc;

use glam::Vec3;
use topology::{Arena, ElemKind, ElemRef, ElemType, Mesh};
use tracing::{debug, warn};

use crate::error::OpError;
use crate::registry::{registry, OpDefinition, Registry};
use crate::slot::{Buffer, Slot, SlotElem, SlotType, SlotValue};

/// Lifecycle state of an operator instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpState {
    Uninitialized,
    Initialized,
    Executed,
    Finished,
}

/// One invocation of a registered operator
#[derive(Debug)]
pub struct Operator {
    state: OpState,
    def: Option<Arc<OpDefinition>>,
    registry: Option<Arc<Registry>>,
    slots: Vec<Slot>,
    arena: Arena,
    /// Flag depth pushed by exec
    depth: usize,
}

impl Default for Operator {
    fn default() -> Self {
        Self::new()
    }
}

impl Operator {
    /// Uninitialized operator
    pub fn new() -> Self {
        Self {
            state: OpState::Uninitialized,
            def: None,
            registry: None,
            slots: Vec::new(),
            arena: Arena::new(1),
            depth: 0,
        }
    }

    pub fn state(&self) -> OpState {
        self.state
    }

    /// Definition this operator was initialized from.
    ///
    /// # Panics
    /// Before `init`.
    pub fn definition(&self) -> &Arc<OpDefinition> {
        match &self.def {
            Some(def) => def,
            None => panic!("operator has no definition before init"),
        }
    }

    pub fn name(&self) -> &'static str {
        self.def.as_ref().map_or("<uninitialized>", |def| def.name)
    }

    pub fn opcode(&self) -> Option<u32> {
        self.def.as_ref().map(|def| def.opcode)
    }

    /// Bytes held by this operator's arena
    pub fn arena_bytes(&self) -> usize {
        self.arena.allocated_bytes()
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Initialize from the global registry.
    ///
    /// # Panics
    /// When not `Uninitialized`, when the registry was never initialized, or
    /// when `opcode` is not registered.
    pub fn init(&mut self, mesh: &Mesh, opcode: u32) {
        self.init_with(mesh, registry(), opcode);
    }

    /// Initialize a nested operator from the registry of `parent`.
    pub fn init_nested(&mut self, parent: &Operator, mesh: &Mesh, opcode: u32) {
        let registry = match &parent.registry {
            Some(registry) => Arc::clone(registry),
            None => panic!("nested init from uninitialized operator"),
        };
        self.init_with(mesh, registry, opcode);
    }

    /// Initialize from an explicit registry
    pub fn init_with(&mut self, mesh: &Mesh, registry: Arc<Registry>, opcode: u32) {
        self.expect_state(OpState::Uninitialized, "init");
        let def = match registry.lookup(opcode) {
            Ok(def) => def,
            Err(err) => panic!("{err}"),
        };

        self.slots = def
            .slots
            .iter()
            .enumerate()
            .map(|(index, slot)| Slot::new(index, *slot))
            .collect();
        self.arena = Arena::new(mesh.config().chunk_size());
        debug!(
            "op init: {} ({}) with {} slots at flag depth {}",
            def.name,
            def.opcode,
            def.slot_count(),
            mesh.flag_depth()
        );
        self.def = Some(def);
        self.registry = Some(registry);
        self.state = OpState::Initialized;
    }

    /// Run the operator algorithm inside a fresh flag layer.
    ///
    /// The state becomes `Executed` even when the algorithm fails, so `finish`
    /// must still be called to restore the flag depth.
    ///
    /// # Panics
    /// When not `Initialized`, or when the flag stack is full.
    pub fn exec(&mut self, mesh: &mut Mesh) -> Result<(), OpError> {
        self.expect_state(OpState::Initialized, "exec");
        let def = Arc::clone(self.definition());

        mesh.flags_mut().push_layer();
        self.depth = mesh.flag_depth();
        debug!("op exec: {} at flag depth {}", def.name, self.depth);

        let result = def.execute(mesh, self);
        self.state = OpState::Executed;

        if let Err(err) = &result {
            debug!("op exec: {} failed: {}", def.name, err);
        } else if mesh.config().validate_after_exec {
            if let Err(err) = mesh.validate() {
                warn!("op exec: {} left an invalid mesh: {}", def.name, err);
                return Err(err.into());
            }
        }
        result
    }

    /// Pop the flag layer and free the arena.
    ///
    /// # Panics
    /// When not `Executed`, or when a nested operator was left unfinished.
    pub fn finish(&mut self, mesh: &mut Mesh) {
        self.expect_state(OpState::Executed, "finish");
        if mesh.flag_depth() != self.depth {
            panic!(
                "operator {} finished at flag depth {} but exec pushed depth {}",
                self.name(),
                mesh.flag_depth(),
                self.depth
            );
        }
        mesh.flags_mut().pop_layer();
        debug!(
            "op finish: {} ({} arena bytes released)",
            self.name(),
            self.arena.allocated_bytes()
        );
        self.arena.free_all();
        self.state = OpState::Finished;
    }

    fn expect_state(&self, expected: OpState, action: &str) {
        if self.state != expected {
            panic!(
                "operator {}: {} in state {:?}, expected {:?}",
                self.name(),
                action,
                self.state,
                expected
            );
        }
    }

    // ========================================================================
    // Slot access
    // ========================================================================

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Slot code of the slot called `name`
    pub fn slot_code(&self, name: &str) -> Option<usize> {
        self.slots.iter().position(|slot| slot.name() == name)
    }

    /// Slot by code.
    ///
    /// # Panics
    /// When `code` is outside the operator's declared slots.
    pub fn slot(&self, code: usize) -> &Slot {
        match self.slots.get(code) {
            Some(slot) => slot,
            None => panic!(
                "unknown slot code {} for operator {} ({} slots)",
                code,
                self.name(),
                self.slots.len()
            ),
        }
    }

    fn read_slot(&self, code: usize) -> &Slot {
        if !matches!(self.state, OpState::Initialized | OpState::Executed) {
            panic!("operator {}: slot read in state {:?}", self.name(), self.state);
        }
        self.slot(code)
    }

    /// Slot to overwrite, after checking state and type
    fn write_slot(&mut self, code: usize, ty: SlotType) -> Result<&mut Slot, OpError> {
        if self.state != OpState::Initialized {
            panic!("operator {}: slot write in state {:?}", self.name(), self.state);
        }
        let slot = self.slot(code);
        check_type(slot, ty)?;
        Ok(&mut self.slots[code])
    }

    pub fn set_int(&mut self, code: usize, value: i32) -> Result<(), OpError> {
        self.write_slot(code, SlotType::Int)?.value = SlotValue::Int(value);
        Ok(())
    }

    pub fn set_float(&mut self, code: usize, value: f32) -> Result<(), OpError> {
        self.write_slot(code, SlotType::Float)?.value = SlotValue::Float(value);
        Ok(())
    }

    pub fn set_ptr(&mut self, code: usize, elem: impl Into<ElemRef>) -> Result<(), OpError> {
        self.write_slot(code, SlotType::Ptr)?.value = SlotValue::Ptr(Some(elem.into()));
        Ok(())
    }

    pub fn set_vec3(&mut self, code: usize, value: Vec3) -> Result<(), OpError> {
        self.write_slot(code, SlotType::Vec3)?.value = SlotValue::Vec3(value);
        Ok(())
    }

    /// Install caller memory as a buffer slot. The data is shared, not copied.
    pub fn set_buffer<T: SlotElem>(
        &mut self,
        code: usize,
        data: impl Into<Rc<[T]>>,
    ) -> Result<(), OpError> {
        self.write_slot(code, T::BUFFER)?.value = T::wrap(Buffer::External(data.into()));
        Ok(())
    }

    /// Install caller memory as an element buffer. The data is shared, not copied.
    pub fn set_ptr_buffer(
        &mut self,
        code: usize,
        elems: impl Into<Rc<[ElemRef]>>,
    ) -> Result<(), OpError> {
        self.set_buffer::<ElemRef>(code, elems)
    }

    /// Replace a buffer slot with `len` zeroed elements from the operator arena
    pub fn alloc_buffer<T: SlotElem>(&mut self, code: usize, len: usize) -> Result<&mut [T], OpError> {
        self.write_slot(code, T::BUFFER)?;
        let slice = self.arena.alloc_slice::<T>(len);
        self.slots[code].value = T::wrap(Buffer::Arena(slice));
        Ok(self.arena.slice_mut(&slice))
    }

    /// Copy `values` into an arena-owned buffer slot
    pub fn write_buffer<T: SlotElem>(&mut self, code: usize, values: &[T]) -> Result<(), OpError> {
        self.alloc_buffer::<T>(code, values.len())?
            .copy_from_slice(values);
        Ok(())
    }

    /// Mutable view of a buffer slot.
    ///
    /// An external buffer is first copied into the operator arena, so caller
    /// memory handed over with `set_buffer` is never written.
    pub fn buffer_mut<T: SlotElem>(&mut self, code: usize) -> Result<&mut [T], OpError> {
        let current = T::buffer(&self.write_slot(code, T::BUFFER)?.value).cloned();
        let slice = match current {
            Some(Buffer::Arena(slice)) => slice,
            Some(Buffer::External(data)) => {
                let slice = self.arena.alloc_copy(&data[..]);
                self.slots[code].value = T::wrap(Buffer::Arena(slice));
                slice
            }
            Some(Buffer::Empty) | None => return Ok(&mut []),
        };
        Ok(self.arena.slice_mut(&slice))
    }

    pub fn get_int(&self, code: usize) -> Result<i32, OpError> {
        let slot = self.read_slot(code);
        match slot.value {
            SlotValue::Int(v) => Ok(v),
            _ => Err(mismatch(slot, SlotType::Int)),
        }
    }

    pub fn get_float(&self, code: usize) -> Result<f32, OpError> {
        let slot = self.read_slot(code);
        match slot.value {
            SlotValue::Float(v) => Ok(v),
            _ => Err(mismatch(slot, SlotType::Float)),
        }
    }

    /// Element stored in a pointer slot, None when never set
    pub fn get_ptr(&self, code: usize) -> Result<Option<ElemRef>, OpError> {
        let slot = self.read_slot(code);
        match slot.value {
            SlotValue::Ptr(v) => Ok(v),
            _ => Err(mismatch(slot, SlotType::Ptr)),
        }
    }

    pub fn get_vec3(&self, code: usize) -> Result<Vec3, OpError> {
        let slot = self.read_slot(code);
        match slot.value {
            SlotValue::Vec3(v) => Ok(v),
            _ => Err(mismatch(slot, SlotType::Vec3)),
        }
    }

    /// Contents of a buffer slot
    pub fn buffer<T: SlotElem>(&self, code: usize) -> Result<&[T], OpError> {
        let slot = self.read_slot(code);
        let buffer = T::buffer(&slot.value).ok_or_else(|| mismatch(slot, T::BUFFER))?;
        Ok(self.resolve(buffer))
    }

    fn resolve<'a, T: SlotElem>(&'a self, buffer: &'a Buffer<T>) -> &'a [T] {
        match buffer {
            Buffer::Empty => &[],
            Buffer::External(data) => &data[..],
            Buffer::Arena(slice) => self.arena.slice(slice),
        }
    }

    // ========================================================================
    // Flag bridges
    // ========================================================================

    /// Fill a pointer buffer with every element of `htype` carrying `bit` at
    /// the mesh's current flag depth
    pub fn flagged_to_slot(
        &mut self,
        mesh: &Mesh,
        code: usize,
        bit: u32,
        htype: ElemType,
    ) -> Result<usize, OpError> {
        let elems: Vec<ElemRef> = mesh.flagged(htype, bit).collect();
        self.write_buffer(code, &elems)?;
        Ok(elems.len())
    }

    /// Set `bit` on every element of `htype` in a pointer buffer
    pub fn flag_buffer(
        &self,
        mesh: &mut Mesh,
        code: usize,
        bit: u32,
        htype: ElemType,
    ) -> Result<(), OpError> {
        for elem in self.buffer_elems(mesh, code, htype)? {
            mesh.set_flag(elem, bit);
        }
        Ok(())
    }

    /// Clear `bit` on every element of `htype` in a pointer buffer
    pub fn unflag_buffer(
        &self,
        mesh: &mut Mesh,
        code: usize,
        bit: u32,
        htype: ElemType,
    ) -> Result<(), OpError> {
        for elem in self.buffer_elems(mesh, code, htype)? {
            mesh.clear_flag(elem, bit);
        }
        Ok(())
    }

    /// Live elements of `htype` in a pointer buffer; any dead reference fails
    /// the whole call
    pub fn buffer_elems(
        &self,
        mesh: &Mesh,
        code: usize,
        htype: ElemType,
    ) -> Result<Vec<ElemRef>, OpError> {
        let name = self.slot(code).name();
        let mut out = Vec::new();
        for &elem in self.buffer::<ElemRef>(code)? {
            let Some(kind) = elem.kind() else {
                return Err(OpError::invalid(name, "null element reference"));
            };
            if !mesh.contains(elem) {
                return Err(OpError::invalid(name, format!("stale element reference {elem:?}")));
            }
            if htype.contains(kind) {
                out.push(elem);
            }
        }
        Ok(out)
    }

    /// Like [`Operator::buffer_elems`] for a single kind
    pub fn buffer_kind(&self, mesh: &Mesh, code: usize, kind: ElemKind) -> Result<Vec<ElemRef>, OpError> {
        self.buffer_elems(mesh, code, kind.mask())
    }
}

impl Drop for Operator {
    fn drop(&mut self) {
        if self.state == OpState::Executed {
            warn!(
                "operator {} dropped without finish; its flag layer at depth {} is still pushed",
                self.name(),
                self.depth
            );
        }
    }
}

/// Copy slot `src_code` of `src` into slot `dst_code` of `dst`.
///
/// Scalars are copied by value. Buffers are deep-copied into `dst`'s arena,
/// so the copy outlives `src` and never aliases it.
pub fn copy_slot(
    src: &Operator,
    dst: &mut Operator,
    src_code: usize,
    dst_code: usize,
) -> Result<(), OpError> {
    let from = src.read_slot(src_code);
    dst.write_slot(dst_code, from.ty())?;

    match &from.value {
        SlotValue::IntBuffer(buffer) => {
            let values = src.resolve(buffer);
            dst.write_buffer::<i32>(dst_code, values)
        }
        SlotValue::FloatBuffer(buffer) => {
            let values = src.resolve(buffer);
            dst.write_buffer::<f32>(dst_code, values)
        }
        SlotValue::PtrBuffer(buffer) => {
            let values = src.resolve(buffer);
            dst.write_buffer::<ElemRef>(dst_code, values)
        }
        scalar => {
            dst.slots[dst_code].value = scalar.clone();
            Ok(())
        }
    }
}

fn mismatch(slot: &Slot, found: SlotType) -> OpError {
    OpError::SlotTypeMismatch {
        slot: slot.name(),
        expected: slot.ty(),
        found,
    }
}

fn check_type(slot: &Slot, ty: SlotType) -> Result<(), OpError> {
    if slot.ty() == ty {
        Ok(())
    } else {
        Err(mismatch(slot, ty))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::{delete, duplicate, DeleteContext, OP_DELETE, OP_DUPLICATE};
    use crate::registry::registry_init;
    use crate::slot::{SlotDef, SlotType};
    use topology::{EdgePolicy, FaceId, VertId};

    const PROBE: u32 = 900;
    const PROBE_SLOTS: &[SlotDef] = &[
        SlotDef::input("count", SlotType::Int),
        SlotDef::input("weights", SlotType::FloatBuffer),
        SlotDef::input("target", SlotType::Ptr),
        SlotDef::output("depth", SlotType::Int),
    ];

    /// Records the flag depth it ran at and whether it saw an outer mark
    fn probe(mesh: &mut Mesh, op: &mut Operator) -> Result<(), OpError> {
        if let Some(elem) = op.get_ptr(2)? {
            if mesh.test_flag(elem, 1) {
                return Err(OpError::invalid("target", "outer mark visible"));
            }
            mesh.set_flag(elem, 2);
        }
        op.set_int(3, mesh.flag_depth() as i32)
    }

    fn test_registry() -> Arc<Registry> {
        let mut registry = Registry::with_builtins();
        registry.register(OpDefinition::new(PROBE, "probe", PROBE_SLOTS, probe));
        Arc::new(registry)
    }

    fn quad() -> (Mesh, FaceId) {
        let mut mesh = Mesh::new();
        let verts: Vec<VertId> = [Vec3::ZERO, Vec3::X, Vec3::new(1.0, 1.0, 0.0), Vec3::Y]
            .into_iter()
            .map(|co| mesh.create_vertex(co))
            .collect();
        let f = mesh
            .create_face_from_verts(&verts, EdgePolicy::CreateMissing)
            .unwrap();
        (mesh, f)
    }

    #[test]
    fn test_lifecycle_states() {
        let mut mesh = Mesh::new();
        let mut op = Operator::new();
        assert_eq!(op.state(), OpState::Uninitialized);

        op.init_with(&mesh, test_registry(), PROBE);
        assert_eq!(op.state(), OpState::Initialized);
        assert_eq!(op.name(), "probe");
        assert_eq!(op.slot_count(), 4);

        op.exec(&mut mesh).unwrap();
        assert_eq!(op.state(), OpState::Executed);
        assert_eq!(op.get_int(3).unwrap(), 1);
        assert_eq!(mesh.flag_depth(), 1);

        op.finish(&mut mesh);
        assert_eq!(op.state(), OpState::Finished);
        assert_eq!(mesh.flag_depth(), 0);
    }

    #[test]
    #[should_panic(expected = "exec in state Uninitialized")]
    fn test_exec_before_init_panics() {
        let mut mesh = Mesh::new();
        let mut op = Operator::new();
        let _ = op.exec(&mut mesh);
    }

    #[test]
    #[should_panic(expected = "finish in state Finished")]
    fn test_double_finish_panics() {
        let mut mesh = Mesh::new();
        let mut op = Operator::new();
        op.init_with(&mesh, test_registry(), PROBE);
        op.exec(&mut mesh).unwrap();
        op.finish(&mut mesh);
        op.finish(&mut mesh);
    }

    #[test]
    #[should_panic(expected = "finish in state Initialized")]
    fn test_finish_without_exec_panics() {
        let mut mesh = Mesh::new();
        let mut op = Operator::new();
        op.init_with(&mesh, test_registry(), PROBE);
        op.finish(&mut mesh);
    }

    #[test]
    #[should_panic(expected = "init in state Initialized")]
    fn test_double_init_panics() {
        let mesh = Mesh::new();
        let mut op = Operator::new();
        op.init_with(&mesh, test_registry(), PROBE);
        op.init_with(&mesh, test_registry(), PROBE);
    }

    #[test]
    #[should_panic(expected = "unknown operator opcode 9999")]
    fn test_unknown_opcode_panics() {
        registry_init();
        let mesh = Mesh::new();
        let mut op = Operator::new();
        op.init(&mesh, 9999);
    }

    #[test]
    #[should_panic(expected = "unknown slot code 7")]
    fn test_unknown_slot_panics() {
        let mesh = Mesh::new();
        let mut op = Operator::new();
        op.init_with(&mesh, test_registry(), PROBE);
        let _ = op.set_int(7, 1);
    }

    #[test]
    #[should_panic(expected = "slot write in state Executed")]
    fn test_write_after_exec_panics() {
        let mut mesh = Mesh::new();
        let mut op = Operator::new();
        op.init_with(&mesh, test_registry(), PROBE);
        op.exec(&mut mesh).unwrap();
        let _ = op.set_int(0, 1);
    }

    #[test]
    fn test_slot_type_mismatch() {
        let mesh = Mesh::new();
        let mut op = Operator::new();
        op.init_with(&mesh, test_registry(), PROBE);

        let err = op.set_float(0, 1.0).unwrap_err();
        assert_eq!(
            err,
            OpError::SlotTypeMismatch {
                slot: "count",
                expected: SlotType::Int,
                found: SlotType::Float,
            }
        );
        assert!(op.get_vec3(0).is_err());
        assert!(op.buffer::<i32>(1).is_err());
        assert_eq!(op.get_int(0).unwrap(), 0);
    }

    #[test]
    fn test_scalar_slots() {
        let (mesh, f) = quad();
        let mut op = Operator::new();
        op.init_with(&mesh, test_registry(), PROBE);
        assert_eq!(op.get_ptr(2).unwrap(), None);
        op.set_int(0, -5).unwrap();
        op.set_ptr(2, f).unwrap();
        assert_eq!(op.get_int(0).unwrap(), -5);
        assert_eq!(op.get_ptr(2).unwrap(), Some(ElemRef::from(f)));
        assert_eq!(op.slot(2).len(), 1);
        assert_eq!(op.slot_code("weights"), Some(1));
    }

    #[test]
    fn test_set_buffer_shares_caller_memory() {
        let mesh = Mesh::new();
        let mut op = Operator::new();
        op.init_with(&mesh, test_registry(), PROBE);

        let weights: Rc<[f32]> = Rc::from(vec![0.5, 1.5]);
        op.set_buffer(1, Rc::clone(&weights)).unwrap();
        assert_eq!(op.slot(1).len(), 2);
        assert_eq!(op.buffer::<f32>(1).unwrap().as_ptr(), weights.as_ptr());
        assert_eq!(op.arena_bytes(), 0);
    }

    #[test]
    fn test_copy_slot_is_deep() {
        let mut mesh = Mesh::new();
        let registry = test_registry();
        let mut src = Operator::new();
        let mut dst = Operator::new();
        src.init_with(&mesh, Arc::clone(&registry), PROBE);
        dst.init_with(&mesh, registry, PROBE);

        src.write_buffer::<f32>(1, &[1.0, 2.0, 3.0]).unwrap();
        copy_slot(&src, &mut dst, 1, 1).unwrap();

        let a = src.buffer::<f32>(1).unwrap().as_ptr();
        let b = dst.buffer::<f32>(1).unwrap().as_ptr();
        assert_ne!(a, b);
        assert_eq!(dst.buffer::<f32>(1).unwrap(), &[1.0, 2.0, 3.0]);

        // Write through the buffer that was copied
        src.buffer_mut::<f32>(1).unwrap()[0] = 9.0;
        assert_eq!(src.buffer::<f32>(1).unwrap().as_ptr(), a);
        assert_eq!(src.buffer::<f32>(1).unwrap(), &[9.0, 2.0, 3.0]);
        assert_eq!(dst.buffer::<f32>(1).unwrap(), &[1.0, 2.0, 3.0]);

        // The copy lives in dst's arena and outlives src
        src.exec(&mut mesh).unwrap();
        src.finish(&mut mesh);
        assert_eq!(dst.buffer::<f32>(1).unwrap(), &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_buffer_mut_leaves_caller_memory_alone() {
        let mesh = Mesh::new();
        let mut op = Operator::new();
        op.init_with(&mesh, test_registry(), PROBE);

        let weights: Rc<[f32]> = Rc::from(vec![1.0, 2.0]);
        op.set_buffer(1, Rc::clone(&weights)).unwrap();
        op.buffer_mut::<f32>(1).unwrap()[1] = 5.0;

        assert_eq!(&weights[..], &[1.0, 2.0]);
        assert_eq!(op.buffer::<f32>(1).unwrap(), &[1.0, 5.0]);
        assert_ne!(op.buffer::<f32>(1).unwrap().as_ptr(), weights.as_ptr());
        assert!(op.buffer_mut::<i32>(1).is_err());
    }

    #[test]
    fn test_copy_slot_external_source() {
        let mesh = Mesh::new();
        let registry = test_registry();
        let mut src = Operator::new();
        let mut dst = Operator::new();
        src.init_with(&mesh, Arc::clone(&registry), PROBE);
        dst.init_with(&mesh, registry, PROBE);

        let weights: Rc<[f32]> = Rc::from(vec![4.0]);
        src.set_buffer(1, Rc::clone(&weights)).unwrap();
        src.set_int(0, 3).unwrap();
        copy_slot(&src, &mut dst, 1, 1).unwrap();
        copy_slot(&src, &mut dst, 0, 0).unwrap();

        assert_ne!(dst.buffer::<f32>(1).unwrap().as_ptr(), weights.as_ptr());
        assert_eq!(dst.get_int(0).unwrap(), 3);
        assert!(matches!(
            copy_slot(&src, &mut dst, 0, 1),
            Err(OpError::SlotTypeMismatch { .. })
        ));
    }

    #[test]
    #[should_panic(expected = "slot read in state Finished")]
    fn test_buffers_die_with_finish() {
        let mut mesh = Mesh::new();
        let mut op = Operator::new();
        op.init_with(&mesh, test_registry(), PROBE);
        op.write_buffer::<f32>(1, &[1.0]).unwrap();
        op.exec(&mut mesh).unwrap();
        op.finish(&mut mesh);
        let _ = op.buffer::<f32>(1);
    }

    #[test]
    fn test_nested_operator_sees_fresh_flag_layer() {
        let (mut mesh, f) = quad();
        let registry = test_registry();

        // Outer operator marks the face with bit 1 at its own depth
        let mut outer = Operator::new();
        outer.init_with(&mesh, Arc::clone(&registry), PROBE);
        outer.exec(&mut mesh).unwrap();
        mesh.set_flag(f, 1);

        let mut inner = Operator::new();
        inner.init_nested(&outer, &mesh, PROBE);
        inner.set_ptr(2, f).unwrap();
        inner.exec(&mut mesh).unwrap();
        assert_eq!(inner.get_int(3).unwrap(), 2);
        assert!(mesh.test_flag(f, 2));
        inner.finish(&mut mesh);

        // Inner mark gone, outer mark intact
        assert!(mesh.test_flag(f, 1));
        assert!(!mesh.test_flag(f, 2));
        outer.finish(&mut mesh);
        assert!(!mesh.test_flag(f, 1));
    }

    #[test]
    #[should_panic(expected = "finished at flag depth 2")]
    fn test_unfinished_nested_operator_detected() {
        let mut mesh = Mesh::new();
        let registry = test_registry();
        let mut outer = Operator::new();
        outer.init_with(&mesh, Arc::clone(&registry), PROBE);
        outer.exec(&mut mesh).unwrap();

        let mut inner = Operator::new();
        inner.init_nested(&outer, &mesh, PROBE);
        inner.exec(&mut mesh).unwrap();
        outer.finish(&mut mesh);
    }

    #[test]
    fn test_flag_buffer_round_trip() {
        let (mut mesh, f) = quad();
        let mut op = Operator::new();
        op.init_with(&mesh, test_registry(), OP_DUPLICATE);

        let geom: Vec<ElemRef> = vec![f.into(), VertId(0).into()];
        op.set_ptr_buffer(duplicate::GEOM, geom).unwrap();
        op.flag_buffer(&mut mesh, duplicate::GEOM, 4, ElemType::FACE)
            .unwrap();
        assert!(mesh.test_flag(f, 4));
        assert!(!mesh.test_flag(VertId(0), 4));

        op.unflag_buffer(&mut mesh, duplicate::GEOM, 4, ElemType::ALL)
            .unwrap();
        assert_eq!(mesh.count_flagged(ElemType::ALL, 4), 0);
    }

    #[test]
    fn test_quad_delete_scenario_through_global_registry() {
        registry_init();
        let (mut mesh, f) = quad();
        assert_eq!(mesh.face(f).len(), 4);

        let mut op = Operator::new();
        op.init(&mesh, OP_DELETE);
        mesh.set_flag(f, 1);
        op.flagged_to_slot(&mesh, delete::GEOM, 1, ElemType::FACE)
            .unwrap();
        op.set_int(delete::CONTEXT, DeleteContext::Faces as i32)
            .unwrap();
        op.exec(&mut mesh).unwrap();
        op.finish(&mut mesh);

        assert_eq!(mesh.face_count(), 0);
        assert_eq!(mesh.edge_count(), 0);
        assert_eq!(mesh.vert_count(), 4);
    }

    #[test]
    fn test_failed_exec_still_finishes() {
        let (mut mesh, _) = quad();
        let mut op = Operator::new();
        op.init_with(&mesh, test_registry(), OP_DELETE);
        op.set_int(delete::CONTEXT, -1).unwrap();
        assert!(op.exec(&mut mesh).is_err());
        assert_eq!(op.state(), OpState::Executed);
        op.finish(&mut mesh);
        assert_eq!(mesh.flag_depth(), 0);
    }
}
