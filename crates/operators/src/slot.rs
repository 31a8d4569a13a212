//! Typed operator slots.
//!
//! A slot is declared once per operator definition ([`SlotDef`]) and
//! instantiated per operator instance ([`Slot`]). The payload is a sum type
//! so the type tag and the value can never disagree. Buffer payloads are
//! either a shared view of caller memory (installed without copying) or a
//! block in the owning operator's arena.

use std::rc::Rc;

use bytemuck::Pod;
use glam::Vec3;
use topology::{ArenaSlice, ElemRef};

/// Slot type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotType {
    Int,
    Float,
    Ptr,
    Vec3,
    IntBuffer,
    FloatBuffer,
    PtrBuffer,
}

impl SlotType {
    pub fn is_buffer(self) -> bool {
        matches!(
            self,
            SlotType::IntBuffer | SlotType::FloatBuffer | SlotType::PtrBuffer
        )
    }
}

/// Whether the caller fills the slot or the operator does
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotDir {
    In,
    Out,
}

/// Declaration of one slot of an operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotDef {
    pub name: &'static str,
    pub ty: SlotType,
    pub dir: SlotDir,
}

impl SlotDef {
    pub const fn input(name: &'static str, ty: SlotType) -> Self {
        Self {
            name,
            ty,
            dir: SlotDir::In,
        }
    }

    pub const fn output(name: &'static str, ty: SlotType) -> Self {
        Self {
            name,
            ty,
            dir: SlotDir::Out,
        }
    }
}

/// Buffer payload of a buffer-kind slot
#[derive(Debug, Clone)]
pub enum Buffer<T> {
    Empty,
    /// Caller-owned memory, shared rather than copied
    External(Rc<[T]>),
    /// Owned by the operator's arena; dies on `finish`
    Arena(ArenaSlice<T>),
}

impl<T> Buffer<T> {
    pub fn len(&self) -> usize {
        match self {
            Buffer::Empty => 0,
            Buffer::External(data) => data.len(),
            Buffer::Arena(slice) => slice.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Slot payload
#[derive(Debug, Clone)]
pub enum SlotValue {
    Int(i32),
    Float(f32),
    Ptr(Option<ElemRef>),
    Vec3(Vec3),
    IntBuffer(Buffer<i32>),
    FloatBuffer(Buffer<f32>),
    PtrBuffer(Buffer<ElemRef>),
}

impl SlotValue {
    /// Zero value of a slot type
    pub fn zeroed(ty: SlotType) -> Self {
        match ty {
            SlotType::Int => SlotValue::Int(0),
            SlotType::Float => SlotValue::Float(0.0),
            SlotType::Ptr => SlotValue::Ptr(None),
            SlotType::Vec3 => SlotValue::Vec3(Vec3::ZERO),
            SlotType::IntBuffer => SlotValue::IntBuffer(Buffer::Empty),
            SlotType::FloatBuffer => SlotValue::FloatBuffer(Buffer::Empty),
            SlotType::PtrBuffer => SlotValue::PtrBuffer(Buffer::Empty),
        }
    }

    pub fn ty(&self) -> SlotType {
        match self {
            SlotValue::Int(_) => SlotType::Int,
            SlotValue::Float(_) => SlotType::Float,
            SlotValue::Ptr(_) => SlotType::Ptr,
            SlotValue::Vec3(_) => SlotType::Vec3,
            SlotValue::IntBuffer(_) => SlotType::IntBuffer,
            SlotValue::FloatBuffer(_) => SlotType::FloatBuffer,
            SlotValue::PtrBuffer(_) => SlotType::PtrBuffer,
        }
    }
}

/// One slot of an operator instance
#[derive(Debug, Clone)]
pub struct Slot {
    def: SlotDef,
    index: usize,
    pub(crate) value: SlotValue,
}

impl Slot {
    pub(crate) fn new(index: usize, def: SlotDef) -> Self {
        Self {
            def,
            index,
            value: SlotValue::zeroed(def.ty),
        }
    }

    pub fn name(&self) -> &'static str {
        self.def.name
    }

    pub fn ty(&self) -> SlotType {
        self.def.ty
    }

    pub fn dir(&self) -> SlotDir {
        self.def.dir
    }

    /// Declared position in the operator definition
    pub fn index(&self) -> usize {
        self.index
    }

    /// 1 for scalar slots, the element count for buffers
    pub fn len(&self) -> usize {
        match &self.value {
            SlotValue::IntBuffer(buf) => buf.len(),
            SlotValue::FloatBuffer(buf) => buf.len(),
            SlotValue::PtrBuffer(buf) => buf.len(),
            _ => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn value(&self) -> &SlotValue {
        &self.value
    }
}

/// Element types that can fill a buffer slot
pub trait SlotElem: Pod {
    const BUFFER: SlotType;

    fn buffer(value: &SlotValue) -> Option<&Buffer<Self>>;

    fn wrap(buffer: Buffer<Self>) -> SlotValue;
}

impl SlotElem for i32 {
    const BUFFER: SlotType = SlotType::IntBuffer;

    fn buffer(value: &SlotValue) -> Option<&Buffer<Self>> {
        match value {
            SlotValue::IntBuffer(buf) => Some(buf),
            _ => None,
        }
    }

    fn wrap(buffer: Buffer<Self>) -> SlotValue {
        SlotValue::IntBuffer(buffer)
    }
}

impl SlotElem for f32 {
    const BUFFER: SlotType = SlotType::FloatBuffer;

    fn buffer(value: &SlotValue) -> Option<&Buffer<Self>> {
        match value {
            SlotValue::FloatBuffer(buf) => Some(buf),
            _ => None,
        }
    }

    fn wrap(buffer: Buffer<Self>) -> SlotValue {
        SlotValue::FloatBuffer(buffer)
    }
}

impl SlotElem for ElemRef {
    const BUFFER: SlotType = SlotType::PtrBuffer;

    fn buffer(value: &SlotValue) -> Option<&Buffer<Self>> {
        match value {
            SlotValue::PtrBuffer(buf) => Some(buf),
            _ => None,
        }
    }

    fn wrap(buffer: Buffer<Self>) -> SlotValue {
        SlotValue::PtrBuffer(buffer)
    }
}
