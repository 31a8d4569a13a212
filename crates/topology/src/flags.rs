//! Depth-scoped operator flags.
//!
//! Every element can carry a word of transient flag bits per operator nesting
//! level. Entering an operator pushes a fresh, empty layer; finishing it pops
//! the layer. A nested operator therefore starts with no marks at all and
//! cannot see or disturb the marks of the operator that called it, and its
//! own marks vanish when it finishes.

use tracing::trace;

use crate::mesh::{ElemKind, ElemRef};

/// One nesting level of flag words, dense per element kind.
#[derive(Debug, Clone, Default)]
struct FlagLayer {
    words: [Vec<u32>; 4],
}

impl FlagLayer {
    fn get(&self, kind: ElemKind, index: usize) -> u32 {
        self.words[kind.slot()].get(index).copied().unwrap_or(0)
    }

    fn word_mut(&mut self, kind: ElemKind, index: usize) -> &mut u32 {
        let words = &mut self.words[kind.slot()];
        if words.len() <= index {
            words.resize(index + 1, 0);
        }
        &mut words[index]
    }

    fn clear_element(&mut self, kind: ElemKind, index: usize) {
        if let Some(word) = self.words[kind.slot()].get_mut(index) {
            *word = 0;
        }
    }
}

/// Stack of flag layers with a runtime-checked capacity.
#[derive(Debug, Clone)]
pub struct FlagTable {
    layers: Vec<FlagLayer>,
    max_depth: usize,
}

impl FlagTable {
    /// Table with the base layer (depth 0) and room for `max_depth` nested layers.
    pub fn new(max_depth: usize) -> Self {
        Self {
            layers: vec![FlagLayer::default()],
            max_depth,
        }
    }

    /// Current depth; 0 outside of any operator
    pub fn depth(&self) -> usize {
        self.layers.len() - 1
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Enter a nested scope.
    ///
    /// # Panics
    /// When the nesting limit is exceeded.
    pub fn push_layer(&mut self) {
        if self.depth() >= self.max_depth {
            panic!(
                "flag stack overflow: operator nesting exceeds max depth {}",
                self.max_depth
            );
        }
        self.layers.push(FlagLayer::default());
        trace!("flags: push -> depth {}", self.depth());
    }

    /// Leave the current scope, discarding its marks.
    ///
    /// # Panics
    /// When called at depth 0 (finish without a matching exec).
    pub fn pop_layer(&mut self) {
        if self.layers.len() == 1 {
            panic!("flag stack underflow: pop at depth 0");
        }
        self.layers.pop();
        trace!("flags: pop -> depth {}", self.depth());
    }

    pub fn set(&mut self, elem: ElemRef, bits: u32) {
        if let Some(kind) = elem.kind() {
            *self.top_mut().word_mut(kind, elem.index() as usize) |= bits;
        }
    }

    pub fn clear(&mut self, elem: ElemRef, bits: u32) {
        if let Some(kind) = elem.kind() {
            let index = elem.index() as usize;
            let top = self.top_mut();
            if top.get(kind, index) & bits != 0 {
                *top.word_mut(kind, index) &= !bits;
            }
        }
    }

    /// True when any of `bits` is set on `elem` at the current depth
    pub fn test(&self, elem: ElemRef, bits: u32) -> bool {
        self.word(elem) & bits != 0
    }

    /// Flag word of `elem` at the current depth
    pub fn word(&self, elem: ElemRef) -> u32 {
        match elem.kind() {
            Some(kind) => self.top().get(kind, elem.index() as usize),
            None => 0,
        }
    }

    /// Clear `bits` on every element of `kind` at the current depth
    pub fn clear_kind(&mut self, kind: ElemKind, bits: u32) {
        for word in self.top_mut().words[kind.slot()].iter_mut() {
            *word &= !bits;
        }
    }

    /// Forget an element at every depth (it was deleted)
    pub(crate) fn forget(&mut self, elem: ElemRef) {
        if let Some(kind) = elem.kind() {
            for layer in &mut self.layers {
                layer.clear_element(kind, elem.index() as usize);
            }
        }
    }

    /// Drop the marks of every element at every depth, keeping the depth
    pub(crate) fn reset(&mut self) {
        for layer in &mut self.layers {
            *layer = FlagLayer::default();
        }
    }

    /// Rewrite every layer after compaction; `map[old] = Some(new)` for survivors
    pub(crate) fn remap(&mut self, kind: ElemKind, map: &[Option<u32>], new_len: usize) {
        for layer in &mut self.layers {
            let old = std::mem::take(&mut layer.words[kind.slot()]);
            let mut words = vec![0u32; new_len];
            for (old_index, word) in old.into_iter().enumerate() {
                if let Some(Some(new_index)) = map.get(old_index) {
                    words[*new_index as usize] = word;
                }
            }
            layer.words[kind.slot()] = words;
        }
    }

    fn top(&self) -> &FlagLayer {
        &self.layers[self.layers.len() - 1]
    }

    fn top_mut(&mut self) -> &mut FlagLayer {
        let last = self.layers.len() - 1;
        &mut self.layers[last]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{EdgeId, VertId};

    const BIT_A: u32 = 1;
    const BIT_B: u32 = 2;

    #[test]
    fn test_set_test_clear_round_trip() {
        let mut flags = FlagTable::new(4);
        let v: ElemRef = VertId(7).into();

        flags.set(v, BIT_A);
        assert!(flags.test(v, BIT_A));
        assert!(!flags.test(v, BIT_B));

        flags.set(v, BIT_A);
        assert_eq!(flags.word(v), BIT_A);

        flags.clear(v, BIT_A);
        assert!(!flags.test(v, BIT_A));
        flags.clear(v, BIT_A);
        assert_eq!(flags.word(v), 0);
    }

    #[test]
    fn test_kinds_are_separate() {
        let mut flags = FlagTable::new(4);
        flags.set(VertId(0).into(), BIT_A);
        assert!(!flags.test(EdgeId(0).into(), BIT_A));
    }

    #[test]
    fn test_nested_layer_starts_empty_and_is_discarded() {
        let mut flags = FlagTable::new(4);
        let v: ElemRef = VertId(1).into();
        flags.set(v, BIT_A);

        flags.push_layer();
        assert_eq!(flags.depth(), 1);
        assert!(!flags.test(v, BIT_A));

        flags.set(v, BIT_B);
        flags.clear(v, BIT_A);
        assert!(flags.test(v, BIT_B));

        flags.pop_layer();
        assert_eq!(flags.depth(), 0);
        assert!(flags.test(v, BIT_A));
        assert!(!flags.test(v, BIT_B));
    }

    #[test]
    #[should_panic(expected = "flag stack underflow")]
    fn test_underflow_panics() {
        let mut flags = FlagTable::new(4);
        flags.pop_layer();
    }

    #[test]
    #[should_panic(expected = "flag stack overflow")]
    fn test_overflow_panics() {
        let mut flags = FlagTable::new(2);
        flags.push_layer();
        flags.push_layer();
        flags.push_layer();
    }

    #[test]
    fn test_remap_moves_words() {
        let mut flags = FlagTable::new(2);
        flags.set(VertId(0).into(), BIT_A);
        flags.set(VertId(2).into(), BIT_B);
        flags.remap(ElemKind::Vert, &[None, None, Some(0)], 1);
        assert_eq!(flags.word(VertId(0).into()), BIT_B);
        assert_eq!(flags.word(VertId(2).into()), 0);
    }
}
