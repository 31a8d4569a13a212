//! Append-only element pool.
//!
//! Slots are never reused: a deleted element leaves `None` behind until the
//! mesh is compacted, so an index keeps naming the same element (or nothing)
//! between compactions.

#[derive(Debug, Clone)]
pub(crate) struct Pool<T> {
    items: Vec<Option<T>>,
    live: usize,
}

impl<T> Default for Pool<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            live: 0,
        }
    }
}

impl<T> Pool<T> {
    /// Index the next pushed element will get
    pub fn next_index(&self) -> u32 {
        self.items.len() as u32
    }

    pub fn push(&mut self, item: T) -> u32 {
        let index = self.next_index();
        self.items.push(Some(item));
        self.live += 1;
        index
    }

    pub fn get(&self, index: u32) -> Option<&T> {
        self.items.get(index as usize).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, index: u32) -> Option<&mut T> {
        self.items.get_mut(index as usize).and_then(Option::as_mut)
    }

    pub fn remove(&mut self, index: u32) -> Option<T> {
        let item = self.items.get_mut(index as usize)?.take();
        if item.is_some() {
            self.live -= 1;
        }
        item
    }

    /// Live element count
    pub fn live(&self) -> usize {
        self.live
    }

    /// Slot count including dead slots
    pub fn capacity(&self) -> usize {
        self.items.len()
    }

    pub fn ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.items
            .iter()
            .enumerate()
            .filter(|(_, item)| item.is_some())
            .map(|(i, _)| i as u32)
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.live = 0;
    }

    /// Drop dead slots, returning `map[old] = Some(new)` for survivors.
    ///
    /// Elements are moved but not rewritten; the caller fixes cross references.
    pub fn compact(&mut self) -> Vec<Option<u32>> {
        let mut map = Vec::with_capacity(self.items.len());
        let mut kept = Vec::with_capacity(self.live);
        for item in self.items.drain(..) {
            match item {
                Some(item) => {
                    map.push(Some(kept.len() as u32));
                    kept.push(Some(item));
                }
                None => map.push(None),
            }
        }
        self.items = kept;
        map
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.items.iter_mut().filter_map(Option::as_mut)
    }
}
