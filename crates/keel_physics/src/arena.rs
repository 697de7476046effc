//! Generational slot storage backing the world's body and shape pools
//!
//! Slots are reused through a free list; every removal bumps the slot's
//! generation so old keys read as stale instead of aliasing the new
//! occupant. The typed handles built on top of these raw keys live in
//! `body` and `shape`.

/// Raw key into an [`Arena`]: slot index plus the generation it was issued at.
pub(crate) type ArenaKey = (u32, u32);

struct Slot<T> {
    value: Option<T>,
    generation: u32,
}

/// Generational pool with O(1) insert, removal, and lookup.
pub(crate) struct Arena<T> {
    slots: Vec<Slot<T>>,
    free_list: Vec<u32>,
    len: usize,
}

impl<T> Arena<T> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free_list: Vec::new(),
            len: 0,
        }
    }

    /// Insert a value, returning the slot index and its current generation.
    pub fn insert(&mut self, value: T) -> ArenaKey {
        self.len += 1;

        if let Some(index) = self.free_list.pop() {
            let slot = &mut self.slots[index as usize];
            slot.value = Some(value);
            (index, slot.generation)
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                value: Some(value),
                generation: 0,
            });
            (index, 0)
        }
    }

    /// Remove a value. The slot's generation is bumped so the key (and any
    /// copy of it) can never resolve again.
    pub fn remove(&mut self, key: ArenaKey) -> Option<T> {
        let slot = self.slots.get_mut(key.0 as usize)?;
        if slot.generation != key.1 || slot.value.is_none() {
            return None;
        }

        slot.generation = slot.generation.wrapping_add(1);
        self.free_list.push(key.0);
        self.len -= 1;

        slot.value.take()
    }

    pub fn get(&self, key: ArenaKey) -> Option<&T> {
        let slot = self.slots.get(key.0 as usize)?;
        if slot.generation != key.1 {
            return None;
        }
        slot.value.as_ref()
    }

    pub fn get_mut(&mut self, key: ArenaKey) -> Option<&mut T> {
        let slot = self.slots.get_mut(key.0 as usize)?;
        if slot.generation != key.1 {
            return None;
        }
        slot.value.as_mut()
    }

    pub fn contains(&self, key: ArenaKey) -> bool {
        self.slots
            .get(key.0 as usize)
            .map(|s| s.generation == key.1 && s.value.is_some())
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    /// Iterate occupied slots in index order.
    pub fn iter(&self) -> impl Iterator<Item = (ArenaKey, &T)> {
        self.slots.iter().enumerate().filter_map(|(i, slot)| {
            slot.value
                .as_ref()
                .map(|v| ((i as u32, slot.generation), v))
        })
    }

    /// Iterate occupied keys in index order.
    pub fn keys(&self) -> impl Iterator<Item = ArenaKey> + '_ {
        self.slots.iter().enumerate().filter_map(|(i, slot)| {
            slot.value
                .as_ref()
                .map(|_| (i as u32, slot.generation))
        })
    }
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self::new()
    }
}
