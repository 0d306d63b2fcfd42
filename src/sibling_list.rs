//! An ordered list with stable position handles.
//!
//! Values live in slots of a `Vec` and are linked to their neighbours by
//! index, so inserting or removing next to a known `Position` is O(1)
//! and never moves any other value. Freed slots are recycled; each slot
//! carries a generation counter so a `Position` for a removed value can
//! never be confused with whatever later reuses the slot.

use std::iter::FusedIterator;

/// A stable reference to one slot of a `SiblingList`.
///
/// A position stays valid until the value it refers to is removed,
/// regardless of what happens to the rest of the list.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Position {
    index: usize,
    generation: u32,
}

#[derive(Debug)]
struct Slot<T> {
    value: Option<T>,
    generation: u32,
    prev: Option<usize>,
    next: Option<usize>,
}

#[derive(Debug)]
pub struct SiblingList<T> {
    slots: Vec<Slot<T>>,
    vacant: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
    len: usize,
}

impl<T> SiblingList<T> {
    pub fn new() -> SiblingList<T> {
        SiblingList {
            slots: Vec::new(),
            vacant: Vec::new(),
            head: None,
            tail: None,
            len: 0,
        }
    }

    fn occupied(&self, position: Position) -> Option<&Slot<T>> {
        self.slots
            .get(position.index)
            .filter(|s| s.generation == position.generation && s.value.is_some())
    }

    fn position_of(&self, index: usize) -> Position {
        Position {
            index,
            generation: self.slots[index].generation,
        }
    }

    pub fn get(&self, position: Position) -> Option<&T> {
        self.occupied(position).and_then(|s| s.value.as_ref())
    }

    pub fn first(&self) -> Option<Position> {
        self.head.map(|i| self.position_of(i))
    }

    pub fn last(&self) -> Option<Position> {
        self.tail.map(|i| self.position_of(i))
    }

    pub fn next(&self, position: Position) -> Option<Position> {
        self.occupied(position)
            .and_then(|s| s.next)
            .map(|i| self.position_of(i))
    }

    pub fn prev(&self, position: Position) -> Option<Position> {
        self.occupied(position)
            .and_then(|s| s.prev)
            .map(|i| self.position_of(i))
    }

    fn allocate(&mut self, value: T, prev: Option<usize>, next: Option<usize>) -> usize {
        match self.vacant.pop() {
            Some(index) => {
                let slot = &mut self.slots[index];
                slot.value = Some(value);
                slot.prev = prev;
                slot.next = next;
                index
            }
            None => {
                self.slots.push(Slot {
                    value: Some(value),
                    generation: 0,
                    prev,
                    next,
                });
                self.slots.len() - 1
            }
        }
    }

    fn link(&mut self, index: usize) {
        let (prev, next) = (self.slots[index].prev, self.slots[index].next);

        match prev {
            Some(p) => self.slots[p].next = Some(index),
            None => self.head = Some(index),
        }
        match next {
            Some(n) => self.slots[n].prev = Some(index),
            None => self.tail = Some(index),
        }

        self.len += 1;
    }

    pub fn push_back(&mut self, value: T) -> Position {
        let index = self.allocate(value, self.tail, None);
        self.link(index);
        self.position_of(index)
    }

    /// Inserts `value` directly before `reference`. Returns `None` and
    /// leaves the list untouched when `reference` is not in this list.
    pub fn insert_before(&mut self, reference: Position, value: T) -> Option<Position> {
        let prev = self.occupied(reference)?.prev;
        let index = self.allocate(value, prev, Some(reference.index));
        self.link(index);
        Some(self.position_of(index))
    }

    /// Inserts `value` directly after `reference`. Returns `None` and
    /// leaves the list untouched when `reference` is not in this list.
    pub fn insert_after(&mut self, reference: Position, value: T) -> Option<Position> {
        let next = self.occupied(reference)?.next;
        let index = self.allocate(value, Some(reference.index), next);
        self.link(index);
        Some(self.position_of(index))
    }

    pub fn remove(&mut self, position: Position) -> Option<T> {
        let (prev, next) = {
            let slot = self.occupied(position)?;
            (slot.prev, slot.next)
        };

        match prev {
            Some(p) => self.slots[p].next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.slots[n].prev = prev,
            None => self.tail = prev,
        }

        let slot = &mut self.slots[position.index];
        let value = slot.value.take();
        slot.generation = slot.generation.wrapping_add(1);
        slot.prev = None;
        slot.next = None;

        self.vacant.push(position.index);
        self.len -= 1;
        value
    }

    /// Removes every value, returning them in list order.
    pub fn drain(&mut self) -> Vec<T> {
        let mut values = Vec::with_capacity(self.len);
        let mut cursor = self.head;
        while let Some(index) = cursor {
            let slot = &mut self.slots[index];
            cursor = slot.next;
            values.extend(slot.value.take());
            slot.generation = slot.generation.wrapping_add(1);
            slot.prev = None;
            slot.next = None;
            self.vacant.push(index);
        }

        self.head = None;
        self.tail = None;
        self.len = 0;
        values
    }

    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            list: self,
            cursor: self.head,
            remaining: self.len,
        }
    }
}

impl<T> Default for SiblingList<T> {
    fn default() -> SiblingList<T> {
        SiblingList::new()
    }
}

/// Borrowing iterator over `(Position, &T)` in list order.
pub struct Iter<'a, T> {
    list: &'a SiblingList<T>,
    cursor: Option<usize>,
    remaining: usize,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = (Position, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.cursor?;
        let slot = &self.list.slots[index];
        self.cursor = slot.next;
        self.remaining -= 1;
        slot.value
            .as_ref()
            .map(|v| (self.list.position_of(index), v))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, T> ExactSizeIterator for Iter<'a, T> {}

impl<'a, T> FusedIterator for Iter<'a, T> {}
