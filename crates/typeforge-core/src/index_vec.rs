//! Type-safe indexed vector collection.

use std::marker::PhantomData;
use std::ops::{Index, IndexMut};

/// A trait for types that can be used as indices.
pub trait Idx: Copy + Eq {
    fn new(raw: u32) -> Self;
    fn index(self) -> usize;
}

/// A Vec indexed by a newtype index.
///
/// Entries are only ever appended, so an index handed out once stays valid
/// for the lifetime of the collection.
#[derive(Debug, Clone)]
pub struct IndexVec<I: Idx, T> {
    raw: Vec<T>,
    _marker: PhantomData<fn(I) -> I>,
}

impl<I: Idx, T> Default for IndexVec<I, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: Idx, T> IndexVec<I, T> {
    pub fn new() -> Self {
        Self {
            raw: Vec::new(),
            _marker: PhantomData,
        }
    }

    /// Push a value and return its index.
    pub fn push(&mut self, value: T) -> I {
        let idx = self.next_idx();
        self.raw.push(value);
        idx
    }

    pub fn len(&self) -> usize {
        self.raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    pub fn get(&self, idx: I) -> Option<&T> {
        self.raw.get(idx.index())
    }

    pub fn get_mut(&mut self, idx: I) -> Option<&mut T> {
        self.raw.get_mut(idx.index())
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.raw.iter()
    }

    pub fn iter_enumerated(&self) -> impl Iterator<Item = (I, &T)> {
        self.raw
            .iter()
            .enumerate()
            .map(|(i, v)| (I::new(i as u32), v))
    }

    /// The index the next `push` will return.
    pub fn next_idx(&self) -> I {
        I::new(self.raw.len() as u32)
    }
}

impl<I: Idx, T> Index<I> for IndexVec<I, T> {
    type Output = T;

    fn index(&self, idx: I) -> &T {
        &self.raw[idx.index()]
    }
}

impl<I: Idx, T> IndexMut<I> for IndexVec<I, T> {
    fn index_mut(&mut self, idx: I) -> &mut T {
        &mut self.raw[idx.index()]
    }
}

macro_rules! impl_idx {
    ($ty:ty) => {
        impl Idx for $ty {
            fn new(raw: u32) -> Self {
                Self(raw)
            }
            fn index(self) -> usize {
                self.0 as usize
            }
        }
    };
}

impl_idx!(crate::ids::TypeId);
impl_idx!(crate::ids::MemberId);
impl_idx!(crate::ids::ModuleId);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{MemberId, TypeId};

    #[test]
    fn test_push_hands_out_sequential_ids() {
        let mut members: IndexVec<MemberId, &str> = IndexVec::new();

        assert_eq!(members.next_idx(), MemberId::new(0));
        let first = members.push("get_Name");
        let second = members.push("set_Name");

        assert_eq!(first, MemberId::new(0));
        assert_eq!(second, MemberId::new(1));
        assert_eq!(members.next_idx(), MemberId::new(2));
        assert_eq!(members[second], "set_Name");
    }

    #[test]
    fn test_get_out_of_range() {
        let mut types: IndexVec<TypeId, u8> = IndexVec::new();
        let id = types.push(7);

        types[id] = 9;
        assert_eq!(types.get(id), Some(&9));
        assert_eq!(types.get(TypeId::new(5)), None);
    }
}
