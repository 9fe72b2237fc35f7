// Copyright (c) 2025 knix
// All rights reserved.

use std::num::NonZeroU32;

use log::trace;

/// A handle-addressed arena. Handles are 1-based so that `Option<Handle>` is free.
///
/// Entries are never removed and never move to a different handle, which is what
/// lets a forward-declared type be completed in place while everyone else holds
/// on to its handle.
pub struct Pool<T, Index: Into<NonZeroU32> + From<NonZeroU32>> {
    vec: Vec<T>,
    name: &'static str,
    _index: std::marker::PhantomData<Index>,
}

impl<T, Index: Into<NonZeroU32> + From<NonZeroU32> + Copy> Pool<T, Index> {
    pub fn with_capacity(name: &'static str, capacity: usize) -> Pool<T, Index> {
        Pool { name, vec: Vec::with_capacity(capacity), _index: std::marker::PhantomData }
    }

    pub fn new(name: &'static str) -> Pool<T, Index> {
        Pool { name, vec: Vec::new(), _index: std::marker::PhantomData }
    }

    pub fn next_id(&self) -> Index {
        Self::actual_index_to_index(self.vec.len())
    }

    pub fn len(&self) -> usize {
        self.vec.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vec.is_empty()
    }

    pub fn add(&mut self, t: T) -> Index {
        let cap = self.vec.capacity();

        let index = self.next_id();
        self.vec.push(t);

        let new_cap = self.vec.capacity();
        if new_cap != cap {
            trace!("pool {} resized {cap} -> {new_cap}", self.name)
        }

        index
    }

    fn actual_index_to_index(actual: usize) -> Index {
        let Some(nz) = NonZeroU32::new(actual as u32 + 1) else {
            panic!("pool index overflow")
        };
        Index::from(nz)
    }

    fn index_to_actual_index(index: Index) -> usize {
        let nz32: NonZeroU32 = index.into();
        nz32.get() as usize - 1
    }

    pub fn get(&self, index: Index) -> &T {
        let index = Self::index_to_actual_index(index);
        &self.vec[index]
    }

    pub fn get_mut(&mut self, index: Index) -> &mut T {
        let index = Self::index_to_actual_index(index);
        &mut self.vec[index]
    }

    /// Mutable access to two distinct entries at once
    pub fn get_two_mut(&mut self, a: Index, b: Index) -> (&mut T, &mut T) {
        let a = Self::index_to_actual_index(a);
        let b = Self::index_to_actual_index(b);
        assert_ne!(a, b, "get_two_mut on the same entry of pool {}", self.name);
        if a < b {
            let (lo, hi) = self.vec.split_at_mut(b);
            (&mut lo[a], &mut hi[0])
        } else {
            let (lo, hi) = self.vec.split_at_mut(a);
            (&mut hi[0], &mut lo[b])
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.vec.iter()
    }

    pub fn iter_with_ids(&self) -> impl Iterator<Item = (Index, &T)> {
        self.vec.iter().enumerate().map(|(i, t)| (Self::actual_index_to_index(i), t))
    }
}

#[cfg(test)]
mod test {
    use std::num::NonZeroU32;

    use super::Pool;
    #[test]
    fn single() {
        let mut pool: Pool<i32, NonZeroU32> = Pool::new("single");
        let handle: NonZeroU32 = pool.add(42);
        assert_eq!(*pool.get(handle), 42);
        assert_eq!(handle.get(), 1);
    }

    #[test]
    fn handles_stay_stable() {
        let mut pool: Pool<i32, NonZeroU32> = Pool::with_capacity("stable", 1);
        let first = pool.add(1);
        for i in 0..100 {
            pool.add(i);
        }
        *pool.get_mut(first) = 7;
        assert_eq!(*pool.get(first), 7);
        assert_eq!(pool.len(), 101);
    }

    #[test]
    fn two_mut() {
        let mut pool: Pool<i32, NonZeroU32> = Pool::new("two_mut");
        let a = pool.add(1);
        let b = pool.add(2);
        let (x, y) = pool.get_two_mut(b, a);
        std::mem::swap(x, y);
        assert_eq!(*pool.get(a), 2);
        assert_eq!(*pool.get(b), 1);
        let ids: Vec<u32> = pool.iter_with_ids().map(|(id, _)| id.get()).collect();
        assert_eq!(ids, vec![1, 2]);
    }
}
