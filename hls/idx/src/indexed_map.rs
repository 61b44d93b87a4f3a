use super::index_trait::IndexRef;
use std::{
    marker::PhantomData,
    ops::{self, Index},
};

/// The owning arena. Keys are handed out by [`IndexedMap::push`] in
/// increasing order and stay valid for the lifetime of the map since
/// entries are never removed.
#[derive(Debug, Clone)]
pub struct IndexedMap<K, D>
where
    K: IndexRef,
{
    data: Vec<D>,
    phantom: PhantomData<K>,
}

impl<K, D> ops::IndexMut<K> for IndexedMap<K, D>
where
    K: IndexRef,
{
    fn index_mut(&mut self, index: K) -> &mut Self::Output {
        &mut self.data[index.index()]
    }
}

impl<K, D> ops::Index<K> for IndexedMap<K, D>
where
    K: IndexRef,
{
    type Output = D;

    fn index(&self, index: K) -> &Self::Output {
        &self.data[index.index()]
    }
}

impl<K, D> IndexedMap<K, D>
where
    K: IndexRef,
{
    pub fn new() -> Self {
        Self {
            data: Vec::new(),
            phantom: PhantomData,
        }
    }

    pub fn get(&self, index: K) -> Option<&D> {
        self.data.get(index.index())
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn push(&mut self, item: D) -> K {
        self.data.push(item);
        K::new(self.data.len() - 1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (K, &D)> {
        self.data.iter().enumerate().map(|(i, v)| (K::new(i), v))
    }

    pub fn values(&self) -> impl Iterator<Item = &D> {
        self.data.iter()
    }

    /// Iterate over the keys. The iterator does not borrow the map.
    pub fn keys(&self) -> impl Iterator<Item = K> + use<K, D> {
        (0..self.data.len()).map(K::new)
    }
}

impl<K, D> Default for IndexedMap<K, D>
where
    K: IndexRef,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Side table keyed by the indices of some [`IndexedMap`]. Reading a key
/// that was never written yields the default value, so the table does not
/// need to be kept in sync with the primary map.
#[derive(Debug, Clone)]
pub struct SecondaryMap<K, D>
where
    K: IndexRef,
    D: Clone,
{
    data: Vec<D>,
    phantom: PhantomData<K>,
    default_value: D,
}

impl<K, D> Index<K> for SecondaryMap<K, D>
where
    K: IndexRef,
    D: Clone,
{
    type Output = D;

    fn index(&self, index: K) -> &Self::Output {
        self.get(index)
    }
}

impl<K, D> SecondaryMap<K, D>
where
    K: IndexRef,
    D: Clone,
{
    pub fn new_with_default(default_value: D) -> Self {
        Self {
            data: Vec::new(),
            phantom: PhantomData,
            default_value,
        }
    }

    pub fn get(&self, index: K) -> &D {
        self.data.get(index.index()).unwrap_or(&self.default_value)
    }

    /// Mutable access to the entry for `index`, materializing the default
    /// value first if the entry was never written.
    pub fn entry(&mut self, index: K) -> &mut D {
        if index.index() >= self.data.len() {
            self.data
                .resize(index.index() + 1, self.default_value.clone());
        }
        &mut self.data[index.index()]
    }

    pub fn insert(&mut self, index: K, item: D) {
        *self.entry(index) = item;
    }

    /// Reset every entry back to the default value.
    pub fn clear(&mut self) {
        self.data.clear();
    }
}

impl<K, D> SecondaryMap<K, D>
where
    K: IndexRef,
    D: Clone + Default,
{
    pub fn new() -> Self {
        Self::new_with_default(D::default())
    }
}

impl<K, D> Default for SecondaryMap<K, D>
where
    K: IndexRef,
    D: Clone + Default,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::impl_index;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
    struct MyIdx(u32);
    impl_index!(MyIdx);

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct MyData {
        number: usize,
    }

    #[test]
    fn push_returns_dense_keys() {
        let mut map: IndexedMap<MyIdx, MyData> = IndexedMap::new();
        let a = map.push(MyData { number: 10 });
        let b = map.push(MyData { number: 20 });
        assert_eq!((a, b), (MyIdx(0), MyIdx(1)));
        assert_eq!(map[b].number, 20);
        map[a].number = 11;
        assert_eq!(map.get(a), Some(&MyData { number: 11 }));
        assert_eq!(map.get(MyIdx(2)), None);
        assert_eq!(map.keys().collect::<Vec<_>>(), vec![a, b]);
    }

    #[test]
    fn secondary_defaults() {
        let mut side: SecondaryMap<MyIdx, u32> = SecondaryMap::new();
        assert_eq!(side[MyIdx(5)], 0);
        *side.entry(MyIdx(3)) += 2;
        side.insert(MyIdx(1), 7);
        assert_eq!(side[MyIdx(3)], 2);
        assert_eq!(side[MyIdx(1)], 7);
        assert_eq!(side[MyIdx(2)], 0);
        side.clear();
        assert_eq!(side[MyIdx(3)], 0);
    }

    use proptest::prelude::*;

    proptest! {
        #[test]
        fn secondary_map_agrees_with_writes(
            writes in prop::collection::vec((0usize..256, any::<u16>()), 0..64)
        ) {
            let mut side: SecondaryMap<MyIdx, Option<u16>> = SecondaryMap::new();
            let mut expected = std::collections::HashMap::new();
            for (k, v) in &writes {
                side.insert(MyIdx::from(*k), Some(*v));
                expected.insert(*k, *v);
            }
            for k in 0..256usize {
                prop_assert_eq!(side[MyIdx::from(k)], expected.get(&k).copied());
            }
        }
    }
}
