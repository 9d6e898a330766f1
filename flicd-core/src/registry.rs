//! Id registries
//!
//! Every object kind (connection channels, scanners, scan wizards, timers)
//! has its own registry, so equal numeric ids in different registries never
//! collide.
//!
//! Ids are allocated from a counter that only moves forward. An id stays
//! allocated while its object is live, including while a removal is in
//! flight, and becomes *retired* once the removal has been processed.
//! Retired ids are never handed out again, so a frame still in flight for a
//! removed object can never reach a newer one. Every id below the counter
//! was issued, which keeps retired ids apart from ids the registry never
//! issued: an event for a retired id is a benign late event, while an event
//! for an unissued id means the peer is out of sync.

use alloc::collections::BTreeMap;
use core::fmt;

/// Every id in the registry's range has been issued
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryFull;

impl fmt::Display for RegistryFull {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "no unissued id left in registry")
    }
}

#[cfg(feature = "std")]
impl std::error::Error for RegistryFull {}

/// Result of looking an id up
#[derive(Debug, PartialEq, Eq)]
pub enum Lookup<T> {
    /// Id belongs to a live object
    Live(T),
    /// Id was issued and its object has since been removed
    Retired,
    /// Id was never issued
    Unknown,
}

/// Id-keyed store of live objects
#[derive(Debug, Clone)]
pub struct Registry<T> {
    live: BTreeMap<u32, T>,
    /// Next id to issue; every id in `0..next` is live or retired
    next: u32,
}

impl<T> Default for Registry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Registry<T> {
    pub fn new() -> Self {
        Self {
            live: BTreeMap::new(),
            next: 0,
        }
    }

    /// Allocate an id and store the object built for it
    pub fn insert_with<F>(&mut self, build: F) -> Result<u32, RegistryFull>
    where
        F: FnOnce(u32) -> T,
    {
        let id = self.allocate()?;
        self.live.insert(id, build(id));
        Ok(id)
    }

    fn allocate(&mut self) -> Result<u32, RegistryFull> {
        let id = self.next;
        self.next = self.next.checked_add(1).ok_or(RegistryFull)?;
        Ok(id)
    }

    /// Remove a live object and retire its id
    pub fn remove(&mut self, id: u32) -> Option<T> {
        self.live.remove(&id)
    }

    pub fn get(&self, id: u32) -> Option<&T> {
        self.live.get(&id)
    }

    pub fn get_mut(&mut self, id: u32) -> Option<&mut T> {
        self.live.get_mut(&id)
    }

    /// Classify an id received from the peer
    pub fn lookup(&mut self, id: u32) -> Lookup<&mut T> {
        match self.live.get_mut(&id) {
            Some(value) => Lookup::Live(value),
            None if id < self.next => Lookup::Retired,
            None => Lookup::Unknown,
        }
    }

    pub fn contains(&self, id: u32) -> bool {
        self.live.contains_key(&id)
    }

    pub fn is_retired(&self, id: u32) -> bool {
        id < self.next && !self.live.contains_key(&id)
    }

    /// Number of live objects
    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    /// Live ids in ascending order
    pub fn ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.live.keys().copied()
    }

    /// Live objects in ascending id order
    pub fn iter(&self) -> impl Iterator<Item = (u32, &T)> + '_ {
        self.live.iter().map(|(id, value)| (*id, value))
    }

    /// Remove every live object, retiring all ids
    pub fn drain(&mut self) -> alloc::vec::Vec<(u32, T)> {
        core::mem::take(&mut self.live).into_iter().collect()
    }
}
