//! Node id allocation
//!
//! A monotonic counter plus an ascending free-list of released ids. Ids
//! supplied by configurations are registered explicitly and push the counter
//! past them, so later allocations never collide.

use super::{NodeId, SceneError, MAX_NODE_ID};
use std::collections::{BTreeSet, HashSet};

/// Id pool owned by a [`Scene`](super::Scene)
#[derive(Debug, Clone, Default)]
pub struct IdPool {
    next: NodeId,
    free: BTreeSet<NodeId>,
    used: HashSet<NodeId>,
}

impl IdPool {
    /// Empty pool starting at id 0
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the smallest released id, or a fresh one
    pub fn allocate(&mut self) -> NodeId {
        if let Some(id) = self.free.pop_first() {
            self.used.insert(id);
            return id;
        }
        while self.used.contains(&self.next) {
            self.next += 1;
        }
        let id = self.next;
        self.next += 1;
        self.used.insert(id);
        id
    }

    /// Claim an externally supplied id
    pub fn register(&mut self, id: NodeId) -> Result<(), SceneError> {
        if id > MAX_NODE_ID {
            return Err(SceneError::IdOutOfRange(id));
        }
        if !self.used.insert(id) {
            return Err(SceneError::DuplicateId(id));
        }
        self.free.remove(&id);
        if id >= self.next {
            self.next = id + 1;
        }
        Ok(())
    }

    /// Return an id to the free-list
    pub fn release(&mut self, id: NodeId) -> Result<(), SceneError> {
        if !self.used.remove(&id) {
            return Err(SceneError::InvalidId(id));
        }
        self.free.insert(id);
        Ok(())
    }

    /// Whether `id` is currently in use
    #[inline]
    pub fn is_used(&self, id: NodeId) -> bool {
        self.used.contains(&id)
    }

    /// Number of ids in use
    #[inline]
    pub fn len(&self) -> usize {
        self.used.len()
    }

    /// Whether no id is in use
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.used.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocate_is_monotonic() {
        let mut pool = IdPool::new();
        assert_eq!(pool.allocate(), 0);
        assert_eq!(pool.allocate(), 1);
        assert_eq!(pool.allocate(), 2);
        assert_eq!(pool.len(), 3);
    }

    #[test]
    fn test_released_ids_recycle_in_ascending_order() {
        let mut pool = IdPool::new();
        for _ in 0..7 {
            pool.allocate();
        }
        pool.release(5).unwrap();
        pool.release(3).unwrap();
        assert_eq!(pool.allocate(), 3);
        assert_eq!(pool.allocate(), 5);
        assert_eq!(pool.allocate(), 7);
    }

    #[test]
    fn test_register_advances_counter() {
        let mut pool = IdPool::new();
        pool.register(10).unwrap();
        assert_eq!(pool.allocate(), 11);
        assert_eq!(pool.register(10), Err(SceneError::DuplicateId(10)));
    }

    #[test]
    fn test_register_claims_released_id() {
        let mut pool = IdPool::new();
        pool.allocate();
        pool.allocate();
        pool.release(0).unwrap();
        pool.register(0).unwrap();
        assert_eq!(pool.allocate(), 2);
    }

    #[test]
    fn test_register_rejects_unencodable_id() {
        let mut pool = IdPool::new();
        pool.register(MAX_NODE_ID).unwrap();
        assert_eq!(
            pool.register(MAX_NODE_ID + 2),
            Err(SceneError::IdOutOfRange(MAX_NODE_ID + 2))
        );
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn test_release_unknown_id() {
        let mut pool = IdPool::new();
        assert_eq!(pool.release(4), Err(SceneError::InvalidId(4)));
        let id = pool.allocate();
        pool.release(id).unwrap();
        assert_eq!(pool.release(id), Err(SceneError::InvalidId(id)));
        assert!(pool.is_empty());
    }
}
