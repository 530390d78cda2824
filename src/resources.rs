//! Reference-counted cache for shared read-mostly resources.
//!
//! Consumers acquire a handle by key; the resource is loaded at most once
//! while any handle is alive and reloaded after the last handle drops. The
//! manager is owned by the composition root and passed by reference to
//! consumers rather than living as a process-wide singleton.

use std::collections::HashMap;
use std::rc::{Rc, Weak};

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn loads_once_while_handles_alive() {
        let mut manager: ResourceManager<String> = ResourceManager::new();
        let loads = Cell::new(0);
        let load = || {
            loads.set(loads.get() + 1);
            "mesh".to_string()
        };

        let a = manager.acquire("tomato", load);
        let b = manager.acquire("tomato", || unreachable!("must reuse the cached resource"));
        assert_eq!(loads.get(), 1);
        assert!(Rc::ptr_eq(&a, &b));
    }

    #[test]
    fn reloads_after_last_handle_drops() {
        let mut manager: ResourceManager<String> = ResourceManager::new();
        let loads = Cell::new(0);

        {
            let _a = manager.acquire("beaker", || {
                loads.set(loads.get() + 1);
                "mesh".to_string()
            });
        }
        assert!(!manager.is_loaded("beaker"));

        let _b = manager.acquire("beaker", || {
            loads.set(loads.get() + 1);
            "mesh".to_string()
        });
        assert_eq!(loads.get(), 2);
    }

    #[test]
    fn distinct_keys_load_independently() {
        let mut manager: ResourceManager<u32> = ResourceManager::new();
        let a = manager.acquire("spoon", || 1);
        let b = manager.acquire("sieve", || 2);
        assert_eq!((*a, *b), (1, 2));
    }

    #[test]
    fn purge_drops_dead_entries() {
        let mut manager: ResourceManager<u32> = ResourceManager::new();
        {
            let _a = manager.acquire("spoon", || 1);
        }
        manager.purge();
        assert_eq!(manager.len(), 0);
    }
}

#[derive(Debug, Default)]
pub struct ResourceManager<T> {
    cache: HashMap<String, Weak<T>>,
}

impl<T> ResourceManager<T> {
    pub fn new() -> Self {
        Self {
            cache: HashMap::new(),
        }
    }

    /// Returns a handle to the resource under `key`, invoking `load` only
    /// when no live handle exists.
    pub fn acquire<F: FnOnce() -> T>(&mut self, key: &str, load: F) -> Rc<T> {
        if let Some(resource) = self.cache.get(key).and_then(Weak::upgrade) {
            return resource;
        }
        let resource = Rc::new(load());
        self.cache.insert(key.to_string(), Rc::downgrade(&resource));
        resource
    }

    /// Whether a live handle to `key` currently exists.
    pub fn is_loaded(&self, key: &str) -> bool {
        self.cache
            .get(key)
            .is_some_and(|weak| weak.strong_count() > 0)
    }

    /// Number of cache entries, including dead ones awaiting purge.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Drops entries whose resource has been released.
    pub fn purge(&mut self) {
        self.cache.retain(|_, weak| weak.strong_count() > 0);
    }
}
