use std::collections::HashMap;
use std::sync::RwLock;

use crate::contracts::{LockResultExt, LockPoisoned};

/// Known table names.
///
/// Lookups ignore ASCII case, matching how SQLite resolves table names.
/// When disabled every lookup misses and every update is a no-op, so
/// callers always fall through to a live existence query.
#[derive(Debug)]
pub struct TableCache {
    enabled: bool,
    /// Folded name to the spelling it was first seen with
    names: RwLock<HashMap<String, String>>,
}

impl TableCache {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            names: RwLock::new(HashMap::new()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn contains(&self, name: &str) -> Result<bool, LockPoisoned> {
        if !self.enabled {
            return Ok(false);
        }
        Ok(self.names.read().map_lock_err()?.contains_key(&fold(name)))
    }

    pub fn insert(&self, name: &str) -> Result<(), LockPoisoned> {
        if self.enabled {
            self.names
                .write()
                .map_lock_err()?
                .entry(fold(name))
                .or_insert_with(|| name.to_string());
        }
        Ok(())
    }

    /// Replaces the whole set, e.g. after listing the database.
    pub fn replace(&self, names: impl IntoIterator<Item = String>) -> Result<(), LockPoisoned> {
        if self.enabled {
            *self.names.write().map_lock_err()? =
                names.into_iter().map(|name| (fold(&name), name)).collect();
        }
        Ok(())
    }

    /// Cached names in sorted order.
    pub fn names(&self) -> Result<Vec<String>, LockPoisoned> {
        let mut names: Vec<_> = self.names.read().map_lock_err()?.values().cloned().collect();
        names.sort();
        Ok(names)
    }
}

fn fold(name: &str) -> String {
    name.to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enabled_cache_tracks_names() {
        let cache = TableCache::new(true);
        assert!(!cache.contains("a").unwrap());
        cache.insert("b").unwrap();
        cache.insert("a").unwrap();
        assert!(cache.contains("a").unwrap());
        assert_eq!(cache.names().unwrap(), vec!["a", "b"]);

        cache.replace(vec!["c".to_string()]).unwrap();
        assert!(!cache.contains("a").unwrap());
        assert_eq!(cache.names().unwrap(), vec!["c"]);
    }

    #[test]
    fn lookups_ignore_ascii_case() {
        let cache = TableCache::new(true);
        cache.insert("Attempts").unwrap();
        assert!(cache.contains("attempts").unwrap());
        assert!(cache.contains("ATTEMPTS").unwrap());

        // The first spelling seen is the one reported.
        cache.insert("attempts").unwrap();
        assert_eq!(cache.names().unwrap(), vec!["Attempts"]);

        cache.replace(vec!["Runs".to_string()]).unwrap();
        assert!(cache.contains("runs").unwrap());
        assert!(!cache.contains("attempts").unwrap());
    }

    #[test]
    fn disabled_cache_always_misses() {
        let cache = TableCache::new(false);
        cache.insert("a").unwrap();
        assert!(!cache.contains("a").unwrap());
        assert!(cache.names().unwrap().is_empty());
    }
}
