//! Bidirectional tag registry.
//!
//! Tracks which cache keys belong to which revalidation tags so a tag can be
//! invalidated without scanning the store.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use std::sync::RwLock;

use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::registry";

/// Tracks tag → keys and key → tags mappings.
pub struct TagRegistry<K> {
    tag_to_keys: RwLock<HashMap<String, HashSet<K>>>,
    key_to_tags: RwLock<HashMap<K, HashSet<String>>>,
}

impl<K> TagRegistry<K>
where
    K: Clone + Eq + Hash,
{
    pub fn new() -> Self {
        Self {
            tag_to_keys: RwLock::new(HashMap::new()),
            key_to_tags: RwLock::new(HashMap::new()),
        }
    }

    /// Register `key` under every tag in `tags`.
    pub fn register<I, S>(&self, key: K, tags: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut t2k = rw_write(&self.tag_to_keys, SOURCE, "register.tag_to_keys");
        let mut k2t = rw_write(&self.key_to_tags, SOURCE, "register.key_to_tags");

        let entry = k2t.entry(key.clone()).or_default();
        for tag in tags {
            let tag = tag.into();
            t2k.entry(tag.clone()).or_default().insert(key.clone());
            entry.insert(tag);
        }
    }

    /// Remove a single key from every tag it was registered under.
    pub fn unregister(&self, key: &K) {
        let mut t2k = rw_write(&self.tag_to_keys, SOURCE, "unregister.tag_to_keys");
        let mut k2t = rw_write(&self.key_to_tags, SOURCE, "unregister.key_to_tags");

        if let Some(tags) = k2t.remove(key) {
            for tag in tags {
                if let Some(keys) = t2k.get_mut(&tag) {
                    keys.remove(key);
                    if keys.is_empty() {
                        t2k.remove(&tag);
                    }
                }
            }
        }
    }

    /// Detach every key registered under `tag` and return them.
    ///
    /// Keys also registered under other tags stay listed there.
    pub fn take_tag(&self, tag: &str) -> HashSet<K> {
        let mut t2k = rw_write(&self.tag_to_keys, SOURCE, "take_tag.tag_to_keys");
        let mut k2t = rw_write(&self.key_to_tags, SOURCE, "take_tag.key_to_tags");

        let keys = t2k.remove(tag).unwrap_or_default();
        for key in &keys {
            if let Some(tags) = k2t.get_mut(key) {
                tags.remove(tag);
                if tags.is_empty() {
                    k2t.remove(key);
                }
            }
        }
        keys
    }

    pub fn tag_count(&self) -> usize {
        rw_read(&self.tag_to_keys, SOURCE, "tag_count").len()
    }

    pub fn key_count(&self) -> usize {
        rw_read(&self.key_to_tags, SOURCE, "key_count").len()
    }
}

impl<K> Default for TagRegistry<K>
where
    K: Clone + Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}
