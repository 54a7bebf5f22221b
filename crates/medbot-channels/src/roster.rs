//! Display-name roster shared by the transports.
//!
//! Names are matched case-insensitively, the way a chat client matches a
//! contact's full name. Configured contacts are fixed at startup and always
//! win; names learned from traffic only fill in names nobody configured.

use std::collections::HashMap;
use std::sync::RwLock;

/// Thread-safe map from display name to transport-native identifier.
#[derive(Debug, Default)]
pub struct Roster {
    contacts: HashMap<String, String>,
    learned: RwLock<HashMap<String, String>>,
}

impl Roster {
    /// Build a roster seeded with configured contacts.
    pub fn from_contacts<I, K, V>(contacts: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: ToString,
    {
        let contacts = contacts
            .into_iter()
            .filter_map(|(name, id)| normalize(name.as_ref()).map(|n| (n, id.to_string())))
            .collect();
        Self {
            contacts,
            learned: RwLock::new(HashMap::new()),
        }
    }

    /// Record that `name` currently maps to `id`. Names of configured
    /// contacts are never learned.
    pub fn learn(&self, name: &str, id: &str) {
        let Some(key) = normalize(name) else {
            return;
        };
        if self.contacts.contains_key(&key) {
            return;
        }
        let mut learned = self.learned.write().unwrap_or_else(|e| e.into_inner());
        learned.insert(key, id.to_string());
    }

    /// Look up the identifier for `name`, configured contacts first.
    pub fn lookup(&self, name: &str) -> Option<String> {
        let key = normalize(name)?;
        if let Some(id) = self.contacts.get(&key) {
            return Some(id.clone());
        }
        let learned = self.learned.read().unwrap_or_else(|e| e.into_inner());
        learned.get(&key).cloned()
    }

    #[cfg(test)]
    pub(crate) fn learned_len(&self) -> usize {
        self.learned.read().unwrap_or_else(|e| e.into_inner()).len()
    }
}

fn normalize(name: &str) -> Option<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}
