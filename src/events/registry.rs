//! Namespace registry: the static table of event sources.

use std::sync::Arc;

use super::{Channel, EventSource};

/// Shared handle to an event source.
pub type ArcSource = Arc<dyn EventSource>;

/// One (namespace, key, source) entry of the registry.
#[derive(Clone)]
pub struct RegistryEntry<'a> {
    pub namespace: &'a str,
    pub key: &'a str,
    pub source: &'a ArcSource,
}

impl RegistryEntry<'_> {
    /// Channel this entry is delivered on.
    pub fn channel(&self) -> Channel {
        Channel::new(self.namespace, self.key)
    }
}

struct Namespace {
    name: String,
    keys: Vec<(String, ArcSource)>,
}

/// Table of event sources grouped by namespace and key.
///
/// Insertion order is kept for both namespaces and keys; it is the order the
/// dispatcher subscribes in. The registry holds references to sources only.
///
/// # Example
///
/// ```ignore
/// let registry = NamespaceRegistry::new()
///     .with_source("updater", "updateReady", Arc::new(Emitter::new("updateReady")))
///     .with_source("ui", "onMaximized", Arc::new(Emitter::new("onMaximized")));
/// assert_eq!(registry.len(), 2);
/// ```
#[derive(Default)]
pub struct NamespaceRegistry {
    namespaces: Vec<Namespace>,
}

impl NamespaceRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`NamespaceRegistry::insert`].
    pub fn with_source(
        mut self,
        namespace: impl Into<String>,
        key: impl Into<String>,
        source: ArcSource,
    ) -> Self {
        self.insert(namespace, key, source);
        self
    }

    /// Register a source. A repeated key within a namespace replaces the
    /// earlier source and keeps its position.
    pub fn insert(
        &mut self,
        namespace: impl Into<String>,
        key: impl Into<String>,
        source: ArcSource,
    ) {
        let namespace = namespace.into();
        let key = key.into();

        let idx = match self.namespaces.iter().position(|ns| ns.name == namespace) {
            Some(idx) => idx,
            None => {
                self.namespaces.push(Namespace {
                    name: namespace,
                    keys: Vec::new(),
                });
                self.namespaces.len() - 1
            }
        };

        let keys = &mut self.namespaces[idx].keys;
        match keys.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = source,
            None => keys.push((key, source)),
        }
    }

    /// Every (namespace, key, source) triple, in registration order.
    pub fn triples(&self) -> impl Iterator<Item = RegistryEntry<'_>> {
        self.namespaces.iter().flat_map(|ns| {
            ns.keys.iter().map(move |(key, source)| RegistryEntry {
                namespace: &ns.name,
                key,
                source,
            })
        })
    }

    /// Namespace names, in registration order.
    pub fn namespaces(&self) -> impl Iterator<Item = &str> {
        self.namespaces.iter().map(|ns| ns.name.as_str())
    }

    /// Channels of every registered source.
    pub fn channels(&self) -> Vec<Channel> {
        self.triples().map(|e| e.channel()).collect()
    }

    /// Look up a source.
    pub fn get(&self, namespace: &str, key: &str) -> Option<&ArcSource> {
        self.namespaces
            .iter()
            .find(|ns| ns.name == namespace)?
            .keys
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, s)| s)
    }

    /// Total number of registered sources.
    pub fn len(&self) -> usize {
        self.namespaces.iter().map(|ns| ns.keys.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
