//! Domain event sources of the shell.
//!
//! Each [`EventDomain`] is one collaborator that publishes events to the UI
//! (application menu, updater, UI state, shared storage). The collaborators'
//! internal logic lives elsewhere; this module only owns one [`Emitter`] per
//! published key and turns them into the [`NamespaceRegistry`] the
//! dispatcher binds to.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::events::{EventArg, Emitter, NamespaceRegistry};

/// Error type for hub operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HubError {
    #[error("Unknown event: {namespace}:{key}")]
    UnknownEvent { namespace: String, key: String },
}

/// Collaborators that publish events to the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventDomain {
    ApplicationMenu,
    Updater,
    Ui,
    SharedStorage,
}

impl EventDomain {
    /// All domains, in registration order.
    pub const ALL: [EventDomain; 4] = [
        EventDomain::ApplicationMenu,
        EventDomain::Updater,
        EventDomain::Ui,
        EventDomain::SharedStorage,
    ];

    /// Namespace the domain's channels live under.
    pub fn namespace(self) -> &'static str {
        match self {
            EventDomain::ApplicationMenu => "applicationMenu",
            EventDomain::Updater => "updater",
            EventDomain::Ui => "ui",
            EventDomain::SharedStorage => "sharedStorage",
        }
    }

    /// Event keys the domain publishes.
    pub fn keys(self) -> &'static [&'static str] {
        match self {
            EventDomain::ApplicationMenu => &["newPageAction", "openAboutPageInSettingModal"],
            EventDomain::Updater => &["updateAvailable", "updateReady", "downloadProgress"],
            EventDomain::Ui => &[
                "onMaximized",
                "onFullScreen",
                "onTabViewsMetaChanged",
                "onToggleRightSidebar",
            ],
            EventDomain::SharedStorage => &["onGlobalStateChanged", "onGlobalCacheChanged"],
        }
    }

    pub fn from_namespace(namespace: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.namespace() == namespace)
    }
}

impl fmt::Display for EventDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.namespace())
    }
}

/// Owns the emitter behind every domain event.
pub struct DomainHub {
    emitters: Vec<(EventDomain, &'static str, Arc<Emitter>)>,
}

impl DomainHub {
    /// Create one emitter per (domain, key).
    pub fn new() -> Self {
        let emitters = EventDomain::ALL
            .into_iter()
            .flat_map(|domain| {
                domain.keys().iter().map(move |key| {
                    let name = format!("{}.{}", domain.namespace(), key);
                    (domain, *key, Arc::new(Emitter::new(name)))
                })
            })
            .collect();
        Self { emitters }
    }

    /// Emitter for one domain event.
    pub fn emitter(&self, domain: EventDomain, key: &str) -> Option<&Arc<Emitter>> {
        self.emitters
            .iter()
            .find(|(d, k, _)| *d == domain && *k == key)
            .map(|(_, _, e)| e)
    }

    /// Fire a domain event by its namespace and key.
    ///
    /// Returns the number of listeners that ran.
    pub fn emit(&self, namespace: &str, key: &str, args: &[EventArg]) -> Result<usize, HubError> {
        let emitter = EventDomain::from_namespace(namespace)
            .and_then(|domain| self.emitter(domain, key))
            .ok_or_else(|| HubError::UnknownEvent {
                namespace: namespace.to_string(),
                key: key.to_string(),
            })?;
        debug!(
            namespace = %namespace,
            key = %key,
            args = args.len(),
            closed = emitter.is_closed(),
            "domain event"
        );
        Ok(emitter.emit(args))
    }

    /// Registry of every domain event, in declaration order.
    pub fn registry(&self) -> NamespaceRegistry {
        let mut registry = NamespaceRegistry::new();
        for (domain, key, emitter) in &self.emitters {
            registry.insert(domain.namespace(), *key, Arc::clone(emitter) as _);
        }
        registry
    }

    /// Close every emitter.
    pub fn close(&self) {
        for (_, _, emitter) in &self.emitters {
            emitter.close();
        }
    }

    pub fn len(&self) -> usize {
        self.emitters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.emitters.is_empty()
    }
}

impl Default for DomainHub {
    fn default() -> Self {
        Self::new()
    }
}
