//! In-process multi-listener event source.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tracing::trace;

use super::{EventArg, EventSource, Listener, Unsubscribe, UnsubscribeError};

struct ListenerTable {
    next_id: u64,
    /// `None` once the emitter is closed.
    listeners: Option<Vec<(u64, Listener)>>,
}

fn lock(table: &Mutex<ListenerTable>) -> MutexGuard<'_, ListenerTable> {
    table.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Event source that fans an occurrence out to its own listeners.
///
/// Listeners run synchronously, in subscription order, on the caller's
/// thread. The listener list is snapshotted before invocation so listeners
/// may unsubscribe (or subscribe) while an emission is running.
#[derive(Clone)]
pub struct Emitter {
    name: Arc<str>,
    table: Arc<Mutex<ListenerTable>>,
}

impl Emitter {
    /// Create an open emitter. The name is only used in logs.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Arc::from(name.into()),
            table: Arc::new(Mutex::new(ListenerTable {
                next_id: 0,
                listeners: Some(Vec::new()),
            })),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Deliver an occurrence to every current listener.
    ///
    /// Returns the number of listeners invoked.
    pub fn emit(&self, args: &[EventArg]) -> usize {
        let snapshot: Vec<Listener> = match &lock(&self.table).listeners {
            Some(listeners) => listeners.iter().map(|(_, l)| Arc::clone(l)).collect(),
            None => return 0,
        };

        trace!(emitter = %self.name, listeners = snapshot.len(), "emitting");
        for listener in &snapshot {
            listener(args);
        }
        snapshot.len()
    }

    /// Number of attached listeners.
    pub fn listener_count(&self) -> usize {
        lock(&self.table).listeners.as_ref().map_or(0, Vec::len)
    }

    /// Drop every listener. Outstanding handles report `SourceClosed`.
    pub fn close(&self) {
        lock(&self.table).listeners = None;
    }

    pub fn is_closed(&self) -> bool {
        lock(&self.table).listeners.is_none()
    }
}

impl EventSource for Emitter {
    fn subscribe(&self, listener: Listener) -> Unsubscribe {
        let id = {
            let mut table = lock(&self.table);
            let id = table.next_id;
            table.next_id += 1;
            match table.listeners.as_mut() {
                Some(listeners) => listeners.push((id, listener)),
                None => return Unsubscribe::new(|| Err(UnsubscribeError::SourceClosed)),
            }
            id
        };

        let weak: Weak<Mutex<ListenerTable>> = Arc::downgrade(&self.table);
        Unsubscribe::new(move || {
            let table = weak.upgrade().ok_or(UnsubscribeError::SourceClosed)?;
            let mut table = lock(&table);
            let listeners = table
                .listeners
                .as_mut()
                .ok_or(UnsubscribeError::SourceClosed)?;
            listeners.retain(|(lid, _)| *lid != id);
            Ok(())
        })
    }
}

impl std::fmt::Debug for Emitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Emitter")
            .field("name", &self.name)
            .field("listeners", &self.listener_count())
            .finish()
    }
}
