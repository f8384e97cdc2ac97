//! Teardown of every subscription at process termination.

use std::any::Any;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};

use serde::Serialize;
use tracing::{error, info};

use crate::dispatcher::SubscriptionSet;
use crate::events::{Channel, UnsubscribeError};

/// One subscription that did not unsubscribe cleanly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeardownFailure {
    pub channel: Channel,
    pub error: UnsubscribeError,
}

/// Result of firing the hook.
#[derive(Debug, Clone, Default)]
pub struct ShutdownReport {
    pub unsubscribed: Vec<Channel>,
    pub failures: Vec<TeardownFailure>,
}

impl ShutdownReport {
    /// Number of handles invoked, successful or not.
    pub fn attempted(&self) -> usize {
        self.unsubscribed.len() + self.failures.len()
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn summary(&self) -> ShutdownSummary {
        ShutdownSummary {
            unsubscribed: self.unsubscribed.len(),
            failed: self.failures.len(),
        }
    }
}

/// Serializable counts of a [`ShutdownReport`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ShutdownSummary {
    pub unsubscribed: usize,
    pub failed: usize,
}

/// Unsubscribes everything once the process is going down.
///
/// The hook owns the subscriptions and [`ShutdownHook::fire`] consumes it,
/// so every handle is invoked exactly once. Each handle runs in isolation:
/// an error or a panic is logged and recorded, and the remaining handles
/// still run.
#[derive(Debug)]
pub struct ShutdownHook {
    subscriptions: SubscriptionSet,
}

impl ShutdownHook {
    pub fn new(subscriptions: SubscriptionSet) -> Self {
        Self { subscriptions }
    }

    /// Number of subscriptions the hook will tear down.
    pub fn pending(&self) -> usize {
        self.subscriptions.len()
    }

    /// Wait for `termination`, then fire.
    pub async fn arm<F>(self, termination: F) -> ShutdownReport
    where
        F: Future<Output = ()>,
    {
        termination.await;
        self.fire()
    }

    /// Invoke every unsubscribe handle.
    pub fn fire(self) -> ShutdownReport {
        let mut report = ShutdownReport::default();

        for subscription in self.subscriptions {
            let channel = subscription.channel().clone();
            let outcome = panic::catch_unwind(AssertUnwindSafe(move || subscription.unsubscribe()))
                .unwrap_or_else(|payload| {
                    Err(UnsubscribeError::Panicked(panic_message(payload.as_ref())))
                });

            match outcome {
                Ok(()) => report.unsubscribed.push(channel),
                Err(e) => {
                    error!(channel = %channel, error = %e, "unsubscribe error");
                    report.failures.push(TeardownFailure { channel, error: e });
                }
            }
        }

        info!(
            attempted = report.attempted(),
            unsubscribed = report.unsubscribed.len(),
            failed = report.failures.len(),
            "event channels torn down"
        );
        report
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
