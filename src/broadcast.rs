//! Fan-out of one payload to every live surface.

use std::sync::Arc;

use tracing::{trace, warn};

use crate::events::{Channel, EventArg};
use crate::surface::{MessageEndpoint, SurfaceEnumerator};

/// Outcome counts of a single broadcast.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Windows returned by the enumerator.
    pub surfaces: usize,
    pub delivered: usize,
    /// Targets left out: destroyed, endpoint gone, or ineligible kind.
    pub skipped: usize,
    /// Targets whose endpoint returned an error.
    pub failed: usize,
}

/// Delivers `(channel, args)` to every live window and its eligible views.
///
/// Targets are discovered on every call. Liveness and endpoints are read
/// again right before each send, so a window or view destroyed after
/// enumeration is skipped rather than sent to. A send error is isolated to
/// its target: it is logged and delivery moves on.
pub struct Broadcaster {
    surfaces: Arc<dyn SurfaceEnumerator>,
}

impl Broadcaster {
    pub fn new(surfaces: Arc<dyn SurfaceEnumerator>) -> Self {
        Self { surfaces }
    }

    /// Broadcast one occurrence.
    pub fn broadcast(&self, channel: &Channel, args: &[EventArg]) -> BroadcastReport {
        let mut report = BroadcastReport::default();

        for surface in self.surfaces.live_surfaces() {
            report.surfaces += 1;

            if surface.is_destroyed() {
                report.skipped += 1;
                continue;
            }

            match surface.endpoint() {
                Some(endpoint) => {
                    deliver(endpoint.as_ref(), surface.label(), channel, args, &mut report)
                }
                None => report.skipped += 1,
            }

            for child in surface.children() {
                if !child.kind().is_broadcast_target() || child.is_destroyed() {
                    report.skipped += 1;
                    continue;
                }
                match child.endpoint() {
                    Some(endpoint) => {
                        deliver(endpoint.as_ref(), child.label(), channel, args, &mut report)
                    }
                    None => report.skipped += 1,
                }
            }
        }

        report
    }
}

fn deliver(
    endpoint: &dyn MessageEndpoint,
    target: &str,
    channel: &Channel,
    args: &[EventArg],
    report: &mut BroadcastReport,
) {
    match endpoint.send(channel, args) {
        Ok(()) => {
            trace!(channel = %channel, target = %target, "delivered");
            report.delivered += 1;
        }
        Err(e) => {
            warn!(channel = %channel, target = %target, error = %e, "send failed");
            report.failed += 1;
        }
    }
}
