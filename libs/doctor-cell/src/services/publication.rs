use chrono::{DateTime, Utc};
use tracing::info;

use crate::models::{PublicationState, PublicationStatus};

impl PublicationState {
    /// Publishing an already published schedule is a no-op.
    pub fn publish(&mut self, now: DateTime<Utc>) -> &PublicationState {
        if self.status != PublicationStatus::Published {
            self.status = PublicationStatus::Published;
            self.last_published_at = Some(now);
            info!("Schedule published at {}", now);
        }
        self
    }

    /// Any configuration change invalidates a published schedule.
    pub fn mark_modified(&mut self) {
        if self.status == PublicationStatus::Published {
            info!("Schedule changed after publication - reverting to draft");
            self.status = PublicationStatus::Draft;
        }
    }
}
