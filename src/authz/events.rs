use serde::Serialize;
use tokio::sync::broadcast;

use crate::authz::types::{AclId, SubjectId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AclEventKind {
    Created,
    Updated,
    Removed,
}

/// Published by the store after a mutation has committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AclEvent {
    pub acl_id: AclId,
    pub subject: Option<SubjectId>,
    pub kind: AclEventKind,
    /// Unix timestamp of the commit; also written to `access_control_lists.updated_at`
    pub at: i64,
}

/// Fan-out channel for [`AclEvent`]s.
#[derive(Debug, Clone)]
pub struct AclEvents {
    tx: broadcast::Sender<AclEvent>,
}

impl AclEvents {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AclEvent> {
        self.tx.subscribe()
    }

    pub fn publish(&self, event: AclEvent) {
        // No subscribers is fine
        if self.tx.send(event).is_err() {
            tracing::trace!("No ACL event subscribers");
        }
    }
}

impl Default for AclEvents {
    fn default() -> Self {
        Self::new(64)
    }
}
