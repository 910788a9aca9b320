use parking_lot::RwLock;
use std::collections::HashMap;

use crate::authz::types::{AclId, SubjectId};

/// Subject <-> list mapping cache.
///
/// Saves the reverse `subject_acls` query on repeated checks against the same
/// subject. The database stays the source of truth: a stale entry is detected
/// by the store and evicted. Entries may be evicted from any thread while
/// others read.
#[derive(Debug, Default)]
pub struct AclCache {
    by_subject: RwLock<HashMap<SubjectId, AclId>>,
    by_acl: RwLock<HashMap<AclId, SubjectId>>,
}

impl AclCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn acl_for_subject(&self, subject: &SubjectId) -> Option<AclId> {
        self.by_subject.read().get(subject).cloned()
    }

    pub fn insert(&self, subject: SubjectId, acl: AclId) {
        // Lock order: by_subject, then by_acl
        let mut by_subject = self.by_subject.write();
        let mut by_acl = self.by_acl.write();
        if let Some(previous) = by_subject.insert(subject.clone(), acl.clone()) {
            by_acl.remove(&previous);
        }
        by_acl.insert(acl, subject);
    }

    pub fn evict_acl(&self, acl: &AclId) {
        let mut by_subject = self.by_subject.write();
        let mut by_acl = self.by_acl.write();
        if let Some(subject) = by_acl.remove(acl) {
            by_subject.remove(&subject);
            tracing::debug!(%acl, %subject, "Evicted cached subject mapping");
        }
    }

    pub fn evict_subject(&self, subject: &SubjectId) {
        let mut by_subject = self.by_subject.write();
        let mut by_acl = self.by_acl.write();
        if let Some(acl) = by_subject.remove(subject) {
            by_acl.remove(&acl);
            tracing::debug!(%acl, %subject, "Evicted cached subject mapping");
        }
    }

    pub fn len(&self) -> usize {
        self.by_subject.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
