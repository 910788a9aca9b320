use serde::{Deserialize, Serialize};

use crate::authz::directory::PrincipalDirectory;
use crate::authz::errors::AuthzError;
use crate::authz::holder::PermissionHolder;
use crate::authz::level::AccessLevel;
use crate::authz::types::{PrincipalRef, RecordId};

/// One grant inside an access control list.
///
/// Identity is the record id alone: two records with the same holder and level
/// are still distinct records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessControlRecord {
    id: RecordId,
    access_level: AccessLevel,
    holder: PermissionHolder,
}

impl AccessControlRecord {
    pub fn new(holder: PermissionHolder, access_level: AccessLevel) -> Self {
        Self::with_id(RecordId::generate(), holder, access_level)
    }

    pub fn with_id(id: RecordId, holder: PermissionHolder, access_level: AccessLevel) -> Self {
        Self {
            id,
            access_level,
            holder,
        }
    }

    pub fn id(&self) -> &RecordId {
        &self.id
    }

    pub fn access_level(&self) -> AccessLevel {
        self.access_level
    }

    /// The level is the only part of a record that changes after creation.
    pub fn set_access_level(&mut self, level: AccessLevel) {
        self.access_level = level;
    }

    pub fn holder(&self) -> &PermissionHolder {
        &self.holder
    }

    pub async fn access_level_for(
        &self,
        principal: &PrincipalRef,
        directory: &dyn PrincipalDirectory,
    ) -> Result<Option<AccessLevel>, AuthzError> {
        self.holder
            .granted_level(principal, self.access_level, directory)
            .await
    }
}

impl PartialEq for AccessControlRecord {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for AccessControlRecord {}

impl std::hash::Hash for AccessControlRecord {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}
