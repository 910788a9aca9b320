use std::collections::HashSet;
use std::sync::Arc;

use crate::authz::acl::AccessControlList;
use crate::authz::directory::PrincipalDirectory;
use crate::authz::errors::AuthzError;
use crate::authz::level::AccessLevel;
use crate::authz::store::AclStore;
use crate::authz::types::{PrincipalRef, SubjectId};

/// Access decisions over the subject's access control list.
///
/// Administrators bypass list evaluation. For everybody else a subject without
/// a list grants nothing.
#[derive(Clone)]
pub struct AuthorizationService {
    store: Arc<AclStore>,
    directory: Arc<dyn PrincipalDirectory>,
}

impl AuthorizationService {
    pub fn new(store: Arc<AclStore>, directory: Arc<dyn PrincipalDirectory>) -> Self {
        Self { store, directory }
    }

    pub fn store(&self) -> &Arc<AclStore> {
        &self.store
    }

    pub fn directory(&self) -> &Arc<dyn PrincipalDirectory> {
        &self.directory
    }

    pub async fn can_read(
        &self,
        principal: &PrincipalRef,
        subject: &SubjectId,
    ) -> Result<bool, AuthzError> {
        self.has_access_level(AccessLevel::Read, principal, subject)
            .await
    }

    pub async fn can_modify(
        &self,
        principal: &PrincipalRef,
        subject: &SubjectId,
    ) -> Result<bool, AuthzError> {
        self.has_access_level(AccessLevel::Write, principal, subject)
            .await
    }

    /// Only the authorization half of a removal; domain constraints on removing
    /// the subject are checked by the caller.
    pub async fn can_remove(
        &self,
        principal: &PrincipalRef,
        subject: &SubjectId,
    ) -> Result<bool, AuthzError> {
        self.has_access_level(AccessLevel::Security, principal, subject)
            .await
    }

    pub async fn has_access_level(
        &self,
        expected: AccessLevel,
        principal: &PrincipalRef,
        subject: &SubjectId,
    ) -> Result<bool, AuthzError> {
        if principal.is_administrator() {
            return Ok(true);
        }

        let Some(acl) = self.store.find_for_subject(subject).await? else {
            tracing::debug!(principal = %principal.id, %subject, "No ACL for subject, denying");
            return Ok(false);
        };

        let granted = self.granted_levels(&acl, principal).await?;
        let allowed = granted.iter().any(|level| level.includes(expected));
        tracing::debug!(
            principal = %principal.id,
            %subject,
            %expected,
            allowed,
            "Evaluated access"
        );
        Ok(allowed)
    }

    /// Highest level `principal` holds on `subject`.
    pub async fn access_level_for(
        &self,
        principal: &PrincipalRef,
        subject: &SubjectId,
    ) -> Result<AccessLevel, AuthzError> {
        if principal.is_administrator() {
            return Ok(AccessLevel::Security);
        }
        let Some(acl) = self.store.find_for_subject(subject).await? else {
            return Ok(AccessLevel::None);
        };
        let granted = self.granted_levels(&acl, principal).await?;
        Ok(AccessLevel::highest(granted).unwrap_or(AccessLevel::None))
    }

    /// The subjects `principal` may read, in input order.
    pub async fn filter_readable(
        &self,
        principal: &PrincipalRef,
        subjects: impl IntoIterator<Item = SubjectId>,
    ) -> Result<Vec<SubjectId>, AuthzError> {
        let mut readable = Vec::new();
        for subject in subjects {
            if self.can_read(principal, &subject).await? {
                readable.push(subject);
            }
        }
        Ok(readable)
    }

    async fn granted_levels(
        &self,
        acl: &AccessControlList,
        principal: &PrincipalRef,
    ) -> Result<HashSet<AccessLevel>, AuthzError> {
        let mut granted = HashSet::new();
        for record in acl.records() {
            if let Some(level) = record
                .access_level_for(principal, self.directory.as_ref())
                .await?
            {
                granted.insert(level);
            }
        }
        Ok(granted)
    }
}
