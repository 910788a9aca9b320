use serde::{Deserialize, Serialize};

use crate::authz::directory::PrincipalDirectory;
use crate::authz::errors::AuthzError;
use crate::authz::level::AccessLevel;
use crate::authz::types::{GroupId, PrincipalId, PrincipalRef, RoleId};

/// Identity criterion a record grants its level to.
///
/// A holder only names who it applies to; group membership and role
/// assignments are resolved at evaluation time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "lowercase")]
pub enum PermissionHolder {
    Principal(PrincipalId),
    Group(GroupId),
    Role(RoleId),
}

impl PermissionHolder {
    pub const PRINCIPAL: &'static str = "principal";
    pub const GROUP: &'static str = "group";
    pub const ROLE: &'static str = "role";

    /// Rebuild a holder from its stored `(holder_type, holder_id)` columns.
    ///
    /// Unknown types are an error rather than a skipped record: ignoring a
    /// record would silently change what the list grants.
    pub fn from_parts(
        record: &str,
        holder_type: &str,
        holder_id: &str,
    ) -> Result<Self, AuthzError> {
        match holder_type {
            Self::PRINCIPAL => Ok(PermissionHolder::Principal(holder_id.into())),
            Self::GROUP => Ok(PermissionHolder::Group(holder_id.into())),
            Self::ROLE => Ok(PermissionHolder::Role(holder_id.into())),
            other => Err(AuthzError::UnsupportedHolderVariant {
                record: record.to_string(),
                holder_type: other.to_string(),
            }),
        }
    }

    pub fn holder_type(&self) -> &'static str {
        match self {
            PermissionHolder::Principal(_) => Self::PRINCIPAL,
            PermissionHolder::Group(_) => Self::GROUP,
            PermissionHolder::Role(_) => Self::ROLE,
        }
    }

    pub fn holder_id(&self) -> &str {
        match self {
            PermissionHolder::Principal(id) => id.as_str(),
            PermissionHolder::Group(id) => id.as_str(),
            PermissionHolder::Role(id) => id.as_str(),
        }
    }

    pub async fn matches(
        &self,
        candidate: &PrincipalRef,
        directory: &dyn PrincipalDirectory,
    ) -> Result<bool, AuthzError> {
        match self {
            PermissionHolder::Principal(id) => Ok(*id == candidate.id),
            PermissionHolder::Group(group) => {
                directory.is_group_member(group, &candidate.id).await
            }
            PermissionHolder::Role(role) => Ok(candidate.has_role(role)),
        }
    }

    /// `Some(own_level)` when the holder matches `candidate`.
    pub async fn granted_level(
        &self,
        candidate: &PrincipalRef,
        own_level: AccessLevel,
        directory: &dyn PrincipalDirectory,
    ) -> Result<Option<AccessLevel>, AuthzError> {
        Ok(self
            .matches(candidate, directory)
            .await?
            .then_some(own_level))
    }
}

impl std::fmt::Display for PermissionHolder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.holder_type(), self.holder_id())
    }
}
