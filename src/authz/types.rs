use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::storage::random_id;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

string_id!(
    /// Identifier of an access control list.
    AclId
);
string_id!(
    /// Identifier of a single record inside an access control list.
    RecordId
);
string_id!(
    /// Opaque identifier of a protected entity (vocabulary, term, resource...).
    SubjectId
);
string_id!(PrincipalId);
string_id!(GroupId);
string_id!(RoleId);

impl AclId {
    pub fn generate() -> Self {
        Self(random_id())
    }
}

impl RecordId {
    pub fn generate() -> Self {
        Self(random_id())
    }
}

/// A resolved principal: identity plus the roles assigned at resolution time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrincipalRef {
    pub id: PrincipalId,
    pub roles: BTreeSet<RoleId>,
    /// Set by the directory when the principal carries the administrator role
    pub administrator: bool,
}

impl PrincipalRef {
    pub fn new(id: impl Into<PrincipalId>) -> Self {
        Self {
            id: id.into(),
            roles: BTreeSet::new(),
            administrator: false,
        }
    }

    pub fn with_role(mut self, role: impl Into<RoleId>) -> Self {
        self.roles.insert(role.into());
        self
    }

    pub fn as_administrator(mut self) -> Self {
        self.administrator = true;
        self
    }

    pub fn has_role(&self, role: &RoleId) -> bool {
        self.roles.contains(role)
    }

    pub fn is_administrator(&self) -> bool {
        self.administrator
    }
}
