//! Access-control-list based authorization.
//!
//! A protected subject owns exactly one [`AccessControlList`]. Each
//! [`AccessControlRecord`] grants an [`AccessLevel`] to a [`PermissionHolder`]
//! (a principal, a group or a role). [`AuthorizationService`] aggregates the
//! levels granted to a principal and compares them with the requested one.

pub mod acl;
pub mod cache;
pub mod directory;
pub mod engine;
pub mod errors;
pub mod events;
pub mod holder;
pub mod level;
pub mod record;
pub mod service;
pub mod store;
pub mod types;

pub use acl::AccessControlList;
pub use cache::AclCache;
pub use directory::{DbDirectory, PrincipalDirectory};
pub use engine::AuthorizationService;
pub use errors::AuthzError;
pub use events::{AclEvent, AclEventKind, AclEvents};
pub use holder::PermissionHolder;
pub use level::AccessLevel;
pub use record::AccessControlRecord;
pub use service::AclService;
pub use store::{AclStore, RecordChanges};
pub use types::{AclId, GroupId, PrincipalId, PrincipalRef, RecordId, RoleId, SubjectId};
