use miette::Diagnostic;
use thiserror::Error;

use crate::authz::types::{AclId, PrincipalId, SubjectId};

#[derive(Debug, Error, Diagnostic)]
pub enum AuthzError {
    #[error("Access control list `{0}` not found")]
    #[diagnostic(
        code(vocab_acl::authz::not_found),
        help("Create the list with `persist` before updating it")
    )]
    NotFound(AclId),

    #[error("Subject `{0}` is not protected by an access control list")]
    #[diagnostic(
        code(vocab_acl::authz::subject_not_protected),
        help("Protect the subject first (create its default list)")
    )]
    SubjectNotProtected(SubjectId),

    #[error("Access control list `{0}` already exists")]
    #[diagnostic(
        code(vocab_acl::authz::duplicate_acl),
        help("Generate a fresh identifier, or use `update` to replace the existing record set")
    )]
    DuplicateAcl(AclId),

    #[error("Subject `{0}` is already protected by an access control list")]
    #[diagnostic(
        code(vocab_acl::authz::subject_already_protected),
        help("Each subject owns exactly one list; update the existing one instead")
    )]
    SubjectAlreadyProtected(SubjectId),

    #[error("Subject `{subject}` is bound to {count} access control lists")]
    #[diagnostic(
        code(vocab_acl::authz::multiple_acls),
        help("Data integrity violation in the subject_acls table; an operator must remove the extra rows")
    )]
    MultipleAclsForSubject { subject: SubjectId, count: usize },

    #[error("Access control record `{record}` has unsupported holder type `{holder_type}`")]
    #[diagnostic(
        code(vocab_acl::authz::unsupported_holder),
        help("Supported holder types: principal, group, role")
    )]
    UnsupportedHolderVariant { record: String, holder_type: String },

    #[error("Invalid access level `{0}`")]
    #[diagnostic(
        code(vocab_acl::authz::invalid_level),
        help("Supported levels: NONE, READ, WRITE, SECURITY")
    )]
    InvalidAccessLevel(String),

    #[error("Unknown principal `{0}`")]
    #[diagnostic(code(vocab_acl::authz::unknown_principal))]
    UnknownPrincipal(PrincipalId),

    #[error("Database error: {0}")]
    #[diagnostic(code(vocab_acl::authz::db))]
    Db(#[from] sea_orm::DbErr),
}

impl AuthzError {
    /// Integrity failures that must reach an operator instead of being retried or
    /// mapped to a plain "forbidden".
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            AuthzError::MultipleAclsForSubject { .. }
                | AuthzError::UnsupportedHolderVariant { .. }
                | AuthzError::InvalidAccessLevel(_)
        )
    }
}
