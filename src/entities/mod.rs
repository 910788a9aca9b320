pub mod access_control_list;
pub mod access_control_record;
pub mod principal;
pub mod principal_role;
pub mod subject_acl;
pub mod user_group;
pub mod user_group_member;

pub use access_control_list::Entity as AccessControlList;
pub use access_control_record::Entity as AccessControlRecord;
pub use principal::Entity as Principal;
pub use principal_role::Entity as PrincipalRole;
pub use subject_acl::Entity as SubjectAcl;
pub use user_group::Entity as UserGroup;
pub use user_group_member::Entity as UserGroupMember;
