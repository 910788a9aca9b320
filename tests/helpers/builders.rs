use vocab_acl::authz::{
    AccessControlList, AccessControlRecord, AccessLevel, AclStore, DbDirectory, GroupId,
    PermissionHolder, PrincipalDirectory, PrincipalId, PrincipalRef, SubjectId,
};

/// Builder for creating test principals
pub struct PrincipalBuilder {
    id: String,
    username: String,
    roles: Vec<String>,
    groups: Vec<String>,
}

impl PrincipalBuilder {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            username: format!("user-{id}"),
            roles: Vec::new(),
            groups: Vec::new(),
        }
    }

    pub fn with_role(mut self, role: &str) -> Self {
        self.roles.push(role.to_string());
        self
    }

    pub fn in_group(mut self, group: &str) -> Self {
        self.groups.push(group.to_string());
        self
    }

    pub fn administrator(self) -> Self {
        self.with_role("admin")
    }

    pub async fn create(self, directory: &DbDirectory) -> PrincipalRef {
        let id = PrincipalId::from(self.id.as_str());
        directory
            .create_principal(&id, &self.username)
            .await
            .expect("Failed to create test principal");

        for role in &self.roles {
            directory
                .assign_role(&id, &role.as_str().into())
                .await
                .expect("Failed to assign role");
        }
        for group in &self.groups {
            let group = GroupId::from(group.as_str());
            directory
                .create_group(&group, "Test group")
                .await
                .expect("Failed to create group");
            directory
                .add_group_member(&group, &id)
                .await
                .expect("Failed to add group member");
        }

        directory
            .resolve_principal(&id)
            .await
            .expect("Failed to resolve principal")
            .expect("Principal not found")
    }
}

/// Builder for access control lists with readable record ids
pub struct AclBuilder {
    acl: AccessControlList,
}

impl AclBuilder {
    pub fn new(id: &str) -> Self {
        Self {
            acl: AccessControlList::with_id(id.into()),
        }
    }

    pub fn record(mut self, record_id: &str, holder: PermissionHolder, level: AccessLevel) -> Self {
        self.acl.insert(AccessControlRecord::with_id(
            record_id.into(),
            holder,
            level,
        ));
        self
    }

    pub fn principal(self, record_id: &str, principal: &str, level: AccessLevel) -> Self {
        self.record(record_id, PermissionHolder::Principal(principal.into()), level)
    }

    pub fn group(self, record_id: &str, group: &str, level: AccessLevel) -> Self {
        self.record(record_id, PermissionHolder::Group(group.into()), level)
    }

    pub fn role(self, record_id: &str, role: &str, level: AccessLevel) -> Self {
        self.record(record_id, PermissionHolder::Role(role.into()), level)
    }

    pub fn build(self) -> AccessControlList {
        self.acl
    }

    pub async fn persist(self, store: &AclStore, subject: &str) -> AccessControlList {
        let acl = self.build();
        store
            .persist(&SubjectId::from(subject), &acl)
            .await
            .expect("Failed to persist ACL");
        acl
    }
}
