//! Identity directory consulted at evaluation time.
//!
//! Group membership and role assignments are looked up on every decision rather
//! than cached inside access control records, so a membership change takes effect
//! on the next check.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use std::collections::{BTreeSet, HashSet};

use crate::authz::errors::AuthzError;
use crate::authz::types::{GroupId, PrincipalId, PrincipalRef, RoleId};
use crate::entities;

#[async_trait]
pub trait PrincipalDirectory: Send + Sync {
    /// Resolve a principal with its current role assignments.
    async fn resolve_principal(&self, id: &PrincipalId)
        -> Result<Option<PrincipalRef>, AuthzError>;

    /// Current members of a group. Unknown groups have no members.
    async fn group_members(&self, group: &GroupId) -> Result<HashSet<PrincipalId>, AuthzError>;

    async fn is_group_member(
        &self,
        group: &GroupId,
        principal: &PrincipalId,
    ) -> Result<bool, AuthzError> {
        Ok(self.group_members(group).await?.contains(principal))
    }
}

/// Directory backed by the `principals`, `user_groups`, `user_group_members`
/// and `principal_roles` tables.
#[derive(Debug, Clone)]
pub struct DbDirectory {
    db: DatabaseConnection,
    administrator_role: RoleId,
}

impl DbDirectory {
    pub fn new(db: DatabaseConnection, administrator_role: impl Into<RoleId>) -> Self {
        Self {
            db,
            administrator_role: administrator_role.into(),
        }
    }

    pub async fn create_principal(
        &self,
        id: &PrincipalId,
        username: &str,
    ) -> Result<entities::principal::Model, AuthzError> {
        let principal = entities::principal::ActiveModel {
            id: Set(id.to_string()),
            username: Set(username.to_string()),
            created_at: Set(Utc::now().timestamp()),
        };
        Ok(principal.insert(&self.db).await?)
    }

    pub async fn get_principal(
        &self,
        id: &PrincipalId,
    ) -> Result<Option<entities::principal::Model>, AuthzError> {
        Ok(entities::Principal::find_by_id(id.as_str())
            .one(&self.db)
            .await?)
    }

    /// Returns `false` when the principal does not exist.
    pub async fn update_username(
        &self,
        id: &PrincipalId,
        username: &str,
    ) -> Result<bool, AuthzError> {
        let Some(model) = self.get_principal(id).await? else {
            return Ok(false);
        };
        let mut active: entities::principal::ActiveModel = model.into();
        active.username = Set(username.to_string());
        active.update(&self.db).await?;
        Ok(true)
    }

    pub async fn get_principal_by_username(
        &self,
        username: &str,
    ) -> Result<Option<entities::principal::Model>, AuthzError> {
        use entities::principal::{Column, Entity};

        Ok(Entity::find()
            .filter(Column::Username.eq(username))
            .one(&self.db)
            .await?)
    }

    /// Create the group, or relabel it if it already exists.
    pub async fn create_group(&self, id: &GroupId, label: &str) -> Result<(), AuthzError> {
        use entities::user_group::{Column, Entity};

        let group = entities::user_group::ActiveModel {
            id: Set(id.to_string()),
            label: Set(label.to_string()),
        };
        Entity::insert(group)
            .on_conflict(
                OnConflict::column(Column::Id)
                    .update_column(Column::Label)
                    .to_owned(),
            )
            .exec(&self.db)
            .await?;
        Ok(())
    }

    pub async fn group_exists(&self, id: &GroupId) -> Result<bool, AuthzError> {
        Ok(entities::UserGroup::find_by_id(id.as_str())
            .one(&self.db)
            .await?
            .is_some())
    }

    /// Returns `false` when the principal was already a member.
    pub async fn add_group_member(
        &self,
        group: &GroupId,
        principal: &PrincipalId,
    ) -> Result<bool, AuthzError> {
        if self.is_group_member(group, principal).await? {
            return Ok(false);
        }
        let member = entities::user_group_member::ActiveModel {
            group_id: Set(group.to_string()),
            principal_id: Set(principal.to_string()),
        };
        entities::UserGroupMember::insert(member)
            .exec_without_returning(&self.db)
            .await?;
        Ok(true)
    }

    /// Returns `false` when the principal was not a member.
    pub async fn remove_group_member(
        &self,
        group: &GroupId,
        principal: &PrincipalId,
    ) -> Result<bool, AuthzError> {
        use entities::user_group_member::{Column, Entity};

        let result = Entity::delete_many()
            .filter(Column::GroupId.eq(group.as_str()))
            .filter(Column::PrincipalId.eq(principal.as_str()))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }

    pub async fn assign_role(
        &self,
        principal: &PrincipalId,
        role: &RoleId,
    ) -> Result<bool, AuthzError> {
        if self.roles_of(principal).await?.contains(role) {
            return Ok(false);
        }
        let assignment = entities::principal_role::ActiveModel {
            principal_id: Set(principal.to_string()),
            role: Set(role.to_string()),
        };
        entities::PrincipalRole::insert(assignment)
            .exec_without_returning(&self.db)
            .await?;
        Ok(true)
    }

    pub async fn revoke_role(
        &self,
        principal: &PrincipalId,
        role: &RoleId,
    ) -> Result<bool, AuthzError> {
        use entities::principal_role::{Column, Entity};

        let result = Entity::delete_many()
            .filter(Column::PrincipalId.eq(principal.as_str()))
            .filter(Column::Role.eq(role.as_str()))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }

    pub async fn roles_of(&self, principal: &PrincipalId) -> Result<BTreeSet<RoleId>, AuthzError> {
        use entities::principal_role::{Column, Entity};

        let roles = Entity::find()
            .filter(Column::PrincipalId.eq(principal.as_str()))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|m| RoleId::from(m.role))
            .collect();
        Ok(roles)
    }
}

#[async_trait]
impl PrincipalDirectory for DbDirectory {
    async fn resolve_principal(
        &self,
        id: &PrincipalId,
    ) -> Result<Option<PrincipalRef>, AuthzError> {
        let Some(model) = self.get_principal(id).await? else {
            return Ok(None);
        };

        let roles = self.roles_of(id).await?;
        let administrator = roles.contains(&self.administrator_role);
        Ok(Some(PrincipalRef {
            id: PrincipalId::from(model.id),
            roles,
            administrator,
        }))
    }

    async fn group_members(&self, group: &GroupId) -> Result<HashSet<PrincipalId>, AuthzError> {
        use entities::user_group_member::{Column, Entity};

        let members = Entity::find()
            .filter(Column::GroupId.eq(group.as_str()))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|m| PrincipalId::from(m.principal_id))
            .collect();
        Ok(members)
    }

    async fn is_group_member(
        &self,
        group: &GroupId,
        principal: &PrincipalId,
    ) -> Result<bool, AuthzError> {
        use entities::user_group_member::{Column, Entity};

        let found = Entity::find()
            .filter(Column::GroupId.eq(group.as_str()))
            .filter(Column::PrincipalId.eq(principal.as_str()))
            .one(&self.db)
            .await?;
        Ok(found.is_some())
    }
}
