use std::sync::Arc;

use crate::authz::acl::AccessControlList;
use crate::authz::errors::AuthzError;
use crate::authz::holder::PermissionHolder;
use crate::authz::level::AccessLevel;
use crate::authz::record::AccessControlRecord;
use crate::authz::store::{AclStore, RecordChanges};
use crate::authz::types::{PrincipalRef, RecordId, RoleId, SubjectId};
use crate::settings::DefaultGrant;

/// ACL management for the rest of the application.
///
/// Single-record edits load the current list, change it in memory and hand the
/// whole set to [`AclStore::update`].
#[derive(Debug, Clone)]
pub struct AclService {
    store: Arc<AclStore>,
    default_grants: Vec<(RoleId, AccessLevel)>,
}

impl AclService {
    pub fn new(store: Arc<AclStore>, default_grants: &[DefaultGrant]) -> Self {
        Self {
            store,
            default_grants: default_grants
                .iter()
                .map(|g| (RoleId::from(g.role.as_str()), g.level))
                .collect(),
        }
    }

    pub fn store(&self) -> &Arc<AclStore> {
        &self.store
    }

    /// Protect a new subject: the owner gets `SECURITY`, configured roles get
    /// their default levels.
    pub async fn create_for_subject(
        &self,
        subject: &SubjectId,
        owner: &PrincipalRef,
    ) -> Result<AccessControlList, AuthzError> {
        let mut acl = AccessControlList::new();
        acl.insert(AccessControlRecord::new(
            PermissionHolder::Principal(owner.id.clone()),
            AccessLevel::Security,
        ));
        for (role, level) in &self.default_grants {
            acl.insert(AccessControlRecord::new(
                PermissionHolder::Role(role.clone()),
                *level,
            ));
        }

        self.store.persist(subject, &acl).await?;
        Ok(acl)
    }

    pub async fn find_for_subject_required(
        &self,
        subject: &SubjectId,
    ) -> Result<AccessControlList, AuthzError> {
        let acl = self.store.find_for_subject(subject).await?;
        acl.ok_or_else(|| AuthzError::SubjectNotProtected(subject.clone()))
    }

    pub async fn add_record(
        &self,
        subject: &SubjectId,
        holder: PermissionHolder,
        level: AccessLevel,
    ) -> Result<AccessControlRecord, AuthzError> {
        let mut acl = self.find_for_subject_required(subject).await?;
        let record = AccessControlRecord::new(holder, level);
        acl.insert(record.clone());
        self.store.update(&acl).await?;
        Ok(record)
    }

    /// Returns `false` when the list has no such record.
    pub async fn remove_record(
        &self,
        subject: &SubjectId,
        record: &RecordId,
    ) -> Result<bool, AuthzError> {
        let mut acl = self.find_for_subject_required(subject).await?;
        if acl.remove(record).is_none() {
            return Ok(false);
        }
        self.store.update(&acl).await?;
        Ok(true)
    }

    /// Returns `false` when the list has no such record.
    pub async fn set_record_level(
        &self,
        subject: &SubjectId,
        record: &RecordId,
        level: AccessLevel,
    ) -> Result<bool, AuthzError> {
        let mut acl = self.find_for_subject_required(subject).await?;
        let Some(existing) = acl.record_mut(record) else {
            return Ok(false);
        };
        existing.set_access_level(level);
        self.store.update(&acl).await?;
        Ok(true)
    }

    /// Replace the whole record set of the subject's list.
    pub async fn replace_records(
        &self,
        subject: &SubjectId,
        records: Vec<AccessControlRecord>,
    ) -> Result<RecordChanges, AuthzError> {
        let current = self.find_for_subject_required(subject).await?;
        let acl = AccessControlList::with_records(current.id().clone(), records);
        self.store.update(&acl).await
    }

    pub async fn remove_for_subject(&self, subject: &SubjectId) -> Result<bool, AuthzError> {
        self.store.remove_for_subject(subject).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use migration::{Migrator, MigratorTrait};
    use sea_orm::Database;
    use tempfile::NamedTempFile;

    async fn setup() -> (AclService, NamedTempFile) {
        let temp_file = NamedTempFile::new().expect("Failed to create temp file");
        let db_url = format!(
            "sqlite://{}?mode=rwc",
            temp_file.path().to_str().expect("Invalid temp file path")
        );
        let db = Database::connect(&db_url)
            .await
            .expect("Failed to connect to test database");
        Migrator::up(&db, None)
            .await
            .expect("Failed to run migrations");

        let grants = vec![
            DefaultGrant {
                role: "editor".into(),
                level: AccessLevel::Write,
            },
            DefaultGrant {
                role: "reader".into(),
                level: AccessLevel::Read,
            },
        ];
        (
            AclService::new(Arc::new(AclStore::new(db)), &grants),
            temp_file,
        )
    }

    #[tokio::test]
    async fn test_create_for_subject_applies_defaults() {
        let (service, _db) = setup().await;
        let subject = SubjectId::from("vocab/a");
        let owner = PrincipalRef::new("u1");

        let created = service.create_for_subject(&subject, &owner).await.unwrap();
        assert_eq!(created.len(), 3);

        let stored = service.find_for_subject_required(&subject).await.unwrap();
        let mut grants: Vec<String> = stored
            .records()
            .map(|r| format!("{}={}", r.holder(), r.access_level()))
            .collect();
        grants.sort();
        assert_eq!(
            grants,
            vec![
                "principal/u1=SECURITY".to_string(),
                "role/editor=WRITE".to_string(),
                "role/reader=READ".to_string(),
            ]
        );

        let err = service
            .create_for_subject(&subject, &owner)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthzError::SubjectAlreadyProtected(_)));
    }

    #[tokio::test]
    async fn test_single_record_edits() {
        let (service, _db) = setup().await;
        let subject = SubjectId::from("vocab/a");
        service
            .create_for_subject(&subject, &PrincipalRef::new("u1"))
            .await
            .unwrap();

        let added = service
            .add_record(&subject, PermissionHolder::Group("g1".into()), AccessLevel::Read)
            .await
            .unwrap();
        assert!(service
            .set_record_level(&subject, added.id(), AccessLevel::Write)
            .await
            .unwrap());

        let acl = service.find_for_subject_required(&subject).await.unwrap();
        assert_eq!(acl.len(), 4);
        assert_eq!(
            acl.record(added.id()).unwrap().access_level(),
            AccessLevel::Write
        );

        assert!(service.remove_record(&subject, added.id()).await.unwrap());
        assert!(!service.remove_record(&subject, added.id()).await.unwrap());
        assert!(!service
            .set_record_level(&subject, added.id(), AccessLevel::Read)
            .await
            .unwrap());
        assert_eq!(
            service
                .find_for_subject_required(&subject)
                .await
                .unwrap()
                .len(),
            3
        );
    }

    #[tokio::test]
    async fn test_edits_on_unprotected_subject_fail() {
        let (service, _db) = setup().await;
        let err = service
            .add_record(
                &"vocab/none".into(),
                PermissionHolder::Role("reader".into()),
                AccessLevel::Read,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AuthzError::SubjectNotProtected(_)));
    }

    #[tokio::test]
    async fn test_replace_records() {
        let (service, _db) = setup().await;
        let subject = SubjectId::from("vocab/a");
        service
            .create_for_subject(&subject, &PrincipalRef::new("u1"))
            .await
            .unwrap();

        let only = AccessControlRecord::new(
            PermissionHolder::Principal("u2".into()),
            AccessLevel::Security,
        );
        let changes = service
            .replace_records(&subject, vec![only.clone()])
            .await
            .unwrap();
        assert_eq!(changes.removed, 3);
        assert_eq!(changes.inserted, 1);

        let acl = service.find_for_subject_required(&subject).await.unwrap();
        assert_eq!(acl.len(), 1);
        assert!(acl.contains(only.id()));
    }
}
