//! Persistence of access control lists.
//!
//! Every mutation runs in a single transaction. Cache invalidation and event
//! publication happen only after the transaction has committed.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    QueryFilter, Set, SqlErr, TransactionTrait,
};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::authz::acl::AccessControlList;
use crate::authz::cache::AclCache;
use crate::authz::errors::AuthzError;
use crate::authz::events::{AclEvent, AclEventKind, AclEvents};
use crate::authz::holder::PermissionHolder;
use crate::authz::level::AccessLevel;
use crate::authz::record::AccessControlRecord;
use crate::authz::types::{AclId, RecordId, SubjectId};
use crate::entities;

/// Record-level outcome of [`AclStore::update`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecordChanges {
    pub inserted: usize,
    pub updated: usize,
    pub removed: usize,
}

#[derive(Debug, Clone)]
pub struct AclStore {
    db: DatabaseConnection,
    cache: Option<Arc<AclCache>>,
    events: AclEvents,
}

impl AclStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            cache: None,
            events: AclEvents::default(),
        }
    }

    pub fn with_cache(mut self, cache: Arc<AclCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn cache(&self) -> Option<&Arc<AclCache>> {
        self.cache.as_ref()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AclEvent> {
        self.events.subscribe()
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    pub async fn find(&self, id: &AclId) -> Result<Option<AccessControlList>, AuthzError> {
        load_acl(&self.db, id).await
    }

    pub async fn find_required(&self, id: &AclId) -> Result<AccessControlList, AuthzError> {
        self.find(id)
            .await?
            .ok_or_else(|| AuthzError::NotFound(id.clone()))
    }

    pub async fn find_for_subject(
        &self,
        subject: &SubjectId,
    ) -> Result<Option<AccessControlList>, AuthzError> {
        if let Some(cache) = &self.cache {
            if let Some(acl_id) = cache.acl_for_subject(subject) {
                if let Some(acl) = self.find(&acl_id).await? {
                    tracing::debug!(%subject, acl = %acl_id, "ACL cache hit");
                    return Ok(Some(acl));
                }
                cache.evict_subject(subject);
            }
        }

        let Some(acl_id) = acl_id_for_subject(&self.db, subject).await? else {
            return Ok(None);
        };
        let acl = self.find(&acl_id).await?;

        if let (Some(cache), Some(_)) = (&self.cache, &acl) {
            cache.insert(subject.clone(), acl_id);
        }
        Ok(acl)
    }

    /// Store a new list with its full record set and bind it to `subject`.
    pub async fn persist(
        &self,
        subject: &SubjectId,
        acl: &AccessControlList,
    ) -> Result<(), AuthzError> {
        let txn = self.db.begin().await?;

        if entities::AccessControlList::find_by_id(acl.id().as_str())
            .one(&txn)
            .await?
            .is_some()
        {
            return Err(AuthzError::DuplicateAcl(acl.id().clone()));
        }
        if acl_id_for_subject(&txn, subject).await?.is_some() {
            return Err(AuthzError::SubjectAlreadyProtected(subject.clone()));
        }

        let now = Utc::now().timestamp();
        entities::access_control_list::ActiveModel {
            id: Set(acl.id().to_string()),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        bind_subject(&txn, subject, acl.id()).await?;

        for record in acl.records() {
            insert_record(&txn, acl.id(), record).await?;
        }

        txn.commit().await?;

        tracing::info!(
            acl = %acl.id(),
            %subject,
            records = acl.len(),
            "Created access control list"
        );
        if let Some(cache) = &self.cache {
            cache.insert(subject.clone(), acl.id().clone());
        }
        self.events.publish(AclEvent {
            acl_id: acl.id().clone(),
            subject: Some(subject.clone()),
            kind: AclEventKind::Created,
            at: now,
        });
        Ok(())
    }

    /// Replace the stored record set of an existing list with the one in `acl`.
    ///
    /// Records missing from `acl` are deleted explicitly; replacing the aggregate
    /// does not remove detached child rows on its own. Records present in both
    /// are rewritten only when their level or holder changed.
    ///
    /// Concurrent updates of the same list are last-writer-wins.
    pub async fn update(&self, acl: &AccessControlList) -> Result<RecordChanges, AuthzError> {
        let txn = self.db.begin().await?;

        let stored = entities::AccessControlList::find_by_id(acl.id().as_str())
            .one(&txn)
            .await?
            .ok_or_else(|| AuthzError::NotFound(acl.id().clone()))?;

        let stored_records: HashMap<String, entities::access_control_record::Model> =
            records_of(&txn, acl.id())
                .await?
                .into_iter()
                .map(|m| (m.id.clone(), m))
                .collect();

        let orphaned: Vec<String> = stored_records
            .keys()
            .filter(|id| !acl.contains(&RecordId::from(id.as_str())))
            .cloned()
            .collect();

        let mut changes = RecordChanges::default();

        if !orphaned.is_empty() {
            use entities::access_control_record::{Column, Entity};

            let result = Entity::delete_many()
                .filter(Column::AclId.eq(acl.id().as_str()))
                .filter(Column::Id.is_in(orphaned.iter().cloned()))
                .exec(&txn)
                .await?;
            changes.removed = result.rows_affected as usize;
        }

        for record in acl.records() {
            match stored_records.get(record.id().as_str()) {
                None => {
                    insert_record(&txn, acl.id(), record).await?;
                    changes.inserted += 1;
                }
                Some(existing) if record_differs(existing, record) => {
                    let mut active: entities::access_control_record::ActiveModel =
                        existing.clone().into();
                    active.access_level = Set(record.access_level().as_str().to_string());
                    active.holder_type = Set(record.holder().holder_type().to_string());
                    active.holder_id = Set(record.holder().holder_id().to_string());
                    active.update(&txn).await?;
                    changes.updated += 1;
                }
                Some(_) => {}
            }
        }

        let now = Utc::now().timestamp();
        let mut touched: entities::access_control_list::ActiveModel = stored.into();
        touched.updated_at = Set(now);
        touched.update(&txn).await?;

        let subject = subject_for_acl(&txn, acl.id()).await?;

        txn.commit().await?;

        tracing::info!(
            acl = %acl.id(),
            inserted = changes.inserted,
            updated = changes.updated,
            removed = changes.removed,
            "Updated access control list"
        );
        if let Some(cache) = &self.cache {
            cache.evict_acl(acl.id());
            if let Some(subject) = &subject {
                cache.evict_subject(subject);
            }
        }
        self.events.publish(AclEvent {
            acl_id: acl.id().clone(),
            subject,
            kind: AclEventKind::Updated,
            at: now,
        });
        Ok(changes)
    }

    /// Destroy the list protecting `subject` together with its records.
    ///
    /// Returns `false` when the subject had no list.
    pub async fn remove_for_subject(&self, subject: &SubjectId) -> Result<bool, AuthzError> {
        let txn = self.db.begin().await?;

        let Some(acl_id) = acl_id_for_subject(&txn, subject).await? else {
            if let Some(cache) = &self.cache {
                cache.evict_subject(subject);
            }
            return Ok(false);
        };

        entities::AccessControlRecord::delete_many()
            .filter(entities::access_control_record::Column::AclId.eq(acl_id.as_str()))
            .exec(&txn)
            .await?;
        entities::SubjectAcl::delete_many()
            .filter(entities::subject_acl::Column::AclId.eq(acl_id.as_str()))
            .exec(&txn)
            .await?;
        entities::AccessControlList::delete_by_id(acl_id.as_str())
            .exec(&txn)
            .await?;

        txn.commit().await?;

        tracing::info!(acl = %acl_id, %subject, "Removed access control list");
        if let Some(cache) = &self.cache {
            cache.evict_subject(subject);
            cache.evict_acl(&acl_id);
        }
        self.events.publish(AclEvent {
            acl_id,
            subject: Some(subject.clone()),
            kind: AclEventKind::Removed,
            at: Utc::now().timestamp(),
        });
        Ok(true)
    }

    /// Subjects whose list holds a record for exactly `holder` at a level that
    /// includes `minimum`. Sorted, without duplicates.
    pub async fn find_subjects_granted_to(
        &self,
        holder: &PermissionHolder,
        minimum: AccessLevel,
    ) -> Result<Vec<SubjectId>, AuthzError> {
        use entities::access_control_record::{Column, Entity};

        let records = Entity::find()
            .filter(Column::HolderType.eq(holder.holder_type()))
            .filter(Column::HolderId.eq(holder.holder_id()))
            .all(&self.db)
            .await?;

        let mut acl_ids = HashSet::new();
        for model in records {
            let level = AccessLevel::from_stored(&model.access_level)?;
            if level.includes(minimum) {
                acl_ids.insert(model.acl_id);
            }
        }
        if acl_ids.is_empty() {
            return Ok(Vec::new());
        }

        let subjects: BTreeSet<SubjectId> = entities::SubjectAcl::find()
            .filter(entities::subject_acl::Column::AclId.is_in(acl_ids))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|m| SubjectId::from(m.subject))
            .collect();
        Ok(subjects.into_iter().collect())
    }
}

async fn load_acl<C>(conn: &C, id: &AclId) -> Result<Option<AccessControlList>, AuthzError>
where
    C: ConnectionTrait,
{
    if entities::AccessControlList::find_by_id(id.as_str())
        .one(conn)
        .await?
        .is_none()
    {
        return Ok(None);
    }

    let mut acl = AccessControlList::with_id(id.clone());
    for model in records_of(conn, id).await? {
        let record = record_from_model(model).inspect_err(|e| {
            tracing::error!(acl = %id, error = %e, "Rejected stored access control record");
        })?;
        acl.insert(record);
    }
    Ok(Some(acl))
}

async fn records_of<C>(
    conn: &C,
    acl: &AclId,
) -> Result<Vec<entities::access_control_record::Model>, AuthzError>
where
    C: ConnectionTrait,
{
    use entities::access_control_record::{Column, Entity};

    Ok(Entity::find()
        .filter(Column::AclId.eq(acl.as_str()))
        .all(conn)
        .await?)
}

/// The single list bound to `subject`; more than one binding is an integrity failure.
async fn acl_id_for_subject<C>(conn: &C, subject: &SubjectId) -> Result<Option<AclId>, AuthzError>
where
    C: ConnectionTrait,
{
    use entities::subject_acl::{Column, Entity};

    let mut rows = Entity::find()
        .filter(Column::Subject.eq(subject.as_str()))
        .all(conn)
        .await?;

    match rows.len() {
        0 => Ok(None),
        1 => Ok(rows.pop().map(|m| AclId::from(m.acl_id))),
        count => {
            tracing::error!(%subject, count, "Subject is bound to more than one ACL");
            Err(AuthzError::MultipleAclsForSubject {
                subject: subject.clone(),
                count,
            })
        }
    }
}

/// Insert the `subject_acls` row. A concurrent writer that bound the subject
/// first surfaces as a unique violation on `subject`.
async fn bind_subject<C>(conn: &C, subject: &SubjectId, acl: &AclId) -> Result<(), AuthzError>
where
    C: ConnectionTrait,
{
    let result = entities::subject_acl::ActiveModel {
        subject: Set(subject.to_string()),
        acl_id: Set(acl.to_string()),
        ..Default::default()
    }
    .insert(conn)
    .await;

    match result {
        Ok(_) => Ok(()),
        Err(err) => match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => {
                tracing::warn!(%subject, acl = %acl, "Subject was protected concurrently");
                Err(AuthzError::SubjectAlreadyProtected(subject.clone()))
            }
            _ => Err(err.into()),
        },
    }
}

async fn subject_for_acl<C>(conn: &C, acl: &AclId) -> Result<Option<SubjectId>, AuthzError>
where
    C: ConnectionTrait,
{
    use entities::subject_acl::{Column, Entity};

    Ok(Entity::find()
        .filter(Column::AclId.eq(acl.as_str()))
        .one(conn)
        .await?
        .map(|m| SubjectId::from(m.subject)))
}

async fn insert_record<C>(
    conn: &C,
    acl: &AclId,
    record: &AccessControlRecord,
) -> Result<(), AuthzError>
where
    C: ConnectionTrait,
{
    entities::access_control_record::ActiveModel {
        id: Set(record.id().to_string()),
        acl_id: Set(acl.to_string()),
        access_level: Set(record.access_level().as_str().to_string()),
        holder_type: Set(record.holder().holder_type().to_string()),
        holder_id: Set(record.holder().holder_id().to_string()),
    }
    .insert(conn)
    .await?;
    Ok(())
}

fn record_differs(
    stored: &entities::access_control_record::Model,
    record: &AccessControlRecord,
) -> bool {
    stored.access_level != record.access_level().as_str()
        || stored.holder_type != record.holder().holder_type()
        || stored.holder_id != record.holder().holder_id()
}

fn record_from_model(
    model: entities::access_control_record::Model,
) -> Result<AccessControlRecord, AuthzError> {
    let holder = PermissionHolder::from_parts(&model.id, &model.holder_type, &model.holder_id)?;
    let level = AccessLevel::from_stored(&model.access_level)?;
    Ok(AccessControlRecord::with_id(
        RecordId::from(model.id),
        holder,
        level,
    ))
}
