use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;

use crate::authz::record::AccessControlRecord;
use crate::authz::types::{AclId, RecordId};

/// The set of grants protecting one subject.
///
/// The list does not know its subject; the subject relation is owned by the
/// store. Records are unique by id and unordered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessControlList {
    id: AclId,
    #[serde(
        serialize_with = "serialize_records",
        deserialize_with = "deserialize_records"
    )]
    records: HashMap<RecordId, AccessControlRecord>,
}

// Records travel as a sequence; the map key is always the record's own id.
fn serialize_records<S>(
    records: &HashMap<RecordId, AccessControlRecord>,
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.collect_seq(records.values())
}

fn deserialize_records<'de, D>(
    deserializer: D,
) -> Result<HashMap<RecordId, AccessControlRecord>, D::Error>
where
    D: Deserializer<'de>,
{
    let records = Vec::<AccessControlRecord>::deserialize(deserializer)?;
    Ok(records
        .into_iter()
        .map(|record| (record.id().clone(), record))
        .collect())
}

impl AccessControlList {
    pub fn new() -> Self {
        Self::with_id(AclId::generate())
    }

    pub fn with_id(id: AclId) -> Self {
        Self {
            id,
            records: HashMap::new(),
        }
    }

    pub fn with_records<I>(id: AclId, records: I) -> Self
    where
        I: IntoIterator<Item = AccessControlRecord>,
    {
        let mut acl = Self::with_id(id);
        acl.extend(records);
        acl
    }

    pub fn id(&self) -> &AclId {
        &self.id
    }

    pub fn records(&self) -> impl Iterator<Item = &AccessControlRecord> {
        self.records.values()
    }

    pub fn record(&self, id: &RecordId) -> Option<&AccessControlRecord> {
        self.records.get(id)
    }

    pub fn record_mut(&mut self, id: &RecordId) -> Option<&mut AccessControlRecord> {
        self.records.get_mut(id)
    }

    pub fn record_ids(&self) -> impl Iterator<Item = &RecordId> {
        self.records.keys()
    }

    pub fn contains(&self, id: &RecordId) -> bool {
        self.records.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Adds the record, replacing any record with the same id.
    pub fn insert(&mut self, record: AccessControlRecord) -> Option<AccessControlRecord> {
        self.records.insert(record.id().clone(), record)
    }

    pub fn remove(&mut self, id: &RecordId) -> Option<AccessControlRecord> {
        self.records.remove(id)
    }

    pub fn extend<I>(&mut self, records: I)
    where
        I: IntoIterator<Item = AccessControlRecord>,
    {
        for record in records {
            self.insert(record);
        }
    }
}

impl Default for AccessControlList {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authz::holder::PermissionHolder;
    use crate::authz::level::AccessLevel;

    #[test]
    fn test_records_are_unique_by_id() {
        let holder = PermissionHolder::Role("editor".into());
        let first = AccessControlRecord::with_id("r1".into(), holder.clone(), AccessLevel::Read);
        let second = AccessControlRecord::with_id("r1".into(), holder.clone(), AccessLevel::Write);
        let other = AccessControlRecord::with_id("r2".into(), holder, AccessLevel::Read);

        let acl = AccessControlList::with_records("acl-1".into(), [first, second, other]);
        assert_eq!(acl.len(), 2);
        assert_eq!(
            acl.record(&"r1".into()).map(|r| r.access_level()),
            Some(AccessLevel::Write)
        );
    }

    #[test]
    fn test_duplicate_holders_are_kept() {
        let holder = PermissionHolder::Principal("u1".into());
        let mut acl = AccessControlList::new();
        acl.insert(AccessControlRecord::new(holder.clone(), AccessLevel::Read));
        acl.insert(AccessControlRecord::new(holder, AccessLevel::Read));
        assert_eq!(acl.len(), 2);
    }

    #[test]
    fn test_json_records_are_keyed_by_their_own_id() {
        let acl: AccessControlList = serde_json::from_value(serde_json::json!({
            "id": "acl-1",
            "records": [
                {
                    "id": "r1",
                    "access_level": "READ",
                    "holder": { "type": "role", "id": "reader" }
                }
            ]
        }))
        .unwrap();
        assert_eq!(acl.len(), 1);
        assert!(acl.contains(&"r1".into()));

        let json = serde_json::to_value(&acl).unwrap();
        assert!(json["records"].is_array());
        assert_eq!(json["records"][0]["id"], "r1");
    }

    #[test]
    fn test_remove_record() {
        let mut acl = AccessControlList::new();
        let record =
            AccessControlRecord::new(PermissionHolder::Group("g".into()), AccessLevel::Read);
        let id = record.id().clone();
        acl.insert(record);

        assert!(acl.remove(&id).is_some());
        assert!(acl.is_empty());
        assert!(acl.remove(&id).is_none());
    }
}
