use base64ct::Encoding;
use migration::{Migrator, MigratorTrait};
use rand::RngCore;
use sea_orm::{Database, DatabaseConnection};
use std::sync::Arc;

use crate::authz::{AclCache, AclStore, AuthzError};
use crate::settings::{Cache as CacheCfg, Database as DbCfg};

/// Connect and bring the schema up to date.
pub async fn init(cfg: &DbCfg) -> Result<DatabaseConnection, AuthzError> {
    let db = Database::connect(&cfg.url).await?;
    Migrator::up(&db, None).await?;
    Ok(db)
}

/// Build the ACL store, with the subject cache when enabled.
pub fn acl_store(db: DatabaseConnection, cache: &CacheCfg) -> AclStore {
    let store = AclStore::new(db);
    if cache.enabled {
        store.with_cache(Arc::new(AclCache::new()))
    } else {
        store
    }
}

pub(crate) fn random_id() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    base64ct::Base64UrlUnpadded::encode_string(&bytes)
}
