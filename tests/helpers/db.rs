use std::sync::Arc;

use migration::{Migrator, MigratorTrait};
use sea_orm::{Database, DatabaseConnection};
use tempfile::NamedTempFile;
use vocab_acl::authz::{AclCache, AclService, AclStore, AuthorizationService, DbDirectory};
use vocab_acl::settings::Authorization;

/// Test database with automatic cleanup
pub struct TestDb {
    connection: DatabaseConnection,
    _temp_file: NamedTempFile,
}

impl TestDb {
    /// Create a new test database with migrations applied
    pub async fn new() -> Self {
        // Create temporary SQLite database file
        let temp_file = NamedTempFile::new().expect("Failed to create temp file");
        let db_path = temp_file.path().to_str().expect("Invalid temp file path");
        let db_url = format!("sqlite://{}?mode=rwc", db_path);

        // Connect to database
        let connection = Database::connect(&db_url)
            .await
            .expect("Failed to connect to test database");

        // Run migrations
        Migrator::up(&connection, None)
            .await
            .expect("Failed to run migrations");

        Self {
            connection,
            _temp_file: temp_file,
        }
    }

    /// Get database connection
    pub fn connection(&self) -> &DatabaseConnection {
        &self.connection
    }

    pub fn directory(&self) -> Arc<DbDirectory> {
        Arc::new(DbDirectory::new(
            self.connection.clone(),
            Authorization::default().administrator_role.as_str(),
        ))
    }

    pub fn store(&self, cached: bool) -> Arc<AclStore> {
        let store = AclStore::new(self.connection.clone());
        if cached {
            Arc::new(store.with_cache(Arc::new(AclCache::new())))
        } else {
            Arc::new(store)
        }
    }

    /// Services sharing one store and the database-backed directory
    pub fn services(&self, cached: bool) -> (AclService, AuthorizationService) {
        let store = self.store(cached);
        let acls = AclService::new(store.clone(), &Authorization::default().default_grants);
        let authz = AuthorizationService::new(store, self.directory());
        (acls, authz)
    }
}
