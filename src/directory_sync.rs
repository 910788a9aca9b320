use miette::{IntoDiagnostic, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use crate::authz::{DbDirectory, GroupId, PrincipalDirectory, PrincipalId, RoleId};

/// Principal definition from JSON file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrincipalDefinition {
    /// Stable identifier referenced by access control records
    pub id: String,
    pub username: String,
    /// Complete set of roles; roles not listed here are revoked
    #[serde(default)]
    pub roles: BTreeSet<String>,
}

/// Group definition from JSON file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupDefinition {
    pub id: String,
    #[serde(default)]
    pub label: Option<String>,
    /// Complete member list; members not listed here are removed
    #[serde(default)]
    pub members: BTreeSet<String>,
}

/// Root structure of the directory JSON file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DirectoryFile {
    #[serde(default)]
    pub principals: Vec<PrincipalDefinition>,
    #[serde(default)]
    pub groups: Vec<GroupDefinition>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SyncReport {
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
}

#[derive(Debug)]
enum SyncResult {
    Created,
    Updated,
    Unchanged,
}

impl SyncReport {
    fn record(&mut self, result: SyncResult) {
        match result {
            SyncResult::Created => self.created += 1,
            SyncResult::Updated => self.updated += 1,
            SyncResult::Unchanged => self.unchanged += 1,
        }
    }
}

/// Sync principals, roles and groups from a JSON file to the database (idempotent)
pub async fn sync_directory_from_file(
    directory: &DbDirectory,
    file_path: &Path,
) -> Result<SyncReport> {
    tracing::info!("Loading directory from {}", file_path.display());

    let content = fs::read_to_string(file_path).into_diagnostic().map_err(|e| {
        miette::miette!(
            "Failed to read directory file at '{}': {}",
            file_path.display(),
            e
        )
    })?;

    let file: DirectoryFile = serde_json::from_str(&content)
        .into_diagnostic()
        .map_err(|e| {
            miette::miette!(
                "Failed to parse directory JSON file: {}\n\nExpected format:\n{{\n  \"principals\": [\n    {{ \"id\": \"u1\", \"username\": \"alice\", \"roles\": [\"editor\"] }}\n  ],\n  \"groups\": [\n    {{ \"id\": \"g1\", \"label\": \"Curators\", \"members\": [\"u1\"] }}\n  ]\n}}",
                e
            )
        })?;

    sync_directory(directory, &file).await
}

pub async fn sync_directory(directory: &DbDirectory, file: &DirectoryFile) -> Result<SyncReport> {
    tracing::info!(
        "Found {} principal(s) and {} group(s)",
        file.principals.len(),
        file.groups.len()
    );

    let mut report = SyncReport::default();
    for def in &file.principals {
        report.record(sync_principal(directory, def).await?);
    }
    for def in &file.groups {
        report.record(sync_group(directory, def).await?);
    }

    tracing::info!(
        "Directory sync complete: {} created, {} updated, {} unchanged",
        report.created,
        report.updated,
        report.unchanged
    );
    Ok(report)
}

async fn sync_principal(
    directory: &DbDirectory,
    def: &PrincipalDefinition,
) -> Result<SyncResult> {
    let id = PrincipalId::from(def.id.as_str());
    let existing = directory.get_principal(&id).await.into_diagnostic()?;

    let mut result = match existing {
        None => {
            ensure_username_free(directory, &id, &def.username).await?;
            tracing::info!("Creating principal: {}", def.username);
            directory
                .create_principal(&id, &def.username)
                .await
                .into_diagnostic()?;
            SyncResult::Created
        }
        Some(model) if model.username != def.username => {
            ensure_username_free(directory, &id, &def.username).await?;
            tracing::info!(
                "Renaming principal {}: {} -> {}",
                def.id,
                model.username,
                def.username
            );
            directory
                .update_username(&id, &def.username)
                .await
                .into_diagnostic()?;
            SyncResult::Updated
        }
        Some(_) => SyncResult::Unchanged,
    };

    let wanted: BTreeSet<RoleId> = def.roles.iter().map(|r| RoleId::from(r.as_str())).collect();
    let current = directory.roles_of(&id).await.into_diagnostic()?;

    let mut changed = false;
    for role in wanted.difference(&current) {
        directory.assign_role(&id, role).await.into_diagnostic()?;
        changed = true;
    }
    for role in current.difference(&wanted) {
        directory.revoke_role(&id, role).await.into_diagnostic()?;
        changed = true;
    }

    if changed {
        tracing::debug!("Synced roles for principal {}", def.username);
        if matches!(result, SyncResult::Unchanged) {
            result = SyncResult::Updated;
        }
    }
    Ok(result)
}

async fn ensure_username_free(
    directory: &DbDirectory,
    id: &PrincipalId,
    username: &str,
) -> Result<()> {
    let owner = directory
        .get_principal_by_username(username)
        .await
        .into_diagnostic()?;
    match owner {
        Some(other) if other.id != id.as_str() => Err(miette::miette!(
            "Username '{}' of principal '{}' is already used by principal '{}'",
            username,
            id,
            other.id
        )),
        _ => Ok(()),
    }
}

async fn sync_group(directory: &DbDirectory, def: &GroupDefinition) -> Result<SyncResult> {
    let id = GroupId::from(def.id.as_str());
    let current = directory.group_members(&id).await.into_diagnostic()?;
    let exists = directory.group_exists(&id).await.into_diagnostic()?;

    directory
        .create_group(&id, def.label.as_deref().unwrap_or(&def.id))
        .await
        .into_diagnostic()?;

    let wanted: BTreeSet<PrincipalId> = def
        .members
        .iter()
        .map(|m| PrincipalId::from(m.as_str()))
        .collect();

    let mut changed = false;
    for member in wanted.iter().filter(|m| !current.contains(*m)) {
        directory
            .add_group_member(&id, member)
            .await
            .into_diagnostic()?;
        changed = true;
    }
    for member in current.iter().filter(|m| !wanted.contains(*m)) {
        directory
            .remove_group_member(&id, member)
            .await
            .into_diagnostic()?;
        changed = true;
    }

    Ok(match (exists, changed) {
        (false, _) => {
            tracing::info!("Created group: {}", def.id);
            SyncResult::Created
        }
        (true, true) => {
            tracing::info!("Updated group membership: {}", def.id);
            SyncResult::Updated
        }
        (true, false) => SyncResult::Unchanged,
    })
}
