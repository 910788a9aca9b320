use std::path::PathBuf;
use std::sync::Arc;

use clap::{ArgGroup, Args, Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use serde_json::json;
use tracing_subscriber::{fmt, EnvFilter};

use vocab_acl::authz::{
    AccessLevel, AclService, AuthorizationService, AuthzError, DbDirectory, PermissionHolder,
    PrincipalDirectory, PrincipalId, PrincipalRef, RecordId, SubjectId,
};
use vocab_acl::{directory_sync, settings, storage};

#[derive(Parser, Debug)]
#[command(
    name = "vocab-acl",
    version,
    about = "Access control lists for vocabulary management"
)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Apply pending database migrations and exit
    Migrate,
    /// Sync principals, roles and groups from a JSON file
    SyncDirectory { file: PathBuf },
    /// Decide whether a principal holds a level on a subject
    Check {
        #[arg(long)]
        principal: String,
        #[arg(long)]
        subject: String,
        #[arg(long, default_value = "READ")]
        level: AccessLevel,
    },
    /// Print the access control list of a subject as JSON
    Show {
        #[arg(long)]
        subject: String,
    },
    /// Create the default access control list for a subject
    Protect {
        #[arg(long)]
        subject: String,
        #[arg(long)]
        owner: String,
    },
    /// Add a record to a subject's access control list
    Grant(GrantArgs),
    /// Remove a record from a subject's access control list
    Revoke {
        #[arg(long)]
        subject: String,
        #[arg(long)]
        record: String,
    },
    /// Delete a subject's access control list
    Unprotect {
        #[arg(long)]
        subject: String,
    },
}

impl Command {
    /// `migrate` only touches the schema: no directory sync, no services.
    fn needs_services(&self) -> bool {
        !matches!(self, Command::Migrate)
    }
}

#[derive(Args, Debug)]
#[command(group(ArgGroup::new("holder").required(true).args(["principal", "group", "role"])))]
struct GrantArgs {
    #[arg(long)]
    subject: String,
    #[arg(long)]
    principal: Option<String>,
    #[arg(long)]
    group: Option<String>,
    #[arg(long)]
    role: Option<String>,
    #[arg(long)]
    level: AccessLevel,
}

impl GrantArgs {
    fn holder(&self) -> Option<PermissionHolder> {
        if let Some(p) = &self.principal {
            Some(PermissionHolder::Principal(p.as_str().into()))
        } else if let Some(g) = &self.group {
            Some(PermissionHolder::Group(g.as_str().into()))
        } else {
            self.role
                .as_ref()
                .map(|r| PermissionHolder::Role(r.as_str().into()))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // logging
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();

    // load settings
    let settings = settings::Settings::load(&cli.config)?;
    tracing::info!(?settings, "Loaded configuration");

    // init storage (database + migrations)
    let db = storage::init(&settings.database).await?;
    if !cli.command.needs_services() {
        tracing::info!("Database schema is up to date");
        return Ok(());
    }

    let directory = Arc::new(DbDirectory::new(
        db.clone(),
        settings.authorization.administrator_role.as_str(),
    ));
    if let Some(file) = &settings.directory.sync_file {
        directory_sync::sync_directory_from_file(&directory, file).await?;
    }

    let store = Arc::new(storage::acl_store(db, &settings.cache));
    let acls = AclService::new(store.clone(), &settings.authorization.default_grants);
    let authz = AuthorizationService::new(store, directory.clone());

    match cli.command {
        // Returned above, once the schema is migrated
        Command::Migrate => {}
        Command::SyncDirectory { file } => {
            directory_sync::sync_directory_from_file(&directory, &file).await?;
        }
        Command::Check {
            principal,
            subject,
            level,
        } => {
            let principal = resolve(directory.as_ref(), &principal).await?;
            let subject = SubjectId::from(subject);
            let allowed = authz.has_access_level(level, &principal, &subject).await?;
            let held = authz.access_level_for(&principal, &subject).await?;
            print_json(&json!({
                "principal": principal.id,
                "subject": subject,
                "requested": level,
                "held": held,
                "allowed": allowed,
            }))?;
        }
        Command::Show { subject } => {
            let acl = acls
                .find_for_subject_required(&SubjectId::from(subject))
                .await?;
            print_json(&acl)?;
        }
        Command::Protect { subject, owner } => {
            let owner = resolve(directory.as_ref(), &owner).await?;
            let acl = acls
                .create_for_subject(&SubjectId::from(subject), &owner)
                .await?;
            print_json(&acl)?;
        }
        Command::Grant(args) => {
            let holder = args
                .holder()
                .ok_or_else(|| miette::miette!("One of --principal, --group or --role is required"))?;
            let record = acls
                .add_record(&SubjectId::from(args.subject.as_str()), holder, args.level)
                .await?;
            print_json(&record)?;
        }
        Command::Revoke { subject, record } => {
            let removed = acls
                .remove_record(&SubjectId::from(subject), &RecordId::from(record))
                .await?;
            print_json(&json!({ "removed": removed }))?;
        }
        Command::Unprotect { subject } => {
            let removed = acls.remove_for_subject(&SubjectId::from(subject)).await?;
            print_json(&json!({ "removed": removed }))?;
        }
    }
    Ok(())
}

async fn resolve(directory: &dyn PrincipalDirectory, id: &str) -> Result<PrincipalRef> {
    let id = PrincipalId::from(id);
    let principal = directory.resolve_principal(&id).await?;
    Ok(principal.ok_or(AuthzError::UnknownPrincipal(id))?)
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let out = serde_json::to_string_pretty(value).into_diagnostic()?;
    println!("{out}");
    Ok(())
}
