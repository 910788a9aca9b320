use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Enable foreign keys for SQLite
        if manager.get_database_backend() == sea_orm::DatabaseBackend::Sqlite {
            manager
                .get_connection()
                .execute_unprepared("PRAGMA foreign_keys = ON")
                .await?;
        }

        manager
            .create_table(
                Table::create()
                    .table(AccessControlLists::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AccessControlLists::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(big_integer(AccessControlLists::CreatedAt))
                    .col(big_integer(AccessControlLists::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(AccessControlRecords::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AccessControlRecords::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(string(AccessControlRecords::AclId))
                    .col(string(AccessControlRecords::AccessLevel))
                    .col(string(AccessControlRecords::HolderType))
                    .col(string(AccessControlRecords::HolderId))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_record_acl")
                            .from(AccessControlRecords::Table, AccessControlRecords::AclId)
                            .to(AccessControlLists::Table, AccessControlLists::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_record_acl")
                    .table(AccessControlRecords::Table)
                    .col(AccessControlRecords::AclId)
                    .to_owned(),
            )
            .await?;

        // Used by holder-centric lookups (subjects a principal administers)
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_record_holder")
                    .table(AccessControlRecords::Table)
                    .col(AccessControlRecords::HolderType)
                    .col(AccessControlRecords::HolderId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SubjectAcls::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SubjectAcls::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(string(SubjectAcls::Subject))
                    .col(string(SubjectAcls::AclId))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_subject_acl")
                            .from(SubjectAcls::Table, SubjectAcls::AclId)
                            .to(AccessControlLists::Table, AccessControlLists::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_subject_acls_subject")
                    .table(SubjectAcls::Table)
                    .col(SubjectAcls::Subject)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SubjectAcls::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(AccessControlRecords::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(AccessControlLists::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum AccessControlLists {
    Table,
    Id,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum AccessControlRecords {
    Table,
    Id,
    AclId,
    AccessLevel,
    HolderType,
    HolderId,
}

#[derive(DeriveIden)]
enum SubjectAcls {
    Table,
    Id,
    Subject,
    AclId,
}
