use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Principals::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Principals::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(string_uniq(Principals::Username))
                    .col(big_integer(Principals::CreatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(UserGroups::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(UserGroups::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(string(UserGroups::Label))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(UserGroupMembers::Table)
                    .if_not_exists()
                    .col(string(UserGroupMembers::GroupId))
                    .col(string(UserGroupMembers::PrincipalId))
                    .primary_key(
                        Index::create()
                            .col(UserGroupMembers::GroupId)
                            .col(UserGroupMembers::PrincipalId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_member_group")
                            .from(UserGroupMembers::Table, UserGroupMembers::GroupId)
                            .to(UserGroups::Table, UserGroups::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_member_principal")
                            .from(UserGroupMembers::Table, UserGroupMembers::PrincipalId)
                            .to(Principals::Table, Principals::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PrincipalRoles::Table)
                    .if_not_exists()
                    .col(string(PrincipalRoles::PrincipalId))
                    .col(string(PrincipalRoles::Role))
                    .primary_key(
                        Index::create()
                            .col(PrincipalRoles::PrincipalId)
                            .col(PrincipalRoles::Role),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_role_principal")
                            .from(PrincipalRoles::Table, PrincipalRoles::PrincipalId)
                            .to(Principals::Table, Principals::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PrincipalRoles::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(UserGroupMembers::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(UserGroups::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Principals::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Principals {
    Table,
    Id,
    Username,
    CreatedAt,
}

#[derive(DeriveIden)]
enum UserGroups {
    Table,
    Id,
    Label,
}

#[derive(DeriveIden)]
enum UserGroupMembers {
    Table,
    GroupId,
    PrincipalId,
}

#[derive(DeriveIden)]
enum PrincipalRoles {
    Table,
    PrincipalId,
    Role,
}
