//! Create admin key table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(AdminKey::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AdminKey::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(AdminKey::Code).string_len(64).not_null())
                    .col(
                        ColumnDef::new(AdminKey::IsUsed)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(AdminKey::UsedBy).string_len(128))
                    .col(ColumnDef::new(AdminKey::UsedAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(AdminKey::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index: code (lookup key, single-use token)
        manager
            .create_index(
                Index::create()
                    .name("idx_admin_key_code")
                    .table(AdminKey::Table)
                    .col(AdminKey::Code)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AdminKey::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum AdminKey {
    Table,
    Id,
    Code,
    IsUsed,
    UsedBy,
    UsedAt,
    CreatedAt,
}
