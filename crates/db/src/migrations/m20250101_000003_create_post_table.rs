//! Create post table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Post::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Post::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Post::AuthorId).string_len(128).not_null())
                    .col(
                        ColumnDef::new(Post::AuthorUsername)
                            .string_len(128)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Post::AuthorAvatar).string_len(512))
                    .col(ColumnDef::new(Post::Content).text().not_null())
                    .col(ColumnDef::new(Post::ImageUrl).string_len(512))
                    .col(ColumnDef::new(Post::LinkUrl).string_len(512))
                    .col(ColumnDef::new(Post::Category).string_len(16).not_null())
                    .col(
                        ColumnDef::new(Post::Likes)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Post::Dislikes)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Post::Status)
                            .string_len(16)
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(Post::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Post::UpdatedAt).timestamp_with_time_zone())
                    .to_owned(),
            )
            .await?;

        // Index: (status, id) - approved feed and pending queue scans
        manager
            .create_index(
                Index::create()
                    .name("idx_post_status_id")
                    .table(Post::Table)
                    .col(Post::Status)
                    .col(Post::Id)
                    .to_owned(),
            )
            .await?;

        // Index: author_id (for author's own listings and visibility checks)
        manager
            .create_index(
                Index::create()
                    .name("idx_post_author_id")
                    .table(Post::Table)
                    .col(Post::AuthorId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Post::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Post {
    Table,
    Id,
    AuthorId,
    AuthorUsername,
    AuthorAvatar,
    Content,
    ImageUrl,
    LinkUrl,
    Category,
    Likes,
    Dislikes,
    Status,
    CreatedAt,
    UpdatedAt,
}
