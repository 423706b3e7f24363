//! Create reaction table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Reaction::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Reaction::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Reaction::UserId)
                            .string_len(128)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Reaction::PostId).string_len(32))
                    .col(ColumnDef::new(Reaction::CommentId).string_len(32))
                    .col(ColumnDef::new(Reaction::Kind).string_len(16).not_null())
                    .col(
                        ColumnDef::new(Reaction::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_reaction_post")
                            .from(Reaction::Table, Reaction::PostId)
                            .to(Post::Table, Post::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_reaction_comment")
                            .from(Reaction::Table, Reaction::CommentId)
                            .to(Comment::Table, Comment::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index: (user_id, post_id) - at most one reaction per user per post
        manager
            .create_index(
                Index::create()
                    .name("idx_reaction_user_post")
                    .table(Reaction::Table)
                    .col(Reaction::UserId)
                    .col(Reaction::PostId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Unique index: (user_id, comment_id) - at most one reaction per user per comment
        manager
            .create_index(
                Index::create()
                    .name("idx_reaction_user_comment")
                    .table(Reaction::Table)
                    .col(Reaction::UserId)
                    .col(Reaction::CommentId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Index: post_id (for recounting a post's reactions)
        manager
            .create_index(
                Index::create()
                    .name("idx_reaction_post_id")
                    .table(Reaction::Table)
                    .col(Reaction::PostId)
                    .to_owned(),
            )
            .await?;

        // Index: comment_id (for recounting a comment's reactions)
        manager
            .create_index(
                Index::create()
                    .name("idx_reaction_comment_id")
                    .table(Reaction::Table)
                    .col(Reaction::CommentId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Reaction::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Reaction {
    Table,
    Id,
    UserId,
    PostId,
    CommentId,
    Kind,
    CreatedAt,
}

#[derive(Iden)]
enum Post {
    Table,
    Id,
}

#[derive(Iden)]
enum Comment {
    Table,
    Id,
}
