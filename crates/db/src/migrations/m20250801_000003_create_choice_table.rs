//! Create choice table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Choice::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Choice::Id).string_len(32).not_null().primary_key())
                    .col(ColumnDef::new(Choice::PollId).string_len(32).not_null())
                    .col(ColumnDef::new(Choice::Text).string_len(200).not_null())
                    .col(
                        ColumnDef::new(Choice::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_choice_poll")
                            .from(Choice::Table, Choice::PollId)
                            .to(Poll::Table, Poll::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Index: poll_id (for listing a poll's choices)
        manager
            .create_index(
                Index::create()
                    .name("idx_choice_poll_id")
                    .table(Choice::Table)
                    .col(Choice::PollId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Choice::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Choice {
    Table,
    Id,
    PollId,
    Text,
    CreatedAt,
}

#[derive(Iden)]
enum Poll {
    Table,
    Id,
}
