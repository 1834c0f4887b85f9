//! Create vote table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Vote::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Vote::Id).string_len(32).not_null().primary_key())
                    .col(ColumnDef::new(Vote::UserId).string_len(32).not_null())
                    .col(ColumnDef::new(Vote::PollId).string_len(32).not_null())
                    .col(ColumnDef::new(Vote::ChoiceId).string_len(32).not_null())
                    .col(
                        ColumnDef::new(Vote::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_vote_user")
                            .from(Vote::Table, Vote::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_vote_poll")
                            .from(Vote::Table, Vote::PollId)
                            .to(Poll::Table, Poll::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_vote_choice")
                            .from(Vote::Table, Vote::ChoiceId)
                            .to(Choice::Table, Choice::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index: (user_id, poll_id) - one vote per user per poll.
        // This is the storage-level guard; concurrent double submissions
        // resolve to one insert and one unique violation.
        manager
            .create_index(
                Index::create()
                    .name("idx_vote_user_poll")
                    .table(Vote::Table)
                    .col(Vote::UserId)
                    .col(Vote::PollId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Index: poll_id (for tallying a poll)
        manager
            .create_index(
                Index::create()
                    .name("idx_vote_poll_id")
                    .table(Vote::Table)
                    .col(Vote::PollId)
                    .to_owned(),
            )
            .await?;

        // Index: choice_id (for per-choice counts)
        manager
            .create_index(
                Index::create()
                    .name("idx_vote_choice_id")
                    .table(Vote::Table)
                    .col(Vote::ChoiceId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Vote::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Vote {
    Table,
    Id,
    UserId,
    PollId,
    ChoiceId,
    CreatedAt,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}

#[derive(Iden)]
enum Poll {
    Table,
    Id,
}

#[derive(Iden)]
enum Choice {
    Table,
    Id,
}
