//! Vote repository.

use std::sync::Arc;

use crate::entities::{Vote, vote};
use ballotbox_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QuerySelect, SqlErr,
};

/// Vote repository for database operations.
#[derive(Clone)]
pub struct VoteRepository {
    db: Arc<DatabaseConnection>,
}

impl VoteRepository {
    /// Create a new vote repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Insert a vote.
    ///
    /// The unique index on (`user_id`, `poll_id`) is the last line of
    /// defense against concurrent double submission; a violation surfaces
    /// as [`AppError::AlreadyVoted`].
    pub async fn create(&self, model: vote::ActiveModel) -> AppResult<vote::Model> {
        model.insert(self.db.as_ref()).await.map_err(|e| {
            if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
                AppError::AlreadyVoted
            } else {
                AppError::Database(e.to_string())
            }
        })
    }

    /// Find a user's vote on a poll, if any.
    pub async fn find_by_user_and_poll(
        &self,
        user_id: &str,
        poll_id: &str,
    ) -> AppResult<Option<vote::Model>> {
        Vote::find()
            .filter(vote::Column::UserId.eq(user_id))
            .filter(vote::Column::PollId.eq(poll_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Check if a user has voted on a poll.
    pub async fn has_voted(&self, user_id: &str, poll_id: &str) -> AppResult<bool> {
        let count = Vote::find()
            .filter(vote::Column::UserId.eq(user_id))
            .filter(vote::Column::PollId.eq(poll_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(count > 0)
    }

    /// Count votes on a poll.
    pub async fn count_by_poll(&self, poll_id: &str) -> AppResult<u64> {
        Vote::find()
            .filter(vote::Column::PollId.eq(poll_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Vote counts for a poll, grouped by choice.
    ///
    /// Only choices with at least one vote appear; the service zero-fills
    /// the rest.
    pub async fn tally_by_poll(&self, poll_id: &str) -> AppResult<Vec<(String, i64)>> {
        Vote::find()
            .select_only()
            .column(vote::Column::ChoiceId)
            .column_as(vote::Column::Id.count(), "votes")
            .filter(vote::Column::PollId.eq(poll_id))
            .group_by(vote::Column::ChoiceId)
            .into_tuple::<(String, i64)>()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
