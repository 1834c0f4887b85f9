//! Choice repository.

use std::sync::Arc;

use crate::entities::{Choice, choice};
use ballotbox_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder,
};

/// Choice repository for database operations.
#[derive(Clone)]
pub struct ChoiceRepository {
    db: Arc<DatabaseConnection>,
}

impl ChoiceRepository {
    /// Create a new choice repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a choice by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<choice::Model>> {
        Choice::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get a choice by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<choice::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::ChoiceNotFound(id.to_string()))
    }

    /// Get a poll's choices in insertion order.
    pub async fn find_by_poll(&self, poll_id: &str) -> AppResult<Vec<choice::Model>> {
        Choice::find()
            .filter(choice::Column::PollId.eq(poll_id))
            .order_by_asc(choice::Column::CreatedAt)
            .order_by_asc(choice::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count a poll's choices.
    pub async fn count_by_poll(&self, poll_id: &str) -> AppResult<u64> {
        Choice::find()
            .filter(choice::Column::PollId.eq(poll_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new choice.
    pub async fn create(&self, model: choice::ActiveModel) -> AppResult<choice::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update a choice.
    pub async fn update(&self, model: choice::ActiveModel) -> AppResult<choice::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a choice. Its votes go with it via cascade.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        Choice::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use maplit::btreemap;
    use sea_orm::{DatabaseBackend, MockDatabase, Value};

    fn create_test_choice(id: &str, poll_id: &str, text: &str) -> choice::Model {
        choice::Model {
            id: id.to_string(),
            poll_id: poll_id.to_string(),
            text: text.to_string(),
            created_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_get_by_id_not_found_returns_error() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<choice::Model>::new()])
                .into_connection(),
        );

        let repo = ChoiceRepository::new(db);
        let result = repo.get_by_id("nonexistent").await;

        assert!(result.is_err());
        match result {
            Err(AppError::ChoiceNotFound(id)) => assert_eq!(id, "nonexistent"),
            _ => panic!("Expected ChoiceNotFound error"),
        }
    }

    #[tokio::test]
    async fn test_find_by_poll() {
        let choice1 = create_test_choice("choice1", "poll1", "Red");
        let choice2 = create_test_choice("choice2", "poll1", "Blue");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[choice1, choice2]])
                .into_connection(),
        );

        let repo = ChoiceRepository::new(db);
        let result = repo.find_by_poll("poll1").await.unwrap();

        assert_eq!(result.len(), 2);
        assert_eq!(result[0].text, "Red");
        assert_eq!(result[1].text, "Blue");
    }

    #[tokio::test]
    async fn test_count_by_poll() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([vec![btreemap! {
                    "num_items" => Into::<Value>::into(2i64),
                }]])
                .into_connection(),
        );

        let repo = ChoiceRepository::new(db);
        let count = repo.count_by_poll("poll1").await.unwrap();

        assert_eq!(count, 2);
    }
}
