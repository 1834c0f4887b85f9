//! Poll repository.

use std::sync::Arc;

use crate::entities::{Poll, choice, poll, vote};
use ballotbox_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ItemsAndPagesNumber, JoinType,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait, Select, TransactionTrait,
    sea_query::{Expr, extension::postgres::PgExpr},
};
use serde::{Deserialize, Serialize};

/// Sort key for poll listings. All sorts are ascending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PollSort {
    /// Order by prompt text.
    Name,
    /// Order by publication date.
    Date,
    /// Order by aggregate vote count.
    Votes,
}

/// Filter for the public poll listing.
#[derive(Debug, Clone, Default)]
pub struct PollFilter {
    /// Sort key; defaults to publication date.
    pub sort: Option<PollSort>,
    /// Case-insensitive substring match on the prompt text.
    pub search: Option<String>,
}

/// One page of polls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollPage {
    /// Polls on this page.
    pub items: Vec<poll::Model>,
    /// 1-based page number actually served (out-of-range requests clamp).
    pub page: u64,
    /// Page size.
    pub per_page: u64,
    /// Total matching polls.
    pub total_items: u64,
    /// Total pages (at least 1).
    pub total_pages: u64,
}

/// Poll repository for database operations.
#[derive(Clone)]
pub struct PollRepository {
    db: Arc<DatabaseConnection>,
}

impl PollRepository {
    /// Create a new poll repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a poll by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<poll::Model>> {
        Poll::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get a poll by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<poll::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::PollNotFound(id.to_string()))
    }

    /// Create a poll together with its initial choices, atomically.
    ///
    /// Either the poll and every choice are persisted, or nothing is.
    pub async fn create_with_choices(
        &self,
        poll: poll::ActiveModel,
        choices: Vec<choice::ActiveModel>,
    ) -> AppResult<poll::Model> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let poll = poll
            .insert(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        for choice in choices {
            choice
                .insert(&txn)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
        }

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(poll)
    }

    /// Update a poll.
    pub async fn update(&self, model: poll::ActiveModel) -> AppResult<poll::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a poll. Choices and votes go with it via cascade.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        Poll::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// List polls with optional search and sort, paginated.
    pub async fn list(
        &self,
        filter: &PollFilter,
        page: u64,
        per_page: u64,
    ) -> AppResult<PollPage> {
        let mut select = Poll::find();

        if let Some(term) = filter.search.as_deref().filter(|t| !t.is_empty()) {
            let pattern = format!("%{}%", term.replace('%', "\\%").replace('_', "\\_"));
            select =
                select.filter(Expr::col((poll::Entity, poll::Column::Text)).ilike(pattern));
        }

        select = match filter.sort {
            Some(PollSort::Name) => select.order_by_asc(poll::Column::Text),
            Some(PollSort::Votes) => select
                .join(JoinType::LeftJoin, poll::Relation::Votes.def())
                .group_by(poll::Column::Id)
                .order_by_asc(vote::Column::Id.count()),
            Some(PollSort::Date) | None => select.order_by_asc(poll::Column::CreatedAt),
        };

        self.paginate(select, page, per_page).await
    }

    /// List polls owned by a user, paginated.
    pub async fn list_by_owner(
        &self,
        owner_id: &str,
        page: u64,
        per_page: u64,
    ) -> AppResult<PollPage> {
        let select = Poll::find()
            .filter(poll::Column::OwnerId.eq(owner_id))
            .order_by_asc(poll::Column::CreatedAt);

        self.paginate(select, page, per_page).await
    }

    /// Fetch one page, clamping out-of-range page numbers to the last page.
    async fn paginate(
        &self,
        select: Select<Poll>,
        page: u64,
        per_page: u64,
    ) -> AppResult<PollPage> {
        let paginator = select.paginate(self.db.as_ref(), per_page);

        let ItemsAndPagesNumber {
            number_of_items,
            number_of_pages,
        } = paginator
            .num_items_and_pages()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let total_pages = number_of_pages.max(1);
        let page = page.clamp(1, total_pages);

        let items = paginator
            .fetch_page(page - 1)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(PollPage {
            items,
            page,
            per_page,
            total_items: number_of_items,
            total_pages,
        })
    }
}
