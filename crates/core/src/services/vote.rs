//! Voting service.

use std::collections::HashMap;

use ballotbox_common::{AppError, AppResult, IdGenerator};
use ballotbox_db::{
    entities::{poll, vote},
    repositories::{ChoiceRepository, PollRepository, VoteRepository},
};
use chrono::Utc;
use sea_orm::Set;

/// Voting service for business logic.
#[derive(Clone)]
pub struct VoteService {
    poll_repo: PollRepository,
    choice_repo: ChoiceRepository,
    vote_repo: VoteRepository,
    id_gen: IdGenerator,
}

/// Per-choice vote count, computed on demand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceTally {
    /// Choice ID.
    pub choice_id: String,
    /// Choice text.
    pub text: String,
    /// Number of votes cast for the choice.
    pub votes: i64,
}

impl VoteService {
    /// Create a new voting service.
    #[must_use]
    pub const fn new(
        poll_repo: PollRepository,
        choice_repo: ChoiceRepository,
        vote_repo: VoteRepository,
    ) -> Self {
        Self {
            poll_repo,
            choice_repo,
            vote_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Whether a user may still vote on a poll.
    ///
    /// True iff the poll is active and the user has not voted on it.
    pub async fn can_vote(&self, user_id: &str, poll: &poll::Model) -> AppResult<bool> {
        if !poll.active {
            return Ok(false);
        }
        Ok(!self.vote_repo.has_voted(user_id, &poll.id).await?)
    }

    /// Cast a vote.
    ///
    /// The insert is guarded by the (`user_id`, `poll_id`) unique index, so
    /// two concurrent submissions that both pass [`Self::can_vote`] resolve
    /// to one vote and one [`AppError::AlreadyVoted`].
    pub async fn cast_vote(
        &self,
        user_id: &str,
        poll_id: &str,
        choice_id: Option<&str>,
    ) -> AppResult<vote::Model> {
        let poll = self.poll_repo.get_by_id(poll_id).await?;

        if !self.can_vote(user_id, &poll).await? {
            return Err(AppError::AlreadyVoted);
        }

        let choice_id = choice_id
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .ok_or(AppError::NoChoiceSelected)?;

        let choice = self.choice_repo.get_by_id(choice_id).await?;
        if choice.poll_id != poll.id {
            return Err(AppError::ChoiceNotFound(choice_id.to_string()));
        }

        let model = vote::ActiveModel {
            id: Set(self.id_gen.generate()),
            user_id: Set(user_id.to_string()),
            poll_id: Set(poll.id),
            choice_id: Set(choice.id),
            created_at: Set(Utc::now().into()),
        };

        self.vote_repo.create(model).await
    }

    /// Close a poll, ending voting. Idempotent.
    pub async fn close_poll(&self, poll_id: &str, editor_id: &str) -> AppResult<poll::Model> {
        let poll = self.poll_repo.get_by_id(poll_id).await?;
        if poll.owner_id != editor_id {
            return Err(AppError::Forbidden(
                "Only the poll owner may close it".to_string(),
            ));
        }

        if !poll.active {
            return Ok(poll);
        }

        let mut active: poll::ActiveModel = poll.into();
        active.active = Set(false);
        active.updated_at = Set(Some(Utc::now().into()));

        self.poll_repo.update(active).await
    }

    /// Per-choice vote counts for a poll.
    ///
    /// Every choice of the poll appears, zero-filled when unvoted, in
    /// insertion order.
    pub async fn tally(&self, poll_id: &str) -> AppResult<Vec<ChoiceTally>> {
        let poll = self.poll_repo.get_by_id(poll_id).await?;

        let choices = self.choice_repo.find_by_poll(&poll.id).await?;
        let counts: HashMap<String, i64> = self
            .vote_repo
            .tally_by_poll(&poll.id)
            .await?
            .into_iter()
            .collect();

        Ok(choices
            .into_iter()
            .map(|c| {
                let votes = counts.get(&c.id).copied().unwrap_or(0);
                ChoiceTally {
                    choice_id: c.id,
                    text: c.text,
                    votes,
                }
            })
            .collect())
    }

    /// The caller's own vote on a poll, if any.
    pub async fn vote_of_user(
        &self,
        user_id: &str,
        poll_id: &str,
    ) -> AppResult<Option<vote::Model>> {
        self.vote_repo.find_by_user_and_poll(user_id, poll_id).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use ballotbox_db::entities::choice;
    use chrono::Utc;
    use maplit::btreemap;
    use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase, MockExecResult, Value};
    use std::sync::Arc;

    fn create_test_poll(id: &str, owner_id: &str, active: bool) -> poll::Model {
        poll::Model {
            id: id.to_string(),
            text: "Best color?".to_string(),
            owner_id: owner_id.to_string(),
            active,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn create_test_choice(id: &str, poll_id: &str, text: &str) -> choice::Model {
        choice::Model {
            id: id.to_string(),
            poll_id: poll_id.to_string(),
            text: text.to_string(),
            created_at: Utc::now().into(),
        }
    }

    fn create_test_vote(id: &str, user_id: &str, poll_id: &str, choice_id: &str) -> vote::Model {
        vote::Model {
            id: id.to_string(),
            user_id: user_id.to_string(),
            poll_id: poll_id.to_string(),
            choice_id: choice_id.to_string(),
            created_at: Utc::now().into(),
        }
    }

    fn count_row(n: i64) -> Vec<std::collections::BTreeMap<&'static str, Value>> {
        vec![btreemap! { "num_items" => Into::<Value>::into(n) }]
    }

    fn service_with(db: DatabaseConnection) -> VoteService {
        let db = Arc::new(db);
        VoteService::new(
            PollRepository::new(Arc::clone(&db)),
            ChoiceRepository::new(Arc::clone(&db)),
            VoteRepository::new(db),
        )
    }

    #[tokio::test]
    async fn test_can_vote_false_when_poll_closed() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let service = service_with(db);

        let poll = create_test_poll("poll1", "owner", false);
        assert!(!service.can_vote("user1", &poll).await.unwrap());
    }

    #[tokio::test]
    async fn test_can_vote_false_after_voting() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([count_row(1)])
            .into_connection();
        let service = service_with(db);

        let poll = create_test_poll("poll1", "owner", true);
        assert!(!service.can_vote("user1", &poll).await.unwrap());
    }

    #[tokio::test]
    async fn test_can_vote_true_on_fresh_active_poll() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([count_row(0)])
            .into_connection();
        let service = service_with(db);

        let poll = create_test_poll("poll1", "owner", true);
        assert!(service.can_vote("user1", &poll).await.unwrap());
    }

    #[tokio::test]
    async fn test_cast_vote_poll_not_found() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<poll::Model>::new()])
            .into_connection();
        let service = service_with(db);

        let result = service.cast_vote("user1", "missing", Some("choice1")).await;
        assert!(matches!(result, Err(AppError::PollNotFound(_))));
    }

    #[tokio::test]
    async fn test_cast_vote_on_closed_poll_fails() {
        let poll = create_test_poll("poll1", "owner", false);

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[poll]])
            .into_connection();
        let service = service_with(db);

        let result = service.cast_vote("user1", "poll1", Some("choice1")).await;
        assert!(matches!(result, Err(AppError::AlreadyVoted)));
    }

    #[tokio::test]
    async fn test_cast_vote_twice_fails() {
        let poll = create_test_poll("poll1", "owner", true);

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[poll]])
            .append_query_results([count_row(1)])
            .into_connection();
        let service = service_with(db);

        let result = service.cast_vote("user1", "poll1", Some("choice1")).await;
        assert!(matches!(result, Err(AppError::AlreadyVoted)));
    }

    #[tokio::test]
    async fn test_cast_vote_without_choice_fails() {
        let poll = create_test_poll("poll1", "owner", true);

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[poll]])
            .append_query_results([count_row(0)])
            .into_connection();
        let service = service_with(db);

        let result = service.cast_vote("user1", "poll1", None).await;
        assert!(matches!(result, Err(AppError::NoChoiceSelected)));

        // An empty string counts as no selection too
        let poll = create_test_poll("poll1", "owner", true);
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[poll]])
            .append_query_results([count_row(0)])
            .into_connection();
        let service = service_with(db);

        let result = service.cast_vote("user1", "poll1", Some("")).await;
        assert!(matches!(result, Err(AppError::NoChoiceSelected)));
    }

    #[tokio::test]
    async fn test_cast_vote_rejects_choice_of_other_poll() {
        let poll = create_test_poll("poll1", "owner", true);
        let foreign_choice = create_test_choice("choice9", "poll2", "Green");

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[poll]])
            .append_query_results([count_row(0)])
            .append_query_results([[foreign_choice]])
            .into_connection();
        let service = service_with(db);

        let result = service.cast_vote("user1", "poll1", Some("choice9")).await;
        assert!(matches!(result, Err(AppError::ChoiceNotFound(_))));
    }

    #[tokio::test]
    async fn test_cast_vote_success() {
        let poll = create_test_poll("poll1", "owner", true);
        let choice = create_test_choice("choice1", "poll1", "Red");
        let vote = create_test_vote("vote1", "user1", "poll1", "choice1");

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[poll]])
            .append_query_results([count_row(0)])
            .append_query_results([[choice]])
            .append_query_results([[vote]])
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .into_connection();
        let service = service_with(db);

        let cast = service
            .cast_vote("user1", "poll1", Some("choice1"))
            .await
            .unwrap();
        assert_eq!(cast.choice_id, "choice1");
        assert_eq!(cast.user_id, "user1");
    }

    #[tokio::test]
    async fn test_close_poll_by_non_owner_is_forbidden() {
        let poll = create_test_poll("poll1", "owner", true);

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[poll]])
            .into_connection();
        let service = service_with(db);

        let result = service.close_poll("poll1", "intruder").await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_close_poll_flips_active() {
        let poll = create_test_poll("poll1", "owner", true);
        let closed = create_test_poll("poll1", "owner", false);

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[poll]])
            .append_query_results([[closed]])
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .into_connection();
        let service = service_with(db);

        let result = service.close_poll("poll1", "owner").await.unwrap();
        assert!(!result.active);
    }

    #[tokio::test]
    async fn test_close_poll_is_idempotent() {
        let closed = create_test_poll("poll1", "owner", false);

        // Already closed: the single lookup is the only query issued
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[closed]])
            .into_connection();
        let service = service_with(db);

        let result = service.close_poll("poll1", "owner").await.unwrap();
        assert!(!result.active);
    }

    #[tokio::test]
    async fn test_tally_zero_fills_unvoted_choices() {
        let poll = create_test_poll("poll1", "owner", true);
        let choice1 = create_test_choice("choice1", "poll1", "Red");
        let choice2 = create_test_choice("choice2", "poll1", "Blue");

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[poll]])
            .append_query_results([[choice1, choice2]])
            .append_query_results([vec![btreemap! {
                "choice_id" => Into::<Value>::into("choice1"),
                "votes" => Into::<Value>::into(1i64),
            }]])
            .into_connection();
        let service = service_with(db);

        let tally = service.tally("poll1").await.unwrap();

        assert_eq!(tally.len(), 2);
        assert_eq!(tally[0].choice_id, "choice1");
        assert_eq!(tally[0].votes, 1);
        assert_eq!(tally[1].choice_id, "choice2");
        assert_eq!(tally[1].votes, 0);
    }

    #[tokio::test]
    async fn test_tally_fresh_poll_is_all_zeros() {
        let poll = create_test_poll("poll1", "owner", true);
        let choice1 = create_test_choice("choice1", "poll1", "Red");
        let choice2 = create_test_choice("choice2", "poll1", "Blue");

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[poll]])
            .append_query_results([[choice1, choice2]])
            .append_query_results([Vec::<std::collections::BTreeMap<&str, Value>>::new()])
            .into_connection();
        let service = service_with(db);

        let tally = service.tally("poll1").await.unwrap();

        assert_eq!(tally.len(), 2);
        assert!(tally.iter().all(|t| t.votes == 0));
    }
}
