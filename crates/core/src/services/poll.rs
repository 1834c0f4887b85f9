//! Poll service.

use ballotbox_common::{AppError, AppResult, IdGenerator};
use ballotbox_db::{
    entities::{choice, poll, user},
    repositories::{ChoiceRepository, PollFilter, PollPage, PollRepository},
};
use chrono::Utc;
use sea_orm::Set;
use serde::Deserialize;
use validator::Validate;

/// Page size for the public poll listing.
const LIST_PAGE_SIZE: u64 = 6;

/// Page size for a user's own polls.
const OWN_LIST_PAGE_SIZE: u64 = 7;

/// Poll service for business logic.
#[derive(Clone)]
pub struct PollService {
    poll_repo: PollRepository,
    choice_repo: ChoiceRepository,
    id_gen: IdGenerator,
}

/// Input for creating a poll with its two initial choices.
#[derive(Debug, Deserialize, Validate)]
pub struct CreatePollInput {
    #[validate(length(min = 1, max = 200))]
    pub text: String,

    #[validate(length(min = 1, max = 200))]
    pub choice1: String,

    #[validate(length(min = 1, max = 200))]
    pub choice2: String,
}

/// Input for editing a poll.
///
/// `active` is not an editable field; the lifecycle is one-way and moves
/// only through `close_poll`.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdatePollInput {
    #[validate(length(min = 1, max = 200))]
    pub text: String,
}

impl PollService {
    /// Create a new poll service.
    #[must_use]
    pub const fn new(poll_repo: PollRepository, choice_repo: ChoiceRepository) -> Self {
        Self {
            poll_repo,
            choice_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Create a poll with exactly two choices, atomically.
    pub async fn create_poll(
        &self,
        owner: &user::Model,
        input: CreatePollInput,
    ) -> AppResult<poll::Model> {
        if !owner.can_create_polls {
            return Err(AppError::PermissionDenied(
                "You don't have permission to create polls".to_string(),
            ));
        }

        input.validate()?;
        for field in [&input.text, &input.choice1, &input.choice2] {
            if field.trim().is_empty() {
                return Err(AppError::Validation("Fields cannot be blank".to_string()));
            }
        }

        let now = Utc::now();
        let poll_id = self.id_gen.generate();

        let poll = poll::ActiveModel {
            id: Set(poll_id.clone()),
            text: Set(input.text),
            owner_id: Set(owner.id.clone()),
            active: Set(true),
            created_at: Set(now.into()),
            ..Default::default()
        };

        let choices = [input.choice1, input.choice2]
            .into_iter()
            .map(|text| choice::ActiveModel {
                id: Set(self.id_gen.generate()),
                poll_id: Set(poll_id.clone()),
                text: Set(text),
                created_at: Set(now.into()),
            })
            .collect();

        self.poll_repo.create_with_choices(poll, choices).await
    }

    /// Get a poll by ID.
    pub async fn get_poll(&self, poll_id: &str) -> AppResult<poll::Model> {
        self.poll_repo.get_by_id(poll_id).await
    }

    /// Update a poll's prompt text.
    pub async fn edit_poll(
        &self,
        poll_id: &str,
        editor_id: &str,
        input: UpdatePollInput,
    ) -> AppResult<poll::Model> {
        input.validate()?;
        if input.text.trim().is_empty() {
            return Err(AppError::Validation("Fields cannot be blank".to_string()));
        }

        let poll = self.owned_poll(poll_id, editor_id).await?;

        let mut active: poll::ActiveModel = poll.into();
        active.text = Set(input.text);
        active.updated_at = Set(Some(Utc::now().into()));

        self.poll_repo.update(active).await
    }

    /// Delete a poll. Its choices and votes cascade away with it.
    pub async fn delete_poll(&self, poll_id: &str, editor_id: &str) -> AppResult<()> {
        let poll = self.owned_poll(poll_id, editor_id).await?;
        self.poll_repo.delete(&poll.id).await
    }

    /// Append a choice to a poll.
    pub async fn add_choice(
        &self,
        poll_id: &str,
        editor_id: &str,
        text: String,
    ) -> AppResult<choice::Model> {
        validate_choice_text(&text)?;

        let poll = self.owned_poll(poll_id, editor_id).await?;

        let model = choice::ActiveModel {
            id: Set(self.id_gen.generate()),
            poll_id: Set(poll.id),
            text: Set(text),
            created_at: Set(Utc::now().into()),
        };

        self.choice_repo.create(model).await
    }

    /// Update a choice's text.
    pub async fn edit_choice(
        &self,
        choice_id: &str,
        editor_id: &str,
        text: String,
    ) -> AppResult<choice::Model> {
        validate_choice_text(&text)?;

        let choice = self.owned_choice(choice_id, editor_id).await?;

        let mut active: choice::ActiveModel = choice.into();
        active.text = Set(text);

        self.choice_repo.update(active).await
    }

    /// Delete a choice.
    ///
    /// Refuses when the poll would drop below its two initial choices.
    pub async fn delete_choice(&self, choice_id: &str, editor_id: &str) -> AppResult<()> {
        let choice = self.owned_choice(choice_id, editor_id).await?;

        let remaining = self.choice_repo.count_by_poll(&choice.poll_id).await?;
        if remaining <= 2 {
            return Err(AppError::Validation(
                "A poll must keep at least two choices".to_string(),
            ));
        }

        self.choice_repo.delete(&choice.id).await
    }

    /// List polls with optional search and sort.
    pub async fn list_polls(&self, filter: &PollFilter, page: u64) -> AppResult<PollPage> {
        self.poll_repo.list(filter, page, LIST_PAGE_SIZE).await
    }

    /// List the caller's own polls.
    pub async fn list_own_polls(&self, owner_id: &str, page: u64) -> AppResult<PollPage> {
        self.poll_repo
            .list_by_owner(owner_id, page, OWN_LIST_PAGE_SIZE)
            .await
    }

    /// Look up a poll and require the caller to be its owner.
    async fn owned_poll(&self, poll_id: &str, editor_id: &str) -> AppResult<poll::Model> {
        let poll = self.poll_repo.get_by_id(poll_id).await?;
        if poll.owner_id != editor_id {
            return Err(AppError::Forbidden(
                "Only the poll owner may do that".to_string(),
            ));
        }
        Ok(poll)
    }

    /// Look up a choice and require the caller to own its poll.
    async fn owned_choice(&self, choice_id: &str, editor_id: &str) -> AppResult<choice::Model> {
        let choice = self.choice_repo.get_by_id(choice_id).await?;
        self.owned_poll(&choice.poll_id, editor_id).await?;
        Ok(choice)
    }
}

fn validate_choice_text(text: &str) -> AppResult<()> {
    if text.trim().is_empty() {
        return Err(AppError::Validation(
            "Choice text cannot be blank".to_string(),
        ));
    }
    if text.len() > 200 {
        return Err(AppError::Validation(
            "Choice text is too long (max 200 chars)".to_string(),
        ));
    }
    Ok(())
}
