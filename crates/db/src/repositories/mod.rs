//! Database repositories.

pub mod choice;
pub mod poll;
pub mod user;
pub mod vote;

pub use choice::ChoiceRepository;
pub use poll::{PollFilter, PollPage, PollRepository, PollSort};
pub use user::UserRepository;
pub use vote::VoteRepository;
