//! Business logic services.

pub mod poll;
pub mod user;
pub mod vote;

pub use poll::{CreatePollInput, PollService, UpdatePollInput};
pub use user::{CreateUserInput, UserService};
pub use vote::{ChoiceTally, VoteService};
