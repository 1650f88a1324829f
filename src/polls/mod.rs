//! Polling Subsystem
//!
//! Anonymous polls for group chats: a poll is started in the conversation,
//! voters fetch one-time codes over HTTP out-of-band, cast them back in the
//! chat, and the creator ends the poll to reveal the tally.

pub mod command;
pub mod issuer;
pub mod store;
pub mod sweeper;

pub use command::PollCommand;
pub use issuer::{IssuerError, OptionsResponse};
pub use store::{PollError, PollResult, PollStore, StoreLimits, Tally, TallyEntry};
