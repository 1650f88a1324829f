//! pollbot library
//!
//! Chat-integrated anonymous polling: poll state management, one-time vote
//! code issuance over HTTP, chat command handling, and time-based expiry.
//! The chat transport itself is external; it plugs in through the seam in
//! [`channels`].

pub mod channels;
pub mod cli;
pub mod config;
pub mod polls;
