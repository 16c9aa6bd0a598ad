//! Shared identifier types and the message-level error used across all aula crates.

pub mod error;
pub mod types;

pub use {
    error::{Error, FromMessage, Result},
    types::{ChannelId, MessageId, MessageRef, UserId},
};
