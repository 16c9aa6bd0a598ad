//! Discord adapter for the classroom bot.
//!
//! Uses serenity for the gateway (inbound events, member presence) and its
//! HTTP client for outbound calls.

pub mod bot;
pub mod convert;
pub mod handler;
pub mod outbound;

pub use {
    bot::{DiscordConnection, connect},
    handler::DiscordHandler,
    outbound::DiscordTransport,
};
