//! Chat transport capability.
//!
//! The engine talks to a chat platform only through [`ChatTransport`]
//! (outbound calls) and [`Directory`] (presence and member names). Adapters
//! translate platform events into [`InboundEvent`]s.

pub mod directory;
pub mod error;
pub mod event;
pub mod memory;
pub mod transport;

pub use {
    directory::{Device, Directory, DirectoryState, OnlineStatus, Presence},
    error::{Error, Result},
    event::{Attachment, InboundEvent, InboundMessage, PresenceUpdate, ReactionEvent},
    memory::{InMemoryTransport, OutboundCall},
    transport::{ChatTransport, Embed, EmbedField},
};
