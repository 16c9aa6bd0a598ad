//! Platform identifiers.
//!
//! Discord snowflakes are carried as opaque strings so the engine never
//! depends on the transport's numeric representation.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Parse the id as a numeric snowflake.
            pub fn as_u64(&self) -> crate::Result<u64> {
                self.0
                    .parse()
                    .map_err(|_| crate::Error::invalid_id(self.0.clone()))
            }

            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self(value.to_string())
            }
        }
    };
}

string_id!(
    /// A chat user (student, teacher, or the bot itself).
    UserId
);
string_id!(
    /// A text channel, including private (DM) channels.
    ChannelId
);
string_id!(MessageId);

/// A message addressed by channel and id; reactions and edits need both.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageRef {
    pub channel_id: ChannelId,
    pub message_id: MessageId,
}

impl MessageRef {
    pub fn new(channel_id: impl Into<ChannelId>, message_id: impl Into<MessageId>) -> Self {
        Self {
            channel_id: channel_id.into(),
            message_id: message_id.into(),
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_serialize_as_plain_strings() {
        let id = UserId::from(818983033838370867_u64);
        assert_eq!(
            serde_json::to_string(&id).unwrap(),
            "\"818983033838370867\""
        );
        assert_eq!(id.as_u64().unwrap(), 818983033838370867);
    }

    #[test]
    fn non_numeric_id_is_rejected_as_snowflake() {
        assert!(ChannelId::new("general").as_u64().is_err());
    }
}
