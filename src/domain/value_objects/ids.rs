//! Identifier types.
//!
//! All ids are snowflake `i64`s. On the wire they travel as decimal strings
//! because they exceed the integer range JavaScript clients can represent;
//! inbound payloads may use either a number or a string.

/// Identity of a user account. Issued by the account service, never changes.
pub type UserId = i64;

/// Identity of a chat.
pub type ChatId = i64;

/// Identity of a persisted message.
pub type MessageId = i64;

/// Identity of a friend request record.
pub type FriendRequestId = i64;

#[derive(serde::Deserialize)]
#[serde(untagged)]
enum RawId {
    Number(i64),
    Text(String),
}

impl RawId {
    fn into_id<E: serde::de::Error>(self) -> Result<i64, E> {
        match self {
            RawId::Number(n) => Ok(n),
            RawId::Text(s) => s
                .trim()
                .parse()
                .map_err(|_| E::custom(format!("invalid id: {:?}", s))),
        }
    }
}

/// `#[serde(with = "string_id")]` for `i64` ids.
pub mod string_id {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(id: &i64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(id)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
        super::RawId::deserialize(deserializer)?.into_id()
    }
}

/// `#[serde(default, with = "option_string_id")]` for `Option<i64>` ids.
pub mod option_string_id {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(id: &Option<i64>, serializer: S) -> Result<S::Ok, S::Error> {
        match id {
            Some(id) => serializer.collect_str(id),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<i64>, D::Error> {
        Option::<super::RawId>::deserialize(deserializer)?
            .map(|raw| raw.into_id())
            .transpose()
    }
}
