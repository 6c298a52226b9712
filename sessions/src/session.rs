use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;

#[cfg(feature = "test-helpers")]
use fake::{Dummy, Fake, Faker};

/// The raw row persisted in the `session_store` table.
///
/// `sess` is the JSON-encoded payload; `expire` is unix epoch milliseconds.
#[derive(Clone, FromRow, Debug)]
pub struct SessionRecord {
    pub sid: String,
    pub sess: String,
    pub expire: i64,
}

/// The structured session payload the middleware hands to the store.
///
/// The store only ever looks at [`SessionData::cookie`] to resolve an
/// expiration; everything else round-trips untouched through the flattened
/// `extra` map, so middleware-owned fields like `userId` survive storage
/// without the store knowing about them.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SessionData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cookie: Option<SessionCookie>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// The expiration hints carried by the session cookie.
///
/// `expires` is an absolute instant decided at login time; `maxAge` is a
/// rolling window in milliseconds used when the session is refreshed.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SessionCookie {
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "expires_format"
    )]
    pub expires: Option<DateTime<Utc>>,
    #[serde(rename = "maxAge", default, skip_serializing_if = "Option::is_none")]
    pub max_age: Option<i64>,
}

/// Cookie expirations are stored with millisecond precision and a `Z`
/// suffix ("2025-01-03T12:00:00.000Z") so rows stay readable by the
/// middleware that wrote the table before this store existed.
mod expires_format {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize as _, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(ts) => serializer.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Millis, true)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        raw.map(|s| {
            DateTime::parse_from_rfc3339(&s)
                .map(|ts| ts.with_timezone(&Utc))
                .map_err(serde::de::Error::custom)
        })
        .transpose()
    }
}

/// ------------------------------------------------------------------------
/// Manual impl Dummy to produce a payload shaped like a logged-in session.
/// ------------------------------------------------------------------------
///
/// Only used when the `test-helpers` feature is enabled.
///
/// # Returns
///
/// A dummy SessionData carrying a random userId and no cookie hints.
/// ------------------------------------------------------------------------
#[cfg(feature = "test-helpers")]
impl Dummy<Faker> for SessionData {
    fn dummy_with_rng<R: fake::Rng + ?Sized>(_: &Faker, rng: &mut R) -> Self {
        let user_id: u32 = (1..100_000u32).fake_with_rng(rng);
        let mut extra = serde_json::Map::new();
        extra.insert("userId".to_string(), user_id.into());
        Self {
            cookie: None,
            extra,
        }
    }
}
