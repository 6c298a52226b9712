use async_trait::async_trait;
use chrono::Utc;
use macrolog_config::Config;

use crate::session::{SessionData, SessionRecord};
use crate::{DbPool, Error};

/// Fallback session lifetime used whenever the payload carries no cookie
/// hint: 24 hours, in milliseconds.
pub const DEFAULT_TTL_MS: i64 = 24 * 60 * 60 * 1000;

/// ------------------------------------------------------------------------
/// # The session lifecycle contract consumed by auth middleware
/// ------------------------------------------------------------------------
///
/// Middleware depends on this trait rather than on [`SessionStore`] so the
/// backing storage can be swapped without touching the call sites.
///
/// Every operation is a single self-contained unit of work against the
/// shared pool; the store keeps no per-session state between calls and
/// concurrent writes for the same sid resolve last-write-wins at the row
/// level.
/// ------------------------------------------------------------------------
#[async_trait]
pub trait SessionLifecycle {
    /// Verifies the backing schema exists. Does not create it.
    async fn init(&self) -> Result<(), Error>;

    /// Loads the live session for `sid`, pruning it first if it has expired.
    async fn get(&self, sid: &str) -> Result<Option<SessionData>, Error>;

    /// Upserts the full payload for `sid`, recomputing its expiry.
    async fn set(&self, sid: &str, session: &SessionData) -> Result<(), Error>;

    /// Extends the expiry for `sid` without rewriting its payload.
    async fn touch(&self, sid: &str, session: &SessionData) -> Result<(), Error>;

    /// Removes the session for `sid`, if any.
    async fn destroy(&self, sid: &str) -> Result<(), Error>;
}

/// SQL-backed session store keyed by the caller-minted session id.
///
/// Expiry is a predicate evaluated at read time, not a stored status: rows
/// past their `expire` instant simply stop being returned and are deleted
/// by the read that discovers them, so no background sweep is required for
/// correctness (one is available via [`SessionStore::continuously_delete_expired`]).
#[derive(Debug, Clone)]
pub struct SessionStore {
    pool: DbPool,
    default_ttl_ms: i64,
}

impl SessionStore {
    /// Creates a store over the given pool with the default TTL of
    /// [`DEFAULT_TTL_MS`] (24 hours).
    pub fn new(pool: DbPool) -> Self {
        Self {
            pool,
            default_ttl_ms: DEFAULT_TTL_MS,
        }
    }

    /// Overrides the fallback TTL, in milliseconds.
    pub fn with_ttl(mut self, ttl_ms: i64) -> Self {
        self.default_ttl_ms = ttl_ms;
        self
    }

    /// Creates a store with the TTL taken from the `session` config section.
    pub fn from_config(pool: DbPool, config: &Config) -> Self {
        Self::new(pool).with_ttl(config.session.ttl_ms)
    }

    /// Deletes every row whose expiry has passed. Returns the number of
    /// rows removed.
    pub async fn delete_expired(&self) -> Result<u64, Error> {
        let result = sqlx::query("DELETE FROM session_store WHERE expire <= ?1")
            .bind(Utc::now().timestamp_millis())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    /// Deletes expired rows on an interval, forever.
    ///
    /// Meant to be spawned as a background task at startup. Reads stay
    /// correct without it; the sweep only keeps the table from accumulating
    /// dead rows that no `get` happens to touch.
    pub async fn continuously_delete_expired(
        self,
        period: tokio::time::Duration,
    ) -> Result<(), Error> {
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            self.delete_expired().await?;
        }
    }

    /// New expiry for a full write: an absolute `cookie.expires` decided at
    /// login time wins; otherwise the default TTL starts now. `maxAge` is
    /// deliberately not consulted here, only by [`SessionStore::touch`].
    fn expiry_for_set(&self, session: &SessionData) -> i64 {
        session
            .cookie
            .as_ref()
            .and_then(|cookie| cookie.expires)
            .map(|expires| expires.timestamp_millis())
            .unwrap_or_else(|| Utc::now().timestamp_millis() + self.default_ttl_ms)
    }

    /// New expiry for a refresh: the rolling `cookie.maxAge` window wins;
    /// otherwise the default TTL starts now.
    fn expiry_for_touch(&self, session: &SessionData) -> i64 {
        let window = session
            .cookie
            .as_ref()
            .and_then(|cookie| cookie.max_age)
            .unwrap_or(self.default_ttl_ms);

        Utc::now().timestamp_millis() + window
    }
}

#[async_trait]
impl SessionLifecycle for SessionStore {
    async fn init(&self) -> Result<(), Error> {
        sqlx::query("SELECT 1 FROM session_store LIMIT 1")
            .fetch_optional(&self.pool)
            .await
            .map_err(classify_probe_error)?;

        Ok(())
    }

    async fn get(&self, sid: &str) -> Result<Option<SessionData>, Error> {
        let record = sqlx::query_as::<_, SessionRecord>(
            "SELECT sid, sess, expire FROM session_store WHERE sid = ?1",
        )
        .bind(sid)
        .fetch_optional(&self.pool)
        .await?;

        let Some(record) = record else {
            return Ok(None);
        };

        if record.expire <= Utc::now().timestamp_millis() {
            // The read result is already decided; a failed prune just
            // leaves the row for a later read to collect.
            let _ = self.destroy(sid).await;
            return Ok(None);
        }

        let session = serde_json::from_str(&record.sess)?;

        Ok(Some(session))
    }

    async fn set(&self, sid: &str, session: &SessionData) -> Result<(), Error> {
        let expire = self.expiry_for_set(session);
        let sess = serde_json::to_string(session)?;

        sqlx::query(
            r#"
            INSERT INTO session_store (sid, sess, expire)
            VALUES (?1, ?2, ?3)
            ON CONFLICT (sid) DO UPDATE SET sess = excluded.sess, expire = excluded.expire

"#,
        )
        .bind(sid)
        .bind(sess)
        .bind(expire)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn touch(&self, sid: &str, session: &SessionData) -> Result<(), Error> {
        let expire = self.expiry_for_touch(session);

        // Zero affected rows means the session is already gone; touching a
        // missing sid is a silent no-op.
        sqlx::query("UPDATE session_store SET expire = ?2 WHERE sid = ?1")
            .bind(sid)
            .bind(expire)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn destroy(&self, sid: &str) -> Result<(), Error> {
        sqlx::query("DELETE FROM session_store WHERE sid = ?1")
            .bind(sid)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

/// Maps a failure of the `init` schema probe onto the error taxonomy.
///
/// The undefined-table class is engine specific: SQLite reports error code
/// 1 with a "no such table" message, while Postgres would report SQLSTATE
/// 42P01. Swapping the backing engine only means updating this check.
fn classify_probe_error(e: sqlx::Error) -> Error {
    match &e {
        sqlx::Error::Database(dbe)
            if dbe.code().as_deref() == Some("1")
                && dbe.message().starts_with("no such table") =>
        {
            Error::SchemaMissing(e)
        }
        _ => Error::Database(e),
    }
}
