
use macrolog_sessions::{DbPool, SessionRecord};

/// Fetches the raw persisted row for a sid, bypassing the store.
pub async fn stored_record(pool: &DbPool, sid: &str) -> Option<SessionRecord> {
    sqlx::query_as::<_, SessionRecord>(
        "SELECT sid, sess, expire FROM session_store WHERE sid = ?1",
    )
    .bind(sid)
    .fetch_optional(pool)
    .await
    .expect("failed to read session row from test db")
}

/// Inserts a raw row, bypassing the store's expiry resolution.
pub async fn insert_raw(pool: &DbPool, sid: &str, sess: &str, expire: i64) {
    sqlx::query("INSERT INTO session_store (sid, sess, expire) VALUES (?1, ?2, ?3)")
        .bind(sid)
        .bind(sess)
        .bind(expire)
        .execute(pool)
        .await
        .expect("failed to seed session row in test db");
}

pub async fn row_count(pool: &DbPool) -> i64 {
    sqlx::query_scalar("SELECT count(*) FROM session_store")
        .fetch_one(pool)
        .await
        .expect("failed to count session rows in test db")
}
