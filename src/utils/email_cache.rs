use anyhow::Result;
use futures_util::StreamExt;
use moka::future::Cache;
use once_cell::sync::Lazy;
use sqlx::{MySqlPool, Row};
use std::time::Duration;
use tracing::info;

/// true  => email is TAKEN
/// false => email is AVAILABLE (usually we store only taken)
pub static EMAIL_CACHE: Lazy<Cache<String, bool>> = Lazy::new(|| {
    Cache::builder()
        .max_capacity(500_000)
        .time_to_live(Duration::from_secs(86400)) // 24h TTL
        .build()
});

/// Mark a single email as taken
pub async fn mark_taken(email: &str) {
    EMAIL_CACHE.insert(email.to_lowercase(), true).await;
}

/// Check if email is taken
pub async fn is_taken(email: &str) -> bool {
    EMAIL_CACHE.get(&email.to_lowercase()).await.unwrap_or(false)
}

/// Warm the cache with recently registered accounts. Streams rows so a large
/// users table never sits in memory at once.
pub async fn warmup_email_cache(pool: &MySqlPool, days: u32, batch_size: usize) -> Result<()> {
    let mut rows = sqlx::query(
        "SELECT email FROM users WHERE created_at >= NOW() - INTERVAL ? DAY",
    )
    .bind(days)
    .fetch(pool);

    let mut batch = Vec::with_capacity(batch_size);
    let mut warmed = 0usize;

    while let Some(row) = rows.next().await {
        let email: String = row?.get("email");
        batch.push(email);

        if batch.len() >= batch_size {
            batch_mark(&batch).await;
            warmed += batch.len();
            batch.clear();
        }
    }

    if !batch.is_empty() {
        warmed += batch.len();
        batch_mark(&batch).await;
    }

    info!(warmed, "Email cache warmup complete");
    Ok(())
}

async fn batch_mark(emails: &[String]) {
    let futures: Vec<_> = emails
        .iter()
        .map(|e| EMAIL_CACHE.insert(e.to_lowercase(), true))
        .collect();

    futures::future::join_all(futures).await;
}

/// true  => email AVAILABLE
/// false => email TAKEN
///
/// Cache gives a fast positive for recently seen emails; the database is the
/// source of truth for everything else.
pub async fn is_email_available(email: &str, pool: &MySqlPool) -> bool {
    let email = email.to_lowercase();

    if is_taken(&email).await {
        return false;
    }

    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM users WHERE email = ? LIMIT 1)",
    )
    .bind(&email)
    .fetch_one(pool)
    .await
    .unwrap_or(true); // fail-safe

    if exists {
        mark_taken(&email).await;
        return false;
    }

    true
}

/// Uniqueness probe for updates; the caller's own row does not count as a
/// collision, so the cache cannot be consulted here.
pub async fn is_email_available_excluding(
    email: &str,
    exclude_user_id: u64,
    pool: &MySqlPool,
) -> bool {
    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM users WHERE email = ? AND id != ? LIMIT 1)",
    )
    .bind(email.to_lowercase())
    .bind(exclude_user_id)
    .fetch_one(pool)
    .await
    .unwrap_or(true); // fail-safe

    !exists
}

#[cfg(test)]
mod tests {
    use super::*;

    #[actix_web::test]
    async fn cache_is_case_insensitive() {
        mark_taken("Mixed.Case@Company.com").await;
        assert!(is_taken("mixed.case@company.com").await);
        assert!(is_taken("MIXED.CASE@COMPANY.COM").await);
        assert!(!is_taken("someone.else@company.com").await);
    }
}
