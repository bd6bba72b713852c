use anyhow::Result;
use futures_util::StreamExt;
use moka::future::Cache;
use once_cell::sync::Lazy;
use sqlx::MySqlPool;
use std::time::Duration;
use tracing::info;

use crate::utils::badge_filter::normalize;

/// Badge numbers known to be taken.
pub static BADGE_CACHE: Lazy<Cache<String, bool>> = Lazy::new(|| {
    Cache::builder()
        .max_capacity(50_000)
        .time_to_live(Duration::from_secs(86400)) // 24h TTL
        .build()
});

pub async fn mark_taken(badge_number: &str) {
    BADGE_CACHE.insert(normalize(badge_number), true).await;
}

pub async fn forget(badge_number: &str) {
    BADGE_CACHE.invalidate(&normalize(badge_number)).await;
}

pub async fn is_taken(badge_number: &str) -> bool {
    BADGE_CACHE
        .get(&normalize(badge_number))
        .await
        .unwrap_or(false)
}

async fn batch_mark(badges: &[String]) {
    let futures: Vec<_> = badges
        .iter()
        .map(|b| BADGE_CACHE.insert(normalize(b), true))
        .collect();

    futures::future::join_all(futures).await;
}

/// Cache badges of accounts touched in the last `days` days, in batches.
pub async fn warmup_badge_cache(pool: &MySqlPool, days: u32, batch_size: usize) -> Result<()> {
    let mut stream = sqlx::query_as::<_, (String,)>(
        r#"
        SELECT badge_number
        FROM users
        WHERE updated_at >= NOW() - INTERVAL ? DAY
        ORDER BY updated_at DESC
        "#,
    )
    .bind(days)
    .fetch(pool);

    let mut batch = Vec::with_capacity(batch_size);
    let mut total_count = 0usize;

    while let Some(row) = stream.next().await {
        let (badge,) = row?;
        batch.push(badge);
        total_count += 1;

        if batch.len() >= batch_size {
            batch_mark(&batch).await;
            batch.clear();
        }
    }

    if !batch.is_empty() {
        batch_mark(&batch).await;
    }

    info!(total = total_count, days, "Badge cache warmup complete");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[actix_web::test]
    async fn marks_and_forgets() {
        mark_taken("pd-cache-5").await;
        assert!(is_taken("PD-CACHE-5").await);
        forget("PD-CACHE-5").await;
        assert!(!is_taken("pd-cache-5").await);
    }
}
