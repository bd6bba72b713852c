use anyhow::{Result, anyhow};
use autoscale_cuckoo_filter::CuckooFilter;
use futures::StreamExt;
use once_cell::sync::Lazy;
use sqlx::MySqlPool;
use std::sync::RwLock;
use tracing::info;

/// Expected capacity and false-positive rate. A department rarely has more
/// than a few thousand badges on record.
const FILTER_CAPACITY: usize = 20_000;
const FALSE_POSITIVE_RATE: f64 = 0.001;

static BADGE_FILTER: Lazy<RwLock<CuckooFilter<String>>> =
    Lazy::new(|| RwLock::new(CuckooFilter::new(FILTER_CAPACITY, FALSE_POSITIVE_RATE)));

/// Badge numbers compare case-insensitively and ignore surrounding blanks.
#[inline]
pub fn normalize(badge_number: &str) -> String {
    badge_number.trim().to_uppercase()
}

/// Check if a badge number might be taken (false positives possible).
pub fn might_exist(badge_number: &str) -> bool {
    let badge = normalize(badge_number);
    match BADGE_FILTER.read() {
        Ok(filter) => filter.contains(&badge),
        // A poisoned filter must not hide taken badges; defer to the database.
        Err(_) => true,
    }
}

pub fn insert(badge_number: &str) {
    let badge = normalize(badge_number);
    if let Ok(mut filter) = BADGE_FILTER.write() {
        filter.add(&badge);
    }
}

pub fn remove(badge_number: &str) {
    let badge = normalize(badge_number);
    if let Ok(mut filter) = BADGE_FILTER.write() {
        filter.remove(&badge);
    }
}

/// Load every badge number into the filter, streaming in batches.
pub async fn warmup_badge_filter(pool: &MySqlPool, batch_size: usize) -> Result<()> {
    let mut stream = sqlx::query_as::<_, (String,)>("SELECT badge_number FROM users").fetch(pool);

    let mut batch = Vec::with_capacity(batch_size);
    let mut total = 0usize;

    while let Some(row) = stream.next().await {
        let (badge,) = row.map_err(|e| anyhow!("DB row fetch failed: {}", e))?;

        batch.push(normalize(&badge));
        total += 1;

        if batch.len() == batch_size {
            insert_batch(&batch)?;
            batch.clear();
        }
    }

    if !batch.is_empty() {
        insert_batch(&batch)?;
    }

    info!(total, "Badge filter warmup complete");
    Ok(())
}

fn insert_batch(badges: &[String]) -> Result<()> {
    let mut filter = BADGE_FILTER
        .write()
        .map_err(|_| anyhow!("badge filter poisoned"))?;

    for badge in badges {
        filter.add(badge);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inserted_badges_are_found_regardless_of_case() {
        insert("pd-filter-77");
        assert!(might_exist(" PD-FILTER-77 "));
        remove("PD-FILTER-77");
        assert!(!might_exist("PD-FILTER-77"));
    }
}
