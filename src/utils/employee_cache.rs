use anyhow::Result;
use futures_util::StreamExt;
use moka::future::Cache;
use once_cell::sync::Lazy;
use sqlx::MySqlPool;
use std::time::Duration;

/// Known employee ids. Only positives are stored; a miss falls through to the
/// database so freshly created employees are never wrongly dropped by
/// ingestion.
pub static EMPLOYEE_ID_CACHE: Lazy<Cache<u64, ()>> = Lazy::new(|| {
    Cache::builder()
        .max_capacity(100_000)
        .time_to_live(Duration::from_secs(86400)) // 24h TTL
        .build()
});

/// Record an employee id as existing.
pub async fn mark_known(employee_id: u64) {
    EMPLOYEE_ID_CACHE.insert(employee_id, ()).await;
}

/// Drop an id from the cache (employee deleted).
pub async fn forget(employee_id: u64) {
    EMPLOYEE_ID_CACHE.invalidate(&employee_id).await;
}

/// Existence check used by the ingestion engine before persisting a window.
/// Cache hit is a fast positive; on miss the database decides and a positive
/// answer repopulates the cache.
pub async fn is_known(pool: &MySqlPool, employee_id: u64) -> bool {
    if EMPLOYEE_ID_CACHE.get(&employee_id).await.is_some() {
        return true;
    }

    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM employees WHERE id = ? LIMIT 1)",
    )
    .bind(employee_id)
    .fetch_one(pool)
    .await
    .unwrap_or(false); // treat a failed lookup as unknown; the window is skipped, not lost forever

    if exists {
        mark_known(employee_id).await;
    }

    exists
}

/// Load all employee ids into the cache at startup (batched stream).
pub async fn warmup_employee_cache(pool: &MySqlPool, batch_size: usize) -> Result<()> {
    let mut stream = sqlx::query_scalar::<_, u64>("SELECT id FROM employees").fetch(pool);

    let mut batch = Vec::with_capacity(batch_size);
    let mut total_count = 0usize;

    while let Some(row) = stream.next().await {
        let id = row?;
        batch.push(id);
        total_count += 1;

        if batch.len() >= batch_size {
            for id in batch.drain(..) {
                EMPLOYEE_ID_CACHE.insert(id, ()).await;
            }
        }
    }

    for id in batch {
        EMPLOYEE_ID_CACHE.insert(id, ()).await;
    }

    log::info!("Employee id cache warmup complete: {} employees", total_count);

    Ok(())
}
