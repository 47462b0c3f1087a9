use std::collections::VecDeque;

use sqlx::PgPool;
use tokio::sync::Mutex;

use pitboss_core::{constants::MAX_LIST_PAGE_SIZE, PlatformError};

use crate::model::{RemoteAccessActivity, RemoteAccessActivityInput};

struct MirrorState {
    entries: VecDeque<RemoteAccessActivity>,
    capacity: usize,
}

/// Persists and mirrors remote-access admission decisions (§4.6). The
/// mirror is a bounded ring buffer — further in-memory appends past
/// `capacity` evict the oldest entry and the store surfaces a "log capacity
/// exceeded" signal to the caller (the guard logs this, it does not deny
/// the underlying request on its own).
pub struct RemoteAccessStore {
    pool: Option<PgPool>,
    mirror: Mutex<MirrorState>,
    disable_in_memory_cache: bool,
    next_id: Mutex<i64>,
}

pub struct AppendOutcome {
    pub activity: RemoteAccessActivity,
    pub capacity_exceeded: bool,
}

impl RemoteAccessStore {
    pub fn new(pool: Option<PgPool>, capacity: usize, disable_in_memory_cache: bool) -> Self {
        Self {
            pool,
            mirror: Mutex::new(MirrorState { entries: VecDeque::new(), capacity }),
            disable_in_memory_cache,
            next_id: Mutex::new(1),
        }
    }

    async fn persist(&self, activity: &RemoteAccessActivity) -> Result<(), PlatformError> {
        let Some(pool) = &self.pool else { return Ok(()) };
        sqlx::query(
            r#"INSERT INTO remote_access_activity (ts, source_ip, source_port, destination, destination_port, path, method, allowed, reason)
               VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9)"#,
        )
        .bind(activity.ts)
        .bind(&activity.source_ip)
        .bind(activity.source_port)
        .bind(&activity.destination)
        .bind(activity.destination_port)
        .bind(&activity.path)
        .bind(&activity.method)
        .bind(activity.allowed)
        .bind(&activity.reason)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Appends a decision. Fails only if persistence is configured and the
    /// write fails — callers in fail-closed mode map that to HTTP 503.
    pub async fn append(&self, input: RemoteAccessActivityInput) -> Result<AppendOutcome, PlatformError> {
        let activity = {
            let mut id = self.next_id.lock().await;
            let assigned = *id;
            *id += 1;
            RemoteAccessActivity {
                id: assigned,
                ts: input.ts,
                source_ip: input.source_ip,
                source_port: input.source_port,
                destination: input.destination,
                destination_port: input.destination_port,
                path: input.path,
                method: input.method,
                allowed: input.allowed,
                reason: input.reason,
            }
        };

        self.persist(&activity).await?;

        let mut capacity_exceeded = false;
        if !self.disable_in_memory_cache {
            let mut state = self.mirror.lock().await;
            let cap = state.capacity;
            state.entries.push_front(activity.clone());
            while state.entries.len() > cap {
                state.entries.pop_back();
                capacity_exceeded = true;
            }
        }

        Ok(AppendOutcome { activity, capacity_exceeded })
    }

    /// Reverse-chronological listing. Under `disable_in_memory_cache`
    /// (or fail-closed with no pool), reads go to persistence; outside
    /// fail-closed mode an unavailable pool falls back to the mirror.
    pub async fn list(&self, page_size: i64, offset: i64, fail_closed: bool) -> Result<Vec<RemoteAccessActivity>, PlatformError> {
        let clamped = page_size.clamp(1, MAX_LIST_PAGE_SIZE);

        if self.disable_in_memory_cache || self.pool.is_none() {
            let Some(pool) = &self.pool else {
                return if self.disable_in_memory_cache || fail_closed {
                    Err(PlatformError::PersistenceUnavailable)
                } else {
                    Ok(self.mirror_page(clamped, offset).await)
                };
            };
            let rows: Vec<RemoteAccessActivity> = sqlx::query_as(
                r#"SELECT id, ts, source_ip, source_port, destination, destination_port, path, method, allowed, reason
                   FROM remote_access_activity ORDER BY ts DESC, id DESC LIMIT $1 OFFSET $2"#,
            )
            .bind(clamped)
            .bind(offset)
            .fetch_all(pool)
            .await?;
            return Ok(rows);
        }

        Ok(self.mirror_page(clamped, offset).await)
    }

    async fn mirror_page(&self, page_size: i64, offset: i64) -> Vec<RemoteAccessActivity> {
        let state = self.mirror.lock().await;
        state.entries.iter().skip(offset.max(0) as usize).take(page_size as usize).cloned().collect()
    }
}
