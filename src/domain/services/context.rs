use std::sync::Arc;
use chrono::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::domain::clock::Clock;
use crate::domain::models::attendee_context::AttendeeContext;
use crate::domain::models::booking::normalize_email;
use crate::domain::ports::{ContextCacheStore, EnrichmentService, SlotStore};
use crate::error::AppError;

const RECENT_TOPICS_LIMIT: i64 = 5;

/// Read-through snapshot cache for attendee rows in the dashboard.
///
/// Entries are immutable snapshots keyed by normalized email and considered
/// fresh for `ttl`. A cold key costs one enrichment call plus the local
/// history aggregates; concurrent requests for the same cold key may each
/// fetch once, which is tolerated duplicate work. Upstream calls run behind
/// a semaphore so a large batch cannot stampede the enrichment source.
pub struct AttendeeContextService {
    store: Arc<dyn SlotStore>,
    enrichment: Arc<dyn EnrichmentService>,
    cache: Arc<dyn ContextCacheStore>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    fanout: Arc<Semaphore>,
}

impl AttendeeContextService {
    pub fn new(
        store: Arc<dyn SlotStore>,
        enrichment: Arc<dyn EnrichmentService>,
        cache: Arc<dyn ContextCacheStore>,
        clock: Arc<dyn Clock>,
        ttl_secs: i64,
        fanout_limit: usize,
    ) -> Self {
        Self {
            store,
            enrichment,
            cache,
            clock,
            ttl: Duration::seconds(ttl_secs),
            fanout: Arc::new(Semaphore::new(fanout_limit.max(1))),
        }
    }

    pub async fn context_for(&self, emails: &[String]) -> Result<Vec<AttendeeContext>, AppError> {
        let mut keys: Vec<String> = Vec::new();
        for email in emails {
            let key = normalize_email(email);
            if !key.is_empty() && !keys.contains(&key) {
                keys.push(key);
            }
        }

        let mut set = JoinSet::new();
        for (idx, key) in keys.iter().enumerate() {
            let key = key.clone();
            let store = self.store.clone();
            let enrichment = self.enrichment.clone();
            let cache = self.cache.clone();
            let clock = self.clock.clone();
            let ttl = self.ttl;
            let fanout = self.fanout.clone();

            set.spawn(async move {
                let result = resolve_one(key, store, enrichment, cache, clock, ttl, fanout).await;
                (idx, result)
            });
        }

        let mut resolved: Vec<Option<AttendeeContext>> = vec![None; keys.len()];
        while let Some(joined) = set.join_next().await {
            let (idx, result) = joined.map_err(|_| AppError::Internal)?;
            resolved[idx] = Some(result?);
        }

        Ok(resolved.into_iter().flatten().collect())
    }

    pub async fn invalidate(&self, email: &str) {
        self.cache.invalidate(&normalize_email(email)).await;
    }
}

async fn resolve_one(
    key: String,
    store: Arc<dyn SlotStore>,
    enrichment: Arc<dyn EnrichmentService>,
    cache: Arc<dyn ContextCacheStore>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    fanout: Arc<Semaphore>,
) -> Result<AttendeeContext, AppError> {
    if let Some(cached) = cache.get(&key).await {
        if clock.now_utc() - cached.fetched_at < ttl {
            debug!(email = %key, "Attendee context cache hit");
            return Ok(cached);
        }
        debug!(email = %key, "Attendee context cache entry expired");
    }

    let (profile, cacheable) = {
        let _permit = fanout.clone().acquire_owned().await.map_err(|_| AppError::Internal)?;
        match enrichment.lookup(&key).await {
            // Ok(None) is a real answer (unknown person) and is cached;
            // transient upstream failures degrade to an unenriched snapshot
            // and are not cached, so the next expand retries.
            Ok(profile) => (profile, true),
            Err(e) => {
                warn!(email = %key, "Enrichment lookup failed: {:?}", e);
                (None, false)
            }
        }
    };

    let history = store.attendee_history(&key, RECENT_TOPICS_LIMIT).await?;

    let ctx = AttendeeContext {
        email: key.clone(),
        profile,
        history,
        fetched_at: clock.now_utc(),
    };

    if cacheable {
        cache.put(&key, ctx.clone()).await;
    }
    Ok(ctx)
}
