use std::env;

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub sink_url: String,
    pub sink_token: String,
    pub enrichment_url: String,
    pub enrichment_token: String,
    pub context_cache_ttl_secs: i64,
    pub enrichment_concurrency: usize,
    pub dispatch_interval_secs: u64,
    pub dispatch_batch_size: i64,
    pub dispatch_max_attempts: i64,
    pub dispatch_retry_delay_secs: i64,
    pub promotion_sweep_every: u64,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            port: env::var("PORT").unwrap_or_else(|_| "3000".to_string()).parse().expect("PORT must be a number"),
            sink_url: env::var("SINK_URL").unwrap_or_else(|_| "http://localhost:8000/api/v1/intents".to_string()),
            sink_token: env::var("SINK_TOKEN").unwrap_or_else(|_| "test-token-1".to_string()),
            enrichment_url: env::var("ENRICHMENT_URL").unwrap_or_else(|_| "http://localhost:8100/api/v1/people".to_string()),
            enrichment_token: env::var("ENRICHMENT_TOKEN").unwrap_or_default(),
            context_cache_ttl_secs: env::var("CONTEXT_CACHE_TTL_SECS").ok().and_then(|s| s.parse().ok()).unwrap_or(600),
            enrichment_concurrency: env::var("ENRICHMENT_CONCURRENCY").ok().and_then(|s| s.parse().ok()).unwrap_or(5),
            dispatch_interval_secs: env::var("DISPATCH_INTERVAL_SECS").ok().and_then(|s| s.parse().ok()).unwrap_or(5),
            dispatch_batch_size: env::var("DISPATCH_BATCH_SIZE").ok().and_then(|s| s.parse().ok()).unwrap_or(10),
            dispatch_max_attempts: env::var("DISPATCH_MAX_ATTEMPTS").ok().and_then(|s| s.parse().ok()).unwrap_or(5),
            dispatch_retry_delay_secs: env::var("DISPATCH_RETRY_DELAY_SECS").ok().and_then(|s| s.parse().ok()).unwrap_or(30),
            promotion_sweep_every: env::var("PROMOTION_SWEEP_EVERY").ok().and_then(|s| s.parse().ok()).unwrap_or(12),
        }
    }
}
