use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use sqlx::{postgres::{PgPoolOptions, PgConnectOptions}, sqlite::{SqlitePoolOptions, SqliteJournalMode, SqliteConnectOptions}};
use sqlx::{PgPool, SqlitePool, ConnectOptions};
use tracing::info;
use tracing::log::LevelFilter;

use crate::config::Config;
use crate::domain::clock::{Clock, SystemClock};
use crate::domain::ports::{EventRepository, SideEffectRepository, SlotStore};
use crate::domain::services::allocator::CapacityAllocator;
use crate::domain::services::attendance::AttendanceService;
use crate::domain::services::context::AttendeeContextService;
use crate::domain::services::dispatcher::SideEffectDispatcher;
use crate::domain::services::promoter::WaitlistPromoter;
use crate::infra::cache::in_memory_context_store::InMemoryContextStore;
use crate::infra::enrichment::http_enrichment_service::HttpEnrichmentService;
use crate::infra::repositories::{
    postgres_event_repo::PostgresEventRepo, postgres_side_effect_repo::PostgresSideEffectRepo,
    postgres_slot_store::PostgresSlotStore,
    sqlite_event_repo::SqliteEventRepo, sqlite_side_effect_repo::SqliteSideEffectRepo,
    sqlite_slot_store::SqliteSlotStore,
};
use crate::infra::sink::http_intent_sink::HttpIntentSink;
use crate::state::AppState;

pub async fn bootstrap_state(config: &Config) -> AppState {
    let database_url = &config.database_url;

    if database_url.starts_with("postgres://") || database_url.starts_with("postgresql://") {
        info!("Initializing PostgreSQL connection...");

        let mut opts: PgConnectOptions = database_url.parse().expect("Invalid Postgres URL");
        opts = opts.log_statements(LevelFilter::Debug)
            .log_slow_statements(LevelFilter::Warn, Duration::from_millis(500));

        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect_with(opts)
            .await
            .expect("Failed to connect to Postgres");

        run_postgres_migrations(&pool).await;

        wire_state(
            config,
            Arc::new(PostgresEventRepo::new(pool.clone())),
            Arc::new(PostgresSlotStore::new(pool.clone())),
            Arc::new(PostgresSideEffectRepo::new(pool.clone())),
        )
    } else {
        info!("Initializing SQLite connection with WAL Mode...");

        let opts = SqliteConnectOptions::from_str(database_url)
            .expect("Invalid SQLite connection string")
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5))
            .log_statements(LevelFilter::Debug)
            .log_slow_statements(LevelFilter::Warn, Duration::from_millis(500));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(opts)
            .await
            .expect("Failed to connect to SQLite");

        run_sqlite_migrations(&pool).await;

        wire_state(
            config,
            Arc::new(SqliteEventRepo::new(pool.clone())),
            Arc::new(SqliteSlotStore::new(pool.clone())),
            Arc::new(SqliteSideEffectRepo::new(pool.clone())),
        )
    }
}

fn wire_state(
    config: &Config,
    event_repo: Arc<dyn EventRepository>,
    slot_store: Arc<dyn SlotStore>,
    side_effect_repo: Arc<dyn SideEffectRepository>,
) -> AppState {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let sink = Arc::new(HttpIntentSink::new(
        config.sink_url.clone(),
        config.sink_token.clone(),
    ));
    let enrichment = Arc::new(HttpEnrichmentService::new(
        config.enrichment_url.clone(),
        config.enrichment_token.clone(),
    ));
    let cache = Arc::new(InMemoryContextStore::new());

    let allocator = Arc::new(CapacityAllocator::new(slot_store.clone()));
    let promoter = Arc::new(WaitlistPromoter::new(slot_store.clone()));
    let attendance = Arc::new(AttendanceService::new(slot_store.clone(), clock.clone()));
    let dispatcher = Arc::new(SideEffectDispatcher::new(
        side_effect_repo.clone(),
        sink,
        clock.clone(),
        config.dispatch_max_attempts,
        config.dispatch_retry_delay_secs,
    ));
    let context = Arc::new(AttendeeContextService::new(
        slot_store.clone(),
        enrichment,
        cache,
        clock,
        config.context_cache_ttl_secs,
        config.enrichment_concurrency,
    ));

    AppState {
        config: config.clone(),
        event_repo,
        slot_store,
        side_effect_repo,
        allocator,
        promoter,
        attendance,
        dispatcher,
        context,
    }
}

async fn run_postgres_migrations(pool: &PgPool) {
    sqlx::migrate!("./migrations/postgres")
        .run(pool)
        .await
        .expect("Failed to run Postgres migrations");
}

async fn run_sqlite_migrations(pool: &SqlitePool) {
    sqlx::migrate!("./migrations/sqlite")
        .run(pool)
        .await
        .expect("Failed to run SQLite migrations");
}
