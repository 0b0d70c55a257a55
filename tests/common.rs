use slot_engine::{
    api::router::create_router,
    state::AppState,
    config::Config,
    domain::clock::{Clock, SystemClock},
    domain::models::attendee_context::EnrichmentProfile,
    domain::models::side_effect::SideEffect,
    domain::ports::{EnrichmentService, IntentSink},
    domain::services::allocator::CapacityAllocator,
    domain::services::attendance::AttendanceService,
    domain::services::context::AttendeeContextService,
    domain::services::dispatcher::SideEffectDispatcher,
    domain::services::promoter::WaitlistPromoter,
    infra::cache::in_memory_context_store::InMemoryContextStore,
    infra::repositories::{
        sqlite_event_repo::SqliteEventRepo,
        sqlite_side_effect_repo::SqliteSideEffectRepo,
        sqlite_slot_store::SqliteSlotStore,
    },
    error::AppError,
};
use sqlx::{sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions}, Pool, Sqlite};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;
use axum::{
    body::Body,
    http::Request,
    Router,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use tower::ServiceExt;

pub struct MockIntentSink {
    pub fail: AtomicBool,
    pub delivered: Mutex<Vec<String>>,
}

impl MockIntentSink {
    pub fn new() -> Self {
        Self { fail: AtomicBool::new(false), delivered: Mutex::new(Vec::new()) }
    }

    pub fn set_failing(&self, failing: bool) {
        self.fail.store(failing, Ordering::SeqCst);
    }

    pub fn delivered_ids(&self) -> Vec<String> {
        self.delivered.lock().unwrap().clone()
    }
}

#[async_trait]
impl IntentSink for MockIntentSink {
    async fn deliver(&self, intent: &SideEffect) -> Result<(), AppError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(AppError::InternalWithMsg("sink unavailable".to_string()));
        }
        self.delivered.lock().unwrap().push(intent.id.clone());
        Ok(())
    }
}

pub struct MockEnrichmentService {
    pub calls: AtomicUsize,
    in_flight: AtomicI64,
    pub max_in_flight: AtomicI64,
}

impl MockEnrichmentService {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            in_flight: AtomicI64::new(0),
            max_in_flight: AtomicI64::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_concurrent(&self) -> i64 {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EnrichmentService for MockEnrichmentService {
    async fn lookup(&self, email: &str) -> Result<Option<EnrichmentProfile>, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        // hold the permit long enough for overlap to be observable
        tokio::time::sleep(Duration::from_millis(25)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        Ok(Some(EnrichmentProfile {
            display_name: Some(format!("Person <{}>", email)),
            company: Some("Acme".to_string()),
            title: None,
        }))
    }
}

#[allow(dead_code)]
pub struct TestApp {
    pub router: Router,
    pub pool: Pool<Sqlite>,
    pub db_filename: String,
    pub state: Arc<AppState>,
    pub sink: Arc<MockIntentSink>,
    pub enrichment: Arc<MockEnrichmentService>,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock)).await
    }

    pub async fn with_clock(clock: Arc<dyn Clock>) -> Self {
        let db_filename = format!("test_{}.db", Uuid::new_v4());
        let db_url = format!("sqlite://{}?mode=rwc", db_filename);

        let connection_options = SqliteConnectOptions::from_str(&db_url)
            .unwrap()
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .connect_with(connection_options)
            .await
            .expect("Failed to connect to test db");

        sqlx::migrate!("./migrations/sqlite")
            .run(&pool)
            .await
            .expect("Failed to migrate test db");

        let config = Config {
            database_url: db_url.clone(),
            port: 0,
            sink_url: "http://localhost".to_string(),
            sink_token: "token".to_string(),
            enrichment_url: "http://localhost".to_string(),
            enrichment_token: String::new(),
            context_cache_ttl_secs: 600,
            enrichment_concurrency: 3,
            dispatch_interval_secs: 1,
            dispatch_batch_size: 10,
            dispatch_max_attempts: 3,
            dispatch_retry_delay_secs: 0,
            promotion_sweep_every: 0,
        };

        let event_repo = Arc::new(SqliteEventRepo::new(pool.clone()));
        let slot_store = Arc::new(SqliteSlotStore::new(pool.clone()));
        let side_effect_repo = Arc::new(SqliteSideEffectRepo::new(pool.clone()));

        let sink = Arc::new(MockIntentSink::new());
        let enrichment = Arc::new(MockEnrichmentService::new());
        let cache = Arc::new(InMemoryContextStore::new());

        let allocator = Arc::new(CapacityAllocator::new(slot_store.clone()));
        let promoter = Arc::new(WaitlistPromoter::new(slot_store.clone()));
        let attendance = Arc::new(AttendanceService::new(slot_store.clone(), clock.clone()));
        let dispatcher = Arc::new(SideEffectDispatcher::new(
            side_effect_repo.clone(),
            sink.clone(),
            clock.clone(),
            config.dispatch_max_attempts,
            config.dispatch_retry_delay_secs,
        ));
        let context = Arc::new(AttendeeContextService::new(
            slot_store.clone(),
            enrichment.clone(),
            cache,
            clock,
            config.context_cache_ttl_secs,
            config.enrichment_concurrency,
        ));

        let state = Arc::new(AppState {
            config,
            event_repo,
            slot_store,
            side_effect_repo,
            allocator,
            promoter,
            attendance,
            dispatcher,
            context,
        });

        let router = create_router(state.clone());

        Self {
            router,
            pool,
            db_filename,
            state,
            sink,
            enrichment,
        }
    }

    pub async fn post(&self, uri: &str, body: Value) -> axum::response::Response {
        self.router.clone().oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap()
        ).await.unwrap()
    }

    pub async fn put(&self, uri: &str, body: Value) -> axum::response::Response {
        self.router.clone().oneshot(
            Request::builder()
                .method("PUT")
                .uri(uri)
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap()
        ).await.unwrap()
    }

    pub async fn get(&self, uri: &str) -> axum::response::Response {
        self.router.clone().oneshot(
            Request::builder()
                .method("GET")
                .uri(uri)
                .body(Body::empty())
                .unwrap()
        ).await.unwrap()
    }

    pub async fn create_event(&self, title: &str) -> String {
        let res = self.post("/api/v1/events", json!({ "title": title })).await;
        assert!(res.status().is_success(), "create_event failed: {}", res.status());
        parse_body(res).await["id"].as_str().unwrap().to_string()
    }

    pub async fn create_slot(&self, event_id: &str, start: DateTime<Utc>, end: DateTime<Utc>, capacity: i64) -> String {
        let res = self.post(
            &format!("/api/v1/events/{}/slots", event_id),
            json!({
                "start_time": start.to_rfc3339(),
                "end_time": end.to_rfc3339(),
                "capacity": capacity
            }),
        ).await;
        assert!(res.status().is_success(), "create_slot failed: {}", res.status());
        parse_body(res).await["id"].as_str().unwrap().to_string()
    }

    pub async fn book(&self, slot_id: &str, name: &str, email: &str) -> axum::response::Response {
        self.post(
            &format!("/api/v1/slots/{}/bookings", slot_id),
            json!({ "name": name, "email": email }),
        ).await
    }

    pub async fn import_booking(&self, slot_id: &str, name: &str, email: &str) -> axum::response::Response {
        self.post(
            &format!("/api/v1/slots/{}/bookings/import", slot_id),
            json!({ "name": name, "email": email }),
        ).await
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.db_filename);
        let _ = std::fs::remove_file(format!("{}-wal", self.db_filename));
        let _ = std::fs::remove_file(format!("{}-shm", self.db_filename));
    }
}

pub async fn parse_body(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
