pub mod sqlite_slot_store;
pub mod sqlite_event_repo;
pub mod sqlite_side_effect_repo;

pub mod postgres_slot_store;
pub mod postgres_event_repo;
pub mod postgres_side_effect_repo;
