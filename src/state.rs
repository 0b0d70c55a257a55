use std::sync::Arc;
use crate::config::Config;
use crate::domain::ports::{EventRepository, SideEffectRepository, SlotStore};
use crate::domain::services::allocator::CapacityAllocator;
use crate::domain::services::attendance::AttendanceService;
use crate::domain::services::context::AttendeeContextService;
use crate::domain::services::dispatcher::SideEffectDispatcher;
use crate::domain::services::promoter::WaitlistPromoter;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub event_repo: Arc<dyn EventRepository>,
    pub slot_store: Arc<dyn SlotStore>,
    pub side_effect_repo: Arc<dyn SideEffectRepository>,
    pub allocator: Arc<CapacityAllocator>,
    pub promoter: Arc<WaitlistPromoter>,
    pub attendance: Arc<AttendanceService>,
    pub dispatcher: Arc<SideEffectDispatcher>,
    pub context: Arc<AttendeeContextService>,
}
