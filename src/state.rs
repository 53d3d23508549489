use std::sync::Arc;

use mockable::Clock;

use crate::config::AppConfig;
use crate::db::BookingStore;
use crate::services::availability::AvailabilityService;
use crate::services::booking::BookingService;
use crate::services::reports::ReportService;

pub struct AppState {
    pub config: AppConfig,
    pub availability: AvailabilityService,
    pub bookings: BookingService,
    pub reports: ReportService,
}

impl AppState {
    /// Wires every service onto one store and one clock.
    pub fn new(config: AppConfig, store: Arc<dyn BookingStore>, clock: Arc<dyn Clock>) -> Self {
        let availability = AvailabilityService::new(store.clone(), clock.clone());
        let bookings = BookingService::new(
            store.clone(),
            availability.clone(),
            clock,
            config.transitions.clone(),
        );
        let reports = ReportService::new(store);

        Self {
            config,
            availability,
            bookings,
            reports,
        }
    }
}
