use std::env;
use std::sync::Arc;

use crate::{store::AppointmentStore, sync::SyncController};

#[derive(Clone)]
pub struct AppState {
    pub store: AppointmentStore,
    pub controller: Arc<SyncController>,
    pub hours: BusinessHours,
}

/// Wall-clock bounds of the bookable day, local to the salon.
#[derive(Clone, Copy, Debug)]
pub struct BusinessHours {
    pub opening_hour: u32,
    pub closing_hour: u32,
}

impl BusinessHours {
    pub fn from_env() -> Self {
        let opening_hour = env::var("OPENING_HOUR")
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or(9);
        let closing_hour = env::var("CLOSING_HOUR")
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or(20);
        Self {
            opening_hour,
            closing_hour,
        }
    }
}
