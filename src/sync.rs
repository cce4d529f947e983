use std::sync::Arc;

use serde::Deserialize;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use crate::{
    error::Result,
    models::{AppointmentRow, BarberRow, ServiceRow},
    store::AppointmentStore,
};

/// Complete in-memory copy of the appointment view at a point in time.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub appointments: Vec<AppointmentRow>,
    pub barbers: Vec<BarberRow>,
    pub services: Vec<ServiceRow>,
}

/// Conjunction of view criteria. Empty or `"all"` dimensions match
/// everything, so the default filter returns the snapshot unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppointmentFilter {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub barber_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub service: Option<String>,
}

impl AppointmentFilter {
    pub fn matches(&self, appointment: &AppointmentRow) -> bool {
        if let Some(search) = active(&self.search) {
            if !appointment
                .client_name
                .to_lowercase()
                .contains(&search.to_lowercase())
            {
                return false;
            }
        }
        if let Some(barber_id) = active(&self.barber_id) {
            if appointment.barber_id != barber_id {
                return false;
            }
        }
        if let Some(status) = active(&self.status) {
            if appointment.status != status {
                return false;
            }
        }
        if let Some(service) = active(&self.service) {
            if appointment.service_name.as_deref() != Some(service) {
                return false;
            }
        }
        true
    }
}

fn active(criterion: &Option<String>) -> Option<&str> {
    criterion
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty() && *value != "all")
}

/// Keeps the snapshot consistent with the store: full reloads on demand and
/// on every change notification, never incremental patches.
pub struct SyncController {
    store: AppointmentStore,
    snapshot: Arc<RwLock<Snapshot>>,
}

/// Live change-feed subscription. Shut down (or drop) exactly one of these
/// per controller when tearing down, otherwise the reload task leaks.
pub struct ChangeFeed {
    task: JoinHandle<()>,
}

impl ChangeFeed {
    pub fn shutdown(self) {
        self.task.abort();
    }
}

impl Drop for ChangeFeed {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl SyncController {
    pub fn new(store: AppointmentStore) -> Self {
        Self {
            store,
            snapshot: Arc::new(RwLock::new(Snapshot::default())),
        }
    }

    /// Read all three entities and swap the snapshot in one step. The swap
    /// only happens after every read succeeded, so a store failure leaves
    /// the previous snapshot fully intact.
    pub async fn load(&self) -> Result<()> {
        Self::refresh(&self.store, &self.snapshot).await
    }

    async fn refresh(store: &AppointmentStore, snapshot: &Arc<RwLock<Snapshot>>) -> Result<()> {
        let appointments = store.list_appointments().await?;
        let barbers = store.list_barbers().await?;
        let services = store.list_services().await?;

        let mut guard = snapshot.write().await;
        *guard = Snapshot {
            appointments,
            barbers,
            services,
        };
        Ok(())
    }

    /// Start reacting to change notifications. Every event, whatever its
    /// kind, triggers an unconditional full reload.
    pub fn subscribe(&self) -> ChangeFeed {
        let mut rx = self.store.subscribe_changes();
        let store = self.store.clone();
        let snapshot = Arc::clone(&self.snapshot);

        let task = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(_) | Err(RecvError::Lagged(_)) => {
                        if let Err(err) = Self::refresh(&store, &snapshot).await {
                            log::warn!("Reload after change notification failed: {err}");
                        }
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });

        ChangeFeed { task }
    }

    pub async fn appointments(&self) -> Vec<AppointmentRow> {
        self.snapshot.read().await.appointments.clone()
    }

    pub async fn barbers(&self) -> Vec<BarberRow> {
        self.snapshot.read().await.barbers.clone()
    }

    pub async fn services(&self) -> Vec<ServiceRow> {
        self.snapshot.read().await.services.clone()
    }

    /// Appointments matching the filter, in snapshot order. Pure over
    /// (snapshot, filter); the snapshot itself is never touched.
    pub async fn filtered(&self, filter: &AppointmentFilter) -> Vec<AppointmentRow> {
        self.snapshot
            .read()
            .await
            .appointments
            .iter()
            .filter(|appointment| filter.matches(appointment))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::booking::AppointmentDraft;
    use crate::db;
    use crate::models::{AppointmentStatus, PaymentStatus};

    fn appointment(client: &str, barber_id: &str, status: &str, service: &str) -> AppointmentRow {
        AppointmentRow {
            id: format!("apt-{client}"),
            client_name: client.to_string(),
            client_phone: None,
            service_id: format!("svc-{service}"),
            barber_id: barber_id.to_string(),
            appointment_date: "2026-08-10".to_string(),
            appointment_time: "10:00".to_string(),
            total_slots: 1,
            amount: 450.0,
            status: status.to_string(),
            payment_status: "pending".to_string(),
            created_at: "2026-08-01T00:00:00Z".to_string(),
            service_name: Some(service.to_string()),
            service_price: Some(450.0),
            barber_name: Some(barber_id.to_string()),
        }
    }

    fn draft(client: &str) -> AppointmentDraft {
        AppointmentDraft {
            client_name: client.to_string(),
            client_phone: None,
            service_id: "svc-cut".to_string(),
            barber_id: "brb-aman".to_string(),
            appointment_date: "2026-08-10".to_string(),
            appointment_time: "10:00".to_string(),
            total_slots: 1,
            amount: 450.0,
            status: AppointmentStatus::Upcoming,
            payment_status: PaymentStatus::Pending,
        }
    }

    #[test]
    fn default_filter_returns_everything_in_order() {
        let rows = vec![
            appointment("A", "B1", "upcoming", "Signature Cut"),
            appointment("Z", "B2", "completed", "Full Grooming"),
        ];
        let filter = AppointmentFilter::default();
        let kept: Vec<_> = rows.iter().filter(|r| filter.matches(r)).collect();
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].client_name, "A");
        assert_eq!(kept[1].client_name, "Z");

        let all = AppointmentFilter {
            search: Some(String::new()),
            barber_id: Some("all".to_string()),
            status: Some("all".to_string()),
            service: Some("all".to_string()),
        };
        assert_eq!(rows.iter().filter(|r| all.matches(r)).count(), 2);
    }

    #[test]
    fn search_is_a_case_insensitive_substring_match() {
        let rows = vec![
            appointment("A", "B1", "upcoming", "Signature Cut"),
            appointment("Z", "B2", "completed", "Full Grooming"),
        ];
        let filter = AppointmentFilter {
            search: Some("a".to_string()),
            ..Default::default()
        };
        let kept: Vec<_> = rows.iter().filter(|r| filter.matches(r)).collect();
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].client_name, "A");
    }

    #[test]
    fn status_barber_and_service_criteria_are_conjunctive() {
        let rows = vec![
            appointment("A", "B1", "upcoming", "Signature Cut"),
            appointment("Z", "B2", "completed", "Full Grooming"),
        ];

        let by_status = AppointmentFilter {
            status: Some("completed".to_string()),
            ..Default::default()
        };
        let kept: Vec<_> = rows.iter().filter(|r| by_status.matches(r)).collect();
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].client_name, "Z");

        let by_barber = AppointmentFilter {
            barber_id: Some("B1".to_string()),
            ..Default::default()
        };
        assert_eq!(rows.iter().filter(|r| by_barber.matches(r)).count(), 1);

        let by_service = AppointmentFilter {
            service: Some("Full Grooming".to_string()),
            ..Default::default()
        };
        let kept: Vec<_> = rows.iter().filter(|r| by_service.matches(r)).collect();
        assert_eq!(kept[0].client_name, "Z");

        let contradiction = AppointmentFilter {
            barber_id: Some("B1".to_string()),
            status: Some("completed".to_string()),
            ..Default::default()
        };
        assert_eq!(rows.iter().filter(|r| contradiction.matches(r)).count(), 0);
    }

    #[test]
    fn filtering_is_deterministic() {
        let rows = vec![
            appointment("A", "B1", "upcoming", "Signature Cut"),
            appointment("Z", "B2", "completed", "Full Grooming"),
        ];
        let filter = AppointmentFilter {
            search: Some("a".to_string()),
            ..Default::default()
        };
        let first: Vec<_> = rows.iter().filter(|r| filter.matches(r)).collect();
        let second: Vec<_> = rows.iter().filter(|r| filter.matches(r)).collect();
        assert_eq!(first.len(), second.len());
        assert!(first
            .iter()
            .zip(second.iter())
            .all(|(a, b)| a.id == b.id));
    }

    #[tokio::test]
    async fn load_populates_all_three_entities() {
        let pool = db::memory_pool().await;
        db::seed_reference_fixture(&pool).await;
        let store = AppointmentStore::new(pool);
        store.insert_appointment(&draft("Priya Nair")).await.unwrap();

        let controller = SyncController::new(store);
        controller.load().await.unwrap();

        assert_eq!(controller.appointments().await.len(), 1);
        assert_eq!(controller.barbers().await.len(), 3);
        assert_eq!(controller.services().await.len(), 3);
    }

    #[tokio::test]
    async fn failed_load_keeps_the_previous_snapshot() {
        let pool = db::memory_pool().await;
        db::seed_reference_fixture(&pool).await;
        let store = AppointmentStore::new(pool.clone());
        store.insert_appointment(&draft("Priya Nair")).await.unwrap();

        let controller = SyncController::new(store);
        controller.load().await.unwrap();
        assert_eq!(controller.appointments().await.len(), 1);

        pool.close().await;
        assert!(controller.load().await.is_err());
        assert_eq!(controller.appointments().await.len(), 1);
        assert_eq!(controller.barbers().await.len(), 3);
    }

    #[tokio::test]
    async fn change_notification_triggers_a_reload() {
        let pool = db::memory_pool().await;
        db::seed_reference_fixture(&pool).await;
        let store = AppointmentStore::new(pool);
        let controller = SyncController::new(store.clone());
        controller.load().await.unwrap();
        let feed = controller.subscribe();

        store.insert_appointment(&draft("Priya Nair")).await.unwrap();

        let mut reloaded = false;
        for _ in 0..100 {
            if controller.appointments().await.len() == 1 {
                reloaded = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        feed.shutdown();
        assert!(reloaded, "snapshot never caught up with the change feed");
    }

    #[tokio::test]
    async fn filtered_view_reads_the_live_snapshot() {
        let pool = db::memory_pool().await;
        db::seed_reference_fixture(&pool).await;
        let store = AppointmentStore::new(pool);
        store.insert_appointment(&draft("Priya Nair")).await.unwrap();
        let mut other = draft("Dev Patel");
        other.barber_id = "brb-sana".to_string();
        store.insert_appointment(&other).await.unwrap();

        let controller = SyncController::new(store);
        controller.load().await.unwrap();

        let filter = AppointmentFilter {
            barber_id: Some("brb-sana".to_string()),
            ..Default::default()
        };
        let matches = controller.filtered(&filter).await;
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].client_name, "Dev Patel");

        assert_eq!(
            controller.filtered(&AppointmentFilter::default()).await.len(),
            2
        );
    }
}
