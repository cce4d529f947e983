use serde::Deserialize;

use crate::{
    error::{AppError, Result},
    models::{AppointmentRow, AppointmentStatus, PaymentStatus, ServiceRow},
    slots::slots_for_duration,
    state::AppState,
};

/// A candidate booking as submitted by a client of the engine.
#[derive(Debug, Clone, Deserialize)]
pub struct BookingRequest {
    pub client_name: String,
    #[serde(default)]
    pub client_phone: Option<String>,
    pub service_id: String,
    pub barber_id: String,
    pub appointment_date: String,
    pub appointment_time: String,
}

/// A fully populated appointment ready to be written. Only `validate`
/// produces drafts, so every stored appointment starts upcoming/pending
/// with its slot count and amount fixed at creation time.
#[derive(Debug, Clone)]
pub struct AppointmentDraft {
    pub client_name: String,
    pub client_phone: Option<String>,
    pub service_id: String,
    pub barber_id: String,
    pub appointment_date: String,
    pub appointment_time: String,
    pub total_slots: i64,
    pub amount: f64,
    pub status: AppointmentStatus,
    pub payment_status: PaymentStatus,
}

/// Check a booking request against the known service catalog and turn it
/// into a draft. Fails before anything touches the store.
pub fn validate(request: &BookingRequest, services: &[ServiceRow]) -> Result<AppointmentDraft> {
    let client_name = request.client_name.trim();
    if client_name.is_empty() {
        return Err(AppError::Validation("client name is required".to_string()));
    }
    let service_id = request.service_id.trim();
    if service_id.is_empty() {
        return Err(AppError::Validation("service is required".to_string()));
    }
    let barber_id = request.barber_id.trim();
    if barber_id.is_empty() {
        return Err(AppError::Validation("barber is required".to_string()));
    }

    let service = services
        .iter()
        .find(|service| service.id == service_id)
        .ok_or_else(|| AppError::UnknownService(service_id.to_string()))?;

    let client_phone = request
        .client_phone
        .as_deref()
        .map(str::trim)
        .filter(|phone| !phone.is_empty())
        .map(String::from);

    Ok(AppointmentDraft {
        client_name: client_name.to_string(),
        client_phone,
        service_id: service.id.clone(),
        barber_id: barber_id.to_string(),
        appointment_date: request.appointment_date.trim().to_string(),
        appointment_time: request.appointment_time.trim().to_string(),
        total_slots: slots_for_duration(service.duration_minutes),
        amount: service.price,
        status: AppointmentStatus::Upcoming,
        payment_status: PaymentStatus::Pending,
    })
}

/// Booking flow: validate against the current snapshot, persist, then
/// refresh the snapshot before reporting success.
pub async fn create_appointment(
    state: &AppState,
    request: BookingRequest,
) -> Result<AppointmentRow> {
    let services = state.controller.services().await;
    let draft = validate(&request, &services)?;
    let row = state.store.insert_appointment(&draft).await?;
    log::info!("Appointment {} booked for {}", row.id, row.client_name);
    reload_after_write(state).await;
    Ok(row)
}

/// Persist an operator-chosen fulfillment status. Any state may follow any
/// other; the operator, not the engine, is the authority on transitions.
pub async fn set_status(
    state: &AppState,
    appointment_id: &str,
    status: AppointmentStatus,
) -> Result<()> {
    state.store.update_status(appointment_id, status).await?;
    log::info!("Appointment {appointment_id} status set to {status}");
    reload_after_write(state).await;
    Ok(())
}

pub async fn set_payment(
    state: &AppState,
    appointment_id: &str,
    payment_status: PaymentStatus,
) -> Result<()> {
    state
        .store
        .update_payment(appointment_id, payment_status)
        .await?;
    log::info!("Appointment {appointment_id} payment set to {payment_status}");
    reload_after_write(state).await;
    Ok(())
}

// The write has already committed; a failed refresh keeps the last-known-good
// snapshot and the change-feed subscriber will retry on the next notification.
async fn reload_after_write(state: &AppState) {
    if let Err(err) = state.controller.load().await {
        log::warn!("Snapshot reload after write failed: {err}");
    }
}
