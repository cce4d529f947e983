use serde::Serialize;
use sqlx::SqlitePool;
use tokio::sync::broadcast;

use crate::{
    booking::AppointmentDraft,
    db::new_id,
    models::{AppointmentRow, AppointmentStatus, BarberRow, PaymentStatus, ServiceRow},
};

/// What kind of committed write a change notification refers to. Subscribers
/// refetch on any kind; the event never carries row data.
#[allow(dead_code)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    pub appointment_id: String,
}

/// Access layer over the appointment tables. Every committed write to the
/// appointments table emits one [`ChangeEvent`] on the broadcast channel.
#[derive(Clone)]
pub struct AppointmentStore {
    pool: SqlitePool,
    changes: broadcast::Sender<ChangeEvent>,
}

impl AppointmentStore {
    pub fn new(pool: SqlitePool) -> Self {
        let (changes, _) = broadcast::channel(32);
        Self { pool, changes }
    }

    /// Receiver for the appointment change feed. Dropping the receiver
    /// releases the subscription.
    pub fn subscribe_changes(&self) -> broadcast::Receiver<ChangeEvent> {
        self.changes.subscribe()
    }

    #[cfg(test)]
    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn list_appointments(&self) -> Result<Vec<AppointmentRow>, sqlx::Error> {
        sqlx::query_as::<_, AppointmentRow>(
            r#"SELECT a.id, a.client_name, a.client_phone, a.service_id, a.barber_id,
                      a.appointment_date, a.appointment_time, a.total_slots, a.amount,
                      a.status, a.payment_status, a.created_at,
                      s.name AS service_name, s.price AS service_price,
                      b.name AS barber_name
               FROM appointments a
               LEFT JOIN services s ON a.service_id = s.id
               LEFT JOIN barbers b ON a.barber_id = b.id
               ORDER BY a.appointment_date, a.appointment_time, a.created_at"#,
        )
        .fetch_all(&self.pool)
        .await
    }

    pub async fn fetch_appointment(
        &self,
        appointment_id: &str,
    ) -> Result<Option<AppointmentRow>, sqlx::Error> {
        sqlx::query_as::<_, AppointmentRow>(
            r#"SELECT a.id, a.client_name, a.client_phone, a.service_id, a.barber_id,
                      a.appointment_date, a.appointment_time, a.total_slots, a.amount,
                      a.status, a.payment_status, a.created_at,
                      s.name AS service_name, s.price AS service_price,
                      b.name AS barber_name
               FROM appointments a
               LEFT JOIN services s ON a.service_id = s.id
               LEFT JOIN barbers b ON a.barber_id = b.id
               WHERE a.id = ?
               LIMIT 1"#,
        )
        .bind(appointment_id)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn list_barbers(&self) -> Result<Vec<BarberRow>, sqlx::Error> {
        sqlx::query_as::<_, BarberRow>("SELECT id, name, is_active FROM barbers ORDER BY name")
            .fetch_all(&self.pool)
            .await
    }

    pub async fn list_services(&self) -> Result<Vec<ServiceRow>, sqlx::Error> {
        sqlx::query_as::<_, ServiceRow>(
            "SELECT id, name, price, duration_minutes FROM services ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await
    }

    /// Insert a validated draft and return the stored row with its joined
    /// display fields. The id and creation stamp are assigned here.
    pub async fn insert_appointment(
        &self,
        draft: &AppointmentDraft,
    ) -> Result<AppointmentRow, sqlx::Error> {
        let appointment_id = new_id();
        sqlx::query(
            r#"INSERT INTO appointments
               (id, client_name, client_phone, service_id, barber_id, appointment_date,
                appointment_time, total_slots, amount, status, payment_status, created_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(&appointment_id)
        .bind(&draft.client_name)
        .bind(&draft.client_phone)
        .bind(&draft.service_id)
        .bind(&draft.barber_id)
        .bind(&draft.appointment_date)
        .bind(&draft.appointment_time)
        .bind(draft.total_slots)
        .bind(draft.amount)
        .bind(draft.status.as_str())
        .bind(draft.payment_status.as_str())
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        let row = self
            .fetch_appointment(&appointment_id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)?;

        self.notify(ChangeKind::Insert, &appointment_id);
        Ok(row)
    }

    pub async fn update_status(
        &self,
        appointment_id: &str,
        status: AppointmentStatus,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE appointments SET status = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(appointment_id)
            .execute(&self.pool)
            .await?;
        self.notify(ChangeKind::Update, appointment_id);
        Ok(())
    }

    pub async fn update_payment(
        &self,
        appointment_id: &str,
        payment_status: PaymentStatus,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE appointments SET payment_status = ? WHERE id = ?")
            .bind(payment_status.as_str())
            .bind(appointment_id)
            .execute(&self.pool)
            .await?;
        self.notify(ChangeKind::Update, appointment_id);
        Ok(())
    }

    fn notify(&self, kind: ChangeKind, appointment_id: &str) {
        let _ = self.changes.send(ChangeEvent {
            kind,
            appointment_id: appointment_id.to_string(),
        });
    }
}
