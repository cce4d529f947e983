use actix_web::{web, HttpResponse, Result};
use serde::Deserialize;
use serde_json::json;

use crate::{
    booking::{self, BookingRequest},
    error::AppError,
    models::{AppointmentStatus, PaymentStatus},
    state::AppState,
    sync::AppointmentFilter,
};

#[derive(Deserialize)]
struct StatusChange {
    status: AppointmentStatus,
}

#[derive(Deserialize)]
struct PaymentChange {
    payment_status: PaymentStatus,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/appointments")
            .route(web::get().to(list))
            .route(web::post().to(create)),
    )
    .service(web::resource("/appointments/{id}/status").route(web::post().to(set_status)))
    .service(web::resource("/appointments/{id}/payment").route(web::post().to(set_payment)));
}

async fn list(
    state: web::Data<AppState>,
    query: web::Query<AppointmentFilter>,
) -> HttpResponse {
    let appointments = state.controller.filtered(&query).await;
    HttpResponse::Ok().json(json!({
        "total": appointments.len(),
        "appointments": appointments,
    }))
}

async fn create(
    state: web::Data<AppState>,
    payload: web::Json<BookingRequest>,
) -> Result<HttpResponse, AppError> {
    let row = booking::create_appointment(&state, payload.into_inner()).await?;
    Ok(HttpResponse::Created().json(row))
}

async fn set_status(
    state: web::Data<AppState>,
    path: web::Path<String>,
    payload: web::Json<StatusChange>,
) -> Result<HttpResponse, AppError> {
    booking::set_status(&state, &path.into_inner(), payload.status).await?;
    Ok(HttpResponse::Ok().json(json!({ "ok": true })))
}

async fn set_payment(
    state: web::Data<AppState>,
    path: web::Path<String>,
    payload: web::Json<PaymentChange>,
) -> Result<HttpResponse, AppError> {
    booking::set_payment(&state, &path.into_inner(), payload.payment_status).await?;
    Ok(HttpResponse::Ok().json(json!({ "ok": true })))
}
