use actix_web::{web, HttpResponse};
use serde_json::json;

use crate::{slots::generate_time_slots, state::AppState};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/barbers").route(web::get().to(list_barbers)))
        .service(web::resource("/services").route(web::get().to(list_services)))
        .service(web::resource("/booking/options").route(web::get().to(booking_options)))
        .service(web::resource("/health").route(web::get().to(health)));
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().body("ok")
}

/// All staff, active flag included. Historical appointments keep referencing
/// inactive staff, so nothing is filtered out here.
async fn list_barbers(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(state.controller.barbers().await)
}

async fn list_services(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(state.controller.services().await)
}

/// Everything a booking form needs in one response: the service catalog,
/// the staff currently offerable as booking targets, and the slot grid for
/// the configured business hours.
async fn booking_options(state: web::Data<AppState>) -> HttpResponse {
    let barbers: Vec<_> = state
        .controller
        .barbers()
        .await
        .into_iter()
        .filter(|barber| barber.is_active)
        .collect();
    let services = state.controller.services().await;
    let slots = generate_time_slots(state.hours.opening_hour, state.hours.closing_hour);

    HttpResponse::Ok().json(json!({
        "services": services,
        "barbers": barbers,
        "slots": slots,
    }))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::{test, App};
    use serde_json::Value;

    use super::*;
    use crate::db;
    use crate::state::BusinessHours;
    use crate::store::AppointmentStore;
    use crate::sync::SyncController;

    #[actix_web::test]
    async fn booking_options_only_offer_active_staff() {
        let pool = db::memory_pool().await;
        db::seed_reference_fixture(&pool).await;
        let store = AppointmentStore::new(pool);
        let controller = Arc::new(SyncController::new(store.clone()));
        controller.load().await.unwrap();
        let state = AppState {
            store,
            controller,
            hours: BusinessHours {
                opening_hour: 9,
                closing_hour: 20,
            },
        };

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .configure(configure),
        )
        .await;

        let options: Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::get().uri("/booking/options").to_request(),
        )
        .await;

        assert_eq!(options["barbers"].as_array().unwrap().len(), 2);
        assert_eq!(options["services"].as_array().unwrap().len(), 3);
        assert_eq!(options["slots"].as_array().unwrap().len(), 22);
        assert_eq!(options["slots"][0]["value"], "09:00");

        // the roster endpoint still lists inactive staff for historical rows
        let roster: Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::get().uri("/barbers").to_request(),
        )
        .await;
        assert_eq!(roster.as_array().unwrap().len(), 3);
    }
}
