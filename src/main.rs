mod booking;
mod db;
mod error;
mod models;
mod routes;
mod slots;
mod state;
mod store;
mod sync;

use std::env;
use std::str::FromStr;
use std::sync::Arc;

use actix_web::{middleware, web, App, HttpServer};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

use crate::state::{AppState, BusinessHours};
use crate::store::AppointmentStore;
use crate::sync::SyncController;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    if let Err(err) = run().await {
        eprintln!("Startup error: {err}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .init();

    let db_url = env::var("DATABASE_URL")
        .unwrap_or_else(|_| "sqlite://./data/salonbook.db".to_string());
    db::ensure_sqlite_dir(&db_url)?;

    let connect_options = SqliteConnectOptions::from_str(&db_url)?
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(connect_options)
        .await?;

    db::run_migrations(&pool).await?;
    db::seed_defaults(&pool).await?;

    let store = AppointmentStore::new(pool);
    let controller = Arc::new(SyncController::new(store.clone()));
    if let Err(err) = controller.load().await {
        log::warn!("Initial snapshot load failed: {err}");
    }
    let feed = controller.subscribe();

    let state = AppState {
        store,
        controller,
        hours: BusinessHours::from_env(),
    };

    let port: u16 = env::var("PORT")
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(8080);

    let address = format!("0.0.0.0:{port}");
    log::info!("Starting SalonBook on http://{address}");

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state.clone()))
            .wrap(middleware::Logger::default())
            .configure(routes::appointments::configure)
            .configure(routes::catalog::configure)
            .configure(routes::events::configure)
    })
    .bind(address)?
    .run()
    .await?;

    feed.shutdown();
    Ok(())
}
