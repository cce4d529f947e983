use std::{fs, path::Path};

use sqlx::SqlitePool;
use uuid::Uuid;

pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

pub fn ensure_sqlite_dir(db_url: &str) -> std::io::Result<()> {
    let path = if let Some(path) = db_url.strip_prefix("sqlite://") {
        Some(path)
    } else if let Some(path) = db_url.strip_prefix("sqlite:") {
        Some(path)
    } else {
        None
    };

    let Some(path) = path else {
        return Ok(());
    };

    let path = path.split('?').next().unwrap_or(path);
    if path == ":memory:" || path.is_empty() {
        return Ok(());
    }

    let path = path.strip_prefix("file:").unwrap_or(path);
    let db_path = Path::new(path);
    if let Some(parent) = db_path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Seed the reference tables on first startup. Appointments are never
/// seeded; they only enter through the booking flow.
pub async fn seed_defaults(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    seed_services(pool).await?;
    seed_barbers(pool).await?;
    Ok(())
}

async fn seed_services(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let existing = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM services")
        .fetch_one(pool)
        .await?;
    if existing > 0 {
        return Ok(());
    }

    let catalog: [(&str, f64, i64); 4] = [
        ("Signature Cut", 450.0, 45),
        ("Fade & Line-Up", 350.0, 35),
        ("Beard Sculpt", 250.0, 25),
        ("Full Grooming", 600.0, 60),
    ];

    for (name, price, duration_minutes) in catalog {
        sqlx::query(
            "INSERT INTO services (id, name, price, duration_minutes) VALUES (?, ?, ?, ?)",
        )
        .bind(new_id())
        .bind(name)
        .bind(price)
        .bind(duration_minutes)
        .execute(pool)
        .await?;
    }

    log::info!("Seeded default service catalog");
    Ok(())
}

async fn seed_barbers(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let existing = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM barbers")
        .fetch_one(pool)
        .await?;
    if existing > 0 {
        return Ok(());
    }

    for name in ["Aman Verma", "Rohit Khanna", "Sana Kapoor"] {
        sqlx::query("INSERT INTO barbers (id, name, is_active) VALUES (?, ?, 1)")
            .bind(new_id())
            .bind(name)
            .execute(pool)
            .await?;
    }

    log::info!("Seeded default staff roster");
    Ok(())
}

#[cfg(test)]
pub async fn memory_pool() -> SqlitePool {
    use std::str::FromStr;

    use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

    // a single connection so every query sees the same in-memory database
    let options = SqliteConnectOptions::from_str("sqlite::memory:").unwrap();
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .unwrap();
    run_migrations(&pool).await.unwrap();
    pool
}

#[cfg(test)]
pub async fn seed_reference_fixture(pool: &SqlitePool) {
    for (id, name, price, duration) in [
        ("svc-cut", "Signature Cut", 450.0, 45),
        ("svc-beard", "Beard Sculpt", 250.0, 25),
        ("svc-groom", "Full Grooming", 600.0, 60),
    ] {
        sqlx::query("INSERT INTO services (id, name, price, duration_minutes) VALUES (?, ?, ?, ?)")
            .bind(id)
            .bind(name)
            .bind(price)
            .bind(duration)
            .execute(pool)
            .await
            .unwrap();
    }

    for (id, name, active) in [
        ("brb-aman", "Aman Verma", 1),
        ("brb-sana", "Sana Kapoor", 1),
        ("brb-left", "Former Staff", 0),
    ] {
        sqlx::query("INSERT INTO barbers (id, name, is_active) VALUES (?, ?, ?)")
            .bind(id)
            .bind(name)
            .bind(active)
            .execute(pool)
            .await
            .unwrap();
    }
}
