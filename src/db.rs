use std::{env, fs, path::Path};

use chrono::Utc;
use sqlx::SqlitePool;

use crate::{
    auth::{hash_password, new_id},
    models::AppointmentRow,
};

pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
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

pub async fn seed_defaults(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    seed_admin(pool).await?;
    seed_categories(pool).await?;
    seed_services(pool).await?;
    Ok(())
}

pub async fn fetch_appointment(pool: &SqlitePool, appointment_id: &str) -> Option<AppointmentRow> {
    sqlx::query_as::<_, AppointmentRow>(
        r#"SELECT id, user_id, full_name, email, phone, appointment_date, appointment_time,
                  description, pet_name, pet_type, service_type, pet_size, notes,
                  reference_images, estimated_price, status, created_at, updated_at
           FROM appointments
           WHERE id = ?
           LIMIT 1"#,
    )
    .bind(appointment_id)
    .fetch_optional(pool)
    .await
    .unwrap_or(None)
}

async fn seed_admin(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let existing = sqlx::query_as::<_, (String,)>(
        "SELECT id FROM profiles WHERE is_admin = 1 LIMIT 1",
    )
    .fetch_optional(pool)
    .await?;

    if existing.is_some() {
        return Ok(());
    }

    let email = env::var("ADMIN_EMAIL").unwrap_or_else(|_| "admin@petshop.local".to_string());
    let password = env::var("ADMIN_PASSWORD").unwrap_or_else(|_| "admin".to_string());
    let full_name = env::var("ADMIN_NAME").unwrap_or_else(|_| "Administração".to_string());

    if password == "admin" {
        log::warn!("ADMIN_PASSWORD not set. Using default password 'admin'. Set ADMIN_PASSWORD in production.");
    }

    let password_hash =
        hash_password(&password).map_err(|_| sqlx::Error::Protocol("password hash failed".into()))?;
    let now = Utc::now().to_rfc3339();
    let user_id = new_id();

    sqlx::query("INSERT INTO users (id, email, password_hash, created_at) VALUES (?, ?, ?, ?)")
        .bind(&user_id)
        .bind(&email)
        .bind(password_hash)
        .bind(&now)
        .execute(pool)
        .await?;

    // The insert trigger has provisioned the profile; promote it.
    sqlx::query(
        "UPDATE profiles SET full_name = ?, is_admin = 1, updated_at = ? WHERE id = ?",
    )
    .bind(&full_name)
    .bind(&now)
    .bind(&user_id)
    .execute(pool)
    .await?;

    Ok(())
}

async fn seed_categories(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let categories = vec![
        ("Alimentos", "alimentos", "Rações e petiscos para todas as idades", 1),
        ("Brinquedos", "brinquedos", "Diversão garantida para o seu pet", 2),
        ("Higiene", "higiene", "Shampoos, escovas e cuidados diários", 3),
        ("Acessórios", "acessorios", "Coleiras, camas e transporte", 4),
    ];

    for (name, slug, description, display_order) in categories {
        let exists =
            sqlx::query_as::<_, (String,)>("SELECT id FROM categories WHERE slug = ? LIMIT 1")
                .bind(slug)
                .fetch_optional(pool)
                .await?;
        if exists.is_some() {
            continue;
        }

        sqlx::query(
            r#"INSERT INTO categories (id, name, slug, description, display_order, created_at)
               VALUES (?, ?, ?, ?, ?, ?)"#,
        )
        .bind(new_id())
        .bind(name)
        .bind(slug)
        .bind(description)
        .bind(display_order)
        .bind(Utc::now().to_rfc3339())
        .execute(pool)
        .await?;
    }

    Ok(())
}

async fn seed_services(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let services = vec![
        ("Banho Simples", "Banho com produtos hipoalergênicos e secagem.", 40.0, 55.0, 75.0, 45, "bath"),
        ("Tosa Completa", "Tosa higiênica e da máquina, acabamento na tesoura.", 60.0, 80.0, 110.0, 90, "scissors"),
        ("Grooming Profissional", "Banho, tosa e finalização para exposição.", 90.0, 120.0, 160.0, 120, "sparkles"),
        ("Limpeza de Ouvidos", "Higienização completa do canal auditivo.", 25.0, 30.0, 35.0, 15, "stethoscope"),
        ("Corte de Unhas", "Corte e lixamento das unhas.", 20.0, 25.0, 30.0, 15, "heart"),
    ];

    for (name, description, small, medium, large, duration, icon) in services {
        let exists =
            sqlx::query_as::<_, (String,)>("SELECT id FROM services WHERE name = ? LIMIT 1")
                .bind(name)
                .fetch_optional(pool)
                .await?;
        if exists.is_some() {
            continue;
        }

        let now = Utc::now().to_rfc3339();
        sqlx::query(
            r#"INSERT INTO services
               (id, name, description, price_small, price_medium, price_large,
                duration_minutes, icon, is_active, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, 1, ?, ?)"#,
        )
        .bind(new_id())
        .bind(name)
        .bind(description)
        .bind(small)
        .bind(medium)
        .bind(large)
        .bind(duration)
        .bind(icon)
        .bind(&now)
        .bind(&now)
        .execute(pool)
        .await?;
    }

    Ok(())
}
