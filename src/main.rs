mod auth;
mod calendar;
mod db;
mod filters;
mod models;
mod routes;
mod state;
mod storage;
mod templates;
mod validate;
mod workflow;

use actix_files::Files;
use actix_session::{storage::CookieSessionStore, SessionMiddleware};
use actix_web::cookie::Key;
use actix_web::{middleware, web, App, HttpServer};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::env;
use std::str::FromStr;

use crate::state::AppState;
use crate::storage::UploadStore;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    if let Err(err) = run().await {
        eprintln!("Startup error: {err}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let db_url =
        env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://./data/petshop.db".to_string());
    db::ensure_sqlite_dir(&db_url)?;

    let connect_options = SqliteConnectOptions::from_str(&db_url)?.create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(connect_options)
        .await?;

    db::run_migrations(&pool).await?;
    db::seed_defaults(&pool).await?;

    let uploads_root =
        env::var("UPLOADS_DIR").unwrap_or_else(|_| "./data/uploads".to_string());
    let uploads = UploadStore::new(&uploads_root);
    uploads.ensure_dirs()?;

    let state = AppState {
        db: pool.clone(),
        uploads,
    };

    let session_key = session_key();

    let port: u16 = env::var("PORT")
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(8080);

    let address = format!("0.0.0.0:{port}");
    log::info!("Starting PetShop on http://{address}");

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state.clone()))
            .wrap(middleware::Logger::default())
            .wrap(
                SessionMiddleware::builder(CookieSessionStore::default(), session_key.clone())
                    .cookie_name("petshop_session".to_string())
                    .cookie_secure(false)
                    .build(),
            )
            .service(Files::new("/static", "./static").prefer_utf8(true))
            .service(Files::new("/uploads", uploads_root.clone()).prefer_utf8(true))
            .configure(routes::public::configure)
            .configure(routes::account::configure)
            .configure(routes::admin::configure)
    })
    .bind(address)?
    .run()
    .await?;

    Ok(())
}

fn session_key() -> Key {
    match env::var("SESSION_SECRET") {
        Ok(secret) if secret.len() >= 64 => Key::from(secret.as_bytes()),
        Ok(_) => {
            log::warn!("SESSION_SECRET shorter than 64 bytes. Generating a volatile key; sessions reset on restart.");
            Key::generate()
        }
        Err(_) => {
            log::warn!("SESSION_SECRET not set. Generating a volatile key; sessions reset on restart.");
            Key::generate()
        }
    }
}
