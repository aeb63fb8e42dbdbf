use sqlx::SqlitePool;

use crate::storage::UploadStore;

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub uploads: UploadStore,
}
