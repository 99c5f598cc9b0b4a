use std::sync::Arc;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;

use crate::{
    auth::{
        jwt::JwtKeys,
        repo::{PgUserStore, UserStore},
    },
    config::AppConfig,
    files::repo::{FileStore, PgFileStore},
    notify::{LogNotifier, ResetNotifier},
    posts::repo::{PgPostStore, PostStore},
    storage::{S3Storage, StorageClient},
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub keys: JwtKeys,
    pub users: Arc<dyn UserStore>,
    pub posts: Arc<dyn PostStore>,
    pub files: Arc<dyn FileStore>,
    pub storage: Arc<dyn StorageClient>,
    pub notifier: Arc<dyn ResetNotifier>,
}

impl AppState {
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        let db = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .connect(&config.database_url)
            .await
            .context("connect to database")?;

        sqlx::migrate!("./migrations")
            .run(&db)
            .await
            .context("run migrations")?;

        let storage = Arc::new(S3Storage::connect(&config.s3).await?) as Arc<dyn StorageClient>;

        Ok(Self {
            keys: JwtKeys::from_config(&config.jwt),
            config: Arc::new(config),
            users: Arc::new(PgUserStore::new(db.clone())),
            posts: Arc::new(PgPostStore::new(db.clone())),
            files: Arc::new(PgFileStore::new(db)),
            storage,
            notifier: Arc::new(LogNotifier),
        })
    }
}
