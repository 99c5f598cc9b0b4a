//! In-memory stand-ins for the database, object storage and mailer, plus a
//! small helper to drive the router in tests.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use bytes::Bytes;
use serde_json::Value;
use time::OffsetDateTime;
use tower::ServiceExt;
use uuid::Uuid;

use crate::{
    app::build_app,
    auth::{
        jwt::JwtKeys,
        repo::{StoreError, UserStore},
        repo_types::{sample_user, NewUser, User},
    },
    config::{AppConfig, JwtConfig, S3Config},
    files::{repo::FileStore, repo_types::StoredFile},
    notify::ResetNotifier,
    posts::{
        repo::PostStore,
        repo_types::{Comment, Post},
    },
    state::AppState,
    storage::StorageClient,
};

#[derive(Default)]
pub struct MemoryUserStore {
    rows: Mutex<HashMap<Uuid, User>>,
    forced_stale: AtomicUsize,
}

impl MemoryUserStore {
    /// Makes the next `n` saves report a concurrent modification.
    pub fn fail_next_saves(&self, n: usize) {
        self.forced_stale.store(n, Ordering::SeqCst);
    }

    pub fn insert(&self, user: User) {
        self.rows.lock().unwrap().insert(user.id, user);
    }

    fn find(&self, pred: impl Fn(&User) -> bool) -> Option<User> {
        self.rows.lock().unwrap().values().find(|u| pred(u)).cloned()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_username_or_email(
        &self,
        username: &str,
        email: &str,
    ) -> Result<Option<User>, StoreError> {
        Ok(self.find(|u| u.username == username || u.email == email))
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        Ok(self.find(|u| u.username == username))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self.find(|u| u.email == email))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.rows.lock().unwrap().get(&id).cloned())
    }

    async fn find_by_reset_token(
        &self,
        token: &str,
        now: OffsetDateTime,
    ) -> Result<Option<User>, StoreError> {
        Ok(self.find(|u| {
            u.reset_token.as_deref() == Some(token)
                && u.reset_token_expiry.is_some_and(|exp| exp > now)
        }))
    }

    async fn create(&self, new: NewUser) -> Result<User, StoreError> {
        let mut rows = self.rows.lock().unwrap();
        if rows
            .values()
            .any(|u| u.username == new.username || u.email == new.email)
        {
            return Err(StoreError::Conflict);
        }
        let mut user = sample_user(&new.username);
        user.email = new.email;
        user.password_hash = new.password_hash;
        rows.insert(user.id, user.clone());
        Ok(user)
    }

    async fn save(&self, user: &User) -> Result<(), StoreError> {
        if self
            .forced_stale
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(StoreError::Stale);
        }
        let mut rows = self.rows.lock().unwrap();
        match rows.get(&user.id) {
            Some(current) if current.version == user.version => {}
            _ => return Err(StoreError::Stale),
        }
        if rows
            .values()
            .any(|u| u.id != user.id && (u.username == user.username || u.email == user.email))
        {
            return Err(StoreError::Conflict);
        }
        let mut next = user.clone();
        next.version += 1;
        rows.insert(next.id, next);
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryPostStore {
    posts: Mutex<Vec<Post>>,
    comments: Mutex<Vec<Comment>>,
}

#[async_trait]
impl PostStore for MemoryPostStore {
    async fn list_posts(&self, limit: i64, offset: i64) -> Result<Vec<Post>, StoreError> {
        let mut posts = self.posts.lock().unwrap().clone();
        posts.sort_by(|a, b| b.date_posted.cmp(&a.date_posted));
        Ok(posts
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn list_comments(&self, post_ids: &[Uuid]) -> Result<Vec<Comment>, StoreError> {
        let mut comments: Vec<Comment> = self
            .comments
            .lock()
            .unwrap()
            .iter()
            .filter(|c| post_ids.contains(&c.post_id))
            .cloned()
            .collect();
        comments.sort_by(|a, b| a.date_posted.cmp(&b.date_posted));
        Ok(comments)
    }

    async fn create_post(
        &self,
        user_id: Uuid,
        content: &str,
        now: OffsetDateTime,
    ) -> Result<Post, StoreError> {
        let post = Post {
            id: Uuid::new_v4(),
            user_id,
            content: content.to_string(),
            date_posted: now,
        };
        self.posts.lock().unwrap().push(post.clone());
        Ok(post)
    }

    async fn create_comment(
        &self,
        post_id: Uuid,
        user_id: Uuid,
        content: &str,
        now: OffsetDateTime,
    ) -> Result<Option<Comment>, StoreError> {
        if !self.posts.lock().unwrap().iter().any(|p| p.id == post_id) {
            return Ok(None);
        }
        let comment = Comment {
            id: Uuid::new_v4(),
            post_id,
            user_id,
            content: content.to_string(),
            date_posted: now,
        };
        self.comments.lock().unwrap().push(comment.clone());
        Ok(Some(comment))
    }
}

#[derive(Default)]
pub struct MemoryFileStore {
    rows: Mutex<Vec<StoredFile>>,
    failing: AtomicBool,
}

impl MemoryFileStore {
    pub fn fail_inserts(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl FileStore for MemoryFileStore {
    async fn insert(
        &self,
        id: Uuid,
        user_id: Uuid,
        filename: &str,
        path: &str,
        now: OffsetDateTime,
    ) -> Result<StoredFile, StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        let file = StoredFile {
            id,
            user_id,
            filename: filename.to_string(),
            path: path.to_string(),
            upload_date: now,
        };
        self.rows.lock().unwrap().push(file.clone());
        Ok(file)
    }
}

#[derive(Default)]
pub struct MemoryStorage {
    objects: Mutex<HashMap<String, Vec<u8>>>,
    failing: AtomicBool,
    presign_failing: AtomicBool,
}

impl MemoryStorage {
    pub fn fail_writes(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    pub fn fail_presign(&self) {
        self.presign_failing.store(true, Ordering::SeqCst);
    }

    pub fn object(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.lock().unwrap().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.objects.lock().unwrap().len()
    }
}

#[async_trait]
impl StorageClient for MemoryStorage {
    async fn put_object(&self, key: &str, body: Bytes, _ct: &str) -> anyhow::Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            anyhow::bail!("storage unavailable");
        }
        self.objects
            .lock()
            .unwrap()
            .insert(key.to_string(), body.to_vec());
        Ok(())
    }

    async fn delete_object(&self, key: &str) -> anyhow::Result<()> {
        self.objects.lock().unwrap().remove(key);
        Ok(())
    }

    async fn presign_get(&self, key: &str, _seconds: u64) -> anyhow::Result<String> {
        if self.presign_failing.load(Ordering::SeqCst) {
            anyhow::bail!("signer unavailable");
        }
        Ok(format!("https://fake.local/{}", key))
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(String, String)>>,
    failing: AtomicBool,
}

impl RecordingNotifier {
    pub fn fail_deliveries(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    /// `(email, token)` pairs in delivery order.
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl ResetNotifier for RecordingNotifier {
    async fn send_reset(&self, email: &str, token: &str) -> anyhow::Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            anyhow::bail!("smtp down");
        }
        self.sent
            .lock()
            .unwrap()
            .push((email.to_string(), token.to_string()));
        Ok(())
    }
}

pub fn test_config() -> AppConfig {
    AppConfig {
        host: "127.0.0.1".into(),
        port: 0,
        database_url: "postgres://unused".into(),
        database_max_connections: 1,
        jwt: JwtConfig {
            secret: "test-secret".into(),
            issuer: "test-issuer".into(),
            audience: "test-aud".into(),
            ttl_minutes: 72 * 60,
        },
        reset_token_ttl_minutes: 60,
        s3: S3Config {
            endpoint: "fake".into(),
            bucket: "fake".into(),
            access_key: "fake".into(),
            secret_key: "fake".into(),
            region: "us-east-1".into(),
        },
        upload_max_bytes: 1024 * 1024,
    }
}

pub struct TestHarness {
    pub state: AppState,
    pub users: Arc<MemoryUserStore>,
    pub files: Arc<MemoryFileStore>,
    pub storage: Arc<MemoryStorage>,
    pub notifier: Arc<RecordingNotifier>,
}

impl TestHarness {
    pub fn new() -> Self {
        let config = test_config();
        let users = Arc::new(MemoryUserStore::default());
        let files = Arc::new(MemoryFileStore::default());
        let storage = Arc::new(MemoryStorage::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let state = AppState {
            keys: JwtKeys::from_config(&config.jwt),
            config: Arc::new(config),
            users: users.clone(),
            posts: Arc::new(MemoryPostStore::default()),
            files: files.clone(),
            storage: storage.clone(),
            notifier: notifier.clone(),
        };
        Self {
            state,
            users,
            files,
            storage,
            notifier,
        }
    }

    pub fn router(&self) -> Router {
        build_app(self.state.clone())
    }

    /// Inserts `username` (email `<username>@x.com`) without a usable password.
    pub fn seed_user(&self, username: &str, points: i64) -> User {
        let mut user = sample_user(username);
        user.points = points;
        self.users.insert(user.clone());
        user
    }
}

/// Sends one request through `app` and returns the status and JSON body
/// (`Null` when the body is empty or not JSON).
pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    authorization: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(auth) = authorization {
        req = req.header(header::AUTHORIZATION, auth);
    }
    let req = match body {
        Some(json) => req
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string())),
        None => req.body(Body::empty()),
    }
    .unwrap();

    let res = app.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}
