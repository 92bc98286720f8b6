//! Server-side sessions keyed by a random cookie value.
//!
//! Session data lives in a bounded, expiring moka cache and the cookie is
//! built with the `cookie` crate. The middleware attaches a [`Session`] to
//! every request and sets the cookie only when the session was created or
//! re-keyed and holds data, so anonymous page views stay cookie-less.

use std::{future::ready, sync::Arc, time::Duration};

use axum::{
    extract::{Request, State},
    http::{
        HeaderMap, HeaderValue,
        header::{COOKIE, SET_COOKIE},
    },
    middleware::Next,
    response::Response,
};
use cookie::{Cookie, SameSite};
use moka::{future::Cache, ops::compute::Op};
use rand::{Rng, distributions::Alphanumeric};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, trace, warn};

use crate::schemas::AppState;

/// Name of the cookie carrying the session id.
pub const SESSION_COOKIE: &str = "warbler_session";

const TOKEN_LEN: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashLevel {
    Success,
    Warning,
    Danger,
}

/// A one-shot notice shown on the next rendered page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Flash {
    pub level: FlashLevel,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionData {
    /// The logged-in user (`CURR_USER_KEY`)
    pub curr_user: Option<i32>,
    pub flashes: Vec<Flash>,
    pub csrf_token: Option<String>,
}

/// Concurrent session storage shared by all requests
#[derive(Clone)]
pub struct SessionStore {
    cache: Cache<String, SessionData>,
}

impl SessionStore {
    pub fn new(capacity: u64, idle_ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(capacity)
            .time_to_idle(idle_ttl)
            .build();
        Self { cache }
    }

    pub fn contains(&self, session_id: &str) -> bool {
        self.cache.contains_key(session_id)
    }

    pub async fn load(&self, session_id: &str) -> Option<SessionData> {
        self.cache.get(session_id).await
    }

    /// Removes a session, returning what it held.
    pub async fn remove(&self, session_id: &str) -> Option<SessionData> {
        self.cache.remove(session_id).await
    }

    /// Creates a fresh session already logged in as `user_id`, returning its id.
    pub async fn create_for_user(&self, user_id: i32) -> String {
        let session_id = generate_token();
        let data = SessionData {
            curr_user: Some(user_id),
            ..Default::default()
        };
        self.cache.insert(session_id.clone(), data).await;
        session_id
    }

    /// Applies `change` to the session atomically, creating it if needed.
    async fn modify<F>(&self, session_id: &str, change: F)
    where
        F: FnOnce(&mut SessionData),
    {
        self.cache
            .entry(session_id.to_string())
            .and_compute_with(|entry| {
                let mut data = entry.map(|e| e.into_value()).unwrap_or_default();
                change(&mut data);
                ready(Op::Put(data))
            })
            .await;
    }

    /// Like [`SessionStore::modify`], but never creates a session. `change`
    /// returns whether it altered the data.
    async fn modify_existing<F>(&self, session_id: &str, change: F)
    where
        F: FnOnce(&mut SessionData) -> bool,
    {
        self.cache
            .entry(session_id.to_string())
            .and_compute_with(|entry| {
                let op = match entry {
                    Some(entry) => {
                        let mut data = entry.into_value();
                        if change(&mut data) { Op::Put(data) } else { Op::Nop }
                    }
                    None => Op::Nop,
                };
                ready(op)
            })
            .await;
    }
}

/// Random alphanumeric token, used for session ids and CSRF tokens.
pub fn generate_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LEN)
        .map(char::from)
        .collect()
}

/// The current request's session.
///
/// The id sits behind a lock because logging in moves the data to a new id.
#[derive(Clone)]
pub struct Session {
    id: Arc<RwLock<String>>,
    store: SessionStore,
}

impl Session {
    pub fn new(id: String, store: SessionStore) -> Self {
        Self {
            id: Arc::new(RwLock::new(id)),
            store,
        }
    }

    pub async fn id(&self) -> String {
        self.id.read().await.clone()
    }

    pub async fn data(&self) -> SessionData {
        let id = self.id().await;
        self.store.load(&id).await.unwrap_or_default()
    }

    pub async fn current_user_id(&self) -> Option<i32> {
        self.data().await.curr_user
    }

    /// Logs `user_id` in under a fresh session id.
    ///
    /// Pending flashes carry over; the old id and its CSRF token stop working.
    pub async fn login(&self, user_id: i32) {
        let mut id = self.id.write().await;
        let mut data = self.store.remove(id.as_str()).await.unwrap_or_default();
        data.curr_user = Some(user_id);
        data.csrf_token = None;

        let new_id = generate_token();
        self.store.cache.insert(new_id.clone(), data).await;
        *id = new_id;
        debug!("Session login for user ID: {}", user_id);
    }

    /// Forgets the user but keeps the session, so a farewell flash survives the redirect.
    pub async fn logout(&self) {
        let id = self.id().await;
        self.store.modify(&id, |data| data.curr_user = None).await;
    }

    pub async fn flash(&self, level: FlashLevel, message: impl Into<String>) {
        let flash = Flash {
            level,
            message: message.into(),
        };
        let id = self.id().await;
        self.store.modify(&id, |data| data.flashes.push(flash)).await;
    }

    /// Returns pending flashes and clears them.
    pub async fn take_flashes(&self) -> Vec<Flash> {
        let id = self.id().await;
        let mut taken = Vec::new();
        self.store
            .modify_existing(&id, |data| {
                taken = std::mem::take(&mut data.flashes);
                !taken.is_empty()
            })
            .await;
        taken
    }

    /// The session's CSRF token, created on first use.
    pub async fn csrf_token(&self) -> String {
        let id = self.id().await;
        let mut token = String::new();
        self.store
            .modify(&id, |data| {
                token = data.csrf_token.get_or_insert_with(generate_token).clone();
            })
            .await;
        token
    }
}

fn session_id_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .find(|cookie| cookie.name() == SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string())
}

fn session_cookie(session_id: String) -> Option<HeaderValue> {
    let cookie = Cookie::build((SESSION_COOKIE, session_id))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build();

    match HeaderValue::from_str(&cookie.to_string()) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Failed to encode session cookie: {}", e);
            None
        }
    }
}

/// Middleware installing a [`Session`] on each request.
pub async fn session_layer(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let known = session_id_from_headers(request.headers()).filter(|id| state.sessions.contains(id));
    let is_new = known.is_none();
    let original_id = known.unwrap_or_else(generate_token);
    trace!("Request session is new: {}", is_new);

    let session = Session::new(original_id.clone(), state.sessions.clone());
    request.extensions_mut().insert(session.clone());

    let mut response = next.run(request).await;

    let current_id = session.id().await;
    let rekeyed = current_id != original_id;
    if (is_new || rekeyed) && state.sessions.contains(&current_id) {
        if let Some(value) = session_cookie(current_id) {
            response.headers_mut().append(SET_COOKIE, value);
        }
    }

    response
}
