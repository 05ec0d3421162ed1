//! Shared fixtures for unit tests: a scripted transport and a counting store.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use reqwest::Method;
use serde_json::{Value, json};
use tokio::sync::Semaphore;

use crate::credential::{CredentialSource, CredentialStore, MemoryCredentialStore, SessionCredential, StoreError};
use crate::net::transport::{HttpRequest, HttpResponse, HttpTransport, TransportError};
use crate::session::SessionController;

// =============================================================================
// MockTransport
// =============================================================================

#[derive(Clone)]
pub enum Scripted {
    Respond(HttpResponse),
    Fail(String),
}

/// Transport that answers from per-route scripts and records every request.
///
/// Each route holds a queue; the last entry repeats once the queue drains.
/// Unscripted routes answer `404 {"message":"no route"}`.
#[derive(Default)]
pub struct MockTransport {
    routes: Mutex<HashMap<(Method, String), VecDeque<Scripted>>>,
    gates: Mutex<HashMap<String, Arc<Semaphore>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl MockTransport {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn respond(&self, method: Method, path: &str, status: u16, body: Value) {
        self.script(method, path, Scripted::Respond(HttpResponse::json(status, &body)));
    }

    pub fn respond_raw(&self, method: Method, path: &str, status: u16, body: &str) {
        self.script(method, path, Scripted::Respond(HttpResponse::new(status, body)));
    }

    pub fn fail(&self, method: Method, path: &str, message: &str) {
        self.script(method, path, Scripted::Fail(message.to_owned()));
    }

    fn script(&self, method: Method, path: &str, entry: Scripted) {
        self.routes
            .lock()
            .unwrap()
            .entry((method, path.to_owned()))
            .or_default()
            .push_back(entry);
    }

    /// Hold requests to `path` until permits are added to the returned semaphore.
    pub fn gate(&self, path: &str) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        self.gates.lock().unwrap().insert(path.to_owned(), gate.clone());
        gate
    }

    #[must_use]
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    #[must_use]
    pub fn count(&self, path: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.path == path)
            .count()
    }

    fn next(&self, method: &Method, path: &str) -> Scripted {
        let mut routes = self.routes.lock().unwrap();
        match routes.get_mut(&(method.clone(), path.to_owned())) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
            Some(queue) if !queue.is_empty() => queue[0].clone(),
            _ => Scripted::Respond(HttpResponse::json(404, &json!({ "message": "no route" }))),
        }
    }
}

#[async_trait::async_trait]
impl HttpTransport for MockTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests.lock().unwrap().push(request.clone());
        let gate = self.gates.lock().unwrap().get(&request.path).cloned();
        let scripted = self.next(&request.method, &request.path);

        // Let concurrently spawned callers reach this point before answering.
        tokio::task::yield_now().await;
        if let Some(gate) = gate {
            gate.acquire().await.unwrap().forget();
        }

        match scripted {
            Scripted::Respond(response) => Ok(response),
            Scripted::Fail(message) => Err(TransportError(message)),
        }
    }
}

// =============================================================================
// CountingStore
// =============================================================================

/// In-memory store that counts writes, to assert how often the session clears it.
#[derive(Default)]
pub struct CountingStore {
    inner: MemoryCredentialStore,
    sets: AtomicUsize,
    clears: AtomicUsize,
}

impl CountingStore {
    #[must_use]
    pub fn empty() -> Arc<Self> {
        Arc::new(Self::default())
    }

    #[must_use]
    pub fn holding(token: &str) -> Arc<Self> {
        Arc::new(Self {
            inner: MemoryCredentialStore::with_credential(SessionCredential::new(token)),
            ..Self::default()
        })
    }

    pub fn sets(&self) -> usize {
        self.sets.load(Ordering::SeqCst)
    }

    pub fn clears(&self) -> usize {
        self.clears.load(Ordering::SeqCst)
    }

    pub fn token(&self) -> Option<String> {
        self.inner.get().map(|c| c.token().to_owned())
    }
}

impl CredentialSource for CountingStore {
    fn get(&self) -> Option<SessionCredential> {
        self.inner.get()
    }
}

impl CredentialStore for CountingStore {
    fn set(&self, credential: SessionCredential) -> Result<(), StoreError> {
        self.sets.fetch_add(1, Ordering::SeqCst);
        self.inner.set(credential)
    }

    fn clear(&self) -> Result<(), StoreError> {
        self.clears.fetch_add(1, Ordering::SeqCst);
        self.inner.clear()
    }
}

// =============================================================================
// Fixtures
// =============================================================================

pub fn plant_lover() -> Value {
    json!({ "id": 1, "username": "plant_lover", "email": "plantlover@email.com" })
}

pub fn script_check_auth_ok(transport: &MockTransport) {
    transport.respond(Method::GET, "/check-auth", 200, json!({ "authenticated": true, "user": plant_lover() }));
}

pub fn script_login_ok(transport: &MockTransport, token: &str) {
    transport.respond(
        Method::POST,
        "/login",
        200,
        json!({ "message": "Login successful", "user": plant_lover(), "token": token }),
    );
}

pub fn controller(transport: &Arc<MockTransport>, store: &Arc<CountingStore>) -> Arc<SessionController> {
    Arc::new(SessionController::new(transport.clone(), store.clone()))
}

/// Controller that has already resolved to `Authenticated` via `initialize()`.
pub async fn authenticated_controller(
    transport: &Arc<MockTransport>,
    store: &Arc<CountingStore>,
) -> Arc<SessionController> {
    script_check_auth_ok(transport);
    let session = controller(transport, store);
    session.initialize().await;
    assert!(session.state().is_authenticated());
    session
}
