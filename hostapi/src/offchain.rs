//! Offchain collaborators: node KV stores, the HTTP request registry and
//! the network-state provider.
//!
//! The KV triple (base / persistent / local) backs the offchain index and
//! local-storage imports. The HTTP registry is bookkeeping only — requests
//! progress through a per-id state machine and no socket I/O happens inside
//! a host call.

use std::collections::HashMap;
use std::sync::Arc;

use codec::Encode;
use parking_lot::{Mutex, RwLock};

/// Offchain storage kind selector, as passed by the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    Persistent = 1,
    Local = 2,
}

impl StorageKind {
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            1 => Some(StorageKind::Persistent),
            2 => Some(StorageKind::Local),
            _ => None,
        }
    }
}

/// A node-local key-value store.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>>;
    fn put(&self, key: Vec<u8>, value: Vec<u8>);
    fn delete(&self, key: &[u8]);
}

/// In-memory `KeyValueStore`.
#[derive(Default)]
pub struct InMemoryKv {
    entries: RwLock<HashMap<Vec<u8>, Vec<u8>>>,
}

impl InMemoryKv {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for InMemoryKv {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.entries.read().get(key).cloned()
    }

    fn put(&self, key: Vec<u8>, value: Vec<u8>) {
        self.entries.write().insert(key, value);
    }

    fn delete(&self, key: &[u8]) {
        self.entries.write().remove(key);
    }
}

/// The node storage triple handed to each host context.
#[derive(Clone)]
pub struct NodeStorage {
    /// Chain-indexing writes from `ext_offchain_index_set_version_1`.
    pub base: Arc<dyn KeyValueStore>,
    pub persistent: Arc<dyn KeyValueStore>,
    pub local: Arc<dyn KeyValueStore>,
}

impl NodeStorage {
    pub fn in_memory() -> Self {
        Self {
            base: Arc::new(InMemoryKv::new()),
            persistent: Arc::new(InMemoryKv::new()),
            local: Arc::new(InMemoryKv::new()),
        }
    }

    pub fn kind(&self, kind: StorageKind) -> &Arc<dyn KeyValueStore> {
        match kind {
            StorageKind::Persistent => &self.persistent,
            StorageKind::Local => &self.local,
        }
    }
}

/// Network state reported to the runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkState {
    pub peer_id: String,
    pub multiaddrs: Vec<String>,
}

impl NetworkState {
    /// SCALE encoding: both fields as UTF-8 byte vectors.
    pub fn encode(&self) -> Vec<u8> {
        let peer_id = self.peer_id.as_bytes().to_vec();
        let multiaddrs: Vec<Vec<u8>> = self
            .multiaddrs
            .iter()
            .map(|addr| addr.as_bytes().to_vec())
            .collect();
        (peer_id, multiaddrs).encode()
    }
}

/// Provider of the node's current network state.
pub trait Network: Send + Sync {
    fn network_state(&self) -> NetworkState;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HttpError {
    #[error("unsupported HTTP method")]
    UnsupportedMethod,
    #[error("no request registered for id {0}")]
    UnknownRequest(i16),
    #[error("headers can no longer be added in state {0:?}")]
    InvalidState(RequestState),
    #[error("request id space exhausted")]
    IdExhausted,
    #[error("request deadline passed")]
    DeadlinePassed,
}

/// Lifecycle of one registered HTTP request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Init,
    HeadersAdded,
    BodyWritten,
    InFlight,
    Completed,
    Failed,
}

/// One in-progress HTTP request.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: String,
    pub uri: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub state: RequestState,
    pub response: Option<Vec<u8>>,
}

#[derive(Default)]
struct HttpSetInner {
    next_id: i16,
    requests: HashMap<i16, HttpRequest>,
}

/// Registry of offchain HTTP requests, ids handed out monotonically.
#[derive(Default)]
pub struct OffchainHttpSet {
    inner: Mutex<HttpSetInner>,
}

impl OffchainHttpSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a request and return its id.
    pub fn start_request(&self, method: &str, uri: &str) -> Result<i16, HttpError> {
        match method {
            "GET" | "POST" => {}
            _ => return Err(HttpError::UnsupportedMethod),
        }
        let mut inner = self.inner.lock();
        let id = inner.next_id.checked_add(1).ok_or(HttpError::IdExhausted)?;
        inner.next_id = id;
        inner.requests.insert(
            id,
            HttpRequest {
                method: method.to_string(),
                uri: uri.to_string(),
                headers: Vec::new(),
                body: Vec::new(),
                state: RequestState::Init,
                response: None,
            },
        );
        Ok(id)
    }

    /// Add a header. Only legal before the body is written.
    pub fn add_header(&self, id: i16, name: &str, value: &str) -> Result<(), HttpError> {
        let mut inner = self.inner.lock();
        let request = inner
            .requests
            .get_mut(&id)
            .ok_or(HttpError::UnknownRequest(id))?;
        match request.state {
            RequestState::Init | RequestState::HeadersAdded => {}
            state => return Err(HttpError::InvalidState(state)),
        }
        request.headers.push((name.to_string(), value.to_string()));
        request.state = RequestState::HeadersAdded;
        Ok(())
    }

    /// Append a body chunk. A `deadline` of UNIX milliseconds in the past
    /// fails the request.
    pub fn write_body(
        &self,
        id: i16,
        chunk: &[u8],
        deadline: Option<u64>,
        now_millis: u64,
    ) -> Result<(), HttpError> {
        let mut inner = self.inner.lock();
        let request = inner
            .requests
            .get_mut(&id)
            .ok_or(HttpError::UnknownRequest(id))?;
        if let Some(deadline) = deadline {
            if deadline < now_millis {
                request.state = RequestState::Failed;
                return Err(HttpError::DeadlinePassed);
            }
        }
        match request.state {
            RequestState::Init | RequestState::HeadersAdded | RequestState::BodyWritten => {}
            state => return Err(HttpError::InvalidState(state)),
        }
        request.body.extend_from_slice(chunk);
        request.state = RequestState::BodyWritten;
        Ok(())
    }

    /// Snapshot one request, if registered.
    pub fn request(&self, id: i16) -> Option<HttpRequest> {
        self.inner.lock().requests.get(&id).cloned()
    }
}
