//! Common test utilities
//!
//! - [`MockBackend`]: in-memory backend that records every call
//! - [`ScriptedSource`]: record source that replays scripted watch cycles
//! - record and controller builders shared across test files

#![allow(dead_code, reason = "each test binary uses a different subset")]

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};

use s3_resource_controller::backend::{Backend, BackendError};
use s3_resource_controller::config::ControllerConfig;
use s3_resource_controller::controller::Reconciler;
use s3_resource_controller::observability::Metrics;
use s3_resource_controller::record::source::RecordEventStream;
use s3_resource_controller::record::{
    AnnotatedRecord, EventKind, RecordEvent, RecordSource, SourceError,
};
use s3_resource_controller::runtime::{ControlLoop, ShutdownSignal};

pub const ANNOTATION: &str = "s3-resource-operator.io/enabled";
pub const BACKEND_ENDPOINT: &str = "http://versitygw:7070";

static RUSTLS_INIT: Once = Once::new();

/// Install the rustls crypto provider once per test binary
pub fn init_rustls() {
    RUSTLS_INIT.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}

/// One recorded backend call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    BucketExists(String),
    CreateBucket(String, Option<String>),
    DeleteBucket(String),
    GetBucketOwner(String),
    ChangeBucketOwner(String, String),
    UserExists(String),
    CreateUser {
        access: String,
        secret: String,
        role: Option<String>,
        user_id: Option<i64>,
        group_id: Option<i64>,
    },
    UpdateUser {
        access: String,
        secret: Option<String>,
        user_id: Option<i64>,
        group_id: Option<i64>,
    },
    DeleteUser(String),
    TestConnection,
}

impl Call {
    /// Whether the call changes backend state
    pub fn is_mutation(&self) -> bool {
        !matches!(
            self,
            Call::BucketExists(_)
                | Call::GetBucketOwner(_)
                | Call::UserExists(_)
                | Call::TestConnection
        )
    }
}

#[derive(Debug, Default)]
struct MockState {
    /// bucket name -> owner (None when the owner is unknown)
    buckets: HashMap<String, Option<String>>,
    users: HashSet<String>,
    calls: Vec<Call>,
    failing_create_user: usize,
}

/// In-memory backend reflecting the effect of its own mutations
#[derive(Debug)]
pub struct MockBackend {
    endpoint_url: String,
    state: Mutex<MockState>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::with_endpoint(BACKEND_ENDPOINT)
    }

    pub fn with_endpoint(endpoint_url: &str) -> Self {
        Self {
            endpoint_url: endpoint_url.to_string(),
            state: Mutex::new(MockState::default()),
        }
    }

    pub fn with_user(self, access: &str) -> Self {
        self.state.lock().unwrap().users.insert(access.to_string());
        self
    }

    pub fn with_bucket(self, name: &str, owner: Option<&str>) -> Self {
        self.state
            .lock()
            .unwrap()
            .buckets
            .insert(name.to_string(), owner.map(str::to_string));
        self
    }

    /// Make the next `count` create_user calls fail
    pub fn failing_create_user(self, count: usize) -> Self {
        self.state.lock().unwrap().failing_create_user = count;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn mutations(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_mutation).collect()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    pub fn bucket_owner(&self, name: &str) -> Option<String> {
        self.state.lock().unwrap().buckets.get(name).cloned().flatten()
    }

    pub fn has_user(&self, access: &str) -> bool {
        self.state.lock().unwrap().users.contains(access)
    }

    fn record(&self, call: Call) {
        self.state.lock().unwrap().calls.push(call);
    }
}

#[async_trait]
impl Backend for MockBackend {
    async fn bucket_exists(&self, name: &str) -> Result<bool, BackendError> {
        self.record(Call::BucketExists(name.to_string()));
        Ok(self.state.lock().unwrap().buckets.contains_key(name))
    }

    async fn create_bucket(&self, name: &str, owner: Option<&str>) -> Result<(), BackendError> {
        self.record(Call::CreateBucket(name.to_string(), owner.map(str::to_string)));
        self.state
            .lock()
            .unwrap()
            .buckets
            .entry(name.to_string())
            .or_insert_with(|| owner.map(str::to_string));
        Ok(())
    }

    async fn delete_bucket(&self, name: &str) -> Result<(), BackendError> {
        self.record(Call::DeleteBucket(name.to_string()));
        self.state.lock().unwrap().buckets.remove(name);
        Ok(())
    }

    async fn get_bucket_owner(&self, name: &str) -> Result<Option<String>, BackendError> {
        self.record(Call::GetBucketOwner(name.to_string()));
        Ok(self.bucket_owner(name))
    }

    async fn change_bucket_owner(&self, name: &str, owner: &str) -> Result<(), BackendError> {
        self.record(Call::ChangeBucketOwner(name.to_string(), owner.to_string()));
        if let Some(current) = self.state.lock().unwrap().buckets.get_mut(name) {
            *current = Some(owner.to_string());
        }
        Ok(())
    }

    async fn user_exists(&self, access_key: &str) -> Result<bool, BackendError> {
        self.record(Call::UserExists(access_key.to_string()));
        Ok(self.has_user(access_key))
    }

    async fn create_user(
        &self,
        access_key: &str,
        secret_key: &str,
        role: Option<&str>,
        user_id: Option<i64>,
        group_id: Option<i64>,
    ) -> Result<(), BackendError> {
        self.record(Call::CreateUser {
            access: access_key.to_string(),
            secret: secret_key.to_string(),
            role: role.map(str::to_string),
            user_id,
            group_id,
        });
        let mut state = self.state.lock().unwrap();
        if state.failing_create_user > 0 {
            state.failing_create_user -= 1;
            return Err(BackendError::OperationFailed {
                operation: "create_user",
                reason: "injected failure".to_string(),
            });
        }
        state.users.insert(access_key.to_string());
        Ok(())
    }

    async fn update_user(
        &self,
        access_key: &str,
        secret_key: Option<&str>,
        user_id: Option<i64>,
        group_id: Option<i64>,
    ) -> Result<(), BackendError> {
        self.record(Call::UpdateUser {
            access: access_key.to_string(),
            secret: secret_key.map(str::to_string),
            user_id,
            group_id,
        });
        Ok(())
    }

    async fn delete_user(&self, access_key: &str) -> Result<(), BackendError> {
        self.record(Call::DeleteUser(access_key.to_string()));
        self.state.lock().unwrap().users.remove(access_key);
        Ok(())
    }

    async fn test_connection(&self) -> Result<(), BackendError> {
        self.record(Call::TestConnection);
        Ok(())
    }

    fn endpoint_url(&self) -> &str {
        &self.endpoint_url
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

/// One scripted response to `RecordSource::watch`
#[derive(Debug)]
pub enum WatchScript {
    /// Stream these items, then end
    Events(Vec<Result<RecordEvent, SourceError>>),
    /// Fail to open the stream
    OpenError(String),
}

/// Counts a stream as closed when the stream owning it is dropped
#[derive(Debug)]
struct DropCounter(Arc<AtomicUsize>);

impl Drop for DropCounter {
    fn drop(&mut self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

/// Record source driven by a fixed script
///
/// Once the watch script is exhausted the source triggers `shutdown` (when
/// set) and hands out streams that never yield.
#[derive(Debug)]
pub struct ScriptedSource {
    list: Mutex<Option<Result<Vec<AnnotatedRecord>, String>>>,
    watches: Mutex<VecDeque<WatchScript>>,
    watch_calls: AtomicUsize,
    streams_dropped: Arc<AtomicUsize>,
    shutdown_when_exhausted: Option<ShutdownSignal>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self {
            list: Mutex::new(None),
            watches: Mutex::new(VecDeque::new()),
            watch_calls: AtomicUsize::new(0),
            streams_dropped: Arc::new(AtomicUsize::new(0)),
            shutdown_when_exhausted: None,
        }
    }

    pub fn with_list(self, records: Vec<AnnotatedRecord>) -> Self {
        *self.list.lock().unwrap() = Some(Ok(records));
        self
    }

    pub fn with_list_error(self, message: &str) -> Self {
        *self.list.lock().unwrap() = Some(Err(message.to_string()));
        self
    }

    pub fn with_watch(self, script: WatchScript) -> Self {
        self.watches.lock().unwrap().push_back(script);
        self
    }

    pub fn with_events(self, events: Vec<RecordEvent>) -> Self {
        self.with_watch(WatchScript::Events(events.into_iter().map(Ok).collect()))
    }

    pub fn shutdown_when_exhausted(mut self, shutdown: ShutdownSignal) -> Self {
        self.shutdown_when_exhausted = Some(shutdown);
        self
    }

    pub fn watch_calls(&self) -> usize {
        self.watch_calls.load(Ordering::SeqCst)
    }

    /// Streams handed out by `watch` that have since been dropped
    pub fn streams_dropped(&self) -> usize {
        self.streams_dropped.load(Ordering::SeqCst)
    }

    fn guarded(&self, stream: RecordEventStream) -> RecordEventStream {
        let counter = DropCounter(Arc::clone(&self.streams_dropped));
        stream
            .map(move |item| {
                let _open = &counter;
                item
            })
            .boxed()
    }
}

#[async_trait]
impl RecordSource for ScriptedSource {
    async fn list_annotated(&self, annotation_key: &str) -> Result<Vec<AnnotatedRecord>, SourceError> {
        match self.list.lock().unwrap().clone() {
            Some(Ok(records)) => Ok(records
                .into_iter()
                .filter(|record| record.has_annotation(annotation_key))
                .collect()),
            Some(Err(message)) => Err(SourceError::Watch(message)),
            None => Ok(Vec::new()),
        }
    }

    async fn watch(&self, _idle_timeout: Duration) -> Result<RecordEventStream, SourceError> {
        self.watch_calls.fetch_add(1, Ordering::SeqCst);
        let next = self.watches.lock().unwrap().pop_front();
        match next {
            Some(WatchScript::Events(items)) => Ok(self.guarded(stream::iter(items).boxed())),
            Some(WatchScript::OpenError(message)) => Err(SourceError::Watch(message)),
            None => {
                if let Some(shutdown) = &self.shutdown_when_exhausted {
                    shutdown.trigger();
                }
                Ok(self.guarded(stream::pending().boxed()))
            }
        }
    }
}

/// Record carrying the opt-in annotation and the given data
pub fn annotated_record(name: &str, version: Option<&str>, entries: &[(&str, &str)]) -> AnnotatedRecord {
    let mut record = AnnotatedRecord::new("default", name).with_annotation(ANNOTATION, "true");
    record.resource_version = version.map(str::to_string);
    record.data = entries
        .iter()
        .map(|(k, v)| ((*k).to_string(), v.as_bytes().to_vec()))
        .collect::<BTreeMap<_, _>>();
    record
}

/// The canonical `b1`/`u1`/`p1` record
pub fn bucket_record(name: &str, version: Option<&str>) -> AnnotatedRecord {
    annotated_record(
        name,
        version,
        &[("bucket-name", "b1"), ("access-key", "u1"), ("secret-key", "p1")],
    )
}

pub fn event(kind: EventKind, record: AnnotatedRecord) -> RecordEvent {
    RecordEvent::new(kind, record)
}

pub fn reconciler(backend: &Arc<MockBackend>, enforce_endpoint_check: bool) -> (Reconciler, Arc<Metrics>) {
    let metrics = Arc::new(Metrics::new().unwrap());
    let backend: Arc<dyn Backend> = Arc::clone(backend) as Arc<dyn Backend>;
    (
        Reconciler::new(backend, Arc::clone(&metrics), enforce_endpoint_check),
        metrics,
    )
}

/// Controller config with no reconnect delay
pub fn fast_config() -> ControllerConfig {
    ControllerConfig {
        watch_reconnect_delay_secs: 0,
        ..ControllerConfig::default()
    }
}

pub fn control_loop(
    source: &Arc<ScriptedSource>,
    backend: &Arc<MockBackend>,
    shutdown: &ShutdownSignal,
) -> (ControlLoop, Arc<Metrics>) {
    let (reconciler, metrics) = reconciler(backend, true);
    let source: Arc<dyn RecordSource> = Arc::clone(source) as Arc<dyn RecordSource>;
    (
        ControlLoop::new(source, Arc::new(reconciler), shutdown.clone(), &fast_config()),
        metrics,
    )
}
