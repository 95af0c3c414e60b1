//! Idempotent ClusterOperator writer
//!
//! `write` reads the current object (creating it if needed), derives the new
//! status and only issues an update when the status actually differs. There is
//! no retry here: a failed write is reported to the caller and the next watch
//! event or resync for the same CSV tries again.

use crate::controller::notification::NotificationContext;
use crate::controller::reporter::Reporter;
use crate::crd::clusteroperator::ClusterOperator;
use crate::server::SharedMetrics;
use async_trait::async_trait;
use kube::api::{Api, Patch, PatchParams, PostParams};
use kube::ResourceExt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// API group/version the ClusterOperator resource is served under
pub const CLUSTER_OPERATOR_API_VERSION: &str = "config.openshift.io/v1";

#[derive(Debug, Error)]
pub enum WriterError {
    #[error("Kubernetes API error: {0}")]
    KubeError(#[from] kube::Error),

    #[error("ClusterOperator API returned {code}: {message}")]
    Api { code: u16, message: String },

    #[error("Failed to serialize ClusterOperator status: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("ClusterOperator missing name")]
    MissingName,
}

/// The three ClusterOperator operations plus an API presence probe
///
/// Production code uses `KubeClusterOperatorClient`. Tests use
/// `MockClusterOperatorClient` which keeps objects in memory and counts calls.
#[async_trait]
pub trait ClusterOperatorClient: Send + Sync {
    /// Fetch by name, `Ok(None)` if it does not exist
    async fn get(&self, name: &str) -> Result<Option<ClusterOperator>, WriterError>;

    async fn create(&self, co: &ClusterOperator) -> Result<ClusterOperator, WriterError>;

    /// Write `co.status`; must fail if `co` carries a stale resourceVersion
    async fn update_status(&self, co: &ClusterOperator) -> Result<ClusterOperator, WriterError>;

    /// Whether the cluster serves `config.openshift.io/v1`
    async fn is_api_available(&self) -> Result<bool, WriterError>;
}

pub struct KubeClusterOperatorClient {
    client: kube::Client,
}

impl KubeClusterOperatorClient {
    pub fn new(client: kube::Client) -> Self {
        KubeClusterOperatorClient { client }
    }

    fn api(&self) -> Api<ClusterOperator> {
        Api::all(self.client.clone())
    }
}

/// Keep the status code of API server rejections, wrap everything else
fn api_error(error: kube::Error) -> WriterError {
    match error {
        kube::Error::Api(err) => WriterError::Api {
            code: err.code,
            message: err.message.clone(),
        },
        other => WriterError::KubeError(other),
    }
}

#[async_trait]
impl ClusterOperatorClient for KubeClusterOperatorClient {
    async fn get(&self, name: &str) -> Result<Option<ClusterOperator>, WriterError> {
        match self.api().get(name).await {
            Ok(co) => Ok(Some(co)),
            Err(kube::Error::Api(err)) if err.code == 404 => Ok(None),
            Err(e) => Err(api_error(e)),
        }
    }

    async fn create(&self, co: &ClusterOperator) -> Result<ClusterOperator, WriterError> {
        self.api()
            .create(&PostParams::default(), co)
            .await
            .map_err(api_error)
    }

    async fn update_status(&self, co: &ClusterOperator) -> Result<ClusterOperator, WriterError> {
        let name = co.metadata.name.as_deref().ok_or(WriterError::MissingName)?;

        let mut patch = serde_json::json!({ "status": serde_json::to_value(&co.status)? });
        // With resourceVersion in the body the API server answers 409 if the
        // object changed since we read it.
        if let Some(resource_version) = co.resource_version() {
            patch["metadata"] = serde_json::json!({ "resourceVersion": resource_version });
        }

        self.api()
            .patch_status(name, &PatchParams::default(), &Patch::Merge(&patch))
            .await
            .map_err(api_error)
    }

    async fn is_api_available(&self) -> Result<bool, WriterError> {
        match self
            .client
            .list_api_group_resources(CLUSTER_OPERATOR_API_VERSION)
            .await
        {
            Ok(list) => Ok(list.resources.iter().any(|r| r.name == "clusteroperators")),
            Err(kube::Error::Api(err)) if err.code == 404 => Ok(false),
            Err(e) => Err(api_error(e)),
        }
    }
}

/// What `StatusWriter::write` ended up doing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Updated,
    Unchanged,
}

impl WriteOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            WriteOutcome::Updated => "updated",
            WriteOutcome::Unchanged => "unchanged",
        }
    }
}

pub struct StatusWriter {
    client: Arc<dyn ClusterOperatorClient>,
    reporter: Reporter,
    metrics: Option<SharedMetrics>,
}

impl StatusWriter {
    pub fn new(
        client: Arc<dyn ClusterOperatorClient>,
        reporter: Reporter,
        metrics: Option<SharedMetrics>,
    ) -> Self {
        StatusWriter {
            client,
            reporter,
            metrics,
        }
    }

    pub async fn is_api_available(&self) -> Result<bool, WriterError> {
        self.client.is_api_available().await
    }

    /// Return the named ClusterOperator, creating a seeded one if missing
    pub async fn ensure_exists(&self, name: &str) -> Result<ClusterOperator, WriterError> {
        if let Some(existing) = self.client.get(name).await? {
            return Ok(existing);
        }

        let co = self.reporter.new_cluster_operator(name);
        let mut created = self.client.create(&co).await?;
        info!(clusteroperator = %name, "created initial clusteroperator");

        // The API server drops status on create when status is a subresource.
        if created.status != co.status {
            created.status = co.status;
            created = self.client.update_status(&created).await?;
        }

        Ok(created)
    }

    /// Bring the ClusterOperator named in `context` up to date
    pub async fn write(&self, context: &NotificationContext) -> Result<WriteOutcome, WriterError> {
        let result = self.write_inner(context).await;

        if let Some(ref metrics) = self.metrics {
            match &result {
                Ok(outcome) => metrics.record_write(outcome.as_str()),
                Err(_) => metrics.record_write("error"),
            }
        }
        result
    }

    async fn write_inner(&self, context: &NotificationContext) -> Result<WriteOutcome, WriterError> {
        let mut existing = self.ensure_exists(&context.name).await?;

        let desired = self
            .reporter
            .expected_status(existing.status.as_ref(), context);

        if existing.status.as_ref() == Some(&desired) {
            debug!(clusteroperator = %context.name, "status unchanged, skipping update");
            return Ok(WriteOutcome::Unchanged);
        }

        existing.status = Some(desired);
        self.client.update_status(&existing).await?;
        info!(
            clusteroperator = %context.name,
            csv = %context.effective().name_any(),
            "updated clusteroperator status"
        );

        Ok(WriteOutcome::Updated)
    }
}

/// In-memory ClusterOperator store for tests
#[cfg(test)]
pub struct MockClusterOperatorClient {
    state: std::sync::Mutex<MockState>,
}

#[cfg(test)]
#[derive(Default)]
struct MockState {
    objects: std::collections::BTreeMap<String, ClusterOperator>,
    api_available: std::collections::VecDeque<bool>,
    fail_get: bool,
    fail_update: bool,
    drop_status_on_create: bool,
    get_calls: usize,
    create_calls: usize,
    update_calls: usize,
    probe_calls: usize,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
impl MockClusterOperatorClient {
    pub fn new() -> Self {
        MockClusterOperatorClient {
            state: std::sync::Mutex::new(MockState::default()),
        }
    }

    /// Probe results returned in order; the last one repeats, default true
    pub fn with_api_available(self, answers: &[bool]) -> Self {
        self.state.lock().unwrap().api_available = answers.iter().copied().collect();
        self
    }

    pub fn failing_get(self) -> Self {
        self.state.lock().unwrap().fail_get = true;
        self
    }

    pub fn failing_update(self) -> Self {
        self.state.lock().unwrap().fail_update = true;
        self
    }

    pub fn dropping_status_on_create(self) -> Self {
        self.state.lock().unwrap().drop_status_on_create = true;
        self
    }

    pub fn insert(&self, co: ClusterOperator) {
        self.state
            .lock()
            .unwrap()
            .objects
            .insert(co.name_any(), co);
    }

    pub fn object(&self, name: &str) -> Option<ClusterOperator> {
        self.state.lock().unwrap().objects.get(name).cloned()
    }

    pub fn get_calls(&self) -> usize {
        self.state.lock().unwrap().get_calls
    }

    pub fn create_calls(&self) -> usize {
        self.state.lock().unwrap().create_calls
    }

    pub fn update_calls(&self) -> usize {
        self.state.lock().unwrap().update_calls
    }

    pub fn probe_calls(&self) -> usize {
        self.state.lock().unwrap().probe_calls
    }

    fn api_error(code: u16, reason: &str) -> WriterError {
        WriterError::Api {
            code,
            message: format!("mock {}", reason),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
#[async_trait]
impl ClusterOperatorClient for MockClusterOperatorClient {
    async fn get(&self, name: &str) -> Result<Option<ClusterOperator>, WriterError> {
        let mut state = self.state.lock().unwrap();
        state.get_calls += 1;
        if state.fail_get {
            return Err(Self::api_error(500, "InternalError"));
        }
        Ok(state.objects.get(name).cloned())
    }

    async fn create(&self, co: &ClusterOperator) -> Result<ClusterOperator, WriterError> {
        let mut state = self.state.lock().unwrap();
        state.create_calls += 1;
        let name = co.metadata.name.clone().ok_or(WriterError::MissingName)?;
        if state.objects.contains_key(&name) {
            return Err(Self::api_error(409, "AlreadyExists"));
        }

        let mut created = co.clone();
        created.metadata.resource_version = Some("1".to_string());
        if state.drop_status_on_create {
            created.status = None;
        }
        state.objects.insert(name, created.clone());
        Ok(created)
    }

    async fn update_status(&self, co: &ClusterOperator) -> Result<ClusterOperator, WriterError> {
        let mut state = self.state.lock().unwrap();
        state.update_calls += 1;
        if state.fail_update {
            return Err(Self::api_error(500, "InternalError"));
        }
        let name = co.metadata.name.clone().ok_or(WriterError::MissingName)?;
        let Some(stored) = state.objects.get_mut(&name) else {
            return Err(Self::api_error(404, "NotFound"));
        };
        if stored.metadata.resource_version != co.metadata.resource_version {
            return Err(Self::api_error(409, "Conflict"));
        }

        let next: u64 = stored
            .metadata
            .resource_version
            .as_deref()
            .and_then(|rv| rv.parse().ok())
            .unwrap_or(0)
            + 1;
        stored.status = co.status.clone();
        stored.metadata.resource_version = Some(next.to_string());
        Ok(stored.clone())
    }

    async fn is_api_available(&self) -> Result<bool, WriterError> {
        let mut state = self.state.lock().unwrap();
        state.probe_calls += 1;
        let answer = match state.api_available.len() {
            0 => true,
            1 => state.api_available[0],
            _ => state.api_available.pop_front().unwrap(),
        };
        Ok(answer)
    }
}

#[cfg(test)]
#[path = "writer_test.rs"]
mod tests;
