use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, anyhow};
use tracing::{debug, info};

use crate::config::{Config, expand_tilde};
use crate::filter::{FilterSnapshot, PaginatedResult};
use crate::task::Task;

const FIXTURE_JSON: &str = include_str!("../fixtures/tasks.json");

pub const DEFAULT_QUERY_LATENCY: Duration = Duration::from_millis(800);

/// Anything the dashboard can fetch pages of tasks from.
pub trait TaskSource: Send + Sync + 'static {
    fn fetch(
        &self,
        filters: FilterSnapshot,
    ) -> impl Future<Output = anyhow::Result<PaginatedResult<Task>>> + Send;

    fn categories(&self) -> Vec<String>;
}

/// In-memory stand-in for a paginated search API.
#[derive(Debug, Clone)]
pub struct MockDataStore {
    tasks: Arc<[Task]>,
    latency: Duration,
}

impl MockDataStore {
    pub fn from_tasks(tasks: Vec<Task>) -> Self {
        Self {
            tasks: tasks.into(),
            latency: DEFAULT_QUERY_LATENCY,
        }
    }

    /// The built-in ten-record fixture.
    pub fn fixture() -> anyhow::Result<Self> {
        let tasks = parse_tasks(FIXTURE_JSON).context("failed parsing built-in fixture")?;
        Ok(Self::from_tasks(tasks))
    }

    #[tracing::instrument(skip(path))]
    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        debug!(file = %path.display(), "loading task fixture");
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed reading {}", path.display()))?;
        let tasks =
            parse_tasks(&raw).with_context(|| format!("failed parsing {}", path.display()))?;
        Ok(Self::from_tasks(tasks))
    }

    /// Builds the store `cfg` describes: `store.fixture` (if set) and `store.latency_ms`.
    #[tracing::instrument(skip(cfg))]
    pub fn open(cfg: &Config) -> anyhow::Result<Self> {
        let store = match cfg.get("store.fixture") {
            Some(path) => Self::from_json_file(&expand_tilde(Path::new(&path)))?,
            None => Self::fixture()?,
        };
        let latency = cfg.get_millis("store.latency_ms", DEFAULT_QUERY_LATENCY)?;

        info!(
            tasks = store.tasks.len(),
            latency_ms = latency.as_millis() as u64,
            "opened mock datastore"
        );
        Ok(store.with_latency(latency))
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn latency(&self) -> Duration {
        self.latency
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Runs the filter pipeline and pagination without the simulated latency.
    pub fn query_now(&self, filters: &FilterSnapshot) -> PaginatedResult<Task> {
        filters.apply(&self.tasks)
    }

    #[tracing::instrument(skip(self, filters), fields(page = filters.page, page_size = filters.page_size))]
    pub async fn query(&self, filters: &FilterSnapshot) -> PaginatedResult<Task> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let result = self.query_now(filters);
        debug!(
            total = result.total,
            returned = result.data.len(),
            total_pages = result.total_pages,
            "query answered"
        );
        result
    }

    /// Sorted distinct categories of the whole fixture, independent of any filter.
    pub fn categories(&self) -> Vec<String> {
        self.tasks
            .iter()
            .map(|task| task.category.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

impl TaskSource for MockDataStore {
    async fn fetch(&self, filters: FilterSnapshot) -> anyhow::Result<PaginatedResult<Task>> {
        Ok(self.query(&filters).await)
    }

    fn categories(&self) -> Vec<String> {
        MockDataStore::categories(self)
    }
}

fn parse_tasks(raw: &str) -> anyhow::Result<Vec<Task>> {
    let tasks: Vec<Task> = serde_json::from_str(raw)?;

    let mut seen = HashSet::with_capacity(tasks.len());
    for task in &tasks {
        if !seen.insert(task.id.as_str()) {
            return Err(anyhow!("duplicate task id: {}", task.id));
        }
    }

    Ok(tasks)
}
