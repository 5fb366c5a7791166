//! Dashboard state controller.
//!
//! Owns the search text, filters, pagination and the latest fetch outcome. Every
//! change to the effective snapshot (the snapshot with the debounced search text)
//! mirrors the snapshot into the URL and issues exactly one fetch. A newer fetch
//! aborts the in-flight one, and completions carrying an old generation are dropped,
//! so only the most recently issued request can reach the view.

use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::auth::AuthContext;
use crate::config::Config;
use crate::datastore::TaskSource;
use crate::debounce::Debounce;
use crate::filter::{
    CategoryFilter, DEFAULT_PAGE, DEFAULT_PAGE_SIZE, FilterSnapshot, PaginatedResult,
    PriorityFilter, StatusFilter,
};
use crate::task::Task;
use crate::url_state;

pub const DEFAULT_SEARCH_DEBOUNCE: Duration = Duration::from_millis(500);
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_millis(5000);
pub const FALLBACK_ERROR: &str = "Failed to load data";

/// Receives the query string each time the dashboard state changes.
pub trait Navigator: Send + Sync {
    fn push_query(&self, query: &str);
}

/// Keeps every pushed query, newest last.
#[derive(Debug, Default)]
pub struct MemoryNavigator {
    history: Mutex<Vec<String>>,
}

impl MemoryNavigator {
    pub fn history(&self) -> Vec<String> {
        self.history.lock().clone()
    }

    pub fn current(&self) -> Option<String> {
        self.history.lock().last().cloned()
    }
}

impl Navigator for MemoryNavigator {
    fn push_query(&self, query: &str) {
        self.history.lock().push(query.to_string());
    }
}

#[derive(Debug, Clone)]
pub struct DashboardSettings {
    pub search_debounce: Duration,
    /// Zero disables the timeout.
    pub fetch_timeout: Duration,
    pub default_page_size: u32,
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self {
            search_debounce: DEFAULT_SEARCH_DEBOUNCE,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            default_page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl DashboardSettings {
    pub fn from_config(cfg: &Config) -> anyhow::Result<Self> {
        let default_page_size = match cfg.get_u64("dashboard.page_size")? {
            Some(size) => u32::try_from(size)
                .ok()
                .filter(|size| *size >= 1)
                .ok_or_else(|| {
                    anyhow!("dashboard.page_size must be a positive integer, got {size}")
                })?,
            None => DEFAULT_PAGE_SIZE,
        };

        Ok(Self {
            search_debounce: cfg
                .get_millis("dashboard.search_debounce_ms", DEFAULT_SEARCH_DEBOUNCE)?,
            fetch_timeout: cfg.get_millis("dashboard.fetch_timeout_ms", DEFAULT_FETCH_TIMEOUT)?,
            default_page_size,
        })
    }

    /// The snapshot a fresh dashboard starts from, and the baseline URL sync omits.
    pub fn defaults(&self) -> FilterSnapshot {
        FilterSnapshot {
            page_size: self.default_page_size,
            ..FilterSnapshot::default()
        }
    }
}

/// Everything a renderer needs, published after every state change.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardView {
    /// The search box contents, ahead of the debounced value.
    pub search: String,
    /// The snapshot the current result was (or is being) fetched for.
    pub snapshot: FilterSnapshot,
    pub result: Option<PaginatedResult<Task>>,
    pub loading: bool,
    pub error: Option<String>,
    pub authenticated: bool,
    pub search_pending: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Phase<'a> {
    LoginRequired,
    Loading,
    Failed(&'a str),
    Empty,
    Ready(&'a PaginatedResult<Task>),
    Idle,
}

impl DashboardView {
    pub fn phase(&self) -> Phase<'_> {
        if !self.authenticated {
            return Phase::LoginRequired;
        }
        if self.loading {
            return Phase::Loading;
        }
        if let Some(message) = self.error.as_deref() {
            return Phase::Failed(message);
        }
        match &self.result {
            Some(result) if result.data.is_empty() => Phase::Empty,
            Some(result) => Phase::Ready(result),
            None => Phase::Idle,
        }
    }
}

struct ControllerState {
    search: String,
    debounced_search: String,
    status: StatusFilter,
    priority: PriorityFilter,
    category: CategoryFilter,
    page: u32,
    page_size: u32,
    result: Option<PaginatedResult<Task>>,
    loading: bool,
    error: Option<String>,
    generation: u64,
    in_flight: Option<JoinHandle<()>>,
    last_effective: Option<FilterSnapshot>,
}

impl ControllerState {
    fn seeded(snapshot: FilterSnapshot) -> Self {
        Self {
            debounced_search: snapshot.search.clone(),
            search: snapshot.search,
            status: snapshot.status,
            priority: snapshot.priority,
            category: snapshot.category,
            page: snapshot.page,
            page_size: snapshot.page_size,
            result: None,
            loading: true,
            error: None,
            generation: 0,
            in_flight: None,
            last_effective: None,
        }
    }

    fn effective(&self) -> FilterSnapshot {
        FilterSnapshot {
            search: self.debounced_search.clone(),
            status: self.status.clone(),
            priority: self.priority.clone(),
            category: self.category.clone(),
            page: self.page,
            page_size: self.page_size,
        }
    }

    fn view(&self, authenticated: bool) -> DashboardView {
        DashboardView {
            search: self.search.clone(),
            snapshot: self.effective(),
            result: self.result.clone(),
            loading: self.loading,
            error: self.error.clone(),
            authenticated,
            search_pending: self.search != self.debounced_search,
        }
    }
}

struct Inner<S> {
    source: Arc<S>,
    auth: AuthContext,
    navigator: Arc<dyn Navigator>,
    settings: DashboardSettings,
    state: Mutex<ControllerState>,
    view_tx: watch::Sender<DashboardView>,
}

impl<S: TaskSource> Inner<S> {
    fn publish(&self, state: &ControllerState) {
        self.view_tx
            .send_replace(state.view(self.auth.is_authenticated()));
    }

    fn update<F>(self: &Arc<Self>, mutate: F)
    where
        F: FnOnce(&mut ControllerState),
    {
        mutate(&mut self.state.lock());
        self.reconcile();
    }

    /// Syncs the URL and fetches if the effective snapshot moved since the last sync.
    fn reconcile(self: &Arc<Self>) {
        let mut state = self.state.lock();
        let effective = state.effective();

        if state.last_effective.as_ref() != Some(&effective) {
            let query = url_state::encode_with(&effective, &self.settings.defaults());
            debug!(query = %query, "syncing dashboard state to URL");
            self.navigator.push_query(&query);

            state.last_effective = Some(effective.clone());
            self.issue_fetch(&mut state, effective);
        }

        self.publish(&state);
    }

    fn issue_fetch(self: &Arc<Self>, state: &mut ControllerState, snapshot: FilterSnapshot) {
        if let Some(previous) = state.in_flight.take() {
            debug!(generation = state.generation, "superseding in-flight fetch");
            previous.abort();
        }
        state.generation += 1;

        if !self.auth.is_authenticated() {
            debug!("no session; skipping fetch");
            state.loading = false;
            return;
        }

        let generation = state.generation;
        state.loading = true;
        state.error = None;

        let inner = Arc::clone(self);
        let timeout = self.settings.fetch_timeout;
        state.in_flight = Some(tokio::spawn(async move {
            let fetch = inner.source.fetch(snapshot);
            let outcome = if timeout.is_zero() {
                fetch.await
            } else {
                match tokio::time::timeout(timeout, fetch).await {
                    Ok(outcome) => outcome,
                    Err(_) => Err(anyhow!(
                        "Request timed out after {} ms",
                        timeout.as_millis()
                    )),
                }
            };
            inner.complete(generation, outcome);
        }));
    }

    fn complete(&self, generation: u64, outcome: anyhow::Result<PaginatedResult<Task>>) {
        let mut state = self.state.lock();
        if generation != state.generation {
            debug!(
                generation,
                current = state.generation,
                "discarding stale fetch result"
            );
            return;
        }

        state.in_flight = None;
        state.loading = false;
        match outcome {
            Ok(result) => {
                debug!(
                    generation,
                    total = result.total,
                    returned = result.data.len(),
                    "fetch completed"
                );
                state.result = Some(result);
                state.error = None;
            }
            Err(err) => {
                let message = err.to_string();
                warn!(generation, error = %format!("{err:#}"), "fetch failed");
                state.error = Some(if message.trim().is_empty() {
                    FALLBACK_ERROR.to_string()
                } else {
                    message
                });
            }
        }

        self.publish(&state);
    }

    /// Ignores windows whose value the search box has already moved past.
    fn apply_debounced(self: &Arc<Self>, value: String) {
        {
            let state = self.state.lock();
            if state.search != value {
                debug!(stale = %value, current = %state.search, "ignoring superseded search window");
                return;
            }
        }
        self.update(|state| state.debounced_search = value);
    }
}

pub struct DashboardController<S> {
    inner: Arc<Inner<S>>,
    debounce: Debounce<String>,
}

impl<S: TaskSource> DashboardController<S> {
    /// Seeds state from `location` (a query string or a path carrying one), syncs the URL
    /// and issues the first fetch. Must be called within a tokio runtime.
    #[tracing::instrument(skip(source, auth, navigator, settings))]
    pub fn mount(
        source: Arc<S>,
        auth: AuthContext,
        navigator: Arc<dyn Navigator>,
        settings: DashboardSettings,
        location: &str,
    ) -> Self {
        let seeded = url_state::decode_with(location, settings.defaults());
        info!(
            authenticated = auth.is_authenticated(),
            seeded = %url_state::encode(&seeded),
            "mounting dashboard"
        );

        let state = ControllerState::seeded(seeded);
        let (view_tx, _rx) = watch::channel(state.view(auth.is_authenticated()));
        let search_debounce = settings.search_debounce;
        let initial_search = state.search.clone();

        let inner = Arc::new(Inner {
            source,
            auth,
            navigator,
            settings,
            state: Mutex::new(state),
            view_tx,
        });

        let debounce = {
            let inner = Arc::clone(&inner);
            Debounce::with_callback(initial_search, search_debounce, move |value| {
                inner.apply_debounced(value)
            })
        };

        inner.reconcile();
        Self { inner, debounce }
    }

    /// Updates the search box immediately; the fetch follows the debounced value.
    pub fn set_search(&self, text: impl Into<String>) {
        let text = text.into();
        {
            // Held across the restart so a window that fires meanwhile sees the new text.
            let mut state = self.inner.state.lock();
            state.search = text.clone();
            state.page = DEFAULT_PAGE;
            self.debounce.set(text);
        }
        self.inner.reconcile();
    }

    pub fn set_status(&self, status: StatusFilter) {
        self.inner.update(|state| {
            state.status = status;
            state.page = DEFAULT_PAGE;
        });
    }

    pub fn set_priority(&self, priority: PriorityFilter) {
        self.inner.update(|state| {
            state.priority = priority;
            state.page = DEFAULT_PAGE;
        });
    }

    pub fn set_category(&self, category: CategoryFilter) {
        self.inner.update(|state| {
            state.category = category;
            state.page = DEFAULT_PAGE;
        });
    }

    pub fn set_page(&self, page: u32) {
        self.inner.update(|state| state.page = page.max(DEFAULT_PAGE));
    }

    /// Zero falls back to the default page size.
    pub fn set_page_size(&self, page_size: u32) {
        let page_size = if page_size == 0 {
            self.inner.settings.default_page_size
        } else {
            page_size
        };
        self.inner.update(|state| {
            state.page_size = page_size;
            state.page = DEFAULT_PAGE;
        });
    }

    /// Fetches the current snapshot again without touching any filter.
    pub fn refresh(&self) {
        let mut state = self.inner.state.lock();
        let effective = state.effective();
        self.inner.issue_fetch(&mut state, effective);
        self.inner.publish(&state);
    }

    /// Re-evaluates the session: fetches when one is present, otherwise clears loading.
    pub fn session_changed(&self) {
        debug!(
            authenticated = self.inner.auth.is_authenticated(),
            "session changed"
        );
        self.refresh();
    }

    pub fn categories(&self) -> Vec<String> {
        self.inner.source.categories()
    }

    pub fn view(&self) -> DashboardView {
        self.inner.view_tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<DashboardView> {
        self.inner.view_tx.subscribe()
    }

    /// Waits until no debounce window is open and no fetch is in flight.
    pub async fn settled(&self) -> anyhow::Result<DashboardView> {
        let mut rx = self.subscribe();
        let view = rx
            .wait_for(|view| !view.loading && !view.search_pending)
            .await
            .map_err(|_| anyhow!("dashboard controller shut down"))?;
        Ok(view.clone())
    }
}

impl<S> Drop for DashboardController<S> {
    fn drop(&mut self) {
        if let Some(handle) = self.inner.state.lock().in_flight.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use anyhow::bail;
    use tokio::time::sleep;

    use super::{DashboardController, DashboardSettings, MemoryNavigator, Phase};
    use crate::auth::AuthContext;
    use crate::datastore::{MockDataStore, TaskSource};
    use crate::filter::{Choice, FilterSnapshot, PaginatedResult};
    use crate::storage::MemoryStorage;
    use crate::task::{Priority, Status, Task};

    struct ScriptedSource {
        store: MockDataStore,
        calls: AtomicUsize,
        failures_left: AtomicUsize,
        latency: fn(&FilterSnapshot) -> Duration,
    }

    impl ScriptedSource {
        fn new(latency: fn(&FilterSnapshot) -> Duration) -> Arc<Self> {
            Arc::new(Self {
                store: MockDataStore::fixture().unwrap(),
                calls: AtomicUsize::new(0),
                failures_left: AtomicUsize::new(0),
                latency,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl TaskSource for ScriptedSource {
        async fn fetch(&self, filters: FilterSnapshot) -> anyhow::Result<PaginatedResult<Task>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            sleep((self.latency)(&filters)).await;
            if self
                .failures_left
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                bail!("backend unavailable");
            }
            Ok(self.store.query_now(&filters))
        }

        fn categories(&self) -> Vec<String> {
            self.store.categories()
        }
    }

    fn steady(_: &FilterSnapshot) -> Duration {
        Duration::from_millis(800)
    }

    async fn signed_in() -> AuthContext {
        let auth = AuthContext::new(Arc::new(MemoryStorage::default()), Duration::ZERO);
        auth.login("admin@example.com", "admin123").await.unwrap();
        auth
    }

    fn signed_out() -> AuthContext {
        let auth = AuthContext::new(Arc::new(MemoryStorage::default()), Duration::ZERO);
        auth.restore_session();
        auth
    }

    fn mount(
        source: &Arc<ScriptedSource>,
        auth: AuthContext,
        location: &str,
    ) -> (DashboardController<ScriptedSource>, Arc<MemoryNavigator>) {
        let navigator = Arc::new(MemoryNavigator::default());
        let controller = DashboardController::mount(
            Arc::clone(source),
            auth,
            navigator.clone(),
            DashboardSettings::default(),
            location,
        );
        (controller, navigator)
    }

    #[tokio::test(start_paused = true)]
    async fn mount_seeds_from_the_url_and_fetches_once() {
        let source = ScriptedSource::new(steady);
        let (controller, navigator) =
            mount(&source, signed_in().await, "/dashboard?status=completed&page=1");

        assert!(controller.view().loading);
        let view = controller.settled().await.unwrap();

        assert_eq!(source.calls(), 1);
        assert_eq!(navigator.history(), vec!["status=completed"]);
        let result = view.result.unwrap();
        assert_eq!(result.total, 2);
        assert!(result.data.iter().all(|t| t.status == Status::Completed));
        assert_eq!((result.page, result.page_size), (1, 10));
    }

    #[tokio::test(start_paused = true)]
    async fn filter_setters_reset_the_page_and_set_page_does_not() {
        let source = ScriptedSource::new(steady);
        let (controller, _) = mount(&source, signed_in().await, "");

        controller.set_page_size(5);
        controller.set_page(2);
        controller.set_priority(Choice::Only(Priority::Medium));
        assert_eq!(controller.view().snapshot.page, 1);

        controller.set_page(2);
        controller.set_category(Choice::Only("DevOps".to_string()));
        assert_eq!(controller.view().snapshot.page, 1);

        controller.set_page(3);
        controller.set_status(Choice::Only(Status::Pending));
        assert_eq!(controller.view().snapshot.page, 1);

        controller.set_page(4);
        let snapshot = controller.view().snapshot;
        assert_eq!(snapshot.page, 4);
        assert_eq!(snapshot.status, Choice::Only(Status::Pending));
        assert_eq!(snapshot.priority, Choice::Only(Priority::Medium));
        assert_eq!(snapshot.category, Choice::Only("DevOps".to_string()));
        assert_eq!(snapshot.page_size, 5);

        controller.set_page_size(20);
        assert_eq!(controller.view().snapshot.page, 1);
        assert_eq!(controller.view().snapshot.page_size, 20);

        controller.set_page(2);
        controller.set_search("x");
        assert_eq!(controller.view().snapshot.page, 1);
        assert_eq!(controller.view().search, "x");
    }

    #[tokio::test(start_paused = true)]
    async fn search_fetches_only_after_the_debounce_window() {
        let source = ScriptedSource::new(steady);
        let (controller, navigator) = mount(&source, signed_in().await, "");
        controller.settled().await.unwrap();
        assert_eq!(source.calls(), 1);

        for text in ["a", "au", "aut", "auth"] {
            controller.set_search(text);
            sleep(Duration::from_millis(100)).await;
        }
        let view = controller.view();
        assert!(view.search_pending);
        assert_eq!(view.snapshot.search, "");
        assert_eq!(source.calls(), 1);

        let view = controller.settled().await.unwrap();
        assert_eq!(source.calls(), 2);
        assert_eq!(view.snapshot.search, "auth");
        assert_eq!(navigator.current().as_deref(), Some("search=auth"));
        let ids: Vec<_> = view
            .result
            .unwrap()
            .data
            .into_iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(ids, vec!["1"]);
    }

    #[tokio::test(start_paused = true)]
    async fn only_the_latest_fetch_reaches_the_view() {
        fn completed_is_slow(filters: &FilterSnapshot) -> Duration {
            if filters.status == Choice::Only(Status::Completed) {
                Duration::from_millis(3000)
            } else {
                Duration::from_millis(100)
            }
        }

        let source = ScriptedSource::new(completed_is_slow);
        let (controller, _) = mount(&source, signed_in().await, "");
        controller.settled().await.unwrap();

        controller.set_status(Choice::Only(Status::Completed));
        sleep(Duration::from_millis(10)).await;
        controller.set_status(Choice::Only(Status::Active));

        let view = controller.settled().await.unwrap();
        sleep(Duration::from_millis(5000)).await;
        let later = controller.view();

        assert_eq!(view, later);
        let result = later.result.unwrap();
        assert!(result.data.iter().all(|t| t.status == Status::Active));
        assert_eq!(result.total, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn signed_out_dashboard_never_fetches() {
        let source = ScriptedSource::new(steady);
        let (controller, navigator) = mount(&source, signed_out(), "?priority=high");

        let view = controller.view();
        assert!(!view.loading);
        assert_eq!(view.phase(), Phase::LoginRequired);

        controller.set_status(Choice::Only(Status::Active));
        controller.refresh();
        sleep(Duration::from_millis(2000)).await;

        assert_eq!(source.calls(), 0);
        assert!(!controller.view().loading);
        assert_eq!(
            navigator.history(),
            vec!["priority=high", "status=active&priority=high"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn signing_in_later_triggers_a_fetch() {
        let source = ScriptedSource::new(steady);
        let auth = signed_out();
        let (controller, _) = mount(&source, auth.clone(), "");
        assert_eq!(source.calls(), 0);

        auth.login("user@example.com", "user123").await.unwrap();
        controller.session_changed();
        let view = controller.settled().await.unwrap();

        assert_eq!(source.calls(), 1);
        assert_eq!(view.result.unwrap().total, 10);
    }

    #[tokio::test(start_paused = true)]
    async fn failures_surface_an_error_and_refresh_retries() {
        let source = ScriptedSource::new(steady);
        source.failures_left.store(1, Ordering::SeqCst);
        let (controller, _) = mount(&source, signed_in().await, "");

        let failed = controller.settled().await.unwrap();
        assert_eq!(failed.phase(), Phase::Failed("backend unavailable"));

        controller.refresh();
        assert!(controller.view().error.is_none());
        assert!(controller.view().loading);

        let recovered = controller.settled().await.unwrap();
        assert!(recovered.error.is_none());
        assert!(matches!(recovered.phase(), Phase::Ready(result) if result.total == 10));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_fetches_time_out() {
        fn glacial(_: &FilterSnapshot) -> Duration {
            Duration::from_secs(60)
        }

        let source = ScriptedSource::new(glacial);
        let navigator = Arc::new(MemoryNavigator::default());
        let settings = DashboardSettings {
            fetch_timeout: Duration::from_millis(1000),
            ..DashboardSettings::default()
        };
        let controller = DashboardController::mount(
            Arc::clone(&source),
            signed_in().await,
            navigator,
            settings,
            "",
        );

        let view = controller.settled().await.unwrap();
        let message = view.error.unwrap();
        assert!(message.contains("timed out"), "{message}");
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_is_idempotent() {
        let source = ScriptedSource::new(steady);
        let (controller, navigator) = mount(&source, signed_in().await, "?page=2&pageSize=5");
        let first = controller.settled().await.unwrap();

        controller.refresh();
        let second = controller.settled().await.unwrap();
        controller.refresh();
        let third = controller.settled().await.unwrap();

        assert_eq!(first.result, second.result);
        assert_eq!(second.result, third.result);
        assert_eq!(source.calls(), 3);
        assert_eq!(navigator.history().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn page_beyond_the_end_is_empty_not_an_error() {
        let source = ScriptedSource::new(steady);
        let (controller, navigator) = mount(&source, signed_in().await, "");

        controller.set_page(100);
        let view = controller.settled().await.unwrap();

        assert_eq!(view.phase(), Phase::Empty);
        let result = view.result.unwrap();
        assert_eq!(result.total, 10);
        assert_eq!(result.total_pages, 1);
        assert_eq!(navigator.current().as_deref(), Some("page=100"));
    }

    #[tokio::test(start_paused = true)]
    async fn any_positive_page_size_is_kept_as_given() {
        let source = ScriptedSource::new(steady);
        let (controller, navigator) = mount(&source, signed_in().await, "?pageSize=3");
        let view = controller.settled().await.unwrap();
        assert_eq!(view.snapshot.page_size, 3);
        assert_eq!(navigator.current().as_deref(), Some("pageSize=3"));
        let result = view.result.unwrap();
        assert_eq!((result.data.len(), result.total_pages), (3, 4));

        controller.set_page(2);
        controller.set_page_size(200);
        let view = controller.settled().await.unwrap();
        assert_eq!((view.snapshot.page, view.snapshot.page_size), (1, 200));
        assert_eq!(navigator.current().as_deref(), Some("pageSize=200"));
        assert_eq!(view.result.unwrap().data.len(), 10);

        controller.set_page_size(0);
        assert_eq!(controller.view().snapshot.page_size, 10);
        assert_eq!(navigator.current().as_deref(), Some(""));
    }

    #[tokio::test(start_paused = true)]
    async fn a_window_for_superseded_text_is_ignored() {
        let source = ScriptedSource::new(steady);
        let (controller, navigator) = mount(&source, signed_in().await, "");
        controller.settled().await.unwrap();

        controller.set_search("auth");
        controller.inner.apply_debounced("au".to_string());
        assert_eq!(controller.view().snapshot.search, "");
        assert_eq!(navigator.history(), vec![""]);

        let view = controller.settled().await.unwrap();
        assert_eq!(view.snapshot.search, "auth");
        assert_eq!(source.calls(), 2);
        assert_eq!(navigator.history(), vec!["", "search=auth"]);
    }

    #[tokio::test(start_paused = true)]
    async fn categories_come_from_the_source() {
        let source = ScriptedSource::new(steady);
        let (controller, _) = mount(&source, signed_out(), "");
        assert_eq!(controller.categories().len(), 8);
    }
}
