use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::{json, Value};
use tokio::time::Instant;

use neo4j_conn::smoke::queries;
use neo4j_conn::{
    AccessMode, ConnectionConfig, Connector, DriverError, GraphDriver, Query, Record, Session,
    Transaction,
};

/// In-memory stand-in for the graph, understanding the smoke-test statements
/// plus any canned responses registered by a test.
#[derive(Debug, Clone, Default)]
pub struct FakeGraph {
    /// Tagged test nodes by id.
    pub test_nodes: HashMap<String, Record>,
    /// Metadata statuses linked from each tagged node.
    pub metadata: HashMap<String, Vec<String>>,
    /// Rows returned for any other statement, keyed by query text.
    pub canned: HashMap<String, Vec<Record>>,
}

impl FakeGraph {
    fn param(query: &Query, key: &str) -> String {
        query
            .params()
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    }

    pub fn apply(&mut self, query: &Query) -> Result<Vec<Record>, DriverError> {
        let id = Self::param(query, "id");
        match query.text() {
            queries::CREATE_TEST_NODE => {
                let node: Record = [
                    ("id", json!(id)),
                    ("name", json!(Self::param(query, "name"))),
                    ("created_at", json!(Self::param(query, "timestamp"))),
                ]
                .into_iter()
                .collect();
                self.test_nodes.insert(id.clone(), node);
                Ok(vec![[("id", json!(id))].into_iter().collect()])
            }
            queries::READ_TEST_NODE => {
                let Some(node) = self.test_nodes.get(&id) else {
                    return Ok(Vec::new());
                };
                let row: Record = ["name", "created_at"]
                    .into_iter()
                    .map(|key| (key, node.get(key).cloned().unwrap_or(Value::Null)))
                    .collect();
                Ok(vec![row])
            }
            queries::LINK_TEST_METADATA => {
                if !self.test_nodes.contains_key(&id) {
                    return Ok(Vec::new());
                }
                self.metadata.entry(id).or_default().push("OK".to_string());
                Ok(vec![[("status", json!("OK"))].into_iter().collect()])
            }
            queries::CLEANUP_TEST_NODES => {
                self.test_nodes.remove(&id);
                self.metadata.remove(&id);
                Ok(Vec::new())
            }
            other => Ok(self.canned.get(other).cloned().unwrap_or_default()),
        }
    }

    #[allow(dead_code)]
    pub fn node_count(&self) -> usize {
        self.test_nodes.len() + self.metadata.values().map(Vec::len).sum::<usize>()
    }
}

/// Counters and switches shared by the mock connector, driver, sessions and
/// transactions.
#[derive(Default)]
pub struct MockState {
    /// Outcome of each connection attempt in order; `Ok` once exhausted.
    pub connect_script: Mutex<VecDeque<Result<(), DriverError>>>,
    pub attempts: AtomicU32,
    pub attempt_times: Mutex<Vec<Instant>>,
    pub sessions_opened: AtomicUsize,
    pub sessions_released: AtomicUsize,
    pub transaction_modes: Mutex<Vec<AccessMode>>,
    pub commits: AtomicUsize,
    pub rollbacks: AtomicUsize,
    pub closes: AtomicUsize,
    /// Statements that fail with the given error instead of running.
    pub failing: Mutex<HashMap<String, DriverError>>,
    pub graph: Mutex<FakeGraph>,
}

impl MockState {
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn sessions_opened(&self) -> usize {
        self.sessions_opened.load(Ordering::SeqCst)
    }

    pub fn sessions_released(&self) -> usize {
        self.sessions_released.load(Ordering::SeqCst)
    }

    pub fn commits(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    pub fn rollbacks(&self) -> usize {
        self.rollbacks.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    #[allow(dead_code)]
    pub fn modes(&self) -> Vec<AccessMode> {
        self.transaction_modes.lock().unwrap().clone()
    }

    pub fn graph(&self) -> FakeGraph {
        self.graph.lock().unwrap().clone()
    }

    fn check_failing(&self, query: &Query) -> Result<(), DriverError> {
        match self.failing.lock().unwrap().get(query.text()) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

/// Connector whose attempts follow a script.
#[derive(Clone, Default)]
pub struct MockConnector {
    pub state: Arc<MockState>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue connection outcomes, consumed one per attempt.
    pub fn with_script(self, script: Vec<Result<(), DriverError>>) -> Self {
        *self.state.connect_script.lock().unwrap() = script.into();
        self
    }

    /// Make `query_text` fail with `err` wherever it runs.
    pub fn fail_query(self, query_text: &str, err: DriverError) -> Self {
        self.state
            .failing
            .lock()
            .unwrap()
            .insert(query_text.to_string(), err);
        self
    }

    /// Return `rows` for `query_text`.
    #[allow(dead_code)]
    pub fn with_rows(self, query_text: &str, rows: Vec<Record>) -> Self {
        self.state
            .graph
            .lock()
            .unwrap()
            .canned
            .insert(query_text.to_string(), rows);
        self
    }
}

impl Connector for MockConnector {
    type Driver = MockDriver;

    async fn connect(&self, _config: &ConnectionConfig) -> Result<MockDriver, DriverError> {
        self.state.attempts.fetch_add(1, Ordering::SeqCst);
        self.state.attempt_times.lock().unwrap().push(Instant::now());
        let next = self.state.connect_script.lock().unwrap().pop_front();
        match next {
            Some(Err(e)) => Err(e),
            _ => Ok(MockDriver {
                state: self.state.clone(),
            }),
        }
    }
}

pub struct MockDriver {
    state: Arc<MockState>,
}

impl GraphDriver for MockDriver {
    type Session<'a> = MockSession<'a>;

    async fn session(&self) -> Result<MockSession<'_>, DriverError> {
        self.state.sessions_opened.fetch_add(1, Ordering::SeqCst);
        Ok(MockSession { driver: self })
    }

    async fn close(self) -> Result<(), DriverError> {
        self.state.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub struct MockSession<'a> {
    driver: &'a MockDriver,
}

impl Drop for MockSession<'_> {
    fn drop(&mut self) {
        self.driver
            .state
            .sessions_released
            .fetch_add(1, Ordering::SeqCst);
    }
}

impl Session for MockSession<'_> {
    type Transaction<'t> = MockTransaction where Self: 't;

    async fn run(&mut self, query: Query) -> Result<Vec<Record>, DriverError> {
        let state = &self.driver.state;
        state.check_failing(&query)?;
        state.graph.lock().unwrap().apply(&query)
    }

    async fn begin(&mut self, mode: AccessMode) -> Result<MockTransaction, DriverError> {
        let state = self.driver.state.clone();
        state.transaction_modes.lock().unwrap().push(mode);
        let working = state.graph();
        Ok(MockTransaction { state, working })
    }
}

/// Works on a copy of the graph that replaces the shared one on commit.
pub struct MockTransaction {
    state: Arc<MockState>,
    working: FakeGraph,
}

impl Transaction for MockTransaction {
    async fn run(&mut self, query: Query) -> Result<Vec<Record>, DriverError> {
        self.state.check_failing(&query)?;
        self.working.apply(&query)
    }

    async fn commit(self) -> Result<(), DriverError> {
        self.state.commits.fetch_add(1, Ordering::SeqCst);
        *self.state.graph.lock().unwrap() = self.working;
        Ok(())
    }

    async fn rollback(self) -> Result<(), DriverError> {
        self.state.rollbacks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub fn test_config() -> ConnectionConfig {
    ConnectionConfig::default()
}

pub fn unavailable() -> DriverError {
    DriverError::ServiceUnavailable("Connection refused (os error 111)".to_string())
}

pub fn unauthorized() -> DriverError {
    DriverError::Authentication(
        "Neo.ClientError.Security.Unauthorized: authentication failure".to_string(),
    )
}
