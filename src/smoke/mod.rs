//! End-to-end smoke test against a live server.
//!
//! A run connects once, then creates a tagged `TestNode`, reads it back, links
//! a `TestMetadata` node to it inside a write transaction, and deletes both.
//! Every step reports its own outcome; only a failed connection stops the run
//! early. The connection is closed at the end no matter what.

pub mod queries;
pub mod report;

use std::io::{self, Write};
use std::time::Duration;

use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::connection::ConnectionManager;
use crate::driver::{Connector, Query, Transaction, UnitOfWork};
use crate::errors::{ConnError, DriverError, Result};
use crate::types::ConnectionConfig;
use crate::utils::datetime::{now_timestamp, parse_timestamp};

pub use report::{SmokeReport, Step, StepResult};

/// Short random tag identifying the artifacts of one run.
pub fn generate_test_id() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}

/// The tagged node as read back from the graph.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TestNode {
    pub name: Option<String>,
    pub created_at: Option<String>,
}

/// Write transaction body for the [`Step::RunTransaction`] step.
pub struct LinkMetadata {
    pub test_id: String,
    pub timestamp: String,
}

impl UnitOfWork for LinkMetadata {
    type Output = String;

    async fn execute<T: Transaction>(&self, tx: &mut T) -> Result<String> {
        let query = Query::new(queries::LINK_TEST_METADATA)
            .param("id", self.test_id.as_str())
            .param("timestamp", self.timestamp.as_str());

        let records = tx.run(query).await.map_err(ConnError::Query)?;
        records
            .first()
            .ok_or_else(|| ConnError::Decode("transaction returned no status".to_string()))?
            .get_as::<String>("status")
    }
}

/// Drives a smoke-test run.
pub struct SmokeTester<C: Connector> {
    config: ConnectionConfig,
    connector: C,
    test_id: String,
    manager: Option<ConnectionManager<C::Driver>>,
}

impl<C: Connector> SmokeTester<C> {
    /// Prepare a run with a freshly generated test id. Nothing is opened yet.
    pub fn new(config: ConnectionConfig, connector: C) -> Self {
        Self {
            config,
            connector,
            test_id: generate_test_id(),
            manager: None,
        }
    }

    /// Use a fixed test id instead of a random one.
    pub fn with_test_id(mut self, test_id: impl Into<String>) -> Self {
        self.test_id = test_id.into();
        self
    }

    pub fn test_id(&self) -> &str {
        &self.test_id
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    pub fn is_connected(&self) -> bool {
        self.manager.as_ref().is_some_and(|m| m.is_open())
    }

    fn test_node_name(&self) -> String {
        format!("Test Node {}", self.test_id)
    }

    /// Open and verify a connection with a single attempt.
    pub async fn connect(&mut self) -> StepResult {
        let config = self.config.clone().with_retry(1, Duration::ZERO);
        match ConnectionManager::connect(config, &self.connector).await {
            Ok(manager) => {
                self.manager = Some(manager);
                StepResult::pass(
                    Step::Connect,
                    format!("Connection established to {}", self.config.uri),
                )
            }
            Err(err) => match err.driver_cause() {
                Some(DriverError::Authentication(_)) => StepResult::fail(
                    Step::Connect,
                    "Authentication error. Check the user name and password.",
                ),
                Some(DriverError::ServiceUnavailable(_)) => StepResult::fail(
                    Step::Connect,
                    format!(
                        "Cannot connect to Neo4j at {}. Is the server running?",
                        self.config.uri
                    ),
                ),
                _ => StepResult::fail(
                    Step::Connect,
                    format!("Unexpected error while connecting: {err}"),
                ),
            },
        }
    }

    fn manager(&self) -> Result<&ConnectionManager<C::Driver>> {
        self.manager.as_ref().ok_or(ConnError::Closed)
    }

    /// Fetch the tagged node, if it exists.
    pub async fn find_test_node(&self) -> Result<Option<TestNode>> {
        let query = Query::new(queries::READ_TEST_NODE).param("id", self.test_id.as_str());
        let mut nodes = self.manager()?.fetch_as::<TestNode>(query).await?;
        Ok(if nodes.is_empty() {
            None
        } else {
            Some(nodes.swap_remove(0))
        })
    }

    /// Create the tagged node.
    pub async fn create_node(&self) -> StepResult {
        let query = Query::new(queries::CREATE_TEST_NODE)
            .param("id", self.test_id.as_str())
            .param("name", self.test_node_name())
            .param("timestamp", now_timestamp());

        let outcome = match self.manager() {
            Ok(manager) => manager.execute_query(query).await,
            Err(e) => Err(e),
        };
        match outcome {
            Ok(records) if !records.is_empty() => StepResult::pass(
                Step::CreateNode,
                format!("Test node created with ID: {}", self.test_id),
            ),
            Ok(_) => StepResult::fail(Step::CreateNode, "Could not create the test node"),
            Err(e) => StepResult::fail(Step::CreateNode, format!("Error creating node: {e}")),
        }
    }

    /// Read the tagged node back and check its name survived.
    pub async fn read_node(&self) -> StepResult {
        match self.find_test_node().await {
            Ok(Some(TestNode {
                name: Some(name),
                created_at,
            })) if !name.is_empty() => {
                let created = match created_at.as_deref().and_then(parse_timestamp) {
                    Some(ts) => format!("created {}", ts.to_rfc3339()),
                    None => "created_at unreadable".to_string(),
                };
                StepResult::pass(Step::ReadNode, format!("Node read back: {name} ({created})"))
            }
            Ok(_) => StepResult::fail(Step::ReadNode, "Could not read the test node"),
            Err(e) => StepResult::fail(Step::ReadNode, format!("Error reading node: {e}")),
        }
    }

    /// Link a metadata node inside a write transaction.
    pub async fn run_transaction(&self) -> StepResult {
        let work = LinkMetadata {
            test_id: self.test_id.clone(),
            timestamp: now_timestamp(),
        };
        let outcome = match self.manager() {
            Ok(manager) => manager.execute_write_transaction(&work).await,
            Err(e) => Err(e),
        };
        match outcome {
            Ok(status) => StepResult::pass(
                Step::RunTransaction,
                format!("Transaction executed successfully. Status: {status}"),
            ),
            Err(e) => StepResult::fail(Step::RunTransaction, format!("Transaction error: {e}")),
        }
    }

    /// Delete everything this run created.
    pub async fn cleanup(&self) -> StepResult {
        let query = Query::new(queries::CLEANUP_TEST_NODES).param("id", self.test_id.as_str());
        let outcome = match self.manager() {
            Ok(manager) => manager.execute_query(query).await,
            Err(e) => Err(e),
        };
        match outcome {
            Ok(_) => StepResult::pass(Step::Cleanup, "Cleanup complete. Test nodes removed."),
            Err(e) => StepResult::fail(Step::Cleanup, format!("Cleanup error: {e}")),
        }
    }

    /// Close the connection if one is open. Returns whether anything was closed.
    pub async fn close(&mut self) -> Result<bool> {
        match self.manager.take() {
            Some(mut manager) => {
                manager.close().await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Run every step, writing progress and the summary to `out`.
    ///
    /// The connection is closed before this returns, even when writing to
    /// `out` fails part-way.
    pub async fn run_all<W: Write>(&mut self, out: &mut W) -> io::Result<SmokeReport> {
        let report = self.run_steps(out).await;
        let closed = self.close().await;
        let report = report?;

        match closed {
            Ok(true) => writeln!(out, "✅ Connection closed")?,
            Ok(false) => {}
            Err(e) => {
                warn!(error = %e, "failed to close connection");
                writeln!(out, "❌ Error closing connection: {e}")?;
            }
        }

        write!(out, "{report}")?;
        info!(test_id = %report.test_id, passed = report.passed(), "smoke test finished");
        Ok(report)
    }

    async fn run_steps<W: Write>(&mut self, out: &mut W) -> io::Result<SmokeReport> {
        writeln!(out, "\n🔍 STARTING NEO4J CONNECTION TESTS\n")?;
        writeln!(out, "URI: {}", self.config.uri)?;
        writeln!(out, "User: {}", self.config.user)?;
        writeln!(out, "Test ID: {}\n", self.test_id)?;

        let connect = self.connect().await;
        writeln!(out, "{connect}")?;
        if !connect.passed {
            return Ok(SmokeReport {
                test_id: self.test_id.clone(),
                connect,
                steps: Vec::new(),
            });
        }

        let create = self.create_node().await;
        writeln!(out, "{create}")?;
        let read = self.read_node().await;
        writeln!(out, "{read}")?;
        let transaction = self.run_transaction().await;
        writeln!(out, "{transaction}")?;
        let cleanup = self.cleanup().await;
        writeln!(out, "{cleanup}")?;

        Ok(SmokeReport {
            test_id: self.test_id.clone(),
            connect,
            steps: vec![create, read, transaction, cleanup],
        })
    }
}
