//! Neo4j graph driver implementation.
//!
//! Uses `neo4rs` 0.8 for async, pooled Bolt connections. neo4rs has no
//! explicit session object: every statement borrows a pooled connection for
//! its own duration, so [`Neo4jSession`] is a borrow of the pool that is
//! released when dropped.

use std::collections::HashMap;

use neo4rs::{BoltNull, BoltType, ConfigBuilder, Graph, Txn};
use serde_json::{Map, Value};
use tracing::debug;

use crate::errors::DriverError;
use crate::types::ConnectionConfig;

use super::{AccessMode, Connector, GraphDriver, Query, Record, Session, Transaction};

/// Statement used to prove the server accepted the connection and credentials.
const VERIFY_QUERY: &str = "RETURN 1 AS ok";

// ── Connector ─────────────────────────────────────────────────────────────────

/// Opens [`Neo4jDriver`] handles with `neo4rs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Neo4jConnector;

impl Connector for Neo4jConnector {
    type Driver = Neo4jDriver;

    async fn connect(&self, config: &ConnectionConfig) -> Result<Neo4jDriver, DriverError> {
        let mut builder = ConfigBuilder::default()
            .uri(config.uri.as_str())
            .user(config.user.as_str())
            .password(config.password.as_str())
            .max_connections(config.max_connections);
        if let Some(db) = &config.database {
            builder = builder.db(db.as_str());
        }
        let neo_config = builder.build().map_err(classify)?;

        let graph = Graph::connect(neo_config).await.map_err(classify)?;
        let driver = Neo4jDriver { graph };

        // On failure `driver` is dropped here, which tears the pool down.
        driver.verify_connectivity().await?;
        Ok(driver)
    }
}

// ── Driver ────────────────────────────────────────────────────────────────────

/// A verified `neo4rs` connection pool.
pub struct Neo4jDriver {
    graph: Graph,
}

impl Neo4jDriver {
    /// Run a trivial statement end to end inside a transaction.
    ///
    /// `Graph::execute` retries with its own exponential backoff; explicit
    /// transactions are never retried, so one call is one attempt.
    pub async fn verify_connectivity(&self) -> Result<(), DriverError> {
        let mut txn = self.graph.start_txn().await.map_err(classify)?;
        let mut stream = txn
            .execute(neo4rs::query(VERIFY_QUERY))
            .await
            .map_err(classify)?;
        while stream.next(txn.handle()).await.map_err(classify)?.is_some() {}
        txn.rollback().await.map_err(classify)
    }
}

impl GraphDriver for Neo4jDriver {
    type Session<'a> = Neo4jSession<'a>;

    async fn session(&self) -> Result<Neo4jSession<'_>, DriverError> {
        debug!("session opened");
        Ok(Neo4jSession { graph: &self.graph })
    }

    async fn close(self) -> Result<(), DriverError> {
        drop(self.graph);
        debug!("driver closed");
        Ok(())
    }
}

// ── Session ───────────────────────────────────────────────────────────────────

pub struct Neo4jSession<'a> {
    graph: &'a Graph,
}

impl Drop for Neo4jSession<'_> {
    fn drop(&mut self) {
        debug!("session released");
    }
}

impl Session for Neo4jSession<'_> {
    type Transaction<'t> = Neo4jTransaction where Self: 't;

    async fn run(&mut self, query: Query) -> Result<Vec<Record>, DriverError> {
        let mut stream = self
            .graph
            .execute(to_neo4rs_query(&query))
            .await
            .map_err(classify)?;

        let mut records = Vec::new();
        while let Some(row) = stream.next().await.map_err(classify)? {
            records.push(row_to_record(&row)?);
        }
        Ok(records)
    }

    // neo4rs opens every explicit transaction the same way; the mode only
    // matters for routing drivers.
    async fn begin(&mut self, mode: AccessMode) -> Result<Neo4jTransaction, DriverError> {
        debug!(?mode, "beginning transaction");
        let txn = self.graph.start_txn().await.map_err(classify)?;
        Ok(Neo4jTransaction { txn })
    }
}

// ── Transaction ───────────────────────────────────────────────────────────────

pub struct Neo4jTransaction {
    txn: Txn,
}

impl Transaction for Neo4jTransaction {
    async fn run(&mut self, query: Query) -> Result<Vec<Record>, DriverError> {
        let mut stream = self
            .txn
            .execute(to_neo4rs_query(&query))
            .await
            .map_err(classify)?;

        let mut records = Vec::new();
        while let Some(row) = stream.next(self.txn.handle()).await.map_err(classify)? {
            records.push(row_to_record(&row)?);
        }
        Ok(records)
    }

    async fn commit(self) -> Result<(), DriverError> {
        self.txn.commit().await.map_err(classify)
    }

    async fn rollback(self) -> Result<(), DriverError> {
        self.txn.rollback().await.map_err(classify)
    }
}

// ── Conversions ───────────────────────────────────────────────────────────────

fn to_neo4rs_query(query: &Query) -> neo4rs::Query {
    query
        .params()
        .iter()
        .fold(neo4rs::query(query.text()), |q, (key, value)| {
            q.param(key, to_bolt(value))
        })
}

/// Convert a JSON parameter into the matching Bolt value.
///
/// Integers that fit in `i64` stay integers; every other number becomes a float.
fn to_bolt(value: &Value) -> BoltType {
    match value {
        Value::Null => BoltType::Null(BoltNull),
        Value::Bool(b) => BoltType::from(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => BoltType::from(i),
            None => n.as_f64().map_or(BoltType::Null(BoltNull), BoltType::from),
        },
        Value::String(s) => BoltType::from(s.as_str()),
        Value::Array(items) => BoltType::from(items.iter().map(to_bolt).collect::<Vec<_>>()),
        Value::Object(map) => BoltType::from(
            map.iter()
                .map(|(k, v)| (k.clone(), to_bolt(v)))
                .collect::<HashMap<String, BoltType>>(),
        ),
    }
}

fn row_to_record(row: &neo4rs::Row) -> Result<Record, DriverError> {
    row.to::<Map<String, Value>>()
        .map(Record::new)
        .map_err(|e| DriverError::Other(format!("cannot decode row: {e}")))
}

/// Map a `neo4rs` error onto the auth / unavailable / other split.
fn classify(err: neo4rs::Error) -> DriverError {
    let message = error_chain(&err);
    match err {
        neo4rs::Error::AuthenticationError(_) => DriverError::Authentication(message),
        neo4rs::Error::IOError { .. } => DriverError::ServiceUnavailable(message),
        _ => classify_message(message),
    }
}

/// Fallback classification for errors neo4rs reports as server failures or
/// pool errors rather than dedicated variants.
fn classify_message(message: String) -> DriverError {
    let lower = message.to_lowercase();
    if lower.contains("security.unauthorized")
        || lower.contains("unauthorized")
        || lower.contains("authentication")
    {
        DriverError::Authentication(message)
    } else if lower.contains("connection refused")
        || lower.contains("connection reset")
        || lower.contains("connection error")
        || lower.contains("unavailable")
        || lower.contains("timed out")
        || lower.contains("broken pipe")
    {
        DriverError::ServiceUnavailable(message)
    } else {
        DriverError::Other(message)
    }
}

fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unauthorized_message_is_authentication() {
        let err = classify_message(
            "Neo.ClientError.Security.Unauthorized: The client is unauthorized due to authentication failure."
                .to_string(),
        );
        assert!(matches!(err, DriverError::Authentication(_)));
    }

    #[test]
    fn refused_message_is_unavailable() {
        let err = classify_message("an IO error occurred: Connection refused (os error 111)".into());
        assert!(matches!(err, DriverError::ServiceUnavailable(_)));
    }

    #[test]
    fn syntax_message_is_other() {
        let err = classify_message(
            "Neo.ClientError.Statement.SyntaxError: Invalid input 'MTCH'".to_string(),
        );
        assert!(matches!(err, DriverError::Other(_)));
        assert!(!err.is_retryable());
    }

    #[test]
    fn scalar_params_map_to_bolt() {
        assert!(matches!(to_bolt(&json!(42)), BoltType::Integer(i) if i.value == 42));
        assert!(matches!(to_bolt(&json!(true)), BoltType::Boolean(b) if b.value));
        assert!(matches!(to_bolt(&json!("abc123")), BoltType::String(s) if s.value == "abc123"));
        assert!(matches!(to_bolt(&json!(null)), BoltType::Null(_)));
    }

    #[test]
    fn float_params_stay_floats() {
        assert!(matches!(to_bolt(&json!(0.5)), BoltType::Float(f) if f.value == 0.5));
    }

    #[test]
    fn nested_params_map_to_bolt() {
        assert!(matches!(to_bolt(&json!(["a", "b"])), BoltType::List(_)));
        assert!(matches!(to_bolt(&json!({"status": "OK"})), BoltType::Map(_)));
    }
}
