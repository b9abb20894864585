//! Graph database driver abstraction.
//!
//! Defines the contract the connection manager consumes from a driver:
//! [`Connector`] opens and verifies a [`GraphDriver`], which hands out scoped
//! [`Session`]s, which run statements and begin [`Transaction`]s. A
//! [`UnitOfWork`] is the caller-supplied body executed inside a transaction.
//!
//! The production implementation lives in [`neo4j`].

pub mod neo4j;

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::{ConnError, DriverError, Result};
use crate::types::ConnectionConfig;

/// Access mode a transaction is opened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    Read,
    Write,
}

/// A Cypher statement plus its named parameters.
///
/// Nothing is validated locally; syntax and semantic errors come back from the
/// server when the query runs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    text: String,
    params: BTreeMap<String, Value>,
}

impl Query {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            params: BTreeMap::new(),
        }
    }

    /// Bind `$key` to `value`.
    pub fn param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn params(&self) -> &BTreeMap<String, Value> {
        &self.params
    }
}

impl From<&str> for Query {
    fn from(text: &str) -> Self {
        Query::new(text)
    }
}

impl From<String> for Query {
    fn from(text: String) -> Self {
        Query::new(text)
    }
}

/// One result row: return alias → value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: Map<String, Value>,
}

impl Record {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    /// Column names (the statement's return aliases).
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Decode a single column into `T`.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        let value = self
            .fields
            .get(key)
            .ok_or_else(|| ConnError::Decode(format!("missing field `{key}`")))?;
        serde_json::from_value(value.clone())
            .map_err(|e| ConnError::Decode(format!("field `{key}`: {e}")))
    }

    /// Decode the whole row into `T`, matching columns to struct fields.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(Value::Object(self.fields.clone()))
            .map_err(|e| ConnError::Decode(e.to_string()))
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.fields
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

/// Opens driver handles.
///
/// `connect` must both open the handle and verify connectivity, so that an
/// `Ok` always means the server accepted the credentials.
#[allow(async_fn_in_trait)]
pub trait Connector {
    type Driver: GraphDriver;

    async fn connect(&self, config: &ConnectionConfig)
        -> std::result::Result<Self::Driver, DriverError>;
}

/// A long-lived driver handle (connection pool).
#[allow(async_fn_in_trait)]
pub trait GraphDriver {
    type Session<'a>: Session
    where
        Self: 'a;

    /// Acquire a session scoped to one unit of work. Dropping it releases it.
    async fn session(&self) -> std::result::Result<Self::Session<'_>, DriverError>;

    /// Release the handle. Consumes it so it cannot be closed twice.
    async fn close(self) -> std::result::Result<(), DriverError>;
}

/// A short-lived context for statements and transactions.
#[allow(async_fn_in_trait)]
pub trait Session {
    type Transaction<'a>: Transaction
    where
        Self: 'a;

    /// Run a statement in an auto-commit transaction and collect every row.
    async fn run(&mut self, query: Query) -> std::result::Result<Vec<Record>, DriverError>;

    /// Begin an explicit transaction.
    async fn begin(
        &mut self,
        mode: AccessMode,
    ) -> std::result::Result<Self::Transaction<'_>, DriverError>;
}

/// An open explicit transaction.
#[allow(async_fn_in_trait)]
pub trait Transaction {
    async fn run(&mut self, query: Query) -> std::result::Result<Vec<Record>, DriverError>;

    async fn commit(self) -> std::result::Result<(), DriverError>;

    async fn rollback(self) -> std::result::Result<(), DriverError>;
}

/// Caller-supplied body of a transaction.
///
/// Any inputs the work needs live on the implementing type.
#[allow(async_fn_in_trait)]
pub trait UnitOfWork {
    type Output;

    async fn execute<T: Transaction>(&self, tx: &mut T) -> Result<Self::Output>;
}
