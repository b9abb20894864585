//! Connection manager: one driver handle, opened with bounded retry, plus
//! passthrough query and transaction execution.

use serde::de::DeserializeOwned;
use tracing::{error, info, warn};

use crate::driver::{
    AccessMode, Connector, GraphDriver, Query, Record, Session, Transaction, UnitOfWork,
};
use crate::errors::{ConnError, Result};
use crate::types::ConnectionConfig;

/// Owns a single verified driver handle for its lifetime.
///
/// Every query or transaction acquires its own session, which is released when
/// the call returns, whether it succeeded or not. Call [`close`](Self::close)
/// before dropping the manager; it is safe to call more than once.
pub struct ConnectionManager<D: GraphDriver> {
    config: ConnectionConfig,
    driver: Option<D>,
}

impl<D: GraphDriver> ConnectionManager<D> {
    /// Validate `config` and open a driver through `connector`.
    ///
    /// Authentication and service-unavailable failures are retried up to
    /// `config.max_retry` attempts in total, sleeping `config.retry_delay`
    /// between attempts. Running out of attempts returns
    /// [`ConnError::Connection`] with the last cause. Any other driver failure
    /// is returned at once as [`ConnError::Driver`].
    pub async fn connect<C>(config: ConnectionConfig, connector: &C) -> Result<Self>
    where
        C: Connector<Driver = D>,
    {
        config.check()?;

        let mut attempts: u32 = 0;
        loop {
            attempts += 1;
            match connector.connect(&config).await {
                Ok(driver) => {
                    info!(uri = %config.uri, attempt = attempts, "connected to Neo4j");
                    return Ok(Self {
                        config,
                        driver: Some(driver),
                    });
                }
                Err(e) if e.is_retryable() => {
                    if attempts >= config.max_retry {
                        error!(uri = %config.uri, attempts, error = %e, "failed to connect to Neo4j");
                        return Err(ConnError::Connection {
                            attempts,
                            source: e,
                        });
                    }
                    warn!(
                        attempt = attempts,
                        delay = ?config.retry_delay,
                        error = %e,
                        "connection attempt failed, retrying"
                    );
                    tokio::time::sleep(config.retry_delay).await;
                }
                Err(e) => {
                    error!(uri = %config.uri, error = %e, "failed to connect to Neo4j");
                    return Err(ConnError::Driver(e));
                }
            }
        }
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Whether the driver handle is still held.
    pub fn is_open(&self) -> bool {
        self.driver.is_some()
    }

    /// Release the driver handle. A no-op once the handle is gone.
    pub async fn close(&mut self) -> Result<()> {
        if let Some(driver) = self.driver.take() {
            driver.close().await?;
            info!(uri = %self.config.uri, "Neo4j connection closed");
        }
        Ok(())
    }

    fn driver(&self) -> Result<&D> {
        self.driver.as_ref().ok_or(ConnError::Closed)
    }

    /// Run `query` in a fresh session and collect every row.
    pub async fn execute_query(&self, query: impl Into<Query>) -> Result<Vec<Record>> {
        let query = query.into();
        let mut session = self.driver()?.session().await.map_err(|e| {
            error!(error = %e, "failed to open session");
            ConnError::Query(e)
        })?;

        let records = session.run(query).await.map_err(|e| {
            error!(error = %e, "query execution failed");
            ConnError::Query(e)
        })?;
        Ok(records)
    }

    /// Run `query` and decode every row into `T`.
    pub async fn fetch_as<T: DeserializeOwned>(&self, query: impl Into<Query>) -> Result<Vec<T>> {
        self.execute_query(query)
            .await?
            .iter()
            .map(Record::decode::<T>)
            .collect()
    }

    /// Execute `work` inside a write transaction and return its output.
    pub async fn execute_write_transaction<W: UnitOfWork>(&self, work: &W) -> Result<W::Output> {
        self.execute_transaction(AccessMode::Write, work).await
    }

    /// Execute `work` inside a read transaction and return its output.
    pub async fn execute_read_transaction<W: UnitOfWork>(&self, work: &W) -> Result<W::Output> {
        self.execute_transaction(AccessMode::Read, work).await
    }

    async fn execute_transaction<W: UnitOfWork>(
        &self,
        mode: AccessMode,
        work: &W,
    ) -> Result<W::Output> {
        let mut session = self.driver()?.session().await.map_err(|e| {
            error!(error = %e, "failed to open session");
            ConnError::Query(e)
        })?;

        let mut tx = session.begin(mode).await.map_err(|e| {
            error!(?mode, error = %e, "failed to begin transaction");
            ConnError::Query(e)
        })?;

        let outcome = work.execute(&mut tx).await;
        match outcome {
            Ok(output) => {
                tx.commit().await.map_err(|e| {
                    error!(?mode, error = %e, "transaction commit failed");
                    ConnError::Query(e)
                })?;
                Ok(output)
            }
            Err(err) => {
                error!(?mode, error = %err, "transaction failed, rolling back");
                if let Err(rollback_err) = tx.rollback().await {
                    warn!(error = %rollback_err, "rollback failed");
                }
                Err(err)
            }
        }
    }
}
