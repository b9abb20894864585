//! # neo4j-conn
//!
//! Connectivity helper for Neo4j.
//!
//! - **Connection manager**: opens a verified driver handle with bounded,
//!   constant-delay retry and passes queries and read/write transactions
//!   through to it, one scoped session per call.
//! - **Smoke test**: creates, reads, links and deletes a throwaway node to
//!   confirm a server is reachable and writable (see the `neo4j-smoke` binary).
//!
//! ```no_run
//! use neo4j_conn::{ConnectionConfig, ConnectionManager, Neo4jConnector, Query};
//!
//! # async fn demo() -> neo4j_conn::Result<()> {
//! let config = ConnectionConfig::from_env()?;
//! let mut conn = ConnectionManager::connect(config, &Neo4jConnector).await?;
//! let rows = conn
//!     .execute_query(Query::new("MATCH (n) RETURN count(n) AS total"))
//!     .await?;
//! let total: i64 = rows[0].get_as("total")?;
//! println!("{total} nodes");
//! conn.close().await?;
//! # Ok(())
//! # }
//! ```

pub mod connection;
pub mod driver;
pub mod errors;
pub mod smoke;
pub mod types;
pub mod utils;

pub use connection::ConnectionManager;
pub use driver::neo4j::{Neo4jConnector, Neo4jDriver};
pub use driver::{AccessMode, Connector, GraphDriver, Query, Record, Session, Transaction, UnitOfWork};
pub use errors::{ConnError, DriverError, Result};
pub use types::ConnectionConfig;
