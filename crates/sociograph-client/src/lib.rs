//! Graph service client boundary for Sociograph.
//!
//! The graph engine itself (schema storage, transaction execution, query
//! evaluation) is an external collaborator behind a small RPC contract:
//! - `alter` for schema changes and drop-all
//! - per-transaction `mutate` / `commit` / `discard`
//! - read-only `query` with string-typed variables
//!
//! `DgraphClient` speaks the Dgraph HTTP API over `reqwest`; [`mock::MockGraph`]
//! is an in-memory stand-in used by the ingestion and query tests.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;

mod dgraph;
mod error;
pub mod mock;

pub use dgraph::{DgraphClient, DgraphTxn};
pub use error::ClientError;

/// HTTP endpoint used when [`ENDPOINT_ENV`] is unset.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:8080";

/// Environment variable naming the graph service endpoint.
pub const ENDPOINT_ENV: &str = "DGRAPH_URL";

/// Identifiers the graph service assigned to blank nodes in a mutation.
///
/// The service is the only source of node identifiers; a loader never invents
/// or reuses one. Mutations that only touch existing nodes (edge creation)
/// assign nothing and come back empty.
#[derive(Debug, Clone, Default)]
pub struct Assigned {
    /// Blank-node name (without the `_:` prefix) to assigned uid.
    pub uids: HashMap<String, String>,
}

impl Assigned {
    /// The uid assigned to the single blank node of a one-node mutation.
    pub fn single(&self) -> Option<&str> {
        if self.uids.len() == 1 {
            self.uids.values().next().map(String::as_str)
        } else {
            None
        }
    }
}

/// Handle to the external graph service.
#[async_trait]
pub trait GraphService: Send + Sync {
    type Txn: GraphTxn;

    /// Submit a schema-alter operation. Re-submitting the same schema is
    /// idempotent on the server side.
    async fn alter(&self, schema: &str) -> Result<(), ClientError>;

    /// Drop all data (and the schema) from the graph.
    async fn drop_all(&self) -> Result<(), ClientError>;

    /// Begin a transaction. Read-only transactions reject mutations.
    fn txn(&self, read_only: bool) -> Self::Txn;
}

/// One transaction against the graph service.
///
/// `discard` is safe on every exit path: it is a no-op after a successful
/// commit and aborts the transaction otherwise.
#[async_trait]
pub trait GraphTxn: Send {
    /// Apply one set-mutation; returns the identifiers assigned to blank
    /// nodes in the object.
    async fn mutate(&mut self, set: Value) -> Result<Assigned, ClientError>;

    /// Commit the transaction.
    async fn commit(&mut self) -> Result<(), ClientError>;

    /// Abort the transaction if it is still open. Best-effort.
    async fn discard(&mut self);

    /// Run a query with string-typed variables, returning the result tree.
    async fn query(
        &mut self,
        query: &str,
        vars: &HashMap<String, String>,
    ) -> Result<Value, ClientError>;
}

/// Run one set-mutation in its own transaction.
///
/// Acquire -> mutate -> commit -> release, with the release guaranteed on
/// every exit path. Each row of an ingestion run goes through here, so a
/// failed row never poisons its neighbours.
pub async fn mutate_once<S: GraphService>(
    service: &S,
    set: Value,
) -> Result<Assigned, ClientError> {
    let mut txn = service.txn(false);
    let out = match txn.mutate(set).await {
        Ok(assigned) => txn.commit().await.map(|_| assigned),
        Err(err) => Err(err),
    };
    txn.discard().await;
    out
}

/// Run one query in its own read-only transaction.
pub async fn query_once<S: GraphService>(
    service: &S,
    query: &str,
    vars: &HashMap<String, String>,
) -> Result<Value, ClientError> {
    let mut txn = service.txn(true);
    let out = txn.query(query, vars).await;
    txn.discard().await;
    out
}
