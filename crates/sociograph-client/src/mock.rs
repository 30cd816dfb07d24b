//! In-memory mock of the graph service for tests.
//!
//! Mirrors the contract the loaders rely on:
//! - uids are assigned monotonically at mutate time, only for blank nodes;
//! - writes staged in a transaction become visible at commit, and discard
//!   really discards them;
//! - queries are answered by a test-installed responder closure (the mock
//!   does not evaluate the query language).

use crate::{Assigned, ClientError, GraphService, GraphTxn};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

type QueryResponder = dyn Fn(&str, &HashMap<String, String>) -> Value + Send + Sync;

#[derive(Default)]
struct MockState {
    next_uid: u64,
    schemas: Vec<String>,
    mutations: Vec<Value>,
    queries: Vec<(String, HashMap<String, String>)>,
    dropped: bool,
    fail_on_key: Option<String>,
}

/// Shared-state mock graph. Cloning yields another handle to the same graph.
#[derive(Clone, Default)]
pub struct MockGraph {
    state: Arc<Mutex<MockState>>,
    responder: Arc<Mutex<Option<Box<QueryResponder>>>>,
}

impl MockGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every committed set-object, in commit order.
    pub fn mutations(&self) -> Vec<Value> {
        self.state.lock().unwrap().mutations.clone()
    }

    /// Committed objects carrying a type label, i.e. created nodes.
    pub fn nodes(&self) -> Vec<Value> {
        self.state
            .lock()
            .unwrap()
            .mutations
            .iter()
            .filter(|m| m.get("dgraph.type").is_some())
            .cloned()
            .collect()
    }

    /// Committed objects without a type label, i.e. edge mutations on
    /// existing nodes.
    pub fn edges(&self) -> Vec<Value> {
        self.state
            .lock()
            .unwrap()
            .mutations
            .iter()
            .filter(|m| m.get("dgraph.type").is_none())
            .cloned()
            .collect()
    }

    pub fn schemas(&self) -> Vec<String> {
        self.state.lock().unwrap().schemas.clone()
    }

    pub fn queries(&self) -> Vec<(String, HashMap<String, String>)> {
        self.state.lock().unwrap().queries.clone()
    }

    pub fn was_dropped(&self) -> bool {
        self.state.lock().unwrap().dropped
    }

    /// Answer subsequent queries with `respond(query_text, variables)`.
    pub fn set_responder<F>(&self, respond: F)
    where
        F: Fn(&str, &HashMap<String, String>) -> Value + Send + Sync + 'static,
    {
        *self.responder.lock().unwrap() = Some(Box::new(respond));
    }

    /// Reject any mutation whose set-object contains `key` at the top level.
    /// Lets a test fail one source file's mutations while the rest succeed.
    pub fn fail_mutations_containing(&self, key: impl Into<String>) {
        self.state.lock().unwrap().fail_on_key = Some(key.into());
    }

    fn assign_uid(&self) -> String {
        let mut state = self.state.lock().unwrap();
        state.next_uid += 1;
        format!("{:#x}", state.next_uid)
    }
}

#[async_trait]
impl GraphService for MockGraph {
    type Txn = MockTxn;

    async fn alter(&self, schema: &str) -> Result<(), ClientError> {
        self.state.lock().unwrap().schemas.push(schema.to_string());
        Ok(())
    }

    async fn drop_all(&self) -> Result<(), ClientError> {
        let mut state = self.state.lock().unwrap();
        state.mutations.clear();
        state.dropped = true;
        Ok(())
    }

    fn txn(&self, read_only: bool) -> MockTxn {
        MockTxn {
            graph: self.clone(),
            staged: Vec::new(),
            read_only,
            finished: false,
        }
    }
}

pub struct MockTxn {
    graph: MockGraph,
    staged: Vec<Value>,
    read_only: bool,
    finished: bool,
}

#[async_trait]
impl GraphTxn for MockTxn {
    async fn mutate(&mut self, set: Value) -> Result<Assigned, ClientError> {
        if self.finished {
            return Err(ClientError::TxnFinished);
        }
        if self.read_only {
            return Err(ClientError::ReadOnly);
        }
        if let Some(key) = &self.graph.state.lock().unwrap().fail_on_key {
            if set.get(key.as_str()).is_some() {
                return Err(ClientError::Rejected {
                    operation: "mutate",
                    message: format!("mock configured to reject mutations with {key:?}"),
                });
            }
        }

        let mut set = set;
        let mut assigned = Assigned::default();
        if let Some(blank) = set
            .get("uid")
            .and_then(Value::as_str)
            .and_then(|u| u.strip_prefix("_:"))
        {
            let name = blank.to_string();
            let uid = self.graph.assign_uid();
            set["uid"] = Value::String(uid.clone());
            assigned.uids.insert(name, uid);
        }
        self.staged.push(set);
        Ok(assigned)
    }

    async fn commit(&mut self) -> Result<(), ClientError> {
        if self.finished {
            return Err(ClientError::TxnFinished);
        }
        self.finished = true;
        let mut state = self.graph.state.lock().unwrap();
        state.mutations.append(&mut self.staged);
        Ok(())
    }

    async fn discard(&mut self) {
        self.finished = true;
        self.staged.clear();
    }

    async fn query(
        &mut self,
        query: &str,
        vars: &HashMap<String, String>,
    ) -> Result<Value, ClientError> {
        if self.finished {
            return Err(ClientError::TxnFinished);
        }
        self.graph
            .state
            .lock()
            .unwrap()
            .queries
            .push((query.to_string(), vars.clone()));
        let responder = self.graph.responder.lock().unwrap();
        Ok(match responder.as_ref() {
            Some(respond) => respond(query, vars),
            None => Value::Object(Default::default()),
        })
    }
}
