//! Dgraph HTTP transport.
//!
//! Speaks the plain HTTP API (`/alter`, `/mutate`, `/commit`, `/query`,
//! `/health`) rather than gRPC, which keeps the boundary to one `reqwest`
//! client. Transaction context (`start_ts`, touched `keys`/`preds`) is
//! accumulated across mutates and replayed at commit time, exactly as the
//! server expects.

use crate::{Assigned, ClientError, GraphService, GraphTxn};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::env;

/// Client for one Dgraph Alpha HTTP endpoint.
#[derive(Debug, Clone)]
pub struct DgraphClient {
    http: reqwest::Client,
    endpoint: String,
}

impl DgraphClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        let endpoint = endpoint.into();
        let endpoint = endpoint.trim_end_matches('/').to_string();
        Self {
            http: reqwest::Client::new(),
            endpoint,
        }
    }

    /// Endpoint from `DGRAPH_URL`, falling back to the default.
    pub fn from_env() -> Self {
        let endpoint =
            env::var(crate::ENDPOINT_ENV).unwrap_or_else(|_| crate::DEFAULT_ENDPOINT.to_string());
        Self::new(endpoint)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Ping `/health`. The interactive shell treats a failure here as fatal;
    /// nothing downstream can work without the service.
    pub async fn check_health(&self) -> Result<(), ClientError> {
        self.http
            .get(format!("{}/health", self.endpoint))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

/// Reject responses whose body carries an `errors` array, returning the
/// `data` payload otherwise.
fn expect_data(operation: &'static str, body: Value) -> Result<Value, ClientError> {
    if let Some(errors) = body.get("errors").and_then(Value::as_array) {
        if !errors.is_empty() {
            let message = errors
                .iter()
                .filter_map(|e| e.get("message").and_then(Value::as_str))
                .collect::<Vec<_>>()
                .join("; ");
            return Err(ClientError::Rejected { operation, message });
        }
    }
    Ok(body.get("data").cloned().unwrap_or(Value::Null))
}

#[async_trait]
impl GraphService for DgraphClient {
    type Txn = DgraphTxn;

    async fn alter(&self, schema: &str) -> Result<(), ClientError> {
        let body: Value = self
            .http
            .post(format!("{}/alter", self.endpoint))
            .body(schema.to_string())
            .send()
            .await?
            .json()
            .await?;
        expect_data("alter", body)?;
        Ok(())
    }

    async fn drop_all(&self) -> Result<(), ClientError> {
        let body: Value = self
            .http
            .post(format!("{}/alter", self.endpoint))
            .json(&json!({ "drop_all": true }))
            .send()
            .await?
            .json()
            .await?;
        expect_data("drop_all", body)?;
        Ok(())
    }

    fn txn(&self, read_only: bool) -> DgraphTxn {
        DgraphTxn {
            http: self.http.clone(),
            endpoint: self.endpoint.clone(),
            read_only,
            start_ts: 0,
            keys: Vec::new(),
            preds: Vec::new(),
            finished: false,
        }
    }
}

/// One transaction over the HTTP API.
///
/// The server assigns `start_ts` on the first mutate; `keys` and `preds`
/// from every mutate in the transaction must accompany the final commit.
pub struct DgraphTxn {
    http: reqwest::Client,
    endpoint: String,
    read_only: bool,
    start_ts: u64,
    keys: Vec<String>,
    preds: Vec<String>,
    finished: bool,
}

impl DgraphTxn {
    fn absorb_context(&mut self, body: &Value) {
        let Some(txn) = body.pointer("/extensions/txn") else {
            return;
        };
        if let Some(ts) = txn.get("start_ts").and_then(Value::as_u64) {
            self.start_ts = ts;
        }
        for (field, into) in [("keys", &mut self.keys), ("preds", &mut self.preds)] {
            if let Some(items) = txn.get(field).and_then(Value::as_array) {
                into.extend(items.iter().filter_map(Value::as_str).map(String::from));
            }
        }
    }
}

#[async_trait]
impl GraphTxn for DgraphTxn {
    async fn mutate(&mut self, set: Value) -> Result<Assigned, ClientError> {
        if self.finished {
            return Err(ClientError::TxnFinished);
        }
        if self.read_only {
            return Err(ClientError::ReadOnly);
        }

        let mut url = format!("{}/mutate", self.endpoint);
        if self.start_ts > 0 {
            url = format!("{url}?startTs={}", self.start_ts);
        }
        let body: Value = self
            .http
            .post(url)
            .json(&json!({ "set": [set] }))
            .send()
            .await?
            .json()
            .await?;
        self.absorb_context(&body);
        let data = expect_data("mutate", body)?;

        let mut assigned = Assigned::default();
        if let Some(uids) = data.get("uids").and_then(Value::as_object) {
            for (name, uid) in uids {
                if let Some(uid) = uid.as_str() {
                    assigned.uids.insert(name.clone(), uid.to_string());
                }
            }
        }
        Ok(assigned)
    }

    async fn commit(&mut self) -> Result<(), ClientError> {
        if self.finished {
            return Err(ClientError::TxnFinished);
        }
        if self.start_ts == 0 {
            // Nothing was mutated; there is no server-side state to commit.
            self.finished = true;
            return Ok(());
        }
        let body: Value = self
            .http
            .post(format!("{}/commit?startTs={}", self.endpoint, self.start_ts))
            .json(&json!({ "keys": self.keys, "preds": self.preds }))
            .send()
            .await?
            .json()
            .await?;
        expect_data("commit", body)?;
        // Flips only on success: a failed commit leaves the transaction
        // open so a later discard can still abort it server-side.
        self.finished = true;
        Ok(())
    }

    async fn discard(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;
        if self.start_ts == 0 {
            return;
        }
        let result = self
            .http
            .post(format!(
                "{}/commit?startTs={}&abort=true",
                self.endpoint, self.start_ts
            ))
            .send()
            .await;
        if let Err(err) = result {
            tracing::debug!(start_ts = self.start_ts, "failed to abort transaction: {err}");
        }
    }

    async fn query(
        &mut self,
        query: &str,
        vars: &HashMap<String, String>,
    ) -> Result<Value, ClientError> {
        if self.finished {
            return Err(ClientError::TxnFinished);
        }
        let mut url = format!("{}/query", self.endpoint);
        if self.read_only {
            url.push_str("?ro=true");
        }
        let body: Value = self
            .http
            .post(url)
            .json(&json!({ "query": query, "variables": vars }))
            .send()
            .await?
            .json()
            .await?;
        expect_data("query", body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mutate_once;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Minimal canned-response Alpha: mutates succeed and hand out a
    /// transaction context, commits succeed or fail per `commit_ok`, and any
    /// `abort=true` request trips the flag.
    async fn spawn_stub_alpha(commit_ok: bool, aborted: Arc<AtomicBool>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            loop {
                let Ok((mut stream, _)) = listener.accept().await else {
                    break;
                };
                let aborted = aborted.clone();
                tokio::spawn(async move {
                    let mut buf: Vec<u8> = Vec::new();
                    loop {
                        // Read one request: headers, then Content-Length body.
                        let head_end = loop {
                            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                                break pos + 4;
                            }
                            let mut chunk = [0u8; 4096];
                            match stream.read(&mut chunk).await {
                                Ok(0) | Err(_) => return,
                                Ok(n) => buf.extend_from_slice(&chunk[..n]),
                            }
                        };
                        let head = String::from_utf8_lossy(&buf[..head_end]).to_string();
                        let content_length = head
                            .lines()
                            .find_map(|line| {
                                let (name, value) = line.split_once(':')?;
                                if name.eq_ignore_ascii_case("content-length") {
                                    value.trim().parse::<usize>().ok()
                                } else {
                                    None
                                }
                            })
                            .unwrap_or(0);
                        while buf.len() < head_end + content_length {
                            let mut chunk = [0u8; 4096];
                            match stream.read(&mut chunk).await {
                                Ok(0) | Err(_) => return,
                                Ok(n) => buf.extend_from_slice(&chunk[..n]),
                            }
                        }
                        buf.drain(..head_end + content_length);

                        let request_line = head.lines().next().unwrap_or_default();
                        let body = if request_line.contains("/mutate") {
                            r#"{"data":{"code":"Success","uids":{"node":"0x1"}},"extensions":{"txn":{"start_ts":7,"keys":["k1"],"preds":["p1"]}}}"#
                        } else if request_line.contains("abort=true") {
                            aborted.store(true, Ordering::SeqCst);
                            r#"{"data":{"code":"Success"}}"#
                        } else if commit_ok {
                            r#"{"data":{"code":"Success"}}"#
                        } else {
                            r#"{"errors":[{"message":"commit refused"}]}"#
                        };
                        let response = format!(
                            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{}",
                            body.len(),
                            body
                        );
                        if stream.write_all(response.as_bytes()).await.is_err() {
                            return;
                        }
                    }
                });
            }
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn a_failed_commit_is_still_aborted_by_discard() {
        let aborted = Arc::new(AtomicBool::new(false));
        let endpoint = spawn_stub_alpha(false, aborted.clone()).await;
        let client = DgraphClient::new(&endpoint);

        let result = mutate_once(&client, json!({"uid": "_:node", "name": "x"})).await;
        assert!(matches!(result, Err(ClientError::Rejected { .. })));
        // The per-row helper discards on the failure path, which must reach
        // the server as an abort of the open transaction.
        assert!(aborted.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn a_successful_commit_makes_discard_a_no_op() {
        let aborted = Arc::new(AtomicBool::new(false));
        let endpoint = spawn_stub_alpha(true, aborted.clone()).await;
        let client = DgraphClient::new(&endpoint);

        let assigned = mutate_once(&client, json!({"uid": "_:node", "name": "x"}))
            .await
            .unwrap();
        assert_eq!(assigned.single(), Some("0x1"));
        assert!(!aborted.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn an_unmutated_transaction_commits_and_discards_locally() {
        // No start_ts was ever assigned, so neither call may touch the
        // network; an unreachable endpoint proves it.
        let client = DgraphClient::new("http://127.0.0.1:1");
        let mut txn = client.txn(false);
        txn.commit().await.unwrap();
        txn.discard().await;
    }
}
