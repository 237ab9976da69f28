//! JSON-over-HTTP dispatcher
//!
//! Requests are plain DMR JSON:
//!
//! ```text
//! POST <endpoint>/management
//! {"operation": "read-children-types", "address": [{"subsystem": "logging"}]}
//! ```
//!
//! Failed operations come back with a non-2xx status and a body of
//! `{"outcome": "failed", "failure-description": ...}`, so the body is
//! inspected before the status.

use async_trait::async_trait;
use modelmeta_common::config::ClientConfig;
use modelmeta_common::dmr::names;
use modelmeta_common::{
    Composite, CompositeResult, DispatchError, DispatchResult, Dispatcher, ModelNode, Operation,
    Outcome,
};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

/// Dispatcher posting to a management endpoint
pub struct HttpDispatcher {
    client: reqwest::Client,
    url: String,
}

impl HttpDispatcher {
    /// Create a dispatcher for `config.endpoint`
    pub fn new(config: &ClientConfig) -> DispatchResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| DispatchError::transport(e.to_string()))?;
        Ok(Self {
            client,
            url: management_url(&config.endpoint),
        })
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Post one DMR request and return the decoded response body
    async fn post(&self, name: &str, body: &ModelNode) -> DispatchResult<ModelNode> {
        debug!(url = %self.url, operation = name, "Sending management request");
        let response = self
            .client
            .post(&self.url)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    DispatchError::Timeout
                } else {
                    DispatchError::transport(e.to_string())
                }
            })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| {
            if e.is_timeout() {
                DispatchError::Timeout
            } else {
                DispatchError::transport(e.to_string())
            }
        })?;
        match serde_json::from_str::<ModelNode>(&text) {
            Ok(node) if node.get(names::OUTCOME).is_some() => Ok(node),
            _ if !status.is_success() => {
                warn!(url = %self.url, status = %status, operation = name, "Management request rejected");
                Err(DispatchError::transport(format!(
                    "management endpoint returned status {status}: {text}"
                )))
            }
            Ok(_) => Err(DispatchError::decode(format!("response without outcome: {text}"))),
            Err(e) => Err(DispatchError::decode(e.to_string())),
        }
    }
}

#[async_trait]
impl Dispatcher for HttpDispatcher {
    fn name(&self) -> &str {
        "http"
    }

    async fn execute(&self, operation: &Operation) -> DispatchResult<ModelNode> {
        let response = self.post(operation.name(), &operation.to_model_node()).await?;
        single_result(operation, response)
    }

    async fn execute_composite(&self, composite: &Composite) -> DispatchResult<CompositeResult> {
        let response = self.post(names::COMPOSITE, &composite.to_model_node()).await?;
        composite_result(composite, &response)
    }
}

fn management_url(endpoint: &str) -> String {
    format!("{}/management", endpoint.trim_end_matches('/'))
}

fn failure_description(response: &ModelNode) -> String {
    match response.get(names::FAILURE_DESCRIPTION) {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => "no failure description".to_string(),
    }
}

fn single_result(operation: &Operation, mut response: ModelNode) -> DispatchResult<ModelNode> {
    match Outcome::of(&response) {
        Outcome::Success => Ok(response
            .get_mut(names::RESULT)
            .map(Value::take)
            .unwrap_or(Value::Null)),
        Outcome::Failed => Err(DispatchError::failed(
            operation.to_string(),
            failure_description(&response),
        )),
    }
}

/// Step results are returned even when the composite failed as a whole,
/// so callers can tell which step broke
fn composite_result(composite: &Composite, response: &ModelNode) -> DispatchResult<CompositeResult> {
    if response.get(names::RESULT).is_some_and(Value::is_object) {
        return CompositeResult::from_response(response);
    }
    match Outcome::of(response) {
        Outcome::Failed => Err(DispatchError::failed(
            format!("composite of {} steps", composite.len()),
            failure_description(response),
        )),
        Outcome::Success => Err(DispatchError::decode("composite response without steps")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modelmeta_common::ResourceAddress;
    use serde_json::json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn config(endpoint: String, timeout_ms: u64) -> ClientConfig {
        ClientConfig {
            endpoint,
            timeout_ms,
        }
    }

    /// Serve one request with the given status and body, returning the request body
    async fn serve_once(status: &'static str, body: ModelNode) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let endpoint = format!("http://{}", listener.local_addr().unwrap());
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            let body_start = loop {
                let n = socket.read(&mut buf).await.unwrap();
                request.extend_from_slice(&buf[..n]);
                if let Some(pos) = request.windows(4).position(|w| w == b"\r\n\r\n") {
                    break pos + 4;
                }
            };
            let headers = String::from_utf8_lossy(&request[..body_start]).to_lowercase();
            let length: usize = headers
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .map_or(0, |v| v.trim().parse().unwrap());
            while request.len() < body_start + length {
                let n = socket.read(&mut buf).await.unwrap();
                request.extend_from_slice(&buf[..n]);
            }
            let payload = body.to_string();
            let response = format!(
                "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{payload}",
                payload.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
            String::from_utf8_lossy(&request[body_start..]).into_owned()
        });
        (endpoint, handle)
    }

    fn logging() -> ResourceAddress {
        ResourceAddress::root().add("subsystem", "logging")
    }

    #[test]
    fn test_management_url() {
        assert_eq!(management_url("http://localhost:9990"), "http://localhost:9990/management");
        assert_eq!(management_url("http://localhost:9990/"), "http://localhost:9990/management");
    }

    #[test]
    fn test_single_result_mapping() {
        let op = Operation::new(logging(), names::READ_CHILDREN_TYPES_OPERATION);
        let ok = single_result(&op, json!({"outcome": "success", "result": ["logger"]})).unwrap();
        assert_eq!(ok, json!(["logger"]));

        let err = single_result(
            &op,
            json!({"outcome": "failed", "failure-description": "WFLYCTL0216: not found"}),
        )
        .unwrap_err();
        assert!(matches!(err, DispatchError::Failed { ref description, .. } if description.contains("WFLYCTL0216")));
    }

    #[test]
    fn test_composite_result_mapping() {
        let composite = Composite::from(vec![
            Operation::new(logging(), names::READ_RESOURCE_DESCRIPTION_OPERATION),
            Operation::new(logging().add("logger", "*"), names::READ_RESOURCE_DESCRIPTION_OPERATION),
        ]);
        let response = json!({
            "outcome": "failed",
            "failure-description": "WFLYCTL0062: Composite operation failed",
            "result": {
                "step-1": {"outcome": "success", "result": {"description": "logging"}},
                "step-2": {"outcome": "failed", "failure-description": "not found"},
            },
        });
        let result = composite_result(&composite, &response).unwrap();
        assert_eq!(result.len(), 2);
        assert!(!result.step(0).unwrap().is_failure());
        assert!(result.step(1).unwrap().is_failure());

        let rejected = json!({"outcome": "failed", "failure-description": "WFLYCTL0313: Unauthorized"});
        assert!(matches!(
            composite_result(&composite, &rejected),
            Err(DispatchError::Failed { .. })
        ));
    }

    #[tokio::test]
    async fn test_execute_over_http() {
        let (endpoint, server) = serve_once(
            "200 OK",
            json!({"outcome": "success", "result": ["logger", "console-handler"]}),
        )
        .await;
        let dispatcher = HttpDispatcher::new(&config(endpoint, 5_000)).unwrap();
        let op = Operation::new(logging(), names::READ_CHILDREN_TYPES_OPERATION);
        let result = dispatcher.execute(&op).await.unwrap();
        assert_eq!(result, json!(["logger", "console-handler"]));

        let request: ModelNode = serde_json::from_str(&server.await.unwrap()).unwrap();
        assert_eq!(request["operation"], json!("read-children-types"));
        assert_eq!(request["address"], json!([{"subsystem": "logging"}]));
    }

    #[tokio::test]
    async fn test_failed_outcome_with_error_status() {
        let (endpoint, server) = serve_once(
            "500 Internal Server Error",
            json!({"outcome": "failed", "failure-description": "WFLYCTL0030: No resource definition"}),
        )
        .await;
        let dispatcher = HttpDispatcher::new(&config(endpoint, 5_000)).unwrap();
        let op = Operation::new(logging().add("logger", "missing"), "read-resource");
        let err = dispatcher.execute(&op).await.unwrap_err();
        assert!(matches!(err, DispatchError::Failed { .. }));
        assert!(!err.is_retryable());
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_http_error_is_transport() {
        let (endpoint, server) = serve_once("503 Service Unavailable", json!("booting")).await;
        let dispatcher = HttpDispatcher::new(&config(endpoint, 5_000)).unwrap();
        let op = Operation::new(ResourceAddress::root(), "read-resource");
        let err = dispatcher.execute(&op).await.unwrap_err();
        assert!(matches!(err, DispatchError::Transport(_)));
        assert!(err.is_retryable());
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_timeout() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let endpoint = format!("http://{}", listener.local_addr().unwrap());
        let server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(2)).await;
            drop(socket);
        });
        let dispatcher = HttpDispatcher::new(&config(endpoint, 100)).unwrap();
        let op = Operation::new(ResourceAddress::root(), "read-resource");
        let err = dispatcher.execute(&op).await.unwrap_err();
        assert!(matches!(err, DispatchError::Timeout));
        server.abort();
    }
}
