//! crates/status/src/client.rs
//! Blocking HTTP implementation of [`StatusReporter`].

use std::time::Duration;

use serde_json::{Value, json};

use crate::error::{StatusError, StatusResult};
use crate::StatusReporter;

const METHOD_START: &str = "startMirroring";
const METHOD_COMPLETE: &str = "mirrorComplete";
const METHOD_FAILED: &str = "mirrorFailed";

/// Stateless client POSTing `{"method": ..., "params": [...]}` envelopes to
/// the tracking service endpoint.
pub struct HttpStatusClient {
    agent: ureq::Agent,
    endpoint: String,
}

impl HttpStatusClient {
    /// Creates a client for `endpoint` with a fixed per-request `timeout`.
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Self {
        Self {
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
            endpoint: endpoint.into(),
        }
    }

    fn call(&self, method: &'static str, params: Value) -> StatusResult<()> {
        let body = json!({ "method": method, "params": params });
        match self.agent.post(&self.endpoint).send_json(body) {
            Ok(_) => {
                tracing::debug!(target: "puller::status", method, "delivered");
                Ok(())
            }
            Err(ureq::Error::Status(status, _)) => Err(StatusError::Rejected { method, status }),
            Err(ureq::Error::Transport(transport)) => Err(StatusError::Transport {
                method,
                detail: transport.to_string(),
            }),
        }
    }
}

impl StatusReporter for HttpStatusClient {
    fn start_mirroring(&self, branch_id: u64) -> StatusResult<()> {
        self.call(METHOD_START, json!([branch_id]))
    }

    fn mirror_complete(&self, branch_id: u64, last_revision: &str) -> StatusResult<()> {
        self.call(METHOD_COMPLETE, json!([branch_id, last_revision]))
    }

    fn mirror_failed(&self, branch_id: u64, reason: &str) -> StatusResult<()> {
        self.call(METHOD_FAILED, json!([branch_id, reason]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::TcpListener;
    use std::sync::mpsc;
    use std::thread;

    /// Accepts one connection, answers 200, and hands back the request body.
    fn one_shot_server(status_line: &'static str) -> (String, mpsc::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let endpoint = format!("http://{}", listener.local_addr().unwrap());
        let (sender, receiver) = mpsc::channel();
        thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream);
            let mut content_length = 0usize;
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).unwrap();
                if let Some(value) = line.to_ascii_lowercase().strip_prefix("content-length:") {
                    content_length = value.trim().parse().unwrap();
                }
                if line == "\r\n" {
                    break;
                }
            }
            let mut body = vec![0u8; content_length];
            reader.read_exact(&mut body).unwrap();
            let mut stream = reader.into_inner();
            write!(stream, "{status_line}\r\ncontent-length: 0\r\n\r\n").unwrap();
            let _ = sender.send(String::from_utf8(body).unwrap());
        });
        (endpoint, receiver)
    }

    #[test]
    fn start_mirroring_posts_the_envelope() {
        let (endpoint, body) = one_shot_server("HTTP/1.1 200 OK");
        let client = HttpStatusClient::new(endpoint, Duration::from_secs(5));

        client.start_mirroring(42).unwrap();

        let sent: Value = serde_json::from_str(&body.recv().unwrap()).unwrap();
        assert_eq!(sent, json!({ "method": "startMirroring", "params": [42] }));
    }

    #[test]
    fn mirror_failed_carries_the_reason() {
        let (endpoint, body) = one_shot_server("HTTP/1.1 200 OK");
        let client = HttpStatusClient::new(endpoint, Duration::from_secs(5));

        client.mirror_failed(7, "not a branch").unwrap();

        let sent: Value = serde_json::from_str(&body.recv().unwrap()).unwrap();
        assert_eq!(
            sent,
            json!({ "method": "mirrorFailed", "params": [7, "not a branch"] })
        );
    }

    #[test]
    fn rejection_surfaces_the_http_status() {
        let (endpoint, _body) = one_shot_server("HTTP/1.1 503 Unavailable");
        let client = HttpStatusClient::new(endpoint, Duration::from_secs(5));

        let result = client.mirror_complete(42, "rev-1");
        assert!(matches!(
            result,
            Err(StatusError::Rejected { method: "mirrorComplete", status: 503 })
        ));
    }

    #[test]
    fn unreachable_endpoint_is_a_transport_error() {
        // Reserved TEST-NET-1 address; nothing listens there.
        let client = HttpStatusClient::new("http://192.0.2.1:1/", Duration::from_millis(200));

        let result = client.start_mirroring(1);
        assert!(matches!(result, Err(StatusError::Transport { .. })));
    }
}
