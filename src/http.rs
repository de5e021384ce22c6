//! Blocking HTTP transport
//!
//! Only compiled with the `http` feature. One `ureq` agent is shared by every
//! request; it keeps connections alive and enforces the configured per-attempt
//! timeout. Non-2xx responses come back as [`DocDbError::Service`] so the
//! retry layer can classify them.

use docdb_core::constants::headers;
use docdb_core::{paths, DocDbError, DocDbResult, DocumentServiceRequest, DocumentServiceResponse, Transport};
use std::time::Duration;

/// Content type of every request body.
const CONTENT_TYPE_JSON: &str = "application/json";
/// Content type of query bodies.
const CONTENT_TYPE_QUERY: &str = "application/query+json";

/// [`Transport`] over HTTPS with `ureq`
pub struct HttpTransport {
    agent: ureq::Agent,
}

impl HttpTransport {
    /// Transport whose attempts time out after `timeout`
    pub fn new(timeout: Duration) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build();
        Self {
            agent: ureq::Agent::new_with_config(config),
        }
    }
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport").finish()
    }
}

/// `endpoint` and `path` joined with exactly one slash
pub(crate) fn request_url(endpoint: &str, path: &str) -> String {
    format!("{}/{}", endpoint.trim_end_matches('/'), paths::trim_slashes(path))
}

fn transport_error(url: &str, e: ureq::Error) -> DocDbError {
    match e {
        ureq::Error::Timeout(_) => DocDbError::transport(format!("request to {} timed out", url)),
        other => DocDbError::transport(format!("request to {} failed: {}", url, other)),
    }
}

impl Transport for HttpTransport {
    fn execute(
        &self,
        request: &DocumentServiceRequest,
        endpoint: &str,
    ) -> DocDbResult<DocumentServiceResponse> {
        let url = request_url(endpoint, request.path());
        let method = request.operation_type().http_method();
        let content_type = if request.header(headers::IS_QUERY).is_some() {
            CONTENT_TYPE_QUERY
        } else {
            CONTENT_TYPE_JSON
        };

        tracing::debug!(
            target: "docdb::http",
            method,
            url = %url,
            activity_id = request.activity_id(),
            "Sending request"
        );

        let result = match method {
            "POST" | "PUT" => {
                let mut builder = if method == "POST" {
                    self.agent.post(&url)
                } else {
                    self.agent.put(&url)
                };
                builder = builder
                    .header("Content-Type", content_type)
                    .header(headers::ACTIVITY_ID, request.activity_id());
                for (name, value) in request.headers() {
                    builder = builder.header(name.as_str(), value.as_str());
                }
                builder.send(request.body().unwrap_or_default())
            }
            _ => {
                let mut builder = match method {
                    "DELETE" => self.agent.delete(&url),
                    "HEAD" => self.agent.head(&url),
                    _ => self.agent.get(&url),
                };
                builder = builder.header(headers::ACTIVITY_ID, request.activity_id());
                for (name, value) in request.headers() {
                    builder = builder.header(name.as_str(), value.as_str());
                }
                builder.call()
            }
        };
        let mut response = result.map_err(|e| transport_error(&url, e))?;

        let status = response.status().as_u16();
        let mut converted = DocumentServiceResponse::new(status);
        for (name, value) in response.headers() {
            if let Ok(value) = value.to_str() {
                converted = converted.with_header(name.as_str(), value);
            }
        }
        let body = response
            .body_mut()
            .read_to_vec()
            .map_err(|e| DocDbError::transport(format!("failed to read response body: {}", e)))?;
        let converted = converted.with_body(body);

        if converted.is_success() {
            Ok(converted)
        } else {
            let error = converted.to_service_error();
            tracing::debug!(
                target: "docdb::http",
                status = error.status,
                sub_status = ?error.sub_status,
                url = %url,
                "Request failed"
            );
            Err(DocDbError::Service(error))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_url_joins_with_one_slash() {
        assert_eq!(
            request_url("https://acct.example.com/", "/dbs/a/colls/b/"),
            "https://acct.example.com/dbs/a/colls/b"
        );
        assert_eq!(request_url("https://acct.example.com", "dbs"), "https://acct.example.com/dbs");
        assert_eq!(request_url("https://acct.example.com/", ""), "https://acct.example.com/");
    }

    #[test]
    fn test_unreachable_endpoint_is_a_transport_error() {
        let transport = HttpTransport::new(Duration::from_millis(200));
        let request = DocumentServiceRequest::new(
            docdb_core::OperationType::Read,
            docdb_core::ResourceType::DatabaseAccount,
            "",
        );
        let err = transport.execute(&request, "http://127.0.0.1:9/").unwrap_err();
        assert!(matches!(err, DocDbError::Transport(_)));
    }
}
