//! # Admin Transport
//!
//! Signed PATCH requests against the gateway's admin endpoints.
//!
//! [`AdminClient::patch`] never fails: transport errors come back as a
//! synthesized status 500 whose body is the error text, so callers deal with
//! exactly one shape of result.

use std::time::Duration;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HOST};
use reqwest::Url;
use tracing::{debug, error};

use super::sigv4::{canonical_query_string, Signer};
use crate::backend::BackendError;
use crate::constants::ADMIN_REQUEST_TIMEOUT_SECS;

/// Status used when the request never produced an HTTP response
pub const TRANSPORT_FAILURE_STATUS: u16 = 500;

/// Status and body of one admin call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminResponse {
    pub status: u16,
    pub body: String,
}

impl AdminResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// HTTP client for the admin API
#[derive(Debug, Clone)]
pub struct AdminClient {
    http: reqwest::Client,
    base: Url,
    host: String,
    signer: Signer,
}

impl AdminClient {
    /// # Errors
    ///
    /// [`BackendError::Unavailable`] if the endpoint is not a valid http(s) URL
    /// or the HTTP client cannot be built.
    pub fn new(endpoint_url: &str, access_key: &str, secret_key: &str) -> Result<Self, BackendError> {
        let base = Url::parse(endpoint_url).map_err(|e| {
            BackendError::Unavailable(format!("invalid endpoint URL '{endpoint_url}': {e}"))
        })?;
        let host = match (base.host_str(), base.port()) {
            (Some(host), Some(port)) => format!("{host}:{port}"),
            (Some(host), None) => host.to_string(),
            (None, _) => {
                return Err(BackendError::Unavailable(format!(
                    "endpoint URL '{endpoint_url}' has no host"
                )))
            }
        };

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(ADMIN_REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| BackendError::Unavailable(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base,
            host,
            signer: Signer::new(access_key, secret_key),
        })
    }

    /// Send a signed PATCH to `path` with the given raw query pairs and optional XML body
    pub async fn patch(&self, path: &str, query: &[(&str, &str)], body: Option<String>) -> AdminResponse {
        let full_path = format!("{}{path}", self.base.path().trim_end_matches('/'));
        let canonical_query = canonical_query_string(query);

        let mut url = self.base.clone();
        url.set_path(&full_path);
        url.set_query((!canonical_query.is_empty()).then_some(canonical_query.as_str()));

        let payload = body.unwrap_or_default();
        let signed = self.signer.sign(
            "PATCH",
            &self.host,
            &full_path,
            query,
            payload.as_bytes(),
            chrono::Utc::now(),
        );

        let mut request = self
            .http
            .patch(url)
            .header(HOST, signed.host)
            .header("x-amz-date", signed.x_amz_date)
            .header("x-amz-content-sha256", signed.x_amz_content_sha256)
            .header(AUTHORIZATION, signed.authorization);
        if !payload.is_empty() {
            request = request.header(CONTENT_TYPE, "application/xml").body(payload);
        }

        debug!(path = %full_path, "Sending admin request");
        match request.send().await {
            Ok(response) => {
                let status = response.status().as_u16();
                let body = match response.text().await {
                    Ok(body) => body,
                    Err(e) => {
                        error!(path = %full_path, status, error = %e, "Failed to read admin response body");
                        return AdminResponse {
                            status: TRANSPORT_FAILURE_STATUS,
                            body: e.to_string(),
                        };
                    }
                };
                AdminResponse { status, body }
            }
            Err(e) => {
                error!(path = %full_path, error = %e, "Admin request failed");
                AdminResponse {
                    status: TRANSPORT_FAILURE_STATUS,
                    body: e.to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_includes_explicit_port() {
        let client = AdminClient::new("http://gateway:7070", "ak", "sk").unwrap();
        assert_eq!(client.host, "gateway:7070");

        let client = AdminClient::new("https://gateway.example.com", "ak", "sk").unwrap();
        assert_eq!(client.host, "gateway.example.com");
    }

    #[test]
    fn test_invalid_endpoint_is_unavailable() {
        let err = AdminClient::new("not a url", "ak", "sk").unwrap_err();
        assert!(matches!(err, BackendError::Unavailable(_)));
    }

    #[test]
    fn test_response_success_range() {
        let ok = AdminResponse {
            status: 204,
            body: String::new(),
        };
        let not_found = AdminResponse {
            status: 404,
            body: String::new(),
        };
        assert!(ok.is_success());
        assert!(!not_found.is_success());
    }
}
