use std::time::Duration;

use async_trait::async_trait;
use reqwest::{multipart, Client, ClientBuilder};
use thiserror::Error;
use tracing::debug;

use super::types::{ChatReply, ChatRequest, UploadFile, UploadReply, UploadResponse};

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("failed to connect to {url}: {source}")]
    Connect {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("could not decode response from {url}: {details}")]
    Decode { url: String, details: String },

    #[error("invalid upload part for {file}: {source}")]
    Part {
        file: String,
        #[source]
        source: reqwest::Error,
    },
}

impl BackendError {
    fn from_send(url: &str, e: reqwest::Error) -> Self {
        let url = url.to_string();
        if e.is_connect() {
            BackendError::Connect { url, source: e }
        } else if e.is_timeout() {
            BackendError::Timeout { url }
        } else {
            BackendError::Request { url, source: e }
        }
    }
}

/// The two endpoints the widget talks to.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn send_chat(&self, message: &str) -> Result<ChatReply, BackendError>;

    async fn upload(&self, file: UploadFile) -> Result<UploadResponse, BackendError>;
}

#[derive(Debug, Clone)]
pub struct HttpBackendConfig {
    pub base_url: String,
    pub chat_path: String,
    pub upload_path: String,
    pub timeout: Option<Duration>,
}

impl Default for HttpBackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            chat_path: "/chat".to_string(),
            upload_path: "/upload".to_string(),
            timeout: None,
        }
    }
}

pub struct HttpBackend {
    client: Client,
    chat_url: String,
    upload_url: String,
}

impl HttpBackend {
    pub fn new(config: &HttpBackendConfig) -> Result<Self, BackendError> {
        let mut builder = ClientBuilder::new();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(BackendError::Client)?;

        let base = config.base_url.trim_end_matches('/');
        Ok(Self {
            client,
            chat_url: format!("{}{}", base, config.chat_path),
            upload_url: format!("{}{}", base, config.upload_path),
        })
    }

    pub fn chat_url(&self) -> &str {
        &self.chat_url
    }

    pub fn upload_url(&self) -> &str {
        &self.upload_url
    }
}

#[async_trait]
impl ChatBackend for HttpBackend {
    async fn send_chat(&self, message: &str) -> Result<ChatReply, BackendError> {
        let response = self
            .client
            .post(&self.chat_url)
            .json(&ChatRequest { message })
            .send()
            .await
            .map_err(|e| BackendError::from_send(&self.chat_url, e))?;

        // The body is read whatever the status; error replies simply lack `response`.
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| BackendError::from_send(&self.chat_url, e))?;
        debug!(%status, bytes = body.len(), "chat reply received");

        serde_json::from_str(&body).map_err(|e| BackendError::Decode {
            url: self.chat_url.clone(),
            details: e.to_string(),
        })
    }

    async fn upload(&self, file: UploadFile) -> Result<UploadResponse, BackendError> {
        let file_name = file.name.clone();
        let mut part = multipart::Part::bytes(file.bytes).file_name(file.name);
        if let Some(mime) = file.mime.as_deref() {
            part = part.mime_str(mime).map_err(|e| BackendError::Part {
                file: file_name.clone(),
                source: e,
            })?;
        }
        let form = multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(&self.upload_url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| BackendError::from_send(&self.upload_url, e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| BackendError::from_send(&self.upload_url, e))?;
        debug!(%status, file = %file_name, "upload reply received");

        match serde_json::from_str::<UploadReply>(&body) {
            Ok(reply) => Ok(UploadResponse {
                http_ok: status.is_success(),
                reply,
            }),
            // A failed status with a non-JSON body is still a server answer.
            Err(_) if !status.is_success() => Ok(UploadResponse {
                http_ok: false,
                reply: UploadReply::default(),
            }),
            Err(e) => Err(BackendError::Decode {
                url: self.upload_url.clone(),
                details: e.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::{
        matchers::{body_json, header_regex, method, path},
        Mock, MockServer, ResponseTemplate,
    };

    fn backend_for(server: &MockServer) -> HttpBackend {
        HttpBackend::new(&HttpBackendConfig {
            base_url: server.uri(),
            ..HttpBackendConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_urls_join_base_and_paths() {
        let backend = HttpBackend::new(&HttpBackendConfig {
            base_url: "http://example.test/".to_string(),
            ..HttpBackendConfig::default()
        })
        .unwrap();
        assert_eq!(backend.chat_url(), "http://example.test/chat");
        assert_eq!(backend.upload_url(), "http://example.test/upload");
    }

    #[tokio::test]
    async fn test_send_chat_posts_message_json() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat"))
            .and(body_json(json!({ "message": "Hello" })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "response": "Hi", "nuevo_conteo": 3 })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let reply = backend_for(&server).send_chat("Hello").await.unwrap();
        assert_eq!(reply.reply_text(), Some("Hi"));
        assert_eq!(reply.credit_count(), Some(3));
    }

    #[tokio::test]
    async fn test_send_chat_reads_body_of_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({ "error": "boom" })))
            .mount(&server)
            .await;

        let reply = backend_for(&server).send_chat("Hello").await.unwrap();
        assert_eq!(reply.reply_text(), None);
    }

    #[tokio::test]
    async fn test_send_chat_rejects_non_json_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let err = backend_for(&server).send_chat("Hello").await.unwrap_err();
        assert!(matches!(err, BackendError::Decode { .. }));
    }

    #[tokio::test]
    async fn test_send_chat_connection_refused() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let backend = HttpBackend::new(&HttpBackendConfig {
            base_url: format!("http://127.0.0.1:{}", port),
            ..HttpBackendConfig::default()
        })
        .unwrap();

        let err = backend.send_chat("Hello").await.unwrap_err();
        assert!(matches!(
            err,
            BackendError::Connect { .. } | BackendError::Request { .. }
        ));
    }

    #[tokio::test]
    async fn test_upload_sends_multipart() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/upload"))
            .and(header_regex("content-type", "^multipart/form-data"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
            .expect(1)
            .mount(&server)
            .await;

        let file = UploadFile::new("ventas.csv", b"a,b\n1,2\n".to_vec()).with_mime("text/csv");
        let response = backend_for(&server).upload(file).await.unwrap();
        assert!(response.http_ok);
        assert!(response.reply.success);

        let requests = server.received_requests().await.unwrap();
        let body = String::from_utf8_lossy(&requests[0].body);
        assert!(body.contains("name=\"file\""));
        assert!(body.contains("filename=\"ventas.csv\""));
    }

    #[tokio::test]
    async fn test_upload_failure_with_plain_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/upload"))
            .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
            .mount(&server)
            .await;

        let response = backend_for(&server)
            .upload(UploadFile::new("x.csv", vec![1, 2, 3]))
            .await
            .unwrap();
        assert!(!response.http_ok);
        assert!(!response.reply.success);
        assert_eq!(response.reply.failure_reason(), None);
    }
}
