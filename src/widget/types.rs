use std::fmt;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sender {
    User,
    Ai,
}

impl Sender {
    pub fn label(&self) -> &'static str {
        match self {
            Sender::User => "You",
            Sender::Ai => "Analyst",
        }
    }
}

/// A single transcript entry. Never mutated once rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub sender: Sender,
    pub text: String,
}

impl Message {
    pub fn new(text: impl Into<String>, sender: Sender) -> Self {
        Self {
            sender,
            text: text.into(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(text, Sender::User)
    }

    pub fn ai(text: impl Into<String>) -> Self {
        Self::new(text, Sender::Ai)
    }

    /// Rendered lines; every `\n` in the text is a line break.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.text.split('\n')
    }
}

/// Handle to a rendered bubble, used to take down the typing indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BubbleId(pub u64);

/// Remaining usage allowance, shown as "current / total".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditCounter {
    pub current: i64,
    pub total: u32,
}

impl CreditCounter {
    pub fn new(current: i64, total: u32) -> Self {
        Self { current, total }
    }

    /// Pulls the denominator out of text shaped like "2 / 5". Anything that
    /// does not yield a number after the first '/' gives `fallback`.
    pub fn denominator_from(text: &str, fallback: u32) -> u32 {
        text.split('/')
            .nth(1)
            .and_then(|total| total.trim().parse().ok())
            .unwrap_or(fallback)
    }
}

impl fmt::Display for CreditCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {}", self.current, self.total)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum UploadStatus {
    #[default]
    Idle,
    Pending,
    Success(String),
    Error(String),
}

// Wire types for the two endpoints.

#[derive(Debug, Serialize)]
pub struct ChatRequest<'a> {
    pub message: &'a str,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatReply {
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default)]
    pub nuevo_conteo: Option<serde_json::Value>,
}

impl ChatReply {
    /// The reply text, if the server produced a non-empty one.
    pub fn reply_text(&self) -> Option<&str> {
        self.response.as_deref().filter(|text| !text.is_empty())
    }

    /// The updated credit count. Only integral numbers are accepted.
    pub fn credit_count(&self) -> Option<i64> {
        let raw = self.nuevo_conteo.as_ref()?;
        let count = match raw {
            serde_json::Value::Number(n) => n.as_i64().or_else(|| {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0 && f.is_finite())
                    .map(|f| f as i64)
            }),
            _ => None,
        };
        if count.is_none() {
            debug!(nuevo_conteo = %raw, "credit count ignored");
        }
        count
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UploadReply {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl UploadReply {
    /// Server-provided explanation for a failed upload, `error` first.
    pub fn failure_reason(&self) -> Option<&str> {
        self.error
            .as_deref()
            .or(self.message.as_deref())
            .filter(|reason| !reason.is_empty())
    }
}

/// What the upload endpoint said, together with whether HTTP succeeded.
#[derive(Debug, Clone)]
pub struct UploadResponse {
    pub http_ok: bool,
    pub reply: UploadReply,
}

/// A file picked by the user, read fully into memory before sending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub name: String,
    pub bytes: Vec<u8>,
    pub mime: Option<String>,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
            mime: None,
        }
    }

    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = Some(mime.into());
        self
    }

    pub async fn from_path(path: &Path) -> anyhow::Result<Self> {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read file: {}", path.display()))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let mime = match path.extension().and_then(|e| e.to_str()) {
            Some("csv") => Some("text/csv"),
            Some("json") => Some("application/json"),
            Some("txt") => Some("text/plain"),
            Some("xlsx") => {
                Some("application/vnd.openxmlformats-officedocument.spreadsheetml.sheet")
            }
            _ => None,
        };
        Ok(Self {
            name,
            bytes,
            mime: mime.map(str::to_string),
        })
    }
}
