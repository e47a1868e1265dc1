use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use super::backend::ChatBackend;
use super::text::WidgetText;
use super::types::{BubbleId, CreditCounter, Message, Sender, UploadFile, UploadStatus};
use super::view::ChatView;

/// What happens when a send starts while another is still waiting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SendPolicy {
    /// Each send runs independently with its own typing indicator.
    #[default]
    Overlap,
    /// A send waits for the previous one to finish before posting.
    Serialize,
}

impl std::str::FromStr for SendPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "overlap" => Ok(SendPolicy::Overlap),
            "serialize" => Ok(SendPolicy::Serialize),
            _ => Err(anyhow::anyhow!("Unknown send policy: {}", s)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct WidgetOptions {
    pub text: WidgetText,
    pub send_policy: SendPolicy,
    pub highlight: Duration,
    pub fallback_total: u32,
}

impl Default for WidgetOptions {
    fn default() -> Self {
        Self {
            text: WidgetText::default(),
            send_policy: SendPolicy::Overlap,
            highlight: Duration::from_millis(500),
            fallback_total: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// Blank input; nothing rendered, nothing sent.
    Ignored,
    Replied { credits: Option<CreditCounter> },
    NoReply,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    NoFile,
    Uploaded(String),
    Rejected(String),
    Failed,
}

/// Drives the transcript, the send flow, uploads and the credit counter.
///
/// Cloning is cheap; every clone renders into the same view, so each user
/// action can run as its own task.
pub struct ChatWidget<V, B> {
    view: Arc<Mutex<V>>,
    backend: Arc<B>,
    options: Arc<WidgetOptions>,
    send_gate: Arc<tokio::sync::Mutex<()>>,
    flash_generation: Arc<AtomicU64>,
}

impl<V, B> Clone for ChatWidget<V, B> {
    fn clone(&self) -> Self {
        Self {
            view: Arc::clone(&self.view),
            backend: Arc::clone(&self.backend),
            options: Arc::clone(&self.options),
            send_gate: Arc::clone(&self.send_gate),
            flash_generation: Arc::clone(&self.flash_generation),
        }
    }
}

impl<V, B> ChatWidget<V, B>
where
    V: ChatView + 'static,
    B: ChatBackend + 'static,
{
    pub fn new(view: Arc<Mutex<V>>, backend: Arc<B>, options: WidgetOptions) -> Self {
        Self {
            view,
            backend,
            options: Arc::new(options),
            send_gate: Arc::new(tokio::sync::Mutex::new(())),
            flash_generation: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn view(&self) -> &Arc<Mutex<V>> {
        &self.view
    }

    pub fn options(&self) -> &WidgetOptions {
        &self.options
    }

    // The view lock is never held across an await.
    fn with_view<R>(&self, f: impl FnOnce(&mut V) -> R) -> R {
        let mut guard = self.view.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    /// Renders a bubble and scrolls to it. No-op without a transcript.
    pub fn append_message(&self, text: &str, sender: Sender) -> Option<BubbleId> {
        self.with_view(|view| render(view, Message::new(text, sender)))
    }

    /// Submits whatever is in the input element.
    pub async fn send_message(&self) -> SendOutcome {
        match self.with_view(|view| view.input_value()) {
            Ok(value) => self.send_text(&value).await,
            Err(e) => {
                debug!(error = %e, "send skipped");
                SendOutcome::Ignored
            }
        }
    }

    pub async fn send_text(&self, raw: &str) -> SendOutcome {
        let message = raw.trim();
        if message.is_empty() {
            return SendOutcome::Ignored;
        }
        // Nowhere to show a reply, so the request would only spend a credit.
        if let Err(e) = self.with_view(|view| view.has_transcript()) {
            debug!(error = %e, "send skipped");
            return SendOutcome::Ignored;
        }

        self.with_view(|view| {
            render(view, Message::user(message));
            if let Err(e) = view.clear_input() {
                debug!(error = %e, "input not cleared");
            }
        });

        let _turn = match self.options.send_policy {
            SendPolicy::Serialize => Some(self.send_gate.lock().await),
            SendPolicy::Overlap => None,
        };

        let typing = self.with_view(|view| match view.append_typing(&self.options.text.pending) {
            Ok(id) => {
                let _ = view.scroll_to_bottom();
                Some(id)
            }
            Err(e) => {
                debug!(error = %e, "typing indicator not shown");
                None
            }
        });

        info!(chars = message.chars().count(), "sending chat message");
        let result = self.backend.send_chat(message).await;
        self.remove_typing(typing);

        match result {
            Ok(reply) => match reply.reply_text() {
                Some(text) => {
                    self.append_message(text, Sender::Ai);
                    let credits = reply.credit_count().and_then(|n| self.update_credits(n));
                    SendOutcome::Replied { credits }
                }
                None => {
                    warn!("chat reply carried no response text");
                    self.append_message(&self.options.text.no_reply, Sender::Ai);
                    SendOutcome::NoReply
                }
            },
            Err(e) => {
                error!(error = %e, "chat request failed");
                self.append_message(&self.options.text.connection_error, Sender::Ai);
                SendOutcome::Failed
            }
        }
    }

    fn remove_typing(&self, typing: Option<BubbleId>) {
        let Some(id) = typing else { return };
        self.with_view(|view| match view.remove_bubble(id) {
            Ok(true) => {}
            Ok(false) => debug!(?id, "typing indicator already removed"),
            Err(e) => debug!(error = %e, "typing indicator not removed"),
        });
    }

    pub async fn upload_file(&self, file: Option<UploadFile>) -> UploadOutcome {
        if let Err(e) = self.with_view(|view| view.has_file_input()) {
            debug!(error = %e, "upload skipped");
            return UploadOutcome::NoFile;
        }
        let Some(file) = file else {
            return UploadOutcome::NoFile;
        };
        let name = file.name.clone();

        self.set_upload_status(UploadStatus::Pending);
        info!(file = %name, bytes = file.bytes.len(), "uploading file");

        match self.backend.upload(file).await {
            Ok(response) if response.http_ok && response.reply.success => {
                self.set_upload_status(UploadStatus::Success(name.clone()));
                self.append_message(&self.options.text.upload_success_for(&name), Sender::Ai);
                UploadOutcome::Uploaded(name)
            }
            Ok(response) => {
                let reason = response
                    .reply
                    .failure_reason()
                    .unwrap_or(&self.options.text.upload_fallback)
                    .to_string();
                warn!(file = %name, http_ok = response.http_ok, %reason, "upload rejected");
                self.set_upload_status(UploadStatus::Error(reason.clone()));
                self.append_message(&reason, Sender::Ai);
                UploadOutcome::Rejected(reason)
            }
            Err(e) => {
                error!(file = %name, error = %e, "upload failed");
                self.set_upload_status(UploadStatus::Error(
                    self.options.text.upload_network_error.clone(),
                ));
                UploadOutcome::Failed
            }
        }
    }

    fn set_upload_status(&self, status: UploadStatus) {
        self.with_view(|view| {
            if let Err(e) = view.set_upload_status(status) {
                debug!(error = %e, "upload status not shown");
            }
        });
    }

    /// Rewrites the counter as "new_count / total", keeping the total it
    /// already shows, and flashes it. Returns `None` without a counter.
    pub fn update_credits(&self, new_count: i64) -> Option<CreditCounter> {
        let fallback = self.options.fallback_total;
        let counter = self.with_view(|view| {
            let current = view.credit_text().ok()?;
            let total = CreditCounter::denominator_from(&current, fallback);
            let counter = CreditCounter::new(new_count, total);
            view.set_credit_counter(counter).ok()?;
            let _ = view.set_credit_highlight(true);
            Some(counter)
        })?;

        debug!(%counter, "credit counter updated");
        self.schedule_highlight_revert();
        Some(counter)
    }

    fn schedule_highlight_revert(&self) {
        let generation = self.flash_generation.fetch_add(1, Ordering::SeqCst) + 1;
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            self.with_view(|view| {
                let _ = view.set_credit_highlight(false);
            });
            return;
        };

        let widget = self.clone();
        let delay = self.options.highlight;
        handle.spawn(async move {
            tokio::time::sleep(delay).await;
            // A newer update owns the highlight now.
            if widget.flash_generation.load(Ordering::SeqCst) == generation {
                widget.with_view(|view| {
                    let _ = view.set_credit_highlight(false);
                });
            }
        });
    }
}

fn render<V: ChatView>(view: &mut V, message: Message) -> Option<BubbleId> {
    match view.append_message(message) {
        Ok(id) => {
            let _ = view.scroll_to_bottom();
            Some(id)
        }
        Err(e) => {
            debug!(error = %e, "message not rendered");
            None
        }
    }
}
