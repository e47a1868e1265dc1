//! In-memory ports for exercising the widget without a screen or a server.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use super::backend::{BackendError, ChatBackend};
use super::types::{
    BubbleId, ChatReply, CreditCounter, Message, UploadFile, UploadResponse, UploadStatus,
};
use super::view::{BubbleKind, ChatView, Element, Transcript, ViewError, ViewResult};

/// A view whose elements can each be present or absent.
pub struct RecordingView {
    pub transcript_present: bool,
    pub transcript: Transcript,
    pub input: Option<String>,
    pub file_input_present: bool,
    pub status_present: bool,
    pub status_history: Vec<UploadStatus>,
    pub credits: Option<String>,
    pub highlighted: bool,
}

impl RecordingView {
    pub fn full() -> Self {
        Self {
            transcript_present: true,
            transcript: Transcript::new(),
            input: Some(String::new()),
            file_input_present: true,
            status_present: true,
            status_history: Vec::new(),
            credits: None,
            highlighted: false,
        }
    }

    pub fn input_only(value: &str) -> Self {
        Self {
            transcript_present: false,
            file_input_present: false,
            status_present: false,
            ..Self::full().with_input(value)
        }
    }

    pub fn with_input(mut self, value: &str) -> Self {
        self.input = Some(value.to_string());
        self
    }

    pub fn with_credits(mut self, text: &str) -> Self {
        self.credits = Some(text.to_string());
        self
    }

    fn transcript_mut(&mut self) -> ViewResult<&mut Transcript> {
        if self.transcript_present {
            Ok(&mut self.transcript)
        } else {
            Err(ViewError::Missing(Element::Transcript))
        }
    }
}

impl ChatView for RecordingView {
    fn has_transcript(&self) -> ViewResult<()> {
        if self.transcript_present {
            Ok(())
        } else {
            Err(ViewError::Missing(Element::Transcript))
        }
    }

    fn has_file_input(&self) -> ViewResult<()> {
        if self.file_input_present {
            Ok(())
        } else {
            Err(ViewError::Missing(Element::FileInput))
        }
    }

    fn append_message(&mut self, message: Message) -> ViewResult<BubbleId> {
        Ok(self.transcript_mut()?.push(BubbleKind::Message(message)))
    }

    fn append_typing(&mut self, label: &str) -> ViewResult<BubbleId> {
        Ok(self.transcript_mut()?.push(BubbleKind::Typing(label.to_string())))
    }

    fn remove_bubble(&mut self, id: BubbleId) -> ViewResult<bool> {
        Ok(self.transcript_mut()?.remove(id))
    }

    fn scroll_to_bottom(&mut self) -> ViewResult<()> {
        self.transcript_mut()?.pin_to_bottom();
        Ok(())
    }

    fn input_value(&self) -> ViewResult<String> {
        self.input.clone().ok_or(ViewError::Missing(Element::Input))
    }

    fn clear_input(&mut self) -> ViewResult<()> {
        let input = self.input.as_mut().ok_or(ViewError::Missing(Element::Input))?;
        input.clear();
        Ok(())
    }

    fn set_upload_status(&mut self, status: UploadStatus) -> ViewResult<()> {
        if !self.status_present {
            return Err(ViewError::Missing(Element::UploadStatus));
        }
        self.status_history.push(status);
        Ok(())
    }

    fn credit_text(&self) -> ViewResult<String> {
        self.credits
            .clone()
            .ok_or(ViewError::Missing(Element::CreditCounter))
    }

    fn set_credit_counter(&mut self, counter: CreditCounter) -> ViewResult<()> {
        let credits = self
            .credits
            .as_mut()
            .ok_or(ViewError::Missing(Element::CreditCounter))?;
        *credits = counter.to_string();
        Ok(())
    }

    fn set_credit_highlight(&mut self, on: bool) -> ViewResult<()> {
        if self.credits.is_none() {
            return Err(ViewError::Missing(Element::CreditCounter));
        }
        self.highlighted = on;
        Ok(())
    }
}

enum Scripted<T> {
    Reply(T),
    Unreachable,
}

struct Entry<T> {
    outcome: Scripted<T>,
    hold: Option<Arc<Notify>>,
}

#[derive(Default)]
struct Script {
    chats: VecDeque<Entry<ChatReply>>,
    uploads: VecDeque<Entry<UploadResponse>>,
    chat_calls: Vec<String>,
    upload_calls: Vec<String>,
}

/// Backend that replays queued answers in order. An empty queue behaves
/// like an unreachable server.
#[derive(Clone, Default)]
pub struct ScriptedBackend {
    script: Arc<Mutex<Script>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_chat(&self, reply: Result<ChatReply, ()>) {
        self.push_chat_entry(reply, None);
    }

    pub fn push_chat_failure(&self) {
        self.push_chat_entry(Err(()), None);
    }

    /// Queues a reply that is only delivered once the returned handle is notified.
    pub fn push_held_chat(&self, reply: Result<ChatReply, ()>) -> Arc<Notify> {
        let hold = Arc::new(Notify::new());
        self.push_chat_entry(reply, Some(Arc::clone(&hold)));
        hold
    }

    fn push_chat_entry(&self, reply: Result<ChatReply, ()>, hold: Option<Arc<Notify>>) {
        let outcome = match reply {
            Ok(reply) => Scripted::Reply(reply),
            Err(()) => Scripted::Unreachable,
        };
        self.script
            .lock()
            .unwrap()
            .chats
            .push_back(Entry { outcome, hold });
    }

    pub fn push_upload(&self, response: Result<UploadResponse, ()>) {
        let outcome = match response {
            Ok(response) => Scripted::Reply(response),
            Err(()) => Scripted::Unreachable,
        };
        self.script
            .lock()
            .unwrap()
            .uploads
            .push_back(Entry { outcome, hold: None });
    }

    pub fn push_upload_failure(&self) {
        self.push_upload(Err(()));
    }

    pub fn chat_calls(&self) -> Vec<String> {
        self.script.lock().unwrap().chat_calls.clone()
    }

    pub fn upload_calls(&self) -> Vec<String> {
        self.script.lock().unwrap().upload_calls.clone()
    }

    pub async fn wait_for_chat_calls(&self, count: usize) {
        while self.script.lock().unwrap().chat_calls.len() < count {
            tokio::task::yield_now().await;
        }
    }
}

fn unreachable_error(url: &str) -> BackendError {
    BackendError::Timeout {
        url: url.to_string(),
    }
}

#[async_trait]
impl ChatBackend for ScriptedBackend {
    async fn send_chat(&self, message: &str) -> Result<ChatReply, BackendError> {
        let entry = {
            let mut script = self.script.lock().unwrap();
            script.chat_calls.push(message.to_string());
            script.chats.pop_front()
        };
        let Some(entry) = entry else {
            return Err(unreachable_error("/chat"));
        };
        if let Some(hold) = entry.hold {
            hold.notified().await;
        }
        match entry.outcome {
            Scripted::Reply(reply) => Ok(reply),
            Scripted::Unreachable => Err(unreachable_error("/chat")),
        }
    }

    async fn upload(&self, file: UploadFile) -> Result<UploadResponse, BackendError> {
        let entry = {
            let mut script = self.script.lock().unwrap();
            script.upload_calls.push(file.name.clone());
            script.uploads.pop_front()
        };
        match entry.map(|e| e.outcome) {
            Some(Scripted::Reply(response)) => Ok(response),
            _ => Err(unreachable_error("/upload")),
        }
    }
}
