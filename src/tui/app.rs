use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Local;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tokio::sync::mpsc;
use tracing::warn;

use crate::widget::{
    BubbleId, BubbleKind, ChatBackend, ChatView, ChatWidget, CreditCounter, Element, Message,
    SendOutcome, Transcript, UploadFile, UploadOutcome, UploadStatus, ViewError, ViewResult,
    WidgetOptions,
};

use super::types::{AppMessage, InputMode};

const PAGE: u16 = 10;

/// Everything the widget can render into. Elements that are `None` are
/// absent from the screen.
#[derive(Debug)]
pub struct Screen {
    pub transcript: Transcript,
    pub input: String,
    pub upload_status: Option<UploadStatus>,
    pub credits: Option<String>,
    pub credit_highlight: bool,
    pub auto_scroll: bool,
    pub scroll_offset: u16,
    /// Offset that shows the last line, as of the latest draw.
    pub bottom_offset: u16,
}

impl Screen {
    pub fn new(credits: Option<CreditCounter>, uploads: bool, auto_scroll: bool) -> Self {
        Self {
            transcript: Transcript::new(),
            input: String::new(),
            upload_status: uploads.then_some(UploadStatus::Idle),
            credits: credits.map(|c| c.to_string()),
            credit_highlight: false,
            auto_scroll,
            scroll_offset: 0,
            bottom_offset: 0,
        }
    }

    /// The offset to draw with, given the wrapped line count and viewport height.
    pub fn effective_scroll(&mut self, total_lines: u16, height: u16) -> u16 {
        self.bottom_offset = total_lines.saturating_sub(height);
        if self.transcript.is_pinned_to_bottom() {
            self.bottom_offset
        } else {
            self.scroll_offset.min(self.bottom_offset)
        }
    }

    pub fn scroll_up(&mut self, lines: u16) {
        if self.transcript.is_pinned_to_bottom() {
            self.scroll_offset = self.bottom_offset;
            self.transcript.unpin();
        }
        self.scroll_offset = self.scroll_offset.saturating_sub(lines);
    }

    pub fn scroll_down(&mut self, lines: u16) {
        if self.transcript.is_pinned_to_bottom() {
            return;
        }
        self.scroll_offset = self.scroll_offset.saturating_add(lines);
        if self.scroll_offset >= self.bottom_offset {
            self.transcript.pin_to_bottom();
        }
    }

    pub fn jump_to_bottom(&mut self) {
        self.transcript.pin_to_bottom();
    }
}

impl ChatView for Screen {
    fn has_transcript(&self) -> ViewResult<()> {
        Ok(())
    }

    // The upload line doubles as the file picker.
    fn has_file_input(&self) -> ViewResult<()> {
        match self.upload_status {
            Some(_) => Ok(()),
            None => Err(ViewError::Missing(Element::FileInput)),
        }
    }

    fn append_message(&mut self, message: Message) -> ViewResult<BubbleId> {
        Ok(self.transcript.push(BubbleKind::Message(message)))
    }

    fn append_typing(&mut self, label: &str) -> ViewResult<BubbleId> {
        Ok(self.transcript.push(BubbleKind::Typing(label.to_string())))
    }

    fn remove_bubble(&mut self, id: BubbleId) -> ViewResult<bool> {
        Ok(self.transcript.remove(id))
    }

    fn scroll_to_bottom(&mut self) -> ViewResult<()> {
        if self.auto_scroll {
            self.transcript.pin_to_bottom();
        }
        Ok(())
    }

    fn input_value(&self) -> ViewResult<String> {
        Ok(self.input.clone())
    }

    fn clear_input(&mut self) -> ViewResult<()> {
        self.input.clear();
        Ok(())
    }

    fn set_upload_status(&mut self, status: UploadStatus) -> ViewResult<()> {
        let slot = self
            .upload_status
            .as_mut()
            .ok_or(ViewError::Missing(Element::UploadStatus))?;
        *slot = status;
        Ok(())
    }

    fn credit_text(&self) -> ViewResult<String> {
        self.credits
            .clone()
            .ok_or(ViewError::Missing(Element::CreditCounter))
    }

    fn set_credit_counter(&mut self, counter: CreditCounter) -> ViewResult<()> {
        let slot = self
            .credits
            .as_mut()
            .ok_or(ViewError::Missing(Element::CreditCounter))?;
        *slot = counter.to_string();
        Ok(())
    }

    fn set_credit_highlight(&mut self, on: bool) -> ViewResult<()> {
        if self.credits.is_none() {
            return Err(ViewError::Missing(Element::CreditCounter));
        }
        self.credit_highlight = on;
        Ok(())
    }
}

pub struct App<B> {
    pub screen: Arc<Mutex<Screen>>,
    pub widget: ChatWidget<Screen, B>,
    pub input_mode: InputMode,
    pub upload_path: String,
    pub status_message: String,
    pub current_time: String,
    pub in_flight: usize,

    // Message channel
    pub tx: mpsc::UnboundedSender<AppMessage>,
    pub rx: Option<mpsc::UnboundedReceiver<AppMessage>>,

    pub should_quit: bool,
}

impl<B: ChatBackend + 'static> App<B> {
    pub fn new(screen: Screen, backend: Arc<B>, options: WidgetOptions) -> Self {
        let screen = Arc::new(Mutex::new(screen));
        let widget = ChatWidget::new(Arc::clone(&screen), backend, options);
        let (tx, rx) = mpsc::unbounded_channel();

        Self {
            screen,
            widget,
            input_mode: InputMode::Normal,
            upload_path: String::new(),
            status_message: "Ready - Press '?' for help".to_string(),
            current_time: Local::now().format("%H:%M:%S").to_string(),
            in_flight: 0,
            tx,
            rx: Some(rx),
            should_quit: false,
        }
    }

    pub fn screen(&self) -> MutexGuard<'_, Screen> {
        self.screen.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn update_time(&mut self) {
        self.current_time = Local::now().format("%H:%M:%S").to_string();
    }

    pub fn uploads_enabled(&self) -> bool {
        self.screen().has_file_input().is_ok()
    }

    /// Sends the input as its own task; earlier sends keep running.
    pub fn submit(&mut self) {
        let text = {
            let mut screen = self.screen();
            if screen.input.trim().is_empty() {
                return;
            }
            // Taken here so a second Enter cannot resend the same text.
            std::mem::take(&mut screen.input)
        };
        self.in_flight += 1;
        self.status_message = "Waiting for the analyst...".to_string();

        let widget = self.widget.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let outcome = widget.send_text(&text).await;
            let _ = tx.send(AppMessage::SendFinished(outcome));
        });
    }

    pub fn submit_upload(&mut self) {
        let path = std::mem::take(&mut self.upload_path);
        let path = path.trim();
        if path.is_empty() {
            return;
        }
        let path = PathBuf::from(path);
        self.in_flight += 1;
        self.status_message = format!("Uploading {}", path.display());

        let widget = self.widget.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let message = match UploadFile::from_path(&path).await {
                Ok(file) => AppMessage::UploadFinished(widget.upload_file(Some(file)).await),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "file not readable");
                    AppMessage::FileUnreadable(format!("{:#}", e))
                }
            };
            let _ = tx.send(message);
        });
    }

    pub fn handle_message(&mut self, message: AppMessage) {
        self.in_flight = self.in_flight.saturating_sub(1);
        self.status_message = match message {
            AppMessage::SendFinished(SendOutcome::Failed) => "Chat request failed".to_string(),
            AppMessage::SendFinished(SendOutcome::NoReply) => "No reply from the analyst".to_string(),
            AppMessage::SendFinished(_) => "Ready".to_string(),
            AppMessage::UploadFinished(UploadOutcome::Uploaded(name)) => format!("Uploaded {}", name),
            AppMessage::UploadFinished(UploadOutcome::Rejected(reason)) => {
                format!("Upload rejected: {}", reason)
            }
            AppMessage::UploadFinished(_) => "Upload failed".to_string(),
            AppMessage::FileUnreadable(reason) => reason,
        };
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return;
        }

        match self.input_mode {
            InputMode::Normal => match key.code {
                KeyCode::Char('q') => self.should_quit = true,
                KeyCode::Char('i') | KeyCode::Enter => {
                    self.input_mode = InputMode::Insert;
                    self.status_message = "INSERT MODE - Enter to send, Esc to leave".to_string();
                }
                KeyCode::Char('u') => {
                    if self.uploads_enabled() {
                        self.input_mode = InputMode::Upload;
                        self.status_message = "UPLOAD - Type a file path, Enter to upload".to_string();
                    }
                }
                KeyCode::Char('?') => {
                    self.status_message =
                        "Help: i=insert, u=upload, j/k/PgUp/PgDn=scroll, G=bottom, q=quit".to_string();
                }
                KeyCode::Up | KeyCode::Char('k') => self.screen().scroll_up(1),
                KeyCode::Down | KeyCode::Char('j') => self.screen().scroll_down(1),
                KeyCode::PageUp => self.screen().scroll_up(PAGE),
                KeyCode::PageDown => self.screen().scroll_down(PAGE),
                KeyCode::Char('G') | KeyCode::End => self.screen().jump_to_bottom(),
                _ => {}
            },
            InputMode::Insert => match key.code {
                KeyCode::Esc => {
                    self.input_mode = InputMode::Normal;
                    self.status_message = "NORMAL MODE".to_string();
                }
                KeyCode::Enter => self.submit(),
                KeyCode::Char(c) => self.screen().input.push(c),
                KeyCode::Backspace => {
                    self.screen().input.pop();
                }
                KeyCode::PageUp => self.screen().scroll_up(PAGE),
                KeyCode::PageDown => self.screen().scroll_down(PAGE),
                _ => {}
            },
            InputMode::Upload => match key.code {
                KeyCode::Esc => {
                    self.input_mode = InputMode::Normal;
                    self.upload_path.clear();
                    self.status_message = "NORMAL MODE".to_string();
                }
                KeyCode::Enter => {
                    self.input_mode = InputMode::Normal;
                    self.submit_upload();
                }
                KeyCode::Char(c) => self.upload_path.push(c),
                KeyCode::Backspace => {
                    self.upload_path.pop();
                }
                _ => {}
            },
        }
    }
}
