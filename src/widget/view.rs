use std::fmt;

use thiserror::Error;

use super::types::{BubbleId, CreditCounter, Message, UploadStatus};

/// The page elements the widget reads from or renders into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Element {
    Transcript,
    Input,
    FileInput,
    UploadStatus,
    CreditCounter,
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Element::Transcript => "transcript",
            Element::Input => "message input",
            Element::FileInput => "file input",
            Element::UploadStatus => "upload status",
            Element::CreditCounter => "credit counter",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ViewError {
    #[error("{0} element is not present")]
    Missing(Element),
}

pub type ViewResult<T> = Result<T, ViewError>;

/// Render port for the chat widget. Each operation reports whether the
/// element it needs exists; callers treat `Missing` as a no-op.
pub trait ChatView: Send {
    /// `Ok` when there is a transcript to render replies into.
    fn has_transcript(&self) -> ViewResult<()>;

    fn has_file_input(&self) -> ViewResult<()>;

    fn append_message(&mut self, message: Message) -> ViewResult<BubbleId>;

    /// Adds the placeholder bubble shown while a chat request is in flight.
    fn append_typing(&mut self, label: &str) -> ViewResult<BubbleId>;

    /// Returns `false` if the bubble was already gone.
    fn remove_bubble(&mut self, id: BubbleId) -> ViewResult<bool>;

    fn scroll_to_bottom(&mut self) -> ViewResult<()>;

    fn input_value(&self) -> ViewResult<String>;

    fn clear_input(&mut self) -> ViewResult<()>;

    fn set_upload_status(&mut self, status: UploadStatus) -> ViewResult<()>;

    fn credit_text(&self) -> ViewResult<String>;

    fn set_credit_counter(&mut self, counter: CreditCounter) -> ViewResult<()>;

    fn set_credit_highlight(&mut self, on: bool) -> ViewResult<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BubbleKind {
    Message(Message),
    Typing(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bubble {
    pub id: BubbleId,
    pub kind: BubbleKind,
}

impl Bubble {
    pub fn is_typing(&self) -> bool {
        matches!(self.kind, BubbleKind::Typing(_))
    }
}

/// Ordered bubble list shared by the concrete views.
#[derive(Debug)]
pub struct Transcript {
    bubbles: Vec<Bubble>,
    next_id: u64,
    pinned_to_bottom: bool,
}

impl Default for Transcript {
    fn default() -> Self {
        Self::new()
    }
}

impl Transcript {
    pub fn new() -> Self {
        Self {
            bubbles: Vec::new(),
            next_id: 0,
            pinned_to_bottom: true,
        }
    }

    pub fn push(&mut self, kind: BubbleKind) -> BubbleId {
        let id = BubbleId(self.next_id);
        self.next_id += 1;
        self.bubbles.push(Bubble { id, kind });
        id
    }

    pub fn remove(&mut self, id: BubbleId) -> bool {
        let before = self.bubbles.len();
        self.bubbles.retain(|b| b.id != id);
        self.bubbles.len() != before
    }

    pub fn contains(&self, id: BubbleId) -> bool {
        self.bubbles.iter().any(|b| b.id == id)
    }

    pub fn bubbles(&self) -> &[Bubble] {
        &self.bubbles
    }

    /// Rendered messages, typing placeholders excluded.
    pub fn messages(&self) -> impl Iterator<Item = &Message> {
        self.bubbles.iter().filter_map(|b| match &b.kind {
            BubbleKind::Message(m) => Some(m),
            BubbleKind::Typing(_) => None,
        })
    }

    pub fn typing_count(&self) -> usize {
        self.bubbles.iter().filter(|b| b.is_typing()).count()
    }

    pub fn len(&self) -> usize {
        self.bubbles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bubbles.is_empty()
    }

    pub fn pin_to_bottom(&mut self) {
        self.pinned_to_bottom = true;
    }

    pub fn unpin(&mut self) {
        self.pinned_to_bottom = false;
    }

    pub fn is_pinned_to_bottom(&self) -> bool {
        self.pinned_to_bottom
    }
}
