// Chat widget core: data model, render port, HTTP port and controller
pub mod backend;
pub mod controller;
pub mod text;
pub mod types;
pub mod view;

#[cfg(test)]
pub mod testing;

pub use backend::{BackendError, ChatBackend, HttpBackend, HttpBackendConfig};
pub use controller::{ChatWidget, SendOutcome, SendPolicy, UploadOutcome, WidgetOptions};
pub use text::WidgetText;
pub use types::{BubbleId, CreditCounter, Message, Sender, UploadFile, UploadStatus};
pub use view::{Bubble, BubbleKind, ChatView, Element, Transcript, ViewError, ViewResult};
