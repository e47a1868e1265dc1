use crate::widget::{SendOutcome, UploadOutcome};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Insert,
    Upload,
}

#[derive(Clone, Debug)]
pub enum AppMessage {
    SendFinished(SendOutcome),
    UploadFinished(UploadOutcome),
    FileUnreadable(String),
}
