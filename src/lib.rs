//! Terminal chat client for the data-analyst service: a transcript, a send
//! flow with a typing indicator, file uploads and a usage-credit counter.

pub mod config;
pub mod console;
pub mod tui;
pub mod widget;
