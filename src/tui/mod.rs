// Terminal front-end: the screen the chat widget renders into
pub mod app;
pub mod rendering;
pub mod types;
pub mod widgets;


pub use app::Screen;
pub use rendering::run_tui;
