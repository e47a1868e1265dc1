use std::io;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::{Constraint, Direction, Layout},
    Frame, Terminal,
};
use tokio::sync::mpsc;
use tracing::info;

use crate::widget::{ChatBackend, WidgetOptions};

use super::app::{App, Screen};
use super::types::AppMessage;
use super::widgets;

pub async fn run_tui<B: ChatBackend + 'static>(
    screen: Screen,
    backend: Arc<B>,
    options: WidgetOptions,
) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend_term = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend_term)?;

    let mut app = App::new(screen, backend, options);
    let mut rx = app
        .rx
        .take()
        .ok_or_else(|| anyhow::anyhow!("App message receiver already taken"))?;

    info!("terminal UI started");
    let res = run_app(&mut terminal, &mut app, &mut rx).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res
}

async fn run_app<T: Backend, B: ChatBackend + 'static>(
    terminal: &mut Terminal<T>,
    app: &mut App<B>,
    rx: &mut mpsc::UnboundedReceiver<AppMessage>,
) -> Result<()> {
    loop {
        if app.should_quit {
            info!("terminal UI closed");
            return Ok(());
        }

        app.update_time();
        terminal.draw(|f| ui(f, app))?;

        while let Ok(msg) = rx.try_recv() {
            app.handle_message(msg);
        }

        // Spawned sends and uploads make progress while this task waits.
        let has_event = tokio::task::block_in_place(|| event::poll(Duration::from_millis(100)))?;
        if has_event {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.handle_key(key);
                }
            }
        }
    }
}

fn ui<B: ChatBackend + 'static>(f: &mut Frame, app: &App<B>) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(5),    // Transcript
            Constraint::Length(3), // Input
            Constraint::Length(1), // Status bar
        ])
        .split(f.area());

    let mut screen = app.screen();
    let text = &app.widget.options().text;

    let chat = widgets::create_chat_view(&mut screen, chunks[1]);
    f.render_widget(chat, chunks[1]);

    f.render_widget(widgets::create_header(&screen, &app.current_time), chunks[0]);
    f.render_widget(
        widgets::create_input_area(&screen, app.input_mode, &app.upload_path),
        chunks[2],
    );
    f.render_widget(
        widgets::create_status_bar(&screen, &app.status_message, app.in_flight, text),
        chunks[3],
    );
}
