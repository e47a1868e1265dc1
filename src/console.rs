use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use colored::*;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;

use crate::widget::{
    BubbleId, BubbleKind, ChatBackend, ChatView, ChatWidget, CreditCounter, Element, Message,
    Sender, Transcript, UploadFile, UploadStatus, ViewError, ViewResult, WidgetOptions,
};

/// Prints the transcript line by line. A printed bubble cannot be taken
/// back, so removing the typing indicator only stops tracking it.
pub struct ConsoleView<W> {
    out: W,
    transcript: Transcript,
    input: String,
    credits: Option<String>,
}

impl<W: Write + Send> ConsoleView<W> {
    pub fn new(out: W, credits: Option<CreditCounter>) -> Self {
        Self {
            out,
            transcript: Transcript::new(),
            input: String::new(),
            credits: credits.map(|c| c.to_string()),
        }
    }

    pub fn set_input(&mut self, value: &str) {
        self.input = value.to_string();
    }

    pub fn credits(&self) -> Option<&str> {
        self.credits.as_deref()
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    fn print_message(&mut self, message: &Message) {
        let label = match message.sender {
            Sender::User => format!("{}:", message.sender.label()).green().bold(),
            Sender::Ai => format!("{}:", message.sender.label()).cyan().bold(),
        };
        let _ = writeln!(self.out, "{}", label);
        for line in message.lines() {
            let _ = writeln!(self.out, "  {}", line);
        }
        let _ = self.out.flush();
    }
}

impl<W: Write + Send> ChatView for ConsoleView<W> {
    fn has_transcript(&self) -> ViewResult<()> {
        Ok(())
    }

    fn has_file_input(&self) -> ViewResult<()> {
        Ok(())
    }

    fn append_message(&mut self, message: Message) -> ViewResult<BubbleId> {
        // The console echoes typed input already.
        if message.sender == Sender::Ai {
            self.print_message(&message);
        }
        Ok(self.transcript.push(BubbleKind::Message(message)))
    }

    fn append_typing(&mut self, label: &str) -> ViewResult<BubbleId> {
        let _ = writeln!(self.out, "{}", format!("⟳ {}", label).dimmed().italic());
        let _ = self.out.flush();
        Ok(self.transcript.push(BubbleKind::Typing(label.to_string())))
    }

    fn remove_bubble(&mut self, id: BubbleId) -> ViewResult<bool> {
        Ok(self.transcript.remove(id))
    }

    fn scroll_to_bottom(&mut self) -> ViewResult<()> {
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
        let line = match &status {
            UploadStatus::Idle => return Ok(()),
            UploadStatus::Pending => "⟳ uploading...".yellow(),
            UploadStatus::Success(name) => format!("✓ {}", name).green(),
            UploadStatus::Error(message) => format!("✗ {}", message).red(),
        };
        let _ = writeln!(self.out, "{}", line);
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
        let _ = writeln!(self.out, "{} {}", "⚡".yellow(), counter.to_string().yellow().bold());
        Ok(())
    }

    fn set_credit_highlight(&mut self, _on: bool) -> ViewResult<()> {
        if self.credits.is_none() {
            return Err(ViewError::Missing(Element::CreditCounter));
        }
        Ok(())
    }
}

enum ConsoleLine<'a> {
    Quit,
    Help,
    Credits,
    Upload(&'a str),
    Chat(&'a str),
}

fn parse_line(line: &str) -> ConsoleLine<'_> {
    let trimmed = line.trim();
    if !trimmed.starts_with('/') {
        return ConsoleLine::Chat(line);
    }
    let (command, arg) = trimmed.split_once(' ').unwrap_or((trimmed, ""));
    match command {
        "/quit" | "/exit" => ConsoleLine::Quit,
        "/credits" => ConsoleLine::Credits,
        "/upload" => ConsoleLine::Upload(arg.trim()),
        "/help" => ConsoleLine::Help,
        _ => ConsoleLine::Chat(line),
    }
}

/// Runs the plain line-based front-end on stdin/stdout.
pub async fn run_console<B: ChatBackend + 'static>(
    credits: Option<CreditCounter>,
    backend: Arc<B>,
    options: WidgetOptions,
) -> Result<()> {
    let header_width = 60;
    println!("{}", "═".repeat(header_width).bright_blue());
    println!("{}", "Analyst Chat".bright_white().bold());
    println!("{}", "═".repeat(header_width).bright_blue());
    println!("{} /upload <path>, /credits, /quit", "Commands:".dimmed());

    let view = Arc::new(std::sync::Mutex::new(ConsoleView::new(io::stdout(), credits)));
    let widget = ChatWidget::new(Arc::clone(&view), backend, options);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("{} ", "You:".green().bold());
        io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        match parse_line(&line) {
            ConsoleLine::Quit => break,
            ConsoleLine::Help => println!("{} /upload <path>, /credits, /quit", "Commands:".dimmed()),
            ConsoleLine::Credits => {
                let text = view
                    .lock()
                    .unwrap_or_else(std::sync::PoisonError::into_inner)
                    .credits()
                    .map(str::to_string);
                match text {
                    Some(text) => println!("{} {}", "⚡".yellow(), text),
                    None => println!("{}", "No credit counter configured".dimmed()),
                }
            }
            ConsoleLine::Upload("") => println!("Usage: /upload <path_to_file>"),
            ConsoleLine::Upload(path) => match UploadFile::from_path(Path::new(path)).await {
                Ok(file) => {
                    widget.upload_file(Some(file)).await;
                }
                Err(e) => {
                    warn!(path, error = %e, "file not readable");
                    eprintln!("{} {:#}", "Error:".red(), e);
                }
            },
            ConsoleLine::Chat(text) => {
                view.lock()
                    .unwrap_or_else(std::sync::PoisonError::into_inner)
                    .set_input(text);
                widget.send_message().await;
            }
        }
    }

    println!("exiting Analyst Chat");
    Ok(())
}
