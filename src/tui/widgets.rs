use ratatui::{
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
};

use crate::widget::{BubbleKind, Sender, UploadStatus, WidgetText};

use super::app::Screen;
use super::types::InputMode;

pub fn create_header<'a>(screen: &'a Screen, current_time: &'a str) -> Paragraph<'a> {
    let mut spans = vec![
        Span::raw("Analyst "),
        Span::styled(
            "Data Chat",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        Span::raw(" | "),
        Span::styled(current_time, Style::default().fg(Color::Yellow)),
    ];

    if let Some(credits) = &screen.credits {
        let style = if screen.credit_highlight {
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::White)
        };
        spans.push(Span::raw(" | "));
        spans.push(Span::styled("⚡ ", Style::default().fg(Color::Yellow)));
        spans.push(Span::styled(credits.as_str(), style));
    }

    Paragraph::new(Line::from(spans))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Blue))
                .title(" Analyst Chat ")
                .title_alignment(Alignment::Center),
        )
        .alignment(Alignment::Center)
}

/// Transcript lines, one per rendered line break.
pub fn transcript_lines(screen: &Screen) -> Vec<Line<'static>> {
    let mut lines = Vec::new();

    if screen.transcript.is_empty() {
        lines.push(Line::from(Span::styled(
            "No messages yet. Press 'i' to ask the analyst something.",
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
        return lines;
    }

    for bubble in screen.transcript.bubbles() {
        match &bubble.kind {
            BubbleKind::Message(message) => {
                let style = match message.sender {
                    Sender::User => Style::default().fg(Color::Green),
                    Sender::Ai => Style::default().fg(Color::Cyan),
                };
                lines.push(Line::from(Span::styled(
                    format!("{}: ", message.sender.label()),
                    style.add_modifier(Modifier::BOLD),
                )));
                for line in message.lines() {
                    lines.push(Line::from(line.to_string()));
                }
            }
            BubbleKind::Typing(label) => {
                lines.push(Line::from(Span::styled(
                    format!("⟳ {}", label),
                    Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
                )));
            }
        }
        lines.push(Line::from(""));
    }

    lines
}

/// Rows the lines take once wrapped to `width` columns.
pub fn wrapped_height(lines: &[Line], width: u16) -> u16 {
    let width = usize::from(width.max(1));
    let rows: usize = lines
        .iter()
        .map(|line| line.width().max(1).div_ceil(width))
        .sum();
    u16::try_from(rows).unwrap_or(u16::MAX)
}

pub fn create_chat_view(screen: &mut Screen, area: Rect) -> Paragraph<'static> {
    let lines = transcript_lines(screen);
    let inner_width = area.width.saturating_sub(2);
    let inner_height = area.height.saturating_sub(2);
    let scroll = screen.effective_scroll(wrapped_height(&lines, inner_width), inner_height);

    let title = format!(" Chat ({} messages) ", screen.transcript.messages().count());

    Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(title)
                .border_style(Style::default().fg(Color::Cyan)),
        )
        .wrap(Wrap { trim: false })
        .scroll((scroll, 0))
}

pub fn create_input_area<'a>(
    screen: &'a Screen,
    input_mode: InputMode,
    upload_path: &'a str,
) -> Paragraph<'a> {
    let (mode_indicator, mode_color, title, content) = match input_mode {
        InputMode::Normal => ("[N]", Color::Blue, " Message ", screen.input.as_str()),
        InputMode::Insert => ("[I]", Color::Green, " Message ", screen.input.as_str()),
        InputMode::Upload => ("[U]", Color::Magenta, " File to upload ", upload_path),
    };

    Paragraph::new(Line::from(vec![
        Span::styled(
            format!("{} ", mode_indicator),
            Style::default().fg(mode_color).add_modifier(Modifier::BOLD),
        ),
        Span::raw(content),
    ]))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title(title)
            .border_style(Style::default().fg(mode_color)),
    )
}

pub fn upload_status_span(status: &UploadStatus, text: &WidgetText) -> Option<Span<'static>> {
    match status {
        UploadStatus::Idle => None,
        UploadStatus::Pending => Some(Span::styled(
            format!("⟳ {}", text.upload_pending),
            Style::default().fg(Color::Yellow),
        )),
        UploadStatus::Success(name) => Some(Span::styled(
            format!("✓ {}", name),
            Style::default().fg(Color::Green),
        )),
        UploadStatus::Error(message) => Some(Span::styled(
            format!("✗ {}", message),
            Style::default().fg(Color::Red),
        )),
    }
}

pub fn create_status_bar<'a>(
    screen: &Screen,
    status_message: &'a str,
    in_flight: usize,
    text: &WidgetText,
) -> Paragraph<'a> {
    let mut spans = vec![Span::styled(status_message, Style::default().fg(Color::Gray))];

    if in_flight > 0 {
        spans.push(Span::raw(" | "));
        spans.push(Span::styled(
            format!("{} pending", in_flight),
            Style::default().fg(Color::Yellow),
        ));
    }

    if let Some(span) = screen
        .upload_status
        .as_ref()
        .and_then(|status| upload_status_span(status, text))
    {
        spans.push(Span::raw(" | "));
        spans.push(span);
    }

    Paragraph::new(Line::from(spans))
}
