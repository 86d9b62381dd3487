use crate::chat::{ConversationState, RequestCoordinator, Role};
use crate::tui::{events::Event, Frame};
use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Wrap},
};

/// Main TUI state and controller
pub struct App {
    coordinator: RequestCoordinator,

    /// Last conversation snapshot; refreshed before every draw
    snapshot: ConversationState,

    /// Input line buffer
    input: String,

    /// Cursor position in the input, in characters
    cursor: usize,

    /// Manual scroll distance from the bottom of the transcript
    scroll_from_bottom: u16,

    /// Ellipsis animation frame while a request is in flight
    spinner: u8,

    /// The send/retry task spawned by this TUI, while it runs. Snapshots
    /// lag behind by one refresh, so this is the authoritative local
    /// guard for whether a submit would be accepted.
    request_task: Option<tokio::task::JoinHandle<()>>,

    /// Whether the application should quit
    pub should_quit: bool,
}

impl App {
    pub fn new(coordinator: RequestCoordinator) -> Self {
        Self {
            coordinator,
            snapshot: ConversationState {
                transcript: Vec::new(),
                busy: false,
                last_error: None,
                last_failed_input: None,
            },
            input: String::new(),
            cursor: 0,
            scroll_from_bottom: 0,
            spinner: 0,
            request_task: None,
            should_quit: false,
        }
    }

    /// Pull a fresh read-only snapshot for rendering
    pub async fn refresh(&mut self) {
        self.snapshot = self.coordinator.snapshot().await;

        if self
            .request_task
            .as_ref()
            .map_or(false, |task| task.is_finished())
        {
            self.request_task = None;
        }
    }

    fn request_in_flight(&self) -> bool {
        self.request_task
            .as_ref()
            .map_or(false, |task| !task.is_finished())
    }

    /// Handle incoming events; returns true when the app should quit
    pub async fn handle_event(&mut self, event: Event) -> Result<bool> {
        match event {
            Event::Key(key_event) => self.handle_key_event(key_event),
            Event::Resize(_, _) => {}
            Event::Tick => {
                if self.snapshot.busy {
                    self.spinner = self.spinner.wrapping_add(1);
                }
            }
        }

        Ok(self.should_quit)
    }

    fn handle_key_event(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }

        if key.modifiers.contains(KeyModifiers::CONTROL) {
            match key.code {
                KeyCode::Char('c') => self.should_quit = true,
                KeyCode::Char('r') => self.retry(),
                _ => {}
            }
            return;
        }

        match key.code {
            KeyCode::Esc => self.should_quit = true,
            KeyCode::Enter => self.submit(),
            KeyCode::Char(c) => self.insert_char(c),
            KeyCode::Backspace => self.delete_before_cursor(),
            KeyCode::Delete => self.delete_at_cursor(),
            KeyCode::Left => self.cursor = self.cursor.saturating_sub(1),
            KeyCode::Right => {
                self.cursor = (self.cursor + 1).min(self.input.chars().count());
            }
            KeyCode::Home => self.cursor = 0,
            KeyCode::End => self.cursor = self.input.chars().count(),
            KeyCode::Up => self.scroll_from_bottom = self.scroll_from_bottom.saturating_add(1),
            KeyCode::Down => self.scroll_from_bottom = self.scroll_from_bottom.saturating_sub(1),
            KeyCode::PageUp => {
                self.scroll_from_bottom = self.scroll_from_bottom.saturating_add(10)
            }
            KeyCode::PageDown => {
                self.scroll_from_bottom = self.scroll_from_bottom.saturating_sub(10)
            }
            _ => {}
        }
    }

    /// Submit the input line. The input box is only cleared for an
    /// accepted send, so a message typed while a request is in flight is
    /// not lost. This TUI is the only caller, so its own live task handle
    /// (not the possibly stale snapshot) decides acceptance; the
    /// coordinator re-enforces the guard authoritatively.
    fn submit(&mut self) {
        if self.input.trim().is_empty() || self.snapshot.busy || self.request_in_flight() {
            return;
        }

        let text = std::mem::take(&mut self.input);
        self.cursor = 0;
        self.scroll_from_bottom = 0;

        let coordinator = self.coordinator.clone();
        self.request_task = Some(tokio::spawn(async move {
            coordinator.send(&text).await;
        }));
    }

    /// Resubmit the last failed input
    fn retry(&mut self) {
        if self.snapshot.last_error.is_none() || self.snapshot.busy || self.request_in_flight() {
            return;
        }

        self.scroll_from_bottom = 0;

        let coordinator = self.coordinator.clone();
        self.request_task = Some(tokio::spawn(async move {
            coordinator.retry().await;
        }));
    }

    fn byte_index(&self) -> usize {
        self.input
            .char_indices()
            .map(|(i, _)| i)
            .nth(self.cursor)
            .unwrap_or(self.input.len())
    }

    fn insert_char(&mut self, c: char) {
        let idx = self.byte_index();
        self.input.insert(idx, c);
        self.cursor += 1;
    }

    fn delete_before_cursor(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let idx = self.byte_index();
            self.input.remove(idx);
        }
    }

    fn delete_at_cursor(&mut self) {
        if self.cursor < self.input.chars().count() {
            let idx = self.byte_index();
            self.input.remove(idx);
        }
    }

    /// Render the application UI
    pub fn render(&mut self, frame: &mut Frame) {
        let has_error = self.snapshot.last_error.is_some();

        let mut constraints = vec![
            Constraint::Min(1),    // Transcript
            Constraint::Length(3), // Input
        ];
        if has_error {
            constraints.insert(1, Constraint::Length(1)); // Error bar
        }

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints(constraints)
            .split(frame.size());

        self.render_transcript(frame, chunks[0]);

        if has_error {
            self.render_error_bar(frame, chunks[1]);
            self.render_input(frame, chunks[2]);
        } else {
            self.render_input(frame, chunks[1]);
        }
    }

    fn render_transcript(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::ALL).title("Backchat");
        let inner = block.inner(area);

        let mut lines: Vec<Line> = Vec::new();
        for message in &self.snapshot.transcript {
            let label = match message.role {
                Role::User => Span::styled(
                    "You",
                    Style::default()
                        .fg(Color::Cyan)
                        .add_modifier(Modifier::BOLD),
                ),
                Role::Assistant => Span::styled(
                    "Assistant",
                    Style::default()
                        .fg(Color::Green)
                        .add_modifier(Modifier::BOLD),
                ),
            };
            lines.push(Line::from(label));
            for content_line in message.content.lines() {
                lines.push(Line::raw(content_line.to_string()));
            }
            lines.push(Line::raw(""));
        }

        if self.snapshot.busy {
            let dots = ".".repeat((self.spinner % 3) as usize + 1);
            lines.push(Line::from(Span::styled(
                format!("Assistant is thinking{}", dots),
                Style::default()
                    .fg(Color::DarkGray)
                    .add_modifier(Modifier::ITALIC),
            )));
        }

        let scroll_y = transcript_scroll(
            &lines,
            inner.width,
            inner.height,
            self.scroll_from_bottom,
        );

        let transcript = Paragraph::new(Text::from(lines))
            .block(block)
            .wrap(Wrap { trim: false })
            .scroll((scroll_y, 0));

        frame.render_widget(transcript, area);
    }

    fn render_error_bar(&self, frame: &mut Frame, area: Rect) {
        let error = self.snapshot.last_error.as_deref().unwrap_or_default();
        let bar = Paragraph::new(format!(" {} (Ctrl+R to retry)", error))
            .style(Style::default().fg(Color::Red));
        frame.render_widget(bar, area);
    }

    fn render_input(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title("Message (Enter to send, Ctrl+C to quit)");
        let inner = block.inner(area);

        // Keep the cursor visible when the input outgrows the box.
        let width = inner.width.max(1) as usize;
        let skip = self.cursor.saturating_sub(width.saturating_sub(1));
        let visible: String = self.input.chars().skip(skip).take(width).collect();

        let input = Paragraph::new(visible).block(block);
        frame.render_widget(input, area);

        let cursor_x = inner.x + (self.cursor - skip) as u16;
        frame.set_cursor(cursor_x.min(inner.x + inner.width.saturating_sub(1)), inner.y);
    }
}

/// Vertical scroll offset that keeps the transcript stuck to the bottom,
/// backed off by the user's manual scroll distance.
fn transcript_scroll(lines: &[Line], width: u16, height: u16, from_bottom: u16) -> u16 {
    if width == 0 {
        return 0;
    }

    let mut total: u16 = 0;
    for line in lines {
        let line_width = line.width() as u16;
        total = total.saturating_add(line_width.saturating_sub(1) / width + 1);
    }

    let max_scroll = total.saturating_sub(height);
    max_scroll.saturating_sub(from_bottom.min(max_scroll))
}
