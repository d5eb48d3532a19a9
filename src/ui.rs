use crate::app::{App, Focus, Screen};
use crate::auth_form::{AuthField, AuthMode};
use crate::composer::PLACEHOLDER;
use crate::diary_entry::DiaryEntry;
use crate::diary_state::{DiaryState, DELETE_PROMPT, EMPTY_FEED_MESSAGE};
use crate::text_input::TextInput;
use chrono::{DateTime, Local};
use color_eyre::Result;
use crossterm::{
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame, Terminal,
};
use std::io::{stdout, Stdout};

const SPINNER: [&str; 4] = ["|", "/", "-", "\\"];

pub struct UI<B: Backend = CrosstermBackend<Stdout>> {
    terminal: Terminal<B>,
    restore_on_drop: bool,
}

impl UI {
    pub fn new() -> Result<Self> {
        enable_raw_mode()?;
        stdout().execute(EnterAlternateScreen)?;

        let backend = CrosstermBackend::new(stdout());
        let terminal = Terminal::new(backend)?;

        Ok(UI {
            terminal,
            restore_on_drop: true,
        })
    }
}

impl<B: Backend> UI<B> {
    /// Wraps an existing terminal without touching raw mode, e.g. a test backend.
    pub fn with_terminal(terminal: Terminal<B>) -> Self {
        UI {
            terminal,
            restore_on_drop: false,
        }
    }

    pub fn terminal(&self) -> &Terminal<B> {
        &self.terminal
    }

    pub fn display(&mut self, app: &App) -> Result<()> {
        let now = Local::now();
        self.terminal.draw(|f| match app.screen() {
            Screen::Loading => render_loading(f, app),
            Screen::SignIn => render_sign_in(f, app),
            Screen::Diary => render_diary(f, app, &now),
        })?;
        Ok(())
    }
}

impl<B: Backend> Drop for UI<B> {
    fn drop(&mut self) {
        if self.restore_on_drop {
            let _ = disable_raw_mode();
            let _ = stdout().execute(LeaveAlternateScreen);
        }
    }
}

fn title(text: &str) -> Paragraph<'_> {
    Paragraph::new(text)
        .style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .alignment(Alignment::Center)
}

fn controls(pairs: &[(&'static str, &'static str)]) -> Paragraph<'static> {
    let mut spans = Vec::new();
    for (i, (key, action)) in pairs.iter().enumerate() {
        if i > 0 {
            spans.push(Span::raw(", "));
        }
        spans.push(Span::styled(*key, Style::default().add_modifier(Modifier::BOLD)));
        spans.push(Span::raw(format!(" {action}")));
    }
    Paragraph::new(Line::from(spans))
        .style(Style::default().fg(Color::Yellow))
        .alignment(Alignment::Center)
}

fn focused_block(title: &str, focused: bool) -> Block<'_> {
    let style = if focused {
        Style::default().fg(Color::Blue)
    } else {
        Style::default()
    };
    Block::default()
        .borders(Borders::ALL)
        .border_style(style)
        .title(title)
}

fn place_cursor(f: &mut Frame, area: Rect, input: &TextInput) {
    let (row, column) = input.cursor_position();
    let x = area.x.saturating_add(1).saturating_add(column);
    let y = area.y.saturating_add(1).saturating_add(row);
    if x < area.right().saturating_sub(1) && y < area.bottom().saturating_sub(1) {
        f.set_cursor_position((x, y));
    }
}

fn render_loading(f: &mut Frame, app: &App) {
    let area = centered(f.area(), 30, 3);
    let spinner = SPINNER[app.spinner_frame() % SPINNER.len()];
    let text = Paragraph::new(format!("{spinner} Loading..."))
        .style(Style::default().fg(Color::Blue))
        .alignment(Alignment::Center);
    f.render_widget(text, area);
}

fn render_sign_in(f: &mut Frame, app: &App) {
    let form = &app.auth_form;
    let area = centered(f.area(), 60, 16);
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(1),
        ])
        .split(area);

    let heading = match form.mode {
        AuthMode::SignIn => "My Diary - Sign In",
        AuthMode::SignUp => "My Diary - Create Account",
    };
    f.render_widget(title(heading), chunks[0]);

    let email_focused = form.focus == AuthField::Email;
    let email = Paragraph::new(form.email.text()).block(focused_block("Email", email_focused));
    f.render_widget(email, chunks[1]);

    let masked = "*".repeat(form.password.char_count());
    let password =
        Paragraph::new(masked).block(focused_block("Password", !email_focused));
    f.render_widget(password, chunks[2]);

    let status = if form.is_submitting() {
        Line::from(Span::styled("Please wait...", Style::default().fg(Color::Blue)))
    } else if let Some(error) = form.error() {
        Line::from(Span::styled(error.to_string(), Style::default().fg(Color::Red)))
    } else if let Some(info) = form.info() {
        Line::from(Span::styled(info.to_string(), Style::default().fg(Color::Green)))
    } else {
        Line::default()
    };
    f.render_widget(
        Paragraph::new(status)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true }),
        chunks[3],
    );

    let toggle = match form.mode {
        AuthMode::SignIn => "to create an account",
        AuthMode::SignUp => "to sign in instead",
    };
    f.render_widget(
        controls(&[
            ("Tab", "to switch field"),
            ("Enter", "to submit"),
            ("Ctrl+N", toggle),
            ("Esc", "to quit"),
        ]),
        chunks[4],
    );

    if email_focused {
        place_cursor(f, chunks[1], &form.email);
    } else {
        let mut masked_input = TextInput::single_line();
        masked_input.set_text(&"*".repeat(form.password.char_count()));
        place_cursor(f, chunks[2], &masked_input);
    }
}

fn render_diary(f: &mut Frame, app: &App, now: &DateTime<Local>) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(8),
            Constraint::Min(5),
            Constraint::Length(1),
        ])
        .split(f.area());

    render_header(f, app, chunks[0]);
    render_composer(f, app, chunks[1]);
    render_feed(f, app, chunks[2], now);

    let footer = if app.feed.pending_delete().is_some() {
        controls(&[("y", "to delete"), ("n", "to keep")])
    } else if app.feed.editing().is_some() {
        controls(&[("Ctrl+S", "to save"), ("Esc", "to cancel")])
    } else if app.focus == Focus::Composer {
        controls(&[
            ("Ctrl+S", "to post"),
            ("Tab", "to browse entries"),
            ("Ctrl+O", "to sign out"),
            ("Ctrl+C", "to quit"),
        ])
    } else {
        controls(&[
            ("e", "to edit"),
            ("d", "to delete"),
            ("r", "to reload"),
            ("Tab", "to write"),
            ("Ctrl+O", "to sign out"),
        ])
    };
    f.render_widget(footer, chunks[3]);

    if app.feed.pending_delete().is_some() {
        render_delete_prompt(f);
    }
}

fn render_header(f: &mut Frame, app: &App, area: Rect) {
    let email = app
        .session
        .current_user()
        .and_then(|user| user.email.clone())
        .unwrap_or_default();
    let header = Paragraph::new(vec![
        Line::from(Span::styled(
            "My Diary",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(email, Style::default().fg(Color::Gray))),
    ])
    .alignment(Alignment::Center)
    .block(Block::default().borders(Borders::BOTTOM));
    f.render_widget(header, area);
}

fn render_composer(f: &mut Frame, app: &App, area: Rect) {
    let composer = &app.composer;
    let focused = app.focus == Focus::Composer && app.feed.editing().is_none();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(area);

    let body = if composer.input.text().is_empty() {
        Paragraph::new(Span::styled(PLACEHOLDER, Style::default().fg(Color::DarkGray)))
    } else {
        Paragraph::new(composer.input.text())
    };
    f.render_widget(body.block(focused_block("New Entry", focused)), chunks[0]);

    let button = if composer.is_submitting() {
        Span::styled("Posting...", Style::default().fg(Color::DarkGray))
    } else if composer.can_submit() {
        Span::styled(
            "Post Entry",
            Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD),
        )
    } else {
        Span::styled("Post Entry", Style::default().fg(Color::DarkGray))
    };
    let mut status = vec![
        Span::raw(format!("{} characters", composer.char_count())),
        Span::raw("  "),
        button,
    ];
    if let Some(error) = composer.error() {
        status.push(Span::raw("  "));
        status.push(Span::styled(error.to_string(), Style::default().fg(Color::Red)));
    }
    f.render_widget(Paragraph::new(Line::from(status)), chunks[1]);

    if focused {
        place_cursor(f, chunks[0], &composer.input);
    }
}

fn render_feed(f: &mut Frame, app: &App, area: Rect, now: &DateTime<Local>) {
    let feed = &app.feed;
    let focused = app.focus == Focus::Feed || feed.editing().is_some();
    let mut block = focused_block("Entries", focused);
    if let Some(notice) = feed.notice() {
        block = block.title_bottom(Line::from(Span::styled(
            notice.to_string(),
            Style::default().fg(Color::Red),
        )));
    }

    if feed.is_loading() && feed.is_empty() {
        let spinner = SPINNER[app.spinner_frame() % SPINNER.len()];
        f.render_widget(
            Paragraph::new(format!("{spinner} Loading entries..."))
                .alignment(Alignment::Center)
                .block(block),
            area,
        );
        return;
    }

    if feed.is_empty() {
        f.render_widget(
            Paragraph::new(EMPTY_FEED_MESSAGE)
                .style(Style::default().fg(Color::Gray))
                .alignment(Alignment::Center)
                .wrap(Wrap { trim: true })
                .block(block),
            area,
        );
        return;
    }

    if let Some(edit) = feed.editing() {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(3), Constraint::Length(6)])
            .split(area);
        f.render_widget(
            List::new(entry_items(feed, now)).block(block),
            chunks[0],
        );
        f.render_widget(
            Paragraph::new(edit.buffer.text())
                .block(focused_block("Editing", true))
                .wrap(Wrap { trim: false }),
            chunks[1],
        );
        place_cursor(f, chunks[1], &edit.buffer);
        return;
    }

    let list = List::new(entry_items(feed, now))
        .block(block)
        .highlight_style(Style::default().add_modifier(Modifier::BOLD))
        .highlight_symbol("> ");
    let selected = (app.focus == Focus::Feed).then_some(feed.selected_index());
    f.render_stateful_widget(list, area, &mut ListState::default().with_selected(selected));
}

fn entry_items(feed: &DiaryState, now: &DateTime<Local>) -> Vec<ListItem<'static>> {
    let editing_id = feed.editing().map(|edit| edit.id.as_str());
    feed.get_entries()
        .iter()
        .map(|entry| entry_item(entry, now, editing_id == Some(entry.id.as_str())))
        .collect()
}

fn entry_item(entry: &DiaryEntry, now: &DateTime<Local>, editing: bool) -> ListItem<'static> {
    let mut lines: Vec<Line> = entry
        .content
        .lines()
        .map(|line| Line::from(line.to_string()))
        .collect();
    let mut meta = vec![Span::styled(
        entry.age_label(now),
        Style::default().fg(Color::DarkGray),
    )];
    if editing {
        meta.push(Span::styled("  (editing)", Style::default().fg(Color::Blue)));
    }
    lines.push(Line::from(meta));
    lines.push(Line::default());
    ListItem::new(lines)
}

fn render_delete_prompt(f: &mut Frame) {
    let area = centered(f.area(), 50, 5);
    f.render_widget(Clear, area);
    let prompt = Paragraph::new(vec![
        Line::from(DELETE_PROMPT),
        Line::from(Span::styled(
            "y / n",
            Style::default().add_modifier(Modifier::BOLD),
        )),
    ])
    .alignment(Alignment::Center)
    .wrap(Wrap { trim: true })
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Red))
            .title("Delete entry"),
    );
    f.render_widget(prompt, area);
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}
