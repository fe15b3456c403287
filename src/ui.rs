use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Tabs, Wrap},
    Frame,
};

use crate::app::App;
use crate::chat::Role;
use crate::credentials::mask_key;
use crate::markdown;
use crate::settings::SettingsTab;

pub fn draw_ui(f: &mut Frame, app: &mut App) {
    let composer_height = {
        let line_count = app.composer.lines().len() as u16;
        // Minimum 3 (1 line + 2 borders), maximum 8 lines
        (line_count + 2).clamp(3, 8)
    };
    let attachment_height = if app.pending.is_empty() && app.loading == 0 {
        0
    } else {
        3
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(10),
            Constraint::Length(attachment_height),
            Constraint::Length(composer_height),
            Constraint::Length(1),
        ])
        .split(f.area());

    render_header(f, app, chunks[0]);
    render_transcript(f, app, chunks[1]);
    if attachment_height > 0 {
        render_attachment_bar(f, app, chunks[2]);
    }
    render_composer(f, app, chunks[3]);
    render_status_line(f, app, chunks[4]);

    if app.settings.visible {
        render_settings_overlay(f, app, f.area());
    }
}

fn render_header(f: &mut Frame, app: &App, area: Rect) {
    let mut spans = vec![
        Span::styled("glint", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
        Span::raw("  "),
        Span::styled(app.model.clone(), Style::default().fg(Color::DarkGray)),
    ];
    if app.busy {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(
            "generating…",
            Style::default().fg(Color::Yellow),
        ));
    }
    if !app.key_configured() {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(
            "no API key (Ctrl+S)",
            Style::default().fg(Color::Red),
        ));
    }
    let header = Paragraph::new(Line::from(spans)).block(Block::default().borders(Borders::ALL));
    f.render_widget(header, area);
}

fn render_transcript(f: &mut Frame, app: &App, area: Rect) {
    let mut all_lines: Vec<Line> = Vec::new();
    let last_index = app.conversation.len().saturating_sub(1);

    for (i, msg) in app.conversation.messages.iter().enumerate() {
        let (sender, style) = match msg.role {
            Role::User => (
                "You",
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            ),
            Role::Model => (
                "Gemini",
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
            ),
        };
        let mut header = vec![
            Span::styled(msg.timestamp.clone(), Style::default().fg(Color::DarkGray)),
            Span::raw(" "),
            Span::styled(sender, style),
        ];
        if !msg.files.is_empty() {
            let names: Vec<&str> = msg.files.iter().map(|a| a.name.as_str()).collect();
            header.push(Span::styled(
                format!("  [{}]", names.join(", ")),
                Style::default().fg(Color::Magenta),
            ));
        }
        all_lines.push(Line::from(header));

        let streaming = app.busy && i == last_index && msg.role == Role::Model;
        all_lines.extend(markdown::render_lines(&msg.content, streaming));
        all_lines.push(Line::from(""));
    }

    let transcript = Paragraph::new(all_lines)
        .block(Block::default().borders(Borders::ALL).title("Conversation"))
        .wrap(Wrap { trim: false })
        .scroll((app.scroll_offset, 0));
    f.render_widget(transcript, area);
}

fn render_attachment_bar(f: &mut Frame, app: &App, area: Rect) {
    let mut spans: Vec<Span> = Vec::new();
    for attachment in &app.pending {
        let tag = if attachment.is_image { "🖼" } else { "📄" };
        spans.push(Span::styled(
            format!("{tag} {}  ", attachment.name),
            Style::default().fg(Color::Magenta),
        ));
    }
    if app.loading > 0 {
        spans.push(Span::styled(
            format!("(reading {} file{}…)", app.loading, if app.loading == 1 { "" } else { "s" }),
            Style::default().fg(Color::DarkGray),
        ));
    }
    let bar = Paragraph::new(Line::from(spans)).block(
        Block::default()
            .borders(Borders::ALL)
            .title("Attachments (3 max, Ctrl+X removes last)"),
    );
    f.render_widget(bar, area);
}

fn render_composer(f: &mut Frame, app: &mut App, area: Rect) {
    let title = if app.busy {
        "Input (waiting for reply…)"
    } else {
        "Input (Enter to send, Shift+Enter for new line)"
    };
    app.composer
        .set_block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(&app.composer, area);
}

fn render_status_line(f: &mut Frame, app: &App, area: Rect) {
    let line = match &app.status {
        Some(status) => Line::from(Span::styled(
            status.clone(),
            Style::default().fg(Color::Yellow),
        )),
        None => Line::from(Span::styled(
            "/attach <path> · Ctrl+S settings · Ctrl+N new chat · Esc stop · Ctrl+C quit",
            Style::default().fg(Color::DarkGray),
        )),
    };
    f.render_widget(Paragraph::new(line), area);
}

fn render_settings_overlay(f: &mut Frame, app: &App, area: Rect) {
    let width = 64.min(area.width.saturating_sub(4));
    let height = 14.min(area.height.saturating_sub(4));
    let popup = Rect {
        x: (area.width.saturating_sub(width)) / 2,
        y: (area.height.saturating_sub(height)) / 2,
        width,
        height,
    };
    f.render_widget(Clear, popup);

    let block = Block::default()
        .borders(Borders::ALL)
        .title("Settings")
        .border_style(Style::default().fg(Color::Yellow));
    let inner = block.inner(popup);
    f.render_widget(block, popup);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(2), Constraint::Min(1)])
        .split(inner);

    let titles: Vec<Line> = SettingsTab::ALL
        .iter()
        .map(|tab| Line::from(tab.title()))
        .collect();
    let tabs = Tabs::new(titles)
        .select(app.settings.tab_index)
        .highlight_style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD));
    f.render_widget(tabs, chunks[0]);

    let body: Vec<Line> = match app.settings.current_tab() {
        SettingsTab::ApiKey => api_key_tab_lines(app),
        SettingsTab::Appearance => vec![
            Line::from(""),
            Line::from("Theme options are not available yet."),
        ],
        SettingsTab::About => vec![
            Line::from(""),
            Line::from("glint, a terminal chat for the Gemini API."),
            Line::from("Conversations last for this terminal session only."),
        ],
    };
    f.render_widget(Paragraph::new(body).wrap(Wrap { trim: false }), chunks[1]);
}

fn api_key_tab_lines(app: &App) -> Vec<Line<'static>> {
    let mut lines = vec![Line::from("")];
    match app.saved_key() {
        Some(key) => lines.push(Line::from(vec![
            Span::raw("Current key: "),
            Span::styled(mask_key(&key), Style::default().fg(Color::Green)),
        ])),
        None => lines.push(Line::from(Span::styled(
            "No key configured.",
            Style::default().fg(Color::Red),
        ))),
    }
    lines.push(Line::from(""));
    lines.push(Line::from(vec![
        Span::raw("New key: "),
        Span::raw(app.settings.input.clone()),
        Span::styled("▌", Style::default().fg(Color::DarkGray)),
    ]));
    if let Some(error) = &app.settings.field_error {
        lines.push(Line::from(Span::styled(
            error.clone(),
            Style::default().fg(Color::Red),
        )));
    }
    if let Some(feedback) = &app.settings.feedback {
        lines.push(Line::from(Span::styled(
            feedback.clone(),
            Style::default().fg(Color::Green),
        )));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "Enter saves · Ctrl+D removes · Esc closes",
        Style::default().fg(Color::DarkGray),
    )));
    lines
}
