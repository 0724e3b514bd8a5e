use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Wrap},
};

use crate::app::App;
use crate::conversation::{Message, Role};
use crate::markdown::{MarkdownStyles, render_markdown};

/// Tallest the input box grows, in text rows.
const MAX_INPUT_ROWS: u16 = 6;

const SEND_BUTTON_WIDTH: u16 = 10;

const USER_COLOR: Color = Color::LightBlue;
const ASSISTANT_COLOR: Color = Color::White;

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    let draft_rows = app.conversation.draft().split('\n').count() as u16;
    let input_height = draft_rows.clamp(1, MAX_INPUT_ROWS) + 2;

    // Header, messages, input, footer
    let [header_area, chat_area, input_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(input_height),
        Constraint::Length(1),
    ])
    .areas(area);

    let [draft_area, send_area] =
        Layout::horizontal([Constraint::Min(0), Constraint::Length(SEND_BUTTON_WIDTH)])
            .areas(input_area);

    render_header(app, frame, header_area);
    render_messages(app, frame, chat_area);
    render_input(app, frame, draft_area);
    render_send_button(app, frame, send_area);
    render_footer(app, frame, footer_area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(format!(" {} ", app.title), Style::default().fg(Color::Cyan).bold()),
        Span::styled(format!(" {}", app.endpoint), Style::default().fg(Color::Gray)),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

/// Role label plus the markdown-rendered body of one message.
fn message_lines(message: &Message) -> Vec<Line<'static>> {
    let (label, color, alignment) = match message.role {
        Role::User => (Role::User.label().to_string(), USER_COLOR, Alignment::Right),
        Role::Assistant => (
            format!("🤖 {}", Role::Assistant.label()),
            ASSISTANT_COLOR,
            Alignment::Left,
        ),
    };

    let mut lines = vec![Line::from(Span::styled(
        label,
        Style::default().fg(Color::Gray).add_modifier(Modifier::BOLD),
    ))
    .alignment(alignment)];

    let styles = MarkdownStyles::with_base(Style::default().fg(color));
    let body = render_markdown(&message.content, &styles);
    if body.is_empty() {
        lines.push(Line::default());
    } else {
        lines.extend(body.into_iter().map(|line| line.alignment(alignment)));
    }
    lines
}

/// Three dots, one lit per animation frame.
fn loading_lines(frame: u8) -> Vec<Line<'static>> {
    let dots: Vec<Span<'static>> = (0..3u8)
        .map(|i| {
            let style = if i == frame {
                Style::default().fg(Color::White).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::DarkGray)
            };
            Span::styled(if i < 2 { "● " } else { "●" }, style)
        })
        .collect();

    vec![
        Line::from(Span::styled(
            format!("🤖 {}", Role::Assistant.label()),
            Style::default().fg(Color::Gray).add_modifier(Modifier::BOLD),
        )),
        Line::from(dots),
    ]
}

/// Rows the text occupies once word-wrapped to `width`, measured with the
/// same wrapping the message list renders with.
fn wrapped_height(text: &Text<'_>, width: u16) -> u16 {
    Paragraph::new(text.clone())
        .wrap(Wrap { trim: false })
        .line_count(width)
        .min(u16::MAX as usize) as u16
}

fn render_messages(app: &mut App, frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));
    let inner = block.inner(area);

    let mut lines: Vec<Line<'static>> = Vec::new();
    for (i, message) in app.conversation.messages().iter().enumerate() {
        if i > 0 {
            lines.push(Line::default());
        }
        lines.extend(message_lines(message));
    }

    if app.is_awaiting() {
        if !lines.is_empty() {
            lines.push(Line::default());
        }
        lines.extend(loading_lines(app.animation_frame));
    }

    let text = if lines.is_empty() {
        Text::from(Span::styled("No messages yet.", Style::default().fg(Color::DarkGray)))
    } else {
        Text::from(lines)
    };

    // Store dimensions for scrolling and mouse hit-testing
    app.chat_area = Some(area);
    app.chat_height = inner.height;
    app.total_chat_lines = wrapped_height(&text, inner.width);
    app.chat_scroll = if app.follow_tail {
        app.max_chat_scroll()
    } else {
        app.chat_scroll.min(app.max_chat_scroll())
    };

    let chat = Paragraph::new(text)
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((app.chat_scroll, 0));

    frame.render_widget(chat, area);
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let awaiting = app.is_awaiting();

    let (border_color, title) = if awaiting {
        (Color::DarkGray, " Waiting for reply... ")
    } else {
        (Color::Yellow, " Message ")
    };

    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    let inner_width = area.width.saturating_sub(2);
    let inner_height = area.height.saturating_sub(2);
    let (row, col) = app.conversation.cursor_row_col();

    // Scroll so the cursor stays visible in both directions
    let row_offset = (row as u16).saturating_sub(inner_height.saturating_sub(1));
    let col_offset = if inner_width == 0 {
        0
    } else {
        (col as u16).saturating_sub(inner_width.saturating_sub(1))
    };

    let draft = app.conversation.draft();
    let input = if draft.is_empty() {
        Paragraph::new(Span::styled(
            app.placeholder.clone(),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        ))
    } else {
        let style = if awaiting {
            Style::default().fg(Color::DarkGray)
        } else {
            Style::default().fg(USER_COLOR)
        };
        Paragraph::new(draft.to_string())
            .style(style)
            .scroll((row_offset, col_offset))
    };

    frame.render_widget(input.block(input_block), area);

    // Disabled input shows no cursor
    if !awaiting {
        frame.set_cursor_position((
            area.x + 1 + (col as u16 - col_offset),
            area.y + 1 + (row as u16 - row_offset),
        ));
    }
}

/// Clickable submit control next to the input; greyed out while waiting.
fn render_send_button(app: &mut App, frame: &mut Frame, area: Rect) {
    let (border_color, label_style) = if app.is_awaiting() {
        (Color::DarkGray, Style::default().fg(Color::DarkGray))
    } else {
        (Color::Blue, Style::default().fg(Color::White).add_modifier(Modifier::BOLD))
    };

    let button = Paragraph::new(Span::styled("Send", label_style))
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(border_color)),
        );

    app.send_area = Some(area);
    frame.render_widget(button, area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let (mode_text, mode_style) = if app.is_awaiting() {
        (" WAITING ", Style::default().bg(Color::Yellow).fg(Color::Black))
    } else {
        (" CHAT ", Style::default().bg(Color::Blue).fg(Color::White))
    };

    let mut hints = vec![
        Span::styled(mode_text, mode_style),
        Span::styled(" ", label_style),
    ];
    if !app.is_awaiting() {
        hints.extend(vec![
            Span::styled(" Enter ", key_style),
            Span::styled(" send ", label_style),
            Span::styled(" Shift+Enter ", key_style),
            Span::styled(" newline ", label_style),
        ]);
    }
    hints.extend(vec![
        Span::styled(" PgUp/PgDn ", key_style),
        Span::styled(" scroll ", label_style),
        Span::styled(" Esc ", key_style),
        Span::styled(" quit ", label_style),
    ]);

    let footer = Paragraph::new(Line::from(hints)).style(Style::default().bg(Color::Black));
    frame.render_widget(footer, area);
}
