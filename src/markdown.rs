//! Markdown rendering using pulldown-cmark.
//!
//! [`render_markdown`] turns raw message text into styled ratatui lines.

use pulldown_cmark::{Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
};

/// Styles for rendering markdown elements.
#[derive(Debug, Clone)]
pub struct MarkdownStyles {
    pub h1: Style,
    pub h2: Style,
    pub h3: Style,
    pub code: Style,
    pub code_block: Style,
    pub emphasis: Style,
    pub strong: Style,
    pub strikethrough: Style,
    pub list_marker: Style,
    pub link: Style,
    pub blockquote: Style,
    pub rule: Style,
    /// Base style every span starts from.
    pub text: Style,
}

impl MarkdownStyles {
    /// Styles on top of a base text style (the bubble colour of a message).
    pub fn with_base(text: Style) -> Self {
        Self {
            h1: Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            h2: Style::default().add_modifier(Modifier::BOLD),
            h3: Style::default().add_modifier(Modifier::BOLD | Modifier::ITALIC),
            code: Style::default().fg(Color::LightMagenta),
            code_block: Style::default().fg(Color::LightGreen),
            emphasis: Style::default().add_modifier(Modifier::ITALIC),
            strong: Style::default().add_modifier(Modifier::BOLD),
            strikethrough: Style::default().add_modifier(Modifier::CROSSED_OUT),
            list_marker: Style::default().fg(Color::Yellow),
            link: Style::default().fg(Color::LightBlue).add_modifier(Modifier::UNDERLINED),
            blockquote: Style::default().fg(Color::Gray),
            rule: Style::default().fg(Color::DarkGray),
            text,
        }
    }
}

impl Default for MarkdownStyles {
    fn default() -> Self {
        Self::with_base(Style::default())
    }
}

/// Render markdown text to styled lines.
///
/// Trailing blank lines are dropped so callers control spacing between
/// messages themselves.
pub fn render_markdown(input: &str, styles: &MarkdownStyles) -> Vec<Line<'static>> {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);

    let parser = Parser::new_ext(input, options);
    let mut renderer = MarkdownRenderer::new(styles.clone());
    renderer.run(parser);

    let mut lines = renderer.lines;
    while lines.last().is_some_and(|l| l.spans.is_empty()) {
        lines.pop();
    }
    lines
}

struct MarkdownRenderer {
    lines: Vec<Line<'static>>,
    styles: MarkdownStyles,
    /// Active inline styles, innermost last.
    style_stack: Vec<Style>,
    current_spans: Vec<Span<'static>>,
    /// One entry per open list: next number for ordered lists, None for bullets.
    list_stack: Vec<Option<u64>>,
    in_code_block: bool,
    blockquote_depth: usize,
    pending_list_marker: Option<String>,
    task_checkbox: Option<bool>,
}

impl MarkdownRenderer {
    fn new(styles: MarkdownStyles) -> Self {
        Self {
            lines: Vec::new(),
            styles,
            style_stack: Vec::new(),
            current_spans: Vec::new(),
            list_stack: Vec::new(),
            in_code_block: false,
            blockquote_depth: 0,
            pending_list_marker: None,
            task_checkbox: None,
        }
    }

    fn run<'a>(&mut self, parser: impl Iterator<Item = Event<'a>>) {
        for event in parser {
            self.handle_event(event);
        }
        self.flush_line();
    }

    fn handle_event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(Tag::Heading { level, .. }) => {
                self.flush_line();
                let style = self.heading_style(level);
                self.style_stack.push(style);
            }
            Event::End(TagEnd::Heading(_)) => {
                self.flush_line();
                self.style_stack.pop();
                self.blank_line();
            }

            Event::Start(Tag::Emphasis) => self.style_stack.push(self.styles.emphasis),
            Event::Start(Tag::Strong) => self.style_stack.push(self.styles.strong),
            Event::Start(Tag::Strikethrough) => self.style_stack.push(self.styles.strikethrough),
            Event::Start(Tag::Link { .. }) => self.style_stack.push(self.styles.link),
            Event::End(TagEnd::Emphasis | TagEnd::Strong | TagEnd::Strikethrough | TagEnd::Link) => {
                self.style_stack.pop();
            }

            Event::Start(Tag::CodeBlock(_)) => {
                self.flush_line();
                self.in_code_block = true;
            }
            Event::End(TagEnd::CodeBlock) => {
                self.flush_line();
                self.in_code_block = false;
                self.blank_line();
            }

            Event::Start(Tag::List(start)) => {
                self.flush_line();
                self.list_stack.push(start);
            }
            Event::End(TagEnd::List(_)) => {
                self.list_stack.pop();
                if self.list_stack.is_empty() {
                    self.blank_line();
                }
            }
            Event::Start(Tag::Item) => {
                self.flush_line();
                let indent = "  ".repeat(self.list_stack.len().saturating_sub(1));
                let marker = match self.list_stack.last_mut() {
                    Some(Some(n)) => {
                        let marker = format!("{indent}{n}. ");
                        *n += 1;
                        marker
                    }
                    _ => format!("{indent}• "),
                };
                self.pending_list_marker = Some(marker);
            }
            Event::End(TagEnd::Item) => {
                self.flush_line();
                self.task_checkbox = None;
            }
            Event::TaskListMarker(checked) => self.task_checkbox = Some(checked),

            Event::Start(Tag::BlockQuote) => {
                self.flush_line();
                self.blockquote_depth += 1;
            }
            Event::End(TagEnd::BlockQuote) => {
                self.flush_line();
                self.blockquote_depth = self.blockquote_depth.saturating_sub(1);
            }

            Event::End(TagEnd::Paragraph) => {
                self.flush_line();
                // Tight spacing inside lists and quotes
                if self.list_stack.is_empty() && self.blockquote_depth == 0 {
                    self.blank_line();
                }
            }

            Event::Text(text) => self.add_text(&text),
            Event::Code(code) => {
                self.push_prefixes();
                let style = self.current_style().patch(self.styles.code);
                self.current_spans.push(Span::styled(format!("`{code}`"), style));
            }
            Event::SoftBreak => self.add_text(" "),
            Event::HardBreak => self.flush_line(),
            Event::Rule => {
                self.flush_line();
                self.lines.push(Line::from(Span::styled("─".repeat(24), self.styles.rule)));
                self.blank_line();
            }

            // Raw HTML is dropped. Images, tables and footnotes keep only the
            // text their Text events carry
            _ => {}
        }
    }

    fn add_text(&mut self, text: &str) {
        if self.in_code_block {
            let indent = "  ".repeat(self.list_stack.len());
            for line in text.lines() {
                self.push_prefixes();
                self.current_spans.push(Span::styled(
                    format!("{indent}  {line}"),
                    self.styles.text.patch(self.styles.code_block),
                ));
                self.flush_line();
            }
            return;
        }

        self.push_prefixes();
        let style = self.current_style();
        self.current_spans.push(Span::styled(text.to_string(), style));
    }

    /// Quote bars, list marker and checkbox, once per output line.
    fn push_prefixes(&mut self) {
        if self.current_spans.is_empty() && self.blockquote_depth > 0 {
            self.current_spans.push(Span::styled(
                "│ ".repeat(self.blockquote_depth),
                self.styles.text.patch(self.styles.blockquote),
            ));
        }

        if let Some(marker) = self.pending_list_marker.take() {
            let style = self.styles.text.patch(self.styles.list_marker);
            self.current_spans.push(Span::styled(marker, style));
            if let Some(checked) = self.task_checkbox.take() {
                let checkbox = if checked { "[x] " } else { "[ ] " };
                self.current_spans.push(Span::styled(checkbox, style));
            }
        }
    }

    fn current_style(&self) -> Style {
        let mut style = self.styles.text;
        if self.blockquote_depth > 0 {
            style = style.patch(self.styles.blockquote);
        }
        for s in &self.style_stack {
            style = style.patch(*s);
        }
        style
    }

    fn heading_style(&self, level: HeadingLevel) -> Style {
        match level {
            HeadingLevel::H1 => self.styles.h1,
            HeadingLevel::H2 => self.styles.h2,
            _ => self.styles.h3,
        }
    }

    fn flush_line(&mut self) {
        if !self.current_spans.is_empty() {
            let spans = std::mem::take(&mut self.current_spans);
            self.lines.push(Line::from(spans));
        }
    }

    fn blank_line(&mut self) {
        if self.lines.last().is_some_and(|l| !l.spans.is_empty()) {
            self.lines.push(Line::default());
        }
    }
}
