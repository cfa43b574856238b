//! Markdown → ratatui `Text`.
//!
//! Message content is markdown. This walks `pulldown_cmark` events and emits
//! styled lines: headings, emphasis, inline code, fenced code (highlighted
//! with syntect when the language is known), lists, quotes and links.
//! Tables, HTML and images are dropped.

use std::sync::LazyLock;

use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use syntect::easy::HighlightLines;
use syntect::highlighting::{Theme, ThemeSet};
use syntect::parsing::SyntaxSet;
use syntect::util::LinesWithEndings;

static SYNTAXES: LazyLock<SyntaxSet> = LazyLock::new(SyntaxSet::load_defaults_newlines);
static THEME: LazyLock<Theme> = LazyLock::new(|| {
    let mut themes = ThemeSet::load_defaults().themes;
    themes.remove("base16-ocean.dark").unwrap_or_default()
});

const FRAME: Style = Style::new().fg(Color::DarkGray);
const INLINE_CODE: Style = Style::new().fg(Color::White).bg(Color::DarkGray);
const LINK: Style = Style::new().fg(Color::Cyan).add_modifier(Modifier::UNDERLINED);
const TAB: &str = "    ";

/// Renders markdown with `base` as the default foreground.
pub fn render(content: &str, base: Color) -> Text<'static> {
    let options = Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TASKLISTS;
    let mut out = Renderer::new(base);
    for event in Parser::new_ext(content, options) {
        out.event(event);
    }
    Text::from(out.lines)
}

enum Code {
    Highlighted(HighlightLines<'static>),
    Plain,
}

struct Renderer {
    lines: Vec<Line<'static>>,
    base: Color,
    inline: Vec<Style>,
    /// Prepended to every new line (quote bars, code gutter).
    gutters: Vec<&'static str>,
    /// `None` for bullets, `Some(next)` for ordered lists.
    lists: Vec<Option<u64>>,
    code: Option<Code>,
    pending_link: Option<String>,
    gap: bool,
}

impl Renderer {
    fn new(base: Color) -> Self {
        Self {
            lines: Vec::new(),
            base,
            inline: Vec::new(),
            gutters: Vec::new(),
            lists: Vec::new(),
            code: None,
            pending_link: None,
            gap: false,
        }
    }

    fn current(&self) -> Style {
        self.inline
            .last()
            .copied()
            .unwrap_or(Style::new().fg(self.base))
    }

    fn with(&mut self, overlay: Style) {
        self.inline.push(self.current().patch(overlay));
    }

    fn new_line(&mut self, spans: Vec<Span<'static>>) {
        let mut line: Vec<Span<'static>> = self
            .gutters
            .iter()
            .map(|g| Span::styled(*g, FRAME))
            .collect();
        line.extend(spans);
        self.lines.push(Line::from(line));
    }

    fn append(&mut self, span: Span<'static>) {
        match self.lines.last_mut() {
            Some(line) => line.spans.push(span),
            None => self.new_line(vec![span]),
        }
    }

    fn start_block(&mut self) {
        if std::mem::take(&mut self.gap) {
            self.new_line(Vec::new());
        }
    }

    fn event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag),
            Event::Text(text) => self.text(&text),
            Event::Code(code) => self.append(Span::styled(code.replace('\t', TAB), INLINE_CODE)),
            Event::SoftBreak => self.append(Span::raw(" ")),
            Event::HardBreak => self.new_line(Vec::new()),
            Event::Rule => {
                self.start_block();
                self.new_line(vec![Span::styled("─".repeat(40), FRAME)]);
                self.gap = true;
            }
            Event::TaskListMarker(done) => {
                self.append(Span::raw(if done { "[x] " } else { "[ ] " }));
            }
            _ => {}
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Paragraph => {
                self.start_block();
                if self.lists.is_empty() {
                    self.new_line(Vec::new());
                }
            }
            Tag::Heading { level, .. } => {
                self.start_block();
                let style = heading(self.base, level);
                let hashes = "#".repeat(level as usize);
                self.new_line(vec![Span::styled(format!("{hashes} "), style)]);
                self.inline.push(style);
            }
            Tag::BlockQuote(_) => {
                self.start_block();
                self.gutters.push("│ ");
                self.with(Style::new().add_modifier(Modifier::ITALIC | Modifier::DIM));
            }
            Tag::CodeBlock(kind) => {
                self.start_block();
                let lang = match &kind {
                    CodeBlockKind::Fenced(lang) => lang.split_whitespace().next().unwrap_or(""),
                    CodeBlockKind::Indented => "",
                };
                let mut top = vec![Span::styled("╭──", FRAME)];
                if !lang.is_empty() {
                    top.push(Span::styled(
                        format!(" {lang} "),
                        FRAME.add_modifier(Modifier::BOLD),
                    ));
                }
                self.new_line(top);
                self.gutters.push("│ ");
                self.code = Some(
                    SYNTAXES
                        .find_syntax_by_token(lang)
                        .filter(|_| !lang.is_empty())
                        .map(|syntax| Code::Highlighted(HighlightLines::new(syntax, &THEME)))
                        .unwrap_or(Code::Plain),
                );
            }
            Tag::List(first) => {
                if self.lists.is_empty() {
                    self.start_block();
                }
                self.lists.push(first);
            }
            Tag::Item => {
                let indent = "  ".repeat(self.lists.len().saturating_sub(1));
                let marker = match self.lists.last_mut() {
                    Some(Some(n)) => {
                        *n += 1;
                        format!("{indent}{}. ", *n - 1)
                    }
                    _ => format!("{indent}• "),
                };
                self.new_line(vec![Span::styled(marker, FRAME)]);
            }
            Tag::Emphasis => self.with(Style::new().add_modifier(Modifier::ITALIC)),
            Tag::Strong => self.with(Style::new().add_modifier(Modifier::BOLD)),
            Tag::Strikethrough => self.with(Style::new().add_modifier(Modifier::CROSSED_OUT)),
            Tag::Link { dest_url, .. } => {
                self.pending_link = Some(dest_url.into_string());
                self.with(LINK);
            }
            _ => {}
        }
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph => self.gap = self.lists.is_empty(),
            TagEnd::Heading(_) | TagEnd::BlockQuote(_) => {
                self.inline.pop();
                if matches!(tag, TagEnd::BlockQuote(_)) {
                    self.gutters.pop();
                }
                self.gap = true;
            }
            TagEnd::CodeBlock => {
                self.code = None;
                self.gutters.pop();
                self.new_line(vec![Span::styled("╰──", FRAME)]);
                self.gap = true;
            }
            TagEnd::List(_) => {
                self.lists.pop();
                self.gap = self.lists.is_empty();
            }
            TagEnd::Emphasis | TagEnd::Strong | TagEnd::Strikethrough => {
                self.inline.pop();
            }
            TagEnd::Link => {
                self.inline.pop();
                if let Some(url) = self.pending_link.take() {
                    self.append(Span::raw(" <"));
                    self.append(Span::styled(url, LINK));
                    self.append(Span::raw(">"));
                }
            }
            _ => {}
        }
    }

    fn text(&mut self, text: &str) {
        let text = text.replace('\t', TAB);
        match self.code.take() {
            Some(Code::Highlighted(mut highlighter)) => {
                for source_line in LinesWithEndings::from(&text) {
                    let spans = match highlighter.highlight_line(source_line, &SYNTAXES) {
                        Ok(ranges) => ranges
                            .into_iter()
                            .map(|(style, piece)| {
                                let fg = style.foreground;
                                Span::styled(
                                    piece.trim_end_matches('\n').to_string(),
                                    Style::new().fg(Color::Rgb(fg.r, fg.g, fg.b)),
                                )
                            })
                            .filter(|span| !span.content.is_empty())
                            .collect(),
                        Err(_) => vec![Span::raw(source_line.trim_end_matches('\n').to_string())],
                    };
                    self.new_line(spans);
                }
                self.code = Some(Code::Highlighted(highlighter));
            }
            Some(Code::Plain) => {
                for source_line in text.lines() {
                    self.new_line(vec![Span::styled(
                        source_line.to_string(),
                        Style::new().fg(Color::White),
                    )]);
                }
                self.code = Some(Code::Plain);
            }
            None => {
                let style = self.current();
                self.append(Span::styled(text, style));
            }
        }
    }
}

fn heading(base: Color, level: HeadingLevel) -> Style {
    let style = Style::new().fg(base).add_modifier(Modifier::BOLD);
    match level {
        HeadingLevel::H1 => style.add_modifier(Modifier::UNDERLINED),
        HeadingLevel::H2 => style,
        _ => style.add_modifier(Modifier::ITALIC),
    }
}
