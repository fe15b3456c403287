//! Regex-based rendering of the markdown subset the model tends to emit:
//! fenced code blocks, inline code, bold and italic. One precompiled pattern
//! splits the text into tokens; anything it does not match (including
//! unterminated delimiters) renders literally. Deliberately no general
//! parser and no nesting.

use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use regex::Regex;

lazy_static::lazy_static! {
    static ref TOKEN_RE: Regex = Regex::new(
        r"(?s)```.*?```|`[^`\n]+`|\*\*[^*\n]+\*\*|\*[^*\n]+\*"
    ).expect("token pattern compiles");
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Plain(String),
    Bold(String),
    Italic(String),
    InlineCode(String),
    CodeBlock(String),
}

/// Split message content into render segments.
pub fn segment(content: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut last = 0;
    for token in TOKEN_RE.find_iter(content) {
        if token.start() > last {
            segments.push(Segment::Plain(content[last..token.start()].to_string()));
        }
        segments.push(classify(token.as_str()));
        last = token.end();
    }
    if last < content.len() {
        segments.push(Segment::Plain(content[last..].to_string()));
    }
    segments
}

fn classify(token: &str) -> Segment {
    if let Some(inner) = token
        .strip_prefix("```")
        .and_then(|t| t.strip_suffix("```"))
    {
        return Segment::CodeBlock(code_block_body(inner));
    }
    if let Some(inner) = token.strip_prefix("**").and_then(|t| t.strip_suffix("**")) {
        return Segment::Bold(inner.to_string());
    }
    if let Some(inner) = token.strip_prefix('`').and_then(|t| t.strip_suffix('`')) {
        return Segment::InlineCode(inner.to_string());
    }
    if let Some(inner) = token.strip_prefix('*').and_then(|t| t.strip_suffix('*')) {
        return Segment::Italic(inner.to_string());
    }
    Segment::Plain(token.to_string())
}

/// Drop the language tag line a fence usually opens with.
fn code_block_body(inner: &str) -> String {
    match inner.split_once('\n') {
        Some((first, rest))
            if !first.trim().is_empty() && first.trim().chars().all(char::is_alphanumeric) =>
        {
            rest.trim_matches('\n').to_string()
        }
        _ => inner.trim_matches('\n').to_string(),
    }
}

const BOLD: Style = Style::new().add_modifier(Modifier::BOLD);
const ITALIC: Style = Style::new().add_modifier(Modifier::ITALIC);
const INLINE_CODE: Style = Style::new().fg(Color::Yellow);
const CODE_BLOCK: Style = Style::new().fg(Color::Green);
const CURSOR: Style = Style::new().add_modifier(Modifier::SLOW_BLINK);

/// Render message content as styled lines, appending the block cursor when
/// this message is the one currently streaming.
pub fn render_lines(content: &str, streaming: bool) -> Vec<Line<'static>> {
    let mut lines: Vec<Line<'static>> = Vec::new();
    let mut current: Vec<Span<'static>> = Vec::new();

    for piece in segment(content) {
        match piece {
            Segment::CodeBlock(code) => {
                if !current.is_empty() {
                    lines.push(Line::from(std::mem::take(&mut current)));
                }
                for code_line in code.lines() {
                    lines.push(Line::from(Span::styled(
                        format!("  {code_line}"),
                        CODE_BLOCK,
                    )));
                }
            }
            Segment::Plain(text) => push_inline(&mut lines, &mut current, &text, Style::new()),
            Segment::Bold(text) => push_inline(&mut lines, &mut current, &text, BOLD),
            Segment::Italic(text) => push_inline(&mut lines, &mut current, &text, ITALIC),
            Segment::InlineCode(text) => {
                push_inline(&mut lines, &mut current, &text, INLINE_CODE)
            }
        }
    }

    if streaming {
        current.push(Span::styled("▌", CURSOR));
    }
    if !current.is_empty() {
        lines.push(Line::from(current));
    }
    lines
}

fn push_inline(
    lines: &mut Vec<Line<'static>>,
    current: &mut Vec<Span<'static>>,
    text: &str,
    style: Style,
) {
    for (i, piece) in text.split('\n').enumerate() {
        if i > 0 {
            lines.push(Line::from(std::mem::take(current)));
        }
        if !piece.is_empty() {
            current.push(Span::styled(piece.to_string(), style));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_one_segment() {
        assert_eq!(
            segment("just words"),
            vec![Segment::Plain("just words".to_string())]
        );
    }

    #[test]
    fn four_token_shapes_classify() {
        let segments = segment("a **b** c *d* e `f` g ```h``` i");
        assert_eq!(
            segments,
            vec![
                Segment::Plain("a ".to_string()),
                Segment::Bold("b".to_string()),
                Segment::Plain(" c ".to_string()),
                Segment::Italic("d".to_string()),
                Segment::Plain(" e ".to_string()),
                Segment::InlineCode("f".to_string()),
                Segment::Plain(" g ".to_string()),
                Segment::CodeBlock("h".to_string()),
                Segment::Plain(" i".to_string()),
            ]
        );
    }

    #[test]
    fn fenced_block_spans_lines_and_drops_language_tag() {
        let segments = segment("before\n```rust\nlet x = 1;\nlet y = 2;\n```\nafter");
        assert_eq!(
            segments[1],
            Segment::CodeBlock("let x = 1;\nlet y = 2;".to_string())
        );
    }

    #[test]
    fn fence_without_language_keeps_first_line() {
        let segments = segment("```\nfoo bar\n```");
        assert_eq!(segments, vec![Segment::CodeBlock("foo bar".to_string())]);
    }

    #[test]
    fn unterminated_delimiters_stay_literal() {
        assert_eq!(
            segment("**almost bold"),
            vec![Segment::Plain("**almost bold".to_string())]
        );
        assert_eq!(
            segment("`code without end"),
            vec![Segment::Plain("`code without end".to_string())]
        );
    }

    #[test]
    fn bold_wins_over_italic() {
        assert_eq!(segment("**x**"), vec![Segment::Bold("x".to_string())]);
    }

    #[test]
    fn inline_code_does_not_cross_lines() {
        let segments = segment("`a\nb`");
        assert_eq!(segments, vec![Segment::Plain("`a\nb`".to_string())]);
    }

    #[test]
    fn empty_content_renders_nothing() {
        assert!(render_lines("", false).is_empty());
    }

    #[test]
    fn streaming_appends_cursor_line() {
        let lines = render_lines("", true);
        assert_eq!(lines.len(), 1);

        let lines = render_lines("partial answer", true);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].spans.len(), 2);
    }

    #[test]
    fn code_block_lines_are_indented() {
        let lines = render_lines("```\none\ntwo\n```", false);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].spans[0].content, "  one");
        assert_eq!(lines[1].spans[0].content, "  two");
    }

    #[test]
    fn multiline_plain_text_splits_lines() {
        let lines = render_lines("first\nsecond", false);
        assert_eq!(lines.len(), 2);
    }
}
