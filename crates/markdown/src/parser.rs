//! Single-pass recursive-descent parser for the chat markdown dialect.
//!
//! At every position the rules are tried in priority order: escapes, code,
//! line-start blocks, chat references, links, emphasis, then unicode emoji.
//! The first rule that matches wins; if none does, one character is emitted
//! as literal text. Unterminated constructs are never errors.

use {
    serde::{Deserialize, Serialize},
    skald_common::types::Snowflake,
};

use crate::{
    ast::{MarkupNode, Mention},
    emoji::{emoji_only_count, match_emoji},
    timestamp::TimestampStyle,
};

/// Emoji-only messages with at most this many emoji render enlarged.
pub const DEFAULT_LARGE_EMOJI_THRESHOLD: usize = 25;

/// Formatting policy. `Normal` applies to plain user messages, `Extended` to
/// embeds and webhook content, which additionally get masked links,
/// headings, and deeper nesting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseMode {
    #[default]
    Normal,
    Extended,
}

impl ParseMode {
    /// Maximum nesting of formatting containers.
    #[must_use]
    pub fn max_depth(self) -> usize {
        match self {
            Self::Normal => 8,
            Self::Extended => 16,
        }
    }

    fn masked_links(self) -> bool {
        self == Self::Extended
    }

    fn headings(self) -> bool {
        self == Self::Extended
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    pub mode: ParseMode,
    pub large_emoji_threshold: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            mode: ParseMode::Normal,
            large_emoji_threshold: DEFAULT_LARGE_EMOJI_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedMessage {
    pub nodes: Vec<MarkupNode>,
    /// Presentation hint: the body is only emoji and few enough to enlarge.
    pub large_emoji: bool,
}

/// Parse `raw` into a markup tree. Never fails.
#[must_use]
pub fn parse(raw: &str, mode: ParseMode) -> Vec<MarkupNode> {
    Parser { mode }.parse_inline(raw, 0, false)
}

/// Parse a message body and compute the large-emoji hint.
#[must_use]
pub fn parse_message(raw: &str, options: &ParseOptions) -> ParsedMessage {
    let nodes = parse(raw, options.mode);
    let large_emoji =
        emoji_only_count(&nodes).is_some_and(|count| count <= options.large_emoji_threshold);
    ParsedMessage { nodes, large_emoji }
}

// ── Output buffer ───────────────────────────────────────────────────────────

/// Collects nodes, merging adjacent literal text into one `Text` node.
#[derive(Default)]
struct Output {
    nodes: Vec<MarkupNode>,
    text: String,
}

impl Output {
    fn push_text(&mut self, s: &str) {
        self.text.push_str(s);
    }

    fn push_node(&mut self, node: MarkupNode) {
        self.flush();
        self.nodes.push(node);
    }

    fn flush(&mut self) {
        if !self.text.is_empty() {
            self.nodes
                .push(MarkupNode::Text(std::mem::take(&mut self.text)));
        }
    }

    fn finish(mut self) -> Vec<MarkupNode> {
        self.flush();
        self.nodes
    }
}

/// Result of trying one rule at a position.
enum Step {
    Node(MarkupNode, usize),
    Literal(String, usize),
}

// ── Parser ──────────────────────────────────────────────────────────────────

struct Parser {
    mode: ParseMode,
}

impl Parser {
    fn parse_inline(&self, src: &str, depth: usize, in_quote: bool) -> Vec<MarkupNode> {
        let mut out = Output::default();
        let mut dead = DeadEnds::new(src.len());
        let mut pos = 0;

        while pos < src.len() {
            let at = Cursor {
                pos,
                prev: src[..pos].chars().next_back(),
                line_start: pos == 0 || src[..pos].ends_with('\n'),
            };
            match self.step(&src[pos..], at, &mut dead, depth, in_quote) {
                Some(Step::Node(node, len)) => {
                    out.push_node(node);
                    pos += len;
                },
                Some(Step::Literal(text, len)) => {
                    out.push_text(&text);
                    pos += len;
                },
                None => {
                    let Some(ch) = src[pos..].chars().next() else {
                        break;
                    };
                    let len = ch.len_utf8();
                    out.push_text(&src[pos..pos + len]);
                    pos += len;
                },
            }
        }

        out.finish()
    }

    fn step(
        &self,
        rest: &str,
        at: Cursor,
        dead: &mut DeadEnds,
        depth: usize,
        in_quote: bool,
    ) -> Option<Step> {
        let can_nest = depth < self.mode.max_depth();
        let first = rest.chars().next()?;

        match first {
            '\\' => return escape(rest),
            '`' => return code(rest),
            _ => {},
        }

        if at.line_start && can_nest {
            if !in_quote && let Some(step) = self.block_quote(rest, depth) {
                return Some(step);
            }
            if self.mode.headings()
                && let Some(step) = self.heading(rest, depth, in_quote)
            {
                return Some(step);
            }
        }

        match first {
            '<' => {
                if let Some(step) = reference(rest) {
                    return Some(step);
                }
            },
            '@' => {
                if let Some(step) = broadcast_mention(rest) {
                    return Some(step);
                }
            },
            '[' if can_nest && self.mode.masked_links() => {
                if let Some(step) = self.masked_link(rest, depth, in_quote) {
                    return Some(step);
                }
            },
            'h' => {
                if let Some(step) = bare_link(rest, at.prev) {
                    return Some(step);
                }
            },
            _ => {},
        }

        if can_nest && let Some(step) = self.emphasis(rest, at, dead, depth, in_quote) {
            return Some(step);
        }

        match_emoji(rest).map(|len| Step::Node(MarkupNode::UnicodeEmoji(rest[..len].into()), len))
    }

    // ── Blocks ──────────────────────────────────────────────────────────────

    /// `>>> ` quotes the rest of the input; `> ` quotes consecutive lines.
    fn block_quote(&self, rest: &str, depth: usize) -> Option<Step> {
        if let Some(body) = rest.strip_prefix(">>> ") {
            if body.trim().is_empty() {
                return None;
            }
            let children = self.parse_inline(body, depth + 1, true);
            return Some(Step::Node(MarkupNode::BlockQuote(children), rest.len()));
        }

        if !rest.starts_with("> ") {
            return None;
        }

        let mut lines = Vec::new();
        let mut consumed = 0;
        let mut cursor = rest;
        while let Some(line_body) = cursor.strip_prefix("> ") {
            let line_end = line_body.find('\n').unwrap_or(line_body.len());
            lines.push(&line_body[..line_end]);
            consumed += 2 + line_end;
            let after = &line_body[line_end..];
            match after.strip_prefix('\n') {
                Some(next) if next.starts_with("> ") => {
                    consumed += 1;
                    cursor = next;
                },
                _ => break,
            }
        }

        let body = lines.join("\n");
        if body.trim().is_empty() {
            return None;
        }
        let children = self.parse_inline(&body, depth + 1, true);
        Some(Step::Node(MarkupNode::BlockQuote(children), consumed))
    }

    fn heading(&self, rest: &str, depth: usize, in_quote: bool) -> Option<Step> {
        let hashes = rest.bytes().take_while(|&b| b == b'#').count();
        if !(1..=3).contains(&hashes) || rest.as_bytes().get(hashes) != Some(&b' ') {
            return None;
        }
        let body_start = hashes + 1;
        let line_end = rest[body_start..]
            .find('\n')
            .map_or(rest.len(), |i| body_start + i);
        let body = &rest[body_start..line_end];
        if body.trim().is_empty() {
            return None;
        }
        let children = self.parse_inline(body, depth + 1, in_quote);
        Some(Step::Node(
            MarkupNode::Heading {
                level: hashes as u8,
                children,
            },
            line_end,
        ))
    }

    // ── Links ───────────────────────────────────────────────────────────────

    /// `[text](https://url)`, extended mode only.
    fn masked_link(&self, rest: &str, depth: usize, in_quote: bool) -> Option<Step> {
        let close = rest.find(']')?;
        let text = &rest[1..close];
        if text.trim().is_empty() || text.contains('\n') {
            return None;
        }
        let after = rest[close + 1..].strip_prefix('(')?;
        let url_end = after.find(')')?;
        let raw_url = &after[..url_end];
        let url = raw_url
            .strip_prefix('<')
            .and_then(|u| u.strip_suffix('>'))
            .unwrap_or(raw_url);
        if !is_web_url(url) || url.chars().any(char::is_whitespace) {
            return None;
        }
        let children = self.parse_inline(text, depth + 1, in_quote);
        let consumed = close + 2 + url_end + 1;
        Some(Step::Node(
            MarkupNode::Link {
                url: url.to_string(),
                children,
            },
            consumed,
        ))
    }

    // ── Emphasis ────────────────────────────────────────────────────────────

    fn emphasis(
        &self,
        rest: &str,
        at: Cursor,
        dead: &mut DeadEnds,
        depth: usize,
        in_quote: bool,
    ) -> Option<Step> {
        type Wrap = fn(Vec<MarkupNode>) -> MarkupNode;
        const RULES: &[(&str, Wrap)] = &[
            ("||", MarkupNode::Spoiler),
            ("**", MarkupNode::Bold),
            ("__", MarkupNode::Underline),
            ("~~", MarkupNode::Strikethrough),
            ("*", MarkupNode::Italic),
            ("_", MarkupNode::Italic),
        ];

        for (delim, wrap) in RULES {
            if !rest.starts_with(delim) {
                continue;
            }
            if *delim == "_" && at.prev.is_some_and(char::is_alphanumeric) {
                continue;
            }
            let Some(close) = find_closer(rest, delim, at.pos, dead) else {
                continue;
            };
            let inner = &rest[delim.len()..close];
            let children = self.parse_inline(inner, depth + 1, in_quote);
            return Some(Step::Node(wrap(children), close + delim.len()));
        }
        None
    }
}

/// Where the parse loop stands within the text being parsed.
#[derive(Clone, Copy)]
struct Cursor {
    pos: usize,
    prev: Option<char>,
    line_start: bool,
}

/// Positions, per delimiter, from which a closer scan is known to fail.
///
/// The scan in [`find_closer`] carries no state besides its position, so a
/// later scan that reaches one of these positions fails as well. Each
/// position is marked at most once, keeping runs of unmatched openers linear.
struct DeadEnds {
    len: usize,
    marks: Vec<(&'static str, Vec<bool>)>,
}

impl DeadEnds {
    fn new(len: usize) -> Self {
        Self {
            len,
            marks: Vec::new(),
        }
    }

    fn is_dead(&self, delim: &str, at: usize) -> bool {
        self.marks
            .iter()
            .find(|(d, _)| *d == delim)
            .is_some_and(|(_, marks)| marks.get(at).copied().unwrap_or(false))
    }

    fn mark(&mut self, delim: &'static str, positions: &[usize]) {
        let index = match self.marks.iter().position(|(d, _)| *d == delim) {
            Some(index) => index,
            None => {
                self.marks.push((delim, vec![false; self.len + 1]));
                self.marks.len() - 1
            },
        };
        let marks = &mut self.marks[index].1;
        for &at in positions {
            if let Some(slot) = marks.get_mut(at) {
                *slot = true;
            }
        }
    }
}

/// Offset (in `rest`) of the delimiter closing the one `rest` starts with.
/// `origin` is the offset of `rest` within the text `dead` describes.
fn find_closer(
    rest: &str,
    delim: &'static str,
    origin: usize,
    dead: &mut DeadEnds,
) -> Option<usize> {
    let open = delim.len();
    let marker = delim.chars().next()?;
    let single = delim.len() == 1;
    let pair = delim.repeat(2);

    let body = &rest[open..];
    let first = body.chars().next()?;
    if single && first.is_whitespace() {
        return None;
    }

    // Positions after the start; the start itself is never tested as a closer.
    let mut visited = Vec::new();
    let mut i = open;
    while i < rest.len() {
        if i > open {
            if dead.is_dead(delim, origin + i) {
                break;
            }
            visited.push(origin + i);
        }
        let tail = &rest[i..];
        let ch = tail.chars().next()?;

        if ch == '\\' {
            i += 1 + tail[1..].chars().next().map_or(0, char::len_utf8);
            continue;
        }

        if tail.starts_with(delim) && i > open {
            let next = tail[delim.len()..].chars().next();
            let before = rest[..i].chars().next_back();
            let closes = if single {
                let doubled = next == Some(marker);
                let tight = before.is_some_and(|c| !c.is_whitespace());
                let boundary = marker != '_' || !next.is_some_and(char::is_alphanumeric);
                !doubled && tight && boundary
            } else {
                // `||` may be followed by anything; the others must not run on.
                marker == '|' || next != Some(marker)
            };
            if closes {
                return Some(i);
            }
        }

        // Inside single-char emphasis a doubled marker is a nested delimiter.
        if single && tail.starts_with(pair.as_str()) {
            i += 2;
            continue;
        }

        i += ch.len_utf8();
    }
    dead.mark(delim, &visited);
    None
}

// ── Leaf rules ──────────────────────────────────────────────────────────────

fn escape(rest: &str) -> Option<Step> {
    let escaped = rest[1..].chars().next()?;
    if !escaped.is_ascii_punctuation() {
        return None;
    }
    Some(Step::Literal(escaped.to_string(), 1 + escaped.len_utf8()))
}

/// Fenced code blocks and inline code spans. Unterminated fences are literal.
fn code(rest: &str) -> Option<Step> {
    let run = rest.bytes().take_while(|&b| b == b'`').count();

    if run >= 3 {
        let body = &rest[3..];
        if let Some(close) = body.find("```")
            && close > 0
        {
            let inner = &body[..close];
            let (language, content) = split_language(inner);
            return Some(Step::Node(
                MarkupNode::CodeBlock {
                    language,
                    content: content.to_string(),
                },
                3 + close + 3,
            ));
        }
        return Some(Step::Literal(rest[..run].to_string(), run));
    }

    let fence = &rest[..run];
    let body = &rest[run..];
    let mut search = 0;
    while let Some(found) = body[search..].find(fence) {
        let at = search + found;
        let run_len = body[at..].bytes().take_while(|&b| b == b'`').count();
        if run_len == run && at > 0 {
            return Some(Step::Node(
                MarkupNode::InlineCode(body[..at].to_string()),
                run + at + run,
            ));
        }
        search = at + run_len.max(1);
    }
    Some(Step::Literal(fence.to_string(), run))
}

/// A first line made only of identifier characters is the language tag.
fn split_language(inner: &str) -> (Option<String>, &str) {
    let Some(newline) = inner.find('\n') else {
        return (None, inner);
    };
    let first = &inner[..newline];
    let rest = &inner[newline + 1..];
    if first.is_empty() {
        return (None, rest);
    }
    let is_tag = first
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '+' | '-' | '.' | '#'));
    if is_tag && !rest.is_empty() {
        (Some(first.to_string()), rest)
    } else {
        (None, inner)
    }
}

/// `<@id>`, `<@!id>`, `<@&id>`, `<#id>`, `<:name:id>`, `<a:name:id>`,
/// `<t:epoch[:style]>`, `</name:id>`, `<https://url>`.
fn reference(rest: &str) -> Option<Step> {
    let close = rest.find('>')?;
    let inner = &rest[1..close];
    let consumed = close + 1;

    let node = if let Some(id) = inner.strip_prefix("@&") {
        MarkupNode::Mention(Mention::Role(snowflake(id)?))
    } else if let Some(id) = inner.strip_prefix("@!").or_else(|| inner.strip_prefix('@')) {
        MarkupNode::Mention(Mention::User(snowflake(id)?))
    } else if let Some(id) = inner.strip_prefix('#') {
        MarkupNode::Mention(Mention::Channel(snowflake(id)?))
    } else if let Some(body) = inner.strip_prefix("a:") {
        custom_emoji(body, true)?
    } else if let Some(body) = inner.strip_prefix(':') {
        custom_emoji(body, false)?
    } else if let Some(body) = inner.strip_prefix("t:") {
        timestamp(body)?
    } else if let Some(body) = inner.strip_prefix('/') {
        slash_command(body)?
    } else if is_web_url(inner) && !inner.chars().any(char::is_whitespace) {
        MarkupNode::Link {
            url: inner.to_string(),
            children: vec![MarkupNode::Text(inner.to_string())],
        }
    } else {
        return None;
    };
    Some(Step::Node(node, consumed))
}

fn custom_emoji(body: &str, animated: bool) -> Option<MarkupNode> {
    let (name, id) = body.split_once(':')?;
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return None;
    }
    Some(MarkupNode::CustomEmoji {
        id: snowflake(id)?,
        name: name.to_string(),
        animated,
    })
}

fn timestamp(body: &str) -> Option<MarkupNode> {
    let (epoch, style) = match body.split_once(':') {
        Some((epoch, flag)) => {
            let mut chars = flag.chars();
            let style = TimestampStyle::from_flag(chars.next()?)?;
            if chars.next().is_some() {
                return None;
            }
            (epoch, style)
        },
        None => (body, TimestampStyle::default()),
    };
    let digits = epoch.strip_prefix('-').unwrap_or(epoch);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(MarkupNode::Timestamp {
        epoch: epoch.parse().ok()?,
        style,
    })
}

fn slash_command(body: &str) -> Option<MarkupNode> {
    let (name, id) = body.rsplit_once(':')?;
    let valid = !name.is_empty()
        && !name.starts_with(' ')
        && name
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | ' '));
    if !valid {
        return None;
    }
    Some(MarkupNode::SlashCommand {
        name: name.to_string(),
        id: snowflake(id)?,
    })
}

fn broadcast_mention(rest: &str) -> Option<Step> {
    if rest.starts_with("@everyone") {
        Some(Step::Node(MarkupNode::Mention(Mention::Everyone), 9))
    } else if rest.starts_with("@here") {
        Some(Step::Node(MarkupNode::Mention(Mention::Here), 5))
    } else {
        None
    }
}

/// Bare `http(s)://` URLs, excluding trailing punctuation and unbalanced `)`.
fn bare_link(rest: &str, prev: Option<char>) -> Option<Step> {
    if !is_web_url(rest) || prev.is_some_and(char::is_alphanumeric) {
        return None;
    }
    let end = rest
        .find(|c: char| c.is_whitespace() || c == '<')
        .unwrap_or(rest.len());
    let mut url = &rest[..end];

    loop {
        let trimmed = url.trim_end_matches(['.', ',', ':', ';', '!', '?', '"', '\'']);
        let trimmed = if trimmed.ends_with(')')
            && trimmed.matches(')').count() > trimmed.matches('(').count()
        {
            &trimmed[..trimmed.len() - 1]
        } else {
            trimmed
        };
        if trimmed.len() == url.len() {
            break;
        }
        url = trimmed;
    }

    let scheme_len = if url.starts_with("https://") { 8 } else { 7 };
    if url.len() <= scheme_len {
        return None;
    }
    Some(Step::Node(
        MarkupNode::Link {
            url: url.to_string(),
            children: vec![MarkupNode::Text(url.to_string())],
        },
        url.len(),
    ))
}

fn is_web_url(s: &str) -> bool {
    s.starts_with("https://") || s.starts_with("http://")
}

fn snowflake(digits: &str) -> Option<Snowflake> {
    if digits.is_empty() || digits.len() > 20 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok().map(Snowflake)
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, crate::text::plain_text, rstest::rstest};

    fn text(s: &str) -> MarkupNode {
        MarkupNode::Text(s.into())
    }

    fn normal(s: &str) -> Vec<MarkupNode> {
        parse(s, ParseMode::Normal)
    }

    #[test]
    fn bold_mention_and_custom_emoji() {
        assert_eq!(normal("**bold** and <@123> with <:wave:456>"), vec![
            MarkupNode::Bold(vec![text("bold")]),
            text(" and "),
            MarkupNode::Mention(Mention::User(Snowflake(123))),
            text(" with "),
            MarkupNode::CustomEmoji {
                id: Snowflake(456),
                name: "wave".into(),
                animated: false,
            },
        ]);
    }

    #[rstest]
    #[case("*hi*", vec![MarkupNode::Italic(vec![text("hi")])])]
    #[case("_hi_", vec![MarkupNode::Italic(vec![text("hi")])])]
    #[case("__hi__", vec![MarkupNode::Underline(vec![text("hi")])])]
    #[case("~~hi~~", vec![MarkupNode::Strikethrough(vec![text("hi")])])]
    #[case("||hi||", vec![MarkupNode::Spoiler(vec![text("hi")])])]
    #[case("`a*b*`", vec![MarkupNode::InlineCode("a*b*".into())])]
    #[case("``a`b``", vec![MarkupNode::InlineCode("a`b".into())])]
    fn inline_styles(#[case] input: &str, #[case] expected: Vec<MarkupNode>) {
        assert_eq!(normal(input), expected);
    }

    #[test]
    fn triple_star_nests_italic_in_bold() {
        assert_eq!(normal("***both***"), vec![MarkupNode::Bold(vec![
            MarkupNode::Italic(vec![text("both")])
        ])]);
    }

    #[test]
    fn nested_styles() {
        assert_eq!(normal("**a _b_ c**"), vec![MarkupNode::Bold(vec![
            text("a "),
            MarkupNode::Italic(vec![text("b")]),
            text(" c"),
        ])]);
        assert_eq!(normal("*a **b** c*"), vec![MarkupNode::Italic(vec![
            text("a "),
            MarkupNode::Bold(vec![text("b")]),
            text(" c"),
        ])]);
    }

    #[rstest]
    #[case("**unclosed")]
    #[case("a * b * c")]
    #[case("snake_case_name")]
    #[case("``` no close")]
    #[case("`tick")]
    #[case("<@abc>")]
    #[case("<t:12:x>")]
    #[case("[not](a link)")]
    #[case("||")]
    fn unmatched_delimiters_are_literal(#[case] input: &str) {
        assert_eq!(normal(input), vec![text(input)]);
    }

    #[test]
    fn escapes_strip_backslash() {
        assert_eq!(normal(r"\*not italic\*"), vec![text("*not italic*")]);
        assert_eq!(normal(r"a\b"), vec![text(r"a\b")]);
    }

    #[test]
    fn code_protects_contents() {
        assert_eq!(normal("```rust\nlet x = **1**;\n```"), vec![
            MarkupNode::CodeBlock {
                language: Some("rust".into()),
                content: "let x = **1**;\n".into(),
            }
        ]);
        assert_eq!(normal("```no language here```"), vec![
            MarkupNode::CodeBlock {
                language: None,
                content: "no language here".into(),
            }
        ]);
        assert_eq!(normal("`<@1>`"), vec![MarkupNode::InlineCode("<@1>".into())]);
    }

    #[rstest]
    #[case("<@!7>", MarkupNode::Mention(Mention::User(Snowflake(7))))]
    #[case("<@&8>", MarkupNode::Mention(Mention::Role(Snowflake(8))))]
    #[case("<#9>", MarkupNode::Mention(Mention::Channel(Snowflake(9))))]
    #[case("@everyone", MarkupNode::Mention(Mention::Everyone))]
    #[case("@here", MarkupNode::Mention(Mention::Here))]
    #[case("<a:dance:10>", MarkupNode::CustomEmoji { id: Snowflake(10), name: "dance".into(), animated: true })]
    #[case("<t:1618953630>", MarkupNode::Timestamp { epoch: 1_618_953_630, style: TimestampStyle::ShortDateTime })]
    #[case("<t:1618953630:R>", MarkupNode::Timestamp { epoch: 1_618_953_630, style: TimestampStyle::Relative })]
    #[case("</deploy prod:11>", MarkupNode::SlashCommand { name: "deploy prod".into(), id: Snowflake(11) })]
    fn chat_references(#[case] input: &str, #[case] expected: MarkupNode) {
        assert_eq!(normal(input), vec![expected]);
    }

    #[test]
    fn bare_links_exclude_trailing_punctuation() {
        assert_eq!(normal("see https://example.com/a_b_c."), vec![
            text("see "),
            MarkupNode::Link {
                url: "https://example.com/a_b_c".into(),
                children: vec![text("https://example.com/a_b_c")],
            },
            text("."),
        ]);
        assert_eq!(normal("(https://en.wikipedia.org/wiki/Rust_(language))"), vec![
            text("("),
            MarkupNode::Link {
                url: "https://en.wikipedia.org/wiki/Rust_(language)".into(),
                children: vec![text("https://en.wikipedia.org/wiki/Rust_(language)")],
            },
            text(")"),
        ]);
    }

    #[test]
    fn angle_bracket_link() {
        assert_eq!(normal("<https://example.com>"), vec![MarkupNode::Link {
            url: "https://example.com".into(),
            children: vec![text("https://example.com")],
        }]);
    }

    #[test]
    fn masked_links_only_in_extended_mode() {
        let input = "[docs](https://docs.rs)";
        assert_eq!(normal(input), vec![
            text("[docs]("),
            MarkupNode::Link {
                url: "https://docs.rs".into(),
                children: vec![text("https://docs.rs")],
            },
            text(")"),
        ]);
        assert_eq!(parse(input, ParseMode::Extended), vec![MarkupNode::Link {
            url: "https://docs.rs".into(),
            children: vec![text("docs")],
        }]);
    }

    #[test]
    fn headings_only_in_extended_mode() {
        assert_eq!(normal("# Title\nbody"), vec![text("# Title\nbody")]);
        assert_eq!(parse("## Title\nbody", ParseMode::Extended), vec![
            MarkupNode::Heading {
                level: 2,
                children: vec![text("Title")],
            },
            text("\nbody"),
        ]);
    }

    #[test]
    fn heading_keeps_inner_whitespace() {
        assert_eq!(parse("#  padded  ", ParseMode::Extended), vec![
            MarkupNode::Heading {
                level: 1,
                children: vec![text(" padded  ")],
            }
        ]);
    }

    #[test]
    fn block_quotes() {
        assert_eq!(normal("> one\n> **two**\nafter"), vec![
            MarkupNode::BlockQuote(vec![
                text("one\n"),
                MarkupNode::Bold(vec![text("two")])
            ]),
            text("\nafter"),
        ]);
        assert_eq!(normal(">>> all\nof this"), vec![MarkupNode::BlockQuote(vec![
            text("all\nof this")
        ])]);
        assert_eq!(normal("a > b"), vec![text("a > b")]);
    }

    #[test]
    fn quotes_do_not_nest() {
        assert_eq!(normal("> > x"), vec![MarkupNode::BlockQuote(vec![text(
            "> x"
        )])]);
    }

    #[test]
    fn unicode_emoji_nodes() {
        assert_eq!(normal("hi 😀"), vec![
            text("hi "),
            MarkupNode::UnicodeEmoji("😀".into()),
        ]);
    }

    #[test]
    fn nesting_depth_is_capped_per_mode() {
        let max = ParseMode::Normal.max_depth();
        let normal = Parser {
            mode: ParseMode::Normal,
        };
        assert_eq!(normal.parse_inline("**x**", max - 1, false), vec![
            MarkupNode::Bold(vec![text("x")])
        ]);
        assert_eq!(normal.parse_inline("**x**", max, false), vec![text("**x**")]);

        let extended = Parser {
            mode: ParseMode::Extended,
        };
        assert_eq!(extended.parse_inline("**x**", max, false), vec![
            MarkupNode::Bold(vec![text("x")])
        ]);
    }

    #[rstest]
    #[case("**bold** _it_ ~~s~~ ||sp|| `c` > not quote")]
    #[case("> quoted **text**\nplain __under__ https://example.com")]
    #[case("***x*** and *y* \\* z")]
    fn modes_agree_without_extended_constructs(#[case] input: &str) {
        assert_eq!(normal(input), parse(input, ParseMode::Extended));
    }

    #[rstest]
    #[case("**bold** and _it_", "bold and it")]
    #[case("||a|| ~~b~~ __c__", "a b c")]
    #[case("**unclosed and *half", "**unclosed and *half")]
    #[case("> q\n\\*x\\*", "q\n*x*")]
    fn literal_content_survives(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(plain_text(&normal(input)), expected);
    }

    #[test]
    fn never_panics_on_hostile_input() {
        let inputs = [
            "*".repeat(500),
            "_".repeat(501),
            "|".repeat(333),
            "`".repeat(100),
            "<".repeat(50) + &">".repeat(50),
            "<@".repeat(40),
            "\\".repeat(7),
            "> ".repeat(30),
            "[](".repeat(20),
            "é*ß_ü~~ñ||😀".repeat(30),
            "<t:-99999999999999999999>".into(),
            "<:a:99999999999999999999999>".into(),
        ];
        for input in inputs {
            let _ = parse(&input, ParseMode::Normal);
            let _ = parse(&input, ParseMode::Extended);
        }
    }

    #[rstest]
    #[case("*x ")]
    #[case("_x ")]
    #[case("a *")]
    fn unmatched_openers_scale_linearly(#[case] unit: &str) {
        let input = unit.repeat(20_000);
        let started = std::time::Instant::now();
        assert_eq!(plain_text(&normal(&input)), input);
        assert!(started.elapsed() < std::time::Duration::from_secs(5));
    }

    /// Every string up to six characters over the emphasis delimiters,
    /// a letter and a space.
    fn delimiter_corpus() -> Vec<String> {
        const ALPHABET: [char; 6] = ['*', '_', '~', '|', 'a', ' '];
        let mut corpus = vec![String::new()];
        let mut frontier = vec![String::new()];
        for _ in 0..6 {
            frontier = frontier
                .iter()
                .flat_map(|s| {
                    ALPHABET.iter().map(move |c| {
                        let mut next = s.clone();
                        next.push(*c);
                        next
                    })
                })
                .collect();
            corpus.extend(frontier.iter().cloned());
        }
        corpus
    }

    #[test]
    fn delimiter_corpus_keeps_content_and_modes_agree() {
        let content = |s: &str| -> String {
            s.chars().filter(|c| matches!(c, 'a' | ' ')).collect()
        };
        for input in delimiter_corpus() {
            let nodes = normal(&input);
            assert_eq!(content(&plain_text(&nodes)), content(&input), "{input:?}");
            assert_eq!(nodes, parse(&input, ParseMode::Extended), "{input:?}");
        }
    }

    #[test]
    fn large_emoji_threshold() {
        let options = ParseOptions::default();
        let three = parse_message("<:a:1> <:b:2><:c:3>", &options);
        assert!(three.large_emoji);

        let many = "<:e:5>".repeat(26);
        assert!(!parse_message(&many, &options).large_emoji);
        assert!(!parse_message("<:a:1> hi", &options).large_emoji);
        assert!(!parse_message("", &options).large_emoji);

        let strict = ParseOptions {
            large_emoji_threshold: 2,
            ..ParseOptions::default()
        };
        assert!(!parse_message("😀😀😀", &strict).large_emoji);
        assert!(parse_message("😀 😀", &strict).large_emoji);
    }
}
