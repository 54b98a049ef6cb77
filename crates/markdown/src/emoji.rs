//! Unicode emoji detection and custom emoji asset URLs.

use skald_common::types::Snowflake;

use crate::ast::MarkupNode;

/// Longest code point sequence we try to match (ZWJ families, flags with tags).
const MAX_EMOJI_CHARS: usize = 10;

const VARIATION_SELECTOR_16: char = '\u{FE0F}';
const KEYCAP: char = '\u{20E3}';

/// Emoji below this code point default to text presentation and only count
/// as emoji when followed by VS16 (`©️` is an emoji, `©` is not).
const TEXT_DEFAULT_CEILING: u32 = 0x1F000;

const EMOJI_CDN: &str = "https://cdn.discordapp.com/emojis";

/// Asset URL for a custom emoji.
#[must_use]
pub fn custom_emoji_url(id: Snowflake, animated: bool) -> String {
    let ext = if animated { "gif" } else { "png" };
    format!("{EMOJI_CDN}/{id}.{ext}")
}

/// Byte length of the longest unicode emoji at the start of `s`.
#[must_use]
pub fn match_emoji(s: &str) -> Option<usize> {
    let mut chars = s.chars();
    let first = chars.next()?;
    if first.is_ascii() {
        // Only keycaps (`1️⃣`, `#️⃣`) start with ASCII.
        let second = chars.next()?;
        if !matches!(first, '0'..='9' | '#' | '*')
            || !(second == VARIATION_SELECTOR_16 || second == KEYCAP)
        {
            return None;
        }
    }

    let ends: Vec<usize> = s
        .char_indices()
        .skip(1)
        .map(|(i, _)| i)
        .chain(std::iter::once(s.len()))
        .take(MAX_EMOJI_CHARS)
        .collect();

    for &end in ends.iter().rev() {
        let candidate = &s[..end];
        if emojis::get(candidate).is_none() {
            continue;
        }
        let single = candidate.chars().count() == 1;
        if single && (first as u32) < TEXT_DEFAULT_CEILING {
            return None;
        }
        return Some(end);
    }
    None
}

/// Number of emoji if `nodes` consist solely of emoji (blank text between
/// them is allowed), otherwise `None`.
#[must_use]
pub fn emoji_only_count(nodes: &[MarkupNode]) -> Option<usize> {
    let mut count = 0;
    for node in nodes {
        if node.is_emoji() {
            count += 1;
        } else if !node.is_blank_text() {
            return None;
        }
    }
    (count > 0).then_some(count)
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    #[rstest]
    #[case("😀 hi", Some("😀".len()))]
    #[case("❤️x", Some("❤️".len()))]
    #[case("🇺🇸!", Some("🇺🇸".len()))]
    #[case("1️⃣", Some("1️⃣".len()))]
    #[case("©", None)]
    #[case("1 apple", None)]
    #[case("abc", None)]
    #[case("", None)]
    fn matches_leading_emoji(#[case] input: &str, #[case] expected: Option<usize>) {
        assert_eq!(match_emoji(input), expected);
    }

    #[test]
    fn custom_emoji_asset_url() {
        assert_eq!(
            custom_emoji_url(Snowflake(456), false),
            "https://cdn.discordapp.com/emojis/456.png"
        );
        assert_eq!(
            custom_emoji_url(Snowflake(9), true),
            "https://cdn.discordapp.com/emojis/9.gif"
        );
    }

    #[test]
    fn emoji_only_ignores_blank_text() {
        let nodes = vec![
            MarkupNode::UnicodeEmoji("😀".into()),
            MarkupNode::Text(" ".into()),
            MarkupNode::CustomEmoji {
                id: Snowflake(1),
                name: "a".into(),
                animated: false,
            },
        ];
        assert_eq!(emoji_only_count(&nodes), Some(2));
        assert_eq!(emoji_only_count(&[MarkupNode::Text(" ".into())]), None);
        assert_eq!(emoji_only_count(&[]), None);
    }
}
