//! Cross-frame selector compiler.
//!
//! Splits one CSS or XPath selector at steps whose tag (or node test) is
//! literally `iframe`, so a single expression can reach into frame
//! documents:
//!
//! ```ignore
//! let segments = split_frame_segments(&By::css("#host iframe.widget > button"));
//! assert_eq!(segments, vec![By::css("#host iframe.widget"), By::css("button")]);
//! ```
//!
//! Every segment except the last resolves a frame element; the last one is
//! evaluated inside the innermost frame document. A frame step with nothing
//! after it is not a split point.

use std::sync::LazyLock;

use regex::Regex;

use super::selector::By;

// ============================================================================
// Patterns
// ============================================================================

/// XPath step whose node test is `iframe`, optionally behind an axis.
static XPATH_IFRAME_STEP: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)^(?:\w+::)?iframe(?:\[|$)").ok());

/// Parenthesized XPath step mentioning `iframe`.
static XPATH_IFRAME_GROUP: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)\biframe\b").ok());

/// Leading type selector of a CSS compound.
static CSS_TAG_NAME: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^([a-zA-Z][a-zA-Z0-9-]*)").ok());

/// XPath leading separators, longest first.
const XPATH_PREFIXES: [&str; 4] = [".//", "//", "./", "/"];

/// CSS combinator characters.
const CSS_COMBINATORS: &[u8] = b" >+~";

// ============================================================================
// Public API
// ============================================================================

/// Splits a selector into frame-crossing segments.
///
/// Returns a single clone of `by` when the selector crosses no frame. Only
/// raw `Css` and `XPath` selectors are inspected; shorthand strategies never
/// name a frame step.
#[must_use]
pub fn split_frame_segments(by: &By) -> Vec<By> {
    let segments: Option<Vec<By>> = match by {
        By::Css(expression) => {
            split_css(expression).map(|parts| parts.into_iter().map(By::Css).collect())
        }
        By::XPath(expression) => {
            split_xpath(expression).map(|parts| parts.into_iter().map(By::XPath).collect())
        }
        _ => None,
    };

    segments.unwrap_or_else(|| vec![by.clone()])
}

/// Returns `true` if the selector crosses at least one frame.
#[inline]
#[must_use]
pub fn crosses_frames(by: &By) -> bool {
    split_frame_segments(by).len() > 1
}

// ============================================================================
// Nesting Tracker
// ============================================================================

/// Tracks quotes, brackets and parentheses while scanning a selector.
#[derive(Debug, Default)]
struct Nesting {
    single_quote: bool,
    double_quote: bool,
    brackets: i32,
    parens: i32,
}

impl Nesting {
    /// Feeds one byte; returns `true` if it sits at nesting depth zero.
    fn feed(&mut self, byte: u8) -> bool {
        if self.single_quote {
            self.single_quote = byte != b'\'';
            return false;
        }
        if self.double_quote {
            self.double_quote = byte != b'"';
            return false;
        }

        match byte {
            b'\'' => self.single_quote = true,
            b'"' => self.double_quote = true,
            b'[' => self.brackets += 1,
            b']' => self.brackets -= 1,
            b'(' => self.parens += 1,
            b')' => self.parens -= 1,
            _ => return self.brackets == 0 && self.parens == 0,
        }
        false
    }
}

// ============================================================================
// XPath
// ============================================================================

/// One location step and the separator in front of it.
#[derive(Debug, Clone, PartialEq, Eq)]
struct XPathStep<'a> {
    separator: &'a str,
    text: &'a str,
}

fn split_xpath(expression: &str) -> Option<Vec<String>> {
    let steps = tokenize_xpath(expression);
    let last = steps.len().checked_sub(1)?;

    let splits: Vec<usize> = steps
        .iter()
        .enumerate()
        .filter(|(index, step)| *index < last && is_iframe_xpath_step(step.text))
        .map(|(index, _)| index)
        .collect();

    if splits.is_empty() {
        return None;
    }
    Some(build_xpath_segments(&steps, &splits))
}

fn leading_separator(expression: &str) -> &str {
    if expression.starts_with('(') {
        return "";
    }
    XPATH_PREFIXES
        .iter()
        .find(|prefix| expression.starts_with(**prefix))
        .map_or("", |prefix| &expression[..prefix.len()])
}

fn tokenize_xpath(expression: &str) -> Vec<XPathStep<'_>> {
    let bytes = expression.as_bytes();
    let mut steps = Vec::new();
    let mut separator = leading_separator(expression);
    let mut token_start = separator.len();
    let mut index = token_start;
    let mut nesting = Nesting::default();

    while index < bytes.len() {
        let byte = bytes[index];
        if nesting.feed(byte) && byte == b'/' {
            let text = &expression[token_start..index];
            if !text.is_empty() {
                steps.push(XPathStep { separator, text });
            }

            let double = bytes.get(index + 1) == Some(&b'/');
            separator = if double { "//" } else { "/" };
            index += separator.len();
            token_start = index;
            continue;
        }
        index += 1;
    }

    let rest = &expression[token_start..];
    if !rest.is_empty() {
        steps.push(XPathStep { separator, text: rest });
    }
    steps
}

fn is_iframe_xpath_step(text: &str) -> bool {
    let pattern: &Option<Regex> = if text.starts_with('(') {
        &XPATH_IFRAME_GROUP
    } else {
        &XPATH_IFRAME_STEP
    };
    pattern.as_ref().is_some_and(|re| re.is_match(text))
}

fn build_xpath_segments(steps: &[XPathStep<'_>], splits: &[usize]) -> Vec<String> {
    let mut segments = Vec::with_capacity(splits.len() + 1);
    let mut start = 0;

    for end in splits.iter().map(|split| split + 1).chain(std::iter::once(steps.len())) {
        if start >= end {
            break;
        }

        let mut segment = String::new();
        for (index, step) in steps[start..end].iter().enumerate() {
            // Inner segments search the whole frame document.
            if index == 0 && start != 0 {
                segment.push_str("//");
            } else {
                segment.push_str(step.separator);
            }
            segment.push_str(step.text);
        }
        segments.push(segment);
        start = end;
    }
    segments
}

// ============================================================================
// CSS
// ============================================================================

/// One compound selector and the combinator following it.
#[derive(Debug, Clone, PartialEq, Eq)]
struct CssCompound<'a> {
    text: &'a str,
    combinator: Option<u8>,
}

fn split_css(expression: &str) -> Option<Vec<String>> {
    let compounds = tokenize_css(expression);
    let last = compounds.len().checked_sub(1)?;

    let splits: Vec<usize> = compounds
        .iter()
        .enumerate()
        .filter(|(index, compound)| *index < last && is_iframe_css_compound(compound.text))
        .map(|(index, _)| index)
        .collect();

    if splits.is_empty() {
        return None;
    }
    Some(build_css_segments(&compounds, &splits))
}

fn tokenize_css(expression: &str) -> Vec<CssCompound<'_>> {
    let bytes = expression.as_bytes();
    let mut compounds = Vec::new();
    let mut token_start = 0;
    let mut index = 0;
    let mut nesting = Nesting::default();

    while index < bytes.len() {
        let byte = bytes[index];
        if nesting.feed(byte) && CSS_COMBINATORS.contains(&byte) {
            let text = &expression[token_start..index];
            if text.trim().is_empty() {
                index += 1;
                continue;
            }

            let (combinator, next) = consume_combinator(bytes, index);
            compounds.push(CssCompound {
                text,
                combinator: Some(combinator),
            });
            index = next;
            token_start = next;
            continue;
        }
        index += 1;
    }

    let rest = expression[token_start..].trim();
    if !rest.is_empty() {
        compounds.push(CssCompound {
            text: rest,
            combinator: None,
        });
    }
    compounds
}

/// Consumes a combinator run starting at `start`; returns it and the next index.
fn consume_combinator(bytes: &[u8], start: usize) -> (u8, usize) {
    let skip_spaces = |mut index: usize| {
        while bytes.get(index) == Some(&b' ') {
            index += 1;
        }
        index
    };

    let index = skip_spaces(start);
    match bytes.get(index) {
        Some(&byte) if matches!(byte, b'>' | b'+' | b'~') => (byte, skip_spaces(index + 1)),
        _ => (b' ', index),
    }
}

fn is_iframe_css_compound(text: &str) -> bool {
    let text = text.trim();
    if text.starts_with(['.', '#', '[', ':']) {
        return false;
    }

    CSS_TAG_NAME
        .as_ref()
        .and_then(|re| re.captures(text))
        .and_then(|captures| captures.get(1))
        .is_some_and(|tag| tag.as_str().eq_ignore_ascii_case("iframe"))
}

fn format_combinator(combinator: u8) -> String {
    if combinator == b' ' {
        " ".to_string()
    } else {
        format!(" {} ", combinator as char)
    }
}

fn build_css_segments(compounds: &[CssCompound<'_>], splits: &[usize]) -> Vec<String> {
    let mut segments = Vec::with_capacity(splits.len() + 1);
    let mut start = 0;

    for end in splits.iter().map(|split| split + 1).chain(std::iter::once(compounds.len())) {
        if start >= end {
            break;
        }

        let mut segment = String::new();
        for index in start..end {
            if index > start {
                let previous = compounds[index - 1].combinator.unwrap_or(b' ');
                segment.push_str(&format_combinator(previous));
            }
            segment.push_str(compounds[index].text);
        }
        segments.push(segment);
        start = end;
    }
    segments
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    fn css(parts: &[&str]) -> Vec<By> {
        parts.iter().map(|p| By::css(*p)).collect()
    }

    fn xpath(parts: &[&str]) -> Vec<By> {
        parts.iter().map(|p| By::xpath(*p)).collect()
    }

    // ------------------------------------------------------------------------
    // CSS
    // ------------------------------------------------------------------------

    #[test]
    fn test_css_split_at_iframe() {
        let segments = split_frame_segments(&By::css("div iframe.foo > .inner span"));
        assert_eq!(segments, css(&["div iframe.foo", ".inner span"]));
    }

    #[test]
    fn test_css_keeps_combinators_inside_segment() {
        let segments = split_frame_segments(&By::css("main>section + iframe ~ p"));
        assert_eq!(segments, css(&["main > section + iframe", "p"]));
    }

    #[test]
    fn test_css_nested_frames() {
        let segments = split_frame_segments(&By::css("iframe#outer iframe[name='inner'] button"));
        assert_eq!(segments, css(&["iframe#outer", "iframe[name='inner']", "button"]));
    }

    #[test]
    fn test_css_trailing_iframe_unsplit() {
        let by = By::css("#host iframe");
        assert_eq!(split_frame_segments(&by), vec![by]);
    }

    #[test]
    fn test_css_lookalikes_unsplit() {
        for expression in [
            ".iframe div",
            "#iframe div",
            "[data-kind=iframe] div",
            "iframes div",
            "div:has(> iframe) p",
            "a[title='iframe b'] c",
        ] {
            let by = By::css(expression);
            assert_eq!(split_frame_segments(&by), vec![by.clone()], "{expression}");
        }
    }

    #[test]
    fn test_css_quoted_spaces_stay_in_compound() {
        let segments = split_frame_segments(&By::css("IFRAME[src*='a b'] p"));
        assert_eq!(segments, css(&["IFRAME[src*='a b']", "p"]));
    }

    // ------------------------------------------------------------------------
    // XPath
    // ------------------------------------------------------------------------

    #[test]
    fn test_xpath_split_at_iframe() {
        let segments = split_frame_segments(&By::xpath("//div/iframe[@id='x']//body/p"));
        assert_eq!(segments, xpath(&["//div/iframe[@id='x']", "//body/p"]));
    }

    #[test]
    fn test_xpath_slash_inside_predicate() {
        let segments =
            split_frame_segments(&By::xpath("//iframe[contains(@src, 'a/b')]/html//span"));
        assert_eq!(
            segments,
            xpath(&["//iframe[contains(@src, 'a/b')]", "//html//span"])
        );
    }

    #[test]
    fn test_xpath_axis_and_group() {
        assert_eq!(
            split_frame_segments(&By::xpath("//descendant::iframe//p")),
            xpath(&["//descendant::iframe", "//p"])
        );
        assert_eq!(
            split_frame_segments(&By::xpath("(//iframe)[1]//div")),
            xpath(&["(//iframe)[1]", "//div"])
        );
    }

    #[test]
    fn test_xpath_relative_prefix_preserved() {
        assert_eq!(
            split_frame_segments(&By::xpath(".//iframe/div")),
            xpath(&[".//iframe", "//div"])
        );
    }

    #[test]
    fn test_xpath_unsplit_cases() {
        for expression in [
            "//div/iframe",
            "//*[local-name()='iframe']//div",
            "//iframes/div",
            "//div[@class='iframe']/span",
        ] {
            let by = By::xpath(expression);
            assert_eq!(split_frame_segments(&by), vec![by.clone()], "{expression}");
        }
    }

    #[test]
    fn test_shorthand_never_split() {
        for by in [By::tag("iframe"), By::text("iframe p"), By::id("iframe")] {
            assert_eq!(split_frame_segments(&by), vec![by.clone()]);
        }
        assert!(!crosses_frames(&By::css("div")));
        assert!(crosses_frames(&By::css("iframe div")));
    }

    // ------------------------------------------------------------------------
    // Properties
    // ------------------------------------------------------------------------

    fn frame_compound() -> impl Strategy<Value = String> {
        prop_oneof![
            Just("iframe".to_string()),
            "[a-z]{1,6}".prop_map(|id| format!("iframe#{id}")),
            "[a-z]{1,6}".prop_map(|class| format!("iframe.{class}")),
            "[a-z]{1,6}".prop_map(|name| format!("iframe[name='{name} x']")),
        ]
    }

    fn content_compound() -> impl Strategy<Value = String> {
        prop_oneof![
            "[a-h]{1,4}".prop_map(|tag| format!("{tag}.item")),
            "[a-z]{1,6}".prop_map(|id| format!("#{id}")),
            "[a-z]{1,6}".prop_map(|class| format!(".{class}")),
        ]
    }

    proptest! {
        #[test]
        fn prop_css_n_frames_give_n_plus_one_segments(
            frames in prop::collection::vec(frame_compound(), 0..4),
            content in content_compound(),
            combinator in prop_oneof![Just(" "), Just(" > "), Just(">")],
        ) {
            let mut expression = String::new();
            for frame in &frames {
                expression.push_str(frame);
                expression.push_str(combinator);
            }
            expression.push_str(&content);

            let segments = split_frame_segments(&By::css(expression.clone()));
            prop_assert_eq!(segments.len(), frames.len() + 1);
            prop_assert_eq!(segments.last(), Some(&By::css(content)));
        }

        #[test]
        fn prop_xpath_n_frames_give_n_plus_one_segments(
            ids in prop::collection::vec("[a-z]{1,6}", 0..4),
            tail in "[a-h]{1,4}",
        ) {
            let mut expression = String::new();
            for id in &ids {
                expression.push_str(&format!("//iframe[@id='{id}']"));
            }
            expression.push_str(&format!("//{tail}"));

            let segments = split_frame_segments(&By::xpath(expression));
            prop_assert_eq!(segments.len(), ids.len() + 1);
            prop_assert_eq!(segments.last(), Some(&By::xpath(format!("//{tail}"))));
        }

        #[test]
        fn prop_css_without_frames_is_unchanged(content in "[a-h .#>]{0,24}") {
            let by = By::css(content);
            let segments = split_frame_segments(&by);
            prop_assert_eq!(segments, vec![by]);
        }
    }
}
