//! Element locator strategies.
//!
//! Provides `By` selectors for finding elements. Every strategy compiles
//! to one of two dialects: CSS or XPath.
//!
//! # Example
//!
//! ```ignore
//! use cdp_scope::By;
//!
//! // CSS selector
//! let btn = page.find(By::css("#submit")).await?;
//!
//! // By ID (compiles to CSS `#id`)
//! let form = page.find(By::id("login-form")).await?;
//!
//! // By text content (compiles to XPath `contains(text(), ...)`)
//! let link = page.find(By::text("Click here")).await?;
//!
//! // Plain strings are auto-detected
//! let row = page.find("//table//tr[2]").await?;
//! ```

use std::borrow::Cow;
use std::fmt::{self, Write as _};

use serde::{Deserialize, Serialize};

// ============================================================================
// Dialect
// ============================================================================

/// Selector language understood by the browser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    /// CSS selectors (`querySelector`).
    Css,
    /// XPath expressions (`document.evaluate`).
    XPath,
}

impl Dialect {
    /// Returns a display name.
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Css => "CSS",
            Self::XPath => "XPath",
        }
    }

    /// Detects the dialect of a raw expression.
    ///
    /// Expressions starting with `./`, `/` or `(/` are XPath; anything
    /// else is CSS.
    #[must_use]
    pub fn detect(expression: &str) -> Self {
        if expression.starts_with("./") || expression.starts_with('/') || expression.starts_with("(/")
        {
            Self::XPath
        } else {
            Self::Css
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// By Enum
// ============================================================================

/// Element locator strategy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", content = "value")]
pub enum By {
    /// CSS selector.
    ///
    /// # Example
    /// ```ignore
    /// By::css("button.primary")
    /// By::css("[data-testid='submit']")
    /// ```
    #[serde(rename = "css")]
    Css(String),

    /// XPath expression.
    ///
    /// # Example
    /// ```ignore
    /// By::xpath("//button[@type='submit']")
    /// ```
    #[serde(rename = "xpath")]
    XPath(String),

    /// Element ID (CSS `#id`).
    #[serde(rename = "id")]
    Id(String),

    /// Single class name (CSS `.class`).
    #[serde(rename = "class")]
    Class(String),

    /// Tag name.
    #[serde(rename = "tag")]
    Tag(String),

    /// Name attribute (CSS `[name="..."]`).
    #[serde(rename = "name")]
    Name(String),

    /// Partial text content match.
    ///
    /// Compiles to `//*[contains(text(), "...")]`.
    #[serde(rename = "text")]
    Text(String),
}

impl By {
    /// Creates a CSS selector.
    #[inline]
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    /// Creates an XPath selector.
    #[inline]
    pub fn xpath(expr: impl Into<String>) -> Self {
        Self::XPath(expr.into())
    }

    /// Creates an ID selector.
    #[inline]
    pub fn id(id: impl Into<String>) -> Self {
        Self::Id(id.into())
    }

    /// Creates a class name selector.
    #[inline]
    pub fn class(class: impl Into<String>) -> Self {
        Self::Class(class.into())
    }

    /// Creates a tag name selector.
    #[inline]
    pub fn tag(tag: impl Into<String>) -> Self {
        Self::Tag(tag.into())
    }

    /// Creates a name attribute selector.
    #[inline]
    pub fn name(name: impl Into<String>) -> Self {
        Self::Name(name.into())
    }

    /// Creates a text content selector.
    #[inline]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// Creates a selector with auto-detected dialect.
    #[must_use]
    pub fn detect(expression: impl Into<String>) -> Self {
        let expression = expression.into();
        match Dialect::detect(&expression) {
            Dialect::XPath => Self::XPath(expression),
            Dialect::Css => Self::Css(expression),
        }
    }

    /// Returns the strategy name.
    #[must_use]
    pub fn strategy(&self) -> &'static str {
        match self {
            Self::Css(_) => "css",
            Self::XPath(_) => "xpath",
            Self::Id(_) => "id",
            Self::Class(_) => "class",
            Self::Tag(_) => "tag",
            Self::Name(_) => "name",
            Self::Text(_) => "text",
        }
    }

    /// Returns the raw selector value.
    #[must_use]
    pub fn value(&self) -> &str {
        match self {
            Self::Css(v)
            | Self::XPath(v)
            | Self::Id(v)
            | Self::Class(v)
            | Self::Tag(v)
            | Self::Name(v)
            | Self::Text(v) => v,
        }
    }

    /// Returns the dialect this selector compiles to.
    #[must_use]
    pub fn dialect(&self) -> Dialect {
        match self {
            Self::XPath(_) | Self::Text(_) => Dialect::XPath,
            Self::Css(_) | Self::Id(_) | Self::Class(_) | Self::Tag(_) | Self::Name(_) => {
                Dialect::Css
            }
        }
    }

    /// Returns the compiled expression in [`By::dialect`].
    #[must_use]
    pub fn expression(&self) -> Cow<'_, str> {
        match self {
            Self::Css(v) | Self::XPath(v) | Self::Tag(v) => Cow::Borrowed(v),
            Self::Id(v) => Cow::Owned(format!("#{}", css_identifier(v))),
            Self::Class(v) => Cow::Owned(format!(".{}", css_identifier(v))),
            Self::Name(v) => Cow::Owned(format!(
                "[name=\"{}\"]",
                v.replace('\\', "\\\\").replace('"', "\\\"")
            )),
            Self::Text(v) => Cow::Owned(format!("//*[contains(text(), {})]", xpath_literal(v))),
        }
    }
}

impl fmt::Display for By {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.strategy(), self.value())
    }
}

// ============================================================================
// CSS Helpers
// ============================================================================

/// Escapes a string for use as a CSS identifier, like `CSS.escape`.
///
/// `1st` becomes `\31 st`; `md:flex` becomes `md\:flex`.
#[must_use]
pub fn css_identifier(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let first_is_dash = value.starts_with('-');

    if value == "-" {
        return "\\-".to_string();
    }

    for (index, c) in value.chars().enumerate() {
        match c {
            '\0' => out.push('\u{FFFD}'),
            '\u{1}'..='\u{1F}' | '\u{7F}' => push_code_point(&mut out, c),
            '0'..='9' if index == 0 || (index == 1 && first_is_dash) => push_code_point(&mut out, c),
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' => out.push(c),
            c if !c.is_ascii() => out.push(c),
            c => {
                out.push('\\');
                out.push(c);
            }
        }
    }
    out
}

fn push_code_point(out: &mut String, c: char) {
    let _ = write!(out, "\\{:x} ", u32::from(c));
}

// ============================================================================
// XPath Helpers
// ============================================================================

/// Rewrites an absolute XPath so it evaluates relative to the context node.
///
/// `//div` becomes `.//div`; `(//a)[2]` becomes `(.//a)[2]`. Relative
/// expressions are returned unchanged.
#[must_use]
pub fn relative_xpath(xpath: &str) -> Cow<'_, str> {
    let open_parens = xpath.len() - xpath.trim_start_matches('(').len();
    let body = &xpath[open_parens..];

    if body.starts_with('.') || !body.starts_with('/') {
        return Cow::Borrowed(xpath);
    }
    Cow::Owned(format!("{}.{}", &xpath[..open_parens], body))
}

/// Quotes a string as an XPath literal.
///
/// XPath 1.0 has no escape sequences; strings holding both quote kinds are
/// built with `concat()`.
#[must_use]
pub fn xpath_literal(value: &str) -> String {
    if !value.contains('"') {
        return format!("\"{value}\"");
    }
    if !value.contains('\'') {
        return format!("'{value}'");
    }

    let parts: Vec<String> = value
        .split('"')
        .map(|part| format!("\"{part}\""))
        .collect();
    format!("concat({})", parts.join(", '\"', "))
}

// ============================================================================
// From implementations for ergonomics
// ============================================================================

impl From<&str> for By {
    /// Converts a string with dialect auto-detection.
    fn from(s: &str) -> Self {
        Self::detect(s)
    }
}

impl From<String> for By {
    /// Converts a string with dialect auto-detection.
    fn from(s: String) -> Self {
        Self::detect(s)
    }
}

impl From<&By> for By {
    fn from(by: &By) -> Self {
        by.clone()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_by_css() {
        let by = By::css("#login");
        assert_eq!(by.strategy(), "css");
        assert_eq!(by.value(), "#login");
        assert_eq!(by.dialect(), Dialect::Css);
    }

    #[test]
    fn test_detection() {
        assert_eq!(By::from("//button"), By::xpath("//button"));
        assert_eq!(By::from("./span"), By::xpath("./span"));
        assert_eq!(By::from("(//a)[1]"), By::xpath("(//a)[1]"));
        assert_eq!(By::from("div > a"), By::css("div > a"));
        assert_eq!(By::from(String::from(".item")), By::css(".item"));
    }

    #[test]
    fn test_shorthand_compilation() {
        assert_eq!(By::id("user").expression(), "#user");
        assert_eq!(By::class("btn").expression(), ".btn");
        assert_eq!(By::tag("input").expression(), "input");
        assert_eq!(By::name("q").expression(), "[name=\"q\"]");
        assert_eq!(By::name("q").dialect(), Dialect::Css);
    }

    #[test]
    fn test_shorthand_escapes_identifiers() {
        assert_eq!(By::id("1st").expression(), "#\\31 st");
        assert_eq!(By::id("-2x").expression(), "#-\\32 x");
        assert_eq!(By::class("md:flex").expression(), ".md\\:flex");
        assert_eq!(By::class("w-1/2").expression(), ".w-1\\/2");
        assert_eq!(By::id("caf\u{e9}_x").expression(), "#caf\u{e9}_x");
        assert_eq!(css_identifier("-"), "\\-");
        assert_eq!(By::name(r#"a"b\c"#).expression(), r#"[name="a\"b\\c"]"#);
    }

    #[test]
    fn test_text_compiles_to_xpath() {
        let by = By::text("Sign in");
        assert_eq!(by.dialect(), Dialect::XPath);
        assert_eq!(by.expression(), "//*[contains(text(), \"Sign in\")]");
    }

    #[test]
    fn test_xpath_literal_quoting() {
        assert_eq!(xpath_literal("plain"), "\"plain\"");
        assert_eq!(xpath_literal("say \"hi\""), "'say \"hi\"'");
        assert_eq!(
            xpath_literal("it's \"x\""),
            "concat(\"it's \", '\"', \"x\", '\"', \"\")"
        );
    }

    #[test]
    fn test_relative_xpath() {
        assert_eq!(relative_xpath("//div"), ".//div");
        assert_eq!(relative_xpath("/html/body"), "./html/body");
        assert_eq!(relative_xpath(".//span"), ".//span");
        assert_eq!(relative_xpath("(//a)[2]"), "(.//a)[2]");
        assert_eq!(relative_xpath("span"), "span");
    }

    #[test]
    fn test_display() {
        assert_eq!(By::id("x").to_string(), "id=x");
    }
}
