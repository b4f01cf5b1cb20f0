//! Locator abstraction for element selection.
//!
//! A [`Locator`] pairs a concrete element-finding strategy with a semantic
//! field name. Page objects expose only the name; the selector stays an
//! implementation detail, so failure messages read in domain terms.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default wait budget for driver actions (5 seconds)
pub const DEFAULT_TIMEOUT_MS: u64 = 5000;

/// Selector type for locating elements
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Selector {
    /// CSS selector (e.g., ".shopping_cart_link")
    Css(String),
    /// Test ID selector, the demo store convention (`data-test` attribute)
    TestId(String),
    /// Text content selector
    Text(String),
    /// CSS selector combined with a text filter
    CssWithText {
        /// Base CSS selector
        css: String,
        /// Text content to match
        text: String,
    },
}

impl Selector {
    /// Create a CSS selector
    #[must_use]
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    /// Create a test ID selector
    #[must_use]
    pub fn test_id(id: impl Into<String>) -> Self {
        Self::TestId(id.into())
    }

    /// Create a text selector
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// Render the concrete CSS query handed to a real driver
    #[must_use]
    pub fn to_css(&self) -> String {
        match self {
            Self::Css(s) => s.clone(),
            Self::TestId(id) => format!("[data-test=\"{id}\"]"),
            Self::Text(t) => format!(":text(\"{t}\")"),
            Self::CssWithText { css, text } => format!("{css}:text(\"{text}\")"),
        }
    }
}

/// Locator options for customizing driver behavior
#[derive(Debug, Clone)]
pub struct LocatorOptions {
    /// Wait budget for the driver's built-in retry
    pub timeout: Duration,
    /// Whether to require a strict single-element match
    pub strict: bool,
    /// Whether the element must be visible before acting
    pub visible: bool,
}

impl Default for LocatorOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            strict: true,
            visible: true,
        }
    }
}

/// A locator for finding and interacting with elements.
///
/// Carries an optional semantic name; when set, driver errors report the
/// name instead of the underlying selector.
#[derive(Debug, Clone)]
pub struct Locator {
    selector: Selector,
    name: Option<String>,
    options: LocatorOptions,
}

impl Locator {
    /// Create a locator from a selector
    #[must_use]
    pub fn new(selector: Selector) -> Self {
        Self {
            selector,
            name: None,
            options: LocatorOptions::default(),
        }
    }

    /// Create a test ID locator
    #[must_use]
    pub fn test_id(id: impl Into<String>) -> Self {
        Self::new(Selector::test_id(id))
    }

    /// Create a CSS locator
    #[must_use]
    pub fn css(selector: impl Into<String>) -> Self {
        Self::new(Selector::css(selector))
    }

    /// Attach a semantic field name used in error messages
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set a custom wait budget
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.options.timeout = timeout;
        self
    }

    /// Disable strict single-match mode
    #[must_use]
    pub const fn with_strict(mut self, strict: bool) -> Self {
        self.options.strict = strict;
        self
    }

    /// Get the selector
    #[must_use]
    pub const fn selector(&self) -> &Selector {
        &self.selector
    }

    /// Get the options
    #[must_use]
    pub const fn options(&self) -> &LocatorOptions {
        &self.options
    }

    /// Semantic field name for error messages; falls back to the selector
    #[must_use]
    pub fn field_name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| self.selector.to_css())
    }

    /// Wait budget in milliseconds
    #[must_use]
    pub fn timeout_ms(&self) -> u64 {
        self.options.timeout.as_millis() as u64
    }
}

impl std::fmt::Display for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.field_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod selector_tests {
        use super::*;

        #[test]
        fn test_id_renders_data_test_attribute() {
            let sel = Selector::test_id("login-button");
            assert_eq!(sel.to_css(), "[data-test=\"login-button\"]");
        }

        #[test]
        fn css_renders_verbatim() {
            let sel = Selector::css(".shopping_cart_link");
            assert_eq!(sel.to_css(), ".shopping_cart_link");
        }

        #[test]
        fn css_with_text() {
            let sel = Selector::CssWithText {
                css: "button".to_string(),
                text: "Checkout".to_string(),
            };
            assert_eq!(sel.to_css(), "button:text(\"Checkout\")");
        }
    }

    mod locator_tests {
        use super::*;

        #[test]
        fn default_options() {
            let locator = Locator::test_id("username");
            assert_eq!(locator.timeout_ms(), DEFAULT_TIMEOUT_MS);
            assert!(locator.options().strict);
            assert!(locator.options().visible);
        }

        #[test]
        fn named_locator_reports_semantic_field() {
            let locator = Locator::test_id("login-button").named("submitButton");
            assert_eq!(locator.field_name(), "submitButton");
            assert_eq!(locator.to_string(), "submitButton");
        }

        #[test]
        fn unnamed_locator_falls_back_to_selector() {
            let locator = Locator::test_id("error");
            assert_eq!(locator.field_name(), "[data-test=\"error\"]");
        }

        #[test]
        fn custom_timeout() {
            let locator = Locator::css("button").with_timeout(Duration::from_millis(250));
            assert_eq!(locator.timeout_ms(), 250);
        }
    }
}
