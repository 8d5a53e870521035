//! Reference marker templates such as `(1)`, `[1]` or `Quelle 1`.

use std::fmt;

use regex::Regex;

use super::ActionError;

pub const DEFAULT_STYLE: &str = "(1)";
pub const PREDEFINED_STYLES: [&str; 3] = ["(1)", "[1]", "Quelle 1"];

const PLACEHOLDER: &str = "1";

/// A validated marker template. The first `1` marks where the number goes.
#[derive(Debug, Clone)]
pub struct ReferenceStyle {
    template: String,
    pattern: Regex,
}

impl ReferenceStyle {
    /// # Errors
    ///
    /// [`ActionError::InvalidStyle`] when the template has no `1`.
    pub fn new(template: &str) -> Result<Self, ActionError> {
        if !template.contains(PLACEHOLDER) {
            return Err(ActionError::InvalidStyle);
        }
        let pattern = regex::escape(template).replacen(PLACEHOLDER, r"(\d+)", 1);
        let pattern = Regex::new(&pattern).map_err(|_| ActionError::InvalidStyle)?;
        Ok(Self {
            template: template.to_string(),
            pattern,
        })
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    /// Regex matching markers; group 1 holds the number.
    pub const fn pattern(&self) -> &Regex {
        &self.pattern
    }

    /// The marker text for `number`.
    pub fn render(&self, number: usize) -> String {
        self.template.replacen(PLACEHOLDER, &number.to_string(), 1)
    }
}

impl fmt::Display for ReferenceStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.template)
    }
}

/// The predefined style after `current`, wrapping around. Custom styles
/// continue with the first predefined one.
pub fn next_predefined_style(current: &str) -> &'static str {
    PREDEFINED_STYLES
        .iter()
        .position(|style| *style == current)
        .map_or(PREDEFINED_STYLES[0], |pos| {
            PREDEFINED_STYLES[(pos + 1) % PREDEFINED_STYLES.len()]
        })
}
