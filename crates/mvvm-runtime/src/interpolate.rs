#![forbid(unsafe_code)]

//! `{{ path }}` marker extraction and rendering.

use mvvm_core::{Object, Result, resolve};
use regex::Regex;

/// Finds interpolation markers in text and renders them against data.
///
/// A marker is the shortest run between the opening and closing delimiter
/// on one line. The enclosed path is trimmed, so `{{ name }}` and
/// `{{name}}` are the same binding.
#[derive(Debug, Clone)]
pub struct Interpolator {
    pattern: Regex,
}

impl Interpolator {
    /// Build a matcher for the given delimiters.
    ///
    /// # Errors
    ///
    /// Returns a regex error if the escaped pattern cannot be compiled.
    pub fn new(open: &str, close: &str) -> std::result::Result<Self, regex::Error> {
        let pattern = Regex::new(&format!(
            "{}(.+?){}",
            regex::escape(open),
            regex::escape(close)
        ))?;
        Ok(Self { pattern })
    }

    pub fn has_markers(&self, text: &str) -> bool {
        self.pattern.is_match(text)
    }

    /// Trimmed paths of every marker, in order of appearance.
    pub fn expressions<'t>(&self, text: &'t str) -> Vec<&'t str> {
        self.pattern
            .captures_iter(text)
            .filter_map(|caps| caps.get(1))
            .map(|m| m.as_str().trim())
            .collect()
    }

    /// Replace every marker with the display form of its resolved value.
    ///
    /// Reads are tracked, so rendering inside a watcher evaluation
    /// subscribes to every marker's path.
    ///
    /// # Errors
    ///
    /// Returns the first resolution error.
    pub fn render(&self, text: &str, data: &Object) -> Result<String> {
        let mut out = String::with_capacity(text.len());
        let mut last = 0;
        for caps in self.pattern.captures_iter(text) {
            let (Some(whole), Some(expr)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            out.push_str(&text[last..whole.start()]);
            let value = resolve(data, expr.as_str())?;
            out.push_str(&value.to_string());
            last = whole.end();
        }
        out.push_str(&text[last..]);
        Ok(out)
    }
}
