//! Divergence rendering for string equality failures
//!
//! Shows a window of each string around the first difference, with control
//! characters escaped and a pointer line marking the position.

#![allow(dead_code)]

/// Marker placed under the expected value
pub const EXPECTED_MARKER: char = '↓';
/// Marker placed under the actual value
pub const ACTUAL_MARKER: char = '↑';

const ELLIPSIS: &str = "···";
const NULL_TEXT: &str = "(null)";
const WINDOW_BEFORE: usize = 20;
const WINDOW_AFTER: usize = 41;

/// Line separator used in failure messages
#[cfg(windows)]
pub const NEWLINE: &str = "\r\n";
#[cfg(not(windows))]
pub const NEWLINE: &str = "\n";

/// One rendered side of a comparison
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Rendered {
    /// Windowed value, `None` when the value itself was null
    pub value: Option<String>,
    pub pointer: String,
}

impl Rendered {
    pub fn value_or_null(&self) -> &str {
        self.value.as_deref().unwrap_or(NULL_TEXT)
    }
}

fn encoding(c: char) -> Option<&'static str> {
    match c {
        '\r' => Some("\\r"),
        '\n' => Some("\\n"),
        '\t' => Some("\\t"),
        '\0' => Some("\\0"),
        _ => None,
    }
}

/// Render the window of `value` around `position`
pub fn shorten_and_encode(value: Option<&str>, position: usize, marker: char) -> Rendered {
    let chars: Vec<char> = value.unwrap_or_default().chars().collect();
    let start = position.saturating_sub(WINDOW_BEFORE);
    let end = (position + WINDOW_AFTER).min(chars.len());

    let mut printed_value = String::with_capacity(100);
    let mut printed_pointer = String::with_capacity(100);

    if start > 0 {
        printed_value.push_str(ELLIPSIS);
        printed_pointer.push_str("   ");
    }

    for idx in start..end {
        let c = chars[idx];
        let padding = match encoding(c) {
            Some(escaped) => {
                printed_value.push_str(escaped);
                escaped.len()
            }
            None => {
                printed_value.push(c);
                1
            }
        };

        if idx < position {
            printed_pointer.extend(std::iter::repeat(' ').take(padding));
        } else if idx == position {
            printed_pointer.push_str(&annotation(marker, position));
        }
    }

    if chars.len() == position {
        printed_pointer.push_str(&annotation(marker, position));
    }

    if end < chars.len() {
        printed_value.push_str(ELLIPSIS);
    }

    Rendered {
        value: value.map(|_| printed_value),
        pointer: printed_pointer,
    }
}

fn annotation(marker: char, position: usize) -> String {
    format!("{marker} (pos {position})")
}

/// Render both sides of a comparison
pub fn render(
    expected: Option<&str>,
    actual: Option<&str>,
    expected_index: usize,
    actual_index: usize,
) -> (Rendered, Rendered) {
    (
        shorten_and_encode(expected, expected_index, EXPECTED_MARKER),
        shorten_and_encode(actual, actual_index, ACTUAL_MARKER),
    )
}

/// First char index at which the strings differ, for each side.
///
/// When one string is a prefix of the other both indices point at the end
/// of the shorter one. Equal strings have no divergence.
pub fn divergence(expected: Option<&str>, actual: Option<&str>) -> Option<(usize, usize)> {
    if expected == actual {
        return None;
    }
    let expected = expected.unwrap_or_default();
    let actual = actual.unwrap_or_default();

    let index = expected
        .chars()
        .zip(actual.chars())
        .take_while(|(e, a)| e == a)
        .count();
    Some((index, index))
}

/// Equality failure between two values
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EqualFailure {
    pub user_message: String,
    pub expected: Option<String>,
    pub actual: Option<String>,
    /// First differing position in (expected, actual), when known
    pub indices: Option<(usize, usize)>,
}

impl EqualFailure {
    /// Failure for arbitrary values, without divergence positions
    pub fn values(
        user_message: impl Into<String>,
        expected: Option<String>,
        actual: Option<String>,
    ) -> Self {
        Self {
            user_message: user_message.into(),
            expected,
            actual,
            indices: None,
        }
    }

    /// Failure for two strings with their divergence computed
    pub fn strings(user_message: impl Into<String>, expected: Option<&str>, actual: Option<&str>) -> Self {
        Self {
            user_message: user_message.into(),
            expected: expected.map(str::to_string),
            actual: actual.map(str::to_string),
            indices: divergence(expected, actual),
        }
    }

    pub fn message(&self) -> String {
        let mut out = String::new();
        if !self.user_message.is_empty() {
            out.push_str(&self.user_message);
            out.push_str(NEWLINE);
        }

        match self.indices {
            Some((expected_index, actual_index)) => {
                let (expected, actual) = render(
                    self.expected.as_deref(),
                    self.actual.as_deref(),
                    expected_index,
                    actual_index,
                );
                out.push_str(&format!("          {}{NEWLINE}", expected.pointer));
                out.push_str(&format!("Expected: {}{NEWLINE}", expected.value_or_null()));
                out.push_str(&format!("Actual:   {}{NEWLINE}", actual.value_or_null()));
                out.push_str(&format!("          {}", actual.pointer));
            }
            None => {
                out.push_str(&format!(
                    "Expected: {}{NEWLINE}",
                    self.expected.as_deref().unwrap_or(NULL_TEXT)
                ));
                out.push_str(&format!(
                    "Actual:   {}",
                    self.actual.as_deref().unwrap_or(NULL_TEXT)
                ));
            }
        }
        out
    }
}
