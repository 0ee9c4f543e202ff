// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Markdown helpers for chat message bodies.

use std::borrow::Cow;

/// Horizontal rule between repository groups of a listing.
pub const SEPARATOR: &str = "<hr />";

fn is_special(character: char,) -> bool
{
    matches!(
        character,
        '\\' | '`' | '*' | '_' | '{' | '}' | '[' | ']' | '(' | ')' | '#' | '+' | '-' | '.' | '!'
    )
}

/// Escapes Markdown control characters with a backslash.
pub fn escape(value: &str,) -> Cow<'_, str,>
{
    if !value.chars().any(is_special,) {
        return Cow::Borrowed(value,);
    }
    let mut escaped = String::with_capacity(value.len() + 8,);
    for character in value.chars() {
        if is_special(character,) {
            escaped.push('\\',);
        }
        escaped.push(character,);
    }
    Cow::Owned(escaped,)
}

/// Renders an inline link with escaped text.
pub fn link(text: &str, url: &str,) -> String
{
    format!("[{}]({url})", escape(text))
}
