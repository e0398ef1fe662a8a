//! Conversion between local (camelCase) names and remote names.

use serde::{Deserialize, Serialize};

/// How local field and entity names map to remote names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NamingConvention {
    /// Same name on both sides.
    None,
    /// `oneTwo` <-> `one_two`.
    #[default]
    SnakeCase,
    /// `oneTwo` <-> `one-two`.
    Hyphen,
}

impl NamingConvention {
    /// Convert a local name into its remote form.
    ///
    /// Existing separators are kept as they are, so `one_two` stays
    /// `one_two` under the hyphen convention.
    pub fn to_remote(&self, name: &str) -> String {
        match self {
            NamingConvention::None => name.to_string(),
            NamingConvention::SnakeCase => split_words(name, '_'),
            NamingConvention::Hyphen => split_words(name, '-'),
        }
    }

    /// Convert a remote name back into its local camelCase form.
    pub fn to_local(&self, name: &str) -> String {
        match self {
            NamingConvention::None => name.to_string(),
            NamingConvention::SnakeCase => join_words(name, '_'),
            NamingConvention::Hyphen => join_words(name, '-'),
        }
    }

    /// Parse a convention name as used on the command line.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "none" => Some(NamingConvention::None),
            "snake-case" | "snake_case" | "snake" => Some(NamingConvention::SnakeCase),
            "hyphen" | "kebab-case" => Some(NamingConvention::Hyphen),
            _ => None,
        }
    }
}

fn split_words(name: &str, separator: char) -> String {
    let mut result = String::with_capacity(name.len() + 4);
    let mut previous: Option<char> = None;

    for c in name.chars() {
        if c.is_uppercase() {
            if matches!(previous, Some(p) if p != separator && p != '_' && p != '-') {
                result.push(separator);
            }
            result.extend(c.to_lowercase());
        } else {
            result.push(c);
        }
        previous = Some(c);
    }

    result
}

fn join_words(name: &str, separator: char) -> String {
    let mut result = String::with_capacity(name.len());
    let mut upper_next = false;

    for c in name.chars() {
        if c == separator && !result.is_empty() {
            upper_next = true;
        } else if upper_next {
            result.extend(c.to_uppercase());
            upper_next = false;
        } else {
            result.push(c);
        }
    }

    if upper_next {
        result.push(separator);
    }
    result
}
