//! File naming styles used by go-zero code generation.
//!
//! The generator names logic files after handlers in one of four styles.
//! Unknown style strings are accepted and behave like [`NamingStyle::Lower`].

use std::{convert::Infallible, fmt, str::FromStr};

use serde::Deserialize;

/// How generated file names are spelled.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(from = "String")]
pub enum NamingStyle {
    /// `gozero`: everything lowercased, separators kept.
    #[default]
    Lower,
    /// `goZero`: camelCase.
    Camel,
    /// `go_zero`: snake_case.
    Snake,
    /// `go-zero`: kebab-case.
    Kebab,
}

impl NamingStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            NamingStyle::Lower => "gozero",
            NamingStyle::Camel => "goZero",
            NamingStyle::Snake => "go_zero",
            NamingStyle::Kebab => "go-zero",
        }
    }

    /// Format `name` in this style.
    ///
    /// ```
    /// # use zeroapi::NamingStyle;
    /// assert_eq!(NamingStyle::Lower.format("access_grant"), "access_grant");
    /// assert_eq!(NamingStyle::Snake.format("AccessGrant"), "access_grant");
    /// assert_eq!(NamingStyle::Kebab.format("accessGrant"), "access-grant");
    /// assert_eq!(NamingStyle::Camel.format("AccessGrant"), "accessGrant");
    /// ```
    pub fn format(&self, name: &str) -> String {
        match self {
            NamingStyle::Lower => name.to_lowercase(),
            NamingStyle::Camel => camel_case(name),
            NamingStyle::Snake => words(name).join("_"),
            NamingStyle::Kebab => words(name).join("-"),
        }
    }
}

impl From<&str> for NamingStyle {
    fn from(style: &str) -> Self {
        match style.trim() {
            "goZero" => NamingStyle::Camel,
            "go_zero" => NamingStyle::Snake,
            "go-zero" => NamingStyle::Kebab,
            _ => NamingStyle::Lower,
        }
    }
}

impl From<String> for NamingStyle {
    fn from(style: String) -> Self {
        Self::from(style.as_str())
    }
}

impl FromStr for NamingStyle {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s))
    }
}

impl fmt::Display for NamingStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Split at separators and at lower-to-upper case boundaries, lowercased.
fn words(name: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;

    for ch in name.chars() {
        if matches!(ch, '_' | '-') || ch.is_whitespace() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            prev_lower = false;
            continue;
        }
        if ch.is_uppercase() && prev_lower {
            words.push(std::mem::take(&mut current));
        }
        prev_lower = ch.is_lowercase() || ch.is_ascii_digit();
        current.extend(ch.to_lowercase());
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

fn camel_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for (index, word) in words(name).iter().enumerate() {
        let mut chars = word.chars();
        if let Some(first) = chars.next() {
            if index == 0 {
                out.push(first);
            } else {
                out.extend(first.to_uppercase());
            }
            out.push_str(chars.as_str());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_styles() {
        assert_eq!(NamingStyle::from("gozero"), NamingStyle::Lower);
        assert_eq!(NamingStyle::from("goZero"), NamingStyle::Camel);
        assert_eq!(NamingStyle::from(" go_zero "), NamingStyle::Snake);
        assert_eq!(NamingStyle::from("go-zero"), NamingStyle::Kebab);
        assert_eq!(NamingStyle::from("go#zero"), NamingStyle::Lower);
    }

    #[test]
    fn test_format() {
        assert_eq!(NamingStyle::Lower.format("GetUser"), "getuser");
        assert_eq!(NamingStyle::Camel.format("get_user_info"), "getUserInfo");
        assert_eq!(NamingStyle::Camel.format("getUser"), "getUser");
        assert_eq!(NamingStyle::Snake.format("getUserV2"), "get_user_v2");
        assert_eq!(NamingStyle::Kebab.format("get user"), "get-user");
        assert_eq!(NamingStyle::Snake.format(""), "");
    }

    #[test]
    fn test_deserialize_unknown_style() {
        #[derive(Deserialize)]
        struct Gen {
            style: NamingStyle,
        }

        let known: Gen = toml::from_str("style = \"go-zero\"").expect("parse");
        let unknown: Gen = toml::from_str("style = \"GO_ZERO\"").expect("parse");
        assert_eq!(known.style, NamingStyle::Kebab);
        assert_eq!(unknown.style, NamingStyle::Lower);
    }
}
