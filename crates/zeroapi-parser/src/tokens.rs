//! Token types produced by the [`lexer`](crate::lexer).

use std::fmt;

use crate::span::Span;

/// Reserved words of the `.api` language.
///
/// Words such as `struct`, `map`, `interface` or the HTTP methods are only
/// meaningful in one position and stay plain identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    Syntax,
    Info,
    Import,
    Type,
    Service,
    Returns,
}

impl Keyword {
    /// Map a scanned word to a keyword, if it is one.
    pub fn from_word(word: &str) -> Option<Self> {
        match word {
            "syntax" => Some(Keyword::Syntax),
            "info" => Some(Keyword::Info),
            "import" => Some(Keyword::Import),
            "type" => Some(Keyword::Type),
            "service" => Some(Keyword::Service),
            "returns" => Some(Keyword::Returns),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Keyword::Syntax => "syntax",
            Keyword::Info => "info",
            Keyword::Import => "import",
            Keyword::Type => "type",
            Keyword::Service => "service",
            Keyword::Returns => "returns",
        }
    }

    /// Returns `true` for keywords that open a top-level declaration.
    pub fn starts_declaration(&self) -> bool {
        !matches!(self, Keyword::Returns)
    }
}

/// Single-character punctuation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Punct {
    LeftParen,    // (
    RightParen,   // )
    LeftBrace,    // {
    RightBrace,   // }
    LeftBracket,  // [
    RightBracket, // ]
    Colon,        // :
    Comma,        // ,
    Dot,          // .
    Slash,        // /
    Star,         // *
    Minus,        // -
    At,           // @
    Equals,       // =
}

impl Punct {
    pub fn from_char(c: char) -> Option<Self> {
        let punct = match c {
            '(' => Punct::LeftParen,
            ')' => Punct::RightParen,
            '{' => Punct::LeftBrace,
            '}' => Punct::RightBrace,
            '[' => Punct::LeftBracket,
            ']' => Punct::RightBracket,
            ':' => Punct::Colon,
            ',' => Punct::Comma,
            '.' => Punct::Dot,
            '/' => Punct::Slash,
            '*' => Punct::Star,
            '-' => Punct::Minus,
            '@' => Punct::At,
            '=' => Punct::Equals,
            _ => return None,
        };
        Some(punct)
    }

    pub fn as_char(&self) -> char {
        match self {
            Punct::LeftParen => '(',
            Punct::RightParen => ')',
            Punct::LeftBrace => '{',
            Punct::RightBrace => '}',
            Punct::LeftBracket => '[',
            Punct::RightBracket => ']',
            Punct::Colon => ':',
            Punct::Comma => ',',
            Punct::Dot => '.',
            Punct::Slash => '/',
            Punct::Star => '*',
            Punct::Minus => '-',
            Punct::At => '@',
            Punct::Equals => '=',
        }
    }
}

/// Token types for the `.api` language.
///
/// Borrowed payloads point into the source text. String and raw string
/// payloads exclude their delimiters; escapes are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token<'src> {
    Keyword(Keyword),
    Identifier(&'src str),
    Number(&'src str),
    String(&'src str),
    /// Backtick string, used for struct field tags.
    RawString(&'src str),
    Punct(Punct),

    LineComment(&'src str),
    BlockComment(&'src str),
    Whitespace,
    Newline,

    /// Text the lexer could not turn into a token. Always paired with a
    /// lexer diagnostic.
    Invalid(&'src str),
}

impl<'src> Token<'src> {
    /// Whitespace, newlines and comments.
    pub fn is_trivia(&self) -> bool {
        matches!(
            self,
            Token::Whitespace | Token::Newline | Token::LineComment(_) | Token::BlockComment(_)
        )
    }

    /// Trivia that does not end the current line.
    pub fn is_inline_trivia(&self) -> bool {
        match self {
            Token::Whitespace | Token::LineComment(_) => true,
            Token::BlockComment(text) => !text.contains('\n'),
            _ => false,
        }
    }

    pub fn is_punct(&self, punct: Punct) -> bool {
        matches!(self, Token::Punct(p) if *p == punct)
    }

    pub fn is_keyword(&self, keyword: Keyword) -> bool {
        matches!(self, Token::Keyword(k) if *k == keyword)
    }

    /// The text of an identifier or keyword.
    pub fn word(&self) -> Option<&'src str> {
        match self {
            Token::Identifier(name) => Some(name),
            Token::Keyword(keyword) => Some(keyword.as_str()),
            _ => None,
        }
    }
}

impl fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Keyword(keyword) => write!(f, "keyword `{}`", keyword.as_str()),
            Token::Identifier(name) => write!(f, "identifier `{name}`"),
            Token::Number(number) => write!(f, "number `{number}`"),
            Token::String(_) => write!(f, "string literal"),
            Token::RawString(_) => write!(f, "tag"),
            Token::Punct(punct) => write!(f, "`{}`", punct.as_char()),
            Token::LineComment(_) | Token::BlockComment(_) => write!(f, "comment"),
            Token::Whitespace => write!(f, "whitespace"),
            Token::Newline => write!(f, "line break"),
            Token::Invalid(text) => write!(f, "invalid input `{text}`"),
        }
    }
}

/// A token with its byte span in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionedToken<'src> {
    pub token: Token<'src>,
    pub span: Span,
}

impl<'src> PositionedToken<'src> {
    pub fn new(token: Token<'src>, span: Span) -> Self {
        Self { token, span }
    }
}

impl<'src> std::ops::Deref for PositionedToken<'src> {
    type Target = Token<'src>;

    fn deref(&self) -> &Self::Target {
        &self.token
    }
}
