//! Lexical analyzer for `.api` source text.
//!
//! The lexer is lossless: every byte of the input belongs to exactly one
//! token, trivia included, so token spans tile the source. Malformed input
//! becomes [`Token::Invalid`] plus a diagnostic and lexing continues.
//!
//! The public entry point is [`tokenize`].

use log::trace;
use winnow::{
    Parser as _,
    ascii::digit1,
    combinator::{alt, opt, preceded, repeat, terminated},
    error::ModalResult,
    stream::{LocatingSlice, Location},
    token::{any, none_of, one_of, rest, take_until, take_while},
};

use crate::{
    error::{Diagnostic, DiagnosticCollector, ErrorCode},
    span::Span,
    tokens::{Keyword, PositionedToken, Punct, Token},
};

type Input<'a> = LocatingSlice<&'a str>;
type IResult<O> = ModalResult<O>;

/// Tokens and lexer diagnostics for one source text.
#[derive(Debug, Clone)]
pub struct Lexed<'src> {
    pub tokens: Vec<PositionedToken<'src>>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Body of a `"` string: anything but quotes and line ends, with `\x`
/// escapes kept verbatim.
fn string_body<'a>(input: &mut Input<'a>) -> IResult<&'a str> {
    repeat(
        0..,
        alt((
            none_of(['"', '\\', '\n', '\r']).void(),
            preceded('\\', none_of(['\n', '\r'])).void(),
        )),
    )
    .map(|()| ())
    .take()
    .parse_next(input)
}

/// Parse a `"` string literal.
///
/// An unterminated literal ends at the line break and becomes an
/// [`Token::Invalid`] token.
fn string_literal<'a>(input: &mut Input<'a>) -> IResult<Token<'a>> {
    let ((content, closing), text) = preceded('"', (string_body, opt('"')))
        .with_taken()
        .parse_next(input)?;

    Ok(match closing {
        Some(_) => Token::String(content),
        None => Token::Invalid(text),
    })
}

/// Parse a backtick string, used for field tags. Single line only.
fn raw_string<'a>(input: &mut Input<'a>) -> IResult<Token<'a>> {
    let ((content, closing), text) = preceded(
        '`',
        (take_while(0.., |c: char| c != '`' && c != '\n'), opt('`')),
    )
    .with_taken()
    .parse_next(input)?;

    Ok(match closing {
        Some(_) => Token::RawString(content),
        None => Token::Invalid(text),
    })
}

/// Parse line comment starting with '//'
fn line_comment<'a>(input: &mut Input<'a>) -> IResult<Token<'a>> {
    preceded("//", take_while(0.., |c| c != '\n'))
        .map(Token::LineComment)
        .parse_next(input)
}

/// Parse a `/* */` comment. Without a closing `*/` it swallows the rest of
/// the input as an invalid token.
fn block_comment<'a>(input: &mut Input<'a>) -> IResult<Token<'a>> {
    let (body, text) = preceded(
        "/*",
        alt((
            terminated(take_until(0.., "*/"), "*/").map(Some),
            rest.map(|_: &str| None),
        )),
    )
    .with_taken()
    .parse_next(input)?;

    Ok(body.map_or(Token::Invalid(text), Token::BlockComment))
}

/// Parse an identifier or keyword.
///
/// Keywords are recognised after the whole word is scanned, so `types` or
/// `serviceName` stay identifiers.
fn word<'a>(input: &mut Input<'a>) -> IResult<Token<'a>> {
    (
        one_of(|c: char| c.is_alphabetic() || c == '_'),
        take_while(0.., |c: char| c.is_alphanumeric() || c == '_'),
    )
        .take()
        .map(|word: &str| Keyword::from_word(word).map_or(Token::Identifier(word), Token::Keyword))
        .parse_next(input)
}

fn number<'a>(input: &mut Input<'a>) -> IResult<Token<'a>> {
    digit1.map(Token::Number).parse_next(input)
}

fn punct<'a>(input: &mut Input<'a>) -> IResult<Token<'a>> {
    any.verify_map(Punct::from_char)
        .map(Token::Punct)
        .parse_next(input)
}

/// Parse whitespace (spaces, tabs, carriage returns but not newlines)
fn whitespace<'a>(input: &mut Input<'a>) -> IResult<Token<'a>> {
    take_while(1.., |c: char| c.is_whitespace() && c != '\n')
        .value(Token::Whitespace)
        .parse_next(input)
}

fn newline<'a>(input: &mut Input<'a>) -> IResult<Token<'a>> {
    '\n'.value(Token::Newline).parse_next(input)
}

/// Any single character no other rule accepts.
fn invalid_char<'a>(input: &mut Input<'a>) -> IResult<Token<'a>> {
    any.take().map(Token::Invalid).parse_next(input)
}

/// Parse a single token with position tracking
fn positioned_token<'a>(input: &mut Input<'a>) -> IResult<PositionedToken<'a>> {
    let start_pos = input.current_token_start();

    let token = alt((
        newline,       // Must come before whitespace
        whitespace,
        line_comment,  // Must come before punctuation '/'
        block_comment, // Must come before punctuation '/'
        string_literal,
        raw_string,
        word,
        number,
        punct,
        invalid_char, // Always matches, keeps the lexer moving
    ))
    .parse_next(input)?;

    let end_pos = input.current_token_start();
    Ok(PositionedToken::new(token, Span::new(start_pos..end_pos)))
}

/// Lexer that accumulates tokens and diagnostics during tokenization.
struct Lexer<'a> {
    tokens: Vec<PositionedToken<'a>>,
    diagnostics: DiagnosticCollector,
}

impl<'a> Lexer<'a> {
    fn new() -> Self {
        Self {
            tokens: Vec::new(),
            diagnostics: DiagnosticCollector::new(),
        }
    }

    fn tokenize(&mut self, mut input: Input<'a>) {
        while !input.is_empty() {
            match positioned_token(&mut input) {
                Ok(token) => {
                    if let Token::Invalid(text) = token.token {
                        self.diagnostics.emit(Self::invalid_token(text, token.span));
                    }
                    self.tokens.push(token);
                }
                // `invalid_char` accepts any character, so this only guards
                // against looping forever.
                Err(_) => break,
            }
        }
    }

    fn finish(self) -> Lexed<'a> {
        Lexed {
            tokens: self.tokens,
            diagnostics: self.diagnostics.finish(),
        }
    }

    /// Describe an invalid token by what it started as.
    fn invalid_token(text: &str, span: Span) -> Diagnostic {
        let (code, message, help) = if text.starts_with('"') {
            (
                ErrorCode::E001,
                "unterminated string literal".to_string(),
                Some("add closing `\"`"),
            )
        } else if text.starts_with('`') {
            (
                ErrorCode::E004,
                "unterminated raw string".to_string(),
                Some("add closing backtick"),
            )
        } else if text.starts_with("/*") {
            (
                ErrorCode::E003,
                "unterminated block comment".to_string(),
                Some("add closing `*/`"),
            )
        } else {
            (
                ErrorCode::E002,
                format!("unexpected character `{}`", text.escape_debug()),
                None,
            )
        };

        let diag = Diagnostic::error(message)
            .with_code(code)
            .with_label(span, code.description());
        match help {
            Some(help) => diag.with_help(help),
            None => diag,
        }
    }
}

/// Split `.api` source into tokens, collecting lexer diagnostics.
///
/// Never fails: problems are reported through [`Lexed::diagnostics`] and the
/// returned tokens still cover the whole input.
pub fn tokenize(input: &str) -> Lexed<'_> {
    let mut lexer = Lexer::new();
    lexer.tokenize(LocatingSlice::new(input));
    let lexed = lexer.finish();
    trace!(
        tokens = lexed.tokens.len(),
        diagnostics = lexed.diagnostics.len();
        "Tokenized source"
    );
    lexed
}
