//! Parser for `.api` source tokens.
//!
//! This module turns the token stream from the [`lexer`](crate::lexer) into
//! the [`syntax`](crate::syntax) tree. Parsing is total: every error is
//! reported as a diagnostic at the offending token, the affected tokens are
//! wrapped in an error node and parsing resumes.
//!
//! Recovery happens at three levels:
//! - top level: skip to the next `syntax`, `info`, `import`, `type`,
//!   `service` or `@`
//! - struct and service bodies: skip to the end of the current line
//! - a missing `}` closes the body at the next declaration or at the end of
//!   input
//!
//! The public entry point is [`parse_file`].

use log::trace;
use winnow::{
    Parser as _,
    combinator::repeat,
    error::{AddContext, ContextError, ErrMode, ModalResult},
    stream::{Stream, TokenSlice},
    token::any,
};

use crate::{
    error::{Diagnostic, DiagnosticCollector, ErrorCode},
    span::{Span, Spanned},
    syntax::{
        Annotation, AnnotationBody, AnnotationValue, EmbeddedDef, ErrorNode, FieldDef, File,
        ImportDecl, InfoDecl, Item, KeyValue, Member, RouteDef, ServiceDecl, ServiceMember,
        StructDef, SyntaxDecl, TypeDecl, TypeEntry, TypeExpr, ValueItem,
    },
    tokens::{Keyword, PositionedToken, Punct, Token},
};

/// Context attached to parser errors
#[derive(Debug, Clone, PartialEq, Eq)]
enum Context {
    /// What the parser was looking for
    Expected(&'static str),
    /// Remaining token count (`eof_offset()`) at the offending token
    Remaining(usize),
}

type Input<'src> = TokenSlice<'src, PositionedToken<'src>>;
type IResult<O> = ModalResult<O, ContextError<Context>>;

const HTTP_METHODS: [&str; 9] = [
    "get", "head", "post", "put", "patch", "delete", "connect", "options", "trace",
];

/// Returns `true` if `word` names an HTTP method, ignoring ASCII case.
pub fn is_http_method(word: &str) -> bool {
    HTTP_METHODS
        .iter()
        .any(|method| method.eq_ignore_ascii_case(word))
}

/// Build a Cut error pointing at the current token.
fn expected(input: &Input<'_>, label: &'static str) -> ErrMode<ContextError<Context>> {
    let checkpoint = input.checkpoint();
    let e = ContextError::new()
        .add_context(input, &checkpoint, Context::Expected(label))
        .add_context(input, &checkpoint, Context::Remaining(input.eof_offset()));
    ErrMode::Cut(e)
}

fn peek<'src>(input: &mut Input<'src>) -> Option<&'src PositionedToken<'src>> {
    let checkpoint = input.checkpoint();
    let token = input.next_token();
    input.reset(&checkpoint);
    token
}

fn peek_second<'src>(input: &mut Input<'src>) -> Option<&'src PositionedToken<'src>> {
    let checkpoint = input.checkpoint();
    input.next_token();
    let token = input.next_token();
    input.reset(&checkpoint);
    token
}

/// Consume one token matching `f`, or fail with "expected `label`".
fn expect<'src, O>(
    input: &mut Input<'src>,
    label: &'static str,
    f: impl FnMut(&'src PositionedToken<'src>) -> Option<O>,
) -> IResult<O> {
    any.verify_map(f)
        .parse_next(input)
        .map_err(|_: ErrMode<ContextError<Context>>| expected(input, label))
}

/// Parse whitespace, newlines and comments
fn trivia0<'src>(input: &mut Input<'src>) -> IResult<()> {
    repeat(
        0..,
        any.verify(|token: &PositionedToken<'_>| token.is_trivia())
            .void(),
    )
    .parse_next(input)
}

/// Parse trivia that stays on the current line
fn inline_trivia0<'src>(input: &mut Input<'src>) -> IResult<()> {
    repeat(
        0..,
        any.verify(|token: &PositionedToken<'_>| token.is_inline_trivia())
            .void(),
    )
    .parse_next(input)
}

fn punct<'src>(input: &mut Input<'src>, punct: Punct, label: &'static str) -> IResult<Span> {
    expect(input, label, |token| token.is_punct(punct).then_some(token.span))
}

fn keyword<'src>(input: &mut Input<'src>, keyword: Keyword, label: &'static str) -> IResult<Span> {
    expect(input, label, |token| {
        token.is_keyword(keyword).then_some(token.span)
    })
}

/// Identifier or keyword text
fn word<'src>(input: &mut Input<'src>, label: &'static str) -> IResult<Spanned<&'src str>> {
    expect(input, label, |token| {
        token.word().map(|word| Spanned::new(word, token.span))
    })
}

fn identifier<'src>(input: &mut Input<'src>, label: &'static str) -> IResult<Spanned<&'src str>> {
    expect(input, label, |token| match token.token {
        Token::Identifier(name) => Some(Spanned::new(name, token.span)),
        _ => None,
    })
}

fn string_literal<'src>(
    input: &mut Input<'src>,
    label: &'static str,
) -> IResult<Spanned<&'src str>> {
    expect(input, label, |token| match token.token {
        Token::String(text) => Some(Spanned::new(text, token.span)),
        _ => None,
    })
}

fn eat_punct(input: &mut Input<'_>, punct: Punct) -> Option<Span> {
    match peek(input) {
        Some(token) if token.is_punct(punct) => {
            input.next_token();
            Some(token.span)
        }
        _ => None,
    }
}

fn skip_trivia(input: &mut Input<'_>) {
    while peek(input).is_some_and(|token| token.is_trivia()) {
        input.next_token();
    }
}

/// A token that opens a top-level declaration, `@` excluded.
fn is_declaration_keyword(token: &PositionedToken<'_>) -> bool {
    matches!(token.token, Token::Keyword(keyword) if keyword.starts_declaration())
}

/// A token the top-level recovery stops at.
fn starts_declaration(token: &PositionedToken<'_>) -> bool {
    is_declaration_keyword(token) || token.is_punct(Punct::At)
}

fn ends_line(token: &PositionedToken<'_>) -> bool {
    match token.token {
        Token::Newline => true,
        Token::BlockComment(text) => text.contains('\n'),
        _ => token.is_punct(Punct::RightBrace),
    }
}

fn ends_value(token: &PositionedToken<'_>) -> bool {
    ends_line(token)
        || matches!(token.token, Token::LineComment(_))
        || token.is_punct(Punct::Comma)
        || token.is_punct(Punct::RightParen)
}

fn at_line_end(input: &mut Input<'_>) -> bool {
    peek(input).is_none_or(ends_line)
}

fn end_of_line(input: &mut Input<'_>) -> IResult<()> {
    inline_trivia0(input)?;
    if at_line_end(input) {
        Ok(())
    } else {
        Err(expected(input, "end of line"))
    }
}

/// Recursive descent over the token slice with error recovery.
struct Parser<'src> {
    source: &'src str,
    tokens: &'src [PositionedToken<'src>],
    diagnostics: DiagnosticCollector,
}

impl<'src> Parser<'src> {
    fn new(source: &'src str, tokens: &'src [PositionedToken<'src>]) -> Self {
        Self {
            source,
            tokens,
            diagnostics: DiagnosticCollector::new(),
        }
    }

    /// Index of the next token in `tokens`.
    fn index(&self, input: &Input<'src>) -> usize {
        self.tokens.len() - input.eof_offset()
    }

    fn text(&self, span: Span) -> &'src str {
        self.source.get(span.range()).unwrap_or_default()
    }

    /// Span from the first to the last non-trivia token in `start..end`.
    fn span_of(&self, start: usize, end: usize) -> Span {
        let slice = &self.tokens[start..end];
        let first = slice.iter().find(|token| !token.is_trivia());
        let last = slice.iter().rev().find(|token| !token.is_trivia());
        match (first, last) {
            (Some(first), Some(last)) => first.span.union(last.span),
            _ => {
                let offset = self
                    .tokens
                    .get(start)
                    .map_or(self.source.len(), |token| token.span.start());
                Span::empty(offset)
            }
        }
    }

    fn error_node(&self, start: usize, end: usize) -> ErrorNode {
        let span = self.span_of(start, end);
        ErrorNode {
            text: self.text(span).to_string(),
            span,
        }
    }

    /// Turn a parser error into a diagnostic at the offending token.
    fn report(&mut self, err: ErrMode<ContextError<Context>>, input: &Input<'src>) {
        let (label, remaining) = match &err {
            ErrMode::Backtrack(e) | ErrMode::Cut(e) => (
                e.context().find_map(|ctx| match ctx {
                    Context::Expected(label) => Some(*label),
                    Context::Remaining(_) => None,
                }),
                e.context().find_map(|ctx| match ctx {
                    Context::Remaining(n) => Some(*n),
                    Context::Expected(_) => None,
                }),
            ),
            ErrMode::Incomplete(_) => (None, None),
        };
        let label = label.unwrap_or("declaration");
        let index = self.tokens.len() - remaining.unwrap_or_else(|| input.eof_offset());

        let diagnostic = match self.tokens.get(index) {
            // Already reported by the lexer
            Some(PositionedToken {
                token: Token::Invalid(_),
                ..
            }) => return,
            Some(token) => Diagnostic::error(format!("expected {label}, found {}", token.token))
                .with_code(ErrorCode::E100)
                .with_label(token.span, format!("expected {label}")),
            None => Diagnostic::error(format!("expected {label}, found end of input"))
                .with_code(ErrorCode::E101)
                .with_label(Span::empty(self.source.len()), "input ends here"),
        };
        trace!(diagnostic:% = diagnostic; "Parser error");
        self.diagnostics.emit(diagnostic);
    }

    fn unclosed(&mut self, open: Span, delimiter: char, closer: char) {
        self.diagnostics.emit(
            Diagnostic::error(format!("unclosed `{delimiter}`"))
                .with_code(ErrorCode::E101)
                .with_label(open, format!("this `{delimiter}` is never closed"))
                .with_help(format!("add `{closer}`")),
        );
    }

    /// Skip to the next declaration start, consuming at least one token
    /// overall.
    fn recover_declaration(&mut self, input: &mut Input<'src>, start: usize) {
        if self.index(input) == start {
            input.next_token();
        }
        while peek(input).is_some_and(|token| !starts_declaration(token)) {
            input.next_token();
        }
    }

    /// Skip past the end of the current line, stopping before `closer`.
    fn recover_line(&mut self, input: &mut Input<'src>, start: usize, closer: Punct) {
        if self.index(input) == start {
            input.next_token();
        }
        while let Some(token) = peek(input) {
            if token.is_punct(closer) {
                break;
            }
            input.next_token();
            if matches!(token.token, Token::Newline) {
                break;
            }
        }
    }

    fn file(&mut self, input: &mut Input<'src>) -> File {
        let mut items = Vec::new();
        loop {
            skip_trivia(input);
            if input.eof_offset() == 0 {
                break;
            }
            let start = self.index(input);
            match self.item(input) {
                Ok(item) => items.push(item),
                Err(err) => {
                    self.report(err, input);
                    self.recover_declaration(input, start);
                    items.push(Item::Error(self.error_node(start, self.index(input))));
                }
            }
        }

        File {
            items,
            span: Span::new(0..self.source.len()),
        }
    }

    fn item(&mut self, input: &mut Input<'src>) -> IResult<Item> {
        let Some(token) = peek(input) else {
            return Err(expected(input, "declaration"));
        };
        match token.token {
            Token::Keyword(Keyword::Syntax) => self.syntax_decl(input).map(Item::Syntax),
            Token::Keyword(Keyword::Info) => self.info_decl(input).map(Item::Info),
            Token::Keyword(Keyword::Import) => self.import_decl(input).map(Item::Import),
            Token::Keyword(Keyword::Type) => self.type_decl(input).map(Item::Types),
            Token::Keyword(Keyword::Service) | Token::Punct(Punct::At) => {
                self.service_decl(input).map(Item::Service)
            }
            _ => Err(expected(input, "declaration")),
        }
    }

    /// `syntax = "v1"`
    fn syntax_decl(&mut self, input: &mut Input<'src>) -> IResult<SyntaxDecl> {
        let start = keyword(input, Keyword::Syntax, "`syntax`")?;
        trivia0(input)?;
        punct(input, Punct::Equals, "`=`")?;
        trivia0(input)?;
        let version = string_literal(input, "version string")?;
        Ok(SyntaxDecl {
            span: start.union(version.span()),
            version: version.map(|v| v.to_string()),
        })
    }

    /// `info ( key: value ... )`
    fn info_decl(&mut self, input: &mut Input<'src>) -> IResult<InfoDecl> {
        let start = keyword(input, Keyword::Info, "`info`")?;
        trivia0(input)?;
        punct(input, Punct::LeftParen, "`(`")?;
        let (entries, close) = self.key_values(input)?;
        Ok(InfoDecl {
            entries,
            span: start.union(close),
        })
    }

    /// `import "a.api"` or `import ( "a.api" ... )`
    fn import_decl(&mut self, input: &mut Input<'src>) -> IResult<ImportDecl> {
        let start = keyword(input, Keyword::Import, "`import`")?;
        trivia0(input)?;

        if eat_punct(input, Punct::LeftParen).is_none() {
            let path = string_literal(input, "import path")?;
            return Ok(ImportDecl {
                span: start.union(path.span()),
                paths: vec![path.map(|p| p.to_string())],
            });
        }

        let mut paths = Vec::new();
        loop {
            trivia0(input)?;
            if let Some(close) = eat_punct(input, Punct::RightParen) {
                return Ok(ImportDecl {
                    paths,
                    span: start.union(close),
                });
            }
            let path = string_literal(input, "import path or `)`")?;
            paths.push(path.map(|p| p.to_string()));
        }
    }

    /// `type Name struct? { ... }` or `type ( ... )`
    fn type_decl(&mut self, input: &mut Input<'src>) -> IResult<TypeDecl> {
        let start = keyword(input, Keyword::Type, "`type`")?;
        trivia0(input)?;

        let Some(open) = eat_punct(input, Punct::LeftParen) else {
            let def = self.struct_def(input)?;
            return Ok(TypeDecl {
                span: start.union(def.span),
                entries: vec![TypeEntry::Struct(def)],
            });
        };

        let mut entries = Vec::new();
        let mut end = open;
        loop {
            skip_trivia(input);
            match peek(input) {
                Some(token) if token.is_punct(Punct::RightParen) => {
                    input.next_token();
                    end = token.span;
                    break;
                }
                Some(token) if !starts_declaration(token) => {}
                _ => {
                    self.unclosed(open, '(', ')');
                    break;
                }
            }

            let entry_start = self.index(input);
            match self.struct_def(input) {
                Ok(def) => {
                    end = def.span;
                    entries.push(TypeEntry::Struct(def));
                }
                Err(err) => {
                    self.report(err, input);
                    self.recover_line(input, entry_start, Punct::RightParen);
                    let node = self.error_node(entry_start, self.index(input));
                    end = node.span;
                    entries.push(TypeEntry::Error(node));
                }
            }
        }

        Ok(TypeDecl {
            entries,
            span: start.union(end),
        })
    }

    fn struct_def(&mut self, input: &mut Input<'src>) -> IResult<StructDef> {
        let name = identifier(input, "struct name")?;
        inline_trivia0(input)?;
        if peek(input).is_some_and(|token| matches!(token.token, Token::Identifier("struct"))) {
            input.next_token();
            inline_trivia0(input)?;
        }
        let open = punct(input, Punct::LeftBrace, "`{`")?;
        let (members, end) = self.struct_body(input, open);

        Ok(StructDef {
            span: name.span().union(end),
            name: name.map(|n| n.to_string()),
            members,
        })
    }

    /// Members up to the closing `}`. Returns the members and the span of
    /// the last token that belongs to the struct.
    fn struct_body(&mut self, input: &mut Input<'src>, open: Span) -> (Vec<Member>, Span) {
        let mut members = Vec::new();
        let mut end = open;
        loop {
            skip_trivia(input);
            match peek(input) {
                Some(token) if token.is_punct(Punct::RightBrace) => {
                    input.next_token();
                    return (members, token.span);
                }
                Some(token) if !starts_declaration(token) => {}
                _ => {
                    self.unclosed(open, '{', '}');
                    return (members, end);
                }
            }

            let start = self.index(input);
            match self.member(input) {
                Ok(member) => {
                    end = member.span();
                    members.push(member);
                }
                Err(err) => {
                    self.report(err, input);
                    self.recover_line(input, start, Punct::RightBrace);
                    let node = self.error_node(start, self.index(input));
                    end = node.span;
                    members.push(Member::Error(node));
                }
            }
        }
    }

    /// One struct member line: a field or an embedded type.
    fn member(&mut self, input: &mut Input<'src>) -> IResult<Member> {
        if let Some(star) = eat_punct(input, Punct::Star) {
            let name = self.qualified_name(input)?;
            end_of_line(input)?;
            return Ok(Member::Embedded(EmbeddedDef {
                pointer: true,
                span: star.union(name.span()),
                name,
            }));
        }

        let name = self.qualified_name(input)?;
        inline_trivia0(input)?;
        if at_line_end(input) {
            return Ok(Member::Embedded(EmbeddedDef {
                pointer: false,
                span: name.span(),
                name,
            }));
        }
        if name.contains('.') {
            return Err(expected(input, "end of line"));
        }

        let ty = self.type_expr(input)?;
        inline_trivia0(input)?;
        let tag = match peek(input) {
            Some(PositionedToken {
                token: Token::RawString(tag),
                span,
            }) => {
                input.next_token();
                Some(Spanned::new(tag.to_string(), *span))
            }
            _ => None,
        };
        end_of_line(input)?;

        let end = tag.as_ref().map_or(ty.span(), |tag| tag.span());
        Ok(Member::Field(FieldDef {
            span: name.span().union(end),
            name,
            ty,
            tag,
        }))
    }

    /// `Name` or `pkg.Name`, written without spaces.
    fn qualified_name(&mut self, input: &mut Input<'src>) -> IResult<Spanned<String>> {
        let first = identifier(input, "type name")?;
        let mut span = first.span();
        loop {
            let checkpoint = input.checkpoint();
            let dot = input.next_token();
            let next = input.next_token();
            match (dot, next) {
                (Some(dot), Some(next))
                    if dot.is_punct(Punct::Dot)
                        && dot.span.start() == span.end()
                        && matches!(next.token, Token::Identifier(_))
                        && next.span.start() == dot.span.end() =>
                {
                    span = span.union(next.span);
                }
                _ => {
                    input.reset(&checkpoint);
                    break;
                }
            }
        }
        Ok(Spanned::new(self.text(span).to_string(), span))
    }

    fn type_expr(&mut self, input: &mut Input<'src>) -> IResult<TypeExpr> {
        let Some(token) = peek(input) else {
            return Err(expected(input, "type"));
        };

        match token.token {
            Token::Punct(Punct::Star) => {
                input.next_token();
                let inner = self.type_expr(input)?;
                Ok(TypeExpr::Pointer {
                    span: token.span.union(inner.span()),
                    inner: Box::new(inner),
                })
            }
            Token::Punct(Punct::LeftBracket) => {
                input.next_token();
                let len = match peek(input) {
                    Some(PositionedToken {
                        token: Token::Number(len),
                        span,
                    }) => {
                        input.next_token();
                        Some(Spanned::new(len.to_string(), *span))
                    }
                    _ => None,
                };
                punct(input, Punct::RightBracket, "`]`")?;
                let elem = self.type_expr(input)?;
                Ok(TypeExpr::Slice {
                    span: token.span.union(elem.span()),
                    len,
                    elem: Box::new(elem),
                })
            }
            Token::Identifier("map")
                if peek_second(input).is_some_and(|next| next.is_punct(Punct::LeftBracket)) =>
            {
                input.next_token();
                punct(input, Punct::LeftBracket, "`[`")?;
                let key = self.type_expr(input)?;
                punct(input, Punct::RightBracket, "`]`")?;
                let value = self.type_expr(input)?;
                Ok(TypeExpr::Map {
                    span: token.span.union(value.span()),
                    key: Box::new(key),
                    value: Box::new(value),
                })
            }
            Token::Identifier("interface")
                if peek_second(input).is_some_and(|next| next.is_punct(Punct::LeftBrace)) =>
            {
                input.next_token();
                punct(input, Punct::LeftBrace, "`{`")?;
                inline_trivia0(input)?;
                let close = punct(input, Punct::RightBrace, "`}`")?;
                Ok(TypeExpr::Interface(token.span.union(close)))
            }
            Token::Identifier(_) => self.qualified_name(input).map(TypeExpr::Named),
            _ => Err(expected(input, "type")),
        }
    }

    /// `@server(...)* service name { routes }`
    fn service_decl(&mut self, input: &mut Input<'src>) -> IResult<ServiceDecl> {
        let mut annotations = Vec::new();
        while peek(input).is_some_and(|token| token.is_punct(Punct::At)) {
            annotations.push(self.annotation(input)?);
            trivia0(input)?;
        }

        let start = keyword(input, Keyword::Service, "`service`")?;
        inline_trivia0(input)?;
        let name = self.service_name(input)?;
        trivia0(input)?;
        let open = punct(input, Punct::LeftBrace, "`{`")?;
        let (routes, end) = self.service_body(input, open);

        let start = annotations.first().map_or(start, |annotation| annotation.span);
        Ok(ServiceDecl {
            annotations,
            name,
            routes,
            span: start.union(end),
        })
    }

    /// A compound service name such as `user-api`, written without spaces.
    fn service_name(&mut self, input: &mut Input<'src>) -> IResult<Spanned<String>> {
        let first = word(input, "service name")?;
        let mut span = first.span();
        while let Some(token) = peek(input) {
            let continues = token.span.start() == span.end()
                && (token.word().is_some()
                    || matches!(token.token, Token::Number(_))
                    || token.is_punct(Punct::Minus)
                    || token.is_punct(Punct::Dot));
            if !continues {
                break;
            }
            input.next_token();
            span = span.union(token.span);
        }
        Ok(Spanned::new(self.text(span).to_string(), span))
    }

    fn service_body(&mut self, input: &mut Input<'src>, open: Span) -> (Vec<ServiceMember>, Span) {
        let mut routes = Vec::new();
        let mut end = open;
        loop {
            skip_trivia(input);
            match peek(input) {
                Some(token) if token.is_punct(Punct::RightBrace) => {
                    input.next_token();
                    return (routes, token.span);
                }
                Some(token)
                    if !is_declaration_keyword(token) && !self.at_annotated_service(input) => {}
                _ => {
                    self.unclosed(open, '{', '}');
                    return (routes, end);
                }
            }

            let start = self.index(input);
            match self.route(input) {
                Ok(route) => {
                    end = route.span;
                    routes.push(ServiceMember::Route(route));
                }
                Err(err) => {
                    self.report(err, input);
                    self.recover_line(input, start, Punct::RightBrace);
                    let node = self.error_node(start, self.index(input));
                    end = node.span;
                    routes.push(ServiceMember::Error(node));
                }
            }
        }
    }

    /// `true` when the input holds annotations followed by `service`, the
    /// start of the next service rather than a route. Consumes nothing.
    fn at_annotated_service(&mut self, input: &mut Input<'src>) -> bool {
        let checkpoint = input.checkpoint();
        let mut found = false;
        while peek(input).is_some_and(|token| token.is_punct(Punct::At)) {
            if self.annotation(input).is_err() || trivia0(input).is_err() {
                break;
            }
            if peek(input).is_some_and(|token| token.is_keyword(Keyword::Service)) {
                found = true;
                break;
            }
        }
        input.reset(&checkpoint);
        found
    }

    /// `@annotation* METHOD /path (Request)? (returns (Response))?`
    fn route(&mut self, input: &mut Input<'src>) -> IResult<RouteDef> {
        let mut annotations = Vec::new();
        while peek(input).is_some_and(|token| token.is_punct(Punct::At)) {
            annotations.push(self.annotation(input)?);
            trivia0(input)?;
        }

        let method = expect(input, "HTTP method", |token| match token.token {
            Token::Identifier(word) if is_http_method(word) => {
                Some(Spanned::new(word.to_string(), token.span))
            }
            _ => None,
        })?;
        inline_trivia0(input)?;
        let path = self.route_path(input)?;
        let mut end = path.span();
        inline_trivia0(input)?;

        let request = match eat_punct(input, Punct::LeftParen) {
            Some(_) => {
                let (ty, close) = self.parenthesized_type(input)?;
                end = close;
                inline_trivia0(input)?;
                Some(ty)
            }
            None => None,
        };

        let response = match peek(input) {
            Some(token) if token.is_keyword(Keyword::Returns) => {
                input.next_token();
                inline_trivia0(input)?;
                punct(input, Punct::LeftParen, "`(`")?;
                let (ty, close) = self.parenthesized_type(input)?;
                end = close;
                Some(ty)
            }
            _ => None,
        };
        end_of_line(input)?;

        let start = annotations
            .first()
            .map_or(method.span(), |annotation| annotation.span);
        Ok(RouteDef {
            annotations,
            method,
            path,
            request,
            response,
            span: start.union(end),
        })
    }

    /// The type and closing `)` after an already consumed `(`.
    fn parenthesized_type(&mut self, input: &mut Input<'src>) -> IResult<(TypeExpr, Span)> {
        inline_trivia0(input)?;
        let ty = self.type_expr(input)?;
        inline_trivia0(input)?;
        let close = punct(input, Punct::RightParen, "`)`")?;
        Ok((ty, close))
    }

    /// `/segment/:param`, a run of adjacent tokens starting with `/`.
    fn route_path(&mut self, input: &mut Input<'src>) -> IResult<Spanned<String>> {
        let mut span = punct(input, Punct::Slash, "route path")?;
        while let Some(token) = peek(input) {
            let continues = token.span.start() == span.end()
                && !token.is_trivia()
                && !matches!(
                    token.token,
                    Token::Punct(
                        Punct::LeftParen | Punct::RightParen | Punct::LeftBrace | Punct::RightBrace
                    ) | Token::String(_)
                        | Token::RawString(_)
                        | Token::Invalid(_)
                );
            if !continues {
                break;
            }
            input.next_token();
            span = span.union(token.span);
        }
        Ok(Spanned::new(self.text(span).to_string(), span))
    }

    /// `@name`, `@name value` or `@name ( key: value ... )`
    fn annotation(&mut self, input: &mut Input<'src>) -> IResult<Annotation> {
        let at = punct(input, Punct::At, "`@`")?;
        let name = word(input, "annotation name")?;
        let name = name.map(|n| n.to_string());

        let checkpoint = input.checkpoint();
        inline_trivia0(input)?;
        match peek(input) {
            Some(token) if token.is_punct(Punct::LeftParen) => {
                input.next_token();
                let (entries, close) = self.key_values(input)?;
                Ok(Annotation {
                    span: at.union(close),
                    name,
                    body: AnnotationBody::Block(entries),
                })
            }
            Some(token) if !ends_line(token) => {
                let value = self.annotation_value(input)?;
                let span = if value.items.is_empty() {
                    at.union(name.span())
                } else {
                    at.union(value.span)
                };
                Ok(Annotation {
                    span,
                    name,
                    body: AnnotationBody::Inline(value),
                })
            }
            _ => {
                input.reset(&checkpoint);
                Ok(Annotation {
                    span: at.union(name.span()),
                    name,
                    body: AnnotationBody::Empty,
                })
            }
        }
    }

    /// `key: value` pairs up to and including the closing `)`.
    fn key_values(&mut self, input: &mut Input<'src>) -> IResult<(Vec<KeyValue>, Span)> {
        let mut entries = Vec::new();
        loop {
            trivia0(input)?;
            match peek(input) {
                Some(token) if token.is_punct(Punct::RightParen) => {
                    input.next_token();
                    return Ok((entries, token.span));
                }
                Some(token) if !is_declaration_keyword(token) => {
                    entries.push(self.key_value(input)?);
                }
                _ => return Err(expected(input, "`)`")),
            }
        }
    }

    fn key_value(&mut self, input: &mut Input<'src>) -> IResult<KeyValue> {
        let key = word(input, "key")?;
        inline_trivia0(input)?;
        let colon = punct(input, Punct::Colon, "`:`")?;
        let value = self.annotation_value(input)?;

        let end = if value.items.is_empty() {
            colon
        } else {
            value.span
        };
        Ok(KeyValue {
            span: key.span().union(end),
            key: key.map(|k| k.to_string()),
            value,
        })
    }

    /// `item (, item)*` on the current line.
    fn annotation_value(&mut self, input: &mut Input<'src>) -> IResult<AnnotationValue> {
        let mut items: Vec<Spanned<ValueItem>> = Vec::new();
        loop {
            inline_trivia0(input)?;
            let Some(item) = self.value_item(input) else {
                break;
            };
            items.push(item);
            inline_trivia0(input)?;
            if eat_punct(input, Punct::Comma).is_none() {
                break;
            }
        }

        let span = match (items.first(), items.last()) {
            (Some(first), Some(last)) => first.span().union(last.span()),
            _ => Span::empty(
                peek(input).map_or(self.source.len(), |token| token.span.start()),
            ),
        };
        Ok(AnnotationValue { items, span })
    }

    fn value_item(&mut self, input: &mut Input<'src>) -> Option<Spanned<ValueItem>> {
        let token = peek(input)?;
        if let Token::String(text) = token.token {
            input.next_token();
            return Some(Spanned::new(ValueItem::Quoted(text.to_string()), token.span));
        }

        let start = self.index(input);
        while peek(input).is_some_and(|token| !ends_value(token)) {
            input.next_token();
        }
        let end = self.index(input);
        if start == end {
            return None;
        }
        let span = self.span_of(start, end);
        Some(Spanned::new(
            ValueItem::Bare(self.text(span).to_string()),
            span,
        ))
    }
}

/// Parse a token stream into a syntax tree.
///
/// Never fails: syntax errors are returned as diagnostics next to a tree
/// that contains error nodes where recovery happened.
pub fn parse_file<'src>(
    source: &'src str,
    tokens: &'src [PositionedToken<'src>],
) -> (File, Vec<Diagnostic>) {
    let mut parser = Parser::new(source, tokens);
    let mut input = TokenSlice::new(tokens);
    let file = parser.file(&mut input);
    trace!(
        items = file.items.len(),
        diagnostics = parser.diagnostics.len(),
        has_errors = parser.diagnostics.has_errors();
        "Parsed syntax tree"
    );
    (file, parser.diagnostics.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    fn parse(source: &str) -> (File, Vec<Diagnostic>) {
        let lexed = tokenize(source);
        parse_file(source, &lexed.tokens)
    }

    fn parse_ok(source: &str) -> File {
        let (file, diagnostics) = parse(source);
        assert!(diagnostics.is_empty(), "unexpected diagnostics: {diagnostics:?}");
        file
    }

    fn single_struct(file: &File) -> &StructDef {
        match &file.items[0] {
            Item::Types(TypeDecl { entries, .. }) => match &entries[0] {
                TypeEntry::Struct(def) => def,
                other => panic!("expected struct, got {other:?}"),
            },
            other => panic!("expected type declaration, got {other:?}"),
        }
    }

    fn single_service(file: &File) -> &ServiceDecl {
        file.items
            .iter()
            .find_map(|item| match item {
                Item::Service(service) => Some(service),
                _ => None,
            })
            .expect("service declaration")
    }

    #[test]
    fn test_syntax_and_imports() {
        let file = parse_ok("syntax = \"v1\"\nimport \"base.api\"\nimport (\n  \"a.api\"\n  \"b.api\"\n)\n");
        assert_eq!(file.items.len(), 3);
        match &file.items[0] {
            Item::Syntax(decl) => assert_eq!(decl.version.inner(), "v1"),
            other => panic!("unexpected {other:?}"),
        }
        match &file.items[2] {
            Item::Import(decl) => {
                let paths: Vec<_> = decl.paths.iter().map(|p| p.inner().as_str()).collect();
                assert_eq!(paths, ["a.api", "b.api"]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_info_block() {
        let file = parse_ok("info (\n  title: \"demo\"\n  author: jane doe\n)\n");
        let Item::Info(info) = &file.items[0] else {
            panic!("expected info");
        };
        assert_eq!(info.entries.len(), 2);
        assert_eq!(info.entries[0].key.inner(), "title");
        assert_eq!(
            info.entries[1].value.items[0].inner(),
            &ValueItem::Bare("jane doe".to_string())
        );
    }

    #[test]
    fn test_struct_members() {
        let source = "type User struct {\n  Name string `json:\"name\"`\n  Tags []string\n  Meta map[string]*Meta\n  Any interface{}\n  Base\n  *base.Model\n}\n";
        let file = parse_ok(source);
        let user = single_struct(&file);
        assert_eq!(user.name.inner(), "User");
        assert_eq!(user.members.len(), 6);

        let Member::Field(name) = &user.members[0] else {
            panic!("expected field");
        };
        assert_eq!(name.tag.as_ref().map(|t| t.inner().as_str()), Some("json:\"name\""));
        assert!(matches!(&user.members[1], Member::Field(FieldDef { ty: TypeExpr::Slice { .. }, .. })));
        assert!(matches!(&user.members[2], Member::Field(FieldDef { ty: TypeExpr::Map { .. }, .. })));
        assert!(matches!(&user.members[3], Member::Field(FieldDef { ty: TypeExpr::Interface(_), .. })));

        match &user.members[5] {
            Member::Embedded(embedded) => {
                assert!(embedded.pointer);
                assert_eq!(embedded.name.inner(), "base.Model");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(user.span, Span::new(5..source.trim_end().len()));
    }

    #[test]
    fn test_type_group() {
        let file = parse_ok("type (\n  A {}\n  B struct {\n    Id int\n  }\n)\n");
        let Item::Types(decl) = &file.items[0] else {
            panic!("expected types");
        };
        assert_eq!(decl.entries.len(), 2);
    }

    #[test]
    fn test_service_with_routes() {
        let source = "@server(\n  group: user\n  middleware: Auth, Log\n  prefix: /v1\n)\nservice user-api {\n  @doc \"get user\"\n  @handler getUser\n  get /user/:id (GetReq) returns (User)\n\n  @handler ping\n  post /ping\n}\n";
        let file = parse_ok(source);
        let service = single_service(&file);
        assert_eq!(service.name.inner(), "user-api");
        assert_eq!(service.annotations.len(), 1);

        let AnnotationBody::Block(entries) = &service.annotations[0].body else {
            panic!("expected block annotation");
        };
        assert_eq!(entries[1].value.items.len(), 2);
        assert_eq!(entries[2].value.items[0].inner().text(), "/v1");

        assert_eq!(service.routes.len(), 2);
        let ServiceMember::Route(route) = &service.routes[0] else {
            panic!("expected route");
        };
        assert_eq!(route.method.inner(), "get");
        assert_eq!(route.path.inner(), "/user/:id");
        assert_eq!(route.annotations.len(), 2);
        assert!(route.request.is_some());
        assert!(route.response.is_some());

        let ServiceMember::Route(ping) = &service.routes[1] else {
            panic!("expected route");
        };
        assert!(ping.request.is_none());
        assert!(ping.response.is_none());
    }

    #[test]
    fn test_keyword_in_path_segment() {
        let file = parse_ok("service a {\n  @handler info\n  get /service/info returns (Info)\n}\n");
        let ServiceMember::Route(route) = &single_service(&file).routes[0] else {
            panic!("expected route");
        };
        assert_eq!(route.path.inner(), "/service/info");
    }

    #[test]
    fn test_bad_member_recovers_per_line() {
        let (file, diagnostics) = parse("type User {\n  Name string\n  123 oops\n  Id int\n}\n");
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code(), Some(ErrorCode::E100));

        let user = single_struct(&file);
        assert_eq!(user.members.len(), 3);
        match &user.members[1] {
            Member::Error(node) => assert_eq!(node.text, "123 oops"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_missing_brace_closes_at_next_declaration() {
        let (file, diagnostics) = parse("type A {\n  Name string\ntype B {}\n");
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code(), Some(ErrorCode::E101));
        assert_eq!(diagnostics[0].message(), "unclosed `{`");
        assert_eq!(file.items.len(), 2);
    }

    #[test]
    fn test_missing_brace_closes_at_annotated_service() {
        let source = "service a {\n  @handler ping\n  get /ping\n\n@server(group: b)\nservice b {\n  @handler pong\n  get /pong\n}\n";
        let (file, diagnostics) = parse(source);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code(), Some(ErrorCode::E101));

        let services: Vec<_> = file
            .items
            .iter()
            .filter_map(|item| match item {
                Item::Service(service) => Some(service),
                _ => None,
            })
            .collect();
        assert_eq!(services.len(), 2);
        assert_eq!(services[0].routes.len(), 1);
        assert_eq!(services[1].name.inner(), "b");
        assert_eq!(services[1].annotations.len(), 1);
        assert_eq!(services[1].routes.len(), 1);
    }

    #[test]
    fn test_missing_brace_at_end_of_input() {
        let (file, diagnostics) = parse("service a {\n  @handler x\n  get /x\n");
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code(), Some(ErrorCode::E101));
        assert_eq!(single_service(&file).routes.len(), 1);
    }

    #[test]
    fn test_top_level_recovery() {
        let (file, diagnostics) = parse("} garbage\ntype A {}\n");
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message().starts_with("expected declaration"));
        assert_eq!(file.items.len(), 2);
        match &file.items[0] {
            Item::Error(node) => assert_eq!(node.text, "} garbage"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_bad_route_recovers_per_line() {
        let (file, diagnostics) = parse("service a {\n  fetch /x\n  get /y\n}\n");
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message().contains("HTTP method"));
        let service = single_service(&file);
        assert_eq!(service.routes.len(), 2);
        assert!(matches!(service.routes[0], ServiceMember::Error(_)));
    }

    #[test]
    fn test_unexpected_end_of_input() {
        let (_, diagnostics) = parse("syntax =");
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code(), Some(ErrorCode::E101));
        assert!(diagnostics[0].message().ends_with("found end of input"));
    }

    #[test]
    fn test_lexer_errors_are_not_reported_twice() {
        let (_, diagnostics) = parse("syntax = \"v1\n");
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_http_methods() {
        assert!(is_http_method("get"));
        assert!(is_http_method("DELETE"));
        assert!(!is_http_method("fetch"));
    }
}
