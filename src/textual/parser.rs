use std::iter::Peekable;

use logos::{Logos, Span, SpannedIter};
use thiserror::Error;

use crate::ast::{AppTerm, Query, Rule, Slot, Sym, Term, VarScope};
use crate::universe::SymbolStore;

use super::lexer::Token;

struct TokenStream<'a> {
    source: &'a str,
    lexer: Peekable<SpannedIter<'a, Token>>,
}

impl<'a> TokenStream<'a> {
    pub fn new(source: &'a str) -> Self {
        let lexer = Token::lexer(source).spanned().peekable();

        Self { source, lexer }
    }

    pub fn next(&mut self) -> Option<(Result<Token, ()>, Span)> {
        self.lexer.next()
    }

    pub fn advance(&mut self) {
        self.lexer.next();
    }

    pub fn peek_token(&mut self) -> Option<Result<Token, ()>> {
        self.lexer.peek().map(|(tok, _)| tok).cloned()
    }

    pub fn peek_span(&mut self) -> Span {
        match self.lexer.peek() {
            Some((_, span)) => span.clone(),
            None => self.eof(),
        }
    }

    pub fn slice(&self, span: Span) -> &'a str {
        &self.source[span]
    }

    pub fn eof(&self) -> Span {
        self.source.len()..self.source.len()
    }

    /// Consume the next item and report it as misplaced.
    pub fn unexpected(&mut self) -> ParseError {
        match self.next() {
            Some((tok, span)) => ParseError::new(span, ParseErrorKind::unexpected(tok)),
            None => ParseError::new(self.eof(), ParseErrorKind::UnexpectedEof),
        }
    }
}

/// A parse error originating from [`Parser`].
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{kind} at {}..{}", .span.start, .span.end)]
pub struct ParseError {
    /// The range in the source text where the error occurred.
    pub span: Span,
    /// The type of error that occurred.
    pub kind: ParseErrorKind,
}

impl ParseError {
    pub fn new(span: Span, kind: ParseErrorKind) -> Self {
        Self { span, kind }
    }

    /// One-based line and column of the start of the error in `source`.
    pub fn line_col(&self, source: &str) -> (usize, usize) {
        let before = &source[..self.span.start.min(source.len())];
        let line = before.matches('\n').count() + 1;
        let col = before.rfind('\n').map_or(before.len(), |nl| before.len() - nl - 1) + 1;
        (line, col)
    }
}

/// The various types of parse errors reported by [`Parser`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseErrorKind {
    /// The parser reached the end of the input, but expected more tokens to follow.
    #[error("unexpected end of input")]
    UnexpectedEof,
    /// The parser encountered a token that doesn't belong in that place.
    #[error("unexpected token {0:?}")]
    UnexpectedToken(Token),
    /// The parser encountered input that could not be recognized as a token.
    #[error("unrecognized input")]
    UnrecognizedToken,
    /// The parser encountered more tokens after the input should have ended.
    #[error("expected end of input")]
    ExpectedEof,
    /// A rule head that is not an application term with at least one argument.
    #[error("rule head must have arguments")]
    InvalidHead,
}

impl ParseErrorKind {
    /// Translate an unexpected item in the token stream (either an unexpected token or a lexer
    /// error) into the matching [`ParseErrorKind`].
    pub fn unexpected(res: Result<Token, ()>) -> Self {
        match res {
            Ok(tok) => Self::UnexpectedToken(tok),
            Err(()) => Self::UnrecognizedToken,
        }
    }
}

/// A top-level element of a program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phrase {
    /// A fact or rule to be added to the database.
    Rule(Rule),
    /// A `?-` query to be answered against the rules preceding it.
    Query(Query),
}

/// A parser for terms using the Prolog-like syntax of the
/// [TextualUniverse](super::TextualUniverse).
pub struct Parser<'u> {
    symbols: &'u mut SymbolStore,
}

impl<'a> Parser<'a> {
    pub fn new(symbols: &'a mut SymbolStore) -> Self {
        Self { symbols }
    }

    // //////////////////////////////// PUBLIC PARSER ////////////////////////////////

    /// Parse a single query. The leading `?-` is optional.
    pub fn parse_query_str(&mut self, query: &str) -> Result<Query, ParseError> {
        let mut tokens = TokenStream::new(query);
        if let Some(Ok(Token::QueryStart)) = tokens.peek_token() {
            tokens.advance();
        }
        let result = self.parse_query(&mut tokens)?;
        self.expect_eof(&mut tokens)?;
        Ok(result)
    }

    pub fn parse_rule_str(&mut self, rule: &str) -> Result<Rule, ParseError> {
        let mut tokens = TokenStream::new(rule);
        let result = self.parse_rule(&mut tokens)?;
        self.expect_eof(&mut tokens)?;
        Ok(result)
    }

    /// Parse zero or more facts and rules.
    pub fn parse_rules_str(&mut self, rules: &str) -> Result<Vec<Rule>, ParseError> {
        let mut tokens = TokenStream::new(rules);
        let mut result = vec![];
        while tokens.peek_token().is_some() {
            result.push(self.parse_rule(&mut tokens)?);
        }
        Ok(result)
    }

    /// Parse a program consisting of facts, rules and `?-` queries in any order.
    pub fn parse_program_str(&mut self, program: &str) -> Result<Vec<Phrase>, ParseError> {
        let mut tokens = TokenStream::new(program);
        let mut result = vec![];
        while let Some(next) = tokens.peek_token() {
            let phrase = if next == Ok(Token::QueryStart) {
                tokens.advance();
                Phrase::Query(self.parse_query(&mut tokens)?)
            } else {
                Phrase::Rule(self.parse_rule(&mut tokens)?)
            };
            result.push(phrase);
        }
        Ok(result)
    }

    // //////////////////////////////// PARSER INTERNALS ////////////////////////////////

    fn parse_query(&mut self, tokens: &mut TokenStream) -> Result<Query, ParseError> {
        let mut scope = VarScope::new();
        let goals = self.parse_conjunction1(tokens, &mut scope)?;
        Ok(Query::new(goals, scope))
    }

    fn parse_rule(&mut self, tokens: &mut TokenStream) -> Result<Rule, ParseError> {
        let mut scope = VarScope::new();
        // `:- head.` is an alternative way of stating a fact
        let directive = tokens.peek_token() == Some(Ok(Token::ImpliedBy));
        if directive {
            tokens.advance();
        }
        // the head must be a structure with at least one argument
        let start = tokens.peek_span();
        let head = match self.parse_term(tokens, &mut scope)? {
            Term::Struct(head) => head,
            _ => return Err(ParseError::new(start, ParseErrorKind::InvalidHead)),
        };
        let body = match tokens.peek_token() {
            Some(Ok(Token::ImpliedBy)) if !directive => {
                tokens.advance();
                self.parse_conjunction1(tokens, &mut scope)?
            }
            Some(Ok(Token::Period)) => {
                tokens.advance();
                Vec::new()
            }
            _ => return Err(tokens.unexpected()),
        };
        Ok(Rule::new(scope.len(), head, body).with_scope(scope))
    }

    fn parse_conjunction1(
        &mut self,
        tokens: &mut TokenStream,
        scope: &mut VarScope,
    ) -> Result<Vec<Term>, ParseError> {
        let mut goals = vec![self.parse_term(tokens, scope)?];
        loop {
            match tokens.peek_token() {
                Some(Ok(Token::Comma)) => {
                    tokens.advance();
                    goals.push(self.parse_term(tokens, scope)?);
                }
                Some(Ok(Token::Period)) => {
                    tokens.advance();
                    break;
                }
                _ => return Err(tokens.unexpected()),
            }
        }
        Ok(goals)
    }

    fn expect_eof(&mut self, tokens: &mut TokenStream) -> Result<(), ParseError> {
        if let Some((_, span)) = tokens.next() {
            Err(ParseError::new(span, ParseErrorKind::ExpectedEof))
        } else {
            Ok(())
        }
    }

    fn expect_token(
        &mut self,
        tokens: &mut TokenStream,
        expected: Token,
    ) -> Result<Span, ParseError> {
        if let Some((actual, span)) = tokens.next() {
            if actual == Ok(expected) {
                Ok(span)
            } else {
                Err(ParseError::new(span, ParseErrorKind::unexpected(actual)))
            }
        } else {
            Err(ParseError::new(tokens.eof(), ParseErrorKind::UnexpectedEof))
        }
    }

    /// Parse a parenthesized argument list, if there is one.
    fn parse_args(
        &mut self,
        tokens: &mut TokenStream,
        scope: &mut VarScope,
    ) -> Result<Option<Vec<Term>>, ParseError> {
        if tokens.peek_token() != Some(Ok(Token::LParen)) {
            return Ok(None);
        }
        tokens.advance();
        let mut args = vec![];
        loop {
            args.push(self.parse_term(tokens, scope)?);
            match tokens.peek_token() {
                Some(Ok(Token::Comma)) => {
                    tokens.advance();
                }
                Some(Ok(Token::RParen)) => {
                    tokens.advance();
                    break;
                }
                _ => return Err(tokens.unexpected()),
            }
        }
        Ok(Some(args))
    }

    /// Parse a term, including chains of infix operators. All operators bind equally and group to
    /// the right: `X is A + B` is read as `is(X, '+'(A, B))`.
    fn parse_term(
        &mut self,
        tokens: &mut TokenStream,
        scope: &mut VarScope,
    ) -> Result<Term, ParseError> {
        let lhs = self.parse_primary(tokens, scope)?;
        match self.parse_infix_op(tokens) {
            Some(op) => {
                let rhs = self.parse_term(tokens, scope)?;
                Ok(Term::Struct(AppTerm::new(op, vec![lhs, rhs])))
            }
            None => Ok(lhs),
        }
    }

    fn parse_infix_op(&mut self, tokens: &mut TokenStream) -> Option<Sym> {
        if !matches!(tokens.peek_token(), Some(Ok(Token::InfixOp | Token::Is))) {
            return None;
        }
        let (_, span) = tokens.next()?;
        Some(self.symbols.get_or_insert_named(tokens.slice(span)))
    }

    fn parse_primary(
        &mut self,
        tokens: &mut TokenStream,
        scope: &mut VarScope,
    ) -> Result<Term, ParseError> {
        match tokens.peek_token() {
            Some(Ok(Token::Variable)) => self.parse_variable(tokens, scope).map(Term::Local),
            Some(Ok(Token::Wildcard)) => {
                tokens.advance();
                Ok(Term::Local(scope.insert_wildcard()))
            }
            Some(Ok(Token::Int(i))) => {
                tokens.advance();
                Ok(Term::Int(i))
            }
            Some(Ok(Token::Symbol | Token::Quoted)) => {
                let name = self.parse_name(tokens)?;
                Ok(match self.parse_args(tokens, scope)? {
                    Some(args) => Term::Struct(AppTerm::new(name, args)),
                    None => Term::Atom(name),
                })
            }
            _ => Err(tokens.unexpected()),
        }
    }

    fn parse_name(&mut self, tokens: &mut TokenStream) -> Result<Sym, ParseError> {
        let name = match tokens.next() {
            Some((Ok(Token::Symbol), span)) => tokens.slice(span),
            Some((Ok(Token::Quoted), span)) => {
                let quoted = tokens.slice(span);
                &quoted[1..quoted.len() - 1]
            }
            Some((other, span)) => {
                return Err(ParseError::new(span, ParseErrorKind::unexpected(other)))
            }
            None => return Err(ParseError::new(tokens.eof(), ParseErrorKind::UnexpectedEof)),
        };
        Ok(self.symbols.get_or_insert_named(name))
    }

    fn parse_variable(
        &mut self,
        tokens: &mut TokenStream,
        scope: &mut VarScope,
    ) -> Result<Slot, ParseError> {
        let span = self.expect_token(tokens, Token::Variable)?;
        let var = scope.get_or_insert(tokens.slice(span));
        Ok(var)
    }
}

#[cfg(test)]
mod test {
    use super::super::pretty;
    use super::*;
    use crate::ast::{app, int, local};

    fn query_roundtrip_test(input: &str) {
        let mut nu = SymbolStore::new();
        let mut p = Parser::new(&mut nu);

        let q = p.parse_query_str(input).unwrap();

        let pretty = pretty::Prettifier::new(&nu);
        let qs = pretty.query_to_string(&q);
        assert_eq!(qs, input);
    }

    #[test]
    fn query_parsing() {
        query_roundtrip_test("grandparent(bob, X).");
        query_roundtrip_test("grandparent(bob, X), female(X).");

        query_roundtrip_test("add(s(s(s(s(z)))), s(s(z)), X).");
        query_roundtrip_test("distance('New York', boston, -12).");
        query_roundtrip_test("X = Y.");
        query_roundtrip_test("N is s(z) + M, N != z.");
    }

    fn rule_roundtrip_test(input: &str) {
        let mut nu = SymbolStore::new();
        let mut p = Parser::new(&mut nu);
        let q = p.parse_rule_str(input).unwrap();

        let pretty = pretty::Prettifier::new(&nu);
        let qs = pretty.rule_to_string(&q);
        assert_eq!(qs, input);
    }

    #[test]
    fn rule_parsing() {
        rule_roundtrip_test("is_natural(z).");
        rule_roundtrip_test("is_natural(s(X)) :- is_natural(X).");
        rule_roundtrip_test("grandparent(X, Y) :- parent(X, Z), parent(Z, Y).");
        rule_roundtrip_test("weather(raining).");
        rule_roundtrip_test("X = X :- true.");
        rule_roundtrip_test("'is'(X) :- X is 'is'.");
    }

    #[test]
    fn variables_are_numbered_by_first_appearance() {
        let mut nu = SymbolStore::new();
        let rule = Parser::new(&mut nu)
            .parse_rule_str("grandparent(X, Y) :- parent(X, Z), parent(Z, Y).")
            .unwrap();
        let parent = nu.get_named("parent").unwrap();
        assert_eq!(rule.locals, 3);
        assert_eq!(rule.head.args, vec![local(0), local(1)]);
        assert_eq!(
            rule.body,
            vec![
                app(parent, vec![local(0), local(2)]),
                app(parent, vec![local(2), local(1)]),
            ]
        );
    }

    #[test]
    fn wildcards_are_always_fresh() {
        let mut nu = SymbolStore::new();
        let query = Parser::new(&mut nu)
            .parse_query_str("p(_, _X, _X, Y).")
            .unwrap();
        let p = nu.get_named("p").unwrap();
        assert_eq!(
            query.goals,
            vec![app(p, vec![local(0), local(1), local(2), local(3)])]
        );
        assert_eq!(query.locals(), 4);
        assert_eq!(query.scope.get_name(Slot::from_ord(3)), Some("Y"));
    }

    #[test]
    fn atoms_and_structures() {
        let mut nu = SymbolStore::new();
        let query = Parser::new(&mut nu)
            .parse_query_str("?- ready, f(g, h(1)).")
            .unwrap();
        let [ready, f, g, h] = ["ready", "f", "g", "h"].map(|n| nu.get_named(n).unwrap());
        assert_eq!(
            query.goals,
            vec![
                Term::Atom(ready),
                app(f, vec![Term::Atom(g), app(h, vec![int(1)])]),
            ]
        );
    }

    #[test]
    fn directive_facts() {
        let mut nu = SymbolStore::new();
        let mut p = Parser::new(&mut nu);
        let directive = p.parse_rule_str(":- likes(mary, wine).").unwrap();
        let plain = p.parse_rule_str("likes(mary, wine).").unwrap();
        assert_eq!(directive, plain);
        assert!(directive.is_fact());

        let err = p.parse_rule_str(":- a(1) :- b.").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::UnexpectedToken(Token::ImpliedBy));
        assert_eq!(err.span, 8..10);
    }

    #[test]
    fn heads_need_arguments() {
        let mut nu = SymbolStore::new();
        let mut p = Parser::new(&mut nu);

        let err = p.parse_rule_str("go :- missing(1).").unwrap_err();
        assert_eq!(err, ParseError::new(0..2, ParseErrorKind::InvalidHead));

        let err = p.parse_rules_str("a(1).\n:- b.").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::InvalidHead);
        assert_eq!(err.line_col("a(1).\n:- b."), (2, 4));

        let err = p.parse_rule_str("7.").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::InvalidHead);

        // bare atoms are still fine as goals
        let rule = p.parse_rule_str("go(X) :- ready, X = 1.").unwrap();
        assert_eq!(rule.body.len(), 2);
    }

    #[test]
    fn infix_operators_build_structures() {
        let mut nu = SymbolStore::new();
        let query = Parser::new(&mut nu)
            .parse_query_str("X is 1 + Y, '='(X, 2).")
            .unwrap();
        let [is, plus, eq] = ["is", "+", "="].map(|n| nu.get_named(n).unwrap());
        assert_eq!(
            query.goals,
            vec![
                app(is, vec![local(0), app(plus, vec![int(1), local(1)])]),
                app(eq, vec![local(0), int(2)]),
            ]
        );

        let err = Parser::new(&mut nu).parse_query_str("X = .").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::UnexpectedToken(Token::Period));
    }

    #[test]
    fn program_parsing() {
        let mut nu = SymbolStore::new();
        let phrases = Parser::new(&mut nu)
            .parse_program_str(
                "
                father(olav, harald).
                ?- father(X, harald).
                son(X, Y) :- father(Y, X).
                ?- son(harald, Y).
                ",
            )
            .unwrap();
        assert_eq!(phrases.len(), 4);
        assert!(matches!(&phrases[0], Phrase::Rule(r) if r.is_fact()));
        assert!(matches!(&phrases[1], Phrase::Query(q) if q.locals() == 1));
        assert!(matches!(&phrases[2], Phrase::Rule(r) if r.locals == 2));
        assert!(matches!(&phrases[3], Phrase::Query(_)));
    }

    #[test]
    fn parse_errors() {
        let mut nu = SymbolStore::new();
        let mut p = Parser::new(&mut nu);

        let err = p.parse_query_str("foo(X").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::UnexpectedEof);
        assert_eq!(err.span, 5..5);

        let err = p.parse_query_str("foo(X). bar.").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::ExpectedEof);

        let err = p.parse_rule_str("foo(X) :- .").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::UnexpectedToken(Token::Period));

        let err = p.parse_rules_str("foo(1).\nbar(#).").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::UnrecognizedToken);
        assert_eq!(err.line_col("foo(1).\nbar(#)."), (2, 5));

        let err = p.parse_rules_str("?- foo.").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::UnexpectedToken(Token::QueryStart));
    }

    #[test]
    fn comment_parsing() {
        let mut nu = SymbolStore::new();
        let mut p = Parser::new(&mut nu);
        let with_comment = p.parse_rule_str("foo(1). % example comment").unwrap();
        let no_comment = p.parse_rule_str("foo(1).").unwrap();
        assert_eq!(with_comment, no_comment);
        let with_comment = p.parse_rule_str("foo(1). % bar(2).").unwrap();
        assert_eq!(with_comment, no_comment);
        let with_comment = p.parse_rule_str("/* bar(2). */ foo(1).").unwrap();
        assert_eq!(with_comment, no_comment);

        let no_comment = p
            .parse_rules_str(
                "foo(1).
    bar(2).",
            )
            .unwrap();
        let with_comment = p
            .parse_rules_str(
                "foo(1). % comment
    bar(2).",
            )
            .unwrap();
        assert_eq!(with_comment, no_comment);
        let with_comment = p
            .parse_rules_str(
                "%comment
    foo(1).
    bar(2).",
            )
            .unwrap();
        assert_eq!(with_comment, no_comment);
    }
}
