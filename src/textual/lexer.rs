use logos::Logos;

#[derive(Logos, Debug, PartialEq, Clone)]
pub enum Token {
    #[token(".")]
    Period,

    #[token(",")]
    Comma,

    #[token("(")]
    LParen,

    #[token(")")]
    RParen,

    #[token(":-")]
    ImpliedBy,

    #[token("?-")]
    QueryStart,

    /// A run of operator characters written between two terms, e.g. `=` or `!=`. `:-` and `?-`
    /// keep their own tokens.
    #[regex(r"[+\-?:!=]+")]
    InfixOp,

    /// The only alphabetic infix operator.
    #[token("is")]
    Is,

    #[regex("[a-z][a-zA-Z_0-9]*")]
    Symbol,

    /// An atom that is not a plain identifier, e.g. `'Hello world'`. The quotes are part of the
    /// slice.
    #[regex(r"'[^'\n\r]*'")]
    Quoted,

    #[regex("[A-Z][a-zA-Z_0-9]*")]
    Variable,

    /// NOTE: each wild-card will be a different variable, even when the name is the same.
    #[regex("_[a-zA-Z_0-9]*")]
    Wildcard,

    /// Integer literals that don't fit into an `i64` are rejected as unrecognized input.
    #[regex("-?[0-9]+", |lex| lex.slice().parse().ok())]
    Int(i64),

    #[regex(r"%[^\n]*", logos::skip)]
    LineComment,

    #[regex(r"/\*([^*]|\*+[^*/])*\*+/", logos::skip)]
    BlockComment,

    #[regex(r"[ \t\r\n\f]+", logos::skip)]
    Whitespace,
}
