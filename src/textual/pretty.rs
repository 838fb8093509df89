use std::fmt::{self, Write};

use crate::ast::{AppTerm, Query, Rule, Slot, Sym, Term, VarScope};
use crate::universe::SymbolStore;

/// A pretty-printer for terms using the Prolog-like syntax of the
/// [TextualUniverse](super::TextualUniverse).
pub struct Prettifier<'u> {
    symbols: &'u SymbolStore,
}

impl<'a> Prettifier<'a> {
    pub fn new(symbols: &'a SymbolStore) -> Self {
        Self { symbols }
    }

    pub fn query_to_string(&self, query: &Query) -> String {
        let mut out = String::new();
        self.pretty_query(&mut out, query).unwrap();
        out
    }

    pub fn rule_to_string(&self, rule: &Rule) -> String {
        let mut out = String::new();
        self.pretty_rule(&mut out, rule).unwrap();
        out
    }

    /// Print a term, using the names from `scope` for its variables where available.
    pub fn term_to_string(&self, term: &Term, scope: Option<&VarScope>) -> String {
        let mut out = String::new();
        self.pretty(&mut out, term, scope).unwrap();
        out
    }

    pub fn pretty<W: Write>(
        &self,
        writer: &mut W,
        term: &Term,
        scope: Option<&VarScope>,
    ) -> fmt::Result {
        match term {
            Term::Atom(sym) => self.pretty_sym(writer, *sym),
            Term::Int(i) => write!(writer, "{}", i),
            Term::Local(slot) => self.pretty_var(writer, *slot, scope),
            Term::Struct(app) => self.pretty_app(writer, app, scope),
        }
    }

    fn pretty_var<W: Write>(
        &self,
        writer: &mut W,
        slot: Slot,
        scope: Option<&VarScope>,
    ) -> fmt::Result {
        match scope.and_then(|scope| scope.get_name(slot)) {
            Some(name) => write!(writer, "{}", name),
            None => write!(writer, "_{}", slot.ord()),
        }
    }

    /// Print a symbol, quoting it unless it reads back as a plain atom.
    pub fn pretty_sym<W: Write>(&self, writer: &mut W, sym: Sym) -> fmt::Result {
        match self.symbols.get_symbol_name(sym) {
            Some(name) if is_plain_atom(name) => write!(writer, "{}", name),
            Some(name) => write!(writer, "'{}'", name),
            None => write!(writer, "<unk:{}>", sym.ord()),
        }
    }

    pub fn pretty_app<W: Write>(
        &self,
        writer: &mut W,
        term: &AppTerm,
        scope: Option<&VarScope>,
    ) -> fmt::Result {
        if let [lhs, rhs] = term.args.as_slice() {
            if let Some(op) = self.infix_operator(term.functor) {
                self.pretty(writer, lhs, scope)?;
                write!(writer, " {} ", op)?;
                return self.pretty(writer, rhs, scope);
            }
        }

        self.pretty_sym(writer, term.functor)?;

        if let Some((first, rest)) = term.args.split_first() {
            write!(writer, "(")?;

            self.pretty(writer, first, scope)?;
            for arg in rest {
                write!(writer, ", ")?;
                self.pretty(writer, arg, scope)?;
            }

            write!(writer, ")")?;
        }

        Ok(())
    }

    /// The name of `sym` if binary applications of it are written as `lhs op rhs`.
    fn infix_operator(&self, sym: Sym) -> Option<&'a str> {
        self.symbols
            .get_symbol_name(sym)
            .filter(|name| is_infix_operator(name))
    }

    pub fn pretty_query<W: Write>(&self, writer: &mut W, query: &Query) -> fmt::Result {
        self.pretty_conjunction(writer, &query.goals, Some(&query.scope))
    }

    pub fn pretty_conjunction<W: Write>(
        &self,
        writer: &mut W,
        goals: &[Term],
        scope: Option<&VarScope>,
    ) -> fmt::Result {
        if let Some((first, rest)) = goals.split_first() {
            self.pretty(writer, first, scope)?;
            for goal in rest {
                write!(writer, ", ")?;
                self.pretty(writer, goal, scope)?;
            }
        }
        write!(writer, ".")?;

        Ok(())
    }

    pub fn pretty_rule<W: Write>(&self, writer: &mut W, rule: &Rule) -> fmt::Result {
        let scope = rule.scope.as_ref();
        self.pretty_app(writer, &rule.head, scope)?;
        if rule.body.is_empty() {
            write!(writer, ".")?;
        } else {
            write!(writer, " :- ")?;
            self.pretty_conjunction(writer, &rule.body, scope)?;
        }
        Ok(())
    }
}

fn is_plain_atom(name: &str) -> bool {
    let mut chars = name.chars();
    name != "is"
        && matches!(chars.next(), Some(c) if c.is_ascii_lowercase())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Names that the lexer reads as infix operators.
fn is_infix_operator(name: &str) -> bool {
    name == "is" || (!name.is_empty() && name.chars().all(|c| "+-?:!=".contains(c)))
}
