//! # A Prolog-like syntax
//!
//! This module provides a textual, Prolog-like syntax for the solver core. See [`TextualUniverse`]
//! for an example.

mod lexer;
mod parser;
mod pretty;

use std::io;

use thiserror::Error;

use crate::{
    ast::{Query, Term},
    solver::{QueryError, Solution, SolverConfig},
    universe::{RuleError, RuleSet, Universe},
};

pub use self::{
    lexer::Token,
    parser::{ParseError, ParseErrorKind, Parser, Phrase},
    pretty::Prettifier,
};

/// Errors that can occur while loading or running a program.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),
    #[error("rejected rule: {0}")]
    Rule(#[from] RuleError),
    #[error(transparent)]
    Query(#[from] QueryError),
    #[error("failed to write answer: {0}")]
    Io(#[from] io::Error),
}

/// A universe that can be interacted with using a Prolog like syntax.
///
/// It builds on the [`Universe`] and additionally provides a fully textual syntax for defining
/// rules and queries, looking very similar to Prolog.
///
/// Syntactic elements:
/// - **Variables**: An identifier starting with a upper case ASCII letter followed by zero or more
///   ASCII letters, digits or underscores, e.g. `X`, `Person`, `FooBar`.
/// - **Wildcards**: An identifier starting with an underscore. Every occurrence denotes a fresh
///   variable, even when the name is repeated.
/// - **Atoms**: An identifier starting with a lower case ASCII letter followed by zero or more
///   ASCII letters, digits or underscores, e.g. `foo`, `rightOf`, `is_natural`. Any other name can
///   be written in single quotes, e.g. `'New York'`.
/// - **Integers**: Optionally negative decimal numbers that fit into 64 bits, e.g. `42` or `-7`.
/// - **Application Terms**: An application of a functor to arguments, e.g. `is_natural(X)` or
///   `add(X, z, Y)`.
/// - **Infix Operators**: Runs of the characters `+ - ? : ! =`, and the word `is`, written between
///   two terms. `X = f(Y)` is the application term `'='(X, f(Y))`. Operators group to the right.
/// - **Facts**: An application term followed by a dot, e.g. `is_natural(z).`. The form
///   `:- is_natural(z).` is accepted as well. Facts must not contain variables.
/// - **Rules**: An application term followed by `:-` (a reverse implication arrow) and a comma
///   separated list of one or more conjunctive conditions, followed by a dot, e.g. `grandparent(A,
///   B) :- parent(A, C), parent(C, B).`.
///
/// The head of a fact or rule needs at least one argument.
/// - **Queries**: A comma separated list of one or more conjunctive conditions, followed by a dot,
///   e.g. `grandparent(bob, A), female(A).`. Inside a program, queries start with `?-`.
/// - **Comments**: `%` until the end of the line, or enclosed in `/*` and `*/`.
///
/// A bare atom used as a condition always holds.
///
/// Besides functions for parsing, the textual universe also provides pretty-printing facilities.
///
/// # Example
///
/// Definitions of facts and rules can be loaded from a string that contains zero or more facts or
/// rules as described above. In the following example, we define a set of Peano arithmetic rules
/// and compute the first 5 square numbers.
///
/// ```
/// # use riblog::textual::*;
/// let mut u = TextualUniverse::new();
/// u.load_str(
///     r#"
/// is_natural(z).
/// is_natural(s(A)) :- is_natural(A).
/// add(A, z, A) :- is_natural(A).
/// add(A, s(B), s(C)) :- add(A, B, C).
/// mul(A, z, z) :- is_natural(A).
/// mul(A, s(B), C) :- mul(A, B, D), add(A, D, C).
/// "#,
/// )
/// .unwrap();
///
/// let query = u.prepare_query("mul(X,X,Y).").unwrap();
/// let mut squares = vec![];
/// u.universe
///     .evaluate_query(
///         &query,
///         |solution| {
///             let square = solution.get(1).unwrap();
///             squares.push(u.pretty().term_to_string(&square, None));
///             squares.len() == 5
///         },
///         || {},
///     )
///     .unwrap();
/// assert_eq!(squares[2], "s(s(s(s(z))))");
/// ```
///
/// Whole programs that mix definitions and `?-` queries can be run with
/// [`TextualUniverse::run_program`].
#[derive(Debug, Default)]
pub struct TextualUniverse {
    pub universe: Universe,
}

impl TextualUniverse {
    pub fn new() -> Self {
        Self {
            universe: Universe::new(),
        }
    }

    /// Load a set of facts and rules from a string.
    ///
    /// Either all rules are added or, if any of them fails to parse or is rejected, none of them.
    pub fn load_str(&mut self, rules: &str) -> Result<(), LoadError> {
        let rules = self.parse().parse_rules_str(rules)?;
        for rule in &rules {
            RuleSet::validate(rule)?;
        }
        tracing::debug!(count = rules.len(), "loading rules");
        for rule in rules {
            self.universe.add_rule(rule)?;
        }
        Ok(())
    }

    /// Parse a query, but do not run it.
    pub fn prepare_query(&mut self, query: &str) -> Result<Query, ParseError> {
        self.parse().parse_query_str(query)
    }

    /// Run a query and collect all of its solutions.
    ///
    /// See [`Universe::solutions`] for the shape of the result.
    pub fn query(&mut self, query: &str) -> Result<Vec<Vec<Option<Term>>>, LoadError> {
        let query = self.prepare_query(query)?;
        Ok(self.universe.solutions(&query)?)
    }

    /// Run a program with the default solver configuration.
    ///
    /// Facts and rules are added in order. Each `?-` query is answered against the rules that
    /// precede it: the bindings of the named variables for the first solution are written as
    /// `Name=value` lines followed by `yes`, or just `no` if there is no solution.
    ///
    /// ```
    /// # use riblog::textual::TextualUniverse;
    /// let mut out = Vec::new();
    /// TextualUniverse::new()
    ///     .run_program("likes(mary, wine). ?- likes(mary, X). ?- likes(X, beer).", &mut out)
    ///     .unwrap();
    /// assert_eq!(String::from_utf8(out).unwrap(), "X=wine\nyes\nno\n");
    /// ```
    pub fn run_program<W: io::Write>(
        &mut self,
        program: &str,
        out: &mut W,
    ) -> Result<(), LoadError> {
        self.run_program_with(&SolverConfig::default(), program, out)
    }

    /// Like [`TextualUniverse::run_program`], but with explicit resource limits for every query.
    pub fn run_program_with<W: io::Write>(
        &mut self,
        config: &SolverConfig,
        program: &str,
        out: &mut W,
    ) -> Result<(), LoadError> {
        let phrases = self.parse().parse_program_str(program)?;
        for phrase in phrases {
            match phrase {
                Phrase::Rule(rule) => self.universe.add_rule(rule)?,
                Phrase::Query(query) => {
                    self.answer(config, &query, out)?;
                }
            }
        }
        Ok(())
    }

    /// Answer a query by writing its first solution to `out`. Returns whether there was one.
    pub fn answer<W: io::Write>(
        &self,
        config: &SolverConfig,
        query: &Query,
        out: &mut W,
    ) -> Result<bool, LoadError> {
        let pretty = self.pretty();
        let mut written = Ok(());
        let found = self.universe.evaluate_query_with(
            config,
            query,
            |solution| {
                written = write_solution(&pretty, solution, out);
                true
            },
            || {},
        )?;
        written?;
        writeln!(out, "{}", if found { "yes" } else { "no" })?;
        Ok(found)
    }

    // //////////////////////////////// OTHER ACCESSORS ////////////////////////////////

    /// Return a pretty-printer using the symbols defined in this universe.
    pub fn pretty(&self) -> Prettifier {
        Prettifier::new(&self.universe.symbols)
    }

    /// Return a term parser that uses the name mapping of this universe for parsing terms.
    pub fn parse(&mut self) -> Parser {
        Parser::new(&mut self.universe.symbols)
    }
}

/// Write one `Name=value` line per named variable of a solution.
///
/// Unbound variables are written as `_`, unbound variables nested in a value as `_0`, `_1`, ...
pub fn write_solution<W: io::Write>(
    pretty: &Prettifier,
    solution: &Solution,
    out: &mut W,
) -> io::Result<()> {
    for (index, value) in solution.values().into_iter().enumerate() {
        let Some(name) = solution.name(index) else {
            continue;
        };
        match value {
            Some(term) => writeln!(out, "{}={}", name, pretty.term_to_string(&term, None))?,
            None => writeln!(out, "{}=_", name)?,
        }
    }
    Ok(())
}
