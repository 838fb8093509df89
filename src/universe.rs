//! # Universe
//!
//! The universe is the data store that holds all the symbols, facts and rules that the solver uses
//! for proving queries. See the [Universe] type for more information.

use std::collections::HashMap;

use thiserror::Error;

use crate::ast::{AppTerm, Query, Rule, Sym, Term};
use crate::solver::{self, QueryError, Solution, SolverConfig};

/// Interning table mapping names to [`Sym`]s and back.
#[derive(Debug, Clone, Default)]
pub struct SymbolStore {
    names: Vec<String>,
    lookup: HashMap<String, Sym>,
}

impl SymbolStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the symbol registered for `name`, registering it first if necessary.
    pub fn get_or_insert_named(&mut self, name: &str) -> Sym {
        if let Some(sym) = self.lookup.get(name) {
            *sym
        } else {
            let sym = Sym::from_ord(self.names.len());
            self.names.push(name.to_owned());
            self.lookup.insert(name.to_owned(), sym);
            sym
        }
    }

    /// Return the symbol registered for `name` without creating one.
    pub fn get_named(&self, name: &str) -> Option<Sym> {
        self.lookup.get(name).copied()
    }

    pub fn get_symbol_name(&self, sym: Sym) -> Option<&str> {
        self.names.get(sym.ord()).map(String::as_str)
    }

    /// Number of symbols interned so far.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Reasons for rejecting a rule or query before it reaches the solver.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleError {
    /// A fact must be ground, otherwise it would hold for anything.
    #[error("fact {functor:?}/{arity} must not contain free variables")]
    FactHasVariables { functor: Sym, arity: usize },
    /// A variable reference points outside of the frame that will be allocated for it.
    #[error("variable slot {slot} is out of range for a frame of {locals} variables")]
    SlotOutOfRange { slot: usize, locals: usize },
}

/// Check that every [`Term::Local`] in `terms` fits into a frame of `locals` cells.
pub(crate) fn check_slots<'t>(
    terms: impl IntoIterator<Item = &'t Term>,
    locals: usize,
) -> Result<(), RuleError> {
    let needed = terms
        .into_iter()
        .map(Term::count_var_slots)
        .max()
        .unwrap_or(0);
    if needed > locals {
        Err(RuleError::SlotOutOfRange {
            slot: needed - 1,
            locals,
        })
    } else {
        Ok(())
    }
}

/// The rule database, indexed by functor and arity of the rule heads.
///
/// Rules for the same predicate are kept in insertion order, which is also the order in which the
/// solver tries them.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules_by_head: HashMap<(Sym, usize), Vec<Rule>>,
    len: usize,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check whether [`RuleSet::insert`] would accept `rule`, without adding it.
    pub fn validate(rule: &Rule) -> Result<(), RuleError> {
        if rule.is_fact() && rule.head.args.iter().any(Term::has_locals) {
            return Err(RuleError::FactHasVariables {
                functor: rule.functor(),
                arity: rule.arity(),
            });
        }
        check_slots(rule.head.args.iter().chain(&rule.body), rule.locals)
    }

    /// Validate a rule and append it to the list for its functor and arity.
    pub fn insert(&mut self, rule: Rule) -> Result<(), RuleError> {
        Self::validate(&rule)?;

        tracing::trace!(functor = ?rule.functor(), arity = rule.arity(), "inserting rule");
        self.rules_by_head
            .entry((rule.functor(), rule.arity()))
            .or_default()
            .push(rule);
        self.len += 1;
        Ok(())
    }

    /// All rules whose head matches `functor/arity`, in insertion order.
    #[inline(always)]
    pub fn lookup(&self, functor: Sym, arity: usize) -> &[Rule] {
        self.rules_by_head
            .get(&(functor, arity))
            .map_or(&[], Vec::as_slice)
    }

    /// Total number of rules in the database.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// The Universe owns the symbol table and the rule database.
///
/// All operations of the engine go through a single owned value of this type, there is no global
/// state. Rules can only be added, never removed.
///
/// # Example
///
/// See the [top-level example](crate#example).
#[derive(Debug, Clone, Default)]
pub struct Universe {
    pub symbols: SymbolStore,
    pub rules: RuleSet,
}

impl Universe {
    /// Create a new empty universe.
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a name, returning the same [`Sym`] for the same name every time.
    pub fn intern(&mut self, name: &str) -> Sym {
        self.symbols.get_or_insert_named(name)
    }

    /// Add a ground fact.
    pub fn assert_fact(&mut self, head: AppTerm) -> Result<(), RuleError> {
        self.rules.insert(Rule::new(0, head, vec![]))
    }

    /// Add a rule whose frame holds `locals` variables.
    pub fn assert_rule(
        &mut self,
        locals: usize,
        head: AppTerm,
        body: Vec<Term>,
    ) -> Result<(), RuleError> {
        self.rules.insert(Rule::new(locals, head, body))
    }

    /// Add an already assembled rule.
    pub fn add_rule(&mut self, rule: Rule) -> Result<(), RuleError> {
        self.rules.insert(rule)
    }

    pub fn lookup(&self, functor: Sym, arity: usize) -> &[Rule] {
        self.rules.lookup(functor, arity)
    }

    /// Run a query with the default solver configuration.
    ///
    /// `on_success` is called for every solution that is found. Returning `true` commits to that
    /// solution, returning `false` makes the solver backtrack and look for another one. If the
    /// search space is exhausted without a commit, `on_failure` is called.
    ///
    /// Returns whether a solution was committed.
    pub fn evaluate_query(
        &self,
        query: &Query,
        on_success: impl FnMut(&Solution) -> bool,
        on_failure: impl FnOnce(),
    ) -> Result<bool, QueryError> {
        self.evaluate_query_with(&SolverConfig::default(), query, on_success, on_failure)
    }

    /// Like [`Universe::evaluate_query`], but with explicit resource limits.
    pub fn evaluate_query_with(
        &self,
        config: &SolverConfig,
        query: &Query,
        on_success: impl FnMut(&Solution) -> bool,
        on_failure: impl FnOnce(),
    ) -> Result<bool, QueryError> {
        solver::evaluate_query(&self.rules, config, query, on_success, on_failure)
    }

    /// Enumerate all solutions of a query.
    ///
    /// Each solution holds one entry per query variable, see [`Solution::get`].
    pub fn solutions(&self, query: &Query) -> Result<Vec<Vec<Option<Term>>>, QueryError> {
        let mut out = Vec::new();
        self.evaluate_query(
            query,
            |solution| {
                out.push(solution.values());
                false
            },
            || {},
        )?;
        Ok(out)
    }
}
