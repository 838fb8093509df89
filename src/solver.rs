//! # Depth-first resolution
//!
//! The solver proves a query by trying, for each goal from left to right, every matching rule in
//! the order the rules were added. It is written in continuation-passing style: proving a goal
//! takes a continuation that proves everything after it. A `false` result simply means that this
//! path failed and makes the caller try its next alternative, while the bindings made along the
//! way are undone as the calls return (see [`crate::unify`]).
//!
//! A consequence of this is that the native call stack grows with the size of the derivation. The
//! search is also not complete: left-recursive rules such as `p(X) :- p(X).` never terminate. A
//! [`SolverConfig`] can put a bound on both.

#[cfg(test)]
mod test;

use std::sync::atomic::{self, AtomicBool};
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, trace};

use crate::ast::{Query, Rule, Slot, Term, VarScope};
use crate::bindings::{Args, Bindings, Frame, Value, VarId};
use crate::unify::{unify_args, Cont};
use crate::universe::{check_slots, RuleError, RuleSet};

/// Resource limits for a single query.
///
/// # Example
///
/// ```
/// # use riblog::solver::SolverConfig;
/// # use std::sync::{Arc, atomic::AtomicBool};
/// let interrupted = Arc::new(AtomicBool::new(false));
/// let config = SolverConfig::new()
///     .with_max_depth(10_000)
///     .with_interrupt(interrupted.clone());
/// assert_eq!(config.max_depth, Some(10_000));
/// ```
#[derive(Debug, Clone, Default)]
pub struct SolverConfig {
    /// Maximum number of rule invocations that may be live on the stack at once. Unbounded when
    /// `None`.
    pub max_depth: Option<usize>,
    /// When this flag is raised, the search unwinds and reports [`QueryError::Interrupted`].
    pub interrupt: Option<Arc<AtomicBool>>,
}

impl SolverConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = Some(max_depth);
        self
    }

    pub fn with_interrupt(mut self, interrupt: Arc<AtomicBool>) -> Self {
        self.interrupt = Some(interrupt);
        self
    }
}

/// Reasons for a query to end without a yes-or-no answer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// The query itself is malformed.
    #[error("invalid query: {0}")]
    Rule(#[from] RuleError),
    #[error("search exceeded the limit of {limit} nested rule invocations")]
    DepthLimitExceeded { limit: usize },
    #[error("search was interrupted")]
    Interrupted,
}

/// The variable assignment of a query at the point a solution was found.
pub struct Solution<'s> {
    scope: &'s VarScope,
    frame: Frame,
    bindings: &'s Bindings<'s>,
}

impl<'s> Solution<'s> {
    /// Number of query variables, including anonymous ones.
    pub fn len(&self) -> usize {
        self.frame.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frame.is_empty()
    }

    /// Name of the query variable at `index`, if it has one.
    pub fn name(&self, index: usize) -> Option<&'s str> {
        self.scope.get_name(Slot::from_ord(index))
    }

    /// Value of the query variable at `index`, or `None` if it is still unbound or the query has
    /// no variable at `index`.
    ///
    /// Unbound variables nested inside the value are represented by [`Term::Local`]s, numbered by
    /// order of appearance.
    pub fn get(&self, index: usize) -> Option<Term> {
        if index >= self.len() {
            return None;
        }
        self.reify(self.frame.cell(Slot::from_ord(index)), &mut Vec::new())
    }

    /// Values of all query variables, in slot order.
    ///
    /// In contrast to calling [`Solution::get`] repeatedly, unbound variables are numbered
    /// consistently across all values.
    pub fn values(&self) -> Vec<Option<Term>> {
        let mut free = Vec::new();
        self.frame
            .cells()
            .map(|var| self.reify(var, &mut free))
            .collect()
    }

    /// Named query variables and their values.
    pub fn iter(&self) -> impl Iterator<Item = (&'s str, Option<Term>)> + '_ {
        (0..self.len()).filter_map(move |index| Some((self.name(index)?, self.get(index))))
    }

    fn reify(&self, var: VarId, free: &mut Vec<VarId>) -> Option<Term> {
        match self.bindings.resolve(Value::Var(var)) {
            Value::Var(_) => None,
            value => Some(self.bindings.reify(value, free)),
        }
    }
}

/// Run a query against a rule set.
///
/// A frame for the free variables of the query is allocated, then the goals are proven from left
/// to right. Whenever all goals hold, `on_success` is called. If it returns `false`, the search
/// backtracks to look for the next solution; if it returns `true`, the search stops and `Ok(true)`
/// is returned. `on_failure` is called once the search space is exhausted without a commit.
///
/// When the search is aborted because of the limits in `config`, neither callback is invoked for
/// the remainder of the search and the corresponding [`QueryError`] is returned.
pub fn evaluate_query<'a>(
    rules: &'a RuleSet,
    config: &SolverConfig,
    query: &'a Query,
    mut on_success: impl FnMut(&Solution) -> bool,
    on_failure: impl FnOnce(),
) -> Result<bool, QueryError> {
    check_slots(&query.goals, query.locals())?;

    let mut machine = Machine::new(rules, config);
    let frame = machine.bindings.alloc_frame(query.locals());
    debug!(goals = query.goals.len(), vars = frame.len(), "evaluating query");

    let found = machine.solve_conjunction(frame, &query.goals, &mut |m: &mut Machine<'a>| {
        let solution = Solution {
            scope: &query.scope,
            frame,
            bindings: &m.bindings,
        };
        on_success(&solution)
    });

    if let Some(error) = machine.abort.take() {
        debug!(%error, "query aborted");
        return Err(error);
    }
    debug!(found, "query finished");
    if !found {
        on_failure();
    }
    Ok(found)
}

/// State of a running query.
struct Machine<'a> {
    rules: &'a RuleSet,
    bindings: Bindings<'a>,
    /// Rule invocations currently live on the stack.
    depth: usize,
    max_depth: Option<usize>,
    interrupt: Option<Arc<AtomicBool>>,
    /// Set once a limit is hit; from then on every step fails immediately.
    abort: Option<QueryError>,
}

impl<'a> AsMut<Bindings<'a>> for Machine<'a> {
    fn as_mut(&mut self) -> &mut Bindings<'a> {
        &mut self.bindings
    }
}

impl<'a> Machine<'a> {
    fn new(rules: &'a RuleSet, config: &SolverConfig) -> Self {
        Self {
            rules,
            bindings: Bindings::new(),
            depth: 0,
            max_depth: config.max_depth,
            interrupt: config.interrupt.clone(),
            abort: None,
        }
    }

    /// Prove `goals` in `frame` from left to right, then call `k`.
    fn solve_conjunction(&mut self, frame: Frame, goals: &'a [Term], k: Cont<'_, Self>) -> bool {
        if self.abort.is_some() {
            return false;
        }
        let Some((goal, rest)) = goals.split_first() else {
            return k(self);
        };
        match goal {
            Term::Atom(_) | Term::Int(_) | Term::Local(_) => {
                // There are no built-in predicates, so atomic goals hold trivially.
                debug!(?goal, "atomic goal treated as true");
                self.solve_conjunction(frame, rest, k)
            }
            Term::Struct(app) => {
                let candidates = self.rules.lookup(app.functor, app.arity());
                trace!(functor = ?app.functor, arity = app.arity(), candidates = candidates.len(), "solving goal");
                self.solve_disjunction(
                    Args::new(&app.args, frame),
                    candidates,
                    &mut |m: &mut Self| m.solve_conjunction(frame, rest, k),
                )
            }
        }
    }

    /// Try each candidate rule in turn against the `actuals` of a goal.
    ///
    /// Every attempt gets a fresh frame that is released again when the attempt fails.
    fn solve_disjunction(
        &mut self,
        actuals: Args<'a>,
        candidates: &'a [Rule],
        k: Cont<'_, Self>,
    ) -> bool {
        for (index, rule) in candidates.iter().enumerate() {
            if !self.enter() {
                return false;
            }
            debug_assert_eq!(actuals.len(), rule.arity());

            let checkpoint = self.bindings.checkpoint();
            let frame = self.bindings.alloc_frame(rule.locals);
            trace!(index, depth = self.depth, "trying rule");

            let formals = Args::new(&rule.head.args, frame);
            let body: &'a [Term] = &rule.body;
            let found = unify_args(self, actuals, formals, &mut |m: &mut Self| {
                m.solve_conjunction(frame, body, k)
            });
            self.depth -= 1;

            if found {
                return true;
            }
            self.bindings.release(checkpoint);
        }
        false
    }

    /// Account for a new rule invocation, unless a limit forbids it.
    fn enter(&mut self) -> bool {
        if self.abort.is_some() {
            return false;
        }
        if let Some(flag) = &self.interrupt {
            if flag.load(atomic::Ordering::SeqCst) {
                self.abort = Some(QueryError::Interrupted);
                return false;
            }
        }
        if let Some(limit) = self.max_depth {
            if self.depth >= limit {
                self.abort = Some(QueryError::DepthLimitExceeded { limit });
                return false;
            }
        }
        self.depth += 1;
        true
    }
}
