//! # Compiled rule terms
//!
//! The types in this module are the static, "unbound" side of the term model. They are produced by
//! a front end (such as the [textual](crate::textual) module, or by hand using the builders below)
//! and are never mutated by the solver. Variables do not appear here as such, only as [`Slot`]s
//! referring into the environment frame that is allocated whenever the enclosing rule is invoked.

/// A symbol in a logic expression, e.g. `foo` and `bar` in `foo(bar, _)`. It can refer to both a
/// predicate and data.
///
/// Symbols are interned by the [`SymbolStore`](crate::universe::SymbolStore), so two symbols are
/// the same exactly when their IDs are equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Sym(usize);

impl Sym {
    #[inline(always)]
    pub fn ord(self) -> usize {
        self.0
    }

    #[inline(always)]
    pub fn from_ord(ord: usize) -> Sym {
        Sym(ord)
    }
}

/// Position of a variable inside the environment frame of a rule or query.
///
/// Slots should be numbered densely from zero, because every invocation of a rule allocates one
/// variable cell per slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Slot(usize);

impl Slot {
    #[inline(always)]
    pub fn ord(self) -> usize {
        self.0
    }

    #[inline(always)]
    pub fn from_ord(ord: usize) -> Slot {
        Slot(ord)
    }
}

/// Representation of an unbound logic term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Term {
    /// An atomic constant.
    Atom(Sym),
    /// A signed 64-bit integer.
    Int(i64),
    /// A reference to a variable in the frame that is live when the enclosing rule fires.
    Local(Slot),
    /// A compound term.
    Struct(AppTerm),
}

impl Term {
    /// Number of frame slots needed for all [`Term::Local`]s occurring in this term.
    pub fn count_var_slots(&self) -> usize {
        match self {
            Term::Atom(_) | Term::Int(_) => 0,
            Term::Local(slot) => slot.0 + 1,
            Term::Struct(app) => app.count_var_slots(),
        }
    }

    /// Check whether this term contains any [`Term::Local`].
    pub fn has_locals(&self) -> bool {
        self.count_var_slots() > 0
    }
}

impl From<Slot> for Term {
    fn from(slot: Slot) -> Self {
        Term::Local(slot)
    }
}

impl From<Sym> for Term {
    fn from(s: Sym) -> Self {
        Term::Atom(s)
    }
}

impl From<AppTerm> for Term {
    fn from(at: AppTerm) -> Self {
        Term::Struct(at)
    }
}

impl From<i64> for Term {
    fn from(i: i64) -> Self {
        Term::Int(i)
    }
}

/// A compound term of the form `functor(arg0, arg1, ...)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppTerm {
    /// The functor being applied.
    pub functor: Sym,
    /// The arguments of the application.
    pub args: Vec<Term>,
}

impl From<Sym> for AppTerm {
    fn from(s: Sym) -> Self {
        Self {
            functor: s,
            args: vec![],
        }
    }
}

impl AppTerm {
    pub fn new(functor: Sym, args: Vec<Term>) -> Self {
        Self { functor, args }
    }

    #[inline(always)]
    pub fn arity(&self) -> usize {
        self.args.len()
    }

    /// Number of frame slots needed for all [`Term::Local`]s occurring in the arguments.
    pub fn count_var_slots(&self) -> usize {
        self.args
            .iter()
            .map(|t| t.count_var_slots())
            .max()
            .unwrap_or(0)
    }
}

/// Convenience constructor for a compound term.
pub fn app(functor: Sym, args: Vec<Term>) -> Term {
    Term::Struct(AppTerm::new(functor, args))
}

/// Convenience constructor for a frame reference.
pub fn local(slot: usize) -> Term {
    Term::Local(Slot(slot))
}

/// Convenience constructor for an integer term.
pub fn int(value: i64) -> Term {
    Term::Int(value)
}

/// Names of the variables of a rule or query, indexed by slot.
///
/// Wildcards occupy a slot but carry no name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VarScope {
    names: Vec<Option<String>>,
}

impl VarScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the slot for a named variable, allocating a new one on first use.
    pub fn get_or_insert(&mut self, name: &str) -> Slot {
        if let Some(index) = self
            .names
            .iter()
            .position(|n| n.as_deref() == Some(name))
        {
            Slot(index)
        } else {
            self.names.push(Some(name.to_owned()));
            Slot(self.names.len() - 1)
        }
    }

    /// Allocate a fresh anonymous slot.
    pub fn insert_wildcard(&mut self) -> Slot {
        self.names.push(None);
        Slot(self.names.len() - 1)
    }

    pub fn get_name(&self, slot: Slot) -> Option<&str> {
        self.names.get(slot.0).and_then(|n| n.as_deref())
    }

    /// Number of slots, named or not.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// A compiled rule. Logically, it can be read as "`body` implies `head`".
///
/// The rule owns the templates for its head arguments and body goals. Every invocation allocates a
/// fresh frame of `locals` cells and binds the templates against it.
///
/// # Examples
///
/// ```
/// use riblog::ast::*;
/// // grandparent(X, Y) :- parent(X, Z), parent(Z, Y).
/// let grandparent = Sym::from_ord(0); // Note: Normally, you'd get these `Sym`s from the `Universe`.
/// let parent = Sym::from_ord(1);
/// let rule = forall(|[x, y, z]|
///     Rule::fact(grandparent, vec![x.into(), y.into()])
///     .when(parent, vec![x.into(), z.into()])
///     .when(parent, vec![z.into(), y.into()])
/// );
/// assert_eq!(rule.locals, 3);
/// assert_eq!(rule.arity(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    /// Size of the frame allocated per invocation.
    pub locals: usize,
    /// Functor and argument templates of the head.
    pub head: AppTerm,
    /// The goals that need to hold for the head to become true. An empty body makes a fact.
    pub body: Vec<Term>,
    /// Optional variable names, only used for printing.
    pub scope: Option<VarScope>,
}

impl Rule {
    /// Create a rule with an explicit frame size.
    pub fn new(locals: usize, head: AppTerm, body: Vec<Term>) -> Self {
        Self {
            locals,
            head,
            body,
            scope: None,
        }
    }

    /// Create a "fact" rule, i.e. one that always holds.
    pub fn fact(pred: Sym, args: Vec<Term>) -> Self {
        Self::new(0, AppTerm::new(pred, args), vec![])
    }

    /// Constrain a rule with an additional goal that must hold for the head to become true.
    pub fn when(mut self, pred: Sym, args: Vec<Term>) -> Self {
        self.body.push(app(pred, args));
        self
    }

    pub fn with_scope(mut self, scope: VarScope) -> Self {
        self.scope = Some(scope);
        self
    }

    #[inline(always)]
    pub fn functor(&self) -> Sym {
        self.head.functor
    }

    #[inline(always)]
    pub fn arity(&self) -> usize {
        self.head.arity()
    }

    pub fn is_fact(&self) -> bool {
        self.body.is_empty()
    }
}

/// A conjunction of goals to prove, together with the names of its free variables.
///
/// # Examples
///
/// ```
/// use riblog::ast::*;
/// // grandparent(bob, X), female(X).
/// let grandparent = Sym::from_ord(0);
/// let female = Sym::from_ord(1);
/// let bob = Sym::from_ord(2);
/// let query = exists(|[x]|
///     Query::single(grandparent, vec![bob.into(), x.into()])
///     .and(female, vec![x.into()])
/// );
/// assert_eq!(query.locals(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub goals: Vec<Term>,
    /// One entry per free variable; its length is the size of the query frame.
    pub scope: VarScope,
}

impl Query {
    pub fn new(goals: Vec<Term>, scope: VarScope) -> Query {
        Query { goals, scope }
    }

    /// The query that is vacuously true.
    pub fn empty() -> Query {
        Query::new(vec![], VarScope::new())
    }

    /// A query with just a single goal and no named variables.
    pub fn single(pred: Sym, args: Vec<Term>) -> Query {
        Query::new(vec![app(pred, args)], VarScope::new())
    }

    /// Add another goal to this query.
    pub fn and(mut self, pred: Sym, args: Vec<Term>) -> Self {
        self.goals.push(app(pred, args));
        self
    }

    /// Size of the frame that holds the free variables of the query.
    pub fn locals(&self) -> usize {
        self.scope.len()
    }
}

/// Helper function for populating an array with incrementing slots.
fn quantify<R, const N: usize>(f: impl FnOnce([Slot; N]) -> R) -> R {
    f(std::array::from_fn(Slot))
}

/// A universal quantification that can be used for more naturally describing the creation of rules.
/// The rule gets a frame of at least `N` slots. See the example for the [`Rule`] type.
pub fn forall<const N: usize>(f: impl FnOnce([Slot; N]) -> Rule) -> Rule {
    let mut rule = quantify(f);
    rule.locals = rule.locals.max(N);
    rule
}

/// An existential quantification that can be used for more naturally describing the creation of
/// queries. Each quantified variable gets an anonymous slot. See the example for the [`Query`]
/// type.
pub fn exists<const N: usize>(f: impl FnOnce([Slot; N]) -> Query) -> Query {
    let mut query = quantify(f);
    while query.scope.len() < N {
        query.scope.insert_wildcard();
    }
    query
}
