//! # Runtime terms and variable cells
//!
//! When a rule is invoked, its templates are not copied. Instead, a fresh [`Frame`] of variable
//! cells is allocated and the templates are *bound* against it (see [`bind`]). Binding a compound
//! term produces a [`Closure`] that keeps the template together with the frame it was bound in, so
//! that variables nested arbitrarily deep inside it are always looked up in the right frame, no
//! matter when the closure is taken apart.
//!
//! All cells of a query live in a single [`Bindings`] arena and refer to each other by [`VarId`].
//! Frames are contiguous ranges of that arena and are released in stack order when the solver
//! backtracks.

use crate::ast::{AppTerm, Slot, Sym, Term};

/// Handle of a variable cell inside a [`Bindings`] arena.
///
/// Cells are numbered in allocation order, which makes the ID a sequence number as well.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[repr(transparent)]
pub struct VarId(usize);

impl VarId {
    #[inline(always)]
    pub fn ord(self) -> usize {
        self.0
    }
}

/// An environment frame ("rib"): the cells allocated for one rule invocation or query.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Frame {
    start: usize,
    len: usize,
}

impl Frame {
    /// The cell backing `slot` in this frame.
    #[inline(always)]
    pub fn cell(self, slot: Slot) -> VarId {
        debug_assert!(
            slot.ord() < self.len,
            "slot {} out of range for frame of {} cells",
            slot.ord(),
            self.len
        );
        VarId(self.start + slot.ord())
    }

    pub fn len(self) -> usize {
        self.len
    }

    pub fn is_empty(self) -> bool {
        self.len == 0
    }

    /// Iterate over the cells of this frame in slot order.
    pub fn cells(self) -> impl Iterator<Item = VarId> {
        (self.start..self.start + self.len).map(VarId)
    }
}

/// A compound template paired with the frame it closes over.
#[derive(Clone, Copy, Debug)]
pub struct Closure<'a> {
    pub frame: Frame,
    pub template: &'a AppTerm,
}

impl<'a> Closure<'a> {
    #[inline(always)]
    pub fn functor(&self) -> Sym {
        self.template.functor
    }

    #[inline(always)]
    pub fn arity(&self) -> usize {
        self.template.args.len()
    }

    /// The arguments, still unbound, together with the frame they need to be bound against.
    #[inline(always)]
    pub fn args(&self) -> Args<'a> {
        Args::new(&self.template.args, self.frame)
    }
}

/// A sequence of templates that are bound lazily against a common frame.
#[derive(Clone, Copy, Debug)]
pub struct Args<'a> {
    terms: &'a [Term],
    frame: Frame,
}

impl<'a> Args<'a> {
    pub fn new(terms: &'a [Term], frame: Frame) -> Self {
        Self { terms, frame }
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Bind the first argument and return it together with the remaining ones.
    #[inline]
    pub fn split_first(&self) -> Option<(Value<'a>, Args<'a>)> {
        let (first, rest) = self.terms.split_first()?;
        Some((bind(first, self.frame), Args::new(rest, self.frame)))
    }
}

/// A bound term, i.e. the runtime value of a template in a particular frame.
#[derive(Clone, Copy, Debug)]
pub enum Value<'a> {
    Atom(Sym),
    Int(i64),
    /// Reference to a variable cell.
    Var(VarId),
    Struct(Closure<'a>),
}

/// Bind a template against a frame.
///
/// Atomic terms carry no frame dependency and map to themselves, locals map to their cell in the
/// frame, and compound terms become [`Closure`]s. The arguments of a compound term are not
/// touched until the closure is decomposed.
#[inline]
pub fn bind(term: &Term, frame: Frame) -> Value<'_> {
    match term {
        Term::Atom(sym) => Value::Atom(*sym),
        Term::Int(i) => Value::Int(*i),
        Term::Local(slot) => Value::Var(frame.cell(*slot)),
        Term::Struct(template) => Value::Struct(Closure { frame, template }),
    }
}

/// State of a single variable cell.
#[derive(Clone, Copy, Debug)]
pub enum Cell<'a> {
    /// Unbound, and the canonical representative of its class.
    Free,
    /// Unbound, but unified with another cell.
    Forward(VarId),
    /// Bound to a value. The value is never a [`Value::Var`].
    Bound(Value<'a>),
}

/// Arena holding all variable cells of a running query.
#[derive(Debug, Default)]
pub struct Bindings<'a> {
    cells: Vec<Cell<'a>>,
}

impl<'a> AsMut<Bindings<'a>> for Bindings<'a> {
    fn as_mut(&mut self) -> &mut Bindings<'a> {
        self
    }
}

impl<'a> Bindings<'a> {
    pub fn new() -> Self {
        Self { cells: Vec::new() }
    }

    /// Allocate a frame of `len` free cells.
    pub fn alloc_frame(&mut self, len: usize) -> Frame {
        let start = self.cells.len();
        self.cells.resize(start + len, Cell::Free);
        Frame { start, len }
    }

    /// Number of cells allocated so far. Can be passed to [`Bindings::release`] later.
    pub fn checkpoint(&self) -> usize {
        self.cells.len()
    }

    /// Drop all cells allocated after `checkpoint`.
    ///
    /// Must only be called once no remaining cell refers to the released ones, i.e. after all
    /// assignments made since the checkpoint have been undone.
    pub fn release(&mut self, checkpoint: usize) {
        debug_assert!(checkpoint <= self.cells.len());
        self.cells.truncate(checkpoint);
    }

    pub fn get(&self, var: VarId) -> Cell<'a> {
        self.cells[var.0]
    }

    /// Follow forwarding links until reaching either a value or a free canonical cell.
    ///
    /// The result is never a [`Value::Var`] pointing at a bound or forwarding cell.
    pub fn resolve(&self, value: Value<'a>) -> Value<'a> {
        let Value::Var(mut var) = value else {
            return value;
        };
        loop {
            match self.cells[var.0] {
                Cell::Free => return Value::Var(var),
                Cell::Forward(next) => var = next,
                Cell::Bound(value) => return value,
            }
        }
    }

    /// Make a free canonical cell forward to another cell.
    pub(crate) fn forward(&mut self, from: VarId, to: VarId) {
        debug_assert!(matches!(self.cells[from.0], Cell::Free));
        debug_assert!(matches!(self.cells[to.0], Cell::Free));
        self.cells[from.0] = Cell::Forward(to);
    }

    /// Bind a free canonical cell to a value.
    pub(crate) fn assign(&mut self, var: VarId, value: Value<'a>) {
        debug_assert!(matches!(self.cells[var.0], Cell::Free));
        debug_assert!(!matches!(value, Value::Var(_)));
        self.cells[var.0] = Cell::Bound(value);
    }

    /// Undo a [`Bindings::forward`] or [`Bindings::assign`].
    pub(crate) fn reset(&mut self, var: VarId) {
        self.cells[var.0] = Cell::Free;
    }

    /// Convert a value into a self-contained [`Term`] by substituting all bound variables.
    ///
    /// Free variables are replaced by [`Term::Local`]s numbered in order of first appearance, with
    /// `free` collecting the cells seen so far. Passing the same vector for several values keeps
    /// the numbering consistent between them.
    pub fn reify(&self, value: Value<'a>, free: &mut Vec<VarId>) -> Term {
        match self.resolve(value) {
            Value::Atom(sym) => Term::Atom(sym),
            Value::Int(i) => Term::Int(i),
            Value::Var(var) => {
                let index = free.iter().position(|v| *v == var).unwrap_or_else(|| {
                    free.push(var);
                    free.len() - 1
                });
                Term::Local(Slot::from_ord(index))
            }
            Value::Struct(closure) => {
                let args = closure
                    .template
                    .args
                    .iter()
                    .map(|arg| self.reify(bind(arg, closure.frame), free))
                    .collect();
                Term::Struct(AppTerm::new(closure.functor(), args))
            }
        }
    }
}
