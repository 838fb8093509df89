//! # Unification with continuations
//!
//! Unification does not return the bindings it made, and there is no trail to undo them. Instead,
//! every function takes a success continuation `k` that is invoked while the bindings are in
//! place. When `k` returns `false` (the rest of the search failed), the bindings made at this level
//! are reset before returning `false` to the caller. When it returns `true`, they are kept.
//!
//! The continuation receives the state the unifier works on as an argument. That state is anything
//! that gives access to the [`Bindings`] arena, which lets the solver pass its own state through
//! without the continuation having to capture it.

use crate::bindings::{Args, Bindings, Value, VarId};

/// Success continuation for a state of type `M`.
pub type Cont<'k, M> = &'k mut dyn FnMut(&mut M) -> bool;

/// Unify two values and call `k` if they can be made equal.
///
/// Returns the result of `k`, or `false` if the values don't unify. All bindings made are undone
/// before returning `false`.
pub fn unify<'a, M: AsMut<Bindings<'a>>>(
    m: &mut M,
    left: Value<'a>,
    right: Value<'a>,
    k: Cont<'_, M>,
) -> bool {
    let bindings = m.as_mut();
    let left = bindings.resolve(left);
    let right = bindings.resolve(right);

    match (left, right) {
        (Value::Var(l), Value::Var(r)) => {
            if l == r {
                return k(m);
            }
            // the younger cell always points to the older one
            let (from, to) = if l < r { (r, l) } else { (l, r) };
            bindings.forward(from, to);
            commit_or_undo(m, from, k)
        }
        (Value::Var(var), value) | (value, Value::Var(var)) => {
            bindings.assign(var, value);
            commit_or_undo(m, var, k)
        }
        (Value::Struct(l), Value::Struct(r)) => {
            if l.functor() != r.functor() || l.arity() != r.arity() {
                return false;
            }
            unify_args(m, l.args(), r.args(), k)
        }
        (Value::Atom(l), Value::Atom(r)) => l == r && k(m),
        (Value::Int(l), Value::Int(r)) => l == r && k(m),
        _ => false,
    }
}

/// Unify two argument lists pairwise from left to right, then call `k`.
///
/// Each position is unified with a continuation that handles the remaining positions, so a
/// mismatch further right unwinds through, and undoes, every binding made to its left.
pub fn unify_args<'a, M: AsMut<Bindings<'a>>>(
    m: &mut M,
    left: Args<'a>,
    right: Args<'a>,
    k: Cont<'_, M>,
) -> bool {
    debug_assert_eq!(left.len(), right.len(), "argument count mismatch");
    match (left.split_first(), right.split_first()) {
        (Some((l, left_rest)), Some((r, right_rest))) => unify(m, l, r, &mut |m: &mut M| {
            unify_args(m, left_rest, right_rest, k)
        }),
        _ => k(m),
    }
}

fn commit_or_undo<'a, M: AsMut<Bindings<'a>>>(m: &mut M, var: VarId, k: Cont<'_, M>) -> bool {
    if k(m) {
        true
    } else {
        m.as_mut().reset(var);
        false
    }
}
