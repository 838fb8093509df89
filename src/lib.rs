//! # Logic programming with environment ribs
//!
//! Riblog is a small, embeddable resolution engine for a subset of Prolog. At the core of it is
//! the [Universe] type which holds all known symbols, facts and rules, and answers queries about
//! them by unification and depth-first backtracking search.
//!
//! Rules are stored as templates that refer to their variables by slot number. Every time a rule
//! is invoked, the solver allocates a fresh frame ("rib") of variable cells and binds the templates
//! against it, which turns compound terms into closures over that frame (see [`bindings`]). No term
//! is ever copied or renamed during the search.
//!
//! The [Universe] type represents all identifiers using IDs, there is no textual representation.
//! For a more Prolog-like syntax, have a look at the [textual] module.
//!
//! # Example
//!
//! The following program describes a line of succession. In Prolog, it could be written like
//! this:
//!
//! ```prolog
//! father(haakon, olav).
//! father(olav, harald).
//! father(harald, hakon_magnus).
//!
//! grandfather(X, Y) :- father(X, Z), father(Z, Y).
//! ```
//!
//! Using the [Universe] type, we can encode it as follows and then ask who the grandfather of
//! Haakon Magnus is:
//!
//! ```
//! use riblog::ast::{self, AppTerm, Query, Rule};
//!
//! let mut u = riblog::Universe::new();
//!
//! // Obtain IDs for the symbols we want to use in our terms.
//! let father = u.intern("father");
//! let grandfather = u.intern("grandfather");
//! let [haakon, olav, harald, hakon_magnus] =
//!     ["haakon", "olav", "harald", "hakon_magnus"].map(|name| u.intern(name));
//!
//! for (parent, child) in [(haakon, olav), (olav, harald), (harald, hakon_magnus)] {
//!     u.assert_fact(AppTerm::new(father, vec![parent.into(), child.into()]))
//!         .unwrap();
//! }
//!
//! // grandfather(X, Y) :- father(X, Z), father(Z, Y).
//! u.add_rule(ast::forall(|[x, y, z]| {
//!     Rule::fact(grandfather, vec![x.into(), y.into()])
//!         .when(father, vec![x.into(), z.into()])
//!         .when(father, vec![z.into(), y.into()])
//! }))
//! .unwrap();
//!
//! let query = ast::exists(|[x]| {
//!     Query::single(grandfather, vec![x.into(), hakon_magnus.into()])
//! });
//! let found = u
//!     .evaluate_query(
//!         &query,
//!         |solution| {
//!             assert_eq!(solution.get(0), Some(olav.into()));
//!             true
//!         },
//!         || panic!("olav is the grandfather"),
//!     )
//!     .unwrap();
//! assert!(found);
//! ```
//!
//! The solver performs a left-to-right depth first search through the solution space. This means
//! that it processes goals (both in the original query and in matching rules) from left to right,
//! and eagerly recurses into the first available goal until it is fully resolved. Rules for the
//! same predicate are tried in the order they were added.
//!
//! This strategy is efficient to implement, but it requires some care in how the predicates are
//! set up in order to avoid infinite recursion. A [SolverConfig] can be used to bound the search.

pub mod ast;
pub mod bindings;
pub mod solver;
pub mod textual;
pub mod unify;
pub mod universe;

pub use solver::SolverConfig;
pub use universe::Universe;
