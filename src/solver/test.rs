use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use super::*;
use crate::ast::{self, *};
use crate::universe::Universe;

#[test]
fn genealogy() {
    // GOAL:
    /*

    parent(alice, carol).
    parent(bob, carol).

    parent(carol, eve).
    parent(dave, eve).

    parent(carol, faithe).
    parent(dave, faithe).

    grandparent(X, Y) :- parent(X, Z), parent(Z, Y).

    siblings(X, Y) :- parent(Z, X), parent(Z, Y).

    */

    let mut u = Universe::new();

    let alice = u.intern("alice");
    let bob = u.intern("bob");
    let carol = u.intern("carol");
    let dave = u.intern("dave");
    let eve = u.intern("eve");
    let faithe = u.intern("faithe");

    let parent = u.intern("parent");
    let grandparent = u.intern("grandparent");
    let siblings = u.intern("siblings");

    for (p, c) in [
        (alice, carol),
        (bob, carol),
        (carol, eve),
        (dave, eve),
        (carol, faithe),
        (dave, faithe),
    ] {
        u.add_rule(Rule::fact(parent, vec![p.into(), c.into()]))
            .unwrap();
    }

    u.add_rule(forall(|[p, q, r]| {
        Rule::fact(grandparent, vec![p.into(), r.into()])
            .when(parent, vec![p.into(), q.into()])
            .when(parent, vec![q.into(), r.into()])
    }))
    .unwrap();

    u.add_rule(forall(|[p, c1, c2]| {
        Rule::fact(siblings, vec![c1.into(), c2.into()])
            .when(parent, vec![p.into(), c1.into()])
            .when(parent, vec![p.into(), c2.into()])
    }))
    .unwrap();

    // query all known grandparents of eve
    let solutions = u
        .solutions(&exists(|[x]| Query::single(grandparent, vec![x.into(), eve.into()])))
        .unwrap();
    assert_eq!(
        solutions,
        vec![vec![Some(alice.into())], vec![Some(bob.into())]]
    );

    // query all grandchildren of bob
    let solutions = u
        .solutions(&exists(|[x]| Query::single(grandparent, vec![bob.into(), x.into()])))
        .unwrap();
    assert_eq!(
        solutions,
        vec![vec![Some(eve.into())], vec![Some(faithe.into())]]
    );

    // query all siblings of eve
    let solutions = u
        .solutions(&exists(|[x]| Query::single(siblings, vec![eve.into(), x.into()])))
        .unwrap();
    assert_eq!(
        solutions,
        vec![
            // one solution for each path taken
            vec![Some(eve.into())],
            vec![Some(faithe.into())],
            vec![Some(eve.into())],
            vec![Some(faithe.into())],
        ]
    );
}

fn peano() -> (Universe, Sym, Sym, Sym, Sym) {
    // is_natural(z).
    // is_natural(s(X)) :- is_natural(X).
    // add(X, z, X) :- is_natural(X).
    // add(X, s(Y), s(Z)) :- add(X, Y, Z).
    let mut u = Universe::new();
    let s = u.intern("s");
    let z = u.intern("z");
    let is_natural = u.intern("is_natural");
    let add = u.intern("add");

    u.add_rule(Rule::fact(is_natural, vec![z.into()])).unwrap();
    u.add_rule(forall(|[x]| {
        Rule::fact(is_natural, vec![ast::app(s, vec![x.into()])]).when(is_natural, vec![x.into()])
    }))
    .unwrap();
    u.add_rule(forall(|[x]| {
        Rule::fact(add, vec![x.into(), z.into(), x.into()]).when(is_natural, vec![x.into()])
    }))
    .unwrap();
    u.add_rule(forall(|[x, y, r]| {
        Rule::fact(
            add,
            vec![
                x.into(),
                ast::app(s, vec![y.into()]),
                ast::app(s, vec![r.into()]),
            ],
        )
        .when(add, vec![x.into(), y.into(), r.into()])
    }))
    .unwrap();
    (u, s, z, is_natural, add)
}

fn nat(s: Sym, z: Sym, n: usize) -> Term {
    (0..n).fold(z.into(), |t, _| ast::app(s, vec![t]))
}

#[test]
fn arithmetic() {
    let (u, s, z, is_natural, add) = peano();

    // the first natural numbers, stopping after three
    let mut found = vec![];
    let committed = u
        .evaluate_query(
            &exists(|[x]| Query::single(is_natural, vec![x.into()])),
            |solution| {
                found.push(solution.get(0));
                found.len() == 3
            },
            || panic!("there are infinitely many natural numbers"),
        )
        .unwrap();
    assert!(committed);
    assert_eq!(
        found,
        vec![Some(nat(s, z, 0)), Some(nat(s, z, 1)), Some(nat(s, z, 2))]
    );

    // compute 2 + 1
    let solutions = u
        .solutions(&exists(|[x]| {
            Query::single(add, vec![nat(s, z, 2), nat(s, z, 1), x.into()])
        }))
        .unwrap();
    assert_eq!(solutions, vec![vec![Some(nat(s, z, 3))]]);

    // compute 3 - 2
    let solutions = u
        .solutions(&exists(|[x]| {
            Query::single(add, vec![x.into(), nat(s, z, 2), nat(s, z, 3)])
        }))
        .unwrap();
    assert_eq!(solutions, vec![vec![Some(nat(s, z, 1))]]);

    // all ways of splitting 3
    let solutions = u
        .solutions(&exists(|[x, y]| {
            Query::single(add, vec![x.into(), y.into(), nat(s, z, 3)])
        }))
        .unwrap();
    assert_eq!(
        solutions,
        (0..=3)
            .map(|i| vec![Some(nat(s, z, 3 - i)), Some(nat(s, z, i))])
            .collect::<Vec<_>>()
    );
}

#[test]
fn royal_succession() {
    let mut u = Universe::new();
    let father = u.intern("father");
    let grandfather = u.intern("grandfather");
    let line = ["haakon", "olav", "harald", "hakon_magnus", "ingrid_alexandra"]
        .map(|name| u.intern(name));
    for pair in line.windows(2) {
        u.assert_fact(AppTerm::new(father, vec![pair[0].into(), pair[1].into()]))
            .unwrap();
    }

    let query = exists(|[x]| Query::single(father, vec![x.into(), line[2].into()]));
    assert_eq!(u.solutions(&query).unwrap(), vec![vec![Some(line[1].into())]]);

    // grandfather(X, Y) :- father(X, Z), father(Z, Y).
    u.assert_rule(
        3,
        AppTerm::new(grandfather, vec![local(0), local(1)]),
        vec![
            app(father, vec![local(0), local(2)]),
            app(father, vec![local(2), local(1)]),
        ],
    )
    .unwrap();

    let query = exists(|[x]| Query::single(grandfather, vec![line[2].into(), x.into()]));
    assert_eq!(u.solutions(&query).unwrap(), vec![vec![Some(line[4].into())]]);
}

#[test]
fn nested_structures_close_over_their_frame() {
    // f(X) :- g(h(i(X))).
    // g(H) :- k(H).
    // k(h(i(Y))) :- num(Y).
    // num(5).
    let mut u = Universe::new();
    let [f, g, h, i, k, num] = ["f", "g", "h", "i", "k", "num"].map(|name| u.intern(name));

    u.add_rule(forall(|[x]| {
        Rule::fact(f, vec![x.into()]).when(g, vec![app(h, vec![app(i, vec![x.into()])])])
    }))
    .unwrap();
    u.add_rule(forall(|[hh]| Rule::fact(g, vec![hh.into()]).when(k, vec![hh.into()])))
        .unwrap();
    u.add_rule(forall(|[y]| {
        Rule::fact(k, vec![app(h, vec![app(i, vec![y.into()])])]).when(num, vec![y.into()])
    }))
    .unwrap();
    u.add_rule(Rule::fact(num, vec![int(5)])).unwrap();

    let yes = u.solutions(&Query::single(f, vec![int(5)])).unwrap();
    assert_eq!(yes, vec![vec![]]);
    let no = u.solutions(&Query::single(f, vec![int(6)])).unwrap();
    assert!(no.is_empty());

    let solutions = u
        .solutions(&exists(|[x]| Query::single(f, vec![x.into()])))
        .unwrap();
    assert_eq!(solutions, vec![vec![Some(int(5))]]);
}

#[test]
fn failed_alternative_leaves_no_bindings_behind() {
    // true.
    // eq(Z, Z) :- true.
    // p(X, Y) :- eq(X, a), eq(Y, b), missing(X).
    // p(X, Y) :- eq(X, c).
    let mut u = Universe::new();
    let [truth, eq, p, missing, a, b, c] =
        ["true", "eq", "p", "missing", "a", "b", "c"].map(|n| u.intern(n));

    u.add_rule(Rule::fact(truth, vec![])).unwrap();
    u.add_rule(forall(|[z]| {
        Rule::fact(eq, vec![z.into(), z.into()]).when(truth, vec![])
    }))
    .unwrap();
    u.add_rule(forall(|[x, y]| {
        Rule::fact(p, vec![x.into(), y.into()])
            .when(eq, vec![x.into(), a.into()])
            .when(eq, vec![y.into(), b.into()])
            .when(missing, vec![x.into()])
    }))
    .unwrap();
    u.add_rule(forall(|[x, y]| {
        Rule::fact(p, vec![x.into(), y.into()]).when(eq, vec![x.into(), c.into()])
    }))
    .unwrap();

    // Y was bound to b by the first alternative and must be free again in the second.
    let solutions = u
        .solutions(&exists(|[x, y]| Query::single(p, vec![x.into(), y.into()])))
        .unwrap();
    assert_eq!(solutions, vec![vec![Some(c.into()), None]]);
}

#[test]
fn enumerates_each_solution_once_then_fails() {
    let mut u = Universe::new();
    let color = u.intern("color");
    let colors = ["red", "green", "blue"].map(|n| u.intern(n));
    for c in colors {
        u.assert_fact(AppTerm::new(color, vec![c.into()])).unwrap();
    }

    let query = exists(|[x]| Query::single(color, vec![x.into()]));
    let mut seen = vec![];
    let mut failed = false;
    let committed = u
        .evaluate_query(
            &query,
            |solution| {
                seen.push(solution.get(0).unwrap());
                false
            },
            || failed = true,
        )
        .unwrap();

    assert!(!committed);
    assert!(failed);
    assert_eq!(
        seen,
        colors.iter().map(|c| Term::Atom(*c)).collect::<Vec<_>>()
    );
}

#[test]
fn committing_stops_the_search() {
    let mut u = Universe::new();
    let color = u.intern("color");
    for name in ["red", "green", "blue"] {
        let c = u.intern(name);
        u.assert_fact(AppTerm::new(color, vec![c.into()])).unwrap();
    }

    let mut calls = 0;
    let committed = u
        .evaluate_query(
            &exists(|[x]| Query::single(color, vec![x.into()])),
            |_| {
                calls += 1;
                true
            },
            || panic!("must not fail after a commit"),
        )
        .unwrap();
    assert!(committed);
    assert_eq!(calls, 1);
}

#[test]
fn unknown_predicates_fail() {
    let mut u = Universe::new();
    let nothing = u.intern("nothing");
    let mut failed = false;
    let found = u
        .evaluate_query(
            &Query::single(nothing, vec![int(1)]),
            |_| panic!("no rules, no solutions"),
            || failed = true,
        )
        .unwrap();
    assert!(!found);
    assert!(failed);
}

#[test]
fn atomic_goals_are_vacuously_true() {
    let mut u = Universe::new();
    let foo = u.intern("foo");
    let query = Query::new(vec![Term::Atom(foo), int(0), local(0)], {
        let mut scope = VarScope::new();
        scope.get_or_insert("X");
        scope
    });
    let solutions = u.solutions(&query).unwrap();
    assert_eq!(solutions, vec![vec![None]]);
}

#[test]
fn empty_query_succeeds_once() {
    let u = Universe::new();
    assert_eq!(u.solutions(&Query::empty()).unwrap(), vec![vec![]]);
}

#[test]
fn shared_free_variables_are_reported_consistently() {
    // same(pair(A, A)) :- any.
    // any.
    let mut u = Universe::new();
    let [same, pair, any] = ["same", "pair", "any"].map(|n| u.intern(n));
    u.add_rule(forall(|[a]| {
        Rule::fact(same, vec![app(pair, vec![a.into(), a.into()])]).when(any, vec![])
    }))
    .unwrap();
    u.add_rule(Rule::fact(any, vec![])).unwrap();

    let solutions = u
        .solutions(&exists(|[x]| Query::single(same, vec![x.into()])))
        .unwrap();
    assert_eq!(
        solutions,
        vec![vec![Some(app(pair, vec![local(0), local(0)]))]]
    );
}

#[test]
fn solution_reports_named_variables() {
    let mut u = Universe::new();
    let [p, a] = ["p", "a"].map(|n| u.intern(n));
    u.assert_fact(AppTerm::new(p, vec![a.into(), int(1)])).unwrap();

    let mut scope = VarScope::new();
    let x = scope.get_or_insert("X");
    let w = scope.insert_wildcard();
    let query = Query::new(vec![app(p, vec![x.into(), w.into()])], scope);

    let mut reported = vec![];
    u.evaluate_query(
        &query,
        |solution| {
            assert_eq!(solution.len(), 2);
            assert_eq!(solution.name(1), None);
            reported = solution
                .iter()
                .map(|(name, value)| (name.to_owned(), value))
                .collect::<Vec<_>>();
            true
        },
        || {},
    )
    .unwrap();
    assert_eq!(reported, vec![("X".to_owned(), Some(Term::Atom(a)))]);
}

#[test]
fn solution_ignores_indices_outside_the_query() {
    let mut u = Universe::new();
    let [p, q, r] = ["p", "q", "r"].map(|n| u.intern(n));
    u.assert_fact(AppTerm::new(p, vec![int(1)])).unwrap();
    u.assert_fact(AppTerm::new(q, vec![int(2)])).unwrap();
    // r(A) :- p(A).
    u.add_rule(forall(|[a]| {
        Rule::fact(r, vec![a.into()]).when(p, vec![a.into()])
    }))
    .unwrap();

    // GOAL: r(X), q(Y).
    let query = exists(|[x, y]| Query::single(r, vec![x.into()]).and(q, vec![y.into()]));
    let mut checked = false;
    u.evaluate_query(
        &query,
        |solution| {
            assert_eq!(solution.len(), 2);
            assert_eq!(solution.get(0), Some(int(1)));
            assert_eq!(solution.get(1), Some(int(2)));
            // the frame of `r` is still live right behind the query frame
            assert_eq!(solution.get(2), None);
            assert_eq!(solution.get(5), None);
            assert_eq!(solution.name(5), None);
            assert_eq!(solution.values().len(), 2);
            checked = true;
            true
        },
        || {},
    )
    .unwrap();
    assert!(checked);
}

#[test]
fn query_slots_are_checked() {
    let mut u = Universe::new();
    let p = u.intern("p");
    let query = Query::single(p, vec![local(2)]);
    let err = u.evaluate_query(&query, |_| true, || {}).unwrap_err();
    assert_eq!(
        err,
        QueryError::Rule(RuleError::SlotOutOfRange { slot: 2, locals: 0 })
    );
}

fn looping() -> (Universe, Query) {
    // loop(X) :- loop(X).
    let mut u = Universe::new();
    let lp = u.intern("loop");
    u.add_rule(forall(|[x]| Rule::fact(lp, vec![x.into()]).when(lp, vec![x.into()])))
        .unwrap();
    let query = exists(|[x]| Query::single(lp, vec![x.into()]));
    (u, query)
}

#[test]
fn depth_limit_aborts_runaway_recursion() {
    let (u, query) = looping();
    let config = SolverConfig::new().with_max_depth(64);
    let err = u
        .evaluate_query_with(
            &config,
            &query,
            |_| panic!("loop never succeeds"),
            || panic!("an abort is not a failure"),
        )
        .unwrap_err();
    assert_eq!(err, QueryError::DepthLimitExceeded { limit: 64 });
}

#[test]
fn depth_limit_allows_shallow_proofs() {
    let (u, s, z, _, add) = peano();
    let config = SolverConfig::new().with_max_depth(16);
    let query = exists(|[x]| Query::single(add, vec![nat(s, z, 2), nat(s, z, 2), x.into()]));
    let mut answer = None;
    let found = u
        .evaluate_query_with(
            &config,
            &query,
            |solution| {
                answer = solution.get(0);
                true
            },
            || {},
        )
        .unwrap();
    assert!(found);
    assert_eq!(answer, Some(nat(s, z, 4)));
}

#[test]
fn interrupt_flag_aborts_search() {
    let (u, query) = looping();
    let flag = Arc::new(AtomicBool::new(true));
    let config = SolverConfig::new().with_interrupt(flag);
    let err = u
        .evaluate_query_with(&config, &query, |_| true, || {})
        .unwrap_err();
    assert_eq!(err, QueryError::Interrupted);
}
