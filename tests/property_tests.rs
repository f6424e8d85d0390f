//! Property-based tests for core invariants: unification
//! soundness, simplification idempotence, and entropy boundaries.

use proptest::prelude::*;

use foil::induction::entropy;
use foil::term::{simplify, substitute_term, unify, Substitution, Term, Value};

fn variable_name() -> impl Strategy<Value = String> {
    prop_oneof![Just("X"), Just("Y"), Just("Z"), Just("W")].prop_map(|s| s.to_string())
}

fn ground_term() -> impl Strategy<Value = Term> {
    any::<i64>().prop_map(|i| Term::Value(Value::Int(i)))
}

fn arbitrary_term() -> impl Strategy<Value = Term> {
    prop_oneof![ground_term(), variable_name().prop_map(Term::variable),]
}

fn arbitrary_substitution() -> impl Strategy<Value = Substitution> {
    prop::collection::vec((variable_name(), arbitrary_term()), 0..6).prop_map(|pairs| {
        let mut subst = Substitution::new();
        for (k, v) in pairs {
            if Term::variable(k.clone()) != v {
                subst.insert(k, v);
            }
        }
        subst
    })
}

proptest! {
    /// `simplify(simplify(s)) == simplify(s)` for arbitrary `s`.
    #[test]
    fn simplify_is_idempotent(subst in arbitrary_substitution()) {
        let once = simplify(&subst);
        let twice = simplify(&once);
        prop_assert_eq!(once, twice);
    }

    /// If `unify(a, b, {}) = Some(s)`, then `a` and `b` agree under `s`
    /// once simplified.
    #[test]
    fn unification_is_sound(a in arbitrary_term(), b in arbitrary_term()) {
        if let Some(raw) = unify(&a, &b, &Substitution::new()) {
            let subst = simplify(&raw);
            prop_assert_eq!(substitute_term(&a, &subst), substitute_term(&b, &subst));
        }
    }

    /// No two-hop alias chains survive simplification: a value that is
    /// itself a variable must be a representative that is never also a
    /// key (re-substituting it is a no-op).
    #[test]
    fn simplified_aliases_never_chain(subst in arbitrary_substitution()) {
        let simplified = simplify(&subst);
        for value in simplified.values() {
            if let Term::Variable(name) = value {
                prop_assert!(!simplified.contains_key(name));
                prop_assert_eq!(substitute_term(value, &simplified), value.clone());
            }
        }
    }

    #[test]
    fn entropy_is_never_negative(p in 0u16..200, n in 0u16..200) {
        prop_assert!(entropy(p as f64, n as f64) >= 0.0);
    }

    #[test]
    fn entropy_of_pure_positive_pool_is_zero(p in 1u16..200) {
        prop_assert_eq!(entropy(p as f64, 0.0), 0.0);
    }

    #[test]
    fn entropy_of_pure_negative_pool_is_infinite(n in 1u16..200) {
        prop_assert_eq!(entropy(0.0, n as f64), f64::INFINITY);
    }
}
