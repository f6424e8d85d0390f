//! Candidate-literal shape enumeration.
//!
//! Grounded on PyFOIL's `learning.itemize`, simplified per the design
//! notes: `itemize` additionally ranks candidates by specificity before
//! the caller's tie-break, which the induction engine's own
//! first-encounter rule already supplies, so that ranking is not
//! reproduced here. One detail of `itemize` *is* carried over exactly
//! because the test scenarios depend on it: a single combination only
//! ever mints one fresh variable name, never a distinct fresh name per
//! new position (`as_terms` never advances its counter once a fresh
//! name has been allocated, so every new slot in one tuple collapses
//! to the same name).

use ahash::AHashSet;

use crate::term::{Term, Variable};

/// Every tuple of length `arity` over `bound ∪ {fresh}` — `fresh` being
/// the one variable name not already in `bound` — that uses at least
/// one position from `bound`. Pure function of its arguments; callers
/// that invoke this repeatedly for the same `(bound, arity)` should
/// memoize externally.
pub fn enumerate(bound: &[Variable], arity: usize) -> Vec<Vec<Term>> {
    let bound = dedup_preserving_order(bound);
    if arity == 0 {
        return Vec::new();
    }

    let fresh = fresh_variable_name(&bound);
    let mut alphabet: Vec<Term> = bound.iter().cloned().map(Term::Variable).collect();
    alphabet.push(Term::Variable(fresh));

    let mut seen: AHashSet<Vec<Term>> = AHashSet::default();
    let mut tuples = Vec::new();
    let mut prefix = Vec::with_capacity(arity);
    generate(&alphabet, arity, &bound, &mut prefix, &mut seen, &mut tuples);
    tuples
}

fn generate(
    alphabet: &[Term],
    remaining: usize,
    bound: &[Variable],
    prefix: &mut Vec<Term>,
    seen: &mut AHashSet<Vec<Term>>,
    out: &mut Vec<Vec<Term>>,
) {
    if remaining == 0 {
        if uses_a_bound_position(prefix, bound) && seen.insert(prefix.clone()) {
            out.push(prefix.clone());
        }
        return;
    }
    for term in alphabet {
        prefix.push(term.clone());
        generate(alphabet, remaining - 1, bound, prefix, seen, out);
        prefix.pop();
    }
}

fn uses_a_bound_position(tuple: &[Term], bound: &[Variable]) -> bool {
    tuple.iter().any(|t| match t {
        Term::Variable(name) => bound.iter().any(|b| b == name),
        Term::Value(_) => false,
    })
}

fn fresh_variable_name(bound: &[Variable]) -> Variable {
    let mut i = 0usize;
    loop {
        let candidate = format!("V{i}");
        if !bound.iter().any(|b| b == &candidate) {
            return candidate;
        }
        i += 1;
    }
}

fn dedup_preserving_order(vars: &[Variable]) -> Vec<Variable> {
    let mut seen = Vec::with_capacity(vars.len());
    for v in vars {
        if !seen.contains(v) {
            seen.push(v.clone());
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(tuples: &[Vec<Term>]) -> Vec<Vec<String>> {
        tuples
            .iter()
            .map(|t| {
                t.iter()
                    .map(|term| match term {
                        Term::Variable(n) => n.clone(),
                        Term::Value(v) => v.to_string(),
                    })
                    .collect()
            })
            .collect()
    }

    #[test]
    fn arity_one_with_single_bound_variable() {
        let result = enumerate(&["X".to_string()], 1);
        assert_eq!(names(&result), vec![vec!["X".to_string()]]);
    }

    #[test]
    fn arity_two_with_single_bound_variable_has_exactly_three_shapes() {
        let result = enumerate(&["X".to_string()], 2);
        let got: AHashSet<Vec<String>> = names(&result).into_iter().collect();
        let expected: AHashSet<Vec<String>> = [
            vec!["X".to_string(), "X".to_string()],
            vec!["X".to_string(), "V0".to_string()],
            vec!["V0".to_string(), "X".to_string()],
        ]
        .into_iter()
        .collect();
        assert_eq!(got.len(), 3);
        assert_eq!(got, expected);
    }

    #[test]
    fn arity_two_with_two_bound_variables_has_exactly_eight_shapes() {
        let result = enumerate(&["X".to_string(), "Y".to_string()], 2);
        assert_eq!(result.len(), 8);
        let forbidden = vec![Term::variable("V0"), Term::variable("V0")];
        assert!(!result.contains(&forbidden));
    }

    #[test]
    fn every_tuple_uses_at_least_one_bound_position() {
        let bound = vec!["X".to_string(), "Y".to_string()];
        for tuple in enumerate(&bound, 3) {
            assert!(uses_a_bound_position(&tuple, &bound));
        }
    }

    #[test]
    fn fresh_name_skips_names_already_bound() {
        let bound = vec!["V0".to_string(), "V1".to_string()];
        let result = enumerate(&bound, 2);
        for tuple in &result {
            for term in tuple {
                if let Term::Variable(name) = term {
                    assert!(name == "V0" || name == "V1" || name == "V2");
                }
            }
        }
    }

    #[test]
    fn is_a_pure_function_of_its_arguments() {
        let a = enumerate(&["X".to_string()], 2);
        let b = enumerate(&["X".to_string()], 2);
        assert_eq!(a, b);
    }
}
