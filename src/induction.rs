//! FOIL sequential-covering induction engine.
//!
//! Grounded on PyFOIL's `learning.learn`/`learning.build`/`learning.choose`,
//! restructured as an outer covering loop over a private inner
//! specialization loop, with clause/literal acceptance logged via
//! `tracing::debug!` the way `storage::observability` does, and
//! iteration-cap/no-progress guards reported via the
//! `eprintln!("⚠️  WARNING: ...")` style `datalog`'s `MAX_ITERATIONS`
//! guard uses.

use std::collections::HashMap;

use crate::model::{Atom, Clause, Example, Label, Literal, Mask, Program};
use crate::rete::{self, World};
use crate::term::{Term, Variable};
use crate::FoilResult;

/// Iteration caps on the outer and inner loops, in the shape of
/// `reasoning::ReasonerConfig`. Both loops have an explicit
/// termination condition (shrinking positive or
/// negative pools); these are a backstop against malformed input that
/// defeats that argument, not part of normal operation.
#[derive(Clone, Copy, Debug)]
pub struct InductionConfig {
    pub max_outer_iterations: usize,
    pub max_inner_iterations: usize,
}

impl Default for InductionConfig {
    fn default() -> Self {
        Self {
            max_outer_iterations: 10_000,
            max_inner_iterations: 10_000,
        }
    }
}

/// Information-theoretic encoding cost of a pool with `p` positive and `n` negative members.
pub fn entropy(p: f64, n: f64) -> f64 {
    if p + n == 0.0 {
        0.0
    } else if p == 0.0 {
        f64::INFINITY
    } else if p == p + n {
        0.0
    } else {
        -(p / (p + n)).log2()
    }
}

/// The number of `p_prime` members also present in `p`.
pub fn common(p: &[Example], p_prime: &[Example]) -> usize {
    p_prime.iter().filter(|e| p.contains(e)).count()
}

/// Information gain of specializing a clause from pool `(p, n)` to `(p_prime, n_prime)`.
pub fn gain(p: &[Example], n: f64, p_prime: &[Example], n_prime: f64) -> f64 {
    common(p, p_prime) as f64
        * (entropy(p.len() as f64, n) - entropy(p_prime.len() as f64, n_prime))
}

/// The tightest upper bound on [`gain`] achievable when a candidate's
/// eventual `N'` is zero.
pub fn max_gain(p: &[Example], n: f64, p_prime: &[Example]) -> f64 {
    common(p, p_prime) as f64 * entropy(p.len() as f64, n)
}

/// Invocation-scoped memoization, created at [`learn`] entry and
/// dropped at return — never a module-level cache.
struct Caches {
    worlds: HashMap<Program, World>,
    enumerations: HashMap<(Vec<Variable>, usize), Vec<Vec<Term>>>,
}

impl Caches {
    fn new() -> Self {
        Self {
            worlds: HashMap::new(),
            enumerations: HashMap::new(),
        }
    }

    fn world_of(&mut self, program: Program) -> FoilResult<World> {
        if let Some(world) = self.worlds.get(&program) {
            return Ok(world.clone());
        }
        let world = rete::evaluate(&program)?;
        self.worlds.insert(program, world.clone());
        Ok(world)
    }

    fn enumerate(&mut self, bound: &[Variable], arity: usize) -> Vec<Vec<Term>> {
        let key = (bound.to_vec(), arity);
        if let Some(tuples) = self.enumerations.get(&key) {
            return tuples.clone();
        }
        let tuples = crate::enumerate::enumerate(bound, arity);
        self.enumerations.insert(key, tuples.clone());
        tuples
    }
}

/// Distinct variables of `target` followed by the distinct variables
/// of `body`, each in order of first appearance — the `V` the
/// candidate enumerator is bound to.
fn bound_variables(target: &Literal, body: &[Literal]) -> Vec<Variable> {
    let mut seen = Vec::new();
    for v in target.atom.variables() {
        if !seen.contains(&v) {
            seen.push(v);
        }
    }
    for literal in body {
        for v in literal.atom.variables() {
            if !seen.contains(&v) {
                seen.push(v);
            }
        }
    }
    seen
}

/// The *uncovered* subset of `examples` under the
/// clause `target :- body`, evaluated against
/// `background ∪ hypothesis ∪ {target :- body}`.
fn covers(
    background: &[Clause],
    hypothesis: &[Clause],
    target: &Literal,
    body: &[Literal],
    examples: &[Example],
    caches: &mut Caches,
) -> FoilResult<Vec<Example>> {
    let mut clauses: Vec<Clause> = background.to_vec();
    for clause in hypothesis {
        if !clauses.contains(clause) {
            clauses.push(clause.clone());
        }
    }
    let candidate = Clause::new(target.clone(), body.to_vec());
    if !clauses.contains(&candidate) {
        clauses.push(candidate);
    }

    let world = caches.world_of(Program::new(clauses))?;

    let mut uncovered = Vec::with_capacity(examples.len());
    for example in examples {
        let grounded = example.ground_target(target);
        let entailed = world.entails(&grounded);
        let is_uncovered = match example.label {
            Label::Positive => !entailed,
            Label::Negative => entailed,
        };
        if is_uncovered {
            uncovered.push(example.clone());
        }
    }
    Ok(uncovered)
}

/// The inner clause-specialization loop.
fn specialize_clause(
    background: &[Clause],
    hypothesis: &[Clause],
    target: &Literal,
    masks: &[Mask],
    positives: &[Example],
    negatives: &[Example],
    config: &InductionConfig,
    caches: &mut Caches,
) -> FoilResult<Clause> {
    let mut body: Vec<Literal> = Vec::new();
    let mut positives = positives.to_vec();
    let mut negatives = negatives.to_vec();
    let mut iterations = 0usize;

    while !negatives.is_empty() {
        iterations += 1;
        if iterations > config.max_inner_iterations {
            eprintln!(
                "⚠️  WARNING: clause specialization exceeded {} iterations",
                config.max_inner_iterations
            );
            eprintln!("⚠️  Returning the PARTIAL clause built so far");
            break;
        }

        let bound = bound_variables(target, &body);
        let mut best: Option<(Literal, Vec<Example>, Vec<Example>, f64)> = None;

        for mask in masks {
            for tuple in caches.enumerate(&bound, mask.arity) {
                let candidate = Literal::new(Atom::new(mask.functor.clone(), tuple), mask.negated);
                if body.contains(&candidate) {
                    continue;
                }

                let mut new_body = body.clone();
                new_body.push(candidate.clone());

                let positives_i =
                    covers(background, hypothesis, target, &new_body, &positives, caches)?;

                if let Some((_, _, _, best_score)) = &best {
                    let upper_bound = max_gain(&positives, negatives.len() as f64, &positives_i);
                    if upper_bound < *best_score {
                        continue;
                    }
                }

                let negatives_i =
                    covers(background, hypothesis, target, &new_body, &negatives, caches)?;
                let score = gain(
                    &positives,
                    negatives.len() as f64,
                    &positives_i,
                    negatives_i.len() as f64,
                );

                let improves = match &best {
                    None => true,
                    Some((_, _, _, best_score)) => score > *best_score,
                };
                if improves {
                    best = Some((candidate, positives_i, negatives_i, score));
                }
            }
        }

        match best {
            None => return Ok(Clause::new(target.clone(), body)),
            Some((literal, positives_i, negatives_i, score)) => {
                tracing::debug!(literal = %literal, gain = score, "accepted literal");
                body.push(literal);
                positives = positives_i;
                negatives = negatives_i;
            }
        }
    }

    Ok(Clause::new(target.clone(), body))
}

/// Learns a sequence of clauses for `target` with the default
/// [`InductionConfig`]. See [`learn_with_config`].
pub fn learn(
    background: &[Clause],
    target: &Literal,
    masks: &[Mask],
    positives: Vec<Example>,
    negatives: Vec<Example>,
) -> FoilResult<Vec<Clause>> {
    learn_with_config(
        background,
        target,
        masks,
        positives,
        negatives,
        InductionConfig::default(),
    )
}

/// `learn(background, target, masks, positives, negatives) → clauses`,
/// the outer sequential-covering loop.
///
/// Fails with [`FoilError::MalformedInput`] if any example's
/// assignment domain does not match `target`'s variables — a
/// precondition violation the engine reports rather than repairs.
pub fn learn_with_config(
    background: &[Clause],
    target: &Literal,
    masks: &[Mask],
    positives: Vec<Example>,
    negatives: Vec<Example>,
    config: InductionConfig,
) -> FoilResult<Vec<Clause>> {
    for example in positives.iter().chain(negatives.iter()) {
        example.validate_against(target)?;
    }

    let mut caches = Caches::new();
    let mut hypothesis: Vec<Clause> = Vec::new();
    let mut positives = positives;
    let mut iterations = 0usize;

    while !positives.is_empty() {
        iterations += 1;
        if iterations > config.max_outer_iterations {
            eprintln!(
                "⚠️  WARNING: sequential covering exceeded {} iterations",
                config.max_outer_iterations
            );
            eprintln!("⚠️  Returning the PARTIAL hypothesis built so far");
            break;
        }

        let clause = specialize_clause(
            background,
            &hypothesis,
            target,
            masks,
            &positives,
            &negatives,
            &config,
            &mut caches,
        )?;
        tracing::debug!(clause = %clause, "accepted clause");
        hypothesis.push(clause);

        let mut clauses: Vec<Clause> = background.to_vec();
        for h in &hypothesis {
            if !clauses.contains(h) {
                clauses.push(h.clone());
            }
        }
        let world = caches.world_of(Program::new(clauses))?;

        let before = positives.len();
        positives.retain(|example| {
            let grounded = example.ground_target(target);
            !world.entails(&grounded)
        });

        if positives.len() == before {
            eprintln!("⚠️  WARNING: sequential covering made no progress; stopping early");
            break;
        }
    }

    Ok(hypothesis)
}
