//! FOIL (First-Order Inductive Learner) rule-induction engine.
//!
//! Given a background theory of definite clauses and a target relation
//! described by positive and negative examples, [`induction::learn`]
//! produces a sequence of clauses whose bodies, evaluated against the
//! background theory extended with the clauses learned so far, cover
//! every positive example and no negative example.
//!
//! The crate is a library: surface syntax, CLI wrappers, and
//! memoization decorators are external collaborators. It exposes four
//! layers, leaves first:
//!
//! - [`term`] — terms and substitutions, unification.
//! - [`model`] — Atom / Literal / Clause / Program / Example.
//! - [`rete`] — RETE-style forward-chaining materializer.
//! - [`enumerate`] — candidate-literal shape enumeration.
//! - [`induction`] — the sequential-covering learning loop.

#![warn(rust_2018_idioms)]

/// Terms, substitutions, and unification.
pub mod term;
/// Atom / Literal / Clause / Program / Example model.
pub mod model;
/// RETE-style bottom-up forward evaluator.
pub mod rete;
/// Candidate-literal shape enumeration.
pub mod enumerate;
/// FOIL sequential-covering induction engine.
pub mod induction;

pub use model::{Atom, Clause, Example, Label, Literal, Mask, Program};
pub use term::{Substitution, Term, Value, Variable};

/// Errors surfaced by the engine.
///
/// [`FoilError::UnificationFailure`] and "no progress" conditions are
/// not represented here — those are routine outcomes conveyed by
/// `Option`/early return, never constructed as errors (see the crate's
/// design notes on error taxonomy).
#[derive(Debug, thiserror::Error)]
pub enum FoilError {
    /// An example's assignment domain does not match the target's
    /// variables, a resolution query was non-ground, or an atom was
    /// used with inconsistent arity across occurrences.
    #[error("malformed input: {0}")]
    MalformedInput(String),

    /// A loop-safety guard (iteration count, fact count, substitution
    /// count) was tripped. Results up to the trip point are still
    /// returned by the caller where applicable; this variant is raised
    /// only where no partial result can be returned safely.
    #[error("resource limit exceeded: {0}")]
    ResourceLimit(String),

    /// An invariant the engine relies on was violated, e.g. a
    /// substitution survived simplification with a cycle, or an arena
    /// index referenced a node that no longer exists.
    #[error("internal invariant broken: {0}")]
    InternalInvariantBroken(String),
}

/// Result alias used throughout the crate.
pub type FoilResult<T> = Result<T, FoilError>;
