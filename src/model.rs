//! Atom / Literal / Clause / Program / Example.

use std::collections::BTreeMap;
use std::fmt;

use smallvec::SmallVec;

use crate::term::{self, simplify, substitute_term, Substitution, Term, Value, Variable};
use crate::{FoilError, FoilResult};

/// A functor applied to an ordered, possibly-empty sequence of terms.
///
/// Equality and hashing are defined over the canonical `Display` string
/// (each term's [`term::normalize`]d form joined by the functor), not
/// over the raw field structure, so two atoms that print identically
/// always compare and hash equal.
#[derive(Clone, Debug)]
pub struct Atom {
    pub functor: String,
    pub terms: SmallVec<[Term; 4]>,
}

impl PartialEq for Atom {
    fn eq(&self, other: &Self) -> bool {
        self.to_string() == other.to_string()
    }
}

impl Eq for Atom {}

impl std::hash::Hash for Atom {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.to_string().hash(state);
    }
}

impl Atom {
    pub fn new(functor: impl Into<String>, terms: Vec<Term>) -> Self {
        Self {
            functor: functor.into(),
            terms: SmallVec::from_vec(terms),
        }
    }

    pub fn arity(&self) -> usize {
        self.terms.len()
    }

    pub fn is_ground(&self) -> bool {
        self.terms.iter().all(Term::is_ground)
    }

    /// Distinct variables appearing in this atom's terms, in order of
    /// first appearance.
    pub fn variables(&self) -> Vec<Variable> {
        let mut seen = Vec::new();
        for t in &self.terms {
            if let Term::Variable(name) = t {
                if !seen.contains(name) {
                    seen.push(name.clone());
                }
            }
        }
        seen
    }

    /// Unifies two atoms: fails on functor or arity mismatch,
    /// otherwise folds [`term::unify`] over the paired term sequences
    /// and simplifies the result.
    pub fn unify(&self, other: &Atom) -> Option<Substitution> {
        if self.functor != other.functor || self.terms.len() != other.terms.len() {
            return None;
        }

        let mut subst = Substitution::new();
        for (a, b) in self.terms.iter().zip(other.terms.iter()) {
            subst = term::unify(a, b, &subst)?;
        }
        Some(simplify(&subst))
    }

    pub fn substitute(&self, subst: &Substitution) -> Atom {
        Atom {
            functor: self.functor.clone(),
            terms: self.terms.iter().map(|t| substitute_term(t, subst)).collect(),
        }
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.terms.is_empty() {
            write!(f, "{}", self.functor)
        } else {
            write!(
                f,
                "{}({})",
                self.functor,
                self.terms
                    .iter()
                    .map(|t| t.to_string())
                    .collect::<Vec<_>>()
                    .join(",")
            )
        }
    }
}

/// A (possibly negated) atom.
///
/// Equality and hashing are defined over the canonical `Display` string
/// (the negation marker plus the atom's own canonical form), the same
/// single-canonical-string-form rule [`Atom`] follows.
#[derive(Clone, Debug)]
pub struct Literal {
    pub atom: Atom,
    pub negated: bool,
}

impl PartialEq for Literal {
    fn eq(&self, other: &Self) -> bool {
        self.to_string() == other.to_string()
    }
}

impl Eq for Literal {}

impl std::hash::Hash for Literal {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.to_string().hash(state);
    }
}

impl Literal {
    pub fn new(atom: Atom, negated: bool) -> Self {
        Self { atom, negated }
    }

    pub fn positive(atom: Atom) -> Self {
        Self::new(atom, false)
    }

    pub fn negative(atom: Atom) -> Self {
        Self::new(atom, true)
    }

    pub fn functor(&self) -> &str {
        &self.atom.functor
    }

    pub fn arity(&self) -> usize {
        self.atom.arity()
    }

    pub fn is_ground(&self) -> bool {
        self.atom.is_ground()
    }

    /// The (functor, arity, negation) signature used by the candidate
    /// enumerator.
    pub fn mask(&self) -> Mask {
        Mask {
            functor: self.atom.functor.clone(),
            arity: self.atom.arity(),
            negated: self.negated,
        }
    }

    /// Flips the negation flag.
    pub fn complement(&self) -> Literal {
        Literal::new(self.atom.clone(), !self.negated)
    }

    pub fn unify(&self, other: &Literal) -> Option<Substitution> {
        if self.negated != other.negated {
            return None;
        }
        self.atom.unify(&other.atom)
    }

    pub fn substitute(&self, subst: &Substitution) -> Literal {
        Literal::new(self.atom.substitute(subst), self.negated)
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negated {
            write!(f, "~{}", self.atom)
        } else {
            write!(f, "{}", self.atom)
        }
    }
}

/// The (functor, arity, negation) schema from which candidate literals
/// are generated.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Mask {
    pub functor: String,
    pub arity: usize,
    pub negated: bool,
}

impl Mask {
    pub fn new(functor: impl Into<String>, arity: usize, negated: bool) -> Self {
        Self {
            functor: functor.into(),
            arity,
            negated,
        }
    }
}

/// A head literal plus a (possibly empty) ordered body of literals.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Clause {
    pub head: Literal,
    pub body: Vec<Literal>,
}

impl Clause {
    pub fn new(head: Literal, body: Vec<Literal>) -> Self {
        Self { head, body }
    }

    pub fn fact(head: Literal) -> Self {
        Self::new(head, Vec::new())
    }

    /// A clause with empty body whose head is ground.
    pub fn is_fact(&self) -> bool {
        self.body.is_empty()
    }

    pub fn is_ground(&self) -> bool {
        self.head.is_ground() && self.body.iter().all(Literal::is_ground)
    }

    pub fn literals(&self) -> impl Iterator<Item = &Literal> {
        std::iter::once(&self.head).chain(self.body.iter())
    }

    pub fn substitute(&self, subst: &Substitution) -> Clause {
        Clause {
            head: self.head.substitute(subst),
            body: self.body.iter().map(|l| l.substitute(subst)).collect(),
        }
    }
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.body.is_empty() {
            write!(f, "{}.", self.head)
        } else {
            write!(
                f,
                "{} :- {}.",
                self.head,
                self.body
                    .iter()
                    .map(|l| l.to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            )
        }
    }
}

/// One resolution step: the clause index used, the (sub)goal it
/// resolved, and the substitution produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Step {
    pub clause_index: usize,
    pub literal: Literal,
    pub substitution: Substitution,
}

/// The sequence of [`Step`]s produced by [`Program::resolve`].
pub type Derivation = Vec<Step>;

/// A multiset of clauses, duplicates collapsed by structural equality.
///
/// `PartialEq`/`Eq`/`Hash` are structural over the deduped clause
/// sequence, which makes `Program` usable directly as a cache key for
/// ground-world memoization — two calls that build the
/// same clause list in the same order hit the cache; different
/// orderings of an otherwise-identical program simply miss it.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Program {
    clauses: Vec<Clause>,
}

impl Program {
    pub fn new(clauses: impl IntoIterator<Item = Clause>) -> Self {
        let mut deduped: Vec<Clause> = Vec::new();
        for clause in clauses {
            if !deduped.contains(&clause) {
                deduped.push(clause);
            }
        }
        Self { clauses: deduped }
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    pub fn facts(&self) -> impl Iterator<Item = &Clause> {
        self.clauses.iter().filter(|c| c.is_fact())
    }

    pub fn rules(&self) -> impl Iterator<Item = &Clause> {
        self.clauses.iter().filter(|c| !c.is_fact())
    }

    /// SLD-style resolution for a ground query: depth-first,
    /// first-matching-clause, committing to the first clause whose
    /// head unifies (no backtracking across clause choice once a body
    /// subgoal fails). Fails with [`FoilError::MalformedInput`] if
    /// `query` or any body subgoal it produces is non-ground.
    pub fn resolve(&self, query: &Literal) -> FoilResult<Option<Derivation>> {
        if !query.is_ground() {
            return Err(FoilError::MalformedInput(format!(
                "resolve: query must be ground: {query}"
            )));
        }

        for (index, clause) in self.clauses.iter().enumerate() {
            let subst = match clause.head.unify(query) {
                Some(s) => s,
                None => continue,
            };

            let mut derivation = vec![Step {
                clause_index: index,
                literal: query.clone(),
                substitution: subst.clone(),
            }];

            if clause.body.is_empty() {
                return Ok(Some(derivation));
            }

            let mut failed = false;
            for body_literal in &clause.body {
                let substituted = body_literal.substitute(&subst);
                match self.resolve(&substituted)? {
                    Some(sub_derivation) => derivation.extend(sub_derivation),
                    None => {
                        failed = true;
                        break;
                    }
                }
            }

            return Ok(if failed { None } else { Some(derivation) });
        }

        Ok(None)
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            self.clauses
                .iter()
                .map(|c| c.to_string())
                .collect::<Vec<_>>()
                .join("\n")
        )
    }
}

/// Whether an [`Example`] witnesses the target relation (`POSITIVE`)
/// or its negation (`NEGATIVE`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Label {
    Positive,
    Negative,
}

/// A ground instance of the target relation plus its [`Label`].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Example {
    pub assignment: BTreeMap<Variable, Value>,
    pub label: Label,
}

impl Example {
    pub fn new(assignment: BTreeMap<Variable, Value>, label: Label) -> Self {
        Self { assignment, label }
    }

    pub fn positive(assignment: BTreeMap<Variable, Value>) -> Self {
        Self::new(assignment, Label::Positive)
    }

    pub fn negative(assignment: BTreeMap<Variable, Value>) -> Self {
        Self::new(assignment, Label::Negative)
    }

    /// Fails with [`FoilError::MalformedInput`] if `self`'s assignment
    /// domain does not equal `target`'s variable set exactly.
    pub fn validate_against(&self, target: &Literal) -> FoilResult<()> {
        let expected = target.atom.variables();
        if expected.len() != self.assignment.len()
            || !expected.iter().all(|v| self.assignment.contains_key(v))
        {
            return Err(FoilError::MalformedInput(format!(
                "example assignment {:?} does not match target variables {:?}",
                self.assignment.keys().collect::<Vec<_>>(),
                expected
            )));
        }
        Ok(())
    }

    /// Substitutes this example's assignment into `target`, producing
    /// the ground atom it witnesses (or refutes).
    pub fn ground_target(&self, target: &Literal) -> Literal {
        let subst: Substitution = self
            .assignment
            .iter()
            .map(|(k, v)| (k.clone(), Term::Value(v.clone())))
            .collect();
        target.substitute(&subst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn atom(functor: &str, terms: Vec<Term>) -> Atom {
        Atom::new(functor, terms)
    }

    fn var(name: &str) -> Term {
        Term::variable(name)
    }

    fn val(i: i64) -> Term {
        Term::Value(Value::Int(i))
    }

    #[test]
    fn atom_unify_fails_on_arity_mismatch() {
        let a = atom("edge", vec![val(0)]);
        let b = atom("edge", vec![val(0), val(1)]);
        assert!(a.unify(&b).is_none());
    }

    #[test]
    fn atom_unify_fails_on_functor_mismatch() {
        let a = atom("edge", vec![val(0), val(1)]);
        let b = atom("path", vec![val(0), val(1)]);
        assert!(a.unify(&b).is_none());
    }

    #[test]
    fn atom_unify_binds_variables() {
        let pattern = atom("edge", vec![var("X"), var("Y")]);
        let fact = atom("edge", vec![val(0), val(1)]);
        let subst = pattern.unify(&fact).unwrap();
        assert_eq!(subst.get("X"), Some(&val(0)));
        assert_eq!(subst.get("Y"), Some(&val(1)));
    }

    #[test]
    fn atom_equality_is_defined_over_the_canonical_printed_form() {
        // `Real(1.0)` and `Int(1)` are distinct `Term`s but print
        // identically, so atoms built from them compare and hash equal
        // under the canonical-string rule rather than raw structure.
        let a = atom("p", vec![val(1)]);
        let b = atom("p", vec![Term::Value(Value::Real(1.0))]);
        assert_eq!(a.to_string(), b.to_string());
        assert_eq!(a, b);

        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};
        let mut ha = DefaultHasher::new();
        let mut hb = DefaultHasher::new();
        a.hash(&mut ha);
        b.hash(&mut hb);
        assert_eq!(ha.finish(), hb.finish());
    }

    #[test]
    fn literal_equality_includes_negation() {
        let a = Literal::positive(atom("p", vec![val(1)]));
        let b = Literal::negative(atom("p", vec![val(1)]));
        assert_ne!(a, b);
        assert_eq!(a.complement(), b);
    }

    #[test]
    fn clause_display_matches_surface_syntax() {
        let head = Literal::positive(atom("path", vec![var("X"), var("Y")]));
        let body = vec![Literal::positive(atom("edge", vec![var("X"), var("Y")]))];
        let clause = Clause::new(head, body);
        assert_eq!(clause.to_string(), "path(X,Y) :- edge(X,Y).");
    }

    #[test]
    fn program_dedups_structurally_equal_clauses() {
        let fact = Clause::fact(Literal::positive(atom("edge", vec![val(0), val(1)])));
        let program = Program::new(vec![fact.clone(), fact.clone()]);
        assert_eq!(program.clauses().len(), 1);
    }

    #[test]
    fn resolve_rejects_non_ground_query() {
        let program = Program::new(vec![]);
        let query = Literal::positive(atom("edge", vec![var("X"), val(1)]));
        assert!(program.resolve(&query).is_err());
    }

    #[test]
    fn resolve_finds_fact_derivation() {
        let fact = Clause::fact(Literal::positive(atom("edge", vec![val(0), val(1)])));
        let program = Program::new(vec![fact]);
        let query = Literal::positive(atom("edge", vec![val(0), val(1)]));
        let derivation = program.resolve(&query).unwrap();
        assert!(derivation.is_some());
    }

    #[test]
    fn example_validates_against_target_variables() {
        let target = Literal::positive(atom("path", vec![var("X"), var("Y")]));
        let mut assignment = BTreeMap::new();
        assignment.insert("X".to_string(), Value::Int(0));
        assignment.insert("Y".to_string(), Value::Int(1));
        let example = Example::positive(assignment);
        assert!(example.validate_against(&target).is_ok());

        let mut bad = BTreeMap::new();
        bad.insert("X".to_string(), Value::Int(0));
        let bad_example = Example::positive(bad);
        assert!(bad_example.validate_against(&target).is_err());
    }
}
