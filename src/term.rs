//! Terms, substitutions, and unification.
//!
//! A [`Term`] is either a ground [`Value`] or a [`Variable`] name. A
//! [`Substitution`] is a finite mapping from variable names to terms,
//! kept in a [`BTreeMap`] so that iteration order is always the
//! canonical (sorted-by-key) order the design notes require for
//! printing and structural hashing.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// A ground value: boolean, integer, real, or string atom.
#[derive(Clone, Debug)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Real(f64),
    Str(String),
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Real(a), Value::Real(b)) => a.to_bits() == b.to_bits(),
            (Value::Str(a), Value::Str(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl std::hash::Hash for Value {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        match self {
            Value::Bool(b) => {
                0u8.hash(state);
                b.hash(state);
            }
            Value::Int(i) => {
                1u8.hash(state);
                i.hash(state);
            }
            Value::Real(r) => {
                2u8.hash(state);
                r.to_bits().hash(state);
            }
            Value::Str(s) => {
                3u8.hash(state);
                s.hash(state);
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", normalize(self))
    }
}

/// Canonical printable form of a ground value, ported from
/// `unification.py::normalize`: booleans and numbers print as
/// themselves, strings already shaped like a bare atom or already
/// quoted print unchanged, anything else is quoted and escaped.
/// [`Atom`](crate::model::Atom) and [`Literal`](crate::model::Literal)
/// equality and hashing are defined over this form (via their `Display`
/// strings) rather than over the raw enum structure, so two terms that
/// print identically always compare and hash equal.
pub fn normalize(value: &Value) -> String {
    match value {
        Value::Bool(b) => (if *b { "TRUE" } else { "FALSE" }).to_string(),
        Value::Int(i) => i.to_string(),
        Value::Real(r) => r.to_string(),
        Value::Str(s) => {
            if is_bare_atom(s) || is_pre_quoted(s) {
                s.clone()
            } else {
                format!("\"{}\"", s.replace('"', "\\\""))
            }
        }
    }
}

/// Whether `s` already begins and ends with the same quote character,
/// and so should be left alone rather than re-quoted.
fn is_pre_quoted(s: &str) -> bool {
    ['"', '\''].iter().any(|&q| {
        s.starts_with(q) && s.ends_with(q)
    })
}

/// A variable name, matching `[_A-Z][A-Za-z0-9_]*`.
pub type Variable = String;

/// Either a ground [`Value`] or a [`Variable`] reference.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Term {
    Value(Value),
    Variable(Variable),
}

impl Term {
    /// Builds a ground term.
    pub fn value(v: Value) -> Self {
        Term::Value(v)
    }

    /// Builds a variable term. Panics in debug builds if `name` does
    /// not match the variable grammar — callers constructing terms
    /// from trusted model builders are expected to pass valid names.
    pub fn variable(name: impl Into<String>) -> Self {
        let name = name.into();
        debug_assert!(
            is_variable_name(&name),
            "not a valid variable name: {name}"
        );
        Term::Variable(name)
    }

    pub fn is_variable(&self) -> bool {
        matches!(self, Term::Variable(_))
    }

    pub fn is_ground(&self) -> bool {
        matches!(self, Term::Value(_))
    }

    pub fn as_variable(&self) -> Option<&str> {
        match self {
            Term::Variable(name) => Some(name.as_str()),
            Term::Value(_) => None,
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Value(v) => write!(f, "{v}"),
            Term::Variable(name) => write!(f, "{name}"),
        }
    }
}

/// A finite mapping from [`Variable`] to [`Term`].
pub type Substitution = BTreeMap<Variable, Term>;

/// `true` iff `name` matches the variable grammar `[_A-Z][A-Za-z0-9_]*`.
pub fn is_variable_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_ascii_uppercase() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn is_bare_atom(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_lowercase())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Whether `term` is a variable reference.
pub fn is_variable(term: &Term) -> bool {
    term.is_variable()
}

/// Whether `term` is fully ground.
pub fn is_ground(term: &Term) -> bool {
    term.is_ground()
}

/// Extends `subst` so that `var` and `term` are equal under it, or
/// fails. This is the single-pair step folded across an atom's
/// argument positions by [`crate::model::Atom::unify`]; the result is
/// not simplified — callers finalize with [`simplify`].
pub fn unify(var: &Term, term: &Term, subst: &Substitution) -> Option<Substitution> {
    if var == term {
        return Some(subst.clone());
    }

    let (var, term) = if term.is_variable() {
        (term, var)
    } else {
        (var, term)
    };

    let var_name = var.as_variable()?;

    if let Some(term_name) = term.as_variable() {
        equate(var_name, term_name, subst)
    } else {
        assign(var_name, term, subst)
    }
}

fn assign(var: &str, value: &Term, subst: &Substitution) -> Option<Substitution> {
    match subst.get(var) {
        None => {
            let mut extended = subst.clone();
            extended.insert(var.to_string(), value.clone());
            Some(extended)
        }
        Some(bound) if bound == value => Some(subst.clone()),
        Some(Term::Value(_)) => None,
        Some(Term::Variable(label)) => {
            let label = label.clone();
            let mut extended = subst.clone();
            for v in extended.values_mut() {
                if matches!(v, Term::Variable(l) if *l == label) {
                    *v = value.clone();
                }
            }
            extended.insert(var.to_string(), value.clone());
            Some(extended)
        }
    }
}

fn equate(var1: &str, var2: &str, subst: &Substitution) -> Option<Substitution> {
    let term1 = subst.get(var1).cloned();
    let term2 = subst.get(var2).cloned();
    let ground1 = matches!(term1, Some(Term::Value(_)));
    let ground2 = matches!(term2, Some(Term::Value(_)));

    if ground1 && ground2 {
        return if term1 == term2 {
            Some(subst.clone())
        } else {
            None
        };
    }

    let mut mentions: std::collections::BTreeSet<Variable> = std::collections::BTreeSet::new();
    mentions.insert(var1.to_string());
    mentions.insert(var2.to_string());
    for (k, v) in subst.iter() {
        for t in [&term1, &term2] {
            if let Some(Term::Variable(label)) = t {
                if matches!(v, Term::Variable(l) if l == label) {
                    mentions.insert(k.clone());
                }
            }
        }
    }

    let label = if ground1 {
        term1.unwrap()
    } else if ground2 {
        term2.unwrap()
    } else {
        let joined: String = mentions.iter().cloned().collect::<Vec<_>>().join("");
        Term::Variable(joined)
    };

    let mut extended = subst.clone();
    for k in &mentions {
        extended.insert(k.clone(), label.clone());
    }
    Some(extended)
}

/// Canonicalizes a substitution: each equivalence class of variables
/// aliased to one another collapses to a single representative (the
/// lexicographically smallest member); ground bindings take
/// precedence over variable-to-variable aliases; a variable never
/// appears as both key and value.
///
/// Implemented as a union-find over variable names, an alternative to
/// the source's label-rewriting approach, so that
/// `simplify(simplify(s)) == simplify(s)` holds even when `s` is
/// already in canonical form — the source's direct port of this
/// function is not idempotent on already-simplified input.
pub fn simplify(subst: &Substitution) -> Substitution {
    let mut parent: HashMap<Variable, Variable> = HashMap::new();

    fn ensure(parent: &mut HashMap<Variable, Variable>, x: &str) {
        parent
            .entry(x.to_string())
            .or_insert_with(|| x.to_string());
    }

    fn find(parent: &mut HashMap<Variable, Variable>, x: &str) -> Variable {
        let mut root = x.to_string();
        while let Some(p) = parent.get(&root) {
            if p == &root {
                break;
            }
            root = p.clone();
        }
        let mut cur = x.to_string();
        while let Some(p) = parent.get(&cur).cloned() {
            if p == cur {
                break;
            }
            parent.insert(cur, root.clone());
            cur = p;
        }
        root
    }

    fn union(parent: &mut HashMap<Variable, Variable>, a: &str, b: &str) {
        ensure(parent, a);
        ensure(parent, b);
        let ra = find(parent, a);
        let rb = find(parent, b);
        if ra == rb {
            return;
        }
        if ra < rb {
            parent.insert(rb, ra);
        } else {
            parent.insert(ra, rb);
        }
    }

    for (k, v) in subst.iter() {
        ensure(&mut parent, k);
        if let Term::Variable(label) = v {
            ensure(&mut parent, label);
            union(&mut parent, k, label);
        }
    }

    let mut ground: HashMap<Variable, Value> = HashMap::new();
    for (k, v) in subst.iter() {
        if let Term::Value(val) = v {
            let root = find(&mut parent, k);
            ground.entry(root).or_insert_with(|| val.clone());
        }
    }

    let mut members: BTreeMap<Variable, Vec<Variable>> = BTreeMap::new();
    for k in subst.keys() {
        let root = find(&mut parent, k);
        members.entry(root).or_default().push(k.clone());
    }

    let mut result: Substitution = BTreeMap::new();
    for (root, names) in members {
        if let Some(g) = ground.get(&root) {
            for name in names {
                result.insert(name, Term::Value(g.clone()));
            }
        } else {
            for name in names {
                if name != root {
                    result.insert(name, Term::Variable(root.clone()));
                }
            }
        }
    }
    result
}

/// Applies `subst` to `term`: a bound variable is replaced by its
/// binding, an unbound variable or a ground term is left alone.
pub fn substitute_term(term: &Term, subst: &Substitution) -> Term {
    match term {
        Term::Variable(name) => subst.get(name).cloned().unwrap_or_else(|| term.clone()),
        Term::Value(_) => term.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var(name: &str) -> Term {
        Term::variable(name)
    }

    fn int(i: i64) -> Term {
        Term::Value(Value::Int(i))
    }

    #[test]
    fn ground_and_variable_classification() {
        assert!(is_variable(&var("X")));
        assert!(!is_ground(&var("X")));
        assert!(is_ground(&int(1)));
        assert!(!is_variable(&int(1)));
    }

    #[test]
    fn variable_name_grammar() {
        assert!(is_variable_name("X"));
        assert!(is_variable_name("_foo"));
        assert!(is_variable_name("X1_2"));
        assert!(!is_variable_name("x"));
        assert!(!is_variable_name("1X"));
    }

    #[test]
    fn assign_binds_unbound_variable() {
        let subst = Substitution::new();
        let result = unify(&var("X"), &int(1), &subst).unwrap();
        assert_eq!(result.get("X"), Some(&int(1)));
    }

    #[test]
    fn assign_conflicting_ground_values_fails() {
        let mut subst = Substitution::new();
        subst.insert("X".to_string(), int(1));
        assert!(unify(&var("X"), &int(2), &subst).is_none());
    }

    #[test]
    fn equate_two_unbound_variables_shares_a_label() {
        let subst = Substitution::new();
        let result = unify(&var("X"), &var("Y"), &subst).unwrap();
        let simplified = simplify(&result);
        assert_eq!(simplified.len(), 1);
        let (key, value) = simplified.iter().next().unwrap();
        assert!(key == "Y");
        assert_eq!(value, &var("X"));
    }

    #[test]
    fn simplify_prefers_ground_bindings_over_aliases() {
        let mut subst = Substitution::new();
        subst.insert("Y".to_string(), var("X"));
        subst.insert("Z".to_string(), var("X"));
        subst.insert("X".to_string(), int(7));
        let simplified = simplify(&subst);
        assert_eq!(simplified.get("X"), Some(&int(7)));
        assert_eq!(simplified.get("Y"), Some(&int(7)));
        assert_eq!(simplified.get("Z"), Some(&int(7)));
    }

    #[test]
    fn simplify_is_idempotent() {
        let mut subst = Substitution::new();
        subst.insert("X".to_string(), var("XYZ"));
        subst.insert("Y".to_string(), var("XYZ"));
        subst.insert("Z".to_string(), var("XYZ"));
        let once = simplify(&subst);
        let twice = simplify(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn unification_soundness_after_simplify() {
        let mut subst = Substitution::new();
        subst.insert("Y".to_string(), var("X"));
        let simplified = simplify(&subst);
        assert_eq!(substitute_term(&var("X"), &simplified), var("X"));
        assert_eq!(substitute_term(&var("Y"), &simplified), var("X"));
    }

    #[test]
    fn normalize_prints_bare_atoms_and_numbers_unquoted() {
        assert_eq!(normalize(&Value::Bool(true)), "TRUE");
        assert_eq!(normalize(&Value::Int(7)), "7");
        assert_eq!(normalize(&Value::Str("edge".to_string())), "edge");
    }

    #[test]
    fn normalize_quotes_strings_that_are_not_bare_atoms() {
        assert_eq!(normalize(&Value::Str("has space".to_string())), "\"has space\"");
        assert_eq!(
            normalize(&Value::Str("say \"hi\"".to_string())),
            "\"say \\\"hi\\\"\""
        );
    }

    #[test]
    fn normalize_leaves_already_quoted_strings_alone() {
        assert_eq!(normalize(&Value::Str("\"already quoted\"".to_string())), "\"already quoted\"");
    }
}
