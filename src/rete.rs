//! RETE-style bottom-up forward evaluator.
//!
//! Builds a discrimination network — Alpha nodes filter individual
//! ground literals, Beta nodes join partial matches, Leaf nodes fire a
//! rule's head and feed it back into the network — and runs it to a
//! fixpoint. Grounded on the arena-of-nodes shape of
//! `reasoning::rete::{AlphaNetwork, BetaNetwork}`: nodes live in a
//! single `Vec` indexed by small integer ids rather than as owned
//! recursive structures, and Alpha nodes are shared across rules by
//! literal structural-equality.

use std::collections::VecDeque;

use ahash::{AHashMap, AHashSet};

use crate::model::{Clause, Literal, Program};
use crate::term::Substitution;
use crate::{FoilError, FoilResult};

/// A partial match: the ground literals consumed so far, and the
/// substitution they produced.
type Payload = (Vec<Literal>, Substitution);

/// Arena index into [`Evaluator::nodes`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
struct NodeId(usize);

enum Node {
    Alpha {
        pattern: Literal,
        children: Vec<NodeId>,
        memory: AHashSet<Payload>,
    },
    Beta {
        left: NodeId,
        right: NodeId,
        children: Vec<NodeId>,
        memory: AHashSet<Payload>,
    },
    Leaf {
        clause: Clause,
        memory: AHashSet<Payload>,
    },
}

struct PendingEvent {
    target: NodeId,
    source: Option<NodeId>,
    facts: Vec<Literal>,
    subst: Substitution,
}

/// Safety guards on the forward evaluator, in the shape of
/// `reasoning::ReasonerConfig`. The ground universe over a finite
/// constant pool is finite, so these are backstops against malformed
/// input, not part of normal operation.
#[derive(Clone, Copy, Debug)]
pub struct EvaluatorConfig {
    /// Upper bound on the number of distinct ground clauses the
    /// evaluator will accumulate before giving up.
    pub max_facts: usize,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            max_facts: 1_000_000,
        }
    }
}

/// The set of ground atoms entailed by a [`Program`].
/// Observable only as a set — iteration order does not affect
/// learning.
#[derive(Clone, Debug, Default)]
pub struct World(AHashSet<Literal>);

impl World {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, literal: &Literal) -> bool {
        self.0.contains(literal)
    }

    /// Whether `literal` holds under this world's negation-as-failure
    /// semantics: a negative literal holds when its positive
    /// complement is absent; a positive literal holds when it is
    /// present.
    pub fn entails(&self, literal: &Literal) -> bool {
        if literal.negated {
            !self.0.contains(&literal.complement())
        } else {
            self.0.contains(literal)
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Literal> {
        self.0.iter()
    }
}

/// Computes the ground world entailed by `program` with the default
/// [`EvaluatorConfig`].
pub fn evaluate(program: &Program) -> FoilResult<World> {
    evaluate_with_config(program, EvaluatorConfig::default())
}

/// Computes the ground world entailed by `program`, rebuilding the
/// discrimination network from scratch — it is never shared across
/// invocations.
pub fn evaluate_with_config(program: &Program, config: EvaluatorConfig) -> FoilResult<World> {
    let mut engine = Evaluator::new(config);

    for clause in program.rules() {
        engine.compile_rule(clause);
    }

    let mut queue: VecDeque<PendingEvent> = VecDeque::new();
    for fact in program.facts() {
        engine.admit(fact.clone(), &mut queue)?;
    }

    while let Some(event) = queue.pop_front() {
        engine.dispatch(event, &mut queue)?;
    }

    let mut world = AHashSet::default();
    for clause in &engine.agenda {
        world.insert(clause.head.clone());
    }

    tracing::debug!(facts = world.len(), clauses = engine.agenda.len(), "forward evaluator reached fixpoint");
    Ok(World(world))
}

struct Evaluator {
    nodes: Vec<Node>,
    root_children: Vec<NodeId>,
    alpha_index: AHashMap<Literal, NodeId>,
    beta_index: AHashMap<(NodeId, NodeId), NodeId>,
    agenda: Vec<Clause>,
    /// Heads already admitted to `agenda`, keyed on the head alone so a
    /// fact reachable via more than one derivation path is only ever
    /// counted and re-injected once.
    known_heads: AHashSet<Literal>,
    config: EvaluatorConfig,
}

impl Evaluator {
    fn new(config: EvaluatorConfig) -> Self {
        Self {
            nodes: Vec::new(),
            root_children: Vec::new(),
            alpha_index: AHashMap::default(),
            beta_index: AHashMap::default(),
            agenda: Vec::new(),
            known_heads: AHashSet::default(),
            config,
        }
    }

    /// Admits `clause` if its head is genuinely new: records the head,
    /// appends the clause to the agenda, and re-injects the head at the
    /// root. A clause whose head has already been seen — via a fact or
    /// any prior derivation path — is a no-op, so `max_facts` bounds the
    /// number of distinct ground heads, not the number of derivation
    /// paths that produce them.
    fn admit(&mut self, clause: Clause, queue: &mut VecDeque<PendingEvent>) -> FoilResult<()> {
        if !self.known_heads.insert(clause.head.clone()) {
            return Ok(());
        }

        let head = clause.head.clone();
        self.agenda.push(clause);
        if self.known_heads.len() > self.config.max_facts {
            eprintln!(
                "⚠️  WARNING: forward evaluator exceeded {} distinct facts",
                self.config.max_facts
            );
            return Err(FoilError::ResourceLimit(format!(
                "forward evaluator exceeded {} distinct facts",
                self.config.max_facts
            )));
        }

        self.notify_root(head, queue);
        Ok(())
    }

    fn compile_rule(&mut self, clause: &Clause) {
        let mut chain: Option<NodeId> = None;
        for literal in &clause.body {
            let alpha = self.get_or_create_alpha(literal.clone());
            chain = Some(match chain {
                None => alpha,
                Some(prev) => self.get_or_create_beta(prev, alpha),
            });
        }
        if let Some(parent) = chain {
            self.add_leaf(clause.clone(), parent);
        }
    }

    fn get_or_create_alpha(&mut self, pattern: Literal) -> NodeId {
        if let Some(&id) = self.alpha_index.get(&pattern) {
            return id;
        }
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node::Alpha {
            pattern: pattern.clone(),
            children: Vec::new(),
            memory: AHashSet::default(),
        });
        self.alpha_index.insert(pattern, id);
        self.root_children.push(id);
        id
    }

    fn get_or_create_beta(&mut self, left: NodeId, right: NodeId) -> NodeId {
        if let Some(&id) = self.beta_index.get(&(left, right)) {
            return id;
        }
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node::Beta {
            left,
            right,
            children: Vec::new(),
            memory: AHashSet::default(),
        });
        self.beta_index.insert((left, right), id);
        self.add_child(left, id);
        self.add_child(right, id);
        id
    }

    fn add_leaf(&mut self, clause: Clause, parent: NodeId) {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node::Leaf {
            clause,
            memory: AHashSet::default(),
        });
        self.add_child(parent, id);
    }

    fn add_child(&mut self, parent: NodeId, child: NodeId) {
        match &mut self.nodes[parent.0] {
            Node::Alpha { children, .. } | Node::Beta { children, .. } => children.push(child),
            Node::Leaf { .. } => unreachable!("leaf nodes are terminal"),
        }
    }

    fn notify_root(&mut self, fact: Literal, queue: &mut VecDeque<PendingEvent>) {
        for &child in &self.root_children {
            queue.push_back(PendingEvent {
                target: child,
                source: None,
                facts: vec![fact.clone()],
                subst: Substitution::new(),
            });
        }
    }

    fn dispatch(
        &mut self,
        event: PendingEvent,
        queue: &mut VecDeque<PendingEvent>,
    ) -> FoilResult<()> {
        enum Kind {
            Alpha,
            Beta,
            Leaf,
        }
        let kind = match &self.nodes[event.target.0] {
            Node::Alpha { .. } => Kind::Alpha,
            Node::Beta { .. } => Kind::Beta,
            Node::Leaf { .. } => Kind::Leaf,
        };
        match kind {
            Kind::Alpha => {
                self.process_alpha(event.target, &event.facts[0], queue);
                Ok(())
            }
            Kind::Beta => {
                let source = event
                    .source
                    .expect("beta nodes are only notified by a parent");
                self.process_beta(event.target, source, event.facts, event.subst, queue)
            }
            Kind::Leaf => self.process_leaf(event.target, event.facts, event.subst, queue),
        }
    }

    fn process_alpha(&mut self, id: NodeId, fact: &Literal, queue: &mut VecDeque<PendingEvent>) {
        let pattern = match &self.nodes[id.0] {
            Node::Alpha { pattern, .. } => pattern.clone(),
            _ => unreachable!(),
        };
        let Some(subst) = pattern.unify(fact) else {
            return;
        };
        let payload: Payload = (vec![fact.clone()], subst.clone());
        let inserted = match &mut self.nodes[id.0] {
            Node::Alpha { memory, .. } => memory.insert(payload),
            _ => unreachable!(),
        };
        if inserted {
            let children = match &self.nodes[id.0] {
                Node::Alpha { children, .. } => children.clone(),
                _ => unreachable!(),
            };
            for child in children {
                queue.push_back(PendingEvent {
                    target: child,
                    source: Some(id),
                    facts: vec![fact.clone()],
                    subst: subst.clone(),
                });
            }
        }
    }

    fn process_beta(
        &mut self,
        id: NodeId,
        source: NodeId,
        facts: Vec<Literal>,
        subst: Substitution,
        queue: &mut VecDeque<PendingEvent>,
    ) -> FoilResult<()> {
        let (left, right) = match &self.nodes[id.0] {
            Node::Beta { left, right, .. } => (*left, *right),
            _ => unreachable!(),
        };
        let from_left = source == left;
        let opposite = if from_left { right } else { left };
        let opposite_memory: Vec<Payload> = match &self.nodes[opposite.0] {
            Node::Alpha { memory, .. } | Node::Beta { memory, .. } => {
                memory.iter().cloned().collect()
            }
            Node::Leaf { .. } => unreachable!("a leaf cannot be a beta parent"),
        };

        let mut fresh = Vec::new();
        for (other_facts, other_subst) in opposite_memory {
            let (merged_facts, merged_subst) = if from_left {
                (
                    combine_facts(&facts, &other_facts),
                    merge_substitutions(&subst, &other_subst),
                )
            } else {
                (
                    combine_facts(&other_facts, &facts),
                    merge_substitutions(&other_subst, &subst),
                )
            };
            if let Some(merged_subst) = merged_subst {
                fresh.push((merged_facts, merged_subst));
            }
        }

        let mut to_propagate = Vec::new();
        for payload in fresh {
            let inserted = match &mut self.nodes[id.0] {
                Node::Beta { memory, .. } => memory.insert(payload.clone()),
                _ => unreachable!(),
            };
            if inserted {
                to_propagate.push(payload);
            }
        }

        if !to_propagate.is_empty() {
            let children = match &self.nodes[id.0] {
                Node::Beta { children, .. } => children.clone(),
                _ => unreachable!(),
            };
            for (payload_facts, payload_subst) in to_propagate {
                for &child in &children {
                    queue.push_back(PendingEvent {
                        target: child,
                        source: Some(id),
                        facts: payload_facts.clone(),
                        subst: payload_subst.clone(),
                    });
                }
            }
        }

        Ok(())
    }

    fn process_leaf(
        &mut self,
        id: NodeId,
        facts: Vec<Literal>,
        subst: Substitution,
        queue: &mut VecDeque<PendingEvent>,
    ) -> FoilResult<()> {
        let payload: Payload = (facts.clone(), subst.clone());
        let inserted = match &mut self.nodes[id.0] {
            Node::Leaf { memory, .. } => memory.insert(payload),
            _ => unreachable!(),
        };
        if !inserted {
            return Ok(());
        }

        let clause = match &self.nodes[id.0] {
            Node::Leaf { clause, .. } => clause.clone(),
            _ => unreachable!(),
        };
        let head = clause.head.substitute(&subst);
        let derived = Clause::new(head, facts);

        self.admit(derived, queue)
    }
}

fn combine_facts(left: &[Literal], right: &[Literal]) -> Vec<Literal> {
    let mut combined = Vec::with_capacity(left.len() + right.len());
    combined.extend_from_slice(left);
    combined.extend_from_slice(right);
    combined
}

fn merge_substitutions(a: &Substitution, b: &Substitution) -> Option<Substitution> {
    let mut merged = a.clone();
    for (k, v) in b {
        match merged.get(k) {
            Some(existing) if existing != v => return None,
            Some(_) => {}
            None => {
                merged.insert(k.clone(), v.clone());
            }
        }
    }
    Some(merged)
}
