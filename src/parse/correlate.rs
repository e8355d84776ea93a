//! Grouping of flat query captures into logical declarations.
//!
//! A query over a file returns captures for every annotation, decorator or call
//! it matched, interleaved. Each analyzer picks a set of *boundary* node kinds
//! (`annotation`, `decorator`, `call_expression`, ...) and the correlator
//! assigns every capture to its nearest enclosing boundary node, so that the
//! captures of one declaration end up in one [`CaptureGroup`].
//!
//! Same-label captures within a group are resolved by source position, never
//! by arrival order: `First` keeps the earliest node, `Last` the latest, and
//! `Collect` keeps all of them (deduplicated, in source order).

use crate::parse::query::Capture;
use std::collections::{BTreeMap, HashMap};
use tree_sitter::Node;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelPolicy {
    First,
    Last,
    Collect,
}

/// The captures belonging to one boundary node.
#[derive(Debug, Clone)]
pub struct CaptureGroup<'tree> {
    pub boundary: Node<'tree>,
    captures: HashMap<String, Vec<Node<'tree>>>,
}

impl<'tree> CaptureGroup<'tree> {
    fn new(boundary: Node<'tree>) -> Self {
        Self {
            boundary,
            captures: HashMap::new(),
        }
    }

    /// Byte offset of the boundary node.
    pub fn key(&self) -> usize {
        self.boundary.start_byte()
    }

    /// The (single or first) node captured under `label`.
    pub fn get(&self, label: &str) -> Option<Node<'tree>> {
        self.captures.get(label).and_then(|nodes| nodes.first().copied())
    }

    /// Every node kept under `label`, in source order.
    pub fn all(&self, label: &str) -> &[Node<'tree>] {
        self.captures.get(label).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has(&self, label: &str) -> bool {
        self.captures.contains_key(label)
    }

    fn insert(&mut self, label: &str, node: Node<'tree>, policy: LabelPolicy) {
        let slot = self.captures.entry(label.to_string()).or_default();
        match policy {
            LabelPolicy::First => match slot.first() {
                Some(existing) if existing.start_byte() <= node.start_byte() => {}
                _ => *slot = vec![node],
            },
            LabelPolicy::Last => match slot.first() {
                Some(existing) if existing.start_byte() >= node.start_byte() => {}
                _ => *slot = vec![node],
            },
            LabelPolicy::Collect => {
                if slot.iter().all(|n| n.id() != node.id()) {
                    let pos = slot.partition_point(|n| n.start_byte() <= node.start_byte());
                    slot.insert(pos, node);
                }
            }
        }
    }
}

/// Groups captures by their nearest enclosing node of a boundary kind.
pub struct Correlator<'a> {
    boundary_kinds: &'a [&'a str],
    policies: Vec<(&'a str, LabelPolicy)>,
    default_policy: LabelPolicy,
}

impl<'a> Correlator<'a> {
    pub fn new(boundary_kinds: &'a [&'a str]) -> Self {
        Self {
            boundary_kinds,
            policies: Vec::new(),
            default_policy: LabelPolicy::First,
        }
    }

    /// Override the duplicate-label policy for one label.
    pub fn with_policy(mut self, label: &'a str, policy: LabelPolicy) -> Self {
        self.policies.push((label, policy));
        self
    }

    /// Policy applied to labels without an explicit override.
    pub fn with_default_policy(mut self, policy: LabelPolicy) -> Self {
        self.default_policy = policy;
        self
    }

    /// Nearest node (the node itself included) whose kind is a boundary kind.
    pub fn boundary_of<'tree>(&self, node: Node<'tree>) -> Option<Node<'tree>> {
        let mut current = Some(node);
        while let Some(n) = current {
            if self.boundary_kinds.contains(&n.kind()) {
                return Some(n);
            }
            current = n.parent();
        }
        None
    }

    /// Build one group per boundary node, ordered by boundary position.
    ///
    /// Captures with no enclosing boundary are structurally outside any
    /// declaration of interest and are dropped.
    pub fn correlate<'tree>(&self, captures: &[Capture<'tree>]) -> Vec<CaptureGroup<'tree>> {
        let mut groups: BTreeMap<(usize, usize), CaptureGroup<'tree>> = BTreeMap::new();
        for capture in captures {
            let Some(boundary) = self.boundary_of(capture.node) else {
                continue;
            };
            groups
                .entry((boundary.start_byte(), boundary.end_byte()))
                .or_insert_with(|| CaptureGroup::new(boundary))
                .insert(&capture.label, capture.node, self.policy_for(&capture.label));
        }
        groups.into_values().collect()
    }

    fn policy_for(&self, label: &str) -> LabelPolicy {
        self.policies
            .iter()
            .find(|(l, _)| *l == label)
            .map(|(_, p)| *p)
            .unwrap_or(self.default_policy)
    }
}
