use std::collections::{HashMap, HashSet};

use eframe::egui::{Vec2, vec2};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::util::stable_pair;

use super::LayoutError;

const INITIAL_SCATTER: f32 = 24.0;

/// Identity of a visual entity, stable for as long as its id stays present.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(u64);

#[derive(Clone, Debug)]
pub struct NodeEntity {
    pub entity: EntityId,
    pub id: String,
    pub position: Vec2,
    pub velocity: Vec2,
    /// Held position while the node is being dragged.
    pub pin: Option<Vec2>,
}

#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LinkKind {
    Proposal,
    Duplicate,
    #[serde(rename = "NON-DUPLICATE")]
    NonDuplicate,
    Positive,
    Negative,
    Personal,
    #[default]
    #[serde(other)]
    Undefined,
}

impl LinkKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Proposal => "proposal",
            Self::Duplicate => "duplicate",
            Self::NonDuplicate => "non-duplicate",
            Self::Positive => "positive",
            Self::Negative => "negative",
            Self::Personal => "personal",
            Self::Undefined => "undefined",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkRecord {
    pub source: String,
    pub target: String,
    #[serde(default, rename = "type")]
    pub kind: LinkKind,
}

/// A link whose endpoints were found in the current node set.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct ResolvedLink {
    pub source: usize,
    pub target: usize,
    pub kind: LinkKind,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ReconcileDiff {
    pub created: Vec<String>,
    pub retained: Vec<String>,
    pub removed: Vec<String>,
}

impl ReconcileDiff {
    pub fn is_noop(&self) -> bool {
        self.created.is_empty() && self.removed.is_empty()
    }
}

/// Live node entities in item order. Position `i` is the optimizer index of
/// the `i`-th item.
#[derive(Default)]
pub struct NodeArena {
    nodes: Vec<NodeEntity>,
    index_by_id: HashMap<String, usize>,
    next_entity: u64,
}

pub(super) fn ensure_unique_ids<S: AsRef<str>>(ids: &[S]) -> Result<(), LayoutError> {
    let mut seen = HashSet::with_capacity(ids.len());
    for id in ids {
        if !seen.insert(id.as_ref()) {
            return Err(LayoutError::DuplicateId(id.as_ref().to_owned()));
        }
    }
    Ok(())
}

impl NodeArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[NodeEntity] {
        &self.nodes
    }

    pub(super) fn nodes_mut(&mut self) -> &mut [NodeEntity] {
        &mut self.nodes
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.index_by_id.get(id).copied()
    }

    #[cfg(test)]
    pub fn get(&self, id: &str) -> Option<&NodeEntity> {
        self.index_of(id).map(|index| &self.nodes[index])
    }

    /// Diffs `ids` against the live entities. Retained entities keep their
    /// state and move to their new position in the order; removed ones are
    /// dropped. Nothing changes when `ids` contains a duplicate.
    pub fn reconcile<S: AsRef<str>>(&mut self, ids: &[S]) -> Result<ReconcileDiff, LayoutError> {
        ensure_unique_ids(ids)?;

        let mut prior = std::mem::take(&mut self.nodes)
            .into_iter()
            .map(|node| (node.id.clone(), node))
            .collect::<HashMap<_, _>>();

        let mut diff = ReconcileDiff::default();
        let mut nodes = Vec::with_capacity(ids.len());
        let mut index_by_id = HashMap::with_capacity(ids.len());
        for (index, id) in ids.iter().enumerate() {
            let id = id.as_ref();
            let node = if let Some(node) = prior.remove(id) {
                diff.retained.push(id.to_owned());
                node
            } else {
                diff.created.push(id.to_owned());
                self.make_entity(id)
            };
            index_by_id.insert(id.to_owned(), index);
            nodes.push(node);
        }

        let mut removed = prior.into_keys().collect::<Vec<_>>();
        removed.sort();
        diff.removed = removed;

        self.nodes = nodes;
        self.index_by_id = index_by_id;

        debug!(
            created = diff.created.len(),
            retained = diff.retained.len(),
            removed = diff.removed.len(),
            "reconciled node set"
        );
        Ok(diff)
    }

    /// Maps link endpoints onto node indices. Links touching an absent node
    /// and self-links are dropped.
    pub fn resolve_links(&self, links: &[LinkRecord]) -> Vec<ResolvedLink> {
        let mut resolved = Vec::with_capacity(links.len());
        for link in links {
            let (Some(source), Some(target)) =
                (self.index_of(&link.source), self.index_of(&link.target))
            else {
                debug!(
                    source = %link.source,
                    target = %link.target,
                    "dropping link with an endpoint outside the node set"
                );
                continue;
            };
            if source == target {
                continue;
            }
            resolved.push(ResolvedLink {
                source,
                target,
                kind: link.kind,
            });
        }
        resolved.sort_unstable();
        resolved.dedup();
        resolved
    }

    fn make_entity(&mut self, id: &str) -> NodeEntity {
        let entity = EntityId(self.next_entity);
        self.next_entity += 1;

        let (jx, jy) = stable_pair(id);
        NodeEntity {
            entity,
            id: id.to_owned(),
            position: vec2(jx, jy) * INITIAL_SCATTER,
            velocity: Vec2::ZERO,
            pin: None,
        }
    }
}
