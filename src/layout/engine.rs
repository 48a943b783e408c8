use eframe::egui::Vec2;
use tracing::{debug, info};

use super::reconcile::ensure_unique_ids;
use super::{
    DistanceMatrix, LayoutError, LinkRecord, NodeArena, ReconcileDiff, ResolvedLink, Simulator,
    SimulatorParams, TsneOptimizer, TsneParams,
};

/// Couples the optimizer and the simulator over one node set.
///
/// Within a tick the optimizer always steps before the simulator reads the
/// embedding. Once a drag has switched the embedding pull off the optimizer
/// is left idle.
pub struct LayoutEngine {
    nodes: NodeArena,
    link_records: Vec<LinkRecord>,
    links: Vec<ResolvedLink>,
    optimizer: TsneOptimizer,
    simulator: Simulator,
}

impl LayoutEngine {
    pub fn new(tsne: TsneParams, simulator: SimulatorParams) -> Self {
        Self {
            nodes: NodeArena::new(),
            link_records: Vec::new(),
            links: Vec::new(),
            optimizer: TsneOptimizer::new(tsne),
            simulator: Simulator::new(simulator),
        }
    }

    pub fn nodes(&self) -> &NodeArena {
        &self.nodes
    }

    pub fn links(&self) -> &[ResolvedLink] {
        &self.links
    }

    pub fn simulator(&self) -> &Simulator {
        &self.simulator
    }

    pub fn optimizer(&self) -> &TsneOptimizer {
        &self.optimizer
    }

    /// Installs a new item set. Validation happens before anything is
    /// touched, so an error leaves the previous layout running as it was.
    pub fn set_items<S: AsRef<str>>(
        &mut self,
        ids: &[S],
        matrix: DistanceMatrix,
        links: &[LinkRecord],
    ) -> Result<ReconcileDiff, LayoutError> {
        ensure_unique_ids(ids)?;
        if matrix.len() != ids.len() {
            return Err(LayoutError::DimensionMismatch {
                matrix: matrix.len(),
                items: ids.len(),
            });
        }

        let diff = self.nodes.reconcile(ids)?;
        self.optimizer.initialize(&matrix);
        for node in self.nodes.nodes_mut() {
            node.velocity = Vec2::ZERO;
            node.pin = None;
        }
        self.link_records = links.to_vec();
        self.links = self.nodes.resolve_links(&self.link_records);
        self.simulator.restart_default();

        info!(
            items = self.nodes.len(),
            links = self.links.len(),
            created = diff.created.len(),
            removed = diff.removed.len(),
            "layout re-initialized"
        );
        Ok(diff)
    }

    /// Adds links to the current node set without disturbing the layout.
    /// Returns how many more links are drawn than before.
    pub fn add_links(&mut self, links: &[LinkRecord]) -> usize {
        let before = self.links.len();
        self.link_records.extend_from_slice(links);
        self.links = self.nodes.resolve_links(&self.link_records);
        debug!(
            added = self.links.len() - before,
            offered = links.len(),
            "links added to layout"
        );
        self.links.len() - before
    }

    /// Runs one frame; returns whether the layout is still moving.
    pub fn tick(&mut self, elapsed_secs: f32) -> bool {
        if !self.simulator.is_active(&self.nodes) {
            return false;
        }

        let embedding = if self.simulator.pull_enabled() {
            self.optimizer.step();
            self.optimizer.current_embedding()
        } else {
            None
        };
        self.simulator.tick(&mut self.nodes, embedding, elapsed_secs)
    }

    pub fn restart(&mut self) {
        self.simulator.restart_default();
    }

    pub fn stop(&mut self) {
        self.simulator.stop();
    }

    pub fn start_drag(&mut self, index: usize) -> bool {
        self.simulator.start_drag(&mut self.nodes, index)
    }

    pub fn drag_to(&mut self, index: usize, position: Vec2) {
        self.simulator.drag_to(&mut self.nodes, index, position);
    }

    pub fn end_drag(&mut self, index: usize) {
        self.simulator.end_drag(&mut self.nodes, index);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::layout::LinkKind;

    const FRAME: f32 = 1.0 / 60.0;

    fn engine() -> LayoutEngine {
        LayoutEngine::new(TsneParams::default(), SimulatorParams::default())
    }

    fn chain() -> DistanceMatrix {
        DistanceMatrix::from_condensed(3, vec![1.0, 2.0, 1.0]).unwrap()
    }

    #[test]
    fn optimizer_steps_once_per_tick() {
        let mut engine = engine();
        engine.set_items(&["a", "b", "c"], chain(), &[]).unwrap();
        for _ in 0..5 {
            engine.tick(FRAME);
        }
        assert_eq!(engine.optimizer().iteration(), 5);
    }

    #[test]
    fn rejected_input_keeps_previous_state() {
        let mut engine = engine();
        engine.set_items(&["a", "b", "c"], chain(), &[]).unwrap();
        for _ in 0..12 {
            engine.tick(FRAME);
        }
        let positions = engine
            .nodes()
            .nodes()
            .iter()
            .map(|node| node.position)
            .collect::<Vec<_>>();

        let mismatch = engine.set_items(&["a", "b"], chain(), &[]);
        assert_eq!(
            mismatch,
            Err(LayoutError::DimensionMismatch {
                matrix: 3,
                items: 2
            })
        );
        let duplicate = engine.set_items(&["a", "a", "b"], chain(), &[]);
        assert_eq!(duplicate, Err(LayoutError::DuplicateId("a".to_owned())));

        assert_eq!(engine.optimizer().iteration(), 12);
        let after = engine
            .nodes()
            .nodes()
            .iter()
            .map(|node| node.position)
            .collect::<Vec<_>>();
        assert_eq!(positions, after);
    }

    #[test]
    fn drag_disables_pull_and_idles_the_optimizer() {
        let mut engine = engine();
        engine.set_items(&["a", "b", "c"], chain(), &[]).unwrap();
        engine.tick(FRAME);
        assert!(engine.start_drag(1));
        let held = engine.nodes().nodes()[1].position;
        for _ in 0..20 {
            engine.tick(FRAME);
            assert_eq!(engine.nodes().nodes()[1].position, held);
        }
        assert_eq!(engine.optimizer().iteration(), 1);

        engine.end_drag(1);
        assert!(!engine.simulator().pull_enabled());
        engine.restart();
        assert!(engine.simulator().pull_enabled());
    }

    #[test]
    fn new_item_set_restarts_layout_and_clears_pins() {
        let mut engine = engine();
        engine.set_items(&["a", "b", "c"], chain(), &[]).unwrap();
        engine.start_drag(0);
        engine.stop();

        let links = [
            LinkRecord {
                source: "b".to_owned(),
                target: "d".to_owned(),
                kind: LinkKind::Duplicate,
            },
            LinkRecord {
                source: "b".to_owned(),
                target: "x".to_owned(),
                kind: LinkKind::Duplicate,
            },
        ];
        let matrix = DistanceMatrix::from_condensed(3, vec![1.0, 1.0, 1.0]).unwrap();
        let diff = engine.set_items(&["d", "b", "c"], matrix, &links).unwrap();
        assert_eq!(diff.created, vec!["d"]);
        assert_eq!(diff.removed, vec!["a"]);
        assert!(engine.simulator().is_running());
        assert!(engine.simulator().pull_enabled());
        assert!(engine.nodes().nodes().iter().all(|node| node.pin.is_none()));
        assert_eq!(engine.links().len(), 1);
        assert_eq!(engine.optimizer().iteration(), 0);
    }

    fn record(source: &str, target: &str, kind: LinkKind) -> LinkRecord {
        LinkRecord {
            source: source.to_owned(),
            target: target.to_owned(),
            kind,
        }
    }

    #[test]
    fn links_follow_reordered_indices() {
        let mut engine = engine();
        let links = [
            record("a", "b", LinkKind::Positive),
            record("b", "c", LinkKind::Duplicate),
        ];
        engine.set_items(&["a", "b", "c"], chain(), &links).unwrap();
        let entity_of_a = engine.nodes().get("a").unwrap().entity;
        assert_eq!(
            engine.links(),
            &[
                ResolvedLink {
                    source: 0,
                    target: 1,
                    kind: LinkKind::Positive
                },
                ResolvedLink {
                    source: 1,
                    target: 2,
                    kind: LinkKind::Duplicate
                },
            ]
        );

        let diff = engine.set_items(&["c", "a", "b"], chain(), &links).unwrap();
        assert!(diff.is_noop());
        assert_eq!(engine.nodes().get("a").unwrap().entity, entity_of_a);
        assert_eq!(
            engine.links(),
            &[
                ResolvedLink {
                    source: 1,
                    target: 2,
                    kind: LinkKind::Positive
                },
                ResolvedLink {
                    source: 2,
                    target: 0,
                    kind: LinkKind::Duplicate
                },
            ]
        );
    }

    #[test]
    fn added_links_resolve_without_restarting() {
        let mut engine = engine();
        engine.set_items(&["a", "b", "c"], chain(), &[]).unwrap();
        for _ in 0..3 {
            engine.tick(FRAME);
        }

        let added = engine.add_links(&[
            record("c", "a", LinkKind::Negative),
            record("a", "x", LinkKind::Positive),
        ]);
        assert_eq!(added, 1);
        assert_eq!(
            engine.links(),
            &[ResolvedLink {
                source: 2,
                target: 0,
                kind: LinkKind::Negative
            }]
        );
        assert_eq!(engine.optimizer().iteration(), 3);
        assert_eq!(engine.add_links(&[record("c", "a", LinkKind::Negative)]), 0);
    }

    #[test]
    fn empty_item_set_is_valid() {
        let mut engine = engine();
        engine
            .set_items::<&str>(&[], DistanceMatrix::empty(), &[])
            .unwrap();
        assert!(engine.nodes().is_empty());
        engine.tick(FRAME);
        assert_eq!(engine.optimizer().current_embedding(), Some(&[][..]));
    }

    #[test]
    fn layout_follows_distances() {
        let mut engine = engine();
        engine.set_items(&["a", "b", "c"], chain(), &[]).unwrap();
        for _ in 0..900 {
            engine.tick(FRAME);
        }
        let nodes = engine.nodes().nodes();
        assert!(nodes.iter().all(|node| node.position.is_finite()));
        let ab = (nodes[0].position - nodes[1].position).length();
        let ac = (nodes[0].position - nodes[2].position).length();
        assert!(ac > ab);
    }
}
