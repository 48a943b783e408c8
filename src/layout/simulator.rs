use eframe::egui::{Vec2, vec2};

use super::NodeArena;
use super::collide::{CollisionParams, accumulate_collisions};

const MIN_SPEED_SQ: f32 = 0.0001;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SimulatorParams {
    /// Alpha the decay schedule restarts from.
    pub alpha_start: f32,
    /// Fraction of alpha lost per 60 Hz frame.
    pub alpha_decay: f32,
    /// Below this alpha the layout counts as settled.
    pub alpha_min: f32,
    /// Fraction of velocity lost per 60 Hz frame.
    pub velocity_decay: f32,
    pub node_radius: f32,
    pub collision_strength: f32,
    /// World-space extent the embedding is stretched over, centred on the origin.
    pub viewport: Vec2,
}

impl Default for SimulatorParams {
    fn default() -> Self {
        Self {
            alpha_start: 0.02,
            alpha_decay: 0.0001,
            alpha_min: 0.001,
            velocity_decay: 0.4,
            node_radius: 20.0,
            collision_strength: 1.0,
            viewport: vec2(800.0, 800.0),
        }
    }
}

#[derive(Default)]
struct SimulatorScratch {
    positions: Vec<Vec2>,
    pinned: Vec<bool>,
    pushes: Vec<Vec2>,
    targets: Vec<Vec2>,
}

/// Blends node positions toward the embedding and keeps nodes from
/// overlapping.
///
/// Alpha scales the embedding pull and decays toward zero so the layout
/// settles. Dragging any node switches the pull off until the next
/// [`restart`](Self::restart); collisions keep running regardless.
pub struct Simulator {
    params: SimulatorParams,
    alpha: f32,
    running: bool,
    pull_enabled: bool,
    scratch: SimulatorScratch,
}

impl Simulator {
    pub fn new(params: SimulatorParams) -> Self {
        Self {
            params,
            alpha: 0.0,
            running: false,
            pull_enabled: true,
            scratch: SimulatorScratch::default(),
        }
    }

    pub fn params(&self) -> SimulatorParams {
        self.params
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn pull_enabled(&self) -> bool {
        self.pull_enabled
    }

    /// Whether a tick would still move anything.
    pub fn is_active(&self, nodes: &NodeArena) -> bool {
        self.running
            && (self.alpha >= self.params.alpha_min
                || nodes.nodes().iter().any(|node| node.pin.is_some()))
    }

    pub fn restart(&mut self, alpha: f32) {
        self.alpha = alpha.max(0.0);
        self.running = true;
        self.pull_enabled = true;
    }

    pub fn restart_default(&mut self) {
        self.restart(self.params.alpha_start);
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    /// Pins the node where it currently is and turns the embedding pull off.
    pub fn start_drag(&mut self, nodes: &mut NodeArena, index: usize) -> bool {
        let Some(node) = nodes.nodes_mut().get_mut(index) else {
            return false;
        };
        node.pin = Some(node.position);
        node.velocity = Vec2::ZERO;
        self.pull_enabled = false;
        true
    }

    pub fn drag_to(&mut self, nodes: &mut NodeArena, index: usize, position: Vec2) {
        if let Some(node) = nodes.nodes_mut().get_mut(index)
            && node.pin.is_some()
            && position.is_finite()
        {
            node.pin = Some(position);
            node.position = position;
        }
    }

    pub fn end_drag(&mut self, nodes: &mut NodeArena, index: usize) {
        if let Some(node) = nodes.nodes_mut().get_mut(index) {
            node.pin = None;
        }
    }

    /// Advances the layout by one frame. `embedding` must already reflect this
    /// frame's optimizer step. Returns whether anything is still moving.
    pub fn tick(
        &mut self,
        nodes: &mut NodeArena,
        embedding: Option<&[[f64; 2]]>,
        elapsed_secs: f32,
    ) -> bool {
        if !self.is_active(nodes) {
            return false;
        }

        let frame_scale = (elapsed_secs * 60.0).clamp(0.25, 3.0);
        let alpha_keep = (1.0 - self.params.alpha_decay.clamp(0.0, 1.0)).powf(frame_scale);
        self.alpha *= alpha_keep;

        let count = nodes.len();
        let scratch = &mut self.scratch;
        scratch.positions.clear();
        scratch.pinned.clear();
        for node in nodes.nodes() {
            scratch.positions.push(node.position);
            scratch.pinned.push(node.pin.is_some());
        }
        scratch.pushes.clear();
        scratch.pushes.resize(count, Vec2::ZERO);

        let pull = if self.pull_enabled {
            embedding.filter(|embedding| embedding.len() == count)
        } else {
            None
        };
        if let Some(embedding) = pull {
            rescale_embedding(embedding, self.params.viewport, &mut scratch.targets);
            let blend = (self.alpha * frame_scale).clamp(0.0, 1.0);
            for (index, position) in scratch.positions.iter_mut().enumerate() {
                if !scratch.pinned[index] {
                    *position += (scratch.targets[index] - *position) * blend;
                }
            }
        }

        accumulate_collisions(
            &scratch.positions,
            &scratch.pinned,
            CollisionParams {
                strength: self.params.collision_strength,
                min_distance: self.params.node_radius * 2.0,
            },
            &mut scratch.pushes,
        );

        let velocity_keep = (1.0 - self.params.velocity_decay.clamp(0.0, 1.0)).powf(frame_scale);
        let mut moving = self.alpha >= self.params.alpha_min;
        for (index, node) in nodes.nodes_mut().iter_mut().enumerate() {
            if let Some(pin) = node.pin {
                node.position = pin;
                node.velocity = Vec2::ZERO;
                continue;
            }

            let velocity = (node.velocity + scratch.pushes[index]) * velocity_keep;
            let position = scratch.positions[index] + velocity * frame_scale;
            if position.is_finite() && velocity.is_finite() {
                node.velocity = velocity;
                node.position = position;
            } else {
                node.velocity = Vec2::ZERO;
            }
            if node.velocity.length_sq() > MIN_SPEED_SQ {
                moving = true;
            }
        }

        moving
    }
}

/// Maps the embedding's bounding box onto `viewport` with one uniform scale,
/// centred on the origin, so relative distances survive. A fully degenerate
/// embedding collapses to the origin.
fn rescale_embedding(embedding: &[[f64; 2]], viewport: Vec2, targets: &mut Vec<Vec2>) {
    let mut min = [f64::INFINITY; 2];
    let mut max = [f64::NEG_INFINITY; 2];
    for point in embedding {
        for axis in 0..2 {
            min[axis] = min[axis].min(point[axis]);
            max[axis] = max[axis].max(point[axis]);
        }
    }

    let extent = [viewport.x as f64, viewport.y as f64];
    let mut scale = f64::INFINITY;
    for axis in 0..2 {
        let span = max[axis] - min[axis];
        if span > f64::EPSILON {
            scale = scale.min(extent[axis] / span);
        }
    }
    if !scale.is_finite() {
        scale = 0.0;
    }

    let center = [(min[0] + max[0]) * 0.5, (min[1] + max[1]) * 0.5];
    targets.clear();
    targets.extend(embedding.iter().map(|point| {
        vec2(
            ((point[0] - center[0]) * scale) as f32,
            ((point[1] - center[1]) * scale) as f32,
        )
    }));
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRAME: f32 = 1.0 / 60.0;

    fn arena(ids: &[&str]) -> NodeArena {
        let mut nodes = NodeArena::new();
        nodes.reconcile(ids).unwrap();
        nodes
    }

    fn running(params: SimulatorParams) -> Simulator {
        let mut simulator = Simulator::new(params);
        simulator.restart_default();
        simulator
    }

    #[test]
    fn rescale_spans_the_viewport() {
        let mut targets = Vec::new();
        rescale_embedding(
            &[[0.0, 5.0], [2.0, 5.0], [1.0, 5.0]],
            vec2(800.0, 600.0),
            &mut targets,
        );
        assert_eq!(targets, vec![vec2(-400.0, 0.0), vec2(400.0, 0.0), vec2(0.0, 0.0)]);
    }

    #[test]
    fn rescale_keeps_aspect_ratio() {
        let mut targets = Vec::new();
        rescale_embedding(&[[0.0, 0.0], [2.0, 1.0]], vec2(800.0, 800.0), &mut targets);
        assert_eq!(targets, vec![vec2(-400.0, -200.0), vec2(400.0, 200.0)]);

        rescale_embedding(&[[3.0, 3.0], [3.0, 3.0]], vec2(800.0, 800.0), &mut targets);
        assert_eq!(targets, vec![Vec2::ZERO, Vec2::ZERO]);
    }

    #[test]
    fn nodes_move_toward_embedding_targets() {
        let mut nodes = arena(&["a", "b"]);
        let mut simulator = running(SimulatorParams {
            alpha_start: 0.5,
            ..SimulatorParams::default()
        });
        let embedding = [[0.0, 0.0], [1.0, 1.0]];
        let before = nodes.nodes()[1].position;
        for _ in 0..30 {
            simulator.tick(&mut nodes, Some(&embedding[..]), FRAME);
        }
        let after = nodes.nodes()[1].position;
        let target = vec2(400.0, 400.0);
        assert!((after - target).length() < (before - target).length());
    }

    #[test]
    fn dragged_node_holds_its_position() {
        let mut nodes = arena(&["a", "b", "c"]);
        let mut simulator = running(SimulatorParams {
            alpha_start: 0.5,
            ..SimulatorParams::default()
        });
        assert!(simulator.start_drag(&mut nodes, 0));
        assert!(!simulator.pull_enabled());
        let held = nodes.nodes()[0].position;

        let embeddings = [
            [[100.0, 0.0], [0.0, 0.0], [0.0, 1.0]],
            [[-50.0, 9.0], [3.0, 3.0], [0.0, -1.0]],
        ];
        for frame in 0..40 {
            simulator.tick(&mut nodes, Some(&embeddings[frame % 2][..]), FRAME);
            assert_eq!(nodes.nodes()[0].position, held);
        }

        simulator.drag_to(&mut nodes, 0, vec2(10.0, 10.0));
        simulator.tick(&mut nodes, None, FRAME);
        assert_eq!(nodes.nodes()[0].position, vec2(10.0, 10.0));

        simulator.end_drag(&mut nodes, 0);
        assert!(nodes.nodes()[0].pin.is_none());
        assert!(!simulator.pull_enabled());
    }

    #[test]
    fn collisions_separate_overlapping_nodes() {
        let mut nodes = arena(&["a", "b"]);
        for node in nodes.nodes_mut() {
            node.position = Vec2::ZERO;
        }
        let mut simulator = running(SimulatorParams::default());
        simulator.start_drag(&mut nodes, 0);
        for _ in 0..200 {
            simulator.tick(&mut nodes, None, FRAME);
        }
        let gap = (nodes.nodes()[0].position - nodes.nodes()[1].position).length();
        assert!(gap >= 2.0 * SimulatorParams::default().node_radius - 0.5, "gap {gap}");
        assert_eq!(nodes.nodes()[0].position, Vec2::ZERO);
    }

    #[test]
    fn pinned_node_repels_while_the_pull_runs() {
        let mut nodes = arena(&["a", "b", "c"]);
        let mut simulator = running(SimulatorParams::default());
        nodes.nodes_mut()[0].position = vec2(-380.0, 0.0);
        simulator.start_drag(&mut nodes, 0);
        simulator.restart_default();
        assert!(simulator.pull_enabled());

        // a and b share a target just past a's pin; c's is far away.
        let embedding = [[0.0, 0.0], [0.0, 0.0], [1.0, 0.0]];
        for _ in 0..600 {
            simulator.tick(&mut nodes, Some(&embedding[..]), FRAME);
        }

        let pinned = nodes.nodes()[0].position;
        let pushed = nodes.nodes()[1].position;
        assert_eq!(pinned, vec2(-380.0, 0.0));
        let gap = (pushed - pinned).length();
        assert!(gap > 30.0, "gap {gap}");
        assert!(nodes.nodes()[2].position.x > 300.0);
    }

    #[test]
    fn alpha_decays_and_the_layout_settles() {
        let mut nodes = arena(&["a"]);
        let mut simulator = running(SimulatorParams {
            alpha_decay: 0.05,
            ..SimulatorParams::default()
        });
        let start = simulator.alpha();
        simulator.tick(&mut nodes, Some(&[[0.0, 0.0]][..]), FRAME);
        assert!(simulator.alpha() < start);

        let mut frames = 0;
        while simulator.is_active(&nodes) && frames < 10_000 {
            simulator.tick(&mut nodes, Some(&[[0.0, 0.0]][..]), FRAME);
            frames += 1;
        }
        assert!(!simulator.is_active(&nodes));
        assert!(!simulator.tick(&mut nodes, Some(&[[0.0, 0.0]][..]), FRAME));
    }

    #[test]
    fn stop_is_idempotent_and_restart_rearms() {
        let mut nodes = arena(&["a", "b"]);
        let mut simulator = running(SimulatorParams::default());
        simulator.start_drag(&mut nodes, 1);
        simulator.end_drag(&mut nodes, 1);

        simulator.stop();
        simulator.stop();
        assert!(!simulator.is_running());
        let before = nodes.nodes()[0].position;
        assert!(!simulator.tick(&mut nodes, None, FRAME));
        assert_eq!(nodes.nodes()[0].position, before);

        simulator.restart(0.3);
        assert!(simulator.is_running());
        assert!(simulator.pull_enabled());
        assert_eq!(simulator.alpha(), 0.3);
    }

    #[test]
    fn mismatched_embedding_is_ignored() {
        let mut nodes = arena(&["a", "b"]);
        let mut simulator = running(SimulatorParams {
            alpha_start: 1.0,
            ..SimulatorParams::default()
        });
        nodes.nodes_mut()[0].position = Vec2::ZERO;
        nodes.nodes_mut()[1].position = vec2(100.0, 0.0);
        let before = nodes.nodes()[0].position;
        simulator.tick(&mut nodes, Some(&[[1000.0, 1000.0]][..]), FRAME);
        let moved = (nodes.nodes()[0].position - before).length();
        assert!(moved < 1.0);
    }
}
