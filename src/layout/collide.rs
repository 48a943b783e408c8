use eframe::egui::{Vec2, vec2};

use super::quadtree::QuadNode;

#[derive(Clone, Copy)]
pub(super) struct CollisionParams {
    pub(super) strength: f32,
    pub(super) min_distance: f32,
}

/// Accumulates the velocity change that separates every overlapping pair.
///
/// `pinned` nodes push their neighbours but absorb none of the push
/// themselves; a pair of pinned nodes is left alone.
pub(super) fn accumulate_collisions(
    positions: &[Vec2],
    pinned: &[bool],
    params: CollisionParams,
    pushes: &mut [Vec2],
) {
    if params.min_distance <= 0.0 {
        return;
    }
    let Some(tree) = QuadNode::build(positions) else {
        return;
    };
    accumulate_collision_pairs(&tree, &tree, true, positions, pinned, params, pushes);
}

fn separation_direction(delta: Vec2, distance: f32, from: usize, to: usize) -> Vec2 {
    if distance > 0.0001 {
        delta / distance
    } else {
        let angle =
            ((from as f32) * 0.618_034 + (to as f32) * 0.414_214) * std::f32::consts::TAU;
        vec2(angle.cos(), angle.sin())
    }
}

fn push_pair(
    from: usize,
    to: usize,
    positions: &[Vec2],
    pinned: &[bool],
    params: CollisionParams,
    pushes: &mut [Vec2],
) {
    let delta = positions[from] - positions[to];
    let distance_sq = delta.length_sq();
    if distance_sq >= params.min_distance * params.min_distance {
        return;
    }

    let (from_share, to_share) = match (pinned[from], pinned[to]) {
        (false, false) => (0.5, 0.5),
        (true, false) => (0.0, 1.0),
        (false, true) => (1.0, 0.0),
        (true, true) => return,
    };

    let distance = distance_sq.sqrt();
    let direction = separation_direction(delta, distance, from, to);
    let overlap = (params.min_distance - distance) * params.strength;
    pushes[from] += direction * overlap * from_share;
    pushes[to] -= direction * overlap * to_share;
}

fn accumulate_collision_pairs(
    node_a: &QuadNode,
    node_b: &QuadNode,
    same_node: bool,
    positions: &[Vec2],
    pinned: &[bool],
    params: CollisionParams,
    pushes: &mut [Vec2],
) {
    if node_a.bounds.distance_sq_to(node_b.bounds) > params.min_distance * params.min_distance {
        return;
    }

    if node_a.is_leaf() && node_b.is_leaf() {
        if same_node {
            for (offset, &from) in node_a.indices.iter().enumerate() {
                for &to in &node_a.indices[offset + 1..] {
                    push_pair(from, to, positions, pinned, params, pushes);
                }
            }
        } else {
            for &from in &node_a.indices {
                for &to in &node_b.indices {
                    push_pair(from, to, positions, pinned, params, pushes);
                }
            }
        }
        return;
    }

    if same_node {
        for first in 0..4 {
            let Some(child_a) = node_a.children[first].as_ref() else {
                continue;
            };

            accumulate_collision_pairs(child_a, child_a, true, positions, pinned, params, pushes);

            for second in (first + 1)..4 {
                let Some(child_b) = node_a.children[second].as_ref() else {
                    continue;
                };
                accumulate_collision_pairs(
                    child_a, child_b, false, positions, pinned, params, pushes,
                );
            }
        }
        return;
    }

    let split_a = if node_a.is_leaf() {
        false
    } else if node_b.is_leaf() {
        true
    } else {
        node_a.bounds.half_extent >= node_b.bounds.half_extent
    };

    if split_a {
        for child in node_a.children.iter().flatten() {
            accumulate_collision_pairs(child, node_b, false, positions, pinned, params, pushes);
        }
    } else {
        for child in node_b.children.iter().flatten() {
            accumulate_collision_pairs(node_a, child, false, positions, pinned, params, pushes);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PARAMS: CollisionParams = CollisionParams {
        strength: 1.0,
        min_distance: 10.0,
    };

    fn brute_force(positions: &[Vec2], pinned: &[bool]) -> Vec<Vec2> {
        let mut pushes = vec![Vec2::ZERO; positions.len()];
        for from in 0..positions.len() {
            for to in (from + 1)..positions.len() {
                push_pair(from, to, positions, pinned, PARAMS, &mut pushes);
            }
        }
        pushes
    }

    #[test]
    fn overlapping_pair_is_pushed_apart_evenly() {
        let positions = [vec2(0.0, 0.0), vec2(4.0, 0.0)];
        let mut pushes = vec![Vec2::ZERO; 2];
        accumulate_collisions(&positions, &[false, false], PARAMS, &mut pushes);
        assert_eq!(pushes[0], vec2(-3.0, 0.0));
        assert_eq!(pushes[1], vec2(3.0, 0.0));
    }

    #[test]
    fn pinned_node_does_not_absorb_push() {
        let positions = [vec2(0.0, 0.0), vec2(4.0, 0.0)];
        let mut pushes = vec![Vec2::ZERO; 2];
        accumulate_collisions(&positions, &[true, false], PARAMS, &mut pushes);
        assert_eq!(pushes[0], Vec2::ZERO);
        assert_eq!(pushes[1], vec2(6.0, 0.0));
    }

    #[test]
    fn broad_phase_matches_all_pairs() {
        let positions = (0..150)
            .map(|index| vec2((index % 15) as f32 * 6.5, (index / 15) as f32 * 8.5))
            .collect::<Vec<_>>();
        let pinned = (0..150).map(|index| index % 11 == 0).collect::<Vec<_>>();

        let mut pushes = vec![Vec2::ZERO; positions.len()];
        accumulate_collisions(&positions, &pinned, PARAMS, &mut pushes);
        let expected = brute_force(&positions, &pinned);

        for (got, want) in pushes.iter().zip(&expected) {
            assert!((*got - *want).length() < 1e-3, "{got:?} vs {want:?}");
        }
    }
}
