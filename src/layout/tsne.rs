use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::DistanceMatrix;

const EARLY_EXAGGERATION: f64 = 4.0;
const EXAGGERATION_STEPS: u64 = 100;
const MOMENTUM_SWITCH_STEP: u64 = 250;
const INITIAL_MOMENTUM: f64 = 0.5;
const FINAL_MOMENTUM: f64 = 0.8;
const MIN_GAIN: f64 = 0.01;
const AFFINITY_FLOOR: f64 = 1e-100;
const ENTROPY_TOLERANCE: f64 = 1e-4;
const BETA_SEARCH_STEPS: usize = 50;
const INITIAL_SPREAD: f64 = 1e-4;
const MIN_PERPLEXITY: f64 = 1.5;
const COORDINATE_LIMIT: f64 = 1.0e4;
const MIN_PAIR_SEPARATION: f64 = 1e-3;

/// Tuning knobs for [`TsneOptimizer`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TsneParams {
    /// Effective number of neighbours each item tries to keep close.
    pub perplexity: f64,
    /// Gradient step size.
    pub learning_rate: f64,
    /// Steps to run before [`TsneOptimizer::current_embedding`] reports a result.
    pub warmup_steps: u64,
    pub seed: u64,
}

impl Default for TsneParams {
    fn default() -> Self {
        Self {
            perplexity: 10.0,
            learning_rate: 3.0,
            warmup_steps: 10,
            seed: 0x5eed_1a70,
        }
    }
}

/// Incremental t-SNE over a precomputed distance matrix.
///
/// Neighbour affinities are computed once in [`initialize`](Self::initialize);
/// every [`step`](Self::step) afterwards is a single gradient update with
/// momentum and per-coordinate gains. All buffers are sized at initialization,
/// so a step costs the same at iteration 10 and at iteration 10 000.
pub struct TsneOptimizer {
    params: TsneParams,
    rng: StdRng,
    len: usize,
    affinities: Vec<f64>,
    kernel: Vec<f64>,
    solution: Vec<[f64; 2]>,
    gradient: Vec<[f64; 2]>,
    previous_step: Vec<[f64; 2]>,
    gains: Vec<[f64; 2]>,
    iteration: u64,
}

impl TsneOptimizer {
    pub fn new(params: TsneParams) -> Self {
        Self {
            params,
            rng: StdRng::seed_from_u64(params.seed),
            len: 0,
            affinities: Vec::new(),
            kernel: Vec::new(),
            solution: Vec::new(),
            gradient: Vec::new(),
            previous_step: Vec::new(),
            gains: Vec::new(),
            iteration: 0,
        }
    }

    /// Discards all optimizer state and starts over for `matrix`.
    pub fn initialize(&mut self, matrix: &DistanceMatrix) {
        let n = matrix.len();
        self.len = n;
        self.iteration = 0;
        self.rng = StdRng::seed_from_u64(self.params.seed);

        self.gradient = vec![[0.0; 2]; n];
        self.previous_step = vec![[0.0; 2]; n];
        self.gains = vec![[1.0; 2]; n];

        if n <= 2 {
            self.affinities = Vec::new();
            self.kernel = Vec::new();
            self.solution = match n {
                0 => Vec::new(),
                1 => vec![[0.0, 0.0]],
                _ => {
                    let half =
                        (matrix.get(0, 1) * 0.5).clamp(MIN_PAIR_SEPARATION, COORDINATE_LIMIT);
                    vec![[-half, 0.0], [half, 0.0]]
                }
            };
            return;
        }

        let perplexity = self
            .params
            .perplexity
            .min((n - 1) as f64 / 3.0)
            .max(MIN_PERPLEXITY);
        self.affinities = joint_affinities(matrix, perplexity);
        self.kernel = vec![0.0; n * n];
        self.solution = (0..n)
            .map(|_| {
                [
                    gaussian(&mut self.rng) * INITIAL_SPREAD,
                    gaussian(&mut self.rng) * INITIAL_SPREAD,
                ]
            })
            .collect();
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn iteration(&self) -> u64 {
        self.iteration
    }

    /// One gradient-descent update of the embedding.
    pub fn step(&mut self) {
        let n = self.len;
        if n <= 2 {
            return;
        }
        self.iteration += 1;

        let kernel_sum = self.fill_kernel();
        if kernel_sum <= 0.0 || !kernel_sum.is_finite() {
            return;
        }

        let exaggeration = if self.iteration < EXAGGERATION_STEPS {
            EARLY_EXAGGERATION
        } else {
            1.0
        };
        for i in 0..n {
            let point = self.solution[i];
            let mut gradient = [0.0; 2];
            for j in 0..n {
                if i == j {
                    continue;
                }
                let kernel = self.kernel[i * n + j];
                let similarity = (kernel / kernel_sum).max(AFFINITY_FLOOR);
                let weight =
                    4.0 * (exaggeration * self.affinities[i * n + j] - similarity) * kernel;
                gradient[0] += weight * (point[0] - self.solution[j][0]);
                gradient[1] += weight * (point[1] - self.solution[j][1]);
            }
            self.gradient[i] = gradient;
        }

        let momentum = if self.iteration < MOMENTUM_SWITCH_STEP {
            INITIAL_MOMENTUM
        } else {
            FINAL_MOMENTUM
        };
        let mut mean = [0.0; 2];
        for i in 0..n {
            for axis in 0..2 {
                let gradient = self.gradient[i][axis];
                let previous = self.previous_step[i][axis];
                let gain = if sign(gradient) == sign(previous) {
                    self.gains[i][axis] * 0.8
                } else {
                    self.gains[i][axis] + 0.2
                };
                let gain = gain.max(MIN_GAIN);
                self.gains[i][axis] = gain;

                let update = momentum * previous - self.params.learning_rate * gain * gradient;
                self.previous_step[i][axis] = update;
                self.solution[i][axis] += update;
                mean[axis] += self.solution[i][axis];
            }
        }

        mean[0] /= n as f64;
        mean[1] /= n as f64;
        for i in 0..n {
            for axis in 0..2 {
                let value = self.solution[i][axis] - mean[axis];
                if value.is_finite() {
                    self.solution[i][axis] = value.clamp(-COORDINATE_LIMIT, COORDINATE_LIMIT);
                } else {
                    self.solution[i][axis] = 0.0;
                    self.previous_step[i][axis] = 0.0;
                    self.gains[i][axis] = 1.0;
                }
            }
        }
    }

    /// The present embedding, or `None` while the optimizer is still warming up.
    pub fn current_embedding(&self) -> Option<&[[f64; 2]]> {
        if self.len <= 2 || self.iteration >= self.params.warmup_steps {
            Some(&self.solution)
        } else {
            None
        }
    }

    /// KL divergence between the neighbour affinities and the embedding.
    pub fn cost(&self) -> f64 {
        let n = self.len;
        if n <= 2 {
            return 0.0;
        }

        let mut kernel_sum = 0.0;
        for i in 0..n {
            for j in (i + 1)..n {
                kernel_sum += 2.0 * student_kernel(self.solution[i], self.solution[j]);
            }
        }

        let mut cost = 0.0;
        for i in 0..n {
            for j in 0..n {
                if i == j {
                    continue;
                }
                let p = self.affinities[i * n + j];
                let q = (student_kernel(self.solution[i], self.solution[j]) / kernel_sum)
                    .max(AFFINITY_FLOOR);
                cost += p * (p / q).ln();
            }
        }
        cost
    }

    fn fill_kernel(&mut self) -> f64 {
        let n = self.len;
        let mut sum = 0.0;
        for i in 0..n {
            for j in (i + 1)..n {
                let kernel = student_kernel(self.solution[i], self.solution[j]);
                self.kernel[i * n + j] = kernel;
                self.kernel[j * n + i] = kernel;
                sum += 2.0 * kernel;
            }
        }
        sum
    }
}

fn student_kernel(a: [f64; 2], b: [f64; 2]) -> f64 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    1.0 / (1.0 + dx * dx + dy * dy)
}

fn sign(value: f64) -> i8 {
    if value > 0.0 {
        1
    } else if value < 0.0 {
        -1
    } else {
        0
    }
}

fn gaussian(rng: &mut StdRng) -> f64 {
    let u1 = rng.random::<f64>().max(f64::MIN_POSITIVE);
    let u2 = rng.random::<f64>();
    (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
}

/// Symmetrised neighbour distribution. Each row's kernel precision is found by
/// bisection so that the row entropy matches `ln(perplexity)`.
fn joint_affinities(matrix: &DistanceMatrix, perplexity: f64) -> Vec<f64> {
    let n = matrix.len();
    let target_entropy = perplexity.ln();
    let mut conditional = vec![0.0; n * n];
    let mut row = vec![0.0; n];

    for i in 0..n {
        let mut beta = 1.0_f64;
        let mut beta_min = f64::NEG_INFINITY;
        let mut beta_max = f64::INFINITY;

        for _ in 0..BETA_SEARCH_STEPS {
            let mut sum = 0.0;
            for (j, value) in row.iter_mut().enumerate() {
                *value = if i == j {
                    0.0
                } else {
                    (-matrix.get(i, j) * beta).exp()
                };
                sum += *value;
            }

            let mut entropy = 0.0;
            for value in row.iter_mut() {
                *value = if sum > 0.0 { *value / sum } else { 0.0 };
                if *value > 1e-7 {
                    entropy -= *value * value.ln();
                }
            }

            if entropy > target_entropy {
                beta_min = beta;
                beta = if beta_max.is_infinite() {
                    beta * 2.0
                } else {
                    (beta + beta_max) / 2.0
                };
            } else {
                beta_max = beta;
                beta = if beta_min.is_infinite() {
                    beta / 2.0
                } else {
                    (beta + beta_min) / 2.0
                };
            }

            if (entropy - target_entropy).abs() < ENTROPY_TOLERANCE {
                break;
            }
        }

        conditional[i * n..(i + 1) * n].copy_from_slice(&row);
    }

    let scale = 2.0 * n as f64;
    let mut joint = vec![0.0; n * n];
    for i in 0..n {
        for j in 0..n {
            if i != j {
                joint[i * n + j] =
                    ((conditional[i * n + j] + conditional[j * n + i]) / scale).max(AFFINITY_FLOOR);
            }
        }
    }
    joint
}

#[cfg(test)]
mod tests {
    use super::*;

    fn distance(a: [f64; 2], b: [f64; 2]) -> f64 {
        ((a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2)).sqrt()
    }

    fn optimizer_for(matrix: &DistanceMatrix) -> TsneOptimizer {
        let mut optimizer = TsneOptimizer::new(TsneParams::default());
        optimizer.initialize(matrix);
        optimizer
    }

    #[test]
    fn chain_of_three_keeps_distance_ordering() {
        let matrix = DistanceMatrix::from_condensed(3, vec![1.0, 2.0, 1.0]).unwrap();
        let mut optimizer = optimizer_for(&matrix);

        for _ in 0..TsneParams::default().warmup_steps {
            assert!(optimizer.current_embedding().is_none());
            optimizer.step();
        }
        let warm = optimizer.current_embedding().expect("usable after warm-up");
        assert_eq!(warm.len(), 3);
        assert!(warm.iter().flatten().all(|value| value.is_finite()));

        for _ in 0..600 {
            optimizer.step();
        }
        let solution = optimizer.current_embedding().unwrap();
        assert!(solution.iter().flatten().all(|value| value.is_finite()));
        let ab = distance(solution[0], solution[1]);
        let bc = distance(solution[1], solution[2]);
        let ac = distance(solution[0], solution[2]);
        assert!(ac > ab, "a-c {ac} should exceed a-b {ab}");
        assert!(ac > bc, "a-c {ac} should exceed b-c {bc}");
    }

    #[test]
    fn separates_two_clusters() {
        let n = 6;
        let rows = (0..n)
            .map(|i| {
                (0..n)
                    .map(|j| {
                        if i == j {
                            0.0
                        } else if (i < 3) == (j < 3) {
                            1.0
                        } else {
                            10.0
                        }
                    })
                    .collect()
            })
            .collect();
        let matrix = DistanceMatrix::from_rows(rows).unwrap();
        let mut optimizer = optimizer_for(&matrix);
        for _ in 0..800 {
            optimizer.step();
        }

        let solution = optimizer.current_embedding().unwrap();
        let mut max_within = 0.0_f64;
        let mut min_across = f64::INFINITY;
        for i in 0..n {
            for j in (i + 1)..n {
                let d = distance(solution[i], solution[j]);
                if (i < 3) == (j < 3) {
                    max_within = max_within.max(d);
                } else {
                    min_across = min_across.min(d);
                }
            }
        }
        assert!(max_within < min_across);
    }

    #[test]
    fn cost_drops_as_the_embedding_improves() {
        let matrix =
            DistanceMatrix::from_condensed(4, vec![1.0, 4.0, 4.0, 4.0, 4.0, 1.0]).unwrap();
        let mut optimizer = optimizer_for(&matrix);
        let initial = optimizer.cost();
        for _ in 0..500 {
            optimizer.step();
        }
        assert!(optimizer.cost() < initial);
    }

    #[test]
    fn small_sets_use_placeholder_embeddings() {
        let mut optimizer = TsneOptimizer::new(TsneParams::default());

        optimizer.initialize(&DistanceMatrix::empty());
        assert_eq!(optimizer.current_embedding(), Some(&[][..]));

        optimizer.initialize(&DistanceMatrix::from_rows(vec![vec![0.0]]).unwrap());
        optimizer.step();
        assert_eq!(optimizer.current_embedding(), Some(&[[0.0, 0.0]][..]));

        optimizer.initialize(&DistanceMatrix::from_condensed(2, vec![3.0]).unwrap());
        let pair = optimizer.current_embedding().unwrap().to_vec();
        optimizer.step();
        assert_eq!(optimizer.current_embedding().unwrap(), &pair[..]);
        assert_eq!(pair, vec![[-1.5, 0.0], [1.5, 0.0]]);

        optimizer.initialize(&DistanceMatrix::from_condensed(2, vec![0.0]).unwrap());
        let pair = optimizer.current_embedding().unwrap();
        assert!(pair[1][0] - pair[0][0] > 0.0);
        assert_eq!(pair[0][1], 0.0);
    }

    #[test]
    fn huge_distances_stay_bounded() {
        let matrix =
            DistanceMatrix::from_condensed(4, vec![1e9, 1.0, 1e9, 1e9, 1.0, 1e9]).unwrap();
        let mut optimizer = optimizer_for(&matrix);
        for _ in 0..300 {
            optimizer.step();
        }
        let solution = optimizer.current_embedding().unwrap();
        assert!(
            solution
                .iter()
                .flatten()
                .all(|value| value.is_finite() && value.abs() <= COORDINATE_LIMIT)
        );
    }

    #[test]
    fn reinitialize_resets_iteration_and_size() {
        let matrix = DistanceMatrix::from_condensed(3, vec![1.0, 2.0, 1.0]).unwrap();
        let mut optimizer = optimizer_for(&matrix);
        for _ in 0..20 {
            optimizer.step();
        }
        assert_eq!(optimizer.iteration(), 20);

        let bigger = DistanceMatrix::from_condensed(4, vec![1.0; 6]).unwrap();
        optimizer.initialize(&bigger);
        assert_eq!(optimizer.iteration(), 0);
        assert_eq!(optimizer.len(), 4);
        assert!(optimizer.current_embedding().is_none());
    }
}
