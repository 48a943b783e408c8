use std::fs;
use std::path::Path;

use anyhow::{Context, Result, ensure};
use eframe::egui::vec2;
use serde::{Deserialize, Serialize};

use crate::layout::{SimulatorParams, TsneParams};

pub const DEFAULT_MAX_RESULTS: usize = 60;

/// Layout tuning; every field falls back to the built-in default.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub perplexity: f64,
    pub learning_rate: f64,
    pub warmup_steps: u64,
    pub seed: u64,
    pub alpha_start: f32,
    pub alpha_decay: f32,
    pub alpha_min: f32,
    pub velocity_decay: f32,
    pub node_radius: f32,
    pub collision_strength: f32,
    pub viewport: [f32; 2],
}

impl Default for LayoutConfig {
    fn default() -> Self {
        let tsne = TsneParams::default();
        let simulator = SimulatorParams::default();
        Self {
            perplexity: tsne.perplexity,
            learning_rate: tsne.learning_rate,
            warmup_steps: tsne.warmup_steps,
            seed: tsne.seed,
            alpha_start: simulator.alpha_start,
            alpha_decay: simulator.alpha_decay,
            alpha_min: simulator.alpha_min,
            velocity_decay: simulator.velocity_decay,
            node_radius: simulator.node_radius,
            collision_strength: simulator.collision_strength,
            viewport: [simulator.viewport.x, simulator.viewport.y],
        }
    }
}

impl LayoutConfig {
    pub fn tsne_params(&self) -> TsneParams {
        TsneParams {
            perplexity: self.perplexity,
            learning_rate: self.learning_rate,
            warmup_steps: self.warmup_steps,
            seed: self.seed,
        }
    }

    pub fn simulator_params(&self) -> SimulatorParams {
        SimulatorParams {
            alpha_start: self.alpha_start,
            alpha_decay: self.alpha_decay,
            alpha_min: self.alpha_min,
            velocity_decay: self.velocity_decay,
            node_radius: self.node_radius,
            collision_strength: self.collision_strength,
            viewport: vec2(self.viewport[0], self.viewport[1]),
        }
    }

    fn validate(&self) -> Result<()> {
        ensure!(
            self.perplexity.is_finite() && self.perplexity > 0.0,
            "layout.perplexity must be positive"
        );
        ensure!(
            self.learning_rate.is_finite() && self.learning_rate > 0.0,
            "layout.learning_rate must be positive"
        );
        ensure!(
            (0.0..1.0).contains(&self.alpha_decay),
            "layout.alpha_decay must be in [0, 1)"
        );
        ensure!(
            (0.0..1.0).contains(&self.velocity_decay),
            "layout.velocity_decay must be in [0, 1)"
        );
        ensure!(
            self.alpha_min >= 0.0 && self.alpha_start >= self.alpha_min,
            "layout.alpha_start must not be below layout.alpha_min"
        );
        ensure!(
            self.node_radius >= 0.0 && self.collision_strength >= 0.0,
            "layout.node_radius and layout.collision_strength must not be negative"
        );
        ensure!(
            self.viewport.iter().all(|extent| extent.is_finite() && *extent > 0.0),
            "layout.viewport must be positive"
        );
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplorerConfig {
    pub layout: LayoutConfig,
    pub max_results: usize,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            layout: LayoutConfig::default(),
            max_results: DEFAULT_MAX_RESULTS,
        }
    }
}

impl ExplorerConfig {
    /// Reads the config file, or returns defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::parse(&raw).with_context(|| format!("invalid config {}", path.display()))
    }

    pub fn parse(raw: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(raw).context("invalid config JSON")?;
        config.layout.validate()?;
        ensure!(config.max_results > 0, "max_results must be positive");
        Ok(config)
    }
}
