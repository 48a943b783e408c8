use std::collections::HashSet;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use tracing::info;

use super::{Dataset, Item};
use crate::layout::{DistanceMatrix, LinkRecord};

#[derive(Debug, Deserialize)]
struct RawDataset {
    items: Vec<Item>,
    #[serde(default)]
    links: Vec<LinkRecord>,
    #[serde(default)]
    distances: Option<Vec<Vec<f64>>>,
    #[serde(default)]
    condensed: Option<Vec<f64>>,
}

pub fn load_dataset(path: &Path) -> Result<Dataset> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read dataset {}", path.display()))?;
    let dataset =
        parse_dataset(&raw).with_context(|| format!("invalid dataset {}", path.display()))?;
    info!(
        path = %path.display(),
        items = dataset.len(),
        links = dataset.link_count(),
        "dataset loaded"
    );
    Ok(dataset)
}

pub fn parse_dataset(raw: &str) -> Result<Dataset> {
    let parsed: RawDataset = serde_json::from_str(raw).context("invalid dataset JSON")?;

    let mut seen = HashSet::with_capacity(parsed.items.len());
    for item in &parsed.items {
        if item.uid.is_empty() {
            bail!("dataset item with an empty uid");
        }
        if !seen.insert(item.uid.as_str()) {
            bail!("duplicate item uid `{}`", item.uid);
        }
    }

    let distances = match (parsed.distances, parsed.condensed) {
        (Some(_), Some(_)) => bail!("dataset carries both `distances` and `condensed`"),
        (Some(rows), None) => {
            DistanceMatrix::from_rows(rows).context("invalid `distances` matrix")?
        }
        (None, Some(condensed)) => DistanceMatrix::from_condensed(parsed.items.len(), condensed)
            .context("invalid `condensed` distances")?,
        (None, None) if parsed.items.is_empty() => DistanceMatrix::empty(),
        (None, None) => bail!("dataset has items but no distances"),
    };
    if distances.len() != parsed.items.len() {
        bail!(
            "distance matrix covers {} items but the dataset lists {}",
            distances.len(),
            parsed.items.len()
        );
    }

    Ok(Dataset::new(parsed.items, parsed.links, distances))
}
