use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;
use serde::Deserialize;
use tracing::warn;

use super::FetchError;
use crate::layout::{DistanceMatrix, LinkRecord};

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Item {
    pub uid: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl Item {
    pub fn display_name(&self) -> &str {
        if self.label.is_empty() {
            &self.uid
        } else {
            &self.label
        }
    }
}

#[derive(Debug)]
pub struct Dataset {
    items: Vec<Item>,
    index_by_uid: HashMap<String, usize>,
    links: Vec<LinkRecord>,
    distances: DistanceMatrix,
}

fn fuzzy_match_score(matcher: &SkimMatcherV2, text: &str, query: &str) -> Option<i64> {
    matcher
        .fuzzy_match(text, query)
        .or_else(|| matcher.fuzzy_match(&text.to_lowercase(), &query.to_lowercase()))
}

impl Dataset {
    /// `items` must have unique uids and `distances` one row per item; the
    /// parser checks both.
    pub(super) fn new(items: Vec<Item>, links: Vec<LinkRecord>, distances: DistanceMatrix) -> Self {
        let index_by_uid = items
            .iter()
            .enumerate()
            .map(|(index, item)| (item.uid.clone(), index))
            .collect();
        Self {
            items,
            index_by_uid,
            links,
            distances,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn item(&self, uid: &str) -> Option<&Item> {
        self.index_by_uid.get(uid).map(|&index| &self.items[index])
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    fn index_of(&self, uid: &str) -> Result<usize, FetchError> {
        self.index_by_uid
            .get(uid)
            .copied()
            .ok_or_else(|| FetchError::UnknownId(uid.to_owned()))
    }

    /// Best fuzzy matches on label or uid. An empty query lists the first
    /// `limit` items in dataset order.
    pub fn search_text(&self, query: &str, limit: usize) -> Vec<String> {
        let query = query.trim();
        if query.is_empty() {
            return self
                .items
                .iter()
                .take(limit)
                .map(|item| item.uid.clone())
                .collect();
        }

        let matcher = SkimMatcherV2::default();
        let mut scored = self
            .items
            .iter()
            .enumerate()
            .filter_map(|(index, item)| {
                let label = fuzzy_match_score(&matcher, &item.label, query);
                let uid = fuzzy_match_score(&matcher, &item.uid, query);
                label.max(uid).map(|score| (score, index))
            })
            .collect::<Vec<_>>();
        scored.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));

        scored
            .into_iter()
            .take(limit)
            .map(|(_, index)| self.items[index].uid.clone())
            .collect()
    }

    /// Indices of the picks present in the dataset. Unknown picks are
    /// skipped and returned separately.
    fn known_picks<'a>(&self, picks: &'a [String], unknown: &mut Vec<&'a str>) -> Vec<usize> {
        picks
            .iter()
            .filter_map(|uid| match self.index_by_uid.get(uid) {
                Some(&index) => Some(index),
                None => {
                    unknown.push(uid);
                    None
                }
            })
            .collect()
    }

    /// Ranks every item by its mean distance to `current` minus its mean
    /// distance to `negative`, closest first. Picks missing from the dataset
    /// are skipped; the search fails only when none are left.
    pub fn search_by_selection(
        &self,
        current: &[String],
        negative: &[String],
        limit: usize,
    ) -> Result<Vec<String>, FetchError> {
        if current.is_empty() && negative.is_empty() {
            return Err(FetchError::EmptySelection);
        }
        let mut unknown = Vec::new();
        let positives = self.known_picks(current, &mut unknown);
        let negatives = self.known_picks(negative, &mut unknown);
        if !unknown.is_empty() {
            warn!(
                skipped = unknown.len(),
                first = unknown[0],
                "selection search skipped ids missing from the dataset"
            );
        }
        if positives.is_empty() && negatives.is_empty() {
            return Err(FetchError::UnknownId(unknown[0].to_owned()));
        }

        let mean_distance = |row: usize, picks: &[usize]| {
            if picks.is_empty() {
                0.0
            } else {
                picks
                    .iter()
                    .map(|&pick| self.distances.get(row, pick))
                    .sum::<f64>()
                    / picks.len() as f64
            }
        };

        let mut scored = (0..self.items.len())
            .map(|row| {
                let score = mean_distance(row, &positives) - mean_distance(row, &negatives);
                (score, row)
            })
            .collect::<Vec<_>>();
        scored.sort_by(|a, b| {
            a.0.partial_cmp(&b.0)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.1.cmp(&b.1))
        });

        Ok(scored
            .into_iter()
            .take(limit)
            .map(|(_, row)| self.items[row].uid.clone())
            .collect())
    }

    /// Distances among `uids`, rows in the order given.
    pub fn distance_matrix(&self, uids: &[String]) -> Result<DistanceMatrix, FetchError> {
        let indices = uids
            .iter()
            .map(|uid| self.index_of(uid))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(self.distances.submatrix(&indices))
    }

    /// Links with at least one endpoint in `uids`. Links leaving the set are
    /// kept; the reconciler drops them against the live node set.
    pub fn links_among(&self, uids: &[String]) -> Vec<LinkRecord> {
        let wanted = uids.iter().map(String::as_str).collect::<HashSet<_>>();
        self.links
            .iter()
            .filter(|link| {
                wanted.contains(link.source.as_str()) || wanted.contains(link.target.as_str())
            })
            .cloned()
            .collect()
    }
}
