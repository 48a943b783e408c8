use crate::layout::{LinkKind, LinkRecord};

/// Link kinds a user may assign between current picks.
pub const ANNOTATION_KINDS: [LinkKind; 2] = [LinkKind::Duplicate, LinkKind::Positive];

/// Links recording a judgement over the selection: `kind` between every pair
/// of current picks, [`LinkKind::Negative`] from every current pick to every
/// negative one. Later picks are the source of each pair.
pub fn selection_links(
    current: &[String],
    negative: &[String],
    kind: LinkKind,
) -> Vec<LinkRecord> {
    let pair_count = current.len() * current.len().saturating_sub(1) / 2;
    let mut links = Vec::with_capacity(pair_count + current.len() * negative.len());

    for (index, source) in current.iter().enumerate() {
        for target in &current[..index] {
            links.push(LinkRecord {
                source: source.clone(),
                target: target.clone(),
                kind,
            });
        }
    }
    for source in current {
        for target in negative {
            links.push(LinkRecord {
                source: source.clone(),
                target: target.clone(),
                kind: LinkKind::Negative,
            });
        }
    }

    links
}

/// Appends the links `into` does not hold yet, in either direction. Returns
/// how many were new.
pub fn merge_links(into: &mut Vec<LinkRecord>, links: Vec<LinkRecord>) -> usize {
    let before = into.len();
    for link in links {
        let known = into.iter().any(|existing| {
            existing.kind == link.kind
                && ((existing.source == link.source && existing.target == link.target)
                    || (existing.source == link.target && existing.target == link.source))
        });
        if !known {
            into.push(link);
        }
    }
    into.len() - before
}
