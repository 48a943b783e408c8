use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Deterministic point in `[-1, 1]²` derived from an id.
pub fn stable_pair(id: &str) -> (f32, f32) {
    let mut hasher = DefaultHasher::new();
    id.hash(&mut hasher);
    let hash = hasher.finish();

    let x = ((hash & 0xffff_ffff) as f64 / u32::MAX as f64) as f32;
    let y = (((hash >> 32) & 0xffff_ffff) as f64 / u32::MAX as f64) as f32;
    ((x * 2.0) - 1.0, (y * 2.0) - 1.0)
}

/// Cuts `text` to at most `max_chars` characters, marking the cut with `…`.
pub fn truncate_label(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_owned();
    }
    let mut truncated = text
        .chars()
        .take(max_chars.saturating_sub(1))
        .collect::<String>();
    truncated.push('…');
    truncated
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stable_pair_is_deterministic_and_bounded() {
        let (x, y) = stable_pair("item-42");
        assert_eq!((x, y), stable_pair("item-42"));
        assert!((-1.0..=1.0).contains(&x) && (-1.0..=1.0).contains(&y));
        assert_ne!(stable_pair("item-42"), stable_pair("item-43"));
    }

    #[test]
    fn truncate_label_counts_characters() {
        assert_eq!(truncate_label("short", 10), "short");
        assert_eq!(truncate_label("Piazza San Marco", 6), "Piazz…");
        assert_eq!(truncate_label("ééééé", 3), "éé…");
    }
}
