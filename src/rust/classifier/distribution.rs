use serde::{Deserialize, Serialize};

/// The animal categories the bundled sketch model was trained on
pub const ANIMAL_LABELS: [&str; 4] = ["chicken", "dog", "fish", "t-rex"];

/// Per-category probabilities produced by one inference call.
///
/// Entries keep the order the classifier reported them in, which is also the
/// tie-break order for [`LabelDistribution::top`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LabelDistribution {
    entries: Vec<(String, f32)>,
}

impl LabelDistribution {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pairs labels with scores positionally; extra items on either side are dropped
    pub fn from_scores<L: Into<String>>(labels: impl IntoIterator<Item = L>, scores: &[f32]) -> Self {
        labels.into_iter().zip(scores.iter().copied()).collect()
    }

    /// Sets the probability for `label`, replacing an earlier value in place
    pub fn insert(&mut self, label: impl Into<String>, probability: f32) {
        let label = label.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == label) {
            Some(entry) => entry.1 = probability,
            None => self.entries.push((label, probability)),
        }
    }

    pub fn get(&self, label: &str) -> Option<f32> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == label)
            .map(|(_, p)| *p)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f32)> {
        self.entries.iter().map(|(label, p)| (label.as_str(), *p))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of all probabilities; close to 1.0 for a well-formed distribution
    pub fn total(&self) -> f32 {
        self.entries.iter().map(|(_, p)| p).sum()
    }

    /// The most probable label. Exact ties go to the first one seen; NaN
    /// scores never win.
    pub fn top(&self) -> Option<(&str, f32)> {
        let mut best: Option<(&str, f32)> = None;
        for (label, p) in self.iter() {
            if p.is_nan() {
                continue;
            }
            match best {
                Some((_, best_p)) if p <= best_p => {}
                _ => best = Some((label, p)),
            }
        }
        best
    }

    /// Entries sorted by descending probability
    pub fn ranked(&self) -> Vec<(&str, f32)> {
        let mut ranked: Vec<_> = self.iter().collect();
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        ranked
    }
}

impl<L: Into<String>> FromIterator<(L, f32)> for LabelDistribution {
    fn from_iter<I: IntoIterator<Item = (L, f32)>>(iter: I) -> Self {
        let mut distribution = Self::new();
        for (label, p) in iter {
            distribution.insert(label, p);
        }
        distribution
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_top_picks_maximum() {
        let distribution: LabelDistribution =
            vec![("chicken", 0.05), ("dog", 0.92), ("fish", 0.02), ("t-rex", 0.01)].into_iter().collect();
        assert_eq!(distribution.top(), Some(("dog", 0.92)));
        assert!((distribution.total() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_ties_go_to_first_seen() {
        let distribution: LabelDistribution = vec![("fish", 0.5), ("dog", 0.5)].into_iter().collect();
        assert_eq!(distribution.top(), Some(("fish", 0.5)));
    }

    #[test]
    fn test_nan_is_ignored() {
        let distribution: LabelDistribution = vec![("fish", f32::NAN), ("dog", 0.1)].into_iter().collect();
        assert_eq!(distribution.top(), Some(("dog", 0.1)));
        assert_eq!(LabelDistribution::new().top(), None);
    }

    #[test]
    fn test_insert_replaces_in_place() {
        let mut distribution = LabelDistribution::new();
        distribution.insert("dog", 0.1);
        distribution.insert("fish", 0.2);
        distribution.insert("dog", 0.7);
        assert_eq!(distribution.len(), 2);
        assert_eq!(distribution.get("dog"), Some(0.7));
        assert_eq!(distribution.iter().next(), Some(("dog", 0.7)));
    }

    #[test]
    fn test_from_scores_and_ranked() {
        let distribution = LabelDistribution::from_scores(ANIMAL_LABELS, &[0.10, 0.40, 0.45, 0.05]);
        assert_eq!(distribution.len(), 4);
        let ranked = distribution.ranked();
        assert_eq!(ranked[0], ("fish", 0.45));
        assert_eq!(ranked[3], ("t-rex", 0.05));
    }
}
