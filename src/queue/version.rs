//! Default version selection among several recordings of the same song.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::model::{Song, SourceType};

/// Preference policy for picking a default recording.
///
/// Ranking: source type by `source_priority` (types not listed rank last),
/// then higher rating (unrated below any rating), then more downloads, then
/// the earlier entry in the input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VersionPolicy {
    pub source_priority: Vec<SourceType>,
}

impl Default for VersionPolicy {
    fn default() -> Self {
        Self {
            source_priority: vec![
                SourceType::Soundboard,
                SourceType::Matrix,
                SourceType::Audience,
                SourceType::Unknown,
            ],
        }
    }
}

impl VersionPolicy {
    fn source_rank(&self, source: SourceType) -> usize {
        self.source_priority
            .iter()
            .position(|s| *s == source)
            .unwrap_or(self.source_priority.len())
    }

    /// Compare two versions; `Less` means `a` is preferred.
    pub fn compare(&self, a: &Song, b: &Song) -> Ordering {
        let rating = |s: &Song| s.recording.as_ref().and_then(|r| r.rating);
        let downloads = |s: &Song| s.recording.as_ref().map(|r| r.downloads).unwrap_or(0);

        self.source_rank(a.source_type())
            .cmp(&self.source_rank(b.source_type()))
            .then_with(|| match (rating(a), rating(b)) {
                (Some(x), Some(y)) => y.total_cmp(&x),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            })
            .then_with(|| downloads(b).cmp(&downloads(a)))
    }
}

/// Pick the default version, or `None` for an empty slice.
pub fn get_best_version<'a>(versions: &'a [Song], policy: &VersionPolicy) -> Option<&'a Song> {
    // min_by keeps the first of equal elements, which gives the input-order tie-break
    versions.iter().min_by(|a, b| policy.compare(a, b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::mock_version;

    #[test]
    fn test_source_type_wins() {
        let versions = vec![
            mock_version("aud", SourceType::Audience, Some(9.9), 10_000),
            mock_version("sbd", SourceType::Soundboard, Some(5.0), 10),
            mock_version("mtx", SourceType::Matrix, Some(9.0), 500),
        ];
        let best = get_best_version(&versions, &VersionPolicy::default()).unwrap();
        assert_eq!(best.id, "sbd");
    }

    #[test]
    fn test_rating_then_downloads() {
        let versions = vec![
            mock_version("low", SourceType::Soundboard, Some(7.0), 900),
            mock_version("unrated", SourceType::Soundboard, None, 5000),
            mock_version("high-few", SourceType::Soundboard, Some(8.5), 10),
            mock_version("high-many", SourceType::Soundboard, Some(8.5), 20),
        ];
        let best = get_best_version(&versions, &VersionPolicy::default()).unwrap();
        assert_eq!(best.id, "high-many");
    }

    #[test]
    fn test_full_tie_keeps_first() {
        let versions = vec![
            mock_version("first", SourceType::Matrix, Some(8.0), 1),
            mock_version("second", SourceType::Matrix, Some(8.0), 1),
        ];
        let best = get_best_version(&versions, &VersionPolicy::default()).unwrap();
        assert_eq!(best.id, "first");
    }

    #[test]
    fn test_custom_policy() {
        let policy = VersionPolicy {
            source_priority: vec![SourceType::Matrix, SourceType::Soundboard],
        };
        let versions = vec![
            mock_version("sbd", SourceType::Soundboard, None, 0),
            mock_version("aud", SourceType::Audience, Some(10.0), 0),
            mock_version("mtx", SourceType::Matrix, None, 0),
        ];
        assert_eq!(get_best_version(&versions, &policy).unwrap().id, "mtx");
    }

    #[test]
    fn test_lineage_only_versions() {
        let mut sbd = mock_version("sbd", SourceType::Unknown, None, 0);
        if let Some(rec) = sbd.recording.as_mut() {
            rec.source_type = None;
            rec.lineage = Some("SBD > Reel > DAT".to_string());
        }
        let aud = mock_version("aud", SourceType::Audience, Some(9.0), 100);
        let versions = [aud, sbd];
        assert_eq!(
            get_best_version(&versions, &VersionPolicy::default()).unwrap().id,
            "sbd"
        );
    }

    #[test]
    fn test_empty() {
        assert!(get_best_version(&[], &VersionPolicy::default()).is_none());
    }
}
