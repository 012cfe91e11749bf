// /////////////////////////////////////////////////////////////////////////////
// Media Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Release quality vocabulary and the search step's ranking/partition logic
//! (§4.3). Ranking is pure domain business logic — it has no dependency on
//! how releases were actually discovered (that's the indexer collaborator,
//! §6) — so it lives here rather than in the search step implementation.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    R480p,
    R720p,
    R1080p,
    R2160p,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Codec {
    H264,
    Hevc,
    Av1,
    Other,
}

/// One candidate release as reported by the indexer collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Release {
    pub title: String,
    pub resolution: Resolution,
    pub codec: Codec,
    pub seeders: u32,
    pub size_bytes: u64,
    pub publish_date: chrono::DateTime<chrono::Utc>,
    pub download_url: String,
}

/// Per-delivery-target minimum requirements a release must meet (§4.3).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityTarget {
    pub min_resolution: Resolution,
    pub max_resolution: Option<Resolution>,
    pub preferred_codec: Option<Codec>,
}

impl Release {
    /// A release "meets" a target when its resolution is within
    /// `[min_resolution, max_resolution]` (max unbounded if unset).
    pub fn meets(&self, target: &QualityTarget) -> bool {
        if self.resolution < target.min_resolution {
            return false;
        }
        if let Some(max) = target.max_resolution {
            if self.resolution > max {
                return false;
            }
        }
        true
    }
}

/// Partition of indexer results for a request's *strictest* target.
pub struct RankedReleases {
    /// Releases meeting the strictest target, best first (§4.3 tie-breaks).
    pub meets_quality: Vec<Release>,
    /// Everything else, best first, offered to `acceptLowerQuality` (§4.3e).
    pub alternatives: Vec<Release>,
}

/// Ranks and partitions releases per §4.3's ordering:
/// 1. resolution closest to target without exceeding max
/// 2. higher seeders
/// 3. preferred codec
/// 4. smaller size within a 30% band
/// 5. more recent publish date
pub fn rank_releases(releases: Vec<Release>, target: &QualityTarget) -> RankedReleases {
    let (mut meets, mut alternatives): (Vec<Release>, Vec<Release>) =
        releases.into_iter().partition(|r| r.meets(target));

    let median_size = |items: &[Release]| -> u64 {
        if items.is_empty() {
            return 0;
        }
        let mut sizes: Vec<u64> = items.iter().map(|r| r.size_bytes).collect();
        sizes.sort_unstable();
        sizes[sizes.len() / 2]
    };

    let sort_key = |items: &mut Vec<Release>, target: &QualityTarget| {
        let reference_size = median_size(items);
        items.sort_by(|a, b| {
            // 1. resolution closest to target without exceeding max: prefer the
            // lowest resolution that still meets the minimum (closest fit).
            let dist = |r: &Release| (r.resolution as i32 - target.min_resolution as i32).abs();
            dist(a)
                .cmp(&dist(b))
                // 2. higher seeders
                .then(b.seeders.cmp(&a.seeders))
                // 3. preferred codec matches
                .then_with(|| {
                    let pref = target.preferred_codec;
                    let a_match = pref.map(|c| c == a.codec).unwrap_or(false);
                    let b_match = pref.map(|c| c == b.codec).unwrap_or(false);
                    b_match.cmp(&a_match)
                })
                // 4. smaller size, only distinguishing within a 30% band of the median
                .then_with(|| {
                    let band = (reference_size as f64 * 0.3) as u64;
                    let a_in_band = a.size_bytes.abs_diff(reference_size) <= band;
                    let b_in_band = b.size_bytes.abs_diff(reference_size) <= band;
                    if a_in_band && b_in_band {
                        a.size_bytes.cmp(&b.size_bytes)
                    } else {
                        std::cmp::Ordering::Equal
                    }
                })
                // 5. more recent publish date
                .then(b.publish_date.cmp(&a.publish_date))
        });
    };

    sort_key(&mut meets, target);
    sort_key(&mut alternatives, target);

    RankedReleases { meets_quality: meets, alternatives }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn release(res: Resolution, seeders: u32, size: u64, days_ago: i64) -> Release {
        Release {
            title: "x".into(),
            resolution: res,
            codec: Codec::H264,
            seeders,
            size_bytes: size,
            publish_date: chrono::Utc.timestamp_opt(1_700_000_000 - days_ago * 86_400, 0).unwrap(),
            download_url: "magnet:?xt=x".into(),
        }
    }

    #[test]
    fn partitions_by_meeting_target() {
        let target = QualityTarget { min_resolution: Resolution::R1080p, max_resolution: None, preferred_codec: None };
        let releases = vec![
            release(Resolution::R720p, 100, 1_000_000, 0),
            release(Resolution::R1080p, 10, 1_000_000, 0),
        ];
        let ranked = rank_releases(releases, &target);
        assert_eq!(ranked.meets_quality.len(), 1);
        assert_eq!(ranked.alternatives.len(), 1);
        assert_eq!(ranked.meets_quality[0].resolution, Resolution::R1080p);
    }

    #[test]
    fn prefers_higher_seeders_at_equal_resolution_distance() {
        let target = QualityTarget { min_resolution: Resolution::R1080p, max_resolution: None, preferred_codec: None };
        let releases = vec![release(Resolution::R1080p, 5, 1_000_000, 0), release(Resolution::R1080p, 500, 1_000_000, 0)];
        let ranked = rank_releases(releases, &target);
        assert_eq!(ranked.meets_quality[0].seeders, 500);
    }
}
