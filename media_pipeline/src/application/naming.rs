// /////////////////////////////////////////////////////////////////////////////
// Media Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Delivery & Naming (C11, §4.6)
//!
//! Computes the destination path a delivered file lands at, by media kind.
//! Pure string computation — no filesystem access, no transport — so the
//! deliver step can unit-test path shapes without a collaborator.

use media_pipeline_domain::value_objects::media_kind::MediaKind;
use media_pipeline_domain::value_objects::release::{Codec, Resolution};

#[derive(Debug, Clone)]
pub struct NamingConfig {
    pub movies_root: String,
    pub tv_root: String,
}

fn sanitize(component: &str) -> String {
    component.chars().map(|c| if "/\\:*?\"<>|".contains(c) { '_' } else { c }).collect()
}

fn resolution_tag(resolution: Resolution) -> &'static str {
    match resolution {
        Resolution::R480p => "480p",
        Resolution::R720p => "720p",
        Resolution::R1080p => "1080p",
        Resolution::R2160p => "2160p",
    }
}

fn codec_tag(codec: Codec) -> &'static str {
    match codec {
        Codec::H264 => "h264",
        Codec::Hevc => "hevc",
        Codec::Av1 => "av1",
        Codec::Other => "other",
    }
}

/// What the deliver step knows about one encoded file, independent of the
/// `MediaKind` it is naming for.
#[derive(Debug, Clone)]
pub struct DeliveryTarget<'a> {
    pub title: &'a str,
    pub year: u16,
    pub tmdb_id: &'a str,
    pub resolution: Resolution,
    pub codec: Codec,
    pub extension: &'a str,
    pub season: Option<u32>,
    pub episode: Option<u32>,
    pub episode_title: Option<&'a str>,
}

/// `<moviesRoot>/<Title> (<Year>) [tmdb-<id>] [<res> <codec>].<ext>` for
/// movies; `<tvRoot>/<Series> (<Year>)/Season <SS>/<Series> - S<SS>E<EE> -
/// <EpTitle> [<res> <codec>].<ext>` for TV (§4.6).
pub fn destination_path(config: &NamingConfig, kind: MediaKind, target: &DeliveryTarget) -> String {
    let title = sanitize(target.title);
    let res = resolution_tag(target.resolution);
    let codec = codec_tag(target.codec);

    match kind {
        MediaKind::Movie => {
            format!(
                "{}/{} ({}) [tmdb-{}] [{} {}].{}",
                config.movies_root.trim_end_matches('/'),
                title,
                target.year,
                target.tmdb_id,
                res,
                codec,
                target.extension
            )
        }
        MediaKind::Tv => {
            let season = target.season.unwrap_or(0);
            let episode = target.episode.unwrap_or(0);
            let ep_title = target.episode_title.map(sanitize).unwrap_or_default();
            format!(
                "{}/{} ({})/Season {:02}/{} - S{:02}E{:02} - {} [{} {}].{}",
                config.tv_root.trim_end_matches('/'),
                title,
                target.year,
                season,
                title,
                season,
                episode,
                ep_title,
                res,
                codec,
                target.extension
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> NamingConfig {
        NamingConfig { movies_root: "/media/movies".into(), tv_root: "/media/tv".into() }
    }

    #[test]
    fn movie_path_matches_shape() {
        let target = DeliveryTarget {
            title: "Inception",
            year: 2010,
            tmdb_id: "27205",
            resolution: Resolution::R1080p,
            codec: Codec::H264,
            extension: "mkv",
            season: None,
            episode: None,
            episode_title: None,
        };
        let path = destination_path(&config(), MediaKind::Movie, &target);
        assert_eq!(path, "/media/movies/Inception (2010) [tmdb-27205] [1080p h264].mkv");
    }

    #[test]
    fn tv_path_matches_shape() {
        let target = DeliveryTarget {
            title: "Breaking Bad",
            year: 2008,
            tmdb_id: "1396",
            resolution: Resolution::R1080p,
            codec: Codec::Hevc,
            extension: "mkv",
            season: Some(1),
            episode: Some(3),
            episode_title: Some("...And the Bag's in the River"),
        };
        let path = destination_path(&config(), MediaKind::Tv, &target);
        assert_eq!(
            path,
            "/media/tv/Breaking Bad (2008)/Season 01/Breaking Bad - S01E03 - ...And the Bag's in the River [1080p hevc].mkv"
        );
    }

    #[test]
    fn path_separators_in_titles_are_sanitised() {
        let target = DeliveryTarget {
            title: "A/B: The Movie",
            year: 2020,
            tmdb_id: "1",
            resolution: Resolution::R2160p,
            codec: Codec::Av1,
            extension: "mp4",
            season: None,
            episode: None,
            episode_title: None,
        };
        let path = destination_path(&config(), MediaKind::Movie, &target);
        assert!(!path["/media/movies/".len()..].contains('/'));
    }
}
