// /////////////////////////////////////////////////////////////////////////////
// Media Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Concrete Video File Selection (§4.4)
//!
//! A torrent client's `content_path` names the download's root, not a
//! specific video — for a multi-file torrent that root is a directory.
//! Every caller that resolves a completed download into the `sourceFilePath`
//! the encode step reads needs to turn that root into one concrete file
//! first: for a TV episode, the file whose name carries the requested
//! season/episode marker; for a movie, the largest non-sample video file
//! under it. Finding nothing is a hard failure, not a retry — there is no
//! external signal left to wait on that would change the answer.

use std::path::{Path, PathBuf};

use regex::Regex;

use media_pipeline_domain::PipelineError;

const VIDEO_EXTENSIONS: &[&str] = &["mkv", "mp4", "avi", "m4v", "ts"];

fn has_video_extension(path: &Path) -> bool {
    path.extension().and_then(|ext| ext.to_str()).map(|ext| VIDEO_EXTENSIONS.iter().any(|v| v.eq_ignore_ascii_case(ext))).unwrap_or(false)
}

/// A sample release: `/sample/` anywhere in the path, or a filename that
/// begins with or otherwise carries `sample` set off by a separator rather
/// than it just being a substring of a longer word.
fn is_sample(path: &Path) -> bool {
    if path.components().any(|c| c.as_os_str().to_string_lossy().eq_ignore_ascii_case("sample")) {
        return true;
    }
    let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
        return false;
    };
    let lower = stem.to_lowercase();
    lower.split(|c: char| !c.is_ascii_alphanumeric()).any(|word| word == "sample")
}

/// `S01E02`, `S1E2`, or `1x02` — any padding of season/episode, anchored so
/// a coincidental digit run elsewhere in the name doesn't match.
fn matches_episode(filename: &str, season: u32, episode: u32) -> bool {
    let lower = filename.to_lowercase();
    let se_pattern = format!(r"\bs0*{season}e0*{episode}\b");
    let x_pattern = format!(r"\b{season}x0*{episode}\b");
    [se_pattern, x_pattern].iter().any(|p| Regex::new(p).map(|re| re.is_match(&lower)).unwrap_or(false))
}

async fn collect_files(root: &Path) -> Result<Vec<PathBuf>, PipelineError> {
    let mut out = Vec::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        let mut entries = tokio::fs::read_dir(&dir)
            .await
            .map_err(|err| PipelineError::internal(format!("reading download directory {}: {err}", dir.display())))?;
        while let Some(entry) =
            entries.next_entry().await.map_err(|err| PipelineError::internal(format!("reading directory entry: {err}")))?
        {
            let file_type =
                entry.file_type().await.map_err(|err| PipelineError::internal(format!("reading file type: {err}")))?;
            if file_type.is_dir() {
                pending.push(entry.path());
            } else if file_type.is_file() {
                out.push(entry.path());
            }
        }
    }
    Ok(out)
}

/// Resolves a torrent's `content_path` (file or directory) down to one
/// concrete, non-sample video file. `episode` is `Some((season, episode))`
/// for a TV item, `None` for a movie.
pub async fn select_video_file(content_path: &str, episode: Option<(u32, u32)>) -> Result<String, PipelineError> {
    let root = Path::new(content_path);
    let metadata = tokio::fs::metadata(root)
        .await
        .map_err(|err| PipelineError::internal(format!("reading download content path {content_path}: {err}")))?;

    let files = if metadata.is_dir() { collect_files(root).await? } else { vec![root.to_path_buf()] };
    let candidates: Vec<PathBuf> = files.into_iter().filter(|p| has_video_extension(p) && !is_sample(p)).collect();

    let chosen = match episode {
        Some((season, ep)) => candidates
            .into_iter()
            .find(|p| p.file_name().and_then(|n| n.to_str()).map(|n| matches_episode(n, season, ep)).unwrap_or(false)),
        None => {
            let mut sized = Vec::with_capacity(candidates.len());
            for path in candidates {
                let len = tokio::fs::metadata(&path).await.map(|m| m.len()).unwrap_or(0);
                sized.push((len, path));
            }
            sized.into_iter().max_by_key(|(len, _)| *len).map(|(_, path)| path)
        }
    };

    chosen
        .map(|p| p.to_string_lossy().into_owned())
        .ok_or_else(|| PipelineError::internal(format!("no concrete video file found under {content_path}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[tokio::test]
    async fn movie_picks_the_largest_non_sample_video() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("sample.mkv"), vec![0u8; 10]).unwrap();
        fs::write(dir.path().join("inception.mkv"), vec![0u8; 1000]).unwrap();
        fs::write(dir.path().join("inception.nfo"), vec![0u8; 2000]).unwrap();

        let chosen = select_video_file(dir.path().to_str().unwrap(), None).await.unwrap();
        assert!(chosen.ends_with("inception.mkv"));
    }

    #[tokio::test]
    async fn movie_excludes_a_sample_subdirectory() {
        let dir = tempfile::tempdir().unwrap();
        let sample_dir = dir.path().join("Sample");
        fs::create_dir(&sample_dir).unwrap();
        fs::write(sample_dir.join("inception-sample.mkv"), vec![0u8; 9999]).unwrap();
        fs::write(dir.path().join("inception.mkv"), vec![0u8; 1000]).unwrap();

        let chosen = select_video_file(dir.path().to_str().unwrap(), None).await.unwrap();
        assert!(chosen.ends_with("inception.mkv"));
    }

    #[tokio::test]
    async fn tv_picks_the_file_matching_the_requested_episode() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("Show.S01E01.mkv"), vec![0u8; 10]).unwrap();
        fs::write(dir.path().join("Show.S01E02.mkv"), vec![0u8; 10]).unwrap();

        let chosen = select_video_file(dir.path().to_str().unwrap(), Some((1, 2))).await.unwrap();
        assert!(chosen.ends_with("Show.S01E02.mkv"));
    }

    #[tokio::test]
    async fn tv_matches_unpadded_and_x_separated_forms() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("Show.1x2.mkv"), vec![0u8; 10]).unwrap();

        let chosen = select_video_file(dir.path().to_str().unwrap(), Some((1, 2))).await.unwrap();
        assert!(chosen.ends_with("Show.1x2.mkv"));
    }

    #[tokio::test]
    async fn no_matching_video_is_a_hard_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("readme.txt"), vec![0u8; 10]).unwrap();

        let err = select_video_file(dir.path().to_str().unwrap(), None).await.unwrap_err();
        assert!(matches!(err, PipelineError::Internal(_)));
    }

    #[tokio::test]
    async fn single_file_content_path_is_used_directly() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("inception.mkv");
        fs::write(&file, vec![0u8; 10]).unwrap();

        let chosen = select_video_file(file.to_str().unwrap(), None).await.unwrap();
        assert_eq!(chosen, file.to_str().unwrap());
    }
}
