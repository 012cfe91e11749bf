// /////////////////////////////////////////////////////////////////////////////
// Media Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Minimal HTTP adapters for the indexer and torrent-client collaborators
//! (§1/§6's explicit non-goals — these demonstrate the seam, not a feature-
//! complete client for any particular indexer or torrent daemon's API).

mod indexer_client;
mod torrent_client;

pub use indexer_client::HttpIndexerClient;
pub use torrent_client::HttpTorrentClient;
