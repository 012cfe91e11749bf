// /////////////////////////////////////////////////////////////////////////////
// Media Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! The live worker connection table (§5's "shared resource mutated only by
//! dispatcher tasks"). One entry per connected encoder: an outgoing channel
//! the websocket write-half drains, plus the snapshot the assignment sweep
//! needs to pick a target without a DB round trip. `RemoteEncoderRepository`
//! remains the reconciliation source of truth across restarts (invariant 5);
//! this table is steady-state only and empties on process exit.

use std::collections::HashMap;
use std::sync::RwLock;

use tokio::sync::mpsc;

use media_pipeline_domain::value_objects::ids::EncoderId;

use super::protocol::ServerMessage;

struct Connection {
    sender: mpsc::UnboundedSender<ServerMessage>,
    max_concurrent: u32,
    current_jobs: u32,
    total_completed: u64,
}

/// A connected encoder with enough spare capacity to take a job.
pub struct Candidate {
    pub encoder_id: EncoderId,
    pub spare_capacity: u32,
    pub total_completed: u64,
}

#[derive(Default)]
pub struct ConnectionRegistry {
    connections: RwLock<HashMap<EncoderId, Connection>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, encoder_id: EncoderId, sender: mpsc::UnboundedSender<ServerMessage>, max_concurrent: u32, current_jobs: u32) {
        self.connections.write().unwrap().insert(encoder_id, Connection { sender, max_concurrent, current_jobs, total_completed: 0 });
    }

    pub fn remove(&self, encoder_id: EncoderId) {
        self.connections.write().unwrap().remove(&encoder_id);
    }

    pub fn is_connected(&self, encoder_id: EncoderId) -> bool {
        self.connections.read().unwrap().contains_key(&encoder_id)
    }

    pub fn update_jobs(&self, encoder_id: EncoderId, current_jobs: u32) {
        if let Some(conn) = self.connections.write().unwrap().get_mut(&encoder_id) {
            conn.current_jobs = current_jobs;
        }
    }

    pub fn note_completed(&self, encoder_id: EncoderId) {
        if let Some(conn) = self.connections.write().unwrap().get_mut(&encoder_id) {
            conn.total_completed += 1;
            conn.current_jobs = conn.current_jobs.saturating_sub(1);
        }
    }

    pub fn note_released(&self, encoder_id: EncoderId) {
        if let Some(conn) = self.connections.write().unwrap().get_mut(&encoder_id) {
            conn.current_jobs = conn.current_jobs.saturating_sub(1);
        }
    }

    pub fn note_taken(&self, encoder_id: EncoderId) {
        if let Some(conn) = self.connections.write().unwrap().get_mut(&encoder_id) {
            conn.current_jobs += 1;
        }
    }

    pub fn send(&self, encoder_id: EncoderId, message: ServerMessage) -> bool {
        match self.connections.read().unwrap().get(&encoder_id) {
            Some(conn) => conn.sender.send(message).is_ok(),
            None => false,
        }
    }

    pub fn broadcast(&self, message: impl Fn() -> ServerMessage) {
        for conn in self.connections.read().unwrap().values() {
            let _ = conn.sender.send(message());
        }
    }

    pub fn connected_ids(&self) -> Vec<EncoderId> {
        self.connections.read().unwrap().keys().copied().collect()
    }

    /// Connected encoders with spare capacity, ordered by most-spare-first
    /// then `totalCompleted` descending (§4.5's enqueue tie-break).
    pub fn candidates_with_capacity(&self) -> Vec<Candidate> {
        let mut out: Vec<Candidate> = self
            .connections
            .read()
            .unwrap()
            .iter()
            .filter_map(|(id, conn)| {
                let spare = conn.max_concurrent.saturating_sub(conn.current_jobs);
                (spare > 0).then_some(Candidate { encoder_id: *id, spare_capacity: spare, total_completed: conn.total_completed })
            })
            .collect();
        out.sort_by(|a, b| b.spare_capacity.cmp(&a.spare_capacity).then(b.total_completed.cmp(&a.total_completed)));
        out
    }

    /// Any connected encoder that advertised capacity at all, even if every
    /// job slot is currently full — distinct from `candidates_with_capacity`,
    /// which additionally requires *spare* capacity right now. An encoder
    /// that registered with `maxConcurrent=0` never qualifies, full or not.
    pub fn any_connected(&self) -> Option<EncoderId> {
        self.connections.read().unwrap().iter().find(|(_, conn)| conn.max_concurrent > 0).map(|(id, _)| *id)
    }
}
