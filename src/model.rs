/**
 * Copyright (c) 2024-2025 Glaive, Inc.
 *
 * This file is part of Glaive Gateway
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License
 * along with this program.  If not, see <http://www.gnu.org/licenses/>.
 */

//! Shared data model for the reverse-scan + search + aggregator pipeline.

use serde::{Deserialize, Serialize};

/// Caps applied throughout the request surface.
pub const CHUNK_SIZE: usize = 64 * 1024;
pub const MAX_RESULT_ENTRY_LENGTH: usize = 2048;
pub const GLOBAL_MAX_RESULTS: usize = 100;
pub const MAX_SEARCH_TEXT_LENGTH: usize = 200;
pub const MAX_PATH_LENGTH: usize = 1000;
pub const MAX_CONTINUATION_TOKEN_LENGTH: usize = 200;
pub const GLOBAL_TIMEOUT_MS: u64 = 5000;

/// A contiguous window of bytes read from a file, tagged with its offset.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub offset: u64,
    pub bytes: Vec<u8>,
}

/// A complete log line, exclusive of its terminating newline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub offset: u64,
    pub bytes: Vec<u8>,
}

/// The only query variant today is a plain substring match. Modeled as an
/// enum so a future variant (regex, fielded predicates) is a non-breaking
/// addition at the match site in `engine.rs` and the codec in
/// `continuation.rs`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Query {
    Text { text: String },
}

impl Query {
    pub fn text(&self) -> &str {
        match self {
            Query::Text { text } => text,
        }
    }

    pub fn matches(&self, line: &str) -> bool {
        match self {
            Query::Text { text } => line.contains(text.as_str()),
        }
    }
}

/// Parameters of a single scan, already bounds-checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchOptions {
    pub max_results: usize,
    pub query: Option<Query>,
    pub resume_from: Option<u64>,
}

/// Output of one local scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalResult {
    pub entries: Vec<String>,
    pub resume_from: Option<u64>,
}

/// Token contents carried between client and server for single-host mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalContinuation {
    pub resume_from: u64,
    pub max_results: usize,
    pub query: Option<Query>,
}

/// One peer's continuation inside an aggregator mux token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecondaryToken {
    pub host: String,
    pub cont: String,
}

/// One entry in the aggregator's merged output, tagged with its origin host.
#[derive(Debug, Clone, Serialize)]
pub struct AggregatorEntry {
    pub host: String,
    pub entry: String,
}

/// A per-peer failure note surfaced alongside (not instead of) successful
/// entries from other peers.
#[derive(Debug, Clone, Serialize)]
pub struct AggregatorMessage {
    pub host: String,
    pub message: String,
}

/// Output of one aggregator fan-out.
#[derive(Debug, Clone, Serialize)]
pub struct AggregatorResult {
    pub messages: Vec<AggregatorMessage>,
    pub entries: Vec<AggregatorEntry>,
    pub cont: Option<String>,
}
