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

//! Opaque continuation tokens: base64(JSON) over a small, strictly-shaped
//! payload. A single-host token carries `[resumeFrom, maxResults, query]`;
//! an aggregator token carries one `{host, cont}` pair per peer still in
//! play. Any shape mismatch on decode is a validation error, never a panic.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::LogServError;
use crate::model::{LocalContinuation, Query, SecondaryToken, MAX_CONTINUATION_TOKEN_LENGTH};

fn bad_token() -> LogServError {
    LogServError::Validation("invalid continuation token".to_string())
}

pub fn encode_local(cont: &LocalContinuation) -> String {
    let query_value = match &cont.query {
        Some(q) => serde_json::to_value(q).expect("query always serializes"),
        None => Value::Null,
    };
    let payload = Value::Array(vec![
        Value::from(cont.resume_from),
        Value::from(cont.max_results as u64),
        query_value,
    ]);
    let json = serde_json::to_vec(&payload).expect("continuation payload always serializes");
    URL_SAFE_NO_PAD.encode(json)
}

pub fn decode_local(token: &str) -> Result<LocalContinuation, LogServError> {
    if token.len() > MAX_CONTINUATION_TOKEN_LENGTH {
        return Err(LogServError::Validation(
            "continuation token too long".to_string(),
        ));
    }
    let bytes = URL_SAFE_NO_PAD.decode(token).map_err(|_| bad_token())?;
    let value: Value = serde_json::from_slice(&bytes).map_err(|_| bad_token())?;
    let arr = value.as_array().ok_or_else(bad_token)?;
    if arr.len() != 3 {
        return Err(bad_token());
    }
    let resume_from = arr[0].as_u64().ok_or_else(bad_token)?;
    let max_results = arr[1].as_u64().ok_or_else(bad_token)? as usize;
    let query = match &arr[2] {
        Value::Null => None,
        obj @ Value::Object(_) => {
            let query: Query = serde_json::from_value(obj.clone()).map_err(|_| bad_token())?;
            Some(query)
        }
        _ => return Err(bad_token()),
    };
    Ok(LocalContinuation {
        resume_from,
        max_results,
        query,
    })
}

#[derive(Debug, Serialize, Deserialize)]
struct MuxPayload {
    peers: Vec<SecondaryToken>,
}

pub fn encode_mux(peers: &[SecondaryToken]) -> String {
    let payload = MuxPayload {
        peers: peers.to_vec(),
    };
    let json = serde_json::to_vec(&payload).expect("mux payload always serializes");
    URL_SAFE_NO_PAD.encode(json)
}

pub fn decode_mux(token: &str) -> Result<Vec<SecondaryToken>, LogServError> {
    if token.len() > MAX_CONTINUATION_TOKEN_LENGTH {
        return Err(LogServError::Validation(
            "continuation token too long".to_string(),
        ));
    }
    let bytes = URL_SAFE_NO_PAD.decode(token).map_err(|_| bad_token())?;
    let payload: MuxPayload = serde_json::from_slice(&bytes).map_err(|_| bad_token())?;
    if payload.peers.is_empty() {
        return Err(bad_token());
    }
    Ok(payload.peers)
}
