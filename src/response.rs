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

use bytes::Bytes;
use pingora::http::ResponseHeader;
use pingora::proxy::Session;
use pingora::Result as PingoraResult;
use serde::Serialize;

use crate::error::LogServError;

/// Writes `body` as a `200 application/json` response with
/// `Cache-Control: no-cache`, since every successful answer reflects the
/// log file's state at the moment it was read.
pub async fn write_json<T: Serialize>(session: &mut Session, body: &T) -> PingoraResult<bool> {
    let mut header = ResponseHeader::build(200, None)?;
    header.insert_header("Content-Type", "application/json")?;
    header.insert_header("Cache-Control", "no-cache")?;
    let mut json_body = serde_json::to_string_pretty(body).expect("response body always serializes");
    json_body.push('\n');
    session.set_keepalive(None);
    session.write_response_header(Box::new(header), false).await?;
    session
        .write_response_body(Some(Bytes::from(json_body)), true)
        .await?;
    Ok(true)
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

/// Writes `err` as a `{status}` response whose body is `{"error": "..."}`.
pub async fn write_error(session: &mut Session, err: &LogServError) -> PingoraResult<bool> {
    let mut header = ResponseHeader::build(err.status_code(), None)?;
    header.insert_header("Content-Type", "application/json")?;
    let body = ErrorBody {
        error: err.body_message(),
    };
    let mut json_body = serde_json::to_string_pretty(&body).expect("error body always serializes");
    json_body.push('\n');
    session.set_keepalive(None);
    session.write_response_header(Box::new(header), false).await?;
    session
        .write_response_body(Some(Bytes::from(json_body)), true)
        .await?;
    Ok(true)
}