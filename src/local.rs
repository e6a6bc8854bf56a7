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

//! Serves one host's log files: validate the request, run the engine,
//! mint a continuation if more lines remain. Never reaches
//! `upstream_peer`, since this is a pure request_filter responder.

use std::path::Path;

use pingora::proxy::Session;
use pingora::Result as PingoraResult;
use serde::Serialize;
use tracing::warn;

use crate::continuation::{decode_local, encode_local};
use crate::engine::search;
use crate::error::LogServError;
use crate::model::{LocalContinuation, Query, SearchOptions};
use crate::response::{write_error, write_json};
use crate::validate::{check_method, parse_query_surface, resolve_local_path};

#[derive(Debug, Serialize)]
pub struct LocalResponseBody {
    pub entries: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cont: Option<String>,
}

/// Handles one request against `log_root`, writing the response directly
/// to `session` and returning whether the proxy lifecycle should stop
/// (always `true`, since there is no upstream to reach).
pub async fn handle(session: &mut Session, log_root: &Path) -> PingoraResult<bool> {
    let header = session.req_header().clone();
    let uri = header
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or(header.uri.path());

    match respond(&header.method, uri, log_root) {
        Ok(body) => write_json(session, &body).await,
        Err(err) => {
            warn!(path = %uri, error = %err, "local request failed");
            write_error(session, &err).await
        }
    }
}

fn respond(method: &http::Method, uri: &str, log_root: &Path) -> Result<LocalResponseBody, LogServError> {
    check_method(method)?;
    let surface = parse_query_surface(uri)?;

    let (max_results, query, resume_from): (usize, Option<Query>, Option<u64>) =
        match &surface.cont_token {
            Some(token) => {
                let cont = decode_local(token)?;
                (cont.max_results, cont.query, Some(cont.resume_from))
            }
            None => (surface.max_results, surface.query.clone(), None),
        };

    let path = resolve_local_path(&surface.relative_path, log_root)?;
    let options = SearchOptions {
        max_results,
        query: query.clone(),
        resume_from,
    };
    let result = search(&path, &options)?;

    let cont = result.resume_from.map(|resume_from| {
        encode_local(&LocalContinuation {
            resume_from,
            max_results,
            query: query.clone(),
        })
    });

    Ok(LocalResponseBody {
        entries: result.entries,
        cont,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn respond_returns_entries_and_continuation() {
        let dir = tempfile::tempdir().unwrap();
        let lines: Vec<String> = (0..150).map(|i| format!("line-{i}")).collect();
        fs::write(dir.path().join("app.log"), lines.join("\n") + "\n").unwrap();

        let body = respond(&http::Method::GET, "/app.log", dir.path()).unwrap();
        assert_eq!(body.entries.len(), 100);
        assert_eq!(body.entries[0], "line-149");
        assert!(body.cont.is_some());
    }

    #[test]
    fn respond_without_continuation_when_exhausted() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("small.log"), "a\nb\nc\n").unwrap();

        let body = respond(&http::Method::GET, "/small.log?n=100", dir.path()).unwrap();
        assert_eq!(body.entries, vec!["c", "b", "a"]);
        assert!(body.cont.is_none());
    }

    #[test]
    fn respond_propagates_validation_errors() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("app.log"), "a\n").unwrap();
        let err = respond(&http::Method::GET, "/app.log?n=0", dir.path()).unwrap_err();
        assert!(matches!(err, LogServError::Validation(_)));
    }

    #[test]
    fn respond_rejects_non_get_method() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("app.log"), "a\n").unwrap();
        let err = respond(&http::Method::POST, "/app.log", dir.path()).unwrap_err();
        assert!(matches!(err, LogServError::NotFound));
    }

    #[test]
    fn respond_paginates_with_query_preserved_across_pages() {
        let dir = tempfile::tempdir().unwrap();
        let lines: Vec<String> = (0..10)
            .map(|i| format!("entry-{i} status"))
            .collect();
        fs::write(dir.path().join("paged.log"), lines.join("\n") + "\n").unwrap();

        let page1 = respond(&http::Method::GET, "/paged.log?n=3&s=status", dir.path()).unwrap();
        assert_eq!(page1.entries.len(), 3);
        let token = page1.cont.unwrap();

        let page2 = respond(
            &http::Method::GET,
            &format!("/paged.log?cont={token}"),
            dir.path(),
        )
        .unwrap();
        assert_eq!(page2.entries.len(), 3);
        assert_eq!(page2.entries[0], "entry-6 status");
    }
}
