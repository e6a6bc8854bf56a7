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

//! Fans a query out to every configured peer under one shared deadline,
//! merges their answers, and isolates per-peer failure so one unreachable
//! host never sinks the whole response.

use std::time::Duration;

use pingora::proxy::Session;
use pingora::Result as PingoraResult;
use serde::Deserialize;
use tracing::warn;

use crate::continuation::{decode_mux, encode_mux};
use crate::model::{
    AggregatorEntry, AggregatorMessage, AggregatorResult, SecondaryToken, GLOBAL_TIMEOUT_MS,
};
use crate::response::{write_error, write_json};
use crate::validate::{check_method, parse_query_surface};

use crate::error::LogServError;

#[derive(Debug, Deserialize)]
struct PeerResponseBody {
    entries: Vec<String>,
    #[serde(default)]
    cont: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PeerErrorBody {
    error: String,
}

struct PeerOutcome {
    host: String,
    entries: Vec<String>,
    cont: Option<String>,
    message: Option<String>,
}

fn peer_url(host: &str, path_and_query: &str) -> String {
    format!("http://{host}{path_and_query}")
}

async fn fetch_peer(client: &reqwest::Client, host: String, url: String) -> PeerOutcome {
    match client.get(&url).send().await {
        Ok(resp) if resp.status().is_success() => match resp.json::<PeerResponseBody>().await {
            Ok(body) => PeerOutcome {
                host,
                entries: body.entries,
                cont: body.cont,
                message: None,
            },
            Err(err) => PeerOutcome {
                host,
                entries: Vec::new(),
                cont: None,
                message: Some(format!("malformed response: {err}")),
            },
        },
        Ok(resp) => {
            let status = resp.status();
            let message = match resp.json::<PeerErrorBody>().await {
                Ok(body) => body.error,
                Err(_) => format!("peer returned status {status}"),
            };
            PeerOutcome {
                host,
                entries: Vec::new(),
                cont: None,
                message: Some(message),
            }
        }
        Err(err) => PeerOutcome {
            host,
            entries: Vec::new(),
            cont: None,
            message: Some(format!("request failed: {err}")),
        },
    }
}

/// `targets` is one `(host, path_and_query)` pair per peer this round:
/// every peer on a fresh query, or only the peers whose mux token still
/// carried a `cont` when resuming a page.
async fn fan_out(targets: Vec<(String, String)>) -> Vec<PeerOutcome> {
    let client = reqwest::Client::new();
    let deadline = Duration::from_millis(GLOBAL_TIMEOUT_MS);

    let tasks: Vec<_> = targets
        .into_iter()
        .map(|(host, path_and_query)| {
            let client = client.clone();
            let url = peer_url(&host, &path_and_query);
            tokio::spawn(async move {
                match tokio::time::timeout(deadline, fetch_peer(&client, host.clone(), url)).await
                {
                    Ok(outcome) => outcome,
                    Err(_) => PeerOutcome {
                        host,
                        entries: Vec::new(),
                        cont: None,
                        message: Some("timed out".to_string()),
                    },
                }
            })
        })
        .collect();

    let mut outcomes = Vec::with_capacity(tasks.len());
    for joined in futures::future::join_all(tasks).await {
        match joined {
            Ok(outcome) => outcomes.push(outcome),
            Err(err) => warn!(error = %err, "peer fan-out task panicked"),
        }
    }
    outcomes
}

fn merge(outcomes: Vec<PeerOutcome>) -> AggregatorResult {
    let mut messages = Vec::new();
    let mut entries = Vec::new();
    let mut peers_with_more = Vec::new();

    for outcome in outcomes {
        if let Some(message) = outcome.message {
            messages.push(AggregatorMessage {
                host: outcome.host.clone(),
                message,
            });
        }
        for entry in outcome.entries {
            entries.push(AggregatorEntry {
                host: outcome.host.clone(),
                entry,
            });
        }
        if let Some(cont) = outcome.cont {
            peers_with_more.push(SecondaryToken {
                host: outcome.host,
                cont,
            });
        }
    }

    let cont = if peers_with_more.is_empty() {
        None
    } else {
        Some(encode_mux(&peers_with_more))
    };

    AggregatorResult {
        messages,
        entries,
        cont,
    }
}

/// Handles one aggregator request: validates it with the same rules local
/// mode applies (method, `n`/`s`/`cont` bounds and exclusivity; path
/// existence is irrelevant here since the file lives on a peer, not this
/// host), then builds this round's per-peer targets from either a fresh
/// query (every known host) or a decoded mux token (only the hosts still
/// paging), fans out, and writes the merged JSON.
pub async fn handle(
    session: &mut Session,
    hosts: &[String],
    method: &http::Method,
    raw_path: &str,
    raw_query: &str,
) -> PingoraResult<bool> {
    if let Err(err) = check_method(method) {
        return write_error(session, &err).await;
    }

    if hosts.is_empty() {
        return write_error(
            session,
            &LogServError::Unexpected("no peer hosts configured".to_string()),
        )
        .await;
    }

    let uri = if raw_query.is_empty() {
        raw_path.to_string()
    } else {
        format!("{raw_path}?{raw_query}")
    };
    let surface = match parse_query_surface(&uri) {
        Ok(surface) => surface,
        Err(err) => return write_error(session, &err).await,
    };

    let targets = if let Some(token) = &surface.cont_token {
        match decode_mux(token) {
            Ok(peers) => peers
                .into_iter()
                .map(|peer| (peer.host, format!("{raw_path}?cont={}", peer.cont)))
                .collect(),
            Err(err) => return write_error(session, &err).await,
        }
    } else {
        let mut forwarded_query = format!("n={}", surface.max_results);
        if let Some(query) = &surface.query {
            forwarded_query.push_str("&s=");
            forwarded_query.push_str(&urlencoding::encode(query.text()));
        }
        hosts
            .iter()
            .map(|host| (host.clone(), format!("{raw_path}?{forwarded_query}")))
            .collect()
    };

    let outcomes = fan_out(targets).await;
    let result = merge(outcomes);
    write_json(session, &result).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_concatenates_entries_and_collects_messages() {
        let outcomes = vec![
            PeerOutcome {
                host: "a:1065".to_string(),
                entries: vec!["one".to_string(), "two".to_string()],
                cont: Some("tok-a".to_string()),
                message: None,
            },
            PeerOutcome {
                host: "b:1065".to_string(),
                entries: Vec::new(),
                cont: None,
                message: Some("request failed: connection refused".to_string()),
            },
        ];
        let result = merge(outcomes);
        assert_eq!(result.entries.len(), 2);
        assert_eq!(result.entries[0].host, "a:1065");
        assert_eq!(result.messages.len(), 1);
        assert_eq!(result.messages[0].host, "b:1065");
        assert!(result.cont.is_some());
    }

    #[test]
    fn merge_omits_cont_when_no_peer_has_more() {
        let outcomes = vec![PeerOutcome {
            host: "a:1065".to_string(),
            entries: vec!["only".to_string()],
            cont: None,
            message: None,
        }];
        let result = merge(outcomes);
        assert!(result.cont.is_none());
    }

    #[test]
    fn peer_url_always_uses_plain_http() {
        assert_eq!(
            peer_url("host-a:1065", "/app.log?n=10"),
            "http://host-a:1065/app.log?n=10"
        );
    }
}
