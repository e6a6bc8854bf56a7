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

//! Turns a raw request URI into bounds-checked, mutually-consistent
//! request parameters. Split in two: `parse_query_surface` handles the
//! HTTP-level rules (method, path shape, `n`/`s`/`cont` bounds) that both
//! local and aggregator mode share; `resolve_local_path` is the
//! filesystem-touching half only local mode needs, since an aggregator
//! peer's log file never lives on this host.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::LogServError;
use crate::model::{
    Query, GLOBAL_MAX_RESULTS, MAX_CONTINUATION_TOKEN_LENGTH, MAX_PATH_LENGTH,
    MAX_SEARCH_TEXT_LENGTH,
};

/// The validated, mode-agnostic shape of one request's query string. The
/// `cont` token (if any) is returned undecoded: local mode decodes it as
/// a `LocalContinuation`, aggregator mode demuxes it as `SecondaryToken`s,
/// since the two wire formats differ even though the bounds/exclusivity
/// rules checked here are identical.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuerySurface {
    /// The request path, percent-decoded, with any leading `/` stripped.
    pub relative_path: String,
    pub max_results: usize,
    pub query: Option<Query>,
    pub cont_token: Option<String>,
}

/// Only `GET` is accepted; any other method is a 404, deliberately terse
/// and deliberately not a 405.
pub fn check_method(method: &http::Method) -> Result<(), LogServError> {
    if *method != http::Method::GET {
        return Err(LogServError::NotFound);
    }
    Ok(())
}

fn query_map(raw_query: &str) -> HashMap<String, String> {
    let mut m = HashMap::new();
    if raw_query.is_empty() {
        return m;
    }
    for item in raw_query.split('&') {
        if let Some((key, value)) = item.split_once('=') {
            let key = urlencoding::decode(key).unwrap_or_default().into_owned();
            let value = urlencoding::decode(value).unwrap_or_default().into_owned();
            m.insert(key, value);
        }
    }
    m
}

/// Parses `uri` (the raw request-target: path plus optional `?query`)
/// into a `QuerySurface`. Does not touch the filesystem.
pub fn parse_query_surface(uri: &str) -> Result<QuerySurface, LogServError> {
    let (raw_path, raw_query) = match uri.split_once('?') {
        Some((p, q)) => (p, q),
        None => (uri, ""),
    };

    if raw_path.len() > MAX_PATH_LENGTH {
        return Err(LogServError::Validation("path too long".to_string()));
    }

    let decoded_path = urlencoding::decode(raw_path)
        .map_err(|_| LogServError::Validation("malformed path".to_string()))?
        .into_owned();
    let relative_path = decoded_path.trim_start_matches('/').to_string();
    if relative_path.is_empty() {
        return Err(LogServError::NotFound);
    }

    let params = query_map(raw_query);
    let has_cont = params.contains_key("cont");
    let has_paged_params = params.contains_key("n") || params.contains_key("s");
    if has_cont && has_paged_params {
        return Err(LogServError::Validation(
            "continuation cannot be combined with n or s".to_string(),
        ));
    }

    if let Some(token) = params.get("cont") {
        if token.len() > MAX_CONTINUATION_TOKEN_LENGTH {
            return Err(LogServError::Validation(
                "continuation token too long".to_string(),
            ));
        }
        return Ok(QuerySurface {
            relative_path,
            max_results: GLOBAL_MAX_RESULTS,
            query: None,
            cont_token: Some(token.clone()),
        });
    }

    let max_results = match params.get("n") {
        Some(raw) => {
            let parsed: usize = raw
                .parse()
                .map_err(|_| LogServError::Validation("n must be a positive integer".to_string()))?;
            if parsed == 0 {
                return Err(LogServError::Validation(
                    "n must be a positive integer".to_string(),
                ));
            }
            parsed.min(GLOBAL_MAX_RESULTS)
        }
        None => GLOBAL_MAX_RESULTS,
    };

    let query = match params.get("s") {
        Some(text) => {
            if text.len() > MAX_SEARCH_TEXT_LENGTH {
                return Err(LogServError::Validation(
                    "s exceeds the maximum search text length".to_string(),
                ));
            }
            Some(Query::Text {
                text: text.clone(),
            })
        }
        None => None,
    };

    Ok(QuerySurface {
        relative_path,
        max_results,
        query,
        cont_token: None,
    })
}

/// Resolves `relative` against `log_root`, rejecting any path whose
/// canonical form escapes `log_root` (directory-traversal guard) or that
/// does not name an accessible file.
pub fn resolve_local_path(relative: &str, log_root: &Path) -> Result<PathBuf, LogServError> {
    let candidate = log_root.join(relative);
    let canonical_root = log_root
        .canonicalize()
        .map_err(|_| LogServError::Unexpected("log root is not accessible".to_string()))?;
    let canonical = candidate
        .canonicalize()
        .map_err(|_| LogServError::NotFound)?;
    if !canonical.starts_with(&canonical_root) {
        return Err(LogServError::NotFound);
    }
    Ok(canonical)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn with_log_root<F: FnOnce(&Path)>(f: F) {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("app.log"), "hello\nworld\n").unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested/inner.log"), "x\n").unwrap();
        f(dir.path());
    }

    fn parse(uri: &str, log_root: &Path) -> Result<(QuerySurface, PathBuf), LogServError> {
        let surface = parse_query_surface(uri)?;
        let path = resolve_local_path(&surface.relative_path, log_root)?;
        Ok((surface, path))
    }

    #[test]
    fn get_is_the_only_accepted_method() {
        assert!(check_method(&http::Method::GET).is_ok());
        assert!(matches!(
            check_method(&http::Method::POST).unwrap_err(),
            LogServError::NotFound
        ));
    }

    #[test]
    fn plain_path_defaults_to_global_max_results() {
        with_log_root(|root| {
            let (surface, _) = parse("/app.log", root).unwrap();
            assert_eq!(surface.max_results, GLOBAL_MAX_RESULTS);
            assert_eq!(surface.query, None);
            assert_eq!(surface.cont_token, None);
        });
    }

    #[test]
    fn n_and_s_are_applied() {
        with_log_root(|root| {
            let (surface, _) = parse("/app.log?n=5&s=hello", root).unwrap();
            assert_eq!(surface.max_results, 5);
            assert_eq!(surface.query, Some(Query::Text { text: "hello".to_string() }));
        });
    }

    #[test]
    fn n_above_global_cap_is_clamped() {
        with_log_root(|root| {
            let (surface, _) = parse("/app.log?n=999999", root).unwrap();
            assert_eq!(surface.max_results, GLOBAL_MAX_RESULTS);
        });
    }

    #[test]
    fn n_zero_is_rejected() {
        with_log_root(|root| {
            let err = parse("/app.log?n=0", root).unwrap_err();
            match err {
                LogServError::Validation(msg) => assert!(msg.contains('n')),
                _ => panic!("expected validation error"),
            }
        });
    }

    #[test]
    fn n_non_numeric_is_rejected() {
        with_log_root(|root| {
            let err = parse("/app.log?n=xyz", root).unwrap_err();
            match err {
                LogServError::Validation(msg) => assert!(msg.contains('n')),
                _ => panic!("expected validation error"),
            }
        });
    }

    #[test]
    fn cont_with_n_is_rejected() {
        with_log_root(|root| {
            let err = parse("/app.log?cont=abc&n=5", root).unwrap_err();
            match err {
                LogServError::Validation(msg) => assert!(msg.to_lowercase().contains("continuation")),
                _ => panic!("expected validation error"),
            }
        });
    }

    #[test]
    fn traversal_outside_log_root_is_not_found() {
        with_log_root(|root| {
            let err = parse("/../../etc/passwd", root).unwrap_err();
            assert!(matches!(err, LogServError::NotFound));
        });
    }

    #[test]
    fn empty_path_is_not_found() {
        with_log_root(|root| {
            let err = parse("/", root).unwrap_err();
            assert!(matches!(err, LogServError::NotFound));
        });
    }

    #[test]
    fn nested_path_is_accepted() {
        with_log_root(|root| {
            let (_, path) = parse("/nested/inner.log", root).unwrap();
            assert!(path.ends_with("nested/inner.log"));
        });
    }

    #[test]
    fn missing_file_is_not_found() {
        with_log_root(|root| {
            let err = parse("/does-not-exist.log", root).unwrap_err();
            assert!(matches!(err, LogServError::NotFound));
        });
    }

    #[test]
    fn search_text_too_long_is_rejected() {
        with_log_root(|root| {
            let long = "a".repeat(MAX_SEARCH_TEXT_LENGTH + 1);
            let err = parse(&format!("/app.log?s={}", long), root).unwrap_err();
            assert!(matches!(err, LogServError::Validation(_)));
        });
    }

    #[test]
    fn oversized_cont_token_is_rejected() {
        with_log_root(|root| {
            let long = "a".repeat(MAX_CONTINUATION_TOKEN_LENGTH + 1);
            let err = parse(&format!("/app.log?cont={}", long), root).unwrap_err();
            assert!(matches!(err, LogServError::Validation(_)));
        });
    }
}
