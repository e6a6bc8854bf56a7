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

//! Drives the scanner, applies the substring filter, and decides when a
//! scan is exhausted versus merely paused at `maxResults`.

use std::path::Path;

use crate::error::LogServError;
use crate::model::{LocalResult, SearchOptions};
use crate::scanner::ReverseLineScanner;

/// Runs one bounded scan of `path` and returns up to `options.max_results`
/// matching lines, most recent first.
///
/// `resume_from` is exhausted (the caller should stop asking for more
/// pages) exactly when the last line read started at file offset 0, since
/// there is nothing older left to read.
pub fn search(path: &Path, options: &SearchOptions) -> Result<LocalResult, LogServError> {
    let scanner = ReverseLineScanner::open(path, options.resume_from)?;

    let mut entries = Vec::with_capacity(options.max_results.min(64));
    let mut resume_from = None;

    for line in scanner {
        let line = line?;
        // Recorded unconditionally, before the empty-line skip or the
        // filter, so an unmatched or empty tail still advances resumeFrom.
        resume_from = Some(line.offset);

        if line.bytes.is_empty() {
            if line.offset == 0 {
                resume_from = None;
                return Ok(LocalResult {
                    entries,
                    resume_from,
                });
            }
            continue;
        }

        let text = String::from_utf8_lossy(&line.bytes).into_owned();
        let matched = match &options.query {
            Some(query) => query.matches(&text),
            None => true,
        };

        if matched {
            entries.push(text);
            if entries.len() >= options.max_results {
                break;
            }
        }

        if line.offset == 0 {
            resume_from = None;
            return Ok(LocalResult {
                entries,
                resume_from,
            });
        }
    }

    // A scan that breaks at maxResults without ever reaching offset 0 still
    // has more to read; resumeFrom carries the last line's offset in that
    // case already.
    if resume_from == Some(0) {
        resume_from = None;
    }

    Ok(LocalResult {
        entries,
        resume_from,
    })
}
