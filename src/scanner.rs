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

//! Consumes chunks from a `ChunkReader` and emits whole log lines in
//! descending-offset order.

use std::path::Path;

use crate::error::LogServError;
use crate::model::{Chunk, Line, MAX_RESULT_ENTRY_LENGTH};
use crate::reader::ChunkReader;

pub struct ReverseLineScanner {
    reader: ChunkReader,
    /// The chunk currently being searched, plus how much of its window
    /// (`[0, line_ending)`) is still unsearched.
    current: Option<(Chunk, usize)>,
    /// Leading fragment of a line whose terminator hasn't been found yet,
    /// assembled by prepending older (earlier-offset) fragments as they're
    /// discovered.
    partial: Vec<u8>,
    /// True until the first newline search of the whole scan has run. The
    /// very first search can land exactly on the scan's starting boundary
    /// (file end with a trailing newline, or a `resumeFrom` that, by
    /// construction, always sits right after a real newline); that hit
    /// is a boundary artifact, not a real empty line, and must be
    /// swallowed once.
    first_search: bool,
    /// True once the chunk reader has yielded its offset-0 chunk.
    chunks_exhausted: bool,
    /// True once the final partial has been flushed (or skipped).
    flushed: bool,
    /// The scan's starting boundary, captured before any chunk is read.
    /// Zero means there is nothing to scan at all.
    started_at: u64,
}

impl ReverseLineScanner {
    pub fn open(path: &Path, starting_offset: Option<u64>) -> Result<Self, LogServError> {
        let reader = ChunkReader::open(path, starting_offset)?;
        let started_at = reader.initial_bound();
        Ok(ReverseLineScanner {
            reader,
            current: None,
            partial: Vec::new(),
            first_search: true,
            chunks_exhausted: false,
            flushed: false,
            started_at,
        })
    }

    fn prepend(&mut self, prefix: &[u8]) {
        let mut buf = Vec::with_capacity(prefix.len() + self.partial.len());
        buf.extend_from_slice(prefix);
        buf.extend_from_slice(&self.partial);
        if buf.len() > MAX_RESULT_ENTRY_LENGTH {
            buf.truncate(MAX_RESULT_ENTRY_LENGTH);
        }
        self.partial = buf;
    }
}

impl Iterator for ReverseLineScanner {
    type Item = Result<Line, LogServError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.current.is_none() {
                if self.chunks_exhausted {
                    if self.flushed {
                        return None;
                    }
                    self.flushed = true;
                    if self.started_at == 0 {
                        return None;
                    }
                    let bytes = std::mem::take(&mut self.partial);
                    return Some(Ok(Line { offset: 0, bytes }));
                }
                match self.reader.next_chunk() {
                    Ok(Some(chunk)) => {
                        let line_ending = chunk.bytes.len();
                        self.current = Some((chunk, line_ending));
                    }
                    Ok(None) => {
                        self.chunks_exhausted = true;
                        continue;
                    }
                    Err(err) => return Some(Err(err)),
                }
            }

            let (chunk, line_ending) = self.current.as_mut().expect("just populated");
            if *line_ending == 0 {
                let was_last = chunk.offset == 0;
                self.current = None;
                if was_last {
                    self.chunks_exhausted = true;
                }
                continue;
            }

            let window = &chunk.bytes[0..*line_ending];
            match window.iter().rposition(|&b| b == b'\n') {
                Some(p) => {
                    let tail = chunk.bytes[p + 1..*line_ending].to_vec();
                    let offset = chunk.offset + p as u64 + 1;
                    let suppress_boundary_artifact = self.first_search && tail.is_empty();
                    self.first_search = false;
                    *line_ending = p;
                    if suppress_boundary_artifact {
                        continue;
                    }
                    self.prepend(&tail);
                    let bytes = std::mem::take(&mut self.partial);
                    return Some(Ok(Line { offset, bytes }));
                }
                None => {
                    self.first_search = false;
                    let prefix = chunk.bytes[0..*line_ending].to_vec();
                    self.prepend(&prefix);
                    *line_ending = 0;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn fixture(contents: &[u8]) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(contents).unwrap();
        f.flush().unwrap();
        f
    }

    fn scan_all(path: &Path, from: Option<u64>) -> Vec<Line> {
        ReverseLineScanner::open(path, from)
            .unwrap()
            .map(|r| r.unwrap())
            .collect()
    }

    #[test]
    fn basic_reverse_order_with_trailing_newline() {
        let f = fixture(b"one\ntwo\nthree\n");
        let lines = scan_all(f.path(), None);
        let strs: Vec<&str> = lines
            .iter()
            .map(|l| std::str::from_utf8(&l.bytes).unwrap())
            .collect();
        assert_eq!(strs, vec!["three", "two", "one"]);
        assert_eq!(lines[2].offset, 0);
    }

    #[test]
    fn no_trailing_newline() {
        let f = fixture(b"one\ntwo\nthree");
        let lines = scan_all(f.path(), None);
        let strs: Vec<&str> = lines
            .iter()
            .map(|l| std::str::from_utf8(&l.bytes).unwrap())
            .collect();
        assert_eq!(strs, vec!["three", "two", "one"]);
    }

    #[test]
    fn leading_newline_yields_empty_oldest_line() {
        let f = fixture(b"\nfoo\n");
        let lines = scan_all(f.path(), None);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].bytes, b"foo");
        assert_eq!(lines[1].bytes, b"");
        assert_eq!(lines[1].offset, 0);
    }

    #[test]
    fn consecutive_newlines_yield_empty_lines() {
        let f = fixture(b"a\n\n\nb\n");
        let lines = scan_all(f.path(), None);
        let strs: Vec<&str> = lines
            .iter()
            .map(|l| std::str::from_utf8(&l.bytes).unwrap())
            .collect();
        assert_eq!(strs, vec!["b", "", "", "a"]);
    }

    #[test]
    fn resumability_matches_invariant() {
        let f = fixture(b"one\ntwo\nthree\nfour\n");
        let all = scan_all(f.path(), None);
        // resume from the second line (offset of "three")
        let resume_point = all[1].offset;
        let resumed = scan_all(f.path(), Some(resume_point));
        assert_eq!(resumed, all[2..].to_vec());
    }

    #[test]
    fn resume_from_zero_yields_nothing() {
        let f = fixture(b"one\ntwo\n");
        let lines = scan_all(f.path(), Some(0));
        assert!(lines.is_empty());
    }

    #[test]
    fn empty_file_yields_no_lines() {
        let f = fixture(b"");
        let lines = scan_all(f.path(), None);
        assert!(lines.is_empty());
    }

    #[test]
    fn long_line_is_truncated_but_offset_is_true_start() {
        // A single line far longer than MAX_RESULT_ENTRY_LENGTH, spanning
        // multiple CHUNK_SIZE-sized reads, followed by a short line.
        let long_line = vec![b'x'; MAX_RESULT_ENTRY_LENGTH * 40];
        let mut contents = long_line.clone();
        contents.push(b'\n');
        contents.extend_from_slice(b"short\n");
        let f = fixture(&contents);
        let lines = scan_all(f.path(), None);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].bytes, b"short");
        assert_eq!(lines[1].offset, 0);
        assert_eq!(lines[1].bytes.len(), MAX_RESULT_ENTRY_LENGTH);
        assert!(lines[1].bytes.iter().all(|&b| b == b'x'));
    }
}
