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

//! Opens a file read-only and yields fixed-size byte windows from end toward
//! start.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use crate::error::LogServError;
use crate::model::{Chunk, CHUNK_SIZE};

pub struct ChunkReader {
    file: File,
    /// Exclusive upper bound of the next chunk to be yielded.
    cursor: u64,
    done: bool,
}

impl ChunkReader {
    /// The upper bound this reader was opened with, before any chunk has
    /// been consumed. Used by the scanner to tell an empty scan range
    /// (nothing to read) from a scan that simply hasn't started yet.
    pub fn initial_bound(&self) -> u64 {
        self.cursor
    }

    /// Opens `path` read-only and positions the reader at `end` (or the
    /// file's current size when `end` is `None`).
    pub fn open(path: &Path, end: Option<u64>) -> Result<Self, LogServError> {
        let file = File::open(path).map_err(|_| LogServError::NotFound)?;
        if !file.metadata()?.is_file() {
            return Err(LogServError::NotFound);
        }
        let size = file.metadata()?.len();
        let cursor = match end {
            Some(end) if end > size => {
                return Err(LogServError::Validation(
                    "resume offset exceeds file size".to_string(),
                ))
            }
            Some(end) => end,
            None => size,
        };
        Ok(ChunkReader {
            file,
            cursor,
            done: false,
        })
    }

    /// Reads the next older chunk, or `None` once the chunk starting at
    /// offset 0 has been emitted.
    pub fn next_chunk(&mut self) -> Result<Option<Chunk>, LogServError> {
        if self.done {
            return Ok(None);
        }
        let end = self.cursor;
        let start = end.saturating_sub(CHUNK_SIZE as u64);
        let len = (end - start) as usize;

        let mut bytes = vec![0u8; len];
        self.file.seek(SeekFrom::Start(start))?;

        // A short read must be retried until the full window is in hand;
        // running out of bytes before then means the file shrank mid-scan.
        let mut filled = 0;
        while filled < len {
            let n = self.file.read(&mut bytes[filled..])?;
            if n == 0 {
                return Err(LogServError::Unexpected(
                    "unexpected end of file while reading chunk".to_string(),
                ));
            }
            filled += n;
        }

        self.cursor = start;
        if start == 0 {
            self.done = true;
        }
        Ok(Some(Chunk {
            offset: start,
            bytes,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_fixture(contents: &[u8]) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(contents).unwrap();
        f.flush().unwrap();
        f
    }

    #[test]
    fn single_small_chunk_covers_whole_file() {
        let f = write_fixture(b"hello\nworld\n");
        let mut reader = ChunkReader::open(f.path(), None).unwrap();
        let chunk = reader.next_chunk().unwrap().unwrap();
        assert_eq!(chunk.offset, 0);
        assert_eq!(chunk.bytes, b"hello\nworld\n");
        assert!(reader.next_chunk().unwrap().is_none());
    }

    #[test]
    fn multi_chunk_file_terminates_at_zero() {
        let data = vec![b'a'; CHUNK_SIZE * 2 + 10];
        let f = write_fixture(&data);
        let mut reader = ChunkReader::open(f.path(), None).unwrap();

        let c1 = reader.next_chunk().unwrap().unwrap();
        assert_eq!(c1.offset, CHUNK_SIZE as u64 * 2);
        assert_eq!(c1.bytes.len(), 10);

        let c2 = reader.next_chunk().unwrap().unwrap();
        assert_eq!(c2.offset, CHUNK_SIZE as u64);
        assert_eq!(c2.bytes.len(), CHUNK_SIZE);

        let c3 = reader.next_chunk().unwrap().unwrap();
        assert_eq!(c3.offset, 0);
        assert_eq!(c3.bytes.len(), CHUNK_SIZE);

        assert!(reader.next_chunk().unwrap().is_none());
    }

    #[test]
    fn end_beyond_file_size_is_invalid_offset() {
        let f = write_fixture(b"short");
        let err = ChunkReader::open(f.path(), Some(1000)).unwrap_err();
        assert!(matches!(err, LogServError::Validation(_)));
    }

    #[test]
    fn missing_file_is_not_found() {
        let err = ChunkReader::open(Path::new("/nonexistent/does-not-exist.log"), None)
            .unwrap_err();
        assert!(matches!(err, LogServError::NotFound));
    }
}
