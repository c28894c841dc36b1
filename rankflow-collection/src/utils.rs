use std::fs::{metadata, File};
use std::io::prelude::*;
use std::io::{self, BufReader, SeekFrom};

use thiserror::Error;

use rankflow_core::deferred::{batch_apply, Deferred};

use crate::collection::memory::MemoryCollection;

/// An I/O failure while reading a chunk of a text file.  It travels through the
/// collection as a value, so it has to be cheap to clone.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("failed reading {path} near byte {offset}: {message}")]
pub struct ReadError {
    /// File being read
    pub path: String,
    /// Start of the chunk that failed
    pub offset: u64,
    /// Description of the underlying I/O error
    pub message: String
}

/// A line read by `read_text`
pub type Line = Result<String, ReadError>;

#[derive(Clone)]
struct Chunk { path: String, start: u64, end: u64 }

impl Chunk {
    fn error(&self, e: io::Error) -> ReadError {
        ReadError { path: self.path.clone(), offset: self.start, message: e.to_string() }
    }
}

/// Reads a text file as a collection of lines, one partition per `chunk_size` bytes.
/// A line belongs to the chunk in which it starts, so no line is split or repeated
/// whatever the chunk size.  Line endings are stripped.
///
/// ```rust
///   use std::io::Write;
///   use rankflow_core::scheduler::LeveledScheduler;
///   use rankflow_collection::utils::read_text;
///
///   let mut file = tempfile::NamedTempFile::new().unwrap();
///   writeln!(file, "a b\nc d").unwrap();
///   let lines = read_text(file.path().to_str().unwrap(), 2).unwrap();
///   let lines: Vec<String> = lines.run(&LeveledScheduler::new()).unwrap()
///       .into_iter().collect::<Result<_, _>>().unwrap();
///   assert_eq!(lines, vec!["a b".to_owned(), "c d".to_owned()]);
/// ```
pub fn read_text(path: &str, chunk_size: u64) -> io::Result<MemoryCollection<Line>> {
    let file_size = metadata(path)?.len();
    let chunk_size = chunk_size.max(1);

    let mut dfs = Vec::new();
    let mut offset = 0u64;
    while offset < file_size {
        let chunk = Chunk { path: path.into(), start: offset, end: offset + chunk_size };
        dfs.push(Deferred::lift(chunk, Some(&format!("{}@{}", path, offset))));
        offset += chunk_size;
    }
    debug!("Reading {} ({} bytes) in {} chunks", path, file_size, dfs.len());

    Ok(MemoryCollection::from_defs(batch_apply(&dfs, read)))
}

fn read(_idx: usize, chunk: &Chunk) -> Vec<Line> {
    match read_lines(chunk) {
        Ok(lines) => lines.into_iter().map(Ok).collect(),
        Err(e) => vec![Err(chunk.error(e))]
    }
}

fn read_lines(chunk: &Chunk) -> io::Result<Vec<String>> {
    let mut reader = BufReader::new(File::open(&chunk.path)?);

    // A chunk starting mid-file skips up to and including the first newline at or
    // after its start; that line belongs to the previous chunk.
    let mut pos = if chunk.start > 0 {
        reader.seek(SeekFrom::Start(chunk.start - 1))?;
        let mut skipped = Vec::new();
        let size = reader.read_until(b'\n', &mut skipped)?;
        chunk.start - 1 + size as u64
    } else {
        0
    };

    let mut lines = Vec::new();
    while pos < chunk.end {
        let mut line = String::new();
        let size = reader.read_line(&mut line)?;
        if size == 0 {
            break;
        }
        pos += size as u64;
        if line.ends_with('\n') {
            line.pop();
            if line.ends_with('\r') {
                line.pop();
            }
        }
        lines.push(line);
    }
    Ok(lines)
}
