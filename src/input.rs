//! Oracle feed: newline-delimited JSON observations.

use std::io::BufRead;

use thiserror::Error;

use crate::landmarks::HandObservation;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("feed read failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

impl FeedError {
    /// Parse errors only cost one frame; I/O errors end the stream.
    pub fn is_fatal(&self) -> bool {
        matches!(self, FeedError::Io(_))
    }
}

/// Iterates observations from a line-oriented reader, skipping blank lines.
pub struct ObservationReader<R> {
    reader: R,
    line_no: usize,
    buf: String,
}

impl<R: BufRead> ObservationReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line_no: 0,
            buf: String::new(),
        }
    }
}

impl<R: BufRead> Iterator for ObservationReader<R> {
    type Item = Result<HandObservation, FeedError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.buf.clear();
            match self.reader.read_line(&mut self.buf) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(e) => return Some(Err(e.into())),
            }
            self.line_no += 1;
            let line = self.buf.trim();
            if line.is_empty() {
                continue;
            }
            return Some(serde_json::from_str(line).map_err(|source| FeedError::Parse {
                line: self.line_no,
                source,
            }));
        }
    }
}
