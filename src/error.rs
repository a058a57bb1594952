use std::io;

use thiserror::Error;

/// A selection rejected before anything is read. The message is what the
/// alert shows.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IntakeError {
  #[error("You may only select a single file!")]
  FileCount(usize),
  #[error("The file selected must be an mp3!")]
  MediaType(String),
}

#[derive(Debug, Error)]
pub enum DecodeError {
  #[error("unrecognized or malformed audio data: {0}")]
  Malformed(String),
  #[error("decoded audio contains no samples")]
  Empty,
}

/// A failure after a selection was accepted.
#[derive(Debug, Error)]
pub enum LoadError {
  #[error("could not read {name}: {source}")]
  Read { name: String, source: io::Error },
  #[error("could not decode {name}: {source}")]
  Decode { name: String, source: DecodeError },
  #[error("could not start {name}: {source}")]
  Start { name: String, source: anyhow::Error },
}
