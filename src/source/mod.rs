//! Source text for slide generation.
//!
//! A source is either a Word document (`.docx`, `.docm`, `.dotx`), read as the
//! text of its body paragraphs, or any other file read as UTF-8 text with one
//! paragraph per line. Text is handed to the builder in chunks bounded by a
//! word count.
//!
//! ```no_run
//! use slidewright::source;
//!
//! for chunk in source::read_chunks("notes.docx", 500)? {
//!     println!("{}", chunk?);
//! }
//! # Ok::<(), slidewright::source::SourceError>(())
//! ```

pub mod docx;

use crate::opc::OpcError;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Source file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Word document error: {0}")]
    Package(#[from] OpcError),

    #[error("Chunk size must be at least one word")]
    InvalidChunkSize,
}

pub type Result<T> = std::result::Result<T, SourceError>;

/// Boxed paragraph stream feeding [`WordChunks`].
type Paragraphs<'a> = Box<dyn Iterator<Item = io::Result<String>> + 'a>;

/// How a source file is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Docx,
    PlainText,
}

impl SourceFormat {
    /// Detect the format from the file extension.
    pub fn from_path(path: &Path) -> Self {
        let is_word = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                ["docx", "docm", "dotx"]
                    .iter()
                    .any(|known| ext.eq_ignore_ascii_case(known))
            });
        if is_word { Self::Docx } else { Self::PlainText }
    }
}

/// Whole text of a source, each paragraph followed by a newline.
pub fn read_all<P: AsRef<Path>>(path: P) -> Result<String> {
    let mut text = String::new();
    for paragraph in paragraphs(path.as_ref())? {
        text.push_str(&paragraph?);
        text.push('\n');
    }
    Ok(text)
}

/// Lazy chunks of `chunk_size` words from a source file.
///
/// Plain text files are streamed line by line; Word documents are parsed
/// up front since the paragraphs live inside a zip member.
pub fn read_chunks<P: AsRef<Path>>(path: P, chunk_size: usize) -> Result<WordChunks<'static>> {
    if chunk_size == 0 {
        return Err(SourceError::InvalidChunkSize);
    }
    Ok(WordChunks::new(paragraphs(path.as_ref())?, chunk_size))
}

/// Chunks of `chunk_size` words from in-memory text.
pub fn chunk_text(text: &str, chunk_size: usize) -> Result<WordChunks<'_>> {
    if chunk_size == 0 {
        return Err(SourceError::InvalidChunkSize);
    }
    let lines = text.lines().map(|line| Ok(line.to_string()));
    Ok(WordChunks::new(Box::new(lines), chunk_size))
}

/// Number of whitespace-separated words.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

fn paragraphs(path: &Path) -> Result<Paragraphs<'static>> {
    if !path.exists() {
        return Err(SourceError::NotFound(path.to_path_buf()));
    }
    match SourceFormat::from_path(path) {
        SourceFormat::Docx => {
            let paras = docx::read_paragraphs(path)?;
            tracing::debug!(path = %path.display(), paragraphs = paras.len(), "read word document");
            Ok(Box::new(paras.into_iter().map(Ok)))
        },
        SourceFormat::PlainText => {
            let reader = BufReader::new(File::open(path)?);
            Ok(Box::new(reader.lines()))
        },
    }
}

/// Iterator over word-bounded chunks of a paragraph stream.
///
/// Every chunk holds exactly `chunk_size` words except the last, which holds
/// the remainder and is only produced when non-empty. Words are joined by a
/// single space, or by a newline where a paragraph ends inside the chunk.
pub struct WordChunks<'a> {
    paragraphs: Paragraphs<'a>,
    chunk_size: usize,
    /// Words of the current paragraph not yet emitted
    pending: std::vec::IntoIter<String>,
    /// A new paragraph started since the last word was pushed
    paragraph_break: bool,
    done: bool,
}

impl<'a> WordChunks<'a> {
    fn new(paragraphs: Paragraphs<'a>, chunk_size: usize) -> Self {
        Self {
            paragraphs,
            chunk_size,
            pending: Vec::new().into_iter(),
            paragraph_break: false,
            done: false,
        }
    }

    /// Next word, or `None` at the end of the source.
    fn next_word(&mut self) -> Option<io::Result<String>> {
        loop {
            if let Some(word) = self.pending.next() {
                return Some(Ok(word));
            }
            match self.paragraphs.next()? {
                Ok(paragraph) => {
                    let words: Vec<String> = paragraph.split_whitespace().map(str::to_string).collect();
                    if !words.is_empty() {
                        self.pending = words.into_iter();
                    }
                },
                Err(e) => return Some(Err(e)),
            }
            self.paragraph_break = true;
        }
    }
}

impl Iterator for WordChunks<'_> {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let mut chunk = String::new();
        let mut words = 0usize;
        while words < self.chunk_size {
            match self.next_word() {
                Some(Ok(word)) => {
                    if words > 0 {
                        chunk.push(if self.paragraph_break { '\n' } else { ' ' });
                    }
                    self.paragraph_break = false;
                    chunk.push_str(&word);
                    words += 1;
                },
                Some(Err(e)) => {
                    self.done = true;
                    return Some(Err(e.into()));
                },
                None => {
                    self.done = true;
                    break;
                },
            }
        }

        (words > 0).then_some(Ok(chunk))
    }
}
