//! Build checkpoints.
//!
//! A session records everything needed to pick a build up where it stopped:
//! the source context, the slide generated for every chunk so far, and the
//! decks produced by interactive refinement (the undo history).

use crate::deck::{SlideContent, SlideDeck};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Format version written by this build.
pub const SESSION_VERSION: u32 = 1;

const SESSION_SUFFIX: &str = "_session.json";
const NEW_SESSION_SUFFIX: &str = "_session_new.json";

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid session file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Session format {0} is newer than supported ({SESSION_VERSION})")]
    UnsupportedVersion(u32),
}

pub type Result<T> = std::result::Result<T, SessionError>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub version: u32,
    /// Source document, or its summary, used as chat context
    #[serde(default)]
    pub source_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_size: Option<usize>,
    /// Generated slide per chunk index
    #[serde(default)]
    pub slides: BTreeMap<usize, SlideContent>,
    /// Next chunk to generate
    #[serde(default)]
    pub cursor: usize,
    /// Decks produced by refinement, oldest first
    #[serde(default)]
    pub history: Vec<SlideDeck>,
    #[serde(default)]
    pub saved_at: Option<DateTime<Utc>>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(String::new())
    }
}

impl Session {
    pub fn new(source_text: impl Into<String>) -> Self {
        Self {
            version: SESSION_VERSION,
            source_text: source_text.into(),
            source_path: None,
            chunk_size: None,
            slides: BTreeMap::new(),
            cursor: 0,
            history: Vec::new(),
            saved_at: None,
        }
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| SessionError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let session: Session = serde_json::from_str(&json)?;
        if session.version > SESSION_VERSION {
            return Err(SessionError::UnsupportedVersion(session.version));
        }
        tracing::debug!(
            path = %path.display(),
            slides = session.slides.len(),
            revisions = session.history.len(),
            "loaded session"
        );
        Ok(session)
    }

    /// Write the session next to `path` first and move it into place, so an
    /// interrupted save never leaves a truncated checkpoint.
    pub fn save<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let path = path.as_ref();
        self.saved_at = Some(Utc::now());
        let json = serde_json::to_string_pretty(self)?;

        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        let io_err = |source| SessionError::Io {
            path: path.to_path_buf(),
            source,
        };
        std::fs::write(&tmp, json).map_err(io_err)?;
        std::fs::rename(&tmp, path).map_err(io_err)?;
        tracing::debug!(path = %path.display(), cursor = self.cursor, "saved session");
        Ok(())
    }

    /// `deck.pptx` → `deck_pptx_session.json` in the same directory.
    pub fn default_path(output: &Path) -> PathBuf {
        Self::path_with_suffix(output, SESSION_SUFFIX)
    }

    /// Where a session that is not a resumed one is saved: the default path,
    /// or `<..>_session_new.json` if that already exists.
    pub fn fresh_path(output: &Path) -> PathBuf {
        let path = Self::default_path(output);
        if path.exists() {
            Self::path_with_suffix(output, NEW_SESSION_SUFFIX)
        } else {
            path
        }
    }

    fn path_with_suffix(output: &Path, suffix: &str) -> PathBuf {
        let name = output
            .file_name()
            .map(|name| name.to_string_lossy().replace('.', "_"))
            .unwrap_or_default();
        output.with_file_name(format!("{}{}", name, suffix))
    }

    pub fn has_slide(&self, chunk: usize) -> bool {
        self.slides.contains_key(&chunk)
    }

    /// Store the slide for `chunk`, replacing any earlier one.
    pub fn record_slide(&mut self, chunk: usize, slide: SlideContent) {
        self.slides.insert(chunk, slide);
        self.cursor = self.cursor.max(chunk + 1);
    }

    /// The latest refined deck, or the built slides in chunk order.
    pub fn current_deck(&self) -> SlideDeck {
        if let Some(deck) = self.history.last() {
            return deck.clone();
        }
        self.slides
            .values()
            .enumerate()
            .map(|(i, slide)| slide.renumbered((i + 1) as f64))
            .collect::<Vec<_>>()
            .into()
    }

    pub fn push_revision(&mut self, deck: SlideDeck) {
        self.history.push(deck);
    }

    /// Drop the latest revision. The first one is never dropped; returns
    /// whether anything was undone.
    pub fn undo(&mut self) -> bool {
        if self.history.len() > 1 {
            self.history.pop();
            true
        } else {
            false
        }
    }

    /// Nothing worth checkpointing: no source, no slides, no revisions.
    pub fn is_empty(&self) -> bool {
        self.source_path.is_none() && self.slides.is_empty() && self.history.is_empty()
    }
}
