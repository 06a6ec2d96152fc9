//! SyncKind - 送信先の種類
//!
//! Producers only ever enqueue a [`SyncKind`]. What is read back from storage is an
//! [`ItemKind`], because the persisted list may have been written by a build that knew
//! about kinds this one does not.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The closed set of remote submission targets.
///
/// Serialized with the wire tags used by the persisted queue
/// (`SUBMIT_QUIZ_RESULT`, `SUBMIT_GAME_RESULT`, `GENERIC_SYNC`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SyncKind {
    #[serde(rename = "SUBMIT_QUIZ_RESULT")]
    QuizResult,
    #[serde(rename = "SUBMIT_GAME_RESULT")]
    GameResult,
    #[serde(rename = "GENERIC_SYNC")]
    Generic,
}

impl SyncKind {
    pub const ALL: [SyncKind; 3] = [SyncKind::QuizResult, SyncKind::GameResult, SyncKind::Generic];

    /// Wire tag, also used as the id prefix.
    pub fn tag(self) -> &'static str {
        match self {
            SyncKind::QuizResult => "SUBMIT_QUIZ_RESULT",
            SyncKind::GameResult => "SUBMIT_GAME_RESULT",
            SyncKind::Generic => "GENERIC_SYNC",
        }
    }

    /// Human readable label for status screens.
    pub fn label(self) -> &'static str {
        match self {
            SyncKind::QuizResult => "Quiz Result",
            SyncKind::GameResult => "Game Result",
            SyncKind::Generic => "Generic Data",
        }
    }

    /// Short command-line spelling.
    pub fn slug(self) -> &'static str {
        match self {
            SyncKind::QuizResult => "quiz-result",
            SyncKind::GameResult => "game-result",
            SyncKind::Generic => "generic",
        }
    }
}

impl fmt::Display for SyncKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown sync kind '{0}' (expected quiz-result, game-result or generic)")]
pub struct ParseKindError(pub String);

impl FromStr for SyncKind {
    type Err = ParseKindError;

    /// Accepts both the slug (`quiz-result`) and the wire tag (`SUBMIT_QUIZ_RESULT`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SyncKind::ALL
            .into_iter()
            .find(|k| k.slug().eq_ignore_ascii_case(s) || k.tag() == s)
            .ok_or_else(|| ParseKindError(s.to_string()))
    }
}

/// Kind as stored on a queue item.
///
/// `Unknown` keeps the raw tag so re-persisting the list never rewrites a record
/// this build cannot interpret.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ItemKind {
    Known(SyncKind),
    Unknown(String),
}

impl ItemKind {
    pub fn known(&self) -> Option<SyncKind> {
        match self {
            ItemKind::Known(kind) => Some(*kind),
            ItemKind::Unknown(_) => None,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            ItemKind::Known(kind) => kind.label(),
            ItemKind::Unknown(raw) => raw,
        }
    }
}

impl From<SyncKind> for ItemKind {
    fn from(kind: SyncKind) -> Self {
        ItemKind::Known(kind)
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemKind::Known(kind) => kind.fmt(f),
            ItemKind::Unknown(raw) => write!(f, "unknown({raw})"),
        }
    }
}
