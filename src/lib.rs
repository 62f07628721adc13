//! Trinetra: submit text, links or files for a misinformation check, see the
//! suspicious phrases highlighted in place, and keep a short history of past
//! checks while signed in.
//!
//! The analysis and sign-in services are mocks. [`highlight`] is the piece
//! with real behaviour.

pub mod analysis;
pub mod app;
pub mod auth;
pub mod config;
pub mod error;
pub mod highlight;
pub mod history;
pub mod model;
pub mod quiz;
pub mod store;
pub mod validate;
#[cfg(feature = "web")]
pub mod web;

pub use analysis::{Analyzer, AnalyzerTiming, MockAnalyzer};
pub use app::{Submission, Trinetra};
pub use auth::AuthService;
pub use config::{Settings, Theme};
pub use error::{Error, Result};
pub use highlight::{HighlightMatch, Segment, highlight, segments};
pub use history::HistoryStore;
pub use model::{
    AnalysisResult, AuthState, HistoryEntry, InputData, InputKind, Severity, Source,
    SuspiciousPhrase, Upload, User, Verdict,
};
pub use store::{DirStore, KvStore, MemoryStore};
pub use validate::InputDraft;
