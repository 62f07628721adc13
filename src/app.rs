use crate::analysis::{Analyzer, MockAnalyzer};
use crate::auth::AuthService;
use crate::config::Settings;
use crate::error::{Error, Result};
use crate::highlight::{HighlightMatch, highlight};
use crate::history::HistoryStore;
use crate::model::{AnalysisResult, InputData};
use crate::store::{DirStore, KvStore};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};

/// Everything a page needs after a successful analysis.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub input_data: InputData,
    pub result: AnalysisResult,
    pub highlights: Vec<HighlightMatch>,
    /// Set when the analysis was recorded in history.
    pub history_id: Option<String>,
}

/// The analyzer, session and history bound to one store.
pub struct Trinetra<A, S> {
    analyzer: A,
    auth: AuthService<S>,
    history: HistoryStore<S>,
}

impl<A: Analyzer, S: KvStore> Trinetra<A, S> {
    pub fn new(analyzer: A, store: Arc<S>, settings: &Settings) -> Self {
        Self {
            analyzer,
            auth: AuthService::new(store.clone(), settings.auth_delay),
            history: HistoryStore::new(store),
        }
    }

    pub fn auth(&self) -> &AuthService<S> {
        &self.auth
    }

    pub fn history(&self) -> &HistoryStore<S> {
        &self.history
    }

    /// Analyses `input`, records it in history when signed in, and computes
    /// the highlight spans for the submitted content.
    pub async fn submit(&self, input: InputData) -> Result<Submission> {
        let result = match self.analyzer.analyze(&input).await {
            Ok(result) => result,
            Err(err) => {
                error!(kind = %input.kind(), error = %err, "analysis failed");
                return Err(Error::Analysis(err));
            }
        };

        let history_id = if self.auth.is_authenticated() {
            let entry = self.history.append(input.clone(), result.clone())?;
            Some(entry.id)
        } else {
            None
        };

        let highlights = highlight(input.content(), &result.suspicious_phrases);
        info!(
            verdict = %result.verdict,
            confidence = result.confidence_percent(),
            highlights = highlights.len(),
            recorded = history_id.is_some(),
            "analysis complete"
        );
        Ok(Submission {
            input_data: input,
            result,
            highlights,
            history_id,
        })
    }
}

pub type DefaultTrinetra = Trinetra<MockAnalyzer, DirStore>;

/// Opens the directory store and builds a mock-backed workbench from settings.
pub fn open(settings: &Settings) -> Result<DefaultTrinetra> {
    let store = Arc::new(DirStore::open(&settings.data_dir)?);
    let analyzer = match settings.seed {
        Some(seed) => MockAnalyzer::seeded(settings.analysis, seed),
        None => MockAnalyzer::new(settings.analysis),
    };
    Ok(Trinetra::new(analyzer, store, settings))
}
