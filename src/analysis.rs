//! Content analysis. Only a mock service exists: it waits for a simulated
//! network delay and returns one of a few canned verdicts.

use crate::error::AnalysisError;
use crate::model::{AnalysisResult, InputData, Severity, Source, SuspiciousPhrase, Verdict};
use parking_lot::Mutex;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::future::Future;
use std::time::Duration;
use tracing::debug;

const MIN_CONFIDENCE: f64 = 10.0;
const MAX_CONFIDENCE: f64 = 99.0;
const CONFIDENCE_SPREAD: f64 = 20.0;

/// A service that classifies submitted content.
pub trait Analyzer: Send + Sync {
    fn analyze(
        &self,
        input: &InputData,
    ) -> impl Future<Output = Result<AnalysisResult, AnalysisError>> + Send;
}

#[derive(Debug, Clone, Copy)]
pub struct AnalyzerTiming {
    pub base: Duration,
    /// Upper bound of the uniform random delay added to `base`.
    pub jitter: Duration,
}

impl AnalyzerTiming {
    pub fn instant() -> Self {
        Self {
            base: Duration::ZERO,
            jitter: Duration::ZERO,
        }
    }
}

impl Default for AnalyzerTiming {
    fn default() -> Self {
        Self {
            base: Duration::from_millis(2000),
            jitter: Duration::from_millis(1000),
        }
    }
}

pub struct MockAnalyzer {
    timing: AnalyzerTiming,
    rng: Mutex<SmallRng>,
    pinned: Option<Verdict>,
    offline: bool,
}

impl MockAnalyzer {
    pub fn new(timing: AnalyzerTiming) -> Self {
        Self::with_rng(timing, SmallRng::from_entropy())
    }

    pub fn seeded(timing: AnalyzerTiming, seed: u64) -> Self {
        Self::with_rng(timing, SmallRng::seed_from_u64(seed))
    }

    fn with_rng(timing: AnalyzerTiming, rng: SmallRng) -> Self {
        Self {
            timing,
            rng: Mutex::new(rng),
            pinned: None,
            offline: false,
        }
    }

    /// Always answer with the canned result for `verdict`.
    pub fn pinned(mut self, verdict: Verdict) -> Self {
        self.pinned = Some(verdict);
        self
    }

    /// Fail every request after the usual delay, as an unreachable service would.
    pub fn offline(mut self) -> Self {
        self.offline = true;
        self
    }

    /// Draws the delay and the result up front so no lock is held across the
    /// sleep.
    fn draw(&self) -> (Duration, AnalysisResult) {
        let mut rng = self.rng.lock();
        let jitter = if self.timing.jitter.is_zero() {
            Duration::ZERO
        } else {
            self.timing.jitter.mul_f64(rng.r#gen::<f64>())
        };
        let mut result = match self.pinned {
            Some(verdict) => canned_result(verdict),
            None => {
                let mut canned = canned_results();
                let idx = rng.gen_range(0..canned.len());
                canned.swap_remove(idx)
            }
        };
        let perturbation = (rng.r#gen::<f64>() - 0.5) * CONFIDENCE_SPREAD;
        result.confidence = jitter_confidence(result.confidence, perturbation);
        (self.timing.base + jitter, result)
    }
}

impl Default for MockAnalyzer {
    fn default() -> Self {
        Self::new(AnalyzerTiming::default())
    }
}

impl Analyzer for MockAnalyzer {
    async fn analyze(&self, input: &InputData) -> Result<AnalysisResult, AnalysisError> {
        let (delay, result) = self.draw();
        debug!(
            kind = %input.kind(),
            delay_ms = delay.as_millis() as u64,
            verdict = %result.verdict,
            "mock analysis scheduled"
        );
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if self.offline {
            return Err(AnalysisError::Unavailable("service offline".into()));
        }
        Ok(result)
    }
}

/// Applies a perturbation and clamps into `[10, 99]`.
pub fn jitter_confidence(confidence: f64, perturbation: f64) -> f64 {
    (confidence + perturbation).clamp(MIN_CONFIDENCE, MAX_CONFIDENCE)
}

pub fn canned_results() -> Vec<AnalysisResult> {
    vec![
        canned_result(Verdict::Misinformation),
        canned_result(Verdict::True),
        canned_result(Verdict::Uncertain),
    ]
}

fn canned_result(verdict: Verdict) -> AnalysisResult {
    match verdict {
        Verdict::Misinformation => AnalysisResult {
            verdict,
            confidence: 85.0,
            suspicious_phrases: vec![
                SuspiciousPhrase::new(
                    "scientists don't want you to know",
                    "Appeals to conspiracy theories",
                    Severity::High,
                ),
                SuspiciousPhrase::new(
                    "this one weird trick",
                    "Clickbait language pattern",
                    Severity::Medium,
                ),
                SuspiciousPhrase::new(
                    "breakthrough they're hiding",
                    "Implies deliberate concealment",
                    Severity::High,
                ),
            ],
            sources: Some(vec![
                source("Fact Check: Similar claims debunked", "https://example.com/factcheck1", 95),
                source("Scientific consensus contradicts claim", "https://example.com/factcheck2", 92),
            ]),
            summary: "This content contains multiple indicators of misinformation including conspiracy-style language and unsupported claims.".into(),
        },
        Verdict::True => AnalysisResult {
            verdict,
            confidence: 92.0,
            suspicious_phrases: Vec::new(),
            sources: Some(vec![
                source("Peer-reviewed research supports claim", "https://example.com/research1", 98),
                source("Multiple news outlets confirm", "https://example.com/news1", 88),
            ]),
            summary: "This content appears to be factually accurate based on available evidence and credible sources.".into(),
        },
        Verdict::Uncertain => AnalysisResult {
            verdict,
            confidence: 45.0,
            suspicious_phrases: vec![
                SuspiciousPhrase::new(
                    "some experts believe",
                    "Vague attribution without specifics",
                    Severity::Low,
                ),
                SuspiciousPhrase::new(
                    "studies suggest",
                    "Unclear which studies are referenced",
                    Severity::Medium,
                ),
            ],
            sources: Some(Vec::new()),
            summary: "This content contains claims that require additional verification and more specific sourcing.".into(),
        },
    }
}

fn source(title: &str, url: &str, reliability: u8) -> Source {
    Source {
        title: title.into(),
        url: url.into(),
        reliability,
    }
}
