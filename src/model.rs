use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            other => Err(format!("unknown severity {other:?}")),
        }
    }
}

/// Outcome classification of an analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    True,
    Misinformation,
    Uncertain,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::True => "true",
            Verdict::Misinformation => "misinformation",
            Verdict::Uncertain => "uncertain",
        }
    }

    /// Headline shown next to a result.
    pub fn label(&self) -> &'static str {
        match self {
            Verdict::True => "Likely True",
            Verdict::Misinformation => "Potential Misinformation",
            Verdict::Uncertain => "Requires Verification",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuspiciousPhrase {
    pub text: String,
    pub reason: String,
    pub severity: Severity,
}

impl SuspiciousPhrase {
    pub fn new(text: impl Into<String>, reason: impl Into<String>, severity: Severity) -> Self {
        Self {
            text: text.into(),
            reason: reason.into(),
            severity,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub title: String,
    pub url: String,
    pub reliability: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub verdict: Verdict,
    /// Percentage in `[0, 100]`.
    pub confidence: f64,
    pub suspicious_phrases: Vec<SuspiciousPhrase>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<Source>>,
    pub summary: String,
}

impl AnalysisResult {
    /// Confidence rounded for display.
    pub fn confidence_percent(&self) -> u8 {
        self.confidence.round().clamp(0.0, 100.0) as u8
    }

    pub fn sources(&self) -> &[Source] {
        self.sources.as_deref().unwrap_or_default()
    }
}

/// Raw bytes of a file picked for analysis. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    pub name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

/// Content submitted for analysis, discriminated by `type` on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum InputData {
    Text {
        content: String,
    },
    Url {
        content: String,
    },
    File {
        /// File name.
        content: String,
        #[serde(skip)]
        upload: Option<Upload>,
    },
}

impl InputData {
    pub fn text(content: impl Into<String>) -> Self {
        InputData::Text {
            content: content.into(),
        }
    }

    pub fn url(content: impl Into<String>) -> Self {
        InputData::Url {
            content: content.into(),
        }
    }

    pub fn content(&self) -> &str {
        match self {
            InputData::Text { content }
            | InputData::Url { content }
            | InputData::File { content, .. } => content,
        }
    }

    pub fn kind(&self) -> InputKind {
        match self {
            InputData::Text { .. } => InputKind::Text,
            InputData::Url { .. } => InputKind::Url,
            InputData::File { .. } => InputKind::File,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputKind {
    Text,
    Url,
    File,
}

impl fmt::Display for InputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputKind::Text => write!(f, "text"),
            InputKind::Url => write!(f, "url"),
            InputKind::File => write!(f, "file"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthState {
    pub is_authenticated: bool,
    pub user: Option<User>,
    pub token: Option<String>,
}

impl AuthState {
    pub fn signed_out() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: String,
    /// Epoch milliseconds.
    pub timestamp: i64,
    pub input_data: InputData,
    pub result: AnalysisResult,
}
