use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    pub id: u32,
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: usize,
    pub explanation: String,
}

static QUESTIONS: Lazy<Vec<QuizQuestion>> = Lazy::new(|| {
    vec![
        question(
            1,
            "What's the most reliable way to verify a news story?",
            &[
                "Check if it's shared by many people on social media",
                "Look for the same story on multiple credible news sources",
                "See if it confirms what you already believe",
                "Check if it has an emotional headline",
            ],
            1,
            "Cross-referencing multiple credible sources helps verify information accuracy and reduces the risk of misinformation.",
        ),
        question(
            2,
            "Which of these is a red flag for potential misinformation?",
            &[
                "The article cites specific experts and studies",
                "The headline uses phrases like 'SHOCKING TRUTH THEY DON'T WANT YOU TO KNOW'",
                "The publication date is recent",
                "The article includes quotes from multiple perspectives",
            ],
            1,
            "Sensational headlines designed to provoke strong emotions are common tactics used in misinformation to bypass critical thinking.",
        ),
        question(
            3,
            "What should you do before sharing news on social media?",
            &[
                "Share it immediately if it supports your views",
                "Add your own opinion to the post",
                "Verify the information and check the source credibility",
                "Only share if it has many likes already",
            ],
            2,
            "Always verify information and check source credibility before sharing to prevent the spread of misinformation.",
        ),
        question(
            4,
            "Which source is generally most reliable for breaking news?",
            &[
                "Anonymous social media accounts",
                "Established news organizations with editorial standards",
                "Personal blogs without citations",
                "Forwarded messages in group chats",
            ],
            1,
            "Established news organizations typically have fact-checking processes and editorial standards that help ensure accuracy.",
        ),
    ]
});

fn question(
    id: u32,
    text: &str,
    options: &[&str],
    correct_answer: usize,
    explanation: &str,
) -> QuizQuestion {
    QuizQuestion {
        id,
        question: text.to_string(),
        options: options.iter().map(|o| o.to_string()).collect(),
        correct_answer,
        explanation: explanation.to_string(),
    }
}

pub fn questions() -> &'static [QuizQuestion] {
    &QUESTIONS
}

/// Progress through the fixed question set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizSession {
    index: usize,
    selected: Option<usize>,
    revealed: bool,
    score: usize,
}

/// What happened after submitting an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnswerOutcome {
    pub correct: bool,
    pub correct_answer: usize,
}

impl QuizSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> &'static QuizQuestion {
        &questions()[self.index]
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn score(&self) -> usize {
        self.score
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn is_revealed(&self) -> bool {
        self.revealed
    }

    pub fn is_last(&self) -> bool {
        self.index + 1 >= questions().len()
    }

    /// Ignored once the answer is revealed or for an out-of-range option.
    pub fn select(&mut self, option: usize) {
        if self.revealed || option >= self.current().options.len() {
            return;
        }
        self.selected = Some(option);
    }

    /// Reveals the answer. Returns `None` when nothing is selected or the
    /// answer was already revealed, so a question scores at most once.
    pub fn submit(&mut self) -> Option<AnswerOutcome> {
        if self.revealed {
            return None;
        }
        let selected = self.selected?;
        self.revealed = true;
        let correct_answer = self.current().correct_answer;
        let correct = selected == correct_answer;
        if correct {
            self.score += 1;
        }
        Some(AnswerOutcome {
            correct,
            correct_answer,
        })
    }

    /// Moves to the next question; stays put on the last one.
    pub fn next(&mut self) -> bool {
        if self.is_last() {
            return false;
        }
        self.index += 1;
        self.selected = None;
        self.revealed = false;
        true
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
