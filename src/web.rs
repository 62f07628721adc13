use crate::app::{self, DefaultTrinetra, Submission};
use crate::config::{Settings, Theme};
use crate::error::{AuthError, Error, ValidationError};
use crate::highlight::{self, HighlightMatch, Segment};
use crate::history::{self, now_millis};
use crate::model::{AnalysisResult, HistoryEntry, InputData, InputKind, Severity, Verdict};
use crate::quiz::{self, QuizSession};
use crate::validate::{InputDraft, MAX_FILE_BYTES, mime_for_path};
use crate::{SuspiciousPhrase, Upload};
use askama::Template;
use axum::{
    Form, Json, Router,
    extract::{DefaultBodyLimit, Multipart, Path, Query, State, multipart::MultipartError},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
};
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::compression::CompressionLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{info, warn};

type SharedState = Arc<AppState>;
const EXCERPT_CHARS: usize = 100;
/// Room for the form fields around a maximum-size upload.
const UPLOAD_BODY_LIMIT: usize = MAX_FILE_BYTES + 1024 * 1024;

pub struct AppState {
    pub app: DefaultTrinetra,
    pub theme: Theme,
}

#[derive(Debug, Clone, Copy)]
struct Chrome {
    body_class: &'static str,
    main_class: &'static str,
    card_class: &'static str,
    panel_class: &'static str,
    eyebrow_class: &'static str,
    headline_class: &'static str,
    lede_class: &'static str,
    button_class: &'static str,
    input_class: &'static str,
}

impl Chrome {
    fn new(theme: Theme) -> Self {
        let base = Self {
            body_class: "bg-slate-50 text-slate-900",
            main_class: "min-h-screen flex flex-col items-center justify-start py-10 px-4",
            card_class: "max-w-4xl w-full space-y-6",
            panel_class: "bg-white shadow rounded-2xl p-6 space-y-4",
            eyebrow_class: "uppercase tracking-wide text-sm text-slate-500",
            headline_class: "text-4xl font-extrabold tracking-tight",
            lede_class: "text-lg text-slate-600",
            button_class: "inline-flex items-center rounded-md bg-blue-600 px-4 py-2 text-white font-semibold shadow hover:bg-blue-700 transition-colors",
            input_class: "w-full rounded-xl border border-slate-300 p-3",
        };
        match theme {
            Theme::Light => base,
            Theme::Dark => Self {
                body_class: "bg-slate-900 text-slate-100",
                panel_class: "bg-slate-800 shadow rounded-2xl p-6 space-y-4",
                eyebrow_class: "uppercase tracking-wide text-sm text-slate-400",
                lede_class: "text-lg text-slate-300",
                input_class: "w-full rounded-xl border border-slate-600 bg-slate-900 p-3",
                ..base
            },
        }
    }
}

#[derive(Clone)]
pub struct WebConfig {
    pub addr: SocketAddr,
    pub settings: Settings,
}

impl WebConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            addr: settings.addr,
            settings: settings.clone(),
        }
    }
}

impl Default for WebConfig {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

#[derive(Error, Debug)]
pub enum WebError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    App(#[from] Error),
}

pub async fn serve(config: WebConfig) -> Result<(), WebError> {
    let state = Arc::new(AppState {
        app: app::open(&config.settings)?,
        theme: config.settings.theme,
    });
    let router = build_router(state);
    info!(
        %config.addr,
        theme = %config.settings.theme,
        data_dir = %config.settings.data_dir.display(),
        "Binding HTTP listener"
    );
    let listener = TcpListener::bind(config.addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("HTTP server exited");
    Ok(())
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn unauthorized() -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            "Please sign in to view your verification history.",
        )
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self::new(status_for(&err), err.to_string())
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        Error::from(err).into()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let payload = json!({ "error": self.message });
        (self.status, Json(payload)).into_response()
    }
}

fn status_for(err: &Error) -> StatusCode {
    match err {
        Error::Validation(_) | Error::Auth(AuthError::Validation(_)) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        Error::Auth(AuthError::InvalidCredentials) => StatusCode::UNAUTHORIZED,
        Error::Analysis(_) => StatusCode::BAD_GATEWAY,
        Error::Auth(AuthError::Store(_)) | Error::Store(_) | Error::Config(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(home))
        .route(
            "/analyze",
            post(analyze_html).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .route("/history", get(history_html))
        .route("/history/clear", post(clear_history))
        .route("/history/:id", get(history_entry_html))
        .route("/signin", post(sign_in))
        .route("/signout", post(sign_out))
        .route("/quiz", get(quiz_html))
        .route("/api/analyze", post(api_analyze))
        .route("/api/highlight", post(api_highlight))
        .route("/api/history", get(api_history))
        .route("/api/session", get(api_session))
        .route("/healthz", get(health))
        .with_state(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().include_headers(true))
                .on_response(DefaultOnResponse::new().include_headers(true)),
        )
        .layer(CompressionLayer::new())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = signal::ctrl_c().await;
    };
    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        if let Ok(mut stream) = signal(SignalKind::terminate()) {
            let _ = stream.recv().await;
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok", "service": "trinetra-web" }))
}

async fn home(State(state): State<SharedState>) -> Response {
    render_home(&state, HomeForm::default(), StatusCode::OK)
}

#[derive(Default)]
struct HomeForm {
    kind: Option<InputKind>,
    text: String,
    url: String,
    input_error: Option<String>,
    auth_error: Option<String>,
}

fn render_home(state: &AppState, form: HomeForm, status: StatusCode) -> Response {
    let auth = state.app.auth().current();
    let signed_in_as = auth
        .user
        .filter(|_| auth.is_authenticated)
        .map(|user| format!("{} <{}>", user.name, user.email));
    let kind = form.kind.unwrap_or(InputKind::Text);
    let template = HomeTemplate {
        chrome: Chrome::new(state.theme),
        signed_in_as,
        kind: kind.to_string(),
        text: form.text,
        url: form.url,
        input_error: form.input_error,
        auth_error: form.auth_error,
    };
    render(state.theme, status, template)
}

fn render<T: Template>(theme: Theme, status: StatusCode, template: T) -> Response {
    match template.render() {
        Ok(body) => (status, Html(body)).into_response(),
        Err(err) => {
            warn!(error = %err, "template rendering failed");
            render_message(
                theme,
                StatusCode::INTERNAL_SERVER_ERROR,
                "Something went wrong",
                &err.to_string(),
            )
        }
    }
}

fn render_message(theme: Theme, status: StatusCode, title: &str, message: &str) -> Response {
    let template = MessageTemplate {
        chrome: Chrome::new(theme),
        title,
        message,
    };
    let body = template
        .render()
        .unwrap_or_else(|_| format!("{title}: {message}"));
    (status, Html(body)).into_response()
}

struct AnalyzeFields {
    kind: InputKind,
    text: String,
    url: String,
    upload: Option<Upload>,
}

enum UploadRejection {
    TooLarge,
    Malformed(String),
}

impl From<MultipartError> for UploadRejection {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            Self::TooLarge
        } else {
            Self::Malformed(err.body_text())
        }
    }
}

async fn read_analyze_fields(mut multipart: Multipart) -> Result<AnalyzeFields, UploadRejection> {
    let mut fields = AnalyzeFields {
        kind: InputKind::Text,
        text: String::new(),
        url: String::new(),
        upload: None,
    };
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "kind" => {
                let raw = field.text().await?;
                fields.kind = match raw.trim() {
                    "url" => InputKind::Url,
                    "file" => InputKind::File,
                    _ => InputKind::Text,
                };
            }
            "text" => fields.text = field.text().await?,
            "url" => fields.url = field.text().await?,
            "file" => {
                let file_name = field.file_name().map(str::to_string);
                let declared = field.content_type().map(str::to_string);
                let bytes = field.bytes().await?;
                if let Some(name) = file_name.filter(|name| !name.is_empty()) {
                    let mime = declared
                        .filter(|mime| mime != "application/octet-stream")
                        .unwrap_or_else(|| {
                            mime_for_path(std::path::Path::new(&name)).to_string()
                        });
                    fields.upload = Some(Upload {
                        name,
                        mime,
                        bytes: bytes.to_vec(),
                    });
                }
            }
            _ => {}
        }
    }
    Ok(fields)
}

async fn analyze_html(State(state): State<SharedState>, multipart: Multipart) -> Response {
    let fields = match read_analyze_fields(multipart).await {
        Ok(fields) => fields,
        Err(UploadRejection::TooLarge) => {
            let form = HomeForm {
                kind: Some(InputKind::File),
                input_error: Some(ValidationError::FileTooLarge(UPLOAD_BODY_LIMIT).to_string()),
                ..HomeForm::default()
            };
            return render_home(&state, form, StatusCode::UNPROCESSABLE_ENTITY);
        }
        Err(UploadRejection::Malformed(message)) => {
            return render_message(
                state.theme,
                StatusCode::BAD_REQUEST,
                "Upload failed",
                &message,
            );
        }
    };
    let draft = match fields.kind {
        InputKind::Text => InputDraft::Text(fields.text.clone()),
        InputKind::Url => InputDraft::Url(fields.url.clone()),
        InputKind::File => InputDraft::File(fields.upload),
    };
    let input = match draft.validate() {
        Ok(input) => input,
        Err(err) => {
            let form = HomeForm {
                kind: Some(fields.kind),
                text: fields.text,
                url: fields.url,
                input_error: Some(err.to_string()),
                auth_error: None,
            };
            return render_home(&state, form, StatusCode::UNPROCESSABLE_ENTITY);
        }
    };
    match state.app.submit(input).await {
        Ok(submission) => render_submission(&state, &submission),
        Err(err) => render_message(
            state.theme,
            status_for(&err),
            "Analysis failed",
            &err.to_string(),
        ),
    }
}

fn render_submission(state: &AppState, submission: &Submission) -> Response {
    let template = ResultTemplate::new(
        Chrome::new(state.theme),
        &submission.result,
        submission.input_data.content(),
        &submission.highlights,
        submission.history_id.clone(),
        ("/", "New analysis"),
    );
    render(state.theme, StatusCode::OK, template)
}

#[derive(Debug, Deserialize)]
struct HistoryParams {
    q: Option<String>,
}

async fn history_html(
    State(state): State<SharedState>,
    Query(params): Query<HistoryParams>,
) -> Response {
    if !state.app.auth().is_authenticated() {
        return sign_in_required(state.theme);
    }
    let all = state.app.history().list();
    let query = params.q.unwrap_or_default();
    let total = all.len();
    let entries = history::filter_entries(all, &query);
    let empty_message = if total == 0 {
        Some("No History Yet. Start analyzing content to build your verification history.")
    } else if entries.is_empty() {
        Some("No Results Found. Try adjusting your search query.")
    } else {
        None
    };
    let now = now_millis();
    let template = HistoryTemplate {
        chrome: Chrome::new(state.theme),
        rows: entries.iter().map(|entry| HistoryRow::new(entry, now)).collect(),
        query,
        total,
        empty_message,
    };
    render(state.theme, StatusCode::OK, template)
}

async fn history_entry_html(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Response {
    if !state.app.auth().is_authenticated() {
        return sign_in_required(state.theme);
    }
    let Some(entry) = state.app.history().find_by_id(&id) else {
        return render_message(
            state.theme,
            StatusCode::NOT_FOUND,
            "Not found",
            &format!("No history entry with id {id}"),
        );
    };
    let content = entry.input_data.content();
    let matches = highlight::highlight(content, &entry.result.suspicious_phrases);
    let template = ResultTemplate::new(
        Chrome::new(state.theme),
        &entry.result,
        content,
        &matches,
        None,
        ("/history", "Back to History"),
    );
    render(state.theme, StatusCode::OK, template)
}

async fn clear_history(State(state): State<SharedState>) -> Response {
    if !state.app.auth().is_authenticated() {
        return sign_in_required(state.theme);
    }
    match state.app.history().clear() {
        Ok(()) => Redirect::to("/history").into_response(),
        Err(err) => render_message(
            state.theme,
            StatusCode::INTERNAL_SERVER_ERROR,
            "Could not clear history",
            &err.to_string(),
        ),
    }
}

fn sign_in_required(theme: Theme) -> Response {
    render_message(
        theme,
        StatusCode::UNAUTHORIZED,
        "Sign In Required",
        "Please sign in to view your verification history.",
    )
}

#[derive(Debug, Deserialize)]
struct SignInForm {
    email: String,
    password: String,
}

async fn sign_in(State(state): State<SharedState>, Form(form): Form<SignInForm>) -> Response {
    match state.app.auth().sign_in(&form.email, &form.password).await {
        Ok(_) => Redirect::to("/").into_response(),
        Err(err) => {
            let message = err.to_string();
            let status = status_for(&Error::Auth(err));
            let home = HomeForm {
                auth_error: Some(message),
                ..HomeForm::default()
            };
            render_home(&state, home, status)
        }
    }
}

async fn sign_out(State(state): State<SharedState>) -> Response {
    match state.app.auth().sign_out() {
        Ok(()) => Redirect::to("/").into_response(),
        Err(err) => render_message(
            state.theme,
            StatusCode::INTERNAL_SERVER_ERROR,
            "Sign out failed",
            &err.to_string(),
        ),
    }
}

#[derive(Debug, Deserialize)]
struct QuizParams {
    answers: Option<String>,
}

async fn quiz_html(
    State(state): State<SharedState>,
    Query(params): Query<QuizParams>,
) -> Response {
    let answers: Vec<Option<usize>> = params
        .answers
        .as_deref()
        .unwrap_or_default()
        .split(',')
        .filter(|raw| !raw.trim().is_empty())
        .map(|raw| raw.trim().parse().ok())
        .collect();

    let mut session = QuizSession::new();
    let mut rows = Vec::with_capacity(quiz::questions().len());
    for (idx, question) in quiz::questions().iter().enumerate() {
        let mut verdict = None;
        if let Some(answer) = answers.get(idx) {
            if idx > 0 {
                session.next();
            }
            if let Some(answer) = answer {
                session.select(*answer);
            }
            verdict = Some(match session.submit() {
                Some(outcome) if outcome.correct => "Correct",
                Some(_) => "Incorrect",
                None => "No valid answer",
            });
        }
        rows.push(QuizRow {
            id: question.id,
            question: &question.question,
            options: &question.options,
            verdict,
            explanation: verdict.map(|_| question.explanation.as_str()),
        });
    }
    let score = (!answers.is_empty())
        .then(|| format!("{}/{}", session.score(), quiz::questions().len()));
    let template = QuizTemplate {
        chrome: Chrome::new(state.theme),
        rows,
        score,
    };
    render(state.theme, StatusCode::OK, template)
}

async fn api_analyze(
    State(state): State<SharedState>,
    Json(input): Json<InputData>,
) -> Result<Json<Submission>, ApiError> {
    let draft = match input {
        InputData::Text { content } => InputDraft::Text(content),
        InputData::Url { content } => InputDraft::Url(content),
        InputData::File { upload, .. } => InputDraft::File(upload),
    };
    let input = draft.validate()?;
    let submission = state.app.submit(input).await?;
    Ok(Json(submission))
}

#[derive(Debug, Deserialize)]
struct HighlightRequest {
    text: String,
    #[serde(default)]
    phrases: Vec<SuspiciousPhrase>,
}

#[derive(Debug, Serialize, Deserialize)]
struct HighlightResponse {
    matches: Vec<HighlightMatch>,
}

async fn api_highlight(Json(request): Json<HighlightRequest>) -> Json<HighlightResponse> {
    Json(HighlightResponse {
        matches: highlight::highlight(&request.text, &request.phrases),
    })
}

async fn api_history(
    State(state): State<SharedState>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<Vec<HistoryEntry>>, ApiError> {
    if !state.app.auth().is_authenticated() {
        return Err(ApiError::unauthorized());
    }
    let query = params.q.unwrap_or_default();
    Ok(Json(state.app.history().search(&query)))
}

async fn api_session(State(state): State<SharedState>) -> impl IntoResponse {
    Json(state.app.auth().current())
}

fn verdict_class(verdict: Verdict) -> &'static str {
    match verdict {
        Verdict::True => "text-green-700 bg-green-50 border border-green-200",
        Verdict::Misinformation => "text-red-700 bg-red-50 border border-red-200",
        Verdict::Uncertain => "text-yellow-700 bg-yellow-50 border border-yellow-200",
    }
}

fn severity_class(severity: Severity) -> &'static str {
    match severity {
        Severity::High => "bg-red-100 border-b-2 border-red-300 text-red-800",
        Severity::Medium => "bg-yellow-100 border-b-2 border-yellow-300 text-yellow-800",
        Severity::Low => "bg-blue-100 border-b-2 border-blue-300 text-blue-800",
    }
}

fn entry_path(id: &str) -> String {
    format!("/history/{}", utf8_percent_encode(id, NON_ALPHANUMERIC))
}

struct SegmentView<'a> {
    text: &'a str,
    class: Option<&'static str>,
    title: String,
}

struct PhraseView<'a> {
    text: &'a str,
    reason: &'a str,
    severity: Severity,
    class: &'static str,
}

struct SourceView<'a> {
    title: &'a str,
    url: &'a str,
    reliability: u8,
}

struct HistoryRow {
    href: String,
    kind: String,
    when: String,
    verdict_label: &'static str,
    verdict_class: &'static str,
    confidence: u8,
    excerpt: String,
}

impl HistoryRow {
    fn new(entry: &HistoryEntry, now: i64) -> Self {
        Self {
            href: entry_path(&entry.id),
            kind: entry.input_data.kind().to_string(),
            when: history::format_relative(entry.timestamp, now),
            verdict_label: entry.result.verdict.label(),
            verdict_class: verdict_class(entry.result.verdict),
            confidence: entry.result.confidence_percent(),
            excerpt: history::truncate_content(entry.input_data.content(), EXCERPT_CHARS),
        }
    }
}

struct QuizRow<'a> {
    id: u32,
    question: &'a str,
    options: &'a [String],
    verdict: Option<&'static str>,
    explanation: Option<&'a str>,
}

#[derive(Template)]
#[template(
    source = r#"<!DOCTYPE html>
<html lang="en">
  <head>
    <meta charset="utf-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1" />
    <title>Trinetra • Analyze Content for Misinformation</title>
    <script src="https://cdn.jsdelivr.net/npm/@tailwindcss/browser@4"></script>
  </head>
  <body class="{{ chrome.body_class }}">
    <main class="{{ chrome.main_class }}">
      <div class="{{ chrome.card_class }}">
        <div>
          <p class="{{ chrome.eyebrow_class }}">Trinetra</p>
          <h1 class="{{ chrome.headline_class }}">Analyze Content for Misinformation</h1>
          <p class="{{ chrome.lede_class }}">Paste text, a URL, or upload a file to get an analysis and learn how to spot misinformation patterns.</p>
        </div>
        <nav class="flex flex-wrap gap-3 text-sm font-semibold">
          <a href="/history">History</a>
          <a href="/quiz">Quiz</a>
        </nav>
        <form class="{{ chrome.panel_class }}" method="post" action="/analyze" enctype="multipart/form-data">
          <fieldset class="flex gap-4">
            <label><input type="radio" name="kind" value="text" {% if kind == "text" %}checked{% endif %}> Text</label>
            <label><input type="radio" name="kind" value="url" {% if kind == "url" %}checked{% endif %}> URL</label>
            <label><input type="radio" name="kind" value="file" {% if kind == "file" %}checked{% endif %}> File</label>
          </fieldset>
          <textarea class="{{ chrome.input_class }}" name="text" rows="6" placeholder="Paste or type the content you want to analyze...">{{ text }}</textarea>
          <input class="{{ chrome.input_class }}" type="url" name="url" value="{{ url }}" placeholder="https://example.com/article-to-analyze">
          <input type="file" name="file" accept=".txt,.pdf,.jpg,.jpeg,.png,.gif">
          <p class="text-xs">Supports text, images, and PDF files (max 10MB)</p>
          {% if let Some(error) = input_error %}
          <p id="input-error" class="text-red-700">{{ error }}</p>
          {% endif %}
          <button class="{{ chrome.button_class }}" type="submit">Analyze Content</button>
        </form>
        <section class="{{ chrome.panel_class }}">
          {% if let Some(user) = signed_in_as %}
          <p>Signed in as {{ user }}</p>
          <form method="post" action="/signout"><button class="{{ chrome.button_class }}" type="submit">Sign out</button></form>
          {% else %}
          <form method="post" action="/signin" class="space-y-3">
            <input class="{{ chrome.input_class }}" type="email" name="email" placeholder="Email">
            <input class="{{ chrome.input_class }}" type="password" name="password" placeholder="Password">
            {% if let Some(error) = auth_error %}
            <p id="auth-error" class="text-red-700">{{ error }}</p>
            {% endif %}
            <button class="{{ chrome.button_class }}" type="submit">Sign in to keep history</button>
          </form>
          {% endif %}
        </section>
      </div>
    </main>
  </body>
</html>"#,
    ext = "html"
)]
struct HomeTemplate {
    chrome: Chrome,
    signed_in_as: Option<String>,
    kind: String,
    text: String,
    url: String,
    input_error: Option<String>,
    auth_error: Option<String>,
}

#[derive(Template)]
#[template(
    source = r#"<!DOCTYPE html>
<html lang="en">
  <head>
    <meta charset="utf-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1" />
    <title>Trinetra • {{ verdict_label }}</title>
    <script src="https://cdn.jsdelivr.net/npm/@tailwindcss/browser@4"></script>
  </head>
  <body class="{{ chrome.body_class }}">
    <main class="{{ chrome.main_class }}">
      <div class="{{ chrome.card_class }}">
        <a href="{{ back_href }}">{{ back_label }}</a>
        <section class="{{ chrome.panel_class }}" id="results">
          <h1 class="{{ chrome.headline_class }}">{{ verdict_label }}</h1>
          <p class="{{ chrome.lede_class }}">Analysis completed with {{ confidence }}% confidence</p>
          <div class="p-4 rounded-2xl {{ verdict_class }}">
            <h2 class="font-semibold">Summary</h2>
            <p>{{ summary }}</p>
          </div>
          {% if !phrases.is_empty() %}
          <h2 class="text-lg font-semibold">Suspicious Content Analysis</h2>
          <p id="highlighted" class="whitespace-pre-wrap">{% for segment in segments %}{% if let Some(class) = segment.class %}<mark class="{{ class }}" title="{{ segment.title }}">{{ segment.text }}</mark>{% else %}{{ segment.text }}{% endif %}{% endfor %}</p>
          <h3 class="font-medium text-sm">Detected Issues:</h3>
          <ul class="space-y-2">
            {% for phrase in phrases %}
            <li><span class="px-2 py-1 rounded text-xs {{ phrase.class }}">{{ phrase.severity }}</span> "{{ phrase.text }}" {{ phrase.reason }}</li>
            {% endfor %}
          </ul>
          {% endif %}
          {% if !sources.is_empty() %}
          <h2 class="text-lg font-semibold">Related Sources</h2>
          <ul class="space-y-2">
            {% for source in sources %}
            <li><a href="{{ source.url }}" rel="noopener">{{ source.title }}</a> (Reliability: {{ source.reliability }}%)</li>
            {% endfor %}
          </ul>
          {% endif %}
          {% if let Some(id) = saved_id %}
          <p class="text-sm">Saved to your history as {{ id }}.</p>
          {% endif %}
        </section>
      </div>
    </main>
  </body>
</html>"#,
    ext = "html"
)]
struct ResultTemplate<'a> {
    chrome: Chrome,
    verdict_label: &'static str,
    verdict_class: &'static str,
    confidence: u8,
    summary: &'a str,
    segments: Vec<SegmentView<'a>>,
    phrases: Vec<PhraseView<'a>>,
    sources: Vec<SourceView<'a>>,
    saved_id: Option<String>,
    back_href: &'static str,
    back_label: &'static str,
}

impl<'a> ResultTemplate<'a> {
    fn new(
        chrome: Chrome,
        result: &'a AnalysisResult,
        content: &'a str,
        matches: &'a [HighlightMatch],
        saved_id: Option<String>,
        back: (&'static str, &'static str),
    ) -> Self {
        let segments = highlight::segments(content, matches)
            .into_iter()
            .map(|segment| match segment {
                Segment::Plain(text) => SegmentView {
                    text,
                    class: None,
                    title: String::new(),
                },
                Segment::Highlight { text, source } => SegmentView {
                    text,
                    class: Some(severity_class(source.severity)),
                    title: format!("{} ({} risk)", source.reason, source.severity),
                },
            })
            .collect();
        let phrases = result
            .suspicious_phrases
            .iter()
            .map(|phrase| PhraseView {
                text: &phrase.text,
                reason: &phrase.reason,
                severity: phrase.severity,
                class: severity_class(phrase.severity),
            })
            .collect();
        let sources = result
            .sources()
            .iter()
            .map(|source| SourceView {
                title: &source.title,
                url: &source.url,
                reliability: source.reliability,
            })
            .collect();
        Self {
            chrome,
            verdict_label: result.verdict.label(),
            verdict_class: verdict_class(result.verdict),
            confidence: result.confidence_percent(),
            summary: &result.summary,
            segments,
            phrases,
            sources,
            saved_id,
            back_href: back.0,
            back_label: back.1,
        }
    }
}

#[derive(Template)]
#[template(
    source = r#"<!DOCTYPE html>
<html lang="en">
  <head>
    <meta charset="utf-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1" />
    <title>Trinetra • Verification History</title>
    <script src="https://cdn.jsdelivr.net/npm/@tailwindcss/browser@4"></script>
  </head>
  <body class="{{ chrome.body_class }}">
    <main class="{{ chrome.main_class }}">
      <div class="{{ chrome.card_class }}">
        <a href="/">Back to Home</a>
        <h1 class="{{ chrome.headline_class }}">Verification History</h1>
        <p class="{{ chrome.lede_class }}">Review your past content analyses and results</p>
        {% if total > 0 %}
        <form method="get" action="/history">
          <input class="{{ chrome.input_class }}" type="text" name="q" value="{{ query }}" placeholder="Search your history...">
        </form>
        <form method="post" action="/history/clear">
          <button class="{{ chrome.button_class }}" type="submit">Clear History</button>
        </form>
        {% endif %}
        {% if let Some(message) = empty_message %}
        <p id="empty-history" class="{{ chrome.lede_class }}">{{ message }}</p>
        {% endif %}
        <ul class="space-y-4">
          {% for row in rows %}
          <li class="{{ chrome.panel_class }}">
            <p class="text-sm">{{ row.kind }} • {{ row.when }}</p>
            <p>{{ row.excerpt }}</p>
            <span class="px-3 py-1 rounded-full text-xs {{ row.verdict_class }}">{{ row.verdict_label }}</span>
            <span class="text-sm">{{ row.confidence }}% confidence</span>
            <a href="{{ row.href }}">View details</a>
          </li>
          {% endfor %}
        </ul>
      </div>
    </main>
  </body>
</html>"#,
    ext = "html"
)]
struct HistoryTemplate {
    chrome: Chrome,
    rows: Vec<HistoryRow>,
    query: String,
    total: usize,
    empty_message: Option<&'static str>,
}

#[derive(Template)]
#[template(
    source = r#"<!DOCTYPE html>
<html lang="en">
  <head>
    <meta charset="utf-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1" />
    <title>Trinetra • Learn to Spot Misinformation</title>
    <script src="https://cdn.jsdelivr.net/npm/@tailwindcss/browser@4"></script>
  </head>
  <body class="{{ chrome.body_class }}">
    <main class="{{ chrome.main_class }}">
      <div class="{{ chrome.card_class }}">
        <a href="/">Back to Home</a>
        <h1 class="{{ chrome.headline_class }}">Learn to Spot Misinformation</h1>
        <form method="get" action="/quiz" class="space-y-4">
          {% for row in rows %}
          <section class="{{ chrome.panel_class }}">
            <h2 class="font-semibold">{{ row.id }}. {{ row.question }}</h2>
            <ol start="0" class="list-decimal ml-6">
              {% for option in row.options %}
              <li>{{ option }}</li>
              {% endfor %}
            </ol>
            {% if let Some(verdict) = row.verdict %}
            <p class="font-semibold">{{ verdict }}</p>
            {% endif %}
            {% if let Some(explanation) = row.explanation %}
            <p class="text-sm">{{ explanation }}</p>
            {% endif %}
          </section>
          {% endfor %}
          <input class="{{ chrome.input_class }}" type="text" name="answers" placeholder="Answers, e.g. 1,1,2,1">
          <button class="{{ chrome.button_class }}" type="submit">Check answers</button>
        </form>
        {% if let Some(score) = score %}
        <p id="quiz-score" class="{{ chrome.headline_class }}">Score: {{ score }}</p>
        {% endif %}
      </div>
    </main>
  </body>
</html>"#,
    ext = "html"
)]
struct QuizTemplate<'a> {
    chrome: Chrome,
    rows: Vec<QuizRow<'a>>,
    score: Option<String>,
}

#[derive(Template)]
#[template(
    source = r#"<!DOCTYPE html>
<html lang="en">
  <head>
    <meta charset="utf-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1" />
    <title>Trinetra • {{ title }}</title>
    <script src="https://cdn.jsdelivr.net/npm/@tailwindcss/browser@4"></script>
  </head>
  <body class="{{ chrome.body_class }}">
    <main class="{{ chrome.main_class }}">
      <div class="{{ chrome.card_class }}">
        <h1 class="{{ chrome.headline_class }}">{{ title }}</h1>
        <p class="{{ chrome.lede_class }}">{{ message }}</p>
        <a href="/" class="{{ chrome.button_class }}">Back to Home</a>
      </div>
    </main>
  </body>
</html>"#,
    ext = "html"
)]
struct MessageTemplate<'a> {
    chrome: Chrome,
    title: &'a str,
    message: &'a str,
}

#[cfg(all(test, feature = "web"))]
mod tests {
    use super::*;
    use crate::analysis::{AnalyzerTiming, MockAnalyzer};
    use crate::app::Trinetra;
    use crate::auth::{DEMO_EMAIL, DEMO_PASSWORD};
    use crate::store::DirStore;
    use axum::{body, body::Body, http::Request, http::header};
    use tower::ServiceExt;

    const BOUNDARY: &str = "trinetra-test-boundary";

    fn test_state(dir: &std::path::Path, verdict: Verdict) -> SharedState {
        let analyzer = MockAnalyzer::seeded(AnalyzerTiming::instant(), 11).pinned(verdict);
        state_with(dir, analyzer)
    }

    fn state_with(dir: &std::path::Path, analyzer: MockAnalyzer) -> SharedState {
        let settings = Settings::default().without_delays();
        let store = Arc::new(DirStore::open(dir).unwrap());
        Arc::new(AppState {
            app: Trinetra::new(analyzer, store, &settings),
            theme: Theme::Light,
        })
    }

    fn multipart_body(fields: &[(&str, &str)]) -> String {
        let mut body = String::new();
        for (name, value) in fields {
            body.push_str(&format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            ));
        }
        body.push_str(&format!("--{BOUNDARY}--\r\n"));
        body
    }

    fn analyze_json(text: &str) -> Request<Body> {
        Request::post("/api/analyze")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json!({"type": "text", "content": text}).to_string()))
            .unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn home_page_renders_form() {
        let dir = tempfile::tempdir().unwrap();
        let router = build_router(test_state(dir.path(), Verdict::True));
        let response = router
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert!(response.status().is_success());
        let html = body_text(response).await;
        assert!(html.contains("Analyze Content for Misinformation"));
        assert!(html.contains("action=\"/signin\""));
    }

    #[tokio::test]
    async fn analyze_form_highlights_phrases() {
        let dir = tempfile::tempdir().unwrap();
        let router = build_router(test_state(dir.path(), Verdict::Misinformation));
        let body = multipart_body(&[
            ("kind", "text"),
            ("text", "Scientists don't want you to know <this one weird trick>"),
        ]);
        let response = router
            .oneshot(
                Request::post("/analyze")
                    .header(
                        header::CONTENT_TYPE,
                        format!("multipart/form-data; boundary={BOUNDARY}"),
                    )
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response).await;
        assert!(html.contains("Potential Misinformation"));
        assert!(html.contains("this one weird trick</mark>"));
        assert!(html.contains("&lt;"), "content must be escaped");
    }

    #[tokio::test]
    async fn invalid_url_is_reported_inline() {
        let dir = tempfile::tempdir().unwrap();
        let router = build_router(test_state(dir.path(), Verdict::True));
        let body = multipart_body(&[("kind", "url"), ("url", "example.com")]);
        let response = router
            .oneshot(
                Request::post("/analyze")
                    .header(
                        header::CONTENT_TYPE,
                        format!("multipart/form-data; boundary={BOUNDARY}"),
                    )
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let html = body_text(response).await;
        assert!(html.contains("id=\"input-error\""));
        assert!(html.contains("valid URL starting with http://"));
    }

    #[tokio::test]
    async fn history_requires_sign_in() {
        let dir = tempfile::tempdir().unwrap();
        let router = build_router(test_state(dir.path(), Verdict::True));
        let response = router
            .clone()
            .oneshot(Request::get("/history").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let response = router
            .oneshot(Request::get("/api/history").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn sign_in_then_analyze_records_history() {
        let dir = tempfile::tempdir().unwrap();
        let router = build_router(test_state(dir.path(), Verdict::Uncertain));

        let form = format!("email={}&password={}", "demo%40trinetra.com", DEMO_PASSWORD);
        let response = router
            .clone()
            .oneshot(
                Request::post("/signin")
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from(form))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let response = router
            .clone()
            .oneshot(
                Request::post("/api/analyze")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(
                        json!({"type": "text", "content": "Some experts believe studies suggest"})
                            .to_string(),
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let submission: serde_json::Value =
            serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(submission["result"]["verdict"], "uncertain");
        assert_eq!(submission["highlights"].as_array().unwrap().len(), 2);
        let id = submission["historyId"].as_str().unwrap().to_string();

        let response = router
            .clone()
            .oneshot(Request::get("/api/history?q=experts").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let entries: Vec<HistoryEntry> =
            serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, id);

        let response = router
            .oneshot(
                Request::get(entry_path(&id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response).await;
        assert!(html.contains("Requires Verification"));
        assert!(html.contains("Some experts believe</mark>"));
    }

    #[tokio::test]
    async fn wrong_password_renders_auth_error() {
        let dir = tempfile::tempdir().unwrap();
        let router = build_router(test_state(dir.path(), Verdict::True));
        let form = format!("email={DEMO_EMAIL}&password=wrongpass");
        let response = router
            .oneshot(
                Request::post("/signin")
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from(form))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let html = body_text(response).await;
        assert!(html.contains("Invalid credentials"));
    }

    #[tokio::test]
    async fn api_highlight_reports_spans() {
        let dir = tempfile::tempdir().unwrap();
        let router = build_router(test_state(dir.path(), Verdict::True));
        let request = json!({
            "text": "The CAT sat",
            "phrases": [{"text": "cat", "reason": "animal", "severity": "low"}],
        });
        let response = router
            .oneshot(
                Request::post("/api/highlight")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(request.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let payload: HighlightResponse =
            serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(payload.matches.len(), 1);
        assert_eq!(payload.matches[0].text, "CAT");
        assert_eq!((payload.matches[0].start, payload.matches[0].end), (4, 7));
    }

    #[tokio::test]
    async fn quiz_scores_answers() {
        let dir = tempfile::tempdir().unwrap();
        let router = build_router(test_state(dir.path(), Verdict::True));
        let response = router
            .oneshot(
                Request::get("/quiz?answers=1,1,0,1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response).await;
        assert!(html.contains("Score: 3/4"));
    }

    #[tokio::test]
    async fn upload_over_body_limit_is_a_validation_error() {
        let dir = tempfile::tempdir().unwrap();
        let router = build_router(test_state(dir.path(), Verdict::True));
        let mut body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"kind\"\r\n\r\nfile\r\n\
             --{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"big.txt\"\r\n\
             Content-Type: text/plain\r\n\r\n"
        )
        .into_bytes();
        body.resize(body.len() + UPLOAD_BODY_LIMIT + 1024, b'a');
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        let response = router
            .oneshot(
                Request::post("/analyze")
                    .header(
                        header::CONTENT_TYPE,
                        format!("multipart/form-data; boundary={BOUNDARY}"),
                    )
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let html = body_text(response).await;
        assert!(html.contains("id=\"input-error\""));
        assert!(html.contains("File size must be less than 10MB"));
        assert!(html.contains("value=\"file\" checked"));
    }

    #[tokio::test]
    async fn unreachable_analyzer_maps_to_bad_gateway() {
        let dir = tempfile::tempdir().unwrap();
        let analyzer = MockAnalyzer::seeded(AnalyzerTiming::instant(), 2).offline();
        let state = state_with(dir.path(), analyzer);
        state.app.auth().sign_in(DEMO_EMAIL, DEMO_PASSWORD).await.unwrap();
        let router = build_router(state.clone());

        let response = router
            .clone()
            .oneshot(analyze_json("anything at all"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let payload: serde_json::Value =
            serde_json::from_str(&body_text(response).await).unwrap();
        assert!(payload["error"].as_str().unwrap().starts_with("Analysis failed"));

        let response = router
            .oneshot(
                Request::post("/analyze")
                    .header(
                        header::CONTENT_TYPE,
                        format!("multipart/form-data; boundary={BOUNDARY}"),
                    )
                    .body(Body::from(multipart_body(&[
                        ("kind", "text"),
                        ("text", "anything at all"),
                    ])))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert!(state.app.history().list().is_empty());
    }

    #[tokio::test]
    async fn storage_failure_maps_to_internal_error() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().join("data");
        let state = test_state(&data_dir, Verdict::True);
        state.app.auth().sign_in(DEMO_EMAIL, DEMO_PASSWORD).await.unwrap();
        std::fs::remove_dir_all(&data_dir).unwrap();
        let router = build_router(state);

        let response = router
            .oneshot(analyze_json("recorded while signed in"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let payload: serde_json::Value =
            serde_json::from_str(&body_text(response).await).unwrap();
        assert!(payload["error"].as_str().unwrap().starts_with("Storage error"));
    }
}
