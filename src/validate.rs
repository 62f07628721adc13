use crate::error::ValidationError;
use crate::model::{InputData, Upload};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::io;
use std::path::Path;

pub const MAX_FILE_BYTES: usize = 10 * 1024 * 1024;

pub const ACCEPTED_MIME_TYPES: &[&str] = &[
    "text/plain",
    "image/jpeg",
    "image/png",
    "image/gif",
    "application/pdf",
];

static URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^https?://.+\..+").expect("valid url pattern"));
static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email pattern"));

/// Unvalidated input as collected from a form or the command line.
#[derive(Debug, Clone)]
pub enum InputDraft {
    Text(String),
    Url(String),
    File(Option<Upload>),
}

impl InputDraft {
    pub fn validate(self) -> Result<InputData, ValidationError> {
        match self {
            InputDraft::Text(text) => {
                if text.trim().is_empty() {
                    return Err(ValidationError::EmptyText);
                }
                Ok(InputData::Text { content: text })
            }
            InputDraft::Url(url) => {
                if url.trim().is_empty() {
                    return Err(ValidationError::EmptyUrl);
                }
                if !URL_RE.is_match(&url) {
                    return Err(ValidationError::InvalidUrl);
                }
                Ok(InputData::Url { content: url })
            }
            InputDraft::File(None) => Err(ValidationError::MissingFile),
            InputDraft::File(Some(upload)) => {
                check_upload(&upload)?;
                Ok(InputData::File {
                    content: upload.name.clone(),
                    upload: Some(upload),
                })
            }
        }
    }
}

pub fn check_upload(upload: &Upload) -> Result<(), ValidationError> {
    if !ACCEPTED_MIME_TYPES.contains(&upload.mime.as_str()) {
        return Err(ValidationError::UnsupportedFileType(upload.mime.clone()));
    }
    if upload.size() > MAX_FILE_BYTES {
        return Err(ValidationError::FileTooLarge(upload.size()));
    }
    Ok(())
}

/// Guesses a MIME type from the file extension; unknown extensions map to
/// `application/octet-stream`.
pub fn mime_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "txt" => "text/plain",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "pdf" => "application/pdf",
        _ => "application/octet-stream",
    }
}

pub fn upload_from_path(path: &Path) -> io::Result<Upload> {
    let bytes = fs::read(path)?;
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Ok(Upload {
        name,
        mime: mime_for_path(path).to_string(),
        bytes,
    })
}

pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    if email.is_empty() {
        return Err(ValidationError::EmailRequired);
    }
    if !EMAIL_RE.is_match(email) {
        return Err(ValidationError::InvalidEmail);
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.is_empty() {
        return Err(ValidationError::PasswordRequired);
    }
    if password.chars().count() < 6 {
        return Err(ValidationError::PasswordTooShort);
    }
    Ok(())
}
