use std::str::FromStr;

use chrono::Utc;
use sha2::{Digest, Sha256};
use worker::Env;
use xlsx2docx::{
    AlignmentPolicy, BatchInput, BatchReport, ConvertOptions, convert_batch, convert_bytes,
};

use crate::cache::{self, CachedDocument};
use crate::error::ApiError;
use crate::models::{CachedReport, DEFAULT_MAX_UPLOAD_BYTES, DOCX_CACHE_KEY_PREFIX};
use crate::session::ConversionSession;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocxCacheStatus {
    Hit,
    Miss,
    Bypass,
}

impl DocxCacheStatus {
    pub const fn as_header_value(self) -> &'static str {
        match self {
            Self::Hit => "HIT",
            Self::Miss => "MISS",
            Self::Bypass => "BYPASS",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerConfig {
    pub options: ConvertOptions,
    pub max_upload_bytes: usize,
}

impl WorkerConfig {
    pub fn from_env(env: &Env) -> Result<Self, ApiError> {
        let var = |name: &str| env.var(name).ok().map(|value| value.to_string());
        Self::from_vars(
            var("ALIGNMENT_POLICY").as_deref(),
            var("DATE_FORMAT").as_deref(),
            var("MAX_UPLOAD_BYTES").as_deref(),
        )
    }

    /// Unset or blank variables fall back to the defaults.
    pub fn from_vars(
        alignment: Option<&str>,
        date_format: Option<&str>,
        max_upload_bytes: Option<&str>,
    ) -> Result<Self, ApiError> {
        let mut options = ConvertOptions::default();
        if let Some(raw) = non_blank(alignment) {
            options.alignment = AlignmentPolicy::from_str(raw).map_err(ApiError::Validation)?;
        }
        if let Some(raw) = non_blank(date_format) {
            options.date_format = raw.to_string();
        }
        options.validate()?;

        let max_upload_bytes = match non_blank(max_upload_bytes) {
            Some(raw) => raw.parse::<usize>()?,
            None => DEFAULT_MAX_UPLOAD_BYTES,
        };
        if max_upload_bytes == 0 {
            return Err(ApiError::Validation(
                "MAX_UPLOAD_BYTES must be positive".to_string(),
            ));
        }

        Ok(Self {
            options,
            max_upload_bytes,
        })
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

/// `docx:v1:<sha256 of upload>:<sha256 of options fingerprint, 16 hex>`.
pub fn docx_cache_key(upload: &[u8], options: &ConvertOptions) -> String {
    let upload_digest = hex::encode(Sha256::digest(upload));
    let options_digest = hex::encode(Sha256::digest(options.fingerprint().as_bytes()));
    format!(
        "{DOCX_CACHE_KEY_PREFIX}{upload_digest}:{}",
        &options_digest[..16]
    )
}

/// Drives `session` through one unit of work: `begin`, then `finish` or
/// `fail` depending on the outcome.
pub fn run_in_session<T>(
    session: &mut ConversionSession,
    work: impl FnOnce() -> Result<T, ApiError>,
) -> Result<T, ApiError> {
    session.begin(Utc::now())?;
    match work() {
        Ok(value) => {
            session.finish(Utc::now())?;
            Ok(value)
        }
        Err(error) => {
            session.fail(error.message(), Utc::now())?;
            Err(error)
        }
    }
}

pub fn convert_upload(
    session: &mut ConversionSession,
    upload: &[u8],
    options: &ConvertOptions,
) -> Result<CachedDocument, ApiError> {
    let file_name = session.file_name().to_string();
    run_in_session(session, || {
        let (docx, report) = convert_bytes(upload, Some(&file_name), options)?;
        Ok(CachedDocument {
            docx,
            report: CachedReport {
                table_count: report.table_count,
                paragraph_count: report.paragraph_count,
                warning_count: report.warnings.len(),
            },
        })
    })
}

/// Fails with 422 when no input converted.
pub fn convert_uploads(
    session: &mut ConversionSession,
    inputs: &[BatchInput],
    options: &ConvertOptions,
) -> Result<BatchReport, ApiError> {
    run_in_session(session, || {
        let report = convert_batch(inputs, options)?;
        if report.succeeded() == 0 {
            let reason = report
                .files
                .iter()
                .find_map(|file| file.outcome.error_message.clone())
                .unwrap_or_else(|| "no files were uploaded".to_string());
            return Err(ApiError::Conversion(format!(
                "all {} file(s) failed to convert; first error: {reason}",
                report.files.len()
            )));
        }
        Ok(report)
    })
}

pub async fn get_or_convert_with_status(
    file_name: &str,
    upload: &[u8],
    options: &ConvertOptions,
    force: bool,
) -> Result<(CachedDocument, DocxCacheStatus), ApiError> {
    let cache_key = docx_cache_key(upload, options);
    if !force && let Some(cached) = cache::get_document(&cache_key).await? {
        return Ok((cached, DocxCacheStatus::Hit));
    }

    let mut session = ConversionSession::new(file_name, Utc::now());
    let result = convert_upload(&mut session, upload, options);
    log_session(&session);
    let converted = result?;

    cache::put_document(&cache_key, &converted.docx, &converted.report).await?;
    let status = if force {
        DocxCacheStatus::Bypass
    } else {
        DocxCacheStatus::Miss
    };
    Ok((converted, status))
}

pub fn log_session(session: &ConversionSession) {
    if session.error_message().is_some() {
        worker::console_error!("{}", session.summary());
    } else {
        worker::console_log!("{}", session.summary());
    }
}
