use worker::{Cache, Response};

use crate::error::ApiError;
use crate::models::{CachedReport, DOCX_CACHE_TTL_SECONDS};

const REPORT_HEADER: &str = "X-Conversion-Report";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedDocument {
    pub docx: Vec<u8>,
    pub report: CachedReport,
}

fn cache_url(key: &str) -> String {
    format!("https://cache.xlsx2docx.local/{}", urlencoding::encode(key))
}

pub fn encode_report(report: &CachedReport) -> Result<String, ApiError> {
    Ok(serde_json::to_string(report)?)
}

/// `None` for a missing or unreadable report header; such entries are
/// treated as misses.
pub fn decode_report(raw: Option<&str>) -> Option<CachedReport> {
    raw.and_then(|value| serde_json::from_str(value).ok())
}

pub async fn get_document(key: &str) -> Result<Option<CachedDocument>, ApiError> {
    let cache = Cache::default();
    let mut cached = cache.get(cache_url(key), true).await?;

    let Some(mut response) = cached.take() else {
        return Ok(None);
    };

    let header = response.headers().get(REPORT_HEADER)?;
    let Some(report) = decode_report(header.as_deref()) else {
        worker::console_log!("cache entry {key} has no readable report, ignoring");
        return Ok(None);
    };

    let docx = response.bytes().await?;
    if docx.is_empty() {
        return Ok(None);
    }
    Ok(Some(CachedDocument { docx, report }))
}

pub async fn put_document(key: &str, docx: &[u8], report: &CachedReport) -> Result<(), ApiError> {
    let cache = Cache::default();
    let mut response = Response::from_bytes(docx.to_vec())?;
    response.headers_mut().set(
        "Cache-Control",
        &format!("public, max-age={DOCX_CACHE_TTL_SECONDS}"),
    )?;
    response
        .headers_mut()
        .set("Content-Type", xlsx2docx::DOCX_CONTENT_TYPE)?;
    response
        .headers_mut()
        .set(REPORT_HEADER, &encode_report(report)?)?;

    cache.put(cache_url(key), response).await?;
    Ok(())
}
