use std::collections::HashMap;

use chrono::Utc;
use regex::Regex;
use serde::Serialize;
use url::Url;
use worker::{Context, Env, FormEntry, Request, Response, Result, RouteContext, Router};
use xlsx2docx::{BatchInput, DOCX_CONTENT_TYPE, analyze_regions, output_entry_name};

use crate::convert_pipeline::{self, WorkerConfig};
use crate::error::ApiError;
use crate::models::{
    BATCH_ARCHIVE_NAME, DEFAULT_UPLOAD_NAME, HealthResponse, RegionItem, RegionsResponse,
    WarningItem,
};
use crate::session::ConversionSession;

#[derive(Debug, Clone)]
pub struct AppState {
    pub config: WorkerConfig,
}

pub async fn handle(req: Request, env: Env, _ctx: Context) -> Result<Response> {
    let config = match WorkerConfig::from_env(&env) {
        Ok(config) => config,
        Err(error) => {
            worker::console_error!("invalid worker configuration: {error}");
            return ApiError::Internal(format!("invalid worker configuration: {error}"))
                .into_response();
        }
    };

    Router::with_data(AppState { config })
        .get("/api/v1/health", health_route)
        .post_async("/api/v1/convert", convert_route)
        .post_async("/api/v1/convert/batch", batch_route)
        .post_async("/api/v1/regions", regions_route)
        .run(req, env)
        .await
}

fn health_route(_req: Request, _ctx: RouteContext<AppState>) -> Result<Response> {
    json_response(&HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn convert_route(mut req: Request, ctx: RouteContext<AppState>) -> Result<Response> {
    match convert_response(&mut req, &ctx.data.config).await {
        Ok(response) => Ok(response),
        Err(error) => error.into_response(),
    }
}

async fn batch_route(mut req: Request, ctx: RouteContext<AppState>) -> Result<Response> {
    match batch_response(&mut req, &ctx.data.config).await {
        Ok(response) => Ok(response),
        Err(error) => error.into_response(),
    }
}

async fn regions_route(mut req: Request, ctx: RouteContext<AppState>) -> Result<Response> {
    match regions_response(&mut req, &ctx.data.config).await {
        Ok(payload) => json_response(&payload),
        Err(error) => error.into_response(),
    }
}

async fn convert_response(req: &mut Request, config: &WorkerConfig) -> Result<Response, ApiError> {
    let query = parse_query(&req.url()?);
    let file_name = upload_name(&query);
    let force = parse_flag(&query, "force");
    let upload = read_upload(req, config.max_upload_bytes).await?;

    let (converted, cache_status) = convert_pipeline::get_or_convert_with_status(
        &file_name,
        &upload,
        &config.options,
        force,
    )
    .await?;

    let mut response = Response::from_bytes(converted.docx)?;
    let headers = response.headers_mut();
    headers.set("Content-Type", DOCX_CONTENT_TYPE)?;
    headers.set(
        "Content-Disposition",
        &content_disposition(&output_entry_name(&file_name))?,
    )?;
    headers.set("X-Cache-Status", cache_status.as_header_value())?;
    headers.set("X-Tables", &converted.report.table_count.to_string())?;
    headers.set("X-Paragraphs", &converted.report.paragraph_count.to_string())?;
    headers.set("X-Warnings", &converted.report.warning_count.to_string())?;
    headers.set("Cache-Control", "no-store")?;
    Ok(response)
}

async fn batch_response(req: &mut Request, config: &WorkerConfig) -> Result<Response, ApiError> {
    let form = req
        .form_data()
        .await
        .map_err(|error| ApiError::BadRequest(format!("expected multipart form data: {error}")))?;
    let Some(entries) = form.get_all("file") else {
        return Err(ApiError::BadRequest(
            "multipart form has no 'file' fields".to_string(),
        ));
    };

    let mut inputs = Vec::with_capacity(entries.len());
    for entry in entries {
        let FormEntry::File(file) = entry else {
            return Err(ApiError::BadRequest(
                "'file' fields must carry file uploads".to_string(),
            ));
        };
        let bytes = file.bytes().await?;
        check_upload_size(bytes.len(), config.max_upload_bytes)?;
        inputs.push(BatchInput::new(file.name(), bytes));
    }

    let mut session = ConversionSession::new(BATCH_ARCHIVE_NAME, Utc::now());
    let result = convert_pipeline::convert_uploads(&mut session, &inputs, &config.options);
    convert_pipeline::log_session(&session);
    let report = result?;

    for file in &report.files {
        if let Some(message) = &file.outcome.error_message {
            worker::console_error!("batch entry '{}' failed: {message}", file.name);
        }
    }

    let failed = report.failed();
    let mut response = Response::from_bytes(report.archive)?;
    let headers = response.headers_mut();
    headers.set("Content-Type", "application/zip")?;
    headers.set(
        "Content-Disposition",
        &content_disposition(BATCH_ARCHIVE_NAME)?,
    )?;
    headers.set("X-Failed-Files", &failed.to_string())?;
    headers.set("Cache-Control", "no-store")?;
    Ok(response)
}

async fn regions_response(
    req: &mut Request,
    config: &WorkerConfig,
) -> Result<RegionsResponse, ApiError> {
    let query = parse_query(&req.url()?);
    let file_name = upload_name(&query);
    let upload = read_upload(req, config.max_upload_bytes).await?;

    let mut session = ConversionSession::new(file_name.clone(), Utc::now());
    let result = convert_pipeline::run_in_session(&mut session, || {
        Ok(analyze_regions(&upload, Some(&file_name))?)
    });
    convert_pipeline::log_session(&session);
    let (regions, warnings) = result?;

    Ok(RegionsResponse {
        file_name,
        items: regions
            .iter()
            .enumerate()
            .map(|(index, summary)| RegionItem::from_summary(index + 1, summary))
            .collect(),
        warnings: warnings.iter().map(WarningItem::from).collect(),
    })
}

async fn read_upload(req: &mut Request, max_upload_bytes: usize) -> Result<Vec<u8>, ApiError> {
    if let Some(length) = req.headers().get("Content-Length")? {
        let declared = length.trim().parse::<usize>().map_err(|_| {
            ApiError::BadRequest(format!("invalid Content-Length header '{length}'"))
        })?;
        check_upload_size(declared, max_upload_bytes)?;
    }

    let upload = req.bytes().await?;
    check_upload_size(upload.len(), max_upload_bytes)?;
    Ok(upload)
}

fn json_response<T>(payload: &T) -> Result<Response>
where
    T: Serialize,
{
    let mut response = Response::from_json(payload)?;
    response.headers_mut().set("Cache-Control", "no-store")?;
    Ok(response)
}

pub fn parse_query(url: &Url) -> HashMap<String, String> {
    url.query_pairs()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

pub fn parse_flag(query: &HashMap<String, String>, name: &str) -> bool {
    query.get(name).is_some_and(|value| {
        let lowered = value.trim().to_ascii_lowercase();
        lowered == "true" || lowered == "1" || lowered == "yes"
    })
}

/// The `filename` query parameter, or a default `.xlsx` name.
pub fn upload_name(query: &HashMap<String, String>) -> String {
    query
        .get("filename")
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .map_or_else(|| DEFAULT_UPLOAD_NAME.to_string(), str::to_string)
}

pub fn check_upload_size(len: usize, max_upload_bytes: usize) -> Result<(), ApiError> {
    if len == 0 {
        return Err(ApiError::BadRequest("upload body is empty".to_string()));
    }
    if len > max_upload_bytes {
        return Err(ApiError::PayloadTooLarge(format!(
            "upload is {len} bytes, limit is {max_upload_bytes}"
        )));
    }
    Ok(())
}

/// Attachment header with an ASCII fallback name and the exact name in
/// `filename*`.
pub fn content_disposition(file_name: &str) -> Result<String, ApiError> {
    let unsafe_chars = Regex::new(r"[^A-Za-z0-9._-]+")
        .map_err(|error| ApiError::Internal(error.to_string()))?;
    let fallback = unsafe_chars.replace_all(file_name, "_");
    Ok(format!(
        "attachment; filename=\"{fallback}\"; filename*=UTF-8''{}",
        urlencoding::encode(file_name)
    ))
}
