use chrono::{DateTime, Duration, Utc};
use pretty_assertions::assert_eq;
use url::Url;

use xlsx2docx::{
    BatchInput, ConversionWarning, ConvertError, ConvertOptions, MergeInstruction, RegionSummary,
    TableRegion, WarningCode,
};
use xlsx2docx_worker::cache::{decode_report, encode_report};
use xlsx2docx_worker::convert_pipeline::{
    DocxCacheStatus, WorkerConfig, convert_upload, convert_uploads, docx_cache_key,
};
use xlsx2docx_worker::error::ApiError;
use xlsx2docx_worker::models::{
    CachedReport, DEFAULT_MAX_UPLOAD_BYTES, DEFAULT_UPLOAD_NAME, RegionItem, WarningItem,
};
use xlsx2docx_worker::routes::{
    check_upload_size, content_disposition, parse_flag, parse_query, upload_name,
};
use xlsx2docx_worker::session::{ConversionSession, SessionState};

fn at(raw: &str) -> DateTime<Utc> {
    raw.parse().expect("valid datetime")
}

#[test]
fn query_parsing_reads_filename_and_force() {
    let url = Url::parse("https://worker.test/api/v1/convert?filename=Q3%20report.xlsx&force=YES")
        .expect("valid url");
    let query = parse_query(&url);

    assert_eq!(upload_name(&query), "Q3 report.xlsx");
    assert!(parse_flag(&query, "force"));
    assert!(!parse_flag(&query, "missing"));
}

#[test]
fn blank_filename_falls_back_to_default() {
    let url = Url::parse("https://worker.test/api/v1/convert?filename=%20%20&force=no")
        .expect("valid url");
    let query = parse_query(&url);

    assert_eq!(upload_name(&query), DEFAULT_UPLOAD_NAME);
    assert!(!parse_flag(&query, "force"));
}

#[test]
fn upload_size_limits() {
    assert!(check_upload_size(1, 10).is_ok());
    assert!(check_upload_size(10, 10).is_ok());

    let empty = check_upload_size(0, 10).expect_err("empty upload should be rejected");
    assert_eq!(empty.status_code(), 400);

    let large = check_upload_size(11, 10).expect_err("oversized upload should be rejected");
    assert_eq!(large.status_code(), 413);
    assert_eq!(large.code(), "payload_too_large");
}

#[test]
fn content_disposition_keeps_exact_name_encoded() {
    assert_eq!(
        content_disposition("sales.docx").expect("header should build"),
        "attachment; filename=\"sales.docx\"; filename*=UTF-8''sales.docx"
    );
    assert_eq!(
        content_disposition("季報 2024.docx").expect("header should build"),
        "attachment; filename=\"_2024.docx\"; filename*=UTF-8''%E5%AD%A3%E5%A0%B1%202024.docx"
    );
}

#[test]
fn session_follows_happy_path() {
    let mut session = ConversionSession::new("sales.xlsx", at("2026-01-01T00:00:00Z"));
    assert_eq!(session.state(), SessionState::Idle);

    session
        .begin(at("2026-01-01T00:00:01Z"))
        .expect("idle session should begin");
    assert_eq!(session.state(), SessionState::Converting);
    assert_eq!(session.elapsed_ms(), None);

    session
        .finish(at("2026-01-01T00:00:01Z") + Duration::milliseconds(250))
        .expect("converting session should finish");
    assert_eq!(session.state(), SessionState::Done);
    assert!(session.state().is_terminal());
    assert_eq!(session.elapsed_ms(), Some(250));
    assert_eq!(session.summary(), "session 'sales.xlsx' done after 250ms");
}

#[test]
fn session_rejects_illegal_transitions() {
    let now = at("2026-01-01T00:00:00Z");
    let mut session = ConversionSession::new("sales.xlsx", now);

    let error = session.finish(now).expect_err("idle session cannot finish");
    assert_eq!(error.status_code(), 500);
    assert_eq!(session.state(), SessionState::Idle);
    assert!(session.fail("boom", now).is_err());

    session.begin(now).expect("idle session should begin");
    assert!(session.begin(now).is_err());
    session.fail("boom", now).expect("converting session should fail");
    assert_eq!(session.state(), SessionState::Failed);
    assert_eq!(session.error_message(), Some("boom"));
    assert!(session.finish(now).is_err());
    assert_eq!(session.state(), SessionState::Failed);
}

#[test]
fn cache_key_depends_on_upload_and_options() {
    let options = ConvertOptions::default();
    let key = docx_cache_key(b"workbook", &options);

    assert!(key.starts_with("docx:v1:"));
    assert_eq!(key.len(), "docx:v1:".len() + 64 + 1 + 16);
    assert_eq!(key, docx_cache_key(b"workbook", &ConvertOptions::default()));
    assert_ne!(key, docx_cache_key(b"workbook2", &options));

    let dated = ConvertOptions {
        date_format: "%d/%m/%Y".to_string(),
        ..ConvertOptions::default()
    };
    assert_ne!(key, docx_cache_key(b"workbook", &dated));
}

#[test]
fn cache_status_header_values() {
    assert_eq!(DocxCacheStatus::Hit.as_header_value(), "HIT");
    assert_eq!(DocxCacheStatus::Miss.as_header_value(), "MISS");
    assert_eq!(DocxCacheStatus::Bypass.as_header_value(), "BYPASS");
}

#[test]
fn cached_report_header_round_trips() {
    let report = CachedReport {
        table_count: 2,
        paragraph_count: 3,
        warning_count: 1,
    };
    let encoded = encode_report(&report).expect("report should encode");

    assert_eq!(decode_report(Some(&encoded)), Some(report));
    assert_eq!(decode_report(Some("not json")), None);
    assert_eq!(decode_report(None), None);
}

#[test]
fn config_defaults_when_vars_are_unset() {
    let config = WorkerConfig::from_vars(None, Some("  "), None).expect("defaults should load");

    assert_eq!(config.options, ConvertOptions::default());
    assert_eq!(config.max_upload_bytes, DEFAULT_MAX_UPLOAD_BYTES);
}

#[test]
fn config_reads_overrides_and_rejects_bad_values() {
    let config = WorkerConfig::from_vars(Some("legacy"), Some("%d.%m.%Y"), Some("1024"))
        .expect("overrides should load");
    assert_eq!(
        config.options.alignment,
        xlsx2docx::AlignmentPolicy::LegacyHeaderCentered
    );
    assert_eq!(config.options.date_format, "%d.%m.%Y");
    assert_eq!(config.max_upload_bytes, 1024);

    let policy = WorkerConfig::from_vars(Some("diagonal"), None, None)
        .expect_err("unknown policy should be rejected");
    assert_eq!(policy.code(), "validation_error");

    assert!(WorkerConfig::from_vars(None, None, Some("lots")).is_err());
    assert!(WorkerConfig::from_vars(None, None, Some("0")).is_err());
}

#[test]
fn convert_error_maps_to_api_status() {
    let invalid: ApiError = ConvertError::InvalidOption("bad".to_string()).into();
    assert_eq!(invalid.status_code(), 422);
    assert_eq!(invalid.code(), "validation_error");

    let unsupported: ApiError = ConvertError::UnsupportedFormat("notes.txt".to_string()).into();
    assert_eq!(unsupported.status_code(), 422);
    assert_eq!(unsupported.code(), "conversion_failed");
}

#[test]
fn failed_upload_marks_session_failed() {
    let mut session = ConversionSession::new("notes.txt", Utc::now());
    let error = convert_upload(&mut session, b"plain text", &ConvertOptions::default())
        .expect_err("plain text should not convert");

    assert_eq!(error.status_code(), 422);
    assert_eq!(session.state(), SessionState::Failed);
    assert!(session.error_message().is_some());
}

#[test]
fn batch_with_no_successes_is_unprocessable() {
    let inputs = vec![
        BatchInput::new("a.txt", b"one".to_vec()),
        BatchInput::new("b.txt", b"two".to_vec()),
    ];
    let mut session = ConversionSession::new("batch.zip", Utc::now());
    let error = convert_uploads(&mut session, &inputs, &ConvertOptions::default())
        .expect_err("batch without successes should fail");

    assert_eq!(error.status_code(), 422);
    assert!(error.message().starts_with("all 2 file(s) failed to convert"));
    assert_eq!(session.state(), SessionState::Failed);
}

#[test]
fn region_and_warning_items_flatten_core_types() {
    let summary = RegionSummary {
        region: TableRegion::new(3, 7),
        effective_columns: 4,
        merges: vec![MergeInstruction {
            top_row_offset: 0,
            left_col: 1,
            row_span: 2,
            col_span: 2,
        }],
        dropped_merges: 1,
    };
    assert_eq!(
        RegionItem::from_summary(1, &summary),
        RegionItem {
            table_id: 1,
            start_row: 3,
            end_row: 7,
            effective_columns: 4,
            merges: 1,
            dropped_merges: 1,
        }
    );

    let warning = ConversionWarning::new(WarningCode::MergeDropped, "too wide").with_row(3);
    let item = WarningItem::from(&warning);
    assert_eq!(item.code, "merge_dropped");
    assert_eq!(item.row, Some(3));
    assert_eq!(item.table_id, None);
}
