mod common;

use common::{touch, CountingService, FakeBackend, FakeDoc, Reply};
use pdf_batch::{
    capability::Capabilities,
    config::Config,
    error::ExtractError,
    extract::{
        extract_patterns, BuiltinSchema, Confidence, ExtractionMethod, ExtractionSchema, Extractor,
    },
    result::{FailureKind, FileResult, Payload},
    task::{FileTask, Operation, ProcessTask, TaskRunner},
};
use serde_json::json;
use std::sync::Arc;

const LETTER: &str = "Client John Smith, A123456789, filed on 03/15/2023. \
Contact john.smith@example.com or (555) 123-4567.";

#[test]
fn short_text_never_reaches_the_service() {
    let service = Arc::new(CountingService::new(Reply::Data(json!({"ok": true}))));
    let extractor = Extractor::new(&Config::default(), Some(service.clone()));
    let schema = ExtractionSchema::builtin(BuiltinSchema::Client);

    let err = extractor
        .extract("  hey  ", &schema.schema, Some("client case"))
        .unwrap_err();
    assert!(matches!(err, ExtractError::InsufficientContent { chars: 3, min: 10 }));
    assert_eq!(service.calls(), 0);
}

#[test]
fn service_result_is_high_confidence() {
    let data = json!({"client_info": {"full_name": "John Smith"}});
    let service = Arc::new(CountingService::new(Reply::Data(data.clone())));
    let extractor = Extractor::new(&Config::default(), Some(service.clone()));

    let out = extractor.extract(LETTER, &json!({"type": "object"}), None).unwrap();
    assert_eq!(out.method, ExtractionMethod::Service);
    assert_eq!(out.confidence, Confidence::High);
    assert_eq!(out.data, data);
    assert_eq!(service.calls(), 1);
}

#[test]
fn without_service_patterns_are_low_confidence() {
    let extractor = Extractor::new(&Config::default(), None);
    assert!(!extractor.has_service());

    let out = extractor.extract(LETTER, &json!({"type": "object"}), Some("immigration")).unwrap();
    assert_eq!(out.method, ExtractionMethod::PatternFallback);
    assert_eq!(out.confidence, Confidence::Low);
    assert_eq!(out.data["extraction_method"], "basic");
    assert_eq!(out.data["document_type"], "immigration");
    assert_eq!(out.data["extracted_data"]["a_numbers"][0], "A123456789");
}

#[test]
fn service_failure_carries_fallback() {
    let service = Arc::new(CountingService::new(Reply::Fail));
    let extractor = Extractor::new(&Config::default(), Some(service.clone()));

    let err = extractor.extract(LETTER, &json!({"type": "object"}), None).unwrap_err();
    match err {
        ExtractError::Service { message, fallback } => {
            assert!(message.contains("529"));
            assert_eq!(fallback.confidence, Confidence::Low);
            assert_eq!(fallback.method, ExtractionMethod::PatternFallback);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(service.calls(), 1);
}

#[test]
fn runner_reports_service_failure_with_fallback() {
    let dir = tempfile::tempdir().unwrap();
    let path = touch(dir.path(), "case.pdf", 300);
    let backend = FakeBackend::new().with("case.pdf", FakeDoc::with_texts(&[LETTER]));
    let caps = Capabilities::none().with_extraction(Arc::new(CountingService::new(Reply::Fail)));
    let runner = TaskRunner::new(&Config::default(), Arc::new(backend), caps);

    let schema = Arc::new(ExtractionSchema::builtin(BuiltinSchema::Client));
    let result = runner.process(&FileTask::new(&path, Operation::StructuredExtract(schema)));

    let failure = result.as_failure().unwrap();
    assert_eq!(failure.kind, FailureKind::ServiceFailure);
    let fallback = failure.fallback.as_ref().unwrap();
    assert_eq!(fallback.document_type.as_deref(), Some("client case"));
}

#[test]
fn runner_flags_empty_documents() {
    let dir = tempfile::tempdir().unwrap();
    let path = touch(dir.path(), "blank.pdf", 300);
    let service = Arc::new(CountingService::new(Reply::Data(json!({}))));
    let backend = FakeBackend::new().with("blank.pdf", FakeDoc::with_texts(&["", ""]));
    let caps = Capabilities::none().with_extraction(service.clone());
    let runner = TaskRunner::new(&Config::default(), Arc::new(backend), caps);

    let schema = Arc::new(ExtractionSchema::builtin(BuiltinSchema::Legal));
    let result = runner.process(&FileTask::new(&path, Operation::StructuredExtract(schema)));

    assert_eq!(result.as_failure().unwrap().kind, FailureKind::InsufficientContent);
    assert_eq!(service.calls(), 0);
}

#[test]
fn runner_success_wraps_extraction_payload() {
    let dir = tempfile::tempdir().unwrap();
    let path = touch(dir.path(), "memo.pdf", 300);
    let backend = FakeBackend::new().with("memo.pdf", FakeDoc::with_texts(&[LETTER, "page two"]));
    let caps = Capabilities::none()
        .with_extraction(Arc::new(CountingService::new(Reply::Data(json!({"memo_info": {}})))));
    let runner = TaskRunner::new(&Config::default(), Arc::new(backend), caps);

    let schema = Arc::new(ExtractionSchema::builtin(BuiltinSchema::Legal));
    let result = runner.process(&FileTask::new(&path, Operation::StructuredExtract(schema)));

    let FileResult::Success(s) = result else {
        panic!("expected success");
    };
    let Payload::Extraction(p) = s.payload else {
        panic!("expected extraction payload");
    };
    assert_eq!(p.schema, "legal");
    assert_eq!(p.page_count, 2);
    assert_eq!(p.output.method, ExtractionMethod::Service);
}

#[test]
fn patterns_deduplicate_and_cap_names() {
    let text = "Jane Doe met Jane Doe and Mark Twain. Email a@b.io twice a@b.io. 2023-01-05";
    let out = extract_patterns(text, None, 10);
    assert_eq!(out.document_type, "unknown");
    assert_eq!(out.extracted_data.emails, vec!["a@b.io"]);
    assert_eq!(out.extracted_data.dates, vec!["2023-01-05"]);
    assert_eq!(out.extracted_data.potential_names, vec!["Jane Doe", "Mark Twain"]);

    let capped = extract_patterns(text, None, 1);
    assert_eq!(capped.extracted_data.potential_names, vec!["Jane Doe"]);

    assert!(extract_patterns("nothing here", None, 10).extracted_data.is_empty());
}

#[test]
fn custom_schema_must_be_an_object() {
    let dir = tempfile::tempdir().unwrap();
    let bad = dir.path().join("bad.json");
    std::fs::write(&bad, r#"{"type": "array"}"#).unwrap();
    assert!(ExtractionSchema::from_file(&bad, None).is_err());

    let good = dir.path().join("invoice.json");
    std::fs::write(&good, r#"{"type": "object", "properties": {}}"#).unwrap();
    let schema = ExtractionSchema::from_file(&good, Some("invoice".into())).unwrap();
    assert_eq!(schema.id, "invoice");
    assert_eq!(schema.document_type.as_deref(), Some("invoice"));
}

#[test]
fn prompt_embeds_document_and_type() {
    let prompt = pdf_batch::extract::service::build_prompt("BODY TEXT", Some("legal memo"));
    assert!(prompt.starts_with("This is a legal memo document."));
    assert!(prompt.contains("<document>\nBODY TEXT\n</document>"));
    assert!(prompt.contains("extract_data"));
}

#[test]
fn capabilities_default_to_none() {
    let report = Capabilities::none().report();
    assert!(!report.ocr);
    assert!(!report.extraction_service);
}
