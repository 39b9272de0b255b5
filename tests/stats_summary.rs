use pdf_batch::{
    error::FileError,
    result::{FileResult, InspectionPayload, Payload, SuccessRecord, TextPayload},
    stats::summarize,
};
use std::path::Path;

fn inspected(name: &str, size: u64, pages: u32, text: usize, secs: f64) -> FileResult {
    FileResult::Success(SuccessRecord {
        file_path: format!("/docs/{name}"),
        file_name: name.to_string(),
        file_size_bytes: size,
        file_size_mb: 0.0,
        modified_date: None,
        analysis_timestamp: "2024-01-01T00:00:00Z".into(),
        processing_time_seconds: secs,
        payload: Payload::Inspection(InspectionPayload {
            page_count: pages,
            total_text_length: text,
            ..Default::default()
        }),
    })
}

fn missing(name: &str) -> FileResult {
    let path = Path::new("/docs").join(name);
    FileResult::failure(&path, FileError::NotFound(path.clone()))
}

#[test]
fn empty_results_are_zeroed() {
    let stats = summarize(&[]);
    assert_eq!(stats.summary.total_files, 0);
    assert_eq!(stats.summary.success_rate, 0.0);
    assert_eq!(stats.file_statistics.largest_file, None);
    assert_eq!(stats.processing_statistics.average_processing_time, 0.0);
    assert!(stats.errors.is_empty());
}

#[test]
fn three_of_four_is_seventy_five_percent() {
    let results = vec![
        inspected("a.pdf", 1000, 2, 100, 0.5),
        inspected("b.pdf", 3000, 4, 300, 1.5),
        missing("c.pdf"),
        inspected("d.pdf", 2000, 6, 200, 1.0),
    ];
    let stats = summarize(&results);

    assert_eq!(stats.summary.total_files, 4);
    assert_eq!(stats.summary.successful, 3);
    assert_eq!(stats.summary.failed, 1);
    assert_eq!(stats.summary.success_rate, 75.0);

    assert_eq!(stats.file_statistics.total_size_bytes, 6000);
    assert_eq!(stats.file_statistics.largest_file.as_deref(), Some("b.pdf"));
    assert_eq!(stats.file_statistics.smallest_file.as_deref(), Some("a.pdf"));

    assert_eq!(stats.content_statistics.total_pages, 12);
    assert_eq!(stats.content_statistics.average_pages, 4.0);
    assert_eq!(stats.content_statistics.average_text_length, 200.0);

    // Failures contribute no time but still count toward the average.
    assert_eq!(stats.processing_statistics.total_processing_time, 3.0);
    assert_eq!(stats.processing_statistics.average_processing_time, 0.75);

    assert_eq!(stats.errors.len(), 1);
    assert_eq!(stats.errors[0].file, "c.pdf");
}

#[test]
fn ties_go_to_first_result() {
    let results = vec![
        inspected("first.pdf", 500, 1, 1, 0.1),
        inspected("second.pdf", 500, 1, 1, 0.1),
    ];
    let stats = summarize(&results);
    assert_eq!(stats.file_statistics.largest_file.as_deref(), Some("first.pdf"));
    assert_eq!(stats.file_statistics.smallest_file.as_deref(), Some("first.pdf"));
}

#[test]
fn all_failures_have_no_extremes() {
    let stats = summarize(&[missing("x.pdf"), missing("y.pdf")]);
    assert_eq!(stats.summary.success_rate, 0.0);
    assert_eq!(stats.file_statistics.largest_file, None);
    assert_eq!(stats.content_statistics.average_pages, 0.0);
    assert_eq!(stats.errors.len(), 2);
}

#[test]
fn text_payloads_count_pages_and_text() {
    let text = FileResult::Success(SuccessRecord {
        file_path: "/docs/t.pdf".into(),
        file_name: "t.pdf".into(),
        file_size_bytes: 10,
        file_size_mb: 0.0,
        modified_date: None,
        analysis_timestamp: "2024-01-01T00:00:00Z".into(),
        processing_time_seconds: 0.2,
        payload: Payload::Text(TextPayload {
            page_count: 3,
            text_length: 42,
            text: "x".repeat(42),
        }),
    });
    let stats = summarize(&[text]);
    assert_eq!(stats.content_statistics.total_pages, 3);
    assert_eq!(stats.content_statistics.total_text_length, 42);
    assert_eq!(stats.content_statistics.files_with_forms, 0);
}
