use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use pdf_batch::{
    capability::Capabilities,
    config::Config,
    pdf::{lopdf_backend::decode_pdf_string, LopdfBackend, PdfBackend},
    report::BatchReport,
    result::{FailureKind, Payload},
    task::{FileTask, Operation as TaskOperation, ProcessTask, TaskRunner},
};
use std::path::Path;
use std::sync::Arc;

fn write_pdf(path: &Path, pages: &[&str]) {
    build_pdf(pages).save(path).unwrap();
}

fn build_pdf(pages: &[&str]) -> Document {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::new();
    for text in pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 24.into()]),
                Operation::new("Td", vec![100.into(), 600.into()]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    let info_id = doc.add_object(dictionary! {
        "Title" => Object::string_literal("Quarterly Report"),
        "Author" => Object::string_literal("Records Office"),
        "CreationDate" => Object::string_literal("D:20240102030405Z"),
    });
    doc.trailer.set("Root", catalog_id);
    doc.trailer.set("Info", info_id);
    doc
}

/// Adds a Standard security handler entry to the trailer. The keys are
/// placeholders; only the trailer entry matters for detection.
fn write_encrypted_pdf(path: &Path, pages: &[&str]) {
    let mut doc = build_pdf(pages);
    let encrypt_id = doc.add_object(dictionary! {
        "Filter" => "Standard",
        "V" => 1,
        "R" => 2,
        "O" => Object::string_literal(vec![0u8; 32]),
        "U" => Object::string_literal(vec![0u8; 32]),
        "P" => -4,
    });
    doc.trailer.set("Encrypt", encrypt_id);
    doc.save(path).unwrap();
}

#[test]
fn reads_pages_metadata_and_resources() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("report.pdf");
    write_pdf(&path, &["Hello World", "Second page"]);

    let doc = LopdfBackend.open(&path).unwrap();
    assert_eq!(doc.page_count(), 2);
    assert!(!doc.is_encrypted());

    let meta = doc.metadata();
    assert_eq!(meta.format.as_deref(), Some("PDF 1.5"));
    assert_eq!(meta.title.as_deref(), Some("Quarterly Report"));
    assert_eq!(meta.author.as_deref(), Some("Records Office"));
    assert_eq!(meta.creation_date.as_deref(), Some("D:20240102030405Z"));
    assert_eq!(meta.subject, None);

    let first = doc.page(0).unwrap();
    assert!(first.text.contains("Hello World"));
    assert_eq!(first.fonts, vec!["Courier"]);
    assert_eq!(first.image_count, 0);
    assert_eq!((first.width, first.height), (595.0, 842.0));

    assert!(doc.page(1).unwrap().text.contains("Second page"));
    assert!(doc.page(2).is_err());
}

#[test]
fn runner_inspects_real_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("real.pdf");
    write_pdf(&path, &["Some words on a page"]);

    let runner = TaskRunner::new(&Config::default(), Arc::new(LopdfBackend), Capabilities::none());
    let result = runner.process(&FileTask::new(&path, TaskOperation::Inspect));

    let success = result.as_success().unwrap();
    assert_eq!(success.file_name, "real.pdf");
    assert!(success.file_size_bytes > 0);
    let Payload::Inspection(p) = &success.payload else {
        panic!("expected inspection payload");
    };
    assert_eq!(p.page_count, 1);
    assert_eq!(p.title.as_deref(), Some("Quarterly Report"));
    assert!(p.total_text_length > 0);
}

#[test]
fn garbage_bytes_are_unreadable() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fake.pdf");
    std::fs::write(&path, b"this is not a pdf at all").unwrap();

    let runner = TaskRunner::new(&Config::default(), Arc::new(LopdfBackend), Capabilities::none());
    let result = runner.process(&FileTask::new(&path, TaskOperation::Inspect));
    assert_eq!(result.as_failure().unwrap().kind, FailureKind::UnreadableDocument);
}

#[test]
fn encrypt_text_in_page_content_is_not_encryption() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("howto.pdf");
    write_pdf(&path, &["Set /Encrypt in the trailer to protect files"]);

    let doc = LopdfBackend.open(&path).unwrap();
    assert!(!doc.is_encrypted());
    assert!(doc.page(0).unwrap().text.contains("/Encrypt"));
}

#[test]
fn trailer_encrypt_entry_marks_document_encrypted() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("locked.pdf");
    write_encrypted_pdf(&path, &["secret"]);

    assert!(LopdfBackend.open(&path).unwrap().is_encrypted());

    let runner = TaskRunner::new(&Config::default(), Arc::new(LopdfBackend), Capabilities::none());
    let report = BatchReport::new(
        vec![runner.process(&FileTask::new(&path, TaskOperation::Inspect))],
        1,
        "2024-03-02T10:00:00Z".into(),
        0.1,
    );
    let Payload::Inspection(p) = &report.results[0].as_success().unwrap().payload else {
        panic!("expected inspection payload");
    };
    assert!(p.is_encrypted);
    assert_eq!(report.statistics().content_statistics.encrypted_files, 1);
}

#[test]
fn parse_failure_keeps_its_cause_as_detail() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fake.pdf");
    std::fs::write(&path, b"this is not a pdf at all").unwrap();

    let runner = TaskRunner::new(&Config::default(), Arc::new(LopdfBackend), Capabilities::none());
    let result = runner.process(&FileTask::new(&path, TaskOperation::Inspect));
    let failure = result.as_failure().unwrap();

    assert!(failure.error.starts_with("failed to parse"));
    assert!(failure.error.contains("fake.pdf"));
    let detail = failure.detail.as_deref().unwrap();
    assert!(!detail.is_empty());
    assert_ne!(detail, failure.error);
}

#[test]
fn decodes_pdf_text_strings() {
    assert_eq!(decode_pdf_string(b"plain"), "plain");
    assert_eq!(decode_pdf_string(&[0xFE, 0xFF, 0x00, 0x48, 0x00, 0x69]), "Hi");
    assert_eq!(decode_pdf_string(&[0x63, 0x61, 0x66, 0xE9]), "café");
}
