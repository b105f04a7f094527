//! Historical retrieval integration tests
//!
//! Runs the pagination service against a realistic log directory: an active
//! segment, a gzip-rotated segment, and the empty file an external rotation
//! can leave behind.

use flate2::write::GzEncoder;
use flate2::Compression;
use logstream::{Paginator, QueryService, RotationStore, StoreError};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::thread::sleep;
use std::time::Duration;

fn write_plain(dir: &Path, name: &str, lines: &[String]) {
    let mut file = File::create(dir.join(name)).unwrap();
    for line in lines {
        writeln!(file, "{}", line).unwrap();
    }
}

fn write_gz(dir: &Path, name: &str, lines: &[String]) {
    let file = File::create(dir.join(name)).unwrap();
    let mut encoder = GzEncoder::new(file, Compression::default());
    for line in lines {
        writeln!(encoder, "{}", line).unwrap();
    }
    encoder.finish().unwrap();
}

fn formatted_lines(n: usize) -> Vec<String> {
    (0..n)
        .map(|i| {
            format!(
                "2024-01-01 10:00:{:02}.000 | INFO     | app.core:tick:{} | event {}",
                i % 60,
                i,
                i
            )
        })
        .collect()
}

#[test]
fn test_compressed_and_plain_segments_read_identically() {
    let dir = tempfile::tempdir().unwrap();
    let lines = formatted_lines(30);
    write_plain(dir.path(), "app.log", &lines);
    write_gz(dir.path(), "app.2024-01-01.log.gz", &lines);

    let paginator = Paginator::new(RotationStore::new(dir.path()));
    let plain = paginator.paginate("app.log", 2, 10).unwrap();
    let compressed = paginator.paginate("app.2024-01-01.log.gz", 2, 10).unwrap();

    assert_eq!(plain.total, 30);
    assert_eq!(plain.lines, compressed.lines);
    assert_eq!(plain.total_pages, compressed.total_pages);
}

#[test]
fn test_listing_is_newest_first_and_hides_empty_files() {
    let dir = tempfile::tempdir().unwrap();
    write_gz(dir.path(), "app.2024-01-01.log.gz", &formatted_lines(5));
    sleep(Duration::from_millis(100));
    write_plain(dir.path(), "app.log", &formatted_lines(3));
    File::create(dir.path().join("fresh.log")).unwrap(); // zero bytes

    let store = RotationStore::new(dir.path());
    let segments = store.list_segments().unwrap();
    let names: Vec<&str> = segments.iter().map(|s| s.filename.as_str()).collect();
    assert_eq!(names, vec!["app.log", "app.2024-01-01.log.gz"]);
    assert!(segments[1].compressed);

    // Hidden from the listing, still readable directly.
    let (lines, total) = store.read_segment_lines("fresh.log", 0, 10).unwrap();
    assert!(lines.is_empty());
    assert_eq!(total, 0);
}

#[test]
fn test_vanished_segment_surfaces_not_found() {
    let dir = tempfile::tempdir().unwrap();
    write_plain(dir.path(), "app.log", &formatted_lines(5));
    let paginator = Paginator::new(RotationStore::new(dir.path()));

    // Simulates rotation deleting the file between listing and read.
    std::fs::remove_file(dir.path().join("app.log")).unwrap();
    assert!(matches!(
        paginator.paginate("app.log", 1, 100),
        Err(StoreError::NotFound(_))
    ));
}

#[test]
fn test_mixed_json_and_text_lines() {
    let dir = tempfile::tempdir().unwrap();
    write_plain(
        dir.path(),
        "app.log",
        &[
            r#"{"a": 1, "b": [2, 3]}"#.to_string(),
            "   plain text with spaces   ".to_string(),
            r#"{"nested": {"ok": true}}"#.to_string(),
        ],
    );

    let paginator = Paginator::new(RotationStore::new(dir.path()));
    let page = paginator.paginate("app.log", 1, 100).unwrap();
    assert_eq!(page.lines[0], r#"{"a":1,"b":[2,3]}"#);
    assert_eq!(page.lines[1], "plain text with spaces");
    assert_eq!(page.lines[2], r#"{"nested":{"ok":true}}"#);
}

#[tokio::test]
async fn test_query_service_clamps_far_page() {
    let dir = tempfile::tempdir().unwrap();
    write_plain(dir.path(), "app.log", &formatted_lines(50));

    let service = QueryService::new(dir.path());
    let page = service.paginate("app.log", 999_999, 100).await.unwrap();
    assert_eq!(page.total, 50);
    assert_eq!(page.total_pages, 1);
    assert_eq!(page.current_page, 1);
    assert_eq!(page.lines.len(), 50);
}
