mod common;

use std::fs;

use cloudgraph_core::archive::stage;
use cloudgraph_core::error::ArchiveError;
use common::write_bundle;
use tempfile::tempdir;

#[test]
fn test_stage_extracts_every_entry() {
    let dir = tempdir().unwrap();
    let bundle = write_bundle(
        dir.path(),
        &[
            ("accounts.json", "{\"id\":\"111111111111\"}\n"),
            ("nested/notes.txt", "hello"),
        ],
    );

    let staged = stage(&bundle).expect("valid bundle should stage");
    assert_eq!(staged.entries(), 2);
    assert_eq!(
        fs::read_to_string(staged.path().join("accounts.json")).unwrap(),
        "{\"id\":\"111111111111\"}\n"
    );
    assert!(staged.path().join("nested/notes.txt").is_file());

    let staging_dir = staged.path().to_path_buf();
    staged.release().unwrap();
    assert!(!staging_dir.exists(), "release should remove the staging directory");
}

#[test]
fn test_traversal_entry_aborts_staging() {
    let dir = tempdir().unwrap();
    let bundle = write_bundle(
        dir.path(),
        &[("accounts.json", "{}\n"), ("../escaped.json", "{}\n")],
    );

    let result = stage(&bundle);
    assert!(
        matches!(result, Err(ArchiveError::UnsafeEntry { ref name }) if name == "../escaped.json"),
        "unexpected result: {result:?}"
    );
    assert!(!dir.path().parent().unwrap().join("escaped.json").exists());
}

#[test]
fn test_non_zip_bundle_is_corrupt() {
    let dir = tempdir().unwrap();
    let bundle = dir.path().join("bundle.zip");
    fs::write(&bundle, b"definitely not a zip archive").unwrap();

    assert!(matches!(stage(&bundle), Err(ArchiveError::Corrupt { .. })));
}

#[test]
fn test_missing_bundle_fails_to_open() {
    let dir = tempdir().unwrap();
    assert!(matches!(
        stage(&dir.path().join("absent.zip")),
        Err(ArchiveError::Open { .. })
    ));
}

#[test]
fn test_root_directory_entry_is_skipped() {
    use std::io::Write;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    let dir = tempdir().unwrap();
    let bundle = dir.path().join("bundle.zip");
    let mut zip = ZipWriter::new(fs::File::create(&bundle).unwrap());
    let options = SimpleFileOptions::default();
    zip.add_directory("./", options).unwrap();
    zip.start_file("./accounts.json", options).unwrap();
    zip.write_all(b"{\"id\":\"111111111111\"}\n").unwrap();
    zip.finish().unwrap();

    let staged = stage(&bundle).expect("a root directory entry is harmless");
    assert_eq!(staged.entries(), 1);
    assert!(staged.path().join("accounts.json").is_file());
}
