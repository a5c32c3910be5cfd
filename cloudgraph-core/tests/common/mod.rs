#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Write a zip bundle named `bundle.zip` into `dir` with the given entries.
pub fn write_bundle(dir: &Path, entries: &[(&str, &str)]) -> PathBuf {
    let path = dir.join("bundle.zip");
    let file = File::create(&path).unwrap();
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    for (name, content) in entries {
        zip.start_file(*name, options).unwrap();
        zip.write_all(content.as_bytes()).unwrap();
    }
    zip.finish().unwrap();
    path
}

pub const ORG_ID: &str = "o-abc123";
pub const ACCOUNT_1: &str = "111111111111";
pub const ACCOUNT_2: &str = "222222222222";

pub fn organizations_ndjson() -> String {
    format!(
        r#"{{"id":"{ORG_ID}","arn":"arn:aws:organizations::{ACCOUNT_1}:organization/{ORG_ID}","masterAccountId":"{ACCOUNT_1}","featureSet":"ALL"}}"#
    ) + "\n"
}

pub fn accounts_ndjson() -> String {
    [ACCOUNT_1, ACCOUNT_2]
        .iter()
        .map(|id| {
            format!(
                r#"{{"id":"{id}","name":"acct-{id}","status":"ACTIVE","organizationId":"{ORG_ID}","childAccount":true}}"#
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
        + "\n"
}
