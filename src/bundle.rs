//! CSV manifest and ZIP archive for a completed session.

use crate::error::{Error, Result};
use crate::session::PatientRecord;
use serde::Serialize;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

#[derive(Debug, Serialize)]
struct ManifestRow<'a> {
    #[serde(rename = "First Name")]
    first_name: &'a str,
    #[serde(rename = "Last Name")]
    last_name: &'a str,
    #[serde(rename = "PDF Path")]
    pdf_path: String,
}

/// The two downloads a finished session produces.
#[derive(Debug, Clone)]
pub struct Bundle {
    pub manifest_csv: Vec<u8>,
    pub archive_zip: Vec<u8>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportPaths {
    pub manifest: PathBuf,
    pub archive: PathBuf,
}

impl Bundle {
    pub fn build(records: &[PatientRecord]) -> Result<Self> {
        Ok(Bundle {
            manifest_csv: build_manifest(records)?,
            archive_zip: build_archive(records)?,
        })
    }

    /// Write both files into `dir`, creating it if needed.
    pub fn write_to(&self, dir: &Path, csv_name: &str, zip_name: &str) -> Result<ExportPaths> {
        std::fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;

        let manifest = dir.join(csv_name);
        std::fs::write(&manifest, &self.manifest_csv).map_err(|e| Error::io(&manifest, e))?;

        let archive = dir.join(zip_name);
        std::fs::write(&archive, &self.archive_zip).map_err(|e| Error::io(&archive, e))?;

        tracing::info!(
            manifest = %manifest.display(),
            archive = %archive.display(),
            "exported bundle"
        );
        Ok(ExportPaths { manifest, archive })
    }
}

/// One row per record, in confirmation order.
pub fn build_manifest(records: &[PatientRecord]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    if records.is_empty() {
        writer.write_record(["First Name", "Last Name", "PDF Path"])?;
    }
    for record in records {
        writer.serialize(ManifestRow {
            first_name: &record.first_name,
            last_name: &record.last_name,
            pdf_path: record.output_path.display().to_string(),
        })?;
    }
    writer
        .into_inner()
        .map_err(|e| Error::Manifest(csv::Error::from(e.into_error())))
}

/// Every renamed page stored under its base file name.
pub fn build_archive(records: &[PatientRecord]) -> Result<Vec<u8>> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for record in records {
        let entry_name = record.file_name();
        let bytes = std::fs::read(&record.output_path)
            .map_err(|e| Error::io(&record.output_path, e))?;

        zip.start_file(entry_name.clone(), options)?;
        zip.write_all(&bytes)
            .map_err(|e| Error::io(&record.output_path, e))?;
        tracing::debug!(entry = %entry_name, size = bytes.len(), "archived page");
    }

    Ok(zip.finish()?.into_inner())
}
