//! The per-page labeling state machine and the store that owns it.
//!
//! A [`Session`] lives from upload to download. Its current page is always
//! the number of confirmed records, so a page can be neither skipped nor
//! revisited. The [`SessionStore`] is what a front end keeps between user
//! interactions; it applies discrete [`Event`]s and drops the session (and
//! its scratch directory) on reset.

use crate::bundle::Bundle;
use crate::config::SessionConfig;
use crate::error::{Error, Result};
use crate::naming::{copy_page, file_stem, NameRegistry, PatientName};
use crate::pdf::{split_pages, text::page_preview, PageDocument, PdfDocument};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const INPUT_FILE_NAME: &str = "input.pdf";

/// A confirmed page. Never changed after it is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatientRecord {
    pub first_name: String,
    pub last_name: String,
    pub source_page_ordinal: u32,
    pub output_path: PathBuf,
}

impl PatientRecord {
    /// Base name of the renamed file; also its name inside the archive.
    pub fn file_name(&self) -> String {
        self.output_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionState {
    AwaitingInput { page_index: usize },
    Complete,
}

pub struct Session {
    // Held for its Drop: removes the input copy and split pages.
    scratch: TempDir,
    source_name: String,
    pages: Vec<PageDocument>,
    records: Vec<PatientRecord>,
    names: NameRegistry,
    output_dir: PathBuf,
    preview_lines: usize,
}

impl Session {
    /// Validate the upload, stash it in a fresh scratch directory and split
    /// it into pages.
    pub fn start(upload: &[u8], source_name: &str, config: &SessionConfig) -> Result<Self> {
        let doc = PdfDocument::from_bytes(upload)?;
        Self::from_document(&doc, upload, source_name, config)
    }

    /// Like [`Session::start`] for an upload that has already been parsed.
    pub fn from_document(
        doc: &PdfDocument,
        upload: &[u8],
        source_name: &str,
        config: &SessionConfig,
    ) -> Result<Self> {
        let scratch = tempfile::Builder::new()
            .prefix("formsplit-")
            .tempdir()
            .map_err(|e| Error::io(std::env::temp_dir(), e))?;

        let input_path = scratch.path().join(INPUT_FILE_NAME);
        std::fs::write(&input_path, upload).map_err(|e| Error::io(&input_path, e))?;

        let pages = split_pages(doc, &scratch.path().join("pages"), "page")?;

        let output_dir = match &config.output_dir {
            Some(dir) => dir.clone(),
            None => scratch.path().join("renamed"),
        };
        let mut names = NameRegistry::new(config.collision);
        reserve_existing(&mut names, &output_dir)?;

        tracing::info!(
            source = source_name,
            pages = pages.len(),
            scratch = %scratch.path().display(),
            "split upload into pages"
        );

        Ok(Session {
            scratch,
            source_name: source_name.to_string(),
            pages,
            records: Vec::new(),
            names,
            output_dir,
            preview_lines: config.preview_lines,
        })
    }

    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    pub fn scratch_dir(&self) -> &Path {
        self.scratch.path()
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Always equal to the number of confirmed records.
    pub fn current_page_index(&self) -> usize {
        self.records.len()
    }

    pub fn records(&self) -> &[PatientRecord] {
        &self.records
    }

    pub fn is_complete(&self) -> bool {
        self.records.len() == self.pages.len()
    }

    pub fn state(&self) -> SessionState {
        if self.is_complete() {
            SessionState::Complete
        } else {
            SessionState::AwaitingInput {
                page_index: self.current_page_index(),
            }
        }
    }

    pub fn current_page(&self) -> Option<&PageDocument> {
        self.pages.get(self.current_page_index())
    }

    /// Text preview of the page awaiting input.
    pub fn current_preview(&self) -> Result<String> {
        let page = self.current_page().ok_or(Error::AlreadyComplete)?;
        page_preview(&page.path, self.preview_lines)
    }

    /// Record names for the current page, copy it to its new name and move
    /// on. On error nothing changes and the same page stays current.
    pub fn confirm(&mut self, first_name: &str, last_name: &str) -> Result<PatientRecord> {
        let page = self.current_page().ok_or(Error::AlreadyComplete)?.clone();

        let name = PatientName::resolve(first_name, last_name, page.ordinal);
        let stem = file_stem(&name, page.ordinal);
        let file_name = match self.names.propose(&stem, page.ordinal) {
            Ok(file_name) => file_name,
            Err(e) => {
                tracing::warn!(page = page.ordinal, error = %e, "rejected confirmation");
                return Err(e);
            }
        };

        let output_path = copy_page(&page.path, &self.output_dir, &file_name)?;
        self.names.reserve(&file_name);

        tracing::info!(
            page = page.ordinal,
            total = self.pages.len(),
            file = %file_name,
            "confirmed page"
        );

        let record = PatientRecord {
            first_name: name.first_name,
            last_name: name.last_name,
            source_page_ordinal: page.ordinal,
            output_path,
        };
        self.records.push(record.clone());
        Ok(record)
    }

    /// Build the manifest and archive. Only valid once every page is confirmed.
    pub fn bundle(&self) -> Result<Bundle> {
        if !self.is_complete() {
            return Err(Error::Incomplete {
                confirmed: self.records.len(),
                total: self.pages.len(),
            });
        }
        Bundle::build(&self.records)
    }

    /// Throw the session away. Renamed pages written outside the scratch
    /// directory are removed too; the scratch directory goes with `self`.
    pub fn discard(self) {
        if !self.output_dir.starts_with(self.scratch_dir()) {
            for record in &self.records {
                if let Err(e) = std::fs::remove_file(&record.output_path) {
                    tracing::warn!(
                        path = %record.output_path.display(),
                        error = %e,
                        "failed to remove renamed page"
                    );
                }
            }
        }
        tracing::info!(source = %self.source_name, "discarded session");
    }
}

// Files already sitting in a configured output directory count as taken.
fn reserve_existing(names: &mut NameRegistry, dir: &Path) -> Result<()> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(Error::io(dir, e)),
    };
    for entry in entries {
        let entry = entry.map_err(|e| Error::io(dir, e))?;
        if let Some(name) = entry.file_name().to_str() {
            names.reserve(name);
        }
    }
    Ok(())
}

/// A discrete user action.
#[derive(Debug, Clone)]
pub enum Event {
    Upload { bytes: Vec<u8>, source_name: String },
    Confirm { first_name: String, last_name: String },
    Reset,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Started { page_count: usize },
    Confirmed { record: PatientRecord, complete: bool },
    Reset,
}

/// Session-scoped state that outlives individual interactions.
#[derive(Default)]
pub struct SessionStore {
    config: SessionConfig,
    session: Option<Session>,
}

impl SessionStore {
    pub fn new(config: SessionConfig) -> Self {
        SessionStore {
            config,
            session: None,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn active(&self) -> Result<&Session> {
        self.session.as_ref().ok_or(Error::NoSession)
    }

    pub fn handle(&mut self, event: Event) -> Result<Outcome> {
        match event {
            Event::Upload { bytes, source_name } => {
                // Validate before touching the current session
                let doc = PdfDocument::from_bytes(&bytes)?;
                // The old session's renamed pages must be gone before the
                // new one takes stock of the output directory.
                if let Some(old) = self.session.take() {
                    old.discard();
                }
                let session = Session::from_document(&doc, &bytes, &source_name, &self.config)?;
                let page_count = session.page_count();
                self.session = Some(session);
                Ok(Outcome::Started { page_count })
            }
            Event::Confirm {
                first_name,
                last_name,
            } => {
                let session = self.session.as_mut().ok_or(Error::NoSession)?;
                let record = session.confirm(&first_name, &last_name)?;
                Ok(Outcome::Confirmed {
                    record,
                    complete: session.is_complete(),
                })
            }
            Event::Reset => {
                if let Some(old) = self.session.take() {
                    old.discard();
                }
                Ok(Outcome::Reset)
            }
        }
    }
}
