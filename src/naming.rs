//! Turning operator-entered names into output file names.

use crate::error::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

static RE_FORBIDDEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s-]").unwrap());
static RE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

pub const DEFAULT_FIRST_NAME: &str = "Unknown";

/// What to do when a confirmed name maps to a file name already in use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum CollisionPolicy {
    /// Refuse the confirmation; the page stays current.
    #[default]
    Reject,
    /// Append `_2`, `_3`, ... until the name is free.
    Suffix,
}

/// The names recorded for one page after trimming and defaulting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatientName {
    pub first_name: String,
    pub last_name: String,
}

impl PatientName {
    /// Trim both fields; if both end up empty, use `Unknown` / `Patient_<ordinal>`.
    pub fn resolve(first_name: &str, last_name: &str, ordinal: u32) -> Self {
        let first_name = first_name.trim();
        let last_name = last_name.trim();

        if first_name.is_empty() && last_name.is_empty() {
            return PatientName {
                first_name: DEFAULT_FIRST_NAME.to_string(),
                last_name: default_last_name(ordinal),
            };
        }

        PatientName {
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

fn default_last_name(ordinal: u32) -> String {
    format!("Patient_{}", ordinal)
}

/// Strip characters outside word/whitespace/hyphen, then collapse each
/// whitespace run into one underscore.
pub fn sanitize(name: &str) -> String {
    let stripped = RE_FORBIDDEN.replace_all(name, "");
    RE_WHITESPACE.replace_all(&stripped, "_").into_owned()
}

/// Base file stem for a page: the sanitized full name, or the default
/// patient stem when nothing survives sanitization.
pub fn file_stem(name: &PatientName, ordinal: u32) -> String {
    let stem = sanitize(&name.full_name());
    if stem.is_empty() {
        format!("{}_{}", DEFAULT_FIRST_NAME, default_last_name(ordinal))
    } else {
        stem
    }
}

/// Tracks which output file names a session has handed out.
#[derive(Debug, Default)]
pub struct NameRegistry {
    taken: HashSet<String>,
    policy: CollisionPolicy,
}

impl NameRegistry {
    pub fn new(policy: CollisionPolicy) -> Self {
        NameRegistry {
            taken: HashSet::new(),
            policy,
        }
    }

    /// Pick the `.pdf` file name for `stem` without reserving it.
    pub fn propose(&self, stem: &str, ordinal: u32) -> Result<String> {
        let candidate = format!("{}.pdf", stem);
        if !self.is_taken(&candidate) {
            return Ok(candidate);
        }

        match self.policy {
            CollisionPolicy::Reject => Err(Error::DuplicateOutput {
                file_name: candidate,
                page: ordinal,
            }),
            CollisionPolicy::Suffix => {
                let mut n = 2u32;
                loop {
                    let candidate = format!("{}_{}.pdf", stem, n);
                    if !self.is_taken(&candidate) {
                        return Ok(candidate);
                    }
                    n += 1;
                }
            }
        }
    }

    pub fn reserve(&mut self, file_name: &str) {
        self.taken.insert(file_name.to_lowercase());
    }

    // Case-insensitive so renamed files don't clobber each other on
    // case-folding filesystems.
    fn is_taken(&self, file_name: &str) -> bool {
        self.taken.contains(&file_name.to_lowercase())
    }
}

/// Copy a split page to `output_dir/file_name`.
pub fn copy_page(source: &Path, output_dir: &Path, file_name: &str) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir).map_err(|e| Error::io(output_dir, e))?;
    let dest = output_dir.join(file_name);
    std::fs::copy(source, &dest).map_err(|e| Error::io(&dest, e))?;
    Ok(dest)
}
