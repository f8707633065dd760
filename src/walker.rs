//! De-identification of a whole dataset laid out as `Dataset/Patient/Exam/Series/File`.
//!
//! The output tree mirrors the input tree level by level:
//!
//! | level   | output name                                    |
//! |---------|------------------------------------------------|
//! | patient | pseudonym from the `PatientName` lookup table  |
//! | exam    | unchanged                                      |
//! | series  | whitespace removed                             |
//! | file    | unchanged                                      |
//!
//! Output directories are created when missing and output files are overwritten, so a walk can
//! be re-run against a partially written output tree.

use indicatif::ProgressBar;
use log::{debug, info, warn};
use rayon::prelude::*;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

use crate::codec::{Codec, CodecError};
use crate::lookup::LookupTables;
use crate::processor::{self, Processor};

#[derive(Error, Debug)]
pub enum WalkError {
    #[error("no pseudonym for patient directory {name:?} in the PatientName table")]
    UnknownPatient { name: String },

    #[error("pseudonym {pseudonym:?} for patient directory {name:?} is not a plain directory name")]
    InvalidPseudonym { name: String, pseudonym: String },

    #[error("I/O error for {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Processing(#[from] processor::Error),
}

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> WalkError + '_ {
    move |source| WalkError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// A patient directory or file that could not be de-identified.
#[derive(Debug)]
pub struct Failure {
    pub path: PathBuf,
    pub error: WalkError,
}

/// Outcome of [`Walker::run`].
#[derive(Debug, Default)]
pub struct WalkReport {
    /// Patient directories that were resolved to a pseudonym.
    pub patients: usize,
    pub files_written: usize,
    pub failures: Vec<Failure>,
}

impl WalkReport {
    fn merge(&mut self, other: WalkReport) {
        self.patients += other.patients;
        self.files_written += other.files_written;
        self.failures.extend(other.failures);
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WalkOptions {
    /// Abort the walk on the first failure instead of recording it and moving on.
    pub fail_fast: bool,

    /// Process patient directories in parallel.
    pub parallel: bool,

    /// Show a progress bar over the patient directories.
    pub progress: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum EntryKind {
    Directory,
    File,
}

/// Lists the immediate children of `dir` of the given kind, following symlinks.
fn children(dir: &Path, kind: EntryKind) -> Result<Vec<PathBuf>, WalkError> {
    let mut children = Vec::new();

    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).follow_links(true) {
        let entry = entry.map_err(|err| WalkError::Io {
            path: dir.to_path_buf(),
            source: err.into(),
        })?;
        let file_type = entry.file_type();
        let wanted = match kind {
            EntryKind::Directory => file_type.is_dir(),
            EntryKind::File => file_type.is_file(),
        };
        if wanted {
            children.push(entry.into_path());
        }
    }

    Ok(children)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Whether `name` is a single plain path segment, so that joining it stays inside the parent.
fn is_plain_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

pub(crate) fn strip_whitespace(name: &str) -> String {
    name.chars().filter(|c| !c.is_whitespace()).collect()
}

fn create_dir_if_missing(path: &Path) -> Result<(), WalkError> {
    fs::create_dir_all(path).map_err(io_error(path))
}

/// Walks a `Dataset/Patient/Exam/Series/File` tree and writes the de-identified tree.
pub struct Walker<'a, C, P> {
    codec: C,
    processor: &'a P,
    tables: &'a LookupTables,
    options: WalkOptions,
}

impl<'a, C, P> Walker<'a, C, P>
where
    C: Codec + Sync,
    P: Processor + Sync,
{
    /// Creates a walker that transforms files with `processor` and looks up patient
    /// pseudonyms in `tables`.
    pub fn new(codec: C, processor: &'a P, tables: &'a LookupTables) -> Self {
        Self {
            codec,
            processor,
            tables,
            options: WalkOptions::default(),
        }
    }

    pub fn options(mut self, options: WalkOptions) -> Self {
        self.options = options;
        self
    }

    /// De-identifies every file under `input_root` into `output_root`.
    ///
    /// A patient directory without a pseudonym is skipped entirely, and a file that fails to
    /// parse, transform or encode is not written. Both are recorded in the returned report,
    /// or returned as an error if [`WalkOptions::fail_fast`] is set. Failing to list input
    /// directories or to create output directories always aborts the walk.
    pub fn run(&self, input_root: &Path, output_root: &Path) -> Result<WalkReport, WalkError> {
        create_dir_if_missing(output_root)?;

        let patient_dirs = children(input_root, EntryKind::Directory)?;
        info!(
            "found {} patient directories in {}",
            patient_dirs.len(),
            input_root.display()
        );

        let progress = if self.options.progress {
            ProgressBar::new(patient_dirs.len() as u64)
        } else {
            ProgressBar::hidden()
        };

        let process = |patient_dir: &PathBuf| {
            let result = self.process_patient(patient_dir, output_root);
            progress.inc(1);
            result
        };
        let reports: Result<Vec<WalkReport>, WalkError> = if self.options.parallel {
            patient_dirs.par_iter().map(process).collect()
        } else {
            patient_dirs.iter().map(process).collect()
        };
        progress.finish_and_clear();

        let mut report = WalkReport::default();
        for patient_report in reports? {
            report.merge(patient_report);
        }

        info!(
            "de-identified {} files of {} patients, {} failures",
            report.files_written,
            report.patients,
            report.failures.len()
        );
        Ok(report)
    }

    fn record_failure(
        &self,
        report: &mut WalkReport,
        path: &Path,
        error: WalkError,
    ) -> Result<(), WalkError> {
        if self.options.fail_fast {
            return Err(error);
        }
        warn!("{}: {}", path.display(), error);
        report.failures.push(Failure {
            path: path.to_path_buf(),
            error,
        });
        Ok(())
    }

    fn process_patient(
        &self,
        patient_dir: &Path,
        output_root: &Path,
    ) -> Result<WalkReport, WalkError> {
        let mut report = WalkReport::default();

        let name = file_name(patient_dir);
        let Some(pseudonym) = self.tables.patient_id(&name) else {
            self.record_failure(&mut report, patient_dir, WalkError::UnknownPatient { name })?;
            return Ok(report);
        };
        if !is_plain_name(pseudonym) {
            let error = WalkError::InvalidPseudonym {
                name,
                pseudonym: pseudonym.to_string(),
            };
            self.record_failure(&mut report, patient_dir, error)?;
            return Ok(report);
        }
        debug!("patient {} -> {}", patient_dir.display(), pseudonym);

        let output_patient_dir = output_root.join(pseudonym);
        create_dir_if_missing(&output_patient_dir)?;
        report.patients += 1;

        for exam_dir in children(patient_dir, EntryKind::Directory)? {
            let output_exam_dir = output_patient_dir.join(file_name(&exam_dir));
            create_dir_if_missing(&output_exam_dir)?;

            for series_dir in children(&exam_dir, EntryKind::Directory)? {
                let output_series_dir =
                    output_exam_dir.join(strip_whitespace(&file_name(&series_dir)));
                create_dir_if_missing(&output_series_dir)?;

                for file in children(&series_dir, EntryKind::File)? {
                    match self.process_file(&file, &output_series_dir) {
                        Ok(output_file) => {
                            debug!("wrote {}", output_file.display());
                            report.files_written += 1;
                        }
                        Err(error) => self.record_failure(&mut report, &file, error)?,
                    }
                }
            }
        }

        Ok(report)
    }

    /// Parses, transforms and encodes one file, then writes it to `output_dir` under its
    /// original name. Nothing is written if any step fails.
    fn process_file(&self, input_file: &Path, output_dir: &Path) -> Result<PathBuf, WalkError> {
        let bytes = fs::read(input_file).map_err(io_error(input_file))?;
        let record = self.codec.parse(&bytes)?;
        let transformed = self.processor.transform(&record)?;
        let encoded = self.codec.encode(&transformed)?;

        let output_file = output_dir.join(file_name(input_file));
        fs::write(&output_file, encoded).map_err(io_error(&output_file))?;
        Ok(output_file)
    }
}
