//! Rule-driven pseudonymization of DICOM datasets.
//!
//! A [`RuleCatalog`](config::RuleCatalog) decides, per tag, whether a data element is kept,
//! replaced by a constant, mapped through a [`LookupTables`](lookup::LookupTables) entry or
//! clamped to a maximum. Tags without a rule are dropped from the output. The
//! [`Walker`](walker::Walker) applies the rules to a `Patient/Exam/Series/File` directory tree
//! and replaces patient folder names with their pseudonyms.
//!
//! # Example
//!
//! ```no_run
//! use dicom_deidentification::codec::DicomCodec;
//! use dicom_deidentification::config::RuleCatalog;
//! use dicom_deidentification::lookup::LookupTables;
//! use dicom_deidentification::processor::Deidentifier;
//! use dicom_deidentification::walker::Walker;
//! use std::path::Path;
//!
//! let catalog = RuleCatalog::from_file("rules.script").unwrap();
//! let tables = LookupTables::load("lookup.ini").unwrap();
//! let deidentifier = Deidentifier::new(catalog, tables);
//!
//! let walker = Walker::new(DicomCodec, &deidentifier, deidentifier.tables());
//! let report = walker
//!     .run(Path::new("dataset"), Path::new("dataset_deidentified"))
//!     .unwrap();
//! assert!(report.failures.is_empty());
//! ```

pub mod actions;
pub mod codec;
pub mod config;
pub mod lookup;
mod meta;
pub mod processor;
pub mod walker;

#[cfg(test)]
pub(crate) mod test_utils;

pub use dicom_core::Tag;
pub use dicom_dictionary_std::tags;
