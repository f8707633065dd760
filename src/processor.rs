use crate::actions::{Action, ActionError};
use crate::codec::Record;
use crate::config::RuleCatalog;
use crate::lookup::LookupTables;
use crate::meta;
use crate::tags;
use dicom_object::mem::InMemElement;
use dicom_object::{FileDicomObject, InMemDicomObject};
use log::debug;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error(transparent)]
    LookupMiss(ActionError),

    #[error("Value error: {}", .0.to_lowercase())]
    ValueError(String),
}

impl From<ActionError> for Error {
    fn from(err: ActionError) -> Self {
        match err {
            ActionError::ValueError(message) => Error::ValueError(message),
            miss => Error::LookupMiss(miss),
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

pub trait Processor {
    fn transform(&self, input: &Record) -> Result<Record>;
}

/// Applies a [`RuleCatalog`] to DICOM records, using [`LookupTables`] for `lookup` rules.
///
/// The output record always gets the input's preamble, file meta group (and with it the
/// transfer syntax) and pixel data. Of the other data elements, only those with a rule in the
/// catalog are written, transformed according to their [`Action`].
///
/// Rules for file meta tags (group `0002`) only have an effect for [`Action::Constant`], which
/// overwrites the meta value.
///
/// Limitation: only top-level data elements are matched against the catalog. A kept sequence
/// is copied with all of its items.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Deidentifier {
    catalog: RuleCatalog,
    tables: LookupTables,
}

impl Deidentifier {
    pub fn new(catalog: RuleCatalog, tables: LookupTables) -> Self {
        Self { catalog, tables }
    }

    pub fn catalog(&self) -> &RuleCatalog {
        &self.catalog
    }

    pub fn tables(&self) -> &LookupTables {
        &self.tables
    }
}

impl Processor for Deidentifier {
    fn transform(&self, input: &Record) -> Result<Record> {
        let source = input.object();
        let dataset: &InMemDicomObject = source;
        let mut file_meta = source.meta().clone();
        let mut elements: Vec<InMemElement> = Vec::with_capacity(self.catalog.len() + 1);

        if let Ok(pixel_data) = dataset.element(tags::PIXEL_DATA) {
            elements.push(pixel_data.clone());
        }

        for (tag, action) in self.catalog.iter() {
            let elem = match dataset.element(*tag) {
                Ok(elem) if !meta::is_meta_tag(tag) => elem,
                _ => {
                    // the file meta group was copied as a whole, only constants change it
                    if let Action::Constant(value) = action {
                        if meta::set_value(&mut file_meta, *tag, value) {
                            debug!("replaced file meta tag {tag}");
                        }
                    }
                    continue;
                }
            };

            let processed = action.process(&self.tables, elem)?;
            elements.push(processed.into_owned());
        }

        let mut output = FileDicomObject::new_empty_with_meta(file_meta);
        for elem in elements {
            output.put(elem);
        }
        Ok(input.derive(output))
    }
}

/// A [`Processor`] that returns a copy of its input.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NoopProcessor;

impl NoopProcessor {
    pub fn new() -> Self {
        Self
    }
}

impl Processor for NoopProcessor {
    fn transform(&self, input: &Record) -> Result<Record> {
        Ok(input.clone())
    }
}
