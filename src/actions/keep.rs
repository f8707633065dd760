use dicom_object::mem::InMemElement;
use std::borrow::Cow;

use crate::actions::errors::ActionError;
use crate::actions::ProcessElement;
use crate::lookup::LookupTables;

/// Action that copies DICOM elements to the output unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct Keep;

impl ProcessElement for Keep {
    fn process<'a>(
        &self,
        _tables: &LookupTables,
        elem: &'a InMemElement,
    ) -> Result<Cow<'a, InMemElement>, ActionError> {
        Ok(Cow::Borrowed(elem))
    }
}
