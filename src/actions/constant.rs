use dicom_core::header::Header;
use dicom_object::mem::InMemElement;
use std::borrow::Cow;

use crate::actions::errors::ActionError;
use crate::actions::value::typed_value;
use crate::actions::ProcessElement;
use crate::lookup::LookupTables;

/// Action that replaces DICOM element values with a fixed value.
///
/// An empty replacement value leaves the element in place with an empty value, which is how
/// the `empty` rule method blanks a tag. A value that does not fit the element's VR, such as
/// text for a `US` element, is an error.
#[derive(Debug, Clone, PartialEq)]
pub struct Constant<'v> {
    new_value: &'v str,
}

impl<'v> Constant<'v> {
    pub fn new(new_value: &'v str) -> Self {
        Self { new_value }
    }
}

impl ProcessElement for Constant<'_> {
    fn process<'a>(
        &self,
        _tables: &LookupTables,
        elem: &'a InMemElement,
    ) -> Result<Cow<'a, InMemElement>, ActionError> {
        let value = typed_value(elem, self.new_value)?;
        Ok(Cow::Owned(InMemElement::new(elem.tag(), elem.vr(), value)))
    }
}
