mod clamp;
mod constant;
pub(crate) mod errors;
mod keep;
mod lookup;
mod value;

use dicom_object::mem::InMemElement;
use serde::Serialize;
use std::borrow::Cow;

use crate::lookup::LookupTables;
use clamp::ClampNumeric;
use constant::Constant;
pub use errors::ActionError;
use keep::Keep;
use lookup::Lookup;

pub use clamp::clamp_value;

pub(crate) trait ProcessElement {
    fn process<'a>(
        &self,
        tables: &LookupTables,
        elem: &'a InMemElement,
    ) -> Result<Cow<'a, InMemElement>, ActionError>;
}

/// Specifies the action to perform on a DICOM data element that is present in the input.
///
/// Tags without an action are not written to the output at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", content = "value", rename_all = "snake_case")]
pub enum Action {
    /// Preserve the original data element without modification.
    Keep,

    /// Replace the data element value with the given string. An empty string blanks the value.
    Constant(String),

    /// Replace the data element value with its entry in the lookup table that `Tag2Name`
    /// associates with the tag.
    Lookup,

    /// Keep only the digits of the value, cap them at the given maximum and render the result
    /// as an age string like `045Y`.
    ClampNumeric(u32),
}

impl Action {
    /// Shorthand for [`Action::Constant`] with an empty value.
    pub fn empty() -> Self {
        Action::Constant(String::new())
    }

    pub(crate) fn process<'a>(
        &self,
        tables: &LookupTables,
        elem: &'a InMemElement,
    ) -> Result<Cow<'a, InMemElement>, ActionError> {
        match self {
            Action::Keep => Keep.process(tables, elem),
            Action::Constant(value) => Constant::new(value).process(tables, elem),
            Action::Lookup => Lookup.process(tables, elem),
            Action::ClampNumeric(max) => ClampNumeric::new(*max).process(tables, elem),
        }
    }
}
