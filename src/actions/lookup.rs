use dicom_core::header::Header;
use dicom_object::mem::InMemElement;
use std::borrow::Cow;

use crate::actions::errors::ActionError;
use crate::actions::value::{typed_value, value_as_string};
use crate::actions::ProcessElement;
use crate::lookup::LookupTables;

/// Action that substitutes DICOM element values through a lookup table.
///
/// The table is the one that `Tag2Name` names for the element's tag, and the key is the
/// element's current value rendered as a string.
#[derive(Debug, Clone, PartialEq)]
pub struct Lookup;

impl ProcessElement for Lookup {
    fn process<'a>(
        &self,
        tables: &LookupTables,
        elem: &'a InMemElement,
    ) -> Result<Cow<'a, InMemElement>, ActionError> {
        let tag = elem.tag();
        let table = tables
            .table_for_tag(&tag)
            .ok_or(ActionError::MissingTableName(tag))?;

        let current_value = value_as_string(elem)?;
        let new_value =
            tables
                .get(table, &current_value)
                .ok_or_else(|| ActionError::LookupMiss {
                    tag,
                    table: table.to_string(),
                    value: current_value.clone(),
                })?;

        let value = typed_value(elem, new_value)?;
        Ok(Cow::Owned(InMemElement::new(tag, elem.vr(), value)))
    }
}
