use dicom_core::header::Header;
use dicom_object::mem::InMemElement;
use std::borrow::Cow;

use crate::actions::errors::ActionError;
use crate::actions::value::{typed_value, value_as_string};
use crate::actions::ProcessElement;
use crate::lookup::LookupTables;

// used when a value has no digits at all, e.g. a missing age
const DEFAULT_VALUE: u64 = 50;

/// Action that caps numeric-like values, typically ages, at a maximum.
#[derive(Debug, Clone, PartialEq)]
pub struct ClampNumeric {
    max: u32,
}

impl ClampNumeric {
    pub fn new(max: u32) -> Self {
        Self { max }
    }
}

/// Keeps only the ASCII digits of `value`, caps the number at `max` and renders it as a
/// zero-padded, three digit age string with a `Y` suffix.
///
/// A value without any digits counts as `50`.
///
/// # Example
///
/// ```
/// use dicom_deidentification::actions::clamp_value;
///
/// assert_eq!(clamp_value("045 years", 90), "045Y");
/// assert_eq!(clamp_value("097Y", 90), "090Y");
/// assert_eq!(clamp_value("", 90), "050Y");
/// ```
pub fn clamp_value(value: &str, max: u32) -> String {
    let digits: String = value.chars().filter(char::is_ascii_digit).collect();
    let number = if digits.is_empty() {
        DEFAULT_VALUE
    } else {
        // overflow is above any u32 maximum
        digits.parse::<u64>().unwrap_or(u64::MAX)
    };
    format!("{:03}Y", number.min(u64::from(max)))
}

impl ProcessElement for ClampNumeric {
    fn process<'a>(
        &self,
        _tables: &LookupTables,
        elem: &'a InMemElement,
    ) -> Result<Cow<'a, InMemElement>, ActionError> {
        let current_value = value_as_string(elem)?;
        let new_value = clamp_value(&current_value, self.max);
        let value = typed_value(elem, &new_value)?;
        Ok(Cow::Owned(InMemElement::new(elem.tag(), elem.vr(), value)))
    }
}
