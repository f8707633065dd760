//! Conversion between element values and the strings that rules and lookup tables work with.

use dicom_core::header::Header;
use dicom_core::value::C;
use dicom_core::{PrimitiveValue, VR};
use dicom_object::mem::InMemElement;
use std::str::FromStr;

use crate::actions::errors::ActionError;

/// Renders the current value of `elem` as a string, without trailing padding.
pub(crate) fn value_as_string(elem: &InMemElement) -> Result<String, ActionError> {
    let value = elem
        .to_str()
        .map_err(|err| ActionError::ValueError(format!("{err}")))?;
    Ok(value.trim_end_matches(|c: char| c == ' ' || c == '\0').to_string())
}

fn parse_all<T: FromStr>(text: &str) -> Option<C<T>> {
    text.split('\\').map(|part| part.trim().parse().ok()).collect()
}

/// Builds a new value for `elem` from `text`, typed according to the element's VR.
///
/// Multiple values of a numeric VR are separated by a backslash. An empty `text` gives an
/// empty value for any VR but `SQ`. Text that does not fit the VR is an error rather than
/// being written as raw bytes.
pub(crate) fn typed_value(elem: &InMemElement, text: &str) -> Result<PrimitiveValue, ActionError> {
    let vr = elem.vr();
    let invalid = || {
        ActionError::ValueError(format!(
            "cannot write {text:?} to tag {} with VR {vr:?}",
            elem.tag()
        ))
    };

    if vr == VR::SQ {
        return Err(invalid());
    }
    if text.is_empty() {
        return Ok(PrimitiveValue::Empty);
    }

    let value = match vr {
        VR::AE
        | VR::AS
        | VR::CS
        | VR::DA
        | VR::DS
        | VR::DT
        | VR::IS
        | VR::LO
        | VR::LT
        | VR::PN
        | VR::SH
        | VR::ST
        | VR::TM
        | VR::UC
        | VR::UI
        | VR::UR
        | VR::UT => PrimitiveValue::from(text),
        VR::US => PrimitiveValue::U16(parse_all(text).ok_or_else(invalid)?),
        VR::SS => PrimitiveValue::I16(parse_all(text).ok_or_else(invalid)?),
        VR::UL => PrimitiveValue::U32(parse_all(text).ok_or_else(invalid)?),
        VR::SL => PrimitiveValue::I32(parse_all(text).ok_or_else(invalid)?),
        VR::UV => PrimitiveValue::U64(parse_all(text).ok_or_else(invalid)?),
        VR::SV => PrimitiveValue::I64(parse_all(text).ok_or_else(invalid)?),
        VR::FL => PrimitiveValue::F32(parse_all(text).ok_or_else(invalid)?),
        VR::FD => PrimitiveValue::F64(parse_all(text).ok_or_else(invalid)?),
        // tags and binary data have no text form
        _ => return Err(invalid()),
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    use dicom_core::value::Value;

    use crate::tags;

    fn element(tag: dicom_core::Tag, vr: VR, value: PrimitiveValue) -> InMemElement {
        InMemElement::new(tag, vr, Value::Primitive(value))
    }

    #[test]
    fn test_value_as_string_trims_padding() {
        let elem = element(tags::PATIENT_ID, VR::LO, PrimitiveValue::from("203087 "));
        assert_eq!(value_as_string(&elem).unwrap(), "203087");

        let elem = element(tags::ROWS, VR::US, PrimitiveValue::U16([512].into_iter().collect()));
        assert_eq!(value_as_string(&elem).unwrap(), "512");
    }

    #[test]
    fn test_typed_value_string() {
        let elem = element(tags::PATIENT_NAME, VR::PN, PrimitiveValue::from("Doe^John"));
        assert_eq!(
            typed_value(&elem, "ANON001").unwrap(),
            PrimitiveValue::from("ANON001")
        );
    }

    #[test]
    fn test_typed_value_numeric() {
        let elem = element(tags::ROWS, VR::US, PrimitiveValue::U16([512].into_iter().collect()));
        assert_eq!(
            typed_value(&elem, "0").unwrap(),
            PrimitiveValue::U16([0].into_iter().collect())
        );

        let elem = element(
            tags::PIXEL_SPACING,
            VR::FD,
            PrimitiveValue::F64([0.5, 0.5].into_iter().collect()),
        );
        assert_eq!(
            typed_value(&elem, "1.5\\2").unwrap(),
            PrimitiveValue::F64([1.5, 2.0].into_iter().collect())
        );
    }

    #[test]
    fn test_typed_value_empty() {
        let elem = element(tags::ROWS, VR::US, PrimitiveValue::U16([512].into_iter().collect()));
        assert_eq!(
            typed_value(&elem, "").unwrap(),
            PrimitiveValue::Empty
        );
    }

    #[test]
    fn test_typed_value_does_not_fit() {
        let elem = element(tags::ROWS, VR::US, PrimitiveValue::U16([512].into_iter().collect()));
        assert!(matches!(
            typed_value(&elem, "ANON"),
            Err(ActionError::ValueError(_))
        ));
        assert!(matches!(
            typed_value(&elem, "70000"),
            Err(ActionError::ValueError(_))
        ));

        let elem = element(tags::PIXEL_DATA, VR::OB, PrimitiveValue::from(vec![1_u8, 2]));
        assert!(matches!(
            typed_value(&elem, "0"),
            Err(ActionError::ValueError(_))
        ));
    }

    #[test]
    fn test_typed_value_sequence() {
        let elem = InMemElement::new(
            tags::REFERENCED_IMAGE_SEQUENCE,
            VR::SQ,
            Value::Primitive(PrimitiveValue::Empty),
        );
        assert!(matches!(
            typed_value(&elem, ""),
            Err(ActionError::ValueError(_))
        ));
    }
}
