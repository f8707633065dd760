use dicom_core::header::Header;
use dicom_core::value::Value;
use dicom_core::{PrimitiveValue, VR};
use dicom_object::mem::InMemElement;
use dicom_object::meta::FileMetaTableBuilder;
use dicom_object::{DefaultDicomObject, FileDicomObject, FileMetaTable};

use crate::codec::Record;
use crate::tags;

pub(crate) fn make_file_meta() -> FileMetaTable {
    FileMetaTableBuilder::new()
        .media_storage_sop_class_uid("1.2.3")
        .media_storage_sop_instance_uid("2.3.4")
        .transfer_syntax("1.2.840.10008.1.2.1") // Explicit VR Little Endian
        .build()
        .unwrap()
}

pub(crate) fn make_object(elements: Vec<InMemElement>) -> DefaultDicomObject {
    let mut obj = FileDicomObject::new_empty_with_meta(make_file_meta());
    for elem in elements {
        obj.put(elem);
    }
    obj
}

pub(crate) fn make_record() -> Record {
    Record::new(make_object(vec![
        InMemElement::new(tags::PATIENT_NAME, VR::PN, Value::from("Doe^John")),
        InMemElement::new(tags::PATIENT_ID, VR::LO, Value::from("203087")),
        InMemElement::new(tags::PATIENT_AGE, VR::AS, Value::from("045Y")),
        InMemElement::new(tags::INSTITUTION_NAME, VR::LO, Value::from("General Hospital")),
        InMemElement::new(tags::MODALITY, VR::CS, Value::from("CT")),
        InMemElement::new(
            tags::PIXEL_DATA,
            VR::OB,
            Value::Primitive(PrimitiveValue::from(vec![1_u8, 2, 3, 4])),
        ),
    ]))
}

pub(crate) fn string_value(record: &Record, tag: dicom_core::Tag) -> Option<String> {
    record
        .object()
        .element(tag)
        .ok()
        .and_then(|elem| elem.to_str().ok().map(|v| v.into_owned()))
}

pub(crate) fn tags_of(record: &Record) -> Vec<dicom_core::Tag> {
    record.object().iter().map(|elem| elem.tag()).collect()
}
