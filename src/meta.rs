//! Tag-level access to the file meta group, which `dicom-object` keeps as typed fields rather
//! than as data elements.

use dicom_core::Tag;
use dicom_object::FileMetaTable;
use log::warn;

use crate::tags;

pub(crate) fn is_meta_tag(tag: &Tag) -> bool {
    tag.group() == 0x0002
}

/// Whether the file meta group holds a value for `tag`.
pub(crate) fn contains(meta: &FileMetaTable, tag: Tag) -> bool {
    match tag {
        tags::FILE_META_INFORMATION_GROUP_LENGTH
        | tags::FILE_META_INFORMATION_VERSION
        | tags::MEDIA_STORAGE_SOP_CLASS_UID
        | tags::MEDIA_STORAGE_SOP_INSTANCE_UID
        | tags::TRANSFER_SYNTAX_UID
        | tags::IMPLEMENTATION_CLASS_UID => true,
        tags::IMPLEMENTATION_VERSION_NAME => meta.implementation_version_name.is_some(),
        tags::SOURCE_APPLICATION_ENTITY_TITLE => meta.source_application_entity_title.is_some(),
        tags::SENDING_APPLICATION_ENTITY_TITLE => meta.sending_application_entity_title.is_some(),
        tags::RECEIVING_APPLICATION_ENTITY_TITLE => {
            meta.receiving_application_entity_title.is_some()
        }
        tags::PRIVATE_INFORMATION_CREATOR_UID => meta.private_information_creator_uid.is_some(),
        tags::PRIVATE_INFORMATION => meta.private_information.is_some(),
        _ => false,
    }
}

/// Overwrites the file meta value for `tag`, if the file meta group holds one.
///
/// Returns whether a value was written. The binary fields (group length, version and
/// private information) are never overwritten.
pub(crate) fn set_value(meta: &mut FileMetaTable, tag: Tag, value: &str) -> bool {
    if !contains(meta, tag) {
        return false;
    }

    let value = value.to_string();
    match tag {
        tags::MEDIA_STORAGE_SOP_CLASS_UID => meta.media_storage_sop_class_uid = value,
        tags::MEDIA_STORAGE_SOP_INSTANCE_UID => meta.media_storage_sop_instance_uid = value,
        tags::TRANSFER_SYNTAX_UID => meta.transfer_syntax = value,
        tags::IMPLEMENTATION_CLASS_UID => meta.implementation_class_uid = value,
        tags::IMPLEMENTATION_VERSION_NAME => meta.implementation_version_name = Some(value),
        tags::SOURCE_APPLICATION_ENTITY_TITLE => {
            meta.source_application_entity_title = Some(value)
        }
        tags::SENDING_APPLICATION_ENTITY_TITLE => {
            meta.sending_application_entity_title = Some(value)
        }
        tags::RECEIVING_APPLICATION_ENTITY_TITLE => {
            meta.receiving_application_entity_title = Some(value)
        }
        tags::PRIVATE_INFORMATION_CREATOR_UID => meta.private_information_creator_uid = Some(value),
        _ => {
            warn!("did not change file meta tag {tag} because it holds a binary value");
            return false;
        }
    }
    meta.update_information_group_length();
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::make_file_meta;

    #[test]
    fn test_is_meta_tag() {
        assert!(is_meta_tag(&tags::TRANSFER_SYNTAX_UID));
        assert!(is_meta_tag(&tags::SOURCE_APPLICATION_ENTITY_TITLE));
        assert!(!is_meta_tag(&tags::PATIENT_NAME));
    }

    #[test]
    fn test_contains() {
        let mut meta = make_file_meta();
        assert!(contains(&meta, tags::MEDIA_STORAGE_SOP_INSTANCE_UID));
        assert!(contains(&meta, tags::TRANSFER_SYNTAX_UID));
        assert!(!contains(&meta, tags::PATIENT_NAME));

        meta.source_application_entity_title = None;
        assert!(!contains(&meta, tags::SOURCE_APPLICATION_ENTITY_TITLE));
        meta.source_application_entity_title = Some("SCANNER01".into());
        assert!(contains(&meta, tags::SOURCE_APPLICATION_ENTITY_TITLE));
    }

    #[test]
    fn test_set_value() {
        let mut meta = make_file_meta();
        meta.source_application_entity_title = Some("SCANNER01".into());

        assert!(set_value(&mut meta, tags::SOURCE_APPLICATION_ENTITY_TITLE, "ANON"));
        assert_eq!(meta.source_application_entity_title.as_deref(), Some("ANON"));

        assert!(set_value(&mut meta, tags::MEDIA_STORAGE_SOP_INSTANCE_UID, "9.9.9"));
        assert_eq!(meta.media_storage_sop_instance_uid, "9.9.9");
    }

    #[test]
    fn test_set_value_absent() {
        let mut meta = make_file_meta();
        meta.receiving_application_entity_title = None;

        assert!(!set_value(&mut meta, tags::RECEIVING_APPLICATION_ENTITY_TITLE, "ANON"));
        assert_eq!(meta.receiving_application_entity_title, None);
        assert!(!set_value(&mut meta, tags::PATIENT_NAME, "ANON"));
    }

    #[test]
    fn test_set_value_binary() {
        let mut meta = make_file_meta();
        let version = meta.information_version;

        assert!(!set_value(&mut meta, tags::FILE_META_INFORMATION_VERSION, "ANON"));
        assert_eq!(meta.information_version, version);
    }

    #[test]
    fn test_set_value_private_information() {
        let mut meta = make_file_meta();
        meta.private_information_creator_uid = Some("1.2.3".into());
        meta.private_information = Some(vec![0xCA, 0xFE]);

        assert!(!set_value(&mut meta, tags::PRIVATE_INFORMATION, "ANON"));
        assert_eq!(meta.private_information, Some(vec![0xCA, 0xFE]));
    }
}
