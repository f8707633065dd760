use dicom_core::Tag;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ActionError {
    #[error("lookup miss: tag {0} has no entry in the Tag2Name table")]
    MissingTableName(Tag),

    #[error("lookup miss: value {value:?} of tag {tag} has no entry in table {table}")]
    LookupMiss {
        tag: Tag,
        table: String,
        value: String,
    },

    #[error("Value error: {}", .0.to_lowercase())]
    ValueError(String),
}
