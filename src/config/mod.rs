pub(crate) mod script;
pub mod tag_action_map;

use crate::actions::Action;
use dicom_core::Tag;
use log::debug;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub use tag_action_map::TagActionMap;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("failed to read rule file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed rule script: {0}")]
    Xml(String),

    #[error("invalid rule declaration #{index}: {message}")]
    Validation { index: usize, message: String },

    #[error("unknown method {0:?}")]
    UnknownMethod(String),

    #[error("rule for tag {tag} with method {method} is missing attribute {attribute:?}")]
    MissingAttribute {
        tag: Tag,
        method: &'static str,
        attribute: &'static str,
    },

    #[error("invalid tag {0:?}, expected format gggg,eeee")]
    InvalidTag(String),

    #[error("invalid maximum {value:?} for tag {tag}, expected a non-negative integer")]
    InvalidMaximum { tag: Tag, value: String },

    #[error("more than one rule for tag {0}")]
    DuplicateRule(Tag),

    #[error(
        "conflicting lookup table sources {} and {}",
        .first.display(),
        .second.display()
    )]
    ConflictingLookupSource { first: PathBuf, second: PathBuf },
}

/// The allow-list of rules applied during de-identification.
///
/// Every tag that should appear in the output needs an [`Action`]; tags without one are
/// dropped. The catalog also remembers the lookup table file referenced by its `lookup`
/// rules, if any.
#[derive(Serialize, Debug, Clone, Default, PartialEq)]
pub struct RuleCatalog {
    #[serde(skip_serializing_if = "Option::is_none")]
    lookup_source: Option<PathBuf>,
    tag_actions: TagActionMap,
}

impl RuleCatalog {
    /// Loads a rule catalog from an XML rule script.
    ///
    /// Relative lookup table paths in the script are resolved against the script's directory.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let xml = fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let catalog = Self::from_xml_str(&xml, path.parent())?;
        debug!("loaded {} rules from {}", catalog.len(), path.display());
        Ok(catalog)
    }

    /// Builds a rule catalog from the text of an XML rule script.
    ///
    /// Fails on the first invalid declaration; no partial catalog is returned. The first
    /// `lookup` rule determines the lookup table source, and a `lookup` rule that names a
    /// different source is an error.
    ///
    /// # Example
    ///
    /// ```
    /// use dicom_deidentification::actions::Action;
    /// use dicom_deidentification::config::RuleCatalog;
    /// use dicom_deidentification::tags;
    ///
    /// let catalog = RuleCatalog::from_xml_str(
    ///     r#"<script>
    ///         <e t="0010,0010" f="lookup" p="lookup.ini"/>
    ///         <e t="0010,1010" f="less_than" v="90"/>
    ///         <e t="0008,0060" f="keep"/>
    ///     </script>"#,
    ///     None,
    /// )
    /// .unwrap();
    ///
    /// assert_eq!(catalog.get_action(&tags::PATIENT_AGE), Some(&Action::ClampNumeric(90)));
    /// assert_eq!(catalog.get_action(&tags::PATIENT_ID), None);
    /// ```
    pub fn from_xml_str(xml: &str, base_dir: Option<&Path>) -> Result<Self, LoadError> {
        let declarations = script::parse_declarations(xml)?;

        let mut catalog = RuleCatalog::default();
        for (index, declaration) in declarations.into_iter().enumerate() {
            let rule = declaration.into_rule(index, base_dir)?;

            if let Some(source) = rule.lookup_source {
                match &catalog.lookup_source {
                    None => catalog.lookup_source = Some(source),
                    Some(first) if first != &source => {
                        return Err(LoadError::ConflictingLookupSource {
                            first: first.clone(),
                            second: source,
                        });
                    }
                    Some(_) => {}
                }
            }

            if catalog.tag_actions.insert(rule.tag, rule.action).is_some() {
                return Err(LoadError::DuplicateRule(rule.tag));
            }
        }

        Ok(catalog)
    }

    /// Returns the [`Action`] for `tag`, or `None` if the tag is not allowed in the output.
    pub fn get_action(&self, tag: &Tag) -> Option<&Action> {
        self.tag_actions.get(tag)
    }

    /// Iterates over all rules, ordered by tag.
    pub fn iter(&self) -> impl Iterator<Item = (&Tag, &Action)> {
        self.tag_actions.iter()
    }

    /// The lookup table file referenced by the catalog's `lookup` rules.
    pub fn lookup_source(&self) -> Option<&Path> {
        self.lookup_source.as_deref()
    }

    pub fn len(&self) -> usize {
        self.tag_actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tag_actions.is_empty()
    }
}

/// A builder for [`RuleCatalog`], for constructing rules in code instead of from a script.
///
/// # Example
///
/// ```
/// use dicom_deidentification::actions::Action;
/// use dicom_deidentification::config::RuleCatalogBuilder;
/// use dicom_deidentification::tags;
///
/// let catalog = RuleCatalogBuilder::new()
///     .rule(tags::PATIENT_NAME, Action::Lookup)
///     .rule(tags::PATIENT_AGE, Action::ClampNumeric(90))
///     .rule(tags::INSTITUTION_NAME, Action::empty())
///     .rule(tags::MODALITY, Action::Keep)
///     .build();
///
/// assert_eq!(catalog.len(), 4);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleCatalogBuilder(RuleCatalog);

impl RuleCatalogBuilder {
    pub fn new() -> Self {
        RuleCatalogBuilder(RuleCatalog::default())
    }

    /// Sets the action for `tag`, replacing any earlier action for the same tag.
    pub fn rule(mut self, tag: Tag, action: Action) -> Self {
        self.0.tag_actions.insert(tag, action);
        self
    }

    pub fn lookup_source<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.0.lookup_source = Some(path.into());
        self
    }

    pub fn build(self) -> RuleCatalog {
        self.0
    }
}
