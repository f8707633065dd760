use crate::actions::Action;
use dicom_core::{DataDictionary, Tag};
use dicom_dictionary_std::StandardDataDictionary;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

/// Ordered mapping from tag to [`Action`].
///
/// Serializes as a map keyed by `(gggg,eeee)`, with the standard data dictionary alias of
/// each tag added as a `comment`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TagActionMap(BTreeMap<Tag, Action>);

impl TagActionMap {
    pub fn new() -> Self {
        TagActionMap(BTreeMap::new())
    }

    pub fn insert(&mut self, tag: Tag, action: Action) -> Option<Action> {
        self.0.insert(tag, action)
    }

    pub fn get(&self, tag: &Tag) -> Option<&Action> {
        self.0.get(tag)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Tag, &Action)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Serialize)]
struct TagActionWithComment<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    comment: Option<&'a str>,
    #[serde(flatten)]
    action: &'a Action,
}

fn get_tag_alias(tag: &Tag) -> Option<&'static str> {
    StandardDataDictionary.by_tag(*tag).map(|entry| entry.alias)
}

impl Serialize for TagActionMap {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;

        for (tag, action) in &self.0 {
            let action_with_comment = TagActionWithComment {
                comment: get_tag_alias(tag),
                action,
            };
            map.serialize_entry(&format!("{}", tag), &action_with_comment)?;
        }

        map.end()
    }
}
