//! Reading rule declarations from an XML rule script.
//!
//! Every child element of the root element declares one rule through its attributes:
//!
//! | attribute | meaning                                                         |
//! |-----------|-----------------------------------------------------------------|
//! | `t`       | tag, `gggg,eeee`                                                |
//! | `f`       | method: `keep`, `const`, `empty`, `lookup` or `less_than`       |
//! | `v`       | replacement value (`const`) or maximum (`less_than`)            |
//! | `p`       | lookup table file (`lookup`)                                    |
//!
//! Element names and any other attributes are ignored.

use dicom_core::Tag;
use garde::Validate;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::actions::Action;
use crate::config::LoadError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Method {
    Keep,
    Const,
    Empty,
    Lookup,
    LessThan,
}

impl Method {
    fn name(&self) -> &'static str {
        match self {
            Method::Keep => "keep",
            Method::Const => "const",
            Method::Empty => "empty",
            Method::Lookup => "lookup",
            Method::LessThan => "less_than",
        }
    }
}

impl FromStr for Method {
    type Err = LoadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "keep" => Ok(Method::Keep),
            "const" => Ok(Method::Const),
            "empty" => Ok(Method::Empty),
            "lookup" => Ok(Method::Lookup),
            "less_than" => Ok(Method::LessThan),
            other => Err(LoadError::UnknownMethod(other.to_string())),
        }
    }
}

/// One rule as written in the script, before interpretation.
#[derive(Debug, Clone, Default, PartialEq, Validate)]
pub(crate) struct RuleDeclaration {
    #[garde(required, pattern(r"^[0-9A-Fa-f]{4},[0-9A-Fa-f]{4}$"))]
    pub tag: Option<String>,
    #[garde(required)]
    pub method: Option<String>,
    #[garde(skip)]
    pub value: Option<String>,
    #[garde(skip)]
    pub source: Option<String>,
}

/// A declaration interpreted against the rule file's location.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Rule {
    pub tag: Tag,
    pub action: Action,
    pub lookup_source: Option<PathBuf>,
}

fn parse_tag(s: &str) -> Result<Tag, LoadError> {
    let invalid = || LoadError::InvalidTag(s.to_string());
    let (group, element) = s.split_once(',').ok_or_else(invalid)?;
    let group = u16::from_str_radix(group, 16).map_err(|_| invalid())?;
    let element = u16::from_str_radix(element, 16).map_err(|_| invalid())?;
    Ok(Tag(group, element))
}

impl RuleDeclaration {
    /// Validates the declaration and turns it into a [`Rule`].
    ///
    /// Relative lookup table paths are resolved against `base_dir`.
    pub(crate) fn into_rule(self, index: usize, base_dir: Option<&Path>) -> Result<Rule, LoadError> {
        self.validate().map_err(|report| LoadError::Validation {
            index,
            message: report.to_string(),
        })?;

        // both are present after validation
        let tag_str = self.tag.unwrap_or_default();
        let method_str = self.method.unwrap_or_default();

        let tag = parse_tag(&tag_str)?;
        let method: Method = method_str.parse()?;
        let missing = |attribute| LoadError::MissingAttribute {
            tag,
            method: method.name(),
            attribute,
        };

        let mut lookup_source = None;
        let action = match method {
            Method::Keep => Action::Keep,
            Method::Empty => Action::empty(),
            Method::Const => Action::Constant(self.value.ok_or_else(|| missing("v"))?),
            Method::Lookup => {
                let source = PathBuf::from(self.source.ok_or_else(|| missing("p"))?);
                lookup_source = Some(match base_dir {
                    Some(base_dir) if source.is_relative() => base_dir.join(source),
                    _ => source,
                });
                Action::Lookup
            }
            Method::LessThan => {
                let value = self.value.ok_or_else(|| missing("v"))?;
                let max = value
                    .trim()
                    .parse::<u32>()
                    .map_err(|_| LoadError::InvalidMaximum { tag, value })?;
                Action::ClampNumeric(max)
            }
        };

        Ok(Rule {
            tag,
            action,
            lookup_source,
        })
    }
}

fn xml_error(err: impl std::fmt::Display) -> LoadError {
    LoadError::Xml(format!("{err}"))
}

fn declaration_from(element: &BytesStart<'_>) -> Result<RuleDeclaration, LoadError> {
    let mut declaration = RuleDeclaration::default();

    for attribute in element.attributes() {
        let attribute = attribute.map_err(xml_error)?;
        let value = attribute.unescape_value().map_err(xml_error)?.into_owned();
        match attribute.key.as_ref() {
            b"t" => declaration.tag = Some(value),
            b"f" => declaration.method = Some(value),
            b"v" => declaration.value = Some(value),
            b"p" => declaration.source = Some(value),
            _ => {}
        }
    }

    Ok(declaration)
}

/// Reads the rule declarations of an XML rule script, in document order.
pub(crate) fn parse_declarations(xml: &str) -> Result<Vec<RuleDeclaration>, LoadError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut declarations = Vec::new();
    let mut depth = 0_usize;
    let mut has_root = false;

    loop {
        match reader.read_event().map_err(xml_error)? {
            Event::Start(element) => {
                if depth == 1 {
                    declarations.push(declaration_from(&element)?);
                }
                has_root = true;
                depth += 1;
            }
            Event::Empty(element) => {
                if depth == 1 {
                    declarations.push(declaration_from(&element)?);
                }
                has_root = true;
            }
            Event::End(_) => depth = depth.saturating_sub(1),
            Event::Eof => break,
            _ => {}
        }
    }

    if !has_root {
        return Err(LoadError::Xml("no root element".into()));
    }
    Ok(declarations)
}
