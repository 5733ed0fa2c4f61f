//! Small helpers over quick-xml shared by the dataset and report parsers.

use quick_xml::events::attributes::AttrError;
use quick_xml::events::BytesStart;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum XmlError {
    #[error("malformed XML: {0}")]
    Syntax(#[from] quick_xml::Error),

    #[error("malformed attribute: {0}")]
    Attribute(#[from] AttrError),

    #[error("<{element}> is missing the '{attribute}' attribute")]
    MissingAttribute {
        element: String,
        attribute: &'static str,
    },

    #[error("missing <{0}> element")]
    MissingElement(&'static str),

    #[error("'{field}' is not a number: {value:?}")]
    NotANumber { field: &'static str, value: String },

    #[error("'{field}' cannot be negative: {value}")]
    Negative { field: &'static str, value: String },
}

/// Local name of an element as a string
pub fn element_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

/// Unescaped value of one attribute, if present
pub fn attribute(e: &BytesStart<'_>, name: &str) -> Result<Option<String>, XmlError> {
    match e.try_get_attribute(name)? {
        Some(attr) => Ok(Some(attr.unescape_value()?.into_owned())),
        None => Ok(None),
    }
}

/// Required attribute; absence is an error naming the element
pub fn required_attribute(e: &BytesStart<'_>, name: &'static str) -> Result<String, XmlError> {
    attribute(e, name)?.ok_or_else(|| XmlError::MissingAttribute {
        element: element_name(e),
        attribute: name,
    })
}

/// All attributes of an element, unescaped
pub fn attributes(e: &BytesStart<'_>) -> Result<HashMap<String, String>, XmlError> {
    let mut map = HashMap::new();
    for attr in e.attributes() {
        let attr = attr?;
        let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
        map.insert(key, attr.unescape_value()?.into_owned());
    }
    Ok(map)
}
