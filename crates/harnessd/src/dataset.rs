//! Task dataset files.
//!
//! A dataset lists the question-set data files of one task:
//!
//! ```xml
//! <dataset>
//!   <datafile name="set1.xml" id="1"/>
//!   <datafile name="set2.xml" id="2"/>
//! </dataset>
//! ```

use crate::xml::{self, XmlError};
use quick_xml::events::Event;
use quick_xml::Reader;

/// Fixed file name of a task's dataset inside its task directory
pub const DATASET_FILE_NAME: &str = "dataset.xml";

const RECORD_ELEMENT: &[u8] = b"datafile";

/// One `<datafile>` entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetRecord {
    /// Data file name, relative to the task directory
    pub name: String,
    /// Question-set ID
    pub id: String,
}

/// Parse every `<datafile>` record, in document order
pub fn parse_dataset(text: &str) -> Result<Vec<DatasetRecord>, XmlError> {
    let mut reader = Reader::from_str(text);
    reader.trim_text(true);

    let mut records = Vec::new();
    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == RECORD_ELEMENT => {
                records.push(DatasetRecord {
                    name: xml::required_attribute(&e, "name")?,
                    id: xml::required_attribute(&e, "id")?,
                });
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_records_in_order() {
        let text = r#"<?xml version="1.0"?>
            <dataset>
              <datafile name="b.xml" id="2"/>
              <datafile name="a.xml" id="1"></datafile>
            </dataset>"#;
        let records = parse_dataset(text).unwrap();
        assert_eq!(
            records,
            vec![
                DatasetRecord { name: "b.xml".to_string(), id: "2".to_string() },
                DatasetRecord { name: "a.xml".to_string(), id: "1".to_string() },
            ]
        );
    }

    #[test]
    fn test_empty_dataset() {
        assert!(parse_dataset("<dataset/>").unwrap().is_empty());
    }

    #[test]
    fn test_missing_id_rejected() {
        let err = parse_dataset(r#"<dataset><datafile name="a.xml"/></dataset>"#).unwrap_err();
        assert!(matches!(err, XmlError::MissingAttribute { attribute: "id", .. }));
    }

    #[test]
    fn test_mismatched_tags_rejected() {
        assert!(parse_dataset("<dataset><datafile name='a' id='1'></dataset>").is_err());
    }

    #[test]
    fn test_escaped_attribute() {
        let records = parse_dataset(r#"<dataset><datafile name="a&amp;b.xml" id="1"/></dataset>"#).unwrap();
        assert_eq!(records[0].name, "a&b.xml");
    }
}
