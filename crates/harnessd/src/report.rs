//! Engine score reports.
//!
//! The Flash engines have written several report shapes over the years. Each
//! logical field is looked up through an ordered list of attribute names on
//! the `<Score>` element inside `<SCORE_SUMMARY>`: current name first, then
//! the legacy names, then a literal default. Empty attribute values count
//! as absent. The end state comes from the `STATE` attribute of
//! `<END_STATE>`.

use crate::xml::{self, XmlError};
use harness_common::NO_MEDAL;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::collections::HashMap;

/// Ordered attribute names for one logical report field
#[derive(Debug, Clone, Copy)]
pub struct FieldCandidates {
    pub field: &'static str,
    pub names: &'static [&'static str],
    pub default: &'static str,
}

pub const ELAPSED_TIME: FieldCandidates = FieldCandidates {
    field: "elapsed time",
    names: &["ElapsedTime", "TOTAL_ELAPSED_TIME"],
    default: "0",
};

pub const TOTAL_SCORE: FieldCandidates = FieldCandidates {
    field: "score",
    names: &["TotalScore", "TOTAL_SCORE"],
    default: "0",
};

pub const MEDAL: FieldCandidates = FieldCandidates {
    field: "medal",
    names: &["Medal", "MEDAL_EARNED"],
    default: NO_MEDAL,
};

const SUMMARY_ELEMENT: &str = "SCORE_SUMMARY";
const SCORE_ELEMENT: &str = "Score";
const END_STATE_ELEMENT: &str = "END_STATE";
const END_STATE_ATTRIBUTE: &str = "STATE";

/// Attributes pulled out of a score report
#[derive(Debug, Clone, Default)]
pub struct ScoreReport {
    score: HashMap<String, String>,
    end_state: HashMap<String, String>,
}

impl ScoreReport {
    pub fn parse(text: &str) -> Result<Self, XmlError> {
        let mut reader = Reader::from_str(text);
        reader.trim_text(true);

        let mut open: Vec<String> = Vec::new();
        let mut seen_summary = false;
        let mut score = None;
        let mut end_state = None;

        loop {
            let (e, is_empty) = match reader.read_event()? {
                Event::Start(e) => (e, false),
                Event::Empty(e) => (e, true),
                Event::End(_) => {
                    open.pop();
                    continue;
                }
                Event::Eof => break,
                _ => continue,
            };

            let name = xml::element_name(&e);
            let in_summary = open.iter().any(|n| n == SUMMARY_ELEMENT);
            match name.as_str() {
                SUMMARY_ELEMENT => seen_summary = true,
                SCORE_ELEMENT if in_summary && score.is_none() => {
                    score = Some(xml::attributes(&e)?);
                }
                END_STATE_ELEMENT if end_state.is_none() => {
                    end_state = Some(xml::attributes(&e)?);
                }
                _ => {}
            }

            if !is_empty {
                open.push(name);
            }
        }

        if !seen_summary {
            return Err(XmlError::MissingElement(SUMMARY_ELEMENT));
        }

        Ok(Self {
            score: score.unwrap_or_default(),
            end_state: end_state.unwrap_or_default(),
        })
    }

    /// First non-empty candidate attribute, or the field's default
    pub fn field(&self, candidates: &FieldCandidates) -> &str {
        candidates
            .names
            .iter()
            .filter_map(|name| self.score.get(*name))
            .map(|value| value.trim())
            .find(|value| !value.is_empty())
            .unwrap_or(candidates.default)
    }

    pub fn elapsed_millis(&self) -> Result<u64, XmlError> {
        let value = number(&ELAPSED_TIME, self.field(&ELAPSED_TIME))?;
        if value < 0.0 {
            return Err(XmlError::Negative {
                field: ELAPSED_TIME.field,
                value: self.field(&ELAPSED_TIME).to_string(),
            });
        }
        Ok(value.round() as u64)
    }

    pub fn score(&self) -> Result<i64, XmlError> {
        Ok(number(&TOTAL_SCORE, self.field(&TOTAL_SCORE))?.round() as i64)
    }

    pub fn medal(&self) -> &str {
        self.field(&MEDAL)
    }

    pub fn end_state(&self) -> Option<&str> {
        self.end_state
            .get(END_STATE_ATTRIBUTE)
            .map(String::as_str)
            .filter(|s| !s.is_empty())
    }
}

fn number(candidates: &FieldCandidates, raw: &str) -> Result<f64, XmlError> {
    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(XmlError::NotANumber {
            field: candidates.field,
            value: raw.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(score_attrs: &str) -> String {
        format!(
            r#"<OUTPUT><SCORE_SUMMARY><Score {}/></SCORE_SUMMARY><END_STATE STATE="FINISHED"/></OUTPUT>"#,
            score_attrs
        )
    }

    #[test]
    fn test_primary_names() {
        let r = ScoreReport::parse(&report(r#"ElapsedTime="61000" TotalScore="1200" Medal="gold""#)).unwrap();
        assert_eq!(r.elapsed_millis().unwrap(), 61_000);
        assert_eq!(r.score().unwrap(), 1200);
        assert_eq!(r.medal(), "gold");
        assert_eq!(r.end_state(), Some("FINISHED"));
    }

    #[test]
    fn test_legacy_names() {
        let r = ScoreReport::parse(&report(
            r#"TOTAL_ELAPSED_TIME="5000" TOTAL_SCORE="300" MEDAL_EARNED="bronze""#,
        ))
        .unwrap();
        assert_eq!(r.elapsed_millis().unwrap(), 5000);
        assert_eq!(r.score().unwrap(), 300);
        assert_eq!(r.medal(), "bronze");
    }

    #[test]
    fn test_primary_wins_over_legacy() {
        let r = ScoreReport::parse(&report(
            r#"TOTAL_SCORE="1" TotalScore="2" MEDAL_EARNED="bronze" Medal="silver" TOTAL_ELAPSED_TIME="3" ElapsedTime="4""#,
        ))
        .unwrap();
        assert_eq!(r.score().unwrap(), 2);
        assert_eq!(r.medal(), "silver");
        assert_eq!(r.elapsed_millis().unwrap(), 4);
    }

    #[test]
    fn test_defaults_when_absent() {
        let r = ScoreReport::parse(&report("")).unwrap();
        assert_eq!(r.elapsed_millis().unwrap(), 0);
        assert_eq!(r.score().unwrap(), 0);
        assert_eq!(r.medal(), "none");
    }

    #[test]
    fn test_empty_value_falls_through() {
        let r = ScoreReport::parse(&report(r#"TotalScore="" TOTAL_SCORE="77""#)).unwrap();
        assert_eq!(r.score().unwrap(), 77);
    }

    #[test]
    fn test_missing_score_element_uses_defaults() {
        let r = ScoreReport::parse("<OUTPUT><SCORE_SUMMARY/></OUTPUT>").unwrap();
        assert_eq!(r.score().unwrap(), 0);
        assert_eq!(r.end_state(), None);
    }

    #[test]
    fn test_missing_summary_rejected() {
        let err = ScoreReport::parse("<OUTPUT><Score TotalScore='5'/></OUTPUT>").unwrap_err();
        assert!(matches!(err, XmlError::MissingElement("SCORE_SUMMARY")));
    }

    #[test]
    fn test_non_numeric_score_rejected() {
        let r = ScoreReport::parse(&report(r#"TotalScore="lots""#)).unwrap();
        assert!(r.score().is_err());
    }

    #[test]
    fn test_negative_elapsed_rejected() {
        let r = ScoreReport::parse(&report(r#"ElapsedTime="-5""#)).unwrap();
        let err = r.elapsed_millis().unwrap_err();
        assert!(matches!(err, XmlError::Negative { field: "elapsed time", .. }));
        assert_eq!(err.to_string(), "'elapsed time' cannot be negative: -5");
    }

    #[test]
    fn test_score_outside_summary_ignored() {
        let text = r#"<OUTPUT><Score TotalScore="9"/><SCORE_SUMMARY><Score TotalScore="4"/></SCORE_SUMMARY></OUTPUT>"#;
        assert_eq!(ScoreReport::parse(text).unwrap().score().unwrap(), 4);
    }
}
