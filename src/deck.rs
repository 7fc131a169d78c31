//! Slide content exchanged with the language model.
//!
//! The model answers with a JSON array of slides. Slide numbers drive
//! revisions: an existing number replaces that slide, a fractional number
//! (`2.1`) inserts after slide 2 and a negative number (`-3`) deletes slide 3.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DeckError {
    /// The response was JSON, but neither a slide object nor a list of them
    #[error("Expected a list of slides, got a {0}")]
    NotAList(&'static str),

    #[error("Invalid slide JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Response contained no slides")]
    Empty,
}

pub type Result<T> = std::result::Result<T, DeckError>;

/// Text of one slide.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlideContent {
    #[serde(deserialize_with = "number_or_string")]
    pub slide_number: f64,
    #[serde(default, deserialize_with = "text_or_lines")]
    pub title: String,
    /// Body text, one paragraph per line
    #[serde(default, deserialize_with = "text_or_lines")]
    pub content: String,
    /// Speaker notes
    #[serde(default, deserialize_with = "text_or_lines")]
    pub narration: String,
    /// Requested layout name; the build default applies when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<String>,
}

impl SlideContent {
    pub fn new(slide_number: f64, title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            slide_number,
            title: title.into(),
            content: content.into(),
            narration: String::new(),
            layout: None,
        }
    }

    pub fn with_narration(self, narration: impl Into<String>) -> Self {
        Self {
            narration: narration.into(),
            ..self
        }
    }

    pub fn with_layout(self, layout: impl Into<String>) -> Self {
        Self {
            layout: Some(layout.into()),
            ..self
        }
    }

    /// Same slide under another number.
    pub fn renumbered(&self, slide_number: f64) -> Self {
        Self {
            slide_number,
            ..self.clone()
        }
    }

    pub fn is_blank(&self) -> bool {
        self.title.trim().is_empty() && self.content.trim().is_empty()
    }
}

/// Largest key magnitude; keeps the negated key of a deletion in range.
const MAX_NUMBER_KEY: f64 = 1e15;

/// Slide numbers compared at one decimal place.
fn number_key(slide_number: f64) -> i64 {
    (slide_number * 10.0).round().clamp(-MAX_NUMBER_KEY, MAX_NUMBER_KEY) as i64
}

fn number_or_string<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<f64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Number {
        Float(f64),
        Text(String),
    }

    let number = match Number::deserialize(deserializer)? {
        Number::Float(n) => n,
        Number::Text(s) => s
            .trim()
            .parse()
            .map_err(|_| de::Error::custom(format!("invalid slide number: {:?}", s)))?,
    };
    if number.is_finite() {
        Ok(number)
    } else {
        Err(de::Error::custom(format!("slide number is not finite: {}", number)))
    }
}

fn text_or_lines<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Text {
        One(String),
        Lines(Vec<String>),
    }

    Ok(match Option::<Text>::deserialize(deserializer)? {
        Some(Text::One(s)) => s,
        Some(Text::Lines(lines)) => lines.join("\n"),
        None => String::new(),
    })
}

/// Normalize a parsed response to a list: an object becomes a one-element
/// list holding it, a list is returned unchanged.
pub fn ensure_list(value: Value) -> Result<Vec<Value>> {
    match value {
        Value::Array(items) => Ok(items),
        Value::Object(_) => Ok(vec![value]),
        Value::Null => Err(DeckError::NotAList("null")),
        Value::Bool(_) => Err(DeckError::NotAList("boolean")),
        Value::Number(_) => Err(DeckError::NotAList("number")),
        Value::String(_) => Err(DeckError::NotAList("string")),
    }
}

/// Drop a markdown code fence around a model response.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Skip the info string (```json)
    let body = rest.split_once('\n').map_or("", |(_, body)| body);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Parse a model response into slides.
pub fn parse_slides(text: &str) -> Result<Vec<SlideContent>> {
    let value: Value = serde_json::from_str(strip_code_fence(text))?;
    ensure_list(value)?
        .into_iter()
        .map(|item| serde_json::from_value(item).map_err(DeckError::from))
        .collect()
}

/// An ordered set of slides.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SlideDeck {
    slides: Vec<SlideContent>,
}

impl SlideDeck {
    pub fn new(slides: Vec<SlideContent>) -> Self {
        Self { slides }
    }

    #[inline]
    pub fn slides(&self) -> &[SlideContent] {
        &self.slides
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.slides.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slides.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SlideContent> {
        self.slides.iter()
    }

    /// Apply a revision from the model and return the new deck.
    ///
    /// Revision slides replace slides with the same number and a revision
    /// slide numbered `-n` deletes slide `n`. The result is ordered by slide
    /// number, without negative leftovers, and renumbered from 1.
    pub fn merge(&self, revision: &[SlideContent]) -> SlideDeck {
        let revised: HashSet<i64> = revision.iter().map(|s| number_key(s.slide_number)).collect();
        let kept: Vec<&SlideContent> = self
            .slides
            .iter()
            .filter(|s| !revised.contains(&number_key(s.slide_number)))
            .collect();
        let kept_keys: HashSet<i64> = kept.iter().map(|s| number_key(s.slide_number)).collect();

        let mut merged: Vec<&SlideContent> = kept
            .into_iter()
            .filter(|s| !revised.contains(&-number_key(s.slide_number)))
            .chain(
                revision
                    .iter()
                    .filter(|s| !kept_keys.contains(&-number_key(s.slide_number))),
            )
            .filter(|s| number_key(s.slide_number) >= 0)
            .collect();
        merged.sort_by_key(|s| number_key(s.slide_number));

        let slides = merged
            .into_iter()
            .enumerate()
            .map(|(i, slide)| slide.renumbered((i + 1) as f64))
            .collect();
        SlideDeck { slides }
    }
}

impl From<Vec<SlideContent>> for SlideDeck {
    fn from(slides: Vec<SlideContent>) -> Self {
        Self::new(slides)
    }
}

impl<'a> IntoIterator for &'a SlideDeck {
    type Item = &'a SlideContent;
    type IntoIter = std::slice::Iter<'a, SlideContent>;

    fn into_iter(self) -> Self::IntoIter {
        self.slides.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn deck(titles: &[&str]) -> SlideDeck {
        titles
            .iter()
            .enumerate()
            .map(|(i, t)| SlideContent::new((i + 1) as f64, *t, ""))
            .collect::<Vec<_>>()
            .into()
    }

    fn titles(deck: &SlideDeck) -> Vec<&str> {
        deck.iter().map(|s| s.title.as_str()).collect()
    }

    #[test]
    fn test_ensure_list_object() {
        let value = json!({"slide_number": 1, "title": "Intro"});
        assert_eq!(ensure_list(value.clone()).unwrap(), vec![value]);
    }

    #[test]
    fn test_ensure_list_list() {
        let value = json!([{"slide_number": 1}, {"slide_number": 2}]);
        assert_eq!(ensure_list(value).unwrap().len(), 2);
    }

    #[test]
    fn test_ensure_list_rejects_scalars() {
        assert!(matches!(ensure_list(json!("text")), Err(DeckError::NotAList("string"))));
        assert!(matches!(ensure_list(json!(3)), Err(DeckError::NotAList("number"))));
        assert!(matches!(ensure_list(Value::Null), Err(DeckError::NotAList("null"))));
    }

    #[test]
    fn test_parse_fenced_response() {
        let text = "```json\n[{\"slide_number\": \"2.1\", \"title\": \"Costs\", \"content\": [\"- rent\", \"- staff\"]}]\n```";
        let slides = parse_slides(text).unwrap();
        assert_eq!(slides.len(), 1);
        assert_eq!(slides[0].slide_number, 2.1);
        assert_eq!(slides[0].content, "- rent\n- staff");
        assert_eq!(slides[0].narration, "");
        assert_eq!(slides[0].layout, None);
    }

    #[test]
    fn test_parse_single_object_and_nulls() {
        let slides = parse_slides(r#"{"slide_number": 1, "title": "Only", "content": null, "layout": "Two Content"}"#).unwrap();
        assert_eq!(slides[0].title, "Only");
        assert_eq!(slides[0].content, "");
        assert_eq!(slides[0].layout.as_deref(), Some("Two Content"));
    }

    #[test]
    fn test_parse_invalid() {
        assert!(matches!(parse_slides("Sure! Here are your slides"), Err(DeckError::Json(_))));
        assert!(matches!(parse_slides(r#""just text""#), Err(DeckError::NotAList(_))));
        assert!(matches!(
            parse_slides(r#"[{"slide_number": "two", "title": "x"}]"#),
            Err(DeckError::Json(_))
        ));
    }

    #[test]
    fn test_parse_rejects_non_finite_numbers() {
        for number in [r#""-inf""#, r#""inf""#, r#""NaN""#] {
            let text = format!(r#"[{{"slide_number": {}, "title": "x"}}]"#, number);
            assert!(matches!(parse_slides(&text), Err(DeckError::Json(_))), "{} accepted", number);
        }
    }

    #[test]
    fn test_merge_with_huge_numbers() {
        let revision = parse_slides(
            r#"[{"slide_number": -1e300, "title": "gone"}, {"slide_number": 1e300, "title": "Last"}]"#,
        )
        .unwrap();
        let merged = deck(&["A", "B"]).merge(&revision);
        assert_eq!(titles(&merged), vec!["A", "B", "Last"]);
        assert_eq!(merged.slides()[2].slide_number, 3.0);
    }

    #[test]
    fn test_merge_replaces_same_number() {
        let merged = deck(&["A", "B", "C"]).merge(&[SlideContent::new(2.0, "B2", "new body")]);
        assert_eq!(titles(&merged), vec!["A", "B2", "C"]);
        assert_eq!(merged.slides()[1].content, "new body");
    }

    #[test]
    fn test_merge_inserts_fractional() {
        let merged = deck(&["A", "B", "C"]).merge(&[
            SlideContent::new(2.1, "B.1", ""),
            SlideContent::new(2.2, "B.2", ""),
        ]);
        assert_eq!(titles(&merged), vec!["A", "B", "B.1", "B.2", "C"]);
        let numbers: Vec<f64> = merged.iter().map(|s| s.slide_number).collect();
        assert_eq!(numbers, vec![1.0, 2.0, 3.0, 4.0, 5.0]);
    }

    #[test]
    fn test_merge_deletes_negative() {
        let merged = deck(&["A", "B", "C"]).merge(&[SlideContent::new(-2.0, "B", "")]);
        assert_eq!(titles(&merged), vec!["A", "C"]);
        assert_eq!(merged.slides()[1].slide_number, 2.0);
    }

    #[test]
    fn test_merge_drops_unmatched_negative() {
        let merged = deck(&["A"]).merge(&[SlideContent::new(-7.0, "ghost", "")]);
        assert_eq!(titles(&merged), vec!["A"]);
    }

    #[test]
    fn test_merge_leaves_original_untouched() {
        let original = deck(&["A", "B"]);
        let _ = original.merge(&[SlideContent::new(1.0, "X", "")]);
        assert_eq!(titles(&original), vec!["A", "B"]);
    }

    #[test]
    fn test_deck_serializes_as_list() {
        let json = serde_json::to_value(deck(&["A"])).unwrap();
        assert_eq!(json, json!([{"slide_number": 1.0, "title": "A", "content": "", "narration": ""}]));
    }
}
