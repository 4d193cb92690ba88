//! The resumption marker embedded in every published report.
//!
//! Grammar: `<label>:` followed by optional whitespace and a non-negative
//! integer or decimal number of epoch seconds. A body may quote older
//! reports, so the last occurrence wins.

use regex::Regex;
use stats_core::{CoreError, Item};

#[derive(Debug, Clone)]
pub struct MarkerFormat {
    label: String,
    pattern: Regex,
}

impl MarkerFormat {
    pub fn new(label: &str) -> Result<Self, CoreError> {
        let pattern = Regex::new(&format!(r"{}:\s*(\d+(?:\.\d+)?)", regex::escape(label)))
            .map_err(|e| CoreError::InvalidInput {
                message: format!("unusable marker label {:?}: {}", label, e),
            })?;
        Ok(Self {
            label: label.to_string(),
            pattern,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Whole seconds are written without a fraction.
    pub fn render(&self, timestamp: f64) -> String {
        if timestamp.fract() == 0.0 {
            format!("{}: {}", self.label, timestamp as i64)
        } else {
            format!("{}: {}", self.label, timestamp)
        }
    }

    pub fn extract(&self, text: &str) -> Option<f64> {
        self.pattern
            .captures_iter(text)
            .last()
            .and_then(|captures| captures.get(1))
            .and_then(|value| value.as_str().parse::<f64>().ok())
    }

    /// Marker of a previously published report. A report without one is
    /// fatal: without it there is no safe lower bound for the window.
    pub fn recover(&self, report: &Item) -> Result<f64, CoreError> {
        report
            .selftext
            .as_deref()
            .and_then(|body| self.extract(body))
            .ok_or_else(|| CoreError::MarkerNotFound {
                reference: report.permalink.clone(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stats_core::AuthorIdentity;

    fn report_with(body: Option<&str>) -> Item {
        Item {
            id: "prev".to_string(),
            author: AuthorIdentity::Known("stats_bot".to_string()),
            created: 0.0,
            title: "Subreddit Stats: test".to_string(),
            url: "https://www.reddit.com/r/test/comments/prev/".to_string(),
            permalink: "https://www.reddit.com/r/test/comments/prev/".to_string(),
            score: 1,
            ups: 1,
            downs: 0,
            num_comments: 0,
            selftext: body.map(str::to_string),
            subreddit: "test".to_string(),
        }
    }

    #[test]
    fn test_extracts_labelled_integer() {
        let format = MarkerFormat::new("Last message at").unwrap();
        let text = "lots of report text\n...Last message at: 1700000000";
        assert_eq!(format.extract(text), Some(1700000000.0));
    }

    #[test]
    fn test_last_match_wins() {
        let format = MarkerFormat::new("SRS Marker").unwrap();
        let text = "quoted: SRS Marker: 100\n\nSRS Marker: 250";
        assert_eq!(format.extract(text), Some(250.0));
    }

    #[test]
    fn test_decimal_marker() {
        let format = MarkerFormat::new("SRS Marker").unwrap();
        assert_eq!(format.extract("SRS Marker:1699999999.5"), Some(1699999999.5));
    }

    #[test]
    fn test_label_is_matched_literally() {
        let format = MarkerFormat::new("Marker (v1)").unwrap();
        assert_eq!(format.extract("Marker (v1): 42"), Some(42.0));
        assert_eq!(format.extract("Marker v1: 42"), None);
    }

    #[test]
    fn test_render_then_extract() {
        let format = MarkerFormat::new("SRS Marker").unwrap();
        assert_eq!(format.render(1700000000.0), "SRS Marker: 1700000000");
        assert_eq!(format.extract(&format.render(1700000000.0)), Some(1700000000.0));
        assert_eq!(format.render(12.25), "SRS Marker: 12.25");
    }

    #[test]
    fn test_recover_requires_marker() {
        let format = MarkerFormat::new("SRS Marker").unwrap();
        let found = format.recover(&report_with(Some("body\nSRS Marker: 1234")));
        assert_eq!(found.unwrap(), 1234.0);

        let missing = format.recover(&report_with(Some("no marker here")));
        assert!(matches!(missing, Err(CoreError::MarkerNotFound { .. })));

        let link_post = format.recover(&report_with(None));
        assert!(matches!(link_post, Err(CoreError::MarkerNotFound { .. })));
    }
}
