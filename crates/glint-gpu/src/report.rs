//! Structured diagnostics for capability queries.
//!
//! Each query or creation step returns a list of named findings; rendering
//! them to text is the caller's job. Nothing in here feeds back into
//! selection logic.

/// One named finding within a stage report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    /// Short name of the item (layer name, extension name, queue flag).
    pub label: String,
    /// Optional free-form detail.
    pub detail: Option<String>,
}

/// Findings produced by one construction stage.
#[derive(Debug, Clone)]
pub struct StageReport {
    /// Human-readable headline, e.g. "Found 12 instance layers".
    pub title: String,
    pub findings: Vec<Finding>,
}

impl StageReport {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            findings: Vec::new(),
        }
    }

    /// Build a report from a headline and a flat list of names.
    pub fn from_list<I, S>(title: impl Into<String>, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut report = Self::new(title);
        for item in items {
            report.push(item);
        }
        report
    }

    /// Add a finding with no detail.
    pub fn push(&mut self, label: impl Into<String>) {
        self.findings.push(Finding {
            label: label.into(),
            detail: None,
        });
    }

    /// Add a finding with a detail string.
    pub fn push_with(&mut self, label: impl Into<String>, detail: impl Into<String>) {
        self.findings.push(Finding {
            label: label.into(),
            detail: Some(detail.into()),
        });
    }

    /// Render as the indented multi-line listing used in the log.
    pub fn render(&self) -> String {
        let mut out = self.title.clone();
        for finding in &self.findings {
            out.push_str("\n    ");
            out.push_str(&finding.label);
            if let Some(detail) = &finding.detail {
                out.push_str(": ");
                out.push_str(detail);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_lists_one_item_per_line() {
        let report = StageReport::from_list("Found 2 layers", ["a", "b"]);
        assert_eq!(report.render(), "Found 2 layers\n    a\n    b");
    }

    #[test]
    fn render_appends_details() {
        let mut report = StageReport::new("Queue Family #0");
        report.push_with("GRAPHICS", "count=1");
        assert_eq!(report.render(), "Queue Family #0\n    GRAPHICS: count=1");
    }

    #[test]
    fn empty_report_is_just_the_title() {
        let report = StageReport::new("Found 0 layers");
        assert_eq!(report.render(), "Found 0 layers");
    }
}
