//! Outcome of a parse pass.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::error::CliArgError;

/// Everything that went wrong during one parse pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParseReport {
    /// Required parameters never resolved, in declaration order
    pub(crate) missing_params: Vec<String>,

    /// Unknown option names and overflow positionals, in encounter order
    pub(crate) extra_args: Vec<String>,

    /// Value failures keyed by parameter name
    pub(crate) error_messages: BTreeMap<String, String>,

    /// Number of positional parameters that received a token
    pub(crate) positionals_bound: usize,
}

impl ParseReport {
    pub fn missing_params(&self) -> &[String] {
        &self.missing_params
    }

    pub fn extra_args(&self) -> &[String] {
        &self.extra_args
    }

    pub fn error_messages(&self) -> &BTreeMap<String, String> {
        &self.error_messages
    }

    pub fn positionals_bound(&self) -> usize {
        self.positionals_bound
    }

    pub fn has_error(&self) -> bool {
        !self.missing_params.is_empty()
            || !self.extra_args.is_empty()
            || !self.error_messages.is_empty()
    }

    /// The `Display` text, empty when there is nothing to report.
    pub fn errors_as_string(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ParseReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut sections = Vec::new();
        if !self.missing_params.is_empty() {
            sections.push(format!(
                "Missing required arguments: [{}]",
                self.missing_params.join(", ")
            ));
        }
        if !self.extra_args.is_empty() {
            sections.push(format!("Unexpected arguments: [{}]", self.extra_args.join(", ")));
        }
        if !self.error_messages.is_empty() {
            let mut section = String::from("Error parsing following arguments:");
            for (name, message) in &self.error_messages {
                section.push_str(&format!("\n  {}: {}", name, message));
            }
            sections.push(section);
        }
        write!(f, "{}", sections.join("\n"))
    }
}

/// The populated target together with its [`ParseReport`].
#[derive(Debug)]
pub struct ParseOutcome<T> {
    target: T,
    report: ParseReport,
}

impl<T> ParseOutcome<T> {
    pub(crate) fn new(target: T, report: ParseReport) -> Self {
        Self { target, report }
    }

    pub fn target(&self) -> &T {
        &self.target
    }

    pub fn report(&self) -> &ParseReport {
        &self.report
    }

    pub fn has_error(&self) -> bool {
        self.report.has_error()
    }

    pub fn into_parts(self) -> (T, ParseReport) {
        (self.target, self.report)
    }

    /// `Ok(target)` when the pass was clean.
    pub fn into_result(self) -> crate::Result<T> {
        if self.report.has_error() {
            Err(CliArgError::Parse(self.report))
        } else {
            Ok(self.target)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_report() {
        let report = ParseReport::default();
        assert!(!report.has_error());
        assert_eq!(report.errors_as_string(), "");
    }

    #[test]
    fn test_sections_in_order() {
        let report = ParseReport {
            missing_params: vec!["name".to_string(), "id".to_string()],
            extra_args: vec!["foo".to_string()],
            error_messages: BTreeMap::from([("count".to_string(), "bad".to_string())]),
            positionals_bound: 0,
        };

        assert!(report.has_error());
        assert_eq!(
            report.to_string(),
            "Missing required arguments: [name, id]\n\
             Unexpected arguments: [foo]\n\
             Error parsing following arguments:\n  count: bad"
        );
    }

    #[test]
    fn test_only_non_empty_sections() {
        let report = ParseReport {
            extra_args: vec!["a".to_string(), "b".to_string()],
            ..Default::default()
        };
        assert_eq!(report.to_string(), "Unexpected arguments: [a, b]");
    }

    #[test]
    fn test_into_result() {
        let clean = ParseOutcome::new(5, ParseReport::default());
        assert_eq!(clean.into_result().unwrap(), 5);

        let report = ParseReport {
            missing_params: vec!["x".to_string()],
            ..Default::default()
        };
        let err = ParseOutcome::new(5, report).into_result().unwrap_err();
        assert!(
            matches!(err, CliArgError::Parse(ref r) if r.missing_params() == ["x".to_string()])
        );
    }
}
