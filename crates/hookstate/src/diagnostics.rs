//! Diagnostics returned by lifecycle operations.
//!
//! Operations never panic or bail on the first local problem; they return
//! `Result<(), Diagnostics>`, where the error side is an ordered list of
//! everything that went wrong in that pass.

use serde::Serialize;

use crate::api::ApiError;
use crate::state::StateError;

/// Severity of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// Where a diagnostic comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticKind {
    /// A precondition failed before any remote call.
    Usage,
    /// The remote API returned an error.
    Remote,
    /// Writing a resolved value into the state store failed.
    State,
}

/// A single reported problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: DiagnosticKind,
    pub summary: String,
    /// The attribute the diagnostic refers to, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
}

impl Diagnostic {
    pub fn error(kind: DiagnosticKind, summary: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            kind,
            summary: summary.into(),
            attribute: None,
        }
    }

    pub fn warning(kind: DiagnosticKind, summary: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            kind,
            summary: summary.into(),
            attribute: None,
        }
    }

    pub fn usage(summary: impl Into<String>) -> Self {
        Self::error(DiagnosticKind::Usage, summary)
    }

    pub fn with_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.attribute = Some(attribute.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let level = match self.severity {
            Severity::Error => "Error",
            Severity::Warning => "Warning",
        };
        match &self.attribute {
            Some(attr) => write!(f, "{}: {} (attribute \"{}\")", level, self.summary, attr),
            None => write!(f, "{}: {}", level, self.summary),
        }
    }
}

impl From<ApiError> for Diagnostic {
    fn from(err: ApiError) -> Self {
        Diagnostic::error(DiagnosticKind::Remote, err.to_string())
    }
}

impl From<StateError> for Diagnostic {
    fn from(err: StateError) -> Self {
        let attribute = err.attribute().map(str::to_string);
        let diag = Diagnostic::error(DiagnosticKind::State, err.to_string());
        match attribute {
            Some(attr) => diag.with_attribute(attr),
            None => diag,
        }
    }
}

/// An ordered list of diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Diagnostics(Vec<Diagnostic>);

impl Diagnostics {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, diagnostic: impl Into<Diagnostic>) {
        self.0.push(diagnostic.into());
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.0.extend(other.0);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn has_errors(&self) -> bool {
        self.0.iter().any(Diagnostic::is_error)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.0.iter()
    }

    /// Returns true if any error diagnostic has the given kind.
    pub fn has_kind(&self, kind: DiagnosticKind) -> bool {
        self.0.iter().any(|d| d.is_error() && d.kind == kind)
    }

    /// `Ok(())` when there are no errors, otherwise `Err(self)`.
    pub fn into_result(self) -> Result<(), Diagnostics> {
        if self.has_errors() {
            Err(self)
        } else {
            Ok(())
        }
    }
}

impl From<Diagnostic> for Diagnostics {
    fn from(diagnostic: Diagnostic) -> Self {
        Self(vec![diagnostic])
    }
}

impl From<ApiError> for Diagnostics {
    fn from(err: ApiError) -> Self {
        Self(vec![err.into()])
    }
}

impl From<StateError> for Diagnostics {
    fn from(err: StateError) -> Self {
        Self(vec![err.into()])
    }
}

impl<D: Into<Diagnostic>> FromIterator<D> for Diagnostics {
    fn from_iter<I: IntoIterator<Item = D>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl std::fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, diag) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", diag)?;
        }
        Ok(())
    }
}

impl std::error::Error for Diagnostics {}

/// Collects the outcome of several state writes into one result.
///
/// Every write has already been attempted by the time this runs; all
/// failures are reported, not just the first.
pub fn collect_writes<I>(results: I) -> Result<(), Diagnostics>
where
    I: IntoIterator<Item = Result<(), StateError>>,
{
    results
        .into_iter()
        .filter_map(Result::err)
        .collect::<Diagnostics>()
        .into_result()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_writes_reports_every_failure() {
        let results = vec![
            Ok(()),
            Err(StateError::UnknownField("a".to_string())),
            Ok(()),
            Err(StateError::UnknownField("b".to_string())),
        ];
        let diags = collect_writes(results).unwrap_err();
        assert_eq!(diags.len(), 2);
        assert!(diags.has_kind(DiagnosticKind::State));
        let attrs: Vec<_> = diags.iter().map(|d| d.attribute.clone()).collect();
        assert_eq!(attrs, vec![Some("a".to_string()), Some("b".to_string())]);
    }

    #[test]
    fn test_collect_writes_ok_when_all_succeed() {
        assert!(collect_writes(vec![Ok(()), Ok(())]).is_ok());
    }

    #[test]
    fn test_warnings_alone_are_not_errors() {
        let mut diags = Diagnostics::new();
        diags.push(Diagnostic::warning(DiagnosticKind::Remote, "careful"));
        assert!(!diags.has_errors());
        assert!(diags.into_result().is_ok());
    }

    #[test]
    fn test_display() {
        let diag = Diagnostic::usage("bad input").with_attribute("disabled");
        assert_eq!(diag.to_string(), "Error: bad input (attribute \"disabled\")");
    }
}
