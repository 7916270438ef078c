// Core types and error taxonomy for rtreport
use serde::Serialize;
use std::fmt;

/// Placeholder shown wherever a field could not be extracted.
pub const NOT_FOUND: &str = "Não encontrado";

/// Which uploaded document an error refers to
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    TreatmentPlan,
    QualityAssurance,
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentKind::TreatmentPlan => write!(f, "treatment plan PDF"),
            DocumentKind::QualityAssurance => write!(f, "QA PDF"),
        }
    }
}

// Request-level errors: any of these aborts report generation
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("malformed {document}: {reason}")]
    MalformedInput {
        document: DocumentKind,
        reason: String,
    },

    #[error("QA sequence '{sequence}' has {found} entries but {expected} fields were identified")]
    StructuralMisalignment {
        sequence: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("layout error: {0}")]
    Layout(String),

    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("layout file error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl ReportError {
    pub fn malformed(document: DocumentKind, reason: impl Into<String>) -> Self {
        ReportError::MalformedInput {
            document,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ReportError>;

// Field-scoped errors never abort extraction; they live inside FieldValue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldError {
    #[error("field '{field}' not found")]
    NotFound { field: String },

    #[error("field '{field}' has unparseable date '{raw}': {reason}")]
    DateFormat {
        field: String,
        raw: String,
        reason: String,
    },
}

/// Outcome of extracting one labelled field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldValue {
    Found(String),
    Missing(FieldError),
}

impl FieldValue {
    pub fn not_found(field: impl Into<String>) -> Self {
        FieldValue::Missing(FieldError::NotFound {
            field: field.into(),
        })
    }

    pub fn as_found(&self) -> Option<&str> {
        match self {
            FieldValue::Found(value) => Some(value),
            FieldValue::Missing(_) => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, FieldValue::Found(_))
    }

    pub fn error(&self) -> Option<&FieldError> {
        match self {
            FieldValue::Found(_) => None,
            FieldValue::Missing(err) => Some(err),
        }
    }

    /// Text to print: the value, or the sentinel.
    pub fn display(&self) -> &str {
        self.as_found().unwrap_or(NOT_FOUND)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_value_displays_sentinel() {
        let value = FieldValue::not_found("pront");
        assert_eq!(value.display(), NOT_FOUND);
        assert!(!value.is_found());
        assert_eq!(
            value.error().map(|e| e.to_string()),
            Some("field 'pront' not found".to_string())
        );
    }

    #[test]
    fn found_value_displays_itself() {
        let value = FieldValue::Found("12345".into());
        assert_eq!(value.display(), "12345");
        assert_eq!(value.as_found(), Some("12345"));
    }

    #[test]
    fn misalignment_names_the_short_sequence() {
        let err = ReportError::StructuralMisalignment {
            sequence: "gamma_dta",
            expected: 3,
            found: 2,
        };
        assert!(err.to_string().contains("gamma_dta"));
    }
}
