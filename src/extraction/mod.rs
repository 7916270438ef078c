// Text extraction core: treatment plan and QA document parsers
pub mod displacement;
pub mod patient;
pub mod qa;
pub mod treatment_fields;

pub use displacement::{locate_displacement, TableDisplacement};
pub use patient::{display_title, normalize_date, PatientExtractor, PatientRecord};
pub use qa::{GammaDta, QaResultExtractor, QaResultSet};
pub use treatment_fields::{recover_fields, FieldTable, RejectedField, TreatmentField};

use serde::Serialize;

use crate::config::{DisplacementLayout, FieldTableLayout, ReportLayout};
use crate::types::Result;

/// Everything the treatment plan text yields
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreatmentExtraction {
    pub title: String,
    pub patient: PatientRecord,
    pub fields: Vec<TreatmentField>,
    pub rejected_fields: Vec<RejectedField>,
    pub displacement: TableDisplacement,
}

pub struct TreatmentTextExtractor {
    patient: PatientExtractor,
    title_segments: Vec<usize>,
    table: FieldTableLayout,
    displacement: DisplacementLayout,
}

impl TreatmentTextExtractor {
    pub fn new(layout: &ReportLayout) -> Result<Self> {
        Ok(Self {
            patient: PatientExtractor::new(&layout.patient)?,
            title_segments: layout.patient.title_segments.clone(),
            table: layout.treatment_fields.clone(),
            displacement: layout.displacement.clone(),
        })
    }

    pub fn extract(&self, text: &str) -> TreatmentExtraction {
        let patient = self.patient.extract(text);
        let title = display_title(patient.name.display(), &self.title_segments);
        let FieldTable { fields, rejected } = recover_fields(text, &self.table);
        let displacement = locate_displacement(text, &self.displacement);

        TreatmentExtraction {
            title,
            patient,
            fields,
            rejected_fields: rejected,
            displacement,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NOT_FOUND;

    #[test]
    fn missing_name_titles_the_sentinel() {
        let extractor = TreatmentTextExtractor::new(&ReportLayout::default()).unwrap();
        let extraction = extractor.extract("Prontuário: 42");
        assert_eq!(extraction.title, display_title(NOT_FOUND, &[9, 2, 5, 2, 10]));
        assert_eq!(extraction.patient.record_number.as_found(), Some("42"));
        assert!(!extraction.displacement.located);
        assert!(extraction.fields.is_empty());
    }
}
