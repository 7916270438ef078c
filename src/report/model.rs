// Unified report model handed to the renderer
use image::DynamicImage;
use serde::Serialize;

use crate::extraction::{PatientRecord, RejectedField, TableDisplacement};
use crate::pdf_extraction::ExtractedImage;
use crate::types::Result;

/// Treatment field ready for display
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldRow {
    pub identifier: String,
    /// Values with units and axis codes stripped, relabelled
    pub values: Vec<String>,
    /// Index into `UnifiedReportModel::qa_rows` for the same position
    pub qa_index: Option<usize>,
}

/// One gamma-analysis result, drawn from index i of every QA sequence
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QaRow {
    pub field_id: String,
    pub dta_mm: String,
    pub tolerance_pct: String,
    pub area_pct: String,
    pub crosscheck_pct: String,
    pub result: String,
}

impl QaRow {
    /// `95.00 % / 2.50 mm`
    pub fn dta_summary(&self) -> String {
        format!("{} % / {} mm", self.tolerance_pct, self.dta_mm)
    }

    /// Primary area minus the line-level cross-check value
    pub fn area_delta(&self) -> Option<f64> {
        let primary: f64 = self.area_pct.parse().ok()?;
        let crosscheck: f64 = self.crosscheck_pct.parse().ok()?;
        Some(primary - crosscheck)
    }

    pub fn is_approved(&self, approved_term: &str) -> bool {
        self.result == approved_term
    }
}

/// Optional uploads that decorate the page
#[derive(Debug, Clone, Default)]
pub struct ReportAssets {
    pub logo: Option<DynamicImage>,
    pub signatures: Vec<DynamicImage>,
}

impl ReportAssets {
    /// Decode PNG/JPEG uploads; format is sniffed from the bytes.
    pub fn decode(logo: Option<&[u8]>, signatures: &[&[u8]]) -> Result<Self> {
        let logo = logo.map(image::load_from_memory).transpose()?;
        let signatures = signatures
            .iter()
            .map(|bytes| image::load_from_memory(bytes))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(Self { logo, signatures })
    }
}

#[derive(Debug, Clone)]
pub struct UnifiedReportModel {
    pub layout_version: String,
    pub title: String,
    pub patient: PatientRecord,
    pub displacement: TableDisplacement,
    pub fields: Vec<FieldRow>,
    pub rejected_fields: Vec<RejectedField>,
    pub qa_rows: Vec<QaRow>,
    pub plan_images: Vec<ExtractedImage>,
    pub assets: ReportAssets,
}

impl UnifiedReportModel {
    /// Field at `index` with its correlated QA row, if any
    pub fn field_view(&self, index: usize) -> Option<(&FieldRow, Option<&QaRow>)> {
        let field = self.fields.get(index)?;
        let qa = field.qa_index.and_then(|i| self.qa_rows.get(i));
        Some((field, qa))
    }
}
