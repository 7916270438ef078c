// Record assembly: join plan fields and QA sequences by position
use tracing::{debug, info};

use super::model::{FieldRow, QaRow, ReportAssets, UnifiedReportModel};
use crate::config::DisplayRules;
use crate::extraction::{QaResultSet, TreatmentExtraction};
use crate::pdf_extraction::ExtractedImage;
use crate::types::{ReportError, Result};

pub struct RecordAssembler<'a> {
    rules: &'a DisplayRules,
}

impl<'a> RecordAssembler<'a> {
    pub fn new(rules: &'a DisplayRules) -> Self {
        Self { rules }
    }

    /// Strip an axis prefix and a trailing unit, then relabel known terms.
    pub fn clean_value(&self, raw: &str) -> String {
        let mut value = raw.trim();

        if let Some(prefix) = self.rules.axis_prefixes.iter().find(|p| value.starts_with(p.as_str())) {
            value = value[prefix.len()..].trim_start();
        }

        // Units only come off a numeric value ("100.0 cm", "250UM")
        for suffix in &self.rules.unit_suffixes {
            if let Some(rest) = value.strip_suffix(suffix.as_str()) {
                let rest = rest.trim_end();
                if rest.ends_with(|c: char| c.is_ascii_digit()) {
                    value = rest;
                    break;
                }
            }
        }

        match self.rules.relabel.get(value) {
            Some(label) => label.clone(),
            None => value.to_string(),
        }
    }

    /// Lower-case the verdict, then restore the canonical approved term.
    pub fn normalize_result(&self, raw: &str) -> String {
        let approved = &self.rules.approved_term;
        raw.trim()
            .to_lowercase()
            .replace(&approved.to_lowercase(), approved)
    }

    /// One row per identified field. Any other sequence shorter than the
    /// identifier sequence makes the QA section unbuildable.
    pub fn qa_rows(&self, qa: &QaResultSet) -> Result<Vec<QaRow>> {
        let expected = qa.field_ids.len();
        for (sequence, found) in qa.lengths().into_iter().skip(1) {
            if found < expected {
                return Err(ReportError::StructuralMisalignment {
                    sequence,
                    expected,
                    found,
                });
            }
        }

        let rows = qa
            .field_ids
            .iter()
            .enumerate()
            .map(|(i, id)| QaRow {
                field_id: id.clone(),
                dta_mm: qa.gamma_dta[i].dta_mm.clone(),
                tolerance_pct: qa.gamma_dta[i].tolerance_pct.clone(),
                area_pct: qa.area_pct[i].clone(),
                crosscheck_pct: qa.crosscheck_pct[i].clone(),
                result: self.normalize_result(&qa.results[i]),
            })
            .collect::<Vec<_>>();

        for row in &rows {
            if let Some(delta) = row.area_delta() {
                debug!(field = %row.field_id, delta, "area gamma primary vs cross-check");
            }
        }
        Ok(rows)
    }

    pub fn field_rows(&self, treatment: &TreatmentExtraction, qa_count: usize) -> Vec<FieldRow> {
        treatment
            .fields
            .iter()
            .enumerate()
            .map(|(i, field)| FieldRow {
                identifier: field.identifier.clone(),
                values: field.values.iter().map(|v| self.clean_value(v)).collect(),
                qa_index: (i < qa_count).then_some(i),
            })
            .collect()
    }

    pub fn assemble(
        &self,
        layout_version: &str,
        treatment: TreatmentExtraction,
        qa: &QaResultSet,
        plan_images: Vec<ExtractedImage>,
        assets: ReportAssets,
    ) -> Result<UnifiedReportModel> {
        let qa_rows = self.qa_rows(qa)?;
        let fields = self.field_rows(&treatment, qa_rows.len());

        if fields.len() != qa_rows.len() {
            debug!(
                fields = fields.len(),
                qa_rows = qa_rows.len(),
                "treatment field count differs from QA row count"
            );
        }
        info!(
            fields = fields.len(),
            rejected = treatment.rejected_fields.len(),
            qa_rows = qa_rows.len(),
            images = plan_images.len(),
            "report model assembled"
        );

        Ok(UnifiedReportModel {
            layout_version: layout_version.to_string(),
            title: treatment.title,
            patient: treatment.patient,
            displacement: treatment.displacement,
            fields,
            rejected_fields: treatment.rejected_fields,
            qa_rows,
            plan_images,
            assets,
        })
    }
}
