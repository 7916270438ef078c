// Patient demographics: one capture rule per field, sentinel on miss
use chrono::NaiveDate;
use regex::Regex;
use serde::Serialize;
use tracing::debug;

use crate::config::{FieldTransform, PatientField, PatientLayout};
use crate::types::{FieldError, FieldValue, ReportError, Result};

/// Patient attributes from the treatment plan. Every attribute is
/// extracted independently of the others.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatientRecord {
    pub name: FieldValue,
    pub birth_date: FieldValue,
    pub record_number: FieldValue,
    pub radiation_oncologist: FieldValue,
    pub course_plan: FieldValue,
    pub prescribed_dose: FieldValue,
    pub prescription_curve: FieldValue,
    pub imaging: FieldValue,
    pub table_displacement: FieldValue,
}

impl Default for PatientRecord {
    fn default() -> Self {
        use PatientField::*;
        Self {
            name: FieldValue::not_found(Name.key()),
            birth_date: FieldValue::not_found(BirthDate.key()),
            record_number: FieldValue::not_found(RecordNumber.key()),
            radiation_oncologist: FieldValue::not_found(RadiationOncologist.key()),
            course_plan: FieldValue::not_found(CoursePlan.key()),
            prescribed_dose: FieldValue::not_found(PrescribedDose.key()),
            prescription_curve: FieldValue::not_found(PrescriptionCurve.key()),
            imaging: FieldValue::not_found(Imaging.key()),
            table_displacement: FieldValue::not_found(TableDisplacement.key()),
        }
    }
}

impl PatientRecord {
    pub fn get(&self, field: PatientField) -> &FieldValue {
        match field {
            PatientField::Name => &self.name,
            PatientField::BirthDate => &self.birth_date,
            PatientField::RecordNumber => &self.record_number,
            PatientField::RadiationOncologist => &self.radiation_oncologist,
            PatientField::CoursePlan => &self.course_plan,
            PatientField::PrescribedDose => &self.prescribed_dose,
            PatientField::PrescriptionCurve => &self.prescription_curve,
            PatientField::Imaging => &self.imaging,
            PatientField::TableDisplacement => &self.table_displacement,
        }
    }

    fn slot_mut(&mut self, field: PatientField) -> &mut FieldValue {
        match field {
            PatientField::Name => &mut self.name,
            PatientField::BirthDate => &mut self.birth_date,
            PatientField::RecordNumber => &mut self.record_number,
            PatientField::RadiationOncologist => &mut self.radiation_oncologist,
            PatientField::CoursePlan => &mut self.course_plan,
            PatientField::PrescribedDose => &mut self.prescribed_dose,
            PatientField::PrescriptionCurve => &mut self.prescription_curve,
            PatientField::Imaging => &mut self.imaging,
            PatientField::TableDisplacement => &mut self.table_displacement,
        }
    }

    /// Fields that came back empty, in declaration order
    pub fn missing(&self) -> Vec<PatientField> {
        PatientField::ALL
            .into_iter()
            .filter(|f| !self.get(*f).is_found())
            .collect()
    }
}

struct CompiledRule {
    field: PatientField,
    regex: Regex,
    transform: FieldTransform,
}

pub struct PatientExtractor {
    rules: Vec<CompiledRule>,
}

impl PatientExtractor {
    pub fn new(layout: &PatientLayout) -> Result<Self> {
        let rules = layout
            .fields
            .iter()
            .map(|rule| {
                let regex = Regex::new(&rule.pattern).map_err(|e| {
                    ReportError::Layout(format!("pattern for '{}': {}", rule.field.key(), e))
                })?;
                Ok(CompiledRule {
                    field: rule.field,
                    regex,
                    transform: rule.transform.clone(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { rules })
    }

    pub fn extract(&self, text: &str) -> PatientRecord {
        let mut record = PatientRecord::default();
        for rule in &self.rules {
            let key = rule.field.key();
            let value = match rule.regex.captures(text).and_then(|caps| caps.get(1)) {
                Some(m) => apply_transform(key, m.as_str().trim(), &rule.transform),
                None => FieldValue::not_found(key),
            };
            match &value {
                FieldValue::Found(v) => debug!(field = key, value = %v, "patient field matched"),
                FieldValue::Missing(err) => debug!(field = key, %err, "patient field missing"),
            }
            *record.slot_mut(rule.field) = value;
        }
        record
    }
}

fn apply_transform(key: &str, raw: &str, transform: &FieldTransform) -> FieldValue {
    match transform {
        FieldTransform::Text => FieldValue::Found(raw.to_string()),
        FieldTransform::Truncate { chars } => FieldValue::Found(raw.chars().take(*chars).collect()),
        FieldTransform::Date {
            input_format,
            output_format,
        } => match normalize_date(raw, input_format, output_format) {
            Ok(date) => FieldValue::Found(date),
            Err(e) => FieldValue::Missing(FieldError::DateFormat {
                field: key.to_string(),
                raw: raw.to_string(),
                reason: e.to_string(),
            }),
        },
    }
}

/// Re-format a long-form calendar date, e.g.
/// `Tuesday, January 02, 2024` -> `02/01/2024`.
pub fn normalize_date(
    raw: &str,
    input_format: &str,
    output_format: &str,
) -> std::result::Result<String, chrono::ParseError> {
    let date = NaiveDate::parse_from_str(raw.trim(), input_format)?;
    Ok(date.format(output_format).to_string())
}

/// Rebuild the display title from fixed-width slices of the name.
///
/// Slices past the end of the name are empty, so short names keep their
/// separating spaces.
pub fn display_title(name: &str, segments: &[usize]) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut start = 0;
    let mut parts = Vec::with_capacity(segments.len());
    for width in segments {
        let end = (start + width).min(chars.len());
        let begin = start.min(chars.len());
        parts.push(chars[begin..end].iter().collect::<String>());
        start += width;
    }
    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NOT_FOUND;
    use rstest::rstest;

    fn extractor() -> PatientExtractor {
        PatientExtractor::new(&PatientLayout::default()).unwrap()
    }

    #[test]
    fn extracts_name_birth_date_and_record_number() {
        let text = "Nome: Maria Silva Data de Nasc.: Tuesday, January 02, 2024 Prontuário: 12345";
        let record = extractor().extract(text);

        assert_eq!(record.name.as_found(), Some("Maria Silva"));
        assert_eq!(record.birth_date.as_found(), Some("02/01/2024"));
        assert_eq!(record.record_number.as_found(), Some("12345"));
        assert_eq!(record.radiation_oncologist.display(), NOT_FOUND);
    }

    #[test]
    fn line_anchored_fields_stop_at_end_of_line() {
        let text = "Radio-Oncologista: Dr. João Souza\n\
                    Curso / Plano: C1 / Mama Esq\n\
                    Dose de Prescrição: 5000 cGy\n\
                    Curva de Prescrição: 95%\n\
                    Imagem Utilizada: CT_SIM_01\n\
                    Deslocamento da mesa da posição de setup de referência: 0.5 cm\n";
        let record = extractor().extract(text);

        assert_eq!(record.radiation_oncologist.as_found(), Some("Dr. João Souza"));
        assert_eq!(record.course_plan.as_found(), Some("C1 / Mama Esq"));
        assert_eq!(record.prescribed_dose.as_found(), Some("5000 cGy"));
        assert_eq!(record.prescription_curve.as_found(), Some("95%"));
        assert_eq!(record.imaging.as_found(), Some("CT_SIM_01"));
        assert_eq!(record.table_displacement.as_found(), Some("0.5 cm"));
        assert_eq!(
            record.missing(),
            vec![PatientField::Name, PatientField::BirthDate, PatientField::RecordNumber]
        );
    }

    #[test]
    fn missing_label_does_not_affect_other_fields() {
        let full = "Nome: Ana Data de Nasc.: Friday, March 01, 2024 Prontuário: 777\nImagem Utilizada: CT";
        let without_record = full.replace("Prontuário: 777", "");

        let a = extractor().extract(full);
        let b = extractor().extract(&without_record);

        assert!(!b.record_number.is_found());
        assert_eq!(a.imaging, b.imaging);
        assert_eq!(a.name, b.name);
    }

    #[test]
    fn empty_text_yields_all_sentinels() {
        let record = extractor().extract("");
        assert_eq!(record.missing().len(), PatientField::ALL.len());
        assert_eq!(record, PatientRecord::default());
    }

    #[test]
    fn name_is_truncated_to_28_characters() {
        let text = "Nome: ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789 Data de Nasc.: x Pront";
        let record = extractor().extract(text);
        assert_eq!(record.name.as_found(), Some("ABCDEFGHIJKLMNOPQRSTUVWXYZ01"));
    }

    #[test]
    fn bad_birth_date_is_a_field_local_error() {
        let text = "Nome: Ana Data de Nasc.: 01/03/2024 Prontuário: 9";
        let record = extractor().extract(text);

        assert!(matches!(
            record.birth_date,
            FieldValue::Missing(FieldError::DateFormat { ref raw, .. }) if raw == "01/03/2024"
        ));
        assert_eq!(record.name.as_found(), Some("Ana"));
        assert_eq!(record.record_number.as_found(), Some("9"));
    }

    #[rstest]
    #[case("Tuesday, January 02, 2024", "02/01/2024")]
    #[case("Wednesday, December 31, 1958", "31/12/1958")]
    #[case("Thursday, February 29, 2024", "29/02/2024")]
    fn long_form_dates_normalize(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(normalize_date(raw, "%A, %B %d, %Y", "%d/%m/%Y").unwrap(), expected);
    }

    #[rstest]
    #[case("2024-01-02")]
    #[case("January 02, 2024")]
    #[case("Tuesday, Janvier 02, 2024")]
    #[case("Monday, January 02, 2024")]
    fn malformed_dates_are_rejected(#[case] raw: &str) {
        assert!(normalize_date(raw, "%A, %B %d, %Y", "%d/%m/%Y").is_err());
    }

    #[test]
    fn title_reproduces_fixed_slices() {
        let segments = [9, 2, 5, 2, 10];
        assert_eq!(display_title("Maria Silva", &segments), "Maria Sil va   ");
        assert_eq!(
            display_title("JOSEDASILVAXXSANTOSYYOLIVEIRA", &segments),
            "JOSEDASIL VA XXSAN TO SYYOLIVEIR"
        );
        assert_eq!(display_title("", &segments), "    ");
    }

    #[test]
    fn title_slices_count_characters_not_bytes() {
        assert_eq!(display_title("ÁÉÍÓÚ", &[2, 3]), "ÁÉ ÍÓÚ");
    }

    #[test]
    fn invalid_pattern_is_a_layout_error() {
        let mut layout = PatientLayout::default();
        layout.fields[0].pattern = "(unclosed".to_string();
        assert!(matches!(PatientExtractor::new(&layout), Err(ReportError::Layout(_))));
    }
}
