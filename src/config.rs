// Document layout descriptor for rtreport
//
// Every positional or pattern-based extraction rule lives here so that a
// template change is a TOML edit, not a code change.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::types::{ReportError, Result};

pub const LAYOUT_ENV_VAR: &str = "RTREPORT_LAYOUT";

// Get layout path from environment, if set
pub fn layout_path_from_env() -> Option<PathBuf> {
    env::var(LAYOUT_ENV_VAR).ok().filter(|p| !p.is_empty()).map(PathBuf::from)
}

/// Patient attributes captured from the treatment plan text.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatientField {
    Name,
    BirthDate,
    RecordNumber,
    RadiationOncologist,
    CoursePlan,
    PrescribedDose,
    PrescriptionCurve,
    Imaging,
    TableDisplacement,
}

impl PatientField {
    pub const ALL: [PatientField; 9] = [
        PatientField::Name,
        PatientField::BirthDate,
        PatientField::RecordNumber,
        PatientField::RadiationOncologist,
        PatientField::CoursePlan,
        PatientField::PrescribedDose,
        PatientField::PrescriptionCurve,
        PatientField::Imaging,
        PatientField::TableDisplacement,
    ];

    pub fn key(self) -> &'static str {
        match self {
            PatientField::Name => "name",
            PatientField::BirthDate => "birth_date",
            PatientField::RecordNumber => "record_number",
            PatientField::RadiationOncologist => "radiation_oncologist",
            PatientField::CoursePlan => "course_plan",
            PatientField::PrescribedDose => "prescribed_dose",
            PatientField::PrescriptionCurve => "prescription_curve",
            PatientField::Imaging => "imaging",
            PatientField::TableDisplacement => "table_displacement",
        }
    }
}

/// Post-processing applied to a captured value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldTransform {
    Text,
    Truncate { chars: usize },
    Date { input_format: String, output_format: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRule {
    pub field: PatientField,
    /// Regex whose first capture group is the value
    pub pattern: String,
    #[serde(default = "default_transform")]
    pub transform: FieldTransform,
}

fn default_transform() -> FieldTransform {
    FieldTransform::Text
}

impl FieldRule {
    fn new(field: PatientField, pattern: &str, transform: FieldTransform) -> Self {
        Self {
            field,
            pattern: pattern.to_string(),
            transform,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatientLayout {
    pub fields: Vec<FieldRule>,
    /// Character widths of the name slices joined by spaces into the title
    pub title_segments: Vec<usize>,
}

impl Default for PatientLayout {
    fn default() -> Self {
        use PatientField::*;
        Self {
            fields: vec![
                FieldRule::new(Name, r"Nome:\s*(.+?)\s*Data", FieldTransform::Truncate { chars: 28 }),
                FieldRule::new(
                    BirthDate,
                    r"Data de Nasc.:\s*(.+?)\s*Pront",
                    FieldTransform::Date {
                        input_format: "%A, %B %d, %Y".to_string(),
                        output_format: "%d/%m/%Y".to_string(),
                    },
                ),
                FieldRule::new(RecordNumber, r"Prontuário:\s*(\d+)", FieldTransform::Text),
                FieldRule::new(RadiationOncologist, r"Radio-Oncologista:\s*(.+)", FieldTransform::Text),
                FieldRule::new(CoursePlan, r"Curso / Plano:\s*(.+)", FieldTransform::Text),
                FieldRule::new(PrescribedDose, r"Dose de Prescrição:\s*(.+)", FieldTransform::Text),
                FieldRule::new(PrescriptionCurve, r"Curva de Prescrição:\s*(.+)", FieldTransform::Text),
                FieldRule::new(Imaging, r"Imagem Utilizada:\s*(.+)", FieldTransform::Text),
                FieldRule::new(
                    TableDisplacement,
                    r"Deslocamento da mesa da posição de setup de referência:\s*(.+)",
                    FieldTransform::Text,
                ),
            ],
            title_segments: vec![9, 2, 5, 2, 10],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldTableLayout {
    /// Line that opens the field-parameter run
    pub start_marker: String,
    /// Lines that close it
    pub end_markers: Vec<String>,
    /// Tokens that open a new record besides pure numerals
    pub identifier_keywords: Vec<String>,
    /// Bare separator token that is dropped
    pub separator: String,
    pub min_values: usize,
    pub max_values: usize,
}

impl Default for FieldTableLayout {
    fn default() -> Self {
        Self {
            start_marker: "Parâmetros dos Campos".to_string(),
            end_markers: vec![
                "Deslocamento da mesa".to_string(),
                "Assinaturas".to_string(),
            ],
            identifier_keywords: vec!["CBCT".to_string(), "MV".to_string(), "KV".to_string()],
            separator: "-".to_string(),
            min_values: 8,
            max_values: 16,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplacementLayout {
    /// Zero-based line index of the lateral value; vertical and
    /// longitudinal follow on the next two lines
    pub first_line: usize,
}

impl Default for DisplacementLayout {
    fn default() -> Self {
        Self { first_line: 22 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QaLayout {
    pub field_pattern: String,
    pub gamma_dta_pattern: String,
    pub area_pattern: String,
    pub result_pattern: String,
    /// Literal label searched line by line for the cross-check value
    pub area_label: String,
    pub percent_pattern: String,
}

impl Default for QaLayout {
    fn default() -> Self {
        Self {
            field_pattern: r"(?:Campo|Field) (\d+)".to_string(),
            gamma_dta_pattern: r"Gama DTA\s*:\s*(\d+\.\d+)\s*mm\s*Tol\.\s*:\s*(\d+\.\d+) %".to_string(),
            area_pattern: r"Área gama < 1,0\s+(\d+\.\d+) %".to_string(),
            result_pattern: r"(?i)Resultado da análise\s*[:.\-]?\s*([^\n]*)".to_string(),
            area_label: "Área gama < 1,0".to_string(),
            percent_pattern: r"(\d+\.?\d*)\s*%".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayRules {
    pub unit_suffixes: Vec<String>,
    pub axis_prefixes: Vec<String>,
    pub relabel: BTreeMap<String, String>,
    /// Canonical capitalisation of the passing verdict
    pub approved_term: String,
}

impl Default for DisplayRules {
    fn default() -> Self {
        let relabel = [
            ("STATIC", "Estático"),
            ("STATIC-I", "Estático"),
            ("ARC", "Arco"),
            ("SRS ARC", "Arco"),
            ("DYNAMIC", "Dinâmico"),
            ("SETUP", "Setup"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        Self {
            unit_suffixes: ["cGy", "cm", "UM", "MU", "deg", "°"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            axis_prefixes: ["X1:", "X2:", "Y1:", "Y2:", "X:", "Y:", "Z:"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            relabel,
            approved_term: "Aprovado".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputLayout {
    pub max_plan_images: usize,
    pub signature_captions: Vec<String>,
    pub qa_heading: String,
}

impl Default for OutputLayout {
    fn default() -> Self {
        Self {
            max_plan_images: 3,
            signature_captions: vec![
                "Físico(a) Médico(a)".to_string(),
                "Radio-Oncologista".to_string(),
            ],
            qa_heading: "CONTROLE DE QUALIDADE - EQUIPAMENTO USADO: EPID, METODOLOGIA USADA: ANÁLISE GAMA"
                .to_string(),
        }
    }
}

/// Versioned description of the source documents and the output page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportLayout {
    pub version: String,
    pub patient: PatientLayout,
    pub treatment_fields: FieldTableLayout,
    pub displacement: DisplacementLayout,
    pub qa: QaLayout,
    pub display: DisplayRules,
    pub output: OutputLayout,
}

impl Default for ReportLayout {
    fn default() -> Self {
        Self {
            version: "reference-1".to_string(),
            patient: PatientLayout::default(),
            treatment_fields: FieldTableLayout::default(),
            displacement: DisplacementLayout::default(),
            qa: QaLayout::default(),
            display: DisplayRules::default(),
            output: OutputLayout::default(),
        }
    }
}

impl ReportLayout {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let layout: ReportLayout = toml::from_str(content)?;
        layout.validate()?;
        Ok(layout)
    }

    /// Explicit path first, then `RTREPORT_LAYOUT`, then the built-in layout.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        let path = explicit.map(Path::to_path_buf).or_else(layout_path_from_env);
        match path {
            Some(path) => {
                tracing::debug!(path = %path.display(), "loading layout file");
                Self::load(&path)
            }
            None => Ok(Self::default()),
        }
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| ReportError::Layout(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.patient.title_segments.is_empty() {
            return Err(ReportError::Layout("patient.title_segments is empty".into()));
        }
        let table = &self.treatment_fields;
        if table.min_values > table.max_values {
            return Err(ReportError::Layout(format!(
                "treatment_fields.min_values ({}) exceeds max_values ({})",
                table.min_values, table.max_values
            )));
        }
        for field in PatientField::ALL {
            if !self.patient.fields.iter().any(|rule| rule.field == field) {
                tracing::debug!(field = field.key(), "layout has no rule for field");
            }
        }
        Ok(())
    }
}
