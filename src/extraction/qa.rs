// Gamma-analysis QA results: independent pattern scans over the QA text
use regex::Regex;
use serde::Serialize;
use tracing::debug;

use crate::config::QaLayout;
use crate::types::{ReportError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GammaDta {
    pub dta_mm: String,
    pub tolerance_pct: String,
}

/// Parallel sequences in document order. Nothing forces equal lengths;
/// alignment is checked by the assembler.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QaResultSet {
    pub field_ids: Vec<String>,
    pub gamma_dta: Vec<GammaDta>,
    pub area_pct: Vec<String>,
    /// Second percentage on each area-gamma line
    pub crosscheck_pct: Vec<String>,
    pub results: Vec<String>,
}

impl QaResultSet {
    /// (name, length) of every sequence, identifiers first
    pub fn lengths(&self) -> [(&'static str, usize); 5] {
        [
            ("field_ids", self.field_ids.len()),
            ("gamma_dta", self.gamma_dta.len()),
            ("area_pct", self.area_pct.len()),
            ("crosscheck_pct", self.crosscheck_pct.len()),
            ("results", self.results.len()),
        ]
    }
}

pub struct QaResultExtractor {
    field: Regex,
    gamma_dta: Regex,
    area: Regex,
    result: Regex,
    percent: Regex,
    area_label: String,
}

fn compile(name: &str, pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| ReportError::Layout(format!("qa.{}: {}", name, e)))
}

impl QaResultExtractor {
    pub fn new(layout: &QaLayout) -> Result<Self> {
        Ok(Self {
            field: compile("field_pattern", &layout.field_pattern)?,
            gamma_dta: compile("gamma_dta_pattern", &layout.gamma_dta_pattern)?,
            area: compile("area_pattern", &layout.area_pattern)?,
            result: compile("result_pattern", &layout.result_pattern)?,
            percent: compile("percent_pattern", &layout.percent_pattern)?,
            area_label: layout.area_label.clone(),
        })
    }

    pub fn extract(&self, text: &str) -> QaResultSet {
        let set = QaResultSet {
            field_ids: self.field_ids(text),
            gamma_dta: self.gamma_dta(text),
            area_pct: first_groups(&self.area, text),
            crosscheck_pct: self.crosscheck(text),
            results: first_groups(&self.result, text),
        };
        debug!(lengths = ?set.lengths(), "QA sequences extracted");
        set
    }

    fn field_ids(&self, text: &str) -> Vec<String> {
        self.field
            .captures_iter(text)
            .filter_map(|caps| caps.get(1).or_else(|| caps.get(0)))
            .map(|m| m.as_str().trim().to_string())
            .collect()
    }

    fn gamma_dta(&self, text: &str) -> Vec<GammaDta> {
        self.gamma_dta
            .captures_iter(text)
            .filter_map(|caps| {
                Some(GammaDta {
                    dta_mm: caps.get(1)?.as_str().to_string(),
                    tolerance_pct: caps.get(2)?.as_str().to_string(),
                })
            })
            .collect()
    }

    // Line-level pass: only lines carrying the label and at least two
    // percentage tokens contribute, and they contribute the second token.
    fn crosscheck(&self, text: &str) -> Vec<String> {
        text.lines()
            .filter(|line| line.contains(self.area_label.as_str()))
            .filter_map(|line| {
                self.percent
                    .captures_iter(line)
                    .filter_map(|caps| caps.get(1))
                    .nth(1)
                    .map(|m| m.as_str().to_string())
            })
            .collect()
    }
}

fn first_groups(regex: &Regex, text: &str) -> Vec<String> {
    regex
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> QaResultExtractor {
        QaResultExtractor::new(&QaLayout::default()).unwrap()
    }

    const ONE_FIELD: &str = "Campo 1\n\
        Gama DTA : 2.50 mm Tol.: 95.00 %\n\
        Área gama < 1,0 98.50 % 97.20%\n\
        Resultado da análise: Aprovado\n";

    #[test]
    fn single_field_document() {
        let set = extractor().extract(ONE_FIELD);

        assert_eq!(set.field_ids, vec!["1"]);
        assert_eq!(
            set.gamma_dta,
            vec![GammaDta { dta_mm: "2.50".into(), tolerance_pct: "95.00".into() }]
        );
        assert_eq!(set.area_pct, vec!["98.50"]);
        assert_eq!(set.crosscheck_pct, vec!["97.20"]);
        assert_eq!(set.results, vec!["Aprovado"]);
    }

    #[test]
    fn sequences_preserve_document_order() {
        let text = "Field 3\nGama DTA : 3.00 mm Tol.: 97.00 %\nÁrea gama < 1,0 99.10 % 99.00 %\n\
                    RESULTADO DA ANÁLISE - reprovado\n\
                    Campo 4\nGama DTA: 2.00 mm Tol.: 95.00 %\nÁrea gama < 1,0 91.00 % 90.50 %\n\
                    Resultado da análise: Aprovado\n";
        let set = extractor().extract(text);

        assert_eq!(set.field_ids, vec!["3", "4"]);
        assert_eq!(set.gamma_dta[1].dta_mm, "2.00");
        assert_eq!(set.area_pct, vec!["99.10", "91.00"]);
        assert_eq!(set.crosscheck_pct, vec!["99.00", "90.50"]);
        assert_eq!(set.results, vec!["reprovado", "Aprovado"]);
    }

    #[test]
    fn crosscheck_needs_two_percentages_on_the_line() {
        let text = "Área gama < 1,0 98.50 %\nÁrea gama < 1,0 98.50 % 97.00 %\n";
        let set = extractor().extract(text);
        assert_eq!(set.area_pct.len(), 2);
        assert_eq!(set.crosscheck_pct, vec!["97.00"]);
    }

    #[test]
    fn primary_area_requires_decimal_and_spaced_percent() {
        let set = extractor().extract("Área gama < 1,0 98% 97.2%\n");
        assert!(set.area_pct.is_empty());
        assert_eq!(set.crosscheck_pct, vec!["97.2"]);
    }

    #[test]
    fn unrelated_text_yields_empty_sequences() {
        let set = extractor().extract("Relatório sem análise gama");
        assert_eq!(set, QaResultSet::default());
    }

    #[test]
    fn invalid_pattern_is_a_layout_error() {
        let layout = QaLayout {
            area_pattern: "[".to_string(),
            ..QaLayout::default()
        };
        assert!(matches!(QaResultExtractor::new(&layout), Err(ReportError::Layout(_))));
    }
}
