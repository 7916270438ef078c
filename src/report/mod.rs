// Report generation: two PDFs in, one unified PDF out
pub mod assembler;
pub mod model;
pub mod renderer;

pub use assembler::RecordAssembler;
pub use model::{FieldRow, QaRow, ReportAssets, UnifiedReportModel};
pub use renderer::ReportRenderer;

use tracing::{info, info_span};

use crate::config::ReportLayout;
use crate::extraction::{QaResultExtractor, TreatmentTextExtractor};
use crate::pdf_extraction::{extract_plan_content, extract_text};
use crate::types::{DocumentKind, Result};

/// Raw uploads for one report
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportRequest<'a> {
    pub plan_pdf: &'a [u8],
    pub qa_pdf: &'a [u8],
    pub logo: Option<&'a [u8]>,
    pub signatures: &'a [&'a [u8]],
}

/// Parse both documents and join them into the report model.
pub fn build_model(request: &ReportRequest<'_>, layout: &ReportLayout) -> Result<UnifiedReportModel> {
    let plan = extract_plan_content(request.plan_pdf)?;
    let qa_text = extract_text(request.qa_pdf, DocumentKind::QualityAssurance)?;
    let assets = ReportAssets::decode(request.logo, request.signatures)?;

    let treatment = TreatmentTextExtractor::new(layout)?.extract(&plan.text);
    let qa = QaResultExtractor::new(&layout.qa)?.extract(&qa_text);

    RecordAssembler::new(&layout.display).assemble(&layout.version, treatment, &qa, plan.images, assets)
}

/// Full pipeline: extraction, assembly and rendering.
pub fn generate_report(request: &ReportRequest<'_>, layout: &ReportLayout) -> Result<Vec<u8>> {
    let span = info_span!("generate_report", layout = %layout.version);
    let _guard = span.enter();

    let model = build_model(request, layout)?;
    let missing = model.patient.missing();
    let bytes = ReportRenderer::new(&layout.output, &layout.display.approved_term).render(&model)?;

    info!(
        fields = model.fields.len(),
        qa_rows = model.qa_rows.len(),
        missing_patient_fields = missing.len(),
        bytes = bytes.len(),
        "report generated"
    );
    Ok(bytes)
}
