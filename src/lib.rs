// rtreport: unified radiotherapy QA report from a treatment plan and a gamma-analysis PDF
pub mod config;
pub mod extraction;
pub mod logging;
pub mod pdf_extraction;
pub mod report;
pub mod types;

pub use config::ReportLayout;
pub use report::{build_model, generate_report, ReportRequest, UnifiedReportModel};
pub use types::{ReportError, Result, NOT_FOUND};
