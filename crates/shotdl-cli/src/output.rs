//! JSON envelopes written at the end of a run.

use std::process::ExitCode;

use serde::Serialize;

use shotdl_core::{DiscoveryDiagnostics, RunSummary};
use shotdl_scraper::PipelineError;

/// Written to stderr when a run aborts.
#[derive(Debug, Serialize)]
pub(crate) struct FailureEnvelope {
    pub success: bool,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<DiscoveryDiagnostics>,
}

impl FailureEnvelope {
    pub(crate) fn from_error(err: &anyhow::Error) -> Self {
        let diagnostics = match err.downcast_ref::<PipelineError>() {
            Some(PipelineError::NoResults { diagnostics, .. }) => Some(*diagnostics),
            _ => None,
        };
        Self {
            success: false,
            error: err.to_string(),
            diagnostics,
        }
    }
}

pub(crate) fn report_success(summary: &RunSummary) -> ExitCode {
    match serde_json::to_string_pretty(summary) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(e) => report_failure(&e.into()),
    }
}

pub(crate) fn report_failure(err: &anyhow::Error) -> ExitCode {
    let envelope = FailureEnvelope::from_error(err);
    match serde_json::to_string_pretty(&envelope) {
        Ok(json) => eprintln!("{json}"),
        Err(_) => eprintln!(r#"{{"success":false,"error":"unreportable error"}}"#),
    }
    ExitCode::FAILURE
}
