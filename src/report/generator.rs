//! Research report generation.
//!
//! Renders a `RunReport` as Markdown or JSON, plus the short console
//! summary printed at the end of a run.

use crate::models::{RunReport, TickerOutcome, TickerStatus};
use anyhow::{Context, Result};
use std::path::Path;

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &RunReport) -> String {
    let mut output = String::new();

    output.push_str("# SectorScout Research Report\n\n");
    output.push_str(&generate_metadata_section(report));
    output.push_str(&generate_ranking_section(report));
    output.push_str(&generate_companies_section(&report.outcomes));
    output.push_str(&generate_footer());

    output
}

/// Generate the metadata section.
fn generate_metadata_section(report: &RunReport) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Criteria:** {}\n", report.prompt));
    section.push_str(&format!(
        "- **Generated:** {}\n",
        report.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!("- **Model Used:** `{}`\n", report.model));
    section.push_str(&format!(
        "- **Companies Researched:** {}\n",
        report.researched_count()
    ));
    if report.skipped_count() > 0 {
        section.push_str(&format!("- **Companies Skipped:** {}\n", report.skipped_count()));
    }
    section.push_str(&format!("- **Duration:** {:.1}s\n", report.duration_seconds));
    section.push('\n');

    section
}

/// Generate the ranking table.
fn generate_ranking_section(report: &RunReport) -> String {
    let mut section = String::new();

    section.push_str("## Ranking\n\n");

    if report.tickers.is_empty() {
        section.push_str("The ranking agent returned no companies.\n\n");
        return section;
    }

    section.push_str("| # | Ticker | Status |\n");
    section.push_str("|:---:|:---|:---:|\n");
    for (i, outcome) in report.outcomes.iter().enumerate() {
        let status = if outcome.is_researched() { "✅" } else { "⚠️ skipped" };
        section.push_str(&format!("| {} | `{}` | {} |\n", i + 1, outcome.ticker, status));
    }
    section.push('\n');

    section
}

/// Generate one subsection per company.
fn generate_companies_section(outcomes: &[TickerOutcome]) -> String {
    let mut section = String::new();

    if outcomes.is_empty() {
        return section;
    }

    section.push_str("## Companies\n\n");
    for outcome in outcomes {
        section.push_str(&format!("### {}\n\n", outcome.ticker));
        match &outcome.status {
            TickerStatus::Researched { summary } => {
                section.push_str(summary.trim());
                section.push_str("\n\n");
            }
            TickerStatus::Skipped { reason } => {
                section.push_str(&format!("> Failed to get data for this company: {}\n\n", reason));
            }
        }
    }

    section
}

fn generate_footer() -> String {
    "---\n\n*Report generated by SectorScout*\n".to_string()
}

/// Generate a JSON report.
pub fn generate_json_report(report: &RunReport) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

/// Write the report to `path` in the requested format.
pub fn save_report(report: &RunReport, path: &Path, format: crate::cli::OutputFormat) -> Result<()> {
    let content = match format {
        crate::cli::OutputFormat::Json => generate_json_report(report)?,
        crate::cli::OutputFormat::Markdown => generate_markdown_report(report),
    };

    std::fs::write(path, content)
        .with_context(|| format!("Failed to write report to {}", path.display()))
}

/// One-block console summary printed after the per-ticker lines.
pub fn console_summary(report: &RunReport) -> String {
    format!(
        "\n📊 Research Summary:\n   Companies: {}\n   Researched: {} | Skipped: {}\n   Duration: {:.1}s",
        report.tickers.len(),
        report.researched_count(),
        report.skipped_count(),
        report.duration_seconds
    )
}
