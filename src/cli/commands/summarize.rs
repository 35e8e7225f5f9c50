//! Summarize command implementation

use crate::attack::{ExamplesReport, Moments, SummaryReport, TrainerSuccessSummary};
use crate::cli::logging::log;
use crate::cli::LogLevel;
use crate::config::{OutputFormat, SummarizeArgs};
use crate::io::{ResultStore, SafeTensorsStore};

fn format_moments(m: Option<Moments>) -> String {
    m.map_or_else(|| "n/a".to_string(), |m| format!("{:.4} ± {:.4}", m.mean, m.std))
}

fn format_examples(r: &ExamplesReport) -> String {
    [
        format!("  {:?} examples: {}", r.kind, r.count),
        format!("    mean |p|:         {}", format_moments(r.mean_abs)),
        format!(
            "    mean max |p|:     {}",
            r.mean_max_abs.map_or_else(|| "n/a".to_string(), |v| format!("{v:.4}"))
        ),
        format!("    fraction nonzero: {}", format_moments(r.fraction_nonzero)),
        format!("    sparsity:         {}", format_moments(r.sparsity)),
        format!(
            "    discovery epoch:  {}",
            r.mean_discovery_epoch.map_or_else(|| "n/a".to_string(), |v| format!("{v:.1}"))
        ),
    ]
    .join("\n")
}

/// Human-readable rendering of a report
pub fn format_report(report: &SummaryReport) -> String {
    [
        format!(
            "Attacked: {}  Successful: {}  Success rate: {:.1}%",
            report.num_attacked,
            report.num_successful,
            report.success_rate * 100.0
        ),
        format_examples(&report.first),
        format_examples(&report.best),
    ]
    .join("\n")
}

pub fn render(report: &SummaryReport, format: OutputFormat) -> Result<String, String> {
    match format {
        OutputFormat::Text => Ok(format_report(report)),
        OutputFormat::Json => serde_json::to_string_pretty(report).map_err(|e| e.to_string()),
        OutputFormat::Yaml => serde_yaml::to_string(report).map_err(|e| e.to_string()),
    }
}

pub fn run_summarize(args: SummarizeArgs, level: LogLevel) -> Result<(), String> {
    let result = SafeTensorsStore.load(&args.result).map_err(|e| e.to_string())?;
    let mut summary = TrainerSuccessSummary::new(result).map_err(|e| e.to_string())?;
    if let Some(seq_length) = args.seq_length {
        summary = summary.with_seq_length(seq_length).map_err(|e| e.to_string())?;
    }
    if let Some(label) = args.label {
        summary = summary.with_orig_label(label).map_err(|e| e.to_string())?;
    }
    let report = summary.report().map_err(|e| e.to_string())?;
    let rendered = render(&report, args.format)?;

    // Machine-readable formats ignore --quiet
    if args.format == OutputFormat::Text {
        log(level, LogLevel::Normal, &rendered);
    } else {
        println!("{rendered}");
    }
    Ok(())
}
