//! Pure formatting functions for UI output.
//!
//! Status lines go to stdout; errors and warnings go to stderr.

use console::style;

use crate::gate::GateReport;
use crate::pipeline::{PipelineReport, StageStatus};
use crate::warnings::ReleaseWarning;

/// Format and print an error message in red.
pub fn display_error(message: &str) {
    eprintln!("{} {}", style("ERROR:").red(), message);
}

/// Format and print a success message with green checkmark.
pub fn display_success(message: &str) {
    println!("{} {}", style("✓").green(), message);
}

/// Format and print a status message with yellow arrow.
pub fn display_status(message: &str) {
    println!("{} {}", style("→").yellow(), message);
}

/// Display a release warning to the user.
pub fn display_warning(warning: &ReleaseWarning) {
    eprintln!("{} {}", style("⚠ WARNING:").yellow(), warning);
}

pub fn stage_line(name: &str, status: &StageStatus) -> String {
    match status {
        StageStatus::Succeeded => format!("  {} {}", style("✓").green(), name),
        StageStatus::Failed(message) => {
            format!("  {} {}: {}", style("✗").red(), name, message)
        }
        StageStatus::Skipped => format!("  {} {} (skipped)", style("-").dim(), name),
    }
}

/// Display the per-stage summary of a release run.
pub fn display_stage_report(report: &PipelineReport) {
    println!("\n{}", style("Release pipeline:").bold());
    for (stage, status) in &report.stages {
        println!("{}", stage_line(stage.name(), status));
    }

    if let Some(release) = &report.release {
        let action = if release.created { "Created" } else { "Updated" };
        if release.html_url.is_empty() {
            display_success(&format!("{} release {}", action, release.tag_name));
        } else {
            display_success(&format!(
                "{} release {}: {}",
                action, release.tag_name, release.html_url
            ));
        }
    }
}

/// Display the outcome of each gate job.
pub fn display_gate_report(report: &GateReport) {
    println!("\n{}", style("Pull request gate:").bold());
    for job in &report.jobs {
        let status = if job.outcome.is_passed() {
            StageStatus::Succeeded
        } else {
            StageStatus::Failed(job.outcome.to_string())
        };
        println!(
            "{} ({:.1}s)",
            stage_line(job.kind.name(), &status),
            job.duration.as_secs_f64()
        );
    }
}
