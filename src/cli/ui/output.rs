use console::style;

use crate::service::{ReportOutcome, RunSummary};

/// Styled terminal output for command results
#[derive(Debug, Default)]
pub struct Output;

impl Output {
    pub fn new() -> Self {
        Self
    }

    pub fn success(&self, message: &str) {
        println!("{} {}", style("✓").green(), message);
    }

    pub fn failure(&self, message: &str) {
        eprintln!("{} {}", style("✗").red(), message);
    }

    pub fn note(&self, message: &str) {
        println!("  {}", style(message).dim());
    }

    pub fn heading(&self, message: &str) {
        println!("\n{}", style(message).bold().underlined());
    }

    pub fn outcome(&self, outcome: &ReportOutcome) {
        match &outcome.result {
            Ok(report) => {
                self.success(&outcome.request);
                self.note(&format!("report: {}", report.path.display()));
                self.note(&format!(
                    "charts: {}, model calls: {}, tokens: {}",
                    report.images.len(),
                    report.api_calls,
                    report.total_tokens
                ));
            }
            Err(e) => {
                self.failure(&outcome.request);
                self.note(&e.to_string());
            }
        }
        if outcome.attempts > 1 {
            self.note(&format!("attempts: {}", outcome.attempts));
        }
        if !outcome.delivered {
            self.note("notification not delivered");
        }
    }

    pub fn summary(&self, summary: &RunSummary) {
        self.heading("Run summary");
        for outcome in &summary.outcomes {
            self.outcome(outcome);
        }
        println!(
            "\n{} succeeded, {} failed",
            style(summary.succeeded()).green(),
            style(summary.failed()).red()
        );
    }
}
