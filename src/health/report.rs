//! Aggregated health of one evaluation and its plugin output.

use std::fmt::Write;

use super::perfdata::PerfdataList;
use super::severity::{HealthResult, Severity};

/// Results of all evaluated rules, in evaluation order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HealthReport {
    results: Vec<HealthResult>,
}

impl HealthReport {
    pub fn new(results: Vec<HealthResult>) -> Self {
        Self { results }
    }

    pub fn push(&mut self, result: HealthResult) {
        self.results.push(result);
    }

    pub fn results(&self) -> &[HealthResult] {
        &self.results
    }

    /// Overall status: the worst severity of any rule.
    pub fn status(&self) -> Severity {
        Severity::worst(self.results.iter().map(|r| r.severity))
    }

    /// Plugin exit status of the overall result.
    pub fn exit_code(&self) -> u8 {
        self.status().code()
    }

    /// One-line verdict naming the first result of the worst severity.
    pub fn summary(&self) -> String {
        let status = self.status();
        let first = self.results.iter().find(|r| r.severity == status);

        match (status, first) {
            (Severity::Critical, Some(result)) => {
                format!("CRITICAL - Logstash is unhealthy - {}", result)
            }
            (Severity::Warning, Some(result)) => {
                format!("WARNING - Logstash may not be healthy - {}", result)
            }
            _ => "OK - Logstash seems to be doing fine.".to_string(),
        }
    }

    /// Results ordered from most to least severe; ties keep evaluation order.
    pub fn sorted(&self) -> Vec<&HealthResult> {
        let mut sorted: Vec<&HealthResult> = self.results.iter().collect();
        sorted.sort_by(|a, b| b.severity.cmp(&a.severity));
        sorted
    }

    /// Full plugin output: the summary with perfdata, then one line per rule.
    pub fn render(&self, perfdata: &PerfdataList) -> String {
        let mut out = format!("{} | {}\n", self.summary(), perfdata);
        for result in self.sorted() {
            let _ = writeln!(out, "{}", result);
        }
        out
    }
}
