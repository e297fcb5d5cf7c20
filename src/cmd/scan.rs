//! `shipyard scan`: secret and risky-code scan with a JSON report.

use std::path::Path;

use anyhow::Result;
use console::style;
use shipyard::config::ShipyardConfig;
use shipyard::scan::Severity;

use super::Verdict;

pub fn cmd_scan(project_dir: &Path, path: Option<&Path>) -> Result<Verdict> {
    let config = ShipyardConfig::new(project_dir.to_path_buf())?;
    let root = path.unwrap_or(config.project_dir.as_path());

    let report = config.toml.scanner().scan(root)?;
    let report_path = config.scan_report_path();
    report.save(&report_path)?;

    for finding in &report.issues {
        let tag = match finding.severity {
            Severity::Critical => style("CRITICAL").red().bold(),
            Severity::High => style("HIGH").red(),
            Severity::Warning => style("WARNING").yellow(),
        };
        println!("{} {}:{} {}", tag, finding.file, finding.line, finding.message);
    }

    let s = &report.summary;
    println!(
        "{} findings ({} critical, {} high, {} warning)",
        s.total, s.critical, s.high, s.warning
    );
    println!("Report written to {}", report_path.display());

    if report.passed {
        println!("{} No findings at or above '{}'", style("✓").green(), report.fail_on.as_str());
    } else {
        println!("{} Findings at or above '{}'", style("✗").red(), report.fail_on.as_str());
    }

    Ok(Verdict::from_passed(report.passed))
}
