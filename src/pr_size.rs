//! Pull request size gate over `git diff --stat` output.

use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;
use serde::Serialize;
use tokio::process::Command;

pub const DEFAULT_MAX_FILES: usize = 10;
pub const DEFAULT_MAX_LINES: usize = 500;

/// `path | 12 ++++----` or `path | Bin 0 -> 1024 bytes`
static FILE_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(.+?)\s+\|\s+(?:(\d+)\s*([+-]*)|Bin\b.*)$").unwrap());

/// ` 3 files changed, 40 insertions(+), 2 deletions(-)`
static SUMMARY_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+) files? changed(?:, (\d+) insertions?\(\+\))?(?:, (\d+) deletions?\(-\))?").unwrap()
});

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiffStat {
    pub files: Vec<String>,
    pub additions: usize,
    pub deletions: usize,
}

impl DiffStat {
    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    pub fn total_lines(&self) -> usize {
        self.additions + self.deletions
    }
}

/// Parse `--stat` text.
///
/// Exact counts come from the trailing summary line when present. Without
/// it, each file's change count is split by the ratio of its `+`/`-` marks.
pub fn parse_stat(text: &str) -> DiffStat {
    let mut stat = DiffStat::default();
    let mut summary = None;

    for line in text.lines() {
        if let Some(caps) = FILE_LINE.captures(line) {
            stat.files.push(caps[1].trim().to_string());
            let Some(count) = caps.get(2).and_then(|m| m.as_str().parse::<usize>().ok()) else {
                continue;
            };
            let marks = caps.get(3).map_or("", |m| m.as_str());
            let plus = marks.matches('+').count();
            let minus = marks.matches('-').count();
            let added = if plus + minus == 0 {
                count
            } else {
                count * plus / (plus + minus)
            };
            stat.additions += added;
            stat.deletions += count - added;
        } else if let Some(caps) = SUMMARY_LINE.captures(line) {
            let num = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<usize>().ok()).unwrap_or(0);
            summary = Some((num(2), num(3)));
        }
    }

    if let Some((additions, deletions)) = summary {
        stat.additions = additions;
        stat.deletions = deletions;
    }
    stat
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SizeLimits {
    pub max_files: usize,
    pub max_lines: usize,
}

impl Default for SizeLimits {
    fn default() -> Self {
        Self {
            max_files: DEFAULT_MAX_FILES,
            max_lines: DEFAULT_MAX_LINES,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SizeVerdict {
    pub stat: DiffStat,
    pub limits: SizeLimits,
    pub too_many_files: bool,
    pub too_many_lines: bool,
}

impl SizeVerdict {
    pub fn passed(&self) -> bool {
        !self.too_many_files && !self.too_many_lines
    }
}

pub fn check(stat: DiffStat, limits: SizeLimits) -> SizeVerdict {
    SizeVerdict {
        too_many_files: stat.file_count() > limits.max_files,
        too_many_lines: stat.total_lines() > limits.max_lines,
        stat,
        limits,
    }
}

/// Run `gh pr diff <number> --stat` in `dir`.
pub async fn fetch_pr_stat(number: u64, dir: &std::path::Path) -> Result<String> {
    let output = Command::new("gh")
        .args(["pr", "diff", &number.to_string(), "--stat"])
        .current_dir(dir)
        .output()
        .await
        .context("Failed to run 'gh pr diff'. Is the GitHub CLI installed?")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("gh pr diff failed for PR #{}: {}", number, stderr.trim());
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    const STAT: &str = " src/lib.rs       | 12 ++++++++----\n \
                         src/main.rs      |  3 +++\n \
                         assets/logo.png  | Bin 0 -> 2048 bytes\n \
                         3 files changed, 11 insertions(+), 4 deletions(-)\n";

    #[test]
    fn test_parse_stat_with_summary() {
        let stat = parse_stat(STAT);
        assert_eq!(stat.file_count(), 3);
        assert_eq!(stat.files[2], "assets/logo.png");
        assert_eq!(stat.additions, 11);
        assert_eq!(stat.deletions, 4);
        assert_eq!(stat.total_lines(), 15);
    }

    #[test]
    fn test_parse_stat_without_summary_uses_marks() {
        let stat = parse_stat(" a.rs | 10 +++++-----\n b.rs | 4 ++++\n");
        assert_eq!(stat.file_count(), 2);
        assert_eq!(stat.additions, 9);
        assert_eq!(stat.deletions, 5);
    }

    #[test]
    fn test_parse_empty_stat() {
        assert_eq!(parse_stat(""), DiffStat::default());
    }

    #[test]
    fn test_single_file_summary() {
        let stat = parse_stat(" x | 1 +\n 1 file changed, 1 insertion(+)\n");
        assert_eq!(stat.additions, 1);
        assert_eq!(stat.deletions, 0);
    }

    #[test]
    fn test_check_within_limits() {
        let verdict = check(parse_stat(STAT), SizeLimits::default());
        assert!(verdict.passed());
    }

    #[test]
    fn test_check_too_many_files() {
        let stat = DiffStat {
            files: (0..11).map(|i| format!("f{}.rs", i)).collect(),
            additions: 11,
            deletions: 0,
        };
        let verdict = check(stat, SizeLimits::default());
        assert!(verdict.too_many_files);
        assert!(!verdict.too_many_lines);
        assert!(!verdict.passed());
    }

    #[test]
    fn test_check_too_many_lines_at_boundary() {
        let at_limit = DiffStat {
            files: vec!["a".into()],
            additions: 300,
            deletions: 200,
        };
        assert!(check(at_limit.clone(), SizeLimits::default()).passed());

        let over = DiffStat {
            deletions: 201,
            ..at_limit
        };
        assert!(check(over, SizeLimits::default()).too_many_lines);
    }
}
