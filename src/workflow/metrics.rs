//! Best-effort metrics scraped from the agent's final answer.
//!
//! These are heuristics over free text. A count of zero may just mean the
//! agent phrased its answer differently.

use std::sync::OnceLock;

use regex::Regex;

/// Longest error line kept from the agent's text.
const MAX_ERROR_LINE: usize = 200;

static TASK_COUNT: OnceLock<Option<Regex>> = OnceLock::new();
static PULL_REQUEST: OnceLock<Option<Regex>> = OnceLock::new();

fn task_count_pattern() -> Option<&'static Regex> {
    TASK_COUNT
        .get_or_init(|| Regex::new(r"(?i)\b(\d+)\s+tasks?\s+(?:processed|completed|handled)\b").ok())
        .as_ref()
}

fn pull_request_pattern() -> Option<&'static Regex> {
    PULL_REQUEST
        .get_or_init(|| Regex::new(r"(?i)pull request #(\d+)").ok())
        .as_ref()
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessingSummary {
    pub tasks_processed: usize,
    /// Pull requests mentioned as created, e.g. `PR #12`
    pub completed_tasks: Vec<String>,
    pub errors: Vec<String>,
    pub summary: String,
}

/// Task count from the first "<N> task(s) processed|completed|handled"; 0 if absent.
pub fn task_count(text: &str) -> usize {
    task_count_pattern()
        .and_then(|re| re.captures(text))
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0)
}

/// Every distinct "pull request #<N>", in order of first mention.
pub fn pull_requests(text: &str) -> Vec<String> {
    let Some(re) = pull_request_pattern() else {
        return Vec::new();
    };

    let mut found: Vec<String> = Vec::new();
    for caps in re.captures_iter(text) {
        let id = format!("PR #{}", &caps[1]);
        if !found.contains(&id) {
            found.push(id);
        }
    }
    found
}

/// One line describing the first mention of "error" or "failed", if any.
pub fn error_flag(text: &str) -> Option<String> {
    let line = text.lines().find(|line| {
        let lower = line.to_lowercase();
        lower.contains("error") || lower.contains("failed")
    })?;

    let line: String = line.trim().chars().take(MAX_ERROR_LINE).collect();
    Some(format!("Agent reported a problem: {}", line))
}

pub fn extract(text: &str) -> ProcessingSummary {
    ProcessingSummary {
        tasks_processed: task_count(text),
        completed_tasks: pull_requests(text),
        errors: error_flag(text).into_iter().collect(),
        summary: text.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_count_variants() {
        assert_eq!(task_count("Done. 1 task processed."), 1);
        assert_eq!(task_count("3 Tasks Completed today"), 3);
        assert_eq!(task_count("We handled it: 2 tasks handled"), 2);
        assert_eq!(task_count("Processed one task"), 0);
        assert_eq!(task_count(""), 0);
    }

    #[test]
    fn test_pull_requests_are_deduplicated() {
        let text = "Opened pull request #12. See Pull Request #12 and pull request #13.";
        assert_eq!(pull_requests(text), vec!["PR #12", "PR #13"]);
    }

    #[test]
    fn test_error_flag_keeps_first_matching_line() {
        let text = "Read the board.\nFailed to create branch: already exists\nerror again";
        assert_eq!(
            error_flag(text).as_deref(),
            Some("Agent reported a problem: Failed to create branch: already exists")
        );
        assert_eq!(error_flag("All good"), None);
    }

    // Substring matching cannot tell a negated mention from a real one, which
    // is why the system prompt tells the agent to stay silent on success.
    #[test]
    fn test_error_flag_matches_negated_mentions() {
        let clean = "1 task processed. Opened pull request #3.\nNo errors encountered.";
        assert_eq!(
            error_flag(clean).as_deref(),
            Some("Agent reported a problem: No errors encountered.")
        );

        let silent = "1 task processed. Opened pull request #3.";
        assert!(extract(silent).errors.is_empty());
    }

    #[test]
    fn test_extract_combines_heuristics() {
        let summary = extract("1 task processed. Created pull request #7 for \"Add dark mode\".");
        assert_eq!(summary.tasks_processed, 1);
        assert_eq!(summary.completed_tasks, vec!["PR #7"]);
        assert!(summary.errors.is_empty());
    }
}
