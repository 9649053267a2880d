//! Integration Test: Sleep Prohibition
//!
//! **Policy**: Production code MUST NOT call sleep methods. The client never
//! retries and never polls; it only waits on I/O and cancellation.
//! **Exceptions**: test code, periodic tasks driven by `tokio::time::interval`.

use std::fs;
use std::path::Path;

use architectural_enforcement::{code_part, is_in_test_function, rust_files, PRODUCTION_DIRS};

/// Test that production code does not contain sleep() calls
#[test]
fn test_no_sleep_in_production_code() {
    let violations = find_sleep_violations();

    if !violations.is_empty() {
        eprintln!("\n❌ CRITICAL: Sleep calls found in production code!\n");

        for violation in &violations {
            eprintln!("  ❌ {violation}");
        }

        eprintln!("\n✅ ACCEPTABLE:");
        eprintln!("  - Test code (#[test] or #[tokio::test] functions)");
        eprintln!("  - Periodic tasks using tokio::time::interval()");
        eprintln!("\n❌ FORBIDDEN:");
        eprintln!("  - Sleep in polling loops");
        eprintln!("  - Sleep as poor man's synchronization");
        eprintln!("  - Sleep to 'wait' for stream data (await the stream!)");

        panic!(
            "\nFound {} sleep violation(s) in production code.\nFix these before merging!",
            violations.len()
        );
    }
}

/// Find all sleep() calls in production code
fn find_sleep_violations() -> Vec<String> {
    let mut violations = Vec::new();
    for dir in PRODUCTION_DIRS {
        for file in rust_files(dir) {
            check_file(&file, &mut violations);
        }
    }
    violations
}

fn check_file(path: &Path, violations: &mut Vec<String>) {
    let Ok(content) = fs::read_to_string(path) else {
        return;
    };

    let lines: Vec<&str> = content.lines().collect();

    for (idx, line) in lines.iter().enumerate() {
        let code = code_part(line);
        if !is_sleep_call(code) {
            continue;
        }

        if is_in_test_function(&lines, idx) || is_interval_pattern(&lines, idx) {
            continue;
        }

        violations.push(format!("{}:{} - {}", path.display(), idx + 1, line.trim()));
    }
}

fn is_sleep_call(code: &str) -> bool {
    code.contains("::sleep(") || code.contains(".sleep(") || code.contains("sleep_until(")
}

/// Check if this is a tokio::time::interval pattern (acceptable for periodic tasks)
fn is_interval_pattern(lines: &[&str], current_idx: usize) -> bool {
    let start = current_idx.saturating_sub(20);
    let end = std::cmp::min(current_idx + 5, lines.len());

    lines[start..end]
        .iter()
        .any(|line| line.contains("interval.tick()") || line.contains("tokio::time::interval"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sleep_detection() {
        assert!(is_sleep_call("    tokio::time::sleep(Duration::from_millis(10)).await;"));
        assert!(is_sleep_call("    std::thread::sleep(delay);"));
        assert!(!is_sleep_call("    token.cancelled().await;"));
    }

    #[test]
    fn test_sleep_in_production_function_is_flagged() {
        let code = vec![
            "fn bad_function() {",
            "    tokio::time::sleep(Duration::from_millis(10)).await;",
            "}",
        ];
        assert!(!is_in_test_function(&code, 1));
        assert!(!is_interval_pattern(&code, 1));
    }

    #[test]
    fn test_interval_detection() {
        let code = vec![
            "let mut interval = tokio::time::interval(period);",
            "loop {",
            "    interval.tick().await;",
            "}",
        ];
        assert!(is_interval_pattern(&code, 2));
    }
}
