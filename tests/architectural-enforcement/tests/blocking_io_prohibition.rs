//! Integration Test: Blocking I/O Prohibition
//!
//! **Policy**: Async code in the production crates MUST NOT use blocking I/O.
//! **Required**: `tokio::io`, `tokio::fs`, async `reqwest`; never
//! `reqwest::blocking` or `std::io::stdin()` inside an async function.
//! Blocking reads in plain functions (config loading before the first
//! request) are acceptable.

use std::fs;
use std::path::Path;

use architectural_enforcement::{
    code_part, is_in_async_function, is_in_test_function, rust_files, PRODUCTION_DIRS,
};

/// Test that production code does not use blocking I/O in async context
#[test]
fn test_no_blocking_io_in_production_code() {
    let violations = find_blocking_io_violations();

    if !violations.is_empty() {
        eprintln!("\n❌ CRITICAL: Blocking I/O calls found in async production code!\n");

        for violation in &violations {
            eprintln!("  ❌ {violation}");
        }

        eprintln!("\n❌ FORBIDDEN in async functions:");
        eprintln!("  - std::fs::*, std::net::*, std::process::Command");
        eprintln!("  - std::io::stdin(), std::io::stdout()");
        eprintln!("  - reqwest::blocking::*");
        eprintln!("\n✅ REQUIRED async I/O:");
        eprintln!("  - tokio::io::stdin() with AsyncBufReadExt");
        eprintln!("  - tokio::io::stdout() with AsyncWriteExt");
        eprintln!("  - reqwest::Client (async)");

        panic!(
            "\nFound {} blocking I/O violation(s) in production code.\nFix these before merging!",
            violations.len()
        );
    }
}

/// Find all blocking I/O calls in production code
fn find_blocking_io_violations() -> Vec<String> {
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

        // Never acceptable, async or not
        if code.contains("reqwest::blocking") {
            violations.push(format!(
                "{}:{} - Blocking HTTP client: {}",
                path.display(),
                idx + 1,
                line.trim()
            ));
            continue;
        }

        let Some(kind) = blocking_kind(code) else {
            continue;
        };

        if is_in_test_function(&lines, idx) || !is_in_async_function(&lines, idx) {
            continue;
        }

        violations.push(format!(
            "{}:{} - {kind} in async: {}",
            path.display(),
            idx + 1,
            line.trim()
        ));
    }
}

/// Classify a blocking call on a code line
fn blocking_kind(code: &str) -> Option<&'static str> {
    if code.contains("std::fs::") {
        Some("Blocking file I/O")
    } else if code.contains("std::net::") {
        Some("Blocking network I/O")
    } else if code.contains("std::process::Command") {
        Some("Blocking process I/O")
    } else if code.contains("std::io::stdin()") || code.contains("std::io::stdout()") {
        Some("Blocking stdin/stdout")
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blocking_io_detection() {
        let code = vec![
            "async fn bad_function() {",
            "    let contents = std::fs::read_to_string(\"file.txt\")?;",
            "}",
        ];
        assert_eq!(blocking_kind(code[1]), Some("Blocking file I/O"));
        assert!(is_in_async_function(&code, 1));
    }

    #[test]
    fn test_non_async_function_is_acceptable() {
        let code = vec![
            "fn load_file_layer(path: PathBuf) -> Result<ChatConfig, ConfigError> {",
            "    let contents = std::fs::read_to_string(&path)?;",
            "}",
        ];
        assert!(!is_in_async_function(&code, 1));
    }

    #[test]
    fn test_async_stdio_is_not_flagged() {
        assert_eq!(blocking_kind("let out = tokio::io::stdout();"), None);
        assert_eq!(blocking_kind(".with_writer(std::io::stderr)"), None);
    }
}
