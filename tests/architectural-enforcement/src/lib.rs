//! Architectural Enforcement Integration Tests
//!
//! This package contains integration tests that enforce architectural principles
//! on the production crates:
//! - No sleep() calls (nothing here retries or polls)
//! - No blocking I/O inside async functions
//! - No `unwrap()`/`expect()` outside test modules
//! - The core crate stays free of terminal and CLI dependencies
//!
//! The helpers below are line-based heuristics, not a Rust parser. They are
//! tuned to the formatting rustfmt produces.

use std::path::{Path, PathBuf};

/// Production source directories, relative to the workspace root
pub const PRODUCTION_DIRS: &[&str] = &["chat/core/src", "chat/cli/src"];

/// Root of the workspace this package lives in
#[must_use]
pub fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../..")
}

/// All `.rs` files under `dir` (relative to the workspace root)
#[must_use]
pub fn rust_files(dir: &str) -> Vec<PathBuf> {
    let path = workspace_root().join(dir);
    if !path.exists() {
        return Vec::new();
    }

    walkdir::WalkDir::new(path)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().and_then(|s| s.to_str()) == Some("rs"))
        .map(|e| e.into_path())
        .collect()
}

/// The part of a line before any `//` comment
#[must_use]
pub fn code_part(line: &str) -> &str {
    line.split("//").next().unwrap_or(line)
}

/// Index of the first line of the `#[cfg(test)]` module, if any
///
/// Test modules sit at the end of each file, so everything from here on is
/// test code.
#[must_use]
pub fn test_module_start(lines: &[&str]) -> Option<usize> {
    lines
        .iter()
        .position(|line| line.trim().starts_with("#[cfg(test)]"))
}

fn is_fn_line(line: &str) -> bool {
    line.starts_with("fn ")
        || line.starts_with("pub fn ")
        || line.starts_with("pub(crate) fn ")
        || line.contains(" fn ")
}

/// Check if line is inside a test function
#[must_use]
pub fn is_in_test_function(lines: &[&str], current_idx: usize) -> bool {
    if test_module_start(lines).is_some_and(|start| current_idx > start) {
        return true;
    }

    // Scan backwards to find the enclosing function
    let mut found_fn_idx = None;
    for i in (0..current_idx).rev() {
        let line = lines[i].trim();

        if is_fn_line(line) {
            found_fn_idx = Some(i);
            break;
        }

        // Stop at module boundaries
        if line.starts_with("mod ") || (line.starts_with("impl ") && line.contains('{')) {
            return false;
        }
    }

    // If we found a function, check if it has a test marker
    if let Some(fn_idx) = found_fn_idx {
        for i in (0..fn_idx).rev() {
            let line = lines[i].trim();

            if line.starts_with("#[test]") || line.starts_with("#[tokio::test") {
                return true;
            }

            // Stop if we hit another function or boundary
            if is_fn_line(line) || line.starts_with("mod ") || line.starts_with("impl ") {
                break;
            }
        }
    }

    false
}

/// Check if line is inside an async function
#[must_use]
pub fn is_in_async_function(lines: &[&str], current_idx: usize) -> bool {
    for i in (0..current_idx).rev() {
        let line = lines[i].trim();

        if line.contains("async fn ") {
            return true;
        }

        if is_fn_line(line) {
            return false;
        }

        // Stop at module/impl boundaries
        if line.starts_with("mod ") || (line.starts_with("impl ") && line.contains('{')) {
            return false;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_async_function_detection() {
        let code = vec![
            "pub async fn load() {",
            "    let contents = std::fs::read_to_string(\"file.txt\")?;",
            "}",
        ];
        assert!(is_in_async_function(&code, 1));

        let code = vec![
            "fn load_file_layer() {",
            "    let contents = std::fs::read_to_string(\"config.toml\")?;",
            "}",
        ];
        assert!(!is_in_async_function(&code, 1));
    }

    #[test]
    fn test_test_function_detection() {
        let code = vec![
            "#[tokio::test]",
            "async fn test_something() {",
            "    client.send_message(\"x\").await.unwrap();",
            "}",
        ];
        assert!(is_in_test_function(&code, 2));

        let code = vec![
            "fn production() {}",
            "#[cfg(test)]",
            "mod tests {",
            "    fn helper() { value.unwrap(); }",
            "}",
        ];
        assert!(is_in_test_function(&code, 3));
        assert!(!is_in_test_function(&code, 0));
    }

    #[test]
    fn test_code_part_strips_comments() {
        assert_eq!(code_part("let x = 1; // sleep(1)"), "let x = 1; ");
    }

    #[test]
    fn test_workspace_root_contains_core() {
        assert!(workspace_root().join("chat/core/Cargo.toml").exists());
    }
}
