//! Integration Test: Panics and Dependency Direction
//!
//! **Policy**:
//! - Production code propagates errors; `unwrap()` and `expect()` appear only
//!   in test modules.
//! - `chat-core` is headless: no terminal, TUI or CLI-parsing crates.

use std::fs;

use architectural_enforcement::{
    code_part, is_in_test_function, rust_files, workspace_root, PRODUCTION_DIRS,
};

/// Crates the core library must never depend on
const UI_CRATES: &[&str] = &["ratatui", "crossterm", "clap", "termion"];

#[test]
fn test_no_unwrap_in_production_code() {
    let mut violations = Vec::new();

    for dir in PRODUCTION_DIRS {
        for file in rust_files(dir) {
            let Ok(content) = fs::read_to_string(&file) else {
                continue;
            };
            let lines: Vec<&str> = content.lines().collect();

            for (idx, line) in lines.iter().enumerate() {
                if line.trim_start().starts_with("//") {
                    continue;
                }
                let code = code_part(line);
                if !(code.contains(".unwrap()") || code.contains(".expect(")) {
                    continue;
                }
                if is_in_test_function(&lines, idx) {
                    continue;
                }
                violations.push(format!("{}:{} - {}", file.display(), idx + 1, line.trim()));
            }
        }
    }

    assert!(
        violations.is_empty(),
        "unwrap()/expect() in production code:\n  {}",
        violations.join("\n  ")
    );
}

#[test]
fn test_core_has_no_ui_dependencies() {
    let manifest = workspace_root().join("chat/core/Cargo.toml");
    let content = fs::read_to_string(&manifest).unwrap();

    let offenders: Vec<&str> = UI_CRATES
        .iter()
        .copied()
        .filter(|krate| {
            content
                .lines()
                .any(|line| line.trim_start().starts_with(&format!("{krate} ")))
        })
        .collect();

    assert!(
        offenders.is_empty(),
        "chat-core must stay headless, found: {offenders:?}"
    );
}
