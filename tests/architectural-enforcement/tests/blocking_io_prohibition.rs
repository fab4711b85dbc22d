//! Integration Test: Blocking I/O Prohibition
//!
//! **Policy**: async code in the SDK and plugins MUST NOT block the runtime.
//! A blocked worker thread stalls the receive loop and every background task
//! sharing it.
//! **Required**: `tokio::fs`, `tokio::net`, `tokio::process`, `tokio::time::sleep`
//!
//! Blocking calls in plain `fn`s (config loading before the runtime starts)
//! are acceptable.

use architectural_enforcement::{code_part, enclosing_fn_is_async, report, scan, PRODUCTION_DIRS};

const BLOCKING_CALLS: &[(&str, &str)] = &[
    ("std::fs::", "Blocking file I/O"),
    ("std::net::", "Blocking network I/O"),
    ("std::process::Command", "Blocking process I/O"),
    ("std::thread::sleep", "Blocking sleep"),
    ("std::io::stdin()", "Blocking stdin"),
];

#[test]
fn test_no_blocking_io_in_async_code() {
    let violations = scan(PRODUCTION_DIRS, |lines, idx| {
        let code = code_part(lines[idx]);
        let (_, rule) = BLOCKING_CALLS
            .iter()
            .find(|(pattern, _)| code.contains(pattern))?;

        match enclosing_fn_is_async(lines, idx) {
            Some(true) => Some(*rule),
            _ => None,
        }
    });

    report("Blocking I/O inside async code", &violations);
}

#[test]
fn test_no_std_net_imports() {
    // Imports are module level, so check them regardless of context
    let violations = scan(PRODUCTION_DIRS, |lines, idx| {
        let code = code_part(lines[idx]).trim_start();
        (code.starts_with("use std::net") || code.starts_with("use std::os::unix::net"))
            .then_some("Blocking socket import")
    });

    report("Blocking socket imports", &violations);
}
