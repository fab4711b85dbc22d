//! Integration Test: Library Hygiene
//!
//! **Policy**: SDK library code propagates errors instead of panicking, and
//! never writes to stdout.

use architectural_enforcement::{
    code_part, invokes_macro, report, scan, LIBRARY_DIRS, PRODUCTION_DIRS,
};

#[test]
fn test_no_unwrap_or_expect_in_library_code() {
    let violations = scan(LIBRARY_DIRS, |lines, idx| {
        let code = code_part(lines[idx]);
        if code.contains(".unwrap()") {
            Some("unwrap() in library code")
        } else if code.contains(".expect(") {
            Some("expect() in library code")
        } else {
            None
        }
    });

    report("Panicking calls in library code", &violations);
}

#[test]
fn test_no_stdout_printing() {
    let violations = scan(PRODUCTION_DIRS, |lines, idx| {
        let code = code_part(lines[idx]);
        (invokes_macro(code, "println!") || invokes_macro(code, "print!"))
            .then_some("stdout printing (use tracing)")
    });

    report("Printing to stdout", &violations);
}
