//! Architectural Enforcement
//!
//! Source scanners shared by the integration tests in `tests/`:
//! - No blocking I/O inside async functions
//! - No `unwrap()` / `expect()` in SDK library code
//! - No stdout printing (the host may capture stdout; logs go to stderr)
//!
//! Scanning is line based. Everything from the first `#[cfg(test)]` in a
//! file onwards is treated as test code and skipped.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Source trees holding production code, relative to the workspace root
pub const PRODUCTION_DIRS: &[&str] = &["sdk/core/src", "sdk/clock-plugin/src"];

/// Source trees holding library code that must propagate errors
pub const LIBRARY_DIRS: &[&str] = &["sdk/core/src"];

/// One rule broken on one line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// File containing the violation
    pub path: PathBuf,
    /// 1-based line number
    pub line: usize,
    /// Short rule description
    pub rule: &'static str,
    /// Offending source line, trimmed
    pub text: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{} - {}: {}",
            self.path.display(),
            self.line,
            self.rule,
            self.text
        )
    }
}

/// Workspace root, derived from this crate's location
#[must_use]
pub fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../..")
}

/// All `.rs` files under `dir`
#[must_use]
pub fn rust_files(dir: &Path) -> Vec<PathBuf> {
    walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.path().extension().and_then(|s| s.to_str()) == Some("rs"))
        .map(walkdir::DirEntry::into_path)
        .collect()
}

/// Lines before the first `#[cfg(test)]`
#[must_use]
pub fn production_lines(content: &str) -> Vec<&str> {
    content
        .lines()
        .take_while(|line| !line.trim_start().starts_with("#[cfg(test)]"))
        .collect()
}

/// The line with any trailing `//` comment removed; empty for comment lines
#[must_use]
pub fn code_part(line: &str) -> &str {
    let trimmed = line.trim_start();
    if trimmed.starts_with("//") {
        return "";
    }
    line.split("//").next().unwrap_or(line)
}

/// Whether `line` declares a function (any visibility, async or not)
#[must_use]
pub fn is_fn_signature(line: &str) -> bool {
    let code = code_part(line).trim_start();
    code.starts_with("fn ") || code.contains(" fn ")
}

/// Whether the nearest function signature above `idx` is `async`
///
/// Returns `None` when no signature is found (module level code).
#[must_use]
pub fn enclosing_fn_is_async(lines: &[&str], idx: usize) -> Option<bool> {
    lines[..=idx]
        .iter()
        .rev()
        .find(|line| is_fn_signature(line))
        .map(|line| code_part(line).contains("async fn "))
}

/// Whether `code` invokes the macro `name` (e.g. `"println!"`) as a whole word
#[must_use]
pub fn invokes_macro(code: &str, name: &str) -> bool {
    code.match_indices(name).any(|(pos, _)| {
        code[..pos]
            .chars()
            .next_back()
            .map_or(true, |c| !(c.is_alphanumeric() || c == '_'))
    })
}

/// Run `rule` over the production lines of every file under `dirs`
///
/// `rule` gets the file's production lines and an index, and returns a
/// rule description when the line violates it.
///
/// # Panics
///
/// Panics if one of `dirs` does not exist, so a moved tree cannot make a
/// scan pass vacuously.
pub fn scan<F>(dirs: &[&str], rule: F) -> Vec<Violation>
where
    F: Fn(&[&str], usize) -> Option<&'static str>,
{
    let root = workspace_root();
    let mut violations = Vec::new();

    for dir in dirs {
        let path = root.join(dir);
        assert!(path.is_dir(), "scanned directory {} is missing", path.display());

        for file in rust_files(&path) {
            let Ok(content) = fs::read_to_string(&file) else {
                continue;
            };
            let lines = production_lines(&content);
            for idx in 0..lines.len() {
                if let Some(description) = rule(&lines, idx) {
                    violations.push(Violation {
                        path: file.clone(),
                        line: idx + 1,
                        rule: description,
                        text: lines[idx].trim().to_string(),
                    });
                }
            }
        }
    }

    violations
}

/// Panic listing every violation, if there are any
///
/// # Panics
///
/// Panics when `violations` is not empty.
pub fn report(title: &str, violations: &[Violation]) {
    if violations.is_empty() {
        return;
    }
    for violation in violations {
        eprintln!("  ❌ {violation}");
    }
    panic!("\n{title}: {} violation(s)", violations.len());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enclosing_fn_detection() {
        let lines = [
            "pub fn load() -> Config {",
            "    std::fs::read_to_string(path)",
            "}",
            "pub(crate) async fn serve(&self) {",
            "    std::fs::read_to_string(path)",
            "}",
        ];
        assert_eq!(enclosing_fn_is_async(&lines, 1), Some(false));
        assert_eq!(enclosing_fn_is_async(&lines, 4), Some(true));
        assert_eq!(enclosing_fn_is_async(&["use std::fs;"], 0), None);
    }

    #[test]
    fn test_production_lines_stop_at_test_module() {
        let content = "fn a() {}\n#[cfg(test)]\nmod tests { fn b() { x.unwrap(); } }\n";
        assert_eq!(production_lines(content), vec!["fn a() {}"]);
    }

    #[test]
    fn test_comments_are_ignored() {
        assert_eq!(code_part("    // x.unwrap()"), "");
        assert_eq!(code_part("let a = 1; // x.unwrap()"), "let a = 1; ");
        assert!(!is_fn_signature("/// Calls fn foo"));
    }

    #[test]
    fn test_macro_word_boundary() {
        assert!(invokes_macro("println!(\"x\")", "println!"));
        assert!(!invokes_macro("eprintln!(\"x\")", "println!"));
        assert!(invokes_macro("{ print!(\"x\") }", "print!"));
    }
}
