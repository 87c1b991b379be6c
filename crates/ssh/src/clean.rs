use std::sync::LazyLock;

use regex::Regex;

/// CSI sequences, OSC strings and two-byte escapes.
static ESCAPES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\x1b(?:\[[0-9;?]*[ -/]*[@-~]|\][^\x07\x1b]*(?:\x07|\x1b\\)|[@-_])")
        .expect("valid escape pattern")
});

/// Strip terminal control sequences and blank lines from command output.
pub fn clean_output(raw: &str) -> String {
    let without_escapes = ESCAPES.replace_all(raw, "");
    let printable: String = without_escapes
        .chars()
        .filter(|c| !c.is_control() || matches!(c, '\n' | '\t'))
        .collect();

    printable
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Clean both streams and append stderr after stdout when both carry text.
pub fn combine_output(stdout: &str, stderr: &str) -> String {
    let out = clean_output(stdout);
    let err = clean_output(stderr);

    match (out.is_empty(), err.is_empty()) {
        (false, false) => format!("{out}\n{err}"),
        (true, _) => err,
        (false, true) => out,
    }
}
