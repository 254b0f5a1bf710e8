//! Hygiene: source rules for the canvas crate, checked at test time.
//!
//! The crate runs inside a browser tab. A panic there takes down the page and
//! a stray `borrow_mut` on the engine turns into a runtime `BorrowMutError`
//! inside a `requestAnimationFrame` callback, so both are policed here rather
//! than left to review. Rules scan production sources under `src/`; sibling
//! `*_test.rs` files and comment lines are ignored.

use std::fs;
use std::path::Path;

struct SourceFile {
    path: String,
    content: String,
}

impl SourceFile {
    /// Code lines with their 1-based numbers. Comment-only lines are skipped.
    fn code_lines(&self) -> impl Iterator<Item = (usize, &str)> {
        self.content
            .lines()
            .enumerate()
            .map(|(idx, line)| (idx + 1, line))
            .filter(|(_, line)| !line.trim_start().starts_with("//"))
    }

    fn file_name(&self) -> &str {
        Path::new(&self.path).file_name().and_then(|n| n.to_str()).unwrap_or_default()
    }
}

fn source_files() -> Vec<SourceFile> {
    let Ok(entries) = fs::read_dir("src") else {
        return Vec::new();
    };
    let mut files: Vec<SourceFile> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "rs"))
        .filter(|path| !path.to_string_lossy().ends_with("_test.rs"))
        .filter_map(|path| {
            let content = fs::read_to_string(&path).ok()?;
            Some(SourceFile { path: path.to_string_lossy().into_owned(), content })
        })
        .collect();
    files.sort_by(|a, b| a.path.cmp(&b.path));
    files
}

/// `pattern` may only appear in the listed files (empty: nowhere).
struct Rule {
    pattern: &'static str,
    allowed_in: &'static [&'static str],
    hint: &'static str,
}

const RULES: &[Rule] = &[
    Rule { pattern: ".unwrap()", allowed_in: &[], hint: "propagate or fall back" },
    Rule { pattern: ".expect(", allowed_in: &[], hint: "propagate or fall back" },
    Rule { pattern: "panic!(", allowed_in: &[], hint: "return an EngineError" },
    Rule { pattern: "unreachable!(", allowed_in: &[], hint: "make the state unrepresentable" },
    Rule { pattern: "todo!(", allowed_in: &[], hint: "finish it" },
    Rule { pattern: "unimplemented!(", allowed_in: &[], hint: "finish it" },
    Rule { pattern: "let _ =", allowed_in: &[], hint: "log the error" },
    Rule { pattern: ".ok()", allowed_in: &[], hint: "log the error" },
    Rule { pattern: "#[allow(dead_code)]", allowed_in: &[], hint: "delete it" },
    Rule {
        pattern: "CanvasRenderingContext2d",
        allowed_in: &["render.rs"],
        hint: "draw through the Surface trait",
    },
    Rule { pattern: "borrow_mut()", allowed_in: &["engine.rs"], hint: "only the render loop shares state" },
    Rule { pattern: "request_animation_frame", allowed_in: &["engine.rs"], hint: "use start_render_loop" },
    Rule { pattern: "Closure::", allowed_in: &["engine.rs"], hint: "closures leak unless the loop owns them" },
];

fn violations(files: &[SourceFile], rule: &Rule) -> Vec<String> {
    files
        .iter()
        .filter(|file| !rule.allowed_in.contains(&file.file_name()))
        .flat_map(|file| {
            file.code_lines()
                .filter(|(_, line)| line.contains(rule.pattern))
                .map(move |(n, line)| format!("  {}:{n}: {}", file.path, line.trim()))
        })
        .collect()
}

#[test]
fn source_rules_hold() {
    let files = source_files();
    assert!(!files.is_empty(), "no sources found; run from the canvas crate root");

    let report: Vec<String> = RULES
        .iter()
        .filter_map(|rule| {
            let hits = violations(&files, rule);
            (!hits.is_empty()).then(|| format!("`{}` ({}):\n{}", rule.pattern, rule.hint, hits.join("\n")))
        })
        .collect();
    assert!(report.is_empty(), "hygiene rules broken:\n{}", report.join("\n"));
}

const CASTS: &[&str] = &[" as f64", " as f32", " as i64", " as i32", " as u32", " as u8", " as usize"];

/// Numeric `as` casts must sit under a `#[allow(clippy::cast_*)]` within the
/// three preceding lines, so every lossy conversion is acknowledged in place.
#[test]
fn numeric_casts_are_acknowledged() {
    let files = source_files();
    let mut hits = Vec::new();

    for file in &files {
        let lines: Vec<&str> = file.content.lines().collect();
        for (n, line) in file.code_lines() {
            let casts = CASTS.iter().any(|cast| {
                line.match_indices(cast).any(|(at, _)| {
                    let rest = &line[at + cast.len()..];
                    !rest.starts_with(|c: char| c.is_alphanumeric() || c == '_')
                })
            });
            if !casts {
                continue;
            }
            let start = n.saturating_sub(4);
            let acknowledged = lines[start..n - 1].iter().any(|prev| prev.contains("#[allow(clippy::cast_"));
            if !acknowledged {
                hits.push(format!("  {}:{n}: {}", file.path, line.trim()));
            }
        }
    }

    assert!(hits.is_empty(), "unacknowledged numeric casts:\n{}", hits.join("\n"));
}
