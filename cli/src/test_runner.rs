use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use readme::parser::{DEFAULT_TAG, Parser};
use readme::{Command, SubstitutionContext};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TestConfig {
    /// Human-readable test description.
    #[serde(default)]
    pub description: Option<String>,

    /// Deployment target name substituted into deploy commands.
    #[serde(default)]
    pub service: String,

    /// Image reference substituted for registry references.
    #[serde(default)]
    pub image: String,

    /// Code tag payload. Defaults to `sst-run-unix`.
    #[serde(default = "default_tag")]
    pub tag: String,

    /// Environment visible to `${NAME}` expansion. Nothing else is visible.
    #[serde(default)]
    pub env: BTreeMap<String, String>,

    /// Expected lifecycle, one argv per command.
    #[serde(default)]
    pub expect_commands: Option<Vec<Vec<String>>>,

    /// Expected parse error: its name (e.g. `CodeBlockNotClosed`) or a
    /// substring of its message.
    #[serde(default)]
    pub expect_error: Option<String>,
}

fn default_tag() -> String {
    DEFAULT_TAG.to_string()
}

/// Split a `.test.md` file into its TOML config and Markdown body.
fn parse_test_file(content: &str) -> Result<(TestConfig, &str), String> {
    let content = content.trim_start_matches('\u{feff}');

    let after_open = content
        .strip_prefix("---")
        .ok_or("missing opening --- frontmatter delimiter")?;
    let after_open = after_open
        .strip_prefix('\n')
        .or_else(|| after_open.strip_prefix("\r\n"))
        .unwrap_or(after_open);

    let close_pos = after_open
        .find("\n---")
        .ok_or("missing closing --- frontmatter delimiter")?;

    let toml_str = after_open[..close_pos].trim_end_matches('\r');
    let rest = &after_open[close_pos + 4..];
    let body = rest
        .strip_prefix("\r\n")
        .or_else(|| rest.strip_prefix('\n'))
        .unwrap_or(rest);

    let config: TestConfig =
        toml::from_str(toml_str).map_err(|e| format!("TOML parse error: {}", e))?;

    Ok((config, body))
}

fn argv(command: &Command) -> Vec<String> {
    std::iter::once(command.name().to_string())
        .chain(command.args().iter().cloned())
        .collect()
}

fn render(commands: &[Vec<String>]) -> String {
    if commands.is_empty() {
        return "    (none)".to_string();
    }
    commands
        .iter()
        .map(|c| format!("    {}", c.join(" ")))
        .collect::<Vec<_>>()
        .join("\n")
}

pub enum TestOutcome {
    Pass,
    Fail(String),
}

pub struct TestResult {
    pub path: PathBuf,
    pub description: Option<String>,
    pub outcome: TestOutcome,
}

fn run_single_test(path: &Path) -> TestResult {
    let fail = |description: Option<String>, reason: String| TestResult {
        path: path.to_path_buf(),
        description,
        outcome: TestOutcome::Fail(reason),
    };

    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => return fail(None, format!("cannot read file: {}", e)),
    };

    let (config, body) = match parse_test_file(&content) {
        Ok(pair) => pair,
        Err(e) => return fail(None, format!("frontmatter error: {}", e)),
    };
    let description = config.description.clone();

    let ctx = SubstitutionContext::new(&config.service, &config.image).with_env(&config.env);
    let result = Parser::with_tag(&config.tag).lifecycle(body.lines(), &ctx);

    let failure = match (&config.expect_error, &config.expect_commands, result) {
        (Some(expected), _, Err(err)) => {
            if err.name() == expected.as_str() || err.to_string().contains(expected.as_str()) {
                None
            } else {
                Some(format!(
                    "expected error \"{}\", got {}: {}",
                    expected,
                    err.name(),
                    err
                ))
            }
        }
        (Some(expected), _, Ok(_)) => Some(format!(
            "expected error \"{}\", but parsing succeeded",
            expected
        )),
        (None, _, Err(err)) => Some(format!("unexpected error {}: {}", err.name(), err)),
        (None, Some(expected), Ok(lifecycle)) => {
            let actual: Vec<Vec<String>> = lifecycle.iter().map(argv).collect();
            if &actual == expected {
                None
            } else {
                Some(format!(
                    "lifecycle mismatch\n  expected:\n{}\n  actual:\n{}",
                    render(expected),
                    render(&actual)
                ))
            }
        }
        (None, None, Ok(_)) => None,
    };

    match failure {
        Some(reason) => fail(description, reason),
        None => TestResult {
            path: path.to_path_buf(),
            description,
            outcome: TestOutcome::Pass,
        },
    }
}

/// Discover `.test.md` files grouped by category (subfolder relative to root).
/// Files directly in `root` get category "" (uncategorized).
fn discover_categorized(root: &Path) -> BTreeMap<String, Vec<PathBuf>> {
    let mut categories: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
    collect_tests(root, root, &mut categories);
    for files in categories.values_mut() {
        files.sort();
    }
    categories
}

fn collect_tests(dir: &Path, root: &Path, out: &mut BTreeMap<String, Vec<PathBuf>>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_tests(&path, root, out);
        } else if path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.ends_with(".test.md"))
        {
            let category = path
                .parent()
                .and_then(|p| p.strip_prefix(root).ok())
                .map(|p| p.to_string_lossy().replace('\\', "/"))
                .unwrap_or_default();
            out.entry(category).or_default().push(path);
        }
    }
}

/// List available categories for the given test path.
pub fn list_categories(path: &Path) {
    if path.is_file() {
        eprintln!("(single file, no categories)");
        return;
    }

    let categories = discover_categorized(path);
    if categories.is_empty() {
        eprintln!("no .test.md files found in {}", path.display());
        return;
    }

    eprintln!("available categories:");
    for (cat, files) in &categories {
        let label = if cat.is_empty() { "(root)" } else { cat.as_str() };
        eprintln!("  {} ({} tests)", label, files.len());
    }
}

fn paint(s: &str, code: &str, no_color: bool) -> String {
    if no_color {
        s.to_string()
    } else {
        format!("\x1b[{}m{}\x1b[0m", code, s)
    }
}

fn label_for(result: &TestResult) -> &str {
    result.description.as_deref().unwrap_or_else(|| {
        result
            .path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("?")
    })
}

/// Run all `.test.md` files under `path` (or a single file).
/// If `categories` is non-empty, only run tests in those categories.
/// Returns exit code: 0 = all pass, 1 = any failure.
pub fn run_tests(path: &Path, no_color: bool, categories: &[String]) -> i32 {
    let selected: BTreeMap<String, Vec<PathBuf>> = if path.is_file() {
        BTreeMap::from([(String::new(), vec![path.to_path_buf()])])
    } else {
        let all = discover_categorized(path);
        if all.is_empty() {
            eprintln!("no .test.md files found in {}", path.display());
            return 1;
        }
        if categories.is_empty() {
            all
        } else {
            select_categories(all, categories)
        }
    };

    if selected.is_empty() {
        eprintln!("no matching categories found");
        return 1;
    }

    let mut passed = 0usize;
    let mut failures: Vec<TestResult> = Vec::new();

    for (cat, files) in &selected {
        eprintln!();
        eprintln!("{}", paint(if cat.is_empty() { "(root)" } else { cat.as_str() }, "1", no_color));

        for file in files {
            let result = run_single_test(file);
            match &result.outcome {
                TestOutcome::Pass => {
                    passed += 1;
                    eprintln!("  {}  {}", paint("PASS", "32", no_color), label_for(&result));
                }
                TestOutcome::Fail(_) => {
                    eprintln!("  {}  {}", paint("FAIL", "31", no_color), label_for(&result));
                    failures.push(result);
                }
            }
        }
    }

    if !failures.is_empty() {
        eprintln!();
        eprintln!("failures:");
        for f in &failures {
            eprintln!();
            eprintln!("  --- {} ---", f.path.display());
            if let TestOutcome::Fail(reason) = &f.outcome {
                for line in reason.lines() {
                    eprintln!("  {}", line);
                }
            }
        }
    }

    eprintln!();
    let failed = failures.len();
    if failed == 0 {
        eprintln!("test result: {}. {} passed, 0 failed", paint("ok", "32", no_color), passed);
        0
    } else {
        eprintln!(
            "test result: {}. {} passed, {} failed (of {})",
            paint("FAILED", "31", no_color),
            passed,
            failed,
            passed + failed
        );
        1
    }
}

fn select_categories(
    all: BTreeMap<String, Vec<PathBuf>>,
    requested: &[String],
) -> BTreeMap<String, Vec<PathBuf>> {
    let mut selected = BTreeMap::new();
    for req in requested {
        let req = req.trim_matches('/');
        let matching: Vec<&String> = all
            .keys()
            .filter(|cat| cat.as_str() == req || cat.starts_with(&format!("{}/", req)))
            .collect();
        if matching.is_empty() {
            eprintln!(
                "warning: category '{}' not found (available: {})",
                req,
                all.keys()
                    .map(|k| if k.is_empty() { "(root)" } else { k.as_str() })
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }
        for cat in matching {
            selected.insert(cat.clone(), all[cat].clone());
        }
    }
    selected
}
