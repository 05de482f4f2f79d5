//! Generates `integ_test_cases.rs`: one test module per file in `tests/md_cases/`, and one test per expectation.
//!
//! Each case file gives a markdown input (plus, optionally, named files the CLI can read) and a table of expectations,
//! each of which runs the CLI with some arguments. Cases are checked while generating, so a malformed one fails the
//! build with its file and name instead of failing at test time for the wrong reason.
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write;
use std::path::{Path, PathBuf};
use std::{env, fmt, fs};

const MD_CASES_PATH: &str = "tests/md_cases/";
const CASES_WRITE: &str = "tests/integ_test_cases.rs";

fn main() -> Result<(), String> {
    println!("cargo::rerun-if-changed={MD_CASES_PATH}");
    let out_dir = env::var("OUT_DIR").map_err(|e| format!("OUT_DIR: {e}"))?;

    let mut generated = String::new();
    for path in case_file_paths()? {
        let case_file = CaseFile::read(&path)?;
        let tests = case_file.tests()?;
        case_file.write_module(&tests, &mut generated).map_err(|e| e.to_string())?;
    }

    let out_path = Path::new(&out_dir).join(CASES_WRITE);
    if let Some(parent) = out_path.parent() {
        fs::create_dir_all(parent).map_err(|e| format!("mkdirs on {}: {e}", parent.display()))?;
    }
    fs::write(&out_path, generated).map_err(|e| format!("writing to {}: {e}", out_path.display()))
}

/// The `.toml` files in the cases dir, sorted so that the generated code is stable.
fn case_file_paths() -> Result<Vec<PathBuf>, String> {
    let entries = fs::read_dir(MD_CASES_PATH).map_err(|e| format!("{MD_CASES_PATH}: {e}"))?;
    let mut paths = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| format!("{MD_CASES_PATH}: {e}"))?.path();
        if !path.is_file() {
            return Err(format!("{}: not a regular file", path.display()));
        }
        if path.extension().map_or(false, |ext| ext == "toml") {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct CaseToml {
    given: Given,
    expect: BTreeMap<String, Expect>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct Given {
    md: String,
    #[serde(default)]
    files: BTreeMap<String, String>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct Expect {
    cli_args: Vec<String>,
    output: String,
    /// Compare the output as JSON values, rather than as text.
    #[serde(default)]
    output_json: bool,
    #[serde(default)]
    output_err: String,
    #[serde(default = "default_success")]
    expect_success: bool,
    /// Why the test is ignored, if it is.
    ignore: Option<String>,
}

fn default_success() -> bool {
    true
}

struct CaseFile {
    path: String,
    module: String,
    toml: CaseToml,
}

/// One generated `#[test]`.
struct TestFn<'a> {
    fn_name: String,
    expect: &'a Expect,
    /// The output to compare against. For JSON, this is the expectation re-serialized the way the test will print the
    /// actual output.
    expect_output: String,
}

impl CaseFile {
    fn read(path: &Path) -> Result<Self, String> {
        let path_str = path.display().to_string();
        let module = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().to_string())
            .filter(|stem| is_identifier(stem))
            .ok_or_else(|| format!("{path_str}: file name must also work as a module name"))?;
        let contents = fs::read_to_string(path).map_err(|e| format!("{path_str}: {e}"))?;
        let toml: CaseToml = toml::from_str(&contents).map_err(|e| format!("{path_str}: {e}"))?;
        if toml.expect.is_empty() {
            return Err(format!("{path_str}: no [expect] tables"));
        }
        Ok(Self {
            path: path_str,
            module,
            toml,
        })
    }

    fn tests(&self) -> Result<Vec<TestFn>, String> {
        let mut fn_names = BTreeSet::new();
        let mut tests = Vec::with_capacity(self.toml.expect.len());
        for (case_name, expect) in &self.toml.expect {
            let fail = |message: String| format!("{}, case {case_name:?}: {message}", self.path);

            let fn_name = fn_name(case_name);
            if !fn_names.insert(fn_name.clone()) {
                return Err(fail(format!("another case in this file is also named {fn_name}")));
            }
            if expect.output_json != requests_json(&expect.cli_args) {
                return Err(fail("output_json must be set exactly when the args ask for `--output json`".to_string()));
            }
            if !expect.expect_success && expect.output_err.is_empty() {
                return Err(fail("a failing case must give output_err".to_string()));
            }
            if expect.expect_success {
                for path in input_paths(&expect.cli_args) {
                    if path != "-" && !self.toml.given.files.contains_key(path) {
                        return Err(fail(format!("reads {path:?}, which isn't in [given] files")));
                    }
                }
            }

            let expect_output = if expect.output_json {
                let value: serde_json::Value =
                    serde_json::from_str(&expect.output).map_err(|e| fail(format!("output isn't JSON: {e}")))?;
                serde_json::to_string_pretty(&value).map_err(|e| fail(e.to_string()))?
            } else {
                expect.output.clone()
            };
            tests.push(TestFn {
                fn_name,
                expect,
                expect_output,
            });
        }
        Ok(tests)
    }

    fn write_module(&self, tests: &[TestFn], out: &mut String) -> fmt::Result {
        writeln!(out, "mod {} {{", self.module)?;
        writeln!(out, "    use super::*;")?;
        writeln!(out)?;
        writeln!(out, "    const MD: &str = {:?};", self.toml.given.md)?;
        writeln!(out, "    const FILES: &[(&str, &str)] = &[")?;
        for (name, content) in &self.toml.given.files {
            writeln!(out, "        ({name:?}, {content:?}),")?;
        }
        writeln!(out, "    ];")?;

        for test in tests {
            writeln!(out)?;
            if let Some(reason) = &test.expect.ignore {
                writeln!(out, "    #[ignore = {reason:?}]")?;
            }
            writeln!(out, "    #[test]")?;
            writeln!(out, "    fn {}() {{", test.fn_name)?;
            writeln!(out, "        Case {{")?;
            writeln!(out, "            cli_args: {:?},", test.expect.cli_args)?;
            writeln!(out, "            expect_output: {:?},", test.expect_output)?;
            writeln!(out, "            expect_error: {:?},", test.expect.output_err)?;
            writeln!(out, "            expect_output_json: {},", test.expect.output_json)?;
            writeln!(out, "            expect_success: {},", test.expect.expect_success)?;
            writeln!(out, "            md: MD,")?;
            writeln!(out, "            files: FILES,")?;
            writeln!(out, "        }}")?;
            writeln!(out, "        .check();")?;
            writeln!(out, "    }}")?;
        }
        writeln!(out, "}}")?;
        writeln!(out)
    }
}

/// `"each file separately"` becomes `each_file_separately`.
fn fn_name(case_name: &str) -> String {
    let name = case_name
        .replace(|ch: char| !(ch.is_alphanumeric() || ch.is_whitespace() || ch == '_'), "")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .to_lowercase();
    if name.starts_with(|ch: char| ch.is_ascii_digit()) || name.is_empty() {
        format!("case_{name}")
    } else {
        name
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().map_or(false, |ch| ch.is_ascii_alphabetic() || ch == '_')
        && chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
}

fn requests_json(cli_args: &[String]) -> bool {
    let separate = cli_args
        .windows(2)
        .any(|pair| matches!(pair[0].as_str(), "--output" | "-o") && pair[1] == "json");
    separate || cli_args.iter().any(|arg| arg == "--output=json" || arg == "-ojson")
}

/// The args that aren't flags or flag values: the files the CLI will read.
fn input_paths(cli_args: &[String]) -> Vec<&str> {
    let mut paths = Vec::new();
    let mut args = cli_args.iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--output" | "-o" => {
                args.next();
            }
            "-" => paths.push("-"),
            flag if flag.starts_with('-') => {}
            path => paths.push(path),
        }
    }
    paths
}
