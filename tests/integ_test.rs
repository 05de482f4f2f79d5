use clap::Parser;
use cmtree::diagnostics::Diagnostic;
use cmtree::run::{CliOptions, Error, OsFacade, RunOptions};
use std::io;
use std::io::ErrorKind;

#[derive(Debug)]
struct Case<const N: usize> {
    cli_args: [&'static str; N],
    expect_output: &'static str,
    expect_error: &'static str,
    expect_output_json: bool,
    md: &'static str,
    files: &'static [(&'static str, &'static str)],
    expect_success: bool,
}

struct CaseRunner<'a, const N: usize> {
    case: &'a Case<N>,
    stdout: Vec<u8>,
    stderr: String,
}

impl<const N: usize> OsFacade for CaseRunner<'_, N> {
    fn read_stdin(&self) -> io::Result<String> {
        Ok(self.case.md.to_string())
    }

    fn read_file(&self, path: &str) -> io::Result<String> {
        for (name, content) in self.case.files {
            if path == *name {
                return Ok(content.to_string());
            }
        }
        Err(io::Error::new(ErrorKind::NotFound, format!("File not found: {}", path)))
    }

    fn stdout(&mut self) -> impl io::Write {
        &mut self.stdout
    }

    fn write_error(&mut self, err: Error) {
        self.stderr.push_str(&err.to_string());
    }

    fn write_diagnostic(&mut self, diagnostic: Diagnostic) {
        self.stderr.push_str(&format!("{diagnostic}\n"));
    }
}

impl<const N: usize> Case<N> {
    fn check(&self) {
        let (actual_success, actual_out, actual_err) = self.run();
        // JSON expectations were already normalized to this form when the cases were generated
        let actual_out = if self.expect_output_json {
            let actual_obj = serde_json::from_str::<serde_json::Value>(&actual_out).unwrap();
            serde_json::to_string_pretty(&actual_obj).unwrap()
        } else {
            actual_out
        };
        assert_eq!(actual_out, self.expect_output);
        assert_eq!(actual_err, self.expect_error);
        assert_eq!(actual_success, self.expect_success);
    }

    fn run(&self) -> (bool, String, String) {
        let all_cli_args = ["cmd"].iter().chain(&self.cli_args);
        let cli = CliOptions::try_parse_from(all_cli_args).unwrap();
        let mut runner = CaseRunner {
            case: self,
            stdout: Vec::new(),
            stderr: String::new(),
        };
        let success = cmtree::run::run(&RunOptions::from(cli), &mut runner);
        let stdout = String::from_utf8(runner.stdout).unwrap();
        (success, stdout, runner.stderr)
    }
}

include!(concat!(env!("OUT_DIR"), "/tests/integ_test_cases.rs"));
