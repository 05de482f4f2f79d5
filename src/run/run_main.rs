use crate::diagnostics::{Diagnostic, Reporter};
use crate::doc::{pformat, SerializableDoc};
use crate::run::cli::OutputFormat;
use crate::run::RunOptions;
use crate::Parser;
use std::fmt::{Display, Formatter};
use std::io::Write;
use std::{env, io};

/// The run's overall possible error.
#[derive(Debug)]
pub enum Error {
    /// The parser rejected the input. This only happens with a misconfigured parser.
    MarkdownParse(crate::Error),

    /// Couldn't read an input file.
    FileReadError(Input, io::Error),

    /// Couldn't write the output.
    OutputError(io::Error),
}

impl std::error::Error for Error {}

/// Stdin or an input file by path.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Input {
    Stdin,
    FilePath(String),
}

impl Input {
    /// How this input is identified in diagnostics.
    pub fn source_name(&self) -> &str {
        match self {
            Input::Stdin => "<stdin>",
            Input::FilePath(path) => path,
        }
    }
}

impl Error {
    pub(crate) fn from_io_error(error: io::Error, file: Input) -> Self {
        Error::FileReadError(file, error)
    }
}

impl Display for Input {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Input::Stdin => f.write_str("stdin"),
            Input::FilePath(file) => write!(f, "file {file:?}"),
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::MarkdownParse(err) => {
                writeln!(f, "Markdown parse error:")?;
                writeln!(f, "{err}")
            }
            Error::FileReadError(file, err) => {
                if env::var("CMTREE_PORTABLE_ERRORS").unwrap_or_default().is_empty() {
                    writeln!(f, "{err} while reading {file}")
                } else {
                    writeln!(f, "{} while reading {file}", err.kind())
                }
            }
            Error::OutputError(err) => writeln!(f, "{err} while writing output"),
        }
    }
}

/// A simple facade for handling I/O.
///
/// This trait lets you do "I/O-y stuff" like mocking out stdin or reading files. The [`run`] method uses it.
pub trait OsFacade {
    /// Read stdin (or your mock of it) to a `String`.
    fn read_stdin(&self) -> io::Result<String>;

    /// Read a file path (or your mock of one) to a `String`.
    fn read_file(&self, path: &str) -> io::Result<String>;

    /// Get a writer for stdout (or your mock of it).
    fn stdout(&mut self) -> impl Write;

    /// Handle an error.
    fn write_error(&mut self, err: Error);

    /// Handle a diagnostic from the parser.
    fn write_diagnostic(&mut self, diagnostic: Diagnostic);

    /// Reads each of the file paths.
    ///
    /// The default implementation (which you should feel free to use) treats the file path `"-"` as stdin. The first
    /// `"-"` reads all of stdin (via [`Self::read_stdin`]), and subsequent `"-"`s get silently ignored. No paths at all
    /// means just stdin.
    fn read_all(&self, markdown_file_paths: &[String]) -> Result<Vec<(Input, String)>, Error> {
        if markdown_file_paths.is_empty() {
            let contents = self.read_stdin().map_err(|err| Error::from_io_error(err, Input::Stdin))?;
            return Ok(vec![(Input::Stdin, contents)]);
        }
        let mut results = Vec::with_capacity(markdown_file_paths.len());
        let mut have_read_stdin = false;
        for path in markdown_file_paths {
            if path == "-" {
                if !have_read_stdin {
                    let contents = self.read_stdin().map_err(|err| Error::from_io_error(err, Input::Stdin))?;
                    results.push((Input::Stdin, contents));
                    have_read_stdin = true
                }
            } else {
                let input = Input::FilePath(path.to_string());
                let contents = self
                    .read_file(path)
                    .map_err(|err| Error::from_io_error(err, input.clone()))?;
                results.push((input, contents));
            }
        }
        Ok(results)
    }
}

/// Sends a parse's diagnostics to the facade.
struct FacadeReporter<'a, O>(&'a mut O);

impl<O: OsFacade> Reporter for FacadeReporter<'_, O> {
    fn report(&mut self, diagnostic: Diagnostic) {
        self.0.write_diagnostic(diagnostic);
    }
}

/// Runs cmtree end to end.
///
/// This uses the provided [RunOptions] and [OsFacade] to read each input, parse it with [`Parser::commonmark`], and
/// write the resulting tree to the facade's stdout in the format specified by [`RunOptions::output`]. Returns whether
/// everything succeeded; diagnostics don't count as failures.
pub fn run(cli: &RunOptions, os: &mut impl OsFacade) -> bool {
    match run_or_error(cli, os) {
        Ok(()) => true,
        Err(err) => {
            os.write_error(err);
            false
        }
    }
}

fn run_or_error(cli: &RunOptions, os: &mut impl OsFacade) -> Result<(), Error> {
    let inputs = os.read_all(&cli.markdown_file_paths)?;
    let parser = Parser::commonmark();

    for (input, contents) in inputs {
        let options = cli.parse_options(input.source_name());
        let doc = parser
            .parse_with_reporter(&contents, &options, &mut FacadeReporter(os))
            .map_err(Error::MarkdownParse)?;

        if cli.quiet {
            continue;
        }
        let mut stdout = os.stdout();
        match cli.output {
            OutputFormat::Pformat => {
                stdout.write_all(pformat(&doc).as_bytes()).map_err(Error::OutputError)?;
            }
            OutputFormat::Json => {
                serde_json::to_writer(&mut stdout, &SerializableDoc::new(&doc))
                    .map_err(|err| Error::OutputError(err.into()))?;
                stdout.write_all(b"\n").map_err(Error::OutputError)?;
            }
        }
    }
    Ok(())
}
