use crate::{HardBreaks, ParseOptions};
use clap::{Parser, ValueEnum};
use derive_builder::Builder;
use std::fmt::{Display, Formatter};

macro_rules! create_options_structs {
    (
        $(
            $(#[$meta:meta])*
            clap $clap:tt
            pub $name:ident : $ty:ty
        ),* $(,)?
    ) => {
        #[derive(Clone, Default, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Parser)]
        #[command(version, about, long_about = None)]
        #[doc(hidden)]
        pub struct CliOptions {
            $(
            $(#[$meta])*
            #[arg$clap]
            pub(crate) $name: $ty,
            )*

            /// Markdown files to parse, by path. If not provided, standard input will be used.
            ///
            /// Each file is parsed (and printed) separately, in the order given. A path of "-" represents standard
            /// input; all but the first "-" are ignored.
            #[arg()]
            pub(crate) markdown_file_paths: Vec<String>,
        }

        /// Options analogous to the cmtree CLI's switches.
        #[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Builder)]
        pub struct RunOptions {
            $(
            $(#[$meta])*
            pub $name: $ty,
            )*

            pub markdown_file_paths: Vec<String>
        }

        impl From<CliOptions> for RunOptions {
            fn from(value: CliOptions) -> Self {
                Self {
                    $($name: value.$name,)*
                    markdown_file_paths: value.markdown_file_paths,
                }
            }
        }
    };
}

create_options_structs! {
    /// Specifies the output format.
    clap(long, short, value_enum, default_value_t = OutputFormat::Pformat)
    pub output: OutputFormat,

    /// Keep headings flat, instead of nesting the blocks that follow each heading into a section.
    clap(long)
    pub no_sections: bool,

    /// Replace hard line breaks with plain newlines, with a warning for each.
    clap(long)
    pub downgrade_breaks: bool,

    /// Quiet: parse and report diagnostics, but do not print the document.
    clap(long, short)
    pub quiet: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            output: OutputFormat::Pformat,
            no_sections: false,
            downgrade_breaks: false,
            quiet: false,
            markdown_file_paths: vec![],
        }
    }
}

impl RunOptions {
    /// The parse options for one input, identified in diagnostics as `source`.
    pub fn parse_options(&self, source: &str) -> ParseOptions {
        ParseOptions {
            source: source.to_string(),
            sections: !self.no_sections,
            hard_breaks: if self.downgrade_breaks {
                HardBreaks::Downgrade
            } else {
                HardBreaks::Keep
            },
        }
    }
}

/// Output formats, analogous to `--output` in the CLI.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, ValueEnum)]
pub enum OutputFormat {
    /// An indented pseudo-XML rendering of the tree, one node per line.
    ///
    /// ```text
    /// <document source="<stdin>">
    ///     <paragraph>
    ///         Hello,
    ///         <emphasis>
    ///             world
    /// ```
    Pformat,

    /// The tree as nested JSON objects: `{"type": "paragraph", "children": [...]}`, with each node's attributes
    /// alongside its type.
    Json,
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self::Pformat
    }
}

impl Display for OutputFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let self_str = match self {
            OutputFormat::Pformat => "pformat",
            OutputFormat::Json => "json",
        };
        f.write_str(self_str)
    }
}

#[cfg(test)]
mod tests {
    use crate::run::cli::{CliOptions, OutputFormat};
    use crate::run::RunOptions;
    use crate::util::utils_for_test::*;
    use crate::{HardBreaks, ParseOptions};
    use clap::{Error, Parser};

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        CliOptions::command().debug_assert();
    }

    #[test]
    fn no_args() {
        let result = CliOptions::try_parse_from(["cmtree"]);
        unwrap!(result, Ok(cli));
        assert!(cli.markdown_file_paths.is_empty());
        let run_opts: RunOptions = cli.into();
        assert_eq!(run_opts.output, OutputFormat::Pformat);
    }

    #[test]
    fn no_args_equals_default() {
        let result = CliOptions::try_parse_from(["cmtree"]);
        unwrap!(result, Ok(cli));
        let from_cli: RunOptions = cli.into();
        assert_eq!(from_cli, RunOptions::default());
    }

    #[test]
    fn files_and_flags() {
        let result = CliOptions::try_parse_from(["cmtree", "-o", "json", "--no-sections", "a.md", "-"]);
        unwrap!(result, Ok(cli));
        let run_opts: RunOptions = cli.into();
        assert_eq!(run_opts.output, OutputFormat::Json);
        assert!(run_opts.no_sections);
        assert_eq!(run_opts.markdown_file_paths, ["a.md", "-"]);
    }

    #[test]
    fn parse_options_from_flags() {
        let result = CliOptions::try_parse_from(["cmtree", "--downgrade-breaks"]);
        unwrap!(result, Ok(cli));
        let run_opts: RunOptions = cli.into();
        assert_eq!(
            run_opts.parse_options("in.md"),
            ParseOptions {
                source: "in.md".to_string(),
                sections: true,
                hard_breaks: HardBreaks::Downgrade,
            }
        );
    }

    #[test]
    fn unknown_output_format() {
        let result = CliOptions::try_parse_from(["cmtree", "--output", "html"]);
        check_err(&result, "invalid value 'html' for '--output <OUTPUT>'");
    }

    fn check_err(result: &Result<CliOptions, Error>, expect: &str) {
        unwrap!(result, Err(e));
        let e_str = e.to_string();
        let first_line = e_str.split('\n').next().expect("no error string found");
        let mut expect_full = "error: ".to_string();
        expect_full.push_str(expect);
        assert_eq!(first_line, &expect_full);
    }
}
