//! End-to-end runs.
//!
//! This module reads inputs, parses each into a [`Document`](crate::Document) and renders it. It's what the CLI uses,
//! but it can also run within-process.
//!
//! ## Example
//!
//! ```
//! # use cmtree::run;
//!
//! // First, let's define a mocked I/O. Replace this with whatever you need.
//! #[derive(Default)]
//! struct MockIo {
//!     stdout: Vec<u8>,
//!     diagnostics: Vec<String>,
//! }
//!
//! impl run::OsFacade for MockIo {
//!     fn read_stdin(&self) -> std::io::Result<String> {
//!         Ok("[a]: /one\n[a]: /two\n\nhello *world*".to_string())
//!     }
//!
//!     fn read_file(&self, path: &str) -> std::io::Result<String> {
//!         Err(std::io::Error::new(std::io::ErrorKind::NotFound, path))
//!     }
//!
//!     fn stdout(&mut self) -> impl std::io::Write {
//!         &mut self.stdout
//!     }
//!
//!     fn write_error(&mut self, err: run::Error) {
//!         eprintln!("{err}")
//!     }
//!
//!     fn write_diagnostic(&mut self, diagnostic: cmtree::diagnostics::Diagnostic) {
//!         self.diagnostics.push(diagnostic.to_string());
//!     }
//! }
//!
//! // Now, use it:
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut os_facade = MockIo::default();
//! let success = run::run(&run::RunOptions::default(), &mut os_facade);
//! let stdout_text = String::from_utf8(os_facade.stdout)?;
//!
//! assert!(success);
//! assert!(stdout_text.starts_with("<document source=\"&lt;stdin&gt;\">\n"));
//! assert_eq!(
//!     os_facade.diagnostics,
//!     vec![r#"<stdin>:2: (WARNING) Duplicate explicit target name: "a""#],
//! );
//! #
//! #     Ok(())
//! # }
//! ```
mod cli;
mod run_main;

pub use cli::*;
pub use run_main::*;
