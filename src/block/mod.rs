//! Block structure: turning lines into a tree of blocks.
//!
//! The [`BlockParser`] holds a catalogue of [`BlockProcessor`]s, ordered by priority. At each line, it offers the
//! input to each processor in turn, until one of them consumes something. Container processors (block quotes, list
//! items) recurse into the parser with a decorated reader.
use crate::context::ParseContext;
use crate::doc::NodeId;
use crate::readers::LineRead;
use crate::util::patterns::Pattern;
use crate::Error;

mod container;
mod html;
mod link_refs;
mod std_processors;

pub use container::*;
pub use html::*;
pub use link_refs::*;
pub use std_processors::*;

/// A rule for one kind of block.
pub trait BlockProcessor: Send + Sync {
    /// A unique name. Processors with the same priority run in name order.
    fn name(&self) -> &'static str;

    /// Lower priorities run first.
    fn priority(&self) -> u32 {
        500
    }

    /// Whether this block can start right after a paragraph line, ending the paragraph.
    fn paragraph_interruptable(&self) -> bool {
        false
    }

    /// Whether the reader's next line looks like the start of this block.
    fn matches(&self, reader: &dyn LineRead) -> bool;

    /// Consumes the block from the reader, and appends its node(s) to `parent`.
    ///
    /// Returns `Ok(false)` if the block turned out not to be there after all; in that case, the reader must be back
    /// where it started, and the parser offers the line to the next processor.
    fn run(
        &self,
        parser: &BlockParser,
        reader: &mut dyn LineRead,
        ctx: &mut ParseContext,
        parent: NodeId,
    ) -> Result<bool, Error>;
}

/// Whether the reader's next line matches a (`^`-anchored) pattern.
pub(crate) fn next_line_matches(reader: &dyn LineRead, pattern: &Pattern) -> bool {
    reader.next_line().map_or(false, |line| pattern.is_match(&line))
}

#[derive(Default)]
pub struct BlockParser {
    processors: Vec<Box<dyn BlockProcessor>>,
}

impl BlockParser {
    pub fn add_processor(&mut self, processor: Box<dyn BlockProcessor>) {
        self.processors.push(processor);
        self.processors.sort_by(|a, b| (a.priority(), a.name()).cmp(&(b.priority(), b.name())));
    }

    /// Removes the processor with the given name. Returns whether there was one.
    pub fn remove_processor(&mut self, name: &str) -> bool {
        let before = self.processors.len();
        self.processors.retain(|p| p.name() != name);
        self.processors.len() != before
    }

    pub fn processor_names(&self) -> Vec<&'static str> {
        self.processors.iter().map(|p| p.name()).collect()
    }

    /// Parses blocks from the reader until it's exhausted, appending them to `parent`.
    pub fn parse(&self, reader: &mut dyn LineRead, ctx: &mut ParseContext, parent: NodeId) -> Result<(), Error> {
        while !reader.eof() {
            if !self.parse_one(reader, ctx, parent)? {
                return Err(Error::NoBlockProcessor {
                    input: ctx.doc.source().to_string(),
                    line: reader.lineno() + 1,
                });
            }
        }
        Ok(())
    }

    fn parse_one(&self, reader: &mut dyn LineRead, ctx: &mut ParseContext, parent: NodeId) -> Result<bool, Error> {
        for processor in &self.processors {
            if processor.matches(reader) {
                log::trace!("line {}: trying {}", reader.lineno() + 1, processor.name());
                if processor.run(self, reader, ctx, parent)? {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    /// Whether the reader's next line starts a block that ends an open paragraph.
    pub fn is_interrupted(&self, reader: &dyn LineRead) -> bool {
        self.processors
            .iter()
            .any(|p| p.paragraph_interruptable() && p.matches(reader))
    }
}
