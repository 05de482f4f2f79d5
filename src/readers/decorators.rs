use crate::readers::{FetchOptions, LineRead, ReadError};
use crate::util::patterns::Pattern;
use crate::util::text::{drop_chars, is_blank};
use lazy_static::lazy_static;

lazy_static! {
    static ref QUOTE_MARKER: Pattern = Pattern::new("^ {0,3}> ?");
}

/// Lines inside a block quote, with their `>` marker removed.
pub struct BlockQuoteReader<'a> {
    inner: &'a mut dyn LineRead,
}

impl<'a> BlockQuoteReader<'a> {
    pub fn new(inner: &'a mut dyn LineRead) -> Self {
        Self { inner }
    }
}

impl LineRead for BlockQuoteReader<'_> {
    fn fetch_with(&self, relative: isize, options: &FetchOptions) -> Result<String, ReadError> {
        let line = self.inner.fetch_with(relative, &options.with_marker(">"))?;
        if let Some(len) = QUOTE_MARKER.match_len(&line) {
            Ok(line[len..].to_string())
        } else if options.lazy && !is_blank(&line) {
            Ok(line)
        } else {
            Err(ReadError::Unmatched)
        }
    }

    fn step(&mut self, n: isize) {
        self.inner.step(n)
    }

    fn lineno(&self) -> usize {
        self.inner.lineno()
    }
}

/// Lines of an indented code block, minus the indentation. Blank lines are kept (as empty lines).
pub struct IndentedCodeBlockReader<'a> {
    inner: &'a mut dyn LineRead,
}

impl<'a> IndentedCodeBlockReader<'a> {
    pub fn new(inner: &'a mut dyn LineRead) -> Self {
        Self { inner }
    }
}

impl LineRead for IndentedCodeBlockReader<'_> {
    fn fetch_with(&self, relative: isize, options: &FetchOptions) -> Result<String, ReadError> {
        let line = self.inner.fetch_with(relative, options)?;
        if let Some(code) = line.strip_prefix("    ") {
            Ok(code.to_string())
        } else if is_blank(&line) {
            Ok("\n".to_string())
        } else {
            Err(ReadError::Unmatched)
        }
    }

    fn step(&mut self, n: isize) {
        self.inner.step(n)
    }

    fn lineno(&self) -> usize {
        self.inner.lineno()
    }
}

/// Lines of a fenced code block, up to (but not including) the closing fence.
///
/// Reading the closing fence with [`LineRead::readline`] steps past it, so that the outer reader continues after the
/// block.
pub struct FencedCodeBlockReader<'a> {
    inner: &'a mut dyn LineRead,
    indent: usize,
    closing: Pattern,
}

impl<'a> FencedCodeBlockReader<'a> {
    /// `indent` is the opening fence's indentation, which is removed from each line (as far as it's there). The block
    /// closes on a run of at least as many of the same fence chars as `marker`, which is all backticks or all tildes.
    pub fn new(inner: &'a mut dyn LineRead, indent: usize, marker: &str) -> Self {
        let closing = Pattern::new(&format!(r"^ {{0,3}}{marker}+\s*$"));
        Self { inner, indent, closing }
    }
}

impl LineRead for FencedCodeBlockReader<'_> {
    fn fetch_with(&self, relative: isize, options: &FetchOptions) -> Result<String, ReadError> {
        let line = self.inner.fetch_with(relative, options)?;
        if self.closing.is_match(&line) {
            return Err(ReadError::FenceClosed);
        }
        let spaces = line.bytes().take(self.indent).take_while(|b| *b == b' ').count();
        Ok(line[spaces..].to_string())
    }

    fn step(&mut self, n: isize) {
        self.inner.step(n)
    }

    fn lineno(&self) -> usize {
        self.inner.lineno()
    }

    fn readline(&mut self) -> Result<String, ReadError> {
        match self.fetch(1) {
            Ok(line) => {
                self.step(1);
                Ok(line)
            }
            Err(ReadError::FenceClosed) => {
                self.step(1);
                Err(ReadError::FenceClosed)
            }
            Err(err) => Err(err),
        }
    }
}

/// Accepts lazy continuation lines from the readers it wraps.
pub struct LazyLineReader<'a> {
    inner: &'a mut dyn LineRead,
}

impl<'a> LazyLineReader<'a> {
    pub fn new(inner: &'a mut dyn LineRead) -> Self {
        Self { inner }
    }
}

impl LineRead for LazyLineReader<'_> {
    fn fetch_with(&self, relative: isize, options: &FetchOptions) -> Result<String, ReadError> {
        self.inner.fetch_with(relative, &options.lazy())
    }

    fn step(&mut self, n: isize) {
        self.inner.step(n)
    }

    fn lineno(&self) -> usize {
        self.inner.lineno()
    }
}

/// The markers of one family of list items (bullets or ordered).
pub struct ListMarkers {
    /// Regex fragment matching a single marker.
    pub markers: &'static str,
    /// Splits an item's first line into `(marker + spaces)`, `marker` and the rest.
    pub item: Pattern,
    /// Matches a line that starts a new item of this family, at any indentation.
    pub next_item: Pattern,
}

impl ListMarkers {
    pub fn new(markers: &'static str, next_item: &str) -> Self {
        Self {
            markers,
            item: Pattern::new(&format!(r"^(\s*({markers})\s*)(.*)")),
            next_item: Pattern::new(next_item),
        }
    }
}

/// Lines of a single list item.
///
/// The first line loses its marker, and following lines lose the item's indentation. The item ends at a line that's
/// neither indented enough nor blank (unless it's a lazy continuation), and always at a line that starts a new item.
pub struct ListItemReader<'a> {
    inner: &'a mut dyn LineRead,
    markers: &'static ListMarkers,
    marker: String,
    indent: usize,
    beginning_lineno: usize,
}

impl<'a> ListItemReader<'a> {
    /// Starts an item on the inner reader's next line. Fails if that line doesn't start with one of the markers.
    pub fn new(inner: &'a mut dyn LineRead, markers: &'static ListMarkers) -> Result<Self, ReadError> {
        let first_line = inner.fetch_with(1, &FetchOptions::default().with_marker(markers.markers))?;
        let captures = markers.item.captures(&first_line).ok_or(ReadError::Unmatched)?;
        let group = |i| captures.get(i).map_or("", |m| m.as_str());
        let prefix = group(1);
        let marker = group(2).to_string();
        let remain = group(3);

        let prefix_len = prefix.chars().count();
        let marker_end = prefix.trim_end().chars().count();
        let spaces_after_marker = prefix_len - marker_end;
        let indent = if (1..=4).contains(&spaces_after_marker) && !remain.is_empty() {
            prefix_len
        } else {
            // marker only, or content that's indented enough to be code
            marker_end + 1
        };

        let beginning_lineno = inner.lineno() + 1;
        Ok(Self {
            inner,
            markers,
            marker,
            indent,
            beginning_lineno,
        })
    }

    /// The item's marker, as written (`-`, `3.`, ...).
    pub fn marker(&self) -> &str {
        &self.marker
    }

    pub fn indent(&self) -> usize {
        self.indent
    }

    fn is_beginning_line(&self, relative: isize) -> bool {
        (self.lineno() as isize) + relative == self.beginning_lineno as isize
    }
}

impl LineRead for ListItemReader<'_> {
    fn fetch_with(&self, relative: isize, options: &FetchOptions) -> Result<String, ReadError> {
        if self.is_beginning_line(relative) {
            let line = self.inner.fetch_with(relative, &options.with_marker(self.markers.markers))?;
            return Ok(drop_chars(&line, self.indent).to_string());
        }
        let line = self.inner.fetch_with(relative, options)?;
        let indented = line.bytes().take(self.indent).take_while(|b| *b == b' ').count() == self.indent;
        if indented {
            Ok(line[self.indent..].to_string())
        } else if is_blank(&line) {
            Ok("\n".to_string())
        } else if self.markers.next_item.is_match(&line) {
            Err(ReadError::Unmatched)
        } else if options.lazy {
            Ok(line)
        } else {
            Err(ReadError::Unmatched)
        }
    }

    fn step(&mut self, n: isize) {
        self.inner.step(n)
    }

    fn lineno(&self) -> usize {
        self.inner.lineno()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::readers::LineReader;

    lazy_static! {
        static ref BULLETS: ListMarkers = ListMarkers::new(r"[-+*]", r"^( *[-+*])([ \t]+.*|\n?$)");
    }

    fn read_all(reader: &mut dyn LineRead) -> Vec<String> {
        let mut lines = Vec::new();
        while let Ok(line) = reader.readline() {
            lines.push(line);
        }
        lines
    }

    #[test]
    fn block_quote_strips_markers() {
        let mut base = LineReader::new("> a\n>b\n   > c\nd\n");
        let mut quote = BlockQuoteReader::new(&mut base);
        assert_eq!(read_all(&mut quote), vec!["a\n", "b\n", "c\n"]);
        assert_eq!(base.lineno(), 3);
    }

    #[test]
    fn block_quote_lazy() {
        let mut base = LineReader::new("> a\nb\n\nc\n");
        let mut quote = BlockQuoteReader::new(&mut base);
        quote.step(1);
        assert_eq!(quote.next_line(), Err(ReadError::Unmatched));
        let lazy = LazyLineReader::new(&mut quote);
        assert_eq!(lazy.next_line(), Ok("b\n".to_string()));
        assert_eq!(lazy.fetch(2), Err(ReadError::Unmatched));
    }

    #[test]
    fn nested_block_quote_tabs() {
        let mut base = LineReader::new(">\t>\tfoo\n");
        let mut outer = BlockQuoteReader::new(&mut base);
        let inner = BlockQuoteReader::new(&mut outer);
        // each tab reaches the next tab stop, and each quote marker takes one of its spaces
        assert_eq!(inner.next_line(), Ok("  foo\n".to_string()));
    }

    #[test]
    fn indented_code() {
        let mut base = LineReader::new("    a\n\n      b\nc\n");
        let mut code = IndentedCodeBlockReader::new(&mut base);
        assert_eq!(read_all(&mut code), vec!["a\n", "\n", "  b\n"]);
    }

    #[test]
    fn fenced_code_stops_after_fence() {
        let mut base = LineReader::new("```\n  a\n ``\n ````\nb\n");
        base.step(1);
        let mut code = FencedCodeBlockReader::new(&mut base, 1, "```");
        assert_eq!(read_all(&mut code), vec![" a\n", "``\n"]);
        assert_eq!(base.lineno(), 4);
        assert_eq!(base.next_line(), Ok("b\n".to_string()));
    }

    #[test]
    fn fenced_code_unclosed() {
        let mut base = LineReader::new("~~~\na\n```\n");
        base.step(1);
        let mut code = FencedCodeBlockReader::new(&mut base, 0, "~~~");
        assert_eq!(read_all(&mut code), vec!["a\n", "```\n"]);
        assert!(base.eof());
    }

    #[test]
    fn list_item_indent() {
        let mut base = LineReader::new("-  a\n   b\n  c\n- d\n");
        let mut item = ListItemReader::new(&mut base, &BULLETS).unwrap();
        assert_eq!(item.marker(), "-");
        assert_eq!(item.indent(), 3);
        assert_eq!(read_all(&mut item), vec!["a\n", "b\n"]);
    }

    #[test]
    fn list_item_lazy_but_not_next_item() {
        let mut base = LineReader::new("- a\nb\n- c\n");
        let mut item = ListItemReader::new(&mut base, &BULLETS).unwrap();
        item.step(1);
        let lazy = LazyLineReader::new(&mut item);
        assert_eq!(lazy.next_line(), Ok("b\n".to_string()));
        assert_eq!(lazy.fetch(2), Err(ReadError::Unmatched));
    }

    #[test]
    fn list_item_wide_gap_is_code() {
        let mut base = LineReader::new("-     code\n");
        let item = ListItemReader::new(&mut base, &BULLETS).unwrap();
        assert_eq!(item.indent(), 2);
        assert_eq!(item.next_line(), Ok("    code\n".to_string()));
    }

    #[test]
    fn list_item_marker_only() {
        let mut base = LineReader::new("-\n  foo\n");
        let mut item = ListItemReader::new(&mut base, &BULLETS).unwrap();
        assert_eq!(item.indent(), 2);
        assert_eq!(read_all(&mut item), vec!["", "foo\n"]);
    }

    #[test]
    fn list_item_requires_marker() {
        let mut base = LineReader::new("foo\n");
        assert!(ListItemReader::new(&mut base, &BULLETS).is_err());
    }
}
