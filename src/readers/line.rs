use crate::util::text::expand_leading_tabs;

/// Why a reader couldn't produce a line.
///
/// None of these are errors in the usual sense: they're how a reader says "this container ends here", and the block
/// processors use them for control flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ReadError {
    /// Past the start or end of the input.
    #[error("out of bounds")]
    OutOfBounds,
    /// The line doesn't belong to this reader's container (a missing `>`, too little indentation, ...).
    #[error("line doesn't match")]
    Unmatched,
    /// The line closes a fenced code block.
    #[error("code fence closed")]
    FenceClosed,
}

/// Options threaded through a chain of decorating readers.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FetchOptions {
    /// Accept lazy continuation lines (non-blank lines that lack the container's usual prefix).
    pub lazy: bool,
    /// Regex fragments for the container markers in front of the line's content, outermost first. These are used to
    /// expand tabs in the whitespace around them.
    pub markers: Vec<&'static str>,
}

impl FetchOptions {
    pub fn lazy(&self) -> Self {
        Self {
            lazy: true,
            markers: self.markers.clone(),
        }
    }

    /// Adds a marker in front of the existing ones. Each decorator wraps the next one in, so the innermost reader
    /// adds its marker last, putting the markers in the order they appear on the line.
    pub fn with_marker(&self, marker: &'static str) -> Self {
        let mut markers = Vec::with_capacity(self.markers.len() + 1);
        markers.push(marker);
        markers.extend_from_slice(&self.markers);
        Self {
            lazy: self.lazy,
            markers,
        }
    }
}

/// A cursor over lines of input.
///
/// The cursor sits on the "current" line, which is the line most recently read; [`Self::lineno`] is its 1-origin
/// number, or 0 before anything has been read. Fetching is relative to that: `fetch(1)` is the next line, which is
/// what [`Self::readline`] returns (before stepping onto it).
///
/// Decorating readers wrap an inner reader and change what a line looks like from inside their container, or reject
/// lines that end it.
pub trait LineRead {
    /// Gets the line at `relative` to the current one, without moving.
    fn fetch_with(&self, relative: isize, options: &FetchOptions) -> Result<String, ReadError>;

    /// Moves the cursor by `n` lines (which may be negative).
    fn step(&mut self, n: isize);

    fn lineno(&self) -> usize;

    fn eof_with(&self, options: &FetchOptions) -> bool {
        self.fetch_with(1, options).is_err()
    }

    fn fetch(&self, relative: isize) -> Result<String, ReadError> {
        self.fetch_with(relative, &FetchOptions::default())
    }

    fn next_line(&self) -> Result<String, ReadError> {
        self.fetch(1)
    }

    fn eof(&self) -> bool {
        self.eof_with(&FetchOptions::default())
    }

    fn readline(&mut self) -> Result<String, ReadError> {
        let line = self.fetch(1)?;
        self.step(1);
        Ok(line)
    }
}

/// The base reader, over the input's lines.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LineReader {
    lines: Vec<String>,
    lineno: usize,
}

impl LineReader {
    /// Splits text into lines, each keeping its trailing newline. Line endings are normalized to `\n`, and NUL chars
    /// are replaced with U+FFFD.
    pub fn new(text: &str) -> Self {
        let mut normalized = text.replace("\r\n", "\n").replace('\r', "\n");
        if normalized.contains('\0') {
            normalized = normalized.replace('\0', "\u{fffd}");
        }
        let lines = normalized.split_inclusive('\n').map(str::to_string).collect();
        Self::from_lines(lines)
    }

    pub fn from_lines(lines: Vec<String>) -> Self {
        Self { lines, lineno: 0 }
    }
}

impl LineRead for LineReader {
    fn fetch_with(&self, relative: isize, options: &FetchOptions) -> Result<String, ReadError> {
        let index = (self.lineno as isize) + relative - 1;
        let line = usize::try_from(index)
            .ok()
            .and_then(|i| self.lines.get(i))
            .ok_or(ReadError::OutOfBounds)?;
        Ok(expand_leading_tabs(line, &options.markers).into_owned())
    }

    fn step(&mut self, n: isize) {
        self.lineno = self.lineno.saturating_add_signed(n);
    }

    fn lineno(&self) -> usize {
        self.lineno
    }

    fn eof_with(&self, _options: &FetchOptions) -> bool {
        self.lineno >= self.lines.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_all_lines() {
        let mut reader = LineReader::new("a\nb\r\nc");
        assert_eq!(reader.lineno(), 0);
        assert_eq!(reader.readline(), Ok("a\n".to_string()));
        assert_eq!(reader.readline(), Ok("b\n".to_string()));
        assert!(!reader.eof());
        assert_eq!(reader.readline(), Ok("c".to_string()));
        assert!(reader.eof());
        assert_eq!(reader.readline(), Err(ReadError::OutOfBounds));
        assert_eq!(reader.lineno(), 3);
    }

    #[test]
    fn fetch_relative() {
        let mut reader = LineReader::new("a\nb\nc\n");
        reader.step(1);
        assert_eq!(reader.fetch(0), Ok("a\n".to_string()));
        assert_eq!(reader.fetch(2), Ok("c\n".to_string()));
        assert_eq!(reader.fetch(-1), Err(ReadError::OutOfBounds));
        assert_eq!(reader.fetch(3), Err(ReadError::OutOfBounds));

        reader.step(2);
        reader.step(-2);
        assert_eq!(reader.lineno(), 1);
    }

    #[test]
    fn tabs_expanded_on_fetch() {
        let reader = LineReader::new(">\tfoo\n");
        assert_eq!(reader.next_line(), Ok(">\tfoo\n".to_string()));
        let options = FetchOptions::default().with_marker(">");
        assert_eq!(reader.fetch_with(1, &options), Ok(">   foo\n".to_string()));
    }

    #[test]
    fn nul_replaced() {
        let reader = LineReader::new("a\0b");
        assert_eq!(reader.next_line(), Ok("a\u{fffd}b".to_string()));
    }

    #[test]
    fn markers_in_line_order() {
        let options = FetchOptions::default().with_marker("[-+*]").with_marker(">");
        assert_eq!(options.markers, vec![">", "[-+*]"]);
        assert!(options.lazy().lazy);
    }
}
