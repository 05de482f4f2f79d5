use crate::readers::{LineRead, ReadError};
use crate::util::patterns::Pattern;
use fancy_regex::Captures;

/// A cursor over a single string.
///
/// Positions are byte offsets, always on char boundaries. The reader is `Copy`, so trying a parse on a copy and only
/// keeping its position on success is cheap.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextReader<'s> {
    subject: &'s str,
    position: usize,
}

impl<'s> TextReader<'s> {
    pub fn new(subject: &'s str) -> Self {
        Self::at(subject, 0)
    }

    pub fn at(subject: &'s str, position: usize) -> Self {
        Self { subject, position }
    }

    pub fn subject(&self) -> &'s str {
        self.subject
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn remain(&self) -> &'s str {
        &self.subject[self.position..]
    }

    pub fn is_empty(&self) -> bool {
        self.position >= self.subject.len()
    }

    /// The char at the cursor.
    pub fn peek(&self) -> Option<char> {
        self.remain().chars().next()
    }

    /// The char just before the cursor.
    pub fn before(&self) -> Option<char> {
        self.subject[..self.position].chars().next_back()
    }

    /// Advances by `n` bytes.
    pub fn step(&mut self, n: usize) {
        self.position = (self.position + n).min(self.subject.len());
    }

    /// Advances past the char at the cursor.
    pub fn step_char(&mut self) {
        if let Some(ch) = self.peek() {
            self.position += ch.len_utf8();
        }
    }

    /// Matches `pattern` at the cursor, and advances past the match if there is one.
    ///
    /// The pattern should be anchored with `^`; an unanchored pattern could match further along.
    pub fn consume(&mut self, pattern: &Pattern) -> Option<Captures<'s>> {
        let captures = pattern.captures(self.remain())?;
        let len = captures.get(0).map_or(0, |m| m.end());
        self.position += len;
        Some(captures)
    }

    pub fn slice(&self, start: usize, end: usize) -> &'s str {
        &self.subject[start..end]
    }
}

/// The owned groups of a [`MultiLineReader::consume`] match.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Captured {
    groups: Vec<Option<String>>,
}

impl Captured {
    /// The whole match.
    pub fn whole(&self) -> &str {
        self.group(0)
    }

    /// A group's text, or `""` if it didn't participate.
    pub fn group(&self, i: usize) -> &str {
        self.groups.get(i).and_then(|g| g.as_deref()).unwrap_or("")
    }
}

/// Where a [`MultiLineReader`] is: a line, and an offset within it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Position {
    pub lineno: usize,
    pub offset: usize,
}

/// A char cursor that can continue onto following lines of a [`LineRead`].
///
/// Constructs like link reference definitions span lines. This reads them one line at a time, and can
/// [rewind](Self::rewind) to an earlier [`Position`] (including on a previous line).
pub struct MultiLineReader<'a> {
    inner: &'a mut dyn LineRead,
    line: String,
    offset: usize,
}

impl<'a> MultiLineReader<'a> {
    pub fn new(inner: &'a mut dyn LineRead) -> Self {
        Self {
            inner,
            line: String::new(),
            offset: 0,
        }
    }

    /// Moves onto the next line.
    pub fn readline(&mut self) -> Result<(), ReadError> {
        self.line = self.inner.readline()?;
        self.offset = 0;
        Ok(())
    }

    pub fn remain(&self) -> &str {
        &self.line[self.offset..]
    }

    /// Whether only whitespace is left on this line.
    pub fn eol(&self) -> bool {
        self.remain().trim().is_empty()
    }

    pub fn consume(&mut self, pattern: &Pattern) -> Option<Captured> {
        let captures = pattern.captures(&self.line[self.offset..])?;
        let groups = captures.iter().map(|g| g.map(|m| m.as_str().to_string())).collect();
        self.offset += captures.get(0).map_or(0, |m| m.end());
        Some(Captured { groups })
    }

    /// Runs `action` with a [`TextReader`] over the rest of the current line, and keeps however far it advanced.
    pub fn with_text_reader<T>(&mut self, action: impl FnOnce(&mut TextReader) -> T) -> T {
        let mut reader = TextReader::at(&self.line, self.offset);
        let result = action(&mut reader);
        self.offset = reader.position();
        result
    }

    pub fn position(&self) -> Position {
        Position {
            lineno: self.inner.lineno(),
            offset: self.offset,
        }
    }

    /// Goes back to an earlier position.
    pub fn rewind(&mut self, position: Position) -> Result<(), ReadError> {
        let delta = (position.lineno as isize) - (self.inner.lineno() as isize);
        self.inner.step(delta);
        self.line = if position.lineno == 0 {
            String::new()
        } else {
            self.inner.fetch(0)?
        };
        self.offset = position.offset.min(self.line.len());
        Ok(())
    }

    pub fn lineno(&self) -> usize {
        self.inner.lineno()
    }

    /// Moves the underlying reader back (or forward) to the given line, and forgets the current line.
    pub fn reset_to(&mut self, lineno: usize) {
        let delta = (lineno as isize) - (self.inner.lineno() as isize);
        self.inner.step(delta);
        self.line.clear();
        self.offset = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::readers::LineReader;

    #[test]
    fn consume_advances() {
        let pattern = Pattern::new("^a+");
        let mut reader = TextReader::new("aab");
        let captures = reader.consume(&pattern).unwrap();
        assert_eq!(captures.get(0).unwrap().as_str(), "aa");
        assert_eq!(reader.remain(), "b");
        assert!(reader.consume(&pattern).is_none());
        assert_eq!(reader.position(), 2);
    }

    #[test]
    fn chars_around_cursor() {
        let mut reader = TextReader::new("éa");
        assert_eq!(reader.before(), None);
        reader.step_char();
        assert_eq!(reader.before(), Some('é'));
        assert_eq!(reader.peek(), Some('a'));
        reader.step_char();
        reader.step_char();
        assert!(reader.is_empty());
        assert_eq!(reader.peek(), None);
    }

    #[test]
    fn multi_line_rewind() {
        let mut base = LineReader::new("[a]:\n/url\n");
        let mut reader = MultiLineReader::new(&mut base);
        reader.readline().unwrap();
        let captured = reader.consume(&Pattern::new(r"^\[(a)\]:")).unwrap();
        assert_eq!(captured.whole(), "[a]:");
        assert_eq!(captured.group(1), "a");
        assert!(reader.eol());

        let position = reader.position();
        reader.readline().unwrap();
        assert_eq!(reader.remain(), "/url\n");
        reader.with_text_reader(|text| text.step(4));
        assert_eq!(reader.remain(), "\n");

        reader.rewind(position).unwrap();
        assert_eq!(reader.remain(), "\n");
        assert_eq!(reader.lineno(), 1);

        reader.reset_to(0);
        assert_eq!(base.lineno(), 0);
    }
}
