//! Character stream
//!
//! Wraps a decoded source string and provides peek/advance with position
//! tracking. Sources are always complete in memory, so there is no
//! "need more input" state.

use super::position::SourcePosition;

/// Result of a stream read
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StreamResult<T> {
    Ok(T),
    Eof,
}

/// Character stream over a complete source text
pub struct CharStream {
    chars: Vec<char>,
    index: usize,
    position: SourcePosition,
}

impl CharStream {
    pub fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            index: 0,
            position: SourcePosition::start(),
        }
    }

    /// Current position
    pub fn position(&self) -> SourcePosition {
        self.position
    }

    pub fn is_eof(&self) -> bool {
        self.index >= self.chars.len()
    }

    /// Peek the character `offset` places ahead without consuming
    pub fn try_peek(&self, offset: usize) -> StreamResult<char> {
        match self.chars.get(self.index + offset) {
            Some(&c) => StreamResult::Ok(c),
            None => StreamResult::Eof,
        }
    }

    /// Consume one character
    pub fn try_advance(&mut self) -> StreamResult<char> {
        match self.chars.get(self.index) {
            Some(&c) => {
                self.index += 1;
                self.position.advance(c);
                StreamResult::Ok(c)
            }
            None => StreamResult::Eof,
        }
    }

    /// Check whether the current character matches (no consume)
    pub fn check(&self, expected: char) -> bool {
        matches!(self.try_peek(0), StreamResult::Ok(c) if c == expected)
    }

    /// Check whether the character at `offset` satisfies `pred`
    pub fn check_at(&self, offset: usize, pred: impl Fn(char) -> bool) -> bool {
        matches!(self.try_peek(offset), StreamResult::Ok(c) if pred(c))
    }

    /// Consume the current character if it matches
    pub fn match_char(&mut self, expected: char) -> bool {
        if self.check(expected) {
            let _ = self.try_advance();
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_ascii() {
        let mut stream = CharStream::new("abc");
        assert!(stream.check('a'));
        assert_eq!(stream.try_advance(), StreamResult::Ok('a'));
        assert_eq!(stream.try_advance(), StreamResult::Ok('b'));
        assert_eq!(stream.try_advance(), StreamResult::Ok('c'));
        assert_eq!(stream.try_advance(), StreamResult::Eof);
        assert!(stream.is_eof());
    }

    #[test]
    fn test_stream_lookahead() {
        let stream = CharStream::new("xyz");
        assert_eq!(stream.try_peek(2), StreamResult::Ok('z'));
        assert_eq!(stream.try_peek(3), StreamResult::Eof);
        assert!(stream.check_at(1, |c| c == 'y'));
    }

    #[test]
    fn test_stream_position_tracking() {
        let mut stream = CharStream::new("a\nb");
        let _ = stream.try_advance();
        let _ = stream.try_advance();
        let pos = stream.position();
        assert_eq!(pos.line, 2);
        assert_eq!(pos.column, 1);
    }

    #[test]
    fn test_match_char() {
        let mut stream = CharStream::new("=>");
        assert!(stream.match_char('='));
        assert!(!stream.match_char('='));
        assert!(stream.match_char('>'));
    }
}
