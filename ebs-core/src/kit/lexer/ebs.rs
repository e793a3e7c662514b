//! EBS scanner
//!
//! Recognizes:
//! - case-insensitive keywords and type names, identifiers
//! - single and multi-character operators, including the `=>`/`=<` aliases
//! - int/long/float/double literals with `l`/`f`/`d` suffixes
//! - single and double quoted strings with escapes; date-shaped strings
//!   become date literals
//! - `//` and `/* */` comments

use super::core::{CharStream, SourcePosition, SourceSpan, StreamResult};
use super::error::{ErrorKind, LexerError};
use super::scanner::{is_identifier_continue, is_identifier_start, ScanResult, Scanner, Token};
use crate::compiler::lexer::token_kind::{EbsTokenKind, KEYWORD_TABLE};

use tracing::trace;

const TARGET: &str = "ebs::lexer::scanner";

pub struct EbsScanner {
    token_start: SourcePosition,
    keywords: &'static [(&'static str, EbsTokenKind)],
}

impl Default for EbsScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl Scanner for EbsScanner {
    type TokenKind = EbsTokenKind;

    fn next_token(&mut self, stream: &mut CharStream) -> ScanResult<Token<EbsTokenKind>> {
        if let Err(e) = self.skip_whitespace_and_comments(stream) {
            return ScanResult::Error(e);
        }

        self.token_start = stream.position();

        let c = match stream.try_peek(0) {
            StreamResult::Ok(c) => c,
            StreamResult::Eof => return ScanResult::Eof,
        };

        let result = match c {
            '(' => self.single(stream, EbsTokenKind::LeftParenthesis),
            ')' => self.single(stream, EbsTokenKind::RightParenthesis),
            '{' => self.single(stream, EbsTokenKind::LeftCurlyBrace),
            '}' => self.single(stream, EbsTokenKind::RightCurlyBrace),
            '[' => self.single(stream, EbsTokenKind::LeftSquareBracket),
            ']' => self.single(stream, EbsTokenKind::RightSquareBracket),
            ';' => self.single(stream, EbsTokenKind::Semicolon),
            ',' => self.single(stream, EbsTokenKind::Comma),
            '.' => self.single(stream, EbsTokenKind::Dot),
            ':' => self.single(stream, EbsTokenKind::Colon),
            '%' => self.single(stream, EbsTokenKind::Percent),
            '^' => self.single(stream, EbsTokenKind::Caret),
            '#' => {
                let _ = stream.try_advance();
                self.make(stream, EbsTokenKind::Call, "#")
            }

            '+' => self.one_of(
                stream,
                EbsTokenKind::Plus,
                &[('+', EbsTokenKind::PlusPlus), ('=', EbsTokenKind::PlusEqual)],
            ),
            '-' => self.one_of(
                stream,
                EbsTokenKind::Minus,
                &[('-', EbsTokenKind::MinusMinus), ('=', EbsTokenKind::MinusEqual)],
            ),
            '*' => self.one_of(stream, EbsTokenKind::Asterisk, &[('=', EbsTokenKind::AsteriskEqual)]),
            '/' => self.one_of(stream, EbsTokenKind::Slash, &[('=', EbsTokenKind::SlashEqual)]),
            '=' => self.one_of(
                stream,
                EbsTokenKind::Equal,
                &[
                    ('=', EbsTokenKind::DoubleEqual),
                    ('>', EbsTokenKind::GreaterThanEqual),
                    ('<', EbsTokenKind::LessThanEqual),
                ],
            ),
            '!' => self.one_of(
                stream,
                EbsTokenKind::Exclamation,
                &[('=', EbsTokenKind::ExclamationEqual)],
            ),
            '<' => self.one_of(stream, EbsTokenKind::LessThan, &[('=', EbsTokenKind::LessThanEqual)]),
            '>' => self.one_of(
                stream,
                EbsTokenKind::GreaterThan,
                &[('=', EbsTokenKind::GreaterThanEqual)],
            ),
            '&' => self.doubled(stream, '&', EbsTokenKind::And),
            '|' => self.doubled(stream, '|', EbsTokenKind::Or),

            '"' | '\'' => self.scan_string(stream, c),
            '0'..='9' => self.scan_number(stream),
            c if is_identifier_start(c) => self.scan_identifier_or_keyword(stream),

            _ => {
                let _ = stream.try_advance();
                ScanResult::Error(LexerError::at(ErrorKind::InvalidChar(c), self.token_start))
            }
        };

        if let ScanResult::Token(token) = &result {
            trace!(target: TARGET, kind = ?token.kind, line = token.span.start.line, "Scanned token");
        }
        result
    }
}

impl EbsScanner {
    pub fn new() -> Self {
        Self {
            token_start: SourcePosition::start(),
            keywords: KEYWORD_TABLE,
        }
    }

    fn make(
        &self,
        stream: &CharStream,
        kind: EbsTokenKind,
        text: impl Into<String>,
    ) -> ScanResult<Token<EbsTokenKind>> {
        let span = SourceSpan::range(self.token_start, stream.position());
        ScanResult::Token(Token::with_text(kind, span, text))
    }

    fn single(&mut self, stream: &mut CharStream, kind: EbsTokenKind) -> ScanResult<Token<EbsTokenKind>> {
        let _ = stream.try_advance();
        self.make(stream, kind, kind.describe())
    }

    /// Consume one char, then optionally a second one picking a longer operator
    fn one_of(
        &mut self,
        stream: &mut CharStream,
        alone: EbsTokenKind,
        pairs: &[(char, EbsTokenKind)],
    ) -> ScanResult<Token<EbsTokenKind>> {
        let _ = stream.try_advance();
        for (next, kind) in pairs {
            if stream.match_char(*next) {
                return self.make(stream, *kind, kind.describe());
            }
        }
        self.make(stream, alone, alone.describe())
    }

    /// `&&` / `||`; the single character is not an operator
    fn doubled(
        &mut self,
        stream: &mut CharStream,
        c: char,
        kind: EbsTokenKind,
    ) -> ScanResult<Token<EbsTokenKind>> {
        let _ = stream.try_advance();
        if stream.match_char(c) {
            self.make(stream, kind, format!("{c}{c}"))
        } else {
            ScanResult::Error(LexerError::at(ErrorKind::InvalidChar(c), self.token_start))
        }
    }

    fn skip_whitespace_and_comments(&mut self, stream: &mut CharStream) -> Result<(), LexerError> {
        loop {
            match stream.try_peek(0) {
                StreamResult::Ok(c) if c.is_whitespace() => {
                    let _ = stream.try_advance();
                }
                StreamResult::Ok('/') => match stream.try_peek(1) {
                    StreamResult::Ok('/') => self.skip_line_comment(stream),
                    StreamResult::Ok('*') => self.skip_block_comment(stream)?,
                    _ => return Ok(()),
                },
                _ => return Ok(()),
            }
        }
    }

    fn skip_line_comment(&mut self, stream: &mut CharStream) {
        while let StreamResult::Ok(c) = stream.try_peek(0) {
            if c == '\n' {
                break;
            }
            let _ = stream.try_advance();
        }
    }

    fn skip_block_comment(&mut self, stream: &mut CharStream) -> Result<(), LexerError> {
        let start = stream.position();
        let _ = stream.try_advance(); // '/'
        let _ = stream.try_advance(); // '*'

        loop {
            match stream.try_advance() {
                StreamResult::Ok('*') if stream.check('/') => {
                    let _ = stream.try_advance();
                    return Ok(());
                }
                StreamResult::Ok(_) => {}
                StreamResult::Eof => {
                    return Err(LexerError::at(
                        ErrorKind::Custom(format!(
                            "Unterminated block comment starting at {}:{}",
                            start.line, start.column
                        )),
                        start,
                    ))
                }
            }
        }
    }

    fn scan_string(&mut self, stream: &mut CharStream, quote: char) -> ScanResult<Token<EbsTokenKind>> {
        let _ = stream.try_advance(); // opening quote
        let mut value = String::new();

        loop {
            match stream.try_advance() {
                StreamResult::Ok(c) if c == quote => break,
                StreamResult::Ok('\\') => match self.scan_escape(stream) {
                    Ok(c) => value.push(c),
                    Err(e) => return ScanResult::Error(e),
                },
                StreamResult::Ok(c) => value.push(c),
                StreamResult::Eof => {
                    return ScanResult::Error(LexerError::at(
                        ErrorKind::UnterminatedString,
                        self.token_start,
                    ))
                }
            }
        }

        let kind = if looks_like_date(&value) {
            EbsTokenKind::LiteralDate
        } else {
            EbsTokenKind::LiteralString
        };
        self.make(stream, kind, value)
    }

    /// Decode the escape after a consumed backslash
    fn scan_escape(&mut self, stream: &mut CharStream) -> Result<char, LexerError> {
        let at = stream.position();
        let c = match stream.try_advance() {
            StreamResult::Ok(c) => c,
            StreamResult::Eof => {
                return Err(LexerError::at(ErrorKind::UnterminatedString, self.token_start))
            }
        };

        let decoded = match c {
            'n' => '\n',
            'r' => '\r',
            't' => '\t',
            'b' => '\u{0008}',
            'f' => '\u{000C}',
            'u' => self.scan_hex(stream, 4, 'u', at)?,
            'x' => self.scan_hex(stream, 2, 'x', at)?,
            // \\ \" \' and unknown escapes keep the character
            other => other,
        };
        Ok(decoded)
    }

    fn scan_hex(
        &mut self,
        stream: &mut CharStream,
        digits: usize,
        marker: char,
        at: SourcePosition,
    ) -> Result<char, LexerError> {
        let mut text = String::new();
        for _ in 0..digits {
            match stream.try_peek(0) {
                StreamResult::Ok(h) if h.is_ascii_hexdigit() => {
                    text.push(h);
                    let _ = stream.try_advance();
                }
                _ => {
                    return Err(LexerError::at(
                        ErrorKind::InvalidEscape(format!("\\{marker}{text}")),
                        at,
                    ))
                }
            }
        }
        u32::from_str_radix(&text, 16)
            .ok()
            .and_then(char::from_u32)
            .ok_or_else(|| LexerError::at(ErrorKind::InvalidEscape(format!("\\{marker}{text}")), at))
    }

    /// Integer, long, float or double literal
    fn scan_number(&mut self, stream: &mut CharStream) -> ScanResult<Token<EbsTokenKind>> {
        let mut value = String::new();
        let mut is_decimal = false;

        while let StreamResult::Ok(c) = stream.try_peek(0) {
            if !c.is_ascii_digit() {
                break;
            }
            value.push(c);
            let _ = stream.try_advance();
        }

        if stream.check('.') && stream.check_at(1, |c| c.is_ascii_digit()) {
            let _ = stream.try_advance();
            value.push('.');
            is_decimal = true;
            while let StreamResult::Ok(c) = stream.try_peek(0) {
                if !c.is_ascii_digit() {
                    break;
                }
                value.push(c);
                let _ = stream.try_advance();
            }
        }

        // optional type suffix, only when it is not the start of a word
        let suffix = match stream.try_peek(0) {
            StreamResult::Ok(c @ ('l' | 'L' | 'f' | 'F' | 'd' | 'D'))
                if !stream.check_at(1, is_identifier_continue) =>
            {
                let _ = stream.try_advance();
                Some(c.to_ascii_lowercase())
            }
            _ => None,
        };

        if stream.check_at(0, is_identifier_start) {
            let mut bad = value.clone();
            while let StreamResult::Ok(c) = stream.try_peek(0) {
                if !is_identifier_continue(c) {
                    break;
                }
                bad.push(c);
                let _ = stream.try_advance();
            }
            return ScanResult::Error(LexerError::at(ErrorKind::InvalidNumber(bad), self.token_start));
        }

        let kind = match (suffix, is_decimal) {
            (Some('l'), true) => {
                return ScanResult::Error(LexerError::at(
                    ErrorKind::InvalidNumber(format!("{value}l")),
                    self.token_start,
                ))
            }
            (Some('l'), false) => EbsTokenKind::LiteralLong,
            (Some('f'), _) => EbsTokenKind::LiteralFloat,
            (Some(_), _) | (None, true) => EbsTokenKind::LiteralDouble,
            (None, false) => {
                if value.parse::<i32>().is_ok() {
                    EbsTokenKind::LiteralInt
                } else {
                    EbsTokenKind::LiteralLong
                }
            }
        };

        if kind == EbsTokenKind::LiteralLong && value.parse::<i64>().is_err() {
            return ScanResult::Error(LexerError::at(ErrorKind::InvalidNumber(value), self.token_start));
        }

        self.make(stream, kind, value)
    }

    fn scan_identifier_or_keyword(&mut self, stream: &mut CharStream) -> ScanResult<Token<EbsTokenKind>> {
        let mut value = String::new();
        while let StreamResult::Ok(c) = stream.try_peek(0) {
            if !is_identifier_continue(c) {
                break;
            }
            value.push(c);
            let _ = stream.try_advance();
        }

        let kind = self.lookup_keyword(&value);
        self.make(stream, kind, value)
    }

    fn lookup_keyword(&self, word: &str) -> EbsTokenKind {
        let lower = word.to_ascii_lowercase();
        self.keywords
            .iter()
            .find(|(kw, _)| *kw == lower)
            .map(|(_, kind)| *kind)
            .unwrap_or(EbsTokenKind::Identifier)
    }
}

/// `YYYY-MM-DD` optionally followed by `[T ]HH:MM[:SS]`
pub fn looks_like_date(s: &str) -> bool {
    fn digits(b: &[u8]) -> bool {
        b.iter().all(u8::is_ascii_digit)
    }

    let b = s.as_bytes();
    let date_ok = b.len() >= 10
        && digits(&b[0..4])
        && b[4] == b'-'
        && digits(&b[5..7])
        && b[7] == b'-'
        && digits(&b[8..10]);
    if !date_ok {
        return false;
    }

    match b.len() {
        10 => true,
        16 | 19 => {
            (b[10] == b'T' || b[10] == b' ')
                && digits(&b[11..13])
                && b[13] == b':'
                && digits(&b[14..16])
                && (b.len() == 16 || (b[16] == b':' && digits(&b[17..19])))
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect_tokens(input: &str) -> Vec<Token<EbsTokenKind>> {
        let mut stream = CharStream::new(input);
        let mut scanner = EbsScanner::new();
        let mut tokens = Vec::new();

        loop {
            match scanner.next_token(&mut stream) {
                ScanResult::Token(t) => tokens.push(t),
                ScanResult::Eof => break,
                ScanResult::Error(e) => panic!("Lex error: {:?}", e),
            }
        }
        tokens
    }

    fn kinds(input: &str) -> Vec<EbsTokenKind> {
        collect_tokens(input).into_iter().map(|t| t.kind).collect()
    }

    fn first_error(input: &str) -> LexerError {
        let mut stream = CharStream::new(input);
        let mut scanner = EbsScanner::new();
        loop {
            match scanner.next_token(&mut stream) {
                ScanResult::Token(_) => continue,
                ScanResult::Eof => panic!("expected a lex error in {input:?}"),
                ScanResult::Error(e) => return e,
            }
        }
    }

    #[test]
    fn test_single_char_operators() {
        use EbsTokenKind::*;
        assert_eq!(
            kinds("+-*/%^{}[]();,.:"),
            vec![
                Plus,
                Minus,
                Asterisk,
                Slash,
                Percent,
                Caret,
                LeftCurlyBrace,
                RightCurlyBrace,
                LeftSquareBracket,
                RightSquareBracket,
                LeftParenthesis,
                RightParenthesis,
                Semicolon,
                Comma,
                Dot,
                Colon
            ]
        );
    }

    #[test]
    fn test_multi_char_operators() {
        use EbsTokenKind::*;
        assert_eq!(
            kinds("== != <= >= => =< ++ -- += -= *= /= && || !"),
            vec![
                DoubleEqual,
                ExclamationEqual,
                LessThanEqual,
                GreaterThanEqual,
                GreaterThanEqual,
                LessThanEqual,
                PlusPlus,
                MinusMinus,
                PlusEqual,
                MinusEqual,
                AsteriskEqual,
                SlashEqual,
                And,
                Or,
                Exclamation
            ]
        );
    }

    #[test]
    fn test_keywords_case_insensitive() {
        use EbsTokenKind::*;
        assert_eq!(
            kinds("VAR While ELSE foreach Exceptions wHeN and OR"),
            vec![Var, While, Else, Foreach, Exceptions, When, And, Or]
        );
    }

    #[test]
    fn test_keyword_keeps_original_text() {
        let tokens = collect_tokens("Integer myVar");
        assert_eq!(tokens[0].kind, EbsTokenKind::TypeInt);
        assert_eq!(tokens[0].lexeme(), "Integer");
        assert_eq!(tokens[1].kind, EbsTokenKind::Identifier);
        assert_eq!(tokens[1].lexeme(), "myVar");
    }

    #[test]
    fn test_hash_is_call() {
        assert_eq!(kinds("#f"), vec![EbsTokenKind::Call, EbsTokenKind::Identifier]);
    }

    #[test]
    fn test_numbers() {
        let tokens = collect_tokens("0 123 3000000000 7L 1.5 2f 2.5d 9D");
        let got: Vec<_> = tokens.iter().map(|t| (t.kind, t.lexeme().to_string())).collect();
        assert_eq!(
            got,
            vec![
                (EbsTokenKind::LiteralInt, "0".into()),
                (EbsTokenKind::LiteralInt, "123".into()),
                (EbsTokenKind::LiteralLong, "3000000000".into()),
                (EbsTokenKind::LiteralLong, "7".into()),
                (EbsTokenKind::LiteralDouble, "1.5".into()),
                (EbsTokenKind::LiteralFloat, "2".into()),
                (EbsTokenKind::LiteralDouble, "2.5".into()),
                (EbsTokenKind::LiteralDouble, "9".into()),
            ]
        );
    }

    #[test]
    fn test_number_then_dot_member() {
        // `1.length` is not a decimal
        assert_eq!(
            kinds("a[1].x"),
            vec![
                EbsTokenKind::Identifier,
                EbsTokenKind::LeftSquareBracket,
                EbsTokenKind::LiteralInt,
                EbsTokenKind::RightSquareBracket,
                EbsTokenKind::Dot,
                EbsTokenKind::Identifier
            ]
        );
    }

    #[test]
    fn test_bad_number_suffix() {
        let err = first_error("12abc");
        assert!(matches!(err.kind, ErrorKind::InvalidNumber(ref s) if s == "12abc"));
    }

    #[test]
    fn test_strings_and_escapes() {
        let tokens = collect_tokens(r#""a\tb\n" 'it\'s' "A\x42" "q\"q""#);
        assert_eq!(tokens[0].lexeme(), "a\tb\n");
        assert_eq!(tokens[1].lexeme(), "it's");
        assert_eq!(tokens[2].lexeme(), "AB");
        assert_eq!(tokens[3].lexeme(), "q\"q");
        assert!(tokens.iter().all(|t| t.kind == EbsTokenKind::LiteralString));
    }

    #[test]
    fn test_multiline_string_tracks_lines() {
        let tokens = collect_tokens("\"a\nb\" x");
        assert_eq!(tokens[0].lexeme(), "a\nb");
        assert_eq!(tokens[1].span.start.line, 2);
    }

    #[test]
    fn test_invalid_hex_escape() {
        let err = first_error(r#""\xZZ""#);
        assert!(matches!(err.kind, ErrorKind::InvalidEscape(_)));
    }

    #[test]
    fn test_unterminated_string() {
        let err = first_error("var s = \"abc");
        assert_eq!(err.kind, ErrorKind::UnterminatedString);
        assert_eq!(err.column(), 9);
    }

    #[test]
    fn test_invalid_char() {
        let err = first_error("var x = 1 @ 2;");
        assert_eq!(err.kind, ErrorKind::InvalidChar('@'));
        assert_eq!(err.line(), 1);
    }

    #[test]
    fn test_single_ampersand_is_invalid() {
        let err = first_error("a & b");
        assert_eq!(err.kind, ErrorKind::InvalidChar('&'));
    }

    #[test]
    fn test_date_literals() {
        let tokens = collect_tokens(r#""2024-03-01" "2024-03-01 10:30" "2024-03-01T10:30:15" "2024-3-1""#);
        assert_eq!(tokens[0].kind, EbsTokenKind::LiteralDate);
        assert_eq!(tokens[1].kind, EbsTokenKind::LiteralDate);
        assert_eq!(tokens[2].kind, EbsTokenKind::LiteralDate);
        assert_eq!(tokens[3].kind, EbsTokenKind::LiteralString);
    }

    #[test]
    fn test_comments_skipped() {
        assert_eq!(
            kinds("a // line\n /* block\n comment */ b"),
            vec![EbsTokenKind::Identifier, EbsTokenKind::Identifier]
        );
    }

    #[test]
    fn test_unterminated_block_comment() {
        let err = first_error("a /* never closed");
        assert!(matches!(err.kind, ErrorKind::Custom(_)));
    }

    #[test]
    fn test_token_positions() {
        let tokens = collect_tokens("var x\n  = 1;");
        assert_eq!((tokens[0].span.start.line, tokens[0].span.start.column), (1, 1));
        assert_eq!((tokens[2].span.start.line, tokens[2].span.start.column), (2, 3));
    }
}
