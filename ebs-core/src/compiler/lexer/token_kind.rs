//! EBS token kinds

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Default)]
pub enum EbsTokenKind {
    // keywords
    Var,
    Const,
    Print,
    Call,
    Return,
    Import,
    Function,
    Typeof,
    If,
    Then,
    Else,
    For,
    Foreach,
    In,
    While,
    Do,
    Break,
    Exit,
    Continue,
    Try,
    Exceptions,
    When,
    Raise,
    Exception,
    And,
    Or,
    Not,
    Null,
    True,
    False,
    Record,
    Bitmap,
    Intmap,

    // type names
    TypeByte,
    TypeInt,
    TypeLong,
    TypeFloat,
    TypeDouble,
    TypeString,
    TypeDate,
    TypeBool,
    TypeJson,
    TypeArray,
    TypeMap,

    // literals
    LiteralInt,
    LiteralLong,
    LiteralFloat,
    LiteralDouble,
    LiteralString,
    LiteralDate,

    Identifier,

    // two-character symbols
    DoubleEqual,
    ExclamationEqual,
    GreaterThanEqual,
    LessThanEqual,
    PlusPlus,
    MinusMinus,
    PlusEqual,
    MinusEqual,
    AsteriskEqual,
    SlashEqual,

    // single-character symbols
    GreaterThan,
    LessThan,
    Plus,
    Minus,
    Asterisk,
    Slash,
    Percent,
    Caret,
    Exclamation,
    Equal,
    Colon,
    Comma,
    Semicolon,
    Dot,
    LeftParenthesis,
    RightParenthesis,
    LeftCurlyBrace,
    RightCurlyBrace,
    LeftSquareBracket,
    RightSquareBracket,

    #[default]
    Eof,
}

impl EbsTokenKind {
    /// Reserved words plus type names; any of these may still appear as a
    /// member name after `.`
    pub fn is_word(&self) -> bool {
        *self <= EbsTokenKind::TypeMap || *self == EbsTokenKind::Identifier
    }

    pub fn is_type_name(&self) -> bool {
        (EbsTokenKind::TypeByte..=EbsTokenKind::TypeMap).contains(self)
    }

    pub fn is_literal(&self) -> bool {
        (EbsTokenKind::LiteralInt..=EbsTokenKind::LiteralDate).contains(self)
    }

    /// Compound assignment operator -> underlying binary operator
    pub fn compound_base(&self) -> Option<EbsTokenKind> {
        match self {
            EbsTokenKind::PlusEqual => Some(EbsTokenKind::Plus),
            EbsTokenKind::MinusEqual => Some(EbsTokenKind::Minus),
            EbsTokenKind::AsteriskEqual => Some(EbsTokenKind::Asterisk),
            EbsTokenKind::SlashEqual => Some(EbsTokenKind::Slash),
            _ => None,
        }
    }

    /// Source spelling used in diagnostics
    pub fn describe(&self) -> &'static str {
        match self {
            EbsTokenKind::Identifier => "identifier",
            EbsTokenKind::LiteralInt
            | EbsTokenKind::LiteralLong
            | EbsTokenKind::LiteralFloat
            | EbsTokenKind::LiteralDouble => "number",
            EbsTokenKind::LiteralString => "string",
            EbsTokenKind::LiteralDate => "date",
            EbsTokenKind::DoubleEqual => "==",
            EbsTokenKind::ExclamationEqual => "!=",
            EbsTokenKind::GreaterThanEqual => ">=",
            EbsTokenKind::LessThanEqual => "<=",
            EbsTokenKind::PlusPlus => "++",
            EbsTokenKind::MinusMinus => "--",
            EbsTokenKind::PlusEqual => "+=",
            EbsTokenKind::MinusEqual => "-=",
            EbsTokenKind::AsteriskEqual => "*=",
            EbsTokenKind::SlashEqual => "/=",
            EbsTokenKind::GreaterThan => ">",
            EbsTokenKind::LessThan => "<",
            EbsTokenKind::Plus => "+",
            EbsTokenKind::Minus => "-",
            EbsTokenKind::Asterisk => "*",
            EbsTokenKind::Slash => "/",
            EbsTokenKind::Percent => "%",
            EbsTokenKind::Caret => "^",
            EbsTokenKind::Exclamation => "!",
            EbsTokenKind::Equal => "=",
            EbsTokenKind::Colon => ":",
            EbsTokenKind::Comma => ",",
            EbsTokenKind::Semicolon => ";",
            EbsTokenKind::Dot => ".",
            EbsTokenKind::LeftParenthesis => "(",
            EbsTokenKind::RightParenthesis => ")",
            EbsTokenKind::LeftCurlyBrace => "{",
            EbsTokenKind::RightCurlyBrace => "}",
            EbsTokenKind::LeftSquareBracket => "[",
            EbsTokenKind::RightSquareBracket => "]",
            EbsTokenKind::Eof => "end of input",
            _ => "keyword",
        }
    }
}

/// Keyword table, matched against the lower-cased word
pub static KEYWORD_TABLE: &[(&str, EbsTokenKind)] = &[
    ("var", EbsTokenKind::Var),
    ("let", EbsTokenKind::Var),
    ("const", EbsTokenKind::Const),
    ("print", EbsTokenKind::Print),
    ("call", EbsTokenKind::Call),
    ("return", EbsTokenKind::Return),
    ("import", EbsTokenKind::Import),
    ("function", EbsTokenKind::Function),
    ("typeof", EbsTokenKind::Typeof),
    ("if", EbsTokenKind::If),
    ("then", EbsTokenKind::Then),
    ("else", EbsTokenKind::Else),
    ("for", EbsTokenKind::For),
    ("foreach", EbsTokenKind::Foreach),
    ("in", EbsTokenKind::In),
    ("while", EbsTokenKind::While),
    ("do", EbsTokenKind::Do),
    ("break", EbsTokenKind::Break),
    ("exit", EbsTokenKind::Exit),
    ("continue", EbsTokenKind::Continue),
    ("try", EbsTokenKind::Try),
    ("exceptions", EbsTokenKind::Exceptions),
    ("when", EbsTokenKind::When),
    ("raise", EbsTokenKind::Raise),
    ("exception", EbsTokenKind::Exception),
    ("and", EbsTokenKind::And),
    ("or", EbsTokenKind::Or),
    ("not", EbsTokenKind::Not),
    ("null", EbsTokenKind::Null),
    ("true", EbsTokenKind::True),
    ("false", EbsTokenKind::False),
    ("record", EbsTokenKind::Record),
    ("bitmap", EbsTokenKind::Bitmap),
    ("intmap", EbsTokenKind::Intmap),
    ("byte", EbsTokenKind::TypeByte),
    ("int", EbsTokenKind::TypeInt),
    ("integer", EbsTokenKind::TypeInt),
    ("long", EbsTokenKind::TypeLong),
    ("float", EbsTokenKind::TypeFloat),
    ("double", EbsTokenKind::TypeDouble),
    ("string", EbsTokenKind::TypeString),
    ("date", EbsTokenKind::TypeDate),
    ("bool", EbsTokenKind::TypeBool),
    ("boolean", EbsTokenKind::TypeBool),
    ("json", EbsTokenKind::TypeJson),
    ("array", EbsTokenKind::TypeArray),
    ("map", EbsTokenKind::TypeMap),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_classification() {
        assert!(EbsTokenKind::Var.is_word());
        assert!(EbsTokenKind::TypeMap.is_word());
        assert!(EbsTokenKind::Identifier.is_word());
        assert!(!EbsTokenKind::LiteralInt.is_word());
        assert!(!EbsTokenKind::Plus.is_word());
    }

    #[test]
    fn test_type_names() {
        assert!(EbsTokenKind::TypeInt.is_type_name());
        assert!(!EbsTokenKind::Record.is_type_name());
    }

    #[test]
    fn test_compound_base() {
        assert_eq!(EbsTokenKind::PlusEqual.compound_base(), Some(EbsTokenKind::Plus));
        assert_eq!(EbsTokenKind::Equal.compound_base(), None);
    }

    #[test]
    fn test_keyword_table_is_lowercase() {
        for (word, _) in KEYWORD_TABLE {
            assert_eq!(*word, word.to_lowercase());
        }
    }
}
