use super::super::lexer::token_kind::EbsTokenKind;

/// Binding power of an infix operator; 0 means "not an infix operator".
///
/// `^` is absent: it binds tighter than unary minus and is handled below
/// the unary level.
pub fn get_precedence(op: EbsTokenKind) -> i32 {
    match op {
        EbsTokenKind::Or => 10,
        EbsTokenKind::And => 20,
        EbsTokenKind::DoubleEqual | EbsTokenKind::ExclamationEqual => 30,
        EbsTokenKind::GreaterThan
        | EbsTokenKind::LessThan
        | EbsTokenKind::GreaterThanEqual
        | EbsTokenKind::LessThanEqual => 40,
        EbsTokenKind::Plus | EbsTokenKind::Minus => 50,
        EbsTokenKind::Asterisk | EbsTokenKind::Slash | EbsTokenKind::Percent => 60,
        _ => 0,
    }
}

/// `true` for left-associative operators
pub fn get_associativity(op: EbsTokenKind) -> bool {
    !matches!(op, EbsTokenKind::Caret)
}

pub fn is_relational(op: EbsTokenKind) -> bool {
    get_precedence(op) == 40
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precedence_order() {
        assert!(get_precedence(EbsTokenKind::Or) < get_precedence(EbsTokenKind::And));
        assert!(get_precedence(EbsTokenKind::And) < get_precedence(EbsTokenKind::DoubleEqual));
        assert!(get_precedence(EbsTokenKind::DoubleEqual) < get_precedence(EbsTokenKind::LessThan));
        assert!(get_precedence(EbsTokenKind::LessThan) < get_precedence(EbsTokenKind::Plus));
        assert!(get_precedence(EbsTokenKind::Plus) < get_precedence(EbsTokenKind::Percent));
        assert_eq!(get_precedence(EbsTokenKind::Semicolon), 0);
    }

    #[test]
    fn test_caret_is_right_associative() {
        assert!(!get_associativity(EbsTokenKind::Caret));
        assert!(get_associativity(EbsTokenKind::Minus));
    }
}
