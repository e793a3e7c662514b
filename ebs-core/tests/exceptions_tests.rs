//! try / exceptions / when and raise

mod common;

use common::{error_of, output_of};
use ebs_core::ErrorKind;

#[test]
fn test_specific_handler_wins_over_catch_all() {
    let output = output_of(
        r#"
try {
    raise exception IO_ERROR("disk gone");
} exceptions {
    when IO_ERROR(m) { print "io: " + m; }
    when ANY_ERROR(m2) { print "any: " + m2; }
}
"#,
    );
    assert_eq!(output, vec!["io: disk gone"]);
}

#[test]
fn test_handlers_checked_in_source_order() {
    let output = output_of(
        r#"
try {
    raise exception IO_ERROR("x");
} exceptions {
    when ANY_ERROR { print "any"; }
    when IO_ERROR { print "io"; }
}
"#,
    );
    assert_eq!(output, vec!["any"]);
}

#[test]
fn test_every_kind_catchable() {
    for kind in ErrorKind::ALL.iter().filter(|k| **k != ErrorKind::AnyError) {
        let code = format!(
            "try {{ raise exception {0}(\"m\"); }} exceptions {{ when {0}(e) {{ print e; }} }}",
            kind.name()
        );
        assert_eq!(output_of(&code), vec!["m"], "{}", kind);
    }
}

#[test]
fn test_runtime_errors_are_caught() {
    let output = output_of(
        r#"
var a: int[2];
try { print a[5]; } exceptions { when INDEX_ERROR(m) { print "index"; } }
try { var x = 1 / 0; } exceptions { when math_error { print "math"; } }
try { var n = null; print n.field; } exceptions { when NULL_ERROR { print "null"; } }
try { call nowhere(); } exceptions { when NOT_FOUND_ERROR { print "missing"; } }
try { var i: int = "x"; } exceptions { when TYPE_ERROR { print "type"; } }
"#,
    );
    assert_eq!(output, vec!["index", "math", "null", "missing", "type"]);
}

#[test]
fn test_unmatched_error_propagates() {
    let err = error_of(
        r#"
try {
    raise exception DB_ERROR("locked");
} exceptions {
    when IO_ERROR { print "io"; }
}
"#,
    );
    assert_eq!(err.kind, ErrorKind::DbError);
    assert_eq!(err.message, "locked");
    assert_eq!(err.line, Some(3));
}

#[test]
fn test_nested_try_rethrow() {
    let output = output_of(
        r#"
try {
    try {
        raise exception VALIDATION_ERROR("bad");
    } exceptions {
        when VALIDATION_ERROR(m) { raise exception ACCESS_ERROR("wrapped " + m); }
    }
} exceptions {
    when ACCESS_ERROR(m) { print m; }
}
"#,
    );
    assert_eq!(output, vec!["wrapped bad"]);
}

#[test]
fn test_raise_without_message() {
    let err = error_of("raise exception NETWORK_ERROR;");
    assert_eq!(err.kind, ErrorKind::NetworkError);
    assert_eq!(err.message, "NETWORK_ERROR raised with no message");
}

#[test]
fn test_error_from_function_caught_by_caller() {
    let output = output_of(
        r#"
check(n: int) {
    if n < 0 { raise exception VALIDATION_ERROR("negative: " + n); }
}
try { call check(-2); } exceptions { when VALIDATION_ERROR(m) { print m; } }
"#,
    );
    assert_eq!(output, vec!["negative: -2"]);
}

#[test]
fn test_break_not_caught_by_handler() {
    let output = output_of(
        r#"
var i = 0;
while true {
    try {
        i++;
        if i == 3 { break; }
    } exceptions {
        when ANY_ERROR { print "caught break"; }
    }
}
print i;
"#,
    );
    assert_eq!(output, vec!["3"]);
}

#[test]
fn test_continue_and_return_pass_through_try() {
    let output = output_of(
        r#"
pick() return string {
    try {
        return "from try";
    } exceptions {
        when ANY_ERROR { return "from handler"; }
    }
    return "after";
}
print pick();
var odd = 0;
foreach n in [1, 2, 3, 4, 5] {
    try {
        if n % 2 == 0 { continue; }
        odd++;
    } exceptions {
        when ANY_ERROR { print "never"; }
    }
}
print odd;
"#,
    );
    assert_eq!(output, vec!["from try", "3"]);
}

#[test]
fn test_handler_variable_scoped_to_handler() {
    let err = error_of(
        r#"
try { raise exception IO_ERROR("x"); } exceptions { when IO_ERROR(msg) { } }
print msg;
"#,
    );
    assert_eq!(err.kind, ErrorKind::NotFoundError);
}

#[test]
fn test_parse_error_at_runtime() {
    let output = output_of(
        r#"
try { var j = json.parse("{not json"); } exceptions { when PARSE_ERROR(m) { print "parse"; } }
"#,
    );
    assert_eq!(output, vec!["parse"]);
}
