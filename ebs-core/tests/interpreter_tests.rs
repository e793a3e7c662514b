//! End-to-end interpreter tests: statements, operators, functions

mod common;

use common::{error_of, get_int, output_of, run_code};
use ebs_core::{
    parse_program, BuiltinRegistry, BuiltinSignature, CaptureSink, ErrorKind, Interpreter, Value,
};

#[test]
fn test_print_and_arithmetic() {
    let output = output_of(
        r#"
var a = 7;
var b = 2;
print a / b;
print a % b;
print a * b + 1;
print 2 ^ 3;
print 7.0 / 2;
"#,
    );
    assert_eq!(output, vec!["3", "1", "15", "8.0", "3.5"]);
}

#[test]
fn test_string_plus_concatenates() {
    let output = output_of(
        r#"
var s = "abc" + "def";
print s;
print "n=" + 5;
print 1 + "x";
"#,
    );
    assert_eq!(output, vec!["abcdef", "n=5", "1x"]);
}

#[test]
fn test_int_string_coercion_then_arithmetic() {
    let result = run_code(r#"var x: int = "10"; var y: int = x + 5; print y;"#).unwrap();
    assert_eq!(result.output, vec!["15"]);
    assert_eq!(result.global("y").and_then(|v| v.as_i64()), Some(15));
}

#[test]
fn test_integer_division_by_zero() {
    let err = error_of("var a = 1; var b = 0; var c = a / b; print \"after\";");
    assert_eq!(err.kind, ErrorKind::MathError);
    assert_eq!(err.line, Some(1));

    let err = error_of("print 5 % 0;");
    assert_eq!(err.kind, ErrorKind::MathError);
}

#[test]
fn test_division_by_zero_stops_expression() {
    let result = run_code(
        r#"
var hits = 0;
bump() return int { hits = hits + 1; return 1; }
try {
    var x = 1 / 0 + bump();
} exceptions {
    when MATH_ERROR { print "caught"; }
}
print hits;
"#,
    )
    .unwrap();
    assert_eq!(result.output, vec!["caught", "0"]);
}

#[test]
fn test_int_overflow_promotes_to_long() {
    let output = output_of("var big = 2147483647; print typeof (big + 1); print big + 1;");
    assert_eq!(output, vec!["long", "2147483648"]);
}

#[test]
fn test_parenthesized_condition_prefix() {
    let output = output_of(
        r#"
var a = false;
var b = true;
var c = true;
var n = 0;
while (a || b) && c {
    n = n + 1;
    if n >= 3 { c = false; }
}
print n;
if (a || b) && c { print "if-true"; } else { print "if-false"; }
c = true;
if (a || b) && c then print "then-form";
for (var i = 0; (a || b) && i < 2; i++) { print "for " + i; }
var k = 0;
do { k++; } while (a || b) && k < 4;
print k;
"#,
    );
    assert_eq!(
        output,
        vec!["3", "if-false", "then-form", "for 0", "for 1", "4"]
    );
}

#[test]
fn test_chain_comparison() {
    let output = output_of("var x = 5; print 1 < x <= 5; print 1 < x < 5;");
    assert_eq!(output, vec!["true", "false"]);
}

#[test]
fn test_logical_short_circuit() {
    let output = output_of(
        r#"
var calls = 0;
touch() return bool { calls = calls + 1; return true; }
var r1 = false && touch();
var r2 = true || touch();
var r3 = true && touch();
print calls;
"#,
    );
    assert_eq!(output, vec!["1"]);
}

#[test]
fn test_condition_must_be_bool() {
    let err = error_of("if 1 { print 1; }");
    assert_eq!(err.kind, ErrorKind::TypeError);
}

#[test]
fn test_null_equality() {
    let output = output_of(
        r#"
var n = null;
print n == null;
print n != 0;
print 0 == null;
print 1 == 1.0;
"#,
    );
    assert_eq!(output, vec!["true", "true", "false", "true"]);
}

#[test]
fn test_named_and_default_arguments() {
    let output = output_of(
        r#"
f(a: int, b: int = 10) return int { return a + b; }
print f(a = 5);
print f(b = 1, a = 2);
print f(4, b = 4);
call f(1);
"#,
    );
    assert_eq!(output, vec!["15", "3", "8"]);
}

#[test]
fn test_missing_required_argument() {
    let err = error_of("f(a: int, b: int = 10) return int { return a + b; }\nprint f(b = 1);");
    assert_eq!(err.kind, ErrorKind::ValidationError);

    let err = error_of("f(a: int) { }\ncall f(1, a = 2);");
    assert_eq!(err.kind, ErrorKind::ValidationError);
    assert!(err.message.contains("more than once"), "{}", err.message);
}

#[test]
fn test_default_sees_earlier_parameter() {
    let output = output_of("area(w: int, h: int = w) return int { return w * h; }\nprint area(3);");
    assert_eq!(output, vec!["9"]);
}

#[test]
fn test_default_evaluated_in_callee_scope() {
    // the caller's local `w` is not visible to the default expression
    let err = error_of(
        r#"
f(x: int = w) return int { return x; }
g() { var w = 3; print f(); }
call g();
"#,
    );
    assert_eq!(err.kind, ErrorKind::NotFoundError);
}

#[test]
fn test_function_case_insensitive() {
    let output = output_of("Greet(name: string) { print \"hi \" + name; }\ncall GREET(\"bo\");\n#greet(\"al\");");
    assert_eq!(output, vec!["hi bo", "hi al"]);
}

#[test]
fn test_variables_case_insensitive() {
    let output = output_of("var Total = 1; total = TOTAL + 1; print total;");
    assert_eq!(output, vec!["2"]);
}

#[test]
fn test_return_coerced_and_implicit_null() {
    let output = output_of(
        r#"
half(n: int) return int { return n / 2.0; }
nothing() { var x = 1; }
print half(7);
print nothing();
"#,
    );
    assert_eq!(output, vec!["3", "null"]);
}

#[test]
fn test_recursion() {
    let output = output_of(
        r#"
fact(n: int) return long {
    if n <= 1 { return 1; }
    return n * fact(n - 1);
}
print fact(20);
"#,
    );
    assert_eq!(output, vec!["2432902008176640000"]);
}

#[test]
fn test_recursion_limit() {
    let err = error_of("down(n: int) { call down(n + 1); }\ncall down(0);");
    assert_eq!(err.kind, ErrorKind::ValidationError);
}

/// Run `code` with the stock interpreter on a thread with the usual 2 MiB
/// stack and report how it ended
fn run_on_small_stack(code: &'static str) -> Result<Option<i64>, ErrorKind> {
    std::thread::Builder::new()
        .stack_size(2 * 1024 * 1024)
        .spawn(move || {
            let program = parse_program(code).expect("parse");
            let mut interpreter = Interpreter::new().with_output(CaptureSink::new());
            interpreter
                .run(&program)
                .map(|value| value.as_i64())
                .map_err(|e| e.kind)
        })
        .expect("spawn")
        .join()
        .expect("interpreter thread panicked")
}

#[test]
fn test_recursion_limit_at_default_depth() {
    let result = run_on_small_stack("f(n: int) return int { return f(n + 1); }\nreturn f(0);");
    assert_eq!(result, Err(ErrorKind::ValidationError));
}

#[test]
fn test_deep_recursion_under_default_depth() {
    let result = run_on_small_stack(
        r#"
count(n: int) return int {
    if n == 0 { return 0; }
    return 1 + count(n - 1);
}
return count(250);
"#,
    );
    assert_eq!(result, Ok(Some(250)));
}

#[test]
fn test_break_continue_and_exit() {
    let output = output_of(
        r#"
var total = 0;
for (var i = 0; i < 10; i++) {
    if i == 5 { break; }
    if i % 2 == 0 { continue; }
    total += i;
}
print total;
var found = -1;
for (var r = 0; r < 3; r++) {
    foreach v in [1, 2, 3] {
        if v == 2 && r == 1 {
            found = r;
            exit for;
        }
    }
}
print found;
"#,
    );
    assert_eq!(output, vec!["4", "1"]);
}

#[test]
fn test_return_inside_loop_ends_function() {
    let output = output_of(
        r#"
first_even(items: array) return int {
    foreach n in items {
        if n % 2 == 0 { return n; }
    }
    return -1;
}
print first_even([3, 5, 8, 10]);
"#,
    );
    assert_eq!(output, vec!["8"]);
}

#[test]
fn test_top_level_return_value() {
    let result = run_code("var x = 40; return x + 2; print \"unreachable\";").unwrap();
    assert_eq!(get_int(&result), Some(42));
    assert!(result.output.is_empty());
}

#[test]
fn test_block_scope() {
    let err = error_of("{ var inner = 1; }\nprint inner;");
    assert_eq!(err.kind, ErrorKind::NotFoundError);

    let output = output_of("var x = 1; { var x = 2; print x; } print x;");
    assert_eq!(output, vec!["2", "1"]);
}

#[test]
fn test_functions_do_not_see_caller_locals() {
    let err = error_of("peek() { print hidden; }\nrun() { var hidden = 1; call peek(); }\ncall run();");
    assert_eq!(err.kind, ErrorKind::NotFoundError);
}

#[test]
fn test_const_assignment() {
    let err = error_of("const limit = 3; limit = 4;");
    assert_eq!(err.kind, ErrorKind::AccessError);
}

#[test]
fn test_typeof() {
    let output = output_of(
        r#"
print typeof 1;
print typeof "s";
print typeof 1.5;
print typeof [1];
print typeof {"a": 1};
print typeof null;
"#,
    );
    assert_eq!(output, vec!["int", "string", "double", "array", "json", "null"]);
}

#[test]
fn test_builtin_calls() {
    let output = output_of(
        r#"
print string.toupper("abc");
print string.toLower(text = "XyZ");
print string.length(12345);
var j = json.parse("{\"a\": [1, 2]}");
print j.a[1];
"#,
    );
    assert_eq!(output, vec!["ABC", "xyz", "5", "2"]);
}

#[test]
fn test_user_function_shadows_builtin() {
    let mut builtins = BuiltinRegistry::new();
    builtins.register("greet", BuiltinSignature::default(), |_| Ok(Value::str("builtin")));
    let output = CaptureSink::new();
    let program = parse_program("greet() return string { return \"user\"; }\nprint greet();").unwrap();
    Interpreter::new()
        .with_builtins(builtins)
        .with_output(output.clone())
        .run(&program)
        .unwrap();
    assert_eq!(output.lines(), vec!["user"]);
}

#[test]
fn test_unknown_function() {
    let err = error_of("call nope(1);");
    assert_eq!(err.kind, ErrorKind::NotFoundError);
}

#[test]
fn test_function_reference_variable() {
    let output = output_of("twice(n: int) return int { return n * 2; }\nvar f = twice;\nprint f(4);");
    assert_eq!(output, vec!["8"]);
}

#[test]
fn test_loop_limit() {
    let err = error_of("while true { }");
    assert_eq!(err.kind, ErrorKind::ValidationError);
}

#[test]
fn test_string_iteration_and_indexing() {
    let output = output_of(
        r#"
var out = "";
foreach ch in "abc" { out = ch + out; }
print out;
print "hello"[1];
print "hello".length;
"#,
    );
    assert_eq!(output, vec!["cba", "e", "5"]);
}

#[test]
fn test_foreach_null_is_null_error() {
    let err = error_of("var items = null; foreach x in items { }");
    assert_eq!(err.kind, ErrorKind::NullError);
}
