//! Declared types: coercion, records, bitmaps, arrays, json and maps

mod common;

use common::{error_of, output_of, run_code};
use ebs_core::runtime::json::value_to_json;
use ebs_core::ErrorKind;
use serde_json::json;

#[test]
fn test_declared_coercions() {
    let output = output_of(
        r#"
var i: int = "42";
var d: double = 3;
var s: string = 12.5;
var b: bool = "TRUE";
var l: long = 7.9;
var n: int = null;
var t: date = "2024-03-01";
print i + 1;
print d;
print s + "!";
print b;
print l;
print n;
print typeof t;
"#,
    );
    assert_eq!(output, vec!["43", "3.0", "12.5!", "true", "7", "0", "date"]);
}

#[test]
fn test_bad_coercion_is_type_error() {
    assert_eq!(error_of(r#"var i: int = "abc";"#).kind, ErrorKind::TypeError);
    assert_eq!(error_of(r#"var b: bool = "yes";"#).kind, ErrorKind::TypeError);
    assert_eq!(error_of("var i: int = true;").kind, ErrorKind::TypeError);
}

#[test]
fn test_assignment_keeps_declared_type() {
    let output = output_of(r#"var n: int = 1; n = "5"; n += 2.7; print n; print typeof n;"#);
    assert_eq!(output, vec!["7", "int"]);
}

#[test]
fn test_json_text_coercion() {
    let output = output_of(r#"var j: json = "{\"a\": [1, 2, 3]}"; print j.a.length;"#);
    assert_eq!(output, vec!["3"]);

    let err = error_of(r#"var j: json = "{oops";"#);
    assert_eq!(err.kind, ErrorKind::ParseError);
}

#[test]
fn test_record_from_json_and_back() {
    let result = run_code(
        r#"
P typeof record { x: int, y: int };
var p: P = {"x": 1, "y": 2};
print p.x;
print p.y;
var back: json = p;
print back;
"#,
    )
    .unwrap();
    assert_eq!(result.output, vec!["1", "2", r#"{"x":1,"y":2}"#]);

    let p = result.global("p").unwrap();
    assert_eq!(value_to_json(&p).unwrap(), json!({"x": 1, "y": 2}));
}

#[test]
fn test_record_json_matching_rules() {
    let output = output_of(
        r#"
Point typeof record { x: int, y: int };
Line typeof record { start: Point, label: string };
var l: Line = {"START": {"X": "3"}, "extra": true};
print l.start.x;
print l.start.y;
print l.label == "";
"#,
    );
    assert_eq!(output, vec!["3", "0", "true"]);
}

#[test]
fn test_record_forward_reference() {
    let output = output_of(
        r#"
Outer typeof record { inner: Inner };
Inner typeof record { v: int };
var o: Outer;
o.inner.v = 9;
print o.inner.v;
"#,
    );
    assert_eq!(output, vec!["9"]);
}

#[test]
fn test_unknown_type() {
    let err = error_of("var x: Missing;");
    assert_eq!(err.kind, ErrorKind::NotFoundError);
}

#[test]
fn test_record_field_write_coerces() {
    let output = output_of(
        r#"
P typeof record { x: int, name: string };
var p: P;
p.x = "7";
p.name = 5;
print p.x + 1;
print typeof p.name;
"#,
    );
    assert_eq!(output, vec!["8", "string"]);

    let err = error_of("P typeof record { x: int };\nvar p: P;\np.z = 1;");
    assert_eq!(err.kind, ErrorKind::NotFoundError);
}

#[test]
fn test_composites_share_storage() {
    let output = output_of(
        r#"
P typeof record { x: int };
var a = [1, 2];
var b = a;
b[0] = 9;
print a[0];
var p: P = {"x": 1};
var q = p;
q.x = 10;
print p.x;
var n = 5;
var m = n;
m = 6;
print n;
"#,
    );
    assert_eq!(output, vec!["9", "10", "5"]);
}

#[test]
fn test_bitmap_round_trip_and_isolation() {
    let output = output_of(
        r#"
Flags typeof bitmap { active: 0, level: 1-3, mode: 4-5 };
var f: Flags;
f.mode = 2;
f.level = 5;
f.active = true;
print f.level;
print f.mode;
print f.active;
f.level = 0;
print f.mode;
print f.active;
"#,
    );
    assert_eq!(output, vec!["5", "2", "1", "2", "1"]);
}

#[test]
fn test_bitmap_value_out_of_range() {
    let err = error_of("F typeof bitmap { level: 1-3 };\nvar f: F;\nf.level = 8;");
    assert_eq!(err.kind, ErrorKind::ValidationError);
}

#[test]
fn test_bitmap_copied_by_value() {
    let output = output_of(
        r#"
F typeof intmap { low: 0-15, high: 16-31 };
var a: F;
a.high = 65535;
var b = a;
b.high = 1;
print a.high;
print b.high;
"#,
    );
    assert_eq!(output, vec!["65535", "1"]);
}

#[test]
fn test_const_bitmap_fields_stay_writable() {
    let output = output_of(
        r#"
Flags typeof bitmap { active: 0, level: 1-3 };
const f: Flags = 0;
f.level = 2;
f.active = true;
print f.level;
print f.active;
"#,
    );
    assert_eq!(output, vec!["2", "1"]);

    let err = error_of("Flags typeof bitmap { level: 1-3 };\nconst f: Flags = 0;\nf = 1;");
    assert_eq!(err.kind, ErrorKind::AccessError);
}

#[test]
fn test_oversized_array_is_index_error() {
    let err = error_of("var a: int[100000, 100000, 100000, 100000];\nprint 1;");
    assert_eq!(err.kind, ErrorKind::IndexError);
    assert_eq!(err.line, Some(1));

    let err = error_of("var a: byte[2000000000];");
    assert_eq!(err.kind, ErrorKind::IndexError);

    let err = error_of("var d: int[*];\nd[100000000] = 1;");
    assert_eq!(err.kind, ErrorKind::IndexError);
}

#[test]
fn test_self_containing_composites() {
    let output = output_of(
        r#"
var a: array = [1];
a[1] = a;
print a;
var m: map = {"n": 1};
m.self = m;
print m;
"#,
    );
    assert_eq!(output, vec!["[1, [...]]", r#"{"n":1,"self":"{...}"}"#]);

    let err = error_of("var a: array = [1];\na[1] = a;\nvar doc: json = a;");
    assert_eq!(err.kind, ErrorKind::ValidationError);
}

#[test]
fn test_casts() {
    let output = output_of(
        r#"
Flags typeof bitmap { active: 0, level: 1-3 };
Person typeof record { name: string, age: int };
var x = int("5") + 1;
print x;
print typeof x;
print string(12) + "a";
print float("2.5");
print long(7) * 1000000000;
print bool("TRUE");
var raw: byte = 5;
var f = Flags(raw);
print f.level;
print f.active;
var p = Person({"name": "Ann", "age": "41"});
print p.age + 1;
"#,
    );
    assert_eq!(
        output,
        vec!["6", "int", "12a", "2.5", "7000000000", "true", "2", "1", "42"]
    );
}

#[test]
fn test_bad_casts() {
    let err = error_of(r#"print int("abc");"#);
    assert_eq!(err.kind, ErrorKind::TypeError);
    assert!(err.message.contains("Cannot cast value 'abc' to type int"));

    let err = error_of(
        "Person typeof record { name: string };\nvar doc: json = \"[1, 2]\";\nvar p = Person(doc);",
    );
    assert_eq!(err.kind, ErrorKind::TypeError);
    assert!(err.message.contains("only JSON objects"));

    let err = error_of("Flags typeof bitmap { level: 1-3 };\nvar f = Flags(1, 2);");
    assert_eq!(err.kind, ErrorKind::ValidationError);
}

#[test]
fn test_queue_operations() {
    let output = output_of(
        r#"
var q: queue.int;
call queue.enqueue(q, 3);
call queue.enqueue(q, "4");
call queue.enqueue(q, 5);
print queue.size(q);
print q.size;
print queue.peek(q);
print queue.dequeue(q);
print queue.contains(q, 4);
foreach v in q { print v; }
print queue.toArray(q);
print typeof q;
call queue.clear(q);
print queue.isEmpty(q);
print queue.dequeue(q);
"#,
    );
    assert_eq!(
        output,
        vec!["3", "3", "3", "3", "true", "4", "5", "[4, 5]", "queue", "true", "null"]
    );
}

#[test]
fn test_queue_is_shared_and_typed() {
    let output = output_of(
        r#"
fill(target: queue.string) {
    call queue.enqueue(target, 1);
}
var names: queue.string;
call fill(names);
var alias = names;
call queue.enqueue(alias, "b");
print names;
print typeof queue.peek(names);
var copy: queue.int = [1, "2"];
print queue.dequeue(copy) + queue.dequeue(copy);
"#,
    );
    assert_eq!(output, vec!["[1, b]", "string", "3"]);

    assert_eq!(error_of("print queue.size(5);").kind, ErrorKind::TypeError);
    assert_eq!(error_of("var q: queue; q = null; print queue.size(q);").kind, ErrorKind::NullError);
    let err = error_of("var q: queue.int;\ncall queue.enqueue(q, \"x\");");
    assert_eq!(err.kind, ErrorKind::TypeError);
}

#[test]
fn test_fixed_array_bounds() {
    let output = output_of("var a: int[3];\na[2] = 5;\nprint a[2];\nprint a.length;");
    assert_eq!(output, vec!["5", "3"]);

    assert_eq!(error_of("var a: int[3];\na[3] = 1;").kind, ErrorKind::IndexError);
    assert_eq!(error_of("var a: int[3];\nprint a[3];").kind, ErrorKind::IndexError);
    assert_eq!(error_of("var a: int[3];\na[-1] = 1;").kind, ErrorKind::IndexError);
    assert_eq!(error_of("var a: int[3];\nprint a[-1];").kind, ErrorKind::IndexError);
}

#[test]
fn test_dynamic_array_grows_on_write() {
    let output = output_of(
        r#"
var d: int[*];
d[4] = 9;
print d.length;
print d;
var e: string[];
e[0] = 1;
print typeof e[0];
"#,
    );
    assert_eq!(output, vec!["5", "[0, 0, 0, 0, 9]", "string"]);

    let err = error_of("var d: int[*];\nprint d[0];");
    assert_eq!(err.kind, ErrorKind::IndexError);
}

#[test]
fn test_multi_dimensional_array() {
    let output = output_of(
        r#"
var grid: int[2, 3];
grid[1, 2] = 7;
grid[0, 1] += 4;
print grid[1, 2];
print grid[0, 1];
print grid.length;
"#,
    );
    assert_eq!(output, vec!["7", "4", "6"]);

    assert_eq!(error_of("var g: int[2, 3];\nprint g[2, 0];").kind, ErrorKind::IndexError);
    assert_eq!(error_of("var g: int[2, 3];\nprint g[1];").kind, ErrorKind::IndexError);
}

#[test]
fn test_array_from_json_and_empty_object() {
    let output = output_of(
        r#"
var a: int[*] = {};
print a.length;
var b: int[*] = json.parse("[1, \"2\", 3]");
print b[1] + 1;
var c: int[*] = {1, 2, 3};
print c.length;
"#,
    );
    assert_eq!(output, vec!["0", "3", "3"]);
}

#[test]
fn test_json_path_writes() {
    let output = output_of(
        r#"
var doc = {"a": {"b": 1}};
doc.a.b += 4;
doc.c[1] = "x";
doc["d"] = [1, 2];
print doc;
"#,
    );
    assert_eq!(output, vec![r#"{"a":{"b":5},"c":[null,"x"],"d":[1,2]}"#]);
}

#[test]
fn test_json_reads() {
    let output = output_of(
        r#"
var doc = {"Name": "ann", "tags": ["a", "b"]};
print doc.name;
print doc.tags[1];
print doc.missing;
print doc["tags"].length;
var copy = doc.tags;
copy[0] = "z";
print doc.tags[0];
"#,
    );
    assert_eq!(output, vec!["ann", "b", "null", "2", "a"]);
}

#[test]
fn test_json_foreach() {
    let output = output_of(
        r#"
var doc = {"x": 1, "y": 2};
foreach key in doc { print key; }
foreach n in json.parse("[10, 20]") { print n + 1; }
"#,
    );
    assert_eq!(output, vec!["x", "y", "11", "21"]);
}

#[test]
fn test_maps() {
    let output = output_of(
        r#"
var m: map = {"b": 2, "a": 1};
m.c = 3;
m["a"] += 10;
print m.a;
print m.length;
print m.zzz;
foreach k in m { print k; }
"#,
    );
    assert_eq!(output, vec!["11", "3", "null", "a", "b", "c"]);
}

#[test]
fn test_string_is_read_only() {
    let err = error_of(r#"var s = "abc"; s[0] = "x";"#);
    assert_eq!(err.kind, ErrorKind::TypeError);
}

#[test]
fn test_null_member_access() {
    let err = error_of("var j: json; print j.name;");
    assert_eq!(err.kind, ErrorKind::NullError);
}
