//! Whole-program tests in the style of the example X programs.

use super::{exit_code, output_of};

const MUL: &str = "func mul(val a, val b) is\n\
                     var r; var i;\n\
                   { r := 0; i := 0;\n\
                     while i < b do { r := r + a; i := i + 1 };\n\
                     return r\n\
                   }\n";

#[test]
fn mul() {
    let program = format!("{}proc main () is 0(mul(2(0), 2(0)))", MUL);
    assert_eq!(exit_code(&program, &[1, 1]), 1);
    assert_eq!(exit_code(&program, &[3, 13]), 39);
    assert_eq!(exit_code(&program, &[13, 3]), 39);
}

#[test]
fn div() {
    let program = "func div(val a, val b) is\n\
                     var q;\n\
                   { q := 0;\n\
                     while b <= a do { a := a - b; q := q + 1 };\n\
                     return q\n\
                   }\n\
                   proc main () is 0(div(2(0), 2(0)))";
    assert_eq!(exit_code(program, &[1, 1]), 1);
    assert_eq!(exit_code(program, &[13, 3]), 4);
    assert_eq!(exit_code(program, &[3, 13]), 0);
}

const FIB: &str = "func fib(val n) is\n\
                     if n < 2 then return n\n\
                     else return fib(n - 1) + fib(n - 2)\n";

#[test]
fn fib() {
    let program = format!("{}proc main () is 0(fib(2(0)))", FIB);
    for (n, expected) in [0, 1, 1, 2, 3, 5, 8].iter().enumerate() {
        assert_eq!(exit_code(&program, &[n as u8]), *expected, "fib({})", n);
    }
}

#[test]
fn fib_constant_argument() {
    let program = format!("{}proc main () is 0(fib(6))", FIB);
    assert_eq!(exit_code(&program, b""), 8);
}

#[test]
fn fac() {
    let program = format!(
        "{}func fac(val n) is\n\
           if n = 0 then return 1\n\
           else return mul(n, fac(n - 1))\n\
         proc main () is 0(fac(2(0)))",
        MUL
    );
    for (n, expected) in [1, 1, 2, 6, 24, 120].iter().enumerate() {
        assert_eq!(exit_code(&program, &[n as u8]), *expected, "fac({})", n);
    }
}

#[test]
fn exp2() {
    let program = "func exp2(val n) is\n\
                     var r; var i;\n\
                   { r := 1; i := 0;\n\
                     while i < n do { r := r + r; i := i + 1 };\n\
                     return r\n\
                   }\n\
                   proc main () is 0(exp2(2(0)))";
    assert_eq!(exit_code(program, &[1]), 2);
    assert_eq!(exit_code(program, &[2]), 4);
    assert_eq!(exit_code(program, &[3]), 8);
    assert_eq!(exit_code(program, &[4]), 16);
}

#[test]
fn subtraction_of_literals() {
    assert_eq!(exit_code("proc main() is 0( ((9) - (5)) )", b""), 4);
}

#[test]
fn echo() {
    let program = "val put = 1; val get = 2;\n\
                   proc main () is { put(get(255), 0); put(get(255), 0); put(get(255), 0); 0(0) }";
    let (code, output) = super::run_x(program, b"abc");
    assert_eq!(output, b"abc");
    assert_eq!(code, 0);
}

#[test]
fn printn() {
    // Print a decimal number by recursive division, using subtraction.
    let program = "val put = 1;\n\
                   func div10(val n) is\n\
                     var q;\n\
                   { q := 0;\n\
                     while 10 <= n do { n := n - 10; q := q + 1 };\n\
                     return q\n\
                   }\n\
                   proc printn(val n) is\n\
                     var q;\n\
                   { q := div10(n);\n\
                     if q = 0 then skip else printn(q);\n\
                     put('0' + (n - mul10(q)), 0)\n\
                   }\n\
                   func mul10(val n) is\n\
                     return n + n + n + n + n + n + n + n + n + n\n\
                   proc main () is printn(2(0))";
    assert_eq!(output_of(program, &[0]), b"0");
    assert_eq!(output_of(program, &[1]), b"1");
    assert_eq!(output_of(program, &[42]), b"42");
    assert_eq!(output_of(program, &[127]), b"127");
}

#[test]
fn bubblesort() {
    let program = "array a[10];\n\
                   proc main () is\n\
                     var i; var j; var t; var sorted;\n\
                   { i := 0;\n\
                     while i < 10 do { a[i] := 10 - i; i := i + 1 };\n\
                     i := 0;\n\
                     while i < 10 do\n\
                     { j := 0;\n\
                       while j < 9 do\n\
                       { if a[j+1] < a[j] then\n\
                         { t := a[j]; a[j] := a[j+1]; a[j+1] := t }\n\
                         else skip;\n\
                         j := j + 1\n\
                       };\n\
                       i := i + 1\n\
                     };\n\
                     i := 0; sorted := 1;\n\
                     while i < 9 do\n\
                     { if a[i+1] < a[i] then sorted := 0 else skip;\n\
                       i := i + 1\n\
                     };\n\
                     if sorted = 1 then 0(0) else 0(1)\n\
                   }";
    assert_eq!(exit_code(program, b""), 0);
}
