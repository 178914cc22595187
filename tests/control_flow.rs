use brisa::{Interpreter, Value};

mod common;
use common::{element, real_part, run, run_in};

// ============================================================================
// While Loops
// ============================================================================

#[test]
fn test_while_counts_down() {
    let result = run("def n = 3; def suma = 0; mientras (n) { suma = suma + n; n = n - 1; } suma;");
    assert_eq!(real_part(&result), 6.0);
}

#[test]
fn test_while_statement_value_is_null() {
    assert!(matches!(run("mientras (falso) { 1; }"), Value::Null));
}

#[test]
fn test_break_stops_the_loop_and_its_iteration() {
    let mut interp = Interpreter::new();
    let result = run_in(
        &mut interp,
        "def n = 3;
         def pasos = [];
         mientras (n) {
             pasos.agregar(n);
             n = n - 1;
             si (n == 1) { romper; }
         }
         pasos;",
    );
    assert_eq!(real_part(&element(&interp, &result, 0)), 3.0);
    assert_eq!(real_part(&element(&interp, &result, 1)), 2.0);
    assert!(matches!(element(&interp, &result, 2), Value::Null));
}

#[test]
fn test_continue_skips_the_rest_of_the_body() {
    let result = run(
        "def n = 0;
         def acum = 0;
         mientras (n != 4) {
             n = n + 1;
             si (n == 2) { continuar; }
             acum = acum + n;
         }
         acum;",
    );
    assert_eq!(real_part(&result), 8.0);
}

#[test]
fn test_return_escapes_the_loop() {
    let result = run(
        "funcion busca() {
             def n = 0;
             mientras (verdadero) {
                 n = n + 1;
                 si (n == 7) { retorna n; }
             }
         }
         busca();",
    );
    assert_eq!(real_part(&result), 7.0);
}

// ============================================================================
// Conditionals
// ============================================================================

#[test]
fn test_if_takes_the_truthy_branch() {
    let result = run("def x = 3; si (x == 1) { 'uno'; } entonces si (x == 3) { 'tres'; } entonces { 'otro'; }");
    if let Value::Str(text) = &result {
        assert_eq!(&**text, "tres");
    } else {
        panic!("Expected a string, got: {:?}", result);
    }
}

#[test]
fn test_if_falls_through_to_else() {
    let result = run("si (falso) { 1; } entonces { 2; }");
    assert_eq!(real_part(&result), 2.0);
}

#[test]
fn test_if_without_taken_branch_is_null() {
    assert!(matches!(run("si (falso) { 1; }"), Value::Null));
}

// ============================================================================
// Scoping and Return
// ============================================================================

#[test]
fn test_blocks_share_the_enclosing_frame() {
    assert_eq!(real_part(&run("def x = 1; si (verdadero) { x = 2; } x;")), 2.0);
    assert_eq!(real_part(&run("si (verdadero) { def y = 5; } y;")), 5.0);
}

#[test]
fn test_bare_return_yields_void() {
    assert!(matches!(run("funcion nada() { retorna; } nada();"), Value::Void));
}
