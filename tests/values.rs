use std::rc::Rc;

use brisa::interpreter::Environment;
use brisa::{Interpreter, Value};

mod common;
use common::{element, real_part, run, run_in};

// ============================================================================
// Number Singletons
// ============================================================================

#[test]
fn test_addition_binds_canonical_number() {
    let mut interp = Interpreter::new();
    let env = Environment::child(&interp.globals());
    interp
        .eval_source_in("def x = 1 + 2;", &env)
        .expect("Program should succeed");
    let x = env.lookup("x").expect("x should be declared");
    if let Value::Number(n) = &x {
        assert_eq!(n.real, 3.0);
        assert_eq!(n.imag, 0.0);
    } else {
        panic!("Expected a number, got: {:?}", x);
    }
}

#[test]
fn test_division_by_zero_singletons() {
    let mut interp = Interpreter::new();

    let inf = run_in(&mut interp, "1/0;");
    if let Value::Number(n) = &inf {
        assert!(Rc::ptr_eq(n, &interp.registry.infinity));
    } else {
        panic!("Expected Infinito, got: {:?}", inf);
    }

    let neg = run_in(&mut interp, "(0 - 1)/0;");
    if let Value::Number(n) = &neg {
        assert!(Rc::ptr_eq(n, &interp.registry.neg_infinity));
    } else {
        panic!("Expected -Infinito, got: {:?}", neg);
    }

    let nan = run_in(&mut interp, "0/0;");
    if let Value::Number(n) = &nan {
        assert!(Rc::ptr_eq(n, &interp.registry.nan));
    } else {
        panic!("Expected NeN, got: {:?}", nan);
    }

    // Reference-stable across repeated evaluation.
    let again = run_in(&mut interp, "1/0;");
    if let (Value::Number(a), Value::Number(b)) = (&inf, &again) {
        assert!(Rc::ptr_eq(a, b));
    } else {
        panic!("Expected numbers");
    }
}

#[test]
fn test_zero_one_minus_one_are_shared() {
    let mut interp = Interpreter::new();
    let zero = run_in(&mut interp, "5 - 5;");
    if let Value::Number(n) = &zero {
        assert!(Rc::ptr_eq(n, &interp.registry.zero));
    } else {
        panic!("Expected a number");
    }
    let minus_one = run_in(&mut interp, "2 - 3;");
    if let Value::Number(n) = &minus_one {
        assert!(Rc::ptr_eq(n, &interp.registry.neg_one));
    } else {
        panic!("Expected a number");
    }
}

#[test]
fn test_nan_equals_itself() {
    let result = run("0/0 == 0/0;");
    assert!(matches!(result, Value::Boolean(true)));
    let result = run("0/0 == 1;");
    assert!(matches!(result, Value::Boolean(false)));
}

// ============================================================================
// Complex Arithmetic
// ============================================================================

#[test]
fn test_square_root_of_minus_one() {
    let result = run("raiz(-1, 2);");
    if let Value::Number(n) = &result {
        assert_eq!(n.real, 0.0);
        assert!(n.imag != 0.0);
        let squared = n.mul(n);
        assert!((squared.real + 1.0).abs() < 1e-9);
        assert!(squared.imag.abs() < 1e-9);
    } else {
        panic!("Expected a number, got: {:?}", result);
    }
}

#[test]
fn test_imaginary_display() {
    let result = run("raiz(-1, 2).aCadena();");
    if let Value::Str(s) = &result {
        assert_eq!(s.as_ref(), "i");
    } else {
        panic!("Expected a string, got: {:?}", result);
    }
    let result = run("(1 + raiz(-1, 2)).aCadena();");
    if let Value::Str(s) = &result {
        assert_eq!(s.as_ref(), "1+i");
    } else {
        panic!("Expected a string, got: {:?}", result);
    }
}

#[test]
fn test_complex_addition_and_product() {
    // (1 + i) * (1 - i) = 2
    let result = run("(1 + raiz(-1, 2)) * (1 - raiz(-1, 2));");
    assert_eq!(real_part(&result), 2.0);
}

#[test]
fn test_special_number_display_names() {
    for (source, expected) in [
        ("(0/0).aCadena();", "NeN"),
        ("(1/0).aCadena();", "Infinito"),
        ("((0 - 1)/0).aCadena();", "-Infinito"),
    ] {
        let result = run(source);
        if let Value::Str(s) = &result {
            assert_eq!(s.as_ref(), expected, "source: {}", source);
        } else {
            panic!("Expected a string for: {}", source);
        }
    }
}

// ============================================================================
// Payload Coercion
// ============================================================================

#[test]
fn test_numeric_string_coerces_in_arithmetic() {
    assert_eq!(real_part(&run("'5' + 2;")), 7.0);
    assert_eq!(real_part(&run("'10' / 4;")), 2.5);
    assert_eq!(real_part(&run("verdadero + 1;")), 2.0);
}

#[test]
fn test_non_numeric_string_with_number_is_nan() {
    let mut interp = Interpreter::new();
    let result = run_in(&mut interp, "'total: ' + 5;");
    if let Value::Number(n) = &result {
        assert!(Rc::ptr_eq(n, &interp.registry.nan));
    } else {
        panic!("Expected NeN, got: {:?}", result);
    }
}

#[test]
fn test_string_concatenation_without_numbers() {
    let result = run("'total: ' + '5';");
    if let Value::Str(s) = &result {
        assert_eq!(s.as_ref(), "total: 5");
    } else {
        panic!("Expected a string, got: {:?}", result);
    }
}

// ============================================================================
// Property Resolution
// ============================================================================

#[test]
fn test_missing_property_is_null_never_an_error() {
    for source in [
        "def o = { a: 1 }; o.falta;",
        "def l = [1, 2]; l.falta;",
        "funcion f() {} f.falta;",
        "clase C {} C.falta;",
    ] {
        let result = run(source);
        assert!(matches!(result, Value::Null), "source: {}", source);
    }
}

#[test]
fn test_bootstrap_constructor_keys() {
    let result = run("def l = [1]; l.constructor.nombre;");
    if let Value::Str(s) = &result {
        assert_eq!(s.as_ref(), "Lista");
    } else {
        panic!("Expected the class name, got: {:?}", result);
    }
    let result = run("(5).constructor.nombre;");
    if let Value::Str(s) = &result {
        assert_eq!(s.as_ref(), "Numero");
    } else {
        panic!("Expected the class name, got: {:?}", result);
    }
}

#[test]
fn test_computed_numeric_key_coerces_to_string() {
    let result = run("def l = [4, 5, 6]; l[1];");
    assert_eq!(real_part(&result), 5.0);
}

// ============================================================================
// Iterators
// ============================================================================

#[test]
fn test_list_iteration_order_and_exhaustion() {
    let mut interp = Interpreter::new();
    let result = run_in(
        &mut interp,
        "def it = <[10, 20]>;
         def a = it.siguiente();
         def b = it.siguiente();
         def c = it.siguiente();
         [a, b, c];",
    );
    assert_eq!(real_part(&element(&interp, &result, 0)), 10.0);
    assert_eq!(real_part(&element(&interp, &result, 1)), 20.0);
    assert!(matches!(element(&interp, &result, 2), Value::Null));
}

#[test]
fn test_string_iteration_yields_characters() {
    let mut interp = Interpreter::new();
    let result = run_in(
        &mut interp,
        "def it = <'ab'>; [it.siguiente(), it.siguiente()];",
    );
    if let Value::Str(s) = &element(&interp, &result, 0) {
        assert_eq!(s.as_ref(), "a");
    } else {
        panic!("Expected a one-character string");
    }
    if let Value::Str(s) = &element(&interp, &result, 1) {
        assert_eq!(s.as_ref(), "b");
    } else {
        panic!("Expected a one-character string");
    }
}

#[test]
fn test_iterator_snapshot_ignores_later_growth() {
    let mut interp = Interpreter::new();
    let result = run_in(
        &mut interp,
        "def l = [1];
         def it = <l>;
         l.agregar(2);
         [it.siguiente(), it.siguiente()];",
    );
    assert_eq!(real_part(&element(&interp, &result, 0)), 1.0);
    assert!(matches!(element(&interp, &result, 1), Value::Null));
}

// ============================================================================
// Truthiness
// ============================================================================

#[test]
fn test_truthiness_rules() {
    assert_eq!(real_part(&run("si (0/0) { 1; } entonces { 2; }")), 2.0);
    assert_eq!(real_part(&run("si (0) { 1; } entonces { 2; }")), 2.0);
    assert_eq!(real_part(&run("si ('') { 1; } entonces { 2; }")), 2.0);
    assert_eq!(real_part(&run("si ({}) { 1; } entonces { 2; }")), 2.0);
    assert_eq!(real_part(&run("si ({ a: 1 }) { 1; } entonces { 2; }")), 1.0);
    assert_eq!(real_part(&run("si ('0') { 1; } entonces { 2; }")), 1.0);
    assert_eq!(real_part(&run("si (nulo) { 1; } entonces { 2; }")), 2.0);
    assert_eq!(real_part(&run("si (vacio) { 1; } entonces { 2; }")), 2.0);
}

// ============================================================================
// List Protocol
// ============================================================================

#[test]
fn test_agregar_appends_and_returns_the_list() {
    let mut interp = Interpreter::new();
    let result = run_in(&mut interp, "def l = [1]; l.agregar(2).agregar(3);");
    assert_eq!(real_part(&element(&interp, &result, 0)), 1.0);
    assert_eq!(real_part(&element(&interp, &result, 1)), 2.0);
    assert_eq!(real_part(&element(&interp, &result, 2)), 3.0);
}

#[test]
fn test_agregar_fills_after_highest_integer_key() {
    let mut interp = Interpreter::new();
    let result = run_in(
        &mut interp,
        "def l = [1]; l[5] = 6; l.agregar(7); l[6];",
    );
    assert_eq!(real_part(&result), 7.0);
}
