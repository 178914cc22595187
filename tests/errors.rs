use brisa::error::ErrorKind;
use brisa::interpreter::Environment;
use brisa::{Error, Interpreter};

mod common;
use common::{real_part, run, run_err};

// ============================================================================
// Bindings
// ============================================================================

#[test]
fn test_constant_reassignment_fails_and_keeps_the_value() {
    let mut interp = Interpreter::new();
    let env = Environment::child(&interp.globals());
    if let Err(error) = interp.eval_source_in("const x = 1;", &env) {
        panic!("Declaration should succeed, got: {}", error);
    }
    let error = match interp.eval_source_in("x = 2;", &env) {
        Ok(value) => panic!("Expected an error, got: {:?}", value),
        Err(error) => error,
    };
    assert_eq!(error.kind(), ErrorKind::ConstantAssignment);
    assert_eq!(error.message(), "No se puede reasignar la constante 'x'");
    match env.lookup("x") {
        Ok(value) => assert_eq!(real_part(&value), 1.0),
        Err(error) => panic!("Binding should survive, got: {}", error),
    }
}

#[test]
fn test_reserved_literals_reject_shadowing() {
    let error = run_err("def nulo = 1;");
    assert_eq!(error.kind(), ErrorKind::KeywordAssignment);
    assert_eq!(error.message(), "No se puede usar la palabra reservada 'nulo'");
    assert_eq!(run_err("const verdadero = 0;").kind(), ErrorKind::KeywordAssignment);
    assert_eq!(run_err("vacio = 1;").kind(), ErrorKind::KeywordAssignment);
}

#[test]
fn test_undefined_variable() {
    let error = run_err("y;");
    assert_eq!(error.kind(), ErrorKind::UndefinedVariable);
    assert_eq!(error.message(), "La variable 'y' no ha sido declarada");
}

#[test]
fn test_redeclaration_in_the_same_frame() {
    let error = run_err("def x = 1; def x = 2;");
    assert_eq!(error.kind(), ErrorKind::VariableAlreadyDeclared);
    assert_eq!(error.message(), "La variable 'x' ya ha sido declarada");
}

#[test]
fn test_shadowing_in_a_call_frame_is_allowed() {
    let result = run("def x = 1; funcion f() { def x = 2; retorna x; } f() + x;");
    assert_eq!(real_part(&result), 3.0);
}

// ============================================================================
// Calls and Properties
// ============================================================================

#[test]
fn test_calling_a_non_function_names_the_callee() {
    let error = run_err("def x = verdadero; x();");
    assert_eq!(error.kind(), ErrorKind::InvalidSyntax);
    assert_eq!(error.message(), "'x' no es una funcion");
    assert_eq!(run_err("'hola'();").message(), "'hola' no es una funcion");
    assert_eq!(run_err("def o = {}; o.m();").message(), "'nulo' no es una funcion");
}

#[test]
fn test_assigning_a_property_to_a_primitive() {
    let error = run_err("def n = 5; n.a = 1;");
    assert_eq!(error.kind(), ErrorKind::InvalidSyntax);
    assert_eq!(error.message(), "No se puede asignar la propiedad 'a' a un 'numero'");
}

#[test]
fn test_iterating_a_non_iterable() {
    let error = run_err("<5>;");
    assert_eq!(error.kind(), ErrorKind::InvalidType);
    assert_eq!(error.message(), "El valor de tipo 'numero' no es iterable");
}

// ============================================================================
// Parsing
// ============================================================================

#[test]
fn test_declaration_without_a_name() {
    assert_eq!(run_err("def = 5;").kind(), ErrorKind::InvalidSyntax);
}

#[test]
fn test_dangling_operator() {
    let error = run_err("2 +;");
    assert_eq!(error.kind(), ErrorKind::InvalidSyntax);
    assert!(error.message().contains("no se esperaba"), "got: {}", error.message());
}

// ============================================================================
// Reporting
// ============================================================================

#[test]
fn test_categories_group_the_kinds() {
    assert_eq!(ErrorKind::InvalidSyntax.category(), "ErrorSintactico");
    assert_eq!(ErrorKind::InvalidToken.category(), "ErrorSintactico");
    assert_eq!(ErrorKind::UndefinedVariable.category(), "ErrorEjecucion");
    assert_eq!(ErrorKind::FileNotFound.category(), "ErrorEjecucion");
    assert_eq!(ErrorKind::InvalidType.category(), "ErrorTipos");
    assert_eq!(ErrorKind::InvalidOperation.category(), "ErrorMatematico");
    assert_eq!(ErrorKind::MathError.category(), "ErrorMatematico");
    assert_eq!(ErrorKind::PluginError.category(), "ErrorExtension");
}

#[test]
fn test_kind_only_errors_use_the_default_message() {
    let error = Error::from_kind(ErrorKind::UnknownModule);
    assert_eq!(error.message(), "Modulo no encontrado");
    assert_eq!(Error::from_kind(ErrorKind::InvalidToken).message(), "Token invalido");
}

#[test]
fn test_display_prefixes_the_category() {
    let error = Error::invalid_operation("No se puede operar con cadenas");
    assert_eq!(
        error.to_string(),
        "ErrorMatematico:\n  No se puede operar con cadenas"
    );
}
