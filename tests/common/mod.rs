#![allow(dead_code)]

use brisa::{Error, Interpreter, Value};

/// Evaluates a program in a throwaway interpreter and yields its result.
pub fn run(source: &str) -> Value {
    let mut interp = Interpreter::new();
    run_in(&mut interp, source)
}

/// Evaluates against a caller-held interpreter, for assertions that need
/// the property tables afterwards.
pub fn run_in(interp: &mut Interpreter, source: &str) -> Value {
    match interp.eval_source(source) {
        Ok(value) => value,
        Err(error) => panic!("Program should succeed, got: {}", error),
    }
}

/// Evaluates a program expected to fail and yields the error.
pub fn run_err(source: &str) -> Error {
    let mut interp = Interpreter::new();
    match interp.eval_source(source) {
        Ok(value) => panic!("Expected an error, got: {:?}", value),
        Err(error) => error,
    }
}

/// The real part of a real-number result.
pub fn real_part(value: &Value) -> f64 {
    if let Value::Number(n) = value {
        assert_eq!(n.imag, 0.0, "expected a real number, got {}", n.to_display());
        n.real
    } else {
        panic!("Expected a number, got: {:?}", value);
    }
}

/// One element of a list result, resolved through the property tables.
pub fn element(interp: &Interpreter, list: &Value, index: usize) -> Value {
    interp.resolve_property(list, &index.to_string())
}
