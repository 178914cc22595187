use brisa::interpreter::Environment;
use brisa::{Interpreter, Value};

mod common;
use common::{element, real_part, run, run_in};

// ============================================================================
// Declared Classes
// ============================================================================

#[test]
fn test_constructor_initializes_the_instance() {
    let result = run(
        "clase Punto {
             constructor(x, y) {
                 este.x = x;
                 este.y = y;
             }
             norma() {
                 retorna raiz(este.x ^ 2 + este.y ^ 2, 2);
             }
         }
         def p = Punto(3, 4);
         p.norma();",
    );
    assert_eq!(real_part(&result), 5.0);
}

#[test]
fn test_constructor_return_value_is_discarded() {
    let result = run("clase Caja { constructor() { este.v = 1; retorna 99; } } Caja();");
    assert!(matches!(result, Value::Object(_)), "got: {:?}", result);
    let stored = run("clase Caja { constructor() { este.v = 1; retorna 99; } } Caja().v;");
    assert_eq!(real_part(&stored), 1.0);
}

#[test]
fn test_instance_writes_shadow_the_prototype() {
    let mut interp = Interpreter::new();
    let result = run_in(
        &mut interp,
        "clase Par { valor = 1; }
         def x = Par();
         def y = Par();
         x.valor = 5;
         [x.valor, y.valor];",
    );
    assert_eq!(real_part(&element(&interp, &result, 0)), 5.0);
    assert_eq!(real_part(&element(&interp, &result, 1)), 1.0);
}

#[test]
fn test_each_declaration_gets_its_own_prototype() {
    let mut interp = Interpreter::new();
    let env = Environment::child(&interp.globals());
    let program = "clase A { m = 1; } clase B { m = 1; } def a = A();";
    if let Err(error) = interp.eval_source_in(program, &env) {
        panic!("Program should succeed, got: {}", error);
    }
    let class_a = match env.lookup("A") {
        Ok(Value::Class(class)) => class,
        other => panic!("Expected a class, got: {:?}", other),
    };
    let class_b = match env.lookup("B") {
        Ok(Value::Class(class)) => class,
        other => panic!("Expected a class, got: {:?}", other),
    };
    assert_ne!(class_a.proto, class_b.proto);
    match env.lookup("a") {
        Ok(Value::Object(props)) => assert_eq!(props.fallback[0], class_a.proto),
        other => panic!("Expected an instance, got: {:?}", other),
    }
}

// ============================================================================
// Statics
// ============================================================================

#[test]
fn test_statics_live_on_the_class_not_the_instance() {
    let mut interp = Interpreter::new();
    let result = run_in(
        &mut interp,
        "clase M { estatico version = 2; }
         def m = M();
         [M.version, m.version];",
    );
    assert_eq!(real_part(&element(&interp, &result, 0)), 2.0);
    assert!(matches!(element(&interp, &result, 1), Value::Null));
}

#[test]
fn test_class_name_is_a_seeded_static() {
    let result = run("clase Gato { } Gato.nombre;");
    if let Value::Str(text) = &result {
        assert_eq!(&**text, "Gato");
    } else {
        panic!("Expected a string, got: {:?}", result);
    }
}

#[test]
fn test_instance_constructor_bootstraps_to_objeto() {
    let result = run("clase Rana { } def r = Rana(); r.constructor.nombre;");
    if let Value::Str(text) = &result {
        assert_eq!(&**text, "Objeto");
    } else {
        panic!("Expected a string, got: {:?}", result);
    }
}

// ============================================================================
// Builtin Factories
// ============================================================================

#[test]
fn test_lista_factory_builds_a_list() {
    let mut interp = Interpreter::new();
    let result = run_in(&mut interp, "Lista(1, 2, 3);");
    assert!(matches!(result, Value::List(_)), "got: {:?}", result);
    assert_eq!(real_part(&element(&interp, &result, 0)), 1.0);
    assert_eq!(real_part(&element(&interp, &result, 2)), 3.0);
    assert!(matches!(element(&interp, &result, 3), Value::Null));
}

#[test]
fn test_numero_factory_parses_its_argument() {
    assert_eq!(real_part(&run("Numero('7') + 1;")), 8.0);
}

#[test]
fn test_cadena_factory_renders_its_argument() {
    let result = run("Cadena(42);");
    if let Value::Str(text) = &result {
        assert_eq!(&**text, "42");
    } else {
        panic!("Expected a string, got: {:?}", result);
    }
}

#[test]
fn test_objeto_factory_copies_own_entries() {
    let mut interp = Interpreter::new();
    let result = run_in(&mut interp, "Objeto(Lista(1, 2));");
    assert!(matches!(result, Value::Object(_)), "got: {:?}", result);
    assert_eq!(real_part(&element(&interp, &result, 0)), 1.0);
    assert_eq!(real_part(&element(&interp, &result, 1)), 2.0);
}

#[test]
fn test_builtin_class_exposes_its_constructor() {
    assert!(matches!(run("Lista.constructor;"), Value::Function(_)));
}
