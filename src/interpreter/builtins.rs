use std::collections::HashMap;
use std::rc::Rc;

use rand::Rng;

use crate::ast::FunctionDecl;
use crate::error::Error;
use crate::format;
use crate::interpreter::environment::EnvRef;
use crate::interpreter::evaluator::Interpreter;
use crate::interpreter::parser::TokenParser;
use crate::json;
use crate::value::{ClassValue, Number, Properties, TableId, Tables, Value};

/// Process-scoped singletons built once at interpreter start-up: the
/// canonical numbers, one shared default property table per value family,
/// and the built-in class singletons the bootstrap `constructor`/`prototipo`
/// keys resolve to.
pub struct Registry {
    pub zero: Rc<Number>,
    pub one: Rc<Number>,
    pub neg_one: Rc<Number>,
    pub nan: Rc<Number>,
    pub infinity: Rc<Number>,
    pub neg_infinity: Rc<Number>,
    pub object_defaults: TableId,
    pub list_defaults: TableId,
    pub function_defaults: TableId,
    pub class_defaults: TableId,
    pub module_defaults: TableId,
    pub iterator_defaults: TableId,
    pub number_defaults: TableId,
    pub string_defaults: TableId,
    pub boolean_defaults: TableId,
    pub null_defaults: TableId,
    pub void_defaults: TableId,
    pub buffer_defaults: TableId,
    classes: HashMap<&'static str, Value>,
}

impl Registry {
    pub fn new(tables: &mut Tables) -> Self {
        Self {
            zero: Rc::new(Number::real(0.0)),
            one: Rc::new(Number::real(1.0)),
            neg_one: Rc::new(Number::real(-1.0)),
            nan: Rc::new(Number::real(f64::NAN)),
            infinity: Rc::new(Number::real(f64::INFINITY)),
            neg_infinity: Rc::new(Number::real(f64::NEG_INFINITY)),
            object_defaults: tables.alloc(),
            list_defaults: tables.alloc(),
            function_defaults: tables.alloc(),
            class_defaults: tables.alloc(),
            module_defaults: tables.alloc(),
            iterator_defaults: tables.alloc(),
            number_defaults: tables.alloc(),
            string_defaults: tables.alloc(),
            boolean_defaults: tables.alloc(),
            null_defaults: tables.alloc(),
            void_defaults: tables.alloc(),
            buffer_defaults: tables.alloc(),
            classes: HashMap::new(),
        }
    }

    /// The shared default table primitives and internals resolve through;
    /// complex values carry their default table in their own fallback chain.
    pub fn defaults_for(&self, tag: &str) -> Option<TableId> {
        match tag {
            "numero" => Some(self.number_defaults),
            "cadena" => Some(self.string_defaults),
            "booleano" => Some(self.boolean_defaults),
            "nulo" => Some(self.null_defaults),
            "vacio" => Some(self.void_defaults),
            "buffer" => Some(self.buffer_defaults),
            "iterador" => Some(self.iterator_defaults),
            _ => None,
        }
    }

    /// The built-in class singleton for a type tag. Only objects, lists,
    /// numbers, strings and functions have one.
    pub fn class_for(&self, tag: &str) -> Option<Value> {
        self.classes.get(tag).cloned()
    }
}

/// Fills the default tables and seeds the root environment. Runs once,
/// from [`Interpreter::new`].
pub fn install(interp: &mut Interpreter) {
    let defaults = [
        interp.registry.object_defaults,
        interp.registry.list_defaults,
        interp.registry.function_defaults,
        interp.registry.class_defaults,
        interp.registry.module_defaults,
        interp.registry.iterator_defaults,
        interp.registry.number_defaults,
        interp.registry.string_defaults,
        interp.registry.boolean_defaults,
        interp.registry.null_defaults,
        interp.registry.void_defaults,
        interp.registry.buffer_defaults,
    ];
    for table in defaults {
        seed_protocol(interp, table);
    }
    seed_function_defaults(interp);
    seed_list_defaults(interp);
    seed_iterator_defaults(interp);

    let globals = interp.globals();
    install_classes(interp, &globals);
    install_globals(interp, &globals);

    globals.declare_keyword("nulo", Value::Null);
    globals.declare_keyword("vacio", Value::Void);
    globals.declare_keyword("verdadero", Value::Boolean(true));
    globals.declare_keyword("falso", Value::Boolean(false));
}

/// `__pintar__` and `aCadena` exist on every family table.
fn seed_protocol(interp: &mut Interpreter, table: TableId) {
    let paint = interp.native_function("__pintar__", |interp, este, args| {
        let depth = depth_arg(args);
        let painted = format::default_paint(interp, este, depth)?;
        Ok(Value::string(painted))
    });
    interp.tables.set(table, "__pintar__", paint);
    let to_string = interp.native_function("aCadena", |_, este, _| {
        Ok(Value::string(este.payload_string()))
    });
    interp.tables.set(table, "aCadena", to_string);
}

fn seed_function_defaults(interp: &mut Interpreter) {
    let table = interp.registry.function_defaults;
    let to_string = interp.native_function("aCadena", |interp, este, _| {
        if let Value::Function(f) = este {
            let rendered = match &f.decl {
                Some(decl) => decl.to_source(),
                None => {
                    let name = f
                        .props
                        .resolve(&interp.tables, "nombre")
                        .map(|n| n.payload_string())
                        .unwrap_or_default();
                    format!("funcion {}(){{[codigo nativo]}}", name)
                }
            };
            return Ok(Value::string(rendered));
        }
        Ok(Value::string(este.payload_string()))
    });
    interp.tables.set(table, "aCadena", to_string);
    interp.tables.set(table, "nombre", Value::string(""));
}

fn seed_list_defaults(interp: &mut Interpreter) {
    let table = interp.registry.list_defaults;
    let add = interp.native_function("agregar", |interp, este, args| {
        let value = args.first().cloned().unwrap_or(Value::Null);
        if let Some(own) = este.properties().map(|p| p.own) {
            let index = interp.tables.next_integer_key(own);
            interp.tables.set(own, index.to_string(), value);
        }
        Ok(este.clone())
    });
    interp.tables.set(table, "agregar", add);
}

fn seed_iterator_defaults(interp: &mut Interpreter) {
    let table = interp.registry.iterator_defaults;
    let next = interp.native_function("siguiente", |_, este, _| {
        if let Value::Iterator(items) = este {
            return Ok(items.borrow_mut().pop_front().unwrap_or(Value::Null));
        }
        Ok(Value::Null)
    });
    interp.tables.set(table, "siguiente", next);
}

// === Built-in classes ===

fn install_classes(interp: &mut Interpreter, globals: &EnvRef) {
    let objeto = builtin_class(interp, "Objeto", |interp, _este, args| {
        let arg = args.first().cloned().unwrap_or(Value::Null);
        match arg.properties().map(|p| p.own) {
            Some(own) => {
                let entries: Vec<(String, Value)> = interp
                    .tables
                    .entries(own)
                    .iter()
                    .map(|(key, value)| (key.clone(), value.clone()))
                    .collect();
                Ok(interp.object_from(entries))
            }
            None => Ok(interp.new_object()),
        }
    });
    seed_object_statics(interp, &objeto);

    let lista = builtin_class(interp, "Lista", |interp, _este, args| {
        Ok(interp.list_from(args.to_vec()))
    });
    let numero = builtin_class(interp, "Numero", |interp, _este, args| {
        let n = args
            .first()
            .map(|v| v.payload_number())
            .unwrap_or(Number::real(f64::NAN));
        Ok(interp.make_number(n.real, n.imag))
    });
    let cadena = builtin_class(interp, "Cadena", |interp, _este, args| {
        let arg = args.first().cloned().unwrap_or(Value::Null);
        let rendered = format::stringify(interp, &arg)?;
        Ok(Value::string(rendered))
    });
    let funcion = builtin_class(interp, "Funcion", |interp, _este, args| {
        let mut params = Vec::new();
        let mut body = Vec::new();
        if let Some((source, names)) = args.split_last() {
            for name in names {
                params.push(name.payload_string());
            }
            body = TokenParser::produce_function_body(&source.payload_string())?;
        }
        let decl = Rc::new(FunctionDecl {
            name: String::new(),
            params,
            body,
        });
        let globals = interp.globals();
        Ok(interp.declared_function(decl, &globals))
    });

    interp.registry.classes.insert("objeto", objeto.clone());
    interp.registry.classes.insert("lista", lista.clone());
    interp.registry.classes.insert("numero", numero.clone());
    interp.registry.classes.insert("cadena", cadena.clone());
    interp.registry.classes.insert("funcion", funcion.clone());

    seed_global(globals, "Objeto", objeto);
    seed_global(globals, "Lista", lista);
    seed_global(globals, "Numero", numero);
    seed_global(globals, "Cadena", cadena);
    seed_global(globals, "Funcion", funcion);
}

fn builtin_class(
    interp: &mut Interpreter,
    name: &'static str,
    constructor: impl Fn(&mut Interpreter, &Value, &[Value]) -> Result<Value, Error> + 'static,
) -> Value {
    let proto = interp.tables.alloc();
    let statics = interp.tables.alloc();
    interp.tables.set(statics, "nombre", Value::string(name));
    let ctor = interp.native_function(name, constructor);
    let constructor = ctor.as_function().cloned();
    if let Some(f) = &constructor {
        interp
            .tables
            .set(statics, "constructor", Value::Function(Rc::clone(f)));
    }
    let class_defaults = interp.registry.class_defaults;
    Value::Class(Rc::new(ClassValue {
        name: Rc::from(name),
        constructor,
        proto,
        props: Properties::new(statics, vec![class_defaults]),
    }))
}

fn seed_object_statics(interp: &mut Interpreter, objeto: &Value) {
    let claves = interp.native_function("claves", |interp, _este, args| {
        let own = complex_arg(args)?;
        let keys: Vec<Value> = interp
            .tables
            .entries(own)
            .keys()
            .filter(|key| !is_protocol_key(key))
            .map(|key| Value::string(key.as_str()))
            .collect();
        Ok(interp.list_from(keys))
    });
    let valores = interp.native_function("valores", |interp, _este, args| {
        let own = complex_arg(args)?;
        let values: Vec<Value> = interp
            .tables
            .entries(own)
            .iter()
            .filter(|(key, _)| !is_protocol_key(key))
            .map(|(_, value)| value.clone())
            .collect();
        Ok(interp.list_from(values))
    });
    let pares = interp.native_function("pares", |interp, _este, args| {
        let own = complex_arg(args)?;
        let entries: Vec<(String, Value)> = interp
            .tables
            .entries(own)
            .iter()
            .filter(|(key, _)| !is_protocol_key(key))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        let mut pairs = Vec::with_capacity(entries.len());
        for (key, value) in entries {
            pairs.push(interp.list_from(vec![Value::string(key), value]));
        }
        Ok(interp.list_from(pairs))
    });
    let desde_pares = interp.native_function("desdePares", |interp, _este, args| {
        let arg = args.first().cloned().unwrap_or(Value::Null);
        let own = match &arg {
            Value::List(props) => props.own,
            other => {
                return Err(Error::invalid_type(format!(
                    "Se esperaba una lista, se recibio '{}'",
                    other.type_name()
                )))
            }
        };
        let mut entries = Vec::new();
        for (_, key) in interp.tables.integer_keys(own) {
            let pair = interp.tables.get(own, &key).cloned().unwrap_or(Value::Null);
            let entry_key = interp.resolve_property(&pair, "0").payload_string();
            let entry_value = interp.resolve_property(&pair, "1");
            entries.push((entry_key, entry_value));
        }
        Ok(interp.object_from(entries))
    });

    if let Some(own) = objeto.properties().map(|p| p.own) {
        interp.tables.set(own, "claves", claves);
        interp.tables.set(own, "valores", valores);
        interp.tables.set(own, "pares", pares);
        interp.tables.set(own, "desdePares", desde_pares);
    }
}

// === Standard globals ===

fn install_globals(interp: &mut Interpreter, globals: &EnvRef) {
    let pintar = interp.native_function("pintar", |interp, _este, args| {
        let mut parts = Vec::with_capacity(args.len());
        for arg in args {
            parts.push(format::paint(interp, arg, 0)?);
        }
        println!("{}", parts.join(" "));
        Ok(Value::Void)
    });
    seed_global(globals, "pintar", pintar);

    let raiz = interp.native_function("raiz", |interp, _este, args| {
        let base = args
            .first()
            .map(|v| v.payload_number())
            .unwrap_or(Number::real(f64::NAN));
        let degree = args
            .get(1)
            .map(|v| v.payload_number())
            .unwrap_or(Number::real(f64::NAN));
        if base.is_nan() || degree.is_nan() || degree.is_complex() {
            return Ok(Value::Number(Rc::clone(&interp.registry.nan)));
        }
        let result = base.root(degree.real);
        Ok(interp.make_number(result.real, result.imag))
    });
    seed_global(globals, "raiz", raiz.clone());

    let abs = interp.native_function("abs", |interp, _este, args| {
        let n = args
            .first()
            .map(|v| v.payload_number())
            .unwrap_or(Number::real(f64::NAN));
        Ok(interp.make_real(n.real.abs()))
    });
    let redondear = interp.native_function("redondear", |interp, _este, args| {
        let n = args
            .first()
            .map(|v| v.payload_number())
            .unwrap_or(Number::real(f64::NAN));
        Ok(interp.make_real(n.real.round()))
    });
    let aleatorio = interp.native_function("aleatorio", |interp, _este, _args| {
        let sample = rand::thread_rng().gen::<f64>();
        Ok(interp.make_real(sample))
    });
    let elevado = interp.native_function("elevado", |interp, _este, args| {
        let base = args.first().cloned().unwrap_or(Value::Null);
        let exponent = args.get(1).cloned().unwrap_or(Value::Null);
        interp.apply_binary(&base, "^", &exponent)
    });
    let mate = interp.object_from(Vec::new());
    if let Some(own) = mate.properties().map(|p| p.own) {
        let pi = interp.make_real(3.14159);
        let e = interp.make_real(2.71828);
        interp.tables.set(own, "PI", pi);
        interp.tables.set(own, "E", e);
        interp.tables.set(own, "abs", abs);
        interp.tables.set(own, "redondear", redondear);
        interp.tables.set(own, "aleatorio", aleatorio);
        interp.tables.set(own, "elevado", elevado);
        interp.tables.set(own, "raiz", raiz);
    }
    seed_global(globals, "Mate", mate);

    let texto = interp.native_function("texto", |interp, _este, args| {
        let value = args.first().cloned().unwrap_or(Value::Null);
        let pretty = args.get(1).map(|v| v.payload_truthy()).unwrap_or(false);
        let rendered = json::to_text(interp, &value, pretty)?;
        Ok(Value::string(rendered))
    });
    let parsear = interp.native_function("parsear", |interp, _este, args| {
        let text = args.first().map(|v| v.payload_string()).unwrap_or_default();
        json::from_text(interp, &text)
    });
    let json_global = interp.object_from(vec![
        ("texto".to_string(), texto),
        ("parsear".to_string(), parsear),
    ]);
    seed_global(globals, "JSON", json_global);
}

// === Helpers ===

fn seed_global(globals: &EnvRef, name: &str, value: Value) {
    // The root frame is freshly built here; these names cannot collide.
    let _ = globals.declare(name, value, false);
}

fn depth_arg(args: &[Value]) -> usize {
    let depth = args.first().map(|v| v.payload_number().real).unwrap_or(0.0);
    if depth.is_finite() && depth > 0.0 {
        depth as usize
    } else {
        0
    }
}

fn is_protocol_key(key: &str) -> bool {
    key.starts_with("__") && key.ends_with("__")
}

fn complex_arg(args: &[Value]) -> Result<TableId, Error> {
    let arg = args.first().cloned().unwrap_or(Value::Null);
    match arg.properties().map(|p| p.own) {
        Some(own) => Ok(own),
        None => Err(Error::invalid_type(format!(
            "Se esperaba un objeto, se recibio '{}'",
            arg.type_name()
        ))),
    }
}
