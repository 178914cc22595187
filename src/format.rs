use owo_colors::OwoColorize;

use crate::error::Error;
use crate::interpreter::evaluator::Interpreter;
use crate::value::{TableId, Value};

/// Nesting level past which complex children render as `[...]`.
const MAX_DEPTH: usize = 4;

/// Renders `value` through its `__pintar__` protocol entry. User overrides
/// win over the per-type defaults because resolution walks the own table
/// first.
pub fn paint(interp: &mut Interpreter, value: &Value, depth: usize) -> Result<String, Error> {
    let painter = interp.resolve_property(value, "__pintar__");
    if let Value::Function(f) = painter {
        let level = interp.make_real(depth as f64);
        let painted = interp.call_function(&f, value, &[level])?;
        return Ok(painted.payload_string());
    }
    default_paint(interp, value, depth)
}

/// Renders `value` through its `aCadena` protocol entry, falling back to the
/// plain payload string.
pub fn stringify(interp: &mut Interpreter, value: &Value) -> Result<String, Error> {
    let to_string = interp.resolve_property(value, "aCadena");
    if let Value::Function(f) = to_string {
        let rendered = interp.call_function(&f, value, &[])?;
        return Ok(rendered.payload_string());
    }
    Ok(value.payload_string())
}

/// The per-family rendering the default `__pintar__` entries delegate to.
pub fn default_paint(
    interp: &mut Interpreter,
    value: &Value,
    depth: usize,
) -> Result<String, Error> {
    let colors = interp.colors();
    match value {
        Value::Null => Ok(bright_white(colors, "nulo")),
        Value::Void => Ok(dimmed(colors, "vacio")),
        Value::Boolean(true) => Ok(yellow(colors, "verdadero")),
        Value::Boolean(false) => Ok(yellow(colors, "falso")),
        Value::Number(n) => Ok(yellow(colors, &n.to_display())),
        Value::Str(s) => {
            if depth == 0 {
                Ok(s.to_string())
            } else {
                Ok(green(colors, &quote_string(s)))
            }
        }
        Value::Buffer(bytes) => {
            let hex: Vec<String> = bytes.iter().map(|b| format!("{:02x}", b)).collect();
            Ok(yellow(colors, &format!("[Buffer {}]", hex.join(" "))))
        }
        Value::Object(props) => {
            if depth >= MAX_DEPTH {
                return Ok("[...]".to_string());
            }
            let entries = visible_entries(interp, props.own);
            let mut parts = Vec::with_capacity(entries.len());
            for (key, child) in entries {
                let painted = paint(interp, &child, depth + 1)?;
                parts.push(format!("{}: {}", key, painted));
            }
            Ok(braced('{', '}', &parts, depth))
        }
        Value::List(props) => {
            if depth >= MAX_DEPTH {
                return Ok("[...]".to_string());
            }
            let own = props.own;
            let mut parts = Vec::new();
            for (_, key) in interp.tables.integer_keys(own) {
                let child = interp.tables.get(own, &key).cloned().unwrap_or(Value::Null);
                parts.push(paint(interp, &child, depth + 1)?);
            }
            for (key, child) in visible_entries(interp, own) {
                if key.parse::<u64>().is_ok() {
                    continue;
                }
                let painted = paint(interp, &child, depth + 1)?;
                parts.push(format!("{}: {}", key, painted));
            }
            Ok(braced('[', ']', &parts, depth))
        }
        Value::Function(f) => {
            let name = f
                .props
                .resolve(&interp.tables, "nombre")
                .map(|n| n.payload_string())
                .unwrap_or_default();
            let shown = if name.is_empty() {
                "<anonima>"
            } else {
                name.as_str()
            };
            Ok(cyan(colors, &format!("[Funcion: {}]", shown)))
        }
        Value::Class(c) => {
            if depth >= MAX_DEPTH {
                return Ok("[...]".to_string());
            }
            let tag = cyan(colors, &format!("[Clase {}]", c.name));
            let entries = visible_entries(interp, c.props.own);
            let mut parts = Vec::with_capacity(entries.len());
            for (key, child) in entries {
                let painted = paint(interp, &child, depth + 1)?;
                parts.push(format!("{}: {}", key, painted));
            }
            Ok(format!("{} {}", tag, braced('{', '}', &parts, depth)))
        }
        Value::Module(m) => Ok(cyan(colors, &format!("[Modulo {}]", m.path))),
        Value::Iterator(_) => Ok(cyan(colors, "[Iterador]")),
        Value::PropertyRef(name) => Ok(name.to_string()),
    }
}

/// Own entries of a table minus the `__...__` protocol keys.
fn visible_entries(interp: &Interpreter, own: TableId) -> Vec<(String, Value)> {
    interp
        .tables
        .entries(own)
        .iter()
        .filter(|(key, _)| !(key.starts_with("__") && key.ends_with("__")))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

fn braced(open: char, close: char, parts: &[String], depth: usize) -> String {
    if parts.is_empty() {
        return format!("{}{}", open, close);
    }
    let inner = "  ".repeat(depth + 1);
    let outer = "  ".repeat(depth);
    format!(
        "{}\n{}{}\n{}{}",
        open,
        inner,
        parts.join(&format!(",\n{}", inner)),
        outer,
        close
    )
}

/// Single quotes unless the text itself contains one.
fn quote_string(text: &str) -> String {
    let quote = if text.contains('\'') { '"' } else { '\'' };
    format!(
        "{}{}{}",
        quote,
        text.replace(quote, &format!("\\{}", quote)),
        quote
    )
}

fn yellow(on: bool, text: &str) -> String {
    if on {
        text.yellow().to_string()
    } else {
        text.to_string()
    }
}

fn green(on: bool, text: &str) -> String {
    if on {
        text.green().to_string()
    } else {
        text.to_string()
    }
}

fn cyan(on: bool, text: &str) -> String {
    if on {
        text.cyan().to_string()
    } else {
        text.to_string()
    }
}

fn bright_white(on: bool, text: &str) -> String {
    if on {
        text.bright_white().to_string()
    } else {
        text.to_string()
    }
}

fn dimmed(on: bool, text: &str) -> String {
    if on {
        text.dimmed().to_string()
    } else {
        text.to_string()
    }
}
