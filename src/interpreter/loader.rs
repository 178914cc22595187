use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::error::{Error, ErrorKind};
use crate::interpreter::environment::Environment;
use crate::interpreter::evaluator::Interpreter;
use crate::interpreter::parser::TokenParser;
use crate::value::{ModuleValue, Properties, Value};

/// Source file extension retried when a specifier has none.
pub const EXTENSION: &str = ".bri";
/// File a directory specifier resolves to.
pub const INDEX_FILE: &str = "indice.bri";
/// Sibling directory searched, walking upward, for bare specifiers.
pub const MODULES_DIR: &str = "modulos";

const BUILTIN_PREFIX: &str = "brisa:";

/// A plugin-registered source reader. Receives the candidate path plus the
/// conventional index filename and extension; `Ok(None)` means "not
/// handled", and the next reader (finally the filesystem) is tried.
/// Readers are synchronous; asynchronous providers must be adapted at the
/// plugin boundary.
pub type ReaderFn = Rc<dyn Fn(&str, &str, &str) -> Result<Option<String>, Error>>;

/// Module cache and plugin registration state.
#[derive(Default)]
pub struct Loader {
    cache: HashMap<PathBuf, Value>,
    readers: Vec<ReaderFn>,
    native_modules: HashMap<String, Value>,
}

impl Loader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a source reader tried, in registration order, before the
    /// default filesystem reader.
    pub fn register_reader(
        &mut self,
        reader: impl Fn(&str, &str, &str) -> Result<Option<String>, Error> + 'static,
    ) {
        self.readers.push(Rc::new(reader));
    }

    /// Registers a named native module; `requiere(name)` yields `exports`.
    pub fn register_native_module(&mut self, name: impl Into<String>, exports: Value) {
        self.native_modules.insert(name.into(), exports);
    }

    fn readers(&self) -> &[ReaderFn] {
        &self.readers
    }

    fn native_module(&self, name: &str) -> Option<Value> {
        self.native_modules.get(name).cloned()
    }

    fn cached(&self, key: &Path) -> Option<Value> {
        self.cache.get(key).cloned()
    }

    fn insert(&mut self, key: PathBuf, module: Value) {
        self.cache.insert(key, module);
    }
}

/// A fatal error raised on behalf of a plugin, tagged with its name.
pub fn plugin_error(plugin: &str, message: impl Into<String>) -> Error {
    Error::plugin_error(plugin, message)
}

/// Loads and evaluates `path` as the entry module; yields its `exporta`
/// value.
pub fn run_file(interp: &mut Interpreter, path: &Path) -> Result<Value, Error> {
    let display = path.to_string_lossy().into_owned();
    if !path.is_file() {
        return Err(Error::file_not_found(&display));
    }
    let source =
        fs::read_to_string(path).map_err(|_| Error::file_not_found(&display))?;
    let key = cache_key(path);
    let folder = parent_folder(&key);
    let module = make_module(interp, &key.to_string_lossy(), &folder);
    let value = Value::Module(Rc::clone(&module));
    interp.loader.insert(key, value.clone());
    eval_module(interp, &module, &source)?;
    Ok(interp.resolve_property(&value, "exporta"))
}

/// `requiere`: resolves and loads a module, records it on the requesting
/// module's `hijos` list, and returns its `exporta` value.
pub fn require(interp: &mut Interpreter, specifier: &str) -> Result<Value, Error> {
    let parent = interp.current_module();
    let module = load_module(interp, specifier)?;
    if let Some(parent) = parent {
        let hijos = parent.props.resolve(&interp.tables, "hijos").unwrap_or(Value::Null);
        if let Some(own) = hijos.properties().map(|p| p.own) {
            let index = interp.tables.next_integer_key(own);
            interp.tables.set(own, index.to_string(), module.clone());
        }
    }
    Ok(interp.resolve_property(&module, "exporta"))
}

fn load_module(interp: &mut Interpreter, specifier: &str) -> Result<Value, Error> {
    let folder = interp
        .current_module()
        .map(|m| m.folder.to_string())
        .unwrap_or_else(|| ".".to_string());

    // Reserved built-in names, with or without the brisa: prefix.
    let bare = specifier.strip_prefix(BUILTIN_PREFIX).unwrap_or(specifier);
    if let Some(factory) = builtin_module(bare) {
        let exports = factory(interp, &folder)?;
        let module = make_module(interp, specifier, &folder);
        set_exports(interp, &module, exports);
        return Ok(Value::Module(module));
    }

    // Plugin-registered native modules by exact name.
    if let Some(exports) = interp.loader.native_module(specifier) {
        let module = make_module(interp, specifier, &folder);
        set_exports(interp, &module, exports);
        return Ok(Value::Module(module));
    }

    load_fs_module(interp, specifier, &folder)
}

fn load_fs_module(
    interp: &mut Interpreter,
    specifier: &str,
    folder: &str,
) -> Result<Value, Error> {
    let relative = specifier.starts_with("./")
        || specifier.starts_with("../")
        || Path::new(specifier).is_absolute();
    let found = if relative {
        locate(interp, &Path::new(folder).join(specifier))?
    } else {
        // Bare specifiers search a modulos/ directory, walking up the
        // requesting module's ancestry.
        let mut dir = PathBuf::from(folder);
        let mut found = None;
        loop {
            let candidate = dir.join(MODULES_DIR).join(specifier);
            if let Some(hit) = locate(interp, &candidate)? {
                found = Some(hit);
                break;
            }
            if !dir.pop() {
                break;
            }
        }
        found
    };
    let (path, source) = match found {
        Some(found) => found,
        None => return Err(Error::unknown_module(specifier)),
    };

    let key = cache_key(&path);
    if let Some(cached) = interp.loader.cached(&key) {
        return Ok(cached);
    }
    let module_folder = parent_folder(&path);
    let module = make_module(interp, &path.to_string_lossy(), &module_folder);
    let value = Value::Module(Rc::clone(&module));
    // Cached before evaluation so require cycles observe the partially
    // built module instead of recursing forever.
    interp.loader.insert(key, value.clone());
    eval_module(interp, &module, &source)?;
    Ok(value)
}

/// Tries one resolved candidate: plugin readers first, then the file
/// itself, the index file of a directory, and the candidate with the
/// source extension appended.
fn locate(
    interp: &Interpreter,
    candidate: &Path,
) -> Result<Option<(PathBuf, String)>, Error> {
    let display = candidate.to_string_lossy();
    for reader in interp.loader.readers() {
        if let Some(source) = reader(&display, INDEX_FILE, EXTENSION)? {
            return Ok(Some((candidate.to_path_buf(), source)));
        }
    }
    if candidate.is_file() {
        return Ok(Some((candidate.to_path_buf(), read_source(candidate)?)));
    }
    if candidate.is_dir() {
        let index = candidate.join(INDEX_FILE);
        if index.is_file() {
            let source = read_source(&index)?;
            return Ok(Some((index, source)));
        }
    }
    let with_ext = PathBuf::from(format!("{}{}", display, EXTENSION));
    if with_ext.is_file() {
        let source = read_source(&with_ext)?;
        return Ok(Some((with_ext, source)));
    }
    Ok(None)
}

fn read_source(path: &Path) -> Result<String, Error> {
    fs::read_to_string(path).map_err(|_| Error::file_not_found(&path.to_string_lossy()))
}

fn cache_key(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

fn parent_folder(path: &Path) -> String {
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_else(|| ".".to_string())
}

fn make_module(interp: &mut Interpreter, path: &str, folder: &str) -> Rc<ModuleValue> {
    let own = interp.tables.alloc();
    let exporta = interp.new_object();
    let hijos = interp.list_from(Vec::new());
    interp.tables.set(own, "exporta", exporta);
    interp.tables.set(own, "hijos", hijos);
    interp.tables.set(own, "ruta", Value::string(path));
    interp.tables.set(own, "folder", Value::string(folder));
    let module_defaults = interp.registry.module_defaults;
    Rc::new(ModuleValue {
        path: Rc::from(path),
        folder: Rc::from(folder),
        props: Properties::new(own, vec![module_defaults]),
    })
}

fn set_exports(interp: &mut Interpreter, module: &Rc<ModuleValue>, exports: Value) {
    interp.tables.set(module.props.own, "exporta", exports);
}

/// Runs a module program in its own frame with `modulo` and `requiere`
/// bound.
fn eval_module(
    interp: &mut Interpreter,
    module: &Rc<ModuleValue>,
    source: &str,
) -> Result<(), Error> {
    let program = TokenParser::produce_ast(source)?;
    let env = Environment::child(&interp.globals());
    env.declare("modulo", Value::Module(Rc::clone(module)), true)?;
    let requiere = interp.native_function("requiere", |interp, _este, args| {
        let specifier = args.first().map(|v| v.payload_string()).unwrap_or_default();
        require(interp, &specifier)
    });
    env.declare("requiere", requiere, true)?;
    interp.push_module(Rc::clone(module));
    let result = interp.eval_program(&program, &env);
    interp.pop_module();
    result?;
    Ok(())
}

// === Built-in modules ===

type ModuleFactory = fn(&mut Interpreter, &str) -> Result<Value, Error>;

fn builtin_module(name: &str) -> Option<ModuleFactory> {
    match name {
        "sa" => Some(sa_module),
        "so" => Some(so_module),
        _ => None,
    }
}

/// `sa` (sistema de archivos): file and directory handles with read, write,
/// delete and existence operations.
fn sa_module(interp: &mut Interpreter, folder: &str) -> Result<Value, Error> {
    let archivo = {
        let folder = folder.to_string();
        interp.native_function("archivo", move |interp, _este, args| {
            let path = args.first().map(|v| v.payload_string()).unwrap_or_default();
            if Path::new(&path).is_dir() {
                return Err(Error::new(
                    ErrorKind::FileNotFound,
                    format!("La ruta '{}' es una carpeta, no un archivo", path),
                ));
            }
            file_handle(interp, &path, &folder)
        })
    };
    let carpeta = {
        let folder = folder.to_string();
        interp.native_function("carpeta", move |interp, _este, args| {
            let path = args.first().map(|v| v.payload_string()).unwrap_or_default();
            if Path::new(&path).is_file() {
                return Err(Error::new(
                    ErrorKind::FileNotFound,
                    format!("La ruta '{}' es un archivo, no una carpeta", path),
                ));
            }
            folder_handle(interp, &path, &folder)
        })
    };
    let tipo_de = interp.native_function("tipoDe", |_, _este, args| {
        let path = args.first().map(|v| v.payload_string()).unwrap_or_default();
        let target = Path::new(&path);
        let tag = if target.is_dir() {
            "carpeta"
        } else if target.is_file() {
            "archivo"
        } else {
            "ninguno"
        };
        Ok(Value::string(tag))
    });
    Ok(interp.object_from(vec![
        ("archivo".to_string(), archivo),
        ("carpeta".to_string(), carpeta),
        ("tipoDe".to_string(), tipo_de),
    ]))
}

fn file_handle(interp: &mut Interpreter, path: &str, folder: &str) -> Result<Value, Error> {
    let leer = {
        let path = path.to_string();
        interp.native_function("leer", move |_, _este, args| {
            let mode = args
                .first()
                .map(|v| v.payload_string())
                .unwrap_or_else(|| "texto".to_string());
            if !Path::new(&path).is_file() {
                return Err(missing_file(&path));
            }
            match mode.as_str() {
                "texto" => fs::read_to_string(&path)
                    .map(|text| Value::string(text))
                    .map_err(|_| Error::file_not_found(&path)),
                "buffer" => fs::read(&path)
                    .map(|bytes| Value::Buffer(Rc::from(bytes)))
                    .map_err(|_| Error::file_not_found(&path)),
                other => Err(Error::invalid_argument(format!(
                    "El argumento '{}' no es valido",
                    other
                ))),
            }
        })
    };
    let escribir = {
        let path = path.to_string();
        interp.native_function("escribir", move |_, _este, args| {
            let content = args.first().cloned().unwrap_or(Value::Null);
            if let Some(parent) = Path::new(&path).parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent).map_err(|_| Error::file_not_found(&path))?;
                }
            }
            let written = match &content {
                Value::Buffer(bytes) => fs::write(&path, bytes),
                other => fs::write(&path, other.payload_string()),
            };
            written.map_err(|_| Error::file_not_found(&path))?;
            Ok(Value::Void)
        })
    };
    let eliminar = {
        let path = path.to_string();
        interp.native_function("eliminar", move |_, _este, _args| {
            if !Path::new(&path).is_file() {
                return Err(missing_file(&path));
            }
            fs::remove_file(&path).map_err(|_| Error::file_not_found(&path))?;
            Ok(Value::Void)
        })
    };
    let existe = {
        let path = path.to_string();
        interp.native_function("existe", move |_, _este, _args| {
            Ok(Value::Boolean(Path::new(&path).is_file()))
        })
    };
    Ok(interp.object_from(vec![
        ("tipo".to_string(), Value::string("archivo")),
        ("ruta".to_string(), Value::string(normalize_path(path, folder))),
        ("nombre".to_string(), Value::string(base_name(path))),
        ("leer".to_string(), leer),
        ("escribir".to_string(), escribir),
        ("eliminar".to_string(), eliminar),
        ("existe".to_string(), existe),
    ]))
}

fn folder_handle(interp: &mut Interpreter, path: &str, folder: &str) -> Result<Value, Error> {
    let leer = {
        let path = path.to_string();
        let folder = folder.to_string();
        interp.native_function("leer", move |interp, _este, _args| {
            if !Path::new(&path).is_dir() {
                return Err(missing_folder(&path));
            }
            let mut names = Vec::new();
            let entries = fs::read_dir(&path).map_err(|_| Error::file_not_found(&path))?;
            for entry in entries {
                let entry = entry.map_err(|_| Error::file_not_found(&path))?;
                names.push(entry.path().to_string_lossy().into_owned());
            }
            names.sort();
            let mut children = Vec::with_capacity(names.len());
            for child in names {
                if Path::new(&child).is_dir() {
                    children.push(folder_handle(interp, &child, &folder)?);
                } else {
                    children.push(file_handle(interp, &child, &folder)?);
                }
            }
            Ok(interp.list_from(children))
        })
    };
    let crear = {
        let path = path.to_string();
        interp.native_function("crear", move |_, _este, _args| {
            fs::create_dir_all(&path).map_err(|_| Error::file_not_found(&path))?;
            Ok(Value::Void)
        })
    };
    let eliminar = {
        let path = path.to_string();
        interp.native_function("eliminar", move |_, _este, _args| {
            if !Path::new(&path).is_dir() {
                return Err(missing_folder(&path));
            }
            fs::remove_dir_all(&path).map_err(|_| Error::file_not_found(&path))?;
            Ok(Value::Void)
        })
    };
    let existe = {
        let path = path.to_string();
        interp.native_function("existe", move |_, _este, _args| {
            Ok(Value::Boolean(Path::new(&path).is_dir()))
        })
    };
    Ok(interp.object_from(vec![
        ("tipo".to_string(), Value::string("carpeta")),
        ("ruta".to_string(), Value::string(normalize_path(path, folder))),
        ("nombre".to_string(), Value::string(base_name(path))),
        ("leer".to_string(), leer),
        ("crear".to_string(), crear),
        ("eliminar".to_string(), eliminar),
        ("existe".to_string(), existe),
    ]))
}

fn missing_file(path: &str) -> Error {
    Error::new(
        ErrorKind::FileNotFound,
        format!("El archivo '{}' no existe", path),
    )
}

fn missing_folder(path: &str) -> Error {
    Error::new(
        ErrorKind::FileNotFound,
        format!("La carpeta '{}' no existe", path),
    )
}

/// Resolves `./` and `../` prefixes against `folder` and collapses the
/// separators, for the display `ruta` of file and folder handles.
fn normalize_path(path: &str, folder: &str) -> String {
    let joined = if let Some(rest) = path.strip_prefix("./") {
        format!("{}/{}", folder, rest)
    } else if path.starts_with("../") {
        let mut parts: Vec<&str> = folder.split('/').filter(|p| !p.is_empty()).collect();
        let mut rest = path;
        while let Some(next) = rest.strip_prefix("../") {
            parts.pop();
            rest = next;
        }
        parts.push(rest);
        parts.join("/")
    } else {
        path.to_string()
    };
    joined
        .replace('\\', "/")
        .split('/')
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

fn base_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// `so` (sistema operativo): host platform information and environment
/// variables.
fn so_module(interp: &mut Interpreter, _folder: &str) -> Result<Value, Error> {
    let plataforma = interp.native_function("plataforma", |_, _este, _args| {
        Ok(Value::string(std::env::consts::OS))
    });
    let arquitectura = interp.native_function("arquitectura", |_, _este, _args| {
        Ok(Value::string(std::env::consts::ARCH))
    });
    let familia = interp.native_function("familia", |_, _este, _args| {
        Ok(Value::string(std::env::consts::FAMILY))
    });
    let variable = interp.native_function("variable", |_, _este, args| {
        let name = args.first().map(|v| v.payload_string()).unwrap_or_default();
        match std::env::var(&name) {
            Ok(value) => Ok(Value::string(value)),
            Err(_) => Ok(Value::Null),
        }
    });
    let variables = interp.native_function("variables", |interp, _este, _args| {
        let vars: Vec<(String, Value)> = std::env::vars()
            .map(|(key, value)| (key, Value::string(value)))
            .collect();
        Ok(interp.object_from(vars))
    });
    Ok(interp.object_from(vec![
        ("plataforma".to_string(), plataforma),
        ("arquitectura".to_string(), arquitectura),
        ("familia".to_string(), familia),
        ("variable".to_string(), variable),
        ("variables".to_string(), variables),
    ]))
}
