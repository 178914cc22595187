use std::fmt;

/// Every failure an interpretation can hit, from lexing to module loading.
/// There is no in-language recovery: one raised error ends the whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidToken,
    InvalidSyntax,
    UndefinedVariable,
    VariableAlreadyDeclared,
    ConstantAssignment,
    KeywordAssignment,
    UnknownModule,
    InvalidType,
    InvalidOperation,
    InvalidArgument,
    MathError,
    FileNotFound,
    PluginError,
}

impl ErrorKind {
    /// The category label shown to the user in the fatal report.
    pub fn category(self) -> &'static str {
        match self {
            ErrorKind::InvalidToken | ErrorKind::InvalidSyntax => "ErrorSintactico",
            ErrorKind::UndefinedVariable
            | ErrorKind::VariableAlreadyDeclared
            | ErrorKind::ConstantAssignment
            | ErrorKind::KeywordAssignment
            | ErrorKind::UnknownModule
            | ErrorKind::InvalidArgument
            | ErrorKind::FileNotFound => "ErrorEjecucion",
            ErrorKind::InvalidType => "ErrorTipos",
            ErrorKind::InvalidOperation | ErrorKind::MathError => "ErrorMatematico",
            ErrorKind::PluginError => "ErrorExtension",
        }
    }

    /// Message used when the raise site supplies none.
    pub fn default_message(self) -> &'static str {
        match self {
            ErrorKind::InvalidToken => "Token invalido",
            ErrorKind::InvalidSyntax => "Sintaxis invalida",
            ErrorKind::UndefinedVariable => "Variable no definida",
            ErrorKind::VariableAlreadyDeclared => "Variable ya declarada",
            ErrorKind::ConstantAssignment => "No se puede reasignar una constante",
            ErrorKind::KeywordAssignment => "No se puede usar una palabra reservada",
            ErrorKind::UnknownModule => "Modulo no encontrado",
            ErrorKind::InvalidType => "Tipo invalido",
            ErrorKind::InvalidOperation => "Operacion invalida",
            ErrorKind::InvalidArgument => "Argumento invalido",
            ErrorKind::MathError => "Error matematico",
            ErrorKind::FileNotFound => "Archivo no encontrado",
            ErrorKind::PluginError => "Error en una extension",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Error {
    kind: ErrorKind,
    message: Option<String>,
}

impl Error {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: Some(message.into()) }
    }

    pub fn from_kind(kind: ErrorKind) -> Self {
        Self { kind, message: None }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        self.message
            .as_deref()
            .unwrap_or_else(|| self.kind.default_message())
    }

    pub fn invalid_token(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidToken, message)
    }

    pub fn invalid_syntax(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidSyntax, message)
    }

    pub fn undefined_variable(name: &str) -> Self {
        Self::new(
            ErrorKind::UndefinedVariable,
            format!("La variable '{}' no ha sido declarada", name),
        )
    }

    pub fn already_declared(name: &str) -> Self {
        Self::new(
            ErrorKind::VariableAlreadyDeclared,
            format!("La variable '{}' ya ha sido declarada", name),
        )
    }

    pub fn constant_assignment(name: &str) -> Self {
        Self::new(
            ErrorKind::ConstantAssignment,
            format!("No se puede reasignar la constante '{}'", name),
        )
    }

    pub fn keyword_assignment(name: &str) -> Self {
        Self::new(
            ErrorKind::KeywordAssignment,
            format!("No se puede usar la palabra reservada '{}'", name),
        )
    }

    pub fn unknown_module(specifier: &str) -> Self {
        Self::new(
            ErrorKind::UnknownModule,
            format!("No se pudo encontrar el modulo '{}'", specifier),
        )
    }

    pub fn invalid_type(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidType, message)
    }

    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidOperation, message)
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidArgument, message)
    }

    pub fn math_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::MathError, message)
    }

    pub fn file_not_found(path: &str) -> Self {
        Self::new(
            ErrorKind::FileNotFound,
            format!("No se pudo leer el archivo '{}'", path),
        )
    }

    pub fn plugin_error(plugin: &str, message: impl Into<String>) -> Self {
        Self::new(
            ErrorKind::PluginError,
            format!("[{}] {}", plugin, message.into()),
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:\n  {}", self.kind.category(), self.message())
    }
}

impl std::error::Error for Error {}
