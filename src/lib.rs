pub mod ast;
pub mod cli;
pub mod error;
pub mod format;
pub mod interpreter;
pub mod json;
pub mod lexer;
pub mod token;
pub mod value;

pub use error::Error;
pub use interpreter::{Interpreter, TokenParser};
pub use token::Token;
pub use value::Value;
