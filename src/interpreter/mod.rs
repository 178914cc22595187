pub mod builtins;
pub mod control_flow;
pub mod environment;
pub mod evaluator;
pub mod loader;
pub mod parser;

pub use builtins::Registry;
pub use control_flow::Flow;
pub use environment::{EnvRef, Environment};
pub use evaluator::Interpreter;
pub use loader::Loader;
pub use parser::TokenParser;
