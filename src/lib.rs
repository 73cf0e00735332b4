pub mod ast;
pub mod evaluator;
pub mod filters;
pub mod lexer;
pub mod operations;
pub mod output;
pub mod parser;
pub mod value;
pub mod watch;

#[cfg(feature = "cli")]
pub mod cli;

pub use ast::{BinOp, Expr, Token};
pub use evaluator::{BoundExpression, EvalError, LocalsWrapper, ScopeLocals};
pub use filters::{FilterMap, FilterResolver};
pub use lexer::{LexError, Lexer, lex};
pub use output::{from_json, to_json, to_json_pretty, to_json_string};
pub use parser::{Location, ParseError, Parser};
pub use value::{Function, HostObject, Value};
pub use watch::{WatchAst, WatchError, WatchParser};
