//! # Watch Bridge
//!
//! Translates parsed expressions into the watch trees a dirty-checking change
//! detector observes.
//!
//! - **[ast]** - Watch tree nodes, change records and the pull-based reading of a tree
//! - **[bridge]** - [`WatchParser`], the expression to watch tree translation
//!
//! Every expression node maps onto one watch node. Scope reads become field
//! reads off the context, calls become method nodes, and operators, keyed
//! reads and literals become pure-function nodes over their translated
//! operands, computed by the same combinators the evaluator uses. A filter
//! becomes a pure-function node whose inputs are all collection-marked, so a
//! filter over an array is re-run when the array's contents change.
//!
//! Function-valued callees, assignments and statement chains have no watch
//! form and are rejected before any tree is returned.
pub mod ast;
pub mod bridge;

pub use ast::{CollectionChangeRecord, Combinator, Observed, WatchAst};
pub use bridge::{WatchError, WatchParser};
