//! # Expression Language - Abstract Syntax Tree
//!
//! This module defines the tokens and the Abstract Syntax Tree (AST) for the
//! template expression language: a small JavaScript-like language used inside
//! template bindings.
//!
//! ## Architecture Overview
//!
//! - **[tokens]** - Lexical tokens produced by the lexer
//! - **[expressions]** - Expression nodes (access, calls, operations, literals, filters, chains)
//! - **[operators]** - Binary operators (equality, relational, arithmetic, logical)
//!
//! ## Quick Start
//!
//! ```text
//! user.firstName + ' ' + user.lastName | uppercase
//! ```
//!
//! Reads two fields off the scope, concatenates them and pipes the result
//! through the `uppercase` filter.
//!
//! ## Core Concepts
//!
//! ### Scope
//!
//! Bare identifiers resolve against the scope object passed to
//! [`Expr::evaluate`]. Any identifier-shaped word is a valid name, reserved
//! words included: `this`, `if` and `const` are ordinary scope reads.
//!
//! ### Null Propagation
//!
//! Reading a member of `null` yields `null` instead of failing, so
//! `a.b.c.d` is safe when `b` is missing.
//!
//! ### Filters
//!
//! `expr | name:arg1:arg2` calls the filter `name` with the value of `expr`
//! followed by the arguments. Filters are looked up at evaluation time.
//!
//! ### Statements
//!
//! `;` separates statements. A chain evaluates every statement and yields the
//! last non-null result. Filters are not allowed inside a chain.
//!
//! ## Examples
//!
//! ### Assignment
//!
//! ```text
//! items[3] = 'four'
//! ```
//!
//! ### Ternary
//!
//! ```text
//! count == 1 ? 'item' : 'items'
//! ```
//!
//! ### Literals
//!
//! ```text
//! {label: name, values: [1, 2, 3]}
//! ```
pub mod tokens;
pub mod expressions;
pub mod operators;

pub use tokens::Token;
pub use expressions::Expr;
pub use operators::BinOp;
