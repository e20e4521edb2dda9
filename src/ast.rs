//! Tagged-variant AST: `Command` and `Expression`.
//!
//! Both derive `Serialize`/`Deserialize` so a compiled [`crate::program::Program`]
//! can be cached to JSON instead of re-tokenized on every load.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Command {
    PrintText { text: String },
    Pause,
    JumpToPassage { target: String },
    CallPassage { target: String },
    ReturnPassage,
    SetMusic { name: String, track: Expression },
    SetImage { name: String },
    AddSelection { text: String, target: String },
    /// `skip_count` points strictly past the last instruction of the body,
    /// measured from this `If` instruction inclusive.
    If { condition: Expression, skip_count: usize },
    SetVariable { name: String, expr: Expression },
    PrintResult { expr: Expression },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expression {
    Int(i32),
    Bool(bool),
    String(String),
    Variable(String),
    FunctionCall(String, Vec<Expression>),
    Unary(UnaryOp, Box<Expression>),
    Binary(BinaryOp, Box<Expression>, Box<Expression>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    LogicalNot,
    Negate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    NotEq,
    Lt,
    Gt,
    Le,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}
