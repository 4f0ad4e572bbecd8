use std::rc::Rc;

use crate::expr::{Expr, VariableData};
use crate::token::Token;

/// A statement node. Function declarations are reference-counted because a
/// function value shares the declaration with the tree it was built from.
#[derive(Debug, PartialEq)]
pub enum Stmt {
    Block(BlockData),
    Class(ClassData),
    Expression(ExpressionData),
    Function(Rc<FunctionData>),
    If(IfData),
    Print(PrintData),
    Return(ReturnData),
    Var(VarData),
    While(WhileData),
}

#[derive(Debug, PartialEq)]
pub struct BlockData {
    pub statements: Vec<Stmt>,
}

#[derive(Debug, PartialEq)]
pub struct ClassData {
    pub name: Token,
    pub superclass: Option<VariableData>,
    pub methods: Vec<Rc<FunctionData>>,
}

#[derive(Debug, PartialEq)]
pub struct ExpressionData {
    pub expr: Expr,
}

#[derive(Debug, PartialEq)]
pub struct FunctionData {
    pub name: Token,
    pub params: Vec<Token>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, PartialEq)]
pub struct IfData {
    pub condition: Expr,
    pub then_branch: Box<Stmt>,
    pub else_branch: Option<Box<Stmt>>,
}

#[derive(Debug, PartialEq)]
pub struct PrintData {
    pub expr: Expr,
}

#[derive(Debug, PartialEq)]
pub struct ReturnData {
    pub keyword: Token,
    pub value: Option<Expr>,
}

#[derive(Debug, PartialEq)]
pub struct VarData {
    pub name: Token,
    pub initializer: Option<Expr>,
}

#[derive(Debug, PartialEq)]
pub struct WhileData {
    pub condition: Expr,
    pub body: Box<Stmt>,
}
