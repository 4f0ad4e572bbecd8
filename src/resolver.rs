use std::collections::HashMap;
use std::mem;

use crate::error::Reporter;
use crate::expr::Expr;
use crate::interpreter::Interpreter;
use crate::stmt::{ClassData, FunctionData, Stmt};
use crate::token::Token;

/// What kind of function body is being resolved; `return` legality depends
/// on it.
#[derive(Clone, Copy)]
enum FunctionType {
    None,
    Function,
    Initializer,
    Method,
}

/// Whether resolution is inside a class body; `this` and `super` legality
/// depend on it.
#[derive(Clone, Copy)]
enum ClassType {
    None,
    Class,
    Subclass,
}

/// Walks the tree once between parsing and execution, computing the number
/// of environments between every local variable use and its definition. The
/// depths go into the interpreter's side table; the tree is never rewritten.
pub struct Resolver<'a, 'w> {
    interpreter: &'a mut Interpreter<'w>,
    reporter: &'a mut Reporter,
    scopes: Vec<HashMap<String, bool>>,
    current_function: FunctionType,
    current_class: ClassType,
}

impl<'a, 'w> Resolver<'a, 'w> {
    pub fn new(interpreter: &'a mut Interpreter<'w>, reporter: &'a mut Reporter) -> Self {
        Resolver {
            interpreter,
            reporter,
            scopes: Vec::new(),
            current_function: FunctionType::None,
            current_class: ClassType::None,
        }
    }

    pub fn resolve(&mut self, statements: &[Stmt]) {
        for statement in statements {
            self.resolve_stmt(statement);
        }
    }

    fn resolve_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Block(data) => {
                self.begin_scope();
                self.resolve(&data.statements);
                self.end_scope();
            },
            Stmt::Class(data) => self.resolve_class(data),
            Stmt::Expression(data) => self.resolve_expr(&data.expr),
            Stmt::Function(data) => {
                self.declare(&data.name);
                self.define(&data.name);

                self.resolve_function(data, FunctionType::Function);
            },
            Stmt::If(data) => {
                self.resolve_expr(&data.condition);
                self.resolve_stmt(&data.then_branch);
                if let Some(else_branch) = &data.else_branch {
                    self.resolve_stmt(else_branch);
                }
            },
            Stmt::Print(data) => self.resolve_expr(&data.expr),
            Stmt::Return(data) => {
                if let FunctionType::None = self.current_function {
                    self.reporter.error_at(&data.keyword, "Can't return from top-level code.");
                }

                if let Some(value) = &data.value {
                    if let FunctionType::Initializer = self.current_function {
                        self.reporter.error_at(
                            &data.keyword,
                            "Can't return a value from an initializer.",
                        );
                    }

                    self.resolve_expr(value);
                }
            },
            Stmt::Var(data) => {
                self.declare(&data.name);
                if let Some(initializer) = &data.initializer {
                    self.resolve_expr(initializer);
                }
                self.define(&data.name);
            },
            Stmt::While(data) => {
                self.resolve_expr(&data.condition);
                self.resolve_stmt(&data.body);
            },
        }
    }

    fn resolve_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Assign(data) => {
                self.resolve_expr(&data.value);
                self.resolve_local(data.id, &data.name);
            },
            Expr::Binary(data) => {
                self.resolve_expr(&data.left);
                self.resolve_expr(&data.right);
            },
            Expr::Call(data) => {
                self.resolve_expr(&data.callee);
                for argument in &data.arguments {
                    self.resolve_expr(argument);
                }
            },
            Expr::Get(data) => self.resolve_expr(&data.object),
            Expr::Grouping(data) => self.resolve_expr(&data.expr),
            Expr::Literal(_) => {},
            Expr::Logical(data) => {
                self.resolve_expr(&data.left);
                self.resolve_expr(&data.right);
            },
            Expr::Set(data) => {
                self.resolve_expr(&data.value);
                self.resolve_expr(&data.object);
            },
            Expr::Super(data) => {
                match self.current_class {
                    ClassType::Subclass => {},
                    ClassType::None => {
                        self.reporter.error_at(
                            &data.keyword,
                            "Can't use 'super' outside of a class.",
                        );
                    },
                    ClassType::Class => {
                        self.reporter.error_at(
                            &data.keyword,
                            "Can't use 'super' in a class with no superclass.",
                        );
                    },
                }

                self.resolve_local(data.id, &data.keyword);
            },
            Expr::This(data) => {
                if let ClassType::None = self.current_class {
                    self.reporter.error_at(&data.keyword, "Can't use 'this' outside of a class.");
                    return;
                }

                self.resolve_local(data.id, &data.keyword);
            },
            Expr::Unary(data) => self.resolve_expr(&data.expr),
            Expr::Variable(data) => {
                if let Some(scope) = self.scopes.last() {
                    if scope.get(&data.name.lexeme) == Some(&false) {
                        self.reporter.error_at(
                            &data.name,
                            "Can't read local variable in its own initializer.",
                        );
                    }
                }

                self.resolve_local(data.id, &data.name);
            },
        }
    }

    fn resolve_class(&mut self, data: &ClassData) {
        let enclosing_class = mem::replace(&mut self.current_class, ClassType::Class);

        self.declare(&data.name);
        self.define(&data.name);

        if let Some(superclass) = &data.superclass {
            if data.name.lexeme == superclass.name.lexeme {
                self.reporter.error_at(&superclass.name, "A class can't inherit from itself.");
            }

            self.current_class = ClassType::Subclass;
            self.resolve_local(superclass.id, &superclass.name);

            // Methods of a subclass see `super` one scope outside `this`.
            self.begin_scope();
            self.scope_mut().insert("super".to_string(), true);
        }

        self.begin_scope();
        self.scope_mut().insert("this".to_string(), true);

        for method in &data.methods {
            let declaration = if method.name.lexeme == "init" {
                FunctionType::Initializer
            } else {
                FunctionType::Method
            };

            self.resolve_function(method, declaration);
        }

        self.end_scope();

        if data.superclass.is_some() {
            self.end_scope();
        }

        self.current_class = enclosing_class;
    }

    fn resolve_function(&mut self, function: &FunctionData, kind: FunctionType) {
        let enclosing_function = mem::replace(&mut self.current_function, kind);

        self.begin_scope();
        for param in &function.params {
            self.declare(param);
            self.define(param);
        }
        self.resolve(&function.body);
        self.end_scope();

        self.current_function = enclosing_function;
    }

    fn begin_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    fn end_scope(&mut self) {
        self.scopes.pop();
    }

    fn scope_mut(&mut self) -> &mut HashMap<String, bool> {
        self.scopes.last_mut().expect("a scope to be open")
    }

    /// Adds the name to the innermost scope, marked not-yet-defined so a
    /// read inside its own initializer can be caught. Global declarations
    /// are not tracked.
    fn declare(&mut self, name: &Token) {
        if self.scopes.is_empty() {
            return;
        }

        if self.scope_mut().contains_key(&name.lexeme) {
            self.reporter.error_at(name, "Already a variable with this name in this scope.");
        }
        self.scope_mut().insert(name.lexeme.clone(), false);
    }

    /// Marks the name as fully initialized and usable.
    fn define(&mut self, name: &Token) {
        if self.scopes.is_empty() {
            return;
        }

        self.scope_mut().insert(name.lexeme.clone(), true);
    }

    /// Searches the scope stack innermost-first; a hit records the depth in
    /// the interpreter's table. A miss means the name is global (or truly
    /// undefined, which only the runtime can tell).
    fn resolve_local(&mut self, id: usize, name: &Token) {
        for (depth, scope) in self.scopes.iter().rev().enumerate() {
            if scope.contains_key(&name.lexeme) {
                self.interpreter.resolve(id, depth);
                return;
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::parser::Parser;
    use crate::scanner::Scanner;

    /// Resolves a program and returns (reporter, depth table).
    fn resolve(source: &str) -> (Reporter, HashMap<usize, usize>) {
        let mut out = Vec::new();
        let mut reporter = Reporter::new();
        let mut interpreter = Interpreter::new(&mut out);

        let tokens = Scanner::new(source, &mut reporter).scan_tokens();
        let statements = Parser::new(tokens, 0, &mut reporter).parse();
        assert!(!reporter.had_error(), "parse error in {source:?}");

        Resolver::new(&mut interpreter, &mut reporter).resolve(&statements);

        let locals = interpreter.locals().clone();
        (reporter, locals)
    }

    fn resolve_error(source: &str) {
        let (reporter, _) = resolve(source);
        assert!(reporter.had_error(), "expected a resolve error in {source:?}");
    }

    #[test]
    fn globals_are_not_in_the_depth_table() {
        let (reporter, locals) = resolve("var a = 1; print a;");

        assert!(!reporter.had_error());
        assert!(locals.is_empty());
    }

    #[test]
    fn locals_resolve_at_their_depth() {
        // `a` is read at depth 0 of its own block and depth 1 from the
        // nested one.
        let (reporter, locals) = resolve("{ var a = 1; print a; { print a; } }");

        assert!(!reporter.had_error());
        let mut depths: Vec<usize> = locals.values().copied().collect();
        depths.sort_unstable();
        assert_eq!(depths, vec![0, 1]);
    }

    #[test]
    fn every_local_reference_is_covered() {
        let source = "\
{
  var a = 1;
  fun f(b) {
    var c = a + b;
    c = c + 1;
    return c;
  }
  f(a);
}";
        let (reporter, locals) = resolve(source);

        assert!(!reporter.had_error());
        // References resolved: a and b in c's initializer, the read and the
        // assignment of c, the returned c, and f plus a at the call site.
        assert_eq!(locals.len(), 7);
    }

    #[test]
    fn this_and_super_resolve_inside_methods() {
        let source = "\
class A { m() { return this; } }
class B < A { m() { return super.m(); } }";
        let (reporter, locals) = resolve(source);

        assert!(!reporter.had_error());
        // `this` at depth 1 (body, then the `this` scope); `super` at
        // depth 2 (one further out).
        let mut depths: Vec<usize> = locals.values().copied().collect();
        depths.sort_unstable();
        assert_eq!(depths, vec![1, 2]);
    }

    #[test]
    fn read_in_own_initializer_is_an_error() {
        resolve_error("{ var a = 1; { var a = a; } }");
    }

    #[test]
    fn duplicate_declaration_in_a_scope_is_an_error() {
        resolve_error("{ var a = 1; var a = 2; }");
    }

    #[test]
    fn redeclaring_a_global_is_allowed() {
        let (reporter, _) = resolve("var a = 1; var a = 2;");
        assert!(!reporter.had_error());
    }

    #[test]
    fn top_level_return_is_an_error() {
        resolve_error("return 1;");
    }

    #[test]
    fn returning_a_value_from_an_initializer_is_an_error() {
        resolve_error("class Foo { init() { return 1; } }");
    }

    #[test]
    fn bare_return_from_an_initializer_is_allowed() {
        let (reporter, _) = resolve("class Foo { init() { return; } }");
        assert!(!reporter.had_error());
    }

    #[test]
    fn this_outside_a_class_is_an_error() {
        resolve_error("print this;");
        resolve_error("fun f() { return this; }");
    }

    #[test]
    fn super_outside_a_subclass_is_an_error() {
        resolve_error("print super.m;");
        resolve_error("class Foo { m() { super.m(); } }");
    }

    #[test]
    fn class_inheriting_from_itself_is_an_error() {
        resolve_error("class Oops < Oops {}");
    }
}
