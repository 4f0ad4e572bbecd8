use std::cell::RefCell;
use std::collections::HashMap;
use std::io::Write;
use std::mem;
use std::rc::Rc;

use crate::class::Class;
use crate::environment::Environment;
use crate::error::{Reporter, RuntimeError, RuntimeResult, Unwind};
use crate::expr::*;
use crate::function::{Function, NativeFunction};
use crate::literal::Literal;
use crate::object::{Callable, Object};
use crate::stmt::*;
use crate::token::{Token, TokenKind};

/// The tree walker. Holds the global environment, the current environment,
/// and the scope-depth table filled in by the resolver. `print` output goes
/// through `out` so the driver decides where it lands.
pub struct Interpreter<'w> {
    pub globals: Rc<RefCell<Environment>>,
    environment: Rc<RefCell<Environment>>,
    locals: HashMap<usize, usize>,
    out: &'w mut dyn Write,
}

impl<'w> Interpreter<'w> {
    pub fn new(out: &'w mut dyn Write) -> Self {
        let globals = Rc::new(RefCell::new(Environment::default()));

        for native in NativeFunction::globals() {
            let name = native.name;
            globals.borrow_mut().define(name, Object::Native(native));
        }

        Interpreter {
            environment: Rc::clone(&globals),
            globals,
            locals: HashMap::new(),
            out,
        }
    }

    /// Executes a program. A runtime error aborts the remaining statements
    /// and is reported here; the REPL stays usable afterwards.
    pub fn interpret(&mut self, statements: &[Stmt], reporter: &mut Reporter) {
        for statement in statements {
            match self.execute(statement) {
                Ok(()) => {},
                Err(Unwind::Error(error)) => {
                    reporter.runtime_error(&error);
                    return;
                },
                Err(Unwind::Return(_)) => {
                    unreachable!("the resolver rejects top-level returns");
                },
            }
        }
    }

    /// Records the scope depth of a resolved expression. Called by the
    /// resolver only; read-only afterwards.
    pub fn resolve(&mut self, id: usize, depth: usize) {
        self.locals.insert(id, depth);
    }

    #[cfg(test)]
    pub(crate) fn locals(&self) -> &HashMap<usize, usize> {
        &self.locals
    }

    fn execute(&mut self, stmt: &Stmt) -> RuntimeResult<()> {
        match stmt {
            Stmt::Block(data) => {
                let environment = Environment::new(Some(Rc::clone(&self.environment)));
                self.execute_block(&data.statements, Rc::new(RefCell::new(environment)))
            },
            Stmt::Class(data) => self.execute_class(data),
            Stmt::Expression(data) => {
                self.evaluate(&data.expr)?;
                Ok(())
            },
            Stmt::Function(data) => {
                let function = Function::new(
                    Rc::clone(data),
                    Rc::clone(&self.environment),
                    false,
                );
                self.environment.borrow_mut().define(
                    &data.name.lexeme,
                    Object::Function(function),
                );
                Ok(())
            },
            Stmt::If(data) => {
                if self.evaluate(&data.condition)?.is_truthy() {
                    self.execute(&data.then_branch)
                } else if let Some(else_branch) = &data.else_branch {
                    self.execute(else_branch)
                } else {
                    Ok(())
                }
            },
            Stmt::Print(data) => {
                let value = self.evaluate(&data.expr)?;
                writeln!(self.out, "{value}").expect("program output to be writable");
                Ok(())
            },
            Stmt::Return(data) => {
                let value = match &data.value {
                    Some(value) => self.evaluate(value)?,
                    None => Object::nil(),
                };

                Err(Unwind::Return(value))
            },
            Stmt::Var(data) => {
                let value = match &data.initializer {
                    Some(initializer) => self.evaluate(initializer)?,
                    None => Object::nil(),
                };

                self.environment.borrow_mut().define(&data.name.lexeme, value);
                Ok(())
            },
            Stmt::While(data) => {
                while self.evaluate(&data.condition)?.is_truthy() {
                    self.execute(&data.body)?;
                }
                Ok(())
            },
        }
    }

    /// Runs `statements` inside `environment`, restoring the previous
    /// environment on every exit path, unwinds included.
    pub fn execute_block(
        &mut self,
        statements: &[Stmt],
        environment: Rc<RefCell<Environment>>,
    ) -> RuntimeResult<()> {
        let previous = mem::replace(&mut self.environment, environment);

        let result = statements.iter().try_for_each(|statement| self.execute(statement));

        self.environment = previous;
        result
    }

    fn execute_class(&mut self, data: &ClassData) -> RuntimeResult<()> {
        let superclass = match &data.superclass {
            Some(variable) => match self.lookup_variable(variable.id, &variable.name)? {
                Object::Class(class) => Some(class),
                _ => {
                    return Err(RuntimeError::new(
                        &variable.name,
                        "Superclass must be a class.",
                    ).into());
                },
            },
            None => None,
        };

        self.environment.borrow_mut().define(&data.name.lexeme, Object::nil());

        // Methods of a subclass close over an extra environment holding
        // `super`; the resolver opens the matching scope.
        let enclosing = superclass.as_ref().map(|superclass| {
            let mut environment = Environment::new(Some(Rc::clone(&self.environment)));
            environment.define("super", Object::Class(Rc::clone(superclass)));
            mem::replace(&mut self.environment, Rc::new(RefCell::new(environment)))
        });

        let mut methods = HashMap::new();
        for method in &data.methods {
            let function = Function::new(
                Rc::clone(method),
                Rc::clone(&self.environment),
                method.name.lexeme == "init",
            );
            methods.insert(method.name.lexeme.clone(), function);
        }

        let class = Class::new(data.name.lexeme.clone(), superclass, methods);

        if let Some(enclosing) = enclosing {
            self.environment = enclosing;
        }

        self.environment.borrow_mut()
            .assign(&data.name, Object::Class(Rc::new(class)))
            .map_err(Unwind::from)
    }

    fn evaluate(&mut self, expr: &Expr) -> RuntimeResult<Object> {
        match expr {
            Expr::Assign(data) => {
                let value = self.evaluate(&data.value)?;

                match self.locals.get(&data.id) {
                    Some(&distance) => {
                        self.environment.borrow_mut()
                            .assign_at(distance, &data.name.lexeme, value.clone());
                    },
                    None => {
                        self.globals.borrow_mut()
                            .assign(&data.name, value.clone())
                            .map_err(Unwind::from)?;
                    },
                }

                Ok(value)
            },
            Expr::Binary(data) => self.evaluate_binary(data),
            Expr::Call(data) => self.evaluate_call(data),
            Expr::Get(data) => {
                let object = self.evaluate(&data.object)?;

                if let Object::Instance(instance) = &object {
                    Ok(instance.borrow().get(&data.name, &object)?)
                } else {
                    Err(RuntimeError::new(&data.name, "Only instances have properties.").into())
                }
            },
            Expr::Grouping(data) => self.evaluate(&data.expr),
            Expr::Literal(literal) => Ok(Object::Literal(literal.clone())),
            Expr::Logical(data) => {
                let left = self.evaluate(&data.left)?;

                // Short-circuiting yields the operand itself, never a
                // coerced boolean.
                let short_circuits = match data.operator.kind {
                    TokenKind::Or => left.is_truthy(),
                    _ => !left.is_truthy(),
                };

                if short_circuits {
                    Ok(left)
                } else {
                    self.evaluate(&data.right)
                }
            },
            Expr::Set(data) => {
                let object = self.evaluate(&data.object)?;

                if let Object::Instance(instance) = object {
                    let value = self.evaluate(&data.value)?;
                    instance.borrow_mut().set(&data.name, value.clone());
                    Ok(value)
                } else {
                    Err(RuntimeError::new(&data.name, "Only instances have fields.").into())
                }
            },
            Expr::Super(data) => self.evaluate_super(data),
            Expr::This(data) => self.lookup_variable(data.id, &data.keyword),
            Expr::Unary(data) => {
                let right = self.evaluate(&data.expr)?;

                match data.operator.kind {
                    TokenKind::Bang => Ok(Object::from(!right.is_truthy())),
                    TokenKind::Minus => {
                        let number = self.number_operand(&data.operator, &right)?;
                        Ok(Object::from(-number))
                    },
                    _ => unreachable!("the parser only builds '!' and '-' unary expressions"),
                }
            },
            Expr::Variable(data) => self.lookup_variable(data.id, &data.name),
        }
    }

    fn evaluate_binary(&mut self, data: &BinaryData) -> RuntimeResult<Object> {
        let left = self.evaluate(&data.left)?;
        let right = self.evaluate(&data.right)?;

        let operator = &data.operator;
        match operator.kind {
            TokenKind::BangEqual => Ok(Object::from(left != right)),
            TokenKind::EqualEqual => Ok(Object::from(left == right)),
            TokenKind::Plus => match (left, right) {
                (Object::Literal(Literal::Number(left)), Object::Literal(Literal::Number(right))) => {
                    Ok(Object::from(left + right))
                },
                (Object::Literal(Literal::String(left)), Object::Literal(Literal::String(right))) => {
                    Ok(Object::from(left + &right))
                },
                _ => Err(RuntimeError::new(
                    operator,
                    "Operands must be two numbers or two strings.",
                ).into()),
            },
            _ => {
                let (left, right) = self.number_operands(operator, &left, &right)?;

                match operator.kind {
                    TokenKind::Greater => Ok(Object::from(left > right)),
                    TokenKind::GreaterEqual => Ok(Object::from(left >= right)),
                    TokenKind::Less => Ok(Object::from(left < right)),
                    TokenKind::LessEqual => Ok(Object::from(left <= right)),
                    TokenKind::Minus => Ok(Object::from(left - right)),
                    // Division by zero is not an error; it follows IEEE-754.
                    TokenKind::Slash => Ok(Object::from(left / right)),
                    TokenKind::Star => Ok(Object::from(left * right)),
                    _ => unreachable!("the parser only builds binary operators"),
                }
            },
        }
    }

    fn evaluate_call(&mut self, data: &CallData) -> RuntimeResult<Object> {
        let callee = self.evaluate(&data.callee)?;

        let mut arguments = Vec::with_capacity(data.arguments.len());
        for argument in &data.arguments {
            arguments.push(self.evaluate(argument)?);
        }

        let callable: &dyn Callable = match &callee {
            Object::Function(function) => function,
            Object::Native(native) => native,
            Object::Class(class) => class,
            _ => {
                return Err(RuntimeError::new(
                    &data.paren,
                    "Can only call functions and classes.",
                ).into());
            },
        };

        if arguments.len() != callable.arity() {
            return Err(RuntimeError::new(
                &data.paren,
                format!(
                    "Expected {} arguments but got {}.",
                    callable.arity(),
                    arguments.len(),
                ),
            ).into());
        }

        callable.call(self, arguments)
    }

    fn evaluate_super(&mut self, data: &SuperData) -> RuntimeResult<Object> {
        let distance = *self.locals.get(&data.id)
            .expect("'super' to be resolved before execution");

        let superclass = match self.environment.borrow().get_at(distance, "super") {
            Object::Class(class) => class,
            _ => unreachable!("'super' always binds a class"),
        };

        // `this` lives one scope inside the one holding `super`.
        let instance = self.environment.borrow().get_at(distance - 1, "this");

        match superclass.find_method(&data.method.lexeme) {
            Some(method) => Ok(Object::Function(method.bind(instance))),
            None => Err(RuntimeError::new(
                &data.method,
                format!("Undefined property '{}'.", data.method.lexeme),
            ).into()),
        }
    }

    /// Resolved references read at their recorded depth; everything else
    /// falls back to the globals.
    fn lookup_variable(&self, id: usize, name: &Token) -> RuntimeResult<Object> {
        match self.locals.get(&id) {
            Some(&distance) => Ok(self.environment.borrow().get_at(distance, &name.lexeme)),
            None => Ok(self.globals.borrow().get(name)?),
        }
    }

    fn number_operand(&self, operator: &Token, operand: &Object) -> Result<f64, Unwind> {
        match operand {
            Object::Literal(Literal::Number(number)) => Ok(*number),
            _ => Err(RuntimeError::new(operator, "Operand must be a number.").into()),
        }
    }

    fn number_operands(
        &self,
        operator: &Token,
        left: &Object,
        right: &Object,
    ) -> Result<(f64, f64), Unwind> {
        match (left, right) {
            (Object::Literal(Literal::Number(left)), Object::Literal(Literal::Number(right))) => {
                Ok((*left, *right))
            },
            _ => Err(RuntimeError::new(operator, "Operands must be numbers.").into()),
        }
    }
}
