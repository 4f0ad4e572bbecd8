use std::rc::Rc;

use crate::error::{ParseError, Reporter};
use crate::expr::*;
use crate::literal::Literal;
use crate::stmt::*;
use crate::token::{Token, TokenKind};

type ParseResult<T> = Result<T, ParseError>;

/// Recursive descent over the token stream, one method per grammar rule:
///
/// - program     -> declaration* EOF ;
/// - declaration -> classDecl | funDecl | varDecl | statement ;
/// - classDecl   -> "class" IDENTIFIER ( "<" IDENTIFIER )? "{" function* "}" ;
/// - funDecl     -> "fun" function ;
/// - function    -> IDENTIFIER "(" parameters? ")" block ;
/// - varDecl     -> "var" IDENTIFIER ( "=" expression )? ";" ;
/// - statement   -> exprStmt | forStmt | ifStmt | printStmt | returnStmt | whileStmt | block ;
/// - forStmt     -> "for" "(" ( varDecl | exprStmt | ";" ) expression? ";" expression? ")" statement ;
/// - ifStmt      -> "if" "(" expression ")" statement ( "else" statement )? ;
/// - printStmt   -> "print" expression ";" ;
/// - returnStmt  -> "return" expression? ";" ;
/// - whileStmt   -> "while" "(" expression ")" statement ;
/// - block       -> "{" declaration* "}" ;
/// - expression  -> assignment ;
/// - assignment  -> ( call "." )? IDENTIFIER "=" assignment | logic_or ;
/// - logic_or    -> logic_and ( "or" logic_and )* ;
/// - logic_and   -> equality ( "and" equality )* ;
/// - equality    -> comparison ( ( "!=" | "==" ) comparison )* ;
/// - comparison  -> term ( ( ">" | ">=" | "<" | "<=" ) term )* ;
/// - term        -> factor ( ( "-" | "+" ) factor )* ;
/// - factor      -> unary ( ( "/" | "*" ) unary )* ;
/// - unary       -> ( "!" | "-" ) unary | call ;
/// - call        -> primary ( "(" arguments? ")" | "." IDENTIFIER )* ;
/// - primary     -> "true" | "false" | "nil" | "this" | NUMBER | STRING
///                | IDENTIFIER | "(" expression ")" | "super" "." IDENTIFIER ;
pub struct Parser<'r> {
    tokens: Vec<Token>,
    current: usize,
    next_id: usize,
    reporter: &'r mut Reporter,
}

impl<'r> Parser<'r> {
    /// `first_id` is the first node id this parse may hand out. Ids must stay
    /// unique across every parse feeding one interpreter: closures built from
    /// an earlier REPL line keep their entries in the scope-depth table.
    pub fn new(tokens: Vec<Token>, first_id: usize, reporter: &'r mut Reporter) -> Self {
        Parser {
            tokens,
            current: 0,
            next_id: first_id,
            reporter,
        }
    }

    /// Parses the whole token stream into statements. Declarations that fail
    /// to parse are reported and dropped; the caller checks the reporter
    /// before running anything.
    pub fn parse(&mut self) -> Vec<Stmt> {
        let mut statements = Vec::new();

        while !self.is_at_end() {
            if let Some(stmt) = self.declaration() {
                statements.push(stmt);
            }
        }

        statements
    }

    /// The id that the next parse on the same interpreter should start from.
    pub fn next_id(&self) -> usize {
        self.next_id
    }

    fn expr_id(&mut self) -> usize {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Returns the next token without consuming it.
    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    /// Returns the most recently consumed token.
    fn previous(&self) -> &Token {
        &self.tokens[self.current - 1]
    }

    fn is_at_end(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    /// Returns if the next token is of the given kind.
    fn check(&self, kind: TokenKind) -> bool {
        !self.is_at_end() && self.peek().kind == kind
    }

    /// Consumes the next token and returns it.
    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }

        self.previous()
    }

    /// Consumes the next token if it is any of the given kinds.
    fn matches(&mut self, kinds: &[TokenKind]) -> bool {
        for kind in kinds {
            if self.check(*kind) {
                self.advance();
                return true;
            }
        }

        false
    }

    /// Consumes the next token, or fails with `message` attributed to it.
    fn consume(&mut self, kind: TokenKind, message: &str) -> ParseResult<&Token> {
        if self.check(kind) {
            return Ok(self.advance());
        }

        Err(ParseError::new(self.peek(), message))
    }

    fn declaration(&mut self) -> Option<Stmt> {
        let statement = if self.matches(&[TokenKind::Class]) {
            self.class_declaration()
        } else if self.matches(&[TokenKind::Fun]) {
            self.function("function").map(Stmt::Function)
        } else if self.matches(&[TokenKind::Var]) {
            self.var_declaration()
        } else {
            self.statement()
        };

        match statement {
            Ok(stmt) => Some(stmt),
            Err(error) => {
                self.reporter.error_at(&error.token, &error.message);
                self.synchronize();
                None
            },
        }
    }

    fn class_declaration(&mut self) -> ParseResult<Stmt> {
        let name = self.consume(TokenKind::Identifier, "Expect class name.")?.clone();

        let superclass = if self.matches(&[TokenKind::Less]) {
            self.consume(TokenKind::Identifier, "Expect superclass name.")?;
            Some(VariableData { id: self.expr_id(), name: self.previous().clone() })
        } else {
            None
        };

        self.consume(TokenKind::LeftBrace, "Expect '{' before class body.")?;

        let mut methods = Vec::new();
        while !self.check(TokenKind::RightBrace) && !self.is_at_end() {
            methods.push(self.function("method")?);
        }

        self.consume(TokenKind::RightBrace, "Expect '}' after class body.")?;

        Ok(Stmt::Class(ClassData { name, superclass, methods }))
    }

    fn function(&mut self, kind: &str) -> ParseResult<Rc<FunctionData>> {
        let name = self.consume(TokenKind::Identifier, &format!("Expect {kind} name."))?.clone();

        self.consume(TokenKind::LeftParen, &format!("Expect '(' after {kind} name."))?;

        let mut params = Vec::new();
        if !self.check(TokenKind::RightParen) {
            loop {
                if params.len() >= 255 {
                    let token = self.peek().clone();
                    self.reporter.error_at(&token, "Can't have more than 255 parameters.");
                }

                params.push(self.consume(TokenKind::Identifier, "Expect parameter name.")?.clone());

                if !self.matches(&[TokenKind::Comma]) {
                    break;
                }
            }
        }

        self.consume(TokenKind::RightParen, "Expect ')' after parameters.")?;
        self.consume(TokenKind::LeftBrace, &format!("Expect '{{' before {kind} body."))?;

        let body = self.block()?;

        Ok(Rc::new(FunctionData { name, params, body }))
    }

    fn var_declaration(&mut self) -> ParseResult<Stmt> {
        let name = self.consume(TokenKind::Identifier, "Expect variable name.")?.clone();

        let initializer = if self.matches(&[TokenKind::Equal]) {
            Some(self.expression()?)
        } else {
            None
        };

        self.consume(TokenKind::Semicolon, "Expect ';' after variable declaration.")?;

        Ok(Stmt::Var(VarData { name, initializer }))
    }

    fn statement(&mut self) -> ParseResult<Stmt> {
        if self.matches(&[TokenKind::For]) {
            return self.for_statement();
        }

        if self.matches(&[TokenKind::If]) {
            return self.if_statement();
        }

        if self.matches(&[TokenKind::Print]) {
            return self.print_statement();
        }

        if self.matches(&[TokenKind::Return]) {
            return self.return_statement();
        }

        if self.matches(&[TokenKind::While]) {
            return self.while_statement();
        }

        if self.matches(&[TokenKind::LeftBrace]) {
            return Ok(Stmt::Block(BlockData { statements: self.block()? }));
        }

        self.expression_statement()
    }

    /// `for` is pure sugar: the loop is rewritten into a `while`, with the
    /// increment appended to the body and the initializer wrapped around the
    /// whole thing.
    fn for_statement(&mut self) -> ParseResult<Stmt> {
        self.consume(TokenKind::LeftParen, "Expect '(' after 'for'.")?;

        let initializer = if self.matches(&[TokenKind::Semicolon]) {
            None
        } else if self.matches(&[TokenKind::Var]) {
            Some(self.var_declaration()?)
        } else {
            Some(self.expression_statement()?)
        };

        let condition = if !self.check(TokenKind::Semicolon) {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume(TokenKind::Semicolon, "Expect ';' after loop condition.")?;

        let increment = if !self.check(TokenKind::RightParen) {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume(TokenKind::RightParen, "Expect ')' after for clauses.")?;

        let mut body = self.statement()?;

        if let Some(increment) = increment {
            body = Stmt::Block(BlockData {
                statements: vec![
                    body,
                    Stmt::Expression(ExpressionData { expr: increment }),
                ],
            });
        }

        body = Stmt::While(WhileData {
            condition: condition.unwrap_or(Expr::Literal(Literal::Bool(true))),
            body: Box::new(body),
        });

        if let Some(initializer) = initializer {
            body = Stmt::Block(BlockData { statements: vec![initializer, body] });
        }

        Ok(body)
    }

    fn if_statement(&mut self) -> ParseResult<Stmt> {
        self.consume(TokenKind::LeftParen, "Expect '(' after 'if'.")?;
        let condition = self.expression()?;
        self.consume(TokenKind::RightParen, "Expect ')' after if condition.")?;

        let then_branch = Box::new(self.statement()?);
        let else_branch = if self.matches(&[TokenKind::Else]) {
            Some(Box::new(self.statement()?))
        } else {
            None
        };

        Ok(Stmt::If(IfData { condition, then_branch, else_branch }))
    }

    fn print_statement(&mut self) -> ParseResult<Stmt> {
        let expr = self.expression()?;
        self.consume(TokenKind::Semicolon, "Expect ';' after value.")?;

        Ok(Stmt::Print(PrintData { expr }))
    }

    fn return_statement(&mut self) -> ParseResult<Stmt> {
        let keyword = self.previous().clone();

        let value = if !self.check(TokenKind::Semicolon) {
            Some(self.expression()?)
        } else {
            None
        };

        self.consume(TokenKind::Semicolon, "Expect ';' after return value.")?;

        Ok(Stmt::Return(ReturnData { keyword, value }))
    }

    fn while_statement(&mut self) -> ParseResult<Stmt> {
        self.consume(TokenKind::LeftParen, "Expect '(' after 'while'.")?;
        let condition = self.expression()?;
        self.consume(TokenKind::RightParen, "Expect ')' after condition.")?;

        let body = Box::new(self.statement()?);

        Ok(Stmt::While(WhileData { condition, body }))
    }

    fn expression_statement(&mut self) -> ParseResult<Stmt> {
        let expr = self.expression()?;
        self.consume(TokenKind::Semicolon, "Expect ';' after expression.")?;

        Ok(Stmt::Expression(ExpressionData { expr }))
    }

    fn block(&mut self) -> ParseResult<Vec<Stmt>> {
        let mut statements = Vec::new();

        while !self.check(TokenKind::RightBrace) && !self.is_at_end() {
            if let Some(stmt) = self.declaration() {
                statements.push(stmt);
            }
        }

        self.consume(TokenKind::RightBrace, "Expect '}' after block.")?;

        Ok(statements)
    }

    fn expression(&mut self) -> ParseResult<Expr> {
        self.assignment()
    }

    /// The left side is parsed as an ordinary expression first; only once the
    /// `=` shows up is it reinterpreted as an assignment target.
    fn assignment(&mut self) -> ParseResult<Expr> {
        let expr = self.or()?;

        if self.matches(&[TokenKind::Equal]) {
            let equals = self.previous().clone();
            let value = self.assignment()?;

            match expr {
                Expr::Variable(data) => {
                    return Ok(Expr::Assign(AssignData {
                        id: self.expr_id(),
                        name: data.name,
                        value: Box::new(value),
                    }));
                },
                Expr::Get(data) => {
                    return Ok(Expr::Set(SetData {
                        object: data.object,
                        name: data.name,
                        value: Box::new(value),
                    }));
                },
                // Not fatal: the left side is returned as an ordinary
                // expression and parsing carries on.
                expr => {
                    self.reporter.error_at(&equals, "Invalid assignment target.");
                    return Ok(expr);
                },
            }
        }

        Ok(expr)
    }

    fn or(&mut self) -> ParseResult<Expr> {
        let mut expr = self.and()?;

        while self.matches(&[TokenKind::Or]) {
            let operator = self.previous().clone();
            let right = self.and()?;
            expr = Expr::Logical(LogicalData {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            });
        }

        Ok(expr)
    }

    fn and(&mut self) -> ParseResult<Expr> {
        let mut expr = self.equality()?;

        while self.matches(&[TokenKind::And]) {
            let operator = self.previous().clone();
            let right = self.equality()?;
            expr = Expr::Logical(LogicalData {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            });
        }

        Ok(expr)
    }

    fn equality(&mut self) -> ParseResult<Expr> {
        let mut expr = self.comparison()?;

        while self.matches(&[TokenKind::BangEqual, TokenKind::EqualEqual]) {
            let operator = self.previous().clone();
            let right = self.comparison()?;
            expr = Expr::Binary(BinaryData {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            });
        }

        Ok(expr)
    }

    fn comparison(&mut self) -> ParseResult<Expr> {
        let mut expr = self.term()?;

        while self.matches(&[
            TokenKind::Greater,
            TokenKind::GreaterEqual,
            TokenKind::Less,
            TokenKind::LessEqual,
        ]) {
            let operator = self.previous().clone();
            let right = self.term()?;
            expr = Expr::Binary(BinaryData {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            });
        }

        Ok(expr)
    }

    fn term(&mut self) -> ParseResult<Expr> {
        let mut expr = self.factor()?;

        while self.matches(&[TokenKind::Minus, TokenKind::Plus]) {
            let operator = self.previous().clone();
            let right = self.factor()?;
            expr = Expr::Binary(BinaryData {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            });
        }

        Ok(expr)
    }

    fn factor(&mut self) -> ParseResult<Expr> {
        let mut expr = self.unary()?;

        while self.matches(&[TokenKind::Slash, TokenKind::Star]) {
            let operator = self.previous().clone();
            let right = self.unary()?;
            expr = Expr::Binary(BinaryData {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            });
        }

        Ok(expr)
    }

    fn unary(&mut self) -> ParseResult<Expr> {
        if self.matches(&[TokenKind::Bang, TokenKind::Minus]) {
            let operator = self.previous().clone();
            let right = self.unary()?;

            return Ok(Expr::Unary(UnaryData {
                operator,
                expr: Box::new(right),
            }));
        }

        self.call()
    }

    fn call(&mut self) -> ParseResult<Expr> {
        let mut expr = self.primary()?;

        loop {
            if self.matches(&[TokenKind::LeftParen]) {
                expr = self.finish_call(expr)?;
            } else if self.matches(&[TokenKind::Dot]) {
                let name = self.consume(
                    TokenKind::Identifier,
                    "Expect property name after '.'.",
                )?.clone();
                expr = Expr::Get(GetData { object: Box::new(expr), name });
            } else {
                break;
            }
        }

        Ok(expr)
    }

    fn finish_call(&mut self, callee: Expr) -> ParseResult<Expr> {
        let mut arguments = Vec::new();

        if !self.check(TokenKind::RightParen) {
            loop {
                // Reported but not fatal; every argument is still collected
                // and an oversized call fails the arity check at runtime.
                if arguments.len() >= 255 {
                    let token = self.peek().clone();
                    self.reporter.error_at(&token, "Can't have more than 255 arguments.");
                }

                arguments.push(self.expression()?);

                if !self.matches(&[TokenKind::Comma]) {
                    break;
                }
            }
        }

        let paren = self.consume(TokenKind::RightParen, "Expect ')' after arguments.")?.clone();

        Ok(Expr::Call(CallData {
            callee: Box::new(callee),
            paren,
            arguments,
        }))
    }

    fn primary(&mut self) -> ParseResult<Expr> {
        if self.matches(&[TokenKind::False]) {
            return Ok(Expr::Literal(Literal::Bool(false)));
        }

        if self.matches(&[TokenKind::True]) {
            return Ok(Expr::Literal(Literal::Bool(true)));
        }

        if self.matches(&[TokenKind::Nil]) {
            return Ok(Expr::Literal(Literal::Nil));
        }

        if self.matches(&[TokenKind::Number, TokenKind::String]) {
            let literal = self.previous().literal.clone()
                .expect("number and string tokens carry a literal value");
            return Ok(Expr::Literal(literal));
        }

        if self.matches(&[TokenKind::Super]) {
            let keyword = self.previous().clone();
            self.consume(TokenKind::Dot, "Expect '.' after 'super'.")?;
            let method = self.consume(
                TokenKind::Identifier,
                "Expect superclass method name.",
            )?.clone();

            return Ok(Expr::Super(SuperData { id: self.expr_id(), keyword, method }));
        }

        if self.matches(&[TokenKind::This]) {
            return Ok(Expr::This(ThisData {
                id: self.expr_id(),
                keyword: self.previous().clone(),
            }));
        }

        if self.matches(&[TokenKind::Identifier]) {
            return Ok(Expr::Variable(VariableData {
                id: self.expr_id(),
                name: self.previous().clone(),
            }));
        }

        if self.matches(&[TokenKind::LeftParen]) {
            let expr = self.expression()?;
            self.consume(TokenKind::RightParen, "Expect ')' after expression.")?;

            return Ok(Expr::Grouping(GroupingData { expr: Box::new(expr) }));
        }

        Err(ParseError::new(self.peek(), "Expect expression."))
    }

    /// Discards tokens until a statement boundary so one error does not
    /// cascade into the rest of the file.
    fn synchronize(&mut self) {
        self.advance();

        while !self.is_at_end() {
            if self.previous().kind == TokenKind::Semicolon {
                return;
            }

            match self.peek().kind {
                TokenKind::Class
                | TokenKind::Fun
                | TokenKind::Var
                | TokenKind::For
                | TokenKind::If
                | TokenKind::While
                | TokenKind::Print
                | TokenKind::Return => return,
                _ => self.advance(),
            };
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ast::AstPrinter;
    use crate::scanner::Scanner;

    fn parse(source: &str) -> Vec<Stmt> {
        let mut reporter = Reporter::new();
        let tokens = Scanner::new(source, &mut reporter).scan_tokens();
        let statements = Parser::new(tokens, 0, &mut reporter).parse();
        assert!(!reporter.had_error(), "unexpected parse error in {source:?}");
        statements
    }

    fn parse_expr(source: &str) -> String {
        let statements = parse(source);
        let Some(Stmt::Expression(data)) = statements.first() else {
            panic!("expected a single expression statement");
        };
        AstPrinter.print(&data.expr)
    }

    #[test]
    fn precedence_climbs_from_equality_to_unary() {
        assert_eq!(parse_expr("1 + 2 * 3;"), "(+ 1 (* 2 3))");
        assert_eq!(parse_expr("-1 - -2;"), "(- (- 1) (- 2))");
        assert_eq!(parse_expr("1 < 2 == true;"), "(== (< 1 2) true)");
        assert_eq!(parse_expr("(1 + 2) / 3;"), "(/ (group (+ 1 2)) 3)");
    }

    #[test]
    fn logical_operators_nest_or_over_and() {
        assert_eq!(parse_expr("a or b and c;"), "(or a (and b c))");
    }

    #[test]
    fn assignment_is_right_associative() {
        assert_eq!(parse_expr("a = b = 1;"), "(= a (= b 1))");
    }

    #[test]
    fn property_access_and_calls_chain() {
        assert_eq!(parse_expr("object.field.method(1, 2);"), "(. method (. field object))(1 2)");
    }

    #[test]
    fn parsing_is_deterministic() {
        let source = "fun f(a) { for (var i = 0; i < a; i = i + 1) print i; } f(3);";

        let mut reporter = Reporter::new();
        let tokens = Scanner::new(source, &mut reporter).scan_tokens();

        let first = Parser::new(tokens.clone(), 0, &mut reporter).parse();
        let second = Parser::new(tokens, 0, &mut reporter).parse();

        assert!(!reporter.had_error());
        assert_eq!(first, second);
    }

    #[test]
    fn for_loop_desugars_into_while() {
        let statements = parse("for (var i = 0; i < 3; i = i + 1) print i;");

        // Outer block holds the initializer and the while loop.
        let Some(Stmt::Block(block)) = statements.first() else {
            panic!("expected the initializer block");
        };
        assert!(matches!(block.statements[0], Stmt::Var(_)));
        let Stmt::While(while_data) = &block.statements[1] else {
            panic!("expected the desugared while");
        };

        // Inner block holds the body followed by the increment.
        let Stmt::Block(body) = while_data.body.as_ref() else {
            panic!("expected the body block");
        };
        assert!(matches!(body.statements[0], Stmt::Print(_)));
        assert!(matches!(body.statements[1], Stmt::Expression(_)));
    }

    #[test]
    fn for_loop_without_condition_loops_on_true() {
        let statements = parse("for (;;) print 1;");

        let Some(Stmt::While(while_data)) = statements.first() else {
            panic!("expected a bare while");
        };
        assert_eq!(while_data.condition, Expr::Literal(Literal::Bool(true)));
    }

    #[test]
    fn invalid_assignment_target_is_reported_but_not_fatal() {
        let mut reporter = Reporter::new();
        let tokens = Scanner::new("1 + 2 = 3;", &mut reporter).scan_tokens();
        let statements = Parser::new(tokens, 0, &mut reporter).parse();

        assert!(reporter.had_error());
        assert_eq!(statements.len(), 1);
    }

    #[test]
    fn parse_error_synchronizes_to_the_next_statement() {
        let mut reporter = Reporter::new();
        let tokens = Scanner::new("var = 1;\nprint 2;", &mut reporter).scan_tokens();
        let statements = Parser::new(tokens, 0, &mut reporter).parse();

        assert!(reporter.had_error());
        assert_eq!(statements.len(), 1);
        assert!(matches!(statements[0], Stmt::Print(_)));
    }

    #[test]
    fn class_declaration_collects_methods_and_superclass() {
        let statements = parse("class B < A { init(x) {} m() {} }");

        let Some(Stmt::Class(class)) = statements.first() else {
            panic!("expected a class declaration");
        };
        assert_eq!(class.name.lexeme, "B");
        assert_eq!(class.superclass.as_ref().map(|s| s.name.lexeme.as_str()), Some("A"));
        assert_eq!(class.methods.len(), 2);
        assert_eq!(class.methods[0].name.lexeme, "init");
        assert_eq!(class.methods[0].params.len(), 1);
    }
}
