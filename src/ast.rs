use crate::expr::Expr;

/// Builds a parenthesized, prefix-notation string for an expression.
macro_rules! parenthesize {
    ( $self:ident, $name:expr, $( $x:expr ),+ ) => {
        {
            let mut string = String::new();
            string += "(";
            string += $name;
            $(
                string += " ";
                string += &$self.print($x);
            )*
            string += ")";

            string
        }
    };
}

/// Renders expressions in a lisp-like prefix form, e.g. `(* (- 123) (group 45.67))`.
/// Debugging aid; the interpreter itself never consults it.
pub struct AstPrinter;

impl AstPrinter {
    pub fn print(&self, expr: &Expr) -> String {
        match expr {
            Expr::Assign(data) => {
                parenthesize!(self, format!("= {}", data.name.lexeme).as_str(), &data.value)
            },
            Expr::Binary(data) => {
                parenthesize!(self, &data.operator.lexeme, &data.left, &data.right)
            },
            Expr::Call(data) => {
                let arguments = data.arguments.iter()
                    .map(|argument| self.print(argument))
                    .collect::<Vec<String>>()
                    .join(" ");

                format!("{}({arguments})", self.print(&data.callee))
            },
            Expr::Get(data) => {
                parenthesize!(self, format!(". {}", data.name.lexeme).as_str(), &data.object)
            },
            Expr::Grouping(data) => parenthesize!(self, "group", &data.expr),
            Expr::Literal(literal) => literal.to_string(),
            Expr::Logical(data) => {
                parenthesize!(self, &data.operator.lexeme, &data.left, &data.right)
            },
            Expr::Set(data) => {
                let name = format!("= {}", data.name.lexeme);
                parenthesize!(self, name.as_str(), &data.object, &data.value)
            },
            Expr::Super(data) => format!("(super {})", data.method.lexeme),
            Expr::This(_) => "this".to_string(),
            Expr::Unary(data) => parenthesize!(self, &data.operator.lexeme, &data.expr),
            Expr::Variable(data) => data.name.lexeme.clone(),
        }
    }
}
