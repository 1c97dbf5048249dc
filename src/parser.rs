use crate::ast::{symbol, BinOp, Block, Call, CompareOp, Expr, Function, If, Program, Stmt, Symbol};
use crate::error::SyntaxError;
use crate::lexer::{Spanned, Token};
use crate::stack::ensure_sufficient_stack;

type ParseResult<T> = Result<T, SyntaxError>;

/// Binding strength, weakest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Prec {
    OrElse,
    AndAlso,
    Not,
    Compare,
    Cons,
    Member,
    Sum,
    Product,
    Negate,
    Pow,
}

impl Prec {
    fn tighter(self) -> Prec {
        match self {
            Prec::OrElse => Prec::AndAlso,
            Prec::AndAlso => Prec::Not,
            Prec::Not => Prec::Compare,
            Prec::Compare => Prec::Cons,
            Prec::Cons => Prec::Member,
            Prec::Member => Prec::Sum,
            Prec::Sum => Prec::Product,
            Prec::Product => Prec::Negate,
            Prec::Negate | Prec::Pow => Prec::Pow,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Infix {
    OrElse,
    AndAlso,
    Compare(CompareOp),
    Cons,
    Member,
    Binary(BinOp),
}

impl Infix {
    fn from_token(token: Token) -> Option<Infix> {
        Some(match token {
            Token::OrElse => Infix::OrElse,
            Token::AndAlso => Infix::AndAlso,
            Token::Le => Infix::Compare(CompareOp::Le),
            Token::Lt => Infix::Compare(CompareOp::Lt),
            Token::Eq => Infix::Compare(CompareOp::Eq),
            Token::Ne => Infix::Compare(CompareOp::Ne),
            Token::Ge => Infix::Compare(CompareOp::Ge),
            Token::Gt => Infix::Compare(CompareOp::Gt),
            Token::Cons => Infix::Cons,
            Token::In => Infix::Member,
            Token::Plus => Infix::Binary(BinOp::Add),
            Token::Minus => Infix::Binary(BinOp::Sub),
            Token::Star => Infix::Binary(BinOp::Mul),
            Token::Slash => Infix::Binary(BinOp::Div),
            Token::Div => Infix::Binary(BinOp::IntDiv),
            Token::Mod => Infix::Binary(BinOp::Mod),
            Token::Pow => Infix::Binary(BinOp::Pow),
            _ => return None,
        })
    }

    fn prec(self) -> Prec {
        match self {
            Infix::OrElse => Prec::OrElse,
            Infix::AndAlso => Prec::AndAlso,
            Infix::Compare(_) => Prec::Compare,
            Infix::Cons => Prec::Cons,
            Infix::Member => Prec::Member,
            Infix::Binary(BinOp::Add | BinOp::Sub) => Prec::Sum,
            Infix::Binary(BinOp::Mul | BinOp::Div | BinOp::IntDiv | BinOp::Mod) => Prec::Product,
            Infix::Binary(BinOp::Pow) => Prec::Pow,
        }
    }

    fn right_assoc(self) -> bool {
        matches!(self, Infix::Cons | Infix::Binary(BinOp::Pow))
    }

    fn build(self, left: Expr, right: Expr) -> Expr {
        let (left, right) = (Box::new(left), Box::new(right));
        match self {
            Infix::OrElse => Expr::OrElse(left, right),
            Infix::AndAlso => Expr::AndAlso(left, right),
            Infix::Compare(op) => Expr::Compare { op, left, right },
            Infix::Cons => Expr::Cons {
                head: left,
                tail: right,
            },
            Infix::Member => Expr::Member {
                item: left,
                container: right,
            },
            Infix::Binary(op) => Expr::Binary { op, left, right },
        }
    }
}

/// Parses a whole program. Every token must be consumed.
pub fn parse(tokens: &[Spanned]) -> ParseResult<Program> {
    let mut parser = Parser { tokens, pos: 0 };
    let program = parser.program()?;
    tracing::trace!(
        functions = program.functions.len(),
        statements = program.main.0.len(),
        "parsed program"
    );
    Ok(program)
}

struct Parser<'t, 'a> {
    tokens: &'t [Spanned<'a>],
    pos: usize,
}

impl<'t, 'a> Parser<'t, 'a> {
    fn peek(&self) -> Option<Token<'a>> {
        self.peek_at(0)
    }

    fn peek_at(&self, offset: usize) -> Option<Token<'a>> {
        self.tokens.get(self.pos + offset).map(|s| s.token)
    }

    fn at(&self, token: Token) -> bool {
        self.peek() == Some(token)
    }

    fn eat(&mut self, token: Token) -> bool {
        let found = self.at(token);
        if found {
            self.pos += 1;
        }
        found
    }

    fn unexpected(&self, expected: &'static str) -> SyntaxError {
        match self.tokens.get(self.pos) {
            Some(s) => SyntaxError::UnexpectedToken {
                found: s.token.to_string(),
                expected,
                line: s.line,
            },
            None => SyntaxError::UnexpectedEnd { expected },
        }
    }

    fn expect(&mut self, token: Token, expected: &'static str) -> ParseResult<()> {
        if self.eat(token) {
            Ok(())
        } else {
            Err(self.unexpected(expected))
        }
    }

    fn identifier(&mut self, expected: &'static str) -> ParseResult<Symbol> {
        match self.peek() {
            Some(Token::Identifier(name)) => {
                self.pos += 1;
                Ok(symbol(name))
            }
            _ => Err(self.unexpected(expected)),
        }
    }

    /// `item (, item)* close`, or just `close`.
    fn comma_separated<T>(
        &mut self,
        close: Token,
        expected: &'static str,
        mut item: impl FnMut(&mut Self) -> ParseResult<T>,
    ) -> ParseResult<Vec<T>> {
        let mut items = Vec::new();
        if self.eat(close) {
            return Ok(items);
        }
        loop {
            items.push(item(self)?);
            if self.eat(Token::Comma) {
                continue;
            }
            self.expect(close, expected)?;
            return Ok(items);
        }
    }

    fn program(&mut self) -> ParseResult<Program> {
        let mut functions = Vec::new();
        while self.at(Token::Fun) {
            functions.push(self.function()?);
            self.expect(Token::Semicolon, "`;` after a function definition")?;
        }
        let main = self.block()?;
        if self.peek().is_some() {
            return Err(self.unexpected("end of input"));
        }
        Ok(Program { functions, main })
    }

    fn function(&mut self) -> ParseResult<Function> {
        self.expect(Token::Fun, "`fun`")?;
        let name = self.identifier("a function name")?;
        self.expect(Token::LParen, "`(`")?;
        let params = self.comma_separated(Token::RParen, "`,` or `)`", |p| {
            p.identifier("a parameter name")
        })?;
        self.expect(Token::Assign, "`=`")?;
        let body = self.block()?;
        let ret = self.expr()?;
        Ok(Function {
            name,
            params,
            body,
            ret,
        })
    }

    fn block(&mut self) -> ParseResult<Block> {
        self.expect(Token::LBrace, "`{`")?;
        let mut statements = Vec::new();
        while !self.eat(Token::RBrace) {
            statements.push(self.statement()?);
        }
        Ok(Block(statements))
    }

    fn statement(&mut self) -> ParseResult<Stmt> {
        ensure_sufficient_stack(|| self.statement_inner())
    }

    fn statement_inner(&mut self) -> ParseResult<Stmt> {
        let stmt = match self.peek() {
            Some(Token::Print) => {
                self.pos += 1;
                self.expect(Token::LParen, "`(` after `print`")?;
                let value = self.expr()?;
                self.expect(Token::RParen, "`)`")?;
                Stmt::Print(value)
            }
            Some(Token::While) => {
                self.pos += 1;
                let cond = self.condition()?;
                let body = self.block()?;
                return Ok(Stmt::While { cond, body });
            }
            Some(Token::If) => {
                self.pos += 1;
                let cond = self.condition()?;
                let branch = If {
                    cond,
                    then: self.block()?,
                };
                if self.eat(Token::Else) {
                    let otherwise = self.block()?;
                    return Ok(Stmt::IfElse { branch, otherwise });
                }
                return Ok(Stmt::If(branch));
            }
            Some(Token::LBrace) => return Ok(Stmt::Block(self.block()?)),
            Some(Token::Identifier(_)) => self.name_statement()?,
            _ => return Err(self.unexpected("a statement")),
        };
        self.expect(Token::Semicolon, "`;`")?;
        Ok(stmt)
    }

    /// `( expr )` heading an `if` or `while`.
    fn condition(&mut self) -> ParseResult<Expr> {
        self.expect(Token::LParen, "`(`")?;
        let cond = self.expr()?;
        self.expect(Token::RParen, "`)`")?;
        Ok(cond)
    }

    /// Statements that start with a name: calls, assignments and the bare
    /// `name;` form, which reassigns the variable to itself.
    fn name_statement(&mut self) -> ParseResult<Stmt> {
        let name = self.identifier("a name")?;
        match self.peek() {
            Some(Token::LParen) => Ok(Stmt::Call(self.call(name)?)),
            Some(Token::LBracket) => {
                let indices = self.index_chain()?;
                self.expect(Token::Assign, "`=` after an index")?;
                let value = self.expr()?;
                Ok(Stmt::IndexAssign {
                    name,
                    indices,
                    value,
                })
            }
            Some(Token::Assign) => {
                self.pos += 1;
                let value = self.expr()?;
                Ok(Stmt::Assign { name, value })
            }
            Some(Token::Semicolon) => Ok(Stmt::Assign {
                name,
                value: Expr::Var(name),
            }),
            _ => Err(self.unexpected("`=`, `[`, `(` or `;`")),
        }
    }

    fn call(&mut self, name: Symbol) -> ParseResult<Call> {
        self.expect(Token::LParen, "`(`")?;
        let args = self.comma_separated(Token::RParen, "`,` or `)`", Self::expr)?;
        Ok(Call { name, args })
    }

    fn index_chain(&mut self) -> ParseResult<Vec<Expr>> {
        let mut indices = Vec::new();
        while self.eat(Token::LBracket) {
            indices.push(self.expr()?);
            self.expect(Token::RBracket, "`]`")?;
        }
        Ok(indices)
    }

    fn expr(&mut self) -> ParseResult<Expr> {
        self.expr_bp(Prec::OrElse)
    }

    /// Parses an expression whose operators all bind at least as tightly as
    /// `min`.
    fn expr_bp(&mut self, min: Prec) -> ParseResult<Expr> {
        ensure_sufficient_stack(|| {
            let mut left = self.unary()?;
            while let Some(op) = self.peek().and_then(Infix::from_token) {
                let prec = op.prec();
                if prec < min {
                    break;
                }
                self.pos += 1;
                let right = if op.right_assoc() {
                    self.expr_bp(prec)?
                } else {
                    self.expr_bp(prec.tighter())?
                };
                left = op.build(left, right);
            }
            Ok(left)
        })
    }

    fn unary(&mut self) -> ParseResult<Expr> {
        if self.eat(Token::Not) {
            let operand = self.expr_bp(Prec::Not.tighter())?;
            return Ok(Expr::Not(Box::new(operand)));
        }
        if self.eat(Token::Minus) {
            let operand = self.expr_bp(Prec::Negate)?;
            return Ok(Expr::Negate(Box::new(operand)));
        }
        self.primary()
    }

    fn primary(&mut self) -> ParseResult<Expr> {
        let expr = match self.peek() {
            Some(Token::Integer(n)) => {
                self.pos += 1;
                Expr::Integer(n)
            }
            Some(Token::Real(n)) => {
                self.pos += 1;
                Expr::Real(n)
            }
            Some(Token::StringLiteral(s)) => {
                self.pos += 1;
                Expr::Str(s.to_string())
            }
            Some(Token::True) => {
                self.pos += 1;
                Expr::Bool(true)
            }
            Some(Token::False) => {
                self.pos += 1;
                Expr::Bool(false)
            }
            Some(Token::Identifier(name)) => {
                self.pos += 1;
                let name = symbol(name);
                if self.at(Token::LParen) {
                    Expr::Call(self.call(name)?)
                } else {
                    Expr::Var(name)
                }
            }
            Some(Token::LBracket) => {
                self.pos += 1;
                Expr::List(self.comma_separated(Token::RBracket, "`,` or `]`", Self::expr)?)
            }
            Some(Token::LParen) => {
                self.pos += 1;
                self.parenthesized()?
            }
            Some(Token::Hash) => {
                self.pos += 1;
                self.tuple_index()?
            }
            _ => return Err(self.unexpected("an expression")),
        };

        if self.at(Token::LBracket) {
            let indices = self.index_chain()?;
            return Ok(Expr::Index {
                target: Box::new(expr),
                indices,
            });
        }
        Ok(expr)
    }

    /// After `(`: a grouped expression, or a tuple when a comma follows the
    /// first element.
    fn parenthesized(&mut self) -> ParseResult<Expr> {
        let first = self.expr()?;
        if !self.eat(Token::Comma) {
            self.expect(Token::RParen, "`)` or `,`")?;
            return Ok(first);
        }

        let mut items = vec![first];
        if self.eat(Token::RParen) {
            return Ok(Expr::Tuple(items));
        }
        loop {
            items.push(self.expr()?);
            if !self.eat(Token::Comma) {
                break;
            }
        }
        self.expect(Token::RParen, "`,` or `)`")?;
        Ok(Expr::Tuple(items))
    }

    /// After `#`: an integer field number, then a name or a parenthesized
    /// operand.
    fn tuple_index(&mut self) -> ParseResult<Expr> {
        let field = match self.peek() {
            Some(Token::Integer(n)) => n,
            _ => return Err(self.unexpected("a tuple field number")),
        };
        self.pos += 1;
        let target = match self.peek() {
            Some(Token::Identifier(name)) => {
                self.pos += 1;
                Expr::Var(symbol(name))
            }
            Some(Token::LParen) => {
                self.pos += 1;
                self.parenthesized()?
            }
            _ => return Err(self.unexpected("a tuple or a name after the field number")),
        };
        Ok(Expr::TupleIndex {
            field,
            target: Box::new(target),
        })
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::lexer::lex;

    fn program(text: &str) -> ParseResult<Program> {
        parse(&lex(text).unwrap())
    }

    /// Parses `text` as the right-hand side of a single assignment.
    fn expr(text: &str) -> Expr {
        let source = format!("{{ x = {text}; }}");
        let mut program = program(&source).unwrap();
        match program.main.0.remove(0) {
            Stmt::Assign { value, .. } => value,
            other => panic!("expected an assignment, got {other:?}"),
        }
    }

    fn var(name: &str) -> Expr {
        Expr::Var(symbol(name))
    }

    fn int(n: i64) -> Box<Expr> {
        Box::new(Expr::Integer(n))
    }

    fn binary(op: BinOp, left: Expr, right: Expr) -> Expr {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    #[test]
    fn products_bind_tighter_than_sums() {
        assert_eq!(
            expr("1 + 2 * 3 - 4"),
            binary(
                BinOp::Sub,
                binary(BinOp::Add, Expr::Integer(1), binary(BinOp::Mul, Expr::Integer(2), Expr::Integer(3))),
                Expr::Integer(4),
            )
        );
    }

    #[test]
    fn exponentiation_is_right_associative() {
        assert_eq!(
            expr("2 ** 3 ** 2"),
            binary(BinOp::Pow, Expr::Integer(2), binary(BinOp::Pow, Expr::Integer(3), Expr::Integer(2)))
        );
    }

    #[test]
    fn unary_minus_sits_between_products_and_powers() {
        assert_eq!(
            expr("-2 ** 2"),
            Expr::Negate(Box::new(binary(BinOp::Pow, Expr::Integer(2), Expr::Integer(2))))
        );
        assert_eq!(
            expr("-2 * 3"),
            binary(BinOp::Mul, Expr::Negate(int(2)), Expr::Integer(3))
        );
        assert_eq!(
            expr("2 ** -1"),
            binary(BinOp::Pow, Expr::Integer(2), Expr::Negate(int(1)))
        );
    }

    #[test]
    fn cons_is_right_associative() {
        assert_eq!(
            expr("1 :: 2 :: xs"),
            Expr::Cons {
                head: int(1),
                tail: Box::new(Expr::Cons {
                    head: int(2),
                    tail: Box::new(var("xs")),
                }),
            }
        );
    }

    #[test]
    fn not_covers_a_comparison_but_not_a_conjunction() {
        assert_eq!(
            expr("not a == b andalso c"),
            Expr::AndAlso(
                Box::new(Expr::Not(Box::new(Expr::Compare {
                    op: CompareOp::Eq,
                    left: Box::new(var("a")),
                    right: Box::new(var("b")),
                }))),
                Box::new(var("c")),
            )
        );
    }

    #[test]
    fn orelse_is_weaker_than_andalso() {
        assert_eq!(
            expr("a orelse b andalso c"),
            Expr::OrElse(
                Box::new(var("a")),
                Box::new(Expr::AndAlso(Box::new(var("b")), Box::new(var("c")))),
            )
        );
    }

    #[test]
    fn membership_binds_tighter_than_cons() {
        assert_eq!(
            expr("x :: a in b"),
            Expr::Cons {
                head: Box::new(var("x")),
                tail: Box::new(Expr::Member {
                    item: Box::new(var("a")),
                    container: Box::new(var("b")),
                }),
            }
        );
    }

    #[test]
    fn comma_decides_between_grouping_and_tuple() {
        assert_eq!(expr("(1)"), Expr::Integer(1));
        assert_eq!(expr("(1,)"), Expr::Tuple(vec![Expr::Integer(1)]));
        assert_eq!(
            expr("(1, 2, 3)"),
            Expr::Tuple(vec![Expr::Integer(1), Expr::Integer(2), Expr::Integer(3)])
        );
        assert!(program("{ x = (1, 2,); }").is_err());
        assert!(program("{ x = (); }").is_err());
    }

    #[test]
    fn brackets_collapse_into_one_index_chain() {
        assert_eq!(
            expr("a[0][i + 1]"),
            Expr::Index {
                target: Box::new(var("a")),
                indices: vec![
                    Expr::Integer(0),
                    binary(BinOp::Add, var("i"), Expr::Integer(1)),
                ],
            }
        );
        assert_eq!(
            expr("-[1, 2][0]"),
            Expr::Negate(Box::new(Expr::Index {
                target: Box::new(Expr::List(vec![Expr::Integer(1), Expr::Integer(2)])),
                indices: vec![Expr::Integer(0)],
            }))
        );
    }

    #[test]
    fn tuple_index_takes_a_literal_field() {
        assert_eq!(
            expr("#2 (1, 2)"),
            Expr::TupleIndex {
                field: 2,
                target: Box::new(Expr::Tuple(vec![Expr::Integer(1), Expr::Integer(2)])),
            }
        );
        assert_eq!(
            expr("#1 t[0]"),
            Expr::Index {
                target: Box::new(Expr::TupleIndex {
                    field: 1,
                    target: Box::new(var("t")),
                }),
                indices: vec![Expr::Integer(0)],
            }
        );
        assert!(program("{ x = #n t; }").is_err());
    }

    #[test]
    fn statements_starting_with_a_name() {
        let program = program("{ f(1, 2); a[1][2] = 3; b = 4; c; }").unwrap();
        assert_eq!(
            program.main.0,
            vec![
                Stmt::Call(Call {
                    name: symbol("f"),
                    args: vec![Expr::Integer(1), Expr::Integer(2)],
                }),
                Stmt::IndexAssign {
                    name: symbol("a"),
                    indices: vec![Expr::Integer(1), Expr::Integer(2)],
                    value: Expr::Integer(3),
                },
                Stmt::Assign {
                    name: symbol("b"),
                    value: Expr::Integer(4),
                },
                Stmt::Assign {
                    name: symbol("c"),
                    value: var("c"),
                },
            ]
        );
    }

    #[test]
    fn functions_are_hoisted_ahead_of_the_block() {
        let program = program("fun add(a, b) = { c = a + b; } c; fun zero() = {} 0; { print(add(1, 2)); }")
            .unwrap();
        assert_eq!(program.functions.len(), 2);
        assert_eq!(program.functions[0].params, vec![symbol("a"), symbol("b")]);
        assert_eq!(program.functions[0].ret, var("c"));
        assert!(program.functions[1].params.is_empty());
        assert_eq!(program.main.0.len(), 1);
    }

    #[test]
    fn if_else_and_while() {
        let program = program("{ if (a) { } else { b = 1; } while (c) { } if (d) { } }").unwrap();
        assert!(matches!(program.main.0[0], Stmt::IfElse { .. }));
        assert!(matches!(program.main.0[1], Stmt::While { .. }));
        assert!(matches!(program.main.0[2], Stmt::If(_)));
    }

    #[test]
    fn incomplete_programs_are_rejected() {
        assert_eq!(
            program("").unwrap_err(),
            SyntaxError::UnexpectedEnd { expected: "`{`" }
        );
        assert!(program("{ x = 1; } y = 2;").is_err());
        assert!(program("{ x = 1 }").is_err());
        assert!(program("{ print 1; }").is_err());
        assert!(program("fun f() = { } 1 { }").is_err());
        assert!(program("{ [1, 2,]; }").is_err());
        assert!(program("{ 1 + 2; }").is_err());
    }
}
