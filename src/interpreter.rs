use std::collections::HashMap;
use std::io::Write;

use crate::ast::{Block, Call, Expr, Function, If, Program, Stmt, Symbol};
use crate::builtin;
use crate::config::Config;
use crate::error::{Error, SemanticError};
use crate::stack::ensure_sufficient_stack;
use crate::value::Value;

type EvalResult<T = Value> = Result<T, Error>;

pub type Frame = HashMap<Symbol, Value>;

/// Variable scopes. Only two frames are ever visible: the innermost active
/// call's frame and the global one. Callers further up the chain are hidden.
#[derive(Debug, Default)]
pub struct Scopes {
    global: Frame,
    calls: Vec<Frame>,
}

impl Scopes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of function calls currently active.
    pub fn depth(&self) -> usize {
        self.calls.len()
    }

    pub fn global(&self) -> &Frame {
        &self.global
    }

    pub fn current(&self) -> &Frame {
        self.calls.last().unwrap_or(&self.global)
    }

    fn current_mut(&mut self) -> &mut Frame {
        match self.calls.last_mut() {
            Some(frame) => frame,
            None => &mut self.global,
        }
    }

    pub fn lookup(&self, name: Symbol) -> Option<&Value> {
        self.current().get(&name).or_else(|| self.global.get(&name))
    }

    /// Updates `name` where it already lives (current frame first, then
    /// global), otherwise creates it in the current frame.
    pub fn assign(&mut self, name: Symbol, value: Value) {
        if let Some(slot) = self.current_mut().get_mut(&name) {
            *slot = value;
            return;
        }
        if let Some(slot) = self.global.get_mut(&name) {
            *slot = value;
            return;
        }
        self.current_mut().insert(name, value);
    }

    fn push(&mut self, frame: Frame) {
        self.calls.push(frame);
    }

    fn pop(&mut self) {
        self.calls.pop();
    }
}

/// Everything a running program can touch: its function table, its scopes
/// and the sink `print` writes to.
pub struct State<'a, W: Write> {
    functions: HashMap<Symbol, &'a Function>,
    scopes: Scopes,
    config: &'a Config,
    out: W,
}

pub fn interpret<W: Write>(program: &Program, config: &Config, out: W) -> EvalResult<()> {
    let mut state = State::new(config, out);
    state.run(program)
}

impl<'a, W: Write> State<'a, W> {
    pub fn new(config: &'a Config, out: W) -> Self {
        Self {
            functions: HashMap::new(),
            scopes: Scopes::new(),
            config,
            out,
        }
    }

    pub fn scopes(&self) -> &Scopes {
        &self.scopes
    }

    /// Registers every function, then runs the top-level block once.
    pub fn run(&mut self, program: &'a Program) -> EvalResult<()> {
        for function in &program.functions {
            self.define(function);
        }
        self.exec_block(&program.main)
    }

    fn define(&mut self, function: &'a Function) {
        if self.functions.insert(function.name, function).is_some() {
            tracing::debug!(name = function.name.as_str(), "function redefined");
        }
    }

    fn lookup(&self, name: Symbol) -> EvalResult {
        self.scopes
            .lookup(name)
            .cloned()
            .ok_or_else(|| SemanticError::UnknownVariable(name.as_str().to_owned()).into())
    }

    fn exec_block(&mut self, block: &Block) -> EvalResult<()> {
        for stmt in &block.0 {
            self.exec_stmt(stmt)?;
        }
        Ok(())
    }

    fn exec_stmt(&mut self, stmt: &Stmt) -> EvalResult<()> {
        ensure_sufficient_stack(|| match stmt {
            Stmt::Print(expr) => {
                let value = self.evaluate_expr(expr)?;
                writeln!(self.out, "{value}")?;
                Ok(())
            }
            Stmt::Assign { name, value } => {
                let value = self.evaluate_expr(value)?;
                self.scopes.assign(*name, value);
                Ok(())
            }
            Stmt::IndexAssign {
                name,
                indices,
                value,
            } => {
                let indices = self.evaluate_all(indices)?;
                let value = self.evaluate_expr(value)?;
                let target = self.lookup(*name)?;
                builtin::assign_index(&target, &indices, value)?;
                Ok(())
            }
            Stmt::Block(block) => self.exec_block(block),
            Stmt::If(branch) => self.exec_if(branch).map(|_| ()),
            Stmt::IfElse { branch, otherwise } => {
                if !self.exec_if(branch)? {
                    self.exec_block(otherwise)?;
                }
                Ok(())
            }
            Stmt::While { cond, body } => {
                while self.condition(cond)? {
                    self.exec_block(body)?;
                }
                Ok(())
            }
            Stmt::Call(call) => self.call_function(call).map(|_| ()),
        })
    }

    /// Runs the branch when its condition holds; reports whether it did.
    fn exec_if(&mut self, branch: &If) -> EvalResult<bool> {
        let taken = self.condition(&branch.cond)?;
        if taken {
            self.exec_block(&branch.then)?;
        }
        Ok(taken)
    }

    fn condition(&mut self, cond: &Expr) -> EvalResult<bool> {
        match self.evaluate_expr(cond)? {
            Value::Bool(b) => Ok(b),
            other => Err(SemanticError::NonBooleanCondition(other.type_name()).into()),
        }
    }

    fn evaluate_all(&mut self, exprs: &[Expr]) -> EvalResult<Vec<Value>> {
        exprs.iter().map(|e| self.evaluate_expr(e)).collect()
    }

    pub fn evaluate_expr(&mut self, expr: &Expr) -> EvalResult {
        ensure_sufficient_stack(|| self.evaluate_inner(expr))
    }

    fn evaluate_inner(&mut self, expr: &Expr) -> EvalResult {
        let value = match expr {
            Expr::Bool(b) => Value::Bool(*b),
            Expr::Integer(n) => Value::Integer(*n),
            Expr::Real(n) => Value::Real(*n),
            Expr::Str(s) => Value::str(s.as_str()),
            Expr::List(items) => Value::list(self.evaluate_all(items)?),
            Expr::Tuple(items) => Value::tuple(self.evaluate_all(items)?),
            Expr::Var(name) => self.lookup(*name)?,
            Expr::Not(operand) => builtin::not(self.evaluate_expr(operand)?)?,
            Expr::Negate(operand) => builtin::negate(self.evaluate_expr(operand)?)?,
            Expr::AndAlso(left, right) => {
                let left = self.evaluate_expr(left)?;
                builtin::and_also(left, self.evaluate_expr(right)?)?
            }
            Expr::OrElse(left, right) => {
                let left = self.evaluate_expr(left)?;
                builtin::or_else(left, self.evaluate_expr(right)?)?
            }
            Expr::Compare { op, left, right } => {
                let left = self.evaluate_expr(left)?;
                builtin::compare(*op, &left, &self.evaluate_expr(right)?)?
            }
            Expr::Binary { op, left, right } => {
                let left = self.evaluate_expr(left)?;
                builtin::binary(*op, left, self.evaluate_expr(right)?)?
            }
            Expr::Member { item, container } => {
                let item = self.evaluate_expr(item)?;
                builtin::member(&item, &self.evaluate_expr(container)?)?
            }
            Expr::Cons { head, tail } => {
                let head = self.evaluate_expr(head)?;
                builtin::cons(head, &self.evaluate_expr(tail)?)?
            }
            Expr::Index { target, indices } => {
                let target = self.evaluate_expr(target)?;
                builtin::index(target, &self.evaluate_all(indices)?)?
            }
            Expr::TupleIndex { field, target } => {
                builtin::tuple_field(&self.evaluate_expr(target)?, *field)?
            }
            Expr::Call(call) => self.call_function(call)?,
        };
        Ok(value)
    }

    /// Arguments are evaluated in the caller's scope before the callee's
    /// frame is pushed. The frame is popped again whether or not the body
    /// succeeds.
    #[tracing::instrument(level = "debug", skip_all, fields(name = call.name.as_str()))]
    fn call_function(&mut self, call: &Call) -> EvalResult {
        let function: &'a Function = *self
            .functions
            .get(&call.name)
            .ok_or_else(|| SemanticError::UnknownFunction(call.name.as_str().to_owned()))?;

        if function.params.len() != call.args.len() {
            return Err(SemanticError::ArityMismatch {
                name: call.name.as_str().to_owned(),
                expected: function.params.len(),
                found: call.args.len(),
            }
            .into());
        }
        if self.scopes.depth() >= self.config.max_call_depth {
            return Err(SemanticError::CallDepthExceeded(self.config.max_call_depth).into());
        }

        let args = self.evaluate_all(&call.args)?;
        let frame: Frame = function.params.iter().copied().zip(args).collect();

        self.scopes.push(frame);
        let result = self
            .exec_block(&function.body)
            .and_then(|()| self.evaluate_expr(&function.ret));
        self.scopes.pop();
        result
    }
}
