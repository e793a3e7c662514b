//! Statement execution and expression evaluation

use super::operators::{binary, compare, unary};
use super::{Flow, Interpreter, STACK_GROWTH, STACK_RED_ZONE, TARGET};
use crate::compiler::lexer::token_kind::EbsTokenKind;
use crate::compiler::parser::expr::{Binary, ChainComparison, Expr, ExprKind, Literal};
use crate::compiler::parser::stmt::{
    AssignStmt, DoWhileStmt, ForStmt, ForeachStmt, LoopKind, Stmt, StmtKind, TryStmt,
    VarDeclStmt, WhileStmt,
};
use crate::runtime::array::ArrayValue;
use crate::runtime::coerce::{cast, coerce};
use crate::runtime::environment::{Binding, EnvRef, Environment};
use crate::runtime::error::{RuntimeError, RuntimeResult};
use crate::runtime::json::{json_to_value, value_to_json};
use crate::runtime::types::TypeDesc;
use crate::runtime::value::Value;
use tracing::debug;

/// What a loop does with its body's [`Flow`]
enum LoopStep {
    Next,
    Exit,
    Propagate(Flow),
}

fn loop_step(flow: Flow, kind: LoopKind) -> LoopStep {
    match flow {
        Flow::Normal | Flow::Continue => LoopStep::Next,
        Flow::Break(None) => LoopStep::Exit,
        Flow::Break(Some(target)) if target == kind => LoopStep::Exit,
        other => LoopStep::Propagate(other),
    }
}

fn literal_value(literal: &Literal) -> Value {
    match literal {
        Literal::Null => Value::Null,
        Literal::Bool(b) => Value::Bool(*b),
        Literal::Int(n) => Value::Int(*n),
        Literal::Long(n) => Value::Long(*n),
        Literal::Float(n) => Value::Float(*n),
        Literal::Double(n) => Value::Double(*n),
        Literal::String(s) => Value::Str(s.clone()),
        Literal::Date(d) => Value::Date(*d),
    }
}

/// Snapshot of what `foreach` walks over
fn iteration_items(value: &Value) -> RuntimeResult<Vec<Value>> {
    match value {
        Value::Null => Err(RuntimeError::null_error("Cannot iterate over null")),
        Value::Array(array) => Ok(array.borrow().items.clone()),
        // front to back, without removing anything
        Value::Queue(queue) => Ok(queue.borrow().items.iter().cloned().collect()),
        Value::Json(doc) => {
            let doc = doc.borrow();
            match &*doc {
                serde_json::Value::Array(items) => Ok(items.iter().map(json_to_value).collect()),
                serde_json::Value::Object(object) => {
                    Ok(object.keys().map(|k| Value::str(k.as_str())).collect())
                }
                _ => Err(RuntimeError::type_error("Cannot iterate over a json scalar")),
            }
        }
        Value::Map(map) => Ok(map.borrow().keys().map(|k| Value::str(k.as_str())).collect()),
        Value::Str(s) => Ok(s.chars().map(|c| Value::Str(c.to_string())).collect()),
        other => Err(RuntimeError::type_error(format!(
            "Cannot iterate over {}",
            other.type_name()
        ))),
    }
}

impl Interpreter {
    pub(super) fn exec_statements(&mut self, stmts: &[Stmt]) -> RuntimeResult<Flow> {
        for stmt in stmts {
            match self.execute(stmt)? {
                Flow::Normal => {}
                other => return Ok(other),
            }
        }
        Ok(Flow::Normal)
    }

    /// Run `stmts` with `scope` as the innermost scope
    fn exec_in_scope(&mut self, stmts: &[Stmt], scope: EnvRef) -> RuntimeResult<Flow> {
        let previous = std::mem::replace(&mut self.env, scope);
        let result = self.exec_statements(stmts);
        self.env = previous;
        result
    }

    fn child_scope(&self) -> EnvRef {
        Environment::with_parent(&self.env)
    }

    pub(super) fn execute(&mut self, stmt: &Stmt) -> RuntimeResult<Flow> {
        self.execute_kind(&stmt.kind)
            .map_err(|e| e.at_line(stmt.line))
    }

    fn execute_kind(&mut self, kind: &StmtKind) -> RuntimeResult<Flow> {
        match kind {
            StmtKind::Expr(stmt) => {
                self.evaluate(&stmt.expression)?;
                Ok(Flow::Normal)
            }
            StmtKind::Block(block) => {
                let scope = self.child_scope();
                self.exec_in_scope(&block.statements, scope)
            }
            StmtKind::VarDecl(decl) => self.exec_var_decl(decl),
            StmtKind::Assign(assign) => self.exec_assign(assign),
            StmtKind::Print(print) => {
                let value = self.evaluate(&print.expression)?;
                self.output.write_line(&value.to_string());
                Ok(Flow::Normal)
            }
            StmtKind::If(stmt) => {
                if self.condition(&stmt.condition)? {
                    self.execute(&stmt.then_branch)
                } else if let Some(else_branch) = &stmt.else_branch {
                    self.execute(else_branch)
                } else {
                    Ok(Flow::Normal)
                }
            }
            StmtKind::While(stmt) => self.exec_while(stmt),
            StmtKind::DoWhile(stmt) => self.exec_do_while(stmt),
            StmtKind::For(stmt) => {
                let scope = self.child_scope();
                let previous = std::mem::replace(&mut self.env, scope);
                let result = self.exec_for(stmt);
                self.env = previous;
                result
            }
            StmtKind::Foreach(stmt) => self.exec_foreach(stmt),
            StmtKind::Break(stmt) => Ok(Flow::Break(stmt.target)),
            StmtKind::Continue => Ok(Flow::Continue),
            StmtKind::Return(stmt) => {
                let value = match &stmt.value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Null,
                };
                Ok(Flow::Return(value))
            }
            StmtKind::Try(stmt) => self.exec_try(stmt),
            StmtKind::Raise(stmt) => {
                let message = match &stmt.message {
                    Some(expr) => self.evaluate(expr)?.to_string(),
                    None => format!("{} raised with no message", stmt.kind),
                };
                Err(RuntimeError::new(stmt.kind, message))
            }
        }
    }

    fn exec_var_decl(&mut self, decl: &VarDeclStmt) -> RuntimeResult<Flow> {
        let declared_type = match &decl.declared_type {
            Some(ty) => Some(self.resolve_type(ty)?),
            None => None,
        };
        let value = match (&decl.initializer, &declared_type) {
            (Some(init), Some(ty)) => {
                let value = self.evaluate(init)?;
                coerce(value, ty)?
            }
            (Some(init), None) => self.evaluate(init)?,
            (None, Some(ty)) => ty.default_value(),
            (None, None) => Value::Null,
        };
        self.env.borrow_mut().define(
            &decl.name,
            Binding {
                value,
                declared_type,
                constant: decl.constant,
            },
        );
        Ok(Flow::Normal)
    }

    fn exec_assign(&mut self, assign: &AssignStmt) -> RuntimeResult<Flow> {
        let rhs = self.evaluate(&assign.value)?;
        if !assign.target.path.is_empty() {
            self.assign_path(&assign.target, assign.op, rhs)?;
            return Ok(Flow::Normal);
        }

        let value = match assign.op {
            Some(op) => {
                let current = self.env.borrow().get(&assign.target.name)?;
                binary(op, current, rhs)?
            }
            None => rhs,
        };
        self.env.borrow_mut().assign(&assign.target.name, value)?;
        Ok(Flow::Normal)
    }

    fn exec_while(&mut self, stmt: &WhileStmt) -> RuntimeResult<Flow> {
        let mut guard = self.loop_guard();
        while self.condition(&stmt.condition)? {
            guard.tick()?;
            match loop_step(self.execute(&stmt.body)?, LoopKind::While) {
                LoopStep::Next => {}
                LoopStep::Exit => break,
                LoopStep::Propagate(flow) => return Ok(flow),
            }
        }
        Ok(Flow::Normal)
    }

    fn exec_do_while(&mut self, stmt: &DoWhileStmt) -> RuntimeResult<Flow> {
        let mut guard = self.loop_guard();
        loop {
            guard.tick()?;
            match loop_step(self.execute(&stmt.body)?, LoopKind::Do) {
                LoopStep::Next => {}
                LoopStep::Exit => break,
                LoopStep::Propagate(flow) => return Ok(flow),
            }
            if !self.condition(&stmt.condition)? {
                break;
            }
        }
        Ok(Flow::Normal)
    }

    /// Runs inside the scope holding the loop header's variables
    fn exec_for(&mut self, stmt: &ForStmt) -> RuntimeResult<Flow> {
        if let Some(init) = &stmt.init {
            self.execute(init)?;
        }
        let mut guard = self.loop_guard();
        loop {
            if let Some(condition) = &stmt.condition {
                if !self.condition(condition)? {
                    break;
                }
            }
            guard.tick()?;
            match loop_step(self.execute(&stmt.body)?, LoopKind::For) {
                LoopStep::Next => {}
                LoopStep::Exit => break,
                LoopStep::Propagate(flow) => return Ok(flow),
            }
            if let Some(step) = &stmt.step {
                self.execute(step)?;
            }
        }
        Ok(Flow::Normal)
    }

    fn exec_foreach(&mut self, stmt: &ForeachStmt) -> RuntimeResult<Flow> {
        let iterable = self.evaluate(&stmt.iterable)?;
        let items = iteration_items(&iterable)?;
        let mut guard = self.loop_guard();

        for item in items {
            guard.tick()?;
            let scope = self.child_scope();
            scope.borrow_mut().define_value(&stmt.variable, item);
            let previous = std::mem::replace(&mut self.env, scope);
            let result = self.execute(&stmt.body);
            self.env = previous;

            match loop_step(result?, LoopKind::Foreach) {
                LoopStep::Next => {}
                LoopStep::Exit => break,
                LoopStep::Propagate(flow) => return Ok(flow),
            }
        }
        Ok(Flow::Normal)
    }

    /// Only `Err` reaches the handlers; `Flow` signals pass straight through
    fn exec_try(&mut self, stmt: &TryStmt) -> RuntimeResult<Flow> {
        let scope = self.child_scope();
        let error = match self.exec_in_scope(&stmt.body, scope) {
            Ok(flow) => return Ok(flow),
            Err(error) => error,
        };

        let Some(handler) = stmt.handlers.iter().find(|h| h.kind.handles(error.kind)) else {
            return Err(error);
        };
        debug!(target: TARGET, kind = %error.kind, handler = %handler.kind, "Exception handled");

        let scope = self.child_scope();
        if let Some(variable) = &handler.variable {
            scope
                .borrow_mut()
                .define_value(variable, Value::Str(error.message));
        }
        self.exec_in_scope(&handler.body, scope)
    }

    /// Conditions must be bools
    pub(super) fn condition(&mut self, expr: &Expr) -> RuntimeResult<bool> {
        let value = self.evaluate(expr)?;
        value.as_bool().ok_or_else(|| {
            RuntimeError::type_error(format!(
                "Condition must be a bool, got {}",
                value.type_name()
            ))
        })
    }

    pub fn evaluate(&mut self, expr: &Expr) -> RuntimeResult<Value> {
        stacker::maybe_grow(STACK_RED_ZONE, STACK_GROWTH, || self.evaluate_expr(expr))
    }

    fn evaluate_expr(&mut self, expr: &Expr) -> RuntimeResult<Value> {
        match &**expr {
            ExprKind::Literal(literal) => Ok(literal_value(literal)),
            ExprKind::VarRef(var) => self.lookup(&var.name),
            ExprKind::Binary(bin) => match bin.op {
                EbsTokenKind::And | EbsTokenKind::Or => self.logical(bin),
                op => {
                    let left = self.evaluate(&bin.left)?;
                    let right = self.evaluate(&bin.right)?;
                    binary(op, left, right)
                }
            },
            ExprKind::ChainComparison(chain) => self.chain_comparison(chain),
            ExprKind::Unary(un) => {
                let operand = self.evaluate(&un.operand)?;
                unary(un.op, operand)
            }
            ExprKind::Grouping(group) => self.evaluate(&group.expression),
            ExprKind::FunctionCall(call) => self.call(call),
            ExprKind::MemberAccess(access) => self.member_access(access),
            ExprKind::IndexAccess(access) => self.index_access(access),
            ExprKind::ArrayLiteral(array) => {
                let items = array
                    .elements
                    .iter()
                    .map(|e| self.evaluate(e))
                    .collect::<RuntimeResult<Vec<_>>>()?;
                Ok(Value::array(ArrayValue::from_values(TypeDesc::Any, items)))
            }
            ExprKind::JsonLiteral(object) => {
                let mut map = serde_json::Map::new();
                for (key, expr) in &object.entries {
                    let value = self.evaluate(expr)?;
                    map.insert(key.clone(), value_to_json(&value)?);
                }
                Ok(Value::json(serde_json::Value::Object(map)))
            }
            ExprKind::Cast(c) => {
                let target = self.resolve_type(&c.target)?;
                let value = self.evaluate(&c.value)?;
                cast(value, &target)
            }
        }
    }

    /// Variable, or failing that a function reference
    fn lookup(&self, name: &str) -> RuntimeResult<Value> {
        let found = self.env.borrow().get(name);
        match found {
            Ok(value) => Ok(value),
            Err(_) if self.functions.contains(name) => Ok(Value::Function(name.to_string())),
            Err(e) => Err(e),
        }
    }

    fn logical(&mut self, bin: &Binary) -> RuntimeResult<Value> {
        let left = self.logical_operand(&bin.left, bin.op)?;
        let decided = match bin.op {
            EbsTokenKind::And => !left,
            _ => left,
        };
        if decided {
            return Ok(Value::Bool(left));
        }
        Ok(Value::Bool(self.logical_operand(&bin.right, bin.op)?))
    }

    fn logical_operand(&mut self, expr: &Expr, op: EbsTokenKind) -> RuntimeResult<bool> {
        let value = self.evaluate(expr)?;
        value.as_bool().ok_or_else(|| {
            let text = if op == EbsTokenKind::And { "&&" } else { "||" };
            RuntimeError::type_error(format!(
                "Operator '{text}' expects bools, got {}",
                value.type_name()
            ))
        })
    }

    /// `a < b <= c` evaluates each operand once and stops at the first false
    fn chain_comparison(&mut self, chain: &ChainComparison) -> RuntimeResult<Value> {
        let mut operands = chain.operands.iter();
        let Some(first) = operands.next() else {
            return Ok(Value::Bool(true));
        };
        let mut left = self.evaluate(first)?;
        for (op, expr) in chain.ops.iter().zip(operands) {
            let right = self.evaluate(expr)?;
            if !compare(*op, &left, &right)? {
                return Ok(Value::Bool(false));
            }
            left = right;
        }
        Ok(Value::Bool(true))
    }
}
