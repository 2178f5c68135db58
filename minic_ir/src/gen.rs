//! IR generation
//!
//! Walks the canonicalized AST and emits the flat row sequence. One
//! generation-local state record carries the label and temporary
//! counters, a map of declared names to their kinds (names are unique
//! per function after shadow renaming), and the callable signatures.

use crate::ir::*;
use hashbrown::HashMap;
use minic_parser::{
    is_built_in, Assignment, BinaryOp, CompoundStatement, Declaration, Expression,
    FunctionDefinition, FunctionType, Literal, Program, Statement, Type, UnaryOp,
};

/// Generate the IR for a canonicalized program (built-ins still
/// injected). The built-in stubs themselves emit no rows; their
/// signatures only type the `CALL` rows.
pub fn generate_ir(program: &Program) -> Ir {
    let mut gen = IrGenerator::new(program);
    for function in &program.functions {
        if is_built_in(&function.ident.name) {
            continue;
        }
        gen.function_definition(function);
    }
    let mut ir = Ir { rows: gen.rows };
    ir.number_rows();
    log::debug!("generated {} IR rows", ir.len());
    ir
}

fn kind_of(ty: Type) -> IrTypeKind {
    match ty {
        Type::Int => IrTypeKind::Int,
        Type::Float => IrTypeKind::Float,
        Type::Bool => IrTypeKind::Bool,
        Type::String => IrTypeKind::String,
    }
}

fn kind_of_function(ty: FunctionType) -> IrTypeKind {
    match ty {
        FunctionType::Int => IrTypeKind::Int,
        FunctionType::Float => IrTypeKind::Float,
        FunctionType::Bool => IrTypeKind::Bool,
        FunctionType::String => IrTypeKind::String,
        FunctionType::Void => IrTypeKind::Typeless,
    }
}

struct IrGenerator {
    rows: Vec<IrRow>,
    label_counter: u32,
    tmp_counter: u32,
    /// Return kinds of every callable, including built-ins.
    functions: HashMap<String, IrTypeKind>,
    /// Declared names of the current function: kind and array size.
    vars: HashMap<String, (IrTypeKind, i64)>,
}

impl IrGenerator {
    fn new(program: &Program) -> Self {
        let functions = program
            .functions
            .iter()
            .map(|f| (f.ident.name.clone(), kind_of_function(f.return_type)))
            .collect();
        Self {
            rows: Vec::new(),
            label_counter: 0,
            tmp_counter: 0,
            functions,
            vars: HashMap::new(),
        }
    }

    fn append(
        &mut self,
        instr: IrInstr,
        arg1: Option<IrArg>,
        arg2: Option<IrArg>,
        ty: IrRowType,
    ) -> RowRef {
        self.rows.push(IrRow { row_no: 0, instr, arg1, arg2, ty });
        RowRef(self.rows.len() - 1)
    }

    fn fresh_label(&mut self) -> u32 {
        let label = self.label_counter;
        self.label_counter += 1;
        label
    }

    fn fresh_tmp(&mut self, kind: IrTypeKind) -> String {
        let name = format!("$tmp{}", self.tmp_counter);
        self.tmp_counter += 1;
        self.vars.insert(name.clone(), (kind, -1));
        name
    }

    fn last_instr(&self) -> Option<IrInstr> {
        self.rows.last().map(|row| row.instr)
    }

    /// The row type an operand stands for (element type for array
    /// elements, return type for callables).
    fn arg_row_type(&self, arg: &IrArg) -> IrRowType {
        match arg {
            IrArg::LitInt(_) => IrRowType::scalar(IrTypeKind::Int),
            IrArg::LitFloat(_) => IrRowType::scalar(IrTypeKind::Float),
            IrArg::LitBool(_) => IrRowType::scalar(IrTypeKind::Bool),
            IrArg::LitString(_) => IrRowType::scalar(IrTypeKind::String),
            IrArg::Row(r) => self.rows[r.0].ty,
            IrArg::Label(_) => IrRowType::typeless(),
            IrArg::Ident(name) | IrArg::ArrayElem { ident: name, .. } => self
                .vars
                .get(name.as_str())
                .map(|&(kind, _)| IrRowType::scalar(kind))
                .or_else(|| self.functions.get(name.as_str()).map(|&k| IrRowType::scalar(k)))
                .unwrap_or_else(IrRowType::typeless),
            IrArg::FuncLabel(name) => self
                .functions
                .get(name.as_str())
                .map(|&k| IrRowType::scalar(k))
                .unwrap_or_else(IrRowType::typeless),
        }
    }

    // ------------------------------------------------------- Functions

    fn function_definition(&mut self, function: &FunctionDefinition) {
        self.vars.clear();
        self.append(
            IrInstr::FuncLabel,
            Some(IrArg::FuncLabel(function.ident.name.clone())),
            None,
            IrRowType::typeless(),
        );

        // Pop the incoming arguments and bind them to the parameters.
        for parameter in &function.parameters {
            let name = parameter.ident().name.clone();
            let kind = kind_of(parameter.ty());
            let size = parameter.array_size();
            self.vars.insert(name.clone(), (kind, size));
            let ty = IrRowType::new(kind, size);
            let pop = self.append(IrInstr::Pop, None, None, ty);
            self.append(IrInstr::Assign, Some(IrArg::Ident(name)), Some(IrArg::Row(pop)), ty);
        }

        self.compound_statement(&function.body);
    }

    // ------------------------------------------------------ Statements

    fn compound_statement(&mut self, compound: &CompoundStatement) {
        for statement in &compound.statements {
            self.statement(statement);
        }
    }

    fn statement(&mut self, statement: &Statement) {
        match statement {
            Statement::Expression(expression) => {
                self.expression(expression);
            }
            Statement::Compound(compound) => self.compound_statement(compound),
            Statement::Assignment(assignment) => self.assignment(assignment),
            Statement::Declaration(declaration) => self.declaration(declaration),
            Statement::If { condition, on_true, .. } => self.if_statement(condition, on_true),
            Statement::IfElse { condition, on_true, on_false, .. } => {
                self.if_else_statement(condition, on_true, on_false)
            }
            Statement::While { condition, body, .. } => self.while_statement(condition, body),
            Statement::Return { value, .. } => self.return_statement(value.as_ref()),
        }
    }

    /// Scalar int/bool/string declarations emit nothing; storage is
    /// implicit at the first assignment. Floats are zero-initialized so
    /// every float value is referable by name, arrays declare storage.
    fn declaration(&mut self, declaration: &Declaration) {
        match declaration {
            Declaration::Variable { ty: Type::Float, ident, .. } => {
                self.vars.insert(ident.name.clone(), (IrTypeKind::Float, -1));
                self.append(
                    IrInstr::Assign,
                    Some(IrArg::Ident(ident.name.clone())),
                    Some(IrArg::LitFloat(0.0)),
                    IrRowType::scalar(IrTypeKind::Float),
                );
            }
            Declaration::Variable { ty, ident, .. } => {
                self.vars.insert(ident.name.clone(), (kind_of(*ty), -1));
            }
            Declaration::Array { ty, size, ident, .. } => {
                let kind = kind_of(*ty);
                self.vars.insert(ident.name.clone(), (kind, *size));
                self.append(
                    IrInstr::Array,
                    Some(IrArg::Ident(ident.name.clone())),
                    Some(IrArg::LitInt(*size)),
                    IrRowType::new(kind, *size),
                );
            }
        }
    }

    fn assignment(&mut self, assignment: &Assignment) {
        // A float-literal right-hand side becomes the argument directly;
        // lowering it as an expression would materialize a redundant
        // temporary.
        let value_arg = |gen: &mut Self, value: &Expression| match value {
            Expression::Literal { literal: Literal::Float(v), .. } => IrArg::LitFloat(*v),
            other => gen.expression(other),
        };
        match assignment {
            Assignment::Variable { ident, value, .. } => {
                let ty = IrRowType::scalar(self.var_kind(&ident.name));
                let target = IrArg::Ident(ident.name.clone());
                let value = value_arg(self, value);
                self.append(IrInstr::Assign, Some(target), Some(value), ty);
            }
            Assignment::Array { ident, index, value, .. } => {
                let ty = IrRowType::scalar(self.var_kind(&ident.name));
                let index = self.expression(index);
                let target = self.array_element_arg(&ident.name, index);
                let value = value_arg(self, value);
                self.append(IrInstr::Assign, Some(target), Some(value), ty);
            }
        }
    }

    fn var_kind(&self, name: &str) -> IrTypeKind {
        self.vars.get(name).map_or(IrTypeKind::Typeless, |&(kind, _)| kind)
    }

    fn if_statement(&mut self, condition: &Expression, on_true: &Statement) {
        let condition = self.expression(condition);
        let label = self.fresh_label();
        self.append(
            IrInstr::Jumpfalse,
            Some(condition),
            Some(IrArg::Label(label)),
            IrRowType::typeless(),
        );
        self.statement(on_true);
        self.append(IrInstr::Label, Some(IrArg::Label(label)), None, IrRowType::typeless());
    }

    fn if_else_statement(&mut self, condition: &Expression, on_true: &Statement, on_false: &Statement) {
        let condition = self.expression(condition);
        let l1 = self.fresh_label();
        self.append(
            IrInstr::Jumpfalse,
            Some(condition),
            Some(IrArg::Label(l1)),
            IrRowType::typeless(),
        );

        self.statement(on_true);

        // The label counter advances for L2 even when both branches end
        // in a return and the label is never emitted.
        let l2 = self.fresh_label();
        let true_branch_returns = self.last_instr() == Some(IrInstr::Return);
        if !true_branch_returns {
            self.append(IrInstr::Jump, Some(IrArg::Label(l2)), None, IrRowType::typeless());
        }

        self.append(IrInstr::Label, Some(IrArg::Label(l1)), None, IrRowType::typeless());
        self.statement(on_false);

        let false_branch_returns = self.last_instr() == Some(IrInstr::Return);
        if !(true_branch_returns && false_branch_returns) {
            self.append(IrInstr::Label, Some(IrArg::Label(l2)), None, IrRowType::typeless());
        }
    }

    fn while_statement(&mut self, condition: &Expression, body: &Statement) {
        let l0 = self.fresh_label();
        self.append(IrInstr::Label, Some(IrArg::Label(l0)), None, IrRowType::typeless());

        let condition = self.expression(condition);
        let l1 = self.fresh_label();
        self.append(
            IrInstr::Jumpfalse,
            Some(condition),
            Some(IrArg::Label(l1)),
            IrRowType::typeless(),
        );

        self.statement(body);

        self.append(IrInstr::Jump, Some(IrArg::Label(l0)), None, IrRowType::typeless());
        self.append(IrInstr::Label, Some(IrArg::Label(l1)), None, IrRowType::typeless());
    }

    fn return_statement(&mut self, value: Option<&Expression>) {
        // Code after an emitted return in the same lowering is dead.
        if self.last_instr() == Some(IrInstr::Return) {
            return;
        }
        match value {
            Some(value) => {
                let arg = self.expression(value);
                let ty = self.arg_row_type(&arg);
                self.append(IrInstr::Return, Some(arg), None, ty);
            }
            None => {
                self.append(IrInstr::Return, None, None, IrRowType::typeless());
            }
        }
    }

    // ----------------------------------------------------- Expressions

    fn expression(&mut self, expression: &Expression) -> IrArg {
        match expression {
            Expression::Literal { literal, .. } => self.literal(literal),
            Expression::BinaryOp { op, lhs, rhs, .. } => self.binary_op(*op, lhs, rhs),
            Expression::Parenthesized { expression, .. } => self.expression(expression),
            Expression::UnaryOp { op, child, .. } => self.unary_op(*op, child),
            Expression::Variable { ident, .. } => IrArg::Ident(ident.name.clone()),
            Expression::ArrayElement { ident, index, .. } => {
                let index = self.expression(index);
                self.array_element_arg(&ident.name, index)
            }
            Expression::FunctionCall { ident, arguments, .. } => {
                self.function_call(&ident.name, arguments)
            }
        }
    }

    /// Int, bool and string literals pass through as arguments; float
    /// literals materialize through a named temporary so the x87
    /// lowering can refer to them by storage.
    fn literal(&mut self, literal: &Literal) -> IrArg {
        match literal {
            Literal::Int(v) => IrArg::LitInt(*v),
            Literal::Bool(v) => IrArg::LitBool(*v),
            Literal::Str(v) => IrArg::LitString(v.clone()),
            Literal::Float(v) => {
                let tmp = self.fresh_tmp(IrTypeKind::Float);
                self.append(
                    IrInstr::Assign,
                    Some(IrArg::Ident(tmp.clone())),
                    Some(IrArg::LitFloat(*v)),
                    IrRowType::scalar(IrTypeKind::Float),
                );
                IrArg::Ident(tmp)
            }
        }
    }

    fn binary_op(&mut self, op: BinaryOp, lhs: &Expression, rhs: &Expression) -> IrArg {
        let lhs = self.expression(lhs);
        let rhs = self.expression(rhs);
        let (instr, ty) = match op {
            BinaryOp::Add => (IrInstr::Plus, self.arg_row_type(&lhs)),
            BinaryOp::Sub => (IrInstr::Minus, self.arg_row_type(&lhs)),
            BinaryOp::Mul => (IrInstr::Multiply, self.arg_row_type(&lhs)),
            BinaryOp::Div => (IrInstr::Divide, self.arg_row_type(&lhs)),
            BinaryOp::Smaller => (IrInstr::Smaller, IrRowType::scalar(IrTypeKind::Bool)),
            BinaryOp::Greater => (IrInstr::Greater, IrRowType::scalar(IrTypeKind::Bool)),
            BinaryOp::SmallerEq => (IrInstr::SmallerEq, IrRowType::scalar(IrTypeKind::Bool)),
            BinaryOp::GreaterEq => (IrInstr::GreaterEq, IrRowType::scalar(IrTypeKind::Bool)),
            BinaryOp::Conj => (IrInstr::And, IrRowType::scalar(IrTypeKind::Bool)),
            BinaryOp::Disj => (IrInstr::Or, IrRowType::scalar(IrTypeKind::Bool)),
            BinaryOp::Equal => (IrInstr::Equals, IrRowType::scalar(IrTypeKind::Bool)),
            BinaryOp::NotEqual => (IrInstr::NotEquals, IrRowType::scalar(IrTypeKind::Bool)),
        };
        let row = self.append(instr, Some(lhs), Some(rhs), ty);
        IrArg::Row(row)
    }

    fn unary_op(&mut self, op: UnaryOp, child: &Expression) -> IrArg {
        let child = self.expression(child);
        let (instr, ty) = match op {
            UnaryOp::Minus => (IrInstr::Neg, self.arg_row_type(&child)),
            UnaryOp::Not => (IrInstr::Not, IrRowType::scalar(IrTypeKind::Bool)),
        };
        let row = self.append(instr, Some(child), None, ty);
        IrArg::Row(row)
    }

    /// An index that is itself an array element materializes through an
    /// int temporary first; nested element addressing stays one level
    /// deep for the emitter.
    fn array_element_arg(&mut self, name: &str, index: IrArg) -> IrArg {
        let index = if matches!(index, IrArg::ArrayElem { .. }) {
            let tmp = self.fresh_tmp(IrTypeKind::Int);
            self.append(
                IrInstr::Assign,
                Some(IrArg::Ident(tmp.clone())),
                Some(index),
                IrRowType::scalar(IrTypeKind::Int),
            );
            IrArg::Ident(tmp)
        } else {
            index
        };
        IrArg::ArrayElem { ident: name.to_string(), index: Box::new(index) }
    }

    fn function_call(&mut self, name: &str, arguments: &[Expression]) -> IrArg {
        self.arguments(arguments);
        let ty = IrRowType::scalar(
            self.functions.get(name).copied().unwrap_or(IrTypeKind::Typeless),
        );
        let row = self.append(IrInstr::Call, Some(IrArg::Ident(name.to_string())), None, ty);
        IrArg::Row(row)
    }

    /// Evaluate the argument expressions in source order, then emit the
    /// pushes in reverse order while unwinding, so all pushes form a
    /// contiguous block and the first argument is pushed last.
    fn arguments(&mut self, arguments: &[Expression]) {
        let Some((first, rest)) = arguments.split_first() else {
            return;
        };
        // String literals materialize through a temporary; pushing the
        // literal directly would interleave its setup with the pushes.
        let (arg, ty) = if let Expression::Literal { literal: Literal::Str(value), .. } = first {
            let tmp = self.fresh_tmp(IrTypeKind::String);
            let ty = IrRowType::scalar(IrTypeKind::String);
            self.append(
                IrInstr::Assign,
                Some(IrArg::Ident(tmp.clone())),
                Some(IrArg::LitString(value.clone())),
                ty,
            );
            (IrArg::Ident(tmp), ty)
        } else {
            let arg = self.expression(first);
            let ty = self.arg_row_type(&arg);
            (arg, ty)
        };
        self.arguments(rest);
        self.append(IrInstr::Push, Some(arg), None, ty);
    }
}
