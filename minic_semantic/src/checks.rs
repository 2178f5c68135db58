//! The semantic check bank
//!
//! Independent checks over the canonicalized AST and the symbol table,
//! run in a fixed order; the first failing check short-circuits the bank
//! and its diagnostic (`file:line:col: message`) is the verdict of the
//! whole analysis. Later checks presuppose earlier ones, e.g. the type
//! conversion check resolves names that the undeclared-variable check
//! has already validated.

use crate::symbol_table::{RowStructure, RowType, StatementScope, SymbolTable};
use minic_common::{MinicError, MinicResult, SourceLocation};
use minic_parser::{
    is_built_in, compound_ends_in_return, Assignment, BinaryOp, Declaration, Expression,
    FunctionDefinition, FunctionType, Literal, Program, Statement, Type, UnaryOp, BUILT_INS,
};
use std::fmt;

/// Run the whole bank. Expects built-ins to be injected already.
pub fn run_all(program: &Program, table: &SymbolTable, contexts: &[StatementScope]) -> MinicResult<()> {
    let entries = flatten(program, contexts);
    run_nonvoid_check(program)?;
    run_main_function(program)?;
    run_unknown_function_call(&entries, table)?;
    run_multiple_function_definitions(program)?;
    run_multiple_variable_declarations(table)?;
    run_use_undeclared_variable(&entries, table)?;
    run_define_built_in(program)?;
    run_type_conversion(&entries, table)?;
    run_function_arguments(&entries, program, table)?;
    run_function_return_value(&entries, table)?;
    log::debug!("all semantic checks passed");
    Ok(())
}

fn error_at(loc: &SourceLocation, message: impl fmt::Display) -> MinicError {
    MinicError::semantic(format!("{}: {}", loc, message))
}

// ----------------------------------------------------- Statement walk

/// A statement paired with its enclosing function and its resolution
/// context, in the pre-order the symbol table builder used.
pub struct StatementEntry<'a> {
    pub function: &'a FunctionDefinition,
    pub statement: &'a Statement,
    pub ctx: StatementScope,
}

fn flatten<'a>(program: &'a Program, contexts: &[StatementScope]) -> Vec<StatementEntry<'a>> {
    let mut entries = Vec::with_capacity(contexts.len());
    let mut next = 0usize;
    for function in &program.functions {
        for statement in &function.body.statements {
            flatten_statement(function, statement, contexts, &mut next, &mut entries);
        }
    }
    debug_assert_eq!(entries.len(), contexts.len(), "statement walk out of step with symbol table");
    entries
}

fn flatten_statement<'a>(
    function: &'a FunctionDefinition,
    statement: &'a Statement,
    contexts: &[StatementScope],
    next: &mut usize,
    entries: &mut Vec<StatementEntry<'a>>,
) {
    entries.push(StatementEntry { function, statement, ctx: contexts[*next] });
    *next += 1;
    match statement {
        Statement::If { on_true, .. } => {
            flatten_statement(function, on_true, contexts, next, entries)
        }
        Statement::IfElse { on_true, on_false, .. } => {
            flatten_statement(function, on_true, contexts, next, entries);
            flatten_statement(function, on_false, contexts, next, entries);
        }
        Statement::While { body, .. } => flatten_statement(function, body, contexts, next, entries),
        Statement::Compound(compound) => {
            for inner in &compound.statements {
                flatten_statement(function, inner, contexts, next, entries);
            }
        }
        _ => {}
    }
}

/// Visit, pre-order, every expression the statement itself contains.
/// Nested statements have their own entries and are not descended into.
fn for_each_expression<'a>(
    statement: &'a Statement,
    f: &mut impl FnMut(&'a Expression) -> MinicResult<()>,
) -> MinicResult<()> {
    let mut visit_expr = |expression: &'a Expression| visit_expression(expression, f);
    match statement {
        Statement::If { condition, .. }
        | Statement::IfElse { condition, .. }
        | Statement::While { condition, .. } => visit_expr(condition),
        Statement::Expression(expression) => visit_expr(expression),
        Statement::Assignment(Assignment::Variable { value, .. }) => visit_expr(value),
        Statement::Assignment(Assignment::Array { index, value, .. }) => {
            visit_expr(index)?;
            visit_expr(value)
        }
        Statement::Return { value: Some(value), .. } => visit_expr(value),
        _ => Ok(()),
    }
}

fn visit_expression<'a>(
    expression: &'a Expression,
    f: &mut impl FnMut(&'a Expression) -> MinicResult<()>,
) -> MinicResult<()> {
    f(expression)?;
    match expression {
        Expression::BinaryOp { lhs, rhs, .. } => {
            visit_expression(lhs, f)?;
            visit_expression(rhs, f)
        }
        Expression::Parenthesized { expression, .. } => visit_expression(expression, f),
        Expression::UnaryOp { child, .. } => visit_expression(child, f),
        Expression::ArrayElement { index, .. } => visit_expression(index, f),
        Expression::FunctionCall { arguments, .. } => {
            for argument in arguments {
                visit_expression(argument, f)?;
            }
            Ok(())
        }
        Expression::Literal { .. } | Expression::Variable { .. } => Ok(()),
    }
}

// ------------------------------------------------------- Typing of uses

/// The type an expression evaluates to, as far as the checks care
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExprType {
    Int,
    Float,
    Bool,
    String,
    Void,
    Unknown,
}

impl fmt::Display for ExprType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExprType::Int => write!(f, "INT"),
            ExprType::Float => write!(f, "FLOAT"),
            ExprType::Bool => write!(f, "BOOL"),
            ExprType::String => write!(f, "STRING"),
            ExprType::Void => write!(f, "VOID"),
            ExprType::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

impl From<RowType> for ExprType {
    fn from(ty: RowType) -> Self {
        match ty {
            RowType::Int => ExprType::Int,
            RowType::Float => ExprType::Float,
            RowType::Bool => ExprType::Bool,
            RowType::String => ExprType::String,
            RowType::Void => ExprType::Void,
            RowType::Pseudo => ExprType::Unknown,
        }
    }
}

impl From<Type> for ExprType {
    fn from(ty: Type) -> Self {
        match ty {
            Type::Int => ExprType::Int,
            Type::Float => ExprType::Float,
            Type::Bool => ExprType::Bool,
            Type::String => ExprType::String,
        }
    }
}

impl From<FunctionType> for ExprType {
    fn from(ty: FunctionType) -> Self {
        match ty {
            FunctionType::Int => ExprType::Int,
            FunctionType::Float => ExprType::Float,
            FunctionType::Bool => ExprType::Bool,
            FunctionType::String => ExprType::String,
            FunctionType::Void => ExprType::Void,
        }
    }
}

/// Recursively derive the type of an expression; `Unknown` for anything
/// that does not resolve or whose subexpressions do not agree.
pub fn get_type(expression: &Expression, table: &SymbolTable, ctx: StatementScope) -> ExprType {
    match expression {
        Expression::Literal { literal, .. } => match literal {
            Literal::Int(_) => ExprType::Int,
            Literal::Float(_) => ExprType::Float,
            Literal::Bool(_) => ExprType::Bool,
            Literal::Str(_) => ExprType::String,
        },
        Expression::BinaryOp { op, lhs, rhs, .. } => {
            let type_lhs = get_type(lhs, table, ctx);
            let type_rhs = get_type(rhs, table, ctx);
            if type_lhs != type_rhs && type_lhs != ExprType::Unknown {
                return ExprType::Unknown;
            }
            if op.produces_bool() {
                ExprType::Bool
            } else {
                type_lhs
            }
        }
        Expression::Parenthesized { expression, .. } => get_type(expression, table, ctx),
        Expression::UnaryOp { child, .. } => get_type(child, table, ctx),
        Expression::Variable { ident, .. } | Expression::ArrayElement { ident, .. } => table
            .lookup(&ident.name, ctx)
            .map_or(ExprType::Unknown, |row| ExprType::from(table.row(row).row_type)),
        Expression::FunctionCall { ident, .. } => table
            .check_for_function_declaration(&ident.name)
            .map_or(ExprType::Unknown, |row| ExprType::from(table.row(row).row_type)),
    }
}

fn is_string_operand(expression: &Expression, table: &SymbolTable, ctx: StatementScope) -> bool {
    get_type(expression, table, ctx) == ExprType::String
}

/// Whether the expression names an entire array rather than an element.
fn is_whole_array(expression: &Expression, table: &SymbolTable, ctx: StatementScope) -> bool {
    if let Expression::Variable { ident, .. } = expression {
        if let Some(row) = table.lookup(&ident.name, ctx) {
            return table.row(row).structure == RowStructure::Array;
        }
    }
    false
}

// --------------------------------------------- 1: Non-void return paths

/// Every execution path of a non-void function must end in a return.
pub fn run_nonvoid_check(program: &Program) -> MinicResult<()> {
    for function in &program.functions {
        if function.return_type != FunctionType::Void && !compound_ends_in_return(&function.body) {
            return Err(error_at(
                &function.loc,
                format!("control reaches end of non-void function '{}'.", function.ident.name),
            ));
        }
    }
    Ok(())
}

// ------------------------------------------------------ 2: Main present

/// Exactly one `int main()` without parameters must exist.
pub fn run_main_function(program: &Program) -> MinicResult<()> {
    let mut mains = 0;
    for function in &program.functions {
        if function.ident.name != "main" {
            continue;
        }
        mains += 1;
        if mains > 1 {
            return Err(error_at(&function.loc, "Too many main functions defined."));
        }
        if !function.parameters.is_empty() || function.return_type != FunctionType::Int {
            return Err(error_at(&function.loc, "Main has wrong signature. Must be `int main()`"));
        }
    }
    if mains == 0 {
        return Err(error_at(&program.loc, "No main function defined."));
    }
    Ok(())
}

// ------------------------------------------- 3: Unknown function calls

/// Every call identifier must resolve in the top scope; built-ins have
/// been injected by now.
pub fn run_unknown_function_call(entries: &[StatementEntry], table: &SymbolTable) -> MinicResult<()> {
    for entry in entries {
        for_each_expression(entry.statement, &mut |expression| {
            if let Expression::FunctionCall { ident, .. } = expression {
                if table.check_for_function_declaration(&ident.name).is_none() {
                    return Err(error_at(
                        expression.loc(),
                        format!("function '{}' undeclared (first use in this function).", ident.name),
                    ));
                }
            }
            Ok(())
        })?;
    }
    Ok(())
}

// ----------------------------------- 4: Duplicate function definitions

/// No two top-level functions share a name. Collisions with built-in
/// names are left to the dedicated check further down the bank.
pub fn run_multiple_function_definitions(program: &Program) -> MinicResult<()> {
    for (i, function) in program.functions.iter().enumerate() {
        if is_built_in(&function.ident.name) {
            continue;
        }
        for other in &program.functions[i + 1..] {
            if function.ident.name == other.ident.name {
                return Err(error_at(
                    &other.loc,
                    format!("redefinition of '{}'", other.ident.name),
                ));
            }
        }
    }
    Ok(())
}

// --------------------------------- 5: Duplicate variable declarations

/// Within one scope all row names are unique; shadowing in descendant
/// scopes is fine and was renamed away during canonicalization.
pub fn run_multiple_variable_declarations(table: &SymbolTable) -> MinicResult<()> {
    for scope_id in table.scope_ids() {
        if scope_id == table.top_scope() {
            continue;
        }
        let rows = &table.scope(scope_id).rows;
        for (i, &row_id) in rows.iter().enumerate() {
            let row = table.row(row_id);
            if row.structure == RowStructure::Pseudo {
                continue;
            }
            for &other_id in &rows[i + 1..] {
                let other = table.row(other_id);
                if other.structure != RowStructure::Pseudo && row.name == other.name {
                    return Err(error_at(&other.loc, format!("redefinition of '{}'", other.name)));
                }
            }
        }
    }
    Ok(())
}

// ------------------------------------------ 6: Undeclared variable use

/// Every variable or array reference and every assignment target must
/// resolve via upward lookup from its location.
pub fn run_use_undeclared_variable(entries: &[StatementEntry], table: &SymbolTable) -> MinicResult<()> {
    let undeclared = |name: &str, loc: &SourceLocation| {
        error_at(loc, format!("'{}' undeclared (first use in this function).", name))
    };
    for entry in entries {
        if let Statement::Assignment(assignment) = entry.statement {
            let ident = assignment.ident();
            if table.lookup(&ident.name, entry.ctx).is_none() {
                return Err(undeclared(&ident.name, assignment.loc()));
            }
        }
        for_each_expression(entry.statement, &mut |expression| match expression {
            Expression::Variable { ident, loc } | Expression::ArrayElement { ident, loc, .. } => {
                if table.lookup(&ident.name, entry.ctx).is_none() {
                    return Err(undeclared(&ident.name, loc));
                }
                Ok(())
            }
            _ => Ok(()),
        })?;
    }
    Ok(())
}

// ------------------------------------------- 7: Built-in name shadowing

/// No user-defined function may carry a built-in's name. The injected
/// stubs themselves sit at the end of the list, so a name that occurs
/// more than once was also written by the user.
pub fn run_define_built_in(program: &Program) -> MinicResult<()> {
    for name in BUILT_INS {
        let mut definitions = program.functions.iter().filter(|f| f.ident.name == name);
        let first = definitions.next();
        if definitions.next().is_some() {
            let first = first.expect("filter returned a second item without a first");
            return Err(error_at(
                &first.loc,
                format!(
                    "Multiple definitions of function `{name}` found. `{name}` is reserved for the built_in function."
                ),
            ));
        }
    }
    Ok(())
}

// ------------------------------------------------- 8: Type conversion

/// No implicit type conversions anywhere: operands of binary and unary
/// operations, conditions, assignments and array indices must have the
/// exact expected types.
pub fn run_type_conversion(entries: &[StatementEntry], table: &SymbolTable) -> MinicResult<()> {
    for entry in entries {
        let ctx = entry.ctx;
        // Innermost expressions first, then the statement-level rules.
        for_each_expression_types(entry.statement, table, ctx)?;
        match entry.statement {
            Statement::If { condition, .. } | Statement::IfElse { condition, .. } => {
                if get_type(condition, table, ctx) != ExprType::Bool {
                    return Err(error_at(
                        condition.loc(),
                        "condition of if statement expected to be of type 'BOOL'.",
                    ));
                }
            }
            Statement::While { condition, .. } => {
                if get_type(condition, table, ctx) != ExprType::Bool {
                    return Err(error_at(
                        condition.loc(),
                        "condition of while loop expected to be of type 'BOOL'.",
                    ));
                }
            }
            Statement::Assignment(assignment) => {
                check_assignment_types(assignment, table, ctx)?;
            }
            _ => {}
        }
    }
    Ok(())
}

fn for_each_expression_types(
    statement: &Statement,
    table: &SymbolTable,
    ctx: StatementScope,
) -> MinicResult<()> {
    match statement {
        Statement::If { condition, .. }
        | Statement::IfElse { condition, .. }
        | Statement::While { condition, .. } => check_expression_types(condition, table, ctx),
        Statement::Expression(expression) => check_expression_types(expression, table, ctx),
        Statement::Assignment(Assignment::Variable { value, .. }) => {
            check_expression_types(value, table, ctx)
        }
        Statement::Assignment(Assignment::Array { index, value, .. }) => {
            check_expression_types(index, table, ctx)?;
            check_expression_types(value, table, ctx)
        }
        Statement::Return { value: Some(value), .. } => check_expression_types(value, table, ctx),
        _ => Ok(()),
    }
}

/// Post-order type validation of one expression tree.
fn check_expression_types(
    expression: &Expression,
    table: &SymbolTable,
    ctx: StatementScope,
) -> MinicResult<()> {
    match expression {
        Expression::BinaryOp { op, lhs, rhs, loc } => {
            check_expression_types(lhs, table, ctx)?;
            check_expression_types(rhs, table, ctx)?;

            // Strings and whole arrays never appear as operands.
            if is_string_operand(lhs, table, ctx)
                || is_string_operand(rhs, table, ctx)
                || is_whole_array(lhs, table, ctx)
                || is_whole_array(rhs, table, ctx)
            {
                return Err(error_at(loc, "invalid operands to binary operation."));
            }

            let type_lhs = get_type(lhs, table, ctx);
            let type_rhs = get_type(rhs, table, ctx);
            let same = type_lhs == type_rhs && type_lhs != ExprType::Unknown;
            let bools = type_lhs == ExprType::Bool && type_rhs == ExprType::Bool;
            let permitted = match op {
                BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div => same && !bools,
                BinaryOp::Smaller
                | BinaryOp::Greater
                | BinaryOp::SmallerEq
                | BinaryOp::GreaterEq => same && !bools,
                BinaryOp::Conj | BinaryOp::Disj => bools,
                BinaryOp::Equal | BinaryOp::NotEqual => same,
            };
            if !permitted {
                if matches!(op, BinaryOp::Conj | BinaryOp::Disj) {
                    return Err(error_at(
                        loc,
                        "using non-boolean variable or expression with logical connective.",
                    ));
                }
                return Err(error_at(loc, "type conversion not possible."));
            }
            Ok(())
        }
        Expression::UnaryOp { op, child, loc } => {
            check_expression_types(child, table, ctx)?;
            if is_string_operand(child, table, ctx) || is_whole_array(child, table, ctx) {
                return Err(error_at(loc, "invalid operand to unary operation."));
            }
            let child_is_bool = get_type(child, table, ctx) == ExprType::Bool;
            match op {
                UnaryOp::Minus if child_is_bool => Err(error_at(loc, "type conversion not possible.")),
                UnaryOp::Not if !child_is_bool => Err(error_at(
                    loc,
                    "using non-boolean variable or expression with logical connective.",
                )),
                _ => Ok(()),
            }
        }
        Expression::ArrayElement { index, loc, .. } => {
            check_expression_types(index, table, ctx)?;
            let index_type = get_type(index, table, ctx);
            if index_type != ExprType::Int {
                return Err(error_at(
                    loc,
                    format!("array index of type '{}', expected to be 'INT'.", index_type),
                ));
            }
            Ok(())
        }
        Expression::Parenthesized { expression, .. } => check_expression_types(expression, table, ctx),
        Expression::FunctionCall { arguments, .. } => {
            for argument in arguments {
                check_expression_types(argument, table, ctx)?;
            }
            Ok(())
        }
        Expression::Literal { .. } | Expression::Variable { .. } => Ok(()),
    }
}

fn check_assignment_types(
    assignment: &Assignment,
    table: &SymbolTable,
    ctx: StatementScope,
) -> MinicResult<()> {
    match assignment {
        Assignment::Variable { ident, .. } => {
            if let Some(row) = table.lookup(&ident.name, ctx) {
                if table.row(row).structure == RowStructure::Array {
                    return Err(error_at(
                        assignment.loc(),
                        format!("assignment to variable '{}' of array type not possible.", ident.name),
                    ));
                }
            }
        }
        Assignment::Array { index, .. } => {
            let index_type = get_type(index, table, ctx);
            if index_type != ExprType::Int {
                return Err(error_at(
                    index.loc(),
                    format!("array index of type '{}', expected to be 'INT'.", index_type),
                ));
            }
        }
    }

    let declared = table
        .lookup(&assignment.ident().name, ctx)
        .map(|row| ExprType::from(table.row(row).row_type));
    let value_type = get_type(assignment.value(), table, ctx);
    let permitted = matches!(declared, Some(ty) if ty == value_type && ty != ExprType::Unknown);
    if !permitted {
        let target = match assignment {
            Assignment::Variable { .. } => "variable",
            Assignment::Array { .. } => "array",
        };
        return Err(error_at(
            assignment.loc(),
            format!("implicit type conversion of {} '{}'.", target, assignment.ident().name),
        ));
    }
    Ok(())
}

// ------------------------------------------------ 9: Function call shape

/// Arity and per-position shape of every call: scalars demand scalars of
/// the matching type, arrays demand arrays of matching element type and
/// declared size.
pub fn run_function_arguments(
    entries: &[StatementEntry],
    program: &Program,
    table: &SymbolTable,
) -> MinicResult<()> {
    for entry in entries {
        for_each_expression(entry.statement, &mut |expression| {
            if let Expression::FunctionCall { ident, arguments, loc } = expression {
                check_call(ident.name.as_str(), arguments, loc, program, table, entry.ctx)?;
            }
            Ok(())
        })?;
    }
    Ok(())
}

fn call_error(loc: &SourceLocation, callee: &str, detail: impl fmt::Display) -> MinicError {
    error_at(loc, format!("{}, Invalid function call, {}", callee, detail))
}

fn check_call(
    callee: &str,
    arguments: &[Expression],
    loc: &SourceLocation,
    program: &Program,
    table: &SymbolTable,
    ctx: StatementScope,
) -> MinicResult<()> {
    let Some(function) = program.function(callee) else {
        return Err(call_error(loc, callee, "Function unknown, no definition found."));
    };

    let mut remaining = arguments.iter();
    for parameter in &function.parameters {
        let Some(argument) = remaining.next() else {
            return Err(call_error(loc, callee, "Too few arguments provided."));
        };
        let argument_array = argument_array_row(argument, table, ctx);
        match parameter {
            Declaration::Array { ty, size, .. } => {
                let Some(row) = argument_array else {
                    return Err(call_error(loc, callee, "Expected array, but variable was given."));
                };
                let given_size = table.row(row).array_size;
                if given_size != *size {
                    return Err(call_error(
                        loc,
                        callee,
                        format!("Expected array of size {}, but size {} was given", size, given_size),
                    ));
                }
                let given = get_type(argument, table, ctx);
                if given != ExprType::from(*ty) {
                    return Err(call_error(
                        loc,
                        callee,
                        format!(
                            "Expected array of type {}, but {} was given",
                            ExprType::from(*ty),
                            given
                        ),
                    ));
                }
            }
            Declaration::Variable { ty, .. } => {
                if argument_array.is_some() {
                    return Err(call_error(loc, callee, "Expected variable, but array was given."));
                }
                let given = get_type(argument, table, ctx);
                if given != ExprType::from(*ty) {
                    return Err(call_error(
                        loc,
                        callee,
                        format!(
                            "Expected variable of type {}, but {} was given",
                            ExprType::from(*ty),
                            given
                        ),
                    ));
                }
            }
        }
    }
    if remaining.next().is_some() {
        return Err(call_error(loc, callee, "Too many arguments."));
    }
    Ok(())
}

/// The declaring row if the argument is a whole array (possibly in
/// parentheses).
fn argument_array_row(
    argument: &Expression,
    table: &SymbolTable,
    ctx: StatementScope,
) -> Option<crate::symbol_table::RowId> {
    let Expression::Variable { ident, .. } = argument.unparenthesized() else {
        return None;
    };
    let row = table.lookup(&ident.name, ctx)?;
    (table.row(row).structure == RowStructure::Array).then_some(row)
}

// -------------------------------------------- 10: Function return value

/// Each return value's type must equal the enclosing function's declared
/// return type; whole arrays cannot be returned.
pub fn run_function_return_value(entries: &[StatementEntry], table: &SymbolTable) -> MinicResult<()> {
    for entry in entries {
        let Statement::Return { value, loc } = entry.statement else {
            continue;
        };
        if let Some(value) = value {
            if let Expression::Variable { ident, .. } = value {
                if let Some(row) = table.lookup(&ident.name, entry.ctx) {
                    if table.row(row).structure == RowStructure::Array {
                        return Err(error_at(
                            value.loc(),
                            format!(
                                "unexpected array-type of variable '{}' in return statement.",
                                ident.name
                            ),
                        ));
                    }
                }
            }
        }
        let actual = match value {
            Some(value) => get_type(value, table, entry.ctx),
            None => ExprType::Void,
        };
        let declared = ExprType::from(entry.function.return_type);
        if actual != declared {
            return Err(error_at(
                loc,
                format!("Invalid return type, expected type {} but was {}", declared, actual),
            ));
        }
    }
    Ok(())
}
