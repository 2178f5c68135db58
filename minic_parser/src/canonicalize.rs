//! Post-parse canonicalization
//!
//! Three transformations the later stages depend on, applied in order:
//! built-in injection, shadow renaming, implicit void returns. Built-in
//! removal is the symmetric counterpart run right before IR generation.

use crate::ast::*;
use minic_common::SourceLocation;
use std::sync::Arc;

/// Names of the six I/O built-ins whose definitions the runtime provides
pub const BUILT_INS: [&str; 6] =
    ["print", "print_nl", "print_int", "print_float", "read_int", "read_float"];

pub fn is_built_in(name: &str) -> bool {
    BUILT_INS.contains(&name)
}

/// Apply all three canonicalization steps.
pub fn canonicalize(program: &mut Program) {
    inject_built_ins(program);
    rename_shadowed_variables(program);
    add_implicit_returns(program);
}

// ----------------------------------------------------------- Built-ins

/// Append stub definitions for the built-ins so that identifier
/// resolution and the call-shape check can treat them like user
/// functions. Must run before the symbol table is built.
pub fn inject_built_ins(program: &mut Program) {
    let file = Arc::clone(&program.loc.file);
    let loc = SourceLocation::synthetic(file);

    let scalar_param = |ty: Type| {
        vec![Declaration::Variable {
            ty,
            ident: Identifier::new("a", loc.clone()),
            loc: loc.clone(),
        }]
    };
    let return_stmt = |literal: Literal| Statement::Return {
        value: Some(Expression::Literal { literal, loc: loc.clone() }),
        loc: loc.clone(),
    };
    let body = |statements: Vec<Statement>| CompoundStatement { statements, loc: loc.clone() };

    let stubs = [
        (FunctionType::Void, "print", scalar_param(Type::String), body(vec![])),
        (FunctionType::Void, "print_nl", vec![], body(vec![])),
        (FunctionType::Void, "print_int", scalar_param(Type::Int), body(vec![])),
        (FunctionType::Void, "print_float", scalar_param(Type::Float), body(vec![])),
        (FunctionType::Int, "read_int", vec![], body(vec![return_stmt(Literal::Int(0))])),
        (FunctionType::Float, "read_float", vec![], body(vec![return_stmt(Literal::Float(0.0))])),
    ];

    for (return_type, name, parameters, body) in stubs {
        program.functions.push(FunctionDefinition {
            return_type,
            ident: Identifier::new(name, loc.clone()),
            parameters,
            body,
            loc: loc.clone(),
        });
    }
}

/// Splice the injected built-in stubs back out of the program list.
pub fn remove_built_ins(program: &mut Program) {
    program.functions.retain(|f| !is_built_in(&f.ident.name));
}

// ------------------------------------------------------ Shadow renaming

/// Rename declarations that shadow a name declared further up in the
/// same function, together with every use in the remainder of their
/// compound scope, to a fresh `$rN`. The downstream IR keys storage by
/// identifier string, so names must be unique per function.
pub fn rename_shadowed_variables(program: &mut Program) {
    let mut counter = 0u32;
    for function in &mut program.functions {
        // The function scope holds the parameters and the body's
        // top-level declarations.
        let mut scopes: Vec<Vec<String>> =
            vec![function.parameters.iter().map(|p| p.ident().name.clone()).collect()];
        rename_in_compound(&mut function.body, &mut scopes, &mut counter);
    }
}

fn rename_in_compound(body: &mut CompoundStatement, scopes: &mut Vec<Vec<String>>, counter: &mut u32) {
    let depth = scopes.len() - 1;
    for i in 0..body.statements.len() {
        if let Statement::Declaration(declaration) = &body.statements[i] {
            let name = declaration.ident().name.clone();
            let shadows = depth > 0 && scopes[..depth].iter().any(|s| s.iter().any(|n| *n == name));
            if shadows {
                let fresh = format!("$r{}", counter);
                *counter += 1;
                for statement in &mut body.statements[i..] {
                    rename_in_statement(statement, &name, &fresh);
                }
                scopes[depth].push(fresh);
            } else {
                scopes[depth].push(name);
            }
        } else {
            walk_statement_scopes(&mut body.statements[i], scopes, counter);
        }
    }
}

fn walk_statement_scopes(statement: &mut Statement, scopes: &mut Vec<Vec<String>>, counter: &mut u32) {
    match statement {
        Statement::Compound(compound) => {
            scopes.push(Vec::new());
            rename_in_compound(compound, scopes, counter);
            scopes.pop();
        }
        Statement::If { on_true, .. } => walk_statement_scopes(on_true, scopes, counter),
        Statement::IfElse { on_true, on_false, .. } => {
            walk_statement_scopes(on_true, scopes, counter);
            walk_statement_scopes(on_false, scopes, counter);
        }
        Statement::While { body, .. } => walk_statement_scopes(body, scopes, counter),
        // A declaration used directly as a branch body lands in the
        // enclosing scope.
        Statement::Declaration(declaration) => {
            let depth = scopes.len() - 1;
            scopes[depth].push(declaration.ident().name.clone());
        }
        Statement::Expression(_) | Statement::Assignment(_) | Statement::Return { .. } => {}
    }
}

fn rename_in_statement(statement: &mut Statement, from: &str, to: &str) {
    match statement {
        Statement::If { condition, on_true, .. } => {
            rename_in_expression(condition, from, to);
            rename_in_statement(on_true, from, to);
        }
        Statement::IfElse { condition, on_true, on_false, .. } => {
            rename_in_expression(condition, from, to);
            rename_in_statement(on_true, from, to);
            rename_in_statement(on_false, from, to);
        }
        Statement::While { condition, body, .. } => {
            rename_in_expression(condition, from, to);
            rename_in_statement(body, from, to);
        }
        Statement::Expression(expression) => rename_in_expression(expression, from, to),
        Statement::Declaration(declaration) => {
            let ident = match declaration {
                Declaration::Variable { ident, .. } | Declaration::Array { ident, .. } => ident,
            };
            rename_ident(ident, from, to);
        }
        Statement::Assignment(assignment) => match assignment {
            Assignment::Variable { ident, value, .. } => {
                rename_ident(ident, from, to);
                rename_in_expression(value, from, to);
            }
            Assignment::Array { ident, index, value, .. } => {
                rename_ident(ident, from, to);
                rename_in_expression(index, from, to);
                rename_in_expression(value, from, to);
            }
        },
        Statement::Return { value, .. } => {
            if let Some(value) = value {
                rename_in_expression(value, from, to);
            }
        }
        Statement::Compound(compound) => {
            for statement in &mut compound.statements {
                rename_in_statement(statement, from, to);
            }
        }
    }
}

fn rename_in_expression(expression: &mut Expression, from: &str, to: &str) {
    match expression {
        Expression::Literal { .. } => {}
        Expression::BinaryOp { lhs, rhs, .. } => {
            rename_in_expression(lhs, from, to);
            rename_in_expression(rhs, from, to);
        }
        Expression::Parenthesized { expression, .. } => rename_in_expression(expression, from, to),
        Expression::UnaryOp { child, .. } => rename_in_expression(child, from, to),
        Expression::Variable { ident, .. } => rename_ident(ident, from, to),
        Expression::ArrayElement { ident, index, .. } => {
            rename_ident(ident, from, to);
            rename_in_expression(index, from, to);
        }
        Expression::FunctionCall { ident, arguments, .. } => {
            rename_ident(ident, from, to);
            for argument in arguments {
                rename_in_expression(argument, from, to);
            }
        }
    }
}

fn rename_ident(ident: &mut Identifier, from: &str, to: &str) {
    if ident.name == from {
        ident.name = to.to_string();
    }
}

// ------------------------------------------------------ Implicit return

/// Append an empty `return;` to void functions whose body does not end
/// in a return on every execution path. Non-void functions without
/// returns are left for the semantic checks to diagnose.
pub fn add_implicit_returns(program: &mut Program) {
    for function in &mut program.functions {
        if function.return_type != FunctionType::Void {
            continue;
        }
        if !compound_ends_in_return(&function.body) {
            let loc = function.body.loc.clone();
            function.body.statements.push(Statement::Return { value: None, loc });
        }
    }
}

/// Whether every execution path through the statement ends in a return.
/// A bare `if` without `else` never counts; statements after a return
/// are dead and do not change the answer.
pub fn statement_ends_in_return(statement: &Statement) -> bool {
    match statement {
        Statement::Return { .. } => true,
        Statement::Compound(compound) => compound_ends_in_return(compound),
        Statement::IfElse { on_true, on_false, .. } => {
            statement_ends_in_return(on_true) && statement_ends_in_return(on_false)
        }
        _ => false,
    }
}

pub fn compound_ends_in_return(compound: &CompoundStatement) -> bool {
    compound.statements.iter().any(statement_ends_in_return)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_program;

    fn canonicalized(source: &str) -> Program {
        let mut program = parse_program(source, "test.mc").expect("program should parse");
        canonicalize(&mut program);
        program
    }

    #[test]
    fn injects_all_built_ins() {
        let program = canonicalized("int main(){return 0;}");
        assert_eq!(program.functions.len(), 7);
        for name in BUILT_INS {
            assert!(program.function(name).is_some(), "missing built-in {}", name);
        }
        assert_eq!(program.function("read_int").unwrap().return_type, FunctionType::Int);
        assert_eq!(program.function("print").unwrap().parameters.len(), 1);
    }

    #[test]
    fn removal_is_symmetric() {
        let mut program = canonicalized("int main(){return 0;}");
        remove_built_ins(&mut program);
        assert_eq!(program.functions.len(), 1);
        assert_eq!(program.functions[0].ident.name, "main");
    }

    #[test]
    fn renames_shadowing_declaration_and_uses() {
        let program = canonicalized("int main(){ int a; a = 1; {int a; a = 2;} return a;}");
        let body = &program.function("main").unwrap().body.statements;
        // Outer declaration keeps its name.
        let Statement::Declaration(Declaration::Variable { ident, .. }) = &body[0] else {
            panic!("expected declaration");
        };
        assert_eq!(ident.name, "a");
        // Inner block is fully renamed.
        let Statement::Compound(inner) = &body[2] else { panic!("expected block") };
        let Statement::Declaration(Declaration::Variable { ident, .. }) = &inner.statements[0] else {
            panic!("expected declaration");
        };
        assert_eq!(ident.name, "$r0");
        let Statement::Assignment(Assignment::Variable { ident, .. }) = &inner.statements[1] else {
            panic!("expected assignment");
        };
        assert_eq!(ident.name, "$r0");
        // The trailing return still refers to the outer variable.
        let Statement::Return { value: Some(Expression::Variable { ident, .. }), .. } = &body[3]
        else {
            panic!("expected return of variable");
        };
        assert_eq!(ident.name, "a");
    }

    #[test]
    fn renames_parameter_shadowing() {
        let program = canonicalized("int f(int a){ {int a; a = 2;} return a;}");
        let body = &program.function("f").unwrap().body.statements;
        let Statement::Compound(inner) = &body[0] else { panic!("expected block") };
        let Statement::Declaration(Declaration::Variable { ident, .. }) = &inner.statements[0] else {
            panic!("expected declaration");
        };
        assert_eq!(ident.name, "$r0");
    }

    #[test]
    fn nested_shadowing_cascades() {
        let program = canonicalized("int main(){int a; {int a; {int a; a = 3;}} return a;}");
        let body = &program.function("main").unwrap().body.statements;
        let Statement::Compound(outer) = &body[1] else { panic!("expected block") };
        let Statement::Declaration(Declaration::Variable { ident, .. }) = &outer.statements[0] else {
            panic!("expected declaration");
        };
        assert_eq!(ident.name, "$r0");
        let Statement::Compound(inner) = &outer.statements[1] else { panic!("expected block") };
        let Statement::Declaration(Declaration::Variable { ident, .. }) = &inner.statements[0] else {
            panic!("expected declaration");
        };
        assert_eq!(ident.name, "$r1");
        let Statement::Assignment(Assignment::Variable { ident, .. }) = &inner.statements[1] else {
            panic!("expected assignment");
        };
        assert_eq!(ident.name, "$r1");
    }

    #[test]
    fn void_function_gets_implicit_return() {
        let program = canonicalized("void f(){ int a; a = 1; } int main(){return 0;}");
        let body = &program.function("f").unwrap().body.statements;
        assert!(matches!(body.last(), Some(Statement::Return { value: None, .. })));
    }

    #[test]
    fn void_function_with_return_is_untouched() {
        let program = canonicalized("void f(){ return; } int main(){return 0;}");
        let body = &program.function("f").unwrap().body.statements;
        assert_eq!(body.len(), 1);
    }

    #[test]
    fn nonvoid_function_gets_no_implicit_return() {
        let program = canonicalized("int f(){ int a; a = 1; } int main(){return 0;}");
        let body = &program.function("f").unwrap().body.statements;
        assert!(!matches!(body.last(), Some(Statement::Return { .. })));
    }

    #[test]
    fn return_inside_if_else_counts_on_both_paths() {
        let program =
            canonicalized("void f(){ if (true) { return; } else { return; } } int main(){return 0;}");
        let body = &program.function("f").unwrap().body.statements;
        assert_eq!(body.len(), 1, "no implicit return should be appended");
    }
}
