//! DOT output of the AST

use crate::ast::*;
use std::fmt::Write;

/// Render the whole program as a DOT digraph. Node ids are assigned in
/// traversal order, so equal inputs produce byte-identical output.
pub fn ast_to_dot(program: &Program) -> String {
    let mut printer = DotPrinter::new();
    let root = printer.node("program");
    for function in &program.functions {
        let child = printer.function_definition(function);
        printer.edge(root, child, "");
    }
    printer.finish()
}

/// Render a single function's subtree, or `None` if it does not exist.
pub fn function_to_dot(program: &Program, name: &str) -> Option<String> {
    let function = program.function(name)?;
    let mut printer = DotPrinter::new();
    printer.function_definition(function);
    Some(printer.finish())
}

struct DotPrinter {
    out: String,
    next_id: usize,
}

impl DotPrinter {
    fn new() -> Self {
        let mut out = String::new();
        out.push_str("digraph \"AST\" {\n\tnodesep=0.6\n");
        Self { out, next_id: 0 }
    }

    fn finish(mut self) -> String {
        self.out.push_str("}\n");
        self.out
    }

    fn node(&mut self, label: &str) -> usize {
        let id = self.next_id;
        self.next_id += 1;
        writeln!(self.out, "\t\"n{}\" [shape=box, label=\"{}\"];", id, escape(label)).unwrap();
        id
    }

    fn edge(&mut self, from: usize, to: usize, label: &str) {
        if label.is_empty() {
            writeln!(self.out, "\t\"n{}\" -> \"n{}\";", from, to).unwrap();
        } else {
            writeln!(self.out, "\t\"n{}\" -> \"n{}\" [label=\"{}\"];", from, to, escape(label))
                .unwrap();
        }
    }

    fn function_definition(&mut self, function: &FunctionDefinition) -> usize {
        let id = self.node(&format!("func_def: {} {}", function.return_type, function.ident));
        for parameter in &function.parameters {
            let child = self.declaration(parameter);
            self.edge(id, child, "param");
        }
        let body = self.compound_statement(&function.body);
        self.edge(id, body, "body");
        id
    }

    fn declaration(&mut self, declaration: &Declaration) -> usize {
        match declaration {
            Declaration::Variable { ty, ident, .. } => self.node(&format!("decl: {} {}", ty, ident)),
            Declaration::Array { ty, size, ident, .. } => {
                self.node(&format!("decl: {}[{}] {}", ty, size, ident))
            }
        }
    }

    fn compound_statement(&mut self, compound: &CompoundStatement) -> usize {
        let id = self.node("{ }");
        for statement in &compound.statements {
            let child = self.statement(statement);
            self.edge(id, child, "");
        }
        id
    }

    fn statement(&mut self, statement: &Statement) -> usize {
        match statement {
            Statement::If { condition, on_true, .. } => {
                let id = self.node("stmt: if");
                let cond = self.expression(condition);
                self.edge(id, cond, "cond");
                let then = self.statement(on_true);
                self.edge(id, then, "on_true");
                id
            }
            Statement::IfElse { condition, on_true, on_false, .. } => {
                let id = self.node("stmt: if/else");
                let cond = self.expression(condition);
                self.edge(id, cond, "cond");
                let then = self.statement(on_true);
                self.edge(id, then, "on_true");
                let otherwise = self.statement(on_false);
                self.edge(id, otherwise, "on_false");
                id
            }
            Statement::While { condition, body, .. } => {
                let id = self.node("stmt: while");
                let cond = self.expression(condition);
                self.edge(id, cond, "cond");
                let child = self.statement(body);
                self.edge(id, child, "body");
                id
            }
            Statement::Expression(expression) => self.expression(expression),
            Statement::Declaration(declaration) => self.declaration(declaration),
            Statement::Assignment(assignment) => self.assignment(assignment),
            Statement::Return { value, .. } => {
                let id = self.node("stmt: return");
                if let Some(value) = value {
                    let child = self.expression(value);
                    self.edge(id, child, "");
                }
                id
            }
            Statement::Compound(compound) => self.compound_statement(compound),
        }
    }

    fn assignment(&mut self, assignment: &Assignment) -> usize {
        match assignment {
            Assignment::Variable { ident, value, .. } => {
                let id = self.node(&format!("assign: {}", ident));
                let child = self.expression(value);
                self.edge(id, child, "value");
                id
            }
            Assignment::Array { ident, index, value, .. } => {
                let id = self.node(&format!("assign: {}[ ]", ident));
                let index_node = self.expression(index);
                self.edge(id, index_node, "index");
                let value_node = self.expression(value);
                self.edge(id, value_node, "value");
                id
            }
        }
    }

    fn expression(&mut self, expression: &Expression) -> usize {
        match expression {
            Expression::Literal { literal, .. } => self.node(&format!("lit: {}", literal)),
            Expression::BinaryOp { op, lhs, rhs, .. } => {
                let id = self.node(&format!("expr: {}", op));
                let lhs_node = self.expression(lhs);
                self.edge(id, lhs_node, "lhs");
                let rhs_node = self.expression(rhs);
                self.edge(id, rhs_node, "rhs");
                id
            }
            Expression::Parenthesized { expression, .. } => {
                let id = self.node("( )");
                let child = self.expression(expression);
                self.edge(id, child, "");
                id
            }
            Expression::UnaryOp { op, child, .. } => {
                let id = self.node(&format!("expr: {}", op));
                let child_node = self.expression(child);
                self.edge(id, child_node, "");
                id
            }
            Expression::Variable { ident, .. } => self.node(&format!("var: {}", ident)),
            Expression::ArrayElement { ident, index, .. } => {
                let id = self.node(&format!("arr: {}[ ]", ident));
                let child = self.expression(index);
                self.edge(id, child, "index");
                id
            }
            Expression::FunctionCall { ident, arguments, .. } => {
                let id = self.node(&format!("call: {}", ident));
                for (i, argument) in arguments.iter().enumerate() {
                    let child = self.expression(argument);
                    self.edge(id, child, &format!("arg{}", i));
                }
                id
            }
        }
    }
}

fn escape(label: &str) -> String {
    label.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_program;

    #[test]
    fn dot_output_is_deterministic_and_well_formed() {
        let program = parse_program("int main(){int a; a = 1 + 2; return a;}", "test.mc").unwrap();
        let first = ast_to_dot(&program);
        let second = ast_to_dot(&program);
        assert_eq!(first, second);
        assert!(first.starts_with("digraph \"AST\" {"));
        assert!(first.ends_with("}\n"));
        assert!(first.contains("func_def: int main"));
        assert!(first.contains("expr: +"));
    }

    #[test]
    fn function_filter_selects_single_function() {
        let program =
            parse_program("int f(){return 1;} int main(){return 0;}", "test.mc").unwrap();
        let dot = function_to_dot(&program, "f").unwrap();
        assert!(dot.contains("func_def: int f"));
        assert!(!dot.contains("func_def: int main"));
        assert!(function_to_dot(&program, "nope").is_none());
    }
}
