//! Text and DOT renderings of the symbol table

use crate::symbol_table::{Row, RowStructure, ScopeId, SymbolTable};
use std::fmt::Write;

fn row_label(row: &Row) -> String {
    match row.structure {
        RowStructure::Variable => format!("{} ({})", row.name, row.row_type),
        RowStructure::Function => format!("{} ({} function)", row.name, row.row_type),
        RowStructure::Array => format!("{} ({}[{}])", row.name, row.row_type, row.array_size),
        RowStructure::Pseudo => "----".to_string(),
    }
}

// ------------------------------------------------------------- Plain text

/// Indented text rendering; each nested scope shifts one level right.
pub fn symbol_table_to_text(table: &SymbolTable) -> String {
    let mut out = String::new();
    write_scope_text(table, table.top_scope(), 0, &mut out);
    out
}

fn write_scope_text(table: &SymbolTable, scope: ScopeId, depth: usize, out: &mut String) {
    for &row_id in &table.scope(scope).rows {
        let row = table.row(row_id);
        writeln!(out, "{}{}", "    ".repeat(depth), row_label(row)).unwrap();
        for &child in &row.child_scopes {
            write_scope_text(table, child, depth + 1, out);
        }
    }
}

// ------------------------------------------------------------------- DOT

/// DOT rendering: one plaintext node holding nested HTML tables, one
/// table per scope.
pub fn symbol_table_to_dot(table: &SymbolTable) -> String {
    let mut out = String::new();
    out.push_str(
        "digraph {\n\n\
         tbl [\n\n\
         shape=plaintext\n\
         label=<\n\n\
         <table border='0' cellborder='1' cellspacing='0'>\n\
         <tr><td>Symbol Table</td></tr>\n",
    );
    write_scope_dot(table, table.top_scope(), &mut out);
    out.push_str("</table>\n\n>];\n\n}\n");
    out
}

fn write_scope_dot(table: &SymbolTable, scope: ScopeId, out: &mut String) {
    out.push_str("<tr><td cellpadding='4'>\n\n<table cellspacing='0'>\n");
    let rows = &table.scope(scope).rows;
    if rows.is_empty() {
        out.push_str("<tr><td> ---- </td></tr>\n");
    }
    for &row_id in rows {
        let row = table.row(row_id);
        writeln!(out, "<tr><td>{}</td></tr>", escape_html(&row_label(row))).unwrap();
        for &child in &row.child_scopes {
            write_scope_dot(table, child, out);
        }
    }
    out.push_str("</table>\n\n</td></tr>\n");
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol_table::build_symbol_table;
    use minic_parser::parse_program;

    fn table_for(source: &str) -> SymbolTable {
        let program = parse_program(source, "test.mc").expect("program should parse");
        build_symbol_table(&program).0
    }

    #[test]
    fn text_rendering_indents_nested_scopes() {
        let table = table_for("int main(){int a; {float b;} return 0;}");
        let text = symbol_table_to_text(&table);
        assert!(text.contains("main (int function)"));
        assert!(text.contains("    a (int)"));
        assert!(text.contains("    ----"));
        assert!(text.contains("        b (float)"));
    }

    #[test]
    fn text_rendering_shows_array_sizes() {
        let table = table_for("int main(){int[42] a; return 0;}");
        assert!(symbol_table_to_text(&table).contains("a (int[42])"));
    }

    #[test]
    fn dot_rendering_nests_tables() {
        let table = table_for("int main(){{}} ");
        let dot = symbol_table_to_dot(&table);
        assert!(dot.starts_with("digraph {"));
        assert!(dot.contains("<tr><td>Symbol Table</td></tr>"));
        assert!(dot.contains("main (int function)"));
        assert!(dot.contains("----"));
        assert!(dot.ends_with("}\n"));
    }
}
