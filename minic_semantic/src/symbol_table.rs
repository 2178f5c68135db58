//! Symbol table construction and lookup
//!
//! The table is a tree of scopes backed by two arenas; rows and scopes
//! reference each other through indices, which keeps the parent, child
//! and sibling links of the tree free of ownership cycles. Each function
//! opens a child scope under its row holding the parameters and the
//! body's top-level declarations; nested blocks hang off a synthetic
//! pseudo anchor row.

use minic_common::SourceLocation;
use minic_parser::{
    CompoundStatement, Declaration, FunctionDefinition, FunctionType, Program, Statement, Type,
};
use std::fmt;

/// Index of a row in the table arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RowId(pub usize);

/// Index of a scope in the table arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(pub usize);

/// What kind of name a row introduces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowStructure {
    Variable,
    Array,
    Function,
    /// Scope anchor without variable semantics; also used to keep empty
    /// `{}` scopes representable.
    Pseudo,
}

/// The declared type recorded for a row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowType {
    Int,
    Float,
    Bool,
    String,
    Void,
    Pseudo,
}

impl fmt::Display for RowType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowType::Int => write!(f, "int"),
            RowType::Float => write!(f, "float"),
            RowType::Bool => write!(f, "bool"),
            RowType::String => write!(f, "string"),
            RowType::Void => write!(f, "void"),
            RowType::Pseudo => write!(f, "-"),
        }
    }
}

impl From<Type> for RowType {
    fn from(ty: Type) -> Self {
        match ty {
            Type::Int => RowType::Int,
            Type::Float => RowType::Float,
            Type::Bool => RowType::Bool,
            Type::String => RowType::String,
        }
    }
}

impl From<FunctionType> for RowType {
    fn from(ty: FunctionType) -> Self {
        match ty {
            FunctionType::Int => RowType::Int,
            FunctionType::Float => RowType::Float,
            FunctionType::Bool => RowType::Bool,
            FunctionType::String => RowType::String,
            FunctionType::Void => RowType::Void,
        }
    }
}

/// One table row
#[derive(Debug, Clone)]
pub struct Row {
    pub name: String,
    pub structure: RowStructure,
    pub row_type: RowType,
    /// Declared element count; -1 for non-arrays.
    pub array_size: i64,
    /// Where the declaring AST node sits, for diagnostics.
    pub loc: SourceLocation,
    pub scope: ScopeId,
    pub prev: Option<RowId>,
    pub next: Option<RowId>,
    pub child_scopes: Vec<ScopeId>,
}

/// One scope: an ordered row list plus its place in the tree
#[derive(Debug, Clone)]
pub struct Scope {
    pub rows: Vec<RowId>,
    /// The row that opened this scope; `None` for the top scope.
    pub parent_row: Option<RowId>,
}

/// Resolution context of a statement: the innermost scope it sits in and
/// the last row visible before it.
#[derive(Debug, Clone, Copy)]
pub struct StatementScope {
    pub scope: ScopeId,
    pub last_row: Option<RowId>,
}

/// The symbol table
#[derive(Debug)]
pub struct SymbolTable {
    rows: Vec<Row>,
    scopes: Vec<Scope>,
    top: ScopeId,
}

impl SymbolTable {
    fn new() -> Self {
        let top = Scope { rows: Vec::new(), parent_row: None };
        Self { rows: Vec::new(), scopes: vec![top], top: ScopeId(0) }
    }

    pub fn top_scope(&self) -> ScopeId {
        self.top
    }

    pub fn row(&self, id: RowId) -> &Row {
        &self.rows[id.0]
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0]
    }

    pub fn scope_count(&self) -> usize {
        self.scopes.len()
    }

    pub fn scope_ids(&self) -> impl Iterator<Item = ScopeId> {
        (0..self.scopes.len()).map(ScopeId)
    }

    fn new_child_scope(&mut self, parent_row: RowId) -> ScopeId {
        let id = ScopeId(self.scopes.len());
        self.scopes.push(Scope { rows: Vec::new(), parent_row: Some(parent_row) });
        self.rows[parent_row.0].child_scopes.push(id);
        id
    }

    fn append_row(
        &mut self,
        scope: ScopeId,
        name: impl Into<String>,
        structure: RowStructure,
        row_type: RowType,
        array_size: i64,
        loc: SourceLocation,
    ) -> RowId {
        let id = RowId(self.rows.len());
        let prev = self.scopes[scope.0].rows.last().copied();
        self.rows.push(Row {
            name: name.into(),
            structure,
            row_type,
            array_size,
            loc,
            scope,
            prev,
            next: None,
            child_scopes: Vec::new(),
        });
        if let Some(prev) = prev {
            self.rows[prev.0].next = Some(id);
        }
        self.scopes[scope.0].rows.push(id);
        id
    }

    // ------------------------------------------------------------ Lookup

    /// Search from `from` backward through its scope's rows, then ascend
    /// to the parent scope's anchor row and repeat. Returns the closest
    /// (innermost) declaration of `name`, or `None`.
    pub fn check_upwards_for_declaration(&self, name: &str, from: RowId) -> Option<RowId> {
        let mut start = from;
        loop {
            let mut cursor = Some(start);
            while let Some(id) = cursor {
                let row = &self.rows[id.0];
                if row.structure != RowStructure::Pseudo && row.name == name {
                    return Some(id);
                }
                cursor = row.prev;
            }
            let scope = self.rows[start.0].scope;
            start = self.scopes[scope.0].parent_row?;
        }
    }

    /// Lookup for a position described by a [`StatementScope`]: from the
    /// last visible row if there is one, otherwise from the scope's
    /// anchor upward.
    pub fn lookup(&self, name: &str, at: StatementScope) -> Option<RowId> {
        match at.last_row {
            Some(row) => self.check_upwards_for_declaration(name, row),
            None => {
                let anchor = self.scopes[at.scope.0].parent_row?;
                self.check_upwards_for_declaration(name, anchor)
            }
        }
    }

    /// Function-call identifiers resolve in the top scope only.
    pub fn check_for_function_declaration(&self, name: &str) -> Option<RowId> {
        self.scopes[self.top.0]
            .rows
            .iter()
            .copied()
            .find(|id| {
                let row = &self.rows[id.0];
                row.structure == RowStructure::Function && row.name == name
            })
    }
}

// -------------------------------------------------------- Construction

/// Build the symbol table for a canonicalized program.
///
/// Also returns the resolution context of every statement in pre-order
/// (functions in program order; within a statement, branch bodies after
/// the statement itself); the check bank walks the AST in the same order
/// and uses the contexts for upward lookups.
pub fn build_symbol_table(program: &Program) -> (SymbolTable, Vec<StatementScope>) {
    let mut table = SymbolTable::new();
    let mut contexts = Vec::new();
    for function in &program.functions {
        build_function(&mut table, &mut contexts, function);
    }
    log::debug!("symbol table holds {} scopes", table.scope_count());
    (table, contexts)
}

fn build_function(
    table: &mut SymbolTable,
    contexts: &mut Vec<StatementScope>,
    function: &FunctionDefinition,
) {
    let top = table.top_scope();
    let function_row = table.append_row(
        top,
        function.ident.name.clone(),
        RowStructure::Function,
        RowType::from(function.return_type),
        -1,
        function.loc.clone(),
    );
    let scope = table.new_child_scope(function_row);
    let mut last = None;
    for parameter in &function.parameters {
        last = Some(append_declaration(table, scope, parameter));
    }
    build_compound(table, contexts, scope, last, &function.body);
    if table.scope(scope).rows.is_empty() {
        table.append_row(
            scope,
            "",
            RowStructure::Pseudo,
            RowType::Pseudo,
            -1,
            function.body.loc.clone(),
        );
    }
}

fn append_declaration(table: &mut SymbolTable, scope: ScopeId, declaration: &Declaration) -> RowId {
    match declaration {
        Declaration::Variable { ty, ident, loc } => table.append_row(
            scope,
            ident.name.clone(),
            RowStructure::Variable,
            RowType::from(*ty),
            -1,
            loc.clone(),
        ),
        Declaration::Array { ty, size, ident, loc } => table.append_row(
            scope,
            ident.name.clone(),
            RowStructure::Array,
            RowType::from(*ty),
            *size,
            loc.clone(),
        ),
    }
}

fn build_compound(
    table: &mut SymbolTable,
    contexts: &mut Vec<StatementScope>,
    scope: ScopeId,
    mut last: Option<RowId>,
    compound: &CompoundStatement,
) -> Option<RowId> {
    for statement in &compound.statements {
        last = build_statement(table, contexts, scope, last, statement);
    }
    last
}

fn build_statement(
    table: &mut SymbolTable,
    contexts: &mut Vec<StatementScope>,
    scope: ScopeId,
    last: Option<RowId>,
    statement: &Statement,
) -> Option<RowId> {
    contexts.push(StatementScope { scope, last_row: last });
    match statement {
        Statement::Declaration(declaration) => Some(append_declaration(table, scope, declaration)),
        Statement::Compound(compound) => {
            let anchor = table.append_row(
                scope,
                "",
                RowStructure::Pseudo,
                RowType::Pseudo,
                -1,
                compound.loc.clone(),
            );
            let child = table.new_child_scope(anchor);
            build_compound(table, contexts, child, None, compound);
            if table.scope(child).rows.is_empty() {
                table.append_row(
                    child,
                    "",
                    RowStructure::Pseudo,
                    RowType::Pseudo,
                    -1,
                    compound.loc.clone(),
                );
            }
            Some(anchor)
        }
        Statement::If { on_true, .. } => build_statement(table, contexts, scope, last, on_true),
        Statement::IfElse { on_true, on_false, .. } => {
            let after_true = build_statement(table, contexts, scope, last, on_true);
            build_statement(table, contexts, scope, after_true, on_false)
        }
        Statement::While { body, .. } => build_statement(table, contexts, scope, last, body),
        Statement::Expression(_) | Statement::Assignment(_) | Statement::Return { .. } => last,
    }
}
