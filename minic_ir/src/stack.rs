//! Stack-frame annotation
//!
//! Two passes over the IR: the first attaches the number of bytes each
//! row contributes to its function's frame, the second turns the sizes
//! into offsets relative to the base pointer. The `FUNC_LABEL` row ends
//! up carrying the total frame size. Scalars occupy 4 bytes each;
//! repeated assignments to one identifier share the slot of the first.

use crate::ir::{Ir, IrArg, IrInstr, IrRow, IrTypeKind, RowRef};

pub const STACK_SIZE_INT: i32 = 4;
pub const STACK_SIZE_BOOL: i32 = 4;
pub const STACK_SIZE_FLOAT: i32 = 4;
pub const STACK_SIZE_STRING: i32 = 4;

/// Frame annotation of one IR row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AnnotatedRow {
    /// Bytes this row contributes to the frame; for a `FUNC_LABEL` the
    /// total frame size of its function.
    pub stack_size: i32,
    /// Offset from the base pointer (negative for locals and
    /// temporaries, +8 and up for popped parameters).
    pub stack_position: i32,
}

/// Frame annotations parallel to the IR rows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotatedIr {
    pub rows: Vec<AnnotatedRow>,
}

impl AnnotatedIr {
    pub fn row(&self, r: RowRef) -> AnnotatedRow {
        self.rows[r.0]
    }

    /// Total frame size of the function enclosing row `at`.
    pub fn frame_size(&self, ir: &Ir, at: usize) -> i32 {
        self.rows[ir.enclosing_function(at)].stack_size
    }

    /// Slot of a named variable: the position of its first assignment
    /// in the enclosing function.
    pub fn variable_position(&self, ir: &Ir, function_start: usize, name: &str) -> i32 {
        find_first_occurrence(ir, function_start, name)
            .filter(|&i| ir.rows[i].instr == IrInstr::Assign)
            .map_or(0, |i| self.rows[i].stack_position)
    }

    /// Base offset of a named array in the enclosing function.
    pub fn array_base_position(&self, ir: &Ir, function_start: usize, name: &str) -> i32 {
        find_first_occurrence(ir, function_start, name)
            .filter(|&i| ir.rows[i].instr == IrInstr::Array)
            .map_or(0, |i| self.rows[i].stack_position)
    }

    /// Element size of a named array in the enclosing function. Arrays
    /// bound as parameters have no `ARRAY` row; their size comes from
    /// the assignment that binds the popped argument, which keeps the
    /// declared element count in its row type.
    pub fn array_element_size(&self, ir: &Ir, function_start: usize, name: &str) -> i32 {
        find_first_occurrence(ir, function_start, name)
            .filter(|&i| {
                ir.rows[i].instr == IrInstr::Array
                    || (ir.rows[i].instr == IrInstr::Assign && ir.rows[i].ty.array_size > 0)
            })
            .map_or(0, |i| row_size(&ir.rows[i]))
    }

    /// Storage of a named array in the enclosing function, or `None`
    /// if the name is not an array there.
    pub fn array_storage(&self, ir: &Ir, function_start: usize, name: &str) -> Option<ArrayStorage> {
        let i = find_first_occurrence(ir, function_start, name)?;
        match ir.rows[i].instr {
            IrInstr::Array => Some(ArrayStorage::Local { base: self.rows[i].stack_position }),
            IrInstr::Assign if ir.rows[i].ty.array_size > 0 => {
                Some(ArrayStorage::Parameter { slot: self.rows[i].stack_position })
            }
            _ => None,
        }
    }
}

/// Where a named array's elements live. Arrays are passed by
/// reference: a locally declared array occupies the frame itself,
/// a parameter array's slot holds the caller's base address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayStorage {
    Local { base: i32 },
    Parameter { slot: i32 },
}

/// Annotate the whole IR. Expects the sequence to start with a
/// `FUNC_LABEL` row.
pub fn annotate_ir(ir: &Ir) -> AnnotatedIr {
    let mut annotated = AnnotatedIr {
        rows: ir.rows.iter().enumerate().map(|(i, _)| AnnotatedRow {
            stack_size: frame_contribution(ir, i),
            stack_position: 0,
        }).collect(),
    };
    add_stack_positions(ir, &mut annotated);
    annotated
}

/// Primitive size of the value a row produces.
fn row_size(row: &IrRow) -> i32 {
    match row.ty.kind {
        IrTypeKind::Int => STACK_SIZE_INT,
        IrTypeKind::Bool => STACK_SIZE_BOOL,
        IrTypeKind::Float => STACK_SIZE_FLOAT,
        IrTypeKind::String => STACK_SIZE_STRING,
        IrTypeKind::Typeless => 0,
    }
}

/// The identifier a row's first operand binds, if it is a storage
/// operand.
fn target_ident(row: &IrRow) -> Option<&str> {
    row.arg1.as_ref().and_then(IrArg::ident)
}

/// First row of the function that assigns or declares `name`.
fn find_first_occurrence(ir: &Ir, function_start: usize, name: &str) -> Option<usize> {
    for i in function_start + 1..ir.rows.len() {
        let row = &ir.rows[i];
        if row.instr == IrInstr::FuncLabel {
            return None;
        }
        if matches!(row.instr, IrInstr::Assign | IrInstr::Array) {
            // Element assignments do not introduce storage.
            if matches!(row.arg1, Some(IrArg::ArrayElem { .. })) {
                continue;
            }
            if target_ident(row) == Some(name) {
                return Some(i);
            }
        }
    }
    None
}

/// Primitive kind an operand carries, resolved through the defining
/// row for identifiers and array elements. Used by the emitter to pick
/// the integer or x87 path.
pub fn argument_kind(ir: &Ir, function_start: usize, arg: &IrArg) -> IrTypeKind {
    match arg {
        IrArg::LitInt(_) => IrTypeKind::Int,
        IrArg::LitBool(_) => IrTypeKind::Bool,
        IrArg::LitFloat(_) => IrTypeKind::Float,
        IrArg::LitString(_) => IrTypeKind::String,
        IrArg::Row(r) => ir.rows[r.0].ty.kind,
        IrArg::Ident(name) | IrArg::ArrayElem { ident: name, .. } => {
            find_first_occurrence(ir, function_start, name)
                .map_or(IrTypeKind::Typeless, |i| ir.rows[i].ty.kind)
        }
        IrArg::Label(_) | IrArg::FuncLabel(_) => IrTypeKind::Typeless,
    }
}

fn assignment_is_first_occurrence(ir: &Ir, at: usize) -> bool {
    let row = &ir.rows[at];
    debug_assert_eq!(row.instr, IrInstr::Assign);
    // Arrays are allocated when they are declared.
    if matches!(row.arg1, Some(IrArg::ArrayElem { .. })) {
        return false;
    }
    let name = target_ident(row).expect("assignment without target");
    let function_start = ir.enclosing_function(at);
    find_first_occurrence(ir, function_start, name) == Some(at)
}

/// Size of an argument; semantic consistency lets the size of one
/// operand stand in for the size of the whole row.
fn argument_size(ir: &Ir, arg: &IrArg, at: usize) -> i32 {
    match arg {
        IrArg::LitInt(_) => STACK_SIZE_INT,
        IrArg::LitBool(_) => STACK_SIZE_BOOL,
        IrArg::LitFloat(_) => STACK_SIZE_FLOAT,
        IrArg::LitString(_) => STACK_SIZE_STRING,
        IrArg::Row(r) => row_size(&ir.rows[r.0]),
        IrArg::Ident(name) => {
            // The defining assignment carries the declared type; its
            // row size is the slot size.
            let function_start = ir.enclosing_function(at);
            match find_first_occurrence(ir, function_start, name) {
                Some(i) if ir.rows[i].instr == IrInstr::Assign => row_size(&ir.rows[i]),
                _ => 0,
            }
        }
        IrArg::ArrayElem { ident, .. } => {
            let function_start = ir.enclosing_function(at);
            match find_first_occurrence(ir, function_start, ident) {
                Some(i) if ir.rows[i].instr == IrInstr::Array => row_size(&ir.rows[i]),
                _ => 0,
            }
        }
        IrArg::Label(_) | IrArg::FuncLabel(_) => 0,
    }
}

/// Pass 1: bytes the row at `at` contributes to its frame.
fn frame_contribution(ir: &Ir, at: usize) -> i32 {
    let row = &ir.rows[at];
    match row.instr {
        IrInstr::Assign => {
            if !assignment_is_first_occurrence(ir, at) {
                return 0;
            }
            let value = row.arg2.as_ref().expect("assignment without value");
            argument_size(ir, value, at)
        }
        IrInstr::Plus
        | IrInstr::Minus
        | IrInstr::Multiply
        | IrInstr::Divide
        | IrInstr::Neg
        | IrInstr::Equals
        | IrInstr::NotEquals
        | IrInstr::Smaller
        | IrInstr::Greater
        | IrInstr::SmallerEq
        | IrInstr::GreaterEq
        | IrInstr::And
        | IrInstr::Or
        | IrInstr::Not
        | IrInstr::Call => row_size(row),
        IrInstr::Array => row_size(row) * row.ty.array_size as i32,
        IrInstr::Label
        | IrInstr::FuncLabel
        | IrInstr::Jump
        | IrInstr::Jumpfalse
        | IrInstr::Pop
        | IrInstr::Push
        | IrInstr::Return => 0,
    }
}

/// Pass 2: turn sizes into base-pointer offsets, one cursor per
/// function. Parameters popped from the caller's pushes sit above the
/// base pointer at +8, +12, ...
fn add_stack_positions(ir: &Ir, annotated: &mut AnnotatedIr) {
    let mut function_start = 0usize;
    let mut cursor = 0i32;
    let mut pop_position = STACK_SIZE_FLOAT;

    for i in 0..ir.rows.len() {
        let row = &ir.rows[i];
        match row.instr {
            IrInstr::FuncLabel => {
                annotated.rows[i].stack_size = function_frame_size(ir, annotated, i);
                function_start = i;
                cursor = 0;
                pop_position = STACK_SIZE_FLOAT;
            }
            IrInstr::Assign => {
                if let Some(IrArg::ArrayElem { ident, index }) = &row.arg1 {
                    annotated.rows[i].stack_position =
                        array_element_position(ir, annotated, function_start, ident, index);
                } else if !assignment_is_first_occurrence(ir, i) {
                    let name = target_ident(row).expect("assignment without target");
                    annotated.rows[i].stack_position =
                        annotated.variable_position(ir, function_start, name);
                } else {
                    cursor -= annotated.rows[i].stack_size;
                    annotated.rows[i].stack_position = cursor;
                }
            }
            IrInstr::Array => {
                cursor -= row_size(row) * row.ty.array_size as i32;
                annotated.rows[i].stack_position = cursor;
            }
            IrInstr::Pop => {
                pop_position += 4;
                annotated.rows[i].stack_position = pop_position;
                cursor -= annotated.rows[i].stack_size;
            }
            _ => {
                cursor -= annotated.rows[i].stack_size;
                annotated.rows[i].stack_position = cursor;
            }
        }
    }
}

fn function_frame_size(ir: &Ir, annotated: &AnnotatedIr, function_start: usize) -> i32 {
    let mut size = 0;
    for i in function_start + 1..ir.rows.len() {
        if ir.rows[i].instr == IrInstr::FuncLabel {
            break;
        }
        size += annotated.rows[i].stack_size;
    }
    size
}

/// Offset of an array element: base plus `index * element size` when
/// the index is a literal, 0 (computed at runtime) otherwise.
fn array_element_position(
    ir: &Ir,
    annotated: &AnnotatedIr,
    function_start: usize,
    name: &str,
    index: &IrArg,
) -> i32 {
    let IrArg::LitInt(index) = index else {
        return 0;
    };
    match find_first_occurrence(ir, function_start, name) {
        Some(i) if ir.rows[i].instr == IrInstr::Array => {
            annotated.rows[i].stack_position + (*index as i32) * row_size(&ir.rows[i])
        }
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gen::generate_ir;
    use minic_parser::{canonicalize, parse_program};

    fn annotated_for(source: &str) -> (Ir, AnnotatedIr) {
        let mut program = parse_program(source, "test.mc").expect("program should parse");
        canonicalize(&mut program);
        let ir = generate_ir(&program);
        let annotated = annotate_ir(&ir);
        (ir, annotated)
    }

    #[test]
    fn minimal_main_has_empty_frame() {
        let (_, annotated) = annotated_for("int main(){return 42;}");
        assert_eq!(annotated.rows[0].stack_size, 0);
    }

    #[test]
    fn single_variable_occupies_four_bytes() {
        let (ir, annotated) = annotated_for("int main(){int a; a = 1; return a;}");
        assert_eq!(annotated.rows[0].stack_size, 4);
        assert_eq!(annotated.variable_position(&ir, 0, "a"), -4);
    }

    #[test]
    fn repeated_assignment_reuses_the_slot() {
        let (ir, annotated) = annotated_for("int main(){int a; a = 1; a = 2; return a;}");
        assert_eq!(annotated.rows[0].stack_size, 4);
        // Both assignments resolve to the same position.
        assert_eq!(annotated.rows[1].stack_position, -4);
        assert_eq!(annotated.rows[2].stack_position, -4);
        assert_eq!(annotated.rows[2].stack_size, 0);
        assert_eq!(annotated.variable_position(&ir, 0, "a"), -4);
    }

    #[test]
    fn while_countdown_frame_is_twenty_bytes() {
        let (_, annotated) = annotated_for(
            "int main(){int a; a = 1; int b; b = 1; \
             while(a < 10){a = a + 1; b = b - 1;} return b;}",
        );
        // a, b, and the temporaries of a < 10, a + 1 and b - 1.
        assert_eq!(annotated.rows[0].stack_size, 20);
    }

    #[test]
    fn frame_size_is_sum_of_row_sizes() {
        let (ir, annotated) =
            annotated_for("int main(){int a; a = 1; int[3] b; b[0] = a + 2; return a;}");
        let total: i32 = (1..ir.len()).map(|i| annotated.rows[i].stack_size).sum();
        assert_eq!(annotated.rows[0].stack_size, total);
    }

    #[test]
    fn array_of_42_ints_lands_at_minus_168() {
        let (ir, annotated) = annotated_for(
            "int main(){int[42] a; a[0] = 9; a[2] = 9; a[41] = 9; return 0;}",
        );
        assert_eq!(annotated.array_base_position(&ir, 0, "a"), -168);
        assert_eq!(annotated.array_element_size(&ir, 0, "a"), 4);
        // Element positions: base, base + 8, base + 164.
        let positions: Vec<i32> = ir
            .rows
            .iter()
            .enumerate()
            .filter(|(_, row)| {
                row.instr == IrInstr::Assign
                    && matches!(row.arg1, Some(IrArg::ArrayElem { .. }))
            })
            .map(|(i, _)| annotated.rows[i].stack_position)
            .collect();
        assert_eq!(positions, vec![-168, -160, -4]);
    }

    #[test]
    fn runtime_index_yields_position_zero() {
        let (ir, annotated) =
            annotated_for("int main(){int[4] a; int i; i = 1; a[i] = 2; return 0;}");
        let element_assign = ir
            .rows
            .iter()
            .position(|row| matches!(row.arg1, Some(IrArg::ArrayElem { .. })))
            .expect("element assignment exists");
        assert_eq!(annotated.rows[element_assign].stack_position, 0);
    }

    #[test]
    fn parameters_sit_above_the_base_pointer() {
        let (ir, annotated) = annotated_for(
            "int f(int a, int b){return a + b;} int main(){return f(1, 2);}",
        );
        let pops: Vec<i32> = ir
            .rows
            .iter()
            .enumerate()
            .filter(|(_, row)| row.instr == IrInstr::Pop)
            .map(|(i, _)| annotated.rows[i].stack_position)
            .collect();
        assert_eq!(pops, vec![8, 12]);
    }

    #[test]
    fn variable_offsets_are_negative_multiples_of_four() {
        let (ir, annotated) = annotated_for(
            "int main(){int a; a = 1; float f; bool b; b = true; string s; \
             s = \"x\"; f = 2.5; return a;}",
        );
        for (i, row) in ir.rows.iter().enumerate() {
            if row.instr == IrInstr::Assign && matches!(row.arg1, Some(IrArg::Ident(_))) {
                let position = annotated.rows[i].stack_position;
                assert!(position < 0, "row {} has non-negative position {}", i, position);
                assert_eq!(position % 4, 0);
            }
        }
    }

    #[test]
    fn shadow_renamed_variables_get_distinct_slots() {
        let (ir, annotated) =
            annotated_for("int main(){ int a; a = 1; {int a; a = 2;} return a;}");
        let outer = annotated.variable_position(&ir, 0, "a");
        let inner = annotated.variable_position(&ir, 0, "$r0");
        assert_ne!(outer, inner);
        assert_eq!(annotated.rows[0].stack_size, 8);
    }

    #[test]
    fn array_storage_distinguishes_locals_from_parameters() {
        let (ir, annotated) = annotated_for(
            "int f(int[3] a){return a[0];} int main(){int[3] b; b[0] = 1; return f(b);}",
        );
        let f = ir.function_start("f").unwrap();
        let main = ir.function_start("main").unwrap();
        assert_eq!(
            annotated.array_storage(&ir, f, "a"),
            Some(ArrayStorage::Parameter { slot: -4 })
        );
        assert_eq!(
            annotated.array_storage(&ir, main, "b"),
            Some(ArrayStorage::Local { base: -12 })
        );
        assert_eq!(annotated.array_storage(&ir, main, "missing"), None);
        assert_eq!(annotated.array_element_size(&ir, f, "a"), 4);
    }

    #[test]
    fn call_result_gets_a_slot_of_the_return_size() {
        let (ir, annotated) =
            annotated_for("int f(){return 1;} int main(){int a; a = f(); return a;}");
        let call = ir.rows.iter().position(|row| row.instr == IrInstr::Call).unwrap();
        assert_eq!(annotated.rows[call].stack_size, 4);
        assert!(annotated.rows[call].stack_position < 0);
    }
}
