//! IR generation tests

use minic_ir::{generate_ir, Ir, IrArg, IrInstr, IrTypeKind};
use minic_parser::{canonicalize, parse_program};
use pretty_assertions::assert_eq;

fn ir_for(source: &str) -> Ir {
    let mut program = parse_program(source, "test.mc").expect("program should parse");
    canonicalize(&mut program);
    generate_ir(&program)
}

fn instrs(ir: &Ir) -> Vec<IrInstr> {
    ir.rows.iter().map(|row| row.instr).collect()
}

#[test]
fn minimal_main_is_func_label_and_return() {
    let ir = ir_for("int main(){return 42;}");
    assert_eq!(instrs(&ir), vec![IrInstr::FuncLabel, IrInstr::Return]);
    assert_eq!(ir.rows[0].arg1, Some(IrArg::FuncLabel("main".into())));
    assert_eq!(ir.rows[1].arg1, Some(IrArg::LitInt(42)));
    assert_eq!(ir.rows[1].ty.kind, IrTypeKind::Int);
}

#[test]
fn built_in_stubs_emit_no_rows() {
    let ir = ir_for("int main(){print_nl(); return 0;}");
    let func_labels: Vec<_> = ir
        .rows
        .iter()
        .filter(|row| row.instr == IrInstr::FuncLabel)
        .collect();
    assert_eq!(func_labels.len(), 1, "only main gets a function label");
}

#[test]
fn scalar_declarations_emit_nothing() {
    let ir = ir_for("int main(){int a; bool b; string s; return 0;}");
    assert_eq!(instrs(&ir), vec![IrInstr::FuncLabel, IrInstr::Return]);
}

#[test]
fn float_declaration_is_zero_initialized() {
    let ir = ir_for("int main(){float f; return 0;}");
    assert_eq!(instrs(&ir), vec![IrInstr::FuncLabel, IrInstr::Assign, IrInstr::Return]);
    assert_eq!(ir.rows[1].arg1, Some(IrArg::Ident("f".into())));
    assert_eq!(ir.rows[1].arg2, Some(IrArg::LitFloat(0.0)));
    assert_eq!(ir.rows[1].ty.kind, IrTypeKind::Float);
}

#[test]
fn array_declaration_emits_array_row() {
    let ir = ir_for("int main(){int[42] a; return 0;}");
    assert_eq!(ir.rows[1].instr, IrInstr::Array);
    assert_eq!(ir.rows[1].arg1, Some(IrArg::Ident("a".into())));
    assert_eq!(ir.rows[1].arg2, Some(IrArg::LitInt(42)));
    assert_eq!(ir.rows[1].ty.array_size, 42);
}

#[test]
fn float_literal_in_expression_materializes_a_temporary() {
    let ir = ir_for("int main(){float f; f = 1.5 + 2.5; return 0;}");
    // f = 0.0; $tmp0 = 1.5; $tmp1 = 2.5; plus; f = (plus)
    let assigns: Vec<_> = ir
        .rows
        .iter()
        .filter(|row| row.instr == IrInstr::Assign)
        .map(|row| row.arg1.clone().unwrap())
        .collect();
    assert_eq!(
        assigns,
        vec![
            IrArg::Ident("f".into()),
            IrArg::Ident("$tmp0".into()),
            IrArg::Ident("$tmp1".into()),
            IrArg::Ident("f".into()),
        ]
    );
    let plus = ir.rows.iter().find(|row| row.instr == IrInstr::Plus).unwrap();
    assert_eq!(plus.arg1, Some(IrArg::Ident("$tmp0".into())));
    assert_eq!(plus.ty.kind, IrTypeKind::Float);
}

#[test]
fn float_literal_assignment_skips_the_temporary() {
    let ir = ir_for("int main(){float f; f = 2.5; return 0;}");
    // Only the zero-init and the direct assignment, no $tmp rows.
    assert_eq!(instrs(&ir), vec![IrInstr::FuncLabel, IrInstr::Assign, IrInstr::Assign, IrInstr::Return]);
    assert_eq!(ir.rows[2].arg2, Some(IrArg::LitFloat(2.5)));
}

#[test]
fn comparison_rows_are_bool_typed() {
    let ir = ir_for("int main(){int a; a = 1; bool b; b = a < 2; return a;}");
    let smaller = ir.rows.iter().find(|row| row.instr == IrInstr::Smaller).unwrap();
    assert_eq!(smaller.ty.kind, IrTypeKind::Bool);
}

#[test]
fn arithmetic_rows_take_their_operand_type() {
    let ir = ir_for("int main(){int a; a = 1 + 2; return a;}");
    let plus = ir.rows.iter().find(|row| row.instr == IrInstr::Plus).unwrap();
    assert_eq!(plus.ty.kind, IrTypeKind::Int);
}

#[test]
fn parameters_pop_in_declaration_order() {
    let ir = ir_for("int f(int a, int b){return a;} int main(){return f(1, 2);}");
    assert_eq!(
        instrs(&ir)[..5],
        [IrInstr::FuncLabel, IrInstr::Pop, IrInstr::Assign, IrInstr::Pop, IrInstr::Assign]
    );
    assert_eq!(ir.rows[2].arg1, Some(IrArg::Ident("a".into())));
    assert_eq!(ir.rows[4].arg1, Some(IrArg::Ident("b".into())));
}

#[test]
fn pushes_are_contiguous_and_first_argument_is_pushed_last() {
    let ir = ir_for(
        "int f(int a, int b, int c){return a;} int main(){return f(1, 2, 3);}",
    );
    let range = ir.function_range("main").unwrap();
    let pushed: Vec<Option<IrArg>> = ir.rows[range]
        .iter()
        .filter(|row| row.instr == IrInstr::Push)
        .map(|row| row.arg1.clone())
        .collect();
    assert_eq!(
        pushed,
        vec![
            Some(IrArg::LitInt(3)),
            Some(IrArg::LitInt(2)),
            Some(IrArg::LitInt(1)),
        ]
    );
    // The pushes immediately precede the call.
    let rows = &ir.rows[ir.function_range("main").unwrap()];
    let call = rows.iter().position(|row| row.instr == IrInstr::Call).unwrap();
    assert!(rows[call - 3..call].iter().all(|row| row.instr == IrInstr::Push));
}

#[test]
fn string_argument_materializes_before_the_push_block() {
    let ir = ir_for("int main(){print(\"hi\"); print_nl(); return 0;}");
    let rows = &ir.rows;
    let assign = rows.iter().position(|row| {
        row.instr == IrInstr::Assign && matches!(row.arg2, Some(IrArg::LitString(_)))
    });
    let assign = assign.expect("string literal is materialized through a temporary");
    assert_eq!(rows[assign].arg1, Some(IrArg::Ident("$tmp0".into())));
    assert_eq!(rows[assign + 1].instr, IrInstr::Push);
    assert_eq!(rows[assign + 1].arg1, Some(IrArg::Ident("$tmp0".into())));
}

#[test]
fn whole_array_argument_lowers_to_an_identifier_push() {
    let ir = ir_for("int f(int[3] a){return a[0];} int main(){int[3] b; return f(b);}");
    let range = ir.function_range("main").unwrap();
    let push = ir.rows[range].iter().find(|row| row.instr == IrInstr::Push).unwrap();
    assert_eq!(push.arg1, Some(IrArg::Ident("b".into())));
    // The parameter binding keeps the declared element count in its
    // row type.
    let pop = ir.rows.iter().find(|row| row.instr == IrInstr::Pop).unwrap();
    assert_eq!(pop.ty.array_size, 3);
    let binding = ir
        .rows
        .iter()
        .find(|row| row.instr == IrInstr::Assign && row.arg1 == Some(IrArg::Ident("a".into())))
        .unwrap();
    assert_eq!(binding.ty.array_size, 3);
}

#[test]
fn call_row_carries_the_return_type() {
    let ir = ir_for("float g(){return 1.0;} int main(){float f; f = g(); return 0;}");
    let call = ir.rows.iter().find(|row| row.instr == IrInstr::Call).unwrap();
    assert_eq!(call.arg1, Some(IrArg::Ident("g".into())));
    assert_eq!(call.ty.kind, IrTypeKind::Float);
}

#[test]
fn if_without_else_jumps_over_the_body() {
    let ir = ir_for("int main(){int a; a = 0; if (a < 1) {a = 2;} return a;}");
    let jumpfalse = ir.rows.iter().find(|row| row.instr == IrInstr::Jumpfalse).unwrap();
    let Some(IrArg::Label(target)) = jumpfalse.arg2 else { panic!("jumpfalse needs a label") };
    let label = ir
        .rows
        .iter()
        .filter(|row| row.instr == IrInstr::Label)
        .filter(|row| matches!(row.arg1, Some(IrArg::Label(l)) if l == target))
        .count();
    assert_eq!(label, 1, "the jump target exists exactly once");
    // No unconditional jump is emitted for a bare if.
    assert!(ir.rows.iter().all(|row| row.instr != IrInstr::Jump));
}

#[test]
fn if_else_where_both_branches_return_omits_the_join_label() {
    let ir = ir_for("int main(){if (true) {return 1;} else {return 2;}}");
    let labels = ir.rows.iter().filter(|row| row.instr == IrInstr::Label).count();
    assert_eq!(labels, 1, "only the else label is emitted");
    assert!(ir.rows.iter().all(|row| row.instr != IrInstr::Jump));
}

#[test]
fn if_else_with_fallthrough_emits_jump_and_join_label() {
    let ir = ir_for("int main(){int a; if (true) {a = 1;} else {a = 2;} return a;}");
    let labels = ir.rows.iter().filter(|row| row.instr == IrInstr::Label).count();
    assert_eq!(labels, 2);
    let jumps = ir.rows.iter().filter(|row| row.instr == IrInstr::Jump).count();
    assert_eq!(jumps, 1);
}

#[test]
fn while_loop_shape() {
    let ir = ir_for("int main(){int a; a = 0; while(a < 3){a = a + 1;} return a;}");
    let shape: Vec<IrInstr> = instrs(&ir);
    assert_eq!(
        shape,
        vec![
            IrInstr::FuncLabel,
            IrInstr::Assign,
            IrInstr::Label,
            IrInstr::Smaller,
            IrInstr::Jumpfalse,
            IrInstr::Plus,
            IrInstr::Assign,
            IrInstr::Jump,
            IrInstr::Label,
            IrInstr::Return,
        ]
    );
    // The back edge targets the loop header label.
    assert_eq!(ir.rows[7].arg1, ir.rows[2].arg1);
    assert_eq!(ir.rows[8].arg1, ir.rows[4].arg2);
}

#[test]
fn array_element_index_of_array_element_goes_through_a_temporary() {
    let ir = ir_for("int main(){int[4] a; a[0] = 1; int b; b = a[a[0]]; return b;}");
    let tmp_assign = ir.rows.iter().find(|row| {
        row.instr == IrInstr::Assign && row.arg1 == Some(IrArg::Ident("$tmp0".into()))
    });
    let tmp_assign = tmp_assign.expect("nested element index materializes");
    assert!(matches!(tmp_assign.arg2, Some(IrArg::ArrayElem { .. })));
    assert_eq!(tmp_assign.ty.kind, IrTypeKind::Int);
}

#[test]
fn dead_return_after_return_is_skipped() {
    let ir = ir_for("int main(){return 1; return 2;}");
    let returns = ir.rows.iter().filter(|row| row.instr == IrInstr::Return).count();
    assert_eq!(returns, 1);
}

#[test]
fn implicit_void_return_is_lowered() {
    let ir = ir_for("void f(){int a; a = 1;} int main(){f(); return 0;}");
    let range = ir.function_range("f").unwrap();
    let last = range.end - 1;
    assert_eq!(ir.rows[last].instr, IrInstr::Return);
    assert_eq!(ir.rows[last].arg1, None);
}

#[test]
fn row_numbers_count_only_value_producing_rows() {
    let ir = ir_for("int main(){int a; a = 1 + 2; int b; b = a * 3; return b;}");
    let numbered: Vec<u32> = ir
        .rows
        .iter()
        .filter(|row| row.instr.produces_value())
        .map(|row| row.row_no)
        .collect();
    assert_eq!(numbered, vec![0, 1]);
    assert!(ir
        .rows
        .iter()
        .filter(|row| !row.instr.produces_value())
        .all(|row| row.row_no == 0));
}

#[test]
fn generation_is_deterministic() {
    let source = "int main(){int a; a = 0; while(a < 5){a = a + 1; print_int(a);} return a;}";
    assert_eq!(ir_for(source), ir_for(source));
}
