//! Lowering from annotated IR to x86
//!
//! Every value lives in its frame slot between IR rows: the integer
//! path goes through `%eax` (with `%ebx` as the index register and
//! second operand, `%ecx` as the base of a parameter array), the
//! float path through the x87 stack, which is empty again after every
//! row. Whole arrays are passed by reference. String and float
//! literals are lifted into the data section on first use and
//! referenced by label.

use crate::asm::*;
use hashbrown::HashMap;
use minic_ir::{argument_kind, AnnotatedIr, ArrayStorage, Ir, IrArg, IrInstr, IrTypeKind};

/// Lower the whole program.
pub fn generate_asm(ir: &Ir, annotated: &AnnotatedIr) -> Asm {
    let mut gen = AsmGenerator {
        ir,
        annotated,
        function_start: 0,
        data: Vec::new(),
        strings: HashMap::new(),
        floats: HashMap::new(),
    };

    let mut text = Vec::new();
    let mut start = 0;
    while start < ir.len() {
        debug_assert_eq!(ir.rows[start].instr, IrInstr::FuncLabel);
        let end = ir.rows[start + 1..]
            .iter()
            .position(|row| row.instr == IrInstr::FuncLabel)
            .map_or(ir.len(), |offset| start + 1 + offset);
        text.push(gen.function(start, end));
        start = end;
    }

    log::debug!("emitted {} functions, {} data entries", text.len(), gen.data.len());
    Asm { data: gen.data, text }
}

struct AsmGenerator<'a> {
    ir: &'a Ir,
    annotated: &'a AnnotatedIr,
    function_start: usize,
    data: Vec<AsmDeclaration>,
    strings: HashMap<String, String>,
    floats: HashMap<u64, String>,
}

impl<'a> AsmGenerator<'a> {
    // -------------------------------------------------- Data section

    fn string_label(&mut self, value: &str) -> String {
        if let Some(label) = self.strings.get(value) {
            return label.clone();
        }
        let label = format!(".LS{}", self.strings.len());
        self.strings.insert(value.to_string(), label.clone());
        self.data.push(AsmDeclaration {
            label: label.clone(),
            value: AsmDeclValue::String(value.to_string()),
        });
        label
    }

    fn float_label(&mut self, value: f64) -> String {
        if let Some(label) = self.floats.get(&value.to_bits()) {
            return label.clone();
        }
        let label = format!(".LF{}", self.floats.len());
        self.floats.insert(value.to_bits(), label.clone());
        self.data.push(AsmDeclaration { label: label.clone(), value: AsmDeclValue::Float(value) });
        label
    }

    // ----------------------------------------------- Operand plumbing

    fn slot(&self, row: usize) -> AsmOperand {
        AsmOperand::Offset(self.annotated.rows[row].stack_position, AsmRegister::Ebp)
    }

    /// Resolve a storage operand to memory, loading a runtime array
    /// index into `%ebx` first when needed.
    fn memory_operand(&mut self, arg: &IrArg, lines: &mut Vec<AsmLine>) -> AsmOperand {
        match arg {
            IrArg::Ident(name) => AsmOperand::Offset(
                self.annotated.variable_position(self.ir, self.function_start, name),
                AsmRegister::Ebp,
            ),
            IrArg::Row(r) => self.slot(r.0),
            IrArg::ArrayElem { ident, index } => self.array_element_operand(ident, index, lines),
            IrArg::LitFloat(v) => AsmOperand::Data(self.float_label(*v)),
            other => unreachable!("no memory location for operand {:?}", other),
        }
    }

    /// Element operand of a named array. Locally declared arrays are
    /// addressed relative to `%ebp`; a parameter array's slot holds
    /// the caller's base address, which goes through `%ecx`. Runtime
    /// indices load into `%ebx`.
    fn array_element_operand(
        &mut self,
        name: &str,
        index: &IrArg,
        lines: &mut Vec<AsmLine>,
    ) -> AsmOperand {
        let scale = self.annotated.array_element_size(self.ir, self.function_start, name);
        let storage = self
            .annotated
            .array_storage(self.ir, self.function_start, name)
            .unwrap_or_else(|| unreachable!("element access on undeclared array '{}'", name));
        match storage {
            ArrayStorage::Local { base } => {
                if let IrArg::LitInt(i) = index {
                    AsmOperand::Offset(base + (*i as i32) * scale, AsmRegister::Ebp)
                } else {
                    self.load_int(index, AsmRegister::Ebx, lines);
                    AsmOperand::ComputedOffset { base, reg: AsmRegister::Ebp, scale }
                }
            }
            ArrayStorage::Parameter { slot } => {
                lines.push(AsmLine::binary(
                    AsmOp::Movl,
                    AsmOperand::Offset(slot, AsmRegister::Ebp),
                    AsmOperand::Register(AsmRegister::Ecx),
                ));
                if let IrArg::LitInt(i) = index {
                    AsmOperand::Offset((*i as i32) * scale, AsmRegister::Ecx)
                } else {
                    self.load_int(index, AsmRegister::Ebx, lines);
                    AsmOperand::ComputedOffset { base: 0, reg: AsmRegister::Ecx, scale }
                }
            }
        }
    }

    /// Load an int/bool/string value into a register.
    fn load_int(&mut self, arg: &IrArg, reg: AsmRegister, lines: &mut Vec<AsmLine>) {
        let src = match arg {
            IrArg::LitInt(v) => AsmOperand::Literal(*v),
            IrArg::LitBool(v) => AsmOperand::Literal(i64::from(*v)),
            IrArg::LitString(s) => AsmOperand::DataAddress(self.string_label(s)),
            IrArg::Ident(_) | IrArg::Row(_) | IrArg::ArrayElem { .. } => {
                self.memory_operand(arg, lines)
            }
            other => unreachable!("operand {:?} in the integer path", other),
        };
        lines.push(AsmLine::binary(AsmOp::Movl, src, AsmOperand::Register(reg)));
    }

    /// Load a float value onto the x87 stack.
    fn load_float(&mut self, arg: &IrArg, lines: &mut Vec<AsmLine>) {
        let src = self.memory_operand(arg, lines);
        lines.push(AsmLine::unary(AsmOp::Flds, src));
    }

    /// The destination operand of an assignment row.
    fn assign_target(&mut self, row: usize, lines: &mut Vec<AsmLine>) -> AsmOperand {
        match &self.ir.rows[row].arg1 {
            Some(IrArg::ArrayElem { ident, index }) => {
                self.array_element_operand(ident, index, lines)
            }
            _ => self.slot(row),
        }
    }

    // ------------------------------------------------------ Functions

    fn function(&mut self, start: usize, end: usize) -> AsmFunction {
        self.function_start = start;
        let Some(IrArg::FuncLabel(name)) = &self.ir.rows[start].arg1 else {
            unreachable!("function without a label row");
        };

        let mut lines = vec![
            AsmLine::unary(AsmOp::Pushl, AsmOperand::Register(AsmRegister::Ebp)),
            AsmLine::binary(
                AsmOp::Movl,
                AsmOperand::Register(AsmRegister::Esp),
                AsmOperand::Register(AsmRegister::Ebp),
            ),
            AsmLine::binary(
                AsmOp::Subl,
                AsmOperand::Literal(i64::from(self.annotated.rows[start].stack_size)),
                AsmOperand::Register(AsmRegister::Esp),
            ),
        ];
        // The x87 stack must be empty between rows; reset it on entry
        // for functions that use it at all.
        if self.ir.rows[start..end].iter().any(|row| row.ty.kind == IrTypeKind::Float) {
            lines.push(AsmLine::nullary(AsmOp::Finit));
        }

        for row in start + 1..end {
            self.lower_row(row, &mut lines);
        }

        AsmFunction { label: name.clone(), is_global: name == "main", lines }
    }

    fn lower_row(&mut self, row: usize, lines: &mut Vec<AsmLine>) {
        let eax = AsmOperand::Register(AsmRegister::Eax);
        let ebx = AsmOperand::Register(AsmRegister::Ebx);
        let al = AsmOperand::Register(AsmRegister::Al);
        let ir_row = &self.ir.rows[row];

        match ir_row.instr {
            IrInstr::Assign => {
                let value = ir_row.arg2.clone().expect("assignment without value");
                // A parameter-array binding (array-sized row type)
                // copies the pushed base address as a word, never
                // through the x87 stack.
                if ir_row.ty.kind == IrTypeKind::Float && ir_row.ty.array_size < 0 {
                    self.load_float(&value, lines);
                    let target = self.assign_target(row, lines);
                    lines.push(AsmLine::unary(AsmOp::Fstps, target));
                } else {
                    self.load_int(&value, AsmRegister::Eax, lines);
                    let target = self.assign_target(row, lines);
                    lines.push(AsmLine::binary(AsmOp::Movl, eax, target));
                }
            }

            IrInstr::Plus | IrInstr::Minus | IrInstr::Multiply | IrInstr::Divide => {
                let lhs = ir_row.arg1.clone().expect("binary row without lhs");
                let rhs = ir_row.arg2.clone().expect("binary row without rhs");
                if ir_row.ty.kind == IrTypeKind::Float {
                    let op = match ir_row.instr {
                        IrInstr::Plus => AsmOp::Fadds,
                        IrInstr::Minus => AsmOp::Fsubs,
                        IrInstr::Multiply => AsmOp::Fmuls,
                        _ => AsmOp::Fdivs,
                    };
                    self.load_float(&lhs, lines);
                    let rhs = self.memory_operand(&rhs, lines);
                    lines.push(AsmLine::unary(op, rhs));
                    lines.push(AsmLine::unary(AsmOp::Fstps, self.slot(row)));
                } else {
                    self.load_int(&lhs, AsmRegister::Eax, lines);
                    self.load_int(&rhs, AsmRegister::Ebx, lines);
                    match ir_row.instr {
                        IrInstr::Plus => lines.push(AsmLine::binary(AsmOp::Addl, ebx, eax.clone())),
                        IrInstr::Minus => lines.push(AsmLine::binary(AsmOp::Subl, ebx, eax.clone())),
                        IrInstr::Multiply => {
                            lines.push(AsmLine::binary(AsmOp::Imull, ebx, eax.clone()))
                        }
                        _ => {
                            lines.push(AsmLine::nullary(AsmOp::Cltd));
                            lines.push(AsmLine::unary(AsmOp::Idivl, ebx));
                        }
                    }
                    lines.push(AsmLine::binary(AsmOp::Movl, eax, self.slot(row)));
                }
            }

            IrInstr::Equals
            | IrInstr::NotEquals
            | IrInstr::Smaller
            | IrInstr::Greater
            | IrInstr::SmallerEq
            | IrInstr::GreaterEq => {
                let lhs = ir_row.arg1.clone().expect("comparison without lhs");
                let rhs = ir_row.arg2.clone().expect("comparison without rhs");
                let float = argument_kind(self.ir, self.function_start, &lhs) == IrTypeKind::Float;
                let set = if float {
                    // fcomip leaves unsigned-style flags.
                    match ir_row.instr {
                        IrInstr::Equals => AsmOp::Sete,
                        IrInstr::NotEquals => AsmOp::Setne,
                        IrInstr::Smaller => AsmOp::Setb,
                        IrInstr::Greater => AsmOp::Seta,
                        IrInstr::SmallerEq => AsmOp::Setbe,
                        _ => AsmOp::Setae,
                    }
                } else {
                    match ir_row.instr {
                        IrInstr::Equals => AsmOp::Sete,
                        IrInstr::NotEquals => AsmOp::Setne,
                        IrInstr::Smaller => AsmOp::Setl,
                        IrInstr::Greater => AsmOp::Setg,
                        IrInstr::SmallerEq => AsmOp::Setle,
                        _ => AsmOp::Setge,
                    }
                };
                if float {
                    self.load_float(&rhs, lines);
                    self.load_float(&lhs, lines);
                    lines.push(AsmLine::nullary(AsmOp::Fcomip));
                    lines.push(AsmLine::nullary(AsmOp::FstpSt0));
                } else {
                    self.load_int(&lhs, AsmRegister::Eax, lines);
                    self.load_int(&rhs, AsmRegister::Ebx, lines);
                    lines.push(AsmLine::binary(AsmOp::Cmpl, ebx, eax.clone()));
                }
                lines.push(AsmLine::unary(set, al.clone()));
                lines.push(AsmLine::binary(AsmOp::Movzbl, al, eax.clone()));
                lines.push(AsmLine::binary(AsmOp::Movl, eax, self.slot(row)));
            }

            IrInstr::And | IrInstr::Or => {
                let lhs = ir_row.arg1.clone().expect("logical row without lhs");
                let rhs = ir_row.arg2.clone().expect("logical row without rhs");
                let op = if ir_row.instr == IrInstr::And { AsmOp::Andl } else { AsmOp::Orl };
                self.load_int(&lhs, AsmRegister::Eax, lines);
                self.load_int(&rhs, AsmRegister::Ebx, lines);
                lines.push(AsmLine::binary(op, ebx, eax.clone()));
                lines.push(AsmLine::binary(AsmOp::Movl, eax, self.slot(row)));
            }

            IrInstr::Not => {
                let value = ir_row.arg1.clone().expect("not without operand");
                self.load_int(&value, AsmRegister::Eax, lines);
                lines.push(AsmLine::binary(AsmOp::Xorl, AsmOperand::Literal(1), eax.clone()));
                lines.push(AsmLine::binary(AsmOp::Movl, eax, self.slot(row)));
            }

            IrInstr::Neg => {
                let value = ir_row.arg1.clone().expect("neg without operand");
                if ir_row.ty.kind == IrTypeKind::Float {
                    self.load_float(&value, lines);
                    lines.push(AsmLine::nullary(AsmOp::Fchs));
                    lines.push(AsmLine::unary(AsmOp::Fstps, self.slot(row)));
                } else {
                    self.load_int(&value, AsmRegister::Eax, lines);
                    lines.push(AsmLine::unary(AsmOp::Negl, eax.clone()));
                    lines.push(AsmLine::binary(AsmOp::Movl, eax, self.slot(row)));
                }
            }

            IrInstr::Jump => {
                let Some(IrArg::Label(label)) = &ir_row.arg1 else {
                    unreachable!("jump without label");
                };
                lines.push(AsmLine::unary(AsmOp::Jmp, AsmOperand::LocalLabel(*label)));
            }

            IrInstr::Jumpfalse => {
                let condition = ir_row.arg1.clone().expect("jumpfalse without condition");
                let Some(IrArg::Label(label)) = &ir_row.arg2 else {
                    unreachable!("jumpfalse without label");
                };
                self.load_int(&condition, AsmRegister::Eax, lines);
                lines.push(AsmLine::binary(AsmOp::Cmpl, AsmOperand::Literal(0), eax));
                lines.push(AsmLine::unary(AsmOp::Je, AsmOperand::LocalLabel(*label)));
            }

            IrInstr::Label => {
                let Some(IrArg::Label(label)) = &ir_row.arg1 else {
                    unreachable!("label row without label");
                };
                lines.push(AsmLine::Label(*label));
            }

            IrInstr::Push => {
                let value = ir_row.arg1.clone().expect("push without value");
                // A whole array passes by reference: its base address
                // is the pushed word, whatever the element type.
                if let IrArg::Ident(name) = &value {
                    if let Some(storage) =
                        self.annotated.array_storage(self.ir, self.function_start, name)
                    {
                        let (op, src) = match storage {
                            ArrayStorage::Local { base } => {
                                (AsmOp::Leal, AsmOperand::Offset(base, AsmRegister::Ebp))
                            }
                            ArrayStorage::Parameter { slot } => {
                                (AsmOp::Movl, AsmOperand::Offset(slot, AsmRegister::Ebp))
                            }
                        };
                        lines.push(AsmLine::binary(op, src, eax.clone()));
                        lines.push(AsmLine::unary(AsmOp::Pushl, eax));
                        return;
                    }
                }
                if ir_row.ty.kind == IrTypeKind::Float {
                    self.load_float(&value, lines);
                    lines.push(AsmLine::binary(
                        AsmOp::Subl,
                        AsmOperand::Literal(4),
                        AsmOperand::Register(AsmRegister::Esp),
                    ));
                    lines.push(AsmLine::unary(AsmOp::Fstps, AsmOperand::Offset(0, AsmRegister::Esp)));
                } else {
                    self.load_int(&value, AsmRegister::Eax, lines);
                    lines.push(AsmLine::unary(AsmOp::Pushl, eax));
                }
            }

            IrInstr::Call => {
                let Some(IrArg::Ident(name)) = &ir_row.arg1 else {
                    unreachable!("call without callee");
                };
                lines.push(AsmLine::unary(AsmOp::Call, AsmOperand::Function(name.clone())));
                // The caller reclaims its contiguous block of pushes.
                let pushed = self.ir.rows[..row]
                    .iter()
                    .rev()
                    .take_while(|r| r.instr == IrInstr::Push)
                    .count() as i64;
                if pushed > 0 {
                    lines.push(AsmLine::binary(
                        AsmOp::Addl,
                        AsmOperand::Literal(4 * pushed),
                        AsmOperand::Register(AsmRegister::Esp),
                    ));
                }
                match ir_row.ty.kind {
                    IrTypeKind::Float => lines.push(AsmLine::unary(AsmOp::Fstps, self.slot(row))),
                    IrTypeKind::Typeless => {}
                    _ => lines.push(AsmLine::binary(AsmOp::Movl, eax, self.slot(row))),
                }
            }

            IrInstr::Return => {
                if let Some(value) = ir_row.arg1.clone() {
                    if ir_row.ty.kind == IrTypeKind::Float {
                        // The result stays on the x87 top for the caller.
                        self.load_float(&value, lines);
                    } else {
                        self.load_int(&value, AsmRegister::Eax, lines);
                    }
                }
                lines.push(AsmLine::nullary(AsmOp::Leave));
                lines.push(AsmLine::nullary(AsmOp::Ret));
            }

            // Storage rows: the frame slot is the whole story.
            IrInstr::Pop | IrInstr::Array => {}

            IrInstr::FuncLabel => unreachable!("nested function label"),
        }
    }
}
