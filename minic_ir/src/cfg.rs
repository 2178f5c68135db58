//! Control-flow graph construction
//!
//! Basic blocks partition the IR at leaders; successor edges come from
//! each block's last row. The block list keeps insertion order, so
//! traversing it visits every block exactly once regardless of the
//! graph shape.

use crate::ir::{Ir, IrArg, IrInstr};

/// Index of a basic block in the chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockId(pub usize);

/// A maximal straight-line row sequence; `start` is the leader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicBlock {
    /// Row index range `[start, end)` into the IR.
    pub start: usize,
    pub end: usize,
    /// Fall-through successor of a conditional jump.
    pub child_left: Option<BlockId>,
    /// Branch target, or the linear successor of a non-branching block.
    pub child_right: Option<BlockId>,
}

impl BasicBlock {
    pub fn rows(&self) -> std::ops::Range<usize> {
        self.start..self.end
    }
}

/// The CFG: blocks in chain (insertion) order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cfg {
    pub blocks: Vec<BasicBlock>,
}

impl Cfg {
    pub fn block(&self, id: BlockId) -> &BasicBlock {
        &self.blocks[id.0]
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

/// A row is a leader iff it is the first row, a label of either kind,
/// or the previous row transfers control.
fn is_leader(current: IrInstr, previous: IrInstr) -> bool {
    matches!(current, IrInstr::Label | IrInstr::FuncLabel)
        || matches!(previous, IrInstr::Jump | IrInstr::Jumpfalse | IrInstr::Return)
}

/// Partition the IR into basic blocks and wire the successor edges.
pub fn build_cfg(ir: &Ir) -> Cfg {
    let mut blocks: Vec<BasicBlock> = Vec::new();
    for i in 0..ir.rows.len() {
        if i == 0 || is_leader(ir.rows[i].instr, ir.rows[i - 1].instr) {
            if let Some(last) = blocks.last_mut() {
                last.end = i;
            }
            blocks.push(BasicBlock { start: i, end: ir.rows.len(), child_left: None, child_right: None });
        }
    }

    let mut cfg = Cfg { blocks };
    set_children(&mut cfg, ir);
    log::debug!("CFG has {} basic blocks", cfg.len());
    cfg
}

fn label_target(cfg: &Cfg, ir: &Ir, label: u32) -> Option<BlockId> {
    cfg.blocks.iter().position(|block| {
        let leader = &ir.rows[block.start];
        leader.instr == IrInstr::Label
            && matches!(leader.arg1, Some(IrArg::Label(l)) if l == label)
    }).map(BlockId)
}

fn set_children(cfg: &mut Cfg, ir: &Ir) {
    for i in 0..cfg.blocks.len() {
        let next = (i + 1 < cfg.blocks.len()).then_some(BlockId(i + 1));
        let last_row = &ir.rows[cfg.blocks[i].end - 1];
        let (left, right) = match last_row.instr {
            IrInstr::Jump => {
                let Some(IrArg::Label(label)) = &last_row.arg1 else {
                    unreachable!("jump without label operand");
                };
                (None, label_target(cfg, ir, *label))
            }
            IrInstr::Jumpfalse => {
                let Some(IrArg::Label(label)) = &last_row.arg2 else {
                    unreachable!("jumpfalse without label operand");
                };
                (next, label_target(cfg, ir, *label))
            }
            IrInstr::Return => (None, None),
            _ => (None, next),
        };
        cfg.blocks[i].child_left = left;
        cfg.blocks[i].child_right = right;
    }
}

/// Slice the chain down to one function: drop every block before its
/// `FUNC_LABEL` and truncate at the next one. Child links are rebased;
/// links leaving the slice are cut.
pub fn limit_to_function(cfg: &Cfg, ir: &Ir, name: &str) -> Option<Cfg> {
    let first = cfg.blocks.iter().position(|block| {
        let leader = &ir.rows[block.start];
        leader.instr == IrInstr::FuncLabel
            && matches!(&leader.arg1, Some(IrArg::FuncLabel(label)) if label == name)
    })?;
    let end = cfg.blocks[first + 1..]
        .iter()
        .position(|block| ir.rows[block.start].instr == IrInstr::FuncLabel)
        .map_or(cfg.blocks.len(), |offset| first + 1 + offset);

    let rebase = |child: Option<BlockId>| {
        child.and_then(|BlockId(id)| (id >= first && id < end).then_some(BlockId(id - first)))
    };
    let blocks = cfg.blocks[first..end]
        .iter()
        .map(|block| BasicBlock {
            start: block.start,
            end: block.end,
            child_left: rebase(block.child_left),
            child_right: rebase(block.child_right),
        })
        .collect();
    Some(Cfg { blocks })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gen::generate_ir;
    use minic_parser::{canonicalize, parse_program};

    fn ir_for(source: &str) -> Ir {
        let mut program = parse_program(source, "test.mc").expect("program should parse");
        canonicalize(&mut program);
        generate_ir(&program)
    }

    #[test]
    fn straight_line_function_is_one_block() {
        let ir = ir_for("int main(){int a; a = 1; return a;}");
        let cfg = build_cfg(&ir);
        assert_eq!(cfg.len(), 1);
        assert_eq!(cfg.blocks[0].rows(), 0..ir.len());
        assert_eq!(cfg.blocks[0].child_left, None);
        assert_eq!(cfg.blocks[0].child_right, None);
    }

    #[test]
    fn while_loop_has_four_blocks() {
        let ir = ir_for(
            "int main(){int a; a = 1; int b; b = 1; \
             while(a < 10){a = a + 1; b = b - 1;} return b;}",
        );
        let cfg = build_cfg(&ir);
        // Entry, loop header, loop body, exit.
        assert_eq!(cfg.len(), 4);
        let header = &cfg.blocks[1];
        assert_eq!(ir.rows[header.start].instr, IrInstr::Label);
        // The condition's jumpfalse falls through into the body and
        // branches to the exit.
        assert_eq!(header.child_left, Some(BlockId(2)));
        assert_eq!(header.child_right, Some(BlockId(3)));
        // The body jumps back to the header.
        assert_eq!(cfg.blocks[2].child_right, Some(BlockId(1)));
        assert_eq!(cfg.blocks[2].child_left, None);
        // The exit returns.
        assert_eq!(cfg.blocks[3].child_left, None);
        assert_eq!(cfg.blocks[3].child_right, None);
    }

    #[test]
    fn chain_visits_every_row_exactly_once() {
        let ir = ir_for(
            "int f(int x){if (x > 0) {return 1;} return 0;} \
             int main(){return f(3);}",
        );
        let cfg = build_cfg(&ir);
        let mut covered = vec![false; ir.len()];
        for block in &cfg.blocks {
            for i in block.rows() {
                assert!(!covered[i], "row {} appears in two blocks", i);
                covered[i] = true;
            }
        }
        assert!(covered.iter().all(|&c| c), "every row belongs to some block");
    }

    #[test]
    fn limit_to_function_slices_the_chain() {
        let ir = ir_for("int f(){return 1;} int main(){return f();}");
        let cfg = build_cfg(&ir);
        let sliced = limit_to_function(&cfg, &ir, "main").expect("main should exist");
        assert_eq!(ir.rows[sliced.blocks[0].start].instr, IrInstr::FuncLabel);
        for block in &sliced.blocks {
            for i in block.rows() {
                assert!(i >= ir.function_start("main").unwrap());
            }
        }
        assert!(limit_to_function(&cfg, &ir, "missing").is_none());
    }

    #[test]
    fn jump_targets_resolve_within_the_function() {
        let ir = ir_for("int main(){int a; a = 0; while(a < 3){a = a + 1;} if (a > 1) {a = 0;} return a;}");
        let cfg = build_cfg(&ir);
        for (i, block) in cfg.blocks.iter().enumerate() {
            let last = &ir.rows[block.end - 1];
            if matches!(last.instr, IrInstr::Jump | IrInstr::Jumpfalse) {
                assert!(block.child_right.is_some(), "block {} misses its branch target", i);
            }
        }
    }
}
