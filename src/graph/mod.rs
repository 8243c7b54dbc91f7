//! A per-method control-flow graph of instruction blocks.
//!
//! Instructions are opaque to this module except for the handful of kinds
//! that terminate a block's control flow (jumps, returns, `athrow`); those
//! may only enter a block through the graph primitives ([`InstructionGraph::jump`],
//! [`InstructionGraph::return_`], [`InstructionGraph::throw`], ...), which
//! append the instruction and install the matching edge as one atomic step.
//! The full JVM opcode catalogue — operand layouts, verification rules — is
//! out of scope here; instructions carry just enough (an opcode byte, and a
//! validated [`ConstHandle`] where one references the constant pool) to
//! support that classification.

use std::cell::{Ref, RefCell, RefMut};
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use fnv::FnvHashMap;

use crate::error::{ClassFileError, Result};
use crate::item::constant_pool::{Constant, ConstantPool};

/// The kind of constant a [`ConstHandle`] is expected to reference,
/// recorded at construction so that a later kind mismatch is a
/// `KindMismatch` pointing at *this* operand, not silent corruption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstKind {
    Class,
    FieldRef,
    MethodRef,
    InterfaceMethodRef,
    String,
    Integer,
    Float,
    Long,
    Double,
    NameAndType,
    MethodHandle,
    MethodType,
    Dynamic,
    InvokeDynamic,
}

impl ConstKind {
    fn matches(self, constant: &Constant) -> bool {
        matches!(
            (self, constant),
            (ConstKind::Class, Constant::Class(_))
                | (ConstKind::FieldRef, Constant::FieldRef(_))
                | (ConstKind::MethodRef, Constant::MethodRef(_))
                | (ConstKind::InterfaceMethodRef, Constant::InterfaceMethodRef(_))
                | (ConstKind::String, Constant::String(_))
                | (ConstKind::Integer, Constant::Integer(_))
                | (ConstKind::Float, Constant::Float(_))
                | (ConstKind::Long, Constant::Long(_))
                | (ConstKind::Double, Constant::Double(_))
                | (ConstKind::NameAndType, Constant::NameAndType(_))
                | (ConstKind::MethodHandle, Constant::MethodHandle(_))
                | (ConstKind::MethodType, Constant::MethodType(_))
                | (ConstKind::Dynamic, Constant::Dynamic(_))
                | (ConstKind::InvokeDynamic, Constant::InvokeDynamic(_))
        )
    }

    fn name(self) -> &'static str {
        match self {
            ConstKind::Class => "Class",
            ConstKind::FieldRef => "FieldRef",
            ConstKind::MethodRef => "MethodRef",
            ConstKind::InterfaceMethodRef => "InterfaceMethodRef",
            ConstKind::String => "String",
            ConstKind::Integer => "Integer",
            ConstKind::Float => "Float",
            ConstKind::Long => "Long",
            ConstKind::Double => "Double",
            ConstKind::NameAndType => "NameAndType",
            ConstKind::MethodHandle => "MethodHandle",
            ConstKind::MethodType => "MethodType",
            ConstKind::Dynamic => "Dynamic",
            ConstKind::InvokeDynamic => "InvokeDynamic",
        }
    }
}

/// A validated, typed reference to a constant pool entry used as an
/// instruction operand. Holding a `ConstHandle` is proof the index resolved
/// to a constant of the declared kind at the time it was built; it is not
/// re-checked against a (possibly different) pool later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConstHandle {
    pub index: u16,
    pub kind: ConstKind,
}

impl ConstHandle {
    pub fn new(pool: &ConstantPool, index: u16, kind: ConstKind) -> Result<Self> {
        let constant = pool.require(index)?;
        if !kind.matches(&constant) {
            return Err(ClassFileError::KindMismatch {
                expected: kind.name(),
                actual: constant.kind_name(),
                at_index: index,
            });
        }
        Ok(Self { index, kind })
    }
}

/// One bytecode instruction. Opaque except for the variants that terminate
/// a block's control flow.
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    /// Any instruction with no constant-pool operand and no control-flow
    /// effect tracked by this graph: arithmetic, locals, stack shuffling,
    /// array access, and so on.
    Generic { opcode: u8, operands: Vec<u8> },
    /// An instruction whose operand is a constant pool reference (`ldc`,
    /// `new`, `getfield`, `invokevirtual`, ...).
    LoadConstant { opcode: u8, constant: ConstHandle },
    /// Unconditional jump (`goto`/`goto_w`/`jsr`/`jsr_w`).
    Jump,
    /// Conditional jump (`ifeq`, `if_icmpne`, ...).
    ConditionalJump { opcode: u8 },
    /// A multi-way switch (`tableswitch`/`lookupswitch`).
    Switch,
    /// A return, with or without a value (`return`, `ireturn`, `areturn`, ...).
    Return { opcode: u8 },
    /// `athrow`.
    Throw,
}

impl Instruction {
    pub fn is_control_flow_terminating(&self) -> bool {
        !matches!(self, Instruction::Generic { .. } | Instruction::LoadConstant { .. })
    }
}

/// What role a block plays in its graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockKind {
    /// The graph's unique entry point.
    Entry,
    /// An ordinary block.
    Normal,
    /// Terminal; must stay empty of instructions. At most one per graph.
    Return,
    /// Terminal; must stay empty of instructions. At most one per graph.
    Rethrow,
}

/// A labeled, ordered sequence of instructions.
#[derive(Debug, Clone, PartialEq)]
pub struct InsnBlock {
    pub label: String,
    pub kind: BlockKind,
    /// Hint to a later layout pass that this block should be merged into
    /// its single predecessor.
    pub inline: bool,
    instructions: Vec<Instruction>,
}

impl InsnBlock {
    pub fn new(label: impl Into<String>, kind: BlockKind) -> Self {
        Self {
            label: label.into(),
            kind,
            inline: false,
            instructions: Vec::new(),
        }
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Append an instruction through the ordinary block API.
    ///
    /// With `do_raise` (the normal case), a control-flow-terminating
    /// instruction is rejected with [`ClassFileError::IllegalInstruction`]
    /// — such instructions must go through a graph primitive, which
    /// installs the matching edge in the same step. `do_raise = false` is
    /// reserved for deserialization paths that reconstruct a block and its
    /// graph edges in lock-step and so need to place the instruction
    /// directly.
    pub fn append(&mut self, instruction: Instruction, do_raise: bool) -> Result<()> {
        self.check_append(&instruction, do_raise)?;
        self.instructions.push(instruction);
        Ok(())
    }

    pub fn insert(&mut self, index: usize, instruction: Instruction, do_raise: bool) -> Result<()> {
        self.check_append(&instruction, do_raise)?;
        self.instructions.insert(index, instruction);
        Ok(())
    }

    fn check_append(&self, instruction: &Instruction, do_raise: bool) -> Result<()> {
        if matches!(self.kind, BlockKind::Entry | BlockKind::Return | BlockKind::Rethrow) {
            return Err(ClassFileError::IllegalInstruction(
                "Entry/Return/Rethrow blocks must stay empty of instructions",
            ));
        }
        if do_raise && instruction.is_control_flow_terminating() {
            return Err(ClassFileError::IllegalInstruction(
                "control-flow-terminating instruction appended through the block API",
            ));
        }
        Ok(())
    }

    /// Produce a new block, optionally relabeled. When `deep`, instructions
    /// are cloned along; otherwise the copy starts empty.
    pub fn copy(&self, label: Option<String>, deep: bool) -> Self {
        Self {
            label: label.unwrap_or_else(|| self.label.clone()),
            kind: self.kind,
            inline: self.inline,
            instructions: if deep {
                self.instructions.clone()
            } else {
                Vec::new()
            },
        }
    }

    /// Same kind, label, and instruction sequence. Distinct from
    /// [`BlockRef`]'s `Eq`, which compares pointer identity.
    pub fn structurally_equals(&self, other: &Self) -> bool {
        self.kind == other.kind && self.label == other.label && self.instructions == other.instructions
    }
}

/// A shared handle to an [`InsnBlock`]. `Eq`/`Hash` compare pointer
/// identity (safe to use as a graph/map key even across blocks that happen
/// to be structurally identical); use [`BlockRef::structurally_equals`]
/// for content comparison.
#[derive(Debug, Clone)]
pub struct BlockRef(Rc<RefCell<InsnBlock>>);

impl BlockRef {
    pub fn new(block: InsnBlock) -> Self {
        Self(Rc::new(RefCell::new(block)))
    }

    pub fn borrow(&self) -> Ref<'_, InsnBlock> {
        self.0.borrow()
    }

    pub fn borrow_mut(&self) -> RefMut<'_, InsnBlock> {
        self.0.borrow_mut()
    }

    pub fn structurally_equals(&self, other: &Self) -> bool {
        self.0.borrow().structurally_equals(&other.0.borrow())
    }
}

impl PartialEq for BlockRef {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for BlockRef {}

impl Hash for BlockRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (Rc::as_ptr(&self.0) as usize).hash(state);
    }
}

/// A typed graph edge. The edge's target block is stored alongside it in
/// [`InstructionGraph`]'s adjacency map, not inside the edge itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EdgeKind {
    Fallthrough,
    ConditionalTrue,
    ConditionalFalse,
    Jump,
    SwitchCase(i32),
    Exception { exception_class: Option<String> },
}

/// A per-method directed graph of instruction blocks: a unique `Entry`, at
/// most one `Return`, at most one `Rethrow`.
#[derive(Debug, Clone)]
pub struct InstructionGraph {
    entry: BlockRef,
    return_block: Option<BlockRef>,
    rethrow_block: Option<BlockRef>,
    blocks: Vec<BlockRef>,
    edges: FnvHashMap<BlockRef, Vec<(EdgeKind, BlockRef)>>,
}

impl Default for InstructionGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl InstructionGraph {
    pub fn new() -> Self {
        let entry = BlockRef::new(InsnBlock::new("entry", BlockKind::Entry));
        Self {
            blocks: vec![entry.clone()],
            entry,
            return_block: None,
            rethrow_block: None,
            edges: FnvHashMap::default(),
        }
    }

    pub fn entry(&self) -> &BlockRef {
        &self.entry
    }

    pub fn return_block(&self) -> Option<&BlockRef> {
        self.return_block.as_ref()
    }

    pub fn rethrow_block(&self) -> Option<&BlockRef> {
        self.rethrow_block.as_ref()
    }

    pub fn blocks(&self) -> &[BlockRef] {
        &self.blocks
    }

    pub fn edges_from(&self, block: &BlockRef) -> &[(EdgeKind, BlockRef)] {
        self.edges.get(block).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn add_block(&mut self, label: impl Into<String>) -> BlockRef {
        let block = BlockRef::new(InsnBlock::new(label, BlockKind::Normal));
        self.blocks.push(block.clone());
        block
    }

    fn add_edge(&mut self, from: &BlockRef, kind: EdgeKind, to: BlockRef) {
        self.edges.entry(from.clone()).or_default().push((kind, to));
    }

    /// A plain fallthrough edge, with no instruction of its own.
    pub fn fallthrough(&mut self, from: &BlockRef, to: BlockRef) {
        self.add_edge(from, EdgeKind::Fallthrough, to);
    }

    /// Append an unconditional jump to `from` and install the `Jump` edge
    /// to `to`, atomically.
    pub fn jump(&mut self, from: &BlockRef, to: BlockRef) -> Result<()> {
        from.borrow_mut().append(Instruction::Jump, false)?;
        self.add_edge(from, EdgeKind::Jump, to);
        Ok(())
    }

    /// Append a conditional jump to `from` and install both outgoing
    /// branches, atomically.
    pub fn conditional(
        &mut self,
        from: &BlockRef,
        opcode: u8,
        if_true: BlockRef,
        if_false: BlockRef,
    ) -> Result<()> {
        from.borrow_mut()
            .append(Instruction::ConditionalJump { opcode }, false)?;
        self.add_edge(from, EdgeKind::ConditionalTrue, if_true);
        self.add_edge(from, EdgeKind::ConditionalFalse, if_false);
        Ok(())
    }

    /// Install a switch-case edge to `to`, appending the block's `Switch`
    /// instruction the first time this is called for a given block.
    pub fn switch_case(&mut self, from: &BlockRef, label: i32, to: BlockRef) -> Result<()> {
        {
            let mut block = from.borrow_mut();
            if !block.instructions().iter().any(|i| matches!(i, Instruction::Switch)) {
                block.append(Instruction::Switch, false)?;
            }
        }
        self.add_edge(from, EdgeKind::SwitchCase(label), to);
        Ok(())
    }

    /// Append a return instruction to `from` and route control to the
    /// graph's unique return block, creating it on first use.
    pub fn return_(&mut self, from: &BlockRef, opcode: u8) -> Result<()> {
        from.borrow_mut().append(Instruction::Return { opcode }, false)?;
        let target = match &self.return_block {
            Some(b) => b.clone(),
            None => {
                let b = BlockRef::new(InsnBlock::new("return", BlockKind::Return));
                self.blocks.push(b.clone());
                self.return_block = Some(b.clone());
                b
            }
        };
        self.add_edge(from, EdgeKind::Jump, target);
        Ok(())
    }

    /// Append an `athrow` to `from` and route control to the graph's
    /// unique rethrow block, creating it on first use.
    pub fn throw(&mut self, from: &BlockRef) -> Result<()> {
        from.borrow_mut().append(Instruction::Throw, false)?;
        let target = match &self.rethrow_block {
            Some(b) => b.clone(),
            None => {
                let b = BlockRef::new(InsnBlock::new("rethrow", BlockKind::Rethrow));
                self.blocks.push(b.clone());
                self.rethrow_block = Some(b.clone());
                b
            }
        };
        self.add_edge(from, EdgeKind::Jump, target);
        Ok(())
    }

    /// Install an exception edge from `from` to `handler`, with no
    /// instruction of its own (exception edges model control transfer on a
    /// thrown exception raised by any instruction in the block's range).
    pub fn exception_edge(&mut self, from: &BlockRef, handler: BlockRef, exception_class: Option<String>) {
        self.add_edge(from, EdgeKind::Exception { exception_class }, handler);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_append_of_jump_raises_by_default() {
        let mut block = InsnBlock::new("b0", BlockKind::Normal);
        let err = block.append(Instruction::Jump, true).unwrap_err();
        assert!(matches!(err, ClassFileError::IllegalInstruction(_)));
    }

    #[test]
    fn block_append_of_jump_succeeds_with_do_raise_false() {
        let mut block = InsnBlock::new("b0", BlockKind::Normal);
        block.append(Instruction::Jump, false).unwrap();
        assert_eq!(block.instructions().len(), 1);
    }

    #[test]
    fn graph_jump_installs_edge_and_instruction() {
        let mut graph = InstructionGraph::new();
        let source = graph.add_block("b0");
        let target = graph.add_block("b1");
        graph.jump(&source, target.clone()).unwrap();

        assert_eq!(source.borrow().instructions().len(), 1);
        let edges = graph.edges_from(&source);
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].0, EdgeKind::Jump);
        assert_eq!(edges[0].1, target);
    }

    #[test]
    fn entry_block_rejects_instructions() {
        let mut graph = InstructionGraph::new();
        let entry = graph.entry().clone();
        let err = entry
            .borrow_mut()
            .append(Instruction::Generic { opcode: 0, operands: vec![] }, true)
            .unwrap_err();
        assert!(matches!(err, ClassFileError::IllegalInstruction(_)));
    }

    #[test]
    fn return_block_is_unique_across_calls() {
        let mut graph = InstructionGraph::new();
        let b1 = graph.add_block("b1");
        let b2 = graph.add_block("b2");
        graph.return_(&b1, 0xb1).unwrap();
        graph.return_(&b2, 0xac).unwrap();
        assert_eq!(
            graph.edges_from(&b1)[0].1,
            graph.edges_from(&b2)[0].1
        );
    }

    #[test]
    fn return_block_rejects_instructions() {
        let mut graph = InstructionGraph::new();
        let b1 = graph.add_block("b1");
        graph.return_(&b1, 0xb1).unwrap();
        let return_block = graph.return_block().unwrap().clone();
        let err = return_block
            .borrow_mut()
            .append(Instruction::Generic { opcode: 0, operands: vec![] }, true)
            .unwrap_err();
        assert!(matches!(err, ClassFileError::IllegalInstruction(_)));
    }

    #[test]
    fn block_ref_identity_differs_from_structural_equality() {
        let a = BlockRef::new(InsnBlock::new("b0", BlockKind::Normal));
        let b = BlockRef::new(InsnBlock::new("b0", BlockKind::Normal));
        assert_ne!(a, b); // identity: distinct Rc allocations
        assert!(a.structurally_equals(&b)); // same label, kind, instructions
    }

    #[test]
    fn const_handle_rejects_kind_mismatch() {
        let mut pool = ConstantPool::new();
        let idx = pool.add_utf8("hello");
        let err = ConstHandle::new(&pool, idx, ConstKind::Class).unwrap_err();
        assert!(matches!(err, ClassFileError::KindMismatch { .. }));
    }

    #[test]
    fn const_handle_accepts_matching_kind() {
        let mut pool = ConstantPool::new();
        let idx = pool.add_class("java/lang/Object");
        let handle = ConstHandle::new(&pool, idx, ConstKind::Class).unwrap();
        assert_eq!(handle.index, idx);
    }
}
