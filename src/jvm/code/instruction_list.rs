use super::{Instruction, ProgramCounter};

/// A position marker in an [`InstructionList`].
///
/// Labels of decoded code are named after the offset of the instruction they precede, so they
/// stay meaningful in diagnostics. Labels created later are numbered above the range of valid
/// offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, derive_more::Display)]
#[display("L{_0}")]
pub struct Label(u32);

impl Label {
    const FIRST_SYNTHETIC: u32 = 1 << 16;

    /// The label marking the instruction at `pc` in decoded code.
    #[must_use]
    pub fn at(pc: ProgramCounter) -> Self {
        Self(u32::from(u16::from(pc)))
    }

    /// Gets the offset this label had in the decoded code, or `None` for labels created later.
    #[must_use]
    pub fn original_pc(&self) -> Option<ProgramCounter> {
        u16::try_from(self.0).ok().map(ProgramCounter::from)
    }
}

/// A node of an [`InstructionList`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// A label marking the position of the following instruction.
    Label(Label),
    /// An instruction.
    Instruction(Instruction),
}

/// The code of a method as a sequence of instructions interleaved with [`Label`]s.
///
/// Positions taken and returned by the query and insertion methods count instructions only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstructionList {
    nodes: Vec<Node>,
    next_label: u32,
}

/// The position passed to an insertion is past the end of the list.
#[derive(Debug, thiserror::Error)]
#[error("Instruction position {position} is out of bounds for a list of {len} instructions")]
pub struct PositionOutOfBounds {
    /// The requested position.
    pub position: usize,
    /// The number of instructions in the list.
    pub len: usize,
}

impl InstructionList {
    /// Creates an empty list.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            nodes: Vec::new(),
            next_label: Label::FIRST_SYNTHETIC,
        }
    }

    /// Allocates a label that is not used anywhere in the list yet.
    pub fn new_label(&mut self) -> Label {
        let label = Label(self.next_label);
        self.next_label += 1;
        label
    }

    /// Appends an instruction.
    pub fn push(&mut self, insn: Instruction) {
        self.nodes.push(Node::Instruction(insn));
    }

    /// Appends a label.
    pub fn push_label(&mut self, label: Label) {
        self.nodes.push(Node::Label(label));
    }

    /// Gets the nodes of the list.
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Gets the number of instructions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// Checks whether the list contains no instructions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    /// Iterates over the instructions, skipping labels.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Instruction> {
        self.nodes.iter().filter_map(|node| match node {
            Node::Instruction(insn) => Some(insn),
            Node::Label(_) => None,
        })
    }

    /// Gets the instruction at `position`.
    #[must_use]
    pub fn get(&self, position: usize) -> Option<&Instruction> {
        self.iter().nth(position)
    }

    /// Finds the first instruction satisfying `predicate`.
    pub fn position<P>(&self, predicate: P) -> Option<usize>
    where
        P: FnMut(&Instruction) -> bool,
    {
        self.position_from(0, predicate)
    }

    /// Finds the first instruction at or after `start` satisfying `predicate`.
    pub fn position_from<P>(&self, start: usize, mut predicate: P) -> Option<usize>
    where
        P: FnMut(&Instruction) -> bool,
    {
        self.iter()
            .enumerate()
            .skip(start)
            .find_map(|(pos, insn)| predicate(insn).then_some(pos))
    }

    /// Finds all the instructions satisfying `predicate`, in ascending order.
    pub fn positions<P>(&self, mut predicate: P) -> Vec<usize>
    where
        P: FnMut(&Instruction) -> bool,
    {
        self.iter()
            .enumerate()
            .filter_map(|(pos, insn)| predicate(insn).then_some(pos))
            .collect()
    }

    /// Inserts `insns` right before the instruction at `position`.
    ///
    /// The inserted code goes after any label marking that instruction, so control transfers to
    /// the instruction run the inserted code first.
    /// # Errors
    /// - [`PositionOutOfBounds`] if there is no instruction at `position`.
    pub fn insert_before<I>(&mut self, position: usize, insns: I) -> Result<(), PositionOutOfBounds>
    where
        I: IntoIterator<Item = Instruction>,
    {
        let node_index = self.node_index(position)?;
        self.splice_at(node_index, insns);
        Ok(())
    }

    /// Inserts `insns` right after the instruction at `position`.
    ///
    /// The inserted code goes before any label marking the next instruction, so control
    /// transfers to the next instruction skip it.
    /// # Errors
    /// - [`PositionOutOfBounds`] if there is no instruction at `position`.
    pub fn insert_after<I>(&mut self, position: usize, insns: I) -> Result<(), PositionOutOfBounds>
    where
        I: IntoIterator<Item = Instruction>,
    {
        let node_index = self.node_index(position)?;
        self.splice_at(node_index + 1, insns);
        Ok(())
    }

    fn splice_at<I>(&mut self, node_index: usize, insns: I)
    where
        I: IntoIterator<Item = Instruction>,
    {
        self.nodes.splice(
            node_index..node_index,
            insns.into_iter().map(Node::Instruction),
        );
    }

    fn node_index(&self, position: usize) -> Result<usize, PositionOutOfBounds> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| matches!(node, Node::Instruction(_)))
            .nth(position)
            .map(|(idx, _)| idx)
            .ok_or_else(|| PositionOutOfBounds {
                position,
                len: self.len(),
            })
    }
}

impl Default for InstructionList {
    fn default() -> Self {
        Self::new()
    }
}

impl FromIterator<Instruction> for InstructionList {
    fn from_iter<T: IntoIterator<Item = Instruction>>(iter: T) -> Self {
        let mut list = Self::new();
        list.nodes
            .extend(iter.into_iter().map(Node::Instruction));
        list
    }
}

impl FromIterator<Node> for InstructionList {
    fn from_iter<T: IntoIterator<Item = Node>>(iter: T) -> Self {
        let mut list = Self::new();
        list.nodes.extend(iter);
        list
    }
}
