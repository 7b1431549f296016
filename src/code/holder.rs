use crate::code::{
    CodeElement, FreshLabels, Instruction, Label, LocalVariables, Point, SelectionBuilder,
};
use crate::jvm::{BinaryName, Error, MethodDescriptor, RenderDescriptor, UnqualifiedName};
use crate::transform::Id;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;

/// Method whose body is being rewritten
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MethodContext {
    pub class: BinaryName,
    pub name: UnqualifiedName,
    pub descriptor: MethodDescriptor,
    pub is_static: bool,
}

impl MethodContext {
    /// Local variable slots taken up by the parameters, including `this`
    pub fn parameter_slots(&self) -> u16 {
        self.descriptor.parameter_length(!self.is_static)
    }
}

impl fmt::Display for MethodContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}{}", self.class, self.name, self.descriptor.render())
    }
}

/// Method body captured for one rewrite pass
///
/// The elements are never modified. Every element (including labels and other metadata) is
/// addressed by its index, which is what [`Point`]s and [`InstructionHolder`]s refer to.
#[derive(Debug)]
pub struct TransformableCode {
    method: MethodContext,
    elements: Vec<CodeElement>,
    max_locals: u16,
    labels: HashMap<Label, usize>,
    locals: Option<LocalVariables>,
}

impl TransformableCode {
    pub fn new(
        method: MethodContext,
        elements: Vec<CodeElement>,
        max_locals: u16,
    ) -> Result<TransformableCode, Error> {
        let mut labels = HashMap::new();
        let mut used_locals = max_locals.max(method.parameter_slots());
        for (index, element) in elements.iter().enumerate() {
            if let Some(label) = element.placed_label() {
                labels.entry(label).or_insert(index);
            }
            if let Some((slot, kind, _)) = element.as_instruction().and_then(Instruction::local_access) {
                let end = slot.checked_add(kind.width()).ok_or(Error::LocalsOverflow)?;
                used_locals = used_locals.max(end);
            }
        }
        let locals = LocalVariables::build(&method, &elements, &labels)?;

        Ok(TransformableCode {
            method,
            elements,
            max_locals: used_locals,
            labels,
            locals,
        })
    }

    pub fn method(&self) -> &MethodContext {
        &self.method
    }

    pub fn elements(&self) -> &[CodeElement] {
        &self.elements
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Number of local variable slots used by the original body
    pub fn max_locals(&self) -> u16 {
        self.max_locals
    }

    /// Scope index, if the body has any scope metadata
    pub fn locals(&self) -> Option<&LocalVariables> {
        self.locals.as_ref()
    }

    pub fn get(&self, index: usize) -> Option<InstructionHolder<'_>> {
        if index < self.elements.len() {
            Some(InstructionHolder { code: self, index })
        } else {
            None
        }
    }

    pub fn first(&self) -> Option<InstructionHolder<'_>> {
        self.get(0)
    }

    pub fn last(&self) -> Option<InstructionHolder<'_>> {
        self.elements.len().checked_sub(1).and_then(|index| self.get(index))
    }

    pub fn holders(&self) -> impl Iterator<Item = InstructionHolder<'_>> + '_ {
        (0..self.elements.len()).map(move |index| InstructionHolder { code: self, index })
    }

    /// Element placing a given label
    pub fn find_label(&self, label: Label) -> Option<InstructionHolder<'_>> {
        self.labels.get(&label).and_then(|index| self.get(*index))
    }

    /// Label generator which won't collide with any label in this body
    pub fn fresh_labels(&self) -> FreshLabels {
        FreshLabels::after(self.labels.keys())
    }

    /// Start building selections on behalf of an owner
    pub fn select(&self, owner: Id) -> SelectionBuilder<'_> {
        SelectionBuilder::new(self, owner)
    }
}

/// View of one element of a [`TransformableCode`]
#[derive(Copy, Clone)]
pub struct InstructionHolder<'a> {
    code: &'a TransformableCode,
    index: usize,
}

impl<'a> InstructionHolder<'a> {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn code(&self) -> &'a TransformableCode {
        self.code
    }

    pub fn element(&self) -> &'a CodeElement {
        &self.code.elements[self.index]
    }

    /// Underlying instruction, unless this is a metadata element
    pub fn instruction(&self) -> Option<&'a Instruction> {
        self.element().as_instruction()
    }

    pub fn before(&self) -> Point {
        Point::before(self.index)
    }

    pub fn after(&self) -> Point {
        Point::after(self.index)
    }

    pub fn next(&self) -> Option<InstructionHolder<'a>> {
        self.code.get(self.index + 1)
    }

    pub fn previous(&self) -> Option<InstructionHolder<'a>> {
        self.index.checked_sub(1).and_then(|index| self.code.get(index))
    }

    /// Every element preceding this one, nearest first
    pub fn preceding(&self) -> impl Iterator<Item = InstructionHolder<'a>> + 'a {
        let code = self.code;
        (0..self.index).rev().map(move |index| InstructionHolder { code, index })
    }

    /// Every element following this one, nearest first
    pub fn following(&self) -> impl Iterator<Item = InstructionHolder<'a>> + 'a {
        let code = self.code;
        (self.index + 1..code.len()).map(move |index| InstructionHolder { code, index })
    }
}

impl PartialEq for InstructionHolder<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.code, other.code) && self.index == other.index
    }
}

impl Eq for InstructionHolder<'_> {}

impl PartialOrd for InstructionHolder<'_> {
    /// Holders of different bodies are unordered
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if std::ptr::eq(self.code, other.code) {
            Some(self.index.cmp(&other.index))
        } else {
            None
        }
    }
}

impl fmt::Debug for InstructionHolder<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {:?}", self.index, self.element())
    }
}
