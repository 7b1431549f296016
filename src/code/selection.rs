use crate::code::{
    CodeBuilder, InstructionHolder, Offset, Point, StackDelta, TransformableCode,
};
use crate::jvm::{Error, UnqualifiedName};
use crate::transform::{Extraction, Id, Insertion, Operation, Operations, Replacement};

/// Relative ordering tier of operations anchored at the same place
///
/// Among insertions at one point, earlier tiers are emitted first.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Timing {
    Early,
    Default,
    Late,
}

impl Default for Timing {
    fn default() -> Timing {
        Timing::Default
    }
}

/// Range between two points of a method body, to which operations are attached
///
/// A selection is just a description: attaching an operation records it in an [`Operations`]
/// set and leaves the selection untouched.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Selection {
    owner: Id,
    start: Point,
    end: Point,
    timing: Timing,
}

impl Selection {
    fn new(owner: Id, start: Point, end: Point, timing: Timing) -> Selection {
        debug_assert!(start <= end, "selection end {} is before start {}", end, start);
        Selection {
            owner,
            start,
            end,
            timing,
        }
    }

    pub fn owner(&self) -> &Id {
        &self.owner
    }

    pub fn start(&self) -> Point {
        self.start
    }

    pub fn end(&self) -> Point {
        self.end
    }

    pub fn timing(&self) -> Timing {
        self.timing
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Same range, at a different timing tier
    pub fn timed(&self, timing: Timing) -> Selection {
        Selection {
            timing,
            ..self.clone()
        }
    }

    /// Whether a point lies between the start and end of this selection
    pub fn contains(&self, point: Point, start_inclusive: bool, end_inclusive: bool) -> bool {
        let after_start = if start_inclusive {
            self.start <= point
        } else {
            self.start < point
        };
        let before_end = if end_inclusive {
            point <= self.end
        } else {
            point < self.end
        };
        after_start && before_end
    }

    /// Whether an element lies entirely within this selection
    pub fn contains_instruction(&self, instruction: InstructionHolder<'_>) -> bool {
        self.start <= instruction.before() && instruction.after() <= self.end
    }

    /// Insert code at the start (`Before`) or end (`After`) of this selection
    pub fn insert<F>(&self, operations: &mut Operations, offset: Offset, code: F)
    where
        F: Fn(&mut CodeBuilder<'_>) -> Result<(), Error> + 'static,
    {
        let point = match offset {
            Offset::Before => self.start,
            Offset::After => self.end,
        };
        operations.push(Operation::Insertion(Insertion {
            owner: self.owner.clone(),
            point,
            timing: self.timing,
            code: Box::new(code),
        }));
    }

    pub fn insert_before<F>(&self, operations: &mut Operations, code: F)
    where
        F: Fn(&mut CodeBuilder<'_>) -> Result<(), Error> + 'static,
    {
        self.insert(operations, Offset::Before, code)
    }

    pub fn insert_after<F>(&self, operations: &mut Operations, code: F)
    where
        F: Fn(&mut CodeBuilder<'_>) -> Result<(), Error> + 'static,
    {
        self.insert(operations, Offset::After, code)
    }

    /// Replace everything in this selection with generated code
    pub fn replace<F>(&self, operations: &mut Operations, code: F)
    where
        F: Fn(&mut CodeBuilder<'_>) -> Result<(), Error> + 'static,
    {
        operations.push(Operation::Replacement(Replacement {
            owner: self.owner.clone(),
            start: self.start,
            end: self.end,
            code: Box::new(code),
        }));
    }

    /// Move everything in this selection into a new generated method
    ///
    /// At the call site, `code` runs with the stack as it was at the start of the selection,
    /// plus an instance of the operation interface on top. Invoking that operation with the
    /// popped values packed into an `Object[]` runs the original code, returning its boxed result.
    /// When `code` is done, the stack must look as it did at the end of the selection.
    ///
    /// Locals which are live when the selection starts stay usable from the extracted code.
    /// Returns the name of the generated method.
    pub fn extract<F>(
        &self,
        operations: &mut Operations,
        name: &str,
        delta: StackDelta,
        code: F,
    ) -> Result<UnqualifiedName, Error>
    where
        F: Fn(&mut CodeBuilder<'_>) -> Result<(), Error> + 'static,
    {
        let delta = delta
            .into_method_like()
            .map_err(|delta| Error::UnsupportedShape {
                owner: self.owner.clone(),
                reason: format!("extracted code pushes {} values", delta.pushed_count()),
            })?;
        let name = operations.create_unique_name(name, &self.owner)?;
        operations.push(Operation::Extraction(Extraction {
            owner: self.owner.clone(),
            start: self.start,
            end: self.end,
            name: name.clone(),
            delta,
            timing: self.timing,
            code: Box::new(code),
        }));
        Ok(name)
    }
}

/// Creates selections over one method body on behalf of one owner
pub struct SelectionBuilder<'a> {
    code: &'a TransformableCode,
    owner: Id,
    timing: Timing,
}

impl<'a> SelectionBuilder<'a> {
    pub fn new(code: &'a TransformableCode, owner: Id) -> SelectionBuilder<'a> {
        SelectionBuilder {
            code,
            owner,
            timing: Timing::Default,
        }
    }

    /// Timing tier given to selections created from now on
    pub fn timed(mut self, timing: Timing) -> SelectionBuilder<'a> {
        self.timing = timing;
        self
    }

    fn selection(&self, start: Point, end: Point) -> Selection {
        Selection::new(self.owner.clone(), start, end, self.timing)
    }

    /// Just the one element
    pub fn only(&self, instruction: InstructionHolder<'_>) -> Selection {
        self.selection(instruction.before(), instruction.after())
    }

    /// Empty selection right before an element
    pub fn before(&self, instruction: InstructionHolder<'_>) -> Selection {
        self.at(instruction.before())
    }

    /// Empty selection right after an element
    pub fn after(&self, instruction: InstructionHolder<'_>) -> Selection {
        self.at(instruction.after())
    }

    pub fn at(&self, point: Point) -> Selection {
        self.selection(point, point)
    }

    /// First element of the body, if there is one
    pub fn head(&self) -> Option<Selection> {
        self.code.first().map(|first| self.only(first))
    }

    /// Last element of the body, if there is one
    pub fn tail(&self) -> Option<Selection> {
        self.code.last().map(|last| self.only(last))
    }

    /// Start an arbitrary range
    pub fn from(&self, start: Point) -> WithStart {
        WithStart {
            owner: self.owner.clone(),
            timing: self.timing,
            start,
        }
    }
}

/// Range which still needs an end
pub struct WithStart {
    owner: Id,
    timing: Timing,
    start: Point,
}

impl WithStart {
    pub fn to(self, end: Point) -> Result<Selection, Error> {
        if end < self.start {
            return Err(Error::InvalidRange {
                start: self.start,
                end,
            });
        }
        Ok(Selection::new(self.owner, self.start, end, self.timing))
    }
}
