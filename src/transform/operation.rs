use crate::code::{CodeBlock, MethodLike, Offset, Point, Timing};
use crate::jvm::{Conflict, ConflictKind, ConflictSide, Error, UnqualifiedName};
use crate::transform::{Id, MethodNames, Settings};
use std::fmt;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Insertion,
    Replacement,
    Extraction,
}

/// Code inserted at a point
pub struct Insertion {
    pub owner: Id,
    pub point: Point,
    pub timing: Timing,
    pub code: Box<dyn CodeBlock>,
}

/// Range of code swapped out for generated code
pub struct Replacement {
    pub owner: Id,
    pub start: Point,
    pub end: Point,
    pub code: Box<dyn CodeBlock>,
}

/// Range of code moved into a new method, and wrapped by generated code at the call site
pub struct Extraction {
    pub owner: Id,
    pub start: Point,
    pub end: Point,

    /// Name of the generated method
    pub name: UnqualifiedName,

    /// Stack effect of the extracted range
    pub delta: MethodLike,

    pub timing: Timing,

    /// Code run at the call site, with the bound operation on top of the stack
    pub code: Box<dyn CodeBlock>,
}

pub enum Operation {
    Insertion(Insertion),
    Replacement(Replacement),
    Extraction(Extraction),
}

impl Operation {
    pub fn owner(&self) -> &Id {
        match self {
            Operation::Insertion(insertion) => &insertion.owner,
            Operation::Replacement(replacement) => &replacement.owner,
            Operation::Extraction(extraction) => &extraction.owner,
        }
    }

    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::Insertion(_) => OperationKind::Insertion,
            Operation::Replacement(_) => OperationKind::Replacement,
            Operation::Extraction(_) => OperationKind::Extraction,
        }
    }

    /// Start and end of the affected range (the same point for insertions)
    pub fn range(&self) -> (Point, Point) {
        match self {
            Operation::Insertion(insertion) => (insertion.point, insertion.point),
            Operation::Replacement(replacement) => (replacement.start, replacement.end),
            Operation::Extraction(extraction) => (extraction.start, extraction.end),
        }
    }

    /// Replacements have no timing tier of their own and sort as `Default`
    pub fn timing(&self) -> Timing {
        match self {
            Operation::Insertion(insertion) => insertion.timing,
            Operation::Replacement(_) => Timing::Default,
            Operation::Extraction(extraction) => extraction.timing,
        }
    }

    pub fn code(&self) -> &dyn CodeBlock {
        match self {
            Operation::Insertion(insertion) => insertion.code.as_ref(),
            Operation::Replacement(replacement) => replacement.code.as_ref(),
            Operation::Extraction(extraction) => extraction.code.as_ref(),
        }
    }

    fn side(&self) -> ConflictSide {
        let (start, end) = self.range();
        ConflictSide {
            owner: self.owner().clone(),
            kind: self.kind(),
            start,
            end,
        }
    }
}

impl fmt::Debug for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (start, end) = self.range();
        f.debug_struct("Operation")
            .field("kind", &self.kind())
            .field("owner", self.owner())
            .field("start", &start)
            .field("end", &end)
            .field("timing", &self.timing())
            .finish()
    }
}

/// Every operation requested for one method body in one rewrite pass
pub struct Operations {
    operations: Vec<Operation>,
    method_names: MethodNames,
}

impl Operations {
    pub fn new(settings: &Settings) -> Operations {
        Operations::with_method_names(MethodNames::new(settings.generated_method_prefix.clone()))
    }

    /// Operations whose generated methods avoid the given names
    pub fn with_method_names(method_names: MethodNames) -> Operations {
        Operations {
            operations: vec![],
            method_names,
        }
    }

    pub fn method_names(&self) -> &MethodNames {
        &self.method_names
    }

    /// Recover the names handed out, to carry them on to the next method of the same class
    pub fn into_method_names(self) -> MethodNames {
        self.method_names
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Operations in registration order
    pub fn iter(&self) -> impl Iterator<Item = &Operation> {
        self.operations.iter()
    }

    pub(crate) fn push(&mut self, operation: Operation) {
        log::trace!("Registered {:?}", operation);
        self.operations.push(operation);
    }

    pub(crate) fn create_unique_name(
        &mut self,
        purpose: &str,
        owner: &Id,
    ) -> Result<UnqualifiedName, Error> {
        self.method_names.create_unique(purpose, owner)
    }

    /// Check every pair of operations against each other, reporting the first conflict
    ///
    /// The earlier-registered operation is the first side of the conflict.
    pub fn check_conflicts(&self) -> Result<(), Conflict> {
        for (i, first) in self.operations.iter().enumerate() {
            for second in &self.operations[i + 1..] {
                if let Some(kind) = conflict_kind(first, second) {
                    return Err(Conflict {
                        kind,
                        first: first.side(),
                        second: second.side(),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Range between two points, used for the conflict rules
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
struct Range {
    start: Point,
    end: Point,
}

impl Range {
    fn of(operation: &Operation) -> Range {
        let (start, end) = operation.range();
        Range { start, end }
    }

    fn strictly_contains(&self, point: Point) -> bool {
        self.start < point && point < self.end
    }

    /// Whether some element lies entirely inside both ranges
    fn shares_instruction(&self, other: &Range) -> bool {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        let first_inside = match start.offset() {
            Offset::Before => start.index(),
            Offset::After => start.index() + 1,
        };
        Point::after(first_inside) <= end
    }

    /// Whether an end of either range falls strictly inside the other
    fn straddles(&self, other: &Range) -> bool {
        self.strictly_contains(other.start)
            || self.strictly_contains(other.end)
            || other.strictly_contains(self.start)
            || other.strictly_contains(self.end)
    }

    /// Exactly one end of `other` is strictly inside this range
    fn partially_contains(&self, other: &Range) -> bool {
        self.strictly_contains(other.start) != self.strictly_contains(other.end)
    }
}

fn conflict_kind(first: &Operation, second: &Operation) -> Option<ConflictKind> {
    let a = Range::of(first);
    let b = Range::of(second);
    let overlapping = || a == b || a.shares_instruction(&b) || a.straddles(&b);
    match (first, second) {
        (Operation::Insertion(_), _) | (_, Operation::Insertion(_)) => None,
        (Operation::Replacement(_), Operation::Replacement(_)) if overlapping() => {
            Some(ConflictKind::OverlappingReplacements)
        }
        (Operation::Replacement(_), Operation::Extraction(_))
        | (Operation::Extraction(_), Operation::Replacement(_))
            if overlapping() =>
        {
            Some(ConflictKind::ReplacedExtraction)
        }
        (Operation::Extraction(_), Operation::Extraction(_))
            if a.partially_contains(&b) || b.partially_contains(&a) =>
        {
            Some(ConflictKind::PartiallyOverlappingExtractions)
        }
        _ => None,
    }
}
