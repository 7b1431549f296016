use crate::code::{generate, Allocator, CodeElement, Point, TransformableCode};
use crate::jvm::Error;
use crate::transform::extractor::{locals_used, Extractor};
use crate::transform::{Extraction, GeneratedMethod, Operation, Operations, Settings};
use std::cmp::Reverse;
use std::collections::BTreeMap;

/// Method body after all operations have been applied
#[derive(Debug)]
pub struct Rewritten {
    pub elements: Vec<CodeElement>,

    /// Locals used by the rewritten body, including any introduced by generated code
    pub max_locals: u16,

    /// Methods to add to the class, one per extraction
    pub generated: Vec<GeneratedMethod>,
}

/// Apply a whole set of operations to a method body in a single pass
///
/// Conflicts are checked before anything is generated, so a failed application produces no
/// partial output. Operations which don't overlap can be registered in any order: the result only
/// depends on positions, timings, and (for ties) registration order.
pub fn apply_operations(
    code: &TransformableCode,
    operations: &Operations,
    settings: &Settings,
) -> Result<Rewritten, Error> {
    if operations.is_empty() {
        return Ok(Rewritten {
            elements: code.elements().to_vec(),
            max_locals: code.max_locals(),
            generated: vec![],
        });
    }

    log::debug!("Applying {} operations to {}", operations.len(), code.method());
    operations.check_conflicts()?;
    let schedule = Schedule::new(code, operations)?;

    let mut applicator = Applicator {
        code,
        settings,
        allocator: Allocator::new(code.max_locals(), code.fresh_labels()),
        output: vec![],
        frames: vec![],
        generated: vec![],
    };
    for (index, element) in code.elements().iter().enumerate() {
        applicator.visit_point(Point::before(index), &schedule)?;
        if !applicator.replacing() {
            applicator.emit(element.clone());
        }
        applicator.visit_point(Point::after(index), &schedule)?;
    }
    debug_assert!(applicator.frames.is_empty(), "unclosed ranges after last element");

    let max_locals = locals_used(&applicator.output)?.max(code.max_locals());
    log::debug!(
        "Rewrote {} into {} elements with {} generated methods",
        code.method(),
        applicator.output.len(),
        applicator.generated.len()
    );
    Ok(Rewritten {
        elements: applicator.output,
        max_locals,
        generated: applicator.generated,
    })
}

/// Everything that happens at one point, already in the order it must happen
#[derive(Default)]
struct PointEvents<'o> {
    insertions: Vec<&'o Operation>,

    /// Ranges starting here and covering at least one element, outermost first
    opening: Vec<&'o Operation>,

    /// Ranges starting and ending here
    empty: Vec<&'o Operation>,
}

struct Schedule<'o> {
    points: BTreeMap<Point, PointEvents<'o>>,
}

impl<'o> Schedule<'o> {
    fn new(code: &TransformableCode, operations: &'o Operations) -> Result<Schedule<'o>, Error> {
        let mut points: BTreeMap<Point, PointEvents<'o>> = BTreeMap::new();
        let mut ranges: Vec<(usize, &'o Operation)> = vec![];
        for (registration, operation) in operations.iter().enumerate() {
            let (start, end) = operation.range();
            if start.index() >= code.len() || end.index() >= code.len() {
                let err = Error::InvalidRange { start, end };
                return Err(err.with_detail("owner", operation.owner()));
            }
            log::trace!("Scheduling {:?}", operation);
            match operation {
                Operation::Insertion(_) => {
                    points.entry(start).or_default().insertions.push(operation)
                }
                _ => ranges.push((registration, operation)),
            }
        }

        // Ranges sharing an end nest with the later timing, then the later registration, outermost
        ranges.sort_by_key(|(registration, operation)| {
            (Reverse(operation.range().1), Reverse(operation.timing()), Reverse(*registration))
        });
        for (_, operation) in ranges {
            let (start, end) = operation.range();
            let events = points.entry(start).or_default();
            if start == end {
                events.empty.push(operation);
            } else {
                events.opening.push(operation);
            }
        }
        // Stable, so registration order is kept within a timing tier
        for events in points.values_mut() {
            events.insertions.sort_by_key(|operation| operation.timing());
            events.empty.reverse();
        }

        Ok(Schedule { points })
    }
}

enum Frame<'a> {
    Replacement { end: Point },
    Extraction { end: Point, extractor: Extractor<'a> },
}

impl Frame<'_> {
    fn end(&self) -> Point {
        match self {
            Frame::Replacement { end } | Frame::Extraction { end, .. } => *end,
        }
    }
}

struct Applicator<'a> {
    code: &'a TransformableCode,
    settings: &'a Settings,
    allocator: Allocator,

    /// Output of the rewritten body, outside of any extraction
    output: Vec<CodeElement>,

    /// Ranges currently open, innermost last
    frames: Vec<Frame<'a>>,

    generated: Vec<GeneratedMethod>,
}

impl<'a> Applicator<'a> {
    fn replacing(&self) -> bool {
        matches!(self.frames.last(), Some(Frame::Replacement { .. }))
    }

    /// Send code to wherever it currently goes: the innermost extraction or the output
    fn emit(&mut self, element: CodeElement) {
        match self.innermost_extractor() {
            Some(extractor) => extractor.intercept(element),
            None => self.output.push(element),
        }
    }

    fn emit_all(&mut self, elements: Vec<CodeElement>) {
        match self.innermost_extractor() {
            Some(extractor) => extractor.intercept_all(elements),
            None => self.output.extend(elements),
        }
    }

    fn innermost_extractor(&mut self) -> Option<&mut Extractor<'a>> {
        self.frames.iter_mut().rev().find_map(|frame| match frame {
            Frame::Extraction { extractor, .. } => Some(extractor),
            Frame::Replacement { .. } => None,
        })
    }

    fn visit_point(&mut self, point: Point, schedule: &Schedule<'a>) -> Result<(), Error> {
        while self.frames.last().map_or(false, |frame| frame.end() == point) {
            if let Some(Frame::Extraction { extractor, .. }) = self.frames.pop() {
                self.finish_extraction(extractor)?;
            }
        }

        let events = match schedule.points.get(&point) {
            Some(events) => events,
            None => return Ok(()),
        };

        for operation in events.insertions.iter().copied() {
            if self.replacing() {
                log::warn!(
                    "{} inserts code {} which is being replaced, it will still be emitted",
                    operation.owner(),
                    point
                );
            }
            let generated = generate(operation.code(), &mut self.allocator)?;
            self.emit_all(generated);
        }

        for operation in events.opening.iter().copied() {
            let (_, end) = operation.range();
            match operation {
                Operation::Replacement(replacement) => {
                    let generated = generate(replacement.code.as_ref(), &mut self.allocator)?;
                    self.emit_all(generated);
                    self.frames.push(Frame::Replacement { end });
                }
                Operation::Extraction(extraction) => {
                    let extractor = self.extractor(extraction);
                    self.frames.push(Frame::Extraction { end, extractor });
                }
                Operation::Insertion(_) => {}
            }
        }

        for operation in events.empty.iter().copied() {
            match operation {
                Operation::Replacement(replacement) => {
                    let generated = generate(replacement.code.as_ref(), &mut self.allocator)?;
                    self.emit_all(generated);
                }
                Operation::Extraction(extraction) => {
                    let extractor = self.extractor(extraction);
                    self.finish_extraction(extractor)?;
                }
                Operation::Insertion(_) => {}
            }
        }

        Ok(())
    }

    fn extractor(&self, extraction: &'a Extraction) -> Extractor<'a> {
        Extractor::new(self.code, extraction, self.settings)
    }

    fn finish_extraction(&mut self, extractor: Extractor<'a>) -> Result<(), Error> {
        let owner = extractor.extraction().owner.clone();
        let (call_site, method) = extractor
            .finish(&mut self.allocator)
            .map_err(|err| err.with_detail("extraction owner", owner))?;
        self.emit_all(call_site);
        self.generated.push(method);
        Ok(())
    }
}
