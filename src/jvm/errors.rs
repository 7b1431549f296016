use crate::code::{Label, Point};
use crate::transform::{Id, OperationKind};
use std::fmt;

#[derive(Debug)]
pub enum Error {
    /// Two local variable entries claim the same slot at one point (malformed scope metadata)
    DuplicateLocalInScope { slot: u16, point: Point },

    /// Scope metadata refers to a label which is not placed in the method body
    UnknownLabel(Label),

    /// A range was requested whose end is strictly before its start
    InvalidRange { start: Point, end: Point },

    /// Two operations cannot both be applied
    Conflict(Conflict),

    /// An extraction was requested for a range whose stack effect cannot be marshalled
    UnsupportedShape { owner: Id, reason: String },

    MalformedName(String),
    BadDescriptor(String),

    /// The rewritten code needs more local variable slots than a method can have
    LocalsOverflow,

    /// An error annotated with context by an outer layer
    Detailed {
        details: Vec<(String, String)>,
        source: Box<Error>,
    },
}

impl Error {
    /// Attach a named piece of context to this error
    ///
    /// Annotating an already annotated error adds to its details instead of wrapping it again.
    pub fn with_detail(self, name: impl Into<String>, value: impl fmt::Display) -> Error {
        let detail = (name.into(), value.to_string());
        match self {
            Error::Detailed {
                mut details,
                source,
            } => {
                details.push(detail);
                Error::Detailed { details, source }
            }
            other => Error::Detailed {
                details: vec![detail],
                source: Box::new(other),
            },
        }
    }

    /// The conflict behind this error, looking through any annotations
    pub fn conflict(&self) -> Option<&Conflict> {
        match self {
            Error::Conflict(conflict) => Some(conflict),
            Error::Detailed { source, .. } => source.conflict(),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::DuplicateLocalInScope { slot, point } => {
                write!(f, "multiple local variables in slot {} at {}", slot, point)
            }
            Error::UnknownLabel(label) => write!(f, "label {:?} is not in the method body", label),
            Error::InvalidRange { start, end } => {
                write!(f, "range end {} is before its start {}", end, start)
            }
            Error::Conflict(conflict) => fmt::Display::fmt(conflict, f),
            Error::UnsupportedShape { owner, reason } => {
                write!(f, "unsupported extraction requested by {}: {}", owner, reason)
            }
            Error::MalformedName(msg) => write!(f, "malformed name: {}", msg),
            Error::BadDescriptor(msg) => write!(f, "bad descriptor: {}", msg),
            Error::LocalsOverflow => f.write_str("too many local variables"),
            Error::Detailed { details, source } => {
                fmt::Display::fmt(source, f)?;
                for (name, value) in details {
                    write!(f, "\n  {}: {}", name, value)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Detailed { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Error {
        Error::BadDescriptor(err.to_string())
    }
}

impl From<Conflict> for Error {
    fn from(conflict: Conflict) -> Error {
        Error::Conflict(conflict)
    }
}

/// Two operations whose ranges interact in a way that cannot be merged
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Conflict {
    pub kind: ConflictKind,
    pub first: ConflictSide,
    pub second: ConflictSide,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ConflictKind {
    /// Two replacements touch at least one common instruction
    OverlappingReplacements,

    /// A replacement and an extraction touch at least one common instruction
    ReplacedExtraction,

    /// Exactly one end of one extraction falls inside another
    PartiallyOverlappingExtractions,
}

/// One of the operations involved in a [`Conflict`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConflictSide {
    pub owner: Id,
    pub kind: OperationKind,
    pub start: Point,
    pub end: Point,
}

impl Conflict {
    /// Whether the given owner is one of the two sides
    pub fn involves(&self, owner: &Id) -> bool {
        self.first.owner == *owner || self.second.owner == *owner
    }
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let what = match self.kind {
            ConflictKind::OverlappingReplacements => "overlapping replacements",
            ConflictKind::ReplacedExtraction => "replacement overlaps an extraction",
            ConflictKind::PartiallyOverlappingExtractions => "partially overlapping extractions",
        };
        write!(f, "conflict ({}) between {} and {}", what, self.first, self.second)
    }
}

impl fmt::Display for ConflictSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?} by {} over [{}, {}]",
            self.kind, self.owner, self.start, self.end
        )
    }
}
