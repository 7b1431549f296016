use std::fmt;

/// Which side of an instruction a [`Point`] sits on
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Offset {
    Before,
    After,
}

/// Position immediately before or after one element of a method body
///
/// Points are ordered by instruction index, then by side. `after(i)` and `before(i + 1)` name the
/// same gap in the code, but they are distinct points and `after(i) < before(i + 1)`.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Point {
    index: usize,
    offset: Offset,
}

impl Point {
    pub const fn new(index: usize, offset: Offset) -> Point {
        Point { index, offset }
    }

    pub const fn before(index: usize) -> Point {
        Point::new(index, Offset::Before)
    }

    pub const fn after(index: usize) -> Point {
        Point::new(index, Offset::After)
    }

    pub const fn index(&self) -> usize {
        self.index
    }

    pub const fn offset(&self) -> Offset {
        self.offset
    }

    /// Dense position of this point in a walk visiting `before(0), after(0), before(1), ...`
    pub(crate) const fn ordinal(&self) -> usize {
        match self.offset {
            Offset::Before => 2 * self.index,
            Offset::After => 2 * self.index + 1,
        }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.offset {
            Offset::Before => write!(f, "before #{}", self.index),
            Offset::After => write!(f, "after #{}", self.index),
        }
    }
}

impl fmt::Debug for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
