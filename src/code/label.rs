use std::fmt;

/// Opaque label
///
/// Labels only mark positions: placing one is done with [`crate::code::Pseudo::Label`], and
/// branches and scope metadata refer to them.
#[derive(Copy, Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct Label(u32);

impl Label {
    pub const fn new(id: u32) -> Label {
        Label(id)
    }

    pub const fn id(&self) -> u32 {
        self.0
    }

    /// Get the next fresh label
    pub fn next(&self) -> Label {
        Label(self.0 + 1)
    }
}

/// Generates new labels
pub trait LabelGenerator {
    /// Generate a fresh label
    fn fresh_label(&mut self) -> Label;
}

/// Label generator which counts up from a starting label
///
/// Cloning does not split the generator source - the cloned generator will produce the same
/// sequence of labels as the original.
#[derive(Clone, Debug)]
pub struct FreshLabels(Label);

impl FreshLabels {
    pub fn new(start: Label) -> FreshLabels {
        FreshLabels(start)
    }

    /// Generator whose labels never collide with any of the given ones
    pub fn after<'a>(existing: impl IntoIterator<Item = &'a Label>) -> FreshLabels {
        let start = existing
            .into_iter()
            .max()
            .map_or(Label::new(0), Label::next);
        FreshLabels(start)
    }
}

impl LabelGenerator for FreshLabels {
    fn fresh_label(&mut self) -> Label {
        let to_return = self.0;
        self.0 = self.0.next();
        to_return
    }
}

impl fmt::Debug for Label {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_fmt(format_args!("L{}", self.0))
    }
}
