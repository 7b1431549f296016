//! Method bodies and the places in them that operations attach to
//!
//! ### Structure
//!
//! A method body is captured once per rewrite pass as a [`TransformableCode`]: an immutable,
//! indexed sequence of [`CodeElement`]s. Real instructions and metadata (labels, local variable
//! scopes, line numbers) are both elements, so every one of them has an index and can be
//! navigated to through an [`InstructionHolder`].
//!
//! Edits are anchored at [`Point`]s, which sit immediately before or after an element, and
//! ranges of them are [`Selection`]s. Selections are built with a [`SelectionBuilder`] and carry
//! the identity of whoever asked for them.
//!
//! ### Code generation
//!
//! New code is produced by [`CodeBlock`] callbacks writing into a [`CodeBuilder`]. Blocks are
//! run in the middle of a rewrite pass, so the builder hands out labels and local variable slots
//! that are guaranteed not to clash with the rest of the method.

mod code_builder;
mod holder;
mod instructions;
mod label;
mod locals;
mod point;
mod selection;
mod stack_delta;

pub use code_builder::*;
pub use holder::*;
pub use instructions::*;
pub use label::*;
pub use locals::*;
pub use point::*;
pub use selection::*;
pub use stack_delta::*;
