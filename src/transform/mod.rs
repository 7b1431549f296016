//! Collecting, checking, and applying operations on a method body
//!
//! ### Operations
//!
//! Every edit is recorded as an [`Operation`] in an [`Operations`] set, tagged with the [`Id`] of
//! the transformer which asked for it. Nothing touches the code until the whole set is handed to
//! [`apply_operations`], which first rejects any pair of operations that can't both be honoured
//! and then produces the rewritten body in one walk over the original elements.
//!
//! ### Extractions
//!
//! An extraction moves a range into a fresh static method and leaves behind a call site which
//! builds an instance of the operation interface with `invokedynamic`. Locals shared between the
//! range and the rest of the method are passed in, through mutable [`Holder`]s if the range
//! writes to them. Names for the generated methods come from [`MethodNames`], which guarantees
//! that they are unique within the class.

mod apply;
mod extractor;
mod id;
mod method_names;
mod operation;
mod refs;
mod settings;

pub use apply::*;
pub use extractor::GeneratedMethod;
pub use id::*;
pub use method_names::*;
pub use operation::*;
pub use refs::*;
pub use settings::*;
