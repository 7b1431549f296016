//! Composable rewriting of JVM method bodies
//!
//! Independently written transformers each describe the edits they want to make to a method
//! body: insert code at a point, replace a range of code, or extract a range of code into a new
//! method which they then wrap. All of those requests are collected into one
//! [`transform::Operations`] set, checked against one another, and applied in a single pass
//! over the original code by [`transform::apply_operations`].
//!
//! ```
//! use sushi::code::*;
//! use sushi::jvm::*;
//! use sushi::transform::*;
//!
//! # fn rewrite() -> Result<(), Error> {
//! let method = MethodContext {
//!     class: BinaryName::from_string(String::from("me/Target")).unwrap(),
//!     name: UnqualifiedName::from_string(String::from("run")).unwrap(),
//!     descriptor: MethodDescriptor::parse("()V")?,
//!     is_static: true,
//! };
//! let code = TransformableCode::new(method, vec![Instruction::Return(None).into()], 0)?;
//!
//! let settings = Settings::new();
//! let mut operations = Operations::new(&settings);
//! let owner = Id::parse("example:log")?;
//! let head = code.select(owner).head().unwrap();
//! head.insert_before(&mut operations, |builder| {
//!     builder.push_instruction(Instruction::Nop);
//!     Ok(())
//! });
//!
//! let rewritten = apply_operations(&code, &operations, &settings)?;
//! assert_eq!(rewritten.elements.len(), 2);
//! # Ok(())
//! # }
//! # rewrite().unwrap();
//! ```

pub mod code;
pub mod jvm;
pub mod transform;
