//! Turning a range of code into a generated method
//!
//! While the applicator walks over an extracted range, everything it would have emitted is
//! intercepted into the [`Extractor`] instead. When the range ends, the intercepted code becomes
//! the body of a new private static method and the call site gets code that:
//!
//!   1. pushes the locals the body needs (wrapping those it writes in mutable holders)
//!   2. binds them and the new method into an instance of the operation interface with
//!      `invokedynamic` and `LambdaMetafactory`
//!   3. runs the extraction's code block, which is expected to call the operation
//!   4. writes the final holder values back into the locals and discards the holders
//!
//! Locals are sorted into two camps. Those which cross a boundary of the range are captured: they
//! are live in scope at the start, read before being written inside the range, or declared with a
//! scope that runs past the end. Everything else is private to the range and just gets renumbered
//! into the generated method's frame.
//!
//! Labels placed inside the range move into the generated method, but are also placed again at the
//! call site, since scope and line number metadata left in the calling method may refer to them.

use crate::code::{
    Allocator, CodeBlock, CodeBuilder, CodeBuilderExts, CodeElement, Constant, DynamicCallSite,
    FreshLabels, HandleKind, Instruction, Label, LocalAccess, LocalVariableDeclaration,
    MethodHandle, MethodRef, Pseudo, TransformableCode,
};
use crate::jvm::{
    BinaryName, Error, FieldType, MethodAccessFlags, MethodDescriptor, TypeKind,
    UnqualifiedName,
};
use crate::transform::{Extraction, Holder, HolderSlot, Settings};
use std::collections::BTreeMap;

/// Method generated by an extraction, to be added to the class of the rewritten method
#[derive(Clone, Debug, PartialEq)]
pub struct GeneratedMethod {
    pub name: UnqualifiedName,
    pub descriptor: MethodDescriptor,
    pub access_flags: MethodAccessFlags,
    pub max_locals: u16,
    pub elements: Vec<CodeElement>,
}

/// How a slot is used inside the extracted range
#[derive(Copy, Clone, Debug)]
struct SlotUse {
    first: LocalAccess,
    merged: LocalAccess,
    kind: TypeKind,
    width: u16,
}

/// Local of the calling method which the generated method gets access to
#[derive(Clone, Debug)]
struct Capture {
    slot: u16,
    declared_type: FieldType,

    /// Whether the local already holds a value when the range is entered
    initialized: bool,

    /// Holder the local is shared through, when the range writes to it
    holder: Option<Holder>,

    /// Parameter slot in the generated method
    parameter: u16,
}

impl Capture {
    fn parameter_type(&self) -> FieldType {
        match &self.holder {
            Some(holder) => holder.holder_type(),
            None => self.declared_type.clone(),
        }
    }
}

/// Where a local of the extracted range ends up in the generated method
enum Relocated<'c> {
    Captured(&'c Capture),
    Moved(u16),
}

/// Layout of the generated method's frame
struct Frame {
    captures: Vec<Capture>,
    moved: BTreeMap<u16, u16>,
    arguments_slot: u16,
    next_free: u16,
}

impl Frame {
    fn relocate(&self, slot: u16) -> Option<Relocated<'_>> {
        if let Some(new_slot) = self.moved.get(&slot) {
            return Some(Relocated::Moved(*new_slot));
        }
        self.captures
            .iter()
            .find(|capture| capture.slot == slot)
            .map(Relocated::Captured)
    }
}

pub(crate) struct Extractor<'a> {
    code: &'a TransformableCode,
    extraction: &'a Extraction,
    settings: &'a Settings,
    body: Vec<CodeElement>,
}

impl<'a> Extractor<'a> {
    pub fn new(
        code: &'a TransformableCode,
        extraction: &'a Extraction,
        settings: &'a Settings,
    ) -> Extractor<'a> {
        Extractor {
            code,
            extraction,
            settings,
            body: vec![],
        }
    }

    pub fn extraction(&self) -> &'a Extraction {
        self.extraction
    }

    /// Take an element which would otherwise have been emitted into the enclosing code
    pub fn intercept(&mut self, element: CodeElement) {
        self.body.push(element);
    }

    pub fn intercept_all(&mut self, elements: Vec<CodeElement>) {
        self.body.extend(elements);
    }

    /// Complete the extraction, producing the call site code and the generated method
    pub fn finish(
        self,
        allocator: &mut Allocator,
    ) -> Result<(Vec<CodeElement>, GeneratedMethod), Error> {
        let frame = self.layout()?;
        log::debug!(
            "Extracting {} for {} with {} captured locals",
            self.extraction.name,
            self.extraction.owner,
            frame.captures.len()
        );

        let placed: Vec<Label> = self.body.iter().filter_map(CodeElement::placed_label).collect();
        let method = self.generate_method(&frame, &placed)?;

        let mut call_site: Vec<CodeElement> =
            placed.iter().map(|label| Pseudo::Label(*label).into()).collect();
        call_site.extend(self.call_site(&frame, &method.descriptor, allocator)?);

        // Declarations which did not move into the generated method stay with the caller
        let kept = self.body.iter().filter(|element| match element {
            CodeElement::Pseudo(Pseudo::LocalVariable(declaration)) => {
                moved_declaration(&frame, &placed, declaration).is_none()
            }
            _ => false,
        });
        call_site.extend(kept.cloned());
        Ok((call_site, method))
    }

    /// Decide which locals are captured and where everything goes in the generated frame
    fn layout(&self) -> Result<Frame, Error> {
        let mut uses: BTreeMap<u16, SlotUse> = BTreeMap::new();
        for insn in self.body.iter().filter_map(CodeElement::as_instruction) {
            if let Some((slot, kind, access)) = insn.local_access() {
                let slot_use = uses.entry(slot).or_insert(SlotUse {
                    first: access,
                    merged: access,
                    kind,
                    width: kind.width(),
                });
                slot_use.merged = slot_use.merged.merge(access);
                slot_use.width = slot_use.width.max(kind.width());
            }
        }

        let original_locals = self.code.max_locals();
        let in_scope = match self.code.locals() {
            Some(locals) => Some(locals.find_in_scope(self.extraction.start)?),
            None => {
                if uses.keys().any(|slot| *slot < original_locals) {
                    log::warn!(
                        "{} has no local variable scopes, so {} captures every local it uses",
                        self.code.method(),
                        self.extraction.name
                    );
                }
                None
            }
        };

        let mut captures = vec![];
        let mut private = vec![];
        let mut next_free: u16 = 0;
        for (slot, slot_use) in &uses {
            let entry = in_scope.as_ref().and_then(|scope| scope.get(slot)).copied();

            // Assigned in the range, but declared to still be live after it
            let escaping = match (self.code.locals(), entry) {
                (Some(locals), None) if !slot_use.first.reads() => locals
                    .outliving(*slot, self.extraction.end)
                    .filter(|entry| entry.declared_type.type_kind() == slot_use.kind),
                _ => None,
            };

            let crosses = *slot < original_locals
                && (in_scope.is_none()
                    || entry.is_some()
                    || escaping.is_some()
                    || slot_use.first.reads());
            if !crosses {
                private.push((*slot, slot_use.width));
                continue;
            }

            let declared_type = match entry.or(escaping) {
                Some(entry) => entry.declared_type.clone(),
                None => slot_use.kind.erased(),
            };
            let holder = if slot_use.merged.writes() {
                Some(Holder::for_kind(declared_type.type_kind(), self.settings))
            } else {
                None
            };
            let capture = Capture {
                slot: *slot,
                declared_type,
                initialized: entry.is_some() || slot_use.first.reads(),
                holder,
                parameter: next_free,
            };
            next_free = next_free
                .checked_add(capture.parameter_type().width())
                .ok_or(Error::LocalsOverflow)?;
            captures.push(capture);
        }

        let arguments_slot = next_free;
        next_free = next_free.checked_add(1).ok_or(Error::LocalsOverflow)?;

        let mut moved = BTreeMap::new();
        for (slot, width) in private {
            moved.insert(slot, next_free);
            next_free = next_free.checked_add(width).ok_or(Error::LocalsOverflow)?;
        }

        Ok(Frame {
            captures,
            moved,
            arguments_slot,
            next_free,
        })
    }

    fn generated_descriptor(&self, frame: &Frame) -> MethodDescriptor {
        let mut parameters: Vec<FieldType> =
            frame.captures.iter().map(Capture::parameter_type).collect();
        parameters.push(FieldType::array(FieldType::object(BinaryName::OBJECT)));
        MethodDescriptor {
            parameters,
            return_type: Some(FieldType::Ref(self.extraction.delta.pushed_or_boxed_void())),
        }
    }

    fn generate_method(&self, frame: &Frame, placed: &[Label]) -> Result<GeneratedMethod, Error> {
        let settings = self.settings;
        let delta = &self.extraction.delta;
        let descriptor = self.generated_descriptor(frame);

        let mut allocator = Allocator::new(frame.next_free, FreshLabels::after(placed));
        let mut builder = CodeBuilder::new(&mut allocator);

        // Check and unpack the arguments
        let arguments = frame.arguments_slot;
        builder.push_instruction(Instruction::Load(TypeKind::Reference, arguments));
        builder.const_int(delta.popped.len() as i32);
        builder.invoke_static(
            settings.operation_infra_class.clone(),
            settings.check_count_name.clone(),
            settings.check_count_descriptor(),
        );
        for (index, popped) in delta.popped.iter().enumerate() {
            builder.push_instruction(Instruction::Load(TypeKind::Reference, arguments));
            builder.const_int(index as i32);
            builder.push_instruction(Instruction::AALoad);
            builder.unbox_checked(popped);
        }

        for element in &self.body {
            match element {
                CodeElement::Instruction(insn) => relocate_instruction(&mut builder, frame, insn),
                CodeElement::Pseudo(Pseudo::LocalVariable(declaration)) => {
                    if let Some(declaration) = moved_declaration(frame, placed, declaration) {
                        builder.push_element(Pseudo::LocalVariable(declaration).into());
                    }
                }
                other => builder.push_element(other.clone()),
            }
        }

        // Return the result boxed, or `null` as a `Void`
        match &delta.pushed {
            Some(pushed) => builder.box_value(pushed),
            None => builder.push_instruction(Instruction::AConstNull),
        }
        builder.push_instruction(Instruction::Return(Some(TypeKind::Reference)));

        let elements = builder.finish();
        let max_locals = frame.next_free.max(locals_used(&elements)?);
        Ok(GeneratedMethod {
            name: self.extraction.name.clone(),
            descriptor,
            access_flags: settings.generated_method_flags,
            max_locals,
            elements,
        })
    }

    fn call_site(
        &self,
        frame: &Frame,
        generated: &MethodDescriptor,
        allocator: &mut Allocator,
    ) -> Result<Vec<CodeElement>, Error> {
        let settings = self.settings;
        let mut builder = CodeBuilder::new(allocator);

        let mut holders: Vec<(HolderSlot, &Capture)> = vec![];
        for capture in &frame.captures {
            match &capture.holder {
                Some(holder) => {
                    let initial = if capture.initialized {
                        Some(capture.slot)
                    } else {
                        None
                    };
                    holders.push((holder.construct(&mut builder, initial)?, capture));
                }
                None => builder.get_local(capture.slot, &capture.declared_type),
            }
        }

        let call_descriptor = settings.operation_call_descriptor();
        let implementation = MethodHandle {
            kind: HandleKind::InvokeStatic,
            method: MethodRef::new(
                self.code.method().class.clone(),
                self.extraction.name.clone(),
                generated.clone(),
            ),
        };
        builder.push_instruction(Instruction::InvokeDynamic(DynamicCallSite {
            name: settings.operation_call_name.clone(),
            descriptor: MethodDescriptor {
                parameters: frame.captures.iter().map(Capture::parameter_type).collect(),
                return_type: Some(FieldType::Ref(settings.operation_type())),
            },
            bootstrap: metafactory(),
            arguments: vec![
                Constant::MethodType(call_descriptor.clone()),
                Constant::MethodHandle(implementation),
                Constant::MethodType(call_descriptor),
            ],
        }));

        self.extraction.code.write(&mut builder)?;

        for (holder, capture) in holders {
            holder.write_back_and_discard(&mut builder, capture.slot, &capture.declared_type);
        }
        Ok(builder.finish())
    }
}

/// Scope declaration as it should appear in the generated method, if it belongs there at all
///
/// Only private locals whose whole scope lies inside the range move.
fn moved_declaration(
    frame: &Frame,
    placed: &[Label],
    declaration: &LocalVariableDeclaration,
) -> Option<LocalVariableDeclaration> {
    match frame.relocate(declaration.slot) {
        Some(Relocated::Moved(slot))
            if placed.contains(&declaration.start) && placed.contains(&declaration.end) =>
        {
            let mut declaration = declaration.clone();
            declaration.slot = slot;
            Some(declaration)
        }
        _ => None,
    }
}

/// Rewrite one intercepted instruction to work in the generated method's frame
fn relocate_instruction(builder: &mut CodeBuilder<'_>, frame: &Frame, insn: &Instruction) {
    let slot = match insn.local_access() {
        Some((slot, _, _)) => slot,
        None => return builder.push_instruction(insn.clone()),
    };
    let capture = match frame.relocate(slot) {
        Some(Relocated::Moved(new_slot)) => {
            return builder.push_instruction(insn.with_local(new_slot))
        }
        Some(Relocated::Captured(capture)) => capture,
        None => return builder.push_instruction(insn.clone()),
    };
    let holder = match &capture.holder {
        Some(holder) => holder,
        None => return builder.push_instruction(insn.with_local(capture.parameter)),
    };

    let holder_ref = Instruction::Load(TypeKind::Reference, capture.parameter);
    match insn {
        Instruction::Store(_, _) => {
            builder.push_instruction(holder_ref);
            holder.set(builder);
        }
        Instruction::IInc(_, by) => {
            builder.push_instruction(holder_ref.clone());
            holder.get(builder, &FieldType::int());
            builder.const_int(i32::from(*by));
            builder.push_instruction(Instruction::IAdd);
            builder.push_instruction(holder_ref);
            holder.set(builder);
        }
        _ => {
            builder.push_instruction(holder_ref);
            holder.get(builder, &capture.declared_type);
        }
    }
}

/// `LambdaMetafactory.metafactory`
fn metafactory() -> MethodHandle {
    let descriptor = MethodDescriptor {
        parameters: vec![
            FieldType::object(BinaryName::METHODHANDLE_LOOKUP),
            FieldType::object(BinaryName::STRING),
            FieldType::object(BinaryName::METHODTYPE),
            FieldType::object(BinaryName::METHODTYPE),
            FieldType::object(BinaryName::METHODHANDLE),
            FieldType::object(BinaryName::METHODTYPE),
        ],
        return_type: Some(FieldType::object(BinaryName::CALLSITE)),
    };
    MethodHandle {
        kind: HandleKind::InvokeStatic,
        method: MethodRef::new(
            BinaryName::LAMBDAMETAFACTORY,
            UnqualifiedName::METAFACTORY,
            descriptor,
        ),
    }
}

/// Number of local variable slots touched by some code
pub(crate) fn locals_used(elements: &[CodeElement]) -> Result<u16, Error> {
    let mut used = 0;
    for insn in elements.iter().filter_map(CodeElement::as_instruction) {
        if let Some((slot, kind, _)) = insn.local_access() {
            used = slot.checked_add(kind.width()).ok_or(Error::LocalsOverflow)?.max(used);
        }
    }
    Ok(used)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::code::{InvokeType, MethodContext, Point, StackDelta, Timing};
    use crate::jvm::{Name, ParseDescriptor};
    use crate::transform::Id;

    fn noop(_: &mut CodeBuilder<'_>) -> Result<(), Error> {
        Ok(())
    }

    fn extraction(start: Point, end: Point) -> Extraction {
        Extraction {
            owner: Id::parse("test:extractor").unwrap(),
            start,
            end,
            name: UnqualifiedName::from_string(String::from("extracted")).unwrap(),
            delta: StackDelta::method_like(vec![], None).into_method_like().unwrap(),
            timing: Timing::Default,
            code: Box::new(noop),
        }
    }

    #[test]
    fn without_scopes_everything_is_captured() {
        let method = MethodContext {
            class: BinaryName::OBJECT,
            name: UnqualifiedName::from_string(String::from("run")).unwrap(),
            descriptor: MethodDescriptor::parse("()V").unwrap(),
            is_static: true,
        };
        let elements = vec![
            Instruction::IConst1.into(),
            Instruction::Store(TypeKind::Int, 1).into(),
            Instruction::Return(None).into(),
        ];
        let code = TransformableCode::new(method, elements, 2).unwrap();
        let settings = Settings::new();
        let extraction = extraction(Point::before(0), Point::after(1));

        let mut extractor = Extractor::new(&code, &extraction, &settings);
        for element in &code.elements()[..2] {
            extractor.intercept(element.clone());
        }
        let mut allocator = Allocator::new(2, FreshLabels::new(Label::new(0)));
        let (call_site, method) = extractor.finish(&mut allocator).unwrap();

        // Write-only, so the holder starts out empty
        let holder = Holder::for_kind(TypeKind::Int, &settings);
        assert_eq!(
            call_site[..3],
            [
                CodeElement::from(Instruction::New(holder.implementation().clone())),
                CodeElement::from(Instruction::Dup),
                CodeElement::from(Instruction::Invoke(
                    InvokeType::Special,
                    MethodRef::new(
                        holder.implementation().clone(),
                        UnqualifiedName::INIT,
                        MethodDescriptor::parse("()V").unwrap(),
                    ),
                )),
            ]
        );
        assert_eq!(allocator.next_local(), 3);
        assert_eq!(method.descriptor.parameters.len(), 2);
        assert!(method
            .elements
            .contains(&Instruction::Load(TypeKind::Reference, 0).into()));
    }

    #[test]
    fn counting_locals() {
        let elements: Vec<CodeElement> = vec![
            Instruction::Load(TypeKind::Int, 3).into(),
            Instruction::Store(TypeKind::Double, 1).into(),
            Instruction::IInc(2, 1).into(),
        ];
        assert_eq!(locals_used(&elements).unwrap(), 4);
        assert_eq!(locals_used(&[]).unwrap(), 0);
    }
}
