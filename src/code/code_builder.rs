use crate::code::{
    CodeElement, Constant, FreshLabels, Instruction, InvokeType, Label, LabelGenerator, MethodRef,
    Pseudo,
};
use crate::jvm::{
    BaseType, BinaryName, Error, FieldType, MethodDescriptor, RefType, TypeKind, UnqualifiedName,
};

/// Source of fresh local variable slots and labels for code generated during a rewrite pass
#[derive(Clone, Debug)]
pub struct Allocator {
    next_local: u16,
    labels: FreshLabels,
}

impl Allocator {
    pub fn new(first_free_local: u16, labels: FreshLabels) -> Allocator {
        Allocator {
            next_local: first_free_local,
            labels,
        }
    }

    /// Reserve a new local variable slot wide enough for a value of the given kind
    pub fn allocate_local(&mut self, kind: TypeKind) -> Result<u16, Error> {
        let slot = self.next_local;
        self.next_local = slot
            .checked_add(kind.width())
            .ok_or(Error::LocalsOverflow)?;
        Ok(slot)
    }

    /// First slot which has never been handed out
    pub fn next_local(&self) -> u16 {
        self.next_local
    }
}

impl LabelGenerator for Allocator {
    fn fresh_label(&mut self) -> Label {
        self.labels.fresh_label()
    }
}

/// Sink collecting the code generated by one [`CodeBlock`]
pub struct CodeBuilder<'a> {
    elements: Vec<CodeElement>,
    allocator: &'a mut Allocator,
}

impl<'a> CodeBuilder<'a> {
    pub fn new(allocator: &'a mut Allocator) -> CodeBuilder<'a> {
        CodeBuilder {
            elements: vec![],
            allocator,
        }
    }

    pub fn push_instruction(&mut self, insn: Instruction) {
        self.elements.push(CodeElement::Instruction(insn));
    }

    pub fn push_element(&mut self, element: CodeElement) {
        self.elements.push(element);
    }

    pub fn fresh_label(&mut self) -> Label {
        self.allocator.fresh_label()
    }

    pub fn place_label(&mut self, label: Label) {
        self.elements.push(CodeElement::Pseudo(Pseudo::Label(label)));
    }

    /// Reserve a local variable slot no other code in the method uses
    pub fn allocate_local(&mut self, kind: TypeKind) -> Result<u16, Error> {
        self.allocator.allocate_local(kind)
    }

    /// Code generated so far
    pub fn elements(&self) -> &[CodeElement] {
        &self.elements
    }

    pub fn finish(self) -> Vec<CodeElement> {
        self.elements
    }
}

/// Callback generating a piece of code
///
/// Closures taking a `&mut CodeBuilder` are code blocks.
pub trait CodeBlock {
    fn write(&self, builder: &mut CodeBuilder<'_>) -> Result<(), Error>;
}

impl<F> CodeBlock for F
where
    F: Fn(&mut CodeBuilder<'_>) -> Result<(), Error>,
{
    fn write(&self, builder: &mut CodeBuilder<'_>) -> Result<(), Error> {
        self(builder)
    }
}

/// Run a code block against a fresh builder, collecting what it generates
pub(crate) fn generate(
    code: &dyn CodeBlock,
    allocator: &mut Allocator,
) -> Result<Vec<CodeElement>, Error> {
    let mut builder = CodeBuilder::new(allocator);
    code.write(&mut builder)?;
    Ok(builder.finish())
}

/// Shorthands for common instruction sequences
pub trait CodeBuilderExts {
    /// Push an integer constant onto the stack, using the shortest encoding
    fn const_int(&mut self, integer: i32);

    /// Get a local at a particular offset
    fn get_local(&mut self, offset: u16, field_type: &FieldType);

    /// Set a local at a particular offset
    fn set_local(&mut self, offset: u16, field_type: &FieldType);

    /// Return from the function
    fn return_(&mut self, field_type: Option<&FieldType>);

    /// Cast the top of the stack, skipping the no-op cast to `java/lang/Object`
    fn checkcast(&mut self, ref_type: &RefType);

    /// Invoke a method
    fn invoke(&mut self, invoke_type: InvokeType, method: MethodRef);

    /// Invoke a static method on a class
    fn invoke_static(
        &mut self,
        class: BinaryName,
        name: UnqualifiedName,
        descriptor: MethodDescriptor,
    );

    /// Box the primitive on top of the stack into its wrapper class
    ///
    /// References are left alone.
    fn box_value(&mut self, field_type: &FieldType);

    /// Cast the reference on top of the stack to the wrapper class of a primitive and unwrap it
    ///
    /// For reference types, this is just a cast.
    fn unbox_checked(&mut self, field_type: &FieldType);
}

impl CodeBuilderExts for CodeBuilder<'_> {
    fn const_int(&mut self, integer: i32) {
        let insn = match integer {
            -1 => Instruction::IConstM1,
            0 => Instruction::IConst0,
            1 => Instruction::IConst1,
            2 => Instruction::IConst2,
            3 => Instruction::IConst3,
            4 => Instruction::IConst4,
            5 => Instruction::IConst5,
            -128..=127 => Instruction::BiPush(integer as i8),
            -32768..=32767 => Instruction::SiPush(integer as i16),
            _ => Instruction::Ldc(Constant::Int(integer)),
        };
        self.push_instruction(insn);
    }

    fn get_local(&mut self, offset: u16, field_type: &FieldType) {
        self.push_instruction(Instruction::Load(field_type.type_kind(), offset));
    }

    fn set_local(&mut self, offset: u16, field_type: &FieldType) {
        self.push_instruction(Instruction::Store(field_type.type_kind(), offset));
    }

    fn return_(&mut self, field_type: Option<&FieldType>) {
        self.push_instruction(Instruction::Return(field_type.map(FieldType::type_kind)));
    }

    fn checkcast(&mut self, ref_type: &RefType) {
        if !ref_type.is_object() {
            self.push_instruction(Instruction::CheckCast(ref_type.clone()));
        }
    }

    fn invoke(&mut self, invoke_type: InvokeType, method: MethodRef) {
        self.push_instruction(Instruction::Invoke(invoke_type, method));
    }

    fn invoke_static(
        &mut self,
        class: BinaryName,
        name: UnqualifiedName,
        descriptor: MethodDescriptor,
    ) {
        self.invoke(InvokeType::Static, MethodRef::new(class, name, descriptor));
    }

    fn box_value(&mut self, field_type: &FieldType) {
        if let FieldType::Base(base_type) = field_type {
            let wrapper = base_type.boxed();
            let descriptor = MethodDescriptor {
                parameters: vec![FieldType::Base(*base_type)],
                return_type: Some(FieldType::object(wrapper.clone())),
            };
            self.invoke_static(wrapper, UnqualifiedName::VALUEOF, descriptor);
        }
    }

    fn unbox_checked(&mut self, field_type: &FieldType) {
        match field_type {
            FieldType::Base(base_type) => {
                let wrapper = unbox_owner(*base_type);
                self.checkcast(&RefType::Object(wrapper.clone()));
                let descriptor = MethodDescriptor {
                    parameters: vec![],
                    return_type: Some(FieldType::Base(*base_type)),
                };
                self.invoke(
                    InvokeType::Virtual,
                    MethodRef::new(wrapper, base_type.unbox_method(), descriptor),
                );
            }
            FieldType::Ref(ref_type) => self.checkcast(ref_type),
        }
    }
}

/// Class declaring the unboxing method for a primitive
///
/// All the numeric wrappers share `java/lang/Number`, so accept any of them.
fn unbox_owner(base_type: BaseType) -> BinaryName {
    match base_type {
        BaseType::Boolean | BaseType::Char => base_type.boxed(),
        _ => BinaryName::NUMBER,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn int_constants() {
        let mut allocator = Allocator::new(0, FreshLabels::new(Label::new(0)));
        let mut builder = CodeBuilder::new(&mut allocator);
        for integer in [-1, 5, 6, -200, 40_000] {
            builder.const_int(integer);
        }
        assert_eq!(
            builder.finish(),
            vec![
                Instruction::IConstM1.into(),
                Instruction::IConst5.into(),
                Instruction::BiPush(6).into(),
                Instruction::SiPush(-200).into(),
                Instruction::Ldc(Constant::Int(40_000)).into(),
            ]
        );
    }

    #[test]
    fn boxing() {
        let mut allocator = Allocator::new(0, FreshLabels::new(Label::new(0)));
        let mut builder = CodeBuilder::new(&mut allocator);
        builder.unbox_checked(&FieldType::long());
        builder.unbox_checked(&FieldType::object(BinaryName::OBJECT));
        builder.box_value(&FieldType::object(BinaryName::STRING));
        builder.box_value(&FieldType::boolean());

        let elements = builder.finish();
        assert_eq!(elements.len(), 3);
        assert_eq!(
            elements[0],
            Instruction::CheckCast(RefType::Object(BinaryName::NUMBER)).into()
        );
        assert!(matches!(
            &elements[1],
            CodeElement::Instruction(Instruction::Invoke(InvokeType::Virtual, method))
                if method.name == UnqualifiedName::LONGVALUE
        ));
        assert!(matches!(
            &elements[2],
            CodeElement::Instruction(Instruction::Invoke(InvokeType::Static, method))
                if method.class == BinaryName::BOOLEAN && method.name == UnqualifiedName::VALUEOF
        ));
    }

    #[test]
    fn allocation() {
        let mut allocator = Allocator::new(3, FreshLabels::new(Label::new(10)));
        assert_eq!(allocator.allocate_local(TypeKind::Long).unwrap(), 3);
        assert_eq!(allocator.allocate_local(TypeKind::Int).unwrap(), 5);
        assert_eq!(allocator.next_local(), 6);
        assert_eq!(allocator.fresh_label(), Label::new(10));

        let mut full = Allocator::new(u16::MAX, FreshLabels::new(Label::new(0)));
        assert!(matches!(
            full.allocate_local(TypeKind::Double),
            Err(Error::LocalsOverflow)
        ));
    }
}
