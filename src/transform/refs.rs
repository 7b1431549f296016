//! Mutable single-value holders used to share a local variable with an extracted method
//!
//! The runtime classes come in one flavour per [`TypeKind`]. Their protocol is strict:
//!
//!   1. construct, either with the current value of the local or empty
//!   2. any number of `get` and `set`
//!   3. `discard`, after which the holder must never be touched again (the runtime may recycle it)
//!
//! [`HolderSlot`] is the compile-time side of that protocol: it is produced by construction and
//! can only be consumed by writing the value back and discarding.

use crate::code::{CodeBuilder, CodeBuilderExts, Instruction, InvokeType, MethodRef};
use crate::jvm::{BinaryName, Error, FieldType, MethodDescriptor, TypeKind, UnqualifiedName};
use crate::transform::Settings;

/// Holder class family for one kind of value
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Holder {
    kind: TypeKind,

    /// Public interface (eg. `IntRef`)
    api: BinaryName,

    /// Runtime implementation (eg. `IntRefImpl`)
    implementation: BinaryName,
}

impl Holder {
    pub fn for_kind(kind: TypeKind, settings: &Settings) -> Holder {
        let (api, implementation) = match kind {
            TypeKind::Int => ("IntRef", "IntRefImpl"),
            TypeKind::Long => ("LongRef", "LongRefImpl"),
            TypeKind::Float => ("FloatRef", "FloatRefImpl"),
            TypeKind::Double => ("DoubleRef", "DoubleRefImpl"),
            TypeKind::Reference => ("ObjectRef", "ObjectRefImpl"),
        };
        Holder {
            kind,
            api: settings.ref_api_class(api),
            implementation: settings.ref_impl_class(implementation),
        }
    }

    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    pub fn api(&self) -> &BinaryName {
        &self.api
    }

    pub fn implementation(&self) -> &BinaryName {
        &self.implementation
    }

    /// Type of the holder as seen by generated code
    pub fn holder_type(&self) -> FieldType {
        FieldType::object(self.implementation.clone())
    }

    /// Erased type of the held value
    pub fn value_type(&self) -> FieldType {
        self.kind.erased()
    }

    /// Allocate a holder, initialized from a local if one is given, and store it in a fresh slot
    ///
    /// Leaves the holder on top of the stack.
    pub fn construct(
        &self,
        builder: &mut CodeBuilder<'_>,
        initial_value: Option<u16>,
    ) -> Result<HolderSlot, Error> {
        builder.push_instruction(Instruction::New(self.implementation.clone()));
        builder.push_instruction(Instruction::Dup);
        let parameters = match initial_value {
            Some(local) => {
                builder.push_instruction(Instruction::Load(self.kind, local));
                vec![self.value_type()]
            }
            None => vec![],
        };
        builder.invoke(
            InvokeType::Special,
            self.method(UnqualifiedName::INIT, parameters, None),
        );

        let slot = builder.allocate_local(TypeKind::Reference)?;
        builder.push_instruction(Instruction::Store(TypeKind::Reference, slot));
        builder.push_instruction(Instruction::Load(TypeKind::Reference, slot));
        Ok(HolderSlot {
            holder: self.clone(),
            slot,
        })
    }

    /// Replace the holder on top of the stack with its value, cast to `declared_type`
    pub fn get(&self, builder: &mut CodeBuilder<'_>, declared_type: &FieldType) {
        builder.invoke(
            InvokeType::Virtual,
            self.method(UnqualifiedName::GET, vec![], Some(self.value_type())),
        );
        if let FieldType::Ref(ref_type) = declared_type {
            builder.checkcast(ref_type);
        }
    }

    /// Store a value into a holder, consuming both from the stack (holder on top)
    pub fn set(&self, builder: &mut CodeBuilder<'_>) {
        let descriptor = MethodDescriptor {
            parameters: vec![self.value_type(), self.holder_type()],
            return_type: None,
        };
        builder.invoke_static(self.implementation.clone(), UnqualifiedName::SET, descriptor);
    }

    /// End the life of the holder on top of the stack
    pub fn discard(&self, builder: &mut CodeBuilder<'_>) {
        builder.invoke(
            InvokeType::Virtual,
            self.method(UnqualifiedName::DISCARD, vec![], None),
        );
    }

    fn method(
        &self,
        name: UnqualifiedName,
        parameters: Vec<FieldType>,
        return_type: Option<FieldType>,
    ) -> MethodRef {
        let descriptor = MethodDescriptor {
            parameters,
            return_type,
        };
        MethodRef::new(self.implementation.clone(), name, descriptor)
    }
}

/// Constructed holder living in a local variable slot of the calling method
#[must_use = "holders must be written back and discarded"]
#[derive(Debug)]
pub struct HolderSlot {
    holder: Holder,
    slot: u16,
}

impl HolderSlot {
    pub fn holder(&self) -> &Holder {
        &self.holder
    }

    pub fn slot(&self) -> u16 {
        self.slot
    }

    /// Copy the final value of the holder back into a local, then discard the holder
    pub fn write_back_and_discard(
        self,
        builder: &mut CodeBuilder<'_>,
        local: u16,
        declared_type: &FieldType,
    ) {
        builder.push_instruction(Instruction::Load(TypeKind::Reference, self.slot));
        self.holder.get(builder, declared_type);
        builder.set_local(local, declared_type);
        builder.push_instruction(Instruction::Load(TypeKind::Reference, self.slot));
        self.holder.discard(builder);
    }
}
