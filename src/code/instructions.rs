//! Elements of a method body
//!
//! The representation is close to the class file, but resolved: constants and member references
//! are inline values instead of constant pool indices, branch targets are [`Label`]s, and a few
//! instruction families are folded together:
//!
//!   - The "wide" instruction doesn't show up at all, but instead gets merged into the
//!     instructions it is allowed to modify
//!
//!   - Loads, stores, and returns carry a [`TypeKind`] instead of having one variant per kind.
//!     This is what lets local variable accesses be recognized and renumbered uniformly.
//!
//!   - Branches with a comparison get abstracted into one instruction with a field
//!

use crate::code::Label;
use crate::jvm::{
    BaseType, BinaryName, FieldType, MethodDescriptor, RefType, TypeKind, UnqualifiedName,
};

/// Reference to a field of some class
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FieldRef {
    pub class: BinaryName,
    pub name: UnqualifiedName,
    pub descriptor: FieldType,
}

/// Reference to a method of some class or interface
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MethodRef {
    pub class: BinaryName,
    pub name: UnqualifiedName,
    pub descriptor: MethodDescriptor,
    pub is_interface: bool,
}

impl MethodRef {
    pub fn new(class: BinaryName, name: UnqualifiedName, descriptor: MethodDescriptor) -> MethodRef {
        MethodRef {
            class,
            name,
            descriptor,
            is_interface: false,
        }
    }

    pub fn interface(
        class: BinaryName,
        name: UnqualifiedName,
        descriptor: MethodDescriptor,
    ) -> MethodRef {
        MethodRef {
            class,
            name,
            descriptor,
            is_interface: true,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum InvokeType {
    Virtual,
    Special,
    Static,
    Interface,
}

/// Kind of a method handle constant
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum HandleKind {
    InvokeStatic,
    InvokeVirtual,
    InvokeSpecial,
    InvokeInterface,
    NewInvokeSpecial,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MethodHandle {
    pub kind: HandleKind,
    pub method: MethodRef,
}

/// Loadable constant
#[derive(Clone, Debug, PartialEq)]
pub enum Constant {
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
    Class(RefType),
    MethodType(MethodDescriptor),
    MethodHandle(MethodHandle),
}

/// Call site of an `invokedynamic`
#[derive(Clone, Debug, PartialEq)]
pub struct DynamicCallSite {
    pub name: UnqualifiedName,
    pub descriptor: MethodDescriptor,
    pub bootstrap: MethodHandle,
    pub arguments: Vec<Constant>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ShiftType {
    Left,
    LogicalRight,
    ArithmeticRight,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum CompareMode {
    /// -1 on NaN
    L,

    /// 1 on NaN
    G,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum OrdComparison {
    EQ,
    GE,
    GT,
    LE,
    LT,
    NE,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum EqComparison {
    EQ,
    NE,
}

/// JVM bytecode instruction
#[derive(Clone, Debug, PartialEq)]
pub enum Instruction {
    Nop,
    AConstNull,
    IConstM1,
    IConst0,
    IConst1,
    IConst2,
    IConst3,
    IConst4,
    IConst5,
    LConst0,
    LConst1,
    FConst0,
    FConst1,
    FConst2,
    DConst0,
    DConst1,
    BiPush(i8),
    SiPush(i16),
    Ldc(Constant), // covers `ldc`, `ldc_w`, and `ldc2_w`
    Load(TypeKind, u16), // covers `iload`, `aload_0`, `wide dload`, ...
    Store(TypeKind, u16), // covers `istore`, `astore_0`, `wide dstore`, ...
    IInc(u16, i16), // covers `iinc` and `wide iinc`
    IALoad,
    LALoad,
    FALoad,
    DALoad,
    AALoad,
    BALoad,
    CALoad,
    SALoad,
    IAStore,
    LAStore,
    FAStore,
    DAStore,
    AAStore,
    BAStore,
    CAStore,
    SAStore,
    Pop,
    Pop2,
    Dup,
    DupX1,
    DupX2,
    Dup2,
    Dup2X1,
    Dup2X2,
    Swap,
    IAdd,
    LAdd,
    FAdd,
    DAdd,
    ISub,
    LSub,
    FSub,
    DSub,
    IMul,
    LMul,
    FMul,
    DMul,
    IDiv,
    LDiv,
    FDiv,
    DDiv,
    IRem,
    LRem,
    FRem,
    DRem,
    INeg,
    LNeg,
    FNeg,
    DNeg,
    ISh(ShiftType), // covers `ishr`, `ishl`, and `iushr`
    LSh(ShiftType), // covers `lshr`, `lshl`, and `lushr`
    IAnd,
    LAnd,
    IOr,
    LOr,
    IXor,
    LXor,
    I2L,
    I2F,
    I2D,
    L2I,
    L2F,
    L2D,
    F2I,
    F2L,
    F2D,
    D2I,
    D2L,
    D2F,
    I2B,
    I2C,
    I2S,
    LCmp,
    FCmp(CompareMode), // covers `fcmpl` and `fcmpg`
    DCmp(CompareMode), // covers `dcmpl` and `dcmpg`
    GetStatic(FieldRef),
    PutStatic(FieldRef),
    GetField(FieldRef),
    PutField(FieldRef),
    Invoke(InvokeType, MethodRef),
    InvokeDynamic(DynamicCallSite),
    New(BinaryName),
    NewArray(BaseType),
    ANewArray(RefType),
    MultiANewArray(RefType, u8),
    ArrayLength,
    CheckCast(RefType),
    InstanceOf(RefType),
    MonitorEnter,
    MonitorExit,
    AThrow,
    If(OrdComparison, Label), // covers `ifeq`, `ifne`, `iflt`, `ifge`, `ifgt`, `ifle`
    IfICmp(OrdComparison, Label), // covers `if_icmpeq`, `if_icmpne`, ... `if_icmple`
    IfACmp(EqComparison, Label), // covers `if_acmpeq`, `if_acmpne`
    IfNull(EqComparison, Label), // covers `ifnull`, `ifnonnull`
    Goto(Label), // covers `goto` and `goto_w`
    TableSwitch {
        /// Jump target if the argument is less than `low` or greater than `low + targets.len()`
        default: Label,

        /// Value associated with the first jump target
        low: i32,

        targets: Vec<Label>,
    },
    LookupSwitch {
        /// Jump target if there is no corresponding key
        default: Label,

        /// Jump targets (sorted so that the keys are ascending)
        targets: Vec<(i32, Label)>,
    },
    Return(Option<TypeKind>), // `None` is the plain `return` from a `void` method
}

/// How an instruction uses a local variable slot
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum LocalAccess {
    Read,
    Write,

    /// Read and then written by the same instruction (only `iinc`)
    ReadWrite,
}

impl LocalAccess {
    /// Combine two uses of the same slot
    pub fn merge(self, other: LocalAccess) -> LocalAccess {
        if self == other {
            self
        } else {
            LocalAccess::ReadWrite
        }
    }

    pub fn reads(&self) -> bool {
        !matches!(self, LocalAccess::Write)
    }

    pub fn writes(&self) -> bool {
        !matches!(self, LocalAccess::Read)
    }
}

impl Instruction {
    /// Local variable slot this instruction touches, along with its kind and use
    pub fn local_access(&self) -> Option<(u16, TypeKind, LocalAccess)> {
        match self {
            Instruction::Load(kind, slot) => Some((*slot, *kind, LocalAccess::Read)),
            Instruction::Store(kind, slot) => Some((*slot, *kind, LocalAccess::Write)),
            Instruction::IInc(slot, _) => Some((*slot, TypeKind::Int, LocalAccess::ReadWrite)),
            _ => None,
        }
    }

    /// Same instruction, but touching a different local variable slot
    ///
    /// Instructions which don't touch locals are returned unchanged.
    pub fn with_local(&self, new_slot: u16) -> Instruction {
        match self {
            Instruction::Load(kind, _) => Instruction::Load(*kind, new_slot),
            Instruction::Store(kind, _) => Instruction::Store(*kind, new_slot),
            Instruction::IInc(_, by) => Instruction::IInc(new_slot, *by),
            other => other.clone(),
        }
    }
}

/// Declared local variable, along with the labels delimiting its scope
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct LocalVariableDeclaration {
    pub slot: u16,
    pub name: UnqualifiedName,
    pub descriptor: FieldType,
    pub start: Label,
    pub end: Label,
}

/// Metadata interleaved with real instructions
///
/// None of these have any effect at runtime.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Pseudo {
    Label(Label),
    LocalVariable(LocalVariableDeclaration),
    LineNumber { line: u16, start: Label },
}

/// Either a real instruction or metadata
#[derive(Clone, Debug, PartialEq)]
pub enum CodeElement {
    Instruction(Instruction),
    Pseudo(Pseudo),
}

impl CodeElement {
    pub fn as_instruction(&self) -> Option<&Instruction> {
        match self {
            CodeElement::Instruction(insn) => Some(insn),
            CodeElement::Pseudo(_) => None,
        }
    }

    /// Label placed by this element, if any
    pub fn placed_label(&self) -> Option<Label> {
        match self {
            CodeElement::Pseudo(Pseudo::Label(label)) => Some(*label),
            _ => None,
        }
    }
}

impl From<Instruction> for CodeElement {
    fn from(insn: Instruction) -> CodeElement {
        CodeElement::Instruction(insn)
    }
}

impl From<Pseudo> for CodeElement {
    fn from(pseudo: Pseudo) -> CodeElement {
        CodeElement::Pseudo(pseudo)
    }
}
