//! Shared scaffolding for building method bodies and inspecting rewritten code

#![allow(dead_code)]

use sushi::code::*;
use sushi::jvm::*;
use sushi::transform::*;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn id(id: &str) -> Id {
    Id::parse(id).unwrap()
}

pub fn name(name: &str) -> UnqualifiedName {
    UnqualifiedName::from_string(String::from(name)).unwrap()
}

/// Incrementally assembles a method body
pub struct MethodBuilder {
    method: MethodContext,
    elements: Vec<CodeElement>,
    next_label: Label,
}

impl MethodBuilder {
    pub fn new(descriptor: &str, is_static: bool) -> MethodBuilder {
        MethodBuilder {
            method: MethodContext {
                class: BinaryName::from_string(String::from("com/example/Target")).unwrap(),
                name: name("run"),
                descriptor: MethodDescriptor::parse(descriptor).unwrap(),
                is_static,
            },
            elements: vec![],
            next_label: Label::new(0),
        }
    }

    pub fn push(&mut self, insn: Instruction) -> &mut MethodBuilder {
        self.elements.push(insn.into());
        self
    }

    /// Place a new label, returning it
    pub fn label(&mut self) -> Label {
        let label = self.next_label;
        self.next_label = label.next();
        self.elements.push(Pseudo::Label(label).into());
        label
    }

    pub fn local(&mut self, slot: u16, local: &str, descriptor: &str, start: Label, end: Label) {
        let declaration = LocalVariableDeclaration {
            slot,
            name: name(local),
            descriptor: FieldType::parse(descriptor).unwrap(),
            start,
            end,
        };
        self.elements.push(Pseudo::LocalVariable(declaration).into());
    }

    pub fn build(&self, max_locals: u16) -> TransformableCode {
        TransformableCode::new(self.method.clone(), self.elements.clone(), max_locals).unwrap()
    }
}

/// Code block which invokes the operation on top of the stack without arguments and drops the result
pub fn call_and_pop(builder: &mut CodeBuilder<'_>) -> Result<(), Error> {
    let settings = Settings::new();
    builder.const_int(0);
    builder.push_instruction(Instruction::ANewArray(RefType::Object(BinaryName::OBJECT)));
    builder.invoke(
        InvokeType::Interface,
        MethodRef::interface(
            settings.operation_interface.clone(),
            settings.operation_call_name.clone(),
            settings.operation_call_descriptor(),
        ),
    );
    builder.push_instruction(Instruction::Pop);
    Ok(())
}

/// Compact rendering of code, for comparing against expected shapes
pub fn shape(elements: &[CodeElement]) -> Vec<String> {
    elements
        .iter()
        .map(|element| match element {
            CodeElement::Instruction(Instruction::Invoke(_, method)) => {
                let class = method.class.as_str();
                let simple = class.rsplit('/').next().unwrap_or(class);
                format!("invoke {}.{}", simple, method.name.as_str())
            }
            CodeElement::Instruction(Instruction::InvokeDynamic(call_site)) => {
                format!("indy {}", call_site.descriptor)
            }
            CodeElement::Instruction(Instruction::New(class)) => {
                let class = class.as_str();
                format!("new {}", class.rsplit('/').next().unwrap_or(class))
            }
            CodeElement::Instruction(insn) => format!("{:?}", insn),
            CodeElement::Pseudo(pseudo) => format!("{:?}", pseudo),
        })
        .collect()
}

/// Name of the generated method a call site binds to
pub fn bound_method(element: &CodeElement) -> Option<UnqualifiedName> {
    match element {
        CodeElement::Instruction(Instruction::InvokeDynamic(call_site)) => {
            call_site.arguments.iter().find_map(|argument| match argument {
                Constant::MethodHandle(handle) => Some(handle.method.name.clone()),
                _ => None,
            })
        }
        _ => None,
    }
}

/// Shape of the code [`call_and_pop`] generates
pub fn call_and_pop_shape() -> Vec<String> {
    let mut allocator = Allocator::new(0, FreshLabels::new(Label::new(0)));
    let mut builder = CodeBuilder::new(&mut allocator);
    call_and_pop(&mut builder).unwrap();
    shape(&builder.finish())
}

pub fn strings(strs: &[&str]) -> Vec<String> {
    strs.iter().map(|s| String::from(*s)).collect()
}
