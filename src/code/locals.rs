use crate::code::{CodeElement, Label, MethodContext, Point, Pseudo};
use crate::jvm::{Error, FieldType, UnqualifiedName};
use std::collections::{BTreeMap, HashMap};

/// One declared local variable and the points between which it is live
#[derive(Clone, Debug, PartialEq)]
pub struct LocalVariableEntry {
    pub slot: u16,
    pub name: UnqualifiedName,
    pub declared_type: FieldType,

    /// First point at which the variable is live
    pub scope_start: Point,

    /// First point at which the variable is no longer live
    pub scope_end: Point,

    /// Parameters are live from the very start of the method, whatever their scope start says
    pub is_parameter: bool,
}

impl LocalVariableEntry {
    pub fn contains(&self, point: Point) -> bool {
        (self.is_parameter || self.scope_start <= point) && point < self.scope_end
    }
}

/// Index of the local variable scope metadata of a method body
#[derive(Clone, Debug)]
pub struct LocalVariables {
    entries: Vec<LocalVariableEntry>,
}

impl LocalVariables {
    /// Build the index from the scope declarations among `elements`
    ///
    /// Returns `None` when the body declares no local variables at all.
    pub(crate) fn build(
        method: &MethodContext,
        elements: &[CodeElement],
        labels: &HashMap<Label, usize>,
    ) -> Result<Option<LocalVariables>, Error> {
        let parameter_slots = method.parameter_slots();
        let position = |label: Label| labels.get(&label).copied().ok_or(Error::UnknownLabel(label));

        let mut entries = vec![];
        for element in elements {
            if let CodeElement::Pseudo(Pseudo::LocalVariable(declaration)) = element {
                entries.push(LocalVariableEntry {
                    slot: declaration.slot,
                    name: declaration.name.clone(),
                    declared_type: declaration.descriptor.clone(),
                    scope_start: Point::after(position(declaration.start)?),
                    scope_end: Point::after(position(declaration.end)?),
                    is_parameter: declaration.slot < parameter_slots,
                });
            }
        }

        if entries.is_empty() {
            Ok(None)
        } else {
            log::trace!("Indexed {} local variables of {}", entries.len(), method);
            Ok(Some(LocalVariables { entries }))
        }
    }

    pub fn entries(&self) -> &[LocalVariableEntry] {
        &self.entries
    }

    /// All variables live at a point, keyed by slot
    pub fn find_in_scope(&self, point: Point) -> Result<BTreeMap<u16, &LocalVariableEntry>, Error> {
        let mut in_scope = BTreeMap::new();
        for entry in self.entries.iter().filter(|entry| entry.contains(point)) {
            if in_scope.insert(entry.slot, entry).is_some() {
                return Err(Error::DuplicateLocalInScope {
                    slot: entry.slot,
                    point,
                });
            }
        }
        Ok(in_scope)
    }

    /// Variable declared in a slot whose scope runs past a point
    pub fn outliving(&self, slot: u16, point: Point) -> Option<&LocalVariableEntry> {
        self.entries
            .iter()
            .find(|entry| entry.slot == slot && point < entry.scope_end)
    }

    /// Variable live in a particular slot at a point
    pub fn find(&self, slot: u16, point: Point) -> Result<Option<&LocalVariableEntry>, Error> {
        Ok(self.find_in_scope(point)?.remove(&slot))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::code::{Instruction, LocalVariableDeclaration, TransformableCode};
    use crate::jvm::{BinaryName, MethodDescriptor, Name, ParseDescriptor, TypeKind};

    fn name(s: &str) -> UnqualifiedName {
        UnqualifiedName::from_string(String::from(s)).unwrap()
    }

    fn declare(slot: u16, start: u32, end: u32) -> CodeElement {
        Pseudo::LocalVariable(LocalVariableDeclaration {
            slot,
            name: name(&format!("var{}", slot)),
            descriptor: FieldType::int(),
            start: Label::new(start),
            end: Label::new(end),
        })
        .into()
    }

    fn method(is_static: bool) -> MethodContext {
        MethodContext {
            class: BinaryName::OBJECT,
            name: name("target"),
            descriptor: MethodDescriptor::parse("(I)V").unwrap(),
            is_static,
        }
    }

    /// `0: L0, 1: iconst_1, 2: istore_1, 3: L1, 4: iload_1, 5: L2, 6: return`
    fn body() -> Vec<CodeElement> {
        vec![
            Pseudo::Label(Label::new(0)).into(),
            Instruction::IConst1.into(),
            Instruction::Store(TypeKind::Int, 1).into(),
            Pseudo::Label(Label::new(1)).into(),
            Instruction::Load(TypeKind::Int, 1).into(),
            Pseudo::Label(Label::new(2)).into(),
            Instruction::Return(None).into(),
        ]
    }

    #[test]
    fn half_open_scopes() {
        let mut elements = body();
        elements.push(declare(1, 1, 2));
        let code = TransformableCode::new(method(true), elements, 2).unwrap();
        let locals = code.locals().unwrap();

        assert!(locals.find(1, Point::before(3)).unwrap().is_none());
        assert!(locals.find(1, Point::after(3)).unwrap().is_some());
        assert!(locals.find(1, Point::before(5)).unwrap().is_some());
        assert!(locals.find(1, Point::after(5)).unwrap().is_none());
    }

    #[test]
    fn scopes_outliving_a_point() {
        let mut elements = body();
        elements.push(declare(1, 1, 2));
        let code = TransformableCode::new(method(true), elements, 2).unwrap();
        let locals = code.locals().unwrap();

        // Declared after the store, but still live once the store is done
        assert!(locals.find(1, Point::after(2)).unwrap().is_none());
        assert!(locals.outliving(1, Point::after(2)).is_some());
        assert!(locals.outliving(1, Point::after(5)).is_none());
        assert!(locals.outliving(0, Point::before(0)).is_none());
    }

    #[test]
    fn parameters_live_from_start() {
        let mut elements = body();
        elements.push(declare(0, 0, 2));
        let static_code = TransformableCode::new(method(true), elements.clone(), 2).unwrap();
        assert!(static_code.locals().unwrap().find(0, Point::before(0)).unwrap().is_some());

        // slot 0 is `this`, so the `int` parameter is slot 1 and slot 0 is still a parameter
        let instance_code = TransformableCode::new(method(false), elements, 2).unwrap();
        assert!(instance_code.locals().unwrap().entries()[0].is_parameter);
    }

    #[test]
    fn duplicate_slots_are_fatal() {
        let mut elements = body();
        elements.push(declare(1, 0, 2));
        elements.push(declare(1, 1, 2));
        let code = TransformableCode::new(method(true), elements, 2).unwrap();
        let locals = code.locals().unwrap();

        assert!(locals.find_in_scope(Point::before(1)).is_ok());
        assert!(matches!(
            locals.find_in_scope(Point::before(4)),
            Err(Error::DuplicateLocalInScope { slot: 1, .. })
        ));
    }

    #[test]
    fn no_metadata() {
        let code = TransformableCode::new(method(true), body(), 2).unwrap();
        assert!(code.locals().is_none());

        let mut elements = body();
        elements.push(declare(1, 1, 9));
        assert!(matches!(
            TransformableCode::new(method(true), elements, 2),
            Err(Error::UnknownLabel(_))
        ));
    }
}
