use crate::jvm::{BinaryName, FieldType, MethodDescriptor, RefType};

/// Types consumed from and produced onto the operand stack by some span of code
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum StackDelta {
    /// At most one value pushed, like a method call
    MethodLike(MethodLike),

    /// Several values pushed (eg. by `dup2`)
    ///
    /// This is only useful for matching: it can't be marshalled across an extraction.
    MultiPush {
        popped: Vec<FieldType>,
        pushed: Vec<FieldType>,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MethodLike {
    /// Consumed values, deepest first
    pub popped: Vec<FieldType>,
    pub pushed: Option<FieldType>,
}

impl StackDelta {
    /// Delta for the given stack effect, in its method-like form whenever that is possible
    pub fn of(popped: Vec<FieldType>, mut pushed: Vec<FieldType>) -> StackDelta {
        if pushed.len() <= 1 {
            StackDelta::MethodLike(MethodLike {
                popped,
                pushed: pushed.pop(),
            })
        } else {
            StackDelta::MultiPush { popped, pushed }
        }
    }

    pub fn method_like(popped: Vec<FieldType>, pushed: Option<FieldType>) -> StackDelta {
        StackDelta::MethodLike(MethodLike { popped, pushed })
    }

    /// Delta of invoking a method, including its receiver when it isn't static
    pub fn of_method(descriptor: &MethodDescriptor, owner: &BinaryName, is_static: bool) -> StackDelta {
        let mut popped = Vec::with_capacity(descriptor.parameters.len() + 1);
        if !is_static {
            popped.push(FieldType::object(owner.clone()));
        }
        popped.extend(descriptor.parameters.iter().cloned());
        StackDelta::method_like(popped, descriptor.return_type.clone())
    }

    pub fn popped(&self) -> &[FieldType] {
        match self {
            StackDelta::MethodLike(method_like) => &method_like.popped,
            StackDelta::MultiPush { popped, .. } => popped,
        }
    }

    pub fn pushed_count(&self) -> usize {
        match self {
            StackDelta::MethodLike(method_like) => method_like.pushed.iter().len(),
            StackDelta::MultiPush { pushed, .. } => pushed.len(),
        }
    }

    pub fn as_method_like(&self) -> Option<&MethodLike> {
        match self {
            StackDelta::MethodLike(method_like) => Some(method_like),
            StackDelta::MultiPush { .. } => None,
        }
    }

    pub fn into_method_like(self) -> Result<MethodLike, StackDelta> {
        match self {
            StackDelta::MethodLike(method_like) => Ok(method_like),
            other => Err(other),
        }
    }
}

impl MethodLike {
    /// Pushed type, where `None` stands for `void`
    pub fn pushed_or_void(&self) -> Option<&FieldType> {
        self.pushed.as_ref()
    }

    /// Reference type the pushed value travels as through an `Object` channel
    ///
    /// Nothing pushed is represented as `java/lang/Void` (whose only value is `null`).
    pub fn pushed_or_boxed_void(&self) -> RefType {
        match &self.pushed {
            Some(pushed) => pushed.boxed(),
            None => RefType::Object(BinaryName::VOID),
        }
    }

    /// Descriptor of a method with the same stack effect
    pub fn as_descriptor(&self) -> MethodDescriptor {
        MethodDescriptor {
            parameters: self.popped.clone(),
            return_type: self.pushed.clone(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::jvm::ParseDescriptor;

    #[test]
    fn method_deltas() {
        let descriptor = MethodDescriptor::parse("(IJ)Ljava/lang/String;").unwrap();
        let owner = BinaryName::OBJECT;

        let virtual_delta = StackDelta::of_method(&descriptor, &owner, false);
        assert_eq!(
            virtual_delta.popped(),
            &[FieldType::object(BinaryName::OBJECT), FieldType::int(), FieldType::long()]
        );
        let static_delta = StackDelta::of_method(&descriptor, &owner, true);
        assert_eq!(static_delta.popped(), &[FieldType::int(), FieldType::long()]);
        assert_eq!(
            static_delta.as_method_like().unwrap().as_descriptor(),
            descriptor
        );
    }

    #[test]
    fn push_shapes() {
        let dup2 = StackDelta::of(vec![FieldType::int(), FieldType::int()], vec![FieldType::int(); 4]);
        assert!(dup2.as_method_like().is_none());
        assert_eq!(dup2.pushed_count(), 4);

        let void = StackDelta::of(vec![FieldType::int()], vec![]);
        let void = void.as_method_like().unwrap();
        assert_eq!(void.pushed_or_void(), None);
        assert_eq!(void.pushed_or_boxed_void(), RefType::Object(BinaryName::VOID));

        let int = StackDelta::of(vec![], vec![FieldType::int()]);
        assert_eq!(
            int.as_method_like().unwrap().pushed_or_boxed_void(),
            RefType::Object(BinaryName::INTEGER)
        );
    }
}
