use crate::jvm::{
    BaseType, BinaryName, FieldType, MethodAccessFlags, MethodDescriptor, RefType,
    UnqualifiedName,
};

/// Names of the runtime support classes that rewritten code links against
pub struct Settings {
    /// Functional interface an extracted range is bound to, written as `my/pkg/Operation`
    pub operation_interface: BinaryName,

    /// Single abstract method of `operation_interface`
    ///
    /// It takes the arguments of the extracted range as an `Object[]` and returns the boxed
    /// result (or `null` for ranges which push nothing).
    pub operation_call_name: UnqualifiedName,

    /// Class with the static argument count check run at the start of each generated method
    pub operation_infra_class: BinaryName,

    /// Name of the `([Ljava/lang/Object;I)V` argument count check on `operation_infra_class`
    pub check_count_name: UnqualifiedName,

    /// Package of the mutable holder interfaces (`IntRef`, `ObjectRef`, ...)
    pub ref_api_package: BinaryName,

    /// Package of the holder implementations (`IntRefImpl`, `ObjectRefImpl`, ...)
    ///
    /// Each implementation has constructors `(T)V` and `()V`, a `get()T` method, a static
    /// `set(T, Impl)V` method, and `discard()V`, where `T` is the erased value type.
    pub ref_impl_package: BinaryName,

    /// First segment of every generated method name
    pub generated_method_prefix: UnqualifiedName,

    /// Access flags of generated methods
    pub generated_method_flags: MethodAccessFlags,
}

impl Settings {
    pub fn new() -> Settings {
        Settings {
            operation_interface: BinaryName::from_static(
                "fish/cichlidmc/sushi/api/transformer/infra/Operation",
            ),
            operation_call_name: UnqualifiedName::CALL,
            operation_infra_class: BinaryName::from_static(
                "fish/cichlidmc/sushi/api/transformer/infra/OperationInfra",
            ),
            check_count_name: UnqualifiedName::CHECKCOUNT,
            ref_api_package: BinaryName::from_static("fish/cichlidmc/sushi/api/ref"),
            ref_impl_package: BinaryName::from_static("fish/cichlidmc/sushi/impl/ref/runtime"),
            generated_method_prefix: UnqualifiedName::SUSHI,
            generated_method_flags: MethodAccessFlags::STATIC_LAMBDA,
        }
    }

    /// Erased descriptor of the operation interface method
    pub fn operation_call_descriptor(&self) -> MethodDescriptor {
        MethodDescriptor {
            parameters: vec![FieldType::array(FieldType::object(BinaryName::OBJECT))],
            return_type: Some(FieldType::object(BinaryName::OBJECT)),
        }
    }

    pub fn check_count_descriptor(&self) -> MethodDescriptor {
        MethodDescriptor {
            parameters: vec![
                FieldType::array(FieldType::object(BinaryName::OBJECT)),
                FieldType::Base(BaseType::Int),
            ],
            return_type: None,
        }
    }

    pub fn operation_type(&self) -> RefType {
        RefType::Object(self.operation_interface.clone())
    }

    /// Class in the holder API package
    pub(crate) fn ref_api_class(&self, simple_name: &'static str) -> BinaryName {
        self.ref_api_package
            .join(UnqualifiedName::from_static(simple_name))
    }

    /// Class in the holder implementation package
    pub(crate) fn ref_impl_class(&self, simple_name: &'static str) -> BinaryName {
        self.ref_impl_package
            .join(UnqualifiedName::from_static(simple_name))
    }
}

impl Default for Settings {
    fn default() -> Settings {
        Settings::new()
    }
}
