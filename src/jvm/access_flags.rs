use bitflags::bitflags;

bitflags! {
    /// Access flags on methods
    ///
    /// [0]: https://docs.oracle.com/javase/specs/jvms/se15/html/jvms-4.html#jvms-4.6-200-A.1
    pub struct MethodAccessFlags: u16 {
        const PUBLIC = 0x0001;
        const PRIVATE = 0x0002;
        const PROTECTED = 0x0004;
        const STATIC = 0x0008;
        const FINAL = 0x0010;
        const SYNCHRONIZED = 0x0020;
        const BRIDGE = 0x0040;
        const VARARGS = 0x0080;
        const NATIVE = 0x0100;
        const ABSTRACT = 0x0400;
        const STRICT = 0x0800;
        const SYNTHETIC = 0x1000;
    }
}

impl MethodAccessFlags {
    /// Flags of a compiler-generated lambda body
    pub const STATIC_LAMBDA: MethodAccessFlags = MethodAccessFlags::from_bits_truncate(
        MethodAccessFlags::PRIVATE.bits()
            | MethodAccessFlags::STATIC.bits()
            | MethodAccessFlags::SYNTHETIC.bits(),
    );

    pub fn is_static(&self) -> bool {
        self.contains(MethodAccessFlags::STATIC)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn lambda_flags() {
        assert_eq!(MethodAccessFlags::STATIC_LAMBDA.bits(), 0x100a);
        assert!(MethodAccessFlags::STATIC_LAMBDA.is_static());
        assert!(!MethodAccessFlags::PUBLIC.is_static());
    }
}
