//! DEX access flags and their rendering as Java modifier keywords.
//!
//! The same bit means different things depending on what it decorates
//! (0x40 is `volatile` on a field but `bridge` on a method), so rendering
//! goes through one ordered table per vocabulary.

use bitflags::bitflags;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct AccessFlags: u32 {
        const PUBLIC = 0x1;
        const PRIVATE = 0x2;
        const PROTECTED = 0x4;
        const STATIC = 0x8;
        const FINAL = 0x10;
        const SYNCHRONIZED = 0x20;
        const VOLATILE = 0x40;
        const BRIDGE = 0x40;
        const TRANSIENT = 0x80;
        const VARARGS = 0x80;
        const NATIVE = 0x100;
        const INTERFACE = 0x200;
        const ABSTRACT = 0x400;
        const STRICT = 0x800;
        const SYNTHETIC = 0x1000;
        const ANNOTATION = 0x2000;
        const ENUM = 0x4000;
        const CONSTRUCTOR = 0x10000;
        const DECLARED_SYNCHRONIZED = 0x20000;
    }
}

/// Selects which keyword vocabulary a flag word is rendered with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagKind {
    Class,
    Field,
    Method,
}

const CLASS_FLAGS: &[(AccessFlags, &str)] = &[
    (AccessFlags::PUBLIC, "public"),
    (AccessFlags::PRIVATE, "private"),
    (AccessFlags::PROTECTED, "protected"),
    (AccessFlags::STATIC, "static"),
    (AccessFlags::FINAL, "final"),
    (AccessFlags::INTERFACE, "interface"),
    (AccessFlags::ABSTRACT, "abstract"),
    (AccessFlags::SYNTHETIC, "synthetic"),
    (AccessFlags::ANNOTATION, "annotation"),
    (AccessFlags::ENUM, "enum"),
];

const FIELD_FLAGS: &[(AccessFlags, &str)] = &[
    (AccessFlags::PUBLIC, "public"),
    (AccessFlags::PRIVATE, "private"),
    (AccessFlags::PROTECTED, "protected"),
    (AccessFlags::STATIC, "static"),
    (AccessFlags::FINAL, "final"),
    (AccessFlags::VOLATILE, "volatile"),
    (AccessFlags::TRANSIENT, "transient"),
    (AccessFlags::SYNTHETIC, "synthetic"),
    (AccessFlags::ENUM, "enum"),
];

const METHOD_FLAGS: &[(AccessFlags, &str)] = &[
    (AccessFlags::PUBLIC, "public"),
    (AccessFlags::PRIVATE, "private"),
    (AccessFlags::PROTECTED, "protected"),
    (AccessFlags::STATIC, "static"),
    (AccessFlags::FINAL, "final"),
    (AccessFlags::SYNCHRONIZED, "synchronized"),
    (AccessFlags::BRIDGE, "bridge"),
    (AccessFlags::VARARGS, "varargs"),
    (AccessFlags::NATIVE, "native"),
    (AccessFlags::ABSTRACT, "abstract"),
    (AccessFlags::STRICT, "strictfp"),
    (AccessFlags::SYNTHETIC, "synthetic"),
    (AccessFlags::CONSTRUCTOR, "constructor"),
    (AccessFlags::DECLARED_SYNCHRONIZED, "declared-synchronized"),
];

/// Renders a raw flag word as space-joined modifier keywords, iterating the
/// vocabulary's fixed order. Unknown bits are ignored.
pub fn describe_flags(raw: u32, kind: FlagKind) -> String {
    let flags = AccessFlags::from_bits_truncate(raw);
    let table = match kind {
        FlagKind::Class => CLASS_FLAGS,
        FlagKind::Field => FIELD_FLAGS,
        FlagKind::Method => METHOD_FLAGS,
    };
    let mut keywords = Vec::new();
    for (bit, keyword) in table {
        if flags.contains(*bit) {
            keywords.push(*keyword);
        }
    }
    keywords.join(" ")
}
