//! Class-file model: reading, writing and constant-pool editing.

mod builder;
mod constant;
pub mod mutf8;
mod model;
pub(crate) mod reader;
mod writer;

pub use builder::ClassBuilder;
pub use constant::{
    Constant, ConstantPool, REF_INVOKE_STATIC, TAG_CLASS, TAG_DOUBLE, TAG_DYNAMIC,
    TAG_FIELD_REF, TAG_FLOAT, TAG_INTEGER, TAG_INTERFACE_METHOD_REF, TAG_INVOKE_DYNAMIC,
    TAG_LONG, TAG_METHOD_HANDLE, TAG_METHOD_REF, TAG_METHOD_TYPE, TAG_MODULE,
    TAG_NAME_AND_TYPE, TAG_PACKAGE, TAG_STRING, TAG_UTF8,
};
pub use model::{
    read_header, Attribute, ClassFile, ClassHeader, Member, ACC_INTERFACE, ACC_PUBLIC,
    ACC_STATIC, ACC_SUPER, JAVA_17,
};
pub(crate) use writer::ClassWriter;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClassParseError {
    #[error("unexpected end of class file")]
    UnexpectedEof,
    #[error("invalid class file magic header")]
    InvalidMagic,
    #[error("unsupported constant pool tag {tag}")]
    UnsupportedConstant { tag: u8 },
    #[error("invalid constant pool index {index}")]
    InvalidConstantIndex { index: u16 },
    #[error("invalid modified UTF-8 in constant pool entry {index}")]
    InvalidModifiedUtf8 { index: u16 },
    #[error("constant pool would need {count} slots (limit 65535)")]
    TooManyConstants { count: usize },
    #[error("constant string of {length} bytes exceeds 65535")]
    Utf8TooLong { length: usize },
    #[error("attribute body of {length} bytes is too large")]
    AttributeTooLong { length: usize },
    #[error("table of {count} entries exceeds 65535")]
    TooManyEntries { count: usize },
    #[error("malformed {0} attribute")]
    MalformedAttribute(String),
    #[error("{count} trailing bytes after class file")]
    TrailingBytes { count: usize },
}
