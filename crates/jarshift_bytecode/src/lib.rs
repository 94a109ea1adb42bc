// jarshift_bytecode - Class-file rewriting against a symbol table
pub mod classfile;
mod hierarchy;
mod marker;
mod remapper;
mod rewrite;
pub mod signature;

pub use classfile::{ClassFile, ClassHeader, ClassParseError};
pub use hierarchy::{is_class_entry, HierarchyError, NodeId, TypeGraph, TypeNode};
pub use marker::{marker_class_name, synthesize_marker, MarkerClass, MarkerSpec};
pub use remapper::{RenameDecision, SymbolRemapper};
pub use rewrite::{ClassRewriter, RewriteError, RewrittenClass};
pub use signature::SignatureError;
