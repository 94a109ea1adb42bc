//! Entry-point resolution.
//!
//! Entry points are declared as `com.example.Type` or
//! `com.example.Type::member` and resolved against the archive's own classes
//! through a [`LanguageAdapter`]. Nothing is loaded or invoked here; the result
//! describes how the host should reach the entry point.

use super::Entrypoint;
use jarshift_bytecode::classfile::{ClassFile, ACC_STATIC};
use jarshift_bytecode::ClassParseError;
use std::collections::HashMap;
use thiserror::Error;

pub const DEFAULT_ADAPTER_ID: &str = "default";

/// Parsed form of an entry-point value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntrypointTarget {
    /// `Type`: construct with the no-arg constructor.
    Constructor { class: String },
    /// `Type::member`: a static field or a method.
    Member { class: String, member: String },
}

impl EntrypointTarget {
    /// Parse a declared value. Class names are returned in internal
    /// (slash-separated) form.
    pub fn parse(value: &str) -> Result<Self, EntrypointError> {
        let malformed = || EntrypointError::Malformed {
            value: value.to_string(),
        };
        let (class, member) = match value.split_once("::") {
            Some((class, member)) => (class, Some(member)),
            None => (value, None),
        };
        if class.is_empty() || class.contains(char::is_whitespace) {
            return Err(malformed());
        }
        let class = class.replace('.', "/");
        match member {
            None => Ok(EntrypointTarget::Constructor { class }),
            Some(member) if !member.is_empty() && !member.contains("::") => {
                Ok(EntrypointTarget::Member {
                    class,
                    member: member.to_string(),
                })
            }
            Some(_) => Err(malformed()),
        }
    }

    pub fn class(&self) -> &str {
        match self {
            EntrypointTarget::Constructor { class } | EntrypointTarget::Member { class, .. } => {
                class
            }
        }
    }
}

/// How a resolved entry point is reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedEntrypoint {
    Constructor {
        class: String,
    },
    StaticField {
        class: String,
        field: String,
        descriptor: String,
    },
    StaticMethod {
        class: String,
        method: String,
        descriptor: String,
    },
    /// Requires an instance built with the no-arg constructor.
    InstanceMethod {
        class: String,
        method: String,
        descriptor: String,
    },
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EntrypointError {
    #[error("malformed entry point `{value}`")]
    Malformed { value: String },
    #[error("no language adapter `{adapter}`")]
    UnknownAdapter { adapter: String },
    #[error("class {class} is not in the archive")]
    MissingClass { class: String },
    #[error("{class} has no no-arg constructor")]
    NoConstructor { class: String },
    #[error("{class} has no field or method named {member}")]
    MissingMember { class: String, member: String },
    #[error("{class}::{member} is ambiguous")]
    Ambiguous { class: String, member: String },
    #[error("field {class}::{member} is not static")]
    NotStatic { class: String, member: String },
}

/// One declared entry point and what became of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntrypointOutcome {
    pub key: String,
    pub entrypoint: Entrypoint,
    pub result: Result<ResolvedEntrypoint, EntrypointError>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct MemberSummary {
    name: String,
    descriptor: String,
    access_flags: u16,
}

impl MemberSummary {
    fn is_static(&self) -> bool {
        self.access_flags & ACC_STATIC != 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ClassSummary {
    fields: Vec<MemberSummary>,
    methods: Vec<MemberSummary>,
}

/// Member signatures of the classes entry points can refer to.
#[derive(Debug, Clone, Default)]
pub struct ClassIndex {
    classes: HashMap<String, ClassSummary>,
}

impl ClassIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, class: &ClassFile) -> Result<(), ClassParseError> {
        let summarize = |members: Vec<(String, String, u16)>| {
            members
                .into_iter()
                .map(|(name, descriptor, access_flags)| MemberSummary {
                    name,
                    descriptor,
                    access_flags,
                })
                .collect()
        };
        let summary = ClassSummary {
            fields: summarize(class.field_signatures()?),
            methods: summarize(class.method_signatures()?),
        };
        self.classes.insert(class.name()?, summary);
        Ok(())
    }

    pub fn contains(&self, class: &str) -> bool {
        self.classes.contains_key(class)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    fn get(&self, class: &str) -> Option<&ClassSummary> {
        self.classes.get(class)
    }
}

/// Resolves entry points written for one language.
pub trait LanguageAdapter: Send + Sync {
    fn id(&self) -> &str;

    fn resolve(
        &self,
        target: &EntrypointTarget,
        classes: &ClassIndex,
    ) -> Result<ResolvedEntrypoint, EntrypointError>;
}

/// Java-style resolution: constructors, static fields and single methods.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultLanguageAdapter;

impl LanguageAdapter for DefaultLanguageAdapter {
    fn id(&self) -> &str {
        DEFAULT_ADAPTER_ID
    }

    fn resolve(
        &self,
        target: &EntrypointTarget,
        classes: &ClassIndex,
    ) -> Result<ResolvedEntrypoint, EntrypointError> {
        let class = target.class();
        let summary = classes
            .get(class)
            .ok_or_else(|| EntrypointError::MissingClass {
                class: class.to_string(),
            })?;
        let has_constructor = summary
            .methods
            .iter()
            .any(|method| method.name == "<init>" && method.descriptor == "()V");

        let member = match target {
            EntrypointTarget::Constructor { class } => {
                return if has_constructor {
                    Ok(ResolvedEntrypoint::Constructor {
                        class: class.clone(),
                    })
                } else {
                    Err(EntrypointError::NoConstructor {
                        class: class.clone(),
                    })
                };
            }
            EntrypointTarget::Member { member, .. } => member,
        };

        let field = summary.fields.iter().find(|field| &field.name == member);
        let mut methods = summary.methods.iter().filter(|method| &method.name == member);
        let method = methods.next();
        let ambiguous = || EntrypointError::Ambiguous {
            class: class.to_string(),
            member: member.clone(),
        };
        if methods.next().is_some() {
            return Err(ambiguous());
        }

        match (field, method) {
            (Some(_), Some(_)) => Err(ambiguous()),
            (Some(field), None) if field.is_static() => Ok(ResolvedEntrypoint::StaticField {
                class: class.to_string(),
                field: field.name.clone(),
                descriptor: field.descriptor.clone(),
            }),
            (Some(_), None) => Err(EntrypointError::NotStatic {
                class: class.to_string(),
                member: member.clone(),
            }),
            (None, Some(method)) if method.is_static() => Ok(ResolvedEntrypoint::StaticMethod {
                class: class.to_string(),
                method: method.name.clone(),
                descriptor: method.descriptor.clone(),
            }),
            (None, Some(method)) if has_constructor => Ok(ResolvedEntrypoint::InstanceMethod {
                class: class.to_string(),
                method: method.name.clone(),
                descriptor: method.descriptor.clone(),
            }),
            (None, Some(_)) => Err(EntrypointError::NoConstructor {
                class: class.to_string(),
            }),
            (None, None) => Err(EntrypointError::MissingMember {
                class: class.to_string(),
                member: member.clone(),
            }),
        }
    }
}

/// Language adapters by id.
pub struct AdapterRegistry {
    adapters: Vec<Box<dyn LanguageAdapter>>,
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self {
            adapters: vec![Box::new(DefaultLanguageAdapter)],
        }
    }
}

impl std::fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.adapters.iter().map(|adapter| adapter.id()))
            .finish()
    }
}

impl AdapterRegistry {
    /// Register an adapter; a later registration with the same id wins.
    pub fn register(&mut self, adapter: Box<dyn LanguageAdapter>) {
        self.adapters.retain(|existing| existing.id() != adapter.id());
        self.adapters.push(adapter);
    }

    pub fn get(&self, id: &str) -> Option<&dyn LanguageAdapter> {
        self.adapters
            .iter()
            .find(|adapter| adapter.id() == id)
            .map(|adapter| adapter.as_ref())
    }

    pub fn resolve(&self, entrypoint: &Entrypoint, classes: &ClassIndex) -> Result<ResolvedEntrypoint, EntrypointError> {
        let adapter = self
            .get(&entrypoint.adapter)
            .ok_or_else(|| EntrypointError::UnknownAdapter {
                adapter: entrypoint.adapter.clone(),
            })?;
        let target = EntrypointTarget::parse(&entrypoint.value)?;
        adapter.resolve(&target, classes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jarshift_bytecode::classfile::{ClassBuilder, ACC_PUBLIC};
    use test_case::test_case;

    fn index() -> ClassIndex {
        let mut builder = ClassBuilder::new("com/example/Main", Some("java/lang/Object")).unwrap();
        builder.add_method(ACC_PUBLIC, "<init>", "()V", Vec::new()).unwrap();
        builder
            .add_method(ACC_PUBLIC, "onInitialize", "()V", Vec::new())
            .unwrap();
        builder
            .add_method(ACC_PUBLIC | ACC_STATIC, "boot", "()V", Vec::new())
            .unwrap();
        builder
            .add_method(ACC_PUBLIC, "twice", "()V", Vec::new())
            .unwrap();
        builder
            .add_method(ACC_PUBLIC, "twice", "(I)V", Vec::new())
            .unwrap();
        builder
            .add_field(ACC_PUBLIC | ACC_STATIC, "INSTANCE", "Ljava/lang/Runnable;", Vec::new())
            .unwrap();
        builder
            .add_field(ACC_PUBLIC, "plain", "Ljava/lang/Runnable;", Vec::new())
            .unwrap();
        let main = builder.build();

        let no_ctor = ClassBuilder::new("com/example/NoCtor", Some("java/lang/Object"))
            .unwrap()
            .build();

        let mut index = ClassIndex::new();
        index.insert(&main).unwrap();
        index.insert(&no_ctor).unwrap();
        index
    }

    fn entry(value: &str) -> Entrypoint {
        Entrypoint {
            adapter: DEFAULT_ADAPTER_ID.to_string(),
            value: value.to_string(),
        }
    }

    #[test]
    fn parses_targets() {
        assert_eq!(
            EntrypointTarget::parse("com.example.Main").unwrap(),
            EntrypointTarget::Constructor {
                class: "com/example/Main".to_string()
            }
        );
        assert_eq!(
            EntrypointTarget::parse("com.example.Main$Inner::run").unwrap(),
            EntrypointTarget::Member {
                class: "com/example/Main$Inner".to_string(),
                member: "run".to_string()
            }
        );
        assert!(EntrypointTarget::parse("com.example.Main::").is_err());
        assert!(EntrypointTarget::parse("::run").is_err());
    }

    #[test_case("com.example.Main", ResolvedEntrypoint::Constructor { class: "com/example/Main".into() } ; "constructor")]
    #[test_case(
        "com.example.Main::INSTANCE",
        ResolvedEntrypoint::StaticField {
            class: "com/example/Main".into(),
            field: "INSTANCE".into(),
            descriptor: "Ljava/lang/Runnable;".into()
        } ;
        "static field"
    )]
    #[test_case(
        "com.example.Main::boot",
        ResolvedEntrypoint::StaticMethod {
            class: "com/example/Main".into(),
            method: "boot".into(),
            descriptor: "()V".into()
        } ;
        "static method"
    )]
    #[test_case(
        "com.example.Main::onInitialize",
        ResolvedEntrypoint::InstanceMethod {
            class: "com/example/Main".into(),
            method: "onInitialize".into(),
            descriptor: "()V".into()
        } ;
        "instance method"
    )]
    fn resolves_default_entrypoints(value: &str, expected: ResolvedEntrypoint) {
        let registry = AdapterRegistry::default();
        assert_eq!(registry.resolve(&entry(value), &index()), Ok(expected));
    }

    #[test]
    fn reports_resolution_failures() {
        let registry = AdapterRegistry::default();
        let classes = index();
        let resolve = |value: &str| registry.resolve(&entry(value), &classes);

        assert!(matches!(resolve("com.example.Missing"), Err(EntrypointError::MissingClass { .. })));
        assert!(matches!(resolve("com.example.NoCtor"), Err(EntrypointError::NoConstructor { .. })));
        assert!(matches!(resolve("com.example.Main::twice"), Err(EntrypointError::Ambiguous { .. })));
        assert!(matches!(resolve("com.example.Main::plain"), Err(EntrypointError::NotStatic { .. })));
        assert!(matches!(resolve("com.example.Main::nothing"), Err(EntrypointError::MissingMember { .. })));

        let kotlin = Entrypoint {
            adapter: "kotlin".to_string(),
            value: "com.example.Main".to_string(),
        };
        assert_eq!(
            registry.resolve(&kotlin, &classes),
            Err(EntrypointError::UnknownAdapter {
                adapter: "kotlin".to_string()
            })
        );
    }

    #[test]
    fn registered_adapters_are_used() {
        struct Fixed;
        impl LanguageAdapter for Fixed {
            fn id(&self) -> &str {
                "fixed"
            }
            fn resolve(
                &self,
                target: &EntrypointTarget,
                _classes: &ClassIndex,
            ) -> Result<ResolvedEntrypoint, EntrypointError> {
                Ok(ResolvedEntrypoint::Constructor {
                    class: target.class().to_string(),
                })
            }
        }

        let mut registry = AdapterRegistry::default();
        registry.register(Box::new(Fixed));
        let entrypoint = Entrypoint {
            adapter: "fixed".to_string(),
            value: "anything.At.All".to_string(),
        };
        assert_eq!(
            registry.resolve(&entrypoint, &ClassIndex::new()),
            Ok(ResolvedEntrypoint::Constructor {
                class: "anything/At/All".to_string()
            })
        );
    }
}
