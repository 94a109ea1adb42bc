//! Line-oriented mapping datasets.
//!
//! A dataset pairs names from two namespaces ("left" and "right" columns).
//! Type records (`c`) open a scope; member records (`m`, `f`) that follow
//! belong to the most recent type. Indentation is tab based: deeper records
//! (parameters, locals, comments) are ignored.

use crate::error::MappingError;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawDataset {
    pub namespaces: Option<(String, String)>,
    pub types: Vec<RawType>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawType {
    pub left: String,
    pub right: String,
    pub fields: Vec<RawMember>,
    pub methods: Vec<RawMember>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMember {
    pub descriptor: String,
    pub left: String,
    pub right: String,
}

impl RawType {
    pub fn new(left: impl Into<String>, right: impl Into<String>) -> Self {
        Self {
            left: left.into(),
            right: right.into(),
            fields: Vec::new(),
            methods: Vec::new(),
        }
    }
}

impl RawMember {
    pub fn new(
        descriptor: impl Into<String>,
        left: impl Into<String>,
        right: impl Into<String>,
    ) -> Self {
        Self {
            descriptor: descriptor.into(),
            left: left.into(),
            right: right.into(),
        }
    }
}

impl RawDataset {
    pub fn parse_file(path: &Path) -> Result<Self, MappingError> {
        let text = fs::read_to_string(path).map_err(|source| MappingError::io(path, source))?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self, MappingError> {
        let mut dataset = RawDataset::default();

        for (index, raw_line) in text.lines().enumerate() {
            let line_no = index + 1;
            let line = raw_line.trim_end_matches('\r');
            let depth = line.chars().take_while(|ch| *ch == '\t').count();
            let content = line.trim_start();
            if content.is_empty() || content.starts_with('#') {
                continue;
            }

            let terms: Vec<&str> = content.split('\t').collect();
            match (depth, terms[0]) {
                (0, "tiny") if dataset.types.is_empty() && dataset.namespaces.is_none() => {
                    if terms.len() >= 5 {
                        dataset.namespaces = Some((terms[3].to_string(), terms[4].to_string()));
                    }
                }
                (0, "c") => {
                    let [left, right] = columns::<2>(&terms[1..], line_no, "c")?;
                    dataset.types.push(RawType::new(left, right));
                }
                (0 | 1, tag @ ("m" | "f")) => {
                    let [descriptor, left, right] = columns::<3>(&terms[1..], line_no, tag)?;
                    let owner = dataset.types.last_mut().ok_or_else(|| MappingError::Malformed {
                        line: line_no,
                        message: format!("'{}' record outside of a type scope", tag),
                    })?;
                    let member = RawMember::new(descriptor, left, right);
                    if tag == "m" {
                        owner.methods.push(member);
                    } else {
                        owner.fields.push(member);
                    }
                }
                (_, tag) => {
                    debug!(line = line_no, tag, "skipping mapping record");
                }
            }
        }

        Ok(dataset)
    }

    /// Serialize back into the dataset grammar. The output keeps record order,
    /// so parsing it yields an equal dataset.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        if let Some((left, right)) = &self.namespaces {
            let _ = writeln!(out, "tiny\t2\t0\t{}\t{}", left, right);
        }
        for ty in &self.types {
            let _ = writeln!(out, "c\t{}\t{}", ty.left, ty.right);
            for field in &ty.fields {
                let _ = writeln!(
                    out,
                    "\tf\t{}\t{}\t{}",
                    field.descriptor, field.left, field.right
                );
            }
            for method in &ty.methods {
                let _ = writeln!(
                    out,
                    "\tm\t{}\t{}\t{}",
                    method.descriptor, method.left, method.right
                );
            }
        }
        out
    }

    pub fn find_type(&self, left: &str) -> Option<&RawType> {
        self.types.iter().find(|ty| ty.left == left)
    }
}

fn columns<const N: usize>(
    terms: &[&str],
    line: usize,
    tag: &str,
) -> Result<[String; N], MappingError> {
    if terms.len() < N || terms[..N].iter().any(|term| term.is_empty()) {
        return Err(MappingError::Malformed {
            line,
            message: format!("'{}' record needs {} columns, found {}", tag, N, terms.len()),
        });
    }
    Ok(std::array::from_fn(|i| terms[i].to_string()))
}
