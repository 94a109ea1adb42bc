use crate::error::{FetchError, MappingError};
use std::collections::BTreeMap;
use std::fmt::Write as _;

/// Anchor type name → target type name, as published by the platform vendor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeCorrespondence {
    entries: BTreeMap<String, String>,
}

impl TypeCorrespondence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, anchor: &str) -> Option<&str> {
        self.entries.get(anchor).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn insert(&mut self, anchor: impl Into<String>, target: impl Into<String>) {
        self.entries.insert(anchor.into(), target.into());
    }

    /// Parse the vendor's obfuscation map. Only unindented type lines of the
    /// form `dotted.Target -> anchor:` are used.
    pub fn parse_obfuscation_map(text: &str) -> Result<Self, FetchError> {
        let mut correspondence = Self::new();
        for (index, line) in text.lines().enumerate() {
            if line.is_empty()
                || line.starts_with('#')
                || line.starts_with(' ')
                || line.starts_with('\t')
            {
                continue;
            }
            let normalized = line.trim().replace('.', "/");
            let terms: Vec<&str> = normalized.split_whitespace().collect();
            let anchor = match terms.as_slice() {
                [_, "->", anchor] => anchor.strip_suffix(':'),
                _ => None,
            };
            let Some(anchor) = anchor else {
                return Err(FetchError::Malformed(format!(
                    "line {}: expected `name -> anchor:`, found `{}`",
                    index + 1,
                    line
                )));
            };
            correspondence.insert(anchor, terms[0]);
        }
        Ok(correspondence)
    }

    /// Merge another half of the correspondence. Disagreeing entries are an
    /// error rather than silently picking a side.
    pub fn merge(&mut self, other: TypeCorrespondence) -> Result<(), FetchError> {
        for (anchor, target) in other.entries {
            match self.entries.get(&anchor) {
                Some(existing) if *existing != target => {
                    return Err(FetchError::Inconsistent {
                        anchor,
                        existing: existing.clone(),
                        incoming: target,
                    });
                }
                Some(_) => {}
                None => {
                    self.entries.insert(anchor, target);
                }
            }
        }
        Ok(())
    }

    pub fn to_tsv(&self) -> String {
        let mut out = String::new();
        for (anchor, target) in &self.entries {
            let _ = writeln!(out, "{}\t{}", anchor, target);
        }
        out
    }

    pub fn from_tsv(text: &str) -> Result<Self, MappingError> {
        let mut correspondence = Self::new();
        for (index, line) in text.lines().enumerate() {
            if line.is_empty() {
                continue;
            }
            let Some((anchor, target)) = line.split_once('\t') else {
                return Err(MappingError::MalformedCorrespondence {
                    line: index + 1,
                    message: "expected `anchor<TAB>target`".to_string(),
                });
            };
            if anchor.is_empty() || target.is_empty() || target.contains('\t') {
                return Err(MappingError::MalformedCorrespondence {
                    line: index + 1,
                    message: format!("invalid entry `{}`", line),
                });
            }
            correspondence.insert(anchor, target);
        }
        Ok(correspondence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLIENT: &str = "# header\n\
        net.minecraft.client.Minecraft -> fvp:\n    \
            int field -> a\n\
        net.minecraft.world.Level -> cmm:\n";

    #[test]
    fn parses_type_lines_only() {
        let correspondence = TypeCorrespondence::parse_obfuscation_map(CLIENT).expect("parse");
        assert_eq!(correspondence.len(), 2);
        assert_eq!(correspondence.get("fvp"), Some("net/minecraft/client/Minecraft"));
        assert_eq!(correspondence.get("cmm"), Some("net/minecraft/world/Level"));
    }

    #[test]
    fn merge_rejects_disagreement() {
        let mut client = TypeCorrespondence::parse_obfuscation_map(CLIENT).unwrap();
        let server =
            TypeCorrespondence::parse_obfuscation_map("net.minecraft.world.World -> cmm:\n")
                .unwrap();
        let error = client.merge(server).expect_err("conflict");
        assert!(matches!(error, FetchError::Inconsistent { ref anchor, .. } if anchor == "cmm"));
    }

    #[test]
    fn merge_accepts_agreeing_halves() {
        let mut client = TypeCorrespondence::parse_obfuscation_map(CLIENT).unwrap();
        let server = TypeCorrespondence::parse_obfuscation_map(
            "net.minecraft.world.Level -> cmm:\nnet.minecraft.server.Main -> srv:\n",
        )
        .unwrap();
        client.merge(server).expect("merge");
        assert_eq!(client.len(), 3);
    }

    #[test]
    fn tsv_round_trip_is_sorted() {
        let correspondence = TypeCorrespondence::parse_obfuscation_map(CLIENT).unwrap();
        let tsv = correspondence.to_tsv();
        assert_eq!(
            tsv,
            "cmm\tnet/minecraft/world/Level\nfvp\tnet/minecraft/client/Minecraft\n"
        );
        assert_eq!(TypeCorrespondence::from_tsv(&tsv).unwrap(), correspondence);
    }

    #[test]
    fn malformed_tsv_is_rejected() {
        assert!(TypeCorrespondence::from_tsv("no-tab-here\n").is_err());
    }
}
