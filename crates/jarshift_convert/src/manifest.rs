//! `META-INF/MANIFEST.MF` editing.
//!
//! Only the main section is parsed. Per-entry sections after the first blank
//! line are carried through verbatim.

pub const MANIFEST_PATH: &str = "META-INF/MANIFEST.MF";

const MANIFEST_VERSION: &str = "Manifest-Version";
const MAX_LINE_BYTES: usize = 72;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JarManifest {
    main: Vec<(String, String)>,
    sections: String,
}

impl JarManifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse manifest text. Lines without a `: ` separator are skipped.
    pub fn parse(text: &str) -> Self {
        let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
        let (main_text, sections) = match normalized.find("\n\n") {
            Some(split) => (&normalized[..split], normalized[split + 2..].to_string()),
            None => (normalized.as_str(), String::new()),
        };

        let mut logical: Vec<String> = Vec::new();
        for line in main_text.lines() {
            match (line.strip_prefix(' '), logical.last_mut()) {
                (Some(continued), Some(previous)) => previous.push_str(continued),
                _ if line.is_empty() => {}
                _ => logical.push(line.to_string()),
            }
        }

        let main = logical
            .into_iter()
            .filter_map(|line| {
                let (key, value) = line.split_once(':')?;
                let key = key.trim();
                (!key.is_empty()).then(|| (key.to_string(), value.trim_start().to_string()))
            })
            .collect();

        Self {
            main,
            sections: sections.trim_matches('\n').to_string(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.main
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(key))
            .map(|(_, value)| value.as_str())
    }

    /// Replace the attribute (matched case-insensitively) or append it.
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        match self
            .main
            .iter_mut()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(key))
        {
            Some(entry) => entry.1 = value,
            None => self.main.push((key.to_string(), value)),
        }
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.main
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    /// Serialise with CRLF line endings and 72-byte line wrapping.
    /// `Manifest-Version` is always written first.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = String::new();
        let version = self.get(MANIFEST_VERSION).unwrap_or("1.0");
        write_attribute(&mut out, MANIFEST_VERSION, version);
        for (key, value) in &self.main {
            if !key.eq_ignore_ascii_case(MANIFEST_VERSION) {
                write_attribute(&mut out, key, value);
            }
        }
        out.push_str("\r\n");
        if !self.sections.is_empty() {
            for line in self.sections.lines() {
                out.push_str(line);
                out.push_str("\r\n");
            }
            out.push_str("\r\n");
        }
        out.into_bytes()
    }
}

fn write_attribute(out: &mut String, key: &str, value: &str) {
    let line = format!("{key}: {value}");
    let mut rest = line.as_str();
    let mut limit = MAX_LINE_BYTES;
    loop {
        if rest.len() <= limit {
            out.push_str(rest);
            out.push_str("\r\n");
            return;
        }
        let mut split = limit;
        while !rest.is_char_boundary(split) {
            split -= 1;
        }
        out.push_str(&rest[..split]);
        out.push_str("\r\n ");
        rest = &rest[split..];
        // continuation lines spend one byte on the leading space
        limit = MAX_LINE_BYTES - 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_main_attributes_in_order_and_sections_verbatim() {
        let text = "Manifest-Version: 1.0\r\nCreated-By: gradle\r\nMain-Class: a.B\r\n\r\nName: a/B.class\r\nSHA-256-Digest: abc\r\n\r\n";
        let mut manifest = JarManifest::parse(text);
        manifest.set("created-by", "jarshift");
        manifest.set("MixinConfigs", "a.mixins.json,b.mixins.json");

        let keys: Vec<_> = manifest.attributes().map(|(key, _)| key).collect();
        assert_eq!(keys, vec!["Manifest-Version", "Created-By", "Main-Class", "MixinConfigs"]);
        assert_eq!(manifest.get("Created-By"), Some("jarshift"));

        let written = String::from_utf8(manifest.to_bytes()).unwrap();
        assert_eq!(
            written,
            "Manifest-Version: 1.0\r\nCreated-By: jarshift\r\nMain-Class: a.B\r\nMixinConfigs: a.mixins.json,b.mixins.json\r\n\r\nName: a/B.class\r\nSHA-256-Digest: abc\r\n\r\n"
        );
    }

    #[test]
    fn joins_continuation_lines() {
        let manifest = JarManifest::parse("Manifest-Version: 1.0\nClass-Path: lib/one.jar\n  lib/two.jar\n");
        assert_eq!(manifest.get("class-path"), Some("lib/one.jar lib/two.jar"));
    }

    #[test]
    fn wraps_long_lines_at_72_bytes() {
        let mut manifest = JarManifest::new();
        let value = "x".repeat(150);
        manifest.set("MixinConfigs", value.clone());
        let written = String::from_utf8(manifest.to_bytes()).unwrap();

        assert!(written.starts_with("Manifest-Version: 1.0\r\n"));
        for line in written.split("\r\n") {
            assert!(line.len() <= 72, "line too long: {line:?}");
        }
        let reparsed = JarManifest::parse(&written);
        assert_eq!(reparsed.get("MixinConfigs"), Some(value.as_str()));
    }

    #[test]
    fn wrapping_respects_char_boundaries() {
        let mut manifest = JarManifest::new();
        let value = "é".repeat(60);
        manifest.set("Implementation-Title", value.clone());
        let written = String::from_utf8(manifest.to_bytes()).expect("valid UTF-8");
        assert_eq!(JarManifest::parse(&written).get("Implementation-Title"), Some(value.as_str()));
    }
}
