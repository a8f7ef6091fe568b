use unicode_normalization::UnicodeNormalization;

/// Selection key for the all-sites view.
pub const GLOBAL_KEY: &str = "global";

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

/// Drop combining diacritical marks after canonical decomposition.
pub fn strip_diacritics(value: &str) -> String {
    value
        .nfd()
        .filter(|c| !('\u{0300}'..='\u{036f}').contains(c))
        .collect()
}

/// Lookup form of a site name: lowercase, no whitespace or hyphens, no
/// accents. `"Pépinière"`, `"pepiniere"` and `"PEPINIERE"` all give
/// `"pepiniere"`; `"St-Germain"` and `"St Germain"` both give `"stgermain"`.
pub fn normalize(name: &str) -> String {
    let compact: String = name
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect();
    strip_diacritics(&compact)
}

// ---------------------------------------------------------------------------
// Selection resolution
// ---------------------------------------------------------------------------

/// Canonical site names indexed by their normalized form.
#[derive(Debug, Clone)]
pub struct NameIndex {
    reserved: Vec<String>,
    entries: Vec<(String, String)>,
}

impl Default for NameIndex {
    fn default() -> Self {
        NameIndex {
            reserved: vec![GLOBAL_KEY.to_string()],
            entries: Vec::new(),
        }
    }
}

impl NameIndex {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let entries = names
            .into_iter()
            .map(|n| {
                let name: String = n.into();
                (normalize(&name), name)
            })
            .collect();
        NameIndex {
            entries,
            ..Default::default()
        }
    }

    /// Replace the reserved keys that bypass lookup.
    pub fn with_reserved<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.reserved = keys.into_iter().map(Into::into).collect();
        self
    }

    pub fn is_reserved(&self, key: &str) -> bool {
        self.reserved.iter().any(|r| r == key)
    }

    /// First canonical name whose normalized form matches `key`'s.
    pub fn find(&self, key: &str) -> Option<&str> {
        let wanted = normalize(key);
        self.entries
            .iter()
            .find(|(normalized, _)| *normalized == wanted)
            .map(|(_, name)| name.as_str())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.find(key).is_some()
    }

    /// Reserved keys pass through, known names resolve to their canonical
    /// spelling, anything else comes back unchanged.
    pub fn resolve(&self, key: &str) -> String {
        if self.is_reserved(key) {
            return key.to_string();
        }
        self.find(key).unwrap_or(key).to_string()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One-shot form of [`NameIndex::resolve`] with the default reserved keys.
pub fn resolve_selection<'a, I>(key: &str, available: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    NameIndex::new(available).resolve(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accents_and_case_are_ignored() {
        assert_eq!(normalize("Pépinière"), "pepiniere");
        assert_eq!(normalize("pepiniere"), normalize("Pépinière"));
        assert_eq!(normalize("PEPINIERE"), normalize("Pépinière"));
        assert_eq!(normalize("PÉPINIÈRE"), "pepiniere");
    }

    #[test]
    fn whitespace_and_hyphens_are_removed() {
        assert_eq!(normalize("St Germain"), "stgermain");
        assert_eq!(normalize("St-Germain"), "stgermain");
        assert_eq!(normalize("  st \t germain "), "stgermain");
    }

    #[test]
    fn resolve_returns_canonical_spelling() {
        let names = ["Pépinière", "Sanssac", "St Germain"];
        assert_eq!(resolve_selection("pepiniere", names), "Pépinière");
        assert_eq!(resolve_selection("st-germain", names), "St Germain");
    }

    #[test]
    fn reserved_and_unknown_keys_pass_through() {
        let names = ["Pépinière", "Global"];
        assert_eq!(resolve_selection(GLOBAL_KEY, names), GLOBAL_KEY);
        assert_eq!(resolve_selection("Yssingeaux", names), "Yssingeaux");
    }

    #[test]
    fn custom_reserved_keys() {
        let index = NameIndex::new(["Polignac"]).with_reserved(["all", "compare"]);
        assert!(index.is_reserved("compare"));
        assert!(!index.is_reserved(GLOBAL_KEY));
        assert_eq!(index.resolve("compare"), "compare");
        assert_eq!(index.resolve("POLIGNAC"), "Polignac");
        assert!(index.contains("polignac"));
        assert_eq!(index.len(), 1);
    }
}
