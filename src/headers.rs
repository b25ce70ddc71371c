use rustc_hash::FxHashMap;

/// Multi-value header map keyed by canonical (title-case) header names.
///
/// All lookups and inserts canonicalize the name first, so `content-type`,
/// `CONTENT-TYPE` and `Content-Type` address the same entry. Values for a
/// name keep their insertion order; iteration order across names is
/// unspecified.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Headers {
    map: FxHashMap<String, Vec<String>>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `value` to the list for `name`.
    pub fn append(&mut self, name: &str, value: impl Into<String>) {
        self.map.entry(canonical_key(name)).or_default().push(value.into());
    }

    /// Replaces every value for `name` with the single `value`.
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        self.map.insert(canonical_key(name), vec![value.into()]);
    }

    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.map.get(&canonical_key(name)).map(Vec::as_slice)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.map.contains_key(&canonical_key(name))
    }

    pub fn remove(&mut self, name: &str) {
        self.map.remove(&canonical_key(name));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<String>)> + '_ {
        self.map.iter()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Canonical form of a header name: each hyphen-separated token starts with
/// an uppercase ASCII letter, the rest is lowercase (`x-cache` → `X-Cache`).
pub fn canonical_key(name: &str) -> String {
    let mut canonical = String::with_capacity(name.len());
    let mut at_token_start = true;
    for c in name.chars() {
        if at_token_start {
            canonical.push(c.to_ascii_uppercase());
        } else {
            canonical.push(c.to_ascii_lowercase());
        }
        at_token_start = c == '-';
    }
    canonical
}
