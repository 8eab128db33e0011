//! Column patterns for list rules.
//!
//! A list rule matches every column shaped like
//! `<stem>[ws][_]<digits>[[ws][_]<suffix>]`, case-insensitively and anchored
//! at both ends. The digit run is the 1-based list position.
//!
//! Patterns are compiled once when the mapping table is built and then
//! shared read-only by every record.

use regex::Regex;

/// A compiled `stem + digits + optional suffix` matcher.
#[derive(Debug, Clone)]
pub struct ColumnPattern {
    stem: String,
    suffix: String,
    regex: Regex,
}

impl ColumnPattern {
    /// Compile a pattern. `stem` and `suffix` are matched literally.
    pub fn new(stem: &str, suffix: &str) -> Result<Self, regex::Error> {
        let stem = stem.trim();
        let suffix = suffix.trim();

        let mut source = format!(r"(?i)^{}\s*_?([0-9]+)", regex::escape(stem));
        if !suffix.is_empty() {
            source.push_str(&format!(r"(?:\s*_?{})?", regex::escape(suffix)));
        }
        source.push('$');

        Ok(Self {
            stem: stem.to_string(),
            suffix: suffix.to_string(),
            regex: Regex::new(&source)?,
        })
    }

    /// 1-based list position encoded in `column`, if it matches.
    ///
    /// Digit runs too long for `usize` do not match.
    pub fn position(&self, column: &str) -> Option<usize> {
        let caps = self.regex.captures(column)?;
        caps.get(1)?.as_str().parse().ok()
    }

    pub fn stem(&self) -> &str {
        &self.stem
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }
}

/// Primary and alias patterns of one list rule.
#[derive(Debug, Clone)]
pub struct ListPatterns {
    pub primary: ColumnPattern,
    pub alias: Option<ColumnPattern>,
}

impl ListPatterns {
    /// Primary from `prefix`, alias (if any) from `alias`; both take
    /// `variable` as optional suffix.
    pub fn compile(prefix: &str, variable: &str, alias: Option<&str>) -> Result<Self, regex::Error> {
        Ok(Self {
            primary: ColumnPattern::new(prefix, variable)?,
            alias: alias.map(|a| ColumnPattern::new(a, variable)).transpose()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_digits_suffix() {
        let pattern = ColumnPattern::new("item", "amt").unwrap();
        assert_eq!(pattern.position("item1amt"), Some(1));
        assert_eq!(pattern.position("ITEM12AMT"), Some(12));
        assert_eq!(pattern.position("item_3_amt"), Some(3));
        assert_eq!(pattern.position("item 4 amt"), Some(4));
        // suffix is optional
        assert_eq!(pattern.position("item5"), Some(5));
    }

    #[test]
    fn test_rejects_other_fields() {
        let pattern = ColumnPattern::new("item", "amt").unwrap();
        assert_eq!(pattern.position("item1qty"), None);
        assert_eq!(pattern.position("itemamt"), None);
        assert_eq!(pattern.position("xitem1amt"), None);
        assert_eq!(pattern.position("item1amount"), None);
    }

    #[test]
    fn test_positional_pattern() {
        let pattern = ColumnPattern::new("Driver", "").unwrap();
        assert_eq!(pattern.position("driver2"), Some(2));
        assert_eq!(pattern.position("Driver_10"), Some(10));
        assert_eq!(pattern.position("driver2name"), None);
    }

    #[test]
    fn test_stem_is_literal() {
        let pattern = ColumnPattern::new("a.b", "").unwrap();
        assert_eq!(pattern.position("a.b1"), Some(1));
        assert_eq!(pattern.position("axb1"), None);
    }

    #[test]
    fn test_overflowing_position_does_not_match() {
        let pattern = ColumnPattern::new("item", "").unwrap();
        assert_eq!(pattern.position("item99999999999999999999999"), None);
    }

    #[test]
    fn test_alias_pattern() {
        let patterns = ListPatterns::compile("item", "amt", Some("line")).unwrap();
        let alias = patterns.alias.unwrap();
        assert_eq!(alias.stem(), "line");
        assert_eq!(alias.position("line2amt"), Some(2));
        assert_eq!(alias.position("line2"), Some(2));
    }
}
