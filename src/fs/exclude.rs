/// Directory names skipped by default.
pub const DEFAULT_EXCLUDE_PATTERNS: &[&str] = &[".git", "node_modules", "target"];

/// Names of directories the reader must not descend into.
///
/// A pattern matches a whole directory name exactly.
#[derive(Debug, Clone, Default)]
pub struct ExcludeRules {
    patterns: Vec<String>,
}

impl ExcludeRules {
    pub fn new(patterns: Vec<String>) -> Self {
        Self { patterns }
    }

    pub fn defaults() -> Self {
        Self::new(DEFAULT_EXCLUDE_PATTERNS.iter().map(|s| s.to_string()).collect())
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Whether a single directory name is excluded.
    pub fn matches_name(&self, name: &str) -> bool {
        self.patterns.iter().any(|p| p == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exclude_git_directory() {
        let rules = ExcludeRules::new(vec![".git".to_string()]);
        assert!(rules.matches_name(".git"));
        assert!(!rules.matches_name("objects"));
    }

    #[test]
    fn do_not_exclude_normal_paths() {
        let rules = ExcludeRules::defaults();
        assert!(!rules.matches_name("src"));
        assert!(!rules.matches_name("main.rs"));
    }

    #[test]
    fn empty_rules_exclude_nothing() {
        let rules = ExcludeRules::default();
        assert!(rules.is_empty());
        assert!(!rules.matches_name(".git"));
    }

    #[test]
    fn partial_name_does_not_match() {
        let rules = ExcludeRules::new(vec!["target".to_string()]);
        // exact name match required
        assert!(!rules.matches_name("target2"));
        assert!(!rules.matches_name("my-target"));
    }

    #[test]
    fn defaults_cover_common_build_dirs() {
        let rules = ExcludeRules::defaults();
        assert!(rules.matches_name("node_modules"));
        assert!(rules.matches_name("target"));
    }
}
