/// A set of path prefixes exempt from a gate.
///
/// An entry matches the path itself and anything below it: `/setup` matches
/// `/setup` and `/setup/start` but not `/setupx`.
#[derive(Debug, Clone, Default)]
pub struct ExemptPaths {
    entries: Vec<String>,
}

impl ExemptPaths {
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut paths = Self::default();
        for entry in entries {
            paths.push(entry.as_ref());
        }
        paths
    }

    pub fn push(&mut self, entry: &str) {
        let entry = entry.trim();
        if entry.is_empty() {
            return;
        }
        let normalized = match entry.trim_end_matches('/') {
            "" => "/",
            trimmed => trimmed,
        };
        if !self.entries.iter().any(|e| e == normalized) {
            self.entries.push(normalized.to_string());
        }
    }

    pub fn matches(&self, path: &str) -> bool {
        self.entries.iter().any(|entry| {
            path == entry
                || (entry != "/"
                    && path
                        .strip_prefix(entry.as_str())
                        .is_some_and(|rest| rest.starts_with('/')))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_and_subpath_match() {
        let paths = ExemptPaths::new(["/setup", "/api/health"]);
        assert!(paths.matches("/setup"));
        assert!(paths.matches("/setup/start"));
        assert!(paths.matches("/api/health"));
        assert!(!paths.matches("/setupx"));
        assert!(!paths.matches("/api/healthz"));
        assert!(!paths.matches("/"));
    }

    #[test]
    fn test_trailing_slash_normalized() {
        let paths = ExemptPaths::new(["/static/"]);
        assert!(paths.matches("/static/app.js"));
        assert!(paths.matches("/static"));
    }

    #[test]
    fn test_root_entry_matches_only_root() {
        let paths = ExemptPaths::new(["/"]);
        assert!(paths.matches("/"));
        assert!(!paths.matches("/anything"));
    }

    #[test]
    fn test_blank_entries_ignored() {
        let paths = ExemptPaths::new(["", "  "]);
        assert!(!paths.matches("/"));
        assert!(!paths.matches(""));
    }
}
