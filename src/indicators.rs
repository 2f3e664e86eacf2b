use anyhow::{Context, Result};
use log::debug;
use std::collections::HashSet;
use std::path::Path;

/// A source of known-malicious indicators. One yes/no answer per value —
/// whether matching is exact, suffix-based, or pattern-based is the
/// provider's concern, not the detector's.
pub trait IndicatorSet {
    fn matches(&self, value: &str) -> bool;
}

/// Flat list of malicious domains. A value matches when its host equals a
/// listed domain or sits below one (`phish.evil.com` matches `evil.com`).
#[derive(Debug, Default)]
pub struct DomainList {
    domains: HashSet<String>,
}

impl DomainList {
    /// Load domains from a newline-delimited text file. Blank lines and
    /// `#` comments are skipped.
    pub fn from_file(path: &Path) -> Result<Self> {
        let mut list = Self::default();
        list.extend_from_file(path)?;
        Ok(list)
    }

    /// Merge several indicator files into one list.
    pub fn from_files(paths: &[impl AsRef<Path>]) -> Result<Self> {
        let mut list = Self::default();
        for path in paths {
            list.extend_from_file(path.as_ref())?;
        }
        Ok(list)
    }

    pub fn from_domains<I, S>(domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            domains: domains
                .into_iter()
                .map(|d| d.as_ref().trim().to_lowercase())
                .collect(),
        }
    }

    fn extend_from_file(&mut self, path: &Path) -> Result<()> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read indicator file: {}", path.display()))?;

        let before = self.domains.len();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            self.domains.insert(line.to_lowercase());
        }
        debug!(
            "Loaded {} indicator(s) from {}",
            self.domains.len() - before,
            path.display()
        );
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.domains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }
}

impl IndicatorSet for DomainList {
    fn matches(&self, value: &str) -> bool {
        // Accept either a URL or a bare domain as the value under test.
        let host = match url::Url::parse(value) {
            Ok(parsed) => match parsed.host_str() {
                Some(h) => h.to_lowercase(),
                None => return false,
            },
            Err(_) => value.trim().to_lowercase(),
        };

        if self.domains.contains(&host) {
            return true;
        }

        // Subdomains of a listed domain match too, on a label boundary.
        self.domains
            .iter()
            .any(|d| host.strip_suffix(d.as_str()).is_some_and(|rest| rest.ends_with('.')))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_exact_and_subdomain_match() {
        let list = DomainList::from_domains(["evil.com"]);
        assert!(list.matches("evil.com"));
        assert!(list.matches("phish.evil.com"));
        assert!(list.matches("https://evil.com/login"));
        assert!(list.matches("http://a.b.evil.com/x?y=1"));
    }

    #[test]
    fn test_no_partial_label_match() {
        let list = DomainList::from_domains(["evil.com"]);
        assert!(!list.matches("notevil.com"));
        assert!(!list.matches("evil.com.safe.org"));
        assert!(!list.matches("https://good.com/evil.com"));
    }

    #[test]
    fn test_case_insensitive() {
        let list = DomainList::from_domains(["Evil.COM"]);
        assert!(list.matches("https://EVIL.com/"));
    }

    #[test]
    fn test_from_file_skips_comments_and_blanks() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# known C2 domains").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "evil.com").unwrap();
        writeln!(file, "  bad.net  ").unwrap();
        file.flush().unwrap();

        let list = DomainList::from_file(file.path()).unwrap();
        assert_eq!(list.len(), 2);
        assert!(list.matches("https://bad.net/"));
        assert!(!list.matches("https://known.org/"));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(DomainList::from_file(Path::new("/nonexistent/iocs.txt")).is_err());
    }
}
