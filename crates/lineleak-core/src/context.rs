//! Context types for rule execution.

use std::path::{Path, PathBuf};

/// Context provided to per-file rules.
#[derive(Debug, Clone)]
pub struct FileContext<'a> {
    /// Path to the file as discovered.
    pub path: &'a Path,
    /// File contents as a string.
    pub content: &'a str,
    /// Path relative to the analysis root.
    pub relative_path: PathBuf,
}

impl<'a> FileContext<'a> {
    /// Creates a new file context.
    #[must_use]
    pub fn new(path: &'a Path, content: &'a str, root: &Path) -> Self {
        let relative_path = path
            .strip_prefix(root)
            .ok()
            .filter(|p| !p.as_os_str().is_empty())
            .map_or_else(|| path.to_path_buf(), Path::to_path_buf);

        Self {
            path,
            content,
            relative_path,
        }
    }

    /// Returns the bare file name, if the path has one.
    #[must_use]
    pub fn file_name(&self) -> Option<&str> {
        self.path.file_name().and_then(|n| n.to_str())
    }

    /// Checks the file against a list of names to ignore.
    ///
    /// An entry matches the bare file name, the path relative to the root,
    /// or the path as discovered.
    #[must_use]
    pub fn matches_any(&self, names: &[String]) -> bool {
        names.iter().any(|name| {
            let name = name.trim();
            !name.is_empty()
                && (self.file_name() == Some(name)
                    || self.relative_path == Path::new(name)
                    || self.path == Path::new(name))
        })
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    fn context<'a>(path: &'a Path, content: &'a str) -> FileContext<'a> {
        FileContext::new(path, content, Path::new("/project"))
    }

    #[test]
    fn relative_path_strips_root() {
        let ctx = context(Path::new("/project/pkg/mod.py"), "");
        assert_eq!(ctx.relative_path, PathBuf::from("pkg/mod.py"));
        assert_eq!(ctx.file_name(), Some("mod.py"));
    }

    #[test]
    fn file_outside_root_keeps_its_path() {
        let ctx = context(Path::new("/elsewhere/a.py"), "");
        assert_eq!(ctx.relative_path, PathBuf::from("/elsewhere/a.py"));
    }

    #[test]
    fn root_that_is_the_file_keeps_its_path() {
        let path = Path::new("/project/setup.py");
        let ctx = FileContext::new(path, "", path);
        assert_eq!(ctx.relative_path, PathBuf::from("/project/setup.py"));
    }

    #[test]
    fn ignore_list_matching() {
        let ctx = context(Path::new("/project/pkg/setup.py"), "");
        assert!(ctx.matches_any(&["setup.py".to_string()]));
        assert!(ctx.matches_any(&[" pkg/setup.py ".to_string()]));
        assert!(ctx.matches_any(&["/project/pkg/setup.py".to_string()]));
        assert!(!ctx.matches_any(&["other.py".to_string(), String::new()]));
        assert!(!ctx.matches_any(&[]));
    }
}
