use std::borrow::Cow;
use std::path::{Path, PathBuf};

use regex::{NoExpand, Regex};

pub const DIR_PLACEHOLDER: &str = "{dir}";
pub const SHORT_DIR_PLACEHOLDER: &str = "{short-dir}";
pub const FILE_PLACEHOLDER: &str = "{file}";
pub const SHORT_FILE_PLACEHOLDER: &str = "{short-file}";

/// Pattern and replacement applied to value text before it is written.
#[derive(Debug, Clone)]
pub struct ReplacementRule {
    pattern: Regex,
    replacement: String,
    literal: bool,
}

impl ReplacementRule {
    /// `replacement` may refer to capture groups (`$1`, `${name}`). A group followed by
    /// a letter, digit or underscore needs braces: `${1}a`, since `$1a` names group `1a`.
    pub fn new(pattern: &str, replacement: impl Into<String>) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
            replacement: replacement.into(),
            literal: false,
        })
    }

    /// Matches `token` verbatim and inserts `replacement` without capture expansion.
    pub fn literal(token: &str, replacement: impl Into<String>) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(&regex::escape(token))?,
            replacement: replacement.into(),
            literal: true,
        })
    }

    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    pub fn apply<'t>(&self, text: &'t str) -> Cow<'t, str> {
        if self.literal {
            self.pattern.replace_all(text, NoExpand(self.replacement.as_str()))
        } else {
            self.pattern.replace_all(text, self.replacement.as_str())
        }
    }
}

/// Ordered rule list. Each rule sees the output of the rules before it.
#[derive(Debug, Clone, Default)]
pub struct ReplacementEngine {
    rules: Vec<ReplacementRule>,
}

impl ReplacementEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, P, R>(pairs: I) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = (P, R)>,
        P: AsRef<str>,
        R: Into<String>,
    {
        let rules = pairs
            .into_iter()
            .map(|(pattern, replacement)| ReplacementRule::new(pattern.as_ref(), replacement))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rules })
    }

    pub fn push(&mut self, rule: ReplacementRule) {
        self.rules.push(rule);
    }

    /// Appends the placeholder rules for `reference`, after any rules already present.
    pub fn with_reference_path(mut self, reference: &Path) -> Result<Self, regex::Error> {
        let paths = ReferencePaths::resolve(reference);
        self.push(ReplacementRule::literal(DIR_PLACEHOLDER, display(&paths.dir))?);
        self.push(ReplacementRule::literal(SHORT_DIR_PLACEHOLDER, display(&paths.short_dir))?);
        self.push(ReplacementRule::literal(FILE_PLACEHOLDER, display(&paths.file))?);
        self.push(ReplacementRule::literal(SHORT_FILE_PLACEHOLDER, display(&paths.short_file))?);
        Ok(self)
    }

    pub fn rules(&self) -> &[ReplacementRule] {
        &self.rules
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn apply(&self, text: &str) -> String {
        let mut current = text.to_string();
        for rule in &self.rules {
            if let Cow::Owned(replaced) = rule.apply(&current) {
                current = replaced;
            }
        }
        current
    }
}

fn display(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Directory and file forms derived from a reference path.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferencePaths {
    pub dir: PathBuf,
    pub short_dir: PathBuf,
    pub file: PathBuf,
    pub short_file: PathBuf,
}

impl ReferencePaths {
    pub fn resolve(reference: &Path) -> Self {
        let file = std::path::absolute(reference).unwrap_or_else(|_| reference.to_path_buf());
        let dir = file
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| file.clone());
        Self {
            short_dir: short_path(&dir),
            short_file: short_path(&file),
            dir,
            file,
        }
    }
}

#[cfg(windows)]
fn short_path(path: &Path) -> PathBuf {
    use std::ffi::OsString;
    use std::os::windows::ffi::{OsStrExt, OsStringExt};
    use windows_sys::Win32::Storage::FileSystem::GetShortPathNameW;

    let wide: Vec<u16> = path.as_os_str().encode_wide().chain(Some(0)).collect();
    // SAFETY: `wide` is NUL-terminated; a null output buffer with size 0 queries the length.
    let needed = unsafe { GetShortPathNameW(wide.as_ptr(), std::ptr::null_mut(), 0) };
    if needed == 0 {
        return path.to_path_buf();
    }
    let mut buffer = vec![0u16; needed as usize];
    // SAFETY: `buffer` holds `needed` units as reported by the previous call.
    let written = unsafe { GetShortPathNameW(wide.as_ptr(), buffer.as_mut_ptr(), needed) };
    if written == 0 || written >= needed {
        return path.to_path_buf();
    }
    buffer.truncate(written as usize);
    PathBuf::from(OsString::from_wide(&buffer))
}

// Only Windows volumes carry 8.3 aliases.
#[cfg(not(windows))]
fn short_path(path: &Path) -> PathBuf {
    path.to_path_buf()
}
