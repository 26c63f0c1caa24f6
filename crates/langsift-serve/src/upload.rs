//! Upload validation
//!
//! Uploaded files are screened before any of their content is read:
//! the extension must be on the source-code allow-list and the payload
//! must fit under the size cap. Matching is case-insensitive on the
//! extension only; the rest of the filename carries no meaning here.

use std::fmt;
use std::path::Path;

/// Extensions accepted for classification uploads
pub const ALLOWED_EXTENSIONS: &[&str] = &[
    "py", "js", "java", "cpp", "c", "h", "cs", "php", "rb", "go", "rs", "swift", "kt", "scala",
    "r", "sql", "sh", "bat", "html", "css", "xml", "json", "yaml", "yml", "md", "txt",
];

/// Default payload cap, 10 MiB
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// Why an upload was turned away
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadRejection {
    /// Extension missing or not on the allow-list
    Extension { extension: Option<String> },
    /// Payload exceeds the configured cap
    TooLarge { size: u64, limit: u64 },
}

impl fmt::Display for UploadRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Extension { extension: Some(ext) } => {
                write!(f, "file extension '.{ext}' is not supported")
            }
            Self::Extension { extension: None } => {
                write!(f, "file has no extension")
            }
            Self::TooLarge { size, limit } => {
                write!(f, "file is {size} bytes, the limit is {limit} bytes")
            }
        }
    }
}

/// Screening rules for uploaded source files
#[derive(Debug, Clone, Copy)]
pub struct UploadPolicy {
    max_bytes: u64,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl UploadPolicy {
    pub fn new(max_bytes: u64) -> Self {
        Self { max_bytes }
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    /// Accept or reject an upload by filename and declared size
    pub fn validate(&self, filename: &str, size: u64) -> Result<(), UploadRejection> {
        let extension = Path::new(filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_lowercase);

        match &extension {
            Some(ext) if ALLOWED_EXTENSIONS.contains(&ext.as_str()) => {}
            _ => return Err(UploadRejection::Extension { extension }),
        }

        if size > self.max_bytes {
            return Err(UploadRejection::TooLarge {
                size,
                limit: self.max_bytes,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_common_source_files() {
        let policy = UploadPolicy::default();
        for name in ["main.rs", "script.py", "query.sql", "page.html", "run.sh"] {
            assert!(policy.validate(name, 512).is_ok(), "{name} should pass");
        }
    }

    #[test]
    fn extension_match_is_case_insensitive() {
        let policy = UploadPolicy::default();
        assert!(policy.validate("LEGACY.PY", 100).is_ok());
        assert!(policy.validate("Main.Java", 100).is_ok());
    }

    #[test]
    fn rejects_unlisted_and_missing_extensions() {
        let policy = UploadPolicy::default();

        assert_eq!(
            policy.validate("binary.exe", 100),
            Err(UploadRejection::Extension {
                extension: Some("exe".to_string())
            })
        );
        assert_eq!(
            policy.validate("Makefile", 100),
            Err(UploadRejection::Extension { extension: None })
        );
    }

    #[test]
    fn rejects_oversized_payloads() {
        let policy = UploadPolicy::new(1024);

        assert!(policy.validate("ok.py", 1024).is_ok());
        assert_eq!(
            policy.validate("big.py", 1025),
            Err(UploadRejection::TooLarge {
                size: 1025,
                limit: 1024
            })
        );
    }

    #[test]
    fn size_check_runs_after_the_extension_check() {
        let policy = UploadPolicy::new(10);
        assert!(matches!(
            policy.validate("huge.exe", 1_000_000),
            Err(UploadRejection::Extension { .. })
        ));
    }
}
