use std::fmt;
use std::io;
use std::path::PathBuf;

/// Machine-readable error codes for operators and scripted callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigParseError,
    ConfigNotFound,
    InvalidRetentionWindow,
    DirectoryNotFound,
    ArchiveOpenFailed,
    ArchiveWriteFailed,
    ArchiveFinalizeFailed,
    FileRemoveFailed,
    InvalidArtifactJson,
    RenameFailed,
    InternalUnexpected,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::ConfigParseError => "E1001",
            Self::ConfigNotFound => "E1002",
            Self::InvalidRetentionWindow => "E1003",
            Self::DirectoryNotFound => "E2001",
            Self::ArchiveOpenFailed => "E3001",
            Self::ArchiveWriteFailed => "E3002",
            Self::ArchiveFinalizeFailed => "E3003",
            Self::FileRemoveFailed => "E4001",
            Self::InvalidArtifactJson => "E5001",
            Self::RenameFailed => "E5002",
            Self::InternalUnexpected => "E9001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::ConfigParseError => "Config file parse error",
            Self::ConfigNotFound => "Config file not found",
            Self::InvalidRetentionWindow => "Invalid retention window",
            Self::DirectoryNotFound => "Target directory not found",
            Self::ArchiveOpenFailed => "Archive could not be opened",
            Self::ArchiveWriteFailed => "Archive entry write failed",
            Self::ArchiveFinalizeFailed => "Archive could not be finalised",
            Self::FileRemoveFailed => "File removal failed",
            Self::InvalidArtifactJson => "Artifact JSON is missing required fields",
            Self::RenameFailed => "Artifact rename failed",
            Self::InternalUnexpected => "Internal unexpected error",
        }
    }

    /// Optional remediation hint that can be surfaced to operators.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::ConfigParseError => Some("Fix syntax in pagekeep.toml and retry."),
            Self::ConfigNotFound => Some("Check the --config path or unset PAGEKEEP_CONFIG."),
            Self::InvalidRetentionWindow => {
                Some("Set retention.recent_days no larger than retention.weekly_cutoff_days.")
            }
            Self::DirectoryNotFound => Some("Pass an existing directory to prune."),
            Self::ArchiveOpenFailed => {
                Some("Check that the archive path is writable and is a valid zip file.")
            }
            Self::ArchiveWriteFailed => {
                Some("Check that the source file is readable and the disk is not full.")
            }
            Self::ArchiveFinalizeFailed => Some("Check disk space and write permissions."),
            Self::FileRemoveFailed => Some("Check file permissions in the target directory."),
            Self::InvalidArtifactJson => None,
            Self::RenameFailed => Some("Check write permissions in the artifact directory."),
            Self::InternalUnexpected => Some("Retry once. If persistent, report a bug with logs."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Errors surfaced by the retention engine and organiser.
#[derive(Debug, thiserror::Error)]
pub enum PagekeepError {
    #[error("directory not found: {}", .0.display())]
    DirectoryNotFound(PathBuf),

    #[error("config file not found: {}", .0.display())]
    ConfigNotFound(PathBuf),

    #[error("failed to read config {}: {source}", path.display())]
    ConfigRead { path: PathBuf, source: io::Error },

    #[error("failed to parse config {}: {source}", path.display())]
    ConfigParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error(
        "recent_days ({recent_days}) must not exceed weekly_cutoff_days ({weekly_cutoff_days})"
    )]
    InvalidRetentionWindow {
        recent_days: u32,
        weekly_cutoff_days: u32,
    },

    #[error("failed to open archive {}: {source}", path.display())]
    ArchiveOpen {
        path: PathBuf,
        source: zip::result::ZipError,
    },

    #[error("failed to write archive entry {entry}: {source}")]
    ArchiveWrite {
        entry: String,
        source: zip::result::ZipError,
    },

    #[error("failed to finalise archive {}: {source}", path.display())]
    ArchiveFinalize {
        path: PathBuf,
        source: zip::result::ZipError,
    },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl PagekeepError {
    /// Machine-readable code associated with this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::DirectoryNotFound(_) => ErrorCode::DirectoryNotFound,
            Self::ConfigNotFound(_) => ErrorCode::ConfigNotFound,
            Self::ConfigRead { .. } | Self::ConfigParse { .. } => ErrorCode::ConfigParseError,
            Self::InvalidRetentionWindow { .. } => ErrorCode::InvalidRetentionWindow,
            Self::ArchiveOpen { .. } => ErrorCode::ArchiveOpenFailed,
            Self::ArchiveWrite { .. } => ErrorCode::ArchiveWriteFailed,
            Self::ArchiveFinalize { .. } => ErrorCode::ArchiveFinalizeFailed,
            Self::Io(_) => ErrorCode::InternalUnexpected,
        }
    }

    /// Optional remediation hint for operators.
    #[must_use]
    pub const fn hint(&self) -> Option<&'static str> {
        self.code().hint()
    }
}

pub type Result<T, E = PagekeepError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::{ErrorCode, PagekeepError};
    use std::collections::HashSet;
    use std::path::PathBuf;

    #[test]
    fn all_codes_are_unique() {
        let all = [
            ErrorCode::ConfigParseError,
            ErrorCode::ConfigNotFound,
            ErrorCode::InvalidRetentionWindow,
            ErrorCode::DirectoryNotFound,
            ErrorCode::ArchiveOpenFailed,
            ErrorCode::ArchiveWriteFailed,
            ErrorCode::ArchiveFinalizeFailed,
            ErrorCode::FileRemoveFailed,
            ErrorCode::InvalidArtifactJson,
            ErrorCode::RenameFailed,
            ErrorCode::InternalUnexpected,
        ];

        let mut seen = HashSet::new();
        for code in all {
            assert!(seen.insert(code.code()), "duplicate code {}", code.code());
        }
    }

    #[test]
    fn code_format_is_machine_friendly() {
        let code = ErrorCode::ArchiveWriteFailed.code();
        assert_eq!(code.len(), 5);
        assert!(code.starts_with('E'));
        assert!(code.chars().skip(1).all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn error_maps_to_code_and_hint() {
        let err = PagekeepError::DirectoryNotFound(PathBuf::from("/nope"));
        assert_eq!(err.code(), ErrorCode::DirectoryNotFound);
        assert!(err.hint().is_some());
        assert!(err.to_string().contains("/nope"));
    }
}
