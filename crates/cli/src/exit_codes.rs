//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract; scripts rely on them.
//!
//! # Exit Codes
//!
//! | Code | Domain    | Description                                        |
//! |------|-----------|----------------------------------------------------|
//! | 0    | Universal | Success                                            |
//! | 1    | Universal | General error; `compare` found differences         |
//! | 2    | Universal | CLI usage error (bad args, bad column reference)   |
//! | 3    | run       | Invalid config or label-count mismatch             |
//! | 4    | run       | Reference source could not be mapped to a label    |
//! | 5    | run       | No valid identifiers in the main sheet             |
//! | 6    | run       | No candidate labels found                          |
//! | 7    | io        | File could not be read or written                  |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the relevant command's error handling

use eancheck_io::IoError;
use eancheck_recon::ReconError;

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, unparseable column reference.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Compare
// =============================================================================

/// Compare found differences.
/// Like `diff(1)`, exit 1 means "files differ."
pub const EXIT_COMPARE_DIFFS: u8 = 1;

// =============================================================================
// Run (3-6)
// =============================================================================

/// Config file failed to parse or validate, or the label count was wrong under strict mode.
pub const EXIT_CONFIG: u8 = 3;

/// At least one reference source matched no label and no fallback exists.
pub const EXIT_UNRESOLVED_MAPPING: u8 = 4;

/// The main sheet holds no valid identifier.
pub const EXIT_NO_IDENTIFIERS: u8 = 5;

/// Neither a list validation nor the status column offered any label.
pub const EXIT_EMPTY_LABELS: u8 = 6;

// =============================================================================
// IO (7)
// =============================================================================

/// Input could not be opened or parsed, or output could not be written.
pub const EXIT_IO: u8 = 7;

// =============================================================================
// Error mapping
// =============================================================================

pub fn recon_exit_code(err: &ReconError) -> u8 {
    match err {
        ReconError::ConfigParse(_)
        | ReconError::ConfigValidation(_)
        | ReconError::LabelCountMismatch { .. } => EXIT_CONFIG,
        ReconError::UnresolvedMapping { .. } => EXIT_UNRESOLVED_MAPPING,
        ReconError::NoIdentifiers => EXIT_NO_IDENTIFIERS,
        ReconError::EmptyCandidateLabels => EXIT_EMPTY_LABELS,
    }
}

pub fn io_exit_code(err: &IoError) -> u8 {
    match err {
        IoError::Recon(e) => recon_exit_code(e),
        _ => EXIT_IO,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recon_errors_map_to_distinct_codes() {
        assert_eq!(recon_exit_code(&ReconError::NoIdentifiers), EXIT_NO_IDENTIFIERS);
        assert_eq!(recon_exit_code(&ReconError::EmptyCandidateLabels), EXIT_EMPTY_LABELS);
        assert_eq!(
            recon_exit_code(&ReconError::LabelCountMismatch { expected: 2, found: 3 }),
            EXIT_CONFIG
        );
        assert_eq!(
            recon_exit_code(&ReconError::UnresolvedMapping { sources: vec!["x".into()] }),
            EXIT_UNRESOLVED_MAPPING
        );
    }

    #[test]
    fn io_errors_default_to_io_code() {
        assert_eq!(io_exit_code(&IoError::UnsupportedFormat("a.pdf".into())), EXIT_IO);
        assert_eq!(io_exit_code(&IoError::Recon(ReconError::ConfigValidation("x".into()))), EXIT_CONFIG);
    }
}
