//! Exit code constants for the parley CLI.
//!
//! - 0: Success
//! - 1: User error (bad args, unreadable input)
//! - 2: Frontmatter failure (unsupported language, parse/execution error)
//! - 3: Diagnostics produced (`check` command)

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// User error: bad arguments or an unreadable input file.
pub const USER_ERROR: i32 = 1;

/// Frontmatter failure: unsupported language, malformed body, or a script
/// execution error. Dispatch-fatal.
pub const FRONTMATTER_FAILURE: i32 = 2;

/// Evaluation produced diagnostics (`check` reports them and exits
/// non-zero so CI can gate on clean prompts).
pub const DIAGNOSTIC_FAILURE: i32 = 3;
