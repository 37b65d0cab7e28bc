//! Exit code constants for the kiln CLI.
//!
//! - 0: Success
//! - 1: User error (bad args, invalid settings, missing workspace)
//! - 2: Config failure (schema, path, or template violations)
//! - 3: Generation failure (LLM capability errors)
//! - 4: Publish failure (formatting guard or storage errors)
//! - 5: Batch failure (one or more configs in a run failed)

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// User error: bad arguments, invalid settings, or uninitialized workspace.
pub const USER_ERROR: i32 = 1;

/// Config failure: schema violation, path traversal, or template error.
pub const CONFIG_FAILURE: i32 = 2;

/// Generation failure: access, quota, or response errors from the LLM capability.
pub const GENERATION_FAILURE: i32 = 3;

/// Publish failure: size ceiling or storage collaborator errors.
pub const PUBLISH_FAILURE: i32 = 4;

/// Batch failure: at least one config in the run did not reach Done.
pub const BATCH_FAILURE: i32 = 5;
