// Constants module - centralized default values for configuration

// =============================================================================
// Server defaults
// =============================================================================

/// Default listen address
pub const DEFAULT_ADDRESS: &str = "0.0.0.0";

/// Default listen port
pub const DEFAULT_PORT: u16 = 8080;

/// Default number of worker threads
pub const DEFAULT_THREADS: usize = 4;

// =============================================================================
// Store defaults
// =============================================================================

/// Partition key attribute of the missions table
pub const DEFAULT_PARTITION_KEY: &str = "id";

// =============================================================================
// Image defaults
// =============================================================================

/// Largest width or height a client may request
pub const DEFAULT_MAX_DIMENSION: u32 = 4096;

// =============================================================================
// Pagination defaults
// =============================================================================

/// Page size when `count` is absent
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Page size ceiling; larger `count` values are clamped
pub const DEFAULT_MAX_PAGE_SIZE: u32 = 100;

/// Upper bound accepted for the configured ceiling
pub const MAX_PAGE_SIZE_LIMIT: u32 = 1000;

// =============================================================================
// Environment variables
// =============================================================================

pub const ENV_MISSION_TABLE: &str = "MISSION_TABLE";
pub const ENV_IMAGES_BUCKET: &str = "SAT_IMAGES_BUCKET";
pub const ENV_REGION: &str = "AWS_REGION";
pub const ENV_ADDRESS: &str = "MISSIONLENS_ADDRESS";
pub const ENV_PORT: &str = "MISSIONLENS_PORT";
