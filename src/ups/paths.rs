//! Fixed REST paths and protocol constants of the mbdetnrs API.
//!
//! Paths are appended to the device address (for example `https://ups.local`).

pub const AUTH_PATH: &str = "/rest/mbdetnrs/1.0/oauth2/token";
pub const MANAGER_PATH: &str = "/rest/mbdetnrs/1.0/managers/1";
pub const POWER_DISTRIBUTION_PATH: &str = "/rest/mbdetnrs/1.0/powerDistributions/1";
pub const TEMPERATURES_PATH: &str = "/rest/mbdetnrs/1.0/environmentService/temperatures";

// A UPS may expose several inputs and outputs; only the first one is read.
pub const INPUT_MEMBER_ID: u32 = 1;
pub const OUTPUT_MEMBER_ID: u32 = 1;

pub const GRANT_TYPE: &str = "password";
pub const SCOPE: &str = "GUIAccess";

pub const REQUEST_TIMEOUT_SECS: u64 = 2;
pub const DEFAULT_LOGIN_TIMEOUT_SECS: u64 = 3;
