/// Options `scripts/self_explorer.py` accepts. Anything else makes its
/// argument parser exit with status 2.
pub const ENGINE_FLAGS: &[&str] = &[
    "--app",
    "--root_dir",
    "--platform",
    "--task_desc",
    "--url",
    "--model",
    "--model_name",
    "--task_dir",
];

/// adb reads the target device from here when no `-s` is given.
pub const DEVICE_ENV: &str = "ANDROID_SERIAL";

/// Goal of the open-ended run on a project's primary slot.
pub const PRIMARY_TASK: &str =
    "Explore the main screens and features and document the UI elements you interact with";

/// Fixed scenario for the integration test.
pub const INTEGRATION_APP: &str = "integration_test";
pub const INTEGRATION_URL: &str = "https://www.google.com";
pub const INTEGRATION_TASK: &str =
    "Search for 'Klever Desktop' and open the first result";
pub const INTEGRATION_MAX_ROUNDS: u32 = 2;
