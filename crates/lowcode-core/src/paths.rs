use std::path::{Path, PathBuf};

pub const LOWCODE_DIR: &str = ".lowcode";
pub const CONFIG_FILE: &str = ".lowcode/config.yaml";
pub const STATE_FILE: &str = ".lowcode/state.yaml";

pub fn lowcode_dir(root: &Path) -> PathBuf {
    root.join(LOWCODE_DIR)
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn state_path(root: &Path) -> PathBuf {
    root.join(STATE_FILE)
}
