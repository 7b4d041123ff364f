//! XDG directory lookup for voicelist.

use std::path::PathBuf;

use anyhow::{Context, Result};
use xdg::BaseDirectories;

const APP_NAME: &str = "voicelist";

/// Return the XDG config directory (no creation - config may not exist yet).
/// `~/.config/voicelist/`
pub fn config_dir() -> Result<PathBuf> {
    BaseDirectories::with_prefix(APP_NAME)
        .get_config_home()
        .context("Could not determine config directory (HOME not set?)")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_dir_uses_app_prefix() {
        let dir = config_dir().unwrap();
        assert!(dir.to_string_lossy().contains("voicelist"));
    }
}
