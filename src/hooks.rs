// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Git hook installation.
//!
//! Writes a `pre-commit` hook that runs `zigcheck check
//! --fail-on-warnings` before every commit.

use std::{fs, path::Path};

use masterror::{AppError, AppResult};

use crate::error::IoError;

const PRE_COMMIT_HOOK: &str = "#!/bin/sh\n# Installed by zigcheck. Blocks commits with findings.\nexec zigcheck check --fail-on-warnings\n";

/// Install the pre-commit hook into a repository.
///
/// # Arguments
///
/// * `root` - Repository root containing a `.git` directory
///
/// # Returns
///
/// `AppResult<String>` - Path of the installed hook
///
/// # Examples
///
/// ```no_run
/// use zigcheck::hooks::install_hooks;
///
/// let hook_path = install_hooks(".").unwrap();
/// println!("installed {}", hook_path);
/// ```
pub fn install_hooks(root: &str) -> AppResult<String> {
    let git_dir = Path::new(root).join(".git");
    if !git_dir.is_dir() {
        return Err(AppError::bad_request(format!(
            "Not a git repository: {}",
            root
        )));
    }

    let hooks_dir = git_dir.join("hooks");
    fs::create_dir_all(&hooks_dir).map_err(IoError::from)?;

    let hook_path = hooks_dir.join("pre-commit");
    fs::write(&hook_path, PRE_COMMIT_HOOK).map_err(IoError::from)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        let mut permissions = fs::metadata(&hook_path).map_err(IoError::from)?.permissions();
        permissions.set_mode(0o755);
        fs::set_permissions(&hook_path, permissions).map_err(IoError::from)?;
    }

    Ok(hook_path.display().to_string())
}
