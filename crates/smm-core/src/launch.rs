//! Game launch command construction.

use crate::config::{AppConfig, GameConfig};
use crate::models::Installation;
use crate::{Result, SmmError};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::info;

/// A command line ready to be spawned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LaunchCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl LaunchCommand {
    /// Build the launch command for a discovered installation.
    ///
    /// Custom installations start the first executable found among
    /// [`GameConfig::LAUNCH_CANDIDATES`], through Steam on Windows. Others use
    /// their discovered launch path verbatim.
    pub fn for_installation(installation: &Installation) -> Result<Self> {
        if installation.is_custom() {
            let executable = find_custom_executable(installation).ok_or_else(|| {
                SmmError::LaunchFailed {
                    message: format!("No game executable found in {}", installation.path),
                }
            })?;
            return Ok(Self::through_steam(&executable));
        }

        let (program, args) =
            installation
                .launch_path
                .split_first()
                .ok_or_else(|| SmmError::LaunchFailed {
                    message: format!("No launch command for {}", installation.path),
                })?;
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }

    #[cfg(windows)]
    fn through_steam(executable: &Path) -> Self {
        Self {
            program: "cmd".to_string(),
            args: vec![
                "/C".to_string(),
                "start".to_string(),
                format!("steam://launch/{}", AppConfig::STEAM_APP_ID),
                executable.to_string_lossy().into_owned(),
            ],
        }
    }

    #[cfg(not(windows))]
    fn through_steam(executable: &Path) -> Self {
        tracing::debug!(
            "Steam launch of app {} is Windows-only, running the executable directly",
            AppConfig::STEAM_APP_ID
        );
        Self {
            program: executable.to_string_lossy().into_owned(),
            args: Vec::new(),
        }
    }

    /// Spawn the command detached from our stdio.
    pub fn spawn(&self) -> Result<()> {
        info!("Launching game: {} {:?}", self.program, self.args);
        Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map(|_| ())
            .map_err(|e| SmmError::LaunchFailed {
                message: format!("{}: {}", self.program, e),
            })
    }
}

fn find_custom_executable(installation: &Installation) -> Option<PathBuf> {
    let root = Path::new(&installation.path);
    GameConfig::LAUNCH_CANDIDATES
        .iter()
        .map(|relative| root.join(relative))
        .find(|candidate| candidate.is_file())
        .or_else(|| {
            installation
                .launch_path
                .first()
                .map(PathBuf::from)
                .filter(|candidate| candidate.is_file())
        })
}
