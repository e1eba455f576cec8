use clap::Subcommand;
use juggernaut::manifest::{Manifest, ManifestError};
use std::path::{Path, PathBuf};

use crate::output::{self, OutputConfig};

/// Offline manifest commands; these never contact the server
#[derive(Subcommand, Debug)]
pub enum ManifestCommands {
    /// Validate a manifest, reporting every invalid line
    Check {
        /// Path to the manifest
        path: PathBuf,
    },
    /// List the requirements of a manifest
    Show {
        /// Path to the manifest
        path: PathBuf,
    },
    /// Check whether a version satisfies a package's requirement
    Allows {
        /// Path to the manifest
        path: PathBuf,
        /// Package name
        name: String,
        /// Candidate version
        version: String,
    },
}

fn load(path: &Path, config: &OutputConfig) -> Result<Manifest, ManifestError> {
    Manifest::load(path).inspect_err(|e| output::print_manifest_errors(e.line_errors(), config))
}

/// Executes a manifest command
pub fn execute(cmd: ManifestCommands, config: &OutputConfig) -> Result<(), Box<dyn std::error::Error>> {
    match cmd {
        ManifestCommands::Check { path } => {
            let manifest = load(&path, config)?;
            output::print_manifest_check(&manifest, config);
        }
        ManifestCommands::Show { path } => {
            let manifest = load(&path, config)?;
            output::print_manifest(&manifest, config);
        }
        ManifestCommands::Allows { path, name, version } => {
            let manifest = load(&path, config)?;
            let requirement = manifest
                .get(&name)
                .ok_or_else(|| format!("{} has no requirement for `{}`", path.display(), name))?;
            let allowed = requirement.allows(&version);
            output::print_allows(requirement, &version, allowed, config);
            if !allowed {
                return Err(format!("{} does not satisfy {}", version, requirement).into());
            }
        }
    }
    Ok(())
}
