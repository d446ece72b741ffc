//! Multi-step install orchestration.
//!
//! Every install request walks the same state machine:
//!
//! ```text
//! Requested → PrereqCheck → BaseInstall → (Download → Extract → Place)? → Done | Failed
//! ```
//!
//! Native installs skip straight to `BaseInstall`; patched Flatpak installs
//! run the full sequence. Any step failure transitions to `Failed`,
//! captures the triggering error's message and aborts the remaining steps.
//! There is no rollback: package and filesystem changes already applied stay
//! applied, and a re-run treats "already installed"/"already exists"
//! answers from the package managers as success so a partial failure can be
//! retried. There is also no timeout around external commands; a hung
//! package manager blocks the request.

use crate::catalog::{
    Catalog, InstallMethod, PatchSpec, PlacementRule, Program, Variant, FLATHUB_REPO_URL,
};
use crate::error::{AtelierError, Result};
use crate::extract::{extract_archive, find_extracted_root};
use crate::placement::{parallel_copy, CopyJob};
use crate::process::{CommandRunner, SystemRunner};
use crate::transfer::{ArchiveFetcher, TransferJob, TransferService};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Host platform for the install gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Linux,
    MacOS,
    Windows,
}

impl Platform {
    /// Detect the current platform.
    pub fn current() -> Self {
        if cfg!(target_os = "macos") {
            Platform::MacOS
        } else if cfg!(target_os = "windows") {
            Platform::Windows
        } else {
            Platform::Linux
        }
    }
}

/// States of one install request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallStep {
    Requested,
    PrereqCheck,
    BaseInstall,
    Download,
    Extract,
    Place,
    Done,
    Failed,
}

/// Terminal outcome returned to the caller for every install attempt.
///
/// Always fully filled: either success with a confirmation message or
/// failure with the most specific captured error text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallResult {
    pub success: bool,
    pub message: String,
}

impl InstallResult {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// The orchestrator's view of the outside world.
///
/// Bundling the seams here keeps every step testable: tests swap in a
/// scripted runner, a canned fetcher, a temp home and a temp staging root.
pub struct InstallContext {
    /// External command execution.
    pub runner: Arc<dyn CommandRunner>,
    /// Patch archive downloads.
    pub fetcher: Arc<dyn ArchiveFetcher>,
    /// User home directory, the root of all placement destinations.
    pub home: PathBuf,
    /// Host platform; non-Linux short-circuits every install.
    pub platform: Platform,
    /// Parent directory for per-install staging temp dirs.
    pub staging_root: PathBuf,
}

impl InstallContext {
    /// Production context against the real host.
    pub fn host() -> Self {
        Self {
            runner: Arc::new(SystemRunner),
            fetcher: Arc::new(TransferService::new()),
            home: dirs::home_dir().unwrap_or_else(|| PathBuf::from("/")),
            platform: Platform::current(),
            staging_root: std::env::temp_dir(),
        }
    }
}

/// Sequences install steps for catalog variants.
pub struct Installer {
    catalog: Catalog,
    ctx: InstallContext,
}

impl Installer {
    pub fn new(catalog: Catalog, ctx: InstallContext) -> Self {
        Self { catalog, ctx }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Run one install request to its terminal state.
    ///
    /// Never returns a raw error: every failure is folded into an
    /// [`InstallResult`] message.
    pub fn install(&self, program_name: &str, variant_tag: &str) -> InstallResult {
        self.transition(InstallStep::Requested);

        if self.ctx.platform != Platform::Linux {
            self.transition(InstallStep::Failed);
            return InstallResult::fail(AtelierError::UnsupportedPlatform.to_string());
        }

        let Some(program) = self.catalog.find(program_name) else {
            self.transition(InstallStep::Failed);
            return InstallResult::fail(
                AtelierError::UnknownProgram {
                    name: program_name.to_string(),
                }
                .to_string(),
            );
        };
        let Some(variant) = program.variant(variant_tag) else {
            self.transition(InstallStep::Failed);
            return InstallResult::fail(
                AtelierError::UnknownVariant {
                    program: program_name.to_string(),
                    variant: variant_tag.to_string(),
                }
                .to_string(),
            );
        };

        match self.run_steps(program, variant) {
            Ok(message) => {
                self.transition(InstallStep::Done);
                InstallResult::ok(message)
            }
            Err(e) => {
                self.transition(InstallStep::Failed);
                let message = match &variant.method {
                    // The patched flow reports under the patch's name, as
                    // the suite UI presents those variants as products of
                    // their own.
                    InstallMethod::SandboxedPackagePatch { .. } => {
                        format!("Error installing {}: {}", variant.name, e)
                    }
                    _ => e.to_string(),
                };
                InstallResult::fail(message)
            }
        }
    }

    fn run_steps(&self, program: &Program, variant: &Variant) -> Result<String> {
        match &variant.method {
            InstallMethod::NativePackage { package } => {
                self.transition(InstallStep::BaseInstall);
                self.run_checked(&["sudo", "apt-get", "install", "-y", package])?;
                Ok(format!("{} installed successfully", program.name))
            }
            InstallMethod::SandboxedPackage { app_id } => {
                self.ensure_sandbox_ready()?;
                self.install_sandboxed_app(app_id)?;
                Ok(format!("{} installed successfully", variant.name))
            }
            InstallMethod::SandboxedPackagePatch { app_id, patch } => {
                self.ensure_sandbox_ready()?;
                self.install_sandboxed_app(app_id)?;
                self.apply_patch(&variant.name, patch)?;
                Ok(format!("{} installed successfully", variant.name))
            }
        }
    }

    /// PrereqCheck: the Flatpak runtime itself and the Flathub remote.
    /// Both commands are idempotent; "already exists" answers are success.
    fn ensure_sandbox_ready(&self) -> Result<()> {
        self.transition(InstallStep::PrereqCheck);
        self.run_checked(&["sudo", "apt-get", "install", "-y", "flatpak"])?;
        self.run_allow_existing(&[
            "flatpak",
            "remote-add",
            "--if-not-exists",
            "flathub",
            FLATHUB_REPO_URL,
        ])?;
        Ok(())
    }

    fn install_sandboxed_app(&self, app_id: &str) -> Result<()> {
        self.transition(InstallStep::BaseInstall);
        self.run_allow_existing(&["flatpak", "install", "-y", "flathub", app_id])
    }

    /// Download → Extract → Place, staged in a temp dir that is removed on
    /// every exit path when it drops.
    fn apply_patch(&self, variant_name: &str, patch: &PatchSpec) -> Result<()> {
        let staging = tempfile::TempDir::new_in(&self.ctx.staging_root)?;

        self.transition(InstallStep::Download);
        let archive_path = staging.path().join(archive_file_name(&patch.archive_url));
        self.ctx
            .fetcher
            .fetch(&TransferJob::new(&patch.archive_url, &archive_path))?;

        self.transition(InstallStep::Extract);
        let extract_dir = staging.path().join("extracted");
        std::fs::create_dir_all(&extract_dir)?;
        extract_archive(&archive_path, &extract_dir)?;
        let root = find_extracted_root(&extract_dir, &patch.archive_dir_prefix)?;

        self.transition(InstallStep::Place);
        let jobs = placement_jobs(patch, &root, &self.ctx.home)?;
        tracing::info!(variant = variant_name, jobs = jobs.len(), "placing patch files");
        parallel_copy(&jobs)?;

        Ok(())
    }

    /// Run a command; nonzero exit becomes a step failure.
    fn run_checked(&self, argv: &[&str]) -> Result<()> {
        let output = self.ctx.runner.run(argv)?;
        if output.success {
            Ok(())
        } else {
            Err(AtelierError::CommandExited {
                command: argv.join(" "),
                code: output.exit_code,
                output: output.diagnostic().to_string(),
            })
        }
    }

    /// Like [`run_checked`], but a nonzero exit whose output says the thing
    /// already exists counts as success: re-running an install after a
    /// partial failure must not trip over work already done.
    fn run_allow_existing(&self, argv: &[&str]) -> Result<()> {
        let output = self.ctx.runner.run(argv)?;
        if output.success {
            return Ok(());
        }
        let diagnostic = output.diagnostic().to_ascii_lowercase();
        if diagnostic.contains("already installed") || diagnostic.contains("already exists") {
            tracing::debug!(command = %argv.join(" "), "already present, continuing");
            return Ok(());
        }
        Err(AtelierError::CommandExited {
            command: argv.join(" "),
            code: output.exit_code,
            output: output.diagnostic().to_string(),
        })
    }

    fn transition(&self, step: InstallStep) {
        tracing::debug!(step = ?step, "install step");
    }
}

/// Last URL path segment, used as the staged archive file name so the
/// extractor can dispatch on its extension.
fn archive_file_name(url: &str) -> String {
    url.rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or("patch.zip")
        .to_string()
}

/// Turn the catalog's placement rules into concrete copy jobs.
///
/// Sources missing from the archive are skipped, matching the original
/// patch layouts which vary between releases.
fn placement_jobs(patch: &PatchSpec, root: &Path, home: &Path) -> Result<Vec<CopyJob>> {
    let mut jobs = Vec::new();
    let mut consumed: HashSet<OsString> = HashSet::new();

    for rule in &patch.rules {
        match rule {
            PlacementRule::Dir { source, dest } => {
                consumed.insert(top_level_name(source));
                let src = root.join(source);
                if src.is_dir() {
                    jobs.push(CopyJob::new(src, home.join(dest)));
                }
            }
            PlacementRule::File { source, dest } => {
                consumed.insert(top_level_name(source));
                let src = root.join(source);
                if let (true, Some(name)) = (src.is_file(), src.file_name()) {
                    jobs.push(CopyJob::new(&src, home.join(dest).join(name)));
                }
            }
            PlacementRule::Remainder { dest, extensions } => {
                let dest_dir = home.join(dest);
                for entry in std::fs::read_dir(root)? {
                    let entry = entry?;
                    if consumed.contains(&entry.file_name()) {
                        continue;
                    }
                    let path = entry.path();
                    if path.is_dir() {
                        jobs.push(CopyJob::new(&path, dest_dir.join(entry.file_name())));
                    } else if has_listed_extension(&path, extensions) {
                        jobs.push(CopyJob::new(&path, dest_dir.join(entry.file_name())));
                    }
                }
            }
        }
    }

    Ok(jobs)
}

fn top_level_name(source: &str) -> OsString {
    Path::new(source)
        .components()
        .next()
        .map(|c| c.as_os_str().to_os_string())
        .unwrap_or_default()
}

fn has_listed_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .map(|ext| {
            let ext = ext.to_string_lossy();
            extensions.iter().any(|e| e.as_str() == ext)
        })
        .unwrap_or(false)
}
