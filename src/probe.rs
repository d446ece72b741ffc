//! Installed-status probes for catalog annotation.
//!
//! Three probe kinds feed the catalog's `installed` flags: the dpkg package
//! database, the Flatpak application list, and per-program configuration
//! markers on disk. All three are wrapped by the [`StatusCache`] with the
//! same TTL, and all three fail open: a broken probe reports "not
//! installed" rather than blocking the catalog query, because status display
//! must never hang on a single bad probe.

use crate::cache::{ProbeKind, StatusCache};
use crate::catalog::{Catalog, InstallMethod, MarkerKind, Program, Variant};
use crate::process::CommandRunner;
use std::path::PathBuf;
use std::sync::Arc;

/// Cache-backed status probes against the host system.
pub struct ProbeService {
    runner: Arc<dyn CommandRunner>,
    cache: StatusCache,
    home: PathBuf,
}

impl ProbeService {
    /// Create a probe service with a fresh default-TTL cache.
    pub fn new(runner: Arc<dyn CommandRunner>, home: PathBuf) -> Self {
        Self::with_cache(runner, home, StatusCache::new())
    }

    /// Create a probe service with a caller-supplied cache.
    pub fn with_cache(runner: Arc<dyn CommandRunner>, home: PathBuf, cache: StatusCache) -> Self {
        Self {
            runner,
            cache,
            home,
        }
    }

    /// Whether a package is installed in the native package database.
    ///
    /// A package counts as installed only if `dpkg -l` reports an `ii`
    /// status line naming it exactly.
    pub fn native_package_installed(&self, package: &str) -> bool {
        if let Some(cached) = self.cache.get(ProbeKind::NativePackage, package) {
            return cached;
        }

        let installed = match self.runner.run(&["dpkg", "-l", package]) {
            Ok(output) => output.stdout.lines().any(|line| {
                let mut fields = line.split_whitespace();
                fields.next() == Some("ii") && fields.next() == Some(package)
            }),
            Err(e) => {
                tracing::warn!(package, error = %e, "dpkg probe failed, reporting not installed");
                false
            }
        };

        self.cache.set(ProbeKind::NativePackage, package, installed);
        installed
    }

    /// Whether a Flatpak application is installed.
    pub fn sandboxed_app_installed(&self, app_id: &str) -> bool {
        if let Some(cached) = self.cache.get(ProbeKind::SandboxedApp, app_id) {
            return cached;
        }

        let installed = match self
            .runner
            .run(&["flatpak", "list", "--app", "--columns=application"])
        {
            Ok(output) => output.stdout.lines().any(|line| line.trim() == app_id),
            Err(e) => {
                tracing::warn!(app_id, error = %e, "flatpak probe failed, reporting not installed");
                false
            }
        };

        self.cache.set(ProbeKind::SandboxedApp, app_id, installed);
        installed
    }

    /// Whether the program's custom-configuration marker exists on disk.
    ///
    /// Cheap filesystem check, but it goes through the same cache and TTL
    /// as the command probes to keep probe-key handling uniform.
    pub fn custom_config_present(&self, program: &Program) -> bool {
        let Some(marker) = &program.config_marker else {
            return false;
        };

        if let Some(cached) = self.cache.get(ProbeKind::CustomConfig, &program.name) {
            return cached;
        }

        let path = self.home.join(&marker.path);
        let present = match marker.kind {
            MarkerKind::Directory => path.is_dir(),
            MarkerKind::File => path.is_file(),
        };

        self.cache
            .set(ProbeKind::CustomConfig, &program.name, present);
        present
    }

    /// Effective installed status for one variant.
    ///
    /// A patched variant needs both the Flatpak app and the config marker;
    /// the base package variant is the native probe alone.
    pub fn variant_installed(&self, program: &Program, variant: &Variant) -> bool {
        match &variant.method {
            InstallMethod::NativePackage { package } => self.native_package_installed(package),
            InstallMethod::SandboxedPackage { app_id } => self.sandboxed_app_installed(app_id),
            InstallMethod::SandboxedPackagePatch { app_id, .. } => {
                self.sandboxed_app_installed(app_id) && self.custom_config_present(program)
            }
        }
    }

    /// Clone the catalog with every variant's `installed` flag filled in.
    pub fn annotate(&self, catalog: &Catalog) -> Vec<Program> {
        catalog
            .programs
            .iter()
            .map(|program| {
                let mut annotated = program.clone();
                for variant in &mut annotated.variants {
                    variant.installed = Some(self.variant_installed(program, variant));
                }
                annotated
            })
            .collect()
    }
}
