//! The two-call surface the presentation layer depends on.
//!
//! The UI shell renders whatever [`Suite::get_programs`] returns and calls
//! [`Suite::install_program`] when the user clicks install. Neither call
//! ever surfaces a raw error: probes degrade to "not installed" and install
//! failures come back as an [`InstallResult`] message.

use crate::catalog::{Catalog, Program};
use crate::orchestrator::{InstallContext, InstallResult, Installer};
use crate::probe::ProbeService;
use std::sync::Arc;

/// Facade over the catalog, probes and orchestrator.
pub struct Suite {
    probes: ProbeService,
    installer: Installer,
}

impl Suite {
    /// Suite against the real host system with the built-in catalog.
    pub fn new() -> Self {
        Self::with_context(Catalog::builtin(), InstallContext::host())
    }

    /// Suite with a caller-supplied catalog and context (tests inject a
    /// scripted runner, canned fetcher and temp home here).
    pub fn with_context(catalog: Catalog, ctx: InstallContext) -> Self {
        let probes = ProbeService::new(Arc::clone(&ctx.runner), ctx.home.clone());
        Self {
            probes,
            installer: Installer::new(catalog, ctx),
        }
    }

    /// The catalog with every variant's `installed` status filled in.
    ///
    /// Repeated calls within the cache TTL reuse probe results instead of
    /// re-querying the package databases.
    pub fn get_programs(&self) -> Vec<Program> {
        self.probes.annotate(self.installer.catalog())
    }

    /// Run one install request to completion.
    pub fn install_program(&self, program_name: &str, variant_tag: &str) -> InstallResult {
        tracing::info!(program = program_name, variant = variant_tag, "install requested");
        let result = self.installer.install(program_name, variant_tag);
        if result.success {
            tracing::info!(program = program_name, "install succeeded");
        } else {
            tracing::warn!(program = program_name, message = %result.message, "install failed");
        }
        result
    }
}

impl Default for Suite {
    fn default() -> Self {
        Self::new()
    }
}
