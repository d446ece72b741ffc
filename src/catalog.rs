//! Static catalog of installable programs.
//!
//! The catalog is immutable data created at process start; the `installed`
//! flags on variants are computed per query by the probe layer and never
//! persisted. Patch archive URLs, extracted-directory prefixes and placement
//! rules are catalog data; the orchestrator only interprets them, so
//! bumping a patch release is a data edit here, not an orchestration change.

use serde::{Deserialize, Serialize};

/// Flathub repository registered before any Flatpak install.
pub const FLATHUB_REPO_URL: &str = "https://flathub.org/repo/flathub.flatpakrepo";

/// How a variant gets installed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum InstallMethod {
    /// System package database install (apt).
    NativePackage {
        /// Package name in the native database.
        package: String,
    },
    /// Flatpak install with no further customization.
    SandboxedPackage {
        /// Flatpak application id.
        app_id: String,
    },
    /// Flatpak install followed by a third-party configuration overlay.
    SandboxedPackagePatch {
        /// Flatpak application id.
        app_id: String,
        /// The patch archive and where its contents go.
        patch: PatchSpec,
    },
}

impl InstallMethod {
    /// Short tag the UI layer passes back to select this variant.
    pub fn tag(&self) -> &'static str {
        match self {
            InstallMethod::NativePackage { .. } => "apt",
            InstallMethod::SandboxedPackage { .. } => "flatpak",
            InstallMethod::SandboxedPackagePatch { .. } => "flatpak+patch",
        }
    }
}

/// A downloadable configuration overlay applied after a Flatpak install.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatchSpec {
    /// HTTPS URL of the patch archive.
    pub archive_url: String,
    /// Name prefix of the archive's top-level directory. Matched by prefix
    /// so a renamed branch or tag in the archive does not break placement.
    pub archive_dir_prefix: String,
    /// Where the extracted contents go, in order.
    pub rules: Vec<PlacementRule>,
}

/// One placement instruction for extracted patch contents.
///
/// `source` paths are relative to the archive's top-level directory;
/// `dest` paths are relative to the user's home directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum PlacementRule {
    /// Merge a directory subtree into `dest` (existing files with the same
    /// name are overwritten, other destination files are kept).
    Dir { source: String, dest: String },
    /// Copy a single file into the `dest` directory.
    File { source: String, dest: String },
    /// Every top-level entry not named by an earlier rule: directories are
    /// merged into `dest`, files are copied there if their extension is
    /// listed.
    Remainder {
        dest: String,
        extensions: Vec<String>,
    },
}

/// Filesystem marker that distinguishes a patched install from a plain one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigMarker {
    /// Path relative to the user's home directory.
    pub path: String,
    /// What must exist at the path.
    pub kind: MarkerKind,
}

/// Whether a config marker is a directory or a regular file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerKind {
    Directory,
    File,
}

/// One installable variant of a program.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Variant {
    /// Display name (e.g., "PhotoGIMP").
    pub name: String,
    /// How this variant is installed.
    pub method: InstallMethod,
    /// Computed at query time by the probe layer; `None` until annotated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub installed: Option<bool>,
}

/// One program in the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Program {
    /// Program name, the key the UI passes to `install_program`.
    pub name: String,
    /// Human description.
    pub description: String,
    /// Display category (e.g., "Photo Editing").
    pub category: String,
    /// Logo asset path served by the UI layer.
    pub logo: String,
    /// Extra blurb shown when a customized variant exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_description: Option<String>,
    /// Marker checked by the custom-config probe, present only for
    /// programs with a patched variant.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_marker: Option<ConfigMarker>,
    /// Installable variants; single-method programs have exactly one.
    pub variants: Vec<Variant>,
}

impl Program {
    /// Find a variant by its UI tag.
    pub fn variant(&self, tag: &str) -> Option<&Variant> {
        self.variants.iter().find(|v| v.method.tag() == tag)
    }
}

/// The full program catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Catalog {
    pub programs: Vec<Program>,
}

impl Catalog {
    /// Find a program by name.
    pub fn find(&self, name: &str) -> Option<&Program> {
        self.programs.iter().find(|p| p.name == name)
    }

    /// The built-in creative-suite catalog.
    pub fn builtin() -> Self {
        let programs = vec![
            Program {
                name: "GIMP".into(),
                description: "GNU Image Manipulation Program".into(),
                category: "Photo Editing".into(),
                logo: "/static/img/logos/gimp.png".into(),
                custom_description: Some(
                    "Available with PhotoGIMP patch for Photoshop-like experience".into(),
                ),
                config_marker: Some(ConfigMarker {
                    path: ".var/app/org.gimp.GIMP/config/GIMP/2.10".into(),
                    kind: MarkerKind::Directory,
                }),
                variants: vec![
                    Variant {
                        name: "Standard GIMP".into(),
                        method: InstallMethod::NativePackage {
                            package: "gimp".into(),
                        },
                        installed: None,
                    },
                    Variant {
                        name: "PhotoGIMP".into(),
                        method: InstallMethod::SandboxedPackagePatch {
                            app_id: "org.gimp.GIMP".into(),
                            patch: PatchSpec {
                                archive_url:
                                    "https://github.com/Diolinux/PhotoGIMP/archive/refs/heads/master.zip"
                                        .into(),
                                archive_dir_prefix: "PhotoGIMP-".into(),
                                rules: vec![PlacementRule::Dir {
                                    source: ".config/GIMP".into(),
                                    dest: ".var/app/org.gimp.GIMP/config/GIMP".into(),
                                }],
                            },
                        },
                        installed: None,
                    },
                ],
            },
            Program {
                name: "Inkscape".into(),
                description: "Vector Graphics Editor".into(),
                category: "Vector Graphics".into(),
                logo: "/static/img/logos/inkscape.png".into(),
                custom_description: Some(
                    "Available with Inkustrator patch for Illustrator-like experience".into(),
                ),
                config_marker: Some(ConfigMarker {
                    path: ".var/app/org.inkscape.Inkscape/config/inkscape/preferences.xml".into(),
                    kind: MarkerKind::File,
                }),
                variants: vec![
                    Variant {
                        name: "Standard Inkscape".into(),
                        method: InstallMethod::NativePackage {
                            package: "inkscape".into(),
                        },
                        installed: None,
                    },
                    Variant {
                        name: "Inkustrator".into(),
                        method: InstallMethod::SandboxedPackagePatch {
                            app_id: "org.inkscape.Inkscape".into(),
                            patch: PatchSpec {
                                archive_url:
                                    "https://github.com/lucasgabmoreno/inkustrator/releases/download/1.3.2-1.0/inkustrator-1.3.2-1.0.zip"
                                        .into(),
                                archive_dir_prefix: "inkustrator-".into(),
                                rules: vec![
                                    PlacementRule::File {
                                        source: "preferences.xml".into(),
                                        dest: ".var/app/org.inkscape.Inkscape/config/inkscape".into(),
                                    },
                                    PlacementRule::File {
                                        source: "keys".into(),
                                        dest: ".var/app/org.inkscape.Inkscape/config/inkscape".into(),
                                    },
                                    PlacementRule::Remainder {
                                        dest: ".var/app/org.inkscape.Inkscape/config/inkscape-extension-manager/extensions"
                                            .into(),
                                        extensions: vec!["py".into(), "inx".into(), "svg".into()],
                                    },
                                ],
                            },
                        },
                        installed: None,
                    },
                ],
            },
            Program {
                name: "Kdenlive".into(),
                description: "Non-linear video editor".into(),
                category: "Video Editing".into(),
                logo: "/static/img/logos/kdenlive.png".into(),
                custom_description: None,
                config_marker: None,
                variants: vec![Variant {
                    name: "Kdenlive".into(),
                    method: InstallMethod::NativePackage {
                        package: "kdenlive".into(),
                    },
                    installed: None,
                }],
            },
            Program {
                name: "OpenShot".into(),
                description: "Video Editor".into(),
                category: "Video Editing".into(),
                logo: "/static/img/logos/openshot.png".into(),
                custom_description: None,
                config_marker: None,
                variants: vec![Variant {
                    name: "OpenShot".into(),
                    method: InstallMethod::NativePackage {
                        package: "openshot-qt".into(),
                    },
                    installed: None,
                }],
            },
            Program {
                name: "Audacity".into(),
                description: "Audio Editor and Recorder".into(),
                category: "Audio Editing".into(),
                logo: "/static/img/logos/audacity.png".into(),
                custom_description: None,
                config_marker: None,
                variants: vec![Variant {
                    name: "Audacity".into(),
                    method: InstallMethod::NativePackage {
                        package: "audacity".into(),
                    },
                    installed: None,
                }],
            },
        ];

        Self { programs }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_has_five_programs() {
        let catalog = Catalog::builtin();
        assert_eq!(catalog.programs.len(), 5);
        for name in ["GIMP", "Inkscape", "Kdenlive", "OpenShot", "Audacity"] {
            assert!(catalog.find(name).is_some(), "missing {}", name);
        }
    }

    #[test]
    fn find_is_exact_match() {
        let catalog = Catalog::builtin();
        assert!(catalog.find("gimp").is_none());
        assert!(catalog.find("GIMP").is_some());
    }

    #[test]
    fn gimp_has_native_and_patched_variants() {
        let catalog = Catalog::builtin();
        let gimp = catalog.find("GIMP").unwrap();
        assert!(gimp.variant("apt").is_some());
        let patched = gimp.variant("flatpak+patch").unwrap();
        assert_eq!(patched.name, "PhotoGIMP");
        match &patched.method {
            InstallMethod::SandboxedPackagePatch { app_id, patch } => {
                assert_eq!(app_id, "org.gimp.GIMP");
                assert!(patch.archive_url.ends_with("master.zip"));
                assert_eq!(patch.archive_dir_prefix, "PhotoGIMP-");
            }
            other => panic!("unexpected method: {:?}", other),
        }
    }

    #[test]
    fn single_method_programs_have_one_native_variant() {
        let catalog = Catalog::builtin();
        for name in ["Kdenlive", "OpenShot", "Audacity"] {
            let program = catalog.find(name).unwrap();
            assert_eq!(program.variants.len(), 1);
            assert!(matches!(
                program.variants[0].method,
                InstallMethod::NativePackage { .. }
            ));
        }
    }

    #[test]
    fn method_tags_are_stable() {
        assert_eq!(
            InstallMethod::NativePackage {
                package: "gimp".into()
            }
            .tag(),
            "apt"
        );
        assert_eq!(
            InstallMethod::SandboxedPackage {
                app_id: "org.gimp.GIMP".into()
            }
            .tag(),
            "flatpak"
        );
    }

    #[test]
    fn unknown_variant_tag_returns_none() {
        let catalog = Catalog::builtin();
        let gimp = catalog.find("GIMP").unwrap();
        assert!(gimp.variant("snap").is_none());
    }

    #[test]
    fn markers_only_on_patchable_programs() {
        let catalog = Catalog::builtin();
        assert!(catalog.find("GIMP").unwrap().config_marker.is_some());
        assert!(catalog.find("Inkscape").unwrap().config_marker.is_some());
        assert!(catalog.find("Audacity").unwrap().config_marker.is_none());
    }

    #[test]
    fn catalog_serializes_for_the_ui() {
        let catalog = Catalog::builtin();
        let json = serde_json::to_string(&catalog).unwrap();
        assert!(json.contains("\"name\":\"GIMP\""));
        assert!(json.contains("native-package"));
        // Unannotated variants omit the installed flag entirely.
        assert!(!json.contains("\"installed\""));
    }

    #[test]
    fn inkustrator_rules_cover_config_and_extensions() {
        let catalog = Catalog::builtin();
        let variant = catalog.find("Inkscape").unwrap().variant("flatpak+patch").unwrap();
        let InstallMethod::SandboxedPackagePatch { patch, .. } = &variant.method else {
            panic!("expected patched method");
        };
        assert_eq!(patch.rules.len(), 3);
        assert!(matches!(patch.rules[2], PlacementRule::Remainder { .. }));
    }
}
