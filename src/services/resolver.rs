//! Platform resolver
//!
//! Turns host facts and user parameters into a `Resolution`. Resolution is
//! deterministic and side-effect free apart from the injected PE version
//! lookup, which is consulted only when an enterprise URL has to be built
//! from scratch.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, warn};

use crate::models::{
    AptSuite, Diagnostic, DiagnosticKind, HostFacts, InstallSource, OsFamily, PackageEnsure,
    PackageInstallPlan, ProxySetting, RepoKind, RepositoryConfig, Resolution, ServiceEnsure,
    ServiceState, SslMaterial, UserParameters, AGENT_PACKAGE_NAME, LEGACY_PE_REPO_NAME,
    REPO_NAME,
};
use crate::services::gpg;
use crate::services::pe_version::{PeVersionLookup, VersionLookupError};
use crate::services::platform::{self, PlatformDir};

pub const DEFAULT_YUM_ROOT: &str = "http://yum.puppet.com";
pub const DEFAULT_APT_ROOT: &str = "https://apt.puppet.com";

/// Port the PE master serves packages on
pub const PE_MASTER_PORT: u16 = 8140;

/// Apt component PE publishes agent packages under
pub const PE_APT_COMPONENT: &str = "PC1";

pub const PUPPET_SSL_DIR: &str = "/etc/puppetlabs/puppet/ssl";

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("PE version is required but could not be determined: {0}")]
    MissingVersionInfo(#[from] VersionLookupError),
}

/// Resolves repository, package and service decisions for a host
#[derive(Clone)]
pub struct PlatformResolver {
    pe_versions: Arc<dyn PeVersionLookup>,
}

impl PlatformResolver {
    pub fn new(pe_versions: Arc<dyn PeVersionLookup>) -> Self {
        Self { pe_versions }
    }

    pub fn pe_versions(&self) -> &dyn PeVersionLookup {
        self.pe_versions.as_ref()
    }

    pub fn resolve(
        &self,
        facts: &HostFacts,
        params: &UserParameters,
    ) -> Result<Resolution, ResolveError> {
        debug!(
            family = %facts.os_family,
            name = %facts.os_name,
            release = %facts.os_major_version,
            pe = facts.is_pe,
            "Resolving agent install"
        );

        let mut diagnostics = Vec::new();
        let services = service_plan(facts, params);

        if let Some(source) = params.absolute_source() {
            if params.has_repository_overrides() {
                debug!("absolute_source is set; repository overrides are ignored");
            }
            let package = absolute_plan(facts, params, source, &mut diagnostics);
            return Ok(Resolution {
                repository: RepositoryConfig::unmanaged(),
                package,
                services,
                diagnostics,
            });
        }

        let repository = self.repository(facts, params, &mut diagnostics)?;
        let package = repository_plan(facts, params);

        Ok(Resolution {
            repository,
            package,
            services,
            diagnostics,
        })
    }

    fn repository(
        &self,
        facts: &HostFacts,
        params: &UserParameters,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Result<RepositoryConfig, ResolveError> {
        let mut repo = RepositoryConfig::unmanaged();

        if facts.is_pe && facts.os_family.is_repo_managed() {
            repo.legacy_removals.push(LEGACY_PE_REPO_NAME.to_string());
        }

        let dir = match platform::repo_directory(facts) {
            Ok(dir) => dir,
            Err(e) => {
                debug!("No repository for host: {}", e);
                diagnostics.push(Diagnostic::new(e.diagnostic_kind(), e.to_string()));
                return Ok(repo);
            }
        };

        if let Some(release) = &dir.fallback_from {
            warn!(
                "{} release '{}' is not listed, using {}",
                facts.os_name, release, dir.token
            );
            diagnostics.push(Diagnostic::new(
                DiagnosticKind::ReleaseFallback,
                format!(
                    "{} release '{}' is not listed; using {}",
                    facts.os_name, release, dir.token
                ),
            ));
        }

        if !params.manage_repo() {
            debug!("manage_repo is false; {} is not managed", REPO_NAME);
            return Ok(repo);
        }

        let Some(kind) = platform::repo_kind(&facts.os_family) else {
            return Ok(repo);
        };

        let location = if facts.is_pe {
            self.pe_location(facts, params, &dir, kind, diagnostics)?
        } else {
            foss_location(facts, params, &dir, kind, diagnostics)
        };
        let Some((base_url, apt)) = location else {
            return Ok(repo);
        };

        let keys = gpg::trusted_keys(&facts.os_family);

        repo.managed = true;
        repo.kind = Some(kind);
        repo.name = Some(REPO_NAME.to_string());
        repo.base_url = Some(base_url);
        repo.apt = apt;
        repo.enabled = true;
        repo.gpg_check = !keys.is_empty();

        if params.manage_gpg() {
            repo.key_files = gpg::key_files(&keys);
            repo.key_imports = gpg::key_imports(&facts.os_family, &keys);
        }
        if params.manage_pki_dir() {
            repo.pki_directories = gpg::pki_directories(&facts.os_family);
        }
        repo.gpg_keys = keys;

        if facts.is_pe && facts.os_family.is_rpm_based() {
            repo.ssl = ssl_material(facts, diagnostics);
        }

        repo.proxy = proxy_setting(params);
        repo.skip_if_unavailable = params.skip_if_unavailable;

        Ok(repo)
    }

    fn pe_location(
        &self,
        facts: &HostFacts,
        params: &UserParameters,
        dir: &PlatformDir,
        kind: RepoKind,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Result<Option<(String, Option<AptSuite>)>, ResolveError> {
        let root = match non_empty(params.source.as_deref()) {
            Some(source) => source.to_string(),
            None => match non_empty(facts.master_server.as_deref()) {
                Some(master) => format!("https://{}:{}", master, PE_MASTER_PORT),
                None => {
                    diagnostics.push(Diagnostic::new(
                        DiagnosticKind::MissingFact,
                        "fact 'puppet_master_server' is required to build the PE repository URL",
                    ));
                    return Ok(None);
                }
            },
        };

        let pe_dir = platform::pe_directory(facts, dir);
        if pe_dir.ends_with('-') {
            diagnostics.push(missing_architecture());
            return Ok(None);
        }

        let pe_version = match non_empty(params.alternate_pe_version.as_deref()) {
            Some(version) => version.to_string(),
            None => self.pe_versions.pe_version()?,
        };

        let vars = UrlVars {
            collection: params.collection(),
            platform_dir: &dir.token,
            arch: &facts.architecture,
            pe_version: &pe_version,
            platform_tag: &pe_dir,
        };
        let url = match vars.expand(&root) {
            Ok(Some(url)) => url,
            Ok(None) => format!(
                "{}/packages/{}/{}",
                root.trim_end_matches('/'),
                pe_version,
                pe_dir
            ),
            Err(fact) => {
                diagnostics.push(missing_placeholder(fact));
                return Ok(None);
            }
        };

        let apt = (kind == RepoKind::Apt).then(|| AptSuite {
            release: dir.token.clone(),
            repos: PE_APT_COMPONENT.to_string(),
        });

        Ok(Some((url, apt)))
    }
}

fn foss_location(
    facts: &HostFacts,
    params: &UserParameters,
    dir: &PlatformDir,
    kind: RepoKind,
    diagnostics: &mut Vec<Diagnostic>,
) -> Option<(String, Option<AptSuite>)> {
    let collection = params.collection();
    let url_dir = dir.url_segment();
    let vars = UrlVars {
        collection,
        platform_dir: &url_dir,
        arch: &facts.architecture,
        pe_version: "",
        platform_tag: facts.platform_tag.as_deref().unwrap_or_default(),
    };

    match kind {
        RepoKind::Apt => {
            let root = non_empty(params.apt_source.as_deref())
                .or_else(|| non_empty(params.source.as_deref()))
                .unwrap_or(DEFAULT_APT_ROOT);
            let url = match vars.expand(root) {
                Ok(url) => url.unwrap_or_else(|| root.trim_end_matches('/').to_string()),
                Err(fact) => {
                    diagnostics.push(missing_placeholder(fact));
                    return None;
                }
            };
            let suite = AptSuite {
                release: dir.token.clone(),
                repos: collection.to_string(),
            };
            Some((url, Some(suite)))
        }
        RepoKind::Yum | RepoKind::Zypper => {
            let root = non_empty(params.yum_source.as_deref())
                .or_else(|| non_empty(params.source.as_deref()))
                .unwrap_or(DEFAULT_YUM_ROOT);
            match vars.expand(root) {
                Ok(Some(url)) => return Some((url, None)),
                Ok(None) => {}
                Err(fact) => {
                    diagnostics.push(missing_placeholder(fact));
                    return None;
                }
            }
            if facts.architecture.is_empty() {
                diagnostics.push(missing_architecture());
                return None;
            }
            let url = format!(
                "{}/{}/{}/{}",
                root.trim_end_matches('/'),
                collection,
                url_dir,
                facts.architecture
            );
            Some((url, None))
        }
    }
}

/// Values available to placeholder overrides
struct UrlVars<'a> {
    collection: &'a str,
    platform_dir: &'a str,
    arch: &'a str,
    pe_version: &'a str,
    platform_tag: &'a str,
}

impl UrlVars<'_> {
    /// Substitute placeholders when the override carries any, else `Ok(None)`.
    ///
    /// A placeholder with no value fails with the name of the fact it needs.
    fn expand(&self, template: &str) -> Result<Option<String>, &'static str> {
        let placeholders = [
            ("{collection}", self.collection, "collection"),
            ("{platform_dir}", self.platform_dir, "os.release.major"),
            ("{arch}", self.arch, "os.architecture"),
            ("{pe_version}", self.pe_version, "pe_version"),
            ("{platform_tag}", self.platform_tag, "platform_tag"),
        ];
        let used: Vec<_> = placeholders
            .iter()
            .filter(|entry| template.contains(entry.0))
            .collect();

        if used.is_empty() {
            return Ok(None);
        }
        if let Some(entry) = used.iter().find(|entry| entry.1.trim().is_empty()) {
            return Err(entry.2);
        }

        let url = used
            .iter()
            .fold(template.to_string(), |url, entry| url.replace(entry.0, entry.1));
        Ok(Some(url))
    }
}

fn missing_architecture() -> Diagnostic {
    Diagnostic::new(
        DiagnosticKind::MissingFact,
        "fact 'os.architecture' is required to build the repository URL",
    )
}

fn missing_placeholder(fact: &str) -> Diagnostic {
    Diagnostic::new(
        DiagnosticKind::MissingFact,
        format!("fact '{}' is required by the source override", fact),
    )
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn ssl_material(facts: &HostFacts, diagnostics: &mut Vec<Diagnostic>) -> Option<SslMaterial> {
    let Some(cert) = non_empty(facts.client_cert.as_deref()) else {
        diagnostics.push(Diagnostic::new(
            DiagnosticKind::MissingFact,
            "fact 'clientcert' is required for PE repository SSL material",
        ));
        return None;
    };

    Some(SslMaterial {
        ca_cert: format!("{}/certs/ca.pem", PUPPET_SSL_DIR),
        client_cert: format!("{}/certs/{}.pem", PUPPET_SSL_DIR, cert),
        client_key: format!("{}/private_keys/{}.pem", PUPPET_SSL_DIR, cert),
    })
}

fn proxy_setting(params: &UserParameters) -> ProxySetting {
    if params.disable_proxy() {
        return ProxySetting::Disabled;
    }
    match non_empty(params.proxy.as_deref()) {
        Some(proxy) => ProxySetting::Url(proxy.to_string()),
        None => ProxySetting::Inherit,
    }
}

fn service_plan(facts: &HostFacts, params: &UserParameters) -> Vec<ServiceState> {
    let windows = facts.os_family == OsFamily::Windows;
    let mut services: Vec<ServiceState> = Vec::new();

    for name in params.service_names() {
        let name = name.trim();
        if name.is_empty() || services.iter().any(|s| s.name == name) {
            continue;
        }
        services.push(ServiceState {
            name: name.to_string(),
            ensure: if windows {
                ServiceEnsure::Stopped
            } else {
                ServiceEnsure::Running
            },
            enable: !windows,
        });
    }

    services
}

fn repository_plan(facts: &HostFacts, params: &UserParameters) -> PackageInstallPlan {
    let provider = platform::repository_provider(&facts.os_family);
    PackageInstallPlan {
        name: AGENT_PACKAGE_NAME.to_string(),
        ensure: PackageEnsure::from_version(params.package_version.as_deref()),
        source: if provider.is_some() {
            InstallSource::Repository
        } else {
            InstallSource::Native
        },
        provider,
        install_options: params.install_options.clone(),
        staging_dir: None,
    }
}

fn absolute_plan(
    facts: &HostFacts,
    params: &UserParameters,
    source: &str,
    diagnostics: &mut Vec<Diagnostic>,
) -> PackageInstallPlan {
    let ensure = PackageEnsure::from_version(params.package_version.as_deref());
    let install_options = params.install_options.clone();

    let Some(file_name) = source_file_name(source) else {
        diagnostics.push(Diagnostic::new(
            DiagnosticKind::InvalidAbsoluteSource,
            format!("absolute_source '{}' does not name a package file", source),
        ));
        return PackageInstallPlan {
            name: AGENT_PACKAGE_NAME.to_string(),
            ensure,
            source: InstallSource::Native,
            provider: None,
            install_options,
            staging_dir: None,
        };
    };

    let staging_dir = platform::staging_dir(&facts.os_family);
    PackageInstallPlan {
        name: AGENT_PACKAGE_NAME.to_string(),
        ensure,
        source: InstallSource::Local {
            path: format!("{}/{}", staging_dir, file_name),
            staged_from: source.to_string(),
        },
        provider: platform::file_provider(facts),
        install_options,
        staging_dir: Some(staging_dir.to_string()),
    }
}

/// Last path component of a URL or path, without query or fragment
fn source_file_name(source: &str) -> Option<&str> {
    let path = source.split(['?', '#']).next().unwrap_or_default();
    let name = path.rsplit(['/', '\\']).next().unwrap_or_default();
    match name {
        "" | "." | ".." => None,
        name if name.contains(':') && !path.contains('/') && !path.contains('\\') => None,
        name => Some(name),
    }
}
