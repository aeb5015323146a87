//! Repository file rendering
//!
//! Renders a managed `RepositoryConfig` the way it lands on the host: a
//! yum/zypper `.repo` stanza or a one-line apt source.

use serde::Serialize;

use crate::models::{RepoKind, RepositoryConfig, REPO_NAME};

/// A rendered repository definition and where it is written
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepoFile {
    pub path: String,
    pub contents: String,
}

/// Render the repository file, or `None` when nothing is managed
pub fn render(repo: &RepositoryConfig) -> Option<RepoFile> {
    if !repo.managed {
        return None;
    }
    let kind = repo.kind?;
    let name = repo.name.as_deref().unwrap_or(REPO_NAME);
    let base_url = repo.base_url.as_deref()?;

    let (path, contents) = match kind {
        RepoKind::Yum => (
            format!("/etc/yum.repos.d/{}.repo", name),
            render_stanza(repo, name, base_url),
        ),
        RepoKind::Zypper => (
            format!("/etc/zypp/repos.d/{}.repo", name),
            render_stanza(repo, name, base_url),
        ),
        RepoKind::Apt => (
            format!("/etc/apt/sources.list.d/{}.list", name),
            render_apt_line(repo, base_url)?,
        ),
    };

    Some(RepoFile { path, contents })
}

fn flag(value: bool) -> u8 {
    u8::from(value)
}

fn render_stanza(repo: &RepositoryConfig, name: &str, base_url: &str) -> String {
    let mut lines = vec![
        format!("[{}]", name),
        format!("name={}", name),
        format!("baseurl={}", base_url),
        format!("enabled={}", flag(repo.enabled)),
        format!("gpgcheck={}", flag(repo.gpg_check)),
    ];
    if let Some(gpgkey) = repo.gpgkey_field() {
        lines.push(format!("gpgkey={}", gpgkey));
    }
    if let Some(ssl) = &repo.ssl {
        lines.push(format!("sslcacert={}", ssl.ca_cert));
        lines.push(format!("sslclientcert={}", ssl.client_cert));
        lines.push(format!("sslclientkey={}", ssl.client_key));
    }
    if let Some(proxy) = repo.proxy.repo_value() {
        lines.push(format!("proxy={}", proxy));
    }
    if let Some(skip) = repo.skip_if_unavailable.as_bool() {
        lines.push(format!("skip_if_unavailable={}", flag(skip)));
    }

    lines.push(String::new());
    lines.join("\n")
}

fn render_apt_line(repo: &RepositoryConfig, base_url: &str) -> Option<String> {
    let suite = repo.apt.as_ref()?;

    let signed_by = repo
        .gpg_keys
        .iter()
        .map(|k| k.path.as_str())
        .collect::<Vec<_>>()
        .join(",");

    let line = if signed_by.is_empty() {
        format!("deb {} {} {}\n", base_url, suite.release, suite.repos)
    } else {
        format!(
            "deb [signed-by={}] {} {} {}\n",
            signed_by, base_url, suite.release, suite.repos
        )
    };
    Some(line)
}
