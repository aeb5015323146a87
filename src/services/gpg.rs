//! GPG trust decisions
//!
//! Agent packages are signed with the current Puppet key; during a key
//! rotation the new key must be trusted at the same time. Verification itself
//! is delegated to `gpg` and `rpm` through the rendered check/import commands.

use crate::models::{GpgKey, KeyGeneration, KeyImport, ManagedFile, OsFamily};

/// Keys trusted for agent packages, current generation first
pub const TRUSTED_KEYS: &[(&str, KeyGeneration)] = &[
    ("GPG-KEY-puppet", KeyGeneration::Current),
    ("GPG-KEY-puppet-20250406", KeyGeneration::Rotation),
];

pub const RPM_KEY_DIR: &str = "/etc/pki/rpm-gpg";
pub const DEB_KEY_DIR: &str = "/etc/pki/deb-gpg";
pub const PKI_ROOT: &str = "/etc/pki";

/// GnuPG home used when inspecting key files
pub const GPG_HOMEDIR: &str = "/root/.gnupg";

/// `PATH` for the check/import commands
pub const COMMAND_SEARCH_PATH: &str = "/bin:/usr/bin:/sbin:/usr/sbin";

const KEY_SOURCE_PREFIX: &str = "puppet:///modules/puppet_agent";

/// Compares the key in the rpm database with the key file (`check`) or
/// replaces the imported key with the key file (`import`).
const KEY_SCRIPT: &str = r#"ACTION=$0
GPG_HOMEDIR=$1
GPG_KEY_PATH=$2
GPG_ARGS="--homedir $GPG_HOMEDIR --with-colons"
GPG_BIN=$(command -v gpg || command -v gpg2)
if [ -z "${GPG_BIN}" ]; then
  echo Could not find a suitable gpg command, exiting...
  exit 1
fi
GPG_PUBKEY=gpg-pubkey-$("${GPG_BIN}" ${GPG_ARGS} "${GPG_KEY_PATH}" 2>&1 | grep ^pub | cut -d: -f5 | cut --characters=9-16 | tr "[:upper:]" "[:lower:]")
if [ "${ACTION}" = "check" ]; then
  # This will return 1 if there are differences between the key imported in the
  # RPM database and the local keyfile. This means we need to purge the key and
  # reimport it.
  diff <(rpm -qi "${GPG_PUBKEY}" | "${GPG_BIN}" ${GPG_ARGS}) <("${GPG_BIN}" ${GPG_ARGS} "${GPG_KEY_PATH}")
elif [ "${ACTION}" = "import" ]; then
  (rpm -q "${GPG_PUBKEY}" && rpm -e --allmatches "${GPG_PUBKEY}") || true
  rpm --import "${GPG_KEY_PATH}"
fi
"#;

/// Key directory for a family, if its packages are signature-checked
pub fn key_dir(family: &OsFamily) -> Option<&'static str> {
    match family {
        OsFamily::RedHat | OsFamily::Suse => Some(RPM_KEY_DIR),
        OsFamily::Debian => Some(DEB_KEY_DIR),
        _ => None,
    }
}

/// The ordered key set a family must trust (empty for unsigned families)
pub fn trusted_keys(family: &OsFamily) -> Vec<GpgKey> {
    let Some(dir) = key_dir(family) else {
        return Vec::new();
    };
    let file_prefix = if family.is_rpm_based() { "RPM-" } else { "" };

    TRUSTED_KEYS
        .iter()
        .map(|(name, generation)| GpgKey {
            name: name.to_string(),
            generation: *generation,
            path: format!("{}/{}{}", dir, file_prefix, name),
            source: format!("{}/{}", KEY_SOURCE_PREFIX, name),
        })
        .collect()
}

/// Root-owned, world-readable key files
pub fn key_files(keys: &[GpgKey]) -> Vec<ManagedFile> {
    keys.iter()
        .map(|key| ManagedFile {
            path: key.path.clone(),
            source: key.source.clone(),
            owner: "0".to_string(),
            group: "0".to_string(),
            mode: "0644".to_string(),
        })
        .collect()
}

/// Check/import commands for each key (rpm families only)
pub fn key_imports(family: &OsFamily, keys: &[GpgKey]) -> Vec<KeyImport> {
    if !family.is_rpm_based() {
        return Vec::new();
    }

    keys.iter()
        .map(|key| KeyImport {
            title: format!("import-{}", key.name),
            path: key.path.clone(),
            search_path: COMMAND_SEARCH_PATH.to_string(),
            command: key_command("import", &key.path),
            unless: key_command("check", &key.path),
            require: format!("File[{}]", key.path),
        })
        .collect()
}

fn key_command(action: &str, key_path: &str) -> String {
    format!(
        "/bin/bash -c '{}' {} {} {}",
        KEY_SCRIPT, action, GPG_HOMEDIR, key_path
    )
}

/// Directories that must exist before the key files
pub fn pki_directories(family: &OsFamily) -> Vec<String> {
    match key_dir(family) {
        Some(dir) => vec![PKI_ROOT.to_string(), dir.to_string()],
        None => Vec::new(),
    }
}
