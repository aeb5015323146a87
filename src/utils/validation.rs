//! Input validation utilities

use once_cell::sync::Lazy;
use regex::Regex;

/// Regex for validating certificate names
static CERTNAME_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9][a-zA-Z0-9._-]*$").unwrap());

/// Collections are release trains such as `puppet8` or `openvox8-nightly`
static COLLECTION_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z][a-zA-Z0-9_-]*$").unwrap());

/// Package versions, e.g. `8.10.0`, `6.12.0-1.el7`, `2023.8.1`
static VERSION_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9][0-9A-Za-z.+~_-]*$").unwrap());

/// Validate a certificate name
pub fn validate_certname(certname: &str) -> bool {
    !certname.is_empty() && certname.len() <= 255 && CERTNAME_REGEX.is_match(certname)
}

/// Validate a collection name
pub fn validate_collection(collection: &str) -> bool {
    !collection.is_empty() && collection.len() <= 64 && COLLECTION_REGEX.is_match(collection)
}

/// Validate a package version (`present` is accepted as "any version")
pub fn validate_package_version(version: &str) -> bool {
    if version == "present" {
        return true;
    }
    !version.is_empty()
        && version.len() <= 64
        && !version.contains("..")
        && VERSION_REGEX.is_match(version)
}
