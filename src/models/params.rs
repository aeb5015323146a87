//! User parameter data model
//!
//! Every field is optional; an unset field means "use the default". Booleans
//! whose absence carries meaning are modelled as `Option<bool>` or `Tristate`
//! rather than plain `bool`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use validator::{Validate, ValidationError};

use crate::utils::validation::{validate_collection, validate_package_version};

/// Default collection when none is given
pub const DEFAULT_COLLECTION: &str = "puppet";

/// Default services managed after install
pub const DEFAULT_SERVICE_NAMES: &[&str] = &["puppet"];

/// Three-valued setting where "unset" means "inherit the system default"
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Tristate {
    #[default]
    Unset,
    False,
    True,
}

impl Tristate {
    pub fn is_set(&self) -> bool {
        !matches!(self, Tristate::Unset)
    }

    pub fn is_unset(&self) -> bool {
        !self.is_set()
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Tristate::Unset => None,
            Tristate::False => Some(false),
            Tristate::True => Some(true),
        }
    }

    /// Value as written in a yum/zypper repository stanza
    pub fn repo_value(&self) -> &'static str {
        match self {
            Tristate::Unset => "absent",
            Tristate::False => "false",
            Tristate::True => "true",
        }
    }
}

impl From<bool> for Tristate {
    fn from(value: bool) -> Self {
        if value {
            Tristate::True
        } else {
            Tristate::False
        }
    }
}

impl From<Option<bool>> for Tristate {
    fn from(value: Option<bool>) -> Self {
        value.map(Tristate::from).unwrap_or_default()
    }
}

impl fmt::Display for Tristate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.repo_value())
    }
}

impl Serialize for Tristate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.as_bool() {
            Some(value) => serializer.serialize_bool(value),
            None => serializer.serialize_str(self.repo_value()),
        }
    }
}

impl<'de> Deserialize<'de> for Tristate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Bool(bool),
            Text(String),
        }

        match Option::<Raw>::deserialize(deserializer)? {
            None => Ok(Tristate::Unset),
            Some(Raw::Bool(value)) => Ok(Tristate::from(value)),
            Some(Raw::Text(text)) => text.parse().map_err(serde::de::Error::custom),
        }
    }
}

impl FromStr for Tristate {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "absent" | "unset" => Ok(Tristate::Unset),
            "true" | "1" => Ok(Tristate::True),
            "false" | "0" => Ok(Tristate::False),
            other => Err(format!(
                "invalid tri-state value '{}', expected true, false or absent",
                other
            )),
        }
    }
}

/// Explicit overrides supplied by the user
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct UserParameters {
    /// Agent version to install (`present` when unset)
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(custom(function = "check_package_version"))]
    pub package_version: Option<String>,

    /// Release train, e.g. `puppet5`
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(custom(function = "check_collection"))]
    pub collection: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub manage_repo: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub manage_gpg: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub manage_pki_dir: Option<bool>,

    /// Root URL override for any repository family (and the PE master root)
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(url)]
    pub source: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(url)]
    pub yum_source: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(url)]
    pub apt_source: Option<String>,

    /// Direct package location; bypasses repository management entirely
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 2048))]
    pub absolute_source: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(custom(function = "check_package_version"))]
    pub alternate_pe_version: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(url)]
    pub proxy: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub disable_proxy: Option<bool>,

    #[serde(skip_serializing_if = "Tristate::is_unset")]
    pub skip_if_unavailable: Tristate,

    /// Services to run after install (`["puppet"]` when unset, may be empty)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_names: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub install_options: Vec<String>,
}

impl UserParameters {
    pub fn manage_repo(&self) -> bool {
        self.manage_repo.unwrap_or(true)
    }

    pub fn manage_gpg(&self) -> bool {
        self.manage_gpg.unwrap_or(true)
    }

    pub fn manage_pki_dir(&self) -> bool {
        self.manage_pki_dir.unwrap_or(true)
    }

    pub fn disable_proxy(&self) -> bool {
        self.disable_proxy.unwrap_or(false)
    }

    pub fn collection(&self) -> &str {
        self.collection
            .as_deref()
            .filter(|c| !c.is_empty())
            .unwrap_or(DEFAULT_COLLECTION)
    }

    pub fn service_names(&self) -> Vec<String> {
        match &self.service_names {
            Some(names) => names.clone(),
            None => DEFAULT_SERVICE_NAMES.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Absolute source, if one is set and non-blank
    pub fn absolute_source(&self) -> Option<&str> {
        self.absolute_source
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Whether any repository-shaping override is set
    pub fn has_repository_overrides(&self) -> bool {
        self.source.is_some()
            || self.yum_source.is_some()
            || self.apt_source.is_some()
            || self.proxy.is_some()
            || self.manage_repo.is_some()
            || self.skip_if_unavailable.is_set()
    }
}

fn check_package_version(version: &str) -> Result<(), ValidationError> {
    if validate_package_version(version) {
        Ok(())
    } else {
        Err(ValidationError::new("package_version"))
    }
}

fn check_collection(collection: &str) -> Result<(), ValidationError> {
    if validate_collection(collection) {
        Ok(())
    } else {
        Err(ValidationError::new("collection"))
    }
}
