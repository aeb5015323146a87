//! Test fixtures for common test data
//!
//! Facter fact maps for the platforms the resolver distinguishes.

use serde_json::{json, Value};

pub const TEST_MASTER: &str = "master.example.vm";
pub const TEST_AGENT: &str = "agent.example.vm";

/// Fact map fixtures
pub struct FactFixtures;

impl FactFixtures {
    /// CentOS 7, open source
    pub fn centos7() -> Value {
        json!({
            "clientcert": TEST_AGENT,
            "os": {
                "family": "RedHat",
                "name": "CentOS",
                "architecture": "x86_64",
                "release": { "major": "7", "full": "7.9.2009" }
            }
        })
    }

    /// Fedora 36, open source
    pub fn fedora36() -> Value {
        json!({
            "os": {
                "family": "RedHat",
                "name": "Fedora",
                "architecture": "x86_64",
                "release": { "major": "36" }
            }
        })
    }

    /// Amazon Linux 2017 on Puppet Enterprise
    pub fn amazon_pe() -> Value {
        json!({
            "clientcert": TEST_AGENT,
            "puppet_master_server": TEST_MASTER,
            "is_pe": true,
            "os": {
                "family": "RedHat",
                "name": "Amazon",
                "architecture": "x64",
                "release": { "major": "2017" }
            }
        })
    }

    /// Ubuntu 22.04, open source
    pub fn ubuntu_jammy() -> Value {
        json!({
            "os": {
                "family": "Debian",
                "name": "Ubuntu",
                "architecture": "amd64",
                "release": { "major": "22.04" },
                "distro": { "codename": "jammy" }
            }
        })
    }

    /// Windows Server 2019
    pub fn windows() -> Value {
        json!({
            "os": {
                "family": "windows",
                "name": "windows",
                "architecture": "x64",
                "release": { "major": "2019" }
            }
        })
    }

    /// Legacy flat facts only (no structured `os` fact)
    pub fn legacy_centos6() -> Value {
        json!({
            "osfamily": "RedHat",
            "operatingsystem": "CentOS",
            "operatingsystemmajrelease": "6",
            "architecture": "i386"
        })
    }
}

/// Request body for the resolve endpoint
pub fn resolve_body(facts: Value, parameters: Value) -> Value {
    json!({
        "facts": facts,
        "parameters": parameters,
    })
}
