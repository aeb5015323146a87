//! Business logic services

pub mod facts;
pub mod gpg;
pub mod pe_version;
pub mod platform;
pub mod puppetdb;
pub mod repo_file;
pub mod resolver;

pub use facts::FactSource;
pub use pe_version::{NoPeVersion, PeBuildFile, PeVersionLookup, StaticPeVersion, VersionLookupError};
pub use puppetdb::{PuppetDbClient, ServerVersion};
pub use repo_file::RepoFile;
pub use resolver::{PlatformResolver, ResolveError};
