//! Registry configuration: document mode, initial admins and genesis.

use crate::errors::ConfigError;
use didreg_storage::DEFAULT_BASE_ADDR;
use didreg_types::{Did, DidKind, DocInfo};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;

/// Whether the registry keeps full documents itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocMode {
    /// Callers store documents elsewhere and supply address plus hash.
    #[default]
    External,
    /// The registry stores documents and computes their hashes.
    Internal,
}

impl DocMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocMode::External => "external",
            DocMode::Internal => "internal",
        }
    }
}

impl fmt::Display for DocMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration for a chain or account registry.
///
/// ```toml
/// name = "relay-root"
/// mode = "internal"
/// admins = ["did:bitxhub:relayroot:0x00000001"]
///
/// [genesis]
/// id = "did:bitxhub:relayroot:."
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    pub name: String,
    pub mode: DocMode,
    /// Initial admins, used only until an admin list has been persisted.
    pub admins: Vec<Did>,
    pub doc_base_addr: String,
    pub genesis: Option<DocInfo>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            name: "did-registry".to_string(),
            mode: DocMode::External,
            admins: Vec::new(),
            doc_base_addr: DEFAULT_BASE_ADDR.to_string(),
            genesis: None,
        }
    }
}

impl RegistryConfig {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_mode(mut self, mode: DocMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_admin(mut self, admin: Did) -> Self {
        self.admins.push(admin);
        self
    }

    pub fn with_admins(mut self, admins: impl IntoIterator<Item = Did>) -> Self {
        self.admins = admins.into_iter().collect();
        self
    }

    pub fn with_doc_base_addr(mut self, addr: impl Into<String>) -> Self {
        self.doc_base_addr = addr.into();
        self
    }

    pub fn with_genesis(mut self, genesis: DocInfo) -> Self {
        self.genesis = Some(genesis);
        self
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    /// Checks admins and genesis against the kind of registry they configure.
    pub fn validate(&self, kind: DidKind) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for admin in &self.admins {
            if !admin.is_valid_format() {
                return Err(ConfigError::InvalidAdmin(admin.clone()));
            }
            if !seen.insert(admin) {
                return Err(ConfigError::DuplicateAdmin(admin.clone()));
            }
        }

        let Some(genesis) = &self.genesis else {
            return Ok(());
        };
        genesis
            .id
            .ensure_kind(kind)
            .map_err(|e| ConfigError::InvalidGenesis(e.to_string()))?;
        if self.mode == DocMode::Internal {
            let doc = genesis.content.as_ref().ok_or_else(|| {
                ConfigError::InvalidGenesis(format!(
                    "{} has no document content for internal mode",
                    genesis.id
                ))
            })?;
            if doc.id() != &genesis.id {
                return Err(ConfigError::InvalidGenesis(format!(
                    "document id {} does not match genesis id {}",
                    doc.id(),
                    genesis.id
                )));
            }
            doc.validate(kind)
                .map_err(|e| ConfigError::InvalidGenesis(e.to_string()))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use didreg_types::ChainDoc;

    const SAMPLE: &str = r#"
name = "relay-root"
mode = "internal"
admins = ["did:bitxhub:relayroot:0x00000001"]

[genesis]
id = "did:bitxhub:relayroot:."

[genesis.content.chain.base]
id = "did:bitxhub:relayroot:."
doc_type = "chain"
created = 1
"#;

    #[test]
    fn test_defaults() {
        let config = RegistryConfig::from_toml_str("").unwrap();
        assert_eq!(config, RegistryConfig::default());
        assert_eq!(config.mode, DocMode::External);
        assert_eq!(config.doc_base_addr, ".");
    }

    #[test]
    fn test_parse_sample() {
        let config = RegistryConfig::from_toml_str(SAMPLE).unwrap();
        assert_eq!(config.name, "relay-root");
        assert_eq!(config.mode, DocMode::Internal);
        assert_eq!(
            config.admins,
            vec![Did::new("did:bitxhub:relayroot:0x00000001")]
        );
        let genesis = config.genesis.as_ref().unwrap();
        assert_eq!(genesis.id, Did::new("did:bitxhub:relayroot:."));
        assert!(genesis.content.as_ref().unwrap().as_chain().is_some());
        config.validate(DidKind::Chain).unwrap();
    }

    #[test]
    fn test_validate_rejects_bad_admins() {
        let config = RegistryConfig::default().with_admin(Did::new("not-a-did"));
        assert!(matches!(
            config.validate(DidKind::Chain),
            Err(ConfigError::InvalidAdmin(_))
        ));

        let admin = Did::new("did:x:root:0x1");
        let config = RegistryConfig::default().with_admins([admin.clone(), admin]);
        assert!(matches!(
            config.validate(DidKind::Chain),
            Err(ConfigError::DuplicateAdmin(_))
        ));
    }

    #[test]
    fn test_validate_genesis_kind_and_content() {
        let chain = Did::new("did:x:root:.");
        let external = RegistryConfig::default()
            .with_genesis(DocInfo::external(chain.clone(), "/ext/root", vec![1]));
        external.validate(DidKind::Chain).unwrap();
        assert!(matches!(
            external.validate(DidKind::Account),
            Err(ConfigError::InvalidGenesis(_))
        ));

        let missing_content = external.clone().with_mode(DocMode::Internal);
        assert!(matches!(
            missing_content.validate(DidKind::Chain),
            Err(ConfigError::InvalidGenesis(_))
        ));

        let mut mismatched = DocInfo::internal(ChainDoc::new(Did::new("did:x:other:."), 1));
        mismatched.id = chain;
        let config = RegistryConfig::default()
            .with_mode(DocMode::Internal)
            .with_genesis(mismatched);
        assert!(matches!(
            config.validate(DidKind::Chain),
            Err(ConfigError::InvalidGenesis(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.toml");
        std::fs::write(&path, SAMPLE).unwrap();
        let config = RegistryConfig::load_from_file(&path).unwrap();
        assert_eq!(config.name, "relay-root");

        let missing = RegistryConfig::load_from_file(dir.path().join("missing.toml"));
        assert!(matches!(missing, Err(ConfigError::Io { .. })));
    }
}
