//! Engine options

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{MapError, MapResult};
use crate::schema::DbField;
use crate::transpiler::Dialect;

/// How the expression compiler treats comparisons against nullable columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NullSemantics {
    /// `== null` is `IS NULL`, `!= value` is a plain `<>`.
    #[default]
    TwoValued,
    /// `!= value` also matches NULL rows and `== value` excludes them.
    ThreeValued,
}

/// Which column is read back as the generated key of an insert or merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyReturnPolicy {
    Primary,
    Identity,
    #[default]
    PrimaryOrElseIdentity,
    IdentityOrElsePrimary,
}

impl KeyReturnPolicy {
    /// Pick the key column from a table's column set.
    pub fn resolve<'a>(&self, fields: &'a [DbField]) -> Option<&'a DbField> {
        let primary = || fields.iter().find(|f| f.is_primary());
        let identity = || fields.iter().find(|f| f.is_identity());
        match self {
            KeyReturnPolicy::Primary => primary(),
            KeyReturnPolicy::Identity => identity(),
            KeyReturnPolicy::PrimaryOrElseIdentity => primary().or_else(identity),
            KeyReturnPolicy::IdentityOrElsePrimary => identity().or_else(primary),
        }
    }
}

/// How enum values reach the database when a property declares no
/// conversion of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnumRepr {
    /// Variant name as text.
    #[default]
    Name,
    /// Underlying discriminant.
    Number,
}

/// Options handed to the expression and operation compilers.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineOptions {
    /// Target dialect for emitted statements
    pub dialect: Dialect,

    pub null_semantics: NullSemantics,

    pub key_return: KeyReturnPolicy,

    pub enum_repr: EnumRepr,

    /// Maximum number of cached plans. `None` keeps every plan.
    pub plan_cache_capacity: Option<usize>,

    /// Cache table schemas after the first fetch
    pub schema_cache: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            dialect: Dialect::SqlServer,
            null_semantics: NullSemantics::TwoValued,
            key_return: KeyReturnPolicy::PrimaryOrElseIdentity,
            enum_repr: EnumRepr::Name,
            plan_cache_capacity: None,
            schema_cache: true,
        }
    }
}

impl EngineOptions {
    /// Create a new options builder
    pub fn builder() -> EngineOptionsBuilder {
        EngineOptionsBuilder::default()
    }

    /// Parse options from TOML text. Missing keys keep their defaults.
    pub fn from_toml_str(text: &str) -> MapResult<Self> {
        let options: EngineOptions =
            toml::from_str(text).map_err(|e| MapError::Config(e.to_string()))?;
        options.validate()?;
        Ok(options)
    }

    /// Read options from a TOML file.
    pub fn from_path(path: impl AsRef<Path>) -> MapResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| MapError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&text)
    }

    /// Location of the per-user options file, if the platform has one.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("qail-map").join("options.toml"))
    }

    /// Load the per-user options file, falling back to defaults when it
    /// does not exist.
    pub fn load_default() -> MapResult<Self> {
        match Self::default_path() {
            Some(path) if path.exists() => {
                tracing::debug!("Loading engine options from {}", path.display());
                Self::from_path(path)
            }
            _ => Ok(Self::default()),
        }
    }

    fn validate(&self) -> MapResult<()> {
        if self.plan_cache_capacity == Some(0) {
            return Err(MapError::Config(
                "plan_cache_capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for EngineOptions
#[derive(Debug, Default)]
pub struct EngineOptionsBuilder {
    options: EngineOptions,
}

impl EngineOptionsBuilder {
    pub fn dialect(mut self, dialect: Dialect) -> Self {
        self.options.dialect = dialect;
        self
    }

    pub fn null_semantics(mut self, semantics: NullSemantics) -> Self {
        self.options.null_semantics = semantics;
        self
    }

    pub fn key_return(mut self, policy: KeyReturnPolicy) -> Self {
        self.options.key_return = policy;
        self
    }

    pub fn enum_repr(mut self, repr: EnumRepr) -> Self {
        self.options.enum_repr = repr;
        self
    }

    /// Bound the plan cache to `capacity` entries (least recently used evicted).
    pub fn plan_cache_capacity(mut self, capacity: usize) -> Self {
        self.options.plan_cache_capacity = Some(capacity);
        self
    }

    pub fn schema_cache(mut self, enabled: bool) -> Self {
        self.options.schema_cache = enabled;
        self
    }

    /// Build the options
    pub fn build(self) -> MapResult<EngineOptions> {
        self.options.validate()?;
        Ok(self.options)
    }
}
