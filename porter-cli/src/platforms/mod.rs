//! Built-in source platforms and the registry that holds them

mod lithium;
mod webwiz;

use serde::Serialize;

use crate::porter::{ExportPlan, PlanOrderError, SourcePrefix};

/// Data a platform is able to export
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Feature {
    Users,
    Passwords,
    Avatars,
    Signatures,
    Ranks,
    Roles,
    Permissions,
    Categories,
    Discussions,
    Tags,
    Comments,
    PrivateMessages,
    SingleSignOn,
}

impl Feature {
    pub fn name(&self) -> &'static str {
        match self {
            Feature::Users => "Users",
            Feature::Passwords => "Passwords",
            Feature::Avatars => "Avatars",
            Feature::Signatures => "Signatures",
            Feature::Ranks => "Ranks",
            Feature::Roles => "Roles",
            Feature::Permissions => "Permissions",
            Feature::Categories => "Categories",
            Feature::Discussions => "Discussions",
            Feature::Tags => "Tags",
            Feature::Comments => "Comments",
            Feature::PrivateMessages => "PrivateMessages",
            Feature::SingleSignOn => "SingleSignOn",
        }
    }
}

impl std::fmt::Display for Feature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Everything needed to export one source platform
#[derive(Debug, Clone, Serialize)]
pub struct PlatformExportSpec {
    /// Id used on the command line
    pub id: &'static str,
    /// Label written into the export header
    pub name: &'static str,
    /// Table prefix used when none is given
    pub default_prefix: &'static str,
    /// Unprefixed table whose character set stands for the whole source
    pub probe_table: &'static str,
    pub features: Vec<Feature>,
    pub plan: ExportPlan,
}

impl PlatformExportSpec {
    /// The default prefix, validated when the registry was built
    pub fn default_prefix(&self) -> SourcePrefix {
        SourcePrefix::new(self.default_prefix).unwrap_or_default()
    }
}

/// Error building the platform registry
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("platform '{0}' is registered twice")]
    DuplicateId(String),
    #[error("platform '{platform}' has an invalid export order: {source}")]
    Order {
        platform: String,
        #[source]
        source: PlanOrderError,
    },
    #[error("platform '{platform}' has an invalid default prefix '{prefix}'")]
    Prefix { platform: String, prefix: String },
}

/// Immutable set of platforms, built once at startup
#[derive(Debug, Clone)]
pub struct PlatformRegistry {
    platforms: Vec<PlatformExportSpec>,
}

impl PlatformRegistry {
    /// Validate and wrap a list of platforms
    pub fn new(platforms: Vec<PlatformExportSpec>) -> Result<Self, RegistryError> {
        for (idx, platform) in platforms.iter().enumerate() {
            if platforms[..idx]
                .iter()
                .any(|p| p.id.eq_ignore_ascii_case(platform.id))
            {
                return Err(RegistryError::DuplicateId(platform.id.to_string()));
            }
            if SourcePrefix::new(platform.default_prefix).is_err() {
                return Err(RegistryError::Prefix {
                    platform: platform.id.to_string(),
                    prefix: platform.default_prefix.to_string(),
                });
            }
            platform
                .plan
                .validate_order()
                .map_err(|source| RegistryError::Order {
                    platform: platform.id.to_string(),
                    source,
                })?;
        }

        log::debug!("Registered {} platforms", platforms.len());
        Ok(PlatformRegistry { platforms })
    }

    /// Every platform shipped with the porter
    pub fn builtin() -> Result<Self, RegistryError> {
        PlatformRegistry::new(vec![webwiz::platform(), lithium::platform()])
    }

    /// Look up a platform by id, ignoring case
    pub fn get(&self, id: &str) -> Option<&PlatformExportSpec> {
        self.platforms
            .iter()
            .find(|p| p.id.eq_ignore_ascii_case(id))
    }

    pub fn iter(&self) -> impl Iterator<Item = &PlatformExportSpec> {
        self.platforms.iter()
    }

    pub fn ids(&self) -> Vec<&'static str> {
        self.platforms.iter().map(|p| p.id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::porter::{DestinationTable, TableExportSpec};

    fn bare(id: &'static str, plan: ExportPlan) -> PlatformExportSpec {
        PlatformExportSpec {
            id,
            name: "Test",
            default_prefix: "",
            probe_table: "t",
            features: vec![Feature::Users],
            plan,
        }
    }

    #[test]
    fn test_builtin_registry() {
        let registry = PlatformRegistry::builtin().unwrap();
        assert_eq!(registry.ids(), vec!["webwiz", "lithium"]);
        assert_eq!(registry.get("WebWiz").unwrap().name, "Web Wiz Forums");
        assert_eq!(registry.get("webwiz").unwrap().default_prefix().as_str(), "tbl");
        assert!(registry.get("phpbb").is_none());
    }

    #[test]
    fn test_rejects_duplicate_ids() {
        let err = PlatformRegistry::new(vec![
            bare("one", ExportPlan::new()),
            bare("ONE", ExportPlan::new()),
        ])
        .unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateId(ref id) if id == "ONE"));
    }

    #[test]
    fn test_rejects_out_of_order_plan() {
        let plan = ExportPlan::new()
            .table(TableExportSpec::passthrough(DestinationTable::Comment, "select 1"))
            .table(TableExportSpec::passthrough(DestinationTable::User, "select 1"));
        let err = PlatformRegistry::new(vec![bare("bad", plan)]).unwrap_err();
        assert!(matches!(err, RegistryError::Order { .. }));
    }

    #[test]
    fn test_rejects_invalid_prefix() {
        let mut platform = bare("bad", ExportPlan::new());
        platform.default_prefix = "tbl; drop";
        assert!(matches!(
            PlatformRegistry::new(vec![platform]).unwrap_err(),
            RegistryError::Prefix { .. }
        ));
    }
}
