pub mod export;
pub mod platforms;
pub mod show;

pub use export::handle_export_command;
pub use platforms::handle_platforms_command;
pub use show::handle_show_command;

use anyhow::Result;

use crate::platforms::{PlatformExportSpec, PlatformRegistry};

/// Resolve a platform id or fail listing the known ones
pub(crate) fn find_platform<'a>(
    registry: &'a PlatformRegistry,
    id: &str,
) -> Result<&'a PlatformExportSpec> {
    registry.get(id).ok_or_else(|| {
        anyhow::anyhow!(
            "Unknown platform '{}'. Available platforms: {}",
            id,
            registry.ids().join(", ")
        )
    })
}
