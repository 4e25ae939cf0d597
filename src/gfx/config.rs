//! Configuration of the graphics context.

use anyhow::{Result, bail};
use prism_io::IoConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration parameters for [`Gfx`](crate::gfx::Gfx).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GfxConfig {
    /// The number of slots in the pool of each resource type. Running out of
    /// slots is fatal, so these must cover the peak number of live resources.
    pub resource_pool_sizes: ResourcePoolSizes,
    /// The initial capacity of the resource label stack.
    pub resource_label_stack_capacity: usize,
    /// The initial capacity of the resource registry.
    pub resource_registry_capacity: usize,
    pub io: IoConfig,
}

/// The number of slots in the pool of each graphics resource type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourcePoolSizes {
    pub mesh: usize,
    pub texture: usize,
    pub shader: usize,
    pub pipeline: usize,
    pub pass: usize,
}

impl GfxConfig {
    /// Parses the configuration from the RON file at the given path and
    /// resolves any specified paths.
    pub fn from_ron_file(file_path: impl AsRef<Path>) -> Result<Self> {
        let file_path = file_path.as_ref();
        let mut config: Self = prism_io::parse_ron_file(file_path)?;
        if let Some(root_path) = file_path.parent() {
            config.resolve_paths(root_path);
        }
        Ok(config)
    }

    /// Resolves all paths in the configuration by prepending the given root
    /// path to all relative paths.
    pub fn resolve_paths(&mut self, root_path: &Path) {
        self.io.resolve_paths(root_path);
    }

    /// Checks that the configuration can be used to create a graphics
    /// context.
    pub fn validate(&self) -> Result<()> {
        let sizes = &self.resource_pool_sizes;
        for (name, size) in [
            ("mesh", sizes.mesh),
            ("texture", sizes.texture),
            ("shader", sizes.shader),
            ("pipeline", sizes.pipeline),
            ("pass", sizes.pass),
        ] {
            if size == 0 {
                bail!("Resource pool size for {name} must be positive");
            }
            if size > u32::MAX as usize {
                bail!("Resource pool size for {name} is too large ({size})");
            }
        }
        if self.io.n_lanes == 0 {
            bail!("IO configuration needs at least one lane");
        }
        Ok(())
    }
}

impl Default for GfxConfig {
    fn default() -> Self {
        Self {
            resource_pool_sizes: ResourcePoolSizes::default(),
            resource_label_stack_capacity: 256,
            resource_registry_capacity: 256,
            io: IoConfig::default(),
        }
    }
}

impl Default for ResourcePoolSizes {
    fn default() -> Self {
        Self {
            mesh: 128,
            texture: 128,
            shader: 128,
            pipeline: 128,
            pass: 16,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{fs, path::PathBuf};

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("prism_gfx_config_{name}_{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn default_config_is_valid() {
        let config = GfxConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.resource_pool_sizes.mesh, 128);
        assert_eq!(config.resource_pool_sizes.pass, 16);
        assert_eq!(config.resource_label_stack_capacity, 256);
    }

    #[test]
    fn config_with_empty_pool_is_invalid() {
        let mut config = GfxConfig::default();
        config.resource_pool_sizes.shader = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_ron_file_fills_in_defaults_and_resolves_assigns() {
        let dir = temp_dir("partial");
        let file_path = dir.join("gfx.ron");
        fs::write(
            &file_path,
            r#"(resource_pool_sizes: (mesh: 8), io: (assigns: {"res:": "assets"}))"#,
        )
        .unwrap();

        let config = GfxConfig::from_ron_file(&file_path).unwrap();

        assert_eq!(config.resource_pool_sizes.mesh, 8);
        assert_eq!(config.resource_pool_sizes.texture, 128);
        assert_eq!(config.resource_registry_capacity, 256);
        assert_eq!(config.io.n_lanes, 1);
        assert_eq!(config.io.assigns["res:"], dir.join("assets"));

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn written_config_parses_back_unchanged() {
        let dir = temp_dir("roundtrip");
        let file_path = dir.join("gfx.ron");
        let mut config = GfxConfig::default();
        config.resource_pool_sizes.pipeline = 7;
        config.io.n_lanes = 3;

        prism_io::write_ron_file(&config, &file_path).unwrap();
        assert_eq!(GfxConfig::from_ron_file(&file_path).unwrap(), config);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn malformed_config_file_error_names_file() {
        let dir = temp_dir("malformed");
        let file_path = dir.join("gfx.ron");
        fs::write(&file_path, "(resource_pool_sizes: (mesh: ").unwrap();

        let error = GfxConfig::from_ron_file(&file_path).unwrap_err();
        assert!(format!("{error:#}").contains("Failed to parse"));
        assert!(format!("{error:#}").contains("gfx.ron"));

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn config_written_into_missing_directory_creates_it() {
        let dir = temp_dir("nested");
        let file_path = dir.join("settings").join("gfx.ron");

        prism_io::write_ron_file(&GfxConfig::default(), &file_path).unwrap();
        assert!(file_path.exists());

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn missing_config_file_gives_error() {
        assert!(GfxConfig::from_ron_file("/nonexistent/prism/gfx.ron").is_err());
    }
}
