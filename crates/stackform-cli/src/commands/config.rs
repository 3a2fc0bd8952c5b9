//! `stackform init` and `stackform validate`.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use stackform_core::TopologyConfig;
use tracing::info;

pub const CONFIG_FILE: &str = "stackform.toml";

pub fn init(path: &str, name: &str) -> Result<()> {
    let output = write_scaffold(Path::new(path), name)?;
    println!("✓ Generated {}", output.display());
    Ok(())
}

/// Write a scaffold config into `dir`. Refuses to overwrite an existing one.
fn write_scaffold(dir: &Path, name: &str) -> Result<PathBuf> {
    let output = dir.join(CONFIG_FILE);
    if output.exists() {
        bail!("{} already exists", output.display());
    }
    let config = TopologyConfig::scaffold(name);
    std::fs::write(&output, config.to_toml_string()?)
        .with_context(|| format!("writing {}", output.display()))?;
    info!(path = %output.display(), stack = name, "scaffold written");
    Ok(output)
}

pub fn validate(path: &str) -> Result<()> {
    let config = load(Path::new(path))?;
    println!(
        "✓ {} is valid ({} zones, region {})",
        path,
        config.network.availability_zones.len(),
        config.provider.region
    );
    Ok(())
}

/// Parse and validate a config file.
pub fn load(path: &Path) -> Result<TopologyConfig> {
    let config = TopologyConfig::from_file(path)
        .with_context(|| format!("reading {}", path.display()))?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_init_writes_valid_config() {
        let dir = tempfile::tempdir().unwrap();
        let output = write_scaffold(dir.path(), "demo").unwrap();

        let config = load(&output).unwrap();
        assert_eq!(config.stack.name, "demo");
        assert_eq!(config.network.availability_zones.len(), 3);
    }

    #[test]
    fn test_init_refuses_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILE), "# keep me\n").unwrap();

        assert!(write_scaffold(dir.path(), "demo").is_err());
        let content = fs::read_to_string(dir.path().join(CONFIG_FILE)).unwrap();
        assert_eq!(content, "# keep me\n");
    }

    #[test]
    fn test_load_rejects_invalid_zone() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = TopologyConfig::scaffold("demo");
        config.network.availability_zones = vec!["eu-west-1a".to_string()];
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, config.to_toml_string().unwrap()).unwrap();

        let err = load(&path).unwrap_err();
        assert!(err.to_string().contains("network.availability_zones[0]"));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load(&dir.path().join(CONFIG_FILE)).is_err());
    }
}
