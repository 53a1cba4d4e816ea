//! Config initialization command

use std::path::Path;

use anyhow::{bail, Result};
use groundwork_terrain::SplatConfig;

pub fn run(path: &str, force: bool) -> Result<()> {
    let path = Path::new(path);
    if path.exists() && !force {
        bail!("'{}' already exists (use --force to overwrite)", path.display());
    }

    let mut template = SplatConfig::default_template();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
        template.base_dir = parent.to_path_buf();
    }
    std::fs::write(path, template.to_toml_string()?)?;

    println!("Created {}", path.display());
    println!(
        "Place masks for {} under {}",
        template.layer_set().names().join(", "),
        template.mask_base().display()
    );
    Ok(())
}
