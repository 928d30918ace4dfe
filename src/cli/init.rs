use std::io::Write;
use std::path::Path;

use anyhow::Result;
use getappt_core::Config;

/// Write the default configuration, refusing to overwrite an existing file.
pub fn run<W: Write>(path: Option<&Path>, out: &mut W) -> Result<()> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => Config::default_path()?,
    };

    Config::default().save_new(&path)?;
    writeln!(out, "Wrote default configuration to '{}'", path.display())?;
    writeln!(out, "Set exchange.users and exchange.server_url before running.")?;
    Ok(())
}
