// ABOUTME: Init command implementation.
// ABOUTME: Writes a template hotpatch.yml into the project directory.

use hotpatch::config;
use hotpatch::error::Result;
use hotpatch::output::Output;
use std::path::Path;

pub fn init(dir: &Path, force: bool, output: Output) -> Result<()> {
    let path = config::init_config(dir, force)?;
    output.success(&format!("Created {}", path.display()));
    Ok(())
}
