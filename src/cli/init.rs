use std::path::Path;

use anyhow::Context as _;
use helpdesk::{Directory, storage::directory::METADATA_DIR};
use tracing::instrument;

use super::terminal::Colorize;

#[derive(Debug, clap::Parser)]
pub struct Command {}

impl Command {
    #[instrument]
    pub fn run(self, root: &Path) -> anyhow::Result<()> {
        Directory::init(root.to_path_buf())
            .with_context(|| format!("failed to initialise help desk at {}", root.display()))?;

        println!(
            "{}",
            format!("Initialised help desk in {}", root.display()).success()
        );
        println!("  Created: {METADATA_DIR}/config.toml");
        println!("  Created: {METADATA_DIR}/data.json");
        println!();
        println!("Next steps:");
        println!(
            "  hd user add supervisor --name \"Sara\" --email sara@comunicarlos.com.ar --password-hash <hash>"
        );
        Ok(())
    }
}
