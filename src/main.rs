use std::io::Write;

use anyhow::{Context, Result};

use trendsense::dashboard::Dashboard;
use trendsense::{Catalog, Config, Registry};

fn main() -> Result<()> {
    env_logger::init();

    let config = Config::load().context("loading configuration")?;
    log::info!(
        "data dir {}, web port {}",
        config.data_dir.display(),
        config.port
    );

    let registry = Registry::new(Catalog::trendsense(), config);
    let snapshot = registry.reload().context("loading datasets")?;
    let dashboard = Dashboard::build(&snapshot, &registry.config().views)
        .context("building dashboard views")?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    serde_json::to_writer_pretty(&mut out, &dashboard).context("writing dashboard JSON")?;
    writeln!(out)?;
    Ok(())
}
