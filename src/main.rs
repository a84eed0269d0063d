use anyhow::bail;
use clap::Parser;
use log::info;

use warehouse_loader::conf::Config;
use warehouse_loader::core::{CliArgs, setup_logging};
use warehouse_loader::discovery::ObjectStoreLocator;
use warehouse_loader::service::{LoadService, RunOptions};
use warehouse_loader::warehouse::RedshiftWarehouse;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    setup_logging();
    let args = CliArgs::parse();
    info!(args = args; "Warehouse loader started.");

    let config = Config::load(args.config.as_deref())?;
    let options = RunOptions::from_args(&args, &config);

    let locator = ObjectStoreLocator::new(&config.source, config.tables.clone())?;
    let driver = RedshiftWarehouse::connect(&config.warehouse).await?;

    let mut service = LoadService::new(config, locator, driver);
    let summary = service.run(&options).await;

    if summary.has_failures() {
        bail!(
            "{} of {} tables failed to load",
            summary.failures(),
            summary.reports.len()
        );
    }
    Ok(())
}
