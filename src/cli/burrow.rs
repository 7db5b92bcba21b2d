use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use crate::{
    api::price_source::PriceSource,
    cli::esios::EsiosArgs,
    core::ranking::HourRanking,
    prelude::*,
    store::{DeviceStore, FileDeviceStore},
    tables::{build_plan_table, build_prices_table},
};

#[derive(Parser)]
pub struct BurrowArgs {
    #[command(subcommand)]
    command: BurrowCommand,
}

impl BurrowArgs {
    pub async fn run(self) -> Result {
        match self.command {
            BurrowCommand::Prices(args) => args.run().await,
            BurrowCommand::Plan(args) => args.run().await,
        }
    }
}

#[derive(Subcommand)]
pub enum BurrowCommand {
    /// Fetch and rank the prices of a day.
    Prices(BurrowPricesArgs),

    /// Show when every device would be on during a day.
    Plan(BurrowPlanArgs),
}

#[derive(Parser)]
pub struct BurrowPricesArgs {
    /// Local date, today by default.
    #[clap(long)]
    date: Option<NaiveDate>,

    #[clap(flatten)]
    esios: EsiosArgs,
}

impl BurrowPricesArgs {
    async fn run(self) -> Result {
        let date = self.date.unwrap_or_else(|| self.esios.today());
        let points = self.esios.try_new_api()?.fetch(date).await?;
        let ranking = HourRanking::rank(&points);
        info!(%date, ?ranking, "ranked");
        println!("{}", build_prices_table(&points, &ranking));
        Ok(())
    }
}

#[derive(Parser)]
pub struct BurrowPlanArgs {
    /// Local date, today by default.
    #[clap(long)]
    date: Option<NaiveDate>,

    #[clap(long = "devices", env = "DEVICES_PATH", default_value = "devices.toml")]
    devices_path: PathBuf,

    #[clap(flatten)]
    esios: EsiosArgs,
}

impl BurrowPlanArgs {
    async fn run(self) -> Result {
        let date = self.date.unwrap_or_else(|| self.esios.today());
        let entries = FileDeviceStore::new(self.devices_path).load().await?;
        let points = self.esios.try_new_api()?.fetch(date).await?;
        let ranking = HourRanking::rank(&points);
        println!("{}", build_plan_table(date, &ranking, &entries));
        Ok(())
    }
}
