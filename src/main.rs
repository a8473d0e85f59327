use anyhow::Context;
use dotenv::dotenv;
use log::{LevelFilter, info};
use utah_listings::{DataOutput, ScrapeConfig, get_data_live};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::Builder::new()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init();

    let config = ScrapeConfig::from_env()?;
    let output = get_data_live(&config)
        .await
        .context("scrape run failed")?;

    match output {
        DataOutput::Table(table) => {
            for row in table.rows() {
                println!("{}", serde_json::to_string(row)?);
            }
            info!("{} listings", table.len());
        }
        DataOutput::File(path) => println!("{}", path.display()),
    }
    Ok(())
}
