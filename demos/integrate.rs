use agroview::{Mediator, MediatorConfig, MediatorError, ViewCache};

#[tokio::main]
async fn main() -> Result<(), MediatorError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = MediatorConfig::from_env()?;
    let cache = ViewCache::new(config.cache_ttl());
    let mediator = Mediator::builder().config(config).cache(cache).build()?;

    let view = mediator.global_view().await?;
    if view.region_fallback {
        eprintln!("Station directory unavailable: climate rows are keyed by station");
    }
    match view.to_json() {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to render the view: {}", e),
    }

    Ok(())
}
