use notion_poller_module::config::load_host_config_from_env;
use notion_poller_module::NotionCommentsPlugin;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt().with_target(false).init();

    let descriptor = NotionCommentsPlugin::descriptor();
    info!("{} host v{} starting", descriptor.name, descriptor.version);

    let host_config = load_host_config_from_env();
    let Some(mut control) = NotionCommentsPlugin::start(&host_config)? else {
        info!("nothing to run; exiting");
        return Ok(());
    };

    tokio::signal::ctrl_c().await?;
    info!("shutdown requested; stopping poller");
    tokio::task::spawn_blocking(move || control.stop_and_join()).await?;
    Ok(())
}
