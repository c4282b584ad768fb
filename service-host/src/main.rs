use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info};

use common::config::{AppConfig, DEFAULT_CONFIG_PATH};
use common::configs::LogConfig;
use common::validation::{DirectorySchemaProvider, SchemaProvider, StaticSchemaProvider};
use service_host::{controllers, ServiceHost};

#[derive(Parser, Debug)]
#[command(author, version, about = "Service host with registry self-registration")]
struct Args {
    /// 配置文件路径，缺省时读取默认路径（允许不存在，仅用环境变量）
    #[arg(short, long)]
    config: Option<String>,

    /// Directory of additional `*.schema.json` documents
    #[arg(short, long)]
    schemas: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();

    // 加载配置
    let raw = AppConfig::load_raw(args.config.as_deref())?;

    // 初始化日志
    common::logging::init_from_config(&LogConfig::from_raw(&raw))?;
    info!(
        "Loaded configuration from {}",
        args.config.as_deref().unwrap_or(DEFAULT_CONFIG_PATH)
    );

    let schemas: Box<dyn SchemaProvider> = match args.schemas {
        Some(dir) => Box::new(DirectorySchemaProvider::new(dir)),
        None => Box::new(StaticSchemaProvider::new()),
    };

    let host = match ServiceHost::from_value(raw, schemas.as_ref(), &controllers::manifest()) {
        Ok(host) => host,
        Err(e) => {
            error!("Refusing to start: {}", e);
            return Err(e.into());
        }
    };

    let service = host.start().await?;
    info!(
        "{} ready on {}",
        service.config().current().name,
        service.local_addr()
    );

    common::service::shutdown_signal().await;
    service.shutdown().await?;
    info!("Service stopped");

    Ok(())
}
