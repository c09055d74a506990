//! ZoneMap 主程序入口
//! 加载配置与区域，在无界面绘图面上回放会话脚本（默认回放内置演示）

mod config;
mod demo;
mod script;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::FmtSubscriber;

use config::AppConfig;
use zonemap_core::validator::GeometryValidator;
use zonemap_session::{Reconciler, RecordingSurface, SessionContext};
use zonemap_sync::{HttpRepository, MemoryRepository, ZoneRepository};

#[derive(Parser, Debug)]
#[command(name = "zonemap")]
#[command(about = "Draw, validate and sync non-overlapping map zones")]
#[command(version)]
struct Cli {
    /// 配置文件（JSON）
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// 会话脚本（JSON），缺省时回放内置演示
    #[arg(short, long)]
    script: Option<PathBuf>,

    /// 远端区域服务地址，覆盖配置文件
    #[arg(long)]
    remote: Option<String>,

    /// 远端认证令牌
    #[arg(long, env = "ZONEMAP_TOKEN", hide_env_values = true)]
    token: Option<String>,
}

fn repository(config: &AppConfig) -> Result<Arc<dyn ZoneRepository>> {
    match &config.remote {
        Some(remote) => {
            let mut repo = HttpRepository::new(remote.base_url.clone(), remote.timeout())
                .context("failed to build HTTP client")?;
            if let Some(token) = &remote.token {
                repo = repo.with_token(token.clone());
            }
            info!("Using remote zone store at {}", repo.base_url());
            Ok(Arc::new(repo))
        }
        None => {
            info!("Using in-memory zone store with demo zones");
            Ok(Arc::new(MemoryRepository::with_records(demo::seed_records())))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = AppConfig::load(cli.config.as_deref())?;
    config.apply_overrides(cli.remote, cli.token);

    // 初始化日志
    tracing::subscriber::set_global_default(
        FmtSubscriber::builder()
            .with_max_level(config.log_level())
            .finish(),
    )?;

    info!("Starting ZoneMap...");
    let center = config.map.center();
    info!(
        "Map centered at ({}, {}), zoom {}",
        center.x, center.y, config.map.zoom
    );

    let context = SessionContext::new(
        RecordingSurface::new(),
        GeometryValidator::new(config.validation.policy),
    );
    let mut reconciler = Reconciler::new(context, repository(&config)?);
    reconciler.load().await.context("failed to load zones")?;

    let steps = match &cli.script {
        Some(path) => script::load(path)?,
        None => demo::steps(),
    };
    let summary = script::replay(&mut reconciler, &steps).await?;
    reconciler.settle().await;

    info!(
        "Replayed {} steps, {} rejected",
        summary.steps, summary.rejected
    );
    for zone in reconciler.store().iter() {
        info!(
            "Zone \"{}\" {} id={} vertices={} sync={:?}",
            zone.label(),
            zone.color(),
            zone.persisted_id
                .as_ref()
                .map_or("-", |id| id.as_str()),
            zone.ring.len(),
            zone.sync
        );
    }
    if let Some(notice) = reconciler.notice() {
        info!("Last notice: {}", notice);
    }

    Ok(())
}
