use clap::Parser;
use invoice_dispatch::ingest::read_path;
use invoice_dispatch::models::{Channel, ChannelSet};
use invoice_dispatch::service::reporter::write_csv;
use invoice_dispatch::{AppConfig, InvoicePipeline};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::fmt::time::ChronoLocal;

/// 从本地表格批量生成并发送发票
#[derive(Debug, Parser)]
#[command(name = "invoice-batch", version, about)]
struct Args {
    /// 表格文件 (.csv / .xlsx / .xls / .ods)
    file: PathBuf,

    /// 投递渠道，逗号分隔，默认取配置 pipeline.default_channels
    #[arg(long, value_delimiter = ',')]
    channels: Option<Vec<Channel>>,

    /// 结果 CSV 输出路径，缺省输出到 stdout
    #[arg(long)]
    report: Option<PathBuf>,

    /// 配置文件路径
    #[arg(long)]
    config: Option<PathBuf>,

    /// 仅校验，不渲染也不发送
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S".to_string()))
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .init();

    let config = AppConfig::load(args.config.as_deref())?;
    let rows = read_path(&args.file)?;
    info!("Loaded {} rows from {}", rows.len(), args.file.display());

    let pipeline = InvoicePipeline::from_config(&config)?;

    if args.dry_run {
        let normalized = pipeline.normalizer().normalize_all(&rows);
        let mut invalid = 0;
        for failure in normalized.iter().filter_map(|r| r.as_ref().err()) {
            invalid += 1;
            println!("{}", failure);
        }
        println!("{} rows, {} valid, {} invalid", rows.len(), rows.len() - invalid, invalid);
        return Ok(());
    }

    let channels: ChannelSet = match args.channels {
        Some(list) => list.into_iter().collect(),
        None => pipeline.default_channels(),
    };
    let configured = pipeline.configured_channels();
    if let Some(missing) = channels.iter().find(|c| !configured.contains(*c)) {
        return Err(format!("{} channel is not configured", missing).into());
    }

    let summary = pipeline.run(&rows, None, Some(channels)).await;

    match &args.report {
        Some(path) => {
            write_csv(&summary, std::fs::File::create(path)?)?;
            info!("Report written to {}", path.display());
        }
        None => write_csv(&summary, std::io::stdout().lock())?,
    }

    eprintln!("sent: {}, failed: {}", summary.sent_count, summary.failed_count);
    Ok(())
}
