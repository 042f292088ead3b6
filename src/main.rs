use invoice_dispatch::{api, AppConfig, InvoicePipeline};
use std::sync::Arc;
use tower::ServiceBuilder;
use tracing::info;
use tracing_subscriber::fmt::time::ChronoLocal;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 初始化日志 - 本地时间格式
    tracing_subscriber::fmt()
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S".to_string()))
        .with_target(true)
        .with_level(true)
        .init();

    // 加载配置
    let config = AppConfig::load(None)?;
    info!("Starting server with config: {:?}", config);

    // 装配渲染器与发送器
    let pipeline = Arc::new(InvoicePipeline::from_config(&config)?);

    let app = api::router(pipeline, config.server.upload_limit_bytes).layer(ServiceBuilder::new());

    // 启动服务器
    let addr = config.bind_addr();
    info!("Server listening on {}", addr);
    info!("API Endpoints:");
    info!("  POST /upload-excel    - parse spreadsheet into invoice rows");
    info!("  POST /send-invoices   - render and deliver invoices");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
