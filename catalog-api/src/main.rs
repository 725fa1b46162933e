use std::sync::Arc;

use catalog_api::config::Config;
use catalog_api::error::AppError;
use catalog_api::infrastructure::database::mysql::{init_mysql, MySqlProductRepository};
use catalog_api::infrastructure::llm::CompletionClient;
use catalog_api::logging::init_logging;
use catalog_api::server::{create_app, AppState};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // 加载环境变量
    dotenvy::dotenv().ok();

    // 加载配置
    let config = Config::load()?;

    // 初始化日志
    init_logging(&config)?;

    tracing::info!("Starting catalog service");

    if config.llm.api_key.is_empty() {
        tracing::warn!("llm.api_key is empty, description generation will fail");
    }

    // 初始化数据库连接
    let db_pool = init_mysql(&config).await?;

    // 创建应用状态
    let app_state = AppState {
        products: Arc::new(MySqlProductRepository::new(db_pool)),
        llm: CompletionClient::new(&config.llm),
    };

    // 创建并启动服务器
    let app = create_app(app_state).await?;
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", &addr);

    axum::serve(listener, app).await?;
    Ok(())
}
