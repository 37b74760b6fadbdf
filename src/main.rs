pub mod client;
pub mod error;
pub mod models;
pub mod session;
pub mod tui;

use client::HttpConfigClient;

fn main() {
    tracing_subscriber::fmt::init();

    // 端点地址：命令行参数 > 环境变量 > 默认值
    let base_url = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("CONFIG_SYNC_URL").ok())
        .unwrap_or_else(|| "http://127.0.0.1:3000".to_string());

    tracing::info!("配置端点: {}/config", base_url.trim_end_matches('/'));

    let client = HttpConfigClient::new(base_url);
    let mut app = tui::App::new(Box::new(client));
    if let Err(e) = app.run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
