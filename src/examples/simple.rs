//! Simple example of using zhima-proxy-pool.

use reqwest_middleware::ClientBuilder;
use std::sync::Arc;
use std::time::Duration;
use zhima_proxy_pool::{FilePersister, ProxyPool, ProxyPoolConfig, ProxyPoolMiddleware, ZhimaProvider};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    println!("Initializing proxy pool...");

    let config = ProxyPoolConfig::builder()
        // JSON output format, one proxy per call
        .api_addr("http://webapi.http.zhimacangku.com/getip?num=1&type=2&pro=&city=0&yys=0&port=1&time=1&ts=1&ys=0&cs=0&lb=1&sb=0&pb=4&mr=1&regions=")
        .active_capacity(3)
        .backup_capacity(5)
        // the plan hands out proxies living 25 minutes at most
        .freshness_threshold(Duration::from_secs(20 * 60))
        .clear_interval(Duration::from_secs(5 * 60))
        .retry_count(2)
        // rate limit for each proxy, lower performance but avoid banned
        .max_requests_per_second(3.0)
        .build();

    let provider = Arc::new(ZhimaProvider::new(config.throttle_backoff));
    let persister = Arc::new(FilePersister::new("active_proxies.json"));
    let pool = ProxyPool::new(config, provider, persister).await?;
    pool.start().await;

    let client = ClientBuilder::new(reqwest::Client::new())
        .with(ProxyPoolMiddleware::new(Arc::clone(&pool)))
        .build();

    println!("Sending request...");
    let response = client.get("https://httpbin.org/ip").send().await?;

    println!("Status: {}", response.status());
    println!("Response: {}", response.text().await?);

    // keep the paid proxies for the next run
    pool.stop().await?;

    Ok(())
}
