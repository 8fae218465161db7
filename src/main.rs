mod bot;
mod format;
mod model;
mod rest;
mod streaming;
mod trader;

use simplelog::{Config, LevelFilter, SimpleLogger};

#[tokio::main]
async fn main() {
    SimpleLogger::init(LevelFilter::Info, Config::default()).expect("logger init failed");
    bot::start_bot().await;
}
