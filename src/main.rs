use log::error;
use yatube::config::Config;

#[rocket::main]
async fn main() {
    let config = Config::from_env().expect("Failed to load configuration");
    let rocket = yatube::rocket(config).expect("Failed to create database pool");
    if let Err(e) = rocket.launch().await {
        error!("server stopped: {}", e);
    }
}
