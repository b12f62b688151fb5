#[macro_use]
extern crate rocket;

use arena_snake::bot::Bot;
use arena_snake::config::Config;
use arena_snake::debug_logger::DebugLogger;
use log::info;
use rocket::fairing::AdHoc;
use std::env;

mod handler;

#[launch]
async fn rocket() -> _ {
    // Hosting services usually pass the port in `PORT`; Rocket reads `ROCKET_PORT`.
    if let Ok(port) = env::var("PORT") {
        env::set_var("ROCKET_PORT", &port);
    }

    // Default to 'info' unless `RUST_LOG` says otherwise.
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }

    env_logger::init();

    info!("Starting arena snake server...");

    // Load configuration once at startup
    let config = Config::load_or_default();
    let debug_logger = DebugLogger::new(config.debug.enabled, &config.debug.log_file_path).await;
    let bot = Bot::with_debug_logger(config, debug_logger);

    rocket::build()
        .manage(bot)
        .attach(AdHoc::on_response("Server ID Middleware", |_, res| {
            Box::pin(async move {
                res.set_raw_header("Server", "arena-snake");
            })
        }))
        .mount(
            "/",
            routes![handler::index, handler::start, handler::get_move, handler::end],
        )
}
