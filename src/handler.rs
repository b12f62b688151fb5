// HTTP handler bindings for the arena endpoints
//
// Thin wrappers that bind Rocket routes to the Bot's methods. Handlers
// deserialize the snapshot, fetch the Bot from managed state, delegate and
// serialize the response.

use arena_snake::bot::Bot;
use arena_snake::types::{Move, Snapshot};
use log::warn;
use rocket::http::Status;
use rocket::serde::json::{Error as JsonError, Json};
use serde_json::{json, Value};

/// GET / endpoint
/// Returns bot metadata
#[get("/")]
pub fn index(bot: &rocket::State<Bot>) -> Json<Value> {
    Json(bot.info())
}

/// POST /start endpoint
#[post("/start", format = "json", data = "<start_req>")]
pub fn start(bot: &rocket::State<Bot>, start_req: Json<Snapshot>) -> Status {
    bot.start(&start_req);

    Status::Ok
}

/// POST /move endpoint
/// Called each turn to compute and return the next move. A snapshot that
/// cannot be decoded is answered with a shield.
#[post("/move", format = "json", data = "<move_req>")]
pub async fn get_move(
    bot: &rocket::State<Bot>,
    move_req: Result<Json<Snapshot>, JsonError<'_>>,
) -> Json<Value> {
    match move_req {
        Ok(snapshot) => Json(bot.get_move(&snapshot).await),
        Err(e) => {
            warn!("Undecodable snapshot, answering shield: {:?}", e);
            Json(json!({ "move": Move::Shield.code(), "action": Move::Shield.as_str() }))
        }
    }
}

/// POST /end endpoint
#[post("/end", format = "json", data = "<end_req>")]
pub fn end(bot: &rocket::State<Bot>, end_req: Json<Snapshot>) -> Status {
    bot.end(&end_req);

    Status::Ok
}
