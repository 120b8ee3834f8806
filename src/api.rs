use log::warn;
use regex::Regex;
use serde_json::json;
use std::convert::Infallible;
use std::sync::Arc;
use warp::http::StatusCode;
use warp::reply::Response;
use warp::{Filter, Rejection, Reply};

use crate::ckpool::status::read_pool_status;
use crate::ckpool::users::read_user_file;
use crate::ckpool::ReadError;
use crate::config::PoolPaths;
use crate::database::HashrateHistory;

pub type SharedHistory = Arc<dyn HashrateHistory>;

lazy_static::lazy_static! {
    // P2PKH/P2SH, bech32 and taproot addresses
    static ref USERNAME_RE: Regex = Regex::new(
        r"^[13][a-km-zA-HJ-NP-Z1-9]{25,34}$|^(bc1)[a-zA-HJ-NP-Z0-9]{39,59}$|^(bc1p)[a-zA-HJ-NP-Z0-9]{58}$"
    ).unwrap();
}

pub fn is_valid_username(username: &str) -> bool {
    USERNAME_RE.is_match(username)
}

/// All read-only routes, with CORS open to any origin.
pub fn routes(
    history: SharedHistory,
    paths: Arc<PoolPaths>,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let pool = warp::path!("api" / "v1" / "pool")
        .and(warp::get())
        .and(with_paths(paths.clone()))
        .and_then(get_pool_status);

    let pool_hashrates = warp::path!("api" / "v1" / "pool" / "hashrates")
        .and(warp::get())
        .and(with_history(history.clone()))
        .and_then(get_pool_hashrates);

    let user = warp::path!("api" / "v1" / "users" / String)
        .and(warp::get())
        .and(with_paths(paths))
        .and_then(get_user);

    let user_hashrates = warp::path!("api" / "v1" / "users" / String / "hashrates")
        .and(warp::get())
        .and(with_history(history.clone()))
        .and_then(get_user_hashrates);

    let worker_hashrates = warp::path!("api" / "v1" / "users" / String / "workers" / String / "hashrates")
        .and(warp::get())
        .and(with_history(history))
        .and_then(get_worker_hashrates);

    let metrics = warp::path!("metrics").and(warp::get()).and_then(get_metrics);

    let cors = warp::cors()
        .allow_any_origin()
        .allow_methods(vec!["GET"])
        .allow_headers(vec!["X-Requested-With", "Content-Type", "Authorization"]);

    pool.or(pool_hashrates)
        .or(user)
        .or(user_hashrates)
        .or(worker_hashrates)
        .or(metrics)
        .recover(handle_rejection)
        .with(cors)
        .with(warp::log("ckpool_stats::api"))
}

fn with_history(history: SharedHistory) -> impl Filter<Extract = (SharedHistory,), Error = Infallible> + Clone {
    warp::any().map(move || history.clone())
}

fn with_paths(paths: Arc<PoolPaths>) -> impl Filter<Extract = (Arc<PoolPaths>,), Error = Infallible> + Clone {
    warp::any().map(move || paths.clone())
}

fn error_reply(status: StatusCode, message: &str) -> Response {
    warp::reply::with_status(warp::reply::json(&json!({ "error": message })), status).into_response()
}

async fn get_pool_status(paths: Arc<PoolPaths>) -> Result<Response, Infallible> {
    Ok(match read_pool_status(&paths.pool_status).await {
        Ok(Some(status)) => warp::reply::json(&status).into_response(),
        Ok(None) => error_reply(StatusCode::NOT_FOUND, "Pool status not available"),
        Err(e @ ReadError::Parse { .. }) => {
            warn!("Error merging pool status data: {}", e);
            error_reply(StatusCode::INTERNAL_SERVER_ERROR, "Error merging pool status data")
        }
        Err(e) => {
            warn!("Error opening pool.status: {}", e);
            error_reply(StatusCode::INTERNAL_SERVER_ERROR, "Error opening pool.status file")
        }
    })
}

async fn get_pool_hashrates(history: SharedHistory) -> Result<Response, Infallible> {
    Ok(match history.pool_hashrates().await {
        Ok(rows) => warp::reply::json(&rows).into_response(),
        Err(e) => {
            warn!("Error fetching pool hashrates: {:#}", e);
            error_reply(StatusCode::INTERNAL_SERVER_ERROR, "Error fetching pool hashrates")
        }
    })
}

async fn get_user(username: String, paths: Arc<PoolPaths>) -> Result<Response, Infallible> {
    if !is_valid_username(&username) {
        return Ok(error_reply(StatusCode::BAD_REQUEST, "Invalid username format"));
    }

    Ok(match read_user_file(&paths.users_dir, &username).await {
        Ok(user) => warp::reply::json(&user).into_response(),
        Err(ReadError::NotFound(_)) => error_reply(StatusCode::NOT_FOUND, "User not found"),
        Err(e @ ReadError::Io { .. }) => {
            warn!("Error reading user file {}: {}", username, e);
            error_reply(StatusCode::INTERNAL_SERVER_ERROR, "Error reading user file")
        }
        Err(e @ ReadError::Parse { .. }) => {
            warn!("Error parsing user file {}: {}", username, e);
            error_reply(StatusCode::INTERNAL_SERVER_ERROR, "Error parsing user file")
        }
    })
}

async fn get_user_hashrates(username: String, history: SharedHistory) -> Result<Response, Infallible> {
    Ok(match history.user_hashrates(&username).await {
        Ok(rows) => warp::reply::json(&rows).into_response(),
        Err(e) => {
            warn!("Error fetching hashrates for {}: {:#}", username, e);
            error_reply(StatusCode::INTERNAL_SERVER_ERROR, "Error fetching hashrates")
        }
    })
}

async fn get_worker_hashrates(
    username: String,
    workername: String,
    history: SharedHistory,
) -> Result<Response, Infallible> {
    Ok(match history.worker_hashrates(&username, &workername).await {
        Ok(rows) => warp::reply::json(&rows).into_response(),
        Err(e) => {
            warn!("Error fetching hashrates for worker {} of {}: {:#}", workername, username, e);
            error_reply(StatusCode::INTERNAL_SERVER_ERROR, "Error fetching worker hashrates")
        }
    })
}

async fn get_metrics() -> Result<Response, Infallible> {
    Ok(match crate::metrics::render() {
        Ok(text) => text.into_response(),
        Err(e) => {
            warn!("Error encoding metrics: {:#}", e);
            error_reply(StatusCode::INTERNAL_SERVER_ERROR, "Error encoding metrics")
        }
    })
}

async fn handle_rejection(rejection: Rejection) -> Result<Response, Infallible> {
    if rejection.is_not_found() {
        Ok(error_reply(StatusCode::NOT_FOUND, "Not found"))
    } else if rejection.find::<warp::reject::MethodNotAllowed>().is_some() {
        Ok(error_reply(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed"))
    } else {
        warn!("Unhandled rejection: {:?}", rejection);
        Ok(error_reply(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error"))
    }
}
