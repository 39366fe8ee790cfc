use std::{env, fs::OpenOptions, net::SocketAddr, process::exit, sync::Arc};

use axum::{
    Router,
    extract::{MatchedPath, Request},
    http::{HeaderValue, Method, header},
};
use clap::Parser;
use rusqlite::Connection;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{EnvFilter, Layer, filter, layer::SubscriberExt, util::SubscriberInitExt};

use axum_server::Handle;
use expense_tracker::{AppState, PaginationConfig, build_router, graceful_shutdown};

const MAX_TOKEN_DAYS: i64 = 365;

/// The REST API server for expense_tracker.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to the application SQLite database.
    #[arg(long, env = "DATABASE_PATH")]
    db_path: String,

    /// The port to serve the API from.
    #[arg(short, long, env = "PORT", default_value_t = 5000)]
    port: u16,

    /// The canonical name of the timezone used to decide what "today" is, e.g. "Pacific/Auckland".
    #[arg(long, env = "LOCAL_TIMEZONE", default_value = "Etc/UTC")]
    local_timezone: String,

    /// The origin browsers may call the API from.
    #[arg(long, env = "CORS_ORIGIN", default_value = "http://localhost:3000")]
    cors_origin: String,

    /// The number of days a bearer token is valid for, from 1 to 365.
    #[arg(
        long,
        env = "JWT_EXPIRY_DAYS",
        default_value_t = 7,
        value_parser = clap::value_parser!(i64).range(1..=MAX_TOKEN_DAYS)
    )]
    token_days: i64,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    setup_logging();

    let Ok(jwt_secret) = env::var("JWT_SECRET") else {
        tracing::error!("The environment variable 'JWT_SECRET' must be set");
        exit(1);
    };

    let cors_origin = match args.cors_origin.parse::<HeaderValue>() {
        Ok(cors_origin) => cors_origin,
        Err(error) => {
            tracing::error!("Invalid CORS origin {}: {error}", args.cors_origin);
            exit(1);
        }
    };

    let connection = match Connection::open(&args.db_path) {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("Could not open the database at {}: {error}", args.db_path);
            exit(1);
        }
    };

    let state = match AppState::new(
        connection,
        &jwt_secret,
        &args.local_timezone,
        PaginationConfig::default(),
    ) {
        Ok(state) => state.with_token_duration(time::Duration::days(args.token_days)),
        Err(error) => {
            tracing::error!("Could not start the server: {error}");
            exit(1);
        }
    };

    let handle = Handle::new();
    tokio::spawn(graceful_shutdown(handle.clone()));

    let router = build_router(state)
        .layer(
            CorsLayer::new()
                .allow_origin(cors_origin)
                .allow_credentials(true)
                .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
                .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]),
        );
    let router = add_tracing_layer(router);

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    tracing::info!("HTTP server listening on {}", addr);

    if let Err(error) = axum_server::bind(addr)
        .handle(handle)
        .serve(router.into_make_service())
        .await
    {
        tracing::error!("The server stopped unexpectedly: {error}");
        exit(1);
    }
}

fn setup_logging() {
    let stdout_log = tracing_subscriber::fmt::layer()
        .pretty()
        .with_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")));

    let debug_log = match OpenOptions::new().create(true).append(true).open("debug.log") {
        Ok(log_file) => Some(
            tracing_subscriber::fmt::layer()
                .pretty()
                .with_writer(Arc::new(log_file))
                .with_filter(filter::LevelFilter::DEBUG),
        ),
        Err(error) => {
            eprintln!("Could not open debug.log, logging to stdout only: {error}");
            None
        }
    };

    tracing_subscriber::registry()
        .with(stdout_log)
        .with(debug_log)
        .init();
}

fn add_tracing_layer(router: Router) -> Router {
    let tracing_layer = TraceLayer::new_for_http()
        .make_span_with(|req: &Request| {
            let method = req.method();
            let uri = req.uri();

            let matched_path = req
                .extensions()
                .get::<MatchedPath>()
                .map(|matched_path| matched_path.as_str());

            tracing::debug_span!("request", %method, %uri, matched_path)
        })
        // By default, `TraceLayer` will log 5xx responses but we're doing our specific
        // logging of errors so disable that
        .on_failure(());

    router.layer(tracing_layer)
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use crate::Args;

    #[test]
    fn token_days_defaults_to_a_week() {
        let args = Args::try_parse_from(["server", "--db-path", "test.db"]).unwrap();

        assert_eq!(args.token_days, 7);
    }

    #[test]
    fn token_days_must_be_between_one_and_a_year() {
        for token_days in ["0", "-1", "366", "9223372036854775807"] {
            let result =
                Args::try_parse_from(["server", "--db-path", "test.db", "--token-days", token_days]);

            assert!(result.is_err(), "{token_days} should be rejected");
        }

        let args =
            Args::try_parse_from(["server", "--db-path", "test.db", "--token-days", "365"]).unwrap();
        assert_eq!(args.token_days, 365);
    }
}
