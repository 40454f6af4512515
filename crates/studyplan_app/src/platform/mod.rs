mod app;
mod effects;
mod logging;
mod persistence;
mod tickers;

pub use app::run_app;
