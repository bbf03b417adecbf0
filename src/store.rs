pub mod dao;
#[cfg(test)]
pub(crate) mod mock;
pub mod models;
pub mod postgres;

pub use dao::TrendStore;
pub use models::TrendingVideo;
pub use postgres::PgTrendStore;
