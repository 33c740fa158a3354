use std::time::Duration;

use r2d2::Pool;

use crate::infrastructure::store::StoreError;

pub type RedisPool = Pool<redis::Client>;

/// Builds a connection pool and opens its first connection.
///
/// Fails if `redis_url` is malformed or the server cannot be reached within
/// `connection_timeout`.
pub fn create_pool(
    redis_url: &str,
    max_size: u32,
    connection_timeout: Duration,
) -> Result<RedisPool, StoreError> {
    let client = redis::Client::open(redis_url)?;
    let pool = Pool::builder()
        .max_size(max_size)
        .connection_timeout(connection_timeout)
        .build(client)?;
    Ok(pool)
}
