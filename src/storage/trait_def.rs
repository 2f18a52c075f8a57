use anyhow::Result;
use async_trait::async_trait;

/// Durable string key-value persistence (selected view, cached results, token)
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Initialize the storage (create tables, etc.)
    async fn init(&self) -> Result<()>;

    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Insert or overwrite the value stored under `key`
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove `key`, returning whether it existed
    async fn delete(&self, key: &str) -> Result<bool>;
}

pub(crate) fn unix_now() -> i64 {
    chrono::Utc::now().timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unix_now_is_current() {
        let before = chrono::Utc::now().timestamp();
        let now = unix_now();
        assert!(now >= before && now - before < 5);
    }
}
