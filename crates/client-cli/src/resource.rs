//! Remote data with its loading and error state

use anyhow::Result;
use std::future::Future;

#[derive(Debug, Clone, PartialEq)]
pub struct Resource<T> {
    pub data: Option<T>,
    pub loading: bool,
    pub error: Option<String>,
}

impl<T> Default for Resource<T> {
    fn default() -> Self {
        Self {
            data: None,
            loading: true,
            error: None,
        }
    }
}

impl<T> Resource<T> {
    pub fn pending() -> Self {
        Self::default()
    }

    /// Settle with the outcome of a fetch
    pub fn finish(&mut self, result: Result<T>) {
        self.loading = false;
        match result {
            Ok(data) => {
                self.data = Some(data);
                self.error = None;
            }
            Err(e) => {
                tracing::debug!("Fetch failed: {:#}", e);
                self.data = None;
                self.error = Some(e.to_string());
            }
        }
    }

    /// Run `fetch` and settle with its result
    pub async fn load<F, Fut>(fetch: F) -> Self
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut resource = Self::pending();
        resource.finish(fetch().await);
        resource
    }

    pub fn into_result(self) -> Result<T> {
        match (self.data, self.error) {
            (Some(data), _) => Ok(data),
            (None, Some(error)) => Err(anyhow::anyhow!(error)),
            (None, None) => Err(anyhow::anyhow!("still loading")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_state() {
        let resource: Resource<u32> = Resource::pending();
        assert!(resource.loading);
        assert!(resource.data.is_none());
        assert_eq!(resource.into_result().unwrap_err().to_string(), "still loading");
    }

    #[tokio::test]
    async fn test_load_success() {
        let resource = Resource::load(|| async { Ok(vec![1, 2]) }).await;
        assert!(!resource.loading);
        assert_eq!(resource.error, None);
        assert_eq!(resource.into_result().unwrap(), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_load_failure_keeps_message() {
        let resource: Resource<u32> =
            Resource::load(|| async { Err(anyhow::anyhow!("Admin access required")) }).await;
        assert!(!resource.loading);
        assert_eq!(resource.error.as_deref(), Some("Admin access required"));
        assert!(resource.into_result().is_err());
    }

    #[test]
    fn test_refetch_clears_error() {
        let mut resource: Resource<&str> = Resource::pending();
        resource.finish(Err(anyhow::anyhow!("offline")));
        resource.finish(Ok("back"));
        assert_eq!(resource.error, None);
        assert_eq!(resource.data, Some("back"));
    }
}
