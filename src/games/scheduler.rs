use crate::common::traits::RevealScheduler;
use async_trait::async_trait;
use std::time::Duration;

/// Real-time pacing on the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioScheduler;

#[async_trait]
impl RevealScheduler for TokioScheduler {
    async fn delay(&self, duration: Duration) {
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }
}

/// Resumes immediately; reveals and settlement run back to back
#[derive(Debug, Clone, Copy, Default)]
pub struct InstantScheduler;

#[async_trait]
impl RevealScheduler for InstantScheduler {
    async fn delay(&self, _duration: Duration) {}
}
