use async_trait::async_trait;
use tracing::{debug, info};

/// Out-of-band channel that delivers password reset tokens.
#[async_trait]
pub trait ResetNotifier: Send + Sync {
    async fn send_reset(&self, email: &str, token: &str) -> anyhow::Result<()>;
}

/// Writes the reset token to the log instead of sending mail.
#[derive(Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl ResetNotifier for LogNotifier {
    async fn send_reset(&self, email: &str, token: &str) -> anyhow::Result<()> {
        info!(%email, "password reset token issued");
        debug!(%email, %token, "password reset token");
        Ok(())
    }
}
