use async_trait::async_trait;

/// What a notice is asking the recipient to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    /// Activation link after self-service sign-up.
    Activation,
    /// Activation link sent on behalf of an admin-created account.
    Invitation,
    /// Password reset link.
    PasswordReset,
}

/// An outbound notice, fully rendered except for delivery. The engine builds
/// the link (including the token) and hands it off; how it reaches the
/// recipient is the host application's concern.
#[derive(Debug, Clone)]
pub struct Notice {
    pub kind: NoticeKind,
    pub recipient: String,
    pub first_name: String,
    pub url: String,
}

/// Delivery seam implemented by the host application. Notices are dispatched
/// strictly after the transaction that produced them has committed; a
/// delivery failure surfaces to the caller but the state change stands.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notice: Notice) -> anyhow::Result<()>;
}

/// Default notifier that only logs. Useful for development and for hosts
/// that poll state instead of sending email.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, notice: Notice) -> anyhow::Result<()> {
        tracing::info!(
            kind = ?notice.kind,
            recipient = %notice.recipient,
            url = %notice.url,
            "Account notice dispatched"
        );
        Ok(())
    }
}
