use async_trait::async_trait;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use talent_onboarding::accounts::{Notification, Notifier, NotifierError};
use tracing::{debug, info};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Notifier that hands outbound mail to the log stream instead of an SMTP relay.
#[derive(Debug, Default, Clone)]
pub(crate) struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, notification: Notification) -> Result<(), NotifierError> {
        let template = notification.template();
        match &notification {
            Notification::VerificationCode {
                email,
                code,
                expires_at,
            } => {
                info!(template, recipient = %email, %expires_at, "notification queued");
                debug!(recipient = %email, code = %code, "verification code");
            }
            Notification::Welcome { email, full_name } => {
                info!(template, recipient = %email, full_name = %full_name, "notification queued");
            }
            Notification::Contact(form) => {
                info!(
                    template,
                    sender = %form.email,
                    event_type = form.event_type.as_deref().unwrap_or("unspecified"),
                    "notification queued"
                );
            }
        }
        Ok(())
    }
}
