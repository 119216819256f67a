//! Host capabilities the core depends on but does not own: notification
//! permission, the install prompt, and push-key handling.

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationPermission {
    Default,
    Granted,
    Denied,
}

#[async_trait]
pub trait NotificationPermissionRequester: Send + Sync {
    fn is_supported(&self) -> bool;
    fn current(&self) -> NotificationPermission;
    /// Ask the host; only called when the answer is not settled yet.
    async fn request(&self) -> NotificationPermission;
}

/// Resolve the notification permission, asking the host only when needed.
pub async fn request_notification_permission(
    host: &dyn NotificationPermissionRequester,
) -> NotificationPermission {
    if !host.is_supported() {
        return NotificationPermission::Denied;
    }
    match host.current() {
        NotificationPermission::Granted => NotificationPermission::Granted,
        NotificationPermission::Denied => NotificationPermission::Denied,
        NotificationPermission::Default => host.request().await,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallOutcome {
    Accepted,
    Dismissed,
}

#[async_trait]
pub trait InstallPrompter: Send + Sync {
    /// Whether the host offered a deferred install prompt.
    fn has_deferred_prompt(&self) -> bool;
    async fn prompt(&self) -> InstallOutcome;
    /// Forget the deferred prompt; it can only be used once.
    fn clear(&self);
}

pub fn can_install(host: &dyn InstallPrompter) -> bool {
    host.has_deferred_prompt()
}

/// Show the install prompt if one is available. Returns true when accepted.
pub async fn install_app(host: &dyn InstallPrompter) -> bool {
    if !host.has_deferred_prompt() {
        return false;
    }
    match host.prompt().await {
        InstallOutcome::Accepted => {
            host.clear();
            true
        }
        InstallOutcome::Dismissed => false,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PushKeyError {
    #[error("push key is not URL-safe base64")]
    Encoding,
    #[error("push key decodes to {0} bytes, expected 65")]
    Length(usize),
}

/// Length of an uncompressed P-256 public key.
const VAPID_KEY_LEN: usize = 65;

/// Decode a VAPID application server key (URL-safe base64, padding optional).
pub fn decode_push_key(key: &str) -> Result<Vec<u8>, PushKeyError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(key.trim().trim_end_matches('='))
        .map_err(|_| PushKeyError::Encoding)?;
    if bytes.len() != VAPID_KEY_LEN {
        return Err(PushKeyError::Length(bytes.len()));
    }
    Ok(bytes)
}

/// Server-side permission: push is possible only with a valid VAPID key.
pub struct PushKeyPermissions {
    key: Option<Vec<u8>>,
}

impl PushKeyPermissions {
    pub fn new(key: Option<Vec<u8>>) -> Self {
        PushKeyPermissions { key }
    }
}

#[async_trait]
impl NotificationPermissionRequester for PushKeyPermissions {
    fn is_supported(&self) -> bool {
        self.key.is_some()
    }

    fn current(&self) -> NotificationPermission {
        if self.key.is_some() {
            NotificationPermission::Granted
        } else {
            NotificationPermission::Denied
        }
    }

    async fn request(&self) -> NotificationPermission {
        self.current()
    }
}

/// A headless process is never offered an install prompt.
pub struct NoInstallPrompt;

#[async_trait]
impl InstallPrompter for NoInstallPrompt {
    fn has_deferred_prompt(&self) -> bool {
        false
    }

    async fn prompt(&self) -> InstallOutcome {
        InstallOutcome::Dismissed
    }

    fn clear(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct FakeHost {
        supported: bool,
        current: NotificationPermission,
        answer: NotificationPermission,
        asked: AtomicUsize,
    }

    #[async_trait]
    impl NotificationPermissionRequester for FakeHost {
        fn is_supported(&self) -> bool {
            self.supported
        }
        fn current(&self) -> NotificationPermission {
            self.current
        }
        async fn request(&self) -> NotificationPermission {
            self.asked.fetch_add(1, Ordering::SeqCst);
            self.answer
        }
    }

    fn host(supported: bool, current: NotificationPermission) -> FakeHost {
        FakeHost {
            supported,
            current,
            answer: NotificationPermission::Granted,
            asked: AtomicUsize::new(0),
        }
    }

    #[tokio::test]
    async fn test_permission_asks_only_when_undecided() {
        let unsupported = host(false, NotificationPermission::Default);
        assert_eq!(
            request_notification_permission(&unsupported).await,
            NotificationPermission::Denied
        );

        let granted = host(true, NotificationPermission::Granted);
        assert_eq!(
            request_notification_permission(&granted).await,
            NotificationPermission::Granted
        );

        let denied = host(true, NotificationPermission::Denied);
        assert_eq!(
            request_notification_permission(&denied).await,
            NotificationPermission::Denied
        );

        let undecided = host(true, NotificationPermission::Default);
        assert_eq!(
            request_notification_permission(&undecided).await,
            NotificationPermission::Granted
        );

        let asked: usize = [&unsupported, &granted, &denied, &undecided]
            .iter()
            .map(|h| h.asked.load(Ordering::SeqCst))
            .sum();
        assert_eq!(asked, 1);
    }

    struct FakePrompt {
        deferred: Mutex<bool>,
        outcome: InstallOutcome,
    }

    #[async_trait]
    impl InstallPrompter for FakePrompt {
        fn has_deferred_prompt(&self) -> bool {
            *self.deferred.lock().unwrap()
        }
        async fn prompt(&self) -> InstallOutcome {
            self.outcome
        }
        fn clear(&self) {
            *self.deferred.lock().unwrap() = false;
        }
    }

    #[tokio::test]
    async fn test_install_flow() {
        assert!(!install_app(&NoInstallPrompt).await);

        let dismissed = FakePrompt {
            deferred: Mutex::new(true),
            outcome: InstallOutcome::Dismissed,
        };
        assert!(!install_app(&dismissed).await);
        assert!(can_install(&dismissed));

        let accepted = FakePrompt {
            deferred: Mutex::new(true),
            outcome: InstallOutcome::Accepted,
        };
        assert!(install_app(&accepted).await);
        assert!(!can_install(&accepted));
    }

    #[test]
    fn test_decode_push_key() {
        let raw = [4u8; 65];
        let encoded = URL_SAFE_NO_PAD.encode(raw);
        assert_eq!(decode_push_key(&encoded).unwrap(), raw.to_vec());
        assert_eq!(decode_push_key(&format!("{}=", encoded)).unwrap().len(), 65);
        assert_eq!(decode_push_key("AAAA"), Err(PushKeyError::Length(3)));
        assert_eq!(decode_push_key("not base64!"), Err(PushKeyError::Encoding));
    }

    #[tokio::test]
    async fn test_push_key_permissions() {
        let without = PushKeyPermissions::new(None);
        assert_eq!(
            request_notification_permission(&without).await,
            NotificationPermission::Denied
        );
        let with = PushKeyPermissions::new(Some(vec![4; 65]));
        assert_eq!(
            request_notification_permission(&with).await,
            NotificationPermission::Granted
        );
    }
}
