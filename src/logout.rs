//! Logout control.

use std::sync::Arc;

use tracing::info;

use crate::auth::SessionProvider;
use crate::error::Result;

/// Ends the session through the session provider. No confirmation step.
#[derive(Clone)]
pub struct LogoutControl {
    session: Arc<dyn SessionProvider>,
}

impl LogoutControl {
    pub fn new(session: Arc<dyn SessionProvider>) -> Self {
        Self { session }
    }

    pub async fn press(&self) -> Result<()> {
        info!("logging out");
        self.session.logout().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::StaticTokenSession;

    #[tokio::test]
    async fn test_press_ends_session() {
        let session = Arc::new(StaticTokenSession::new("token"));
        let control = LogoutControl::new(session.clone());

        control.press().await.unwrap();
        assert!(!session.is_authenticated());
    }
}
