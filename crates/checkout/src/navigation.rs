//! Navigation after checkout.

use tokio::sync::watch;

/// Moves the user to another page.
pub trait Navigator {
    /// Navigate to an absolute in-app URL such as `/products`.
    fn navigate_by_url(&self, url: &str);
}

/// Publishes the target URL to whoever watches the channel.
impl Navigator for watch::Sender<String> {
    fn navigate_by_url(&self, url: &str) {
        tracing::debug!(url, "Navigating");
        self.send_replace(url.to_string());
    }
}
