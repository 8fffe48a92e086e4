//! Headless rendering fallback for script-built pages
//!
//! A page is re-fetched through a browser when nothing was extracted from its
//! static body and it is either small or looks like a listing page. The
//! browser backend is compiled only with the `render` feature.

use crate::config::RenderConfig;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Errors produced by a [`Renderer`]
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Browser launch failed: {0}")]
    Launch(String),

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("Rendering timed out after {0:?}")]
    Timeout(Duration),

    #[error("Rendering support is not compiled in")]
    Unavailable,
}

/// Produces the DOM of a page after its scripts ran
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Navigates to `url` and returns the serialized DOM
    ///
    /// # Arguments
    ///
    /// * `url` - Page to render
    /// * `nav_timeout` - Upper bound for the navigation itself
    /// * `settle_delay` - Fixed wait after navigation for late scripts
    /// * `selector` - Element waited for, best-effort, before reading the DOM
    async fn render(
        &self,
        url: &Url,
        nav_timeout: Duration,
        settle_delay: Duration,
        selector: Option<&str>,
    ) -> Result<String, RenderError>;

    /// Releases browser resources at the end of a run
    async fn shutdown(&self) {}
}

/// Decides whether a statically fetched page deserves a rendered second look
///
/// # Arguments
///
/// * `url` - The page URL, matched against the listing patterns
/// * `body_len` - Size of the static body in bytes
/// * `accepted` - Identifiers accepted from the static body
/// * `config` - Render settings
pub fn needs_render(url: &Url, body_len: usize, accepted: usize, config: &RenderConfig) -> bool {
    if !config.enabled || accepted > 0 {
        return false;
    }
    if body_len < config.size_threshold {
        return true;
    }
    let path = url.path().to_lowercase();
    config
        .listing_patterns
        .iter()
        .any(|pattern| path.contains(&pattern.to_lowercase()))
}

#[cfg(feature = "render")]
pub use chromium::ChromiumRenderer;

#[cfg(feature = "render")]
mod chromium {
    use super::{RenderError, Renderer};
    use async_trait::async_trait;
    use chromiumoxide::browser::{Browser, BrowserConfig};
    use futures::StreamExt;
    use std::time::Duration;
    use tokio::sync::Mutex;
    use url::Url;

    /// Chromium-backed [`Renderer`]
    ///
    /// The browser is launched on first use and shared by all workers; each
    /// render opens and closes its own tab.
    pub struct ChromiumRenderer {
        user_agent: String,
        browser: Mutex<Option<Browser>>,
    }

    impl ChromiumRenderer {
        pub fn new(user_agent: impl Into<String>) -> Self {
            Self {
                user_agent: user_agent.into(),
                browser: Mutex::new(None),
            }
        }

        async fn launch(&self) -> Result<Browser, RenderError> {
            let config = BrowserConfig::builder()
                .no_sandbox()
                .arg("--disable-gpu")
                .arg(format!("--user-agent={}", self.user_agent))
                .build()
                .map_err(RenderError::Launch)?;

            let (browser, mut handler) = Browser::launch(config)
                .await
                .map_err(|e| RenderError::Launch(e.to_string()))?;

            tokio::spawn(async move {
                while let Some(event) = handler.next().await {
                    if event.is_err() {
                        break;
                    }
                }
            });

            tracing::info!("Headless browser started");
            Ok(browser)
        }

    }

    #[async_trait]
    impl Renderer for ChromiumRenderer {
        async fn render(
            &self,
            url: &Url,
            nav_timeout: Duration,
            settle_delay: Duration,
            selector: Option<&str>,
        ) -> Result<String, RenderError> {
            let page = {
                let mut guard = self.browser.lock().await;
                if guard.is_none() {
                    *guard = Some(self.launch().await?);
                }
                let browser = guard.as_ref().ok_or(RenderError::Unavailable)?;
                browser
                    .new_page("about:blank")
                    .await
                    .map_err(|e| RenderError::Browser(e.to_string()))?
            };

            let navigation = tokio::time::timeout(nav_timeout, page.goto(url.as_str())).await;
            let result = match navigation {
                Err(_) => Err(RenderError::Timeout(nav_timeout)),
                Ok(Err(e)) => Err(RenderError::Navigation {
                    url: url.to_string(),
                    reason: e.to_string(),
                }),
                Ok(Ok(_)) => {
                    tokio::time::sleep(settle_delay).await;
                    if let Some(selector) = selector {
                        let found = tokio::time::timeout(settle_delay, page.find_element(selector)).await;
                        if !matches!(found, Ok(Ok(_))) {
                            tracing::trace!("Selector {:?} not found on {}", selector, url);
                        }
                    }
                    page.content()
                        .await
                        .map_err(|e| RenderError::Browser(e.to_string()))
                }
            };

            if let Err(e) = page.close().await {
                tracing::trace!("Closing tab for {} failed: {}", url, e);
            }
            result
        }

        async fn shutdown(&self) {
            let mut guard = self.browser.lock().await;
            if let Some(mut browser) = guard.take() {
                if let Err(e) = browser.close().await {
                    tracing::debug!("Browser close failed: {}", e);
                }
                let _ = browser.wait().await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_small_empty_page_needs_render() {
        let config = RenderConfig::default();
        assert!(needs_render(&url("https://univ-x.dz/x"), 800, 0, &config));
    }

    #[test]
    fn test_large_listing_page_needs_render() {
        let config = RenderConfig::default();
        assert!(needs_render(&url("https://univ-x.dz/Annuaire"), 50_000, 0, &config));
        assert!(!needs_render(&url("https://univ-x.dz/news"), 50_000, 0, &config));
    }

    #[test]
    fn test_no_render_when_something_was_found_or_disabled() {
        let mut config = RenderConfig::default();
        assert!(!needs_render(&url("https://univ-x.dz/x"), 800, 1, &config));

        config.enabled = false;
        assert!(!needs_render(&url("https://univ-x.dz/x"), 800, 0, &config));
    }
}
