use crate::error::{BrowserError, Result};
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::Page;
use futures::stream::StreamExt;
use rankscope_core::Device;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

const POLL_INTERVAL: Duration = Duration::from_millis(500);
const REPORT_SELECTOR: &str = ".lh-report";
const DESKTOP_TAB_SELECTOR: &str = "#desktop_tab";

/// How to obtain a browser.
#[derive(Debug, Clone)]
pub struct BrowserOptions {
    /// DevTools websocket of a remote scraping browser; launches a local Chromium when `None`
    pub ws_endpoint: Option<String>,
    /// Maximum wait for the Lighthouse report to render
    pub report_timeout: Duration,
    /// Maximum wait for the desktop tab to swap the report
    pub tab_switch_timeout: Duration,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            ws_endpoint: None,
            report_timeout: Duration::from_secs(60),
            tab_switch_timeout: Duration::from_secs(20),
        }
    }
}

/// Browser automation engine
pub struct BrowserEngine {
    browser: Browser,
    handler: JoinHandle<()>,
    options: BrowserOptions,
}

impl BrowserEngine {
    /// Launch a local headless Chromium or connect to `options.ws_endpoint`.
    pub async fn new(options: BrowserOptions) -> Result<Self> {
        let (browser, mut handler) = match &options.ws_endpoint {
            Some(endpoint) => {
                tracing::debug!("Connecting to remote browser");
                Browser::connect(endpoint.clone()).await?
            }
            None => {
                let config = BrowserConfig::builder()
                    .no_sandbox()
                    .build()
                    .map_err(BrowserError::Cdp)?;
                tracing::debug!("Launching local Chromium");
                Browser::launch(config).await?
            }
        };

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::trace!("browser handler event error: {}", e);
                }
            }
        });

        Ok(Self {
            browser,
            handler,
            options,
        })
    }

    /// Load the PageSpeed Insights report for `target_url` and return the page text.
    ///
    /// The report opens on the mobile tab; for [`Device::Desktop`] the desktop tab
    /// is clicked and the text is read once the report has been replaced.
    pub async fn lighthouse_report_text(
        &self,
        analysis_url: &str,
        target_url: &str,
        device: Device,
    ) -> Result<String> {
        let page_url = url::Url::parse_with_params(analysis_url, &[("url", target_url)])
            .map_err(|e| BrowserError::Navigation(format!("invalid analysis URL: {e}")))?;

        tracing::debug!(url = %target_url, device = %device, "Opening PageSpeed Insights");
        let page = self.browser.new_page(page_url.as_str()).await?;
        let outcome = self.read_report(&page, device).await;

        if let Err(e) = page.close().await {
            tracing::debug!("failed to close page: {}", e);
        }
        outcome
    }

    async fn read_report(&self, page: &Page, device: Device) -> Result<String> {
        wait_for_selector(page, REPORT_SELECTOR, self.options.report_timeout).await?;
        let mobile_text = report_text(page).await?;

        if device == Device::Mobile {
            return body_text(page).await;
        }

        let tab = wait_for_selector(page, DESKTOP_TAB_SELECTOR, self.options.tab_switch_timeout)
            .await?;
        tab.scroll_into_view().await?;
        tab.click().await?;

        let deadline = Instant::now() + self.options.tab_switch_timeout;
        loop {
            if report_text(page).await? != mobile_text {
                return body_text(page).await;
            }
            if Instant::now() >= deadline {
                return Err(BrowserError::Timeout(
                    "desktop report did not replace the mobile report".to_string(),
                ));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    /// Close the browser and stop the event handler.
    pub async fn close(mut self) -> Result<()> {
        let result = self.browser.close().await;
        self.handler.abort();
        result.map(|_| ()).map_err(BrowserError::from)
    }
}

async fn wait_for_selector(
    page: &Page,
    selector: &str,
    timeout: Duration,
) -> Result<chromiumoxide::element::Element> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Ok(element) = page.find_element(selector).await {
            return Ok(element);
        }
        if Instant::now() >= deadline {
            return Err(BrowserError::MissingElement(format!(
                "{selector} after {}s",
                timeout.as_secs()
            )));
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

async fn report_text(page: &Page) -> Result<String> {
    element_text(page, REPORT_SELECTOR).await
}

async fn body_text(page: &Page) -> Result<String> {
    element_text(page, "body").await
}

async fn element_text(page: &Page, selector: &str) -> Result<String> {
    let element = page
        .find_element(selector)
        .await
        .map_err(|_| BrowserError::MissingElement(selector.to_string()))?;
    Ok(element.inner_text().await?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = BrowserOptions::default();
        assert!(options.ws_endpoint.is_none());
        assert_eq!(options.report_timeout, Duration::from_secs(60));
        assert!(options.tab_switch_timeout < options.report_timeout);
    }
}
