//! Provider wiring from configuration and environment credentials.

use anyhow::{Context, Result};
use rankscope_browser::{BrowserEngine, BrowserOptions};
use rankscope_core::{AppConfig, AuditBackend};
use rankscope_engine::{AnalysisEngine, EngineConfig};
use rankscope_llm::GeminiProvider;
use rankscope_sources::{
    BrightDataSerpProvider, BrightDataUnlockerProvider, BrowserAuditProvider,
    LlmScoringProvider, PageSpeedProvider, PerformanceAuditProvider,
};
use std::sync::Arc;

pub const BRIGHTDATA_TOKEN_VAR: &str = "RANKSCOPE_BRIGHTDATA_TOKEN";
pub const GEMINI_KEY_VAR: &str = "RANKSCOPE_GEMINI_API_KEY";
pub const PAGESPEED_KEY_VAR: &str = "RANKSCOPE_PAGESPEED_API_KEY";
pub const BROWSER_WS_VAR: &str = "RANKSCOPE_BROWSER_WS";

/// Secrets and endpoints that never live in the config file.
#[derive(Clone, Default)]
pub struct Credentials {
    pub brightdata_token: Option<String>,
    pub gemini_api_key: Option<String>,
    pub pagespeed_api_key: Option<String>,
    pub browser_ws: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("brightdata_token", &self.brightdata_token.as_ref().map(|_| "***"))
            .field("gemini_api_key", &self.gemini_api_key.as_ref().map(|_| "***"))
            .field("pagespeed_api_key", &self.pagespeed_api_key.as_ref().map(|_| "***"))
            .field("browser_ws", &self.browser_ws)
            .finish()
    }
}

impl Credentials {
    /// Read credentials from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read credentials through `lookup`; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        Self {
            brightdata_token: get(BRIGHTDATA_TOKEN_VAR),
            gemini_api_key: get(GEMINI_KEY_VAR),
            pagespeed_api_key: get(PAGESPEED_KEY_VAR),
            browser_ws: get(BROWSER_WS_VAR),
        }
    }

    fn require<'a>(value: Option<&'a String>, var: &str) -> Result<&'a str> {
        value
            .map(String::as_str)
            .with_context(|| format!("{var} is not set"))
    }
}

/// An engine plus the browser it may own.
pub struct Wiring {
    pub engine: AnalysisEngine,
    pub browser: Option<Arc<BrowserEngine>>,
}

/// Build the analysis engine for `config`.
///
/// Search and content go through Bright Data, scoring through Gemini and
/// audits through the configured backend.
pub async fn build_engine(config: &AppConfig, credentials: &Credentials) -> Result<Wiring> {
    let providers = &config.providers;
    let timeout = providers.request_timeout_secs;

    let brightdata_token =
        Credentials::require(credentials.brightdata_token.as_ref(), BRIGHTDATA_TOKEN_VAR)?;
    let gemini_key = Credentials::require(credentials.gemini_api_key.as_ref(), GEMINI_KEY_VAR)?;

    let search = BrightDataSerpProvider::new(
        providers.brightdata_endpoint.as_str(),
        brightdata_token,
        providers.serp_zone.as_str(),
        providers.search_engine_url.as_str(),
        timeout,
    )
    .context("Failed to create search provider")?;
    let content = BrightDataUnlockerProvider::new(
        providers.brightdata_endpoint.as_str(),
        brightdata_token,
        providers.unlocker_zone.as_str(),
        timeout,
    )
    .context("Failed to create content provider")?;

    let llm = GeminiProvider::with_model(gemini_key, providers.gemini_model.as_str())
        .and_then(|p| p.with_timeout(timeout))
        .context("Failed to create Gemini provider")?;
    let scorer = LlmScoringProvider::new(Arc::new(llm), config.scoring.max_content_chars);

    let mut browser = None;
    let audit: Arc<dyn PerformanceAuditProvider> = match providers.audit_backend {
        AuditBackend::PagespeedApi => Arc::new(
            PageSpeedProvider::new(
                providers.pagespeed_endpoint.as_str(),
                credentials.pagespeed_api_key.clone(),
                timeout,
            )
            .context("Failed to create PageSpeed provider")?,
        ),
        AuditBackend::Browser => {
            let options = BrowserOptions {
                ws_endpoint: credentials.browser_ws.clone(),
                ..BrowserOptions::default()
            };
            let engine = Arc::new(
                BrowserEngine::new(options)
                    .await
                    .context("Failed to start browser")?,
            );
            browser = Some(engine.clone());
            Arc::new(BrowserAuditProvider::new(
                engine,
                providers.pagespeed_web_url.as_str(),
            ))
        }
    };

    tracing::debug!(
        backend = ?providers.audit_backend,
        model = %providers.gemini_model,
        "Providers configured"
    );

    Ok(Wiring {
        engine: AnalysisEngine::new(
            audit,
            Arc::new(search),
            Arc::new(content),
            Arc::new(scorer),
            EngineConfig::from_app(config),
        ),
        browser,
    })
}
