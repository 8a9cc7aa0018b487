use rankscope_browser::{parse_lighthouse_text, BrowserEngine, BrowserOptions};
use rankscope_core::{Category, Device};

const ANALYSIS_URL: &str = "https://pagespeed.web.dev/analysis";

#[tokio::test]
#[ignore] // Requires Chrome/Chromium installed
async fn test_browser_engine_creation() {
    let engine = BrowserEngine::new(BrowserOptions::default()).await;
    assert!(engine.is_ok(), "Failed to create browser engine");
    engine.unwrap().close().await.unwrap();
}

#[tokio::test]
#[ignore] // Requires Chrome/Chromium installed and network access
async fn test_mobile_report() {
    let engine = BrowserEngine::new(BrowserOptions::default()).await.unwrap();

    let text = engine
        .lighthouse_report_text(ANALYSIS_URL, "https://example.com", Device::Mobile)
        .await
        .unwrap();
    let scores = parse_lighthouse_text(&text).unwrap();
    assert!(scores.categories.contains_key(&Category::Performance));

    engine.close().await.unwrap();
}

#[tokio::test]
#[ignore] // Requires Chrome/Chromium installed and network access
async fn test_desktop_report() {
    let engine = BrowserEngine::new(BrowserOptions::default()).await.unwrap();

    let text = engine
        .lighthouse_report_text(ANALYSIS_URL, "https://example.com", Device::Desktop)
        .await
        .unwrap();
    assert!(parse_lighthouse_text(&text).is_ok());

    engine.close().await.unwrap();
}
