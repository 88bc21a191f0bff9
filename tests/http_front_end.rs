// tests/http_front_end.rs
// Dashboard routes served over a real socket

mod common;

use backtest_dashboard::{router, Dashboard, DashboardConfig};
use common::{Behavior, Hits, MockBackend, XLSX};
use reqwest::multipart::{Form, Part};
use reqwest::{redirect, Client, StatusCode};
use std::time::Duration;

struct Frontend {
    base: String,
    client: Client,
}

impl Frontend {
    async fn start(backend: &MockBackend) -> Self {
        Self::start_with(backend.config()).await
    }

    async fn start_with(config: DashboardConfig) -> Self {
        let dashboard = Dashboard::new(config);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router(dashboard)).await.unwrap();
        });

        Self {
            base: format!("http://{}", addr),
            client: Client::builder()
                .redirect(redirect::Policy::none())
                .build()
                .unwrap(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    async fn page(&self) -> String {
        self.client
            .get(self.url("/"))
            .send()
            .await
            .unwrap()
            .text()
            .await
            .unwrap()
    }

    /// Reloads the page until it contains `needle` or two seconds pass.
    async fn page_eventually(&self, needle: &str) -> String {
        let mut page = String::new();
        for _ in 0..200 {
            page = self.page().await;
            if page.contains(needle) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        page
    }

    async fn upload(&self, slot: &str, name: &str, mime: &str, bytes: Vec<u8>) -> reqwest::Response {
        self.try_upload(slot, name, mime, bytes).await.unwrap()
    }

    async fn try_upload(
        &self,
        slot: &str,
        name: &str,
        mime: &str,
        bytes: Vec<u8>,
    ) -> reqwest::Result<reqwest::Response> {
        let form = Form::new().text("source", "picker").part(
            "file",
            Part::bytes(bytes).file_name(name.to_string()).mime_str(mime).unwrap(),
        );
        self.client
            .post(self.url(&format!("/upload/{}", slot)))
            .multipart(form)
            .send()
            .await
    }
}

fn assert_redirects_home(response: &reqwest::Response) {
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()["location"], "/");
}

#[tokio::test]
async fn test_health_and_initial_page() {
    let backend = MockBackend::start(Behavior::default()).await;
    let frontend = Frontend::start(&backend).await;

    let health = frontend.client.get(frontend.url("/health")).send().await.unwrap();
    assert_eq!(health.text().await.unwrap(), "OK");

    let page = frontend.page().await;
    assert!(page.contains("Backtest Dashboard"));
    assert!(page.contains(r#"action="/backtest""#));
}

#[tokio::test]
async fn test_strategy_form_loads_parameters() {
    let backend = MockBackend::start(Behavior::default()).await;
    let frontend = Frontend::start(&backend).await;

    let response = frontend
        .client
        .post(frontend.url("/strategies/reload"))
        .send()
        .await
        .unwrap();
    assert_redirects_home(&response);

    let response = frontend
        .client
        .post(frontend.url("/strategy"))
        .form(&[("strategy", "rsi_reversal")])
        .send()
        .await
        .unwrap();
    assert_redirects_home(&response);

    let page = frontend.page().await;
    assert!(page.contains(r#"<option value="rsi_reversal" selected>RSI Reversal</option>"#));
    assert!(page.contains(r#"name="param-period""#));
    assert_eq!(Hits::get(&backend.hits().parameters), 2);
}

#[tokio::test]
async fn test_backtest_without_strategy_shows_alert() {
    let backend = MockBackend::start(Behavior::default()).await;
    let frontend = Frontend::start(&backend).await;

    let response = frontend
        .client
        .post(frontend.url("/backtest"))
        .form(&[("start_date", "2024-01-01")])
        .send()
        .await
        .unwrap();
    assert_redirects_home(&response);

    let page = frontend.page().await;
    assert!(page.contains("Please select a strategy"));
    assert!(page.contains(r#"value="2024-01-01""#));
    assert_eq!(Hits::get(&backend.hits().execute), 0);
}

#[tokio::test]
async fn test_export_without_result_redirects_with_alert() {
    let backend = MockBackend::start(Behavior::default()).await;
    let frontend = Frontend::start(&backend).await;

    let response = frontend
        .client
        .post(frontend.url("/export/detailed"))
        .send()
        .await
        .unwrap();
    assert_redirects_home(&response);
    assert!(frontend.page().await.contains("No backtest results to export"));
    assert_eq!(Hits::get(&backend.hits().export), 0);

    let unknown = frontend
        .client
        .post(frontend.url("/export/pdf"))
        .send()
        .await
        .unwrap();
    assert_eq!(unknown.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_backtest_then_download_export() {
    let backend = MockBackend::start(Behavior::default()).await;
    let frontend = Frontend::start(&backend).await;

    frontend
        .client
        .post(frontend.url("/strategies/reload"))
        .send()
        .await
        .unwrap();
    let response = frontend
        .client
        .post(frontend.url("/backtest"))
        .form(&[
            ("data_source", "database"),
            ("stock_source", "database"),
            ("start_date", "2024-01-01"),
            ("end_date", "2024-06-30"),
            ("initial_capital", "1000000"),
            ("param-period", "30"),
        ])
        .send()
        .await
        .unwrap();
    assert_redirects_home(&response);

    // The backend call completes in the background
    let page = frontend.page_eventually("Backtest summary").await;
    assert!(page.contains("60.00%"));
    assert!(page.contains("125,000"));

    let download = frontend
        .client
        .post(frontend.url("/export/detailed"))
        .send()
        .await
        .unwrap();
    assert_eq!(download.status(), StatusCode::OK);
    let disposition = download.headers()["content-disposition"].to_str().unwrap().to_string();
    assert!(disposition.starts_with("attachment; filename=\"backtest_results_"));
    assert_eq!(download.headers()["content-type"], XLSX);
    assert_eq!(download.bytes().await.unwrap().as_ref(), b"PK\x03\x04fake-xlsx");

    let sent = backend.parts().await;
    let parameters = sent
        .iter()
        .find(|p| p.name == "parameters")
        .and_then(|p| p.text.clone())
        .unwrap();
    assert!(parameters.contains(r#""period":"30""#));
}

#[tokio::test]
async fn test_upload_routes() {
    let backend = MockBackend::start(Behavior::default()).await;
    let frontend = Frontend::start(&backend).await;

    let response = frontend.upload("price_file", "prices.csv", "text/csv", vec![1, 2]).await;
    assert_redirects_home(&response);
    let page = frontend.page().await;
    assert!(page.contains("Only Excel files (.xlsx, .xls) are supported"));
    assert!(!page.contains("has-file"));

    let response = frontend.upload("price_file", "prices.xlsx", XLSX, vec![1, 2]).await;
    assert_redirects_home(&response);
    let page = frontend.page_eventually("File uploaded: prices.xlsx").await;
    assert!(page.contains("File uploaded: prices.xlsx"));
    assert!(page.contains("upload-zone has-file"));

    let response = frontend.upload("logo", "prices.xlsx", XLSX, vec![1]).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_upload_progress_visible_after_redirect() {
    let backend = MockBackend::start(Behavior::default()).await;
    let mut config = backend.config();
    config.upload_tick = Duration::from_millis(50);
    let frontend = Frontend::start_with(config).await;

    let response = frontend.upload("stock_file", "stocks.xlsx", XLSX, vec![9; 16]).await;
    assert_redirects_home(&response);

    let page = frontend.page().await;
    assert!(page.contains(r#"class="progress-bar""#));
    assert!(page.contains(r#"http-equiv="refresh""#));

    let page = frontend.page_eventually("File uploaded: stocks.xlsx").await;
    assert!(page.contains("File uploaded: stocks.xlsx"));
    assert!(!page.contains(r#"class="progress-bar""#));
}

#[tokio::test]
async fn test_upload_over_body_limit_reports_size() {
    let backend = MockBackend::start(Behavior::default()).await;
    let frontend = Frontend::start(&backend).await;

    let response = frontend.upload("price_file", "prices.xlsx", XLSX, vec![1, 2]).await;
    assert_redirects_home(&response);
    frontend.page_eventually("File uploaded: prices.xlsx").await;

    // Just over the 60 MiB body limit once multipart framing is added
    let huge = vec![0u8; 60 * 1024 * 1024 + 4096];
    // The server may close the socket before the client finishes writing
    if let Ok(response) = frontend.try_upload("price_file", "huge.xlsx", XLSX, huge).await {
        assert_redirects_home(&response);
    }

    let page = frontend.page_eventually("File size cannot exceed 50MB").await;
    assert!(page.contains("File size cannot exceed 50MB"));
    assert!(page.contains("prices.xlsx"));
    assert!(!page.contains("huge.xlsx"));
}
