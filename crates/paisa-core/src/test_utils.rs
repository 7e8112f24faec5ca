//! Test utilities for paisa-core
//!
//! A mock classifier server that speaks both the Ollama `/api/generate`
//! protocol and the `{prompt}` endpoint protocol, plus misbehaving routes
//! for fallback tests.

use std::net::SocketAddr;
use std::time::Duration;

use axum::{
    extract::Json,
    http::StatusCode,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

/// Mock classifier server for testing and development
///
/// Routes:
/// - `GET /api/tags`, `POST /api/generate`: Ollama
/// - `POST /classify`, `POST /insight`: prompt endpoint
/// - `POST /garbage`: 200 with a non-JSON body
/// - `POST /broken`: 500
/// - `POST /slow`: valid classification after two seconds
pub struct MockClassifierServer {
    addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockClassifierServer {
    /// Start the mock server on an available port
    pub async fn start() -> Self {
        let app = Router::new()
            .route("/api/tags", get(handle_tags))
            .route("/api/generate", post(handle_generate))
            .route("/classify", post(handle_classify))
            .route("/insight", post(handle_insight))
            .route("/garbage", post(handle_garbage))
            .route("/broken", post(handle_broken))
            .route("/slow", post(handle_slow));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock server");
        let addr = listener.local_addr().expect("mock server address");

        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        tokio::spawn(async move {
            let _ = axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await;
        });

        Self {
            addr,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Get the base URL for this mock server
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for MockClassifierServer {
    fn drop(&mut self) {
        self.stop();
    }
}

#[derive(Debug, Serialize)]
struct TagsResponse {
    models: Vec<ModelInfo>,
}

#[derive(Debug, Serialize)]
struct ModelInfo {
    name: String,
}

#[derive(Debug, Deserialize)]
struct GenerateRequest {
    model: String,
    prompt: String,
}

#[derive(Debug, Serialize)]
struct GenerateResponse {
    model: String,
    response: String,
    done: bool,
}

#[derive(Debug, Deserialize)]
struct PromptRequest {
    prompt: String,
}

#[derive(Debug, Serialize)]
struct ClassifyResponse {
    amount: Option<f64>,
    category: String,
}

#[derive(Debug, Deserialize)]
struct InsightRequest {
    #[allow(dead_code)]
    prompt: String,
    budget: f64,
    spent: f64,
    prediction: String,
}

#[derive(Debug, Serialize)]
struct InsightResponse {
    reply: String,
}

async fn handle_tags() -> Json<TagsResponse> {
    Json(TagsResponse {
        models: vec![ModelInfo {
            name: "llama3.2:latest".to_string(),
        }],
    })
}

async fn handle_generate(Json(request): Json<GenerateRequest>) -> Json<GenerateResponse> {
    // Insight prompts carry an "Outlook:" line (spending_insight.md)
    let response = if let Some(outlook) = line_after(&request.prompt, "Outlook: ") {
        format!("{}. Cut back on your largest category.", outlook)
    } else {
        let classification = classify_mock(&request.prompt);
        // Wrapped in prose the way small models answer
        format!(
            "Here is the classification:\n{}",
            serde_json::json!({
                "amount": classification.amount,
                "category": classification.category,
            })
        )
    };

    Json(GenerateResponse {
        model: request.model,
        response,
        done: true,
    })
}

async fn handle_classify(Json(request): Json<PromptRequest>) -> Json<ClassifyResponse> {
    Json(classify_mock(&request.prompt))
}

async fn handle_insight(Json(request): Json<InsightRequest>) -> Json<InsightResponse> {
    Json(InsightResponse {
        reply: format!(
            "{}: {:.0} of {:.0} spent.",
            request.prediction, request.spent, request.budget
        ),
    })
}

async fn handle_garbage() -> &'static str {
    "Probably food, not sure"
}

async fn handle_broken() -> (StatusCode, &'static str) {
    (StatusCode::INTERNAL_SERVER_ERROR, "upstream exploded")
}

async fn handle_slow(Json(request): Json<PromptRequest>) -> Json<ClassifyResponse> {
    tokio::time::sleep(Duration::from_secs(2)).await;
    Json(classify_mock(&request.prompt))
}

/// Classify the `Expense: "..."` line of a classify_expense prompt
fn classify_mock(prompt: &str) -> ClassifyResponse {
    let text = expense_text(prompt).to_lowercase();

    let category = if ["pvr", "movie", "netflix", "cinema"]
        .iter()
        .any(|k| text.contains(k))
    {
        "Entertainment"
    } else if ["pharmacy", "clinic", "chemist"].iter().any(|k| text.contains(k)) {
        "Health"
    } else if text.contains("dominos") {
        "food"
    } else {
        "Other"
    };

    let amount = text
        .split(|c: char| !(c.is_ascii_digit() || c == '.'))
        .find_map(|tok| tok.trim_matches('.').parse::<f64>().ok());

    ClassifyResponse {
        amount,
        category: category.to_string(),
    }
}

fn expense_text(prompt: &str) -> &str {
    const MARKER: &str = "Expense: \"";
    match prompt.rfind(MARKER) {
        Some(start) => {
            let rest = &prompt[start + MARKER.len()..];
            rest.find('"').map(|end| &rest[..end]).unwrap_or(rest)
        }
        None => prompt,
    }
}

fn line_after<'a>(prompt: &'a str, prefix: &str) -> Option<&'a str> {
    prompt
        .lines()
        .find_map(|line| line.trim().strip_prefix(prefix))
        .map(str::trim)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expense_text() {
        let prompt = "Examples:\n\"Paid Rs 450 to Dominos\"\n\nExpense: \"rs 50 at pvr\"\n\nReturn";
        assert_eq!(expense_text(prompt), "rs 50 at pvr");
    }

    #[test]
    fn test_examples_do_not_leak_into_classification() {
        // The prompt's few-shot examples mention Dominos and PVR
        let prompt = "\"Paid Rs 450 to Dominos\" \"INR 699 spent at PVR\"\nExpense: \"random text\"";
        let c = classify_mock(prompt);
        assert_eq!(c.category, "Other");
        assert_eq!(c.amount, None);
    }

    #[tokio::test]
    async fn test_server_starts_and_stops() {
        let mut server = MockClassifierServer::start().await;
        assert!(server.url().starts_with("http://127.0.0.1:"));
        server.stop();
    }
}
