//! Servidor web Axum com WebSocket para triagem de informação sensível em tempo real

mod report;

use std::ops::ControlFlow;
use std::path::Path;
use std::sync::Arc;

use askama::Template;
use axum::{
    extract::{
        rejection::JsonRejection,
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::StatusCode,
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use eclipse_core::{
    corpus::demo_texts, process, BatchOutcome, HeuristicTagger, ProcessingMode, ScreenConfig,
    ScreenError, ScreenEvent, ScreenSummary, Screening, SegmentVerdict, VerdictSink,
};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::report::{render_report, IndexTemplate};

const DEFAULT_ADDR: &str = "0.0.0.0:3000";

/// Estado compartilhado da aplicação
struct AppState {
    tagger: HeuristicTagger,
    /// Configuração base; campos da requisição a sobrescrevem
    config: ScreenConfig,
}

impl AppState {
    fn config_for(&self, req: &ScreenRequest) -> Result<ScreenConfig, ScreenError> {
        let mut config = self.config.clone();
        if let Some(delimiter) = &req.delimiter {
            config.delimiter = delimiter.clone();
        }
        if let Some(threshold) = req.threshold {
            config.threshold = threshold;
        }
        if let Some(mode) = req.mode {
            config.mode = mode;
        }
        config.validate()?;
        Ok(config)
    }
}

/// Corpo de `/screen`, `/report` e das mensagens WebSocket
#[derive(Debug, Deserialize)]
struct ScreenRequest {
    text: String,
    #[serde(default)]
    delimiter: Option<String>,
    #[serde(default)]
    threshold: Option<f64>,
    #[serde(default)]
    mode: Option<ProcessingMode>,
    #[serde(default)]
    debug: bool,
}

impl ScreenRequest {
    fn raw(text: &str) -> Self {
        Self {
            text: text.to_string(),
            delimiter: None,
            threshold: None,
            mode: None,
            debug: false,
        }
    }
}

/// Envia os eventos da triagem para a task do WebSocket.
struct EventSink(mpsc::UnboundedSender<ScreenEvent>);

impl VerdictSink for EventSink {
    fn accept(&mut self, verdict: SegmentVerdict) -> ControlFlow<()> {
        match self.0.send(ScreenEvent::SegmentScreened { verdict }) {
            Ok(()) => ControlFlow::Continue(()),
            Err(_) => ControlFlow::Break(()),
        }
    }

    fn finish(&mut self, summary: &ScreenSummary) {
        let _ = self.0.send(ScreenEvent::Done {
            total_segments: summary.total_segments,
            failed_segments: summary.failed_segments,
            processing_ms: summary.processing_ms,
        });
    }
}

fn load_config() -> Result<ScreenConfig, ScreenError> {
    match std::env::var("ECLIPSE_CONFIG") {
        Ok(path) => {
            info!("Carregando configuração de {}", path);
            ScreenConfig::load(Path::new(&path))
        }
        Err(_) => Ok(ScreenConfig::default()),
    }
}

fn app(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(index_handler))
        .route("/screen", post(screen_handler))
        .route("/report", post(report_handler))
        .route("/ws", get(ws_handler))
        .route("/demo-texts", get(demo_texts_handler))
        .layer(cors)
        .with_state(state)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = load_config()?;
    let state = Arc::new(AppState {
        tagger: HeuristicTagger::new(),
        config,
    });

    let addr = std::env::var("ECLIPSE_ADDR").unwrap_or_else(|_| DEFAULT_ADDR.to_string());
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("🚀 Servidor Eclipse iniciado em http://{}", addr);
    axum::serve(listener, app(state)).await?;
    Ok(())
}

fn bad_request(err: impl std::fmt::Display) -> Response {
    warn!("Requisição rejeitada: {}", err);
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({ "error": err.to_string() })),
    )
        .into_response()
}

fn internal_error(message: impl std::fmt::Display) -> Response {
    error!("Falha interna: {}", message);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({ "error": message.to_string() })),
    )
        .into_response()
}

/// Corpo JSON inválido (ex: `mode` desconhecido) e configuração inválida viram 400.
fn screen_request(
    state: &AppState,
    payload: Result<Json<ScreenRequest>, JsonRejection>,
) -> Result<(ScreenRequest, ScreenConfig), Response> {
    let Json(req) = payload.map_err(|rejection| bad_request(rejection.body_text()))?;
    let config = state.config_for(&req).map_err(bad_request)?;
    Ok((req, config))
}

/// Triagem em lote fora do runtime async (o tagger é síncrono)
async fn screen_blocking(
    state: Arc<AppState>,
    config: ScreenConfig,
    text: String,
) -> Result<BatchOutcome, Response> {
    tokio::task::spawn_blocking(move || {
        process(&text, &state.tagger, &config).map(|processed| processed.into_outcome())
    })
    .await
    .map_err(internal_error)?
    .map_err(bad_request)
}

/// Retorna a página principal HTML
async fn index_handler(State(state): State<Arc<AppState>>) -> Response {
    let page = IndexTemplate {
        threshold: format!("{:.2}", state.config.threshold),
    };
    match page.render() {
        Ok(html) => Html(html).into_response(),
        Err(err) => internal_error(err),
    }
}

/// Triagem via HTTP POST: veredictos por segmento e do documento
async fn screen_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ScreenRequest>, JsonRejection>,
) -> Response {
    let (req, config) = match screen_request(&state, payload) {
        Ok(parsed) => parsed,
        Err(response) => return response,
    };

    info!("Triagem HTTP [{:?}]: {} chars", config.mode, req.text.len());
    match screen_blocking(state, config, req.text).await {
        Ok(outcome) => Json(outcome).into_response(),
        Err(response) => response,
    }
}

/// Relatório HTML: linhas sensíveis em vermelho, anotações no modo debug
async fn report_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ScreenRequest>, JsonRejection>,
) -> Response {
    let (req, config) = match screen_request(&state, payload) {
        Ok(parsed) => parsed,
        Err(response) => return response,
    };

    let debug = req.debug;
    let text = req.text;
    let outcome = match screen_blocking(state, config, text.clone()).await {
        Ok(outcome) => outcome,
        Err(response) => return response,
    };

    match render_report(&text, &outcome.segments, Some(&outcome.document), debug) {
        Ok(html) => Html(html).into_response(),
        Err(err) => internal_error(err),
    }
}

/// Retorna textos de demonstração
async fn demo_texts_handler() -> impl IntoResponse {
    let texts: Vec<serde_json::Value> = demo_texts()
        .iter()
        .map(|(title, text)| {
            serde_json::json!({
                "title": title,
                "text": text
            })
        })
        .collect();
    Json(texts)
}

/// Upgrade HTTP → WebSocket
async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_websocket(socket, state))
}

/// Interpreta uma mensagem WebSocket.
///
/// Um objeto JSON com `text` é uma requisição completa e seus campos precisam ser
/// válidos; qualquer outra mensagem é tratada como texto puro.
fn ws_request(state: &AppState, raw: &str) -> Result<(ScreenRequest, ScreenConfig), String> {
    let req = match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(value) if value.get("text").is_some() => {
            serde_json::from_value::<ScreenRequest>(value).map_err(|e| e.to_string())?
        }
        _ => ScreenRequest::raw(raw),
    };
    let config = state.config_for(&req).map_err(|e| e.to_string())?;
    Ok((req, config))
}

/// Roda a triagem linha a linha em uma thread de bloqueio (o tagger é síncrono).
///
/// O receptor entrega um `SegmentScreened` por segmento e, no fim, um `Done`,
/// inclusive para texto vazio. Descartar o receptor interrompe o worker.
fn spawn_screening(
    state: Arc<AppState>,
    config: ScreenConfig,
    text: String,
) -> (JoinHandle<ScreenSummary>, mpsc::UnboundedReceiver<ScreenEvent>) {
    let (tx, rx) = mpsc::unbounded_channel::<ScreenEvent>();
    let worker = tokio::task::spawn_blocking(move || {
        let mut sink = EventSink(tx);
        let screening = match config.mode {
            ProcessingMode::WholeText => Screening::whole_text(&state.tagger, &config, &text),
            ProcessingMode::Batch | ProcessingMode::Stream => {
                Screening::lines(&state.tagger, &config, &text)
            }
        };
        screening.drain_into(&mut sink)
    });
    (worker, rx)
}

/// Lógica do WebSocket: recebe texto e transmite um evento por segmento, à medida
/// que o tagger termina cada um.
async fn handle_websocket(mut socket: WebSocket, state: Arc<AppState>) {
    info!("WebSocket conectado");

    while let Some(Ok(msg)) = socket.recv().await {
        match msg {
            Message::Text(raw) => {
                let (req, config) = match ws_request(&state, raw.as_str()) {
                    Ok(parsed) => parsed,
                    Err(message) => {
                        warn!("Requisição rejeitada no WebSocket: {}", message);
                        let payload = serde_json::json!({
                            "type": "error",
                            "data": { "message": message }
                        });
                        if socket.send(Message::Text(payload.to_string().into())).await.is_err() {
                            return;
                        }
                        continue;
                    }
                };

                info!("Triagem via WebSocket [{:?}]: {} chars", config.mode, req.text.len());
                let (worker, mut rx) = spawn_screening(Arc::clone(&state), config, req.text);

                while let Some(event) = rx.recv().await {
                    let Ok(json) = serde_json::to_string(&event) else {
                        continue;
                    };
                    if socket.send(Message::Text(json.into())).await.is_err() {
                        // cliente desconectou; o worker para no próximo segmento
                        return;
                    }
                }

                match worker.await {
                    Ok(summary) => info!(
                        "WebSocket: {} segmentos ({} falhas) em {} ms",
                        summary.total_segments, summary.failed_segments, summary.processing_ms
                    ),
                    Err(err) => error!("Worker de triagem falhou: {}", err),
                }
            }
            Message::Close(_) => {
                info!("WebSocket desconectado");
                return;
            }
            Message::Ping(payload) => {
                let _ = socket.send(Message::Pong(payload)).await;
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request};
    use eclipse_core::Label;
    use tower::ServiceExt;

    fn test_state() -> Arc<AppState> {
        Arc::new(AppState {
            tagger: HeuristicTagger::new(),
            config: ScreenConfig::default(),
        })
    }

    fn test_app() -> Router {
        app(test_state())
    }

    async fn collect_events(mut rx: mpsc::UnboundedReceiver<ScreenEvent>) -> Vec<ScreenEvent> {
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        events
    }

    fn json_post(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_string(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_screen_batch() {
        let response = test_app()
            .oneshot(json_post(
                "/screen",
                serde_json::json!({ "text": "The sky is blue\nCall 10.0.0.5 now" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let outcome: BatchOutcome = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(outcome.segments.len(), 2);
        assert_eq!(outcome.document.dominant_label, Label::NetworkInformation);
        assert_eq!(outcome.document.processed_text, "Call 10.0.0.5 now");
        assert!(outcome.document.is_high_confidence);
    }

    #[tokio::test]
    async fn test_screen_whole_text_mode() {
        let response = test_app()
            .oneshot(json_post(
                "/screen",
                serde_json::json!({ "text": "a\nb\nc", "mode": "whole_text" }),
            ))
            .await
            .unwrap();
        let outcome: BatchOutcome = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(outcome.segments.len(), 1);
        assert_eq!(outcome.segments[0].processed_text, "a\nb\nc");
    }

    #[tokio::test]
    async fn test_screen_empty_text() {
        let response = test_app()
            .oneshot(json_post("/screen", serde_json::json!({ "text": "  \n " })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let outcome: BatchOutcome = serde_json::from_str(&body_string(response).await).unwrap();
        assert!(outcome.segments.is_empty());
        assert_eq!(outcome.document.dominant_label, Label::Outside);
        assert_eq!(outcome.document.dominant_segment, None);
    }

    #[tokio::test]
    async fn test_screen_invalid_threshold() {
        let response = test_app()
            .oneshot(json_post(
                "/screen",
                serde_json::json!({ "text": "x", "threshold": 1.5 }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_string(response).await.contains("threshold"));
    }

    #[tokio::test]
    async fn test_unknown_mode_is_bad_request() {
        for uri in ["/screen", "/report"] {
            let response = test_app()
                .oneshot(json_post(
                    uri,
                    serde_json::json!({ "text": "x", "mode": "sideways" }),
                ))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");

            let body: serde_json::Value =
                serde_json::from_str(&body_string(response).await).unwrap();
            assert!(body["error"].as_str().unwrap().contains("sideways"), "{uri}");
        }
    }

    #[tokio::test]
    async fn test_non_numeric_threshold_is_bad_request() {
        let response = test_app()
            .oneshot(json_post(
                "/screen",
                serde_json::json!({ "text": "x", "threshold": "alto" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_report_html() {
        let response = test_app()
            .oneshot(json_post(
                "/report",
                serde_json::json!({ "text": "password=hunter22\nbom dia", "debug": true }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let html = body_string(response).await;
        assert!(html.contains("<span style='color: red;'>password=hunter22</span>"));
        assert!(html.contains("Label: SECURITY_CREDENTIALS, Conf.: 0.94"));
        assert!(html.contains("Label: BENIGN, Conf.: 0.60"));
    }

    #[tokio::test]
    async fn test_demo_texts() {
        let response = test_app()
            .oneshot(Request::builder().uri("/demo-texts").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let demos: Vec<serde_json::Value> =
            serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(demos.len(), demo_texts().len());
        assert!(demos[0]["title"].is_string());
    }

    #[tokio::test]
    async fn test_index_page() {
        let response = test_app()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_string(response).await.contains("0.80"));
    }

    #[test]
    fn test_request_overrides_config() {
        let state = AppState {
            tagger: HeuristicTagger::new(),
            config: ScreenConfig::default().with_threshold(0.9),
        };
        let mut req = ScreenRequest::raw("x");
        req.delimiter = Some(";".to_string());
        let config = state.config_for(&req).unwrap();
        assert_eq!(config.delimiter, ";");
        assert_eq!(config.threshold, 0.9);

        req.delimiter = Some(String::new());
        assert!(state.config_for(&req).is_err());
    }

    #[test]
    fn test_ws_message_with_bad_fields_is_rejected() {
        let state = test_state();
        let err = ws_request(&state, r#"{"text":"The sky is blue","mode":"sideways"}"#).unwrap_err();
        assert!(err.contains("sideways"));
        assert!(ws_request(&state, r#"{"text":"x","threshold":2.0}"#).is_err());
    }

    #[test]
    fn test_ws_message_forms() {
        let state = test_state();

        let (req, config) = ws_request(&state, r#"{"text":"a;b","delimiter":";"}"#).unwrap();
        assert_eq!(req.text, "a;b");
        assert_eq!(config.delimiter, ";");

        let (req, _) = ws_request(&state, "Call 10.0.0.5 now").unwrap();
        assert_eq!(req.text, "Call 10.0.0.5 now");

        // JSON sem `text` é texto puro
        let (req, _) = ws_request(&state, r#"{"host":"10.0.0.5"}"#).unwrap();
        assert_eq!(req.text, r#"{"host":"10.0.0.5"}"#);
    }

    #[tokio::test]
    async fn test_streaming_emits_segments_then_done() {
        let text = "Call 10.0.0.5 now\n\nThe sky is blue\npassword=hunter22".to_string();
        let (worker, rx) = spawn_screening(test_state(), ScreenConfig::default(), text);
        let events = collect_events(rx).await;

        assert_eq!(events.len(), 4);
        for (i, event) in events[..3].iter().enumerate() {
            match event {
                ScreenEvent::SegmentScreened { verdict } => assert_eq!(verdict.index, i),
                other => panic!("evento inesperado: {other:?}"),
            }
        }
        assert!(matches!(
            events[3],
            ScreenEvent::Done { total_segments: 3, failed_segments: 0, .. }
        ));

        let summary = worker.await.unwrap();
        assert_eq!(summary.total_segments, 3);
        assert!(!summary.stopped);
    }

    #[tokio::test]
    async fn test_streaming_empty_text_still_sends_done() {
        let (worker, rx) = spawn_screening(test_state(), ScreenConfig::default(), "  \n ".to_string());
        let events = collect_events(rx).await;

        assert_eq!(events.len(), 1);
        assert!(matches!(
            events[0],
            ScreenEvent::Done { total_segments: 0, failed_segments: 0, .. }
        ));
        assert_eq!(worker.await.unwrap().total_segments, 0);
    }

    #[tokio::test]
    async fn test_streaming_whole_text_mode() {
        let config = ScreenConfig::default().with_mode(ProcessingMode::WholeText);
        let (_, rx) = spawn_screening(test_state(), config, "a\nb".to_string());
        let events = collect_events(rx).await;

        assert_eq!(events.len(), 2);
        assert!(matches!(
            &events[0],
            ScreenEvent::SegmentScreened { verdict } if verdict.processed_text == "a\nb"
        ));
    }

    #[test]
    fn test_event_sink_stops_when_receiver_dropped() {
        let (tx, rx) = mpsc::unbounded_channel::<ScreenEvent>();
        drop(rx);
        let mut sink = EventSink(tx);
        let verdict = SegmentVerdict::failed(0, "x", "y");
        assert!(sink.accept(verdict).is_break());
    }
}
