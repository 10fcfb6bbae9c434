//! Tarot relay - turns three-card tarot spreads into LLM readings
//!
//! Two stateless endpoints validate a spread, render fixed prompts from it and make a single call
//! to a text generation API:
//!
//! - `POST /concise-interpretation` returns a short core reading
//! - `POST /detailed-advice` expands a concise reading (passed back by the caller) into advice

use axum::Router;
use axum::routing::{MethodRouter, post};
use axum_prometheus::{
    GenericMetricLayer, Handle, PrometheusMetricLayerBuilder,
    metrics_exporter_prometheus::PrometheusHandle,
};
use std::borrow::Cow;
use std::sync::Arc;
use tracing::{info, instrument};

pub mod client;
pub mod errors;
pub mod generator;
pub mod handlers;
pub mod models;
pub mod prompts;
pub mod settings;

use client::HyperClient;
use generator::{MessagesClient, TextGenerator};
use handlers::{concise_interpretation, detailed_advice, method_not_allowed};
use settings::Settings;

pub const CONCISE_PATH: &str = "/concise-interpretation";
pub const DETAILED_PATH: &str = "/detailed-advice";

/// Paths the browser client posts to when deployed as Netlify functions.
pub const NETLIFY_CONCISE_PATH: &str = "/.netlify/functions/getConciseInterpretation";
pub const NETLIFY_DETAILED_PATH: &str = "/.netlify/functions/getDetailedAdvice";

/// The application state: the text generator and the settings resolved at start-up
#[derive(Clone, Debug)]
pub struct AppState<G: TextGenerator> {
    pub generator: G,
    pub settings: Arc<Settings>,
}

impl AppState<MessagesClient<HyperClient>> {
    /// Create a new AppState talking to the configured API over hyper
    pub fn new(settings: Settings) -> anyhow::Result<Self> {
        let http_client =
            client::create_hyper_client(settings.pool_idle_timeout, settings.pool_max_idle_per_host);
        let generator = MessagesClient::from_settings(http_client, &settings)?;
        Ok(Self::with_generator(settings, generator))
    }
}

impl<G: TextGenerator> AppState<G> {
    /// Create a new AppState with a custom generator (useful for testing)
    pub fn with_generator(settings: Settings, generator: G) -> Self {
        Self {
            generator,
            settings: Arc::new(settings),
        }
    }
}

fn concise_route<G: TextGenerator + Clone + 'static>() -> MethodRouter<AppState<G>> {
    post(concise_interpretation::<G>).fallback(method_not_allowed)
}

fn detailed_route<G: TextGenerator + Clone + 'static>() -> MethodRouter<AppState<G>> {
    post(detailed_advice::<G>).fallback(method_not_allowed)
}

/// Build the main router
///
/// Both readings are mounted at their own paths and at the Netlify function paths; any method
/// other than POST on those paths gets a JSON 405.
#[instrument(skip(state))]
pub fn build_router<G: TextGenerator + Clone + 'static>(state: AppState<G>) -> Router {
    info!("Building router");
    Router::new()
        .route(CONCISE_PATH, concise_route::<G>())
        .route(NETLIFY_CONCISE_PATH, concise_route::<G>())
        .route(DETAILED_PATH, detailed_route::<G>())
        .route(NETLIFY_DETAILED_PATH, detailed_route::<G>())
        .with_state(state)
}

/// Builds a router for the metrics endpoint.
#[instrument(skip(handle))]
pub fn build_metrics_router(handle: PrometheusHandle) -> Router {
    info!("Building metrics router");
    Router::new().route(
        "/metrics",
        axum::routing::get(move || async move { handle.render() }),
    )
}

type MetricsLayerAndHandle = (
    GenericMetricLayer<'static, PrometheusHandle, Handle>,
    PrometheusHandle,
);

/// Builds a layer and handle for prometheus metrics collection.
///
/// Installs a global recorder, so call it once per process.
pub fn build_metrics_layer_and_handle(
    prefix: impl Into<Cow<'static, str>>,
) -> MetricsLayerAndHandle {
    info!("Building metrics layer");
    PrometheusMetricLayerBuilder::new()
        .with_prefix(prefix)
        .enable_response_body_size(true)
        .with_endpoint_label_type(axum_prometheus::EndpointLabel::Exact)
        .with_default_metrics()
        .build_pair()
}
