use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::{Form, Json, Router};
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use crate::api::{Backend, HttpBackend};
use crate::config::Settings;
use crate::dashboard::{Dashboard, PROFILE_INCOMPLETE};
use crate::html;
use crate::panel::run_panel;
use crate::panels::PanelKind;
use crate::store::{validate_required, ProfileStore};
use crate::types::UserProfile;
use crate::view::{HtmlSlot, PanelView};

/// Shown above the form when a submitted profile is rejected
pub const INVALID_INPUT: &str = "Invalid input values. Please check your entries.";

/// Application state shared across requests
pub struct AppState<B: Backend> {
    pub store: ProfileStore,
    pub backend: Arc<B>,
}

/// Start the web server
pub async fn serve(port: u16, settings: Settings) -> anyhow::Result<()> {
    let backend = HttpBackend::new(&settings.api_url)?;
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    info!(
        address = %addr,
        backend = backend.base_url(),
        store = %settings.store_path.display(),
        "Dashboard running"
    );

    let state = Arc::new(AppState {
        store: ProfileStore::new(&settings.store_path),
        backend: Arc::new(backend),
    });
    let app = router(state).nest_service("/assets", ServeDir::new("assets"));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

pub fn router<B: Backend>(state: Arc<AppState<B>>) -> Router {
    Router::new()
        .route("/", get(index_handler::<B>))
        .route("/profile", axum::routing::post(profile_form_handler::<B>))
        .route("/api/profile", get(profile_handler::<B>))
        .route("/api/panels/{name}", get(panel_handler::<B>))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn render_dashboard<B: Backend>(state: &AppState<B>, notice: Option<&str>) -> String {
    let profile = state.store.load();
    let dashboard = Dashboard::new(Arc::clone(&state.backend));
    dashboard.refresh(profile.as_ref()).await;

    html::render_page(profile.as_ref(), &dashboard.rendered(), notice).into_string()
}

/// Serve the dashboard page
async fn index_handler<B: Backend>(State(state): State<Arc<AppState<B>>>) -> Html<String> {
    Html(render_dashboard(&state, None).await)
}

/// Raw form fields. Every value arrives as text and blank means absent.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ProfileForm {
    pub country: String,
    pub latitude: String,
    pub longitude: String,
    pub altitude: String,
    pub timezone: String,
    pub surface_area: String,
    pub panel_efficiency: String,
    pub fee_scheme: String,
    pub fixed_price: String,
    pub account_email: String,
}

fn parse_number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

impl ProfileForm {
    pub fn into_profile(self) -> UserProfile {
        UserProfile {
            country: self.country.trim().to_string(),
            latitude: parse_number(&self.latitude),
            longitude: parse_number(&self.longitude),
            altitude: parse_number(&self.altitude),
            timezone: self.timezone.trim().to_string(),
            surface_area: parse_number(&self.surface_area),
            panel_efficiency: parse_number(&self.panel_efficiency),
            fee_scheme: self.fee_scheme.parse().ok(),
            fixed_price: parse_number(&self.fixed_price),
            account_email: self.account_email.trim().to_string(),
        }
    }
}

/// Save the submitted profile, or re-render the page with a notice
async fn profile_form_handler<B: Backend>(
    State(state): State<Arc<AppState<B>>>,
    Form(form): Form<ProfileForm>,
) -> Response {
    let profile = form.into_profile();

    if !validate_required(&profile) {
        info!("Rejected profile submission");
        let page = render_dashboard(&state, Some(INVALID_INPUT)).await;
        return (StatusCode::UNPROCESSABLE_ENTITY, Html(page)).into_response();
    }

    match state.store.save(&profile) {
        Ok(()) => {
            info!("Profile updated");
            Redirect::to("/").into_response()
        }
        Err(e) => {
            warn!(error = %e, "Failed to save profile");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

/// Return the stored profile as JSON
async fn profile_handler<B: Backend>(State(state): State<Arc<AppState<B>>>) -> Response {
    match state.store.load() {
        Some(profile) => Json(profile).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Run a single panel and return its markup
async fn panel_handler<B: Backend>(
    State(state): State<Arc<AppState<B>>>,
    Path(name): Path<String>,
) -> Response {
    let Ok(kind) = name.parse::<PanelKind>() else {
        return (StatusCode::NOT_FOUND, format!("unknown panel: {name}")).into_response();
    };

    let slot = HtmlSlot::new();
    match state.store.load() {
        Some(profile) if validate_required(&profile) => {
            if let Err(e) = run_panel(
                kind.slug(),
                kind.definition(),
                &profile,
                state.backend.as_ref(),
                &slot,
            )
            .await
            {
                debug!(panel = kind.slug(), error = %e, "Panel shows an error");
            }
        }
        _ => slot.show_error(PROFILE_INCOMPLETE),
    }

    Html(slot.markup().into_string()).into_response()
}
