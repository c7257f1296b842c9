//! Runs all panels for a profile, each in its own task.

use maud::Markup;
use std::sync::Arc;
use tracing::{error, info};

use crate::api::Backend;
use crate::panel::{run_panel, PanelError};
use crate::panels::PanelKind;
use crate::store::validate_required;
use crate::types::UserProfile;
use crate::view::{HtmlSlot, PanelView};

/// Shown in every panel when the stored profile is missing or incomplete
pub const PROFILE_INCOMPLETE: &str = "Please complete user's form";

/// Outcome counts of one refresh
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshSummary {
    pub rendered: usize,
    pub failed: usize,
}

/// All panels of the page, each with its own view region
pub struct Dashboard<B: Backend> {
    backend: Arc<B>,
    slots: Vec<(PanelKind, HtmlSlot)>,
}

impl<B: Backend> Dashboard<B> {
    pub fn new(backend: Arc<B>) -> Self {
        let slots = PanelKind::ALL
            .into_iter()
            .map(|kind| (kind, HtmlSlot::new()))
            .collect();
        Self { backend, slots }
    }

    pub fn slot(&self, kind: PanelKind) -> Option<&HtmlSlot> {
        self.slots
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, slot)| slot)
    }

    /// Current markup of every panel, in page order
    pub fn rendered(&self) -> Vec<(PanelKind, Markup)> {
        self.slots
            .iter()
            .map(|(kind, slot)| (*kind, slot.markup()))
            .collect()
    }

    /// Refresh every panel from `profile`.
    ///
    /// Without a usable profile no request is made and every panel asks the
    /// user to complete the form. Otherwise each panel runs in a spawned task;
    /// a task that panics is reported in its own panel only.
    pub async fn refresh(&self, profile: Option<&UserProfile>) -> RefreshSummary {
        let profile = match profile {
            Some(profile) if validate_required(profile) => Arc::new(profile.clone()),
            _ => {
                info!("Profile missing or incomplete, skipping panel fetches");
                for (_, slot) in &self.slots {
                    slot.show_error(PROFILE_INCOMPLETE);
                }
                return RefreshSummary {
                    rendered: 0,
                    failed: self.slots.len(),
                };
            }
        };

        let handles: Vec<_> = self
            .slots
            .iter()
            .map(|(kind, slot)| {
                let kind = *kind;
                let slot = slot.clone();
                let backend = Arc::clone(&self.backend);
                let profile = Arc::clone(&profile);
                let handle = tokio::spawn(async move {
                    run_panel(kind.slug(), kind.definition(), &profile, backend.as_ref(), &slot).await
                });
                (kind, handle)
            })
            .collect();

        let mut summary = RefreshSummary::default();
        for (kind, handle) in handles {
            match handle.await {
                Ok(Ok(())) => summary.rendered += 1,
                Ok(Err(_)) => summary.failed += 1,
                Err(join_error) => {
                    error!(panel = kind.slug(), error = %join_error, "Panel task aborted");
                    if let Some(slot) = self.slot(kind) {
                        slot.show_error(&PanelError::Crashed(join_error.to_string()).to_string());
                    }
                    summary.failed += 1;
                }
            }
        }

        info!(
            rendered = summary.rendered,
            failed = summary.failed,
            "Dashboard refreshed"
        );
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{Endpoint, Reply, TransportError};
    use crate::types::FeeScheme;
    use serde_json::Value;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Answers every endpoint successfully except the ones listed as broken
    struct FakeBackend {
        broken: Vec<Endpoint>,
        panicking: Option<Endpoint>,
        calls: AtomicUsize,
    }

    impl FakeBackend {
        fn healthy() -> Self {
            Self {
                broken: vec![],
                panicking: None,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl Backend for FakeBackend {
        async fn post(&self, endpoint: Endpoint, _body: Value) -> Result<Reply, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.panicking == Some(endpoint) {
                panic!("backend exploded");
            }
            if self.broken.contains(&endpoint) {
                return Ok(Reply::new(500, r#"{"error":"Service unavailable"}"#));
            }
            let body = match endpoint {
                Endpoint::Weather => r#"{"images":["day-0","day-1"]}"#,
                Endpoint::DayAheadPrices => r#"{"data":[{"position":1,"price.amount":80.0}]}"#,
                Endpoint::GenerationMix => r#"{"data":{"Solar":50,"Fossil Gas":50},"co2":1.0}"#,
                Endpoint::PvGeneration => r#"{"power":[0,100,200]}"#,
                Endpoint::Sell => r#"{"sell":[0,0.01,0.02]}"#,
                Endpoint::ProductionDay
                | Endpoint::ConsumptionDay
                | Endpoint::SurplusDay => r#"{"hourly":{"00:00":1.0}}"#,
            };
            Ok(Reply::new(200, body))
        }
    }

    fn full_profile() -> UserProfile {
        UserProfile {
            country: "Italy North".to_string(),
            latitude: Some(45.07),
            longitude: Some(7.69),
            altitude: Some(240.0),
            timezone: "Europe/Rome".to_string(),
            surface_area: Some(12.5),
            panel_efficiency: Some(0.21),
            fee_scheme: Some(FeeScheme::Market),
            fixed_price: None,
            account_email: "user@example.com".to_string(),
        }
    }

    fn slot_html<B: Backend>(dashboard: &Dashboard<B>, kind: PanelKind) -> String {
        dashboard.slot(kind).unwrap().markup().into_string()
    }

    #[tokio::test]
    async fn test_all_panels_render() {
        let dashboard = Dashboard::new(Arc::new(FakeBackend::healthy()));

        let summary = dashboard.refresh(Some(&full_profile())).await;

        assert_eq!(summary, RefreshSummary { rendered: 7, failed: 0 });
        assert!(slot_html(&dashboard, PanelKind::Weather).contains("day-1.svg"));
        assert!(slot_html(&dashboard, PanelKind::GenerationMix).contains("Green energy: 50.00%"));
        assert!(slot_html(&dashboard, PanelKind::PvGeneration).contains("<svg"));
    }

    #[tokio::test]
    async fn test_missing_profile_makes_no_requests() {
        let backend = Arc::new(FakeBackend::healthy());
        let dashboard = Dashboard::new(Arc::clone(&backend));

        let summary = dashboard.refresh(None).await;

        assert_eq!(summary.failed, 7);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
        for (_, markup) in dashboard.rendered() {
            assert!(markup.into_string().contains(PROFILE_INCOMPLETE));
        }
    }

    #[tokio::test]
    async fn test_invalid_profile_makes_no_requests() {
        let backend = Arc::new(FakeBackend::healthy());
        let dashboard = Dashboard::new(Arc::clone(&backend));
        let mut profile = full_profile();
        profile.surface_area = Some(0.0);

        dashboard.refresh(Some(&profile)).await;

        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failing_panel_does_not_affect_siblings() {
        let backend = FakeBackend {
            broken: vec![Endpoint::DayAheadPrices],
            ..FakeBackend::healthy()
        };
        let dashboard = Dashboard::new(Arc::new(backend));

        let summary = dashboard.refresh(Some(&full_profile())).await;

        assert_eq!(summary, RefreshSummary { rendered: 6, failed: 1 });
        assert!(slot_html(&dashboard, PanelKind::Prices).contains("Service unavailable"));
        assert!(slot_html(&dashboard, PanelKind::Sell).contains("<svg"));
    }

    #[tokio::test]
    async fn test_panicking_panel_is_isolated() {
        let backend = FakeBackend {
            panicking: Some(Endpoint::Weather),
            ..FakeBackend::healthy()
        };
        let dashboard = Dashboard::new(Arc::new(backend));

        let summary = dashboard.refresh(Some(&full_profile())).await;

        assert_eq!(summary, RefreshSummary { rendered: 6, failed: 1 });
        assert!(slot_html(&dashboard, PanelKind::Weather).contains("Panel stopped unexpectedly"));
        assert!(slot_html(&dashboard, PanelKind::Surplus).contains("<svg"));
    }

    #[tokio::test]
    async fn test_email_panels_fail_alone_without_email() {
        let dashboard = Dashboard::new(Arc::new(FakeBackend::healthy()));
        let mut profile = full_profile();
        profile.account_email.clear();

        let summary = dashboard.refresh(Some(&profile)).await;

        assert_eq!(summary, RefreshSummary { rendered: 5, failed: 2 });
        assert!(slot_html(&dashboard, PanelKind::Surplus)
            .contains("All fields are required. Please complete the form."));
    }
}
