//! View handles panels render into.

use maud::{html, Markup, PreEscaped};
use std::sync::{Arc, Mutex, PoisonError};

use crate::chart;
use crate::panel::PanelContent;

/// Base path of the hourly weather icons
pub const WEATHER_ICON_DIR: &str = "assets/images/weather-icons";

/// Where a panel puts its result. Each call replaces what was shown before.
pub trait PanelView: Send + Sync {
    fn show(&self, content: &PanelContent);
    fn show_error(&self, message: &str);
}

/// A region of the dashboard page holding the latest markup of one panel
#[derive(Debug, Clone, Default)]
pub struct HtmlSlot {
    markup: Arc<Mutex<Option<Markup>>>,
}

impl HtmlSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current content, or a placeholder if nothing was rendered yet
    pub fn markup(&self) -> Markup {
        let guard = self.markup.lock().unwrap_or_else(PoisonError::into_inner);
        match guard.as_ref() {
            Some(markup) => markup.clone(),
            None => html! { p.placeholder { "Loading..." } },
        }
    }

    fn replace(&self, markup: Markup) {
        let mut guard = self.markup.lock().unwrap_or_else(PoisonError::into_inner);
        *guard = Some(markup);
    }
}

impl PanelView for HtmlSlot {
    fn show(&self, content: &PanelContent) {
        self.replace(render_content(content));
    }

    fn show_error(&self, message: &str) {
        self.replace(render_error(message));
    }
}

pub fn render_content(content: &PanelContent) -> Markup {
    match content {
        PanelContent::Chart { chart, notes } => html! {
            div.chart-container {
                (chart::render(chart))
            }
            @if !notes.is_empty() {
                div.info-container {
                    @for note in notes {
                        div.info { (note) }
                    }
                }
            }
        },
        PanelContent::WeatherIcons(icons) => html! {
            div.weather-strip {
                @for (hour, icon) in icons.iter().enumerate() {
                    div.weather-item {
                        img src=(format!("{}/{}.svg", WEATHER_ICON_DIR, icon)) alt=(icon) width="50";
                        p { (format!("{:02}:00", hour)) }
                    }
                }
            }
        },
        PanelContent::Fragment(fragment) => html! { (PreEscaped(fragment.as_str())) },
    }
}

pub fn render_error(message: &str) -> Markup {
    html! { p.error { (message) } }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::{Chart, ChartOptions, Dataset};

    fn sample_chart() -> PanelContent {
        PanelContent::Chart {
            chart: Chart::line(
                vec!["00:00".to_string(), "01:00".to_string()],
                vec![Dataset::line("Surplus (kWh)", vec![1.0, 2.0], "green", "lightgreen")],
                ChartOptions::default(),
            ),
            notes: vec!["Green energy: 42.00%".to_string()],
        }
    }

    #[test]
    fn test_empty_slot_shows_placeholder() {
        let slot = HtmlSlot::new();
        assert!(slot.markup().into_string().contains("Loading..."));
    }

    #[test]
    fn test_show_replaces_previous_content() {
        let slot = HtmlSlot::new();
        slot.show_error("first");
        slot.show(&sample_chart());

        let out = slot.markup().into_string();
        assert!(out.contains("<svg"));
        assert!(out.contains("Green energy: 42.00%"));
        assert!(!out.contains("first"));
    }

    #[test]
    fn test_error_replaces_chart() {
        let slot = HtmlSlot::new();
        slot.show(&sample_chart());
        slot.show_error("No data for this account.");

        let out = slot.markup().into_string();
        assert_eq!(out, "<p class=\"error\">No data for this account.</p>");
    }

    #[test]
    fn test_clones_share_the_region() {
        let slot = HtmlSlot::new();
        let handle = slot.clone();
        handle.show_error("shared");
        assert!(slot.markup().into_string().contains("shared"));
    }

    #[test]
    fn test_error_text_is_escaped() {
        let out = render_error("<b>bad</b>").into_string();
        assert!(out.contains("&lt;b&gt;bad&lt;/b&gt;"));
    }

    #[test]
    fn test_weather_icons_strip() {
        let content = PanelContent::WeatherIcons(vec!["day-100".to_string(), "night-200".to_string()]);
        let out = render_content(&content).into_string();

        assert!(out.contains("src=\"assets/images/weather-icons/day-100.svg\""));
        assert!(out.contains("alt=\"night-200\""));
        assert!(out.contains("<p>01:00</p>"));
    }

    #[test]
    fn test_fragment_is_inserted_verbatim() {
        let content = PanelContent::Fragment("<div class=\"w\">sun</div>".to_string());
        assert_eq!(render_content(&content).into_string(), "<div class=\"w\">sun</div>");
    }
}
