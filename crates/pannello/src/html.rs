use anyhow::{Context, Result};
use maud::{html, Markup, PreEscaped, DOCTYPE};
use std::fs;
use std::path::Path;

use crate::panels::PanelKind;
use crate::types::{FeeScheme, UserProfile};

/// Write the rendered dashboard to `path`
pub fn generate_html(
    profile: Option<&UserProfile>,
    panels: &[(PanelKind, Markup)],
    path: &Path,
) -> Result<()> {
    let html = render_page(profile, panels, None);
    fs::write(path, html.into_string())
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

pub fn render_page(
    profile: Option<&UserProfile>,
    panels: &[(PanelKind, Markup)],
    notice: Option<&str>,
) -> Markup {
    let generated = chrono::Local::now().format("%Y-%m-%d %H:%M");

    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { "Pannello" }
                style { (PreEscaped(CSS)) }
            }
            body {
                div.container {
                    h1 { "Pannello" }
                    div.stats { "Updated " (generated) }
                    @if let Some(notice) = notice {
                        div.notice { (notice) }
                    }
                    section.panels #"home" {
                        @for (kind, markup) in panels {
                            div.card id=(format!("{}-card", kind.slug())) {
                                h2 { (kind.title()) }
                                div.card-body { (markup) }
                            }
                        }
                    }
                    section.profile #"user" {
                        h2 { "Installation" }
                        (render_profile_form(profile))
                    }
                }
            }
        }
    }
}

fn number_value(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

pub fn render_profile_form(profile: Option<&UserProfile>) -> Markup {
    let default_profile = UserProfile::default();
    let p = profile.unwrap_or(&default_profile);

    html! {
        form #"user-form" method="post" action="/profile" {
            label for="country-select" { "Country" }
            input #"country-select" type="text" name="country" value=(p.country);

            label for="lat" { "Latitude" }
            input #"lat" type="number" step="any" name="latitude" value=(number_value(p.latitude));

            label for="lon" { "Longitude" }
            input #"lon" type="number" step="any" name="longitude" value=(number_value(p.longitude));

            label for="alt" { "Altitude (m)" }
            input #"alt" type="number" step="any" name="altitude" value=(number_value(p.altitude));

            label for="time-zone-input" { "Time zone" }
            input #"time-zone-input" type="text" name="timezone" value=(p.timezone) placeholder="Europe/Rome";

            label for="surface" { "Surface (m²)" }
            input #"surface" type="number" step="any" min="0" name="surface_area" value=(number_value(p.surface_area));

            label for="efficiency" { "Panel efficiency" }
            input #"efficiency" type="number" step="any" min="0" name="panel_efficiency" value=(number_value(p.panel_efficiency));

            label for="fee-type-input" { "Fee scheme" }
            select #"fee-type-input" name="fee_scheme" {
                option value="" selected[p.fee_scheme.is_none()] { "Select" }
                @for scheme in [FeeScheme::Fixed, FeeScheme::Market] {
                    option value=(scheme.as_str()) selected[p.fee_scheme == Some(scheme)] { (scheme.as_str()) }
                }
            }

            label for="fixed-value" { "Fixed price (€/kWh)" }
            input #"fixed-value" type="number" step="any" name="fixed_price" value=(number_value(p.fixed_price));

            label for="email" { "Account email" }
            input #"email" type="email" name="account_email" value=(p.account_email);

            button type="submit" { "Save" }
        }
    }
}

const CSS: &str = r#"
* {
    margin: 0;
    padding: 0;
    box-sizing: border-box;
}

body {
    font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', sans-serif;
    background: #f4f6f3;
    color: #1d2a1f;
    line-height: 1.4;
}

.container {
    max-width: 1200px;
    margin: 0 auto;
    padding: 32px 20px 60px;
}

h1 {
    font-size: 2.4em;
    font-weight: 800;
    letter-spacing: -0.02em;
    color: #2e7d32;
}

h2 {
    font-size: 1em;
    text-transform: uppercase;
    letter-spacing: 0.08em;
    margin-bottom: 12px;
    color: #4a5b4c;
}

.stats {
    color: #7a877c;
    font-size: 0.85em;
    margin-bottom: 28px;
}

.notice {
    background: #fff3e0;
    border-left: 4px solid #fb8c00;
    padding: 12px 16px;
    margin-bottom: 24px;
}

.panels {
    display: grid;
    grid-template-columns: repeat(auto-fit, minmax(360px, 1fr));
    gap: 20px;
}

.card {
    background: #fff;
    border-radius: 8px;
    padding: 18px;
    box-shadow: 0 1px 3px rgba(0, 0, 0, 0.08);
    min-width: 0;
}

#weather-card {
    grid-column: 1 / -1;
}

.weather-strip {
    display: flex;
    overflow-x: auto;
    white-space: nowrap;
    padding: 5px 10px;
}

.weather-item {
    text-align: center;
    min-width: 60px;
}

.weather-item p {
    margin: 3px 0;
    font-size: 0.8em;
}

.chart svg {
    display: block;
    max-width: 100%;
    height: auto;
}

.chart-values {
    font-size: 0.8em;
    color: #4a5b4c;
    margin-top: 6px;
}

.chart-values ul {
    display: flex;
    flex-wrap: wrap;
    gap: 4px 12px;
    list-style: none;
}

.info-container {
    margin-top: 10px;
    font-weight: 600;
}

.error {
    color: #c62828;
}

.placeholder, .chart-empty {
    color: #9aa59c;
}

.profile {
    margin-top: 40px;
    background: #fff;
    border-radius: 8px;
    padding: 18px;
}

#user-form {
    display: grid;
    grid-template-columns: max-content 1fr;
    gap: 8px 16px;
    align-items: center;
    max-width: 560px;
}

#user-form input, #user-form select {
    padding: 6px 8px;
    border: 1px solid #c8d0c9;
    border-radius: 4px;
}

#user-form button {
    grid-column: 2;
    justify-self: start;
    padding: 8px 20px;
    background: #2e7d32;
    color: #fff;
    border: none;
    border-radius: 4px;
    cursor: pointer;
}

@media (max-width: 768px) {
    .panels {
        grid-template-columns: 1fr;
    }
}
"#;
