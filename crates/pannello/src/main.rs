use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, Level};
use tracing_subscriber::{fmt, EnvFilter};

mod api;
mod chart;
mod config;
mod dashboard;
mod html;
mod mix;
mod panel;
mod panels;
mod server;
mod store;
mod types;
mod view;

use api::HttpBackend;
use config::Settings;
use dashboard::{Dashboard, PROFILE_INCOMPLETE};
use panels::PanelKind;
use store::{validate_required, ProfileStore};
use types::{FeeScheme, UserProfile};
use view::{HtmlSlot, PanelView};

#[derive(Parser, Debug)]
#[command(name = "pannello")]
#[command(about = "Photovoltaic energy dashboard: weather, prices, generation and surplus")]
struct Args {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Profile store file (overrides PANNELLO_STORE)
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    /// Backend base URL (overrides PANNELLO_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the web server (default)
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8080")]
        port: u16,
    },

    /// Fetch every panel once and write a static page
    Build {
        /// Directory receiving index.html
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
    },

    /// Inspect or edit the stored profile
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },

    /// Run a single panel and print its markup
    Panel {
        /// weather, prices, generation-mix, pv-generation, sell,
        /// production-consumption or surplus
        name: PanelKind,
    },
}

#[derive(Subcommand, Debug)]
enum ProfileAction {
    /// Print the stored profile as JSON
    Show,

    /// Replace the stored profile with the given fields
    Set(ProfileFlags),
}

/// Every profile field as a flag. Fields left out are stored empty.
#[derive(clap::Args, Debug, Default)]
struct ProfileFlags {
    #[arg(long)]
    country: Option<String>,
    #[arg(long, allow_negative_numbers = true)]
    latitude: Option<f64>,
    #[arg(long, allow_negative_numbers = true)]
    longitude: Option<f64>,
    #[arg(long, allow_negative_numbers = true)]
    altitude: Option<f64>,
    #[arg(long)]
    timezone: Option<String>,
    /// Panel surface in m²
    #[arg(long)]
    surface_area: Option<f64>,
    #[arg(long)]
    panel_efficiency: Option<f64>,
    /// FIXED or MARKET
    #[arg(long)]
    fee_scheme: Option<FeeScheme>,
    /// €/kWh, used with FIXED
    #[arg(long)]
    fixed_price: Option<f64>,
    #[arg(long)]
    email: Option<String>,
}

impl ProfileFlags {
    fn into_profile(self) -> UserProfile {
        UserProfile {
            country: self.country.unwrap_or_default(),
            latitude: self.latitude,
            longitude: self.longitude,
            altitude: self.altitude,
            timezone: self.timezone.unwrap_or_default(),
            surface_area: self.surface_area,
            panel_efficiency: self.panel_efficiency,
            fee_scheme: self.fee_scheme,
            fixed_price: self.fixed_price,
            account_email: self.email.unwrap_or_default(),
        }
    }
}

fn init_tracing(log_level: &str) {
    let mut filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    for directive in ["hyper=warn", "reqwest=warn", "tower_http=warn"] {
        if let Ok(directive) = directive.parse() {
            filter = filter.add_directive(directive);
        }
    }

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_max_level(Level::TRACE)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_tracing(&args.log_level);

    let settings = Settings::from_env().with_overrides(args.api_url, args.store);
    let store = ProfileStore::new(&settings.store_path);

    match args.command.unwrap_or(Commands::Serve { port: 8080 }) {
        Commands::Serve { port } => {
            server::serve(port, settings).await?;
        }
        Commands::Build { output } => {
            let profile = store.load();
            let dashboard = Dashboard::new(Arc::new(HttpBackend::new(&settings.api_url)?));
            let summary = dashboard.refresh(profile.as_ref()).await;

            let html_path = output.join("index.html");
            html::generate_html(profile.as_ref(), &dashboard.rendered(), &html_path)?;
            info!(
                path = %html_path.display(),
                rendered = summary.rendered,
                failed = summary.failed,
                "HTML saved"
            );
        }
        Commands::Profile { action } => match action {
            ProfileAction::Show => match store.load() {
                Some(profile) => println!("{}", serde_json::to_string_pretty(&profile)?),
                None => bail!("No profile stored in {}", store.path().display()),
            },
            ProfileAction::Set(flags) => {
                let profile = flags.into_profile();

                if !validate_required(&profile) {
                    bail!(
                        "Invalid input values: latitude, longitude, surface area and panel efficiency are required"
                    );
                }
                store.save(&profile)?;
                info!(path = %store.path().display(), "Profile saved");
            }
        },
        Commands::Panel { name } => {
            let slot = HtmlSlot::new();
            match store.load() {
                Some(profile) if validate_required(&profile) => {
                    let backend = HttpBackend::new(&settings.api_url)?;
                    if let Err(e) =
                        panel::run_panel(name.slug(), name.definition(), &profile, &backend, &slot)
                            .await
                    {
                        debug!(panel = name.slug(), error = %e, "Panel shows an error");
                    }
                }
                _ => slot.show_error(PROFILE_INCOMPLETE),
            }
            println!("{}", slot.markup().into_string());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_set(args: &[&str]) -> ProfileFlags {
        let mut argv = vec!["pannello", "profile", "set"];
        argv.extend_from_slice(args);
        match Args::try_parse_from(argv).unwrap().command {
            Some(Commands::Profile {
                action: ProfileAction::Set(flags),
            }) => flags,
            other => panic!("expected profile set, got {:?}", other),
        }
    }

    #[test]
    fn test_profile_set_builds_whole_record() {
        let profile = parse_set(&[
            "--latitude",
            "-33.9",
            "--longitude",
            "18.4",
            "--surface-area",
            "10",
            "--panel-efficiency",
            "0.2",
            "--fee-scheme",
            "market",
        ])
        .into_profile();

        assert_eq!(profile.latitude, Some(-33.9));
        assert_eq!(profile.fee_scheme, Some(FeeScheme::Market));
        assert!(validate_required(&profile));
    }

    #[test]
    fn test_profile_set_leaves_omitted_fields_empty() {
        let profile =
            parse_set(&["--latitude", "45.0", "--email", "user@example.com"]).into_profile();

        assert_eq!(profile.account_email, "user@example.com");
        assert_eq!(profile.longitude, None);
        assert!(profile.country.is_empty());
        assert!(!validate_required(&profile));
    }

    #[test]
    fn test_panel_name_is_parsed() {
        let args = Args::try_parse_from(["pannello", "panel", "generation-mix"]).unwrap();
        assert!(matches!(
            args.command,
            Some(Commands::Panel {
                name: PanelKind::GenerationMix
            })
        ));
        assert!(Args::try_parse_from(["pannello", "panel", "moon"]).is_err());
    }
}
