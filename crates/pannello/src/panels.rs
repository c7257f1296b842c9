//! The dashboard panels: what each one needs, sends and draws.

use serde_json::{json, Map, Value};
use std::fmt;
use std::str::FromStr;

use crate::api::Endpoint;
use crate::chart::{Chart, ChartKind, ChartOptions, Dataset, TooltipFormat};
use crate::mix::{green_percentage, GENERATION_COLORS};
use crate::panel::{PanelContent, PanelDef, PanelError, Payload, Requests};
use crate::types::{FeeScheme, ProfileField, UserProfile};

const POSITION_MISSING: &str = "Position and time zone required. Please complete user's form.";
const FORM_INCOMPLETE: &str = "All fields are required. Please complete the form.";

/// Highest day-ahead position accepted, enough for quarter-hour resolution
pub const MAX_PRICE_POSITION: usize = 96;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PanelKind {
    Weather,
    Prices,
    GenerationMix,
    PvGeneration,
    Sell,
    ProductionConsumption,
    Surplus,
}

impl PanelKind {
    pub const ALL: [PanelKind; 7] = [
        PanelKind::Weather,
        PanelKind::Prices,
        PanelKind::GenerationMix,
        PanelKind::PvGeneration,
        PanelKind::Sell,
        PanelKind::ProductionConsumption,
        PanelKind::Surplus,
    ];

    /// URL-safe identifier, also used as the DOM id of the panel card
    pub fn slug(&self) -> &'static str {
        match self {
            PanelKind::Weather => "weather",
            PanelKind::Prices => "prices",
            PanelKind::GenerationMix => "generation-mix",
            PanelKind::PvGeneration => "pv-generation",
            PanelKind::Sell => "sell",
            PanelKind::ProductionConsumption => "production-consumption",
            PanelKind::Surplus => "surplus",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            PanelKind::Weather => "Weather",
            PanelKind::Prices => "Day-ahead prices",
            PanelKind::GenerationMix => "Country generation",
            PanelKind::PvGeneration => "PV generation",
            PanelKind::Sell => "Selling estimate",
            PanelKind::ProductionConsumption => "Production & consumption",
            PanelKind::Surplus => "Surplus",
        }
    }

    pub fn definition(&self) -> &'static PanelDef {
        match self {
            PanelKind::Weather => &WEATHER,
            PanelKind::Prices => &PRICES,
            PanelKind::GenerationMix => &GENERATION_MIX,
            PanelKind::PvGeneration => &PV_GENERATION,
            PanelKind::Sell => &SELL,
            PanelKind::ProductionConsumption => &PRODUCTION_CONSUMPTION,
            PanelKind::Surplus => &SURPLUS,
        }
    }
}

impl fmt::Display for PanelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for PanelKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PanelKind::ALL
            .into_iter()
            .find(|kind| kind.slug() == s)
            .ok_or_else(|| format!("unknown panel: {s:?}"))
    }
}

// ========== definitions ==========

static WEATHER: PanelDef = PanelDef {
    requests: Requests::Single(Endpoint::Weather),
    required: |_| {
        vec![
            ProfileField::Latitude,
            ProfileField::Longitude,
            ProfileField::Timezone,
        ]
    },
    missing_message: POSITION_MISSING,
    body: |p| json!({ "latitude": p.latitude, "longitude": p.longitude, "timezone": p.timezone }),
    map: map_weather,
};

static PRICES: PanelDef = PanelDef {
    requests: Requests::Single(Endpoint::DayAheadPrices),
    required: |_| vec![ProfileField::Country],
    missing_message: FORM_INCOMPLETE,
    body: country_body,
    map: map_prices,
};

static GENERATION_MIX: PanelDef = PanelDef {
    requests: Requests::Single(Endpoint::GenerationMix),
    required: |_| vec![ProfileField::Country],
    missing_message: FORM_INCOMPLETE,
    body: country_body,
    map: map_generation_mix,
};

static PV_GENERATION: PanelDef = PanelDef {
    requests: Requests::Single(Endpoint::PvGeneration),
    required: |_| installation_fields(),
    missing_message: FORM_INCOMPLETE,
    body: installation_body,
    map: map_pv_generation,
};

static SELL: PanelDef = PanelDef {
    requests: Requests::Single(Endpoint::Sell),
    required: sell_fields,
    missing_message: FORM_INCOMPLETE,
    body: sell_body,
    map: map_sell,
};

static PRODUCTION_CONSUMPTION: PanelDef = PanelDef {
    requests: Requests::Pair(Endpoint::ProductionDay, Endpoint::ConsumptionDay),
    required: |_| vec![ProfileField::AccountEmail],
    missing_message: FORM_INCOMPLETE,
    body: email_body,
    map: map_production_consumption,
};

static SURPLUS: PanelDef = PanelDef {
    requests: Requests::Single(Endpoint::SurplusDay),
    required: |_| vec![ProfileField::AccountEmail],
    missing_message: FORM_INCOMPLETE,
    body: email_body,
    map: map_surplus,
};

fn installation_fields() -> Vec<ProfileField> {
    vec![
        ProfileField::Latitude,
        ProfileField::Longitude,
        ProfileField::Altitude,
        ProfileField::Timezone,
        ProfileField::SurfaceArea,
        ProfileField::PanelEfficiency,
    ]
}

fn sell_fields(profile: &UserProfile) -> Vec<ProfileField> {
    let mut fields = installation_fields();
    fields.push(ProfileField::FeeScheme);
    fields.push(ProfileField::Country);
    if profile.fee_scheme == Some(FeeScheme::Fixed) {
        fields.push(ProfileField::FixedPrice);
    }
    fields
}

// ========== request bodies ==========

fn country_body(profile: &UserProfile) -> Value {
    json!({ "country": profile.country })
}

fn email_body(profile: &UserProfile) -> Value {
    json!({ "email": profile.account_email })
}

fn installation_body(profile: &UserProfile) -> Value {
    json!({
        "latitude": profile.latitude,
        "longitude": profile.longitude,
        "altitude": profile.altitude,
        "timezone": profile.timezone,
        "surface": profile.surface_area,
        "efficiency": profile.panel_efficiency,
    })
}

fn sell_body(profile: &UserProfile) -> Value {
    let mut body = installation_body(profile);
    if let Value::Object(map) = &mut body {
        map.insert(
            "fee".to_string(),
            json!(profile.fee_scheme.map(|f| f.as_str())),
        );
        map.insert("country".to_string(), json!(profile.country));
        map.insert(
            "fixed_price".to_string(),
            json!(profile.fixed_price.unwrap_or(0.0)),
        );
    }
    body
}

// ========== response mappers ==========

fn map_weather(payloads: Vec<Payload>) -> Result<PanelContent, PanelError> {
    match single(payloads)? {
        Payload::Text(fragment) => Ok(PanelContent::Fragment(fragment)),
        Payload::Json(value) => {
            let images = field(&value, "images")?
                .as_array()
                .ok_or_else(|| decode("'images' is not a list"))?;
            let icons = images
                .iter()
                .map(|v| match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect();
            Ok(PanelContent::WeatherIcons(icons))
        }
    }
}

fn map_prices(payloads: Vec<Payload>) -> Result<PanelContent, PanelError> {
    let payload = single(payloads)?;
    let points = field(payload.json()?, "data")?
        .as_array()
        .ok_or_else(|| decode("'data' is not a list"))?
        .iter()
        .map(|point| {
            let position = point.get("position").and_then(number);
            let price = point.get("price.amount").and_then(number);
            match (position, price) {
                (Some(pos), Some(price)) => price_position(pos)
                    .map(|pos| (pos, price))
                    .ok_or_else(|| decode(&format!("price position {} out of range", pos))),
                _ => Err(decode("price point without position or amount")),
            }
        })
        .collect::<Result<Vec<_>, _>>()?;

    let prices = fill_price_gaps(&points);
    let chart = Chart::line(
        hour_labels(prices.len()),
        vec![Dataset::line(
            "Price (€/MWh)",
            prices,
            "rgba(75, 192, 192, 1)",
            "rgba(75, 192, 192, 0.2)",
        )],
        ChartOptions {
            x_title: Some("Hour (00:00 - 23:00)".to_string()),
            y_title: Some("Price (€/MWh)".to_string()),
            tooltip: TooltipFormat::Value { unit: "€/MWh" },
            ..Default::default()
        },
    );
    Ok(PanelContent::Chart {
        chart,
        notes: vec![],
    })
}

fn map_generation_mix(payloads: Vec<Payload>) -> Result<PanelContent, PanelError> {
    let payload = single(payloads)?;
    let value = payload.json()?;
    let data = field(value, "data")?
        .as_object()
        .ok_or_else(|| decode("'data' is not an object"))?;

    let mix: Vec<(String, f64)> = data
        .iter()
        .filter_map(|(source, v)| number(v).map(|n| (source.clone(), n)))
        .collect();

    let mut notes = vec![format!("Green energy: {:.2}%", green_percentage(&mix))];
    if let Some(co2) = value.get("co2").and_then(number) {
        notes.push(format!("CO2 impact in last hour: {:.2} Tonnes", co2));
    }

    let chart = Chart {
        kind: ChartKind::Pie,
        labels: mix.iter().map(|(source, _)| source.clone()).collect(),
        datasets: vec![Dataset {
            label: "Generation (MWh)".to_string(),
            values: mix.iter().map(|(_, v)| *v).collect(),
            border_color: "#fff".to_string(),
            fill_color: None,
            colors: mix
                .iter()
                .map(|(source, _)| GENERATION_COLORS.color(source).to_string())
                .collect(),
        }],
        options: ChartOptions {
            show_legend: false,
            tooltip: TooltipFormat::LabelValue { unit: "MWh" },
            ..Default::default()
        },
    };
    Ok(PanelContent::Chart { chart, notes })
}

fn map_pv_generation(payloads: Vec<Payload>) -> Result<PanelContent, PanelError> {
    let values = hourly_array(single(payloads)?.json()?, "power")?;
    Ok(PanelContent::Chart {
        chart: Chart::line(
            hour_labels(values.len()),
            vec![Dataset::line(
                "Energy Generated (Wh)",
                values,
                "rgba(255, 165, 0, 1)",
                "rgba(255, 255, 0, 0.3)",
            )],
            time_of_day_options("Power (Wh)", "Wh"),
        ),
        notes: vec![],
    })
}

fn map_sell(payloads: Vec<Payload>) -> Result<PanelContent, PanelError> {
    let values = hourly_array(single(payloads)?.json()?, "sell")?;
    Ok(PanelContent::Chart {
        chart: Chart::line(
            hour_labels(values.len()),
            vec![Dataset::line(
                "Selling prices for your PV installation (€)",
                values,
                "rgba(0, 128, 0, 1)",
                "rgba(144, 238, 144, 0.3)",
            )],
            time_of_day_options("Money (€)", "€"),
        ),
        notes: vec![],
    })
}

fn map_production_consumption(payloads: Vec<Payload>) -> Result<PanelContent, PanelError> {
    let [production, consumption]: [Payload; 2] = payloads
        .try_into()
        .map_err(|_| decode("expected production and consumption replies"))?;

    let production = hourly_map(production.json()?)?;
    let consumption = hourly_map(consumption.json()?)?;

    let labels: Vec<String> = production.keys().cloned().collect();
    let production_values = production.values().filter_map(number).map(round2).collect();
    let consumption_values = labels
        .iter()
        .map(|hour| consumption.get(hour).and_then(number).map(round2).unwrap_or(0.0))
        .collect();

    Ok(PanelContent::Chart {
        chart: Chart::line(
            labels,
            vec![
                Dataset::line(
                    "Energy Production (kWh)",
                    production_values,
                    "rgba(0, 0, 255, 1)",
                    "rgba(135, 206, 235, 0.3)",
                ),
                Dataset::line(
                    "Energy Consumption (kWh)",
                    consumption_values,
                    "rgba(255, 0, 0, 1)",
                    "rgba(255, 99, 132, 0.3)",
                ),
            ],
            time_of_day_options("Energy (kWh)", "kWh"),
        ),
        notes: vec![],
    })
}

fn map_surplus(payloads: Vec<Payload>) -> Result<PanelContent, PanelError> {
    let payload = single(payloads)?;
    let hourly = hourly_map(payload.json()?)?;
    let labels = hourly.keys().cloned().collect();
    let values = hourly.values().filter_map(number).map(round2).collect();

    let mut chart = Chart::line(
        labels,
        vec![Dataset::line(
            "Surplus (kWh)",
            values,
            "rgb(14, 245, 64)",
            "rgba(135, 235, 148, 0.3)",
        )],
        time_of_day_options("Energy (kWh)", "kWh"),
    );
    chart.kind = ChartKind::Bar;
    Ok(PanelContent::Chart {
        chart,
        notes: vec![],
    })
}

// ========== helpers ==========

/// Whole 1-based position no larger than [`MAX_PRICE_POSITION`]
fn price_position(raw: f64) -> Option<usize> {
    let in_range = raw.fract() == 0.0 && (1.0..=MAX_PRICE_POSITION as f64).contains(&raw);
    in_range.then_some(raw as usize)
}

/// Price per hour from 1-based positions.
///
/// Missing positions repeat the previous known price; positions before the
/// first known one take that first price. Positions past
/// [`MAX_PRICE_POSITION`] are ignored.
pub fn fill_price_gaps(points: &[(usize, f64)]) -> Vec<f64> {
    let len = points
        .iter()
        .map(|(pos, _)| *pos)
        .filter(|pos| *pos <= MAX_PRICE_POSITION)
        .max()
        .unwrap_or(0);
    let mut slots: Vec<Option<f64>> = vec![None; len];
    for (pos, price) in points {
        if let Some(slot) = pos.checked_sub(1).and_then(|i| slots.get_mut(i)) {
            *slot = Some(*price);
        }
    }

    let first = slots.iter().flatten().copied().next().unwrap_or(0.0);
    let mut previous = first;
    slots
        .into_iter()
        .map(|slot| {
            let price = slot.unwrap_or(previous);
            previous = price;
            price
        })
        .collect()
}

fn hour_labels(count: usize) -> Vec<String> {
    (0..count).map(|hour| format!("{:02}:00", hour)).collect()
}

fn time_of_day_options(y_title: &str, unit: &'static str) -> ChartOptions {
    ChartOptions {
        x_title: Some("Time of Day".to_string()),
        y_title: Some(y_title.to_string()),
        tooltip: TooltipFormat::Value { unit },
        decimals: Some(2),
        ..Default::default()
    }
}

fn single(payloads: Vec<Payload>) -> Result<Payload, PanelError> {
    payloads
        .into_iter()
        .next()
        .ok_or_else(|| decode("empty reply"))
}

fn field<'a>(value: &'a Value, key: &str) -> Result<&'a Value, PanelError> {
    value
        .get(key)
        .ok_or_else(|| decode(&format!("missing '{}'", key)))
}

fn hourly_array(value: &Value, key: &str) -> Result<Vec<f64>, PanelError> {
    field(value, key)?
        .as_array()
        .ok_or_else(|| decode(&format!("'{}' is not a list", key)))?
        .iter()
        .map(|v| {
            number(v)
                .map(round2)
                .ok_or_else(|| decode(&format!("non-numeric value in '{}'", key)))
        })
        .collect()
}

fn hourly_map(value: &Value) -> Result<&Map<String, Value>, PanelError> {
    field(value, "hourly")?
        .as_object()
        .ok_or_else(|| decode("'hourly' is not an object"))
}

/// Numbers may arrive as JSON numbers or numeric strings
fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn decode(message: &str) -> PanelError {
    PanelError::Decode(message.to_string())
}
