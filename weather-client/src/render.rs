use crate::config::{FORECAST_DAYS, HOURLY_DISPLAY_POINTS};
use common::models::{DailyPoint, HourlyPoint, Place, UnitSystem, WeatherCondition, WeatherSnapshot};

const PLACEHOLDER: &str = "░░░░░";

/// Display fragments for one weather view
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedWeather {
    pub current: String,
    pub hourly: Vec<String>,
    pub daily: Vec<String>,
}

impl RenderedWeather {
    /// Stack the fragments into a single block of text
    pub fn compose(&self) -> String {
        let mut out = String::new();
        out.push_str(&self.current);
        out.push_str("\n\nNext hours\n");
        for row in self.hourly.chunks(6) {
            out.push_str("  ");
            out.push_str(&row.join("   "));
            out.push('\n');
        }
        out.push_str("\n7-day forecast\n");
        for day in &self.daily {
            out.push_str("  ");
            out.push_str(day);
            out.push('\n');
        }
        out
    }
}

pub fn render_weather(place: &str, snapshot: &WeatherSnapshot) -> RenderedWeather {
    RenderedWeather {
        current: render_current(place, snapshot),
        hourly: render_hourly(snapshot.hourly_window(HOURLY_DISPLAY_POINTS), snapshot.units),
        daily: render_daily(&snapshot.daily, snapshot.units),
    }
}

/// Same layout as a populated view, with placeholder cells
pub fn render_skeleton(place: &str) -> RenderedWeather {
    RenderedWeather {
        current: format!("{}\nLoading…", place),
        hourly: vec![PLACEHOLDER.to_string(); HOURLY_DISPLAY_POINTS],
        daily: vec![PLACEHOLDER.repeat(4); FORECAST_DAYS],
    }
}

pub fn render_current(place: &str, snapshot: &WeatherSnapshot) -> String {
    let current = &snapshot.current;
    let condition = WeatherCondition::from_wmo_code(current.weathercode);
    format!(
        "{}\n{} {}  {}\nWind {:.0} km/h · Updated {}",
        place,
        condition.glyph(),
        condition.description(),
        temperature(current.temperature, snapshot.units),
        current.windspeed,
        current.time.format("%a %d %b %H:%M")
    )
}

pub fn render_hourly(points: &[HourlyPoint], units: UnitSystem) -> Vec<String> {
    points
        .iter()
        .map(|p| {
            format!(
                "{} {} {}",
                p.time.format("%H:%M"),
                temperature(p.temperature, units),
                percent(p.precipitation_probability)
            )
        })
        .collect()
}

pub fn render_daily(days: &[DailyPoint], units: UnitSystem) -> Vec<String> {
    days.iter()
        .map(|d| {
            let condition = WeatherCondition::from_wmo_code(d.weathercode);
            format!(
                "{}  {} {:<22} {} / {}  {}",
                d.date.format("%a %d %b"),
                condition.glyph(),
                condition.description(),
                temperature(d.high, units),
                temperature(d.low, units),
                percent(d.precipitation_probability_mean)
            )
        })
        .collect()
}

/// Inline banner shown when a load fails
pub fn render_error(place: &str, message: &str) -> String {
    format!(
        "{}\n⚠ Could not load the forecast: {}\nType :retry to try again.",
        place, message
    )
}

pub fn render_suggestions(places: &[Place]) -> Vec<String> {
    places
        .iter()
        .enumerate()
        .map(|(i, place)| format!("{}. {}", i + 1, place.label()))
        .collect()
}

fn temperature(value: f64, units: UnitSystem) -> String {
    format!("{:.0}{}", value, units.symbol())
}

fn percent(value: Option<f64>) -> String {
    match value {
        Some(p) => format!("{:.0}%", p),
        None => "--".to_string(),
    }
}
