use anyhow::Context;
use serde::Deserialize;
use std::path::Path;

use crate::config::Config;
use crate::db::{NewLocation, Store};
use crate::entities::locations::{LocationCategory, LocationStatus};

const BUNDLED_SEED: &str = include_str!("../../../data/seed.toml");

#[derive(Debug, Deserialize)]
struct SeedFile {
    #[serde(default)]
    moods: Vec<SeedMood>,
    #[serde(default)]
    venues: Vec<SeedVenue>,
}

#[derive(Debug, Deserialize)]
struct SeedMood {
    name: String,
    slug: String,
}

#[derive(Debug, Deserialize)]
struct SeedVenue {
    name: String,
    category: String,
    address: String,
    #[serde(default = "default_city")]
    city: String,
    latitude: Option<f64>,
    longitude: Option<f64>,
    #[serde(default)]
    moods: Vec<String>,
    #[serde(default = "default_score")]
    vibe_match_score: i32,
}

fn default_city() -> String {
    "CDMX".to_string()
}

const fn default_score() -> i32 {
    crate::constants::vibe::DEFAULT_MATCH
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub moods: usize,
    pub venues_created: usize,
    pub venues_skipped: usize,
}

/// Upserts the moods and inserts venues whose QR code (`VEN-001`, ...) is new.
pub async fn seed_store(store: &Store, source: &str) -> anyhow::Result<SeedReport> {
    let seed: SeedFile = toml::from_str(source).context("Failed to parse seed data")?;
    let mut report = SeedReport::default();

    for mood in &seed.moods {
        store.upsert_mood(&mood.name, &mood.slug).await?;
        report.moods += 1;
    }

    for (index, venue) in seed.venues.into_iter().enumerate() {
        let category = LocationCategory::parse(&venue.category).with_context(|| {
            format!("Unknown category '{}' for {}", venue.category, venue.name)
        })?;

        let neighborhood = venue
            .address
            .rsplit(',')
            .next()
            .map(str::trim)
            .unwrap_or_default()
            .to_string();

        let new_location = NewLocation {
            description: format!(
                "Popular {} in {}'s {} neighborhood.",
                venue.category, venue.city, neighborhood
            ),
            name: venue.name,
            category,
            status: LocationStatus::Approved,
            city: venue.city,
            address: venue.address,
            latitude: venue.latitude,
            longitude: venue.longitude,
            qr_code: format!("VEN-{:03}", index + 1),
            image_url: format!("https://picsum.photos/seed/venue{}/600/400", index + 1),
            vibe_match_score: venue.vibe_match_score.clamp(0, 100),
            mood_slugs: venue.moods,
        };

        if store.create_location_if_missing(new_location).await?.is_some() {
            report.venues_created += 1;
        } else {
            report.venues_skipped += 1;
        }
    }

    Ok(report)
}

pub async fn cmd_seed(config: &Config, file: Option<&Path>) -> anyhow::Result<()> {
    let source = match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read seed file: {}", path.display()))?,
        None => BUNDLED_SEED.to_string(),
    };

    let store = Store::new(&config.general.database_path).await?;
    let report = seed_store(&store, &source).await?;

    println!(
        "Seed complete: {} moods, {} venues created, {} already present.",
        report.moods, report.venues_created, report.venues_skipped
    );
    Ok(())
}
