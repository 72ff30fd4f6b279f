use log::debug;
use serde::Serialize;

use super::aggregate::{locality_reduce, SummaryStats};
use super::distance::{distance_rank, reference_record, DistanceBucket};
use super::filter::{filter, FilterState};
use super::session::Session;
use super::ExplorerError;
use crate::dataset::{Dataset, Metric, Record};

const DEFAULT_PROPERTY_VALUE: &str = "-";
const UNKNOWN_LOCATION: &str = "Unknown";

pub const MARKER_BASE_RADIUS: f64 = 5.0;
pub const MARKER_RADIUS_SPAN: f64 = 15.0;
pub const MARKER_BASE_INTENSITY: f64 = 50.0;
pub const MARKER_INTENSITY_SPAN: f64 = 205.0;

const NO_DATA_MESSAGE: &str = "No data for selected filters.";
const EMPTY_MAP_MESSAGE: &str = "Adjust filters to view properties on the map.";
const NEEDS_CITY_AND_TYPE_MESSAGE: &str = "Select a specific City & Property Type to view the bar chart.";
const NO_CHART_DATA_MESSAGE: &str = "No data available for the selected filters.";

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SummaryCard {
    pub label: &'static str,
    pub value: f64,
    pub display: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SummaryView {
    Cards { count: usize, cards: Vec<SummaryCard> },
    NoData { message: &'static str },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MapMarker {
    pub latitude: f64,
    pub longitude: f64,
    pub locality: String,
    pub value: f64,
    pub display: String,
    pub radius: f64,
    pub color: String,
    pub popup: String,
    pub tooltip: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum MapView {
    Markers {
        center_latitude: f64,
        center_longitude: f64,
        markers: Vec<MapMarker>,
    },
    Empty { message: &'static str },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LocalityBar {
    pub locality: String,
    pub location: String,
    pub value: f64,
    pub label: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DistanceBar {
    pub locality: String,
    pub value: f64,
    pub label: String,
    pub distance_km: f64,
    pub bucket: DistanceBucket,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ChartView<T> {
    Bars { title: String, bars: Vec<T> },
    NeedsCityAndType { message: &'static str },
    NoData { message: &'static str },
    Unavailable { message: String },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RenderModel {
    pub filters: FilterState,
    pub metric: Metric,
    pub record_count: usize,
    pub reference_locality: Option<String>,
    pub summary: SummaryView,
    pub map: MapView,
    pub locality_chart: ChartView<LocalityBar>,
    pub distance_chart: ChartView<DistanceBar>,
}

#[inline]
fn text_or_default(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or(DEFAULT_PROPERTY_VALUE)
}

pub fn summary_view(stats: Option<&SummaryStats>, metric: Metric) -> SummaryView {
    match stats {
        Some(stats) => SummaryView::Cards {
            count: stats.count,
            cards: vec![
                ("Average", stats.mean),
                ("Minimum", stats.min),
                ("Maximum", stats.max),
            ]
            .into_iter()
            .map(|(label, value)| SummaryCard {
                label,
                value,
                display: metric.format(value),
            })
            .collect(),
        },
        None => SummaryView::NoData {
            message: NO_DATA_MESSAGE,
        },
    }
}

/// Marker radius and color; a degenerate range falls back to the base values.
pub fn marker_style(stats: &SummaryStats, value: f64) -> (f64, String) {
    let (radius, intensity) = match stats.normalize(value) {
        Some(norm) => (
            MARKER_BASE_RADIUS + norm * MARKER_RADIUS_SPAN,
            (MARKER_BASE_INTENSITY + norm * MARKER_INTENSITY_SPAN) as u8,
        ),
        None => (MARKER_BASE_RADIUS, MARKER_BASE_INTENSITY as u8),
    };
    (radius, format!("rgb({},{},{})", 255 - intensity, 50, intensity))
}

fn popup_text(record: &Record, metric: Metric, display: &str) -> String {
    format!(
        "{}\nCity: {}\nLocation: {}\nSegment: {}\nType: {}\n{}: {}",
        text_or_default(&record.locality),
        text_or_default(&record.city),
        text_or_default(&record.location),
        text_or_default(&record.segment),
        text_or_default(&record.property_type),
        metric,
        display
    )
}

pub fn map_view(subset: &[&Record], stats: Option<&SummaryStats>, metric: Metric) -> MapView {
    let stats = match stats {
        Some(stats) => stats,
        None => {
            return MapView::Empty {
                message: EMPTY_MAP_MESSAGE,
            }
        }
    };

    let markers: Vec<MapMarker> = subset
        .iter()
        .filter_map(|record| {
            let point = record.coordinates()?;
            let value = record.metric(metric)?;
            let display = metric.format(value);
            let (radius, color) = marker_style(stats, value);
            let locality = text_or_default(&record.locality);

            Some(MapMarker {
                latitude: point.y(),
                longitude: point.x(),
                locality: locality.to_owned(),
                value,
                radius,
                color,
                popup: popup_text(record, metric, &display),
                tooltip: format!("{} – {}", locality, display),
                display,
            })
        })
        .collect();

    if markers.is_empty() {
        debug!("No record of {} has both coordinates and {}", subset.len(), metric);
        return MapView::Empty {
            message: EMPTY_MAP_MESSAGE,
        };
    }

    let count = markers.len() as f64;
    MapView::Markers {
        center_latitude: markers.iter().map(|m| m.latitude).sum::<f64>() / count,
        center_longitude: markers.iter().map(|m| m.longitude).sum::<f64>() / count,
        markers,
    }
}

/// Bar charts need a concrete city and property type, and some data.
fn chart_precondition<T>(state: &FilterState, subset: &[&Record]) -> Option<ChartView<T>> {
    if state.city.is_all() || state.property_type.is_all() {
        Some(ChartView::NeedsCityAndType {
            message: NEEDS_CITY_AND_TYPE_MESSAGE,
        })
    } else if subset.is_empty() {
        Some(ChartView::NoData {
            message: NO_CHART_DATA_MESSAGE,
        })
    } else {
        None
    }
}

pub fn locality_chart(state: &FilterState, subset: &[&Record]) -> ChartView<LocalityBar> {
    if let Some(view) = chart_precondition(state, subset) {
        return view;
    }

    let metric = state.metric;
    let mut bars: Vec<LocalityBar> = locality_reduce(subset.iter().cloned(), metric)
        .into_iter()
        .filter_map(|record| {
            let value = record.metric(metric)?;
            Some(LocalityBar {
                locality: record.locality.clone()?,
                location: record.location.clone().unwrap_or_else(|| UNKNOWN_LOCATION.to_owned()),
                value,
                label: metric.format(value),
            })
        })
        .collect();
    bars.sort_by(|a, b| b.value.partial_cmp(&a.value).unwrap_or(std::cmp::Ordering::Equal));

    ChartView::Bars {
        title: format!("{} by Locality (sorted by {})", metric, metric),
        bars,
    }
}

pub fn distance_chart(
    dataset: &Dataset,
    state: &FilterState,
    subset: &[&Record],
    reference: Option<&str>,
) -> ChartView<DistanceBar> {
    if let Some(view) = chart_precondition(state, subset) {
        return view;
    }

    let (city, reference) = match (state.city.value(), reference) {
        (Some(city), Some(reference)) => (city, reference),
        _ => {
            return ChartView::NoData {
                message: NO_CHART_DATA_MESSAGE,
            }
        }
    };
    let reference_row = match reference_record(dataset, city, reference) {
        Some(record) => record,
        None => {
            return ChartView::Unavailable {
                message: ExplorerError::UnknownReference(reference.to_owned()).to_string(),
            }
        }
    };

    let metric = state.metric;
    match distance_rank(subset.iter().cloned(), reference_row, metric) {
        Ok(ranked) => ChartView::Bars {
            title: format!("{} vs Distance from {}", metric, reference),
            bars: ranked
                .into_iter()
                .map(|entry| DistanceBar {
                    locality: text_or_default(&entry.record.locality).to_owned(),
                    value: entry.value,
                    label: metric.format(entry.value),
                    distance_km: entry.distance_km,
                    bucket: entry.bucket,
                })
                .collect(),
        },
        Err(err) => ChartView::Unavailable {
            message: err.to_string(),
        },
    }
}

/**
 * The whole dashboard for the current session:
 * state -> filtered subset -> aggregates -> render model.
 */
pub fn render(dataset: &Dataset, session: &Session) -> Result<RenderModel, ExplorerError> {
    let state = session.filter_state()?;
    let metric = state.metric;

    let subset = filter(dataset.records(), state);
    debug!("{} of {} records match {:?}", subset.len(), dataset.len(), state);

    let stats = SummaryStats::compute(subset.iter().cloned(), metric);
    let reference = session.reference(dataset);

    Ok(RenderModel {
        filters: state.clone(),
        metric,
        record_count: subset.len(),
        summary: summary_view(stats.as_ref(), metric),
        map: map_view(&subset, stats.as_ref(), metric),
        locality_chart: locality_chart(state, &subset),
        distance_chart: distance_chart(dataset, state, &subset, reference.as_deref()),
        reference_locality: reference,
    })
}
