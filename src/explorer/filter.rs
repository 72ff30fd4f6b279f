use std::collections::BTreeSet;
use std::fmt;

use serde::{Serialize, Serializer};

use crate::dataset::{Dataset, Field, Metric, Record};

pub const ALL_LABEL: &str = "All";

/// One dropdown value: either the implicit "All" or a concrete value.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Selection {
    All,
    Value(String),
}

impl Selection {
    /// `None`, blank and "All" all mean no predicate.
    pub fn parse(value: Option<&str>) -> Selection {
        match value.map(str::trim) {
            None | Some("") | Some(ALL_LABEL) => Selection::All,
            Some(v) => Selection::Value(v.to_owned()),
        }
    }

    pub fn value(&self) -> Option<&str> {
        match self {
            Selection::All => None,
            Selection::Value(v) => Some(v),
        }
    }

    #[inline]
    pub fn is_all(&self) -> bool {
        *self == Selection::All
    }

    /// A missing field never matches a concrete value.
    #[inline]
    pub fn matches(&self, value: Option<&str>) -> bool {
        match self {
            Selection::All => true,
            Selection::Value(wanted) => value == Some(wanted.as_str()),
        }
    }
}

impl Default for Selection {
    fn default() -> Selection {
        Selection::All
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.value().unwrap_or(ALL_LABEL))
    }
}

impl Serialize for Selection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'a> From<&'a str> for Selection {
    fn from(value: &'a str) -> Selection {
        Selection::parse(Some(value))
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct FilterState {
    pub city: Selection,
    pub location: Selection,
    pub locality: Selection,
    pub segment: Selection,
    pub property_type: Selection,
    pub metric: Metric,
}

impl FilterState {
    pub fn selection(&self, field: Field) -> &Selection {
        match field {
            Field::City => &self.city,
            Field::Location => &self.location,
            Field::Locality => &self.locality,
            Field::Segment => &self.segment,
            Field::PropertyType => &self.property_type,
        }
    }

    fn selection_mut(&mut self, field: Field) -> &mut Selection {
        match field {
            Field::City => &mut self.city,
            Field::Location => &mut self.location,
            Field::Locality => &mut self.locality,
            Field::Segment => &mut self.segment,
            Field::PropertyType => &mut self.property_type,
        }
    }

    pub fn matches(&self, record: &Record) -> bool {
        [
            Field::City,
            Field::Location,
            Field::Locality,
            Field::Segment,
            Field::PropertyType,
        ]
        .iter()
        .all(|field| self.selection(*field).matches(record.field(*field)))
    }

    /**
     * Set one selection and re-validate the City -> Location -> Locality
     * hierarchy against the full dataset. A location or locality outside the
     * candidates of the coarser selections is reset as well, including the
     * one just selected. Returns the fields that were reset to "All".
     */
    pub fn select(&mut self, dataset: &Dataset, field: Field, selection: Selection) -> Vec<Field> {
        *self.selection_mut(field) = selection;
        self.normalize(dataset)
    }

    pub fn normalize(&mut self, dataset: &Dataset) -> Vec<Field> {
        let mut reset = Vec::new();

        if let Some(location) = self.location.value() {
            if !location_candidates(dataset, &self.city).iter().any(|c| c == location) {
                reset.push(Field::Location);
            }
        }
        if reset.contains(&Field::Location) {
            self.location = Selection::All;
        }

        if let Some(locality) = self.locality.value() {
            if !locality_candidates(dataset, &self.city, &self.location)
                .iter()
                .any(|c| c == locality)
            {
                reset.push(Field::Locality);
            }
        }
        if reset.contains(&Field::Locality) {
            self.locality = Selection::All;
        }

        reset
    }
}

/// Conjunctive equality filter. Keeps the input order.
pub fn filter<'a, I>(records: I, state: &FilterState) -> Vec<&'a Record>
where
    I: IntoIterator<Item = &'a Record>,
{
    records.into_iter().filter(|r| state.matches(r)).collect()
}

fn distinct_values<'a, I>(records: I, field: Field) -> Vec<String>
where
    I: IntoIterator<Item = &'a Record>,
{
    records
        .into_iter()
        .filter_map(|r| r.field(field))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(String::from)
        .collect()
}

pub fn city_candidates(dataset: &Dataset) -> Vec<String> {
    distinct_values(dataset.records(), Field::City)
}

pub fn location_candidates(dataset: &Dataset, city: &Selection) -> Vec<String> {
    let records = dataset.records().iter().filter(|r| city.matches(r.city.as_deref()));
    distinct_values(records, Field::Location)
}

pub fn locality_candidates(dataset: &Dataset, city: &Selection, location: &Selection) -> Vec<String> {
    let records = dataset
        .records()
        .iter()
        .filter(|r| city.matches(r.city.as_deref()) && location.matches(r.location.as_deref()));
    distinct_values(records, Field::Locality)
}

pub fn segment_candidates(dataset: &Dataset) -> Vec<String> {
    distinct_values(dataset.records(), Field::Segment)
}

pub fn property_type_candidates(dataset: &Dataset) -> Vec<String> {
    distinct_values(dataset.records(), Field::PropertyType)
}

/// Everything a filter panel needs to draw its dropdowns.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Candidates {
    pub cities: Vec<String>,
    pub locations: Vec<String>,
    pub localities: Vec<String>,
    pub segments: Vec<String>,
    pub property_types: Vec<String>,
    pub metrics: Vec<Metric>,
}

impl Candidates {
    pub fn for_state(dataset: &Dataset, state: &FilterState) -> Candidates {
        Candidates {
            cities: city_candidates(dataset),
            locations: location_candidates(dataset, &state.city),
            localities: locality_candidates(dataset, &state.city, &state.location),
            segments: segment_candidates(dataset),
            property_types: property_type_candidates(dataset),
            metrics: Metric::ALL.to_vec(),
        }
    }
}
