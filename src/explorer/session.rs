use log::{debug, info, warn};

use super::distance::reference_candidates;
use super::filter::{city_candidates, property_type_candidates, FilterState, Selection};
use super::ExplorerError;
use crate::dataset::{Dataset, Field, Metric};

pub const DEFAULT_PROPERTY_TYPE: &str = "apartment";

/**
 * State owned by one user session.
 *
 * Nothing can be filtered until a default city has been chosen. After that
 * the session holds the current filter selections and the reference
 * locality of the distance comparison.
 */
#[derive(Clone, Debug, PartialEq)]
pub struct Session {
    default_city: Option<String>,
    state: FilterState,
    reference: Option<String>,
}

impl Session {
    pub fn new(dataset: &Dataset) -> Session {
        let mut state = FilterState::default();
        if property_type_candidates(dataset)
            .iter()
            .any(|t| t == DEFAULT_PROPERTY_TYPE)
        {
            state.property_type = Selection::Value(DEFAULT_PROPERTY_TYPE.to_owned());
        }

        Session {
            default_city: None,
            state,
            reference: None,
        }
    }

    #[inline]
    pub fn is_onboarded(&self) -> bool {
        self.default_city.is_some()
    }

    pub fn default_city(&self) -> Option<&str> {
        self.default_city.as_deref()
    }

    pub fn choose_default_city(&mut self, dataset: &Dataset, city: &str) -> Result<(), ExplorerError> {
        if !city_candidates(dataset).iter().any(|c| c == city) {
            return Err(ExplorerError::UnknownCity(city.to_owned()));
        }

        info!("Default city set to {}", city);
        self.default_city = Some(city.to_owned());
        self.select(dataset, Field::City, Selection::Value(city.to_owned()))
    }

    pub fn filter_state(&self) -> Result<&FilterState, ExplorerError> {
        match self.default_city {
            Some(_) => Ok(&self.state),
            None => Err(ExplorerError::CityNotChosen),
        }
    }

    pub fn select(&mut self, dataset: &Dataset, field: Field, selection: Selection) -> Result<(), ExplorerError> {
        if !self.is_onboarded() {
            return Err(ExplorerError::CityNotChosen);
        }

        let reset = self.state.select(dataset, field, selection);
        if reset.contains(&field) {
            warn!("{:?} is not offered for the current selections, using All", field);
        }
        if !reset.is_empty() {
            debug!("Selections reset to All: {:?}", reset);
        }

        let reference_still_offered = match self.reference.as_deref() {
            Some(reference) => self.reference_options(dataset).iter().any(|c| c == reference),
            None => true,
        };
        if !reference_still_offered {
            debug!("Reference locality {:?} no longer offered", self.reference);
            self.reference = None;
        }

        Ok(())
    }

    pub fn select_metric(&mut self, metric: Metric) {
        self.state.metric = metric;
    }

    /// Offered only once both a city and a property type are selected.
    pub fn reference_options(&self, dataset: &Dataset) -> Vec<String> {
        match (self.state.city.value(), self.state.property_type.is_all()) {
            (Some(city), false) => reference_candidates(dataset, city),
            _ => Vec::new(),
        }
    }

    pub fn choose_reference(&mut self, dataset: &Dataset, locality: &str) -> Result<(), ExplorerError> {
        if !self.is_onboarded() {
            return Err(ExplorerError::CityNotChosen);
        }

        let options = self.reference_options(dataset);
        if options.is_empty() {
            return Err(ExplorerError::ReferenceUnavailable);
        }
        if !options.iter().any(|c| c == locality) {
            return Err(ExplorerError::UnknownReference(locality.to_owned()));
        }

        self.reference = Some(locality.to_owned());
        Ok(())
    }

    /// The chosen reference, or the first offered one.
    pub fn reference(&self, dataset: &Dataset) -> Option<String> {
        self.reference
            .clone()
            .or_else(|| self.reference_options(dataset).into_iter().next())
    }
}
