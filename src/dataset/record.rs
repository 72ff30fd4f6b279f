use std::fmt;
use std::str::FromStr;

use failure::Fail;

pub const LATITUDE_RANGE: (f64, f64) = (-90.0, 90.0);
pub const LONGITUDE_RANGE: (f64, f64) = (-180.0, 180.0);

/// One property listing. Every column may be missing in the source sheet.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Record {
    pub city: Option<String>,
    pub location: Option<String>,
    pub locality: Option<String>,
    pub segment: Option<String>,
    pub property_type: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub rental_yields: Option<f64>,
    pub rates_per_sqft: Option<f64>,
}

/// Categorical columns that can be filtered on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Field {
    City,
    Location,
    Locality,
    Segment,
    PropertyType,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Metric {
    #[serde(rename = "rates_per_sqft")]
    RatesPerSqft,
    #[serde(rename = "rental_yields")]
    RentalYields,
}

#[derive(Debug, Fail, PartialEq)]
#[fail(display = "Unknown metric: {} (expected rates_per_sqft or rental_yields)", _0)]
pub struct UnknownMetric(pub String);

impl Metric {
    pub const ALL: [Metric; 2] = [Metric::RentalYields, Metric::RatesPerSqft];

    pub fn name(&self) -> &'static str {
        match self {
            Metric::RatesPerSqft => "rates_per_sqft",
            Metric::RentalYields => "rental_yields",
        }
    }
}

impl Default for Metric {
    fn default() -> Metric {
        Metric::RatesPerSqft
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Metric {
    type Err = UnknownMetric;

    fn from_str(s: &str) -> Result<Metric, UnknownMetric> {
        match s.trim() {
            "rates_per_sqft" => Ok(Metric::RatesPerSqft),
            "rental_yields" => Ok(Metric::RentalYields),
            other => Err(UnknownMetric(other.to_owned())),
        }
    }
}

#[inline]
fn in_range(value: f64, (min, max): (f64, f64)) -> bool {
    value.is_finite() && value >= min && value <= max
}

impl Record {
    pub fn field(&self, field: Field) -> Option<&str> {
        let value = match field {
            Field::City => &self.city,
            Field::Location => &self.location,
            Field::Locality => &self.locality,
            Field::Segment => &self.segment,
            Field::PropertyType => &self.property_type,
        };
        value.as_ref().map(String::as_str)
    }

    #[inline]
    pub fn metric(&self, metric: Metric) -> Option<f64> {
        let value = match metric {
            Metric::RatesPerSqft => self.rates_per_sqft,
            Metric::RentalYields => self.rental_yields,
        };
        value.filter(|v| !v.is_nan())
    }

    /**
     * Point (x = longitude, y = latitude), only for records usable on a map
     * or in a distance computation.
     */
    pub fn coordinates(&self) -> Option<geo::Point<f64>> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) if in_range(lat, LATITUDE_RANGE) && in_range(lon, LONGITUDE_RANGE) => {
                Some(geo::Point::new(lon, lat))
            }
            _ => None,
        }
    }
}

/// The full, read-only record set of a session, in source order.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Dataset {
    records: Vec<Record>,
}

impl Dataset {
    pub fn new(records: Vec<Record>) -> Dataset {
        Dataset { records }
    }

    #[inline]
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_should_parse_both_metrics() {
        assert_eq!("rates_per_sqft".parse::<Metric>(), Ok(Metric::RatesPerSqft));
        assert_eq!(" rental_yields".parse::<Metric>(), Ok(Metric::RentalYields));
        assert_eq!(
            "price".parse::<Metric>(),
            Err(UnknownMetric("price".to_owned()))
        );
    }

    #[test]
    fn it_should_default_to_rates_per_sqft() {
        assert_eq!(Metric::default(), Metric::RatesPerSqft);
    }

    #[test]
    fn it_should_reject_out_of_range_coordinates() {
        let mut record = Record {
            latitude: Some(12.97),
            longitude: Some(77.59),
            ..Record::default()
        };
        let point = record.coordinates().unwrap();
        assert_eq!(point.x(), 77.59);
        assert_eq!(point.y(), 12.97);

        record.latitude = Some(91.0);
        assert_eq!(record.coordinates(), None);

        record.latitude = Some(12.97);
        record.longitude = Some(-180.5);
        assert_eq!(record.coordinates(), None);

        record.longitude = None;
        assert_eq!(record.coordinates(), None);
    }

    #[test]
    fn it_should_treat_nan_metrics_as_missing() {
        let record = Record {
            rates_per_sqft: Some(std::f64::NAN),
            rental_yields: Some(0.03),
            ..Record::default()
        };
        assert_eq!(record.metric(Metric::RatesPerSqft), None);
        assert_eq!(record.metric(Metric::RentalYields), Some(0.03));
    }

    #[test]
    fn it_should_report_an_empty_dataset() {
        assert!(Dataset::new(Vec::new()).is_empty());
        assert!(!Dataset::new(vec![Record::default()]).is_empty());
    }
}
