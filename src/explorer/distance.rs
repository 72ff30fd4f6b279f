use std::cmp::Ordering;
use std::fmt;

use serde::{Serialize, Serializer};

use super::aggregate::locality_reduce;
use super::ExplorerError;
use crate::dataset::{Dataset, Metric, Record};

pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance in km between two points given in degrees.
pub fn haversine(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (lat1, lon1, lat2, lon2) = (
        lat1.to_radians(),
        lon1.to_radians(),
        lat2.to_radians(),
        lon2.to_radians(),
    );
    let dlat = lat2 - lat1;
    let dlon = lon2 - lon1;

    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_KM * c
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DistanceBucket {
    ZeroToTwo,
    TwoToFive,
    FiveToTen,
    OverTen,
}

impl DistanceBucket {
    /// Lower bounds are inclusive: exactly 2.0 km is "2-5 km".
    pub fn of(distance_km: f64) -> DistanceBucket {
        if distance_km < 2.0 {
            DistanceBucket::ZeroToTwo
        } else if distance_km < 5.0 {
            DistanceBucket::TwoToFive
        } else if distance_km < 10.0 {
            DistanceBucket::FiveToTen
        } else {
            DistanceBucket::OverTen
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DistanceBucket::ZeroToTwo => "0-2 km",
            DistanceBucket::TwoToFive => "2-5 km",
            DistanceBucket::FiveToTen => "5-10 km",
            DistanceBucket::OverTen => ">10 km",
        }
    }
}

impl fmt::Display for DistanceBucket {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for DistanceBucket {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RankedLocality<'a> {
    pub record: &'a Record,
    pub value: f64,
    pub distance_km: f64,
    pub bucket: DistanceBucket,
}

/**
 * Localities of `records` (one per locality, see `locality_reduce`) ranked by
 * distance from `reference`, nearest first. The reference's own locality and
 * localities without valid coordinates are left out.
 */
pub fn distance_rank<'a, I>(
    records: I,
    reference: &Record,
    metric: Metric,
) -> Result<Vec<RankedLocality<'a>>, ExplorerError>
where
    I: IntoIterator<Item = &'a Record>,
{
    let origin = reference.coordinates().ok_or_else(|| {
        ExplorerError::ReferenceWithoutCoordinates(reference.locality.clone().unwrap_or_default())
    })?;

    let mut ranked: Vec<RankedLocality<'a>> = locality_reduce(records, metric)
        .into_iter()
        .filter(|r| reference.locality.is_none() || r.locality != reference.locality)
        .filter_map(|record| {
            let point = record.coordinates()?;
            let value = record.metric(metric)?;
            let distance_km = haversine(origin.y(), origin.x(), point.y(), point.x());
            Some(RankedLocality {
                record,
                value,
                distance_km,
                bucket: DistanceBucket::of(distance_km),
            })
        })
        .collect();

    ranked.sort_by(|a, b| {
        a.distance_km
            .partial_cmp(&b.distance_km)
            .unwrap_or(Ordering::Equal)
    });

    Ok(ranked)
}

/// Localities of `city` across the full dataset, sorted.
pub fn reference_candidates(dataset: &Dataset, city: &str) -> Vec<String> {
    let mut localities: Vec<String> = dataset
        .records()
        .iter()
        .filter(|r| r.city.as_deref() == Some(city))
        .filter_map(|r| r.locality.clone())
        .collect();
    localities.sort();
    localities.dedup();
    localities
}

/// First record of `locality` in `city`, in dataset order.
pub fn reference_record<'a>(dataset: &'a Dataset, city: &str, locality: &str) -> Option<&'a Record> {
    dataset
        .records()
        .iter()
        .find(|r| r.city.as_deref() == Some(city) && r.locality.as_deref() == Some(locality))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::explorer::fixtures::{located, record, sample_dataset};
    use geo::algorithm::haversine_distance::HaversineDistance;

    const INDIRANAGAR: (f64, f64) = (12.9784, 77.6408);
    const WHITEFIELD: (f64, f64) = (12.9698, 77.7500);

    #[test]
    fn it_should_be_zero_for_the_same_point() {
        for &(lat, lon) in &[INDIRANAGAR, (0.0, 0.0), (-89.9, 179.9), (51.5, -0.12)] {
            assert!(haversine(lat, lon, lat, lon).abs() < 1e-9);
        }
    }

    #[test]
    fn it_should_be_symmetric() {
        let pairs = [
            (INDIRANAGAR, WHITEFIELD),
            ((18.5590, 73.7868), (12.9250, 77.5938)),
            ((-33.86, 151.2), (40.71, -74.0)),
        ];
        for &((lat1, lon1), (lat2, lon2)) in &pairs {
            let there = haversine(lat1, lon1, lat2, lon2);
            let back = haversine(lat2, lon2, lat1, lon1);
            assert!((there - back).abs() <= 1e-9 * there.max(1.0));
        }
    }

    #[test]
    fn it_should_agree_with_the_geo_crate() {
        let (lat1, lon1) = INDIRANAGAR;
        let (lat2, lon2) = (18.5590, 73.7868);

        let ours = haversine(lat1, lon1, lat2, lon2);
        let theirs = geo::Point::new(lon1, lat1).haversine_distance(&geo::Point::new(lon2, lat2)) / 1000.0;

        assert!(ours > 700.0 && ours < 800.0);
        assert!((ours - theirs).abs() / theirs < 1e-5);
    }

    #[test]
    fn it_should_bucket_on_half_open_ranges() {
        assert_eq!(DistanceBucket::of(0.0).label(), "0-2 km");
        assert_eq!(DistanceBucket::of(1.999).label(), "0-2 km");
        assert_eq!(DistanceBucket::of(2.0).label(), "2-5 km");
        assert_eq!(DistanceBucket::of(4.999).label(), "2-5 km");
        assert_eq!(DistanceBucket::of(5.0).label(), "5-10 km");
        assert_eq!(DistanceBucket::of(9.999).label(), "5-10 km");
        assert_eq!(DistanceBucket::of(10.0).label(), ">10 km");
        assert_eq!(DistanceBucket::of(250.0).to_string(), ">10 km");
    }

    #[test]
    fn it_should_rank_localities_by_distance_without_the_reference() {
        let records = vec![
            located(record("A", "Ref", Some(100.0)), 12.97, 77.59),
            located(record("A", "Far", Some(300.0)), 13.10, 77.59),
            located(record("A", "Near", Some(200.0)), 12.98, 77.59),
            located(record("A", "Mid", Some(250.0)), 13.00, 77.59),
        ];

        let ranked = distance_rank(&records, &records[0], Metric::RatesPerSqft).unwrap();

        let names: Vec<_> = ranked.iter().filter_map(|r| r.record.locality.as_deref()).collect();
        assert_eq!(names, vec!["Near", "Mid", "Far"]);
        assert!(ranked.windows(2).all(|w| w[0].distance_km <= w[1].distance_km));
        assert_eq!(ranked[0].bucket, DistanceBucket::ZeroToTwo);
        assert_eq!(ranked[1].bucket, DistanceBucket::TwoToFive);
        assert_eq!(ranked[2].bucket, DistanceBucket::OverTen);
        assert_eq!(ranked[2].value, 300.0);
    }

    #[test]
    fn it_should_drop_localities_without_coordinates() {
        let mut lost = record("A", "Lost", Some(1.0));
        lost.latitude = None;
        let records = vec![
            located(record("A", "Ref", Some(100.0)), 12.97, 77.59),
            lost,
            located(record("A", "Kept", Some(5.0)), 12.99, 77.60),
        ];

        let ranked = distance_rank(&records, &records[0], Metric::RatesPerSqft).unwrap();

        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].record.locality.as_deref(), Some("Kept"));
    }

    #[test]
    fn it_should_fail_for_a_reference_without_coordinates() {
        let mut reference = record("A", "Ref", Some(1.0));
        reference.longitude = Some(400.0);

        let empty = Vec::<Record>::new();

        let result = distance_rank(&empty, &reference, Metric::RatesPerSqft);

        assert_eq!(result, Err(ExplorerError::ReferenceWithoutCoordinates("Ref".to_owned())));
    }

    #[test]
    fn it_should_pick_the_first_reference_row_of_the_city() {
        let dataset = sample_dataset();

        assert_eq!(
            reference_candidates(&dataset, "Bengaluru"),
            vec!["Indiranagar", "Jayanagar", "Koramangala", "Whitefield"]
        );

        let reference = reference_record(&dataset, "Bengaluru", "Indiranagar").unwrap();
        assert_eq!(reference.segment.as_deref(), Some("residential"));
        assert_eq!(reference_record(&dataset, "Pune", "Indiranagar"), None);
    }
}
