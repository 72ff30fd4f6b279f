use std::collections::HashMap;

use serde::Serialize;

use crate::dataset::{Metric, Record};

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct SummaryStats {
    pub count: usize,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
}

impl SummaryStats {
    /// `None` when no record in `records` carries the metric.
    pub fn compute<'a, I>(records: I, metric: Metric) -> Option<SummaryStats>
    where
        I: IntoIterator<Item = &'a Record>,
    {
        let mut values = records.into_iter().filter_map(|r| r.metric(metric));
        let first = values.next()?;

        let mut stats = SummaryStats {
            count: 1,
            mean: 0.0,
            min: first,
            max: first,
        };
        let mut sum = first;
        for value in values {
            stats.count += 1;
            sum += value;
            stats.min = stats.min.min(value);
            stats.max = stats.max.max(value);
        }
        stats.mean = sum / stats.count as f64;

        Some(stats)
    }

    #[inline]
    pub fn is_degenerate(&self) -> bool {
        self.max == self.min
    }

    /// Position of `value` inside `[min, max]`, `None` on a degenerate range.
    pub fn normalize(&self, value: f64) -> Option<f64> {
        if self.is_degenerate() {
            None
        } else {
            Some((value - self.min) / (self.max - self.min))
        }
    }
}

/**
 * One record per distinct locality: the one with the highest metric value.
 *
 * Records without a locality or without the metric are skipped. On equal
 * maxima the earliest record in input order wins. The output lists
 * localities in order of first appearance.
 */
pub fn locality_reduce<'a, I>(records: I, metric: Metric) -> Vec<&'a Record>
where
    I: IntoIterator<Item = &'a Record>,
{
    let mut best: Vec<(&'a Record, f64)> = Vec::new();
    let mut slots: HashMap<&'a str, usize> = HashMap::new();

    for record in records {
        let (locality, value) = match (record.locality.as_deref(), record.metric(metric)) {
            (Some(locality), Some(value)) => (locality, value),
            _ => continue,
        };

        match slots.get(locality) {
            Some(&slot) => {
                if value > best[slot].1 {
                    best[slot] = (record, value);
                }
            }
            None => {
                slots.insert(locality, best.len());
                best.push((record, value));
            }
        }
    }

    best.into_iter().map(|(record, _)| record).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::explorer::filter::{filter, FilterState};
    use crate::explorer::fixtures::{record, sample_dataset};

    fn assert_close(actual: f64, expected: f64) {
        assert!((actual - expected).abs() < 0.01, "{} != {}", actual, expected);
    }

    #[test]
    fn it_should_summarize_non_missing_values() {
        let records = vec![
            record("A", "L1", Some(5000.0)),
            record("A", "L2", None),
            record("A", "L3", Some(7000.0)),
        ];

        let stats = SummaryStats::compute(&records, Metric::RatesPerSqft).unwrap();

        assert_eq!(stats.count, 2);
        assert_close(stats.mean, 6000.0);
        assert_eq!(stats.min, 5000.0);
        assert_eq!(stats.max, 7000.0);
    }

    #[test]
    fn it_should_be_undefined_for_an_empty_subset() {
        let records: Vec<Record> = Vec::new();
        assert_eq!(SummaryStats::compute(&records, Metric::RatesPerSqft), None);

        let all_missing = vec![record("A", "L1", None)];
        assert_eq!(SummaryStats::compute(&all_missing, Metric::RatesPerSqft), None);
    }

    #[test]
    fn it_should_flag_a_degenerate_range() {
        let records = vec![record("A", "L1", Some(4000.0)), record("A", "L2", Some(4000.0))];

        let stats = SummaryStats::compute(&records, Metric::RatesPerSqft).unwrap();

        assert!(stats.is_degenerate());
        assert_eq!(stats.normalize(4000.0), None);
    }

    #[test]
    fn it_should_keep_the_max_record_per_locality() {
        let dataset = sample_dataset();

        let reduced = locality_reduce(dataset.records(), Metric::RatesPerSqft);

        let localities: Vec<_> = reduced.iter().filter_map(|r| r.locality.as_deref()).collect();
        assert_eq!(
            localities,
            vec!["Indiranagar", "Whitefield", "Jayanagar", "Koramangala", "Baner", "Aundh", "Kharadi"]
        );
        assert_eq!(reduced[0].rates_per_sqft, Some(24000.0));
        assert_eq!(reduced[0].segment.as_deref(), Some("commercial"));

        for kept in &reduced {
            let max = dataset
                .records()
                .iter()
                .filter(|r| r.locality == kept.locality)
                .filter_map(|r| r.rates_per_sqft)
                .fold(std::f64::MIN, f64::max);
            assert_eq!(kept.rates_per_sqft, Some(max));
        }
    }

    #[test]
    fn it_should_break_ties_by_first_occurrence() {
        let mut first = record("A", "L1", Some(7000.0));
        first.segment = Some("first".to_owned());
        let mut second = record("A", "L1", Some(7000.0));
        second.segment = Some("second".to_owned());
        let records = vec![first, second];

        for _ in 0..3 {
            let reduced = locality_reduce(&records, Metric::RatesPerSqft);
            assert_eq!(reduced.len(), 1);
            assert_eq!(reduced[0].segment.as_deref(), Some("first"));
        }
    }

    #[test]
    fn it_should_skip_records_missing_locality_or_metric() {
        let mut no_locality = record("A", "L1", Some(9000.0));
        no_locality.locality = None;
        let records = vec![
            no_locality,
            record("A", "L2", None),
            record("A", "L3", Some(100.0)),
        ];

        let reduced = locality_reduce(&records, Metric::RatesPerSqft);

        assert_eq!(reduced.len(), 1);
        assert_eq!(reduced[0].locality.as_deref(), Some("L3"));
    }

    #[test]
    fn it_should_summarize_and_reduce_a_single_city() {
        let records = vec![
            record("A", "L1", Some(5000.0)),
            record("A", "L2", Some(7000.0)),
            record("A", "L3", Some(7000.0)),
        ];
        let mut state = FilterState::default();
        state.city = "A".into();

        let subset = filter(&records, &state);
        let stats = SummaryStats::compute(subset.iter().cloned(), state.metric).unwrap();
        let reduced = locality_reduce(subset.iter().cloned(), state.metric);

        assert_close(stats.mean, 6333.33);
        assert_eq!(stats.min, 5000.0);
        assert_eq!(stats.max, 7000.0);
        assert_eq!(reduced.len(), 3);
    }
}
