//! Derived statistics of a keyword record.
//!
//! All functions here are pure: they read a [`KeywordRecord`] and never
//! mutate it, so they can run again after any union or other in-memory edit.

use crate::aggregate::KeywordRecord;
use crate::error::Warning;
use crate::utils::{mean, population_std_dev};
use serde::Serialize;

/// Z-score at or above which a keyword is rising.
pub const RISING_THRESHOLD: f64 = 1.0;

/// Z-score below which a keyword is falling.
pub const FALLING_THRESHOLD: f64 = -1.0;

/// Direction of recent citation activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ZTrend {
    Rising,
    Steady,
    Falling,
}

impl ZTrend {
    pub fn from_z(z_score: f64) -> Self {
        if z_score >= RISING_THRESHOLD {
            ZTrend::Rising
        } else if z_score < FALLING_THRESHOLD {
            ZTrend::Falling
        } else {
            ZTrend::Steady
        }
    }
}

/// Standardized distance of recent citation activity from the yearly mean.
///
/// Mean and population standard deviation are taken over one value per year
/// present in `year_to_citations`. Recent activity averages the two years
/// before `reference_year`; when the older one is absent the newer one stands
/// alone. A missing newer year contributes 0 and is reported as a warning.
///
/// The score is 0 with fewer than two years of data or a flat series.
pub fn z_score(record: &KeywordRecord, reference_year: i32) -> (f64, Option<Warning>) {
    let yearly = &record.year_to_citations;
    if yearly.len() < 2 {
        return (0.0, None);
    }

    let values: Vec<f64> = yearly.values().map(|&count| count as f64).collect();
    let mean = mean(&values);
    let std_dev = population_std_dev(&values, mean);

    let last_year = reference_year.saturating_sub(1);
    let latest = yearly.get(&last_year).copied();
    let older = reference_year
        .checked_sub(2)
        .and_then(|year| yearly.get(&year))
        .copied();

    let warning = latest.is_none().then(|| Warning::MissingRecentYear {
        word: record.word.clone(),
        year: last_year,
    });

    let latest = latest.unwrap_or(0) as f64;
    let recent = match older {
        Some(older) => (latest + older as f64) / 2.0,
        None => latest,
    };

    if std_dev == 0.0 {
        return (0.0, warning);
    }
    ((recent - mean) / std_dev, warning)
}

/// Citations received in `year` by papers published one or two years
/// earlier, divided by the number of those papers. 0 without such papers.
pub fn impact_factor(record: &KeywordRecord, year: i32) -> f64 {
    let papers_before = |offset: i32| {
        year.checked_sub(offset)
            .and_then(|earlier| record.year_to_papers.get(&earlier))
            .map_or(0, |keys| keys.len())
    };
    let papers = papers_before(1) + papers_before(2);
    if papers == 0 {
        return 0.0;
    }
    let citations = record
        .year_to_impact_citations
        .get(&year)
        .copied()
        .unwrap_or(0);
    citations as f64 / papers as f64
}

/// One year of a keyword's trend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    pub year: i32,
    pub citations: u64,
    /// Papers with the keyword published this year
    pub new_papers: usize,
    pub impact_factor: f64,
}

/// Year-by-year trend of a record, from its first to its last citation year.
///
/// Years without citations are filled with 0. `reference_year` is skipped as
/// it is still incomplete. The impact factor is 0 for the first two years of
/// the series, whose two-year window starts before the data does.
pub fn trend_series(record: &KeywordRecord, reference_year: i32) -> Vec<TrendPoint> {
    let (Some(&first), Some(&last)) = (
        record.year_to_citations.keys().next(),
        record.year_to_citations.keys().next_back(),
    ) else {
        return Vec::new();
    };

    (first..=last)
        .filter(|&year| year != reference_year)
        .map(|year| TrendPoint {
            year,
            citations: record.year_to_citations.get(&year).copied().unwrap_or(0),
            new_papers: record.year_to_papers.get(&year).map_or(0, |keys| keys.len()),
            impact_factor: if i64::from(year) - i64::from(first) >= 2 {
                impact_factor(record, year)
            } else {
                0.0
            },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::*;
    use std::collections::{BTreeMap, BTreeSet};

    fn record(yearly: &[(i32, u64)]) -> KeywordRecord {
        let mut record = KeywordRecord::new("kw");
        record.year_to_citations = yearly.iter().copied().collect();
        record.total_citations = yearly.iter().map(|&(_, c)| c).sum();
        record
    }

    fn keys(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[rstest]
    #[case(&[])]
    #[case(&[(2022, 40)])]
    fn test_z_score_needs_two_years(#[case] yearly: &[(i32, u64)]) {
        assert_eq!(z_score(&record(yearly), 2023), (0.0, None));
    }

    #[test]
    fn test_z_score_flat_series_is_zero() {
        let (z, warning) = z_score(&record(&[(2021, 5), (2022, 5)]), 2023);
        assert_eq!(z, 0.0);
        assert_eq!(warning, None);
    }

    #[test]
    fn test_z_score_averages_last_two_years() {
        // values 2, 4, 6, 8: mean 5, population std dev sqrt(5)
        let record = record(&[(2019, 2), (2020, 4), (2021, 6), (2022, 8)]);
        let (z, warning) = z_score(&record, 2023);
        assert_eq!(warning, None);
        assert!((z - 2.0 / 5f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_z_score_without_older_year_uses_latest() {
        // values 0, 10: mean 5, std dev 5; recent = 10
        let record = record(&[(2015, 0), (2022, 10)]);
        let (z, _) = z_score(&record, 2023);
        assert!((z - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_z_score_missing_latest_year_warns() {
        // values 10, 0: mean 5, std dev 5; recent = (0 + 10) / 2
        let record = record(&[(2021, 10), (2015, 0)]);
        let (z, warning) = z_score(&record, 2023);
        assert!(z.abs() < 1e-12);
        assert_eq!(
            warning,
            Some(Warning::MissingRecentYear {
                word: "kw".to_string(),
                year: 2022
            })
        );
    }

    #[test]
    fn test_z_score_order_independent() {
        let forward = record(&[(2018, 3), (2019, 1), (2020, 4), (2021, 1), (2022, 5)]);
        let backward = record(&[(2022, 5), (2021, 1), (2020, 4), (2019, 1), (2018, 3)]);
        let (a, _) = z_score(&forward, 2023);
        let (b, _) = z_score(&backward, 2023);
        assert!((a - b).abs() < 1e-12);
    }

    #[rstest]
    #[case(1.0, ZTrend::Rising)]
    #[case(2.5, ZTrend::Rising)]
    #[case(0.99, ZTrend::Steady)]
    #[case(-1.0, ZTrend::Steady)]
    #[case(-1.01, ZTrend::Falling)]
    fn test_z_trend(#[case] z: f64, #[case] expected: ZTrend) {
        assert_eq!(ZTrend::from_z(z), expected);
    }

    #[test]
    fn test_impact_factor() {
        let mut record = record(&[]);
        record.year_to_papers =
            BTreeMap::from([(2020, keys(&["a", "b"])), (2021, keys(&["c"]))]);
        record.year_to_impact_citations = BTreeMap::from([(2022, 9)]);

        assert_eq!(impact_factor(&record, 2022), 3.0);
        // 2023 window only holds 2021's single paper and no citations.
        assert_eq!(impact_factor(&record, 2023), 0.0);
        assert_eq!(impact_factor(&record, 2020), 0.0);
    }

    #[test]
    fn test_impact_factor_at_year_bounds() {
        let mut record = record(&[]);
        record.year_to_papers = BTreeMap::from([(i32::MIN, keys(&["a"]))]);
        record.year_to_impact_citations = BTreeMap::from([(i32::MIN, 5)]);

        assert_eq!(impact_factor(&record, i32::MIN), 0.0);
        assert_eq!(impact_factor(&record, i32::MIN + 1), 0.0);
        assert_eq!(impact_factor(&record, i32::MAX), 0.0);
    }

    #[test]
    fn test_trend_series_at_year_bounds() {
        let record = record(&[(i32::MAX - 1, 3), (i32::MAX, 4)]);
        let series = trend_series(&record, 2023);
        assert_eq!(series.len(), 2);
        assert_eq!(series[1].impact_factor, 0.0);
        let (_, warning) = z_score(&record, i32::MIN);
        assert!(matches!(warning, Some(Warning::MissingRecentYear { year: i32::MIN, .. })));
    }

    #[test]
    fn test_trend_series_fills_gaps_and_skips_reference_year() {
        let mut record = record(&[(2018, 1), (2020, 4), (2021, 6), (2023, 2)]);
        record.year_to_papers = BTreeMap::from([(2018, keys(&["a"])), (2019, keys(&["b"]))]);
        record.year_to_impact_citations = BTreeMap::from([(2020, 4), (2021, 3)]);

        let series = trend_series(&record, 2023);
        let years: Vec<i32> = series.iter().map(|p| p.year).collect();
        assert_eq!(years, vec![2018, 2019, 2020, 2021, 2022]);

        assert_eq!(series[1].citations, 0);
        assert_eq!(series[1].new_papers, 1);
        assert_eq!(series[0].impact_factor, 0.0);
        assert_eq!(series[1].impact_factor, 0.0);
        // 2020: 4 citations over papers of 2018 and 2019
        assert_eq!(series[2].impact_factor, 2.0);
        // 2021: 3 citations over the 2019 paper
        assert_eq!(series[3].impact_factor, 3.0);
    }

    #[test]
    fn test_trend_series_empty_record() {
        assert!(trend_series(&record(&[]), 2023).is_empty());
    }
}
