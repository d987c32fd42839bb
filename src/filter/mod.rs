//! Filtering of the parsed auth log
//!
//! Filters run in a fixed order: date selection, then count threshold, IP
//! and username filters, then geolocation of every surviving entry, and
//! finally the location filter. The cheap filters go first so that fewer
//! lookups reach the geolocation service.

use regex::Regex;
use thiserror::Error;

use crate::geolocation::Locator;
use crate::models::{AuthEntry, AuthLog, DatedEntries};

/// Errors raised while preparing the filter pipeline
#[derive(Error, Debug)]
pub enum FilterError {
    #[error("Invalid location pattern: {0}")]
    InvalidLocation(#[from] regex::Error),
}

/// Filter criteria; unset fields do not filter
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterConfig {
    /// Minimum attempt count (0 disables the filter)
    pub threshold: usize,
    /// Exact source address
    pub address: Option<String>,
    /// Username that must appear among the attempted usernames
    pub user: Option<String>,
    /// Regular expression matched against the composed location string
    pub location: Option<String>,
    /// Exact date token, e.g. "Jan 1"
    pub date: Option<String>,
}

/// Result of running the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOutcome {
    /// Filters were applied; the log holds the surviving entries
    Applied,
    /// A date filter was given and no bucket matched it; the log is empty
    NoDateMatch,
}

/// Applies a [`FilterConfig`] to an [`AuthLog`] in place
pub struct FilterPipeline<'a> {
    config: FilterConfig,
    location_re: Option<Regex>,
    locator: &'a dyn Locator,
}

impl<'a> FilterPipeline<'a> {
    /// Create a pipeline, compiling the location pattern up front
    pub fn new(config: FilterConfig, locator: &'a dyn Locator) -> Result<Self, FilterError> {
        let location_re = config
            .location
            .as_deref()
            .map(Regex::new)
            .transpose()?;

        Ok(FilterPipeline {
            config,
            location_re,
            locator,
        })
    }

    /// Run every configured filter over `log`
    pub fn apply(&self, log: &mut AuthLog) -> FilterOutcome {
        if let Some(ref date) = self.config.date {
            if !log.retain_date(date) {
                return FilterOutcome::NoDateMatch;
            }
        }

        for day in log.days_mut() {
            self.apply_entry_filters(day);
        }

        FilterOutcome::Applied
    }

    fn apply_entry_filters(&self, day: &mut DatedEntries) {
        let threshold = self.config.threshold;
        if threshold > 0 {
            let filtered = day.filter(|e| e.count >= threshold);
            day.set_entries(filtered);
        }

        if let Some(ref address) = self.config.address {
            let filtered = day.filter(|e| &e.ip == address);
            day.set_entries(filtered);
        }

        if let Some(ref user) = self.config.user {
            let filtered = day.filter(|e| e.has_user(user));
            day.set_entries(filtered);
        }

        let located = day.transform(|entry| self.locate(entry));
        day.set_entries(located);

        if let Some(ref re) = self.location_re {
            let filtered = day.filter(|e| re.is_match(&e.composed_location()));
            day.set_entries(filtered);
        }
    }

    /// Attach a location to `entry`; failures are logged and leave it unresolved
    fn locate(&self, mut entry: AuthEntry) -> AuthEntry {
        log::debug!("making geolocation request for IP '{}'", entry.ip);
        match self.locator.locate(&entry.ip) {
            Ok(location) => entry.location = Some(location),
            Err(e) => {
                log::warn!("error getting location data for IP '{}': {}", entry.ip, e);
            }
        }
        entry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geolocation::GeoError;
    use crate::input::parse_auth_log;
    use crate::models::Location;
    use std::cell::RefCell;

    /// Records every lookup and answers from a fixed table
    #[derive(Default)]
    struct StubLocator {
        calls: RefCell<Vec<String>>,
    }

    impl StubLocator {
        fn calls(&self) -> Vec<String> {
            self.calls.borrow().clone()
        }
    }

    impl Locator for StubLocator {
        fn locate(&self, ip: &str) -> Result<Location, GeoError> {
            self.calls.borrow_mut().push(ip.to_string());
            match ip {
                "10.0.0.1" => Ok(Location {
                    country: "Netherlands".to_string(),
                    region: "North Holland".to_string(),
                    city: "Amsterdam".to_string(),
                    latitude: 52.3676,
                    longitude: 4.9041,
                }),
                "10.0.0.2" => Ok(Location {
                    country: "Brazil".to_string(),
                    region: "Sao Paulo".to_string(),
                    city: "Sao Paulo".to_string(),
                    latitude: -23.5505,
                    longitude: -46.6333,
                }),
                _ => Err(GeoError::Lookup("private range".to_string())),
            }
        }
    }

    const SAMPLE: &str = "\
Jan 1 10:00:00 h sshd[1]: Failed password for admin from 10.0.0.1 port 22 ssh2
Jan 1 10:00:01 h sshd[1]: Failed password for root from 10.0.0.1 port 22 ssh2
Jan 1 10:00:02 h sshd[1]: Invalid user oracle from 10.0.0.3 port 22
Jan 2 10:00:00 h sshd[1]: Failed password for admin from 10.0.0.2 port 22 ssh2
Jan 2 10:00:01 h sshd[1]: Failed password for admin from 10.0.0.3 port 22 ssh2
Jan 2 10:00:02 h sshd[1]: Failed password for admin from 10.0.0.3 port 22 ssh2
";

    fn run(config: FilterConfig, locator: &StubLocator) -> (AuthLog, FilterOutcome) {
        let mut log = parse_auth_log(SAMPLE);
        let pipeline = FilterPipeline::new(config, locator).unwrap();
        let outcome = pipeline.apply(&mut log);
        (log, outcome)
    }

    fn ips(day: &DatedEntries) -> Vec<&str> {
        day.entries.iter().map(|e| e.ip.as_str()).collect()
    }

    fn strip_locations(mut log: AuthLog) -> AuthLog {
        for day in log.days_mut() {
            let stripped = day.transform(|mut e| {
                e.location = None;
                e
            });
            day.set_entries(stripped);
        }
        log
    }

    #[test]
    fn test_no_filters_locates_everything() {
        let locator = StubLocator::default();
        let (log, outcome) = run(FilterConfig::default(), &locator);

        assert_eq!(outcome, FilterOutcome::Applied);
        assert_eq!(log.entry_count(), 4);
        assert_eq!(locator.calls(), vec!["10.0.0.1", "10.0.0.3", "10.0.0.2", "10.0.0.3"]);

        let jan1 = log.day("Jan 1").unwrap();
        assert_eq!(jan1.entries[0].location.as_ref().unwrap().city, "Amsterdam");
        // failed lookups keep the entry, unresolved
        assert_eq!(jan1.entries[1].ip, "10.0.0.3");
        assert!(jan1.entries[1].location.is_none());
    }

    #[test]
    fn test_zero_threshold_is_identity() {
        let locator = StubLocator::default();
        let (filtered, _) = run(FilterConfig { threshold: 0, ..FilterConfig::default() }, &locator);
        assert_eq!(strip_locations(filtered), parse_auth_log(SAMPLE));
    }

    #[test]
    fn test_threshold_keeps_empty_buckets() {
        let text = "\
Jan 1 ... Failed password for admin from 10.0.0.1 port 22 ssh2
Jan 1 ... Failed password for root from 10.0.0.1 port 22 ssh2
Jan 2 ... Failed password for admin from 10.0.0.2 port 22 ssh2
";
        let locator = StubLocator::default();
        let mut log = parse_auth_log(text);
        let config = FilterConfig { threshold: 2, ..FilterConfig::default() };
        FilterPipeline::new(config, &locator).unwrap().apply(&mut log);

        assert_eq!(log.days().len(), 2);
        assert_eq!(ips(&log.days()[0]), vec!["10.0.0.1"]);
        assert_eq!(log.days()[0].entries[0].count, 2);
        assert_eq!(log.days()[1].date, "Jan 2");
        assert!(log.days()[1].is_empty());
        assert_eq!(locator.calls(), vec!["10.0.0.1"]);
    }

    #[test]
    fn test_date_filter() {
        let locator = StubLocator::default();
        let config = FilterConfig { date: Some("Jan 2".to_string()), ..FilterConfig::default() };
        let (log, outcome) = run(config, &locator);

        assert_eq!(outcome, FilterOutcome::Applied);
        assert_eq!(log.days().len(), 1);
        assert_eq!(ips(&log.days()[0]), vec!["10.0.0.2", "10.0.0.3"]);
    }

    #[test]
    fn test_date_miss_stops_pipeline() {
        let locator = StubLocator::default();
        let config = FilterConfig {
            date: Some("Feb 30".to_string()),
            threshold: 1,
            location: Some(".*".to_string()),
            ..FilterConfig::default()
        };
        let (log, outcome) = run(config, &locator);

        assert_eq!(outcome, FilterOutcome::NoDateMatch);
        assert!(log.is_empty());
        assert!(locator.calls().is_empty());
    }

    #[test]
    fn test_date_filter_is_textual() {
        let locator = StubLocator::default();
        let config = FilterConfig { date: Some("Jan 01".to_string()), ..FilterConfig::default() };
        let (_, outcome) = run(config, &locator);
        assert_eq!(outcome, FilterOutcome::NoDateMatch);
    }

    #[test]
    fn test_ip_filter() {
        let locator = StubLocator::default();
        let config = FilterConfig { address: Some("10.0.0.3".to_string()), ..FilterConfig::default() };
        let (log, _) = run(config, &locator);

        assert_eq!(ips(&log.days()[0]), vec!["10.0.0.3"]);
        assert_eq!(ips(&log.days()[1]), vec!["10.0.0.3"]);
        assert_eq!(log.days()[1].entries[0].count, 2);
    }

    #[test]
    fn test_user_filter() {
        let locator = StubLocator::default();
        let config = FilterConfig { user: Some("root".to_string()), ..FilterConfig::default() };
        let (log, _) = run(config, &locator);

        assert_eq!(ips(&log.days()[0]), vec!["10.0.0.1"]);
        assert!(log.days()[1].is_empty());
        assert_eq!(locator.calls(), vec!["10.0.0.1"]);
    }

    #[test]
    fn test_location_filter() {
        let locator = StubLocator::default();
        let config = FilterConfig { location: Some("Brazil|Amsterdam".to_string()), ..FilterConfig::default() };
        let (log, _) = run(config, &locator);

        assert_eq!(ips(&log.days()[0]), vec!["10.0.0.1"]);
        assert_eq!(ips(&log.days()[1]), vec!["10.0.0.2"]);
    }

    #[test]
    fn test_location_filter_sees_unresolved_entries() {
        let locator = StubLocator::default();
        let config = FilterConfig { location: Some(r"^, , ".to_string()), ..FilterConfig::default() };
        let (log, _) = run(config, &locator);

        assert_eq!(ips(&log.days()[0]), vec!["10.0.0.3"]);
        assert_eq!(ips(&log.days()[1]), vec!["10.0.0.3"]);
    }

    #[test]
    fn test_invalid_location_pattern() {
        let locator = StubLocator::default();
        let config = FilterConfig { location: Some("(unclosed".to_string()), ..FilterConfig::default() };
        assert!(matches!(
            FilterPipeline::new(config, &locator),
            Err(FilterError::InvalidLocation(_))
        ));
    }

    #[test]
    fn test_filters_commute() {
        let log = parse_auth_log(SAMPLE);
        let by_ip = |e: &AuthEntry| e.ip == "10.0.0.3";
        let by_count = |e: &AuthEntry| e.count >= 2;

        for day in log.days() {
            let mut ip_first = day.clone();
            ip_first.set_entries(ip_first.filter(by_ip));
            ip_first.set_entries(ip_first.filter(by_count));

            let mut count_first = day.clone();
            count_first.set_entries(count_first.filter(by_count));
            count_first.set_entries(count_first.filter(by_ip));

            assert_eq!(ip_first, count_first);
        }
    }

    #[test]
    fn test_combined_filters() {
        let locator = StubLocator::default();
        let config = FilterConfig {
            threshold: 2,
            user: Some("admin".to_string()),
            ..FilterConfig::default()
        };
        let (log, _) = run(config, &locator);

        assert_eq!(ips(&log.days()[0]), vec!["10.0.0.1"]);
        assert_eq!(ips(&log.days()[1]), vec!["10.0.0.3"]);
    }
}
