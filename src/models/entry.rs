use serde::{Deserialize, Serialize};

/// Geographic location resolved for a source IP
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Location {
    pub country: String,
    pub region: String,
    pub city: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    /// Compose the "City, Region, Country (lat, long)" string used for display
    /// and location filtering
    pub fn compose(&self) -> String {
        format!(
            "{}, {}, {} ({:.6}, {:.6})",
            self.city, self.region, self.country, self.latitude, self.longitude
        )
    }
}

/// A single authentication attempt extracted from one log line
#[derive(Debug, Clone, PartialEq)]
pub struct Attempt {
    pub date: String,
    pub ip: String,
    pub user: Option<String>,
}

/// Login attempts from one source IP on one day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthEntry {
    pub ip: String,
    #[serde(default)]
    pub location: Option<Location>,
    pub count: usize,
    #[serde(default)]
    pub usernames: Vec<String>,
}

impl AuthEntry {
    /// Create an entry for the first attempt seen from `ip`
    pub fn new(ip: &str, user: Option<&str>) -> Self {
        AuthEntry {
            ip: ip.to_string(),
            location: None,
            count: 1,
            usernames: user.map(|u| vec![u.to_string()]).unwrap_or_default(),
        }
    }

    /// Count one more attempt, remembering the username if it is new
    pub fn add_attempt(&mut self, user: Option<&str>) {
        self.count += 1;
        if let Some(user) = user {
            if !self.has_user(user) {
                self.usernames.push(user.to_string());
            }
        }
    }

    pub fn has_user(&self, user: &str) -> bool {
        self.usernames.iter().any(|u| u == user)
    }

    /// Composed location string; unresolved locations render as the zero value
    pub fn composed_location(&self) -> String {
        match &self.location {
            Some(location) => location.compose(),
            None => Location::default().compose(),
        }
    }
}

/// All entries recorded for a single date token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatedEntries {
    pub date: String,
    #[serde(default)]
    pub entries: Vec<AuthEntry>,
}

impl DatedEntries {
    pub fn new(date: &str) -> Self {
        DatedEntries {
            date: date.to_string(),
            entries: Vec::new(),
        }
    }

    /// Index of the entry for `ip`, if present (first match wins)
    pub fn position(&self, ip: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.ip == ip)
    }

    pub fn get(&self, ip: &str) -> Option<&AuthEntry> {
        self.position(ip).map(|idx| &self.entries[idx])
    }

    pub fn push(&mut self, entry: AuthEntry) {
        self.entries.push(entry);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries satisfying `predicate`, in their current order.
    ///
    /// The bucket itself is left untouched; assign the result back with
    /// [`DatedEntries::set_entries`].
    pub fn filter<P>(&self, mut predicate: P) -> Vec<AuthEntry>
    where
        P: FnMut(&AuthEntry) -> bool,
    {
        self.entries
            .iter()
            .filter(|e| predicate(e))
            .cloned()
            .collect()
    }

    /// Same-length, same-order sequence with every entry mapped through `f`
    pub fn transform<F>(&self, f: F) -> Vec<AuthEntry>
    where
        F: FnMut(AuthEntry) -> AuthEntry,
    {
        self.entries.iter().cloned().map(f).collect()
    }

    pub fn set_entries(&mut self, entries: Vec<AuthEntry>) {
        self.entries = entries;
    }

    fn record(&mut self, ip: &str, user: Option<&str>) {
        match self.position(ip) {
            Some(idx) => self.entries[idx].add_attempt(user),
            None => self.push(AuthEntry::new(ip, user)),
        }
    }
}

/// Per-date buckets of login attempts, in first-seen order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuthLog {
    days: Vec<DatedEntries>,
}

impl AuthLog {
    pub fn new() -> Self {
        AuthLog { days: Vec::new() }
    }

    pub fn days(&self) -> &[DatedEntries] {
        &self.days
    }

    pub fn days_mut(&mut self) -> &mut [DatedEntries] {
        &mut self.days
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    /// Total number of entries across all buckets
    pub fn entry_count(&self) -> usize {
        self.days.iter().map(|d| d.entries.len()).sum()
    }

    pub fn day(&self, date: &str) -> Option<&DatedEntries> {
        self.days.iter().find(|d| d.date == date)
    }

    /// Bucket for `date`, appending a new one if this date was not seen yet
    pub fn bucket_mut(&mut self, date: &str) -> &mut DatedEntries {
        let idx = match self.days.iter().position(|d| d.date == date) {
            Some(idx) => idx,
            None => {
                self.days.push(DatedEntries::new(date));
                self.days.len() - 1
            }
        };
        &mut self.days[idx]
    }

    /// Fold one parsed attempt into the store
    pub fn record_attempt(&mut self, attempt: &Attempt) {
        self.bucket_mut(&attempt.date)
            .record(&attempt.ip, attempt.user.as_deref());
    }

    /// Keep only the bucket whose date equals `date`.
    ///
    /// Returns `false` and leaves the store empty when no bucket matches.
    pub fn retain_date(&mut self, date: &str) -> bool {
        match self.days.iter().position(|d| d.date == date) {
            Some(idx) => {
                let day = self.days.swap_remove(idx);
                self.days = vec![day];
                true
            }
            None => {
                self.days.clear();
                false
            }
        }
    }
}
