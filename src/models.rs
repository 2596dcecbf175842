// src/models.rs
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Vessel categories the detector recognises.
///
/// The serialized form is the display name the detection service and the
/// persisted settings use. History queries address classes by [`ClassLabel::api_key`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ClassLabel {
    #[serde(rename = "балкер")]
    BulkCarrier,
    #[serde(rename = "контейнеровоз")]
    ContainerShip,
    #[serde(rename = "парусное судно")]
    Sailboat,
    #[serde(rename = "рыбацкая лодка")]
    FishingBoat,
    #[serde(rename = "лайнер")]
    Liner,
    #[serde(rename = "военный корабль")]
    Warship,
    #[serde(rename = "яхта")]
    Yacht,
}

impl ClassLabel {
    pub const ALL: [ClassLabel; 7] = [
        ClassLabel::BulkCarrier,
        ClassLabel::ContainerShip,
        ClassLabel::Sailboat,
        ClassLabel::FishingBoat,
        ClassLabel::Liner,
        ClassLabel::Warship,
        ClassLabel::Yacht,
    ];

    pub fn display_name(self) -> &'static str {
        match self {
            ClassLabel::BulkCarrier => "балкер",
            ClassLabel::ContainerShip => "контейнеровоз",
            ClassLabel::Sailboat => "парусное судно",
            ClassLabel::FishingBoat => "рыбацкая лодка",
            ClassLabel::Liner => "лайнер",
            ClassLabel::Warship => "военный корабль",
            ClassLabel::Yacht => "яхта",
        }
    }

    /// Suffix of the `min_*` / `max_*` history query parameters.
    pub fn api_key(self) -> &'static str {
        match self {
            ClassLabel::BulkCarrier => "bulk_carrier",
            ClassLabel::ContainerShip => "container_ship",
            ClassLabel::Sailboat => "sailboat",
            ClassLabel::FishingBoat => "fishing_boat",
            ClassLabel::Liner => "liner",
            ClassLabel::Warship => "warship",
            // the history service still calls yachts "canoe"
            ClassLabel::Yacht => "canoe",
        }
    }

    /// Badge colour used when rendering detections of this class.
    pub fn color(self) -> &'static str {
        match self {
            ClassLabel::BulkCarrier => "#ff0000",
            ClassLabel::ContainerShip => "#0000ff",
            ClassLabel::Sailboat => "#00ffff",
            ClassLabel::FishingBoat => "#ffff00",
            ClassLabel::Liner => "#ff00ff",
            ClassLabel::Warship => "#ffa500",
            ClassLabel::Yacht => "#00cc44",
        }
    }

    pub fn all() -> BTreeSet<ClassLabel> {
        Self::ALL.into_iter().collect()
    }

    /// Looks a label up by its display name only. API keys are not accepted.
    pub fn from_display_name(name: &str) -> Option<ClassLabel> {
        Self::ALL.into_iter().find(|label| label.display_name() == name)
    }
}

impl fmt::Display for ClassLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub selected_classes: BTreeSet<ClassLabel>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            selected_classes: ClassLabel::all(),
        }
    }
}

impl Settings {
    pub fn is_all_selected(&self) -> bool {
        self.selected_classes.len() == ClassLabel::ALL.len()
    }

    pub fn toggle_class(&mut self, label: ClassLabel) {
        if !self.selected_classes.remove(&label) {
            self.selected_classes.insert(label);
        }
    }

    /// Selects every class, or clears the selection when everything is already selected.
    pub fn toggle_all(&mut self) {
        if self.is_all_selected() {
            self.selected_classes.clear();
        } else {
            self.selected_classes = ClassLabel::all();
        }
    }
}

/// A past detection as listed by the history endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionRecord {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    pub detection_time: String,
    pub input_image_key: String,
    pub output_image_key: String,
    pub object_count: u32,
    #[serde(default)]
    pub object_classes: Vec<ClassLabel>,
    #[serde(default)]
    pub settings_classes: Vec<ClassLabel>,
}

impl DetectionRecord {
    pub fn detected_at(&self) -> Option<DateTime<Utc>> {
        if let Ok(ts) = DateTime::parse_from_rfc3339(&self.detection_time) {
            return Some(ts.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(&self.detection_time, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|naive| naive.and_utc())
    }

    pub fn count_by_class(&self) -> BTreeMap<ClassLabel, usize> {
        count_by_class(&self.object_classes)
    }

    pub fn badges(&self) -> Vec<ClassBadge> {
        class_badges(&self.object_classes)
    }
}

pub fn count_by_class(classes: &[ClassLabel]) -> BTreeMap<ClassLabel, usize> {
    classes.iter().fold(BTreeMap::new(), |mut acc, label| {
        *acc.entry(*label).or_insert(0) += 1;
        acc
    })
}

/// Classes in order of first appearance, without duplicates.
pub fn distinct_classes(classes: &[ClassLabel]) -> Vec<ClassLabel> {
    let mut seen = BTreeSet::new();
    classes
        .iter()
        .copied()
        .filter(|label| seen.insert(*label))
        .collect()
}

/// One coloured "class × count" badge shown next to a detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ClassBadge {
    pub label: ClassLabel,
    pub color: &'static str,
    pub count: usize,
}

/// Badges for `classes`, one per class in order of first appearance.
pub fn class_badges(classes: &[ClassLabel]) -> Vec<ClassBadge> {
    let counts = count_by_class(classes);
    distinct_classes(classes)
        .into_iter()
        .map(|label| ClassBadge {
            label,
            color: label.color(),
            count: counts.get(&label).copied().unwrap_or_default(),
        })
        .collect()
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadResponse {
    pub image_key: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DetectRequest<'a> {
    pub image_key: &'a str,
    pub classes: Vec<ClassLabel>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectResponse {
    #[serde(deserialize_with = "id_string")]
    pub detection_id: String,
    pub object_count: u32,
    #[serde(default)]
    pub object_classes: Vec<ClassLabel>,
    pub processed_image_key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HistoryResponse {
    #[serde(default)]
    pub detections: Vec<DetectionRecord>,
}

/// A finished detection together with the URLs of both images.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectionResult {
    pub detection_id: String,
    pub object_count: u32,
    pub object_classes: Vec<ClassLabel>,
    pub image_key: String,
    pub processed_image_key: String,
    pub original_image_url: String,
    pub processed_image_url: String,
}

impl DetectionResult {
    pub fn count_by_class(&self) -> BTreeMap<ClassLabel, usize> {
        count_by_class(&self.object_classes)
    }

    pub fn badges(&self) -> Vec<ClassBadge> {
        class_badges(&self.object_classes)
    }

    pub fn export_file_name(&self) -> String {
        format!("detection_{}.png", self.detection_id)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountRange {
    pub min: Option<u32>,
    pub max: Option<u32>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: Option<chrono::NaiveDate>,
    pub end: Option<chrono::NaiveDate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassRange {
    pub enabled: bool,
    pub min: Option<u32>,
    pub max: Option<u32>,
}

impl Default for ClassRange {
    fn default() -> Self {
        Self {
            enabled: true,
            min: None,
            max: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterState {
    pub detection_id: Option<String>,
    pub date_range: DateRange,
    pub object_count: CountRange,
    pub per_class: BTreeMap<ClassLabel, ClassRange>,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            detection_id: None,
            date_range: DateRange::default(),
            object_count: CountRange::default(),
            per_class: ClassLabel::ALL
                .into_iter()
                .map(|label| (label, ClassRange::default()))
                .collect(),
        }
    }
}

impl FilterState {
    /// Range for `label`; classes missing from the map count as enabled and unbounded.
    pub fn class_range(&self, label: ClassLabel) -> ClassRange {
        self.per_class.get(&label).copied().unwrap_or_default()
    }

    pub fn toggle_class_filter(&mut self, label: ClassLabel) {
        let range = self.per_class.entry(label).or_default();
        range.enabled = !range.enabled;
    }

    pub fn set_class_range(&mut self, label: ClassLabel, min: Option<u32>, max: Option<u32>) {
        let range = self.per_class.entry(label).or_default();
        range.min = min;
        range.max = max;
    }
}

fn id_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Number(i64),
        Text(String),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Number(n) => n.to_string(),
        RawId::Text(s) => s,
    })
}
