use serde::{Deserialize, Serialize};

#[allow(missing_docs)]
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// A campaign with its candidate variants and targeting rules.
///
/// The campaign store supplies this record already filtered to the
/// requesting owner; ownership is not re-checked here. [`Campaign::is_servable`]
/// implements the status/date-window check the caller performs before
/// decisioning.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Campaign {
    pub id: String,
    #[serde(default)]
    pub status: CampaignStatus,
    #[serde(default)]
    pub ab_test_mode: SelectionMode,
    #[serde(default)]
    pub start_date: Option<Timestamp>,
    #[serde(default)]
    pub end_date: Option<Timestamp>,
    #[serde(default)]
    pub variants: Vec<Variant>,
    #[serde(default)]
    pub rules: Vec<Rule>,
}

impl Campaign {
    /// Whether the campaign may be served at `now`: status must be active
    /// and `now` inside the optional start/end window.
    pub fn is_servable(&self, now: Timestamp) -> bool {
        if self.status != CampaignStatus::Active {
            return false;
        }
        if self.start_date.is_some_and(|t| now < t) {
            return false;
        }
        if self.end_date.is_some_and(|t| now > t) {
            return false;
        }
        true
    }
}

/// Campaign lifecycle status.
///
/// Statuses introduced by a newer store version deserialize as
/// [`CampaignStatus::Unknown`], which is never servable.
#[derive(Debug, Default, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CampaignStatus {
    #[default]
    Draft,
    Active,
    Paused,
    Archived,
    Unknown,
}

impl<'de> serde::Deserialize<'de> for CampaignStatus {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match String::deserialize(deserializer)?.as_str() {
            "draft" => CampaignStatus::Draft,
            "active" => CampaignStatus::Active,
            "paused" => CampaignStatus::Paused,
            "archived" => CampaignStatus::Archived,
            _ => CampaignStatus::Unknown,
        })
    }
}

/// How a variant is picked from the campaign's candidates.
///
/// Modes introduced by a newer store version deserialize as
/// [`SelectionMode::Unknown`] and behave as [`SelectionMode::Off`].
#[derive(Debug, Default, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMode {
    /// Serve the default variant.
    #[default]
    Off,
    /// First matching targeting rule wins; default variant otherwise.
    Rules,
    /// Weighted random draw over variant weights.
    Weighted,
    /// Rules first; weighted draw when no rule matches.
    RulesThenWeighted,
    Unknown,
}

impl<'de> serde::Deserialize<'de> for SelectionMode {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match String::deserialize(deserializer)?.as_str() {
            "off" => SelectionMode::Off,
            "rules" => SelectionMode::Rules,
            "weighted" => SelectionMode::Weighted,
            "rules_then_weighted" => SelectionMode::RulesThenWeighted,
            _ => SelectionMode::Unknown,
        })
    }
}

/// One candidate creative belonging to a campaign.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Variant {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub headline: Option<String>,
    #[serde(default)]
    pub body_text: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub cta_text: Option<String>,
    #[serde(default)]
    pub cta_url: Option<String>,
    /// At most one variant per campaign should carry this flag, but that is
    /// not enforced; selection tolerates zero or multiple.
    #[serde(default)]
    pub is_default: bool,
    #[serde(default = "default_weight")]
    pub weight: f64,
}

fn default_weight() -> f64 {
    1.0
}

/// A targeting condition mapping a signal comparison to a target variant.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Rule {
    pub id: String,
    /// Variant served when this rule matches.
    pub variant_id: String,
    /// Name of the signal the rule tests.
    pub signal: String,
    pub operator: RuleOperator,
    /// Comparison value, always stored as text.
    pub value: String,
    /// Higher priority rules are evaluated first. Ties break on rule id,
    /// ascending.
    #[serde(default)]
    pub priority: i32,
}

/// Possible rule operators.
///
/// String comparisons are case-insensitive on the text form of both
/// operands. Numeric comparisons require both operands to parse as numbers
/// and never error on operands that don't. The long operator names are
/// accepted as synonyms on the wire; operators introduced by a newer store
/// version deserialize as [`RuleOperator::Unknown`] and never match.
#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RuleOperator {
    Eq,
    Ne,
    /// Rule value is a substring of the signal value.
    Contains,
    /// Rule value is a comma-separated option list; each option is trimmed.
    In,
    Gt,
    Lt,
    Gte,
    Lte,
    Unknown,
}

impl<'de> serde::Deserialize<'de> for RuleOperator {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match String::deserialize(deserializer)?.as_str() {
            "eq" | "equals" => RuleOperator::Eq,
            "ne" | "not_equals" => RuleOperator::Ne,
            "contains" => RuleOperator::Contains,
            "in" => RuleOperator::In,
            "gt" | "greater_than" => RuleOperator::Gt,
            "lt" | "less_than" => RuleOperator::Lt,
            "gte" | "greater_equal" => RuleOperator::Gte,
            "lte" | "less_equal" => RuleOperator::Lte,
            _ => RuleOperator::Unknown,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::{Campaign, CampaignStatus, RuleOperator, SelectionMode, Variant};

    fn campaign(status: CampaignStatus) -> Campaign {
        Campaign {
            id: "c1".to_owned(),
            status,
            ab_test_mode: SelectionMode::Off,
            start_date: None,
            end_date: None,
            variants: vec![],
            rules: vec![],
        }
    }

    #[test]
    fn servable_requires_active_status() {
        let now = Utc::now();
        assert!(campaign(CampaignStatus::Active).is_servable(now));
        assert!(!campaign(CampaignStatus::Draft).is_servable(now));
        assert!(!campaign(CampaignStatus::Paused).is_servable(now));
        assert!(!campaign(CampaignStatus::Archived).is_servable(now));
    }

    #[test]
    fn servable_respects_date_window() {
        let now = Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap();
        let mut c = campaign(CampaignStatus::Active);

        c.start_date = Some(Utc.with_ymd_and_hms(2024, 7, 1, 0, 0, 0).unwrap());
        assert!(!c.is_servable(now), "not started yet");

        c.start_date = Some(Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap());
        c.end_date = Some(Utc.with_ymd_and_hms(2024, 6, 30, 0, 0, 0).unwrap());
        assert!(c.is_servable(now), "inside the window");

        c.end_date = Some(Utc.with_ymd_and_hms(2024, 6, 10, 0, 0, 0).unwrap());
        assert!(!c.is_servable(now), "already ended");
    }

    #[test]
    fn operator_aliases_deserialize() {
        assert_eq!(
            serde_json::from_str::<RuleOperator>("\"eq\"").unwrap(),
            RuleOperator::Eq
        );
        assert_eq!(
            serde_json::from_str::<RuleOperator>("\"equals\"").unwrap(),
            RuleOperator::Eq
        );
        assert_eq!(
            serde_json::from_str::<RuleOperator>("\"greater_equal\"").unwrap(),
            RuleOperator::Gte
        );
        assert_eq!(
            serde_json::from_str::<RuleOperator>("\"regex\"").unwrap(),
            RuleOperator::Unknown
        );
    }

    #[test]
    fn unknown_wire_values_fall_back() {
        assert_eq!(
            serde_json::from_str::<SelectionMode>("\"bandit\"").unwrap(),
            SelectionMode::Unknown
        );
        assert_eq!(
            serde_json::from_str::<CampaignStatus>("\"scheduled\"").unwrap(),
            CampaignStatus::Unknown
        );
    }

    #[test]
    fn campaign_record_parses() {
        let c: Campaign = serde_json::from_str(
            r#"{
                "id": "c1",
                "status": "active",
                "ab_test_mode": "rules_then_weighted",
                "start_date": "2024-06-01T00:00:00Z",
                "variants": [{"id": "v1", "is_default": true}],
                "rules": [
                    {
                        "id": "r1",
                        "variant_id": "v1",
                        "signal": "daypart",
                        "operator": "eq",
                        "value": "morning",
                        "priority": 5
                    }
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(c.status, CampaignStatus::Active);
        assert_eq!(c.ab_test_mode, SelectionMode::RulesThenWeighted);
        assert!(c.start_date.is_some());
        assert!(c.end_date.is_none());
        assert_eq!(c.rules[0].operator, RuleOperator::Eq);
        assert_eq!(c.rules[0].priority, 5);
        assert!(c.variants[0].is_default);
    }

    #[test]
    fn variant_weight_defaults_to_one() {
        let v: Variant = serde_json::from_str(r#"{"id": "v1"}"#).unwrap();
        assert_eq!(v.weight, 1.0);
        assert!(!v.is_default);
    }
}
