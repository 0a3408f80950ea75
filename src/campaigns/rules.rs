use crate::{
    campaigns::{Rule, RuleOperator},
    SignalValue, Signals,
};

impl Rule {
    /// Test this rule against the collected signals.
    ///
    /// Rules never match on missing data: if the signal is absent, the
    /// result is `false`.
    pub fn matches(&self, signals: &Signals) -> bool {
        let Some(signal) = signals.get(&self.signal) else {
            return false;
        };
        self.operator.eval(signal, &self.value)
    }
}

impl RuleOperator {
    /// Applying the operator to the values. Returns `false` if the operator
    /// cannot be applied or there's a misconfiguration.
    pub(crate) fn eval(&self, signal: &SignalValue, rule_value: &str) -> bool {
        self.try_eval(signal, rule_value).unwrap_or(false)
    }

    /// Try applying the operator to the values, returning `None` if the
    /// operator cannot be applied.
    fn try_eval(&self, signal: &SignalValue, rule_value: &str) -> Option<bool> {
        match self {
            Self::Eq | Self::Ne => {
                let equal =
                    signal.string_form().to_lowercase() == rule_value.to_lowercase();
                Some(if *self == Self::Eq { equal } else { !equal })
            }

            Self::Contains => Some(
                signal
                    .string_form()
                    .to_lowercase()
                    .contains(&rule_value.to_lowercase()),
            ),

            Self::In => {
                let actual = signal.string_form().to_lowercase();
                Some(
                    rule_value
                        .split(',')
                        .any(|option| option.trim().to_lowercase() == actual),
                )
            }

            Self::Gt | Self::Gte | Self::Lt | Self::Lte => {
                let actual = signal.as_number()?;
                let expected: f64 = rule_value.trim().parse().ok()?;

                Some(match self {
                    Self::Gt => actual > expected,
                    Self::Gte => actual >= expected,
                    Self::Lt => actual < expected,
                    Self::Lte => actual <= expected,
                    _ => {
                        // unreachable
                        return None;
                    }
                })
            }

            Self::Unknown => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use crate::{
        campaigns::{Rule, RuleOperator},
        Signals,
    };

    fn signals_from(entries: &[(&str, crate::SignalValue)]) -> Signals {
        entries
            .iter()
            .map(|(k, v)| ((*k).to_owned(), v.clone()))
            .collect()
    }

    fn rule(signal: &str, operator: RuleOperator, value: &str) -> Rule {
        Rule {
            id: "r1".to_owned(),
            variant_id: "v1".to_owned(),
            signal: signal.to_owned(),
            operator,
            value: value.to_owned(),
            priority: 0,
        }
    }

    #[test]
    fn missing_signal_never_matches() {
        let signals: Signals = HashMap::new();
        assert!(!rule("weather_condition", RuleOperator::Eq, "rainy").matches(&signals));
    }

    #[test]
    fn eq_is_case_insensitive() {
        let signals = signals_from(&[("weather_condition", "rainy".into())]);
        assert!(rule("weather_condition", RuleOperator::Eq, "Rainy").matches(&signals));
        assert!(!rule("weather_condition", RuleOperator::Eq, "cloudy").matches(&signals));
    }

    #[test]
    fn ne() {
        let signals = signals_from(&[("geo_country", "Canada".into())]);
        assert!(rule("geo_country", RuleOperator::Ne, "france").matches(&signals));
        assert!(!rule("geo_country", RuleOperator::Ne, "CANADA").matches(&signals));
    }

    #[test]
    fn contains_tests_rule_value_as_substring() {
        let signals = signals_from(&[("user_agent", "Mozilla/5.0 (iPhone; CPU)".into())]);
        assert!(rule("user_agent", RuleOperator::Contains, "iphone").matches(&signals));
        assert!(!rule("user_agent", RuleOperator::Contains, "android").matches(&signals));
    }

    #[test]
    fn in_trims_and_ignores_case() {
        let signals = signals_from(&[("geo_country", "b".into())]);
        assert!(rule("geo_country", RuleOperator::In, "a, B,c").matches(&signals));

        let signals = signals_from(&[("geo_country", "B".into())]);
        assert!(rule("geo_country", RuleOperator::In, "a, b,c").matches(&signals));

        let signals = signals_from(&[("geo_country", "d".into())]);
        assert!(!rule("geo_country", RuleOperator::In, "a, B,c").matches(&signals));
    }

    #[test]
    fn in_matches_number_string_form() {
        let signals = signals_from(&[("daypart_hour", 14.0.into())]);
        assert!(rule("daypart_hour", RuleOperator::In, "13, 14, 15").matches(&signals));
    }

    #[test]
    fn numeric_operators() {
        let signals = signals_from(&[("weather_temp", 21.5.into())]);
        assert!(rule("weather_temp", RuleOperator::Gt, "20").matches(&signals));
        assert!(!rule("weather_temp", RuleOperator::Gt, "21.5").matches(&signals));
        assert!(rule("weather_temp", RuleOperator::Gte, "21.5").matches(&signals));
        assert!(rule("weather_temp", RuleOperator::Lt, "30").matches(&signals));
        assert!(!rule("weather_temp", RuleOperator::Lt, "21.5").matches(&signals));
        assert!(rule("weather_temp", RuleOperator::Lte, "21.5").matches(&signals));
    }

    #[test]
    fn numeric_operators_parse_string_signals() {
        let signals = signals_from(&[("daypart_hour", "14".into())]);
        assert!(rule("daypart_hour", RuleOperator::Gte, "12").matches(&signals));
    }

    #[test]
    fn numeric_operators_never_raise_on_non_numeric_operands() {
        let signals = signals_from(&[("weather_condition", "rainy".into())]);
        assert!(!rule("weather_condition", RuleOperator::Gt, "10").matches(&signals));

        let signals = signals_from(&[("weather_temp", 21.5.into())]);
        assert!(!rule("weather_temp", RuleOperator::Gt, "warm").matches(&signals));

        // Booleans don't coerce to numbers.
        let signals = signals_from(&[("weather_is_hot", true.into())]);
        assert!(!rule("weather_is_hot", RuleOperator::Gt, "0").matches(&signals));
    }

    #[test]
    fn boolean_signals_compare_by_text() {
        let signals = signals_from(&[("daypart_is_weekend", true.into())]);
        assert!(rule("daypart_is_weekend", RuleOperator::Eq, "true").matches(&signals));
        assert!(rule("daypart_is_weekend", RuleOperator::Eq, "TRUE").matches(&signals));
        assert!(!rule("daypart_is_weekend", RuleOperator::Eq, "false").matches(&signals));
    }

    #[test]
    fn unknown_operator_never_matches() {
        let signals = signals_from(&[("geo_country", "Canada".into())]);
        assert!(!rule("geo_country", RuleOperator::Unknown, "canada").matches(&signals));
    }
}
