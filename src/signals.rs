use std::borrow::Cow;
use std::collections::HashMap;

use derive_more::From;
use serde::{Deserialize, Serialize};

/// Type alias for a HashMap holding the signals collected for one request.
///
/// Keys are signal names. The schema is open-ended and consumers must
/// tolerate absent keys; rules referencing a missing signal simply don't
/// match.
///
/// The vocabulary emitted by [`SignalCollector`](crate::collector::SignalCollector):
///
/// | key                  | type    | source                                   |
/// |----------------------|---------|------------------------------------------|
/// | `ip`                 | string  | forwarded-for header, else peer address  |
/// | `user_agent`         | string  | request header, empty if absent          |
/// | `referer`            | string  | request header, empty if absent          |
/// | `geo_country`        | string  | geo provider                             |
/// | `geo_region`         | string  | geo provider                             |
/// | `geo_city`           | string  | geo provider                             |
/// | `geo_timezone`       | string  | geo provider                             |
/// | `geo_lat`, `geo_lon` | number  | geo provider, when coordinates present   |
/// | `weather_temp`       | number  | weather provider                         |
/// | `weather_condition`  | string  | WMO code mapping                         |
/// | `weather_code`       | number  | weather provider                         |
/// | `weather_is_hot`     | boolean | temperature ≥ 30°                        |
/// | `weather_is_cold`    | boolean | temperature ≤ 5°                         |
/// | `daypart`            | string  | UTC hour bucket                          |
/// | `daypart_hour`       | number  | UTC hour                                 |
/// | `daypart_is_weekend` | boolean | UTC day-of-week                          |
///
/// # Examples
/// ```
/// # use dco_core::{Signals, SignalValue};
/// let signals = [
///     ("weather_condition".to_owned(), "rainy".into()),
///     ("daypart_hour".to_owned(), 14.0.into()),
///     ("daypart_is_weekend".to_owned(), false.into()),
/// ].into_iter().collect::<Signals>();
/// ```
pub type Signals = HashMap<String, SignalValue>;

/// Enum representing possible values of a request signal.
///
/// Conveniently implements `From` conversions for `String`, `&str`, `f64`,
/// and `bool` types.
#[derive(Debug, Serialize, Deserialize, PartialEq, PartialOrd, From, Clone)]
#[serde(untagged)]
pub enum SignalValue {
    /// A string value.
    String(String),
    /// A numerical value.
    Number(f64),
    /// A boolean value.
    Boolean(bool),
}

impl SignalValue {
    pub fn as_str(&self) -> Option<&str> {
        if let SignalValue::String(s) = self {
            Some(s.as_str())
        } else {
            None
        }
    }

    /// The value's text form, used by string-typed rule comparisons.
    ///
    /// Numbers render via `f64` Display (`14`, not `14.0`), so integral
    /// signals compare equal to the integer text a rule author writes.
    pub fn string_form(&self) -> Cow<'_, str> {
        match self {
            SignalValue::String(s) => Cow::Borrowed(s),
            SignalValue::Number(n) => Cow::Owned(n.to_string()),
            SignalValue::Boolean(b) => Cow::Borrowed(if *b { "true" } else { "false" }),
        }
    }

    /// Numeric coercion for ordering comparisons. Booleans intentionally
    /// don't coerce; a numeric rule against a boolean signal never matches.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            SignalValue::Number(n) => Some(*n),
            SignalValue::String(s) => s.trim().parse().ok(),
            SignalValue::Boolean(_) => None,
        }
    }

    /// Parse raw override text into the most specific value type.
    ///
    /// Hosts implementing simulate/debug endpoints overlay query parameters
    /// onto collected signals; `"true"`/`"false"` become booleans, numeric
    /// text becomes a number, anything else stays a string.
    pub fn parse(raw: &str) -> SignalValue {
        if raw.eq_ignore_ascii_case("true") {
            return SignalValue::Boolean(true);
        }
        if raw.eq_ignore_ascii_case("false") {
            return SignalValue::Boolean(false);
        }
        if let Ok(n) = raw.trim().parse::<f64>() {
            return SignalValue::Number(n);
        }
        SignalValue::String(raw.to_owned())
    }
}

impl From<&str> for SignalValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}
