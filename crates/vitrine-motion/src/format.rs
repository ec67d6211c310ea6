//! Display formatting for counter values.
//!
//! Four closed modes: plain grouped numbers, currency, percentage and
//! abbreviated (`K`/`M`/`B`/`T`). Currency and percentage follow the
//! conventions of a small built-in locale table ([`NumberLocale`]); plain
//! mode always uses `.` as the decimal point and a caller-chosen separator.
//!
//! # Usage
//!
//! ```
//! use vitrine_motion::format::{FormatMode, NumberFormat};
//!
//! let plain = NumberFormat::new(FormatMode::Plain).with_decimals(1);
//! assert_eq!(plain.format(1234.5), "1,234.5");
//!
//! let short = NumberFormat::new(FormatMode::Abbreviated);
//! assert_eq!(short.format(2_500_000.0), "2.5M");
//!
//! let price = NumberFormat::new(FormatMode::Currency)
//!     .with_decimals(2)
//!     .with_locale("de-DE")
//!     .with_currency("EUR");
//! assert_eq!(price.format(1234.5), "1.234,50\u{a0}€");
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;
use vitrine_config::CounterSettings;

use crate::error::{MotionError, Result};

const ABBREVIATIONS: [(f64, &str); 4] = [(1e12, "T"), (1e9, "B"), (1e6, "M"), (1e3, "K")];

/// Decimal places abbreviated values get when none are configured.
pub const DEFAULT_ABBREVIATED_DECIMALS: usize = 1;

/// How a value is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormatMode {
    /// Grouped number with a fixed number of decimals.
    #[default]
    #[serde(alias = "number")]
    Plain,
    Currency,
    /// The value is a percentage (`50` renders as `50%`).
    Percentage,
    /// `1.2K`, `3.4M`, ...
    Abbreviated,
}

impl FromStr for FormatMode {
    type Err = MotionError;

    fn from_str(name: &str) -> Result<Self> {
        match name.trim() {
            "plain" | "number" => Ok(Self::Plain),
            "currency" => Ok(Self::Currency),
            "percentage" | "percent" => Ok(Self::Percentage),
            "abbreviated" => Ok(Self::Abbreviated),
            other => Err(MotionError::invalid(
                "format mode",
                format!("unknown mode `{other}`"),
            )),
        }
    }
}

impl FormatMode {
    /// Look up a mode by name, warning and falling back to `Plain`.
    pub fn named_or_default(name: &str) -> Self {
        name.parse().unwrap_or_else(|error: MotionError| {
            warn!(%error, "formatting as a plain number");
            Self::Plain
        })
    }
}

/// Number conventions of one locale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumberLocale {
    pub tag: &'static str,
    pub group: &'static str,
    pub decimal: &'static str,
    /// Integer digits beyond the first group needed before grouping kicks in.
    pub min_grouping: usize,
    /// Text between the number and `%`.
    pub percent_spacing: &'static str,
    /// Currency symbol goes after the number.
    pub currency_after: bool,
    /// Text between the number and the currency symbol.
    pub currency_spacing: &'static str,
}

const NBSP: &str = "\u{a0}";
const NARROW_NBSP: &str = "\u{202f}";

const LOCALES: [NumberLocale; 6] = [
    NumberLocale {
        tag: "en-US",
        group: ",",
        decimal: ".",
        min_grouping: 1,
        percent_spacing: "",
        currency_after: false,
        currency_spacing: "",
    },
    NumberLocale {
        tag: "en-GB",
        group: ",",
        decimal: ".",
        min_grouping: 1,
        percent_spacing: "",
        currency_after: false,
        currency_spacing: "",
    },
    NumberLocale {
        tag: "de-DE",
        group: ".",
        decimal: ",",
        min_grouping: 1,
        percent_spacing: NBSP,
        currency_after: true,
        currency_spacing: NBSP,
    },
    NumberLocale {
        tag: "fr-FR",
        group: NARROW_NBSP,
        decimal: ",",
        min_grouping: 1,
        percent_spacing: NARROW_NBSP,
        currency_after: true,
        currency_spacing: NBSP,
    },
    NumberLocale {
        tag: "es-ES",
        group: ".",
        decimal: ",",
        min_grouping: 2,
        percent_spacing: NBSP,
        currency_after: true,
        currency_spacing: NBSP,
    },
    NumberLocale {
        tag: "ja-JP",
        group: ",",
        decimal: ".",
        min_grouping: 1,
        percent_spacing: "",
        currency_after: false,
        currency_spacing: "",
    },
];

impl NumberLocale {
    /// Locale for a BCP 47 tag. A bare language (`"de"`) matches its first
    /// regional variant.
    pub fn lookup(tag: &str) -> Result<&'static NumberLocale> {
        let tag = tag.trim();
        LOCALES
            .iter()
            .find(|locale| locale.tag.eq_ignore_ascii_case(tag))
            .or_else(|| {
                LOCALES.iter().find(|locale| {
                    locale
                        .tag
                        .split('-')
                        .next()
                        .is_some_and(|language| language.eq_ignore_ascii_case(tag))
                })
            })
            .ok_or_else(|| MotionError::invalid("locale", format!("no number data for `{tag}`")))
    }

    /// Like [`lookup`](Self::lookup), falling back to `en-US`.
    pub fn resolve(tag: &str) -> &'static NumberLocale {
        Self::lookup(tag).unwrap_or_else(|error| {
            warn!(%error, "formatting with en-US conventions");
            &LOCALES[0]
        })
    }

    pub fn currency_symbol(&self, code: &str) -> String {
        let symbol = match code.to_ascii_uppercase().as_str() {
            "USD" => "$",
            "EUR" => "€",
            "GBP" => "£",
            "JPY" if self.tag == "ja-JP" => "￥",
            "JPY" => "¥",
            "INR" => "₹",
            "KRW" => "₩",
            other => return other.to_string(),
        };
        symbol.to_string()
    }
}

/// Options for turning a counter value into display text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NumberFormat {
    pub mode: FormatMode,
    /// Fraction digits; abbreviated values default to one, everything else to zero.
    pub decimals: Option<usize>,
    pub prefix: String,
    pub suffix: String,
    /// Thousands separator for plain numbers. Empty disables grouping.
    pub separator: String,
    /// ISO 4217 code for currency mode.
    pub currency: String,
    pub locale: String,
}

impl Default for NumberFormat {
    fn default() -> Self {
        Self {
            mode: FormatMode::Plain,
            decimals: None,
            prefix: String::new(),
            suffix: String::new(),
            separator: ",".to_string(),
            currency: "USD".to_string(),
            locale: "en-US".to_string(),
        }
    }
}

impl NumberFormat {
    pub fn new(mode: FormatMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    /// Locale, currency and separator from the `[counter]` section.
    pub fn from_settings(settings: &CounterSettings) -> Self {
        Self {
            separator: settings.separator.clone(),
            currency: settings.currency.clone(),
            locale: settings.locale.clone(),
            ..Self::default()
        }
    }

    pub fn with_mode(mut self, mode: FormatMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_decimals(mut self, decimals: usize) -> Self {
        self.decimals = Some(decimals);
        self
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }

    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }

    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = locale.into();
        self
    }

    pub fn decimals(&self) -> usize {
        match (self.decimals, self.mode) {
            (Some(decimals), _) => decimals,
            (None, FormatMode::Abbreviated) => DEFAULT_ABBREVIATED_DECIMALS,
            (None, _) => 0,
        }
    }

    pub fn format(&self, value: f64) -> String {
        let decimals = self.decimals();
        let core = match self.mode {
            FormatMode::Plain => plain(value, decimals, &self.separator),
            FormatMode::Currency => {
                currency(value, decimals, &self.currency, NumberLocale::resolve(&self.locale))
            }
            FormatMode::Percentage => {
                percentage(value, decimals, NumberLocale::resolve(&self.locale))
            }
            FormatMode::Abbreviated => abbreviate(value, decimals),
        };
        format!("{}{}{}", self.prefix, core, self.suffix)
    }
}

impl fmt::Display for FormatMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Plain => "plain",
            Self::Currency => "currency",
            Self::Percentage => "percentage",
            Self::Abbreviated => "abbreviated",
        })
    }
}

/// Sign, integer digits and fraction digits of `value` rounded half away
/// from zero to `decimals` places.
struct Fixed {
    negative: bool,
    integer: String,
    fraction: String,
}

impl Fixed {
    fn new(value: f64, decimals: usize) -> Self {
        let factor = 10f64.powi(decimals as i32);
        let magnitude = (value.abs() * factor).round() / factor;
        let digits = format!("{magnitude:.decimals$}");
        let (integer, fraction) = digits.split_once('.').unwrap_or((digits.as_str(), ""));

        Self {
            negative: value < 0.0 && magnitude != 0.0,
            integer: integer.to_string(),
            fraction: fraction.to_string(),
        }
    }

    fn render(&self, group: &str, min_grouping: usize, decimal: &str) -> String {
        let mut out = String::new();
        if self.negative {
            out.push('-');
        }
        out.push_str(&group_digits(&self.integer, group, min_grouping));
        if !self.fraction.is_empty() {
            out.push_str(decimal);
            out.push_str(&self.fraction);
        }
        out
    }
}

fn group_digits(integer: &str, separator: &str, min_grouping: usize) -> String {
    if separator.is_empty() || integer.len() < 3 + min_grouping {
        return integer.to_string();
    }

    let len = integer.len();
    let mut out = String::with_capacity(len + len / 3 * separator.len());
    for (i, digit) in integer.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push_str(separator);
        }
        out.push(digit);
    }
    out
}

fn trim_zero_fraction(text: String) -> String {
    match text.split_once('.') {
        Some((integer, fraction)) if fraction.chars().all(|c| c == '0') => integer.to_string(),
        _ => text,
    }
}

fn plain(value: f64, decimals: usize, separator: &str) -> String {
    let fixed = Fixed::new(value, decimals);
    let separator = if value.abs() >= 1000.0 { separator } else { "" };
    fixed.render(separator, 1, ".")
}

fn currency(value: f64, decimals: usize, code: &str, locale: &NumberLocale) -> String {
    let fixed = Fixed::new(value, decimals);
    let sign = if fixed.negative { "-" } else { "" };
    let digits = Fixed {
        negative: false,
        ..fixed
    }
    .render(locale.group, locale.min_grouping, locale.decimal);
    let symbol = locale.currency_symbol(code);

    if locale.currency_after {
        format!("{sign}{digits}{}{symbol}", locale.currency_spacing)
    } else {
        format!("{sign}{symbol}{}{digits}", locale.currency_spacing)
    }
}

fn percentage(value: f64, decimals: usize, locale: &NumberLocale) -> String {
    let digits =
        Fixed::new(value, decimals).render(locale.group, locale.min_grouping, locale.decimal);
    format!("{digits}{}%", locale.percent_spacing)
}

/// Shorten large values with a `K`/`M`/`B`/`T` suffix.
///
/// A fraction made only of zeros is dropped, so `2_000_000` is `2M` while
/// `2_500_000` is `2.5M`.
pub fn abbreviate(value: f64, decimals: usize) -> String {
    for (threshold, suffix) in ABBREVIATIONS {
        if value.abs() >= threshold {
            let scaled = Fixed::new(value / threshold, decimals).render("", 1, ".");
            return trim_zero_fraction(scaled) + suffix;
        }
    }
    trim_zero_fraction(Fixed::new(value, decimals).render("", 1, "."))
}
