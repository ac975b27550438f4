//! Random data for `{{module.method}}` placeholders.
//!
//! Generation is driven entirely by the caller's RNG, so a seeded RNG gives
//! reproducible bodies. Unknown module/method pairs return `None` and the
//! placeholder is left as written.

use chrono::{SecondsFormat, TimeDelta, Utc};
use fake::faker::address::en::{
    BuildingNumber, CityName, CountryCode, CountryName, StateName, StreetName, ZipCode,
};
use fake::faker::company::en::{Buzzword, CompanyName, Industry, Profession};
use fake::faker::currency::en::{CurrencyCode, CurrencyName};
use fake::faker::internet::en::{DomainSuffix, Password, SafeEmail, UserAgent, Username, IPv4, IPv6};
use fake::faker::lorem::en::{Paragraph, Sentence, Word, Words};
use fake::faker::name::en::{FirstName, LastName, Name};
use fake::faker::phone_number::en::PhoneNumber;
use fake::Fake;
use rand::seq::SliceRandom;
use rand::Rng;
use serde_json::{Number, Value};

const ALPHA: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";
const DIGITS: &[u8] = b"0123456789";
const ALPHANUMERIC: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const MAX_DECIMALS: usize = 10;
const MAX_YEARS: i64 = 1_000;
const MAX_DAYS: i64 = MAX_YEARS * 365;
const COLORS: &[&str] = &[
    "red", "green", "blue", "yellow", "purple", "orange", "black", "white", "gray", "pink",
    "teal", "maroon", "navy", "olive", "silver", "gold", "indigo", "violet", "cyan", "magenta",
];

/// Generate a value for `module.method` with optional JSON `options`.
pub fn generate<R: Rng + ?Sized>(
    module: &str,
    method: &str,
    options: &Value,
    rng: &mut R,
) -> Option<Value> {
    let value = match (module, method) {
        ("person" | "name", "firstName") => text(FirstName().fake_with_rng::<String, _>(rng)),
        ("person" | "name", "lastName") => text(LastName().fake_with_rng::<String, _>(rng)),
        ("person" | "name", "fullName") => text(Name().fake_with_rng::<String, _>(rng)),
        ("person" | "name", "jobTitle") => text(Profession().fake_with_rng::<String, _>(rng)),

        ("internet", "email") => text(SafeEmail().fake_with_rng::<String, _>(rng)),
        ("internet", "userName" | "username") => text(Username().fake_with_rng::<String, _>(rng)),
        ("internet", "domainName") => text(domain_name(rng)),
        ("internet", "url") => text(format!("https://{}", domain_name(rng))),
        ("internet", "ip" | "ipv4") => text(IPv4().fake_with_rng::<String, _>(rng)),
        ("internet", "ipv6") => text(IPv6().fake_with_rng::<String, _>(rng)),
        ("internet", "userAgent") => text(UserAgent().fake_with_rng::<String, _>(rng)),
        ("internet", "password") => {
            let len = length_option(options, 12).max(1);
            text(Password(len..len + 1).fake_with_rng::<String, _>(rng))
        }

        ("string" | "datatype", "uuid") => text(random_uuid(rng)),
        ("string", "alpha") => text(random_chars(ALPHA, length_option(options, 10), rng)),
        ("string", "alphanumeric") => {
            text(random_chars(ALPHANUMERIC, length_option(options, 10), rng))
        }
        ("string", "numeric") => text(random_chars(DIGITS, length_option(options, 10), rng)),

        ("number", "int") | ("datatype", "number") => {
            let (min, max) = int_range(options, 0, 99_999);
            Value::from(rng.gen_range(min..=max))
        }
        ("number", "float") => {
            let raw = float_in_range(options, 1.0, rng)?;
            let digits = options
                .get("fractionDigits")
                .or_else(|| options.get("precision"))
                .and_then(Value::as_u64)
                .unwrap_or(2)
                .min(MAX_DECIMALS as u64) as i32;
            number(round_to(raw, digits))
        }
        ("datatype", "boolean") => Value::Bool(rng.gen_bool(0.5)),

        ("date", kind @ ("past" | "future" | "recent" | "soon" | "anytime")) => {
            text(random_date(kind, options, rng))
        }

        ("lorem", "word") => text(Word().fake_with_rng::<String, _>(rng)),
        ("lorem", "words") => {
            let count = count_option(options, 3);
            let words: Vec<String> = Words(count..count + 1).fake_with_rng(rng);
            text(words.join(" "))
        }
        ("lorem", "sentence") => {
            let count = count_option(options, 6);
            text(Sentence(count..count + 1).fake_with_rng::<String, _>(rng))
        }
        ("lorem", "paragraph") => {
            let count = count_option(options, 3);
            text(Paragraph(count..count + 1).fake_with_rng::<String, _>(rng))
        }

        ("location" | "address", "city") => text(CityName().fake_with_rng::<String, _>(rng)),
        ("location" | "address", "country") => {
            text(CountryName().fake_with_rng::<String, _>(rng))
        }
        ("location" | "address", "countryCode") => {
            text(CountryCode().fake_with_rng::<String, _>(rng))
        }
        ("location" | "address", "state") => text(StateName().fake_with_rng::<String, _>(rng)),
        ("location" | "address", "streetAddress") => {
            let building: String = BuildingNumber().fake_with_rng(rng);
            let street: String = StreetName().fake_with_rng(rng);
            text(format!("{building} {street}"))
        }
        ("location" | "address", "zipCode") => text(ZipCode().fake_with_rng::<String, _>(rng)),
        ("location" | "address", "latitude") => number(round_to(rng.gen_range(-90.0..=90.0), 4)),
        ("location" | "address", "longitude") => {
            number(round_to(rng.gen_range(-180.0..=180.0), 4))
        }

        ("phone", "number" | "phoneNumber") => {
            text(PhoneNumber().fake_with_rng::<String, _>(rng))
        }

        ("company", "name" | "companyName") => {
            text(CompanyName().fake_with_rng::<String, _>(rng))
        }
        ("company", "buzzword" | "buzzPhrase") => text(Buzzword().fake_with_rng::<String, _>(rng)),
        ("company", "industry") => text(Industry().fake_with_rng::<String, _>(rng)),

        ("finance", "amount") => {
            let raw = float_in_range(options, 1000.0, rng)?;
            let dec = options
                .get("dec")
                .and_then(Value::as_u64)
                .unwrap_or(2)
                .min(MAX_DECIMALS as u64) as usize;
            text(format!("{raw:.dec$}"))
        }
        ("finance", "currencyCode") => text(CurrencyCode().fake_with_rng::<String, _>(rng)),
        ("finance", "currencyName") => text(CurrencyName().fake_with_rng::<String, _>(rng)),

        ("color", "rgb") => {
            let [r, g, b]: [u8; 3] = rng.gen();
            text(format!("#{r:02x}{g:02x}{b:02x}"))
        }
        ("color", "human") => text(COLORS.choose(rng).copied().unwrap_or("red").to_string()),

        ("helpers", "arrayElement") => {
            let items = match options {
                Value::Array(items) => Some(items),
                other => other.get("array").and_then(Value::as_array),
            };
            items.and_then(|items| items.choose(rng).cloned())?
        }

        _ => return None,
    };
    Some(value)
}

fn text(s: String) -> Value {
    Value::String(s)
}

fn number(n: f64) -> Value {
    Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null)
}

fn round_to(n: f64, digits: i32) -> f64 {
    let factor = 10f64.powi(digits.clamp(0, MAX_DECIMALS as i32));
    (n * factor).round() / factor
}

fn random_uuid<R: Rng + ?Sized>(rng: &mut R) -> String {
    uuid::Builder::from_random_bytes(rng.gen())
        .into_uuid()
        .to_string()
}

fn domain_name<R: Rng + ?Sized>(rng: &mut R) -> String {
    let word: String = Word().fake_with_rng(rng);
    let suffix: String = DomainSuffix().fake_with_rng(rng);
    format!("{}.{}", word.to_lowercase(), suffix)
}

fn random_chars<R: Rng + ?Sized>(alphabet: &[u8], len: usize, rng: &mut R) -> String {
    (0..len)
        .map(|_| alphabet[rng.gen_range(0..alphabet.len())] as char)
        .collect()
}

/// `{"length": n}` or a bare number; capped to keep bodies small.
fn length_option(options: &Value, default: usize) -> usize {
    let n = match options {
        Value::Number(n) => n.as_u64(),
        other => other.get("length").and_then(Value::as_u64),
    };
    n.map(|n| n as usize).unwrap_or(default).min(1024)
}

fn count_option(options: &Value, default: usize) -> usize {
    let n = match options {
        Value::Number(n) => n.as_u64(),
        other => other.get("count").and_then(Value::as_u64),
    };
    n.map(|n| n as usize).unwrap_or(default).clamp(1, 100)
}

fn float_option(options: &Value, key: &str) -> Option<f64> {
    options.get(key).and_then(Value::as_f64)
}

/// Uniform draw from `{"min", "max"}`. `None` when the span is not a finite
/// number.
fn float_in_range<R: Rng + ?Sized>(options: &Value, default_max: f64, rng: &mut R) -> Option<f64> {
    let min = float_option(options, "min").unwrap_or(0.0);
    let max = float_option(options, "max").unwrap_or(default_max).max(min);
    if !(max - min).is_finite() {
        return None;
    }
    Some(if max > min { rng.gen_range(min..=max) } else { min })
}

fn int_range(options: &Value, default_min: i64, default_max: i64) -> (i64, i64) {
    let (min, max) = match options {
        Value::Number(n) => (default_min, n.as_i64().unwrap_or(default_max)),
        other => (
            other.get("min").and_then(Value::as_i64).unwrap_or(default_min),
            other.get("max").and_then(Value::as_i64).unwrap_or(default_max),
        ),
    };
    (min, max.max(min))
}

fn random_date<R: Rng + ?Sized>(kind: &str, options: &Value, rng: &mut R) -> String {
    let now = Utc::now();
    let option = |key: &str, default: i64, max: i64| {
        options
            .get(key)
            .and_then(Value::as_i64)
            .unwrap_or(default)
            .clamp(1, max)
    };

    let span_days = match kind {
        "recent" | "soon" => option("days", 1, MAX_DAYS),
        "anytime" => 10 * 365,
        _ => option("years", 1, MAX_YEARS) * 365,
    };
    let offset = TimeDelta::try_seconds(rng.gen_range(1..=span_days * 86_400))
        .unwrap_or_else(TimeDelta::zero);
    let past = match kind {
        "past" | "recent" => true,
        "future" | "soon" => false,
        _ => rng.gen_bool(0.5),
    };
    let date = if past {
        now.checked_sub_signed(offset)
    } else {
        now.checked_add_signed(offset)
    };
    date.unwrap_or(now).to_rfc3339_opts(SecondsFormat::Millis, true)
}
