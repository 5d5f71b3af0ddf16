//! Synthetic data generation.
//!
//! The fake filler resolves `{{ fake.<Method> }}` tags through the
//! [`DataFaker`] capability: a finite set of named operations, looked up by
//! lowercase name, each taking zero arguments or a single integer. Unknown
//! names and arity mismatches simply miss, leaving the tag for the fail-open
//! policy.

use chrono::{Datelike, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashMap;
use tracing::debug;

/// Capability the fake filler is bound to.
pub trait DataFaker: Send + Sync {
    /// Invoke an operation by case-insensitive name. `arg` carries the tag's
    /// integer argument when one was supplied.
    fn call(&self, name: &str, arg: Option<i64>) -> Option<String>;
}

enum FakeOp {
    Simple(fn() -> String),
    WithArg(fn(i64) -> String),
}

/// The standard generator backing `fake.*` tags.
pub struct FakeProvider {
    ops: HashMap<&'static str, FakeOp>,
}

impl FakeProvider {
    /// Build the standard operation set.
    pub fn standard() -> Self {
        let mut ops: HashMap<&'static str, FakeOp> = HashMap::new();
        ops.insert("brand", FakeOp::Simple(brand));
        ops.insert("characters", FakeOp::Simple(characters));
        ops.insert("charactersn", FakeOp::WithArg(characters_n));
        ops.insert("city", FakeOp::Simple(city));
        ops.insert("color", FakeOp::Simple(color));
        ops.insert("company", FakeOp::Simple(company));
        ops.insert("continent", FakeOp::Simple(continent));
        ops.insert("country", FakeOp::Simple(country));
        ops.insert("day", FakeOp::Simple(day));
        ops.insert("digits", FakeOp::Simple(digits));
        ops.insert("digitsn", FakeOp::WithArg(digits_n));
        ops.insert("domainname", FakeOp::Simple(domain_name));
        ops.insert("emailaddress", FakeOp::Simple(email_address));
        ops.insert("firstname", FakeOp::Simple(first_name));
        ops.insert("fullname", FakeOp::Simple(full_name));
        ops.insert("gender", FakeOp::Simple(gender));
        ops.insert("hexcolor", FakeOp::Simple(hex_color));
        ops.insert("ipv4", FakeOp::Simple(ipv4));
        ops.insert("jobtitle", FakeOp::Simple(job_title));
        ops.insert("lastname", FakeOp::Simple(last_name));
        ops.insert("month", FakeOp::Simple(month));
        ops.insert("monthnum", FakeOp::Simple(month_num));
        ops.insert("phone", FakeOp::Simple(phone));
        ops.insert("username", FakeOp::Simple(user_name));
        ops.insert("weekday", FakeOp::Simple(weekday));
        ops.insert("year", FakeOp::Simple(year));
        Self { ops }
    }
}

impl DataFaker for FakeProvider {
    fn call(&self, name: &str, arg: Option<i64>) -> Option<String> {
        let op = self.ops.get(name.to_lowercase().as_str())?;
        match (op, arg) {
            (FakeOp::Simple(f), None) => Some(f()),
            (FakeOp::WithArg(f), Some(n)) => Some(f(n)),
            (FakeOp::WithArg(_), None) => {
                debug!(method = %name, "method needs an input parameter which was not supplied");
                None
            }
            (FakeOp::Simple(_), Some(_)) => {
                debug!(method = %name, "method takes no parameters");
                None
            }
        }
    }
}

fn pick(items: &[&str]) -> String {
    let mut rng = rand::thread_rng();
    items
        .choose(&mut rng)
        .map(|s| s.to_string())
        .unwrap_or_default()
}

const FIRST_NAMES: &[&str] = &[
    "Ada", "Alan", "Edsger", "Grace", "John", "Katherine", "Linus", "Margaret",
];
const LAST_NAMES: &[&str] = &[
    "Hamilton", "Hopper", "Kernighan", "Lovelace", "Ritchie", "Torvalds", "Turing",
];
const CITIES: &[&str] = &[
    "Amsterdam", "Berlin", "Lisbon", "London", "Oslo", "Prague", "Tokyo",
];
const COUNTRIES: &[&str] = &[
    "Brazil", "Canada", "Germany", "Japan", "Netherlands", "Norway", "Portugal",
];
const CONTINENTS: &[&str] = &[
    "Africa", "Asia", "Australia", "Europe", "North America", "South America",
];
const COLORS: &[&str] = &["black", "blue", "green", "orange", "red", "white", "yellow"];
const BRANDS: &[&str] = &["Acme", "Globex", "Initech", "Umbrella", "Vandelay"];
const COMPANIES: &[&str] = &[
    "Acme Corp", "Globex Industries", "Initech LLC", "Stark Labs", "Wayne Enterprises",
];
const DOMAINS: &[&str] = &["example.com", "example.net", "example.org", "test.dev"];
const JOB_TITLES: &[&str] = &[
    "Accountant", "Designer", "Developer", "Engineer", "Manager", "Technician",
];
const MONTHS: &[&str] = &[
    "January", "February", "March", "April", "May", "June", "July", "August",
    "September", "October", "November", "December",
];
const WEEKDAYS: &[&str] = &[
    "Monday", "Tuesday", "Wednesday", "Thursday", "Friday", "Saturday", "Sunday",
];

fn brand() -> String {
    pick(BRANDS)
}

fn characters() -> String {
    characters_n(5)
}

fn characters_n(n: i64) -> String {
    let mut rng = rand::thread_rng();
    (0..n.max(0))
        .map(|_| rng.gen_range(b'a'..=b'z') as char)
        .collect()
}

fn city() -> String {
    pick(CITIES)
}

fn color() -> String {
    pick(COLORS)
}

fn company() -> String {
    pick(COMPANIES)
}

fn continent() -> String {
    pick(CONTINENTS)
}

fn country() -> String {
    pick(COUNTRIES)
}

fn day() -> String {
    rand::thread_rng().gen_range(1..=28).to_string()
}

fn digits() -> String {
    digits_n(5)
}

fn digits_n(n: i64) -> String {
    let mut rng = rand::thread_rng();
    (0..n.max(0))
        .map(|_| rng.gen_range(b'0'..=b'9') as char)
        .collect()
}

fn domain_name() -> String {
    pick(DOMAINS)
}

fn email_address() -> String {
    format!(
        "{}.{}@{}",
        first_name().to_lowercase(),
        last_name().to_lowercase(),
        domain_name()
    )
}

fn first_name() -> String {
    pick(FIRST_NAMES)
}

fn full_name() -> String {
    format!("{} {}", first_name(), last_name())
}

fn gender() -> String {
    pick(&["female", "male"])
}

fn hex_color() -> String {
    let mut rng = rand::thread_rng();
    format!("#{:06x}", rng.gen_range(0..0x1000000))
}

fn ipv4() -> String {
    let mut rng = rand::thread_rng();
    format!(
        "{}.{}.{}.{}",
        rng.gen_range(1..255),
        rng.gen_range(0..256),
        rng.gen_range(0..256),
        rng.gen_range(1..255)
    )
}

fn job_title() -> String {
    pick(JOB_TITLES)
}

fn last_name() -> String {
    pick(LAST_NAMES)
}

fn month() -> String {
    pick(MONTHS)
}

fn month_num() -> String {
    rand::thread_rng().gen_range(1..=12).to_string()
}

fn phone() -> String {
    format!("+1-555-{}", digits_n(7))
}

fn user_name() -> String {
    format!("{}{}", first_name().to_lowercase(), digits_n(2))
}

fn weekday() -> String {
    pick(WEEKDAYS)
}

fn year() -> String {
    let current = Utc::now().year() as i64;
    rand::thread_rng().gen_range(1970..=current).to_string()
}
