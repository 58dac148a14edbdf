use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::sync::LazyLock;

use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::constraints::ConstraintSet;
use crate::domain::{EffectiveDomain, compose};
use crate::error::DefinitionError;
use crate::types::TypeDomain;

static EMAIL_RE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9-]+(\.[A-Za-z0-9-]+)*\.[A-Za-z]{2,}$").ok()
});
static URL_RE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"^https?://[A-Za-z0-9-]+(\.[A-Za-z0-9-]+)*(:[0-9]{1,5})?(/[^\s]*)?$").ok()
});
static PHONE_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^\+?[0-9(][0-9 ().-]*[0-9]$").ok());
static UUID_RE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$")
        .ok()
});

fn matches(re: &LazyLock<Option<Regex>>, value: &str) -> bool {
    re.as_ref().is_some_and(|re| re.is_match(value))
}

/// Identifiable string subtype with a realistic value pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SemanticKind {
    FirstName,
    LastName,
    FullName,
    Email,
    PhoneNumber,
    CountryCode,
    State,
    City,
    ZipCode,
    Url,
    IpAddress,
    Ipv4Address,
    Ipv6Address,
    Uuid,
}

impl SemanticKind {
    pub fn name(self) -> &'static str {
        match self {
            SemanticKind::FirstName => "first_name",
            SemanticKind::LastName => "last_name",
            SemanticKind::FullName => "full_name",
            SemanticKind::Email => "email",
            SemanticKind::PhoneNumber => "phone_number",
            SemanticKind::CountryCode => "country_code",
            SemanticKind::State => "state",
            SemanticKind::City => "city",
            SemanticKind::ZipCode => "zip_code",
            SemanticKind::Url => "url",
            SemanticKind::IpAddress => "ip_address",
            SemanticKind::Ipv4Address => "ipv4_address",
            SemanticKind::Ipv6Address => "ipv6_address",
            SemanticKind::Uuid => "uuid",
        }
    }

    /// Column type used when the subtype is declared without one.
    pub fn default_type(self) -> TypeDomain {
        match self {
            SemanticKind::FirstName | SemanticKind::LastName | SemanticKind::State => {
                TypeDomain::varchar(50)
            }
            SemanticKind::FullName | SemanticKind::City => TypeDomain::varchar(100),
            SemanticKind::Email => TypeDomain::varchar(255),
            SemanticKind::PhoneNumber => TypeDomain::varchar(20),
            SemanticKind::CountryCode => TypeDomain::char(2),
            SemanticKind::ZipCode => TypeDomain::varchar(10),
            SemanticKind::Url => TypeDomain::varchar(2083),
            SemanticKind::IpAddress => TypeDomain::varchar(45),
            SemanticKind::Ipv4Address => TypeDomain::varchar(15),
            SemanticKind::Ipv6Address => TypeDomain::varchar(39),
            SemanticKind::Uuid => TypeDomain::char(36),
        }
    }

    /// Compose the default column with the subtype attached.
    pub fn domain(self) -> Result<EffectiveDomain, DefinitionError> {
        compose(self.default_type(), ConstraintSet::new().semantic(self))
    }

    /// Shortest value the subtype can take.
    pub fn min_length(self) -> usize {
        match self {
            SemanticKind::CountryCode => 2,
            SemanticKind::Ipv6Address | SemanticKind::IpAddress => 2,
            SemanticKind::ZipCode => 5,
            SemanticKind::Email => 6,
            SemanticKind::Ipv4Address | SemanticKind::PhoneNumber => 7,
            SemanticKind::Url => 11,
            SemanticKind::Uuid => 36,
            _ => 1,
        }
    }

    /// Case every value of the subtype is written in, if fixed.
    pub fn fixed_upper_case(self) -> bool {
        matches!(self, SemanticKind::CountryCode)
    }

    /// Name of the format checked by [`SemanticKind::check_format`], if any.
    pub fn format_name(self) -> Option<&'static str> {
        match self {
            SemanticKind::Email => Some("email address"),
            SemanticKind::PhoneNumber => Some("phone number"),
            SemanticKind::CountryCode => Some("ISO 3166 alpha-2 country code"),
            SemanticKind::ZipCode => Some("postal code"),
            SemanticKind::Url => Some("URL"),
            SemanticKind::IpAddress => Some("IP address"),
            SemanticKind::Ipv4Address => Some("IPv4 address"),
            SemanticKind::Ipv6Address => Some("IPv6 address"),
            SemanticKind::Uuid => Some("UUID"),
            SemanticKind::FirstName
            | SemanticKind::LastName
            | SemanticKind::FullName
            | SemanticKind::State
            | SemanticKind::City => None,
        }
    }

    /// True when `value` has the subtype's shape. Free-form subtypes accept anything.
    pub fn check_format(self, value: &str) -> bool {
        match self {
            SemanticKind::Email => matches(&EMAIL_RE, value),
            SemanticKind::PhoneNumber => {
                matches(&PHONE_RE, value)
                    && value.chars().filter(char::is_ascii_digit).count() >= 7
            }
            SemanticKind::CountryCode => {
                value.len() == 2 && value.chars().all(|c| c.is_ascii_uppercase())
            }
            SemanticKind::ZipCode => {
                value.chars().any(|c| c.is_ascii_digit())
                    && value
                        .chars()
                        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == ' ')
            }
            SemanticKind::Url => matches(&URL_RE, value),
            SemanticKind::IpAddress => value.parse::<IpAddr>().is_ok(),
            SemanticKind::Ipv4Address => value.parse::<Ipv4Addr>().is_ok(),
            SemanticKind::Ipv6Address => value.parse::<Ipv6Addr>().is_ok(),
            SemanticKind::Uuid => matches(&UUID_RE, value),
            SemanticKind::FirstName
            | SemanticKind::LastName
            | SemanticKind::FullName
            | SemanticKind::State
            | SemanticKind::City => true,
        }
    }
}
