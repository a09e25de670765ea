//! Brazilian street address parsing.
//!
//! The wizard accepts a single free-text line in the shape
//!   Rua, Número - Bairro, Cidade - UF, CEP
//! e.g. `R. Teste, 100 - Centro, Itu - SP, 13300-000`.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

const ADDRESS_PATTERN: &str = concat!(
    r"^\s*(?P<rua>[^,]+?)\s*,\s*",
    r"(?P<numero>[^,]+?)\s*-\s*",
    r"(?P<bairro>[^,]+?)\s*,\s*",
    r"(?P<cidade>[^,]+?)\s*-\s*",
    r"(?P<estado>[A-Za-z]{2})\s*,\s*",
    r"(?P<cep>\d{5}-?\d{3})\s*$"
);

/// A postal address. Field names on the wire follow the stored documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    #[serde(rename = "rua")]
    pub street: String,
    #[serde(rename = "numero")]
    pub number: String,
    #[serde(rename = "bairro")]
    pub district: String,
    #[serde(rename = "cidade")]
    pub city: String,
    /// Two-letter state code, upper case.
    #[serde(rename = "estado")]
    pub state: String,
    #[serde(rename = "cep")]
    pub postal_code: String,
}

impl Address {
    pub fn new(
        street: impl Into<String>,
        number: impl Into<String>,
        district: impl Into<String>,
        city: impl Into<String>,
        state: impl Into<String>,
        postal_code: impl Into<String>,
    ) -> Self {
        Self {
            street: street.into(),
            number: number.into(),
            district: district.into(),
            city: city.into(),
            state: state.into(),
            postal_code: postal_code.into(),
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}, {} - {}, {} - {}, {}",
            self.street, self.number, self.district, self.city, self.state, self.postal_code
        )
    }
}

/// Parse one input line into an [`Address`].
///
/// Returns `None` on anything that doesn't match; the caller re-prompts.
pub fn parse_address(input: &str) -> Option<Address> {
    let re = Regex::new(ADDRESS_PATTERN).ok()?;
    let caps = re.captures(input)?;

    Some(Address {
        street: caps["rua"].trim().to_string(),
        number: caps["numero"].trim().to_string(),
        district: caps["bairro"].trim().to_string(),
        city: caps["cidade"].trim().to_string(),
        state: caps["estado"].to_uppercase(),
        postal_code: caps["cep"].to_string(),
    })
}
