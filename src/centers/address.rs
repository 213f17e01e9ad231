//! Best-effort decomposition of free-text addresses into display fields.
//! This is a heuristic for French "street, postal city" strings, not a
//! validated postal parser; malformed input degrades to the fallback and
//! never errors.

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedAddress {
    pub street: String,
    pub postal_code: String,
    pub city: String,
}

const FALLBACK_CITY: &str = "Paris";

/// Splits on the last comma; the trailing segment is assumed to be
/// "<postal code> <city…>". Without a comma the whole string is the street
/// and the city defaults to Paris.
pub fn parse(raw: &str) -> ParsedAddress {
    let Some((before, after)) = raw.rsplit_once(',') else {
        return ParsedAddress {
            street: raw.trim().to_string(),
            postal_code: String::new(),
            city: FALLBACK_CITY.to_string(),
        };
    };

    let mut tokens = after.trim().split_whitespace();
    let postal_code = tokens.next().unwrap_or("").to_string();
    let city = tokens.collect::<Vec<_>>().join(" ");

    let street = before.trim();
    ParsedAddress {
        street: if street.is_empty() {
            raw.trim().to_string()
        } else {
            street.to_string()
        },
        postal_code,
        city: if city.is_empty() {
            FALLBACK_CITY.to_string()
        } else {
            city
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_address() {
        let parsed = parse("12 Rue de Vaugirard, 75015 Paris");
        assert_eq!(parsed.street, "12 Rue de Vaugirard");
        assert_eq!(parsed.postal_code, "75015");
        assert_eq!(parsed.city, "Paris");
    }

    #[test]
    fn falls_back_without_comma() {
        let parsed = parse("Unknown Place");
        assert_eq!(parsed.street, "Unknown Place");
        assert_eq!(parsed.postal_code, "");
        assert_eq!(parsed.city, "Paris");
    }

    #[test]
    fn splits_on_last_comma_only() {
        let parsed = parse("Bâtiment A, 3 Avenue Foch, 69006 Lyon");
        assert_eq!(parsed.street, "Bâtiment A, 3 Avenue Foch");
        assert_eq!(parsed.postal_code, "69006");
        assert_eq!(parsed.city, "Lyon");
    }

    #[test]
    fn multi_word_city_is_rejoined() {
        let parsed = parse("1 Place de la Mairie, 93200 Saint Denis");
        assert_eq!(parsed.postal_code, "93200");
        assert_eq!(parsed.city, "Saint Denis");
    }

    #[test]
    fn trailing_comma_degrades_to_defaults() {
        let parsed = parse("5 Rue des Lilas,");
        assert_eq!(parsed.street, "5 Rue des Lilas");
        assert_eq!(parsed.postal_code, "");
        assert_eq!(parsed.city, "Paris");
    }

    #[test]
    fn empty_input_never_panics() {
        let parsed = parse("");
        assert_eq!(parsed.street, "");
        assert_eq!(parsed.city, "Paris");
    }
}
