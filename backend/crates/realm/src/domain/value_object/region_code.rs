//! Region codes such as `US-WA`

/// Normalise and validate a region code
///
/// Two ASCII letters, optionally followed by `-` and one to three
/// alphanumerics. The empty string is allowed (no region).
pub fn normalize_region_code(raw: &str) -> Result<String, String> {
    let code = raw.trim().to_ascii_uppercase();
    if code.is_empty() {
        return Ok(code);
    }

    let (country, subdivision) = match code.split_once('-') {
        Some((country, sub)) => (country, Some(sub)),
        None => (code.as_str(), None),
    };

    let country_ok = country.len() == 2 && country.chars().all(|c| c.is_ascii_uppercase());
    let sub_ok = subdivision.is_none_or(|sub| {
        (1..=3).contains(&sub.len()) && sub.chars().all(|c| c.is_ascii_alphanumeric())
    });

    if country_ok && sub_ok {
        Ok(code)
    } else {
        Err(format!("region code {raw:?} must look like US or US-WA"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_codes() {
        assert_eq!(normalize_region_code("us-wa").unwrap(), "US-WA");
        assert_eq!(normalize_region_code("DE").unwrap(), "DE");
        assert_eq!(normalize_region_code("").unwrap(), "");
        assert_eq!(normalize_region_code("GB-LND").unwrap(), "GB-LND");

        assert!(normalize_region_code("USA").is_err());
        assert!(normalize_region_code("U1").is_err());
        assert!(normalize_region_code("US-").is_err());
        assert!(normalize_region_code("US-ABCD").is_err());
        assert!(normalize_region_code("US-W_").is_err());
    }
}
