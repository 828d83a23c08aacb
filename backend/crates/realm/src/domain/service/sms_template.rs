//! SMS template expansion
//!
//! Placeholders: `[region]`, `[code]`, `[expires]` (minutes), `[longcode]`,
//! `[longexpires]` (hours) and `[enslink]`.

use chrono::Duration;

pub const SMS_TEMPLATE_MAX_LEN: usize = 800;

pub const DEFAULT_SMS_TEMPLATE: &str =
    "This is your Exposure Notifications Verification code: [longcode] Expires in [longexpires] hours";

const LINK_PLACEHOLDERS: [&str; 2] = ["[longcode]", "[enslink]"];

/// Values substituted into a template
#[derive(Debug, Clone)]
pub struct SmsTemplateValues<'a> {
    pub region: &'a str,
    pub code: &'a str,
    pub expires: Duration,
    pub long_code: &'a str,
    pub long_expires: Duration,
    /// Domain serving the app redirect, e.g. `en.express`
    pub redirect_domain: Option<&'a str>,
}

/// `https://<region>.<domain>/v?c=<longcode>`
pub fn enslink(region: &str, redirect_domain: &str, long_code: &str) -> String {
    let region = region.to_ascii_lowercase();
    format!("https://{}.{}/v?c={}", region, redirect_domain, long_code)
}

pub fn expand(template: &str, values: &SmsTemplateValues<'_>) -> String {
    let link = match values.redirect_domain {
        Some(domain) if !values.region.is_empty() => {
            enslink(values.region, domain, values.long_code)
        }
        _ => values.long_code.to_string(),
    };

    template
        .replace("[region]", values.region)
        .replace("[code]", values.code)
        .replace("[expires]", &values.expires.num_minutes().to_string())
        .replace("[longcode]", values.long_code)
        .replace("[longexpires]", &values.long_expires.num_hours().to_string())
        .replace("[enslink]", &link)
}

/// Validate a template against the lengths it will be expanded with
pub fn check_template(
    template: &str,
    region: &str,
    code_length: u32,
    long_code_length: u32,
) -> Result<(), String> {
    if !LINK_PLACEHOLDERS.iter().any(|p| template.contains(p)) {
        return Err("SMS text must contain [longcode] or [enslink]".to_string());
    }

    let code = "0".repeat(code_length as usize);
    let long_code = "a".repeat(long_code_length as usize);
    let sample = SmsTemplateValues {
        region,
        code: &code,
        expires: Duration::minutes(60),
        long_code: &long_code,
        long_expires: Duration::hours(24),
        redirect_domain: Some("ens.example.com"),
    };
    let expanded_len = expand(template, &sample).chars().count();
    if expanded_len > SMS_TEMPLATE_MAX_LEN {
        return Err(format!(
            "SMS text expands to {} characters, the limit is {}",
            expanded_len, SMS_TEMPLATE_MAX_LEN
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values<'a>(domain: Option<&'a str>) -> SmsTemplateValues<'a> {
        SmsTemplateValues {
            region: "US-WA",
            code: "12345678",
            expires: Duration::minutes(15),
            long_code: "abcdefghjkmnpqrs",
            long_expires: Duration::hours(24),
            redirect_domain: domain,
        }
    }

    #[test]
    fn test_expand_all_placeholders() {
        let text = expand(
            "[region]: [code] ([expires]m) or [longcode] ([longexpires]h) [enslink]",
            &values(Some("en.express")),
        );
        assert_eq!(
            text,
            "US-WA: 12345678 (15m) or abcdefghjkmnpqrs (24h) https://us-wa.en.express/v?c=abcdefghjkmnpqrs"
        );
    }

    #[test]
    fn test_enslink_without_domain_falls_back_to_long_code() {
        assert_eq!(expand("[enslink]", &values(None)), "abcdefghjkmnpqrs");
    }

    #[test]
    fn test_check_template() {
        assert!(check_template(DEFAULT_SMS_TEMPLATE, "US-WA", 8, 16).is_ok());
        assert!(check_template("Your code is [code]", "US-WA", 8, 16).is_err());

        let long = format!("[enslink] {}", "x".repeat(790));
        assert!(check_template(&long, "US-WA", 8, 16).is_err());
    }
}
