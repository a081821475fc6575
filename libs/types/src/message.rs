//! Queue message model and the registration request validator
//!
//! Wire format of a message body:
//!
//! ```json
//! {"name": "alice.myethvault.com", "targetAddress": "0x1bd8...4fD1", "dollarAmount": 5}
//! ```
//!
//! Extra keys are ignored. A body that is not JSON is a [`MessageError::Parse`]; a JSON
//! body with missing or wrongly typed keys is a [`MessageError::Validation`].
//!
//! `dollarAmount` is read from its JSON text. Digits past the 28th decimal place are
//! truncated, so `1e-29` is accepted as zero dollars.

use std::str::FromStr;

use ethers_core::types::{Address, H256};
use regex::Regex;
use rust_decimal::Decimal;
use serde_json::Value;

use crate::errors::MessageError;
use crate::registration::label_hash;

/// Default domain suffix every requested name must end with
pub const DEFAULT_DOMAIN_SUFFIX: &str = "myethvault.com";

/// Default upper bound of the dollar amount attached to one registration
pub const DEFAULT_MAX_DOLLARS: Decimal = Decimal::from_parts(5, 0, 0, false, 0);

const NAME_KEY: &str = "name";
const ADDRESS_KEY: &str = "targetAddress";
const DOLLARS_KEY: &str = "dollarAmount";
const MAX_SCALE: u32 = 28;

/// One message as delivered by the queue transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessage {
    /// Transport-assigned message id
    pub message_id: String,
    /// Opaque handle required to delete this delivery
    pub receipt_handle: String,
    /// Message body (JSON text)
    pub body: String,
    /// ARN of the queue the message was received from
    pub event_source_arn: String,
}

/// A structurally valid request to register `name` for `target_address`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationRequest {
    /// Full name including the domain suffix
    pub name: String,
    /// Address the name should resolve to
    pub target_address: Address,
    /// Dollar value to send along with the registration, `0 <= x <= max_dollars`
    pub dollar_amount: Decimal,
}

impl RegistrationRequest {
    /// First dot-separated segment of the name
    pub fn label(&self) -> &str {
        self.name.split('.').next().unwrap_or_default()
    }

    /// Deterministic registration key derived from [`Self::label`]
    pub fn label_hash(&self) -> H256 {
        label_hash(&self.name)
    }
}

/// Validation rules applied to every message
#[derive(Debug, Clone)]
pub struct ValidationPolicy {
    name_pattern: Regex,
    address_pattern: Regex,
    max_dollars: Decimal,
}

impl ValidationPolicy {
    /// Build a policy accepting single-label names under `domain_suffix`
    pub fn new(domain_suffix: &str, max_dollars: Decimal) -> Result<Self, regex::Error> {
        let name_pattern = Regex::new(&format!(
            r"^[a-z0-9-]+\.{}$",
            regex::escape(domain_suffix.trim_start_matches('.'))
        ))?;
        let address_pattern = Regex::new(r"^(0x)?[0-9a-fA-F]{40}$")?;

        Ok(Self {
            name_pattern,
            address_pattern,
            max_dollars,
        })
    }

    fn check_name(&self, value: Option<&Value>, issues: &mut Vec<String>) -> Option<String> {
        match value {
            Some(Value::String(name)) if self.name_pattern.is_match(name) => Some(name.clone()),
            Some(Value::String(name)) => {
                issues.push(format!(
                    "{NAME_KEY} \"{name}\" does not match {}",
                    self.name_pattern.as_str()
                ));
                None
            }
            Some(other) => {
                issues.push(format!("{NAME_KEY} must be a string, got {other}"));
                None
            }
            None => {
                issues.push(format!("{NAME_KEY} is required"));
                None
            }
        }
    }

    fn check_address(&self, value: Option<&Value>, issues: &mut Vec<String>) -> Option<Address> {
        match value {
            Some(Value::String(address)) if self.address_pattern.is_match(address) => {
                let digits = address.strip_prefix("0x").unwrap_or(address);
                match hex::decode(digits) {
                    Ok(bytes) => Some(Address::from_slice(&bytes)),
                    Err(e) => {
                        issues.push(format!("{ADDRESS_KEY} is not valid hex: {e}"));
                        None
                    }
                }
            }
            Some(Value::String(address)) => {
                issues.push(format!(
                    "{ADDRESS_KEY} \"{address}\" must be 40 hex digits with an optional 0x prefix"
                ));
                None
            }
            Some(other) => {
                issues.push(format!("{ADDRESS_KEY} must be a string, got {other}"));
                None
            }
            None => {
                issues.push(format!("{ADDRESS_KEY} is required"));
                None
            }
        }
    }

    fn check_dollars(&self, value: Option<&Value>, issues: &mut Vec<String>) -> Option<Decimal> {
        let number = match value {
            Some(Value::Number(number)) => number,
            Some(other) => {
                issues.push(format!("{DOLLARS_KEY} must be a number, got {other}"));
                return None;
            }
            None => {
                issues.push(format!("{DOLLARS_KEY} is required"));
                return None;
            }
        };

        // Go through the textual form so 0.1 stays exactly 0.1
        let text = number.to_string();
        let Some(dollars) = decimal_from_json_number(&text) else {
            issues.push(format!("{DOLLARS_KEY} {text} is not representable"));
            return None;
        };

        if dollars < Decimal::ZERO || dollars > self.max_dollars {
            issues.push(format!(
                "{DOLLARS_KEY} {dollars} must be between 0 and {}",
                self.max_dollars
            ));
            return None;
        }

        Some(dollars)
    }
}

/// Exact decimal of a JSON number, truncated to [`Decimal`]'s 28 fractional digits
fn decimal_from_json_number(text: &str) -> Option<Decimal> {
    if let Ok(value) = Decimal::from_str(text) {
        return Some(value);
    }

    let (mantissa, exponent) = text.split_once(|c| c == 'e' || c == 'E')?;
    let mantissa = Decimal::from_str(mantissa).ok()?;
    let exponent: i64 = exponent.trim_start_matches('+').parse().ok()?;
    let scale = i64::from(mantissa.scale()) - exponent;
    let excess = scale - i64::from(MAX_SCALE);
    if excess <= 0 {
        return Decimal::from_scientific(text).ok();
    }

    let digits = mantissa.mantissa();
    let truncated = u32::try_from(excess)
        .ok()
        .and_then(|excess| 10i128.checked_pow(excess))
        .map_or(0, |divisor| digits / divisor);
    Decimal::try_from_i128_with_scale(truncated, MAX_SCALE).ok()
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_DOMAIN_SUFFIX, DEFAULT_MAX_DOLLARS)
            .unwrap_or_else(|e| unreachable!("built-in patterns are valid: {e}"))
    }
}

/// Parse and validate one message body.
///
/// Pure: the same body and policy always yield the same request or the same rejection.
pub fn parse_registration_request(
    body: &str,
    policy: &ValidationPolicy,
) -> Result<RegistrationRequest, MessageError> {
    let parsed: Value =
        serde_json::from_str(body).map_err(|e| MessageError::Parse(e.to_string()))?;

    let fields = match parsed {
        Value::Object(fields) => fields,
        other => {
            return Err(MessageError::Validation(vec![format!(
                "expected a JSON object, got {other}"
            )]))
        }
    };

    let mut issues = Vec::new();
    let name = policy.check_name(fields.get(NAME_KEY), &mut issues);
    let target_address = policy.check_address(fields.get(ADDRESS_KEY), &mut issues);
    let dollar_amount = policy.check_dollars(fields.get(DOLLARS_KEY), &mut issues);

    match (name, target_address, dollar_amount) {
        (Some(name), Some(target_address), Some(dollar_amount)) if issues.is_empty() => {
            Ok(RegistrationRequest {
                name,
                target_address,
                dollar_amount,
            })
        }
        _ => Err(MessageError::Validation(issues)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const ADDRESS: &str = "0x1bd8437054ab40573816f965D95b359Ca2534fD1";

    fn body(name: &str, address: &str, dollars: &str) -> String {
        format!(r#"{{"name":"{name}","targetAddress":"{address}","dollarAmount":{dollars}}}"#)
    }

    #[test]
    fn test_invalid_json_is_a_parse_error() {
        let policy = ValidationPolicy::default();
        for input in ["abc", "\"", "()", ""] {
            let result = parse_registration_request(input, &policy);
            assert!(
                matches!(result, Err(MessageError::Parse(_))),
                "{input:?} should be a parse error"
            );
        }
    }

    #[test]
    fn test_structural_failures_are_validation_errors() {
        let policy = ValidationPolicy::default();
        let cases = [
            "\"abc\"".to_string(),
            "2".to_string(),
            "[]".to_string(),
            "[1,2]".to_string(),
            "{}".to_string(),
            body(".myethvault.com", ADDRESS, "5"),
            body("moody.test.xyz", ADDRESS, "5"),
            body("moody.sub.myethvault.com", ADDRESS, "5"),
            body("Moody.myethvault.com", ADDRESS, "5"),
            body("moody.myethvault.com", "0x1bd8437054ab40573816f965D95b359Ca2534fD", "5"),
            body("moody.myethvault.com", "0x1bd8437054ab40573816f965D95b359Ca2534fZ1", "5"),
            body("moody.myethvault.com", ADDRESS, "6"),
            body("moody.myethvault.com", ADDRESS, "5.01"),
            body("moody.myethvault.com", ADDRESS, "-1"),
            body("moody.myethvault.com", ADDRESS, "\"5\""),
            r#"{"name":"moody.myethvault.com","dollarAmount":5}"#.to_string(),
            format!(r#"{{"targetAddress":"{ADDRESS}","dollarAmount":5}}"#),
            r#"{"name":"moody.myethvault.com","targetAddress":"0x1bd8437054ab40573816f965D95b359Ca2534fD1"}"#.to_string(),
            r#"{"name":7,"targetAddress":"0x1bd8437054ab40573816f965D95b359Ca2534fD1","dollarAmount":5}"#.to_string(),
        ];

        for case in cases {
            let result = parse_registration_request(&case, &policy);
            assert!(
                matches!(result, Err(MessageError::Validation(_))),
                "{case} should fail validation, got {result:?}"
            );
        }
    }

    #[test]
    fn test_valid_messages() {
        let policy = ValidationPolicy::default();

        let request = parse_registration_request(&body("moody.myethvault.com", ADDRESS, "5"), &policy)
            .unwrap();
        assert_eq!(request.name, "moody.myethvault.com");
        assert_eq!(request.label(), "moody");
        assert_eq!(request.dollar_amount, dec!(5));
        assert_eq!(
            request.target_address,
            ADDRESS.parse::<Address>().unwrap()
        );

        let zero = parse_registration_request(&body("abc.myethvault.com", ADDRESS, "0"), &policy)
            .unwrap();
        assert_eq!(zero.dollar_amount, Decimal::ZERO);

        let fractional =
            parse_registration_request(&body("a-1.myethvault.com", ADDRESS, "0.1"), &policy)
                .unwrap();
        assert_eq!(fractional.dollar_amount, dec!(0.1));
    }

    #[test]
    fn test_address_prefix_is_optional_and_case_insensitive() {
        let policy = ValidationPolicy::default();
        let bare = ADDRESS.trim_start_matches("0x");

        let with_prefix =
            parse_registration_request(&body("moody.myethvault.com", ADDRESS, "1"), &policy)
                .unwrap();
        let without_prefix =
            parse_registration_request(&body("moody.myethvault.com", bare, "1"), &policy).unwrap();
        let lowercase = parse_registration_request(
            &body("moody.myethvault.com", &ADDRESS.to_lowercase(), "1"),
            &policy,
        )
        .unwrap();

        assert_eq!(with_prefix.target_address, without_prefix.target_address);
        assert_eq!(with_prefix.target_address, lowercase.target_address);
    }

    #[test]
    fn test_extra_keys_are_ignored() {
        let policy = ValidationPolicy::default();
        let input = format!(
            r#"{{"name":"moody.myethvault.com","targetAddress":"{ADDRESS}","dollarAmount":2,"memo":"hi"}}"#
        );
        assert!(parse_registration_request(&input, &policy).is_ok());
    }

    #[test]
    fn test_custom_suffix_and_ceiling() {
        let policy = ValidationPolicy::new("example.com", dec!(5)).unwrap();
        assert!(parse_registration_request(&body("alice.example.com", ADDRESS, "5"), &policy).is_ok());
        assert!(matches!(
            parse_registration_request(&body("alice.example.com", ADDRESS, "6"), &policy),
            Err(MessageError::Validation(_))
        ));
        assert!(matches!(
            parse_registration_request(&body("alice.examplexcom", ADDRESS, "1"), &policy),
            Err(MessageError::Validation(_))
        ));
    }

    #[test]
    fn test_amounts_below_smallest_decimal_step_truncate() {
        let policy = ValidationPolicy::default();

        let tiny = parse_registration_request(&body("abc.myethvault.com", ADDRESS, "1e-29"), &policy)
            .unwrap();
        assert_eq!(tiny.dollar_amount, Decimal::ZERO);

        let truncated =
            parse_registration_request(&body("abc.myethvault.com", ADDRESS, "1.25e-27"), &policy)
                .unwrap();
        assert_eq!(truncated.dollar_amount, Decimal::new(12, 28));

        assert!(matches!(
            parse_registration_request(&body("abc.myethvault.com", ADDRESS, "1e30"), &policy),
            Err(MessageError::Validation(_))
        ));
    }

    #[test]
    fn test_validation_reports_every_issue() {
        let policy = ValidationPolicy::default();
        let Err(MessageError::Validation(issues)) =
            parse_registration_request(r#"{"name":1,"dollarAmount":9}"#, &policy)
        else {
            panic!("expected validation failure");
        };
        assert_eq!(issues.len(), 3);
    }

    #[test]
    fn test_revalidation_is_idempotent() {
        let policy = ValidationPolicy::default();
        for input in [
            body("moody.myethvault.com", ADDRESS, "3"),
            body("moody.myethvault.com", ADDRESS, "30"),
            "not json".to_string(),
        ] {
            assert_eq!(
                parse_registration_request(&input, &policy),
                parse_registration_request(&input, &policy)
            );
        }
    }
}
