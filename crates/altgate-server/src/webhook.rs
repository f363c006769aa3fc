//! Billing-provider webhook verification and payload extraction.
//!
//! The provider signs the raw request body with HMAC-SHA256 using the shared
//! secret and sends the lowercase hex digest in [`SIGNATURE_HEADER`]. The
//! body must be verified byte-for-byte before it is parsed.

use hmac::{Hmac, Mac};
use serde_json::Value;
use sha2::Sha256;
use thiserror::Error;

use altgate_core::plan::{classify_plan_name, Plan};

pub const SIGNATURE_HEADER: &str = "x-freemius-signature";

type HmacSha256 = Hmac<Sha256>;

/// Hex HMAC-SHA256 of `body` under `secret`.
pub fn sign(secret: &str, body: &[u8]) -> String {
    // HMAC accepts keys of any length, so this cannot fail.
    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return String::new(),
    };
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

/// Check `signature` (hex, as sent by the provider) against `body`.
///
/// Missing, non-hex or mismatched signatures all return `false`. The
/// comparison runs in constant time over the decoded digest.
pub fn verify_signature(secret: &str, body: &[u8], signature: Option<&str>) -> bool {
    let Some(signature) = signature.map(str::trim).filter(|s| !s.is_empty()) else {
        return false;
    };
    let Ok(expected) = hex::decode(signature) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("malformed payload: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("license key not found in payload")]
    MissingLicenseKey,
}

/// What a verified webhook asks us to store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LicenseEvent {
    pub license_key: String,
    pub plan: Plan,
    /// Plan title as sent by the provider, kept for logging.
    pub plan_name: Option<String>,
    pub site_url: Option<String>,
}

/// Places the license key may appear, highest priority first.
const LICENSE_KEY_POINTERS: &[&str] = &[
    "/license/secret_key",
    "/license/key",
    "/secret_key",
    "/objects/license/secret_key",
    "/objects/license/key",
];

/// Places the plan title may appear, highest priority first.
const PLAN_NAME_POINTERS: &[&str] = &[
    "/plan/title",
    "/plan/name",
    "/plan",
    "/objects/plan/title",
    "/objects/plan/name",
];

const SITE_URL_POINTERS: &[&str] = &["/site_url", "/install/url", "/objects/install/url"];

/// First non-empty string found at any of `pointers`.
fn first_string(payload: &Value, pointers: &[&str]) -> Option<String> {
    pointers.iter().find_map(|pointer| {
        payload
            .pointer(pointer)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    })
}

/// Parse a verified body into a [`LicenseEvent`].
pub fn parse_event(body: &[u8]) -> Result<LicenseEvent, PayloadError> {
    let payload: Value = serde_json::from_slice(body)?;

    let license_key =
        first_string(&payload, LICENSE_KEY_POINTERS).ok_or(PayloadError::MissingLicenseKey)?;
    let plan_name = first_string(&payload, PLAN_NAME_POINTERS);
    let plan = classify_plan_name(plan_name.as_deref().unwrap_or_default());

    Ok(LicenseEvent {
        license_key,
        plan,
        plan_name,
        site_url: first_string(&payload, SITE_URL_POINTERS),
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    const SECRET: &str = "whsec_test";

    #[test]
    fn signature_round_trip() {
        let body = br#"{"license":{"key":"XYZ"}}"#;
        let signature = sign(SECRET, body);
        assert_eq!(signature.len(), 64);
        assert!(verify_signature(SECRET, body, Some(&signature)));
        assert!(verify_signature(SECRET, body, Some(&signature.to_uppercase())));
    }

    #[test]
    fn signature_rejections() {
        let body = br#"{"license":{"key":"XYZ"}}"#;
        let signature = sign(SECRET, body);
        assert!(!verify_signature(SECRET, body, None));
        assert!(!verify_signature(SECRET, body, Some("")));
        assert!(!verify_signature(SECRET, body, Some("not-hex")));
        assert!(!verify_signature("other-secret", body, Some(&signature)));
        assert!(!verify_signature(
            SECRET,
            br#"{"license":{"key":"XYZ2"}}"#,
            Some(&signature)
        ));
        assert!(!verify_signature(SECRET, body, Some(&signature[..32])));
    }

    #[test]
    fn known_digest() {
        // RFC 4231 test case 2.
        assert_eq!(
            sign("Jefe", b"what do ya want for nothing?"),
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    fn parse(value: Value) -> Result<LicenseEvent, PayloadError> {
        parse_event(value.to_string().as_bytes())
    }

    #[test]
    fn license_key_priority() {
        let event = parse(json!({
            "license": { "secret_key": "sk_1", "key": "k_1" },
            "secret_key": "top"
        }))
        .expect("event");
        assert_eq!(event.license_key, "sk_1");

        let event = parse(json!({ "license": { "key": "k_1" }, "secret_key": "top" }))
            .expect("event");
        assert_eq!(event.license_key, "k_1");

        let event = parse(json!({ "secret_key": "top" })).expect("event");
        assert_eq!(event.license_key, "top");

        let event = parse(json!({ "objects": { "license": { "secret_key": "nested" } } }))
            .expect("event");
        assert_eq!(event.license_key, "nested");
    }

    #[test]
    fn missing_license_key_is_an_error() {
        assert!(matches!(
            parse(json!({ "plan": { "name": "Pro" } })),
            Err(PayloadError::MissingLicenseKey)
        ));
        assert!(matches!(
            parse(json!({ "license": { "key": "" } })),
            Err(PayloadError::MissingLicenseKey)
        ));
    }

    #[test]
    fn malformed_body_is_an_error() {
        assert!(matches!(
            parse_event(b"{not json"),
            Err(PayloadError::Malformed(_))
        ));
    }

    #[test]
    fn plan_is_classified_from_title_or_name() {
        let event = parse(json!({
            "license": { "key": "A" },
            "plan": { "title": "Enterprise Plan", "name": "pro" }
        }))
        .expect("event");
        assert_eq!(event.plan, Plan::Enterprise);
        assert_eq!(event.plan_name.as_deref(), Some("Enterprise Plan"));

        let event = parse(json!({ "license": { "key": "XYZ" }, "plan": { "name": "Starter" } }))
            .expect("event");
        assert_eq!(event.plan, Plan::Starter);

        let event = parse(json!({ "license": { "key": "B" }, "plan": "PRO yearly" })).expect("event");
        assert_eq!(event.plan, Plan::Pro);

        let event = parse(json!({ "license": { "key": "C" } })).expect("event");
        assert_eq!(event.plan, Plan::Starter);
        assert_eq!(event.plan_name, None);
    }

    #[test]
    fn site_url_is_optional() {
        let event = parse(json!({
            "license": { "key": "A" },
            "install": { "url": "https://blog.example" }
        }))
        .expect("event");
        assert_eq!(event.site_url.as_deref(), Some("https://blog.example"));

        let event = parse(json!({ "license": { "key": "A" } })).expect("event");
        assert_eq!(event.site_url, None);
    }
}
