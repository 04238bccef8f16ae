use crate::models::check::{
    Check, CheckState, HttpMethod, Protocol, TIMEOUT_SECONDS_RANGE,
};
use crate::utils::ids::ID_LENGTH;
use serde_json::Value;

/// Per-field verdicts for one raw check document. A record is eligible for
/// execution only when every required field holds; `state` and `lastChecked`
/// always fall back to defaults and never block eligibility.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FieldValidity {
    pub id: bool,
    pub user_phone: bool,
    pub protocol: bool,
    pub url: bool,
    pub method: bool,
    pub success_codes: bool,
    pub timeout_seconds: bool,
}

impl FieldValidity {
    pub fn eligible(&self) -> bool {
        self.id
            && self.user_phone
            && self.protocol
            && self.url
            && self.method
            && self.success_codes
            && self.timeout_seconds
    }

    /// Names of the fields that failed, for the skip log line.
    pub fn failing(&self) -> Vec<&'static str> {
        let mut out = Vec::new();
        if !self.id {
            out.push("id");
        }
        if !self.user_phone {
            out.push("userPhone");
        }
        if !self.protocol {
            out.push("protocol");
        }
        if !self.url {
            out.push("url");
        }
        if !self.method {
            out.push("method");
        }
        if !self.success_codes {
            out.push("successCodes");
        }
        if !self.timeout_seconds {
            out.push("timeoutSeconds");
        }
        out
    }
}

#[derive(Debug)]
pub struct CheckValidation {
    pub fields: FieldValidity,
    /// The fully-typed check, present only when every required field passed.
    pub check: Option<Check>,
}

/// Normalize and defensively validate a raw check document from storage.
/// Malformed required fields make the whole record ineligible for this
/// cycle; the record is never repaired in place.
pub fn validate_check(raw: &Value) -> CheckValidation {
    let id = trimmed_str(raw, "id").filter(|s| s.len() == ID_LENGTH);
    let user_phone = trimmed_str(raw, "userPhone").filter(|s| s.len() == 10);
    let protocol = raw
        .get("protocol")
        .and_then(Value::as_str)
        .and_then(Protocol::parse);
    let url = trimmed_str(raw, "url");
    let method = raw
        .get("method")
        .and_then(Value::as_str)
        .and_then(HttpMethod::parse);
    let success_codes = raw
        .get("successCodes")
        .and_then(Value::as_array)
        .filter(|codes| !codes.is_empty())
        .and_then(|codes| {
            codes
                .iter()
                .map(|v| v.as_u64().and_then(|n| u16::try_from(n).ok()))
                .collect::<Option<Vec<u16>>>()
        });
    let timeout_seconds = raw
        .get("timeoutSeconds")
        .and_then(Value::as_u64)
        .filter(|n| TIMEOUT_SECONDS_RANGE.contains(n))
        .map(|n| n as u8);

    // Defaulted fields: absent or malformed values fall back instead of
    // disqualifying the record.
    let state = raw
        .get("state")
        .and_then(Value::as_str)
        .and_then(|s| match s {
            "up" => Some(CheckState::Up),
            "down" => Some(CheckState::Down),
            _ => None,
        })
        .unwrap_or_default();
    let last_checked = raw
        .get("lastChecked")
        .and_then(Value::as_i64)
        .filter(|ms| *ms > 0);

    let fields = FieldValidity {
        id: id.is_some(),
        user_phone: user_phone.is_some(),
        protocol: protocol.is_some(),
        url: url.is_some(),
        method: method.is_some(),
        success_codes: success_codes.is_some(),
        timeout_seconds: timeout_seconds.is_some(),
    };

    let check = fields.eligible().then(|| Check {
        id: id.unwrap_or_default(),
        user_phone: user_phone.unwrap_or_default(),
        protocol: protocol.unwrap_or(Protocol::Http),
        url: url.unwrap_or_default(),
        method: method.unwrap_or(HttpMethod::Get),
        success_codes: success_codes.unwrap_or_default(),
        timeout_seconds: timeout_seconds.unwrap_or_default(),
        state,
        last_checked,
    });

    CheckValidation { fields, check }
}

fn trimmed_str(raw: &Value, key: &str) -> Option<String> {
    raw.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid_doc() -> Value {
        json!({
            "id": "abcdefghij0123456789",
            "userPhone": "5551234567",
            "protocol": "http",
            "url": "example.com",
            "method": "get",
            "successCodes": [200, 201],
            "timeoutSeconds": 3,
            "state": "up",
            "lastChecked": 1000
        })
    }

    #[test]
    fn accepts_a_well_formed_record() {
        let validation = validate_check(&valid_doc());
        assert!(validation.fields.eligible());

        let check = validation.check.expect("eligible record yields a check");
        assert_eq!(check.id, "abcdefghij0123456789");
        assert_eq!(check.protocol, Protocol::Http);
        assert_eq!(check.method, HttpMethod::Get);
        assert_eq!(check.success_codes, vec![200, 201]);
        assert_eq!(check.timeout_seconds, 3);
        assert_eq!(check.state, CheckState::Up);
        assert_eq!(check.last_checked, Some(1000));
    }

    #[test]
    fn missing_timeout_disqualifies_the_record() {
        let mut doc = valid_doc();
        doc.as_object_mut().unwrap().remove("timeoutSeconds");

        let validation = validate_check(&doc);
        assert!(!validation.fields.eligible());
        assert!(validation.check.is_none());
        assert_eq!(validation.fields.failing(), vec!["timeoutSeconds"]);
    }

    #[test]
    fn out_of_range_timeout_disqualifies_the_record() {
        let mut doc = valid_doc();
        doc["timeoutSeconds"] = json!(6);
        assert!(!validate_check(&doc).fields.eligible());

        doc["timeoutSeconds"] = json!(0);
        assert!(!validate_check(&doc).fields.eligible());
    }

    #[test]
    fn each_required_field_is_individually_enforced() {
        for (key, bad) in [
            ("id", json!("too-short")),
            ("userPhone", json!("123")),
            ("protocol", json!("ftp")),
            ("url", json!("   ")),
            ("method", json!("patch")),
            ("successCodes", json!([])),
            ("timeoutSeconds", json!("3")),
        ] {
            let mut doc = valid_doc();
            doc[key] = bad;
            let validation = validate_check(&doc);
            assert!(
                !validation.fields.eligible(),
                "malformed {key} should disqualify the record"
            );
            assert!(validation.check.is_none());
        }
    }

    #[test]
    fn state_and_last_checked_default_without_blocking_eligibility() {
        let mut doc = valid_doc();
        doc.as_object_mut().unwrap().remove("state");
        doc.as_object_mut().unwrap().remove("lastChecked");

        let validation = validate_check(&doc);
        let check = validation.check.expect("defaults never block eligibility");
        assert_eq!(check.state, CheckState::Down);
        assert_eq!(check.last_checked, None);

        // Malformed values fall back the same way absent ones do.
        let mut doc = valid_doc();
        doc["state"] = json!("sideways");
        doc["lastChecked"] = json!(-5);
        let check = validate_check(&doc).check.unwrap();
        assert_eq!(check.state, CheckState::Down);
        assert_eq!(check.last_checked, None);
    }

    #[test]
    fn validation_is_idempotent_over_a_normalized_record() {
        let first = validate_check(&valid_doc()).check.unwrap();
        let reserialized = serde_json::to_value(&first).unwrap();
        let second = validate_check(&reserialized).check.unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn non_object_documents_are_ineligible() {
        for doc in [json!(null), json!("check"), json!(42), json!([1, 2])] {
            let validation = validate_check(&doc);
            assert!(!validation.fields.eligible());
            assert!(validation.check.is_none());
        }
    }
}
