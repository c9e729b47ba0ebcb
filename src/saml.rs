//! SAML assertion handling.
//!
//! The assertion arrives base64-encoded from the Okta app page and is kept in
//! that form, since the exchange wants it re-encoded anyway. Role extraction
//! decodes a copy, walks the XML for the AWS role attribute and returns the
//! value strings as (principal ARN, role ARN) pairs, sorted by the raw
//! attribute value so the list order is stable across runs.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;

use crate::error::AuthError;

/// Attribute name AWS mandates for role mappings in a federation assertion.
pub const ROLE_ATTRIBUTE: &str = "https://aws.amazon.com/SAML/Attributes/Role";

/// A base64-encoded SAML assertion as received from the identity provider.
pub struct SamlAssertion {
    encoded: String,
}

impl SamlAssertion {
    pub fn new(encoded: String) -> Self {
        Self { encoded }
    }

    /// The assertion exactly as the exchange call wants it.
    pub fn encoded(&self) -> &str {
        &self.encoded
    }

    /// Extracts every (principal, role) pair the assertion grants.
    ///
    /// The returned list is deduplicated and sorted lexicographically by the
    /// raw attribute value, not by either ARN on its own.
    pub fn role_pairs(&self) -> Result<Vec<RolePair>, AuthError> {
        let malformed = |detail: &str| AuthError::MalformedAssertion(detail.to_string());

        let bytes = BASE64
            .decode(self.encoded.trim())
            .map_err(|_| malformed("payload is not valid base64"))?;
        let xml = String::from_utf8(bytes).map_err(|_| malformed("payload is not valid UTF-8"))?;
        let doc = roxmltree::Document::parse(&xml)
            .map_err(|e| AuthError::MalformedAssertion(e.to_string()))?;

        let mut raw: Vec<String> = doc
            .descendants()
            .filter(|node| node.attribute("Name") == Some(ROLE_ATTRIBUTE))
            .flat_map(|attribute| attribute.children())
            .filter(|child| child.is_element())
            .filter_map(|value| value.text())
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .collect();
        raw.sort();
        raw.dedup();

        if raw.is_empty() {
            return Err(AuthError::NoRolesFound);
        }
        raw.iter().map(|value| RolePair::parse(value)).collect()
    }
}

/// One role option decoded from the assertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RolePair {
    pub principal_arn: String,
    pub role_arn: String,
}

impl RolePair {
    pub fn new(principal_arn: String, role_arn: String) -> Self {
        Self { principal_arn, role_arn }
    }

    /// Parses a comma-joined `principal,role` attribute value. Anything other
    /// than exactly two non-empty fields is a hard parse error.
    fn parse(value: &str) -> Result<Self, AuthError> {
        let mut fields = value.split(',');
        match (fields.next(), fields.next(), fields.next()) {
            (Some(principal), Some(role), None)
                if !principal.trim().is_empty() && !role.trim().is_empty() =>
            {
                Ok(Self::new(principal.trim().to_string(), role.trim().to_string()))
            }
            _ => Err(AuthError::MalformedAssertion(format!(
                "role attribute value `{value}` is not a `principal,role` pair"
            ))),
        }
    }

    /// The AWS account id, taken from the 5th colon segment of the role ARN.
    pub fn account_id(&self) -> &str {
        self.role_arn
            .split(':')
            .nth(4)
            .and_then(|segment| segment.split('/').next())
            .unwrap_or("")
    }

    /// Display name of the role, the last `/` segment of the role ARN.
    pub fn role_name(&self) -> &str {
        self.role_arn.rsplit('/').next().unwrap_or(&self.role_arn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assertion_with_values(values: &[&str]) -> SamlAssertion {
        let attribute_values: String = values
            .iter()
            .map(|v| format!("<saml2:AttributeValue>{v}</saml2:AttributeValue>"))
            .collect();
        let xml = format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<saml2p:Response xmlns:saml2p="urn:oasis:names:tc:SAML:2.0:protocol">
  <saml2:Assertion xmlns:saml2="urn:oasis:names:tc:SAML:2.0:assertion">
    <saml2:AttributeStatement>
      <saml2:Attribute Name="https://aws.amazon.com/SAML/Attributes/RoleSessionName">
        <saml2:AttributeValue>jane@example.com</saml2:AttributeValue>
      </saml2:Attribute>
      <saml2:Attribute Name="{ROLE_ATTRIBUTE}">{attribute_values}</saml2:Attribute>
    </saml2:AttributeStatement>
  </saml2:Assertion>
</saml2p:Response>"#
        );
        SamlAssertion::new(BASE64.encode(xml))
    }

    #[test]
    fn extracts_and_sorts_pairs_by_raw_value() {
        let assertion = assertion_with_values(&[
            "111111111111:saml-provider/P,arn:aws:iam::111111111111:role/Role-01",
            "000000000001:saml-provider/P,arn:aws:iam::000000000001:role/Role-02",
        ]);

        let pairs = assertion.role_pairs().unwrap();
        assert_eq!(pairs.len(), 2);
        // Lexicographic order on the raw value puts the low account first.
        assert_eq!(pairs[0].account_id(), "000000000001");
        assert_eq!(pairs[0].role_name(), "Role-02");
        assert_eq!(pairs[1].account_id(), "111111111111");
        assert_eq!(pairs[1].role_name(), "Role-01");
    }

    #[test]
    fn duplicate_values_collapse() {
        let value = "arn:aws:iam::1:saml-provider/P,arn:aws:iam::1:role/Dev";
        let pairs = assertion_with_values(&[value, value]).role_pairs().unwrap();
        assert_eq!(pairs.len(), 1);
    }

    #[test]
    fn pair_without_comma_is_malformed() {
        let err = assertion_with_values(&["arn:aws:iam::1:role/Dev"])
            .role_pairs()
            .unwrap_err();
        assert!(matches!(err, AuthError::MalformedAssertion(_)));
    }

    #[test]
    fn pair_with_three_fields_is_malformed() {
        let err = assertion_with_values(&["a,b,c"]).role_pairs().unwrap_err();
        assert!(matches!(err, AuthError::MalformedAssertion(_)));
    }

    #[test]
    fn assertion_without_role_attribute_has_no_roles() {
        let xml = r#"<saml2:Assertion xmlns:saml2="urn:oasis:names:tc:SAML:2.0:assertion"/>"#;
        let err = SamlAssertion::new(BASE64.encode(xml)).role_pairs().unwrap_err();
        assert!(matches!(err, AuthError::NoRolesFound));
    }

    #[test]
    fn invalid_base64_is_malformed() {
        let err = SamlAssertion::new("not//base64!!".to_string())
            .role_pairs()
            .unwrap_err();
        assert!(matches!(err, AuthError::MalformedAssertion(_)));
    }

    #[test]
    fn invalid_xml_is_malformed() {
        let err = SamlAssertion::new(BASE64.encode("<unclosed"))
            .role_pairs()
            .unwrap_err();
        assert!(matches!(err, AuthError::MalformedAssertion(_)));
    }

    #[test]
    fn account_id_handles_short_arns() {
        let pair = RolePair::new("p".into(), "not-an-arn".into());
        assert_eq!(pair.account_id(), "");
        assert_eq!(pair.role_name(), "not-an-arn");
    }
}
