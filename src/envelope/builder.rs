//! Envelope construction
//!
//! Builds the envelope definition sent to the e-signature service: one
//! document, one embedded signer, one sign-here tab placed by anchor text.
//! Construction is pure; nothing here touches the network.
//!
//! # Anchor placement
//!
//! The service positions the signature field by searching the rendered
//! document text for the anchor string. If the anchor is missing the signer
//! gets a free-form field; if it appears more often than intended, extra
//! fields appear. The expected occurrence count is therefore part of the
//! template and [`EnvelopeTemplate::check_anchor`] reports deviations. The
//! check scans raw bytes, so text inside compressed content streams is not
//! seen and reads as zero occurrences.

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};

/// Person asked to sign
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignerIdentity {
    pub name: String,
    pub email: String,
    /// Binds the recipient to embedded signing; must match at view time
    pub client_user_id: String,
}

/// Unit for anchor offsets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AnchorUnits {
    #[default]
    Pixels,
    Inches,
    Mms,
    Cms,
}

/// Declarative placement of the signature field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnchorPlacement {
    pub anchor_string: String,
    pub x_offset: i32,
    pub y_offset: i32,
    pub units: AnchorUnits,
}

impl Default for AnchorPlacement {
    fn default() -> Self {
        Self {
            anchor_string: "/sn1/".to_string(),
            x_offset: 20,
            y_offset: 10,
            units: AnchorUnits::Pixels,
        }
    }
}

impl AnchorPlacement {
    /// Non-overlapping occurrences of the anchor in raw document bytes
    pub fn occurrences_in(&self, document: &[u8]) -> usize {
        let needle = self.anchor_string.as_bytes();
        if needle.is_empty() || document.len() < needle.len() {
            return 0;
        }

        let mut count = 0;
        let mut i = 0;
        while i + needle.len() <= document.len() {
            if &document[i..i + needle.len()] == needle {
                count += 1;
                i += needle.len();
            } else {
                i += 1;
            }
        }
        count
    }

    fn sign_here(&self) -> SignHere {
        let units = match self.units {
            AnchorUnits::Pixels => "pixels",
            AnchorUnits::Inches => "inches",
            AnchorUnits::Mms => "mms",
            AnchorUnits::Cms => "cms",
        };
        SignHere {
            anchor_string: self.anchor_string.clone(),
            anchor_x_offset: self.x_offset.to_string(),
            anchor_y_offset: self.y_offset.to_string(),
            anchor_units: units.to_string(),
        }
    }
}

/// Result of comparing anchor occurrences against the template
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnchorCheck {
    pub expected: usize,
    pub found: usize,
}

impl AnchorCheck {
    pub fn is_satisfied(&self) -> bool {
        self.expected == self.found
    }
}

/// Whether the envelope is dispatched immediately
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnvelopeDisposition {
    /// Saved as a draft ("created" on the wire)
    #[serde(rename = "created")]
    Draft,
    #[serde(rename = "sent")]
    Sent,
}

/// Fixed shape of every envelope this gateway sends
#[derive(Debug, Clone)]
pub struct EnvelopeTemplate {
    pub email_subject: String,
    pub client_user_id: String,
    pub document_name: String,
    pub file_extension: String,
    pub document_id: String,
    pub recipient_id: String,
    pub anchor: AnchorPlacement,
    pub expected_anchor_occurrences: usize,
}

impl Default for EnvelopeTemplate {
    fn default() -> Self {
        Self {
            email_subject: "Please sign this document".to_string(),
            client_user_id: String::new(),
            document_name: "signed_file".to_string(),
            file_extension: "pdf".to_string(),
            document_id: "3".to_string(),
            recipient_id: "1".to_string(),
            anchor: AnchorPlacement::default(),
            expected_anchor_occurrences: 1,
        }
    }
}

impl EnvelopeTemplate {
    /// Signer identity for a form submission, bound to the configured client user id
    pub fn signer(&self, name: &str, email: &str) -> SignerIdentity {
        SignerIdentity {
            name: name.to_string(),
            email: email.to_string(),
            client_user_id: self.client_user_id.clone(),
        }
    }

    /// Compare anchor occurrences in `document` with the expected count
    pub fn check_anchor(&self, document: &[u8]) -> AnchorCheck {
        AnchorCheck {
            expected: self.expected_anchor_occurrences,
            found: self.anchor.occurrences_in(document),
        }
    }

    /// Assemble the envelope definition. Deterministic in its inputs.
    pub fn build(&self, signer: &SignerIdentity, document: &[u8]) -> EnvelopeDefinition {
        let signer_entry = Signer {
            email: signer.email.clone(),
            name: signer.name.clone(),
            client_user_id: signer.client_user_id.clone(),
            recipient_id: self.recipient_id.clone(),
            tabs: Tabs {
                sign_here_tabs: vec![self.anchor.sign_here()],
            },
        };

        EnvelopeDefinition {
            email_subject: self.email_subject.clone(),
            documents: vec![Document {
                document_base64: STANDARD.encode(document),
                name: self.document_name.clone(),
                file_extension: self.file_extension.clone(),
                document_id: self.document_id.clone(),
            }],
            recipients: Recipients {
                signers: vec![signer_entry],
            },
            status: EnvelopeDisposition::Sent,
        }
    }
}

/// Envelope definition in the provider's wire shape
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvelopeDefinition {
    pub email_subject: String,
    /// Documents in envelope order
    pub documents: Vec<Document>,
    pub recipients: Recipients,
    pub status: EnvelopeDisposition,
}

impl EnvelopeDefinition {
    /// The first embedded signer, if any
    pub fn signer(&self) -> Option<&Signer> {
        self.recipients.signers.first()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub document_base64: String,
    pub name: String,
    pub file_extension: String,
    pub document_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipients {
    pub signers: Vec<Signer>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Signer {
    pub email: String,
    pub name: String,
    pub client_user_id: String,
    pub recipient_id: String,
    pub tabs: Tabs,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tabs {
    pub sign_here_tabs: Vec<SignHere>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignHere {
    pub anchor_string: String,
    pub anchor_x_offset: String,
    pub anchor_y_offset: String,
    pub anchor_units: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template() -> EnvelopeTemplate {
        EnvelopeTemplate {
            client_user_id: "1001".to_string(),
            ..EnvelopeTemplate::default()
        }
    }

    #[test]
    fn test_build_single_document_single_signer() {
        let template = template();
        let signer = template.signer("Jane Doe", "jane@example.com");
        let envelope = template.build(&signer, b"%PDF /sn1/");

        assert_eq!(envelope.status, EnvelopeDisposition::Sent);
        assert_eq!(envelope.documents.len(), 1);
        assert_eq!(envelope.recipients.signers.len(), 1);

        let doc = &envelope.documents[0];
        assert_eq!(doc.name, "signed_file");
        assert_eq!(doc.file_extension, "pdf");
        assert_eq!(STANDARD.decode(&doc.document_base64).unwrap(), b"%PDF /sn1/");

        let signer = envelope.signer().unwrap();
        assert_eq!(signer.client_user_id, "1001");
        assert_eq!(signer.recipient_id, "1");
        assert_eq!(signer.tabs.sign_here_tabs.len(), 1);
        assert_eq!(signer.tabs.sign_here_tabs[0].anchor_string, "/sn1/");
    }

    #[test]
    fn test_build_is_deterministic() {
        let template = template();
        let signer = template.signer("Jane Doe", "jane@example.com");
        assert_eq!(
            template.build(&signer, b"bytes"),
            template.build(&signer, b"bytes")
        );
    }

    #[test]
    fn test_wire_format() {
        let template = template();
        let signer = template.signer("Jane Doe", "jane@example.com");
        let json = serde_json::to_value(template.build(&signer, b"x")).unwrap();

        assert_eq!(json["emailSubject"], "Please sign this document");
        assert_eq!(json["status"], "sent");
        assert_eq!(json["documents"][0]["documentId"], "3");
        let tab = &json["recipients"]["signers"][0]["tabs"]["signHereTabs"][0];
        assert_eq!(tab["anchorXOffset"], "20");
        assert_eq!(tab["anchorYOffset"], "10");
        assert_eq!(tab["anchorUnits"], "pixels");
        assert_eq!(json["recipients"]["signers"][0]["clientUserId"], "1001");
    }

    #[test]
    fn test_draft_serializes_as_created() {
        assert_eq!(
            serde_json::to_string(&EnvelopeDisposition::Draft).unwrap(),
            "\"created\""
        );
    }

    #[test]
    fn test_anchor_occurrences() {
        let anchor = AnchorPlacement::default();
        assert_eq!(anchor.occurrences_in(b"no marker here"), 0);
        assert_eq!(anchor.occurrences_in(b"sign: /sn1/"), 1);
        assert_eq!(anchor.occurrences_in(b"/sn1/ and /sn1/"), 2);
        assert_eq!(anchor.occurrences_in(b"/sn"), 0);
    }

    #[test]
    fn test_anchor_check() {
        let template = template();
        assert!(template.check_anchor(b"(Signature: /sn1/)").is_satisfied());

        let check = template.check_anchor(b"/sn1/ /sn1/");
        assert!(!check.is_satisfied());
        assert_eq!(check.found, 2);
        assert_eq!(check.expected, 1);
    }
}
