//! Envelope definition and the signable document

pub mod builder;
pub mod document;

pub use builder::{
    AnchorCheck, AnchorPlacement, AnchorUnits, Document, EnvelopeDefinition, EnvelopeDisposition,
    EnvelopeTemplate, Recipients, SignHere, Signer, SignerIdentity, Tabs,
};
pub use document::DocumentAsset;
