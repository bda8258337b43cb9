use crate::{
    Result,
    constants::TEMPLATE_SIZE,
    error::Error,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Sensor storage slot identifier (1-based, 0 is reserved)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub struct TemplateId(u16);

impl TemplateId {
    /// Create a new template id.
    ///
    /// # Errors
    /// Returns `Error::InvalidTemplateId` if the id is 0.
    pub fn new(id: u16) -> Result<Self> {
        if id == 0 {
            return Err(Error::InvalidTemplateId(
                "Template id 0 is reserved".to_string(),
            ));
        }
        Ok(TemplateId(id))
    }

    /// Create a template id that must also fit the sensor capacity.
    ///
    /// # Errors
    /// Returns `Error::InvalidTemplateId` if the id is 0 or above `capacity`.
    pub fn with_capacity(id: u16, capacity: u16) -> Result<Self> {
        let id = Self::new(id)?;
        if id.0 > capacity {
            return Err(Error::InvalidTemplateId(format!(
                "Template id must be 1-{capacity}, got {}",
                id.0
            )));
        }
        Ok(id)
    }

    /// Get the raw id as u16.
    #[must_use]
    pub fn as_u16(&self) -> u16 {
        self.0
    }

    /// Iterate over ids `1..=count`.
    pub fn range(count: u16) -> impl Iterator<Item = TemplateId> {
        (1..=count).map(TemplateId)
    }
}

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<u16> for TemplateId {
    type Error = Error;

    fn try_from(value: u16) -> Result<Self> {
        TemplateId::new(value)
    }
}

impl From<TemplateId> for u16 {
    fn from(id: TemplateId) -> Self {
        id.0
    }
}

impl std::str::FromStr for TemplateId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let id: u16 = s
            .trim()
            .parse()
            .map_err(|_| Error::InvalidTemplateId(format!("Not a number: {s}")))?;
        TemplateId::new(id)
    }
}

/// Character buffer that receives a converted image on the sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeatureSlot {
    /// Character buffer 1, also used for search and template upload.
    First,
    /// Character buffer 2.
    Second,
}

impl FeatureSlot {
    /// Buffer number as sent to the sensor.
    #[must_use]
    pub fn as_u8(&self) -> u8 {
        match self {
            FeatureSlot::First => 1,
            FeatureSlot::Second => 2,
        }
    }

    /// Parse a buffer number.
    ///
    /// # Errors
    /// Returns `Error::InvalidFeatureSlot` for anything other than 1 or 2.
    pub fn from_u8(value: u8) -> Result<Self> {
        match value {
            1 => Ok(FeatureSlot::First),
            2 => Ok(FeatureSlot::Second),
            other => Err(Error::InvalidFeatureSlot(other)),
        }
    }
}

impl fmt::Display for FeatureSlot {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "slot {}", self.as_u8())
    }
}

/// Raw template bytes uploaded by the sensor (always 512 bytes).
#[derive(Clone, PartialEq, Eq)]
pub struct TemplatePayload(Box<[u8; TEMPLATE_SIZE]>);

impl TemplatePayload {
    /// Build a payload from a slice of exactly [`TEMPLATE_SIZE`] bytes.
    ///
    /// # Errors
    /// Returns `Error::InvalidTemplateLength` if the slice has a different length.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let array: [u8; TEMPLATE_SIZE] =
            bytes
                .try_into()
                .map_err(|_| Error::InvalidTemplateLength {
                    expected: TEMPLATE_SIZE,
                    actual: bytes.len(),
                })?;
        Ok(TemplatePayload(Box::new(array)))
    }

    /// Decode a payload from its hex rendering.
    ///
    /// # Errors
    /// Returns an error if the string is not valid hex or decodes to the wrong length.
    pub fn from_hex(encoded: &str) -> Result<Self> {
        let bytes = hex::decode(encoded)?;
        Self::from_slice(&bytes)
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0[..]
    }

    /// Lower-case hex rendering (1024 characters).
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.as_bytes())
    }

    /// SHA-256 digest of the raw bytes, hex encoded.
    #[must_use]
    pub fn sha256_hex(&self) -> String {
        hex::encode(Sha256::digest(self.as_bytes()))
    }
}

impl fmt::Debug for TemplatePayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplatePayload")
            .field("sha256", &self.sha256_hex())
            .finish()
    }
}

impl From<[u8; TEMPLATE_SIZE]> for TemplatePayload {
    fn from(bytes: [u8; TEMPLATE_SIZE]) -> Self {
        TemplatePayload(Box::new(bytes))
    }
}

impl AsRef<[u8]> for TemplatePayload {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

/// Progress stage reported to the outside world during enrollment and verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    PlaceFinger,
    ImageTaken,
    RemoveFinger,
    PlaceFingerAgain,
    ImageTakenAgain,
    CreatingModel,
    ModelCreated,
    Stored,
    DownloadingTemplate,
    Success,
    Error,
}

impl Stage {
    /// Wire name of the stage.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::PlaceFinger => "place_finger",
            Stage::ImageTaken => "image_taken",
            Stage::RemoveFinger => "remove_finger",
            Stage::PlaceFingerAgain => "place_finger_again",
            Stage::ImageTakenAgain => "image_taken_again",
            Stage::CreatingModel => "creating_model",
            Stage::ModelCreated => "model_created",
            Stage::Stored => "stored",
            Stage::DownloadingTemplate => "downloading_template",
            Stage::Success => "success",
            Stage::Error => "error",
        }
    }

    /// Whether the stage ends a flow.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::Success | Stage::Error)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_template_id_rejects_zero() {
        assert!(TemplateId::new(0).is_err());
        assert_eq!(TemplateId::new(1).unwrap().as_u16(), 1);
    }

    #[rstest]
    #[case(1, 300, true)]
    #[case(300, 300, true)]
    #[case(301, 300, false)]
    #[case(0, 300, false)]
    fn test_template_id_capacity(#[case] id: u16, #[case] capacity: u16, #[case] ok: bool) {
        assert_eq!(TemplateId::with_capacity(id, capacity).is_ok(), ok);
    }

    #[test]
    fn test_template_id_parse() {
        let id: TemplateId = " 42 ".parse().unwrap();
        assert_eq!(id.as_u16(), 42);
        assert!("0".parse::<TemplateId>().is_err());
        assert!("abc".parse::<TemplateId>().is_err());
    }

    #[test]
    fn test_template_id_range() {
        let ids: Vec<u16> = TemplateId::range(3).map(|id| id.as_u16()).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(TemplateId::range(0).count(), 0);
    }

    #[test]
    fn test_template_id_serde_rejects_zero() {
        let id: TemplateId = serde_json::from_str("7").unwrap();
        assert_eq!(id.as_u16(), 7);
        assert!(serde_json::from_str::<TemplateId>("0").is_err());
    }

    #[test]
    fn test_feature_slot_numbers() {
        assert_eq!(FeatureSlot::First.as_u8(), 1);
        assert_eq!(FeatureSlot::Second.as_u8(), 2);
        assert_eq!(FeatureSlot::from_u8(2).unwrap(), FeatureSlot::Second);
        assert!(FeatureSlot::from_u8(3).is_err());
    }

    #[test]
    fn test_template_payload_length_checked() {
        assert!(TemplatePayload::from_slice(&[0u8; 511]).is_err());
        assert!(TemplatePayload::from_slice(&[0u8; 513]).is_err());
        assert!(TemplatePayload::from_slice(&[0u8; TEMPLATE_SIZE]).is_ok());
    }

    #[test]
    fn test_template_payload_hex() {
        let mut bytes = [0u8; TEMPLATE_SIZE];
        bytes[0] = 0x0A;
        bytes[511] = 0xFF;
        let payload = TemplatePayload::from_slice(&bytes).unwrap();

        let encoded = payload.to_hex();
        assert_eq!(encoded.len(), TEMPLATE_SIZE * 2);
        assert!(encoded.starts_with("0a00"));
        assert!(encoded.ends_with("00ff"));
        assert_eq!(TemplatePayload::from_hex(&encoded).unwrap(), payload);
    }

    #[test]
    fn test_template_payload_digest_is_stable() {
        let payload = TemplatePayload::from_slice(&[0u8; TEMPLATE_SIZE]).unwrap();
        let digest = payload.sha256_hex();
        assert_eq!(digest.len(), 64);
        assert_eq!(digest, payload.clone().sha256_hex());
        assert!(format!("{:?}", payload).contains(&digest));
    }

    #[rstest]
    #[case(Stage::PlaceFinger, "place_finger")]
    #[case(Stage::PlaceFingerAgain, "place_finger_again")]
    #[case(Stage::DownloadingTemplate, "downloading_template")]
    #[case(Stage::Error, "error")]
    fn test_stage_wire_names(#[case] stage: Stage, #[case] expected: &str) {
        assert_eq!(stage.as_str(), expected);
        assert_eq!(
            serde_json::to_string(&stage).unwrap(),
            format!("\"{expected}\"")
        );
    }

    #[test]
    fn test_stage_terminal() {
        assert!(Stage::Success.is_terminal());
        assert!(Stage::Error.is_terminal());
        assert!(!Stage::Stored.is_terminal());
    }
}
