// models/src/medical/uploaded_file.rs
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::ApiError;

/// Classification of an uploaded file. Derived deterministically from the
/// declared MIME type: `image/*` is a photo, everything else is treated as
/// a scanned medical record document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileType {
    Photo,
    MedicalRecordDocument,
}

impl FileType {
    pub fn from_mime(mime_type: &str) -> FileType {
        if mime_type.starts_with("image/") {
            FileType::Photo
        } else {
            FileType::MedicalRecordDocument
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::Photo => "photo",
            FileType::MedicalRecordDocument => "medical_record_document",
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileType {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "photo" => Ok(FileType::Photo),
            "medical_record_document" => Ok(FileType::MedicalRecordDocument),
            other => Err(ApiError::validation(format!("Unknown file type: {}", other))),
        }
    }
}

/// Metadata row for one stored blob. `filename` is the opaque storage
/// name; the client-supplied name survives only in `original_filename`.
/// `user_id` is the uploader, `patient_id` the patient the file is about;
/// the two differ for on-behalf-of uploads by staff.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadedFile {
    pub id: i64,
    pub filename: String,
    pub original_filename: String,
    pub file_size: i64,
    pub mime_type: String,
    pub description: Option<String>,
    pub file_type: FileType,
    pub user_id: i64,
    pub patient_id: i64,
    pub medical_record_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUploadedFile {
    pub filename: String,
    pub original_filename: String,
    pub file_size: i64,
    pub mime_type: String,
    pub description: Option<String>,
    pub file_type: FileType,
    pub user_id: i64,
    pub patient_id: i64,
    pub medical_record_id: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::FileType;
    use std::str::FromStr;

    #[test]
    fn should_classify_image_mime_as_photo() {
        assert_eq!(FileType::from_mime("image/jpeg"), FileType::Photo);
        assert_eq!(FileType::from_mime("image/png"), FileType::Photo);
        assert_eq!(FileType::from_mime("image/gif"), FileType::Photo);
    }

    #[test]
    fn should_classify_everything_else_as_document() {
        assert_eq!(
            FileType::from_mime("application/pdf"),
            FileType::MedicalRecordDocument
        );
        assert_eq!(
            FileType::from_mime("text/plain"),
            FileType::MedicalRecordDocument
        );
        assert_eq!(FileType::from_mime(""), FileType::MedicalRecordDocument);
        // "image" without the slash is not an image MIME type
        assert_eq!(FileType::from_mime("image"), FileType::MedicalRecordDocument);
    }

    #[test]
    fn should_round_trip_file_type_strings() {
        assert_eq!(FileType::from_str("photo").unwrap(), FileType::Photo);
        assert_eq!(
            FileType::from_str("medical_record_document").unwrap(),
            FileType::MedicalRecordDocument
        );
        assert!(FileType::from_str("video").is_err());
    }
}
