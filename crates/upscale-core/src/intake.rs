//! File intake validation.
//!
//! Picks the first candidate of a selection and checks it against the size
//! limit. Anything within the limit is accepted, including content types the
//! backend may not understand; routing for those is decided at transfer time.

use crate::error::UpscaleError;
use crate::models::{CandidateFile, SelectedFile};

pub struct IntakeValidator {
    max_file_size: u64,
}

impl IntakeValidator {
    pub fn new(max_file_size: u64) -> Self {
        Self { max_file_size }
    }

    pub fn max_file_size(&self) -> u64 {
        self.max_file_size
    }

    /// Validate file size
    pub fn validate_file_size(&self, size: u64) -> Result<(), UpscaleError> {
        if size > self.max_file_size {
            return Err(UpscaleError::OversizeFile {
                size,
                max: self.max_file_size,
            });
        }
        Ok(())
    }

    /// Take the first candidate and validate it. `Ok(None)` for an empty selection.
    pub fn select_first<I>(&self, candidates: I) -> Result<Option<SelectedFile>, UpscaleError>
    where
        I: IntoIterator<Item = CandidateFile>,
    {
        let Some(candidate) = candidates.into_iter().next() else {
            return Ok(None);
        };

        self.validate_file_size(candidate.size)?;
        Ok(Some(SelectedFile::from(candidate)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MediaKind;

    fn candidate(name: &str, content_type: &str, size: u64) -> CandidateFile {
        CandidateFile::new(format!("/tmp/{}", name), name, content_type, size)
    }

    #[test]
    fn test_validate_file_size_ok() {
        let validator = IntakeValidator::new(1024);
        assert!(validator.validate_file_size(0).is_ok());
        assert!(validator.validate_file_size(1024).is_ok());
    }

    #[test]
    fn test_validate_file_size_too_large() {
        let validator = IntakeValidator::new(1024);
        assert!(matches!(
            validator.validate_file_size(1025),
            Err(UpscaleError::OversizeFile {
                size: 1025,
                max: 1024
            })
        ));
    }

    #[test]
    fn test_select_first_only() {
        let validator = IntakeValidator::new(1024);
        let selected = validator
            .select_first(vec![
                candidate("a.png", "image/png", 10),
                candidate("b.mp4", "video/mp4", 10_000),
            ])
            .unwrap()
            .unwrap();
        assert_eq!(selected.file_name, "a.png");
        assert_eq!(selected.kind, MediaKind::Image);
    }

    #[test]
    fn test_select_first_oversize_ignores_rest() {
        let validator = IntakeValidator::new(1024);
        let result = validator.select_first(vec![
            candidate("big.mp4", "video/mp4", 4096),
            candidate("small.png", "image/png", 10),
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_select_empty() {
        let validator = IntakeValidator::new(1024);
        assert!(validator.select_first(Vec::new()).unwrap().is_none());
    }

    #[test]
    fn test_unsupported_is_accepted() {
        let validator = IntakeValidator::new(1024);
        let selected = validator
            .select_first(vec![candidate("doc.pdf", "application/pdf", 10)])
            .unwrap()
            .unwrap();
        assert_eq!(selected.kind, MediaKind::Unsupported);
    }
}
