//! Naming uploaded reports by their content.

use common::document_paths;

/// Reports are stored under the SHA-256 of their text, so uploading the same
/// text twice lands on the same file.
pub fn report_file_name(medical_report_content: &str) -> String {
    sha256::digest(medical_report_content)
}

/// Returns the already uploaded file holding this exact report, if any.
pub fn find_existing_report<'a, I>(
    existing_file_names: I,
    medical_report_content: &str,
) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    let file_name = report_file_name(medical_report_content);
    existing_file_names.into_iter().find(|existing| *existing == file_name)
}

/// Upload location of a new report, or the existing file for a duplicate.
pub fn report_upload_target<'a, I>(
    user_id: &str,
    existing_file_names: I,
    medical_report_content: &str,
) -> UploadTarget
where
    I: IntoIterator<Item = &'a str>,
{
    match find_existing_report(existing_file_names, medical_report_content) {
        Some(existing) => {
            tracing::info!("Report already uploaded as {}", existing);
            UploadTarget::Existing(existing.to_string())
        }
        None => {
            let file_name = report_file_name(medical_report_content);
            UploadTarget::New(document_paths::report_upload(user_id, &file_name))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadTarget {
    /// Storage path to upload the report to.
    New(String),
    /// File name of the identical report already uploaded.
    Existing(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_report_by_hash() {
        assert_eq!(
            report_file_name("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn detects_duplicate_upload() {
        let existing = report_file_name("No acute findings.");
        let names = vec!["0000", existing.as_str()];
        assert_eq!(find_existing_report(names.iter().copied(), "No acute findings."), Some(existing.as_str()));
        assert_eq!(find_existing_report(names.iter().copied(), "Small effusion."), None);

        assert_eq!(
            report_upload_target("u1", names.iter().copied(), "No acute findings."),
            UploadTarget::Existing(existing.clone())
        );
        assert_eq!(
            report_upload_target("u1", names.iter().copied(), "abc"),
            UploadTarget::New("users/u1/reports/ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad".to_string())
        );
    }
}
