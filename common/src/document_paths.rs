//! Paths of the documents and objects a report is spread across.

pub fn user(user_id: &str) -> String {
    format!("users/{user_id}")
}

pub fn reports(user_id: &str) -> String {
    format!("{}/reports", user(user_id))
}

pub fn report_upload(user_id: &str, file_name: &str) -> String {
    format!("{}/{file_name}", reports(user_id))
}

pub fn file(user_id: &str, file_name: &str) -> String {
    format!("{}/{file_name}", user(user_id))
}

pub fn file_meta_data(user_id: &str, file_name: &str) -> String {
    format!("{}/report_meta_data", file(user_id, file_name))
}

pub fn cached_answer(user_id: &str, file_name: &str, observation_index: usize) -> String {
    format!("{}/cached_answer_{observation_index}", file(user_id, file_name))
}

/// Splits `users/{uid}/reports/{file_name}` into its user and file name.
pub fn parse_report_upload(path: &str) -> Option<(&str, &str)> {
    let mut parts = path.split('/');
    let (Some("users"), Some(user_id), Some("reports"), Some(file_name), None) =
        (parts.next(), parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return None;
    };
    if user_id.is_empty() || file_name.is_empty() {
        return None;
    }
    Some((user_id, file_name))
}
