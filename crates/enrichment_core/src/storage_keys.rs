pub const ARTIFACT_CONTENT_TYPE: &str = "application/json";
pub const PRESIGNED_URL_EXPIRY_SECONDS: u64 = 3_600;

/// Object key for a request's aggregated artifact.
pub fn aggregated_artifact_key(request_id: &str) -> String {
    format!("{request_id}_aggregated.json")
}
