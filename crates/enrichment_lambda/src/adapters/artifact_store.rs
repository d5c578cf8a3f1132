pub trait ArtifactStore {
    /// Publishes the artifact body under `key` and returns a time-limited
    /// retrieval URL.
    fn publish_artifact(&self, key: &str, body: &[u8], content_type: &str)
        -> Result<String, String>;
}
