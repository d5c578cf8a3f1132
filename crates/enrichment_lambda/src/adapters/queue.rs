pub trait BatchQueue {
    fn send_message(&self, payload: &[u8]) -> Result<(), String>;
}
