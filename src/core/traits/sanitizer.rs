/// Port for stripping untrusted markup down to an allow-listed subset.
///
/// Room content is untrusted; everything downstream of the sanitizer
/// may assume only allow-listed tags remain.
pub trait ContentSanitizer: Send + Sync {
    fn sanitize(&self, raw: &str) -> String;
}
