use crate::model::ChatRequest;
use crate::template::safe_substitute;

pub const LINEARIZATION_VAR: &str = "linearization";

/// Renders one request per linearization into the template's final message.
///
/// Every other field of `base` is copied unchanged. A template without messages
/// yields plain copies.
pub fn materialize_requests(base: &ChatRequest, linearizations: &[String]) -> Vec<ChatRequest> {
    let prompt = base.last_content().unwrap_or_default();
    linearizations
        .iter()
        .map(|lin| {
            let mut req = base.clone();
            if let Some(last) = req.messages.last_mut() {
                last.content = safe_substitute(prompt, &[(LINEARIZATION_VAR, lin)]);
            }
            req
        })
        .collect()
}
