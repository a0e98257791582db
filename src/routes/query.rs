use serde::Deserialize;

/// The secure media gateway's query string. `key` stays optional here
/// so its absence surfaces as a 400 from the handler instead of a
/// generic filter mismatch.
#[derive(Clone, Debug, Deserialize)]
pub struct MediaQuery {
    #[serde(default)]
    pub key: Option<String>,
}
