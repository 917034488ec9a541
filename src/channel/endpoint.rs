//! Channel endpoint derivation

use crate::error::{Result, SwarmViewError};
use url::Url;

/// Default path suffix of the push channel below the dashboard origin
pub const DEFAULT_CHANNEL_SUFFIX: &str = "ws";

/// Derive the push channel URL from the dashboard's origin and path.
///
/// `http` becomes `ws` and `https` becomes `wss`; the path gains a trailing
/// slash if missing and then `suffix`. Query and fragment are dropped.
pub fn channel_url(origin: &str, suffix: &str) -> Result<Url> {
    let mut url = Url::parse(origin)?;

    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => {
            return Err(SwarmViewError::InvalidUrl(format!(
                "unsupported scheme {} in {}",
                other, origin
            )))
        }
    };
    url.set_scheme(scheme)
        .map_err(|_| SwarmViewError::InvalidUrl(format!("cannot use {} for {}", scheme, origin)))?;

    let mut path = url.path().to_string();
    if !path.ends_with('/') {
        path.push('/');
    }
    path.push_str(suffix.trim_start_matches('/'));
    url.set_path(&path);
    url.set_query(None);
    url.set_fragment(None);

    Ok(url)
}
