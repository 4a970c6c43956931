use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use super::{FetchError, NodeDescriptor, Result, VMESS_PREFIX};

const LENIENT: GeneralPurposeConfig = GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent);
const STANDARD: GeneralPurpose = GeneralPurpose::new(&alphabet::STANDARD, LENIENT);
const URL_SAFE: GeneralPurpose = GeneralPurpose::new(&alphabet::URL_SAFE, LENIENT);

/// Decode a subscription blob, dropping anything that does not parse.
///
/// Returns an empty vector when the blob is unusable; see
/// [`decode_subscription`] for the reason.
pub fn decode(raw: &str) -> Vec<NodeDescriptor> {
    decode_subscription(raw).unwrap_or_else(|e| {
        warn!("{}", e);
        Vec::new()
    })
}

/// Decode a subscription blob into node descriptors.
///
/// Only `vmess://` lines are considered. Each record is decoded on its own and
/// a malformed one is skipped without affecting the others.
pub fn decode_subscription(raw: &str) -> Result<Vec<NodeDescriptor>> {
    let payload = decode_text(raw)?;

    let links: Vec<&str> = payload
        .lines()
        .map(str::trim)
        .filter_map(|line| line.strip_prefix(VMESS_PREFIX))
        .collect();
    info!("Subscription decoded, found {} vmess links", links.len());

    let nodes: Vec<NodeDescriptor> = links
        .iter()
        .enumerate()
        .filter_map(|(i, link)| match parse_link(link) {
            Ok(node) => Some(node),
            Err(e) => {
                debug!("Skipping vmess link #{}: {}", i + 1, e);
                None
            }
        })
        .collect();

    if nodes.is_empty() {
        return Err(FetchError::EmptySubscription);
    }
    Ok(nodes)
}

/// Base64-decode `raw` into UTF-8 text, trying the standard alphabet first.
fn decode_text(raw: &str) -> Result<String> {
    let compact: String = raw.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    if compact.is_empty() {
        return Err(FetchError::Decode("empty payload".into()));
    }

    let standard = STANDARD
        .decode(&compact)
        .map_err(|e| e.to_string())
        .and_then(|bytes| String::from_utf8(bytes).map_err(|e| e.to_string()));

    match standard {
        Ok(text) => Ok(text),
        Err(standard_err) => URL_SAFE
            .decode(&compact)
            .map_err(|e| e.to_string())
            .and_then(|bytes| String::from_utf8(bytes).map_err(|e| e.to_string()))
            .map_err(|url_safe_err| {
                FetchError::Decode(format!("standard: {}; url-safe: {}", standard_err, url_safe_err))
            }),
    }
}

fn parse_link(link: &str) -> Result<NodeDescriptor> {
    let json = decode_text(link)?;
    let record: Map<String, Value> =
        serde_json::from_str(&json).map_err(|e| FetchError::Decode(format!("invalid node record: {}", e)))?;
    NodeDescriptor::from_record(record)
}
