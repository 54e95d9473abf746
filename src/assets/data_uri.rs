use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64_STANDARD};

/// Encode bytes as a base64 `data:` URI.
pub fn encode_data_uri(mime: &str, bytes: &[u8]) -> String {
    format!("data:{mime};base64,{}", BASE64_STANDARD.encode(bytes))
}

/// Whether `s` is a `data:` URI.
pub fn is_data_uri(s: &str) -> bool {
    s.trim_start().starts_with("data:")
}

/// Decode a `data:` URI into its media type and payload.
///
/// Both base64 and plain (percent-encoded) payloads are accepted. Returns `None` for anything
/// that is not a well-formed data URI.
pub fn decode_data_uri(s: &str) -> Option<(String, Vec<u8>)> {
    let rest = s.trim().strip_prefix("data:")?;
    let (meta, payload) = rest.split_once(',')?;
    let mut parts = meta.split(';');
    let mime = parts.next().filter(|m| !m.is_empty()).unwrap_or("text/plain");
    let is_base64 = parts.any(|p| p.eq_ignore_ascii_case("base64"));
    let bytes = if is_base64 {
        let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
        BASE64_STANDARD.decode(compact).ok()?
    } else {
        percent_decode(payload)
    };
    Some((mime.to_ascii_lowercase(), bytes))
}

fn percent_decode(s: &str) -> Vec<u8> {
    let b = s.as_bytes();
    let mut out = Vec::with_capacity(b.len());
    let mut i = 0;
    while i < b.len() {
        if b[i] == b'%' && i + 2 < b.len() {
            let hex = std::str::from_utf8(&b[i + 1..i + 3]).ok();
            if let Some(v) = hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                out.push(v);
                i += 3;
                continue;
            }
        }
        out.push(b[i]);
        i += 1;
    }
    out
}

/// Media type of an asset, sniffed from its bytes with a fallback on the file extension.
pub fn guess_mime(bytes: &[u8], path_hint: &str) -> String {
    if let Ok(fmt) = image::guess_format(bytes) {
        return fmt.to_mime_type().to_string();
    }
    let head = String::from_utf8_lossy(&bytes[..bytes.len().min(256)]);
    let head = head.trim_start();
    if head.starts_with("<svg") || (head.starts_with("<?xml") && head.contains("<svg")) {
        return "image/svg+xml".to_string();
    }
    let ext = path_hint
        .rsplit('.')
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase();
    match ext.as_str() {
        "svg" => "image/svg+xml",
        "mp4" | "m4v" => "video/mp4",
        "webm" => "video/webm",
        "mov" => "video/quicktime",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        _ => "application/octet-stream",
    }
    .to_string()
}

#[cfg(test)]
#[path = "../../tests/unit/assets/data_uri.rs"]
mod tests;
