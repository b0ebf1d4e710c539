use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

fn hmac_sha256_hex(secret: &str, payload: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC can take key of any size");
    mac.update(payload.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// BingX signature: HMAC-SHA256 over the raw query string, lower-case hex.
pub fn sign_bingx(query_string: &str, secret_key: &str) -> String {
    hmac_sha256_hex(secret_key, query_string)
}

/// Bybit V5 signature: HMAC-SHA256 over `timestamp + api_key + recv_window + query`.
pub fn sign_bybit(
    timestamp: i64,
    api_key: &str,
    recv_window: u64,
    query_string: &str,
    secret_key: &str,
) -> String {
    let payload = format!("{}{}{}{}", timestamp, api_key, recv_window, query_string);
    hmac_sha256_hex(secret_key, &payload)
}

pub fn now_unix_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
