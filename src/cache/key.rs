/// Cache key for `url`: the MD5 digest of its exact bytes as 32 lowercase
/// hex characters. No normalization is applied, so semantically equal but
/// textually different URLs produce distinct keys.
pub fn key(url: &str) -> String {
    format!("{:x}", md5::compute(url.as_bytes()))
}
