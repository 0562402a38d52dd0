use crate::{context::Headers, error::TransportError};
use hyper::{
    header::{HeaderName, HeaderValue},
    HeaderMap,
};

/// Repeated headers such as `Set-Cookie` are joined with `, `.
pub fn extract_headers(header_map: &HeaderMap) -> Headers {
    let mut headers = Headers::new();

    for (key, value) in header_map.iter() {
        // values with opaque bytes are kept, decoded lossily
        let value = String::from_utf8_lossy(value.as_bytes());
        let joined = match headers.get(key.as_str()) {
            Some(existing) => format!("{}, {}", existing, value),
            None => value.into_owned(),
        };
        headers.insert(key.as_str(), joined);
    }

    headers
}

pub fn put_headers<'a, I: IntoIterator<Item = (&'a str, &'a str)>>(
    header_map: &mut HeaderMap<HeaderValue>,
    headers: I,
) -> Result<(), TransportError> {
    for (key, value) in headers {
        let header_name = HeaderName::from_bytes(key.as_bytes())?;
        let header_value = HeaderValue::from_str(value)?;
        header_map.append(header_name, header_value);
    }

    Ok(())
}
