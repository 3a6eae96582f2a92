use std::time::Duration;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Outbound client shared by the Gemini calls and image fetches. `proxy`
/// accepts any scheme `wreq::Proxy::all` does (http, https, socks5).
pub fn build_client(proxy: Option<&str>) -> Result<wreq::Client, wreq::Error> {
    let mut builder = wreq::Client::builder().connect_timeout(CONNECT_TIMEOUT);
    if let Some(proxy) = proxy.map(str::trim).filter(|proxy| !proxy.is_empty()) {
        builder = builder.proxy(wreq::Proxy::all(proxy)?);
    }
    builder.build()
}
