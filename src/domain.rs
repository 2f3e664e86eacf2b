use psl::Psl;

/// Public Suffix List extractor for registrable-domain comparisons.
pub fn new_extractor() -> psl::List {
    psl::List
}

/// Extract the registrable domain (eTLD+1) from a URL.
///
/// `http://www.example.co.uk/path` -> `example.co.uk`. Subdomains are folded
/// into their parent, so `www.a.com` and `a.com` compare equal. Returns `None`
/// for unparseable URLs, URLs without a host, and IP-address hosts — callers
/// treat that as "skip this record", never as a failure.
pub fn registrable_domain(extractor: &psl::List, raw_url: &str) -> Option<String> {
    let parsed = url::Url::parse(raw_url).ok()?;
    let host = parsed.host_str()?;

    // IP addresses have no registrable domain
    if matches!(
        parsed.host(),
        Some(url::Host::Ipv4(_)) | Some(url::Host::Ipv6(_))
    ) {
        return None;
    }

    // The url crate already lowercases and punycodes domain hosts.
    let domain = extractor.domain(host.as_bytes())?;
    std::str::from_utf8(domain.as_bytes())
        .ok()
        .map(str::to_string)
}
