use actix_web::http::header::{HeaderMap, USER_AGENT};
use common::misc;
use db::dtos::qr::ScanCreateRequest;

/// Country headers set by the CDNs we run behind, in order of preference.
const COUNTRY_HEADERS: [&str; 3] = ["cf-ipcountry", "x-vercel-ip-country", "x-country-code"];
const CITY_HEADER: &str = "x-vercel-ip-city";

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

pub fn device_class(ua: &str) -> &'static str {
    let ua = ua.to_ascii_lowercase();
    if ["bot", "crawler", "spider", "curl", "wget"].iter().any(|b| ua.contains(b)) {
        "bot"
    } else if ua.contains("ipad") || ua.contains("tablet") || (ua.contains("android") && !ua.contains("mobile")) {
        "tablet"
    } else if ua.contains("mobi") || ua.contains("iphone") || ua.contains("android") {
        "mobile"
    } else {
        "desktop"
    }
}

pub fn browser_family(ua: &str) -> &'static str {
    if ua.contains("Edg/") || ua.contains("EdgA/") || ua.contains("EdgiOS/") {
        "Edge"
    } else if ua.contains("OPR/") || ua.contains("Opera") {
        "Opera"
    } else if ua.contains("SamsungBrowser/") {
        "Samsung Internet"
    } else if ua.contains("Firefox/") || ua.contains("FxiOS/") {
        "Firefox"
    } else if ua.contains("Chrome/") || ua.contains("CriOS/") {
        "Chrome"
    } else if ua.contains("Safari/") {
        "Safari"
    } else {
        "Other"
    }
}

pub fn os_family(ua: &str) -> &'static str {
    // iOS agents also claim "like Mac OS X", Android agents also claim Linux
    if ua.contains("Windows") {
        "Windows"
    } else if ua.contains("iPhone") || ua.contains("iPad") || ua.contains("iPod") {
        "iOS"
    } else if ua.contains("Android") {
        "Android"
    } else if ua.contains("CrOS") {
        "ChromeOS"
    } else if ua.contains("Mac OS X") || ua.contains("Macintosh") {
        "macOS"
    } else if ua.contains("Linux") {
        "Linux"
    } else {
        "Other"
    }
}

/// `City, CC`, `CC` or `City`, from CDN geo headers.
pub fn location(headers: &HeaderMap) -> Option<String> {
    let country = COUNTRY_HEADERS
        .iter()
        .filter_map(|name| header(headers, name))
        .find(|cc| *cc != "XX");
    let city = header(headers, CITY_HEADER).map(|raw| {
        url::form_urlencoded::parse(format!("c={}", raw).as_bytes())
            .map(|(_, v)| v.into_owned())
            .next()
            .unwrap_or_else(|| raw.to_string())
    });

    match (city, country) {
        (Some(city), Some(cc)) => Some(format!("{}, {}", city, cc)),
        (None, Some(cc)) => Some(cc.to_string()),
        (Some(city), None) => Some(city),
        (None, None) => None,
    }
}

/// Everything we can tell about the scanning device. Absent headers give absent fields.
pub fn scan_metadata(headers: &HeaderMap, client: Option<String>) -> ScanCreateRequest {
    let ua = headers
        .get(USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.trim().is_empty());

    ScanCreateRequest {
        device: ua.map(|ua| device_class(ua).to_string()),
        browser: ua.map(|ua| browser_family(ua).to_string()),
        os: ua.map(|ua| os_family(ua).to_string()),
        location: location(headers),
        ip_address: client.filter(|c| c != misc::UNKNOWN_CLIENT),
    }
}
