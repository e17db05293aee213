use url::Url;

const EMBED_BASE: &str = "https://www.youtube.com/embed/";

/// Rewrites a pasted YouTube link (watch, youtu.be, embed or shorts form)
/// into its embeddable form. Anything else is returned unchanged.
pub fn normalize_video_url(input: &str) -> String {
    if input.is_empty() {
        return String::new();
    }

    match video_id(input) {
        Some(id) => format!("{}{}", EMBED_BASE, id),
        None => input.to_string(),
    }
}

fn video_id(input: &str) -> Option<String> {
    let url = Url::parse(input)
        .ok()
        .filter(|u| u.has_host())
        .or_else(|| Url::parse(&format!("https://{}", input)).ok())?;

    let host = url.host_str()?.to_ascii_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);
    let mut segments = url.path_segments()?.filter(|s| !s.is_empty());

    let id = if host == "youtu.be" {
        segments.next().map(str::to_string)
    } else if host == "youtube.com" || host.ends_with(".youtube.com") {
        match segments.next()? {
            "watch" => url
                .query_pairs()
                .find(|(k, _)| k == "v")
                .map(|(_, v)| v.into_owned()),
            "embed" | "shorts" => segments.next().map(str::to_string),
            _ => None,
        }
    } else {
        None
    };

    id.filter(|id| !id.is_empty() && !id.chars().any(char::is_whitespace))
}
