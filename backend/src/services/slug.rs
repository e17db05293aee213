/// Bengali Unicode block.
const BENGALI: std::ops::RangeInclusive<char> = '\u{0980}'..='\u{09FF}';

fn is_slug_char(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit() || BENGALI.contains(&c)
}

/// Derives a URL-safe identifier from a title: lower-cased, every run of
/// characters outside `[a-z0-9]` and the Bengali block collapsed to `-`,
/// with no hyphen at either end.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_hyphen = false;

    for c in text.chars().flat_map(char::to_lowercase) {
        if is_slug_char(c) {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c);
        } else {
            pending_hyphen = true;
        }
    }

    slug
}

/// True when `slug` is already in the form [`slugify`] produces.
pub fn is_slug(slug: &str) -> bool {
    !slug.is_empty() && slugify(slug) == slug
}
