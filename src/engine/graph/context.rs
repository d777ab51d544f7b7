// ── TabPilot Engine: Browse Context Classification ─────────────────────────
//
// Assigns each graph node a coarse activity class (work, research,
// shopping, social, entertainment, other) from its domain and keywords.
// Keyword heuristics only — fast, deterministic, no model involved. The
// class feeds cluster reason strings and pattern context labels.

use crate::atoms::graph_types::BrowseContext;

/// Classify one tab's activity from its extracted keywords and domain.
/// Domain matches count double: landing on github.com says more than the
/// word "issue" appearing in a title.
pub fn classify_context(keywords: &[String], domain: &str) -> BrowseContext {
    let mut work = 0u32;
    let mut research = 0u32;
    let mut shopping = 0u32;
    let mut social = 0u32;
    let mut entertainment = 0u32;

    if domain_in(domain, &[
        "github.com", "gitlab.com", "bitbucket.org", "stackoverflow.com", "atlassian.net",
        "jira.com", "slack.com", "notion.so", "linear.app", "figma.com", "vercel.com",
        "docs.google.com", "drive.google.com", "calendar.google.com",
    ]) {
        work += 2;
    }
    if domain_in(domain, &[
        "wikipedia.org", "arxiv.org", "scholar.google.com", "docs.rs", "developer.mozilla.org",
        "medium.com", "substack.com",
    ]) {
        research += 2;
    }
    if domain_in(domain, &[
        "amazon.com", "ebay.com", "etsy.com", "aliexpress.com", "walmart.com", "target.com",
        "bestbuy.com", "shopify.com",
    ]) {
        shopping += 2;
    }
    if domain_in(domain, &[
        "twitter.com", "x.com", "facebook.com", "instagram.com", "linkedin.com", "reddit.com",
        "tiktok.com", "threads.net", "mastodon.social", "discord.com", "whatsapp.com",
    ]) {
        social += 2;
    }
    if domain_in(domain, &[
        "youtube.com", "netflix.com", "twitch.tv", "spotify.com", "hulu.com", "disneyplus.com",
        "soundcloud.com", "vimeo.com",
    ]) {
        entertainment += 2;
    }

    for kw in keywords {
        match kw.as_str() {
            "code" | "commit" | "merge" | "deploy" | "issue" | "issues" | "pull" | "review"
            | "sprint" | "standup" | "meeting" | "project" | "dashboard" | "admin" | "jira"
            | "ticket" | "release" => work += 1,
            "paper" | "study" | "research" | "tutorial" | "documentation" | "docs" | "guide"
            | "learn" | "course" | "wiki" | "analysis" | "reference" | "article" => research += 1,
            "cart" | "checkout" | "price" | "deal" | "deals" | "order" | "shipping" | "product"
            | "shop" | "store" | "sale" | "wishlist" => shopping += 1,
            "profile" | "feed" | "post" | "posts" | "follow" | "friend" | "message" | "chat"
            | "tweet" | "social" => social += 1,
            "video" | "watch" | "movie" | "music" | "stream" | "episode" | "playlist" | "game"
            | "trailer" | "live" => entertainment += 1,
            _ => {}
        }
    }

    let scored = [
        (BrowseContext::Work, work),
        (BrowseContext::Research, research),
        (BrowseContext::Shopping, shopping),
        (BrowseContext::Social, social),
        (BrowseContext::Entertainment, entertainment),
    ];
    let best = scored.iter().max_by_key(|(_, score)| *score);
    match best {
        Some((ctx, score)) if *score > 0 => *ctx,
        _ => BrowseContext::Other,
    }
}

fn domain_in(domain: &str, candidates: &[&str]) -> bool {
    // Subdomains match their parent: gist.github.com is still github.
    candidates.iter().any(|c| domain == *c || domain.ends_with(&format!(".{c}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kws(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn test_work_domain() {
        assert_eq!(classify_context(&kws(&["cargo"]), "github.com"), BrowseContext::Work);
        assert_eq!(classify_context(&[], "gist.github.com"), BrowseContext::Work);
    }

    #[test]
    fn test_social_domain() {
        assert_eq!(classify_context(&[], "linkedin.com"), BrowseContext::Social);
        assert_eq!(classify_context(&[], "reddit.com"), BrowseContext::Social);
    }

    #[test]
    fn test_keyword_signals() {
        assert_eq!(
            classify_context(&kws(&["cart", "checkout", "shipping"]), "smallshop.example"),
            BrowseContext::Shopping
        );
        assert_eq!(
            classify_context(&kws(&["paper", "study"]), "journals.example"),
            BrowseContext::Research
        );
    }

    #[test]
    fn test_domain_outvotes_single_keyword() {
        // One shopping keyword on YouTube still classifies as entertainment.
        assert_eq!(
            classify_context(&kws(&["deal"]), "youtube.com"),
            BrowseContext::Entertainment
        );
    }

    #[test]
    fn test_no_signal_is_other() {
        assert_eq!(classify_context(&kws(&["quarterly"]), "intranet.example"), BrowseContext::Other);
        assert_eq!(classify_context(&[], ""), BrowseContext::Other);
    }
}
