// Dataset invariants for the billboard cards and sponsor banners.
// These tests are native-friendly and avoid wasm/browser APIs.

use std::collections::HashSet;

use vibejam_cityscape::scene::layout::{handle_url, sections};
use vibejam_cityscape::{CARDS, SPONSORS};

#[test]
fn card_titles_are_unique_and_nonempty() {
    let mut seen = HashSet::new();
    for card in &CARDS {
        assert!(!card.title.is_empty());
        assert!(!card.body.trim().is_empty(), "empty body for '{}'", card.title);
        assert!(seen.insert(card.title), "duplicate card title '{}'", card.title);
        assert!(card.style.font_px > 0.0);
    }
}

#[test]
fn exactly_one_sponsors_card() {
    assert_eq!(CARDS.iter().filter(|c| c.is_sponsors()).count(), 1);
}

#[test]
fn jury_handles_all_link_to_x() {
    let jury = CARDS.iter().find(|c| c.title == "Meet the Jury").expect("jury card");
    let parts = sections(jury.body);
    assert_eq!(parts.len(), 5);
    for s in parts {
        let url = s.link.expect("every jury entry is a handle");
        assert!(url.starts_with("https://x.com/"), "{url}");
        assert_eq!(url.trim_start_matches("https://x.com/"), s.text.trim_start_matches('@'));
    }
}

#[test]
fn plain_text_has_no_link() {
    assert_eq!(handle_url("Join us"), None);
    assert_eq!(handle_url("@"), None);
    assert_eq!(handle_url("@two words"), None);
}

#[test]
fn sponsors_are_well_formed() {
    let mut urls = HashSet::new();
    for s in &SPONSORS {
        assert!(s.url.starts_with("https://"), "{}", s.url);
        assert!(urls.insert(s.url), "duplicate url {}", s.url);
        assert!(s.banner_text.starts_with("Sponsored by\n@"), "{:?}", s.banner_text);
        assert!(s.color <= 0xff_ffff);
        let handle = s.banner_text.rsplit('@').next().unwrap_or_default();
        let sponsors_card = CARDS.iter().find(|c| c.is_sponsors()).expect("sponsors card");
        assert!(sponsors_card.body.contains(handle), "card does not mention @{handle}");
    }
}
