use rand::seq::SliceRandom;

const COVER_IMAGES: &[&str] = &[
    "/covers/adobe.png",
    "/covers/amazon.png",
    "/covers/facebook.png",
    "/covers/hostinger.png",
    "/covers/pinterest.png",
    "/covers/quora.png",
    "/covers/reddit.png",
    "/covers/skype.png",
    "/covers/spotify.png",
    "/covers/telegram.png",
    "/covers/tiktok.png",
    "/covers/yahoo.png",
];

/// Picks a cover image path for a new interview card.
pub fn random_cover() -> String {
    COVER_IMAGES
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(COVER_IMAGES[0])
        .to_string()
}
