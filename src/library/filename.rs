//! Metadata guesses from common file-naming schemes.
//!
//! Recognized stems, checked in order:
//! - `[Album] Artist - Title`
//! - `(Year) Artist - Title`
//! - `Artist - Album - Title`
//! - `Artist - Title`

#[derive(Debug, Default, PartialEq, Eq)]
pub struct FilenameGuess {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub year: Option<u32>,
}

pub fn guess_from_stem(stem: &str) -> FilenameGuess {
    if let Some(rest) = stem.strip_prefix('[') {
        if let Some((album, tail)) = rest.split_once(']') {
            if let Some((artist, title)) = tail.split_once('-') {
                return FilenameGuess {
                    title: non_empty(title),
                    artist: non_empty(artist),
                    album: non_empty(album),
                    year: None,
                };
            }
        }
    }

    if let Some(rest) = stem.strip_prefix('(') {
        if let Some((year, tail)) = rest.split_once(')') {
            let year = year.trim();
            if year.len() == 4 && year.bytes().all(|b| b.is_ascii_digit()) {
                if let Some((artist, title)) = tail.split_once('-') {
                    return FilenameGuess {
                        title: non_empty(title),
                        artist: non_empty(artist),
                        album: None,
                        year: year.parse().ok(),
                    };
                }
            }
        }
    }

    let parts: Vec<&str> = stem.split(" - ").collect();
    match parts.len() {
        0 | 1 => FilenameGuess::default(),
        2 => FilenameGuess {
            title: non_empty(parts[1]),
            artist: non_empty(parts[0]),
            ..FilenameGuess::default()
        },
        _ => FilenameGuess {
            title: non_empty(&parts[2..].join(" - ")),
            artist: non_empty(parts[0]),
            album: non_empty(parts[1]),
            year: None,
        },
    }
}

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}
