//! Station name normalization.
//!
//! Upstream names are upper-case, lose their apostrophes (`D ALLEVARD`) and
//! sometimes carry a snow-station marker (`-NIVO`, `_NIVO`, `NIVOSE`).
//! Normalization is deterministic and idempotent.

/// Particles kept lower-case unless they start the name.
const PARTICLES: &[&str] = &[
    "de", "du", "des", "la", "le", "les", "et", "à", "au", "aux", "sur", "sous", "par", "en",
    "chez", "l", "d",
];

/// Elided particles: always lower-case before an apostrophe.
const ELIDED: &[&str] = &["d", "l"];

/// Trailing snow-station markers.
const SNOW_MARKERS: &[&str] = &["nivo", "nivose"];

/// Normalize a raw station name.
///
/// ```
/// use station_fusion::stations::normalize_name;
///
/// assert_eq!(normalize_name("d Allevard-NIVO"), "d'Allevard");
/// assert_eq!(normalize_name("LE BOURG D OISANS"), "Le Bourg d'Oisans");
/// ```
pub fn normalize_name(raw: &str) -> String {
    let tokens = restore_apostrophes(raw.split_whitespace());
    let joined = tokens.join(" ");
    capitalize(strip_snow_markers(&joined))
}

/// Join `d`/`l` tokens to the following word: `D ALLEVARD` -> `D'ALLEVARD`.
///
/// The particle may also end a hyphenated token (`BOURG-D OISANS`).
fn restore_apostrophes<'a>(words: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for word in words {
        let joins = out.last().is_some_and(|prev| ends_with_elided(prev))
            && word.chars().next().is_some_and(char::is_alphabetic);
        match out.last_mut() {
            Some(prev) if joins => {
                prev.push('\'');
                prev.push_str(word);
            }
            _ => out.push(word.to_string()),
        }
    }
    out
}

fn ends_with_elided(token: &str) -> bool {
    let last = token.rsplit('-').next().unwrap_or(token);
    let mut chars = last.chars();
    matches!(
        (chars.next(), chars.next()),
        (Some('d' | 'D' | 'l' | 'L'), None)
    )
}

/// Remove trailing snow markers separated by a space, `-` or `_`.
///
/// A name made only of a marker is left alone.
fn strip_snow_markers(name: &str) -> &str {
    let mut name = name.trim();
    while let Some(pos) = name.rfind([' ', '-', '_']) {
        let (head, tail) = (&name[..pos], &name[pos + 1..]);
        let is_marker = SNOW_MARKERS.iter().any(|m| tail.eq_ignore_ascii_case(m));
        if !is_marker || head.trim().is_empty() {
            break;
        }
        name = head.trim_end_matches([' ', '-', '_']);
    }
    name
}

/// Title-case each hyphen segment, keeping particles lower-case.
fn capitalize(name: &str) -> String {
    let lowered = name.to_lowercase();
    let mut is_first = true;
    let mut words = Vec::new();

    for word in lowered.split_whitespace() {
        let mut parts = Vec::new();
        for part in word.split('-') {
            parts.push(capitalize_part(part, is_first));
            is_first = false;
        }
        words.push(parts.join("-"));
    }

    words.join(" ")
}

fn capitalize_part(part: &str, is_first: bool) -> String {
    if let Some((pre, post)) = part.split_once('\'') {
        let pre = if ELIDED.contains(&pre) {
            pre.to_string()
        } else if is_first || !PARTICLES.contains(&pre) {
            cap_first(pre)
        } else {
            pre.to_string()
        };
        return format!("{pre}'{}", cap_first(post));
    }

    if is_first || !PARTICLES.contains(&part) {
        cap_first(part)
    } else {
        part.to_string()
    }
}

/// Upper-case the first character of an already lower-cased string.
fn cap_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn restores_apostrophe_and_strips_marker() {
        assert_eq!(normalize_name("d Allevard-NIVO"), "d'Allevard");
    }

    #[test]
    fn strips_every_marker_form() {
        assert_eq!(normalize_name("ALPE D HUEZ-NIVO"), "Alpe d'Huez");
        assert_eq!(normalize_name("ALPE D HUEZ_NIVO"), "Alpe d'Huez");
        assert_eq!(normalize_name("ALPE D HUEZ NIVOSE"), "Alpe d'Huez");
        assert_eq!(normalize_name("alpe d huez-nivo"), "Alpe d'Huez");
        assert_eq!(normalize_name("ALPE D HUEZ NIVO NIVOSE"), "Alpe d'Huez");
    }

    #[test]
    fn marker_alone_is_kept() {
        assert_eq!(normalize_name("NIVOSE"), "Nivose");
    }

    #[test]
    fn marker_inside_word_is_kept() {
        assert_eq!(normalize_name("NIVOLET"), "Nivolet");
        assert_eq!(normalize_name("COL NIVOSETTE"), "Col Nivosette");
    }

    #[test]
    fn hyphenated_particles() {
        assert_eq!(normalize_name("BOURG-D OISANS"), "Bourg-d'Oisans");
        assert_eq!(normalize_name("ST-PIERRE-DE-CHARTREUSE"), "St-Pierre-de-Chartreuse");
        assert_eq!(normalize_name("LE CHATEL-EN-VERCORS"), "Le Chatel-en-Vercors");
    }

    #[test]
    fn leading_particle_is_capitalized() {
        assert_eq!(normalize_name("LA MURE"), "La Mure");
        assert_eq!(normalize_name("LES DEUX ALPES"), "Les Deux Alpes");
    }

    #[test]
    fn elided_particle_with_lowercase_word() {
        assert_eq!(normalize_name("PONT DE L ARC"), "Pont de l'Arc");
    }

    #[test]
    fn particle_before_non_letter_is_not_joined() {
        assert_eq!(normalize_name("ROUTE D 12"), "Route d 12");
    }

    #[test]
    fn collapses_whitespace() {
        assert_eq!(normalize_name("  VAL   THORENS  "), "Val Thorens");
        assert_eq!(normalize_name(""), "");
    }

    #[test]
    fn accented_letters() {
        assert_eq!(normalize_name("SÉEZ"), "Séez");
        assert_eq!(normalize_name("ÉCOLE À LA MONTAGNE"), "École à la Montagne");
    }
}
