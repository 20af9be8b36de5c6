/// Normalised RGB triple with every channel in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgb {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

/// Resolves a `#rgb` / `#rrggbb` hex color (leading `#` optional, case-insensitive).
///
/// Returns `None` for anything else; callers skip the color instead of failing.
pub fn resolve(hex: &str) -> Option<Rgb> {
    let digits = hex.strip_prefix('#').unwrap_or(hex);
    if !digits.bytes().all(|byte| byte.is_ascii_hexdigit()) {
        return None;
    }

    let expanded: String = match digits.len() {
        3 => digits.chars().flat_map(|ch| [ch, ch]).collect(),
        6 => digits.to_string(),
        _ => return None,
    };

    let channel = |index: usize| {
        u8::from_str_radix(&expanded[index..index + 2], 16)
            .ok()
            .map(|byte| f64::from(byte) / 255.0)
    };

    Some(Rgb {
        r: channel(0)?,
        g: channel(2)?,
        b: channel(4)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn shorthand_matches_long_form() {
        let short = resolve("03F").unwrap();
        let long = resolve("0033FF").unwrap();
        assert_eq!(short, long);
        assert!(close(short.r, 0.0));
        assert!(close(short.g, 0.2));
        assert!(close(short.b, 1.0));
    }

    #[test]
    fn accepts_hash_prefix_and_lowercase() {
        assert_eq!(resolve("#a3f"), resolve("aa33ff"));
        assert_eq!(
            resolve("#ff0000"),
            Some(Rgb {
                r: 1.0,
                g: 0.0,
                b: 0.0
            })
        );
    }

    #[test]
    fn rejects_malformed_input() {
        assert_eq!(resolve("notahex"), None);
        assert_eq!(resolve(""), None);
        assert_eq!(resolve("#12345"), None);
        assert_eq!(resolve("##fff"), None);
        assert_eq!(resolve("+12"), None);
        assert_eq!(resolve("fff "), None);
    }
}
