//! URL slug derivation for listing titles.
//!
//! Listings are mostly written in Turkish, so plain ASCII filtering would
//! turn "Deniz Manzaralı Daire" into "deniz-manzaral-daire". Letters with
//! diacritics are folded to their ASCII base before the usual
//! lowercase / collapse / trim pass.

/// Separator placed between slug words.
pub const SLUG_SEPARATOR: char = '-';

/// Generate a URL-safe slug from a listing title.
///
/// Lowercases, folds diacritics (`ş` -> `s`, `İ` -> `i`, `é` -> `e`, ...),
/// replaces every run of non-alphanumeric characters with a single hyphen,
/// and trims leading/trailing hyphens.
pub fn slugify(title: &str) -> String {
    let mut result = String::with_capacity(title.len());
    let mut prev_separator = true;

    for c in title.chars() {
        // Combining marks of decomposed input ("e\u{301}") belong to the
        // preceding letter.
        if is_combining_mark(c) {
            continue;
        }

        if c.is_ascii_alphanumeric() {
            result.push(c.to_ascii_lowercase());
            prev_separator = false;
        } else if let Some(folded) = fold_diacritic(c) {
            result.push_str(folded);
            prev_separator = false;
        } else if !prev_separator {
            result.push(SLUG_SEPARATOR);
            prev_separator = true;
        }
    }

    // At most one trailing hyphen can remain.
    if result.ends_with(SLUG_SEPARATOR) {
        result.pop();
    }
    result
}

/// Returns `true` if `slug` is already in canonical slug form.
pub fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty() && slugify(slug) == slug
}

fn is_combining_mark(c: char) -> bool {
    matches!(c, '\u{0300}'..='\u{036F}')
}

/// ASCII replacement for a non-ASCII letter, already lowercased.
fn fold_diacritic(c: char) -> Option<&'static str> {
    let folded = match c {
        // Turkish
        'ç' | 'Ç' => "c",
        'ğ' | 'Ğ' => "g",
        'ı' | 'İ' => "i",
        'ö' | 'Ö' => "o",
        'ş' | 'Ş' => "s",
        'ü' | 'Ü' => "u",
        // Latin-1 / Latin Extended-A
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'ā' | 'ă' | 'ą' => "a",
        'À' | 'Á' | 'Â' | 'Ã' | 'Ä' | 'Å' | 'Ā' | 'Ă' | 'Ą' => "a",
        'è' | 'é' | 'ê' | 'ë' | 'ē' | 'ė' | 'ę' | 'ě' => "e",
        'È' | 'É' | 'Ê' | 'Ë' | 'Ē' | 'Ė' | 'Ę' | 'Ě' => "e",
        'ì' | 'í' | 'î' | 'ï' | 'ī' | 'į' => "i",
        'Ì' | 'Í' | 'Î' | 'Ï' | 'Ī' | 'Į' => "i",
        'ò' | 'ó' | 'ô' | 'õ' | 'ø' | 'ō' | 'ő' => "o",
        'Ò' | 'Ó' | 'Ô' | 'Õ' | 'Ø' | 'Ō' | 'Ő' => "o",
        'ù' | 'ú' | 'û' | 'ū' | 'ů' | 'ű' | 'ų' => "u",
        'Ù' | 'Ú' | 'Û' | 'Ū' | 'Ů' | 'Ű' | 'Ų' => "u",
        'ý' | 'ÿ' | 'Ý' | 'Ÿ' => "y",
        'ñ' | 'ń' | 'ň' | 'Ñ' | 'Ń' | 'Ň' => "n",
        'ć' | 'č' | 'Ć' | 'Č' => "c",
        'ś' | 'š' | 'Ś' | 'Š' => "s",
        'ź' | 'ż' | 'ž' | 'Ź' | 'Ż' | 'Ž' => "z",
        'ł' | 'Ł' => "l",
        'ř' | 'Ř' => "r",
        'ď' | 'Ď' => "d",
        'ť' | 'Ť' => "t",
        'ß' => "ss",
        'æ' | 'Æ' => "ae",
        'œ' | 'Œ' => "oe",
        _ => return None,
    };
    Some(folded)
}
