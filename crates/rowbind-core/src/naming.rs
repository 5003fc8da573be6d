//! Translation between domain names (`FundId`) and storage names (`fund_id`).
//!
//! The pair is asymmetric. Going storage -> domain -> storage is lossless for
//! every name whose underscores are either case boundaries or survive
//! literally (leading, trailing, or followed by a non-letter), with one
//! exception: a name made only of single-letter segments (`x_y`, `a_b_c`)
//! turns into an all-caps domain name (`XY`), which reads back as an acronym
//! (`xy`). Going domain -> storage -> domain is lossy as well: `ABC` becomes
//! `abc` and then `Abc`.

/// Convert a domain name to its storage form.
///
/// Every upper-case letter after the first character gets an underscore in
/// front of it, then the whole name is lower-cased. A name made only of
/// upper-case letters and digits (an acronym such as `ID`) is one word.
pub fn to_storage_name(domain: &str) -> String {
    if is_acronym(domain) {
        return domain.to_ascii_lowercase();
    }

    let mut out = String::with_capacity(domain.len() + 4);
    for c in domain.chars() {
        if c.is_ascii_uppercase() && !out.is_empty() {
            out.push('_');
        }
        out.push(c.to_ascii_lowercase());
    }
    out
}

/// Convert a storage name to its domain form.
///
/// A reversible underscore is dropped and upper-cases the letter after it.
/// Other underscores are copied as-is. The first character is upper-cased,
/// everything else lower-cased.
pub fn to_domain_name(storage: &str) -> String {
    let chars: Vec<char> = storage.chars().collect();
    let mut out = String::with_capacity(storage.len());
    let mut next_upper = true;

    for (i, &c) in chars.iter().enumerate() {
        if is_reversible_underscore(&chars, i) {
            next_upper = true;
            continue;
        }
        if next_upper {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(c.to_ascii_lowercase());
        }
        next_upper = false;
    }
    out
}

/// An underscore marks a case boundary only when it sits strictly inside the
/// name and is followed by a letter.
fn is_reversible_underscore(chars: &[char], i: usize) -> bool {
    if i == 0 || i + 1 >= chars.len() {
        return false;
    }
    chars[i] == '_' && chars[i + 1].is_ascii_alphabetic()
}

fn is_acronym(name: &str) -> bool {
    name.chars().any(|c| c.is_ascii_uppercase())
        && name
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_names() {
        assert_eq!(to_storage_name("ID"), "id");
        assert_eq!(to_storage_name("FundId"), "fund_id");
        assert_eq!(to_storage_name("Name"), "name");
        assert_eq!(to_storage_name("DateValue"), "date_value");
        assert_eq!(to_storage_name("Yield_2date"), "yield_2date");
        assert_eq!(to_storage_name("1_2_3Name"), "1_2_3_name");
        assert_eq!(to_storage_name(""), "");
    }

    #[test]
    fn domain_names() {
        assert_eq!(to_domain_name("ID"), "Id");
        assert_eq!(to_domain_name("FUND"), "Fund");
        assert_eq!(to_domain_name("id"), "Id");
        assert_eq!(to_domain_name("fund_id"), "FundId");
        assert_eq!(to_domain_name("yield_2date"), "Yield_2date");
        assert_eq!(to_domain_name("_test"), "_test");
        assert_eq!(to_domain_name("test_"), "Test_");
        assert_eq!(to_domain_name("_"), "_");
        assert_eq!(to_domain_name(""), "");
    }

    #[test]
    fn storage_names_round_trip() {
        let corpus = [
            "id",
            "fund_id",
            "yield_2date",
            "yield__2date",
            "yield_2_date",
            "test",
            "test_",
            "_test",
            "_test_",
            "1_2_3_name",
            "_",
        ];
        for column in corpus {
            let domain = to_domain_name(column);
            assert_eq!(
                to_storage_name(&domain),
                column,
                "domain name was {domain}"
            );
        }
    }

    #[test]
    fn double_underscore_before_letter_round_trips() {
        assert_eq!(to_domain_name("a__b"), "A_B");
        assert_eq!(to_storage_name("A_B"), "a__b");
    }

    #[test]
    fn single_letter_segments_do_not_round_trip() {
        for (column, domain, back) in [("x_y", "XY", "xy"), ("a_b_c", "ABC", "abc")] {
            assert_eq!(to_domain_name(column), domain);
            assert_eq!(to_storage_name(domain), back);
            assert_ne!(to_storage_name(&to_domain_name(column)), column);
        }
    }

    #[test]
    fn domain_round_trip_is_lossy() {
        assert_eq!(to_storage_name("ABC"), "abc");
        assert_eq!(to_domain_name("abc"), "Abc");
    }
}
