/// Normalizes a plate for group lookup.
///
/// Trailing `-<digits>` sub-unit suffixes are dropped (`"abc1d23-2"` becomes
/// `"ABC1D23"`), then the result is uppercased. Suffixes are stripped until
/// none is left, so applying it twice gives the same result as once.
pub fn normalize_plate(plate: &str) -> String {
    let mut base = plate.trim();
    while let Some((head, tail)) = base.rsplit_once('-') {
        if tail.is_empty() || !tail.bytes().all(|b| b.is_ascii_digit()) {
            break;
        }
        base = head.trim_end();
    }
    base.to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_numeric_suffix() {
        assert_eq!(normalize_plate("ABC1D23-2"), "ABC1D23");
        assert_eq!(normalize_plate("abc1d23-15"), "ABC1D23");
        assert_eq!(normalize_plate("ABC1D23-1-2"), "ABC1D23");
    }

    #[test]
    fn test_keeps_non_numeric_suffix() {
        assert_eq!(normalize_plate("ABC-1D23"), "ABC-1D23");
        assert_eq!(normalize_plate("ABC1D23-"), "ABC1D23-");
        assert_eq!(normalize_plate("ABC1D23-X"), "ABC1D23-X");
    }

    #[test]
    fn test_trims_and_uppercases() {
        assert_eq!(normalize_plate("  scd1g70 "), "SCD1G70");
    }

    #[test]
    fn test_idempotent() {
        for plate in ["ABC1D23-2", "abc1d23", " x-1 ", "ABC-1D23", "Q-", "-7", "A-1-2"] {
            let once = normalize_plate(plate);
            assert_eq!(normalize_plate(&once), once, "plate {plate:?}");
        }
        assert_eq!(normalize_plate("ABC1D23-2"), normalize_plate("ABC1D23"));
    }
}
