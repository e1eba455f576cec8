use super::*;
use proptest::prelude::*;

proptest! {
    /// A slug never contains spaces
    #[test]
    fn prop_slug_has_no_spaces(name in "\\PC*") {
        prop_assert!(!slug_id(&name).contains(' '));
    }

    /// Slugging is idempotent
    #[test]
    fn prop_slug_is_idempotent(name in "[a-zA-Z0-9 _.-]{0,40}") {
        let once = slug_id(&name);
        prop_assert_eq!(slug_id(&once), once);
    }

    /// Names differing only in ASCII case share a slug
    #[test]
    fn prop_slug_ignores_ascii_case(name in "[a-zA-Z ]{1,40}") {
        prop_assert_eq!(slug_id(&name.to_ascii_uppercase()), slug_id(&name.to_ascii_lowercase()));
    }
}
