/*!
 * Tests for language tag utilities
 */

use narrata::language_utils::{
    get_language_name, primary_subtag, region_subtag, same_language, validate_language_tag,
};

#[test]
fn test_subtags_withVariousSeparators_shouldSplit() {
    assert_eq!(primary_subtag("es-MX"), "es");
    assert_eq!(primary_subtag("EN_us"), "en");
    assert_eq!(region_subtag("en_us"), Some("US".to_string()));
    assert_eq!(region_subtag("fr"), None);
}

#[test]
fn test_validate_language_tag_withKnownAndUnknownCodes_shouldValidate() {
    assert!(validate_language_tag("es-ES").is_ok());
    assert!(validate_language_tag("spa").is_ok());
    assert!(validate_language_tag("zz-ZZ").is_err());
    assert!(validate_language_tag("").is_err());
}

#[test]
fn test_same_language_withDifferentRegions_shouldMatch() {
    assert!(same_language("es-ES", "es-MX"));
    assert!(same_language("es", "spa"));
    assert!(!same_language("es-ES", "en-US"));
    assert!(!same_language("zz", "zz"));
}

#[test]
fn test_get_language_name_withRegion_shouldAppendRegion() {
    assert_eq!(get_language_name("es-MX").unwrap(), "Spanish (MX)");
    assert_eq!(get_language_name("en").unwrap(), "English");
    assert!(get_language_name("qq").is_err());
}
